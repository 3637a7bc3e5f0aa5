//! MCP protocol layer.
//!
//! `protocol` holds the wire types; `dispatcher` maps JSON-RPC methods onto
//! the tool registry.

pub mod dispatcher;
pub mod protocol;

pub use dispatcher::Dispatcher;
pub use protocol::{JsonRpcRequest, JsonRpcResponse};
