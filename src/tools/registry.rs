//! Registry of callable tools.
//!
//! Built once at startup and shared read-only afterwards. Tools are listed in
//! registration order.

use crate::error::ServerResult;
use crate::mcp::protocol::{CallToolResult, ToolDefinition};
use crate::tools::params::{self, ParamDescriptor, ValidatedArgs};
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

pub type ToolFuture = BoxFuture<'static, ServerResult<CallToolResult>>;

type HandlerFn = Arc<dyn Fn(ValidatedArgs) -> ToolFuture + Send + Sync>;

/// A tool: its advertised shape plus the handler behind it.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamDescriptor],
    handler: HandlerFn,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    pub fn new<F, Fut>(
        name: &'static str,
        description: &'static str,
        params: &'static [ParamDescriptor],
        handler: F,
    ) -> Self
    where
        F: Fn(ValidatedArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServerResult<CallToolResult>> + Send + 'static,
    {
        Self {
            name,
            description,
            params,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: params::input_schema(self.params),
        }
    }

    /// Validate `arguments` and run the handler. Invalid arguments never
    /// reach the handler.
    pub async fn call(&self, arguments: Option<&Value>) -> ServerResult<CallToolResult> {
        let args = params::validate(self.params, arguments)?;
        (self.handler)(args).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    by_name: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any earlier tool of the same name.
    pub fn register(&mut self, tool: ToolDescriptor) {
        match self.by_name.get(tool.name) {
            Some(&idx) => self.tools[idx] = tool,
            None => {
                self.by_name.insert(tool.name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.by_name.get(name).map(|&idx| &self.tools[idx])
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolDescriptor::definition).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
