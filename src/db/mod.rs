//! Database abstraction layer.
//!
//! - `adapter`: the engine seam, implemented by `mysql`, `postgres` and `sqlite`
//! - `pool`: bounded connection pool
//! - `executor`: the read-only session protocol
//! - `types`: row-to-JSON conversion

pub mod adapter;
pub mod executor;
pub mod mysql;
pub mod pool;
pub mod postgres;
pub mod sqlite;
pub mod types;

pub use adapter::DatabaseAdapter;
pub use executor::ReadOnlyExecutor;
pub use mysql::MySqlAdapter;
pub use pool::{ConnectionPool, PoolStatus, PooledConnection};
pub use postgres::PostgresAdapter;
pub use sqlite::SqliteAdapter;
