// Database Module
// Vendor drivers, the connection registry, and query helpers

pub mod blocking;
pub mod connections;
pub mod drivers;
pub mod query;
pub mod registry;
pub mod traits;

// ============================================================================
// Re-exports
// ============================================================================

pub use connections::{ConnectionRegistry, SharedConnection};
pub use query::{bind_values, Param, ResultSet};
pub use registry::DriverRegistry;
pub use traits::{CellValue, ColumnInfo, Connection, DatabaseDriver, DatabaseError, Vendor};

#[cfg(feature = "mysql")]
pub use drivers::MysqlDriver;
#[cfg(feature = "oracle")]
pub use drivers::OracleDriver;
