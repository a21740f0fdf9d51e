// Database Driver Traits
// Defines the vendor abstraction shared by the Oracle and MySQL drivers

use crate::config::{ConfigError, DataSourceConfig};
use crate::db::query::{Param, ResultSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported database vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    Oracle,
    Mysql,
}

impl Vendor {
    /// Detection order; the first match is the one used to connect
    pub const ALL: [Vendor; 2] = [Vendor::Oracle, Vendor::Mysql];

    /// Display name for logs and the CLI
    pub fn display_name(&self) -> &'static str {
        match self {
            Vendor::Oracle => "Oracle",
            Vendor::Mysql => "MySQL",
        }
    }

    /// Substring that marks a connection URL as belonging to this vendor
    pub fn url_marker(&self) -> &'static str {
        match self {
            Vendor::Oracle => "oracle",
            Vendor::Mysql => "mysql",
        }
    }

    /// Every vendor whose marker appears in `url`, in detection order
    pub fn detect(url: &str) -> Vec<Vendor> {
        Self::ALL
            .into_iter()
            .filter(|vendor| url.contains(vendor.url_marker()))
            .collect()
    }

    /// The vendor used to open a connection for `url`
    pub fn select(url: &str) -> Option<Vendor> {
        Self::detect(url).into_iter().next()
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Common database error type
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unable to load driver for {vendor}: {reason}")]
    DriverLoad { vendor: Vendor, reason: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("No connection found for {0}")]
    ConnectionNotFound(String),

    #[error("Unsupported parameter type: {0}")]
    UnsupportedParameterType(String),

    #[error("Query execution error: {0}")]
    QueryError(String),

    #[error("Connection is closed: {0}")]
    ConnectionClosed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Column information from query results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub ordinal_position: usize,
}

/// Cell value in a result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(String),
    Binary(Vec<u8>),
}

impl CellValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Bool(_) => "boolean",
            CellValue::Int(_) => "integer",
            CellValue::Float(_) => "float",
            CellValue::String(_) => "text",
            CellValue::DateTime(_) => "datetime",
            CellValue::Binary(_) => "binary",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("NULL"),
            CellValue::Bool(v) => write!(f, "{}", v),
            CellValue::Int(v) => write!(f, "{}", v),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::String(v) | CellValue::DateTime(v) => f.write_str(v),
            CellValue::Binary(bytes) => {
                f.write_str("0x")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}

/// Connection trait - every open datasource handle implements this
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    /// Name of the datasource section this handle was opened for
    fn name(&self) -> &str;

    fn vendor(&self) -> Vendor;

    /// Prepare `sql`, bind `params` positionally, execute and fetch every row.
    /// The statement is released before returning.
    async fn query(&self, sql: &str, params: &[Param]) -> Result<ResultSet, DatabaseError>;

    async fn is_closed(&self) -> bool;

    /// Close the handle. Fails with `ConnectionClosed` if it was already closed.
    async fn close(&self) -> Result<(), DatabaseError>;
}

/// Database driver trait - one implementation per vendor
#[async_trait::async_trait]
pub trait DatabaseDriver: Send + Sync {
    fn vendor(&self) -> Vendor;

    fn driver_name(&self) -> &'static str {
        self.vendor().display_name()
    }

    /// Make sure the client side of the driver is usable before connecting
    fn load(&self) -> Result<(), DatabaseError>;

    /// Open a new connection for a datasource
    async fn connect(&self, config: &DataSourceConfig) -> Result<Box<dyn Connection>, DatabaseError>;
}
