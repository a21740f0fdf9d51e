// Named database connections loaded from a sectioned datasource file

pub mod config;
pub mod db;

pub use config::{ConfigError, DataSourceConfig, RawConfig, Section};
pub use db::{
    CellValue, Connection, ConnectionRegistry, DatabaseError, DriverRegistry, Param, ResultSet,
    Vendor,
};
