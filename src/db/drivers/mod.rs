// Database Drivers (Oracle, MySQL)
// Each vendor driver is compiled in through its cargo feature

#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "oracle")]
pub mod oracle;

#[cfg(feature = "mysql")]
pub use mysql::MysqlDriver;
#[cfg(feature = "oracle")]
pub use oracle::OracleDriver;
