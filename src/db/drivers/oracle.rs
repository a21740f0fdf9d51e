// Oracle Driver
// Implements DatabaseDriver for Oracle using the `oracle` crate (ODPI-C).
// The client calls block, so they run on tokio's blocking pool.

use crate::config::DataSourceConfig;
use crate::db::query::{Param, ResultSet};
use crate::db::traits::{CellValue, ColumnInfo, Connection, DatabaseDriver, DatabaseError, Vendor};
use chrono::NaiveDateTime;
use oracle::sql_type::{OracleType, ToSql};
use oracle::{SqlValue, Statement, Version};
use std::sync::Arc;
use tokio::sync::Mutex;

const THIN_PREFIX: &str = "jdbc:oracle:thin:@";
const OCI_PREFIX: &str = "jdbc:oracle:oci:@";

/// Oracle specific connection wrapper
pub struct OracleConnection {
    name: String,
    /// `None` once closed
    conn: Arc<Mutex<Option<oracle::Connection>>>,
}

#[async_trait::async_trait]
impl Connection for OracleConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn vendor(&self) -> Vendor {
        Vendor::Oracle
    }

    async fn query(&self, sql: &str, params: &[Param]) -> Result<ResultSet, DatabaseError> {
        let conn = Arc::clone(&self.conn);
        let name = self.name.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let guard = conn.blocking_lock();
            let conn = guard
                .as_ref()
                .ok_or_else(|| DatabaseError::ConnectionClosed(name.clone()))?;
            run_query(&name, conn, &sql, &params)
        })
        .await
        .map_err(|e| DatabaseError::QueryError(format!("Oracle worker failed: {}", e)))?
    }

    async fn is_closed(&self) -> bool {
        self.conn.lock().await.is_none()
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        let conn = Arc::clone(&self.conn);
        let name = self.name.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .blocking_lock()
                .take()
                .ok_or_else(|| DatabaseError::ConnectionClosed(name))?;
            conn.close()
                .map_err(|e| DatabaseError::ConnectionFailed(format!("Failed to close: {}", e)))
        })
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(format!("Oracle worker failed: {}", e)))?
    }
}

/// Oracle driver implementation
pub struct OracleDriver;

impl OracleDriver {
    /// Create a new Oracle driver
    pub fn new() -> Self {
        Self
    }

    /// Translate a JDBC URL into a connect string the Oracle client understands.
    ///
    /// `@//host:port/service` becomes EZConnect, `@host:port:SID` becomes a
    /// connect descriptor. Anything else (TNS alias, descriptor, plain
    /// EZConnect) passes through unchanged.
    fn connect_string(url: &str) -> String {
        let Some(rest) = url
            .strip_prefix(THIN_PREFIX)
            .or_else(|| url.strip_prefix(OCI_PREFIX))
        else {
            return url.to_string();
        };

        if rest.starts_with("//") || rest.starts_with('(') {
            return rest.to_string();
        }

        match rest.split(':').collect::<Vec<_>>().as_slice() {
            [host, port, sid] if !sid.contains('/') => format!(
                "(DESCRIPTION=(ADDRESS=(PROTOCOL=TCP)(HOST={})(PORT={}))(CONNECT_DATA=(SID={})))",
                host, port, sid
            ),
            _ => rest.to_string(),
        }
    }
}

impl Default for OracleDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DatabaseDriver for OracleDriver {
    fn vendor(&self) -> Vendor {
        Vendor::Oracle
    }

    /// Loads the Oracle client library, which fails when it is not installed
    fn load(&self) -> Result<(), DatabaseError> {
        let version = Version::client().map_err(|e| DatabaseError::DriverLoad {
            vendor: Vendor::Oracle,
            reason: e.to_string(),
        })?;
        log::debug!("[Oracle] Client library version {}", version);
        Ok(())
    }

    async fn connect(&self, config: &DataSourceConfig) -> Result<Box<dyn Connection>, DatabaseError> {
        let connect_string = Self::connect_string(&config.url);
        let username = config.username.clone();
        let password = config.password.clone();
        let name = config.name.clone();

        let conn = tokio::task::spawn_blocking(move || {
            oracle::Connection::connect(&username, &password, &connect_string)
        })
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(format!("Oracle worker failed: {}", e)))?
        .map_err(|e| DatabaseError::ConnectionFailed(format!("[{}] {}", name, e)))?;

        Ok(Box::new(OracleConnection {
            name,
            conn: Arc::new(Mutex::new(Some(conn))),
        }))
    }
}

fn query_error(e: oracle::Error) -> DatabaseError {
    DatabaseError::QueryError(e.to_string())
}

/// Prepare, bind, fetch, and release the statement on every path
fn run_query(
    name: &str,
    conn: &oracle::Connection,
    sql: &str,
    params: &[Param],
) -> Result<ResultSet, DatabaseError> {
    let values: Vec<Box<dyn ToSql>> = params.iter().map(to_oracle_value).collect();
    let refs: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();

    let mut stmt = conn.statement(sql).build().map_err(query_error)?;
    let result = fetch(&mut stmt, &refs);

    if let Err(e) = stmt.close() {
        log::warn!("[Oracle] [{}] Failed to release statement: {}", name, e);
    }
    result
}

fn fetch(stmt: &mut Statement, params: &[&dyn ToSql]) -> Result<ResultSet, DatabaseError> {
    let rows = stmt.query(params).map_err(query_error)?;

    let columns = rows
        .column_info()
        .iter()
        .enumerate()
        .map(|(idx, info)| ColumnInfo {
            name: info.name().to_string(),
            data_type: info.oracle_type().to_string(),
            ordinal_position: idx,
        })
        .collect();

    let mut out = Vec::new();
    for row in rows {
        let row = row.map_err(query_error)?;
        let cells = row
            .sql_values()
            .iter()
            .map(convert_value)
            .collect::<Result<Vec<_>, _>>()?;
        out.push(cells);
    }

    Ok(ResultSet::new(columns, out))
}

// Oracle has no boolean column type before 23c, so booleans go in as 1/0
fn to_oracle_value(param: &Param) -> Box<dyn ToSql> {
    match param {
        Param::Text(v) => Box::new(v.clone()),
        Param::Integer(v) => Box::new(*v),
        Param::Float(v) => Box::new(*v),
        Param::Boolean(v) => Box::new(i64::from(*v)),
        Param::Date(v) => Box::new(*v),
    }
}

fn convert_value(value: &SqlValue) -> Result<CellValue, DatabaseError> {
    if value.is_null().map_err(query_error)? {
        return Ok(CellValue::Null);
    }

    let cell = match value.oracle_type().map_err(query_error)? {
        OracleType::Number(..) | OracleType::Int64 | OracleType::UInt64 => {
            match value.get::<i64>() {
                Ok(v) => CellValue::Int(v),
                Err(_) => match value.get::<f64>() {
                    Ok(v) => CellValue::Float(v),
                    Err(_) => CellValue::String(value.get::<String>().map_err(query_error)?),
                },
            }
        }
        OracleType::Float(_) | OracleType::BinaryFloat | OracleType::BinaryDouble => {
            CellValue::Float(value.get::<f64>().map_err(query_error)?)
        }
        OracleType::Date | OracleType::Timestamp(_) => {
            let ts = value.get::<NaiveDateTime>().map_err(query_error)?;
            CellValue::DateTime(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }
        OracleType::Raw(_) | OracleType::LongRaw | OracleType::BLOB => {
            CellValue::Binary(value.get::<Vec<u8>>().map_err(query_error)?)
        }
        OracleType::Boolean => CellValue::Bool(value.get::<bool>().map_err(query_error)?),
        _ => CellValue::String(value.get::<String>().map_err(query_error)?),
    };
    Ok(cell)
}
