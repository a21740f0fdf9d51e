// MySQL Driver
// Implements DatabaseDriver for MySQL using mysql_async

use crate::config::{redact_url, DataSourceConfig};
use crate::db::query::{Param, ResultSet};
use crate::db::traits::{CellValue, ColumnInfo, Connection, DatabaseDriver, DatabaseError, Vendor};
use chrono::Datelike;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder, Params, Row, SslOpts, Statement, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

/// MySQL specific connection wrapper
pub struct MysqlConnection {
    name: String,
    /// `None` once closed
    conn: Mutex<Option<Conn>>,
}

impl MysqlConnection {
    async fn run(conn: &mut Conn, stmt: &Statement, params: &[Param]) -> Result<ResultSet, DatabaseError> {
        let params = if params.is_empty() {
            Params::Empty
        } else {
            Params::Positional(params.iter().map(to_mysql_value).collect::<Result<_, _>>()?)
        };

        let mut result = conn.exec_iter(stmt, params).await.map_err(query_error)?;

        // Column metadata is gone once the rows are collected
        let columns = convert_columns(result.columns());
        let rows = result.collect::<Row>().await.map_err(query_error)?;

        Ok(ResultSet::new(columns, rows.into_iter().map(convert_row).collect()))
    }
}

#[async_trait::async_trait]
impl Connection for MysqlConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn vendor(&self) -> Vendor {
        Vendor::Mysql
    }

    async fn query(&self, sql: &str, params: &[Param]) -> Result<ResultSet, DatabaseError> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| DatabaseError::ConnectionClosed(self.name.clone()))?;

        let stmt = conn.prep(sql).await.map_err(query_error)?;
        let result = Self::run(conn, &stmt, params).await;

        if let Err(e) = conn.close(stmt).await {
            log::warn!("[MySQL] [{}] Failed to release statement: {}", self.name, e);
        }
        result
    }

    async fn is_closed(&self) -> bool {
        self.conn.lock().await.is_none()
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        let conn = self
            .conn
            .lock()
            .await
            .take()
            .ok_or_else(|| DatabaseError::ConnectionClosed(self.name.clone()))?;
        conn.disconnect()
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(format!("Failed to disconnect: {}", e)))
    }
}

/// MySQL driver implementation
pub struct MysqlDriver;

impl MysqlDriver {
    /// Create a new MySQL driver
    pub fn new() -> Self {
        Self
    }

    /// Build connection options from a `jdbc:mysql://` or `mysql://` URL
    /// and the datasource credentials.
    ///
    /// JDBC query properties are not understood by mysql_async; `useSSL` and
    /// `sslMode` switch TLS on, everything else is dropped.
    fn build_opts(config: &DataSourceConfig) -> Result<Opts, DatabaseError> {
        let url = config.url.strip_prefix("jdbc:").unwrap_or(&config.url);
        let (base, query) = match url.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (url, None),
        };

        let mut use_ssl = false;
        for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key.to_ascii_lowercase().as_str() {
                "usessl" => use_ssl = value.eq_ignore_ascii_case("true"),
                "sslmode" | "ssl-mode" => use_ssl = !value.eq_ignore_ascii_case("disabled"),
                _ => log::debug!("[MySQL] [{}] Ignoring URL property '{}'", config.name, key),
            }
        }

        let opts = Opts::from_url(base).map_err(|e| {
            DatabaseError::ConnectionFailed(format!("Invalid MySQL URL {}: {}", redact_url(base), e))
        })?;

        Ok(OptsBuilder::from_opts(opts)
            .user(Some(config.username.clone()))
            .pass(Some(config.password.clone()))
            .ssl_opts(if use_ssl { Some(SslOpts::default()) } else { None })
            .into())
    }
}

impl Default for MysqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DatabaseDriver for MysqlDriver {
    fn vendor(&self) -> Vendor {
        Vendor::Mysql
    }

    // Pure Rust client; nothing to load at runtime
    fn load(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn connect(&self, config: &DataSourceConfig) -> Result<Box<dyn Connection>, DatabaseError> {
        let opts = Self::build_opts(config)?;
        let conn = Conn::new(opts)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(format!("[{}] {}", config.name, e)))?;

        Ok(Box::new(MysqlConnection {
            name: config.name.clone(),
            conn: Mutex::new(Some(conn)),
        }))
    }
}

fn query_error(e: mysql_async::Error) -> DatabaseError {
    DatabaseError::QueryError(e.to_string())
}

fn to_mysql_value(param: &Param) -> Result<Value, DatabaseError> {
    let value = match param {
        Param::Text(v) => Value::from(v.as_str()),
        Param::Integer(v) => Value::from(*v),
        Param::Float(v) => Value::from(*v),
        Param::Boolean(v) => Value::from(*v),
        Param::Date(d) => {
            // The binary protocol carries the year as u16
            let year = u16::try_from(d.year()).map_err(|_| {
                DatabaseError::UnsupportedParameterType(format!("date {} is out of range", d))
            })?;
            Value::Date(year, d.month() as u8, d.day() as u8, 0, 0, 0, 0)
        }
    };
    Ok(value)
}

fn convert_columns(columns: Option<Arc<[mysql_async::Column]>>) -> Vec<ColumnInfo> {
    match columns {
        Some(columns) => columns
            .iter()
            .enumerate()
            .map(|(idx, column)| ColumnInfo {
                name: column.name_str().into_owned(),
                data_type: format!("{:?}", column.column_type()),
                ordinal_position: idx,
            })
            .collect(),
        None => vec![],
    }
}

fn convert_row(mut row: Row) -> Vec<CellValue> {
    (0..row.len())
        .map(|idx| convert_value(row.take::<Value, usize>(idx).unwrap_or(Value::NULL)))
        .collect()
}

fn convert_value(value: Value) -> CellValue {
    match value {
        Value::NULL => CellValue::Null,
        Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(text) => CellValue::String(text),
            Err(e) => CellValue::Binary(e.into_bytes()),
        },
        Value::Int(v) => CellValue::Int(v),
        Value::UInt(v) => i64::try_from(v)
            .map(CellValue::Int)
            .unwrap_or_else(|_| CellValue::String(v.to_string())),
        Value::Float(v) => CellValue::Float(v as f64),
        Value::Double(v) => CellValue::Float(v),
        Value::Date(y, m, d, 0, 0, 0, 0) => CellValue::DateTime(format!("{:04}-{:02}-{:02}", y, m, d)),
        Value::Date(y, m, d, h, mi, s, 0) => CellValue::DateTime(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            y, m, d, h, mi, s
        )),
        Value::Date(y, m, d, h, mi, s, us) => CellValue::DateTime(format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
            y, m, d, h, mi, s, us
        )),
        Value::Time(negative, days, h, mi, s, us) => {
            let hours = days * 24 + h as u32;
            CellValue::DateTime(format!(
                "{}{:02}:{:02}:{:02}.{:06}",
                if negative { "-" } else { "" },
                hours,
                mi,
                s,
                us
            ))
        }
    }
}
