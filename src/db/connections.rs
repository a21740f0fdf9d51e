// Connection Registry
// Opens one connection per configured datasource and dispatches queries by name

use crate::config::{redact_url, DataSourceConfig, RawConfig, Section};
use crate::db::query::{bind_values, Param, ResultSet};
use crate::db::registry::DriverRegistry;
use crate::db::traits::{CellValue, Connection, DatabaseError, Vendor};
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handle to an open datasource connection
pub type SharedConnection = Arc<dyn Connection>;

/// Live connections keyed by datasource name
pub struct ConnectionRegistry {
    connections: HashMap<String, SharedConnection>,
    /// Datasource names in config order
    order: Vec<String>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Open a connection for every section of `config`.
    ///
    /// All or nothing: on the first failure the connections opened so far are
    /// closed again and the error is returned.
    pub async fn initialize(
        config: &RawConfig,
        drivers: &DriverRegistry,
    ) -> Result<Self, DatabaseError> {
        let mut registry = Self::new();

        for section in config.sections() {
            match Self::open(section, drivers).await {
                Ok(conn) => registry.insert(section.name.clone(), conn),
                Err(e) => {
                    log::error!(
                        "[Registry] Failed to initialize datasource [{}]: {}",
                        section.name,
                        e
                    );
                    registry.close_all().await;
                    return Err(e);
                }
            }
        }

        log::info!("[Registry] Initialized {} datasource(s)", registry.len());
        Ok(registry)
    }

    async fn open(section: &Section, drivers: &DriverRegistry) -> Result<SharedConnection, DatabaseError> {
        let datasource = DataSourceConfig::from_section(section)?;

        // Every matching vendor must be loadable; the first one connects
        let mut selected = None;
        for vendor in Vendor::detect(&datasource.url) {
            let driver = drivers.load(vendor)?;
            selected.get_or_insert(driver);
        }
        let driver = selected.ok_or_else(|| {
            DatabaseError::ConnectionFailed(format!(
                "No suitable driver found for {}",
                redact_url(&datasource.url)
            ))
        })?;

        let conn = driver.connect(&datasource).await?;
        log::info!(
            "[Registry] Connected [{}] using {} driver",
            datasource.name,
            driver.driver_name()
        );
        Ok(Arc::from(conn))
    }

    // Section names are unique, so a name is never inserted twice
    fn insert(&mut self, name: String, conn: SharedConnection) {
        debug_assert!(!self.connections.contains_key(&name));
        self.connections.insert(name.clone(), conn);
        self.order.push(name);
    }

    /// The shared handle for `name`; repeated calls return the same handle
    pub fn get_connection(&self, name: &str) -> Result<SharedConnection, DatabaseError> {
        self.connections
            .get(name)
            .cloned()
            .ok_or_else(|| DatabaseError::ConnectionNotFound(name.to_string()))
    }

    /// Run `sql` without parameters and hand the result cursor to `handler`
    pub async fn execute_query<T, F>(&self, name: &str, sql: &str, handler: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut ResultSet) -> Result<T, DatabaseError>,
    {
        self.execute_query_with_parameters(name, sql, &[], handler).await
    }

    /// Run `sql` with `params` bound positionally and hand the result cursor to `handler`
    pub async fn execute_query_with_parameters<T, F>(
        &self,
        name: &str,
        sql: &str,
        params: &[Param],
        handler: F,
    ) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut ResultSet) -> Result<T, DatabaseError>,
    {
        let conn = self.get_connection(name)?;
        log::debug!("[Registry] [{}] executing with {} parameter(s): {}", name, params.len(), sql);

        let mut rows = conn.query(sql, params).await?;
        handler(&mut rows)
    }

    /// Like [`execute_query_with_parameters`](Self::execute_query_with_parameters) for
    /// loosely typed values. Every value is checked before anything is sent to the database.
    pub async fn execute_query_with_values<T, F>(
        &self,
        name: &str,
        sql: &str,
        values: Vec<CellValue>,
        handler: F,
    ) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut ResultSet) -> Result<T, DatabaseError>,
    {
        let params = bind_values(values)?;
        self.execute_query_with_parameters(name, sql, &params, handler).await
    }

    /// Close every connection, continuing past failures. Returns the failures.
    pub async fn close_all(&mut self) -> Vec<(String, DatabaseError)> {
        let mut failures = Vec::new();

        for name in self.order.drain(..) {
            let Some(conn) = self.connections.remove(&name) else {
                continue;
            };
            if conn.is_closed().await {
                log::debug!("[Registry] [{}] already closed", name);
                continue;
            }
            match conn.close().await {
                Ok(()) => log::info!("[Registry] Closed [{}]", name),
                Err(e) => {
                    log::error!("[Registry] Failed to close [{}]: {}", name, e);
                    failures.push((name, e));
                }
            }
        }

        failures
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connections.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
