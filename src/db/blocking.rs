// Blocking Connection Registry
// Synchronous facade over the async registry for callers without a runtime

use crate::config::{self, RawConfig};
use crate::db::connections::{self, SharedConnection};
use crate::db::query::{Param, ResultSet};
use crate::db::registry::DriverRegistry;
use crate::db::traits::{CellValue, DatabaseError};
use std::path::Path;
use tokio::runtime::{Builder, Runtime};

/// Every call blocks the calling thread until the database round trip completes.
///
/// The registry drives its connections on a private current-thread runtime, so it
/// must not be used from inside another tokio runtime.
pub struct ConnectionRegistry {
    inner: connections::ConnectionRegistry,
    runtime: Runtime,
}

impl ConnectionRegistry {
    /// Connect to every datasource in `config`; see
    /// [`connections::ConnectionRegistry::initialize`]
    pub fn initialize(config: &RawConfig, drivers: &DriverRegistry) -> Result<Self, DatabaseError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let inner = runtime.block_on(connections::ConnectionRegistry::initialize(config, drivers))?;
        Ok(Self { inner, runtime })
    }

    /// Parse the datasource file at `path` and connect with the compiled-in drivers
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let config = config::parse(path)?;
        Self::initialize(&config, &DriverRegistry::with_defaults())
    }

    pub fn get_connection(&self, name: &str) -> Result<SharedConnection, DatabaseError> {
        self.inner.get_connection(name)
    }

    pub fn execute_query<T, F>(&self, name: &str, sql: &str, handler: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut ResultSet) -> Result<T, DatabaseError>,
    {
        self.runtime.block_on(self.inner.execute_query(name, sql, handler))
    }

    pub fn execute_query_with_parameters<T, F>(
        &self,
        name: &str,
        sql: &str,
        params: &[Param],
        handler: F,
    ) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut ResultSet) -> Result<T, DatabaseError>,
    {
        self.runtime
            .block_on(self.inner.execute_query_with_parameters(name, sql, params, handler))
    }

    pub fn execute_query_with_values<T, F>(
        &self,
        name: &str,
        sql: &str,
        values: Vec<CellValue>,
        handler: F,
    ) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut ResultSet) -> Result<T, DatabaseError>,
    {
        self.runtime
            .block_on(self.inner.execute_query_with_values(name, sql, values, handler))
    }

    /// Close every connection, continuing past failures. Returns the failures.
    pub fn close_all(&mut self) -> Vec<(String, DatabaseError)> {
        self.runtime.block_on(self.inner.close_all())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.names()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
