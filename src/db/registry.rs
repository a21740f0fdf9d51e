// Driver Registry
// Maps each vendor to the driver that opens its connections

use crate::db::traits::{DatabaseDriver, DatabaseError, Vendor};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry for managing database drivers
pub struct DriverRegistry {
    drivers: HashMap<Vendor, Arc<dyn DatabaseDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Registry holding every driver compiled into this build
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "oracle")]
        registry.register(Arc::new(crate::db::drivers::OracleDriver::new()));
        #[cfg(feature = "mysql")]
        registry.register(Arc::new(crate::db::drivers::MysqlDriver::new()));
        registry
    }

    /// Register a database driver, replacing any earlier one for the same vendor
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let vendor = driver.vendor();
        self.drivers.insert(vendor, driver);
        log::debug!("[Registry] Registered driver for: {}", vendor);
    }

    /// Get the driver for a vendor, failing if it is not part of this build
    pub fn get_driver(&self, vendor: Vendor) -> Result<Arc<dyn DatabaseDriver>, DatabaseError> {
        self.drivers
            .get(&vendor)
            .cloned()
            .ok_or_else(|| DatabaseError::DriverLoad {
                vendor,
                reason: "driver is not compiled into this build".to_string(),
            })
    }

    /// Look up the driver and make sure it can be used
    pub fn load(&self, vendor: Vendor) -> Result<Arc<dyn DatabaseDriver>, DatabaseError> {
        let driver = self.get_driver(vendor)?;
        driver.load()?;
        Ok(driver)
    }

    /// Get all registered vendors
    pub fn get_supported_vendors(&self) -> Vec<Vendor> {
        Vendor::ALL
            .into_iter()
            .filter(|v| self.drivers.contains_key(v))
            .collect()
    }

    /// Check if a driver is registered for a given vendor
    pub fn has_driver(&self, vendor: Vendor) -> bool {
        self.drivers.contains_key(&vendor)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataSourceConfig;
    use crate::db::traits::Connection;

    // Mock driver for testing
    struct MockDriver {
        loadable: bool,
    }

    #[async_trait::async_trait]
    impl DatabaseDriver for MockDriver {
        fn vendor(&self) -> Vendor {
            Vendor::Mysql
        }

        fn load(&self) -> Result<(), DatabaseError> {
            if self.loadable {
                Ok(())
            } else {
                Err(DatabaseError::DriverLoad {
                    vendor: Vendor::Mysql,
                    reason: "Mock".to_string(),
                })
            }
        }

        async fn connect(
            &self,
            _config: &DataSourceConfig,
        ) -> Result<Box<dyn Connection>, DatabaseError> {
            Err(DatabaseError::ConnectionFailed("Mock".to_string()))
        }
    }

    #[test]
    fn test_register_driver() {
        let mut registry = DriverRegistry::new();
        registry.register(Arc::new(MockDriver { loadable: true }));

        assert!(registry.has_driver(Vendor::Mysql));
        assert!(!registry.has_driver(Vendor::Oracle));
        assert_eq!(registry.get_supported_vendors(), vec![Vendor::Mysql]);
    }

    #[test]
    fn test_missing_driver_is_load_error() {
        let registry = DriverRegistry::new();
        let result = registry.get_driver(Vendor::Oracle);
        assert!(matches!(
            result,
            Err(DatabaseError::DriverLoad { vendor: Vendor::Oracle, .. })
        ));
    }

    #[test]
    fn test_load_checks_driver() {
        let mut registry = DriverRegistry::new();
        registry.register(Arc::new(MockDriver { loadable: false }));

        assert!(registry.get_driver(Vendor::Mysql).is_ok());
        assert!(matches!(
            registry.load(Vendor::Mysql),
            Err(DatabaseError::DriverLoad { .. })
        ));
    }

    #[test]
    fn test_defaults_follow_features() {
        let registry = DriverRegistry::with_defaults();
        assert_eq!(registry.has_driver(Vendor::Oracle), cfg!(feature = "oracle"));
        assert_eq!(registry.has_driver(Vendor::Mysql), cfg!(feature = "mysql"));
    }
}
