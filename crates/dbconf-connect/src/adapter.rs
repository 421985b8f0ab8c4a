//! Driver traits for opening database connections

use dbconf_core::DriverError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Trait for database drivers
#[async_trait::async_trait]
pub trait Driver: Send + Sync {
    /// Get the driver name (e.g., "postgres")
    fn name(&self) -> &str;

    /// Open a connection handle for an open string
    ///
    /// Only validates the open string. The session itself may be
    /// established lazily; use [`Connection::ping`] to check reachability.
    async fn open(&self, open_string: &str) -> Result<Box<dyn Connection>, DriverError>;
}

/// An open database connection
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    /// Verify the server is reachable and the target database accepts sessions
    async fn ping(&self) -> Result<(), DriverError>;

    /// Execute one or more statements, discarding results
    async fn execute(&self, sql: &str) -> Result<(), DriverError>;

    /// Release the connection
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Driver implementations by driver name
#[derive(Clone, Default)]
pub struct DriverSet {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set with the Postgres driver registered as `postgres` and `postgresql`
    pub fn with_builtins() -> Self {
        let postgres: Arc<dyn Driver> = Arc::new(crate::postgres::PostgresDriver::new());
        Self::new()
            .with_driver("postgres", Arc::clone(&postgres))
            .with_driver("postgresql", postgres)
    }

    /// Register a driver under a name, replacing any previous one
    pub fn with_driver(mut self, name: impl Into<String>, driver: Arc<dyn Driver>) -> Self {
        self.drivers.insert(name.into(), driver);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(name).cloned()
    }
}

impl fmt::Debug for DriverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("DriverSet").field("drivers", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;

    #[test]
    fn builtins_cover_postgres_family() {
        let set = DriverSet::with_builtins();
        assert_eq!(set.get("postgres").map(|d| d.name().to_string()).as_deref(), Some("postgres"));
        assert!(set.get("postgresql").is_some());
        assert!(set.get("mysql").is_none());
    }

    #[test]
    fn injected_driver() {
        let set = DriverSet::new().with_driver("postgres", Arc::new(MockDriver::new()));
        assert_eq!(set.get("postgres").map(|d| d.name().to_string()).as_deref(), Some("Mock"));
        assert_eq!(format!("{:?}", set), "DriverSet { drivers: [\"postgres\"] }");
    }
}
