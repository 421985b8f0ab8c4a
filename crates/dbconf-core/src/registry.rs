//! Driver registry
//!
//! Maps driver names to the library that implements them and the dialect
//! they speak, and owns the dialect table used by `dialect` overrides.
//! Registries are plain values: build one per resolver, inject fakes in tests.

use crate::dialect::{Dialect, MySqlDialect, PostgresDialect, RedshiftDialect, Sqlite3Dialect};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Import identity of the built-in Postgres driver
pub const POSTGRES_IMPORT: &str = "tokio-postgres";

/// What the registry knows about a driver name
#[derive(Clone)]
pub struct DriverDescriptor {
    pub name: String,

    /// Library identity; empty when the driver is unknown
    pub import_path: String,

    pub dialect: Option<Arc<dyn Dialect>>,
}

impl DriverDescriptor {
    /// Usable iff both the library and the dialect are known
    pub fn is_valid(&self) -> bool {
        !self.import_path.is_empty() && self.dialect.is_some()
    }
}

impl fmt::Debug for DriverDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverDescriptor")
            .field("name", &self.name)
            .field("import_path", &self.import_path)
            .field("dialect", &self.dialect.as_ref().map(|d| d.name()))
            .finish()
    }
}

#[derive(Debug, Clone)]
struct DriverEntry {
    import_path: String,
    dialect: String,
}

/// Driver and dialect tables
#[derive(Debug, Clone)]
pub struct DriverRegistry {
    drivers: HashMap<String, DriverEntry>,
    dialects: HashMap<String, Arc<dyn Dialect>>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
            dialects: HashMap::new(),
        }
    }

    /// Registry with the built-in dialects and the Postgres driver family
    pub fn with_builtins() -> Self {
        Self::new()
            .with_dialect(Arc::new(PostgresDialect::new()))
            .with_dialect(Arc::new(RedshiftDialect))
            .with_dialect(Arc::new(MySqlDialect))
            .with_dialect(Arc::new(Sqlite3Dialect))
            .with_driver("postgres", POSTGRES_IMPORT, "postgres")
            .with_driver("postgresql", POSTGRES_IMPORT, "postgres")
    }

    /// Register a dialect under its own name, replacing any previous one
    pub fn with_dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialects.insert(dialect.name().to_string(), dialect);
        self
    }

    /// Register a driver name
    ///
    /// The dialect is looked up by name at describe time, so drivers and
    /// dialects can be registered in any order.
    pub fn with_driver(
        mut self,
        name: impl Into<String>,
        import_path: impl Into<String>,
        dialect: impl Into<String>,
    ) -> Self {
        self.drivers.insert(
            name.into(),
            DriverEntry {
                import_path: import_path.into(),
                dialect: dialect.into(),
            },
        );
        self
    }

    /// Describe a driver
    ///
    /// Unknown names yield an empty import identity and no dialect rather
    /// than an error; configuration may still supply both.
    pub fn describe(&self, name: &str) -> DriverDescriptor {
        match self.drivers.get(name) {
            Some(entry) => DriverDescriptor {
                name: name.to_string(),
                import_path: entry.import_path.clone(),
                dialect: self.dialect(&entry.dialect),
            },
            None => DriverDescriptor {
                name: name.to_string(),
                import_path: String::new(),
                dialect: None,
            },
        }
    }

    /// Look up a dialect by name
    pub fn dialect(&self, name: &str) -> Option<Arc<dyn Dialect>> {
        self.dialects.get(name).cloned()
    }

    /// Registered driver names, sorted
    pub fn driver_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
