//! Resolved connection configuration

use crate::dialect::Dialect;
use crate::error::ValidationError;
use crate::registry::DriverDescriptor;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Driver specification while it is being assembled
///
/// Seeded from the registry and overridden field by field by the
/// configuration file. Call [`ConnectionSpec::validate`] to obtain a
/// [`DriverSpec`].
#[derive(Clone)]
pub struct ConnectionSpec {
    pub name: String,
    pub open_string: String,
    pub import_path: String,
    pub dialect: Option<Arc<dyn Dialect>>,
}

impl ConnectionSpec {
    /// Seed a spec from a registry descriptor
    pub fn from_descriptor(descriptor: DriverDescriptor, open_string: impl Into<String>) -> Self {
        Self {
            name: descriptor.name,
            open_string: open_string.into(),
            import_path: descriptor.import_path,
            dialect: descriptor.dialect,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.import_path.is_empty() && self.dialect.is_some()
    }

    /// Check that the spec names a library and a dialect
    pub fn validate(self) -> Result<DriverSpec, ValidationError> {
        match (&self.dialect, self.import_path.is_empty()) {
            (Some(dialect), false) => {
                let dialect = Arc::clone(dialect);
                Ok(DriverSpec {
                    name: self.name,
                    open_string: self.open_string,
                    import_path: self.import_path,
                    dialect,
                })
            }
            (dialect, no_import) => {
                let reason = match (no_import, dialect.is_none()) {
                    (true, true) => "no import path and no dialect",
                    (true, false) => "no import path",
                    _ => "no dialect",
                };
                Err(ValidationError {
                    spec: format!("{:?}", self),
                    reason: reason.to_string(),
                })
            }
        }
    }
}

impl fmt::Debug for ConnectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSpec")
            .field("name", &self.name)
            .field("open_string", &crate::dsn::redact(&self.open_string))
            .field("import_path", &self.import_path)
            .field("dialect", &self.dialect.as_ref().map(|d| d.name()))
            .finish()
    }
}

/// Validated driver specification
#[derive(Clone)]
pub struct DriverSpec {
    name: String,
    open_string: String,
    import_path: String,
    dialect: Arc<dyn Dialect>,
}

impl DriverSpec {
    /// Driver name, used to pick the driver implementation
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connection string handed to the driver
    pub fn open_string(&self) -> &str {
        &self.open_string
    }

    pub fn import_path(&self) -> &str {
        &self.import_path
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }
}

impl PartialEq for DriverSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.open_string == other.open_string
            && self.import_path == other.import_path
            && self.dialect.name() == other.dialect.name()
    }
}

impl Eq for DriverSpec {}

impl fmt::Debug for DriverSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverSpec")
            .field("name", &self.name)
            .field("open_string", &crate::dsn::redact(&self.open_string))
            .field("import_path", &self.import_path)
            .field("dialect", &self.dialect.name())
            .finish()
    }
}

/// Everything needed to bootstrap a connection for one environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    /// Always `<base>/migrations`
    pub migrations_directory: PathBuf,

    /// Selected environment name
    pub environment: String,

    pub driver: DriverSpec,

    /// Dialect-specific schema selector (a `search_path` for Postgres)
    pub schema_override: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DriverRegistry;

    #[test]
    fn validate_builtin_descriptor() {
        let descriptor = DriverRegistry::default().describe("postgres");
        let spec = ConnectionSpec::from_descriptor(descriptor, "host=db dbname=app")
            .validate()
            .unwrap();

        assert_eq!(spec.name(), "postgres");
        assert_eq!(spec.open_string(), "host=db dbname=app");
        assert_eq!(spec.import_path(), "tokio-postgres");
        assert_eq!(spec.dialect().name(), "postgres");
    }

    #[test]
    fn validate_reports_missing_parts() {
        let descriptor = DriverRegistry::default().describe("oracle");
        let spec = ConnectionSpec::from_descriptor(descriptor, "oracle://db");
        assert!(!spec.is_valid());

        let err = spec.clone().validate().unwrap_err();
        assert_eq!(err.reason, "no import path and no dialect");
        assert!(err.spec.contains("oracle"));

        let mut with_import = spec;
        with_import.import_path = "oracle-driver".to_string();
        assert_eq!(with_import.validate().unwrap_err().reason, "no dialect");
    }

    #[test]
    fn debug_output_masks_password() {
        let descriptor = DriverRegistry::default().describe("postgres");
        let spec = ConnectionSpec::from_descriptor(descriptor, "user=u password=hunter2 dbname=app");
        let rendered = format!("{:?}", spec);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("password=***"));
    }
}
