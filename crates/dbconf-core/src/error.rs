//! Error types for configuration resolution

use std::path::PathBuf;

/// Config error types
///
/// Raised while locating, parsing or reading `dbconf.yml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Environment '{environment}' not found in {}", path.display())]
    MissingEnvironment { environment: String, path: PathBuf },

    #[error("Missing required key '{environment}.{key}'")]
    MissingKey { environment: String, key: String },
}

/// A resolved driver specification that cannot be used to connect
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid driver spec {spec}: {reason}")]
pub struct ValidationError {
    /// Human readable rendering of the rejected spec
    pub spec: String,

    /// What is missing
    pub reason: String,
}

/// Failure reported by a database driver
///
/// Driver-neutral shape so dialects can classify failures without knowing
/// the driver library. `code` holds the provider error code (SQLSTATE for
/// the Postgres family) when the server reported one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    pub code: Option<String>,
    pub message: String,
}

impl DriverError {
    /// Create an error without a provider code
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Create an error carrying a provider code
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

/// Errors returned by [`crate::ConfigResolver::resolve`]
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_names_environment_and_key() {
        let err = ConfigError::MissingKey {
            environment: "production".to_string(),
            key: "open".to_string(),
        };
        assert_eq!(err.to_string(), "Missing required key 'production.open'");
    }

    #[test]
    fn driver_error_code() {
        let err = DriverError::with_code("3D000", "database \"app\" does not exist");
        assert_eq!(err.code(), Some("3D000"));
        assert_eq!(err.to_string(), "database \"app\" does not exist");
        assert_eq!(DriverError::new("boom").code(), None);
    }

    #[test]
    fn resolve_error_is_transparent() {
        let err: ResolveError = ValidationError {
            spec: "foo".to_string(),
            reason: "no dialect".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Invalid driver spec foo: no dialect");
    }
}
