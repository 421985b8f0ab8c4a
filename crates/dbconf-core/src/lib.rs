//! dbconf core
//!
//! Per-environment database configuration for schema migrations: reads
//! `dbconf.yml`, expands environment variables, normalizes connection
//! strings and validates the driver against a [`DriverRegistry`].
//! Connecting lives in `dbconf-connect`.

pub mod config;
pub mod dialect;
pub mod dsn;
pub mod env;
pub mod error;
pub mod model;
pub mod registry;
pub mod resolver;

pub use config::{DbConf, EnvironmentEntry, CONFIG_FILE};
pub use dialect::{Dialect, FailureKind, MySqlDialect, PostgresDialect, RedshiftDialect, Sqlite3Dialect};
pub use dsn::{Dsn, DsnError};
pub use error::{ConfigError, DriverError, ResolveError, ValidationError};
pub use model::{Configuration, ConnectionSpec, DriverSpec};
pub use registry::{DriverDescriptor, DriverRegistry};
pub use resolver::{resolve, ConfigResolver, MIGRATIONS_DIR};
