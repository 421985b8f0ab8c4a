//! SQL dialects
//!
//! A dialect is the capability set attached to a driver. Downstream SQL
//! generation treats it as opaque; this crate only uses the connection
//! bootstrap capabilities below.

use crate::dsn::Dsn;
use crate::error::DriverError;
use std::fmt;

/// SQLSTATE reported when the target database does not exist
pub const INVALID_CATALOG_NAME: &str = "3D000";

/// Outcome of classifying a connection failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server is reachable but the target database is missing
    MissingDatabase,

    /// Anything else
    Other,
}

/// Capability set for a database family
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Dialect name, as used by the `dialect` configuration override
    fn name(&self) -> &str;

    /// Classify a failure reported by the driver
    fn classify_connection_failure(&self, _error: &DriverError) -> FailureKind {
        FailureKind::Other
    }

    /// Rewrite an open string into the form the driver prefers
    ///
    /// `None` means the string is kept unchanged.
    fn normalize_open_string(&self, _open: &str) -> Option<String> {
        None
    }

    /// Database name encoded in an open string
    fn database_name(&self, _open: &str) -> Option<String> {
        None
    }

    /// Open string targeting another database on the same server
    fn with_database(&self, _open: &str, _database: &str) -> Option<String> {
        None
    }

    /// Administrative database used to create missing databases
    ///
    /// `None` disables auto-provisioning for this dialect.
    fn maintenance_database(&self) -> Option<&str> {
        None
    }

    fn create_database_statement(&self, name: &str) -> String {
        format!("CREATE DATABASE {}", name)
    }

    /// Statement applying a schema search path, if the dialect has one
    fn search_path_statement(&self, _schema: &str) -> Option<String> {
        None
    }
}

/// PostgreSQL
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn classify_connection_failure(&self, error: &DriverError) -> FailureKind {
        classify_postgres(error)
    }

    fn normalize_open_string(&self, open: &str) -> Option<String> {
        if !Dsn::is_url(open) {
            return None;
        }
        Dsn::from_url(open).ok().map(|dsn| dsn.to_string())
    }

    fn database_name(&self, open: &str) -> Option<String> {
        Dsn::parse(open).ok()?.database().map(str::to_string)
    }

    fn with_database(&self, open: &str, database: &str) -> Option<String> {
        let dsn = Dsn::parse(open).ok()?;
        Some(dsn.with_database(database).to_string())
    }

    fn maintenance_database(&self) -> Option<&str> {
        Some("postgres")
    }

    fn search_path_statement(&self, schema: &str) -> Option<String> {
        Some(format!("SET search_path TO {}", schema))
    }
}

/// Amazon Redshift
///
/// Speaks the Postgres protocol and shares its failure codes and search
/// path, but databases are managed outside of migrations.
#[derive(Debug, Clone, Default)]
pub struct RedshiftDialect;

impl Dialect for RedshiftDialect {
    fn name(&self) -> &str {
        "redshift"
    }

    fn classify_connection_failure(&self, error: &DriverError) -> FailureKind {
        classify_postgres(error)
    }

    fn normalize_open_string(&self, open: &str) -> Option<String> {
        PostgresDialect.normalize_open_string(open)
    }

    fn database_name(&self, open: &str) -> Option<String> {
        PostgresDialect.database_name(open)
    }

    fn search_path_statement(&self, schema: &str) -> Option<String> {
        PostgresDialect.search_path_statement(schema)
    }
}

/// MySQL
#[derive(Debug, Clone, Default)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }
}

/// SQLite 3
#[derive(Debug, Clone, Default)]
pub struct Sqlite3Dialect;

impl Dialect for Sqlite3Dialect {
    fn name(&self) -> &str {
        "sqlite3"
    }
}

fn classify_postgres(error: &DriverError) -> FailureKind {
    match error.code() {
        Some(INVALID_CATALOG_NAME) => FailureKind::MissingDatabase,
        _ => FailureKind::Other,
    }
}
