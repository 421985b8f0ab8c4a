//! Open a ready-to-use connection for a resolved configuration
//!
//! ```text
//! open ──> ping ──ok──────────────────────────────> schema ──> ready
//!            │                                         ^
//!            └─ missing database ──> create ──> reopen ┘
//! ```
//!
//! A missing database is created through a maintenance connection to the
//! dialect's administrative database on the same server. Any other ping
//! failure is returned as is.

use crate::adapter::{Connection, DriverSet};
use crate::error::BootstrapError;
use dbconf_core::{Configuration, Dialect, DriverError, FailureKind};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Printed before a missing database is created
pub const MISSING_DATABASE_NOTICE: &str = "Database does not exist. Trying to create it.";

type NoticeSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Turns a [`Configuration`] into an open connection
#[derive(Clone)]
pub struct ConnectionBootstrapper {
    drivers: DriverSet,
    notice: NoticeSink,
}

impl ConnectionBootstrapper {
    /// Bootstrapper using the given drivers and printing notices to stdout
    pub fn new(drivers: DriverSet) -> Self {
        Self {
            drivers,
            notice: Arc::new(|message| println!("{}", message)),
        }
    }

    /// Replace where advisory notices go
    pub fn with_notice<F>(mut self, notice: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.notice = Arc::new(notice);
        self
    }

    /// Open, verify and prepare a connection for `config`
    ///
    /// The returned connection belongs to the caller.
    pub async fn open(&self, config: &Configuration) -> Result<Box<dyn Connection>, BootstrapError> {
        let spec = &config.driver;
        let dialect = spec.dialect();

        debug!(
            environment = %config.environment,
            driver = %spec.name(),
            "opening database connection"
        );

        let conn = self.connect(spec.name(), spec.open_string()).await?;

        let conn = match conn.ping().await {
            Ok(()) => conn,
            Err(e) if dialect.classify_connection_failure(&e) == FailureKind::MissingDatabase => {
                release(conn).await;

                let Some(maintenance) = dialect.maintenance_database() else {
                    return Err(BootstrapError::connection("pinging", e));
                };

                (self.notice)(MISSING_DATABASE_NOTICE);
                warn!(environment = %config.environment, error = %e, "{}", MISSING_DATABASE_NOTICE);

                self.provision(spec.name(), spec.open_string(), dialect, maintenance)
                    .await?;

                let conn = self
                    .connect(spec.name(), spec.open_string())
                    .await
                    .map_err(|e| match e {
                        BootstrapError::Connection { source, .. } => {
                            BootstrapError::connection("reopening", source)
                        }
                        other => other,
                    })?;

                if let Err(e) = conn.ping().await {
                    release(conn).await;
                    return Err(BootstrapError::connection("pinging after create", e));
                }

                conn
            }
            Err(e) => {
                release(conn).await;
                return Err(BootstrapError::connection("pinging", e));
            }
        };

        if let Some(schema) = &config.schema_override {
            if let Some(statement) = dialect.search_path_statement(schema) {
                if let Err(source) = conn.execute(&statement).await {
                    release(conn).await;
                    return Err(BootstrapError::Schema {
                        schema: schema.clone(),
                        source,
                    });
                }
                debug!(schema = %schema, "applied search path");
            }
        }

        Ok(conn)
    }

    async fn connect(&self, driver: &str, open_string: &str) -> Result<Box<dyn Connection>, BootstrapError> {
        let driver_impl = self.drivers.get(driver).ok_or_else(|| {
            BootstrapError::connection(
                "opening",
                DriverError::new(format!("No driver registered for '{}'", driver)),
            )
        })?;

        driver_impl
            .open(open_string)
            .await
            .map_err(|e| BootstrapError::connection("opening", e))
    }

    /// Create the database named by `open_string` from the maintenance database
    async fn provision(
        &self,
        driver: &str,
        open_string: &str,
        dialect: &dyn Dialect,
        maintenance: &str,
    ) -> Result<(), BootstrapError> {
        let database = dialect.database_name(open_string).ok_or_else(|| {
            BootstrapError::provisioning("cannot determine database name", None)
        })?;

        let maintenance_open = dialect.with_database(open_string, maintenance).ok_or_else(|| {
            BootstrapError::provisioning("cannot build maintenance connection string", None)
        })?;

        let admin = match self.connect(driver, &maintenance_open).await {
            Ok(conn) => conn,
            Err(e) => {
                return Err(BootstrapError::provisioning(
                    format!("cannot connect to maintenance database '{}'", maintenance),
                    e.driver_error().cloned(),
                ))
            }
        };

        let created = admin
            .execute(&dialect.create_database_statement(&database))
            .await;
        release(admin).await;

        match created {
            Ok(()) => {
                info!(database = %database, "created database");
                Ok(())
            }
            Err(e) => Err(BootstrapError::provisioning(
                format!("cannot create database '{}'", database),
                Some(e),
            )),
        }
    }
}

impl Default for ConnectionBootstrapper {
    fn default() -> Self {
        Self::new(DriverSet::with_builtins())
    }
}

impl fmt::Debug for ConnectionBootstrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBootstrapper")
            .field("drivers", &self.drivers)
            .finish_non_exhaustive()
    }
}

/// Close a connection that will not be handed to the caller
async fn release(conn: Box<dyn Connection>) {
    if let Err(e) = conn.close().await {
        debug!(error = %e, "error closing connection");
    }
}
