//! Database connection bootstrap
//!
//! Opens a connection for a resolved [`dbconf_core::Configuration`]: checks
//! the server is reachable, creates the target database when it is missing
//! and applies the schema search path.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbconf_connect::ConnectionBootstrapper;
//!
//! let config = dbconf_core::resolve("db", "development", Some("tenant_a"))?;
//! let conn = ConnectionBootstrapper::default().open(&config).await?;
//! conn.execute("SELECT 1").await?;
//! ```

pub mod adapter;
pub mod bootstrap;
pub mod error;
pub mod mock;
pub mod postgres;

pub use adapter::{Connection, Driver, DriverSet};
pub use bootstrap::{ConnectionBootstrapper, MISSING_DATABASE_NOTICE};
pub use error::BootstrapError;
pub use mock::{MockConnection, MockDriver, MockEvent};
pub use postgres::{PostgresConnection, PostgresDriver};
