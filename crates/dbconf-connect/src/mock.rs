//! In-memory driver for testing
//!
//! Simulates a Postgres-like server without a network connection. The
//! server keeps a set of existing databases; opening a connection parses
//! the `dbname` from the open string and pinging a database that does not
//! exist fails with SQLSTATE `3D000`. `CREATE DATABASE <name>` adds to the
//! set.
//!
//! ```rust,ignore
//! let driver = MockDriver::new().with_database("postgres");
//! let conn = driver.open("user=admin dbname=app").await?;
//! assert_eq!(conn.ping().await.unwrap_err().code(), Some("3D000"));
//!
//! // everything the driver saw, in order
//! let events = driver.events().await;
//! ```
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! let driver = MockDriver::new().with_open_failure();
//! let driver = MockDriver::new().with_open_failure_after(2);
//! let driver = MockDriver::new().with_database("app").with_ping_failure("app", "28P01");
//! let driver = MockDriver::new().with_create_failure();
//! let driver = MockDriver::new().with_statement_failure("SET search_path TO broken");
//! ```

use crate::adapter::{Connection, Driver};
use dbconf_core::dialect::INVALID_CATALOG_NAME;
use dbconf_core::{Dsn, DriverError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Something a mock connection was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Open(String),
    Ping(String),
    Execute { database: String, sql: String },
    Close(String),
}

#[derive(Debug, Default)]
struct MockState {
    databases: HashSet<String>,
    events: Vec<MockEvent>,
    failing_statements: HashSet<String>,

    /// SQLSTATE returned when pinging an existing database
    ping_failures: HashMap<String, String>,
}

/// Mock driver for testing
#[derive(Debug, Clone)]
pub struct MockDriver {
    state: Arc<RwLock<MockState>>,

    /// Number of opens that succeed before every further open fails
    open_limit: Option<usize>,

    /// Fail `CREATE DATABASE`
    fail_create: bool,
}

impl MockDriver {
    /// Create a mock server with no databases
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockState::default())),
            open_limit: None,
            fail_create: false,
        }
    }

    /// Add an existing database
    pub fn with_database(self, name: impl Into<String>) -> Self {
        // freshly built, so the lock is never contended
        if let Ok(mut state) = self.state.try_write() {
            state.databases.insert(name.into());
        }
        self
    }

    /// Configure every open to fail
    pub fn with_open_failure(self) -> Self {
        self.with_open_failure_after(0)
    }

    /// Let `opens` opens succeed, then fail every further one
    pub fn with_open_failure_after(mut self, opens: usize) -> Self {
        self.open_limit = Some(opens);
        self
    }

    /// Configure pings of an existing database to fail with `code`
    pub fn with_ping_failure(self, database: impl Into<String>, code: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.try_write() {
            state.ping_failures.insert(database.into(), code.into());
        }
        self
    }

    /// Configure `CREATE DATABASE` to fail with insufficient privilege
    pub fn with_create_failure(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Configure a statement to fail when executed
    pub fn with_statement_failure(self, sql: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.try_write() {
            state.failing_statements.insert(sql.into());
        }
        self
    }

    pub async fn has_database(&self, name: &str) -> bool {
        self.state.read().await.databases.contains(name)
    }

    /// Events recorded so far, in order
    pub async fn events(&self) -> Vec<MockEvent> {
        self.state.read().await.events.clone()
    }

    /// Statements executed against a database, in order
    pub async fn statements(&self, database: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .events
            .iter()
            .filter_map(|event| match event {
                MockEvent::Execute { database: db, sql } if db == database => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of open connections never closed
    pub async fn unclosed(&self) -> usize {
        let state = self.state.read().await;
        let opened = state.events.iter().filter(|e| matches!(e, MockEvent::Open(_))).count();
        let closed = state.events.iter().filter(|e| matches!(e, MockEvent::Close(_))).count();
        opened.saturating_sub(closed)
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn open(&self, open_string: &str) -> Result<Box<dyn Connection>, DriverError> {
        let mut state = self.state.write().await;

        if let Some(limit) = self.open_limit {
            let opened = state.events.iter().filter(|e| matches!(e, MockEvent::Open(_))).count();
            if opened >= limit {
                return Err(DriverError::new("Mock open failure"));
            }
        }

        let dsn = Dsn::parse(open_string)
            .map_err(|e| DriverError::new(format!("Invalid connection string: {}", e)))?;
        let database = dsn.database().unwrap_or_default().to_string();

        state.events.push(MockEvent::Open(database.clone()));

        Ok(Box::new(MockConnection {
            database,
            state: Arc::clone(&self.state),
            fail_create: self.fail_create,
        }))
    }
}

/// Connection to the mock server
#[derive(Debug)]
pub struct MockConnection {
    database: String,
    state: Arc<RwLock<MockState>>,
    fail_create: bool,
}

impl MockConnection {
    fn missing_database(&self) -> DriverError {
        DriverError::with_code(
            INVALID_CATALOG_NAME,
            format!("database \"{}\" does not exist", self.database),
        )
    }
}

#[async_trait::async_trait]
impl Connection for MockConnection {
    async fn ping(&self) -> Result<(), DriverError> {
        let mut state = self.state.write().await;
        state.events.push(MockEvent::Ping(self.database.clone()));

        if !state.databases.contains(&self.database) {
            return Err(self.missing_database());
        }

        match state.ping_failures.get(&self.database) {
            Some(code) => Err(DriverError::with_code(code.clone(), "Mock ping failure")),
            None => Ok(()),
        }
    }

    async fn execute(&self, sql: &str) -> Result<(), DriverError> {
        let mut state = self.state.write().await;
        state.events.push(MockEvent::Execute {
            database: self.database.clone(),
            sql: sql.to_string(),
        });

        if !state.databases.contains(&self.database) {
            return Err(self.missing_database());
        }

        if state.failing_statements.contains(sql) {
            return Err(DriverError::with_code("XX000", format!("Mock failure executing {}", sql)));
        }

        if let Some(name) = sql.strip_prefix("CREATE DATABASE ") {
            if self.fail_create {
                return Err(DriverError::with_code(
                    "42501",
                    "permission denied to create database",
                ));
            }

            let name = name.trim().to_string();
            if !state.databases.insert(name.clone()) {
                return Err(DriverError::with_code(
                    "42P04",
                    format!("database \"{}\" already exists", name),
                ));
            }
        }

        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.state
            .write()
            .await
            .events
            .push(MockEvent::Close(self.database.clone()));
        Ok(())
    }
}
