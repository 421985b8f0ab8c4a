//! Error types for connection bootstrap

use dbconf_core::DriverError;

/// Bootstrap error types
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Opening, pinging or reopening the target database failed
    #[error("Connection error while {stage}: {source}")]
    Connection {
        stage: &'static str,
        #[source]
        source: DriverError,
    },

    /// The missing database could not be created
    #[error("Provisioning error: {message}")]
    Provisioning {
        message: String,
        #[source]
        source: Option<DriverError>,
    },

    /// The schema search path could not be applied
    #[error("Schema error applying '{schema}': {source}")]
    Schema {
        schema: String,
        #[source]
        source: DriverError,
    },
}

impl BootstrapError {
    pub(crate) fn connection(stage: &'static str, source: DriverError) -> Self {
        Self::Connection { stage, source }
    }

    pub(crate) fn provisioning(message: impl Into<String>, source: Option<DriverError>) -> Self {
        Self::Provisioning {
            message: message.into(),
            source,
        }
    }

    /// Driver error underneath, if any
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::Connection { source, .. } | Self::Schema { source, .. } => Some(source),
            Self::Provisioning { source, .. } => source.as_ref(),
        }
    }
}
