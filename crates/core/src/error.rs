use thiserror::Error;

pub type DashResult<T> = Result<T, DashboardError>;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data source error: {0}")]
    Gateway(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid funnel record: {0}")]
    InvalidRecord(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DashboardError {
    /// Short machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            DashboardError::Config(_) => "config",
            DashboardError::Gateway(_) => "gateway_failure",
            DashboardError::Auth(_) => "auth_failed",
            DashboardError::InvalidFilter(_) => "invalid_filter",
            DashboardError::InvalidRecord(_) => "invalid_record",
            DashboardError::Session(_) => "session",
            DashboardError::Serialization(_)
            | DashboardError::Io(_)
            | DashboardError::Internal(_) => "internal",
        }
    }
}
