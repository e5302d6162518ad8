//! Shared-passphrase access gate.
//!
//! Plain string comparison against the configured passphrase. This keeps
//! casual visitors out; it is not an authentication system.

use funnel_core::{DashResult, DashboardError};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AccessGate {
    passphrase: String,
}

impl AccessGate {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }

    /// `Ok` when `input` matches; otherwise a retryable auth error.
    pub fn check(&self, input: &str) -> DashResult<()> {
        if input == self.passphrase {
            Ok(())
        } else {
            metrics::counter!("auth.failures").increment(1);
            warn!("Dashboard passphrase mismatch");
            Err(DashboardError::Auth(
                "Incorrect password. Please try again or contact the administrator.".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check() {
        let gate = AccessGate::new("s3cret");
        assert!(gate.check("s3cret").is_ok());
        assert!(matches!(gate.check("S3cret"), Err(DashboardError::Auth(_))));
        assert!(gate.check("").is_err());
        // Mismatch is retryable: the next correct attempt still passes.
        assert!(gate.check("s3cret").is_ok());
    }
}
