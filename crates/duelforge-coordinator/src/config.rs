//! Coordinator configuration.

use duelforge_session::{DEFAULT_SESSION_ID_LEN, MIN_SESSION_ID_LEN};
use serde::{Deserialize, Serialize};

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Ids this short would run out after a handful of sessions.
    #[error(
        "session id length {0} is below the minimum of {MIN_SESSION_ID_LEN}"
    )]
    SessionIdTooShort(usize),
}

/// Settings for a [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Length of generated session ids (alphanumeric characters). At least
    /// [`MIN_SESSION_ID_LEN`].
    pub session_id_len: usize,
}

impl CoordinatorConfig {
    /// Checks the settings before a server is started with them.
    ///
    /// # Errors
    /// [`ConfigError::SessionIdTooShort`] if `session_id_len` is below
    /// [`MIN_SESSION_ID_LEN`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_id_len < MIN_SESSION_ID_LEN {
            return Err(ConfigError::SessionIdTooShort(self.session_id_len));
        }
        Ok(())
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            session_id_len: DEFAULT_SESSION_ID_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinator_config_default() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.session_id_len, 9);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_short_ids() {
        for len in [0, 1, MIN_SESSION_ID_LEN - 1] {
            let config = CoordinatorConfig {
                session_id_len: len,
            };
            assert_eq!(config.validate(), Err(ConfigError::SessionIdTooShort(len)));
        }
        let config = CoordinatorConfig {
            session_id_len: MIN_SESSION_ID_LEN,
        };
        assert!(config.validate().is_ok());
    }
}
