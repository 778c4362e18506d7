//! Connection-level server settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeouts applied to every connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// How long a fresh connection may take to send its handshake.
    pub handshake_timeout: Duration,

    /// A connection that sends nothing (heartbeats included) for this
    /// long is closed and treated as disconnected.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(15),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(15));
    }
}
