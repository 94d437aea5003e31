use std::time::Duration;

use teamdesk_core::realtime::{LIVENESS_TIMEOUT_SECS, PING_INTERVAL_SECS};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Liveness and lock policy of the real-time channel.
    pub realtime: RealtimeConfig,
    /// JWT token configuration.
    pub jwt: JwtConfig,
}

/// Tunables of the WebSocket liveness monitor.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Seconds between `ping` messages (default: `10`).
    pub ping_interval_secs: u64,
    /// Seconds of silence before eviction (default: `30`).
    pub liveness_timeout_secs: u64,
    /// Release a user's locks when their last connection closes (default: `true`).
    pub release_locks_on_disconnect: bool,
}

impl RealtimeConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    /// Panics unless a peer answering every `ping` can stay connected.
    ///
    /// A liveness window shorter than the ping interval (or zero) would
    /// evict every connection on the next tick.
    pub fn assert_valid(&self) {
        assert!(self.ping_interval_secs > 0, "WS_PING_INTERVAL_SECS must be positive");
        assert!(
            self.liveness_timeout_secs >= self.ping_interval_secs,
            "WS_LIVENESS_TIMEOUT_SECS ({}) must be at least WS_PING_INTERVAL_SECS ({})",
            self.liveness_timeout_secs,
            self.ping_interval_secs
        );
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: PING_INTERVAL_SECS,
            liveness_timeout_secs: LIVENESS_TIMEOUT_SECS,
            release_locks_on_disconnect: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `HOST`                         | `0.0.0.0`               |
    /// | `PORT`                         | `3000`                  |
    /// | `CORS_ORIGINS`                 | `http://localhost:4200` |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                    |
    /// | `WS_PING_INTERVAL_SECS`        | `10`                    |
    /// | `WS_LIVENESS_TIMEOUT_SECS`     | `30`                    |
    /// | `RELEASE_LOCKS_ON_DISCONNECT`  | `true`                  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:4200".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let ping_interval_secs: u64 = std::env::var("WS_PING_INTERVAL_SECS")
            .unwrap_or_else(|_| PING_INTERVAL_SECS.to_string())
            .parse()
            .expect("WS_PING_INTERVAL_SECS must be a valid u64");

        let liveness_timeout_secs: u64 = std::env::var("WS_LIVENESS_TIMEOUT_SECS")
            .unwrap_or_else(|_| LIVENESS_TIMEOUT_SECS.to_string())
            .parse()
            .expect("WS_LIVENESS_TIMEOUT_SECS must be a valid u64");

        let release_locks_on_disconnect: bool = std::env::var("RELEASE_LOCKS_ON_DISCONNECT")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("RELEASE_LOCKS_ON_DISCONNECT must be true or false");

        let realtime = RealtimeConfig {
            ping_interval_secs,
            liveness_timeout_secs,
            release_locks_on_disconnect,
        };
        realtime.assert_valid();

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            realtime,
            jwt,
        }
    }
}
