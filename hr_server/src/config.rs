//! Server configuration.
//!
//! Consolidates environment variable reads (with CLI overrides) and provides
//! validated configuration for the binary.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Complete server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// HTTP bind address.
    pub bind: SocketAddr,
    /// Prometheus exporter bind address.
    pub metrics_bind: SocketAddr,
    /// Directory served for the static web UI.
    pub static_dir: PathBuf,
    /// Stack a player sits down with.
    pub starting_stack: u32,
    /// Seconds of inactivity before a user is swept out.
    pub idle_timeout_secs: i64,
    /// Sweeper tick period.
    pub sweep_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from the environment, with optional CLI overrides
    /// for the bind address and static directory.
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        static_dir_override: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| std::env::var("HR_BIND").ok().and_then(|s| s.parse().ok()))
            .unwrap_or_else(|| default_addr("127.0.0.1:8080"));

        let metrics_bind = std::env::var("HR_METRICS_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| default_addr("127.0.0.1:9090"));

        let static_dir = static_dir_override
            .or_else(|| std::env::var("HR_STATIC_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("web/static"));

        Ok(Self {
            bind,
            metrics_bind,
            static_dir,
            starting_stack: parse_env_or("HR_STARTING_STACK", 10_000),
            idle_timeout_secs: parse_env_or("HR_IDLE_TIMEOUT_SECS", 60 * 60),
            sweep_interval_secs: parse_env_or("HR_SWEEP_INTERVAL_SECS", 60),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_stack == 0 {
            return Err(ConfigError::Invalid {
                var: "HR_STARTING_STACK".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.idle_timeout_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "HR_IDLE_TIMEOUT_SECS".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "HR_SWEEP_INTERVAL_SECS".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_addr(addr: &str) -> SocketAddr {
    addr.parse().expect("default bind address is valid")
}

/// Parse an environment variable with a default fallback.
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            metrics_bind: "127.0.0.1:9090".parse().unwrap(),
            static_dir: PathBuf::from("web/static"),
            starting_stack: 10_000,
            idle_timeout_secs: 3600,
            sweep_interval_secs: 60,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_zero_starting_stack_rejected() {
        let mut config = base_config();
        config.starting_stack = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("HR_STARTING_STACK"));
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let mut config = base_config();
        config.sweep_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
