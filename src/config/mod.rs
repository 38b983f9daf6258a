use std::env;
use std::time::Duration;

use crate::session::RetryPolicy;

/// Config holds controller connection settings
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub verify_tls: bool,
    pub request_timeout_secs: u64,
    pub retry_backoff_secs: u64,
    pub retry_backoff_multiplier: u32,
    pub retry_max_backoff_secs: u64,
    /// 0 means retry forever
    pub retry_max_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            host: get_env("CONTROLLER_HOST", ""),
            port: get_env("CONTROLLER_PORT", "443").parse().unwrap_or(443),
            username: get_env("CONTROLLER_USER", "admin"),
            password: get_env("CONTROLLER_PASSWORD", ""),
            verify_tls: get_env("CONTROLLER_VERIFY_TLS", "false")
                .parse()
                .unwrap_or(false),
            request_timeout_secs: get_env("REQUEST_TIMEOUT_SECS", "30")
                .parse()
                .unwrap_or(30),
            retry_backoff_secs: get_env("RETRY_BACKOFF_SECS", "10")
                .parse()
                .unwrap_or(10),
            retry_backoff_multiplier: get_env("RETRY_BACKOFF_MULTIPLIER", "1")
                .parse()
                .unwrap_or(1),
            retry_max_backoff_secs: get_env("RETRY_MAX_BACKOFF_SECS", "300")
                .parse()
                .unwrap_or(300),
            retry_max_attempts: get_env("RETRY_MAX_ATTEMPTS", "60")
                .parse()
                .unwrap_or(60),
        }
    }

    /// Base URL of the controller API root, e.g. `https://10.0.0.1:443/api`
    pub fn api_root(&self) -> String {
        format!("https://{}:{}/api", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::from_secs(self.retry_backoff_secs),
            multiplier: self.retry_backoff_multiplier.max(1),
            max_backoff: Duration::from_secs(self.retry_max_backoff_secs),
            max_attempts: match self.retry_max_attempts {
                0 => None,
                n => Some(n),
            },
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            host: "10.1.1.1".to_string(),
            port: 8443,
            username: "admin".to_string(),
            password: "secret".to_string(),
            verify_tls: false,
            request_timeout_secs: 30,
            retry_backoff_secs: 10,
            retry_backoff_multiplier: 1,
            retry_max_backoff_secs: 300,
            retry_max_attempts: 0,
        }
    }

    #[test]
    fn test_api_root() {
        assert_eq!(sample().api_root(), "https://10.1.1.1:8443/api");
    }

    #[test]
    fn test_zero_attempts_means_unbounded() {
        let policy = sample().retry_policy();
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.backoff, Duration::from_secs(10));

        let mut cfg = sample();
        cfg.retry_max_attempts = 5;
        cfg.retry_backoff_multiplier = 0;
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_attempts, Some(5));
        assert_eq!(policy.multiplier, 1);
    }

    #[test]
    fn test_growing_backoff_is_capped() {
        let mut cfg = sample();
        cfg.retry_backoff_multiplier = 2;
        cfg.retry_max_attempts = 60;
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_backoff, Duration::from_secs(300));
        assert_eq!(policy.delay_for(20), Duration::from_secs(300));

        let total: Duration = (1..60).map(|n| policy.delay_for(n)).sum();
        assert!(total <= Duration::from_secs(300 * 59));
    }
}
