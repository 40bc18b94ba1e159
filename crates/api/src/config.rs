use std::time::Duration;

use scorepush_webpush::TransportSettings;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. Backend and
/// VAPID credentials are loaded separately (see `main.rs`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Whole-request timeout in seconds (default: `120`).
    pub request_timeout_secs: u64,
    /// Push dispatch tunables.
    pub dispatch: DispatchSettings,
}

/// Knobs for a dispatch run.
#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    /// Notifications delivered concurrently (default: `8`).
    pub concurrency: usize,
    /// Timeout for one push POST in seconds (default: `10`).
    pub push_timeout_secs: u64,
    /// `TTL` header value in seconds (default: `86400`).
    pub ttl_secs: u32,
    /// Run dispatch internally on this interval; `None` disables the
    /// scheduler and relies on external triggers.
    pub interval_secs: Option<u64>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            concurrency: 8,
            push_timeout_secs: 10,
            ttl_secs: 86_400,
            interval_secs: None,
        }
    }
}

impl DispatchSettings {
    /// Seconds a batch of `batch_size` takes when every push runs into its
    /// timeout, with one subscription per notification.
    pub fn worst_case_batch_secs(&self, batch_size: u32) -> u64 {
        let waves = (batch_size as usize).div_ceil(self.concurrency.max(1));
        waves as u64 * self.push_timeout_secs
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            timeout: Duration::from_secs(self.push_timeout_secs),
            ttl_secs: self.ttl_secs,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default   |
    /// |--------------------------|-----------|
    /// | `HOST`                   | `0.0.0.0` |
    /// | `PORT`                   | `3000`    |
    /// | `REQUEST_TIMEOUT_SECS`   | `120`     |
    /// | `PUSH_CONCURRENCY`       | `8`       |
    /// | `PUSH_TIMEOUT_SECS`      | `10`      |
    /// | `PUSH_TTL_SECS`          | `86400`   |
    /// | `DISPATCH_INTERVAL_SECS` | unset     |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let defaults = DispatchSettings::default();

        let concurrency: usize = std::env::var("PUSH_CONCURRENCY")
            .map(|v| v.parse().expect("PUSH_CONCURRENCY must be a valid usize"))
            .unwrap_or(defaults.concurrency);

        let push_timeout_secs: u64 = std::env::var("PUSH_TIMEOUT_SECS")
            .map(|v| v.parse().expect("PUSH_TIMEOUT_SECS must be a valid u64"))
            .unwrap_or(defaults.push_timeout_secs);

        let ttl_secs: u32 = std::env::var("PUSH_TTL_SECS")
            .map(|v| v.parse().expect("PUSH_TTL_SECS must be a valid u32"))
            .unwrap_or(defaults.ttl_secs);

        let interval_secs: Option<u64> = std::env::var("DISPATCH_INTERVAL_SECS")
            .ok()
            .map(|v| v.parse().expect("DISPATCH_INTERVAL_SECS must be a valid u64"));

        Self {
            host,
            port,
            request_timeout_secs,
            dispatch: DispatchSettings {
                concurrency: concurrency.max(1),
                push_timeout_secs,
                ttl_secs,
                interval_secs: interval_secs.filter(|secs| *secs > 0),
            },
        }
    }
}
