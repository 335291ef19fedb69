//! Service configuration.

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/tally").
    pub data_dir: String,

    /// Service API key for service-to-service auth. When unset the API is
    /// open (development mode).
    pub service_api_key: Option<String>,

    /// Shared secret for webhook signature verification. When unset,
    /// webhook signatures are not checked (development mode).
    pub webhook_secret: Option<String>,

    /// Comma-separated organization ids exempt from metering.
    pub exempt_org_ids: String,

    /// Signup trial length in days.
    pub trial_days: i64,

    /// Grace window after a payment failure, in hours.
    pub grace_period_hours: i64,

    /// Bounded wait for the per-organization ledger lock, in milliseconds.
    pub lock_timeout_ms: u64,

    /// Interval between expiration sweeps, in seconds.
    pub sweep_interval_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/tally".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            webhook_secret: std::env::var("WEBHOOK_SECRET").ok(),
            exempt_org_ids: std::env::var("EXEMPT_ORG_IDS").unwrap_or_default(),
            trial_days: env_parsed("TRIAL_DAYS", 14),
            grace_period_hours: env_parsed("GRACE_PERIOD_HOURS", 72),
            lock_timeout_ms: env_parsed("LOCK_TIMEOUT_MS", 250),
            sweep_interval_seconds: env_parsed("SWEEP_INTERVAL_SECONDS", 300),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parsed("MAX_BODY_BYTES", 1024 * 1024),
            request_timeout_seconds: env_parsed("REQUEST_TIMEOUT_SECONDS", 30),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/tally".into(),
            service_api_key: None,
            webhook_secret: None,
            exempt_org_ids: String::new(),
            trial_days: 14,
            grace_period_hours: 72,
            lock_timeout_ms: 250,
            sweep_interval_seconds: 300,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
