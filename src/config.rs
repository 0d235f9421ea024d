//! Portal configuration, read once from the environment at startup.

use crate::discovery::retry::RetryConfig;

#[derive(Clone, Debug)]
pub struct PortalConfig {
    /// Explicit repository coordinates; inferred from the page location
    /// when absent.
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    /// Explicit serving root; inferred from owner/repo when absent.
    pub root_path: Option<String>,
    pub manifest_url: String,
    pub github_api_base: String,
    /// Drift-check cadence.
    pub sync_interval_ms: u64,
    /// Age at which an unconfirmed frame navigation counts as abandoned.
    pub pending_timeout_ms: u64,
    pub http_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub retry_jitter_factor: f64,
}

impl PortalConfig {
    pub fn from_env() -> Self {
        Self {
            owner: std::env::var("PORTAL_OWNER").ok(),
            repo: std::env::var("PORTAL_REPO").ok(),
            branch: std::env::var("PORTAL_BRANCH").ok(),
            root_path: std::env::var("PORTAL_ROOT").ok(),
            manifest_url: std::env::var("MANIFEST_URL").unwrap_or_else(|_| "projects.manifest.json".to_string()),
            github_api_base: std::env::var("GITHUB_API_BASE").unwrap_or_else(|_| "https://api.github.com".to_string()),
            sync_interval_ms: std::env::var("SYNC_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(350),
            pending_timeout_ms: std::env::var("PENDING_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(15_000),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(30),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(3),
            retry_base_delay_ms: std::env::var("RETRY_BASE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(100),
            retry_max_delay_ms: std::env::var("RETRY_MAX_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(5_000),
            retry_jitter_factor: std::env::var("RETRY_JITTER").ok().and_then(|v| v.parse().ok()).unwrap_or(0.3),
        }
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay_ms: self.retry_base_delay_ms,
            max_delay_ms: self.retry_max_delay_ms,
            jitter_factor: self.retry_jitter_factor,
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            branch: None,
            root_path: None,
            manifest_url: "projects.manifest.json".to_string(),
            github_api_base: "https://api.github.com".to_string(),
            sync_interval_ms: 350,
            pending_timeout_ms: 15_000,
            http_timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 5_000,
            retry_jitter_factor: 0.3,
        }
    }
}
