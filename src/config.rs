use crate::assign::UnmatchedPolicy;
use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::core::{DeskError, Result};
use crate::patch::DirtyGating;
use std::path::PathBuf;
use std::time::Duration;

/// Console configuration
///
/// Built with defaults and chained setters, or read from `COURSEDESK_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    /// Address the API server binds to
    pub host: String,

    /// Port the API server listens on
    pub port: u16,

    /// Base URL the HTTP transport sends requests to
    pub api_base_url: String,

    /// Bearer token issued by the identity provider
    pub bearer_token: Option<String>,

    /// Timeout of a single request
    pub request_timeout: Duration,

    /// Entries kept per cache (entities and lists)
    pub cache_capacity: usize,

    /// Which form fields editors put into a patch
    pub patch_gating: DirtyGating,

    /// Treatment of upload rows that match no entity
    pub unmatched_rows: UnmatchedPolicy,

    /// Snapshot file of the entity store; in-memory only when unset
    pub snapshot_path: Option<PathBuf>,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_base_url: "http://127.0.0.1:8080".to_string(),
            bearer_token: None,
            request_timeout: Duration::from_secs(30),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            patch_gating: DirtyGating::DirtyOnly,
            unmatched_rows: UnmatchedPolicy::Drop,
            snapshot_path: None,
        }
    }
}

impl DeskConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind host
    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the listen port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the API base URL
    pub fn api_base_url(mut self, url: &str) -> Self {
        self.api_base_url = url.to_string();
        self
    }

    /// Set the bearer token
    pub fn bearer_token(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the cache capacity
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn patch_gating(mut self, gating: DirtyGating) -> Self {
        self.patch_gating = gating;
        self
    }

    pub fn unmatched_rows(mut self, policy: UnmatchedPolicy) -> Self {
        self.unmatched_rows = policy;
        self
    }

    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reads `COURSEDESK_*` variables on top of the defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`DeskConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("COURSEDESK_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("COURSEDESK_PORT") {
            config.port = parse_var("COURSEDESK_PORT", &port)?;
        }
        if let Some(url) = lookup("COURSEDESK_API_URL") {
            config.api_base_url = url;
        }
        config.bearer_token = lookup("COURSEDESK_TOKEN").filter(|token| !token.is_empty());
        if let Some(secs) = lookup("COURSEDESK_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_var("COURSEDESK_TIMEOUT_SECS", &secs)?);
        }
        if let Some(capacity) = lookup("COURSEDESK_CACHE_CAPACITY") {
            config.cache_capacity = parse_var("COURSEDESK_CACHE_CAPACITY", &capacity)?;
        }
        if let Some(gating) = lookup("COURSEDESK_PATCH_GATING") {
            config.patch_gating = match gating.as_str() {
                "dirty_only" => DirtyGating::DirtyOnly,
                "all_fields" => DirtyGating::AllFields,
                other => return Err(invalid_var("COURSEDESK_PATCH_GATING", other)),
            };
        }
        if let Some(policy) = lookup("COURSEDESK_UNMATCHED_ROWS") {
            config.unmatched_rows = match policy.as_str() {
                "drop" => UnmatchedPolicy::Drop,
                "reject" => UnmatchedPolicy::Reject,
                other => return Err(invalid_var("COURSEDESK_UNMATCHED_ROWS", other)),
            };
        }
        if let Some(path) = lookup("COURSEDESK_SNAPSHOT") {
            config.snapshot_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| invalid_var(name, raw))
}

fn invalid_var(name: &str, raw: &str) -> DeskError {
    DeskError::validation(format!("Invalid value '{}' for {}", raw, name))
}
