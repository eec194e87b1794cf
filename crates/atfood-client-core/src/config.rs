use crate::error::ConfigError;

pub const DEFAULT_LOCAL_ORIGIN: &str = "http://127.0.0.1:8000";
pub const DEFAULT_BASE_PATH: &str = "/api/atfood";
pub const DEFAULT_MOUNT_POINT_ID: &str = "atfood-ai-output";
pub const DEFAULT_INPUT_ID: &str = "atfood-ai-input";
pub const ENV_ENDPOINT_URL: &str = "ATFOOD_ENDPOINT_URL";

const LOCAL_HOSTNAMES: [&str; 5] = ["", "localhost", "127.0.0.1", "::1", "[::1]"];

/// Load-time configuration. Built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    /// Full URL the action request is POSTed to.
    pub endpoint_url: String,
    pub base_path: String,
    pub mount_point_id: String,
    pub input_id: String,
}

impl WidgetConfig {
    pub fn new(endpoint_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint_url: normalize_endpoint_url(endpoint_url)?,
            base_path: DEFAULT_BASE_PATH.to_string(),
            mount_point_id: DEFAULT_MOUNT_POINT_ID.to_string(),
            input_id: DEFAULT_INPUT_ID.to_string(),
        })
    }

    /// Endpoint for a page served from `hostname` / `origin`: local pages talk
    /// to the dev backend, deployed pages to their own origin.
    pub fn for_location(hostname: &str, origin: &str) -> Result<Self, ConfigError> {
        let origin = if is_local_hostname(hostname) {
            DEFAULT_LOCAL_ORIGIN
        } else {
            origin
        };
        let origin = normalize_endpoint_url(origin)?;
        Self::new(&format!("{origin}{DEFAULT_BASE_PATH}"))
    }

    /// `ATFOOD_ENDPOINT_URL` when set, otherwise the local dev endpoint.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env_non_empty(ENV_ENDPOINT_URL) {
            Some(endpoint_url) => Self::new(&endpoint_url),
            None => Self::new(&format!("{DEFAULT_LOCAL_ORIGIN}{DEFAULT_BASE_PATH}")),
        }
    }

    pub fn with_mount_point_id(mut self, mount_point_id: impl Into<String>) -> Self {
        self.mount_point_id = mount_point_id.into();
        self
    }

    pub fn with_input_id(mut self, input_id: impl Into<String>) -> Self {
        self.input_id = input_id.into();
        self
    }
}

pub fn is_local_hostname(hostname: &str) -> bool {
    let hostname = hostname.trim().to_ascii_lowercase();
    hostname == "0.0.0.0" || LOCAL_HOSTNAMES.contains(&hostname.as_str())
}

pub fn normalize_endpoint_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyEndpoint);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidEndpoint);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ConfigError::InvalidEndpoint);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ConfigError::InvalidEndpoint);
    }
    Ok(trimmed.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
