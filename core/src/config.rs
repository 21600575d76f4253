//! Client configuration.
//!
//! # Design
//! The delivery host and the `/v1/cdn/` path segment are constants used as
//! defaults, never literals inside request logic, so tests can point a client
//! at a local mock server by overriding `base_url`.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;

use crate::error::ApiError;

/// Production delivery host.
pub const DEFAULT_BASE_URL: &str = "https://api.storyblok.com";

/// Versioned path prefix shared by every delivery endpoint.
pub const CDN_API_PATH: &str = "/v1/cdn/";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bytes escaped inside one path segment; `/` never appears in a segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub const ENV_TOKEN: &str = "STORYBLOK_TOKEN";
pub const ENV_BASE_URL: &str = "STORYBLOK_BASE_URL";
pub const ENV_AUTO_INVALIDATE: &str = "STORYBLOK_AUTO_INVALIDATE";
pub const ENV_TIMEOUT_SECS: &str = "STORYBLOK_TIMEOUT_SECS";

/// Settings for a `ContentClient`.
///
/// Only `access_token` is required. Deserializing from JSON fills every other
/// field with its default.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub access_token: String,

    /// Refresh the cache version before every content request.
    #[serde(default)]
    pub auto_invalidate_cache: bool,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_api_path")]
    pub api_path: String,

    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_path() -> String {
    CDN_API_PATH.to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

impl ClientConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            auto_invalidate_cache: false,
            base_url: default_base_url(),
            api_path: default_api_path(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_auto_invalidate_cache(mut self, enabled: bool) -> Self {
        self.auto_invalidate_cache = enabled;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_path(mut self, api_path: impl Into<String>) -> Self {
        self.api_path = api_path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a config from `STORYBLOK_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let token = lookup(ENV_TOKEN)
            .ok_or_else(|| ApiError::InvalidConfig(format!("{ENV_TOKEN} is not set")))?;
        let mut config = Self::new(token);

        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(flag) = lookup(ENV_AUTO_INVALIDATE) {
            config.auto_invalidate_cache = parse_flag(&flag)?;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ApiError::InvalidConfig(format!("{ENV_TIMEOUT_SECS} is not a number: {secs}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no request could succeed with.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.access_token.trim().is_empty() {
            return Err(ApiError::InvalidConfig("access token is empty".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ApiError::InvalidConfig("base url is empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ApiError::InvalidConfig("timeout must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Absolute URL for a delivery resource path such as `stories/home`.
    /// Each `/`-separated segment of `path` is percent-encoded.
    pub fn endpoint(&self, path: &str) -> String {
        let host = self.base_url.trim_end_matches('/');
        let path = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        match self.api_path.trim_matches('/') {
            "" => format!("{host}/{path}"),
            prefix => format!("{host}/{prefix}/{path}"),
        }
    }
}

fn parse_flag(value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ApiError::InvalidConfig(format!(
            "{ENV_AUTO_INVALIDATE} is not a boolean: {other}"
        ))),
    }
}
