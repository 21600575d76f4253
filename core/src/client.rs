//! Content client: cache-version state, request assembly, response mapping.
//!
//! # Design
//! `ContentClient` owns the access token and the cache-busting version (`cv`).
//! Each read operation is split the same way:
//! - `build_*` validates the query and produces an `HttpRequest` carrying
//!   `token`, the current `cv` (if known), and the builder's parameters;
//! - `parse_*` turns an `HttpResponse` into typed stories or an error;
//! - `fetch_*` runs build, transport, and parse, refreshing `cv` first when
//!   auto-invalidation is configured.
//!
//! The cache version starts unknown and only ever moves to a newer value.
//! It sits behind an `RwLock<Option<Arc<str>>>`, so a refresh is a single
//! pointer swap; concurrent refreshes may race and the last one wins.

use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, warn};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::params::{self, ParameterMapping};
use crate::query::{MultiLookup, SingleLookup};
use crate::types::{ContentResponse, Story};

const SPACE_PATH: &str = "spaces/me";

/// Client for the content-delivery API.
#[derive(Debug)]
pub struct ContentClient<T: Transport = UreqTransport> {
    config: ClientConfig,
    transport: T,
    cache_version: RwLock<Option<Arc<str>>>,
}

impl ContentClient<UreqTransport> {
    /// Client using the blocking `ureq` transport with the configured timeout.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ContentClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            cache_version: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Last fetched cache version, `None` until the first refresh.
    pub fn cache_version(&self) -> Option<String> {
        self.cache_version
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            .map(str::to_string)
    }

    fn store_cache_version(&self, version: &str) {
        let version: Arc<str> = Arc::from(version);
        *self
            .cache_version
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(version);
    }

    // -----------------------------------------------------------------------
    // Cache version
    // -----------------------------------------------------------------------

    /// Fetch the space's current version and store it as the new `cv`.
    pub fn invalidate_cache_version(&self) -> Result<String, ApiError> {
        let request = self.build_invalidate_cache_version();
        let response = self.execute(&request)?;
        let version = parse_cache_version(response)?;
        debug!("cache version refreshed to {version}");
        self.store_cache_version(&version);
        Ok(version)
    }

    pub fn build_invalidate_cache_version(&self) -> HttpRequest {
        let mut query = ParameterMapping::new();
        query.insert("token", self.config.access_token.as_str());
        HttpRequest {
            url: self.config.endpoint(SPACE_PATH),
            query,
        }
    }

    /// Store a version obtained by executing `build_invalidate_cache_version`
    /// outside the client.
    pub fn apply_cache_version(&self, response: HttpResponse) -> Result<String, ApiError> {
        let version = parse_cache_version(response)?;
        self.store_cache_version(&version);
        Ok(version)
    }

    // -----------------------------------------------------------------------
    // Fetch one
    // -----------------------------------------------------------------------

    pub fn fetch_one(&self, query: &SingleLookup) -> Result<ContentResponse, ApiError> {
        let (path, params) = params::build_single(query)?;
        self.refresh_if_configured(query.skip_cache_version)?;
        let request = self.assemble(&path, params, query.skip_cache_version);
        let response = self.execute(&request)?;
        self.parse_fetch_one(response)
    }

    /// Request for one story using the cache version currently held. Never
    /// refreshes; callers driving their own I/O refresh via
    /// `build_invalidate_cache_version` / `apply_cache_version`.
    pub fn build_fetch_one(&self, query: &SingleLookup) -> Result<HttpRequest, ApiError> {
        let (path, params) = params::build_single(query)?;
        Ok(self.assemble(&path, params, query.skip_cache_version))
    }

    pub fn parse_fetch_one(&self, response: HttpResponse) -> Result<ContentResponse, ApiError> {
        let (status, headers, mut body) = decode(response)?;
        let story = match body.get_mut("story").map(Value::take) {
            Some(story @ Value::Object(_)) => to_story(story)?,
            Some(_) => return Err(ApiError::malformed("`story` is not an object")),
            None => return Err(ApiError::malformed("missing `story` key")),
        };
        Ok(ContentResponse {
            entities: vec![story],
            rels: rels(&mut body)?,
            status,
            headers,
        })
    }

    // -----------------------------------------------------------------------
    // Fetch multiple
    // -----------------------------------------------------------------------

    pub fn fetch_multiple(&self, query: &MultiLookup) -> Result<ContentResponse, ApiError> {
        let (path, params) = params::build_multiple(query)?;
        self.refresh_if_configured(query.skip_cache_version)?;
        let request = self.assemble(&path, params, query.skip_cache_version);
        let response = self.execute(&request)?;
        self.parse_fetch_multiple(response)
    }

    pub fn build_fetch_multiple(&self, query: &MultiLookup) -> Result<HttpRequest, ApiError> {
        let (path, params) = params::build_multiple(query)?;
        Ok(self.assemble(&path, params, query.skip_cache_version))
    }

    pub fn parse_fetch_multiple(
        &self,
        response: HttpResponse,
    ) -> Result<ContentResponse, ApiError> {
        let (status, headers, mut body) = decode(response)?;
        let entities = match body.get_mut("stories").map(Value::take) {
            Some(Value::Array(items)) => story_list(items, "stories")?,
            Some(_) => return Err(ApiError::malformed("`stories` is not an array")),
            None => return Err(ApiError::malformed("missing `stories` key")),
        };
        Ok(ContentResponse {
            entities,
            rels: rels(&mut body)?,
            status,
            headers,
        })
    }

    // -----------------------------------------------------------------------
    // Assembly
    // -----------------------------------------------------------------------

    fn refresh_if_configured(&self, skip_cache_version: bool) -> Result<(), ApiError> {
        if self.config.auto_invalidate_cache && !skip_cache_version {
            self.invalidate_cache_version()?;
        }
        Ok(())
    }

    /// Merge `token` and `cv` into the builder's parameters.
    fn assemble(&self, path: &str, mut query: ParameterMapping, skip_cache_version: bool) -> HttpRequest {
        query.insert("token", self.config.access_token.as_str());
        if !skip_cache_version {
            match self.cache_version() {
                Some(version) => query.insert("cv", version),
                None => {
                    warn!(
                        "cache version unknown, requesting {path} without cv; \
                         call invalidate_cache_version to avoid stale edge-cache hits"
                    );
                }
            }
        }
        HttpRequest {
            url: self.config.endpoint(path),
            query,
        }
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!("GET {}", request.url);
        self.transport.get(request)
    }
}

/// Only 200 is accepted; redirects and other 2xx codes are failures too.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status == 200 {
        return Ok(());
    }
    Err(ApiError::UnexpectedStatus {
        status: response.status,
        body: response.body.clone(),
    })
}

fn decode(response: HttpResponse) -> Result<(u16, Vec<(String, String)>, Value), ApiError> {
    check_status(&response)?;
    let body: Value = serde_json::from_str(&response.body)
        .map_err(|e| ApiError::malformed(format!("body is not JSON: {e}")))?;
    if !body.is_object() {
        return Err(ApiError::malformed("body is not a JSON object"));
    }
    Ok((response.status, response.headers, body))
}

fn parse_cache_version(response: HttpResponse) -> Result<String, ApiError> {
    let (_, _, body) = decode(response)?;
    match body.get("space").and_then(|space| space.get("version")) {
        Some(Value::Number(n)) => match (n.as_u64(), n.as_i64()) {
            (Some(v), _) => Ok(v.to_string()),
            (None, Some(v)) => Ok(v.to_string()),
            _ => Err(ApiError::malformed(format!("`space.version` is not an integer: {n}"))),
        },
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(_) => Err(ApiError::malformed("`space.version` is not an integer or string")),
        None => Err(ApiError::malformed("missing `space.version`")),
    }
}

fn to_story(value: Value) -> Result<Story, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::malformed(format!("invalid story: {e}")))
}

fn story_list(items: Vec<Value>, key: &str) -> Result<Vec<Story>, ApiError> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(_) => to_story(item),
            _ => Err(ApiError::malformed(format!("`{key}` contains a non-object"))),
        })
        .collect()
}

fn rels(body: &mut Value) -> Result<Vec<Story>, ApiError> {
    match body.get_mut("rels").map(Value::take) {
        Some(Value::Array(items)) => story_list(items, "rels"),
        _ => Ok(Vec::new()),
    }
}
