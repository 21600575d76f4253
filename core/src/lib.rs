//! Typed client for the Storyblok content-delivery API.
//!
//! # Overview
//! Turns typed queries into delivery API requests, keeps the edge-cache
//! version (`cv`) current, and maps JSON responses into `Story` values.
//!
//! # Design
//! - `params` is pure: a `SingleLookup` / `MultiLookup` becomes a resource
//!   path and a `ParameterMapping`, or `ApiError::InvalidQuery`.
//! - `ContentClient` holds the token and the cache version and splits every
//!   operation into `build_*` (produces `HttpRequest`) and `parse_*`
//!   (consumes `HttpResponse`); `fetch_*` drives both through a `Transport`.
//! - The default transport is a blocking `ureq` agent; tests substitute their
//!   own through the `Transport` trait or point `base_url` at a mock server.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod params;
pub mod query;
pub mod types;

pub use client::ContentClient;
pub use config::{ClientConfig, CDN_API_PATH, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
pub use params::{build_multiple, build_single, ParameterMapping};
pub use query::{
    FilterOperation, FilterQuery, MultiLookup, ResolveRelation, SingleLookup, SortBy, SortField,
    SortOrder, SortType, Version,
};
pub use types::{Alternate, ContentResponse, Story, TranslatedSlug};
