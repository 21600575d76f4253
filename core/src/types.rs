//! Entities returned by the delivery API.
//!
//! # Design
//! Every field is optional and defaults when absent or `null`, so a partial
//! story from the API (for example one trimmed by `excluding_fields`) still
//! maps cleanly. `content` stays untyped JSON because its shape is defined
//! per space by the content schema.

use serde::{Deserialize, Serialize};

/// A story (content entry) as served by the delivery API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Story {
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub published_at: Option<String>,
    pub alternates: Option<Vec<Alternate>>,
    pub id: Option<u64>,
    pub uuid: Option<String>,
    pub content: Option<serde_json::Value>,
    pub slug: Option<String>,
    pub full_slug: Option<String>,
    pub position: Option<i64>,
    pub tag_list: Option<Vec<String>>,
    pub is_startpage: Option<bool>,
    pub parent_id: Option<u64>,
    pub group_id: Option<String>,
    pub first_published_at: Option<String>,
    pub release_id: Option<u64>,
    pub lang: Option<String>,
    pub path: Option<String>,
    pub translated_slugs: Option<Vec<TranslatedSlug>>,
}

/// Another story in the same translation group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Alternate {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub published: Option<bool>,
    pub full_slug: Option<String>,
    pub is_folder: Option<bool>,
    pub parent_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatedSlug {
    pub path: Option<String>,
    pub name: Option<String>,
    pub lang: Option<String>,
}

/// Result of `fetch_one` / `fetch_multiple`: the mapped stories plus the raw
/// status and headers of the response they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentResponse {
    /// One element for `fetch_one`, API order for `fetch_multiple`.
    pub entities: Vec<Story>,
    /// Stories expanded by `resolve_relations`; empty when none were requested.
    pub rels: Vec<Story>,
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ContentResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Total number of stories matching a listing, from the `total` header.
    pub fn total(&self) -> Option<u64> {
        self.header("total")?.trim().parse().ok()
    }

    /// The single story of a `fetch_one` response.
    pub fn story(&self) -> Option<&Story> {
        self.entities.first()
    }
}
