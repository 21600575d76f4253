//! Typed query options for the two delivery read operations.
//!
//! # Design
//! Every option is an optional field on a plain struct built with
//! `..Default::default()`. Nothing is validated here; `params::build_single`
//! and `params::build_multiple` check combinations when the query is turned
//! into parameters. The structs deserialize from snake_case JSON so test
//! vectors can describe queries directly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which publish state of a story to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    Published,
    Draft,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Version::Published => "published",
            Version::Draft => "draft",
        }
    }
}

/// A relation to expand inline: `component.field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRelation {
    pub component: String,
    pub field: String,
}

impl ResolveRelation {
    pub fn new(component: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for ResolveRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.field)
    }
}

/// Comparison applied by a `FilterQuery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperation {
    Is,
    In,
    NotIn,
    Like,
    NotLike,
    InArray,
    AllInArray,
    GtDate,
    LtDate,
    GtInt,
    LtInt,
    GtFloat,
    LtFloat,
}

impl FilterOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperation::Is => "is",
            FilterOperation::In => "in",
            FilterOperation::NotIn => "not_in",
            FilterOperation::Like => "like",
            FilterOperation::NotLike => "not_like",
            FilterOperation::InArray => "in_array",
            FilterOperation::AllInArray => "all_in_array",
            FilterOperation::GtDate => "gt_date",
            FilterOperation::LtDate => "lt_date",
            FilterOperation::GtInt => "gt_int",
            FilterOperation::LtInt => "lt_int",
            FilterOperation::GtFloat => "gt_float",
            FilterOperation::LtFloat => "lt_float",
        }
    }
}

/// One `filter_query[attribute][operation]=value` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterQuery {
    pub attribute: String,
    pub operation: FilterOperation,
    pub value: String,
}

impl FilterQuery {
    pub fn new(
        attribute: impl Into<String>,
        operation: FilterOperation,
        value: impl Into<String>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operation,
            value: value.into(),
        }
    }

    pub fn key(&self) -> String {
        format!("filter_query[{}][{}]", self.attribute, self.operation.as_str())
    }
}

/// Field a listing is sorted on. Content fields live under `content.`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Attribute(String),
    Content(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// How the delivery API compares sort values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    String,
    Int,
    Float,
}

impl SortType {
    pub fn as_str(self) -> &'static str {
        match self {
            SortType::String => "string",
            SortType::Int => "int",
            SortType::Float => "float",
        }
    }
}

/// Rendered as `field[:order][:type]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub field: SortField,
    #[serde(default)]
    pub order: Option<SortOrder>,
    #[serde(default, rename = "type")]
    pub sort_type: Option<SortType>,
}

impl SortBy {
    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            field: SortField::Attribute(name.into()),
            order: None,
            sort_type: None,
        }
    }

    pub fn content(name: impl Into<String>) -> Self {
        Self {
            field: SortField::Content(name.into()),
            order: None,
            sort_type: None,
        }
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn sort_type(mut self, sort_type: SortType) -> Self {
        self.sort_type = Some(sort_type);
        self
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            SortField::Attribute(name) => write!(f, "{name}")?,
            SortField::Content(name) => write!(f, "content.{name}")?,
        }
        if let Some(order) = self.order {
            write!(f, ":{}", order.as_str())?;
        }
        if let Some(sort_type) = self.sort_type {
            write!(f, ":{}", sort_type.as_str())?;
        }
        Ok(())
    }
}

/// Options for fetching one story. Exactly one of `full_slug`, `id`, `uuid`
/// must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleLookup {
    pub full_slug: Option<String>,
    pub id: Option<String>,
    pub uuid: Option<String>,
    pub version: Option<Version>,
    pub resolve_links: Option<bool>,
    pub resolve_relations: Option<Vec<ResolveRelation>>,
    pub from_release: Option<String>,
    pub language: Option<String>,
    pub fallback_lang: Option<String>,
    /// Send the request without refreshing or attaching the cache version.
    pub skip_cache_version: bool,
}

impl SingleLookup {
    pub fn by_slug(full_slug: impl Into<String>) -> Self {
        Self {
            full_slug: Some(full_slug.into()),
            ..Default::default()
        }
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn by_uuid(uuid: impl Into<String>) -> Self {
        Self {
            uuid: Some(uuid.into()),
            ..Default::default()
        }
    }
}

/// Options for listing stories. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiLookup {
    pub starts_with: Option<String>,
    pub by_uuids: Option<Vec<String>>,
    pub by_uuids_ordered: Option<Vec<String>>,
    pub excluding_ids: Option<Vec<String>>,
    pub excluding_fields: Option<Vec<String>>,
    pub with_tag: Option<Vec<String>>,
    pub search_term: Option<String>,
    pub filter_queries: Vec<FilterQuery>,
    pub sort_by: Option<SortBy>,
    pub is_startpage: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub language: Option<String>,
    pub fallback_lang: Option<String>,
    pub version: Option<Version>,
    pub resolve_links: Option<bool>,
    pub resolve_relations: Option<Vec<ResolveRelation>>,
    pub from_release: Option<String>,
    pub skip_cache_version: bool,
}
