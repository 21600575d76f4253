//! Translation of typed queries into delivery API paths and query parameters.
//!
//! # Design
//! `build_single` and `build_multiple` are pure functions: they take a whole
//! query and return a finished `(path, ParameterMapping)` pair, or
//! `ApiError::InvalidQuery` before anything touches the network. Parameter
//! names are the delivery API's snake_case names verbatim.

use std::collections::btree_map::{self, BTreeMap};

use crate::error::ApiError;
use crate::query::{MultiLookup, ResolveRelation, SingleLookup, Version};

/// Query parameter name to value. Keys are unique; a later insert replaces
/// the earlier value. Iteration is in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMapping(BTreeMap<String, String>);

impl ParameterMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a ParameterMapping {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Path and parameters for fetching one story.
pub fn build_single(query: &SingleLookup) -> Result<(String, ParameterMapping), ApiError> {
    let identifiers = [
        ("full_slug", query.full_slug.as_deref()),
        ("id", query.id.as_deref()),
        ("uuid", query.uuid.as_deref()),
    ];
    let mut present = identifiers
        .iter()
        .filter_map(|&(name, value)| value.map(|value| (name, value)));

    let (kind, identifier) = match (present.next(), present.next()) {
        (Some(only), None) => only,
        (None, _) => {
            return Err(ApiError::invalid_query(
                "one of full_slug, id or uuid is required",
            ))
        }
        (Some(_), Some(_)) => {
            return Err(ApiError::invalid_query(
                "only one of full_slug, id or uuid may be set",
            ))
        }
    };
    if identifier.trim().is_empty() {
        return Err(ApiError::invalid_query(format!("{kind} is empty")));
    }

    let mut params = ParameterMapping::new();
    if kind == "uuid" {
        params.insert("find_by", "uuid");
    }
    insert_shared(
        &mut params,
        query.version,
        query.resolve_links,
        query.resolve_relations.as_deref(),
        query.from_release.as_deref(),
    )?;
    insert_opt(&mut params, "language", query.language.as_deref());
    insert_opt(&mut params, "fallback_lang", query.fallback_lang.as_deref());

    Ok((format!("stories/{identifier}"), params))
}

/// Path and parameters for listing stories.
pub fn build_multiple(query: &MultiLookup) -> Result<(String, ParameterMapping), ApiError> {
    let mut params = ParameterMapping::new();

    insert_opt(&mut params, "starts_with", query.starts_with.as_deref());
    insert_list(&mut params, "by_uuids", query.by_uuids.as_deref())?;
    insert_list(&mut params, "by_uuids_ordered", query.by_uuids_ordered.as_deref())?;
    insert_list(&mut params, "excluding_ids", query.excluding_ids.as_deref())?;
    insert_list(&mut params, "excluding_fields", query.excluding_fields.as_deref())?;
    insert_list(&mut params, "with_tag", query.with_tag.as_deref())?;
    insert_opt(&mut params, "search_term", query.search_term.as_deref());

    for filter in &query.filter_queries {
        params.insert(filter.key(), filter.value.as_str());
    }
    if let Some(sort) = &query.sort_by {
        params.insert("sort_by", sort.to_string());
    }
    if let Some(is_startpage) = query.is_startpage {
        params.insert("is_startpage", if is_startpage { "1" } else { "0" });
    }
    insert_page(&mut params, "page", query.page)?;
    insert_page(&mut params, "per_page", query.per_page)?;

    insert_shared(
        &mut params,
        query.version,
        query.resolve_links,
        query.resolve_relations.as_deref(),
        query.from_release.as_deref(),
    )?;
    insert_opt(&mut params, "language", query.language.as_deref());
    insert_opt(&mut params, "fallback_lang", query.fallback_lang.as_deref());

    Ok(("stories".to_string(), params))
}

/// Serialize relations as `a.b,c.d,`.
///
/// The trailing comma matches what the upstream SDKs have always sent; the
/// delivery API ignores it.
pub fn resolve_relations_value(relations: &[ResolveRelation]) -> Result<String, ApiError> {
    if relations.is_empty() {
        return Err(ApiError::invalid_query("resolve_relations is empty"));
    }
    Ok(relations.iter().map(|r| format!("{r},")).collect())
}

fn insert_shared(
    params: &mut ParameterMapping,
    version: Option<Version>,
    resolve_links: Option<bool>,
    resolve_relations: Option<&[ResolveRelation]>,
    from_release: Option<&str>,
) -> Result<(), ApiError> {
    if let Some(version) = version {
        params.insert("version", version.as_str());
    }
    if let Some(resolve_links) = resolve_links {
        params.insert("resolve_links", resolve_links.to_string());
    }
    if let Some(relations) = resolve_relations {
        params.insert("resolve_relations", resolve_relations_value(relations)?);
    }
    insert_opt(params, "from_release", from_release);
    Ok(())
}

fn insert_opt(params: &mut ParameterMapping, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        params.insert(key, value);
    }
}

fn insert_list(
    params: &mut ParameterMapping,
    key: &str,
    values: Option<&[String]>,
) -> Result<(), ApiError> {
    match values {
        None => Ok(()),
        Some([]) => Err(ApiError::invalid_query(format!("{key} is empty"))),
        Some(values) => {
            params.insert(key, values.join(","));
            Ok(())
        }
    }
}

fn insert_page(params: &mut ParameterMapping, key: &str, value: Option<u32>) -> Result<(), ApiError> {
    match value {
        None => Ok(()),
        Some(0) => Err(ApiError::invalid_query(format!("{key} must be >= 1"))),
        Some(n) => {
            params.insert(key, n.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FilterOperation, FilterQuery, SortBy, SortOrder, SortType};

    fn mapping(pairs: &[(&str, &str)]) -> ParameterMapping {
        pairs.iter().copied().collect()
    }

    #[test]
    fn single_by_uuid_sets_find_by() {
        let (path, params) = build_single(&SingleLookup::by_uuid("abc")).unwrap();
        assert_eq!(path, "stories/abc");
        assert_eq!(params, mapping(&[("find_by", "uuid")]));
    }

    #[test]
    fn single_by_id_has_no_find_by() {
        let (path, params) = build_single(&SingleLookup::by_id("42")).unwrap();
        assert_eq!(path, "stories/42");
        assert!(!params.contains_key("find_by"));
        assert!(params.is_empty());
    }

    #[test]
    fn single_by_slug_keeps_nested_path() {
        let (path, _) = build_single(&SingleLookup::by_slug("blog/first-post")).unwrap();
        assert_eq!(path, "stories/blog/first-post");
    }

    #[test]
    fn single_rejects_multiple_identifiers() {
        let combos = [
            SingleLookup {
                full_slug: Some("home".into()),
                id: Some("1".into()),
                ..Default::default()
            },
            SingleLookup {
                id: Some("1".into()),
                uuid: Some("abc".into()),
                ..Default::default()
            },
            SingleLookup {
                full_slug: Some("home".into()),
                uuid: Some("abc".into()),
                ..Default::default()
            },
            SingleLookup {
                full_slug: Some("home".into()),
                id: Some("1".into()),
                uuid: Some("abc".into()),
                ..Default::default()
            },
        ];
        for query in &combos {
            let err = build_single(query).unwrap_err();
            assert!(matches!(err, ApiError::InvalidQuery(_)), "{query:?}");
        }
    }

    #[test]
    fn single_rejects_missing_or_empty_identifier() {
        assert!(matches!(
            build_single(&SingleLookup::default()),
            Err(ApiError::InvalidQuery(_))
        ));
        assert!(matches!(
            build_single(&SingleLookup::by_slug("")),
            Err(ApiError::InvalidQuery(_))
        ));
    }

    #[test]
    fn single_maps_optional_fields() {
        let query = SingleLookup {
            version: Some(Version::Draft),
            resolve_links: Some(false),
            resolve_relations: Some(vec![
                ResolveRelation::new("article", "author"),
                ResolveRelation::new("article", "categories"),
            ]),
            from_release: Some("17".into()),
            language: Some("de".into()),
            fallback_lang: Some("en".into()),
            ..SingleLookup::by_slug("home")
        };
        let (_, params) = build_single(&query).unwrap();
        assert_eq!(
            params,
            mapping(&[
                ("version", "draft"),
                ("resolve_links", "false"),
                ("resolve_relations", "article.author,article.categories,"),
                ("from_release", "17"),
                ("language", "de"),
                ("fallback_lang", "en"),
            ])
        );
    }

    #[test]
    fn multiple_page_and_per_page_only() {
        let query = MultiLookup {
            page: Some(2),
            per_page: Some(10),
            ..Default::default()
        };
        let (path, params) = build_multiple(&query).unwrap();
        assert_eq!(path, "stories");
        assert_eq!(params, mapping(&[("page", "2"), ("per_page", "10")]));
    }

    #[test]
    fn multiple_rejects_zero_page() {
        let query = MultiLookup {
            page: Some(0),
            ..Default::default()
        };
        assert!(matches!(build_multiple(&query), Err(ApiError::InvalidQuery(_))));

        let query = MultiLookup {
            per_page: Some(0),
            ..Default::default()
        };
        assert!(matches!(build_multiple(&query), Err(ApiError::InvalidQuery(_))));
    }

    #[test]
    fn startpage_and_resolve_links_render_differently() {
        let (_, params) = build_multiple(&MultiLookup {
            is_startpage: Some(true),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(params.get("is_startpage"), Some("1"));

        let (_, params) = build_multiple(&MultiLookup {
            is_startpage: Some(false),
            resolve_links: Some(true),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(params.get("is_startpage"), Some("0"));
        assert_eq!(params.get("resolve_links"), Some("true"));
    }

    #[test]
    fn multiple_joins_lists() {
        let query = MultiLookup {
            by_uuids: Some(vec!["a".into(), "b".into()]),
            by_uuids_ordered: Some(vec!["c".into()]),
            excluding_ids: Some(vec!["1".into(), "2".into(), "3".into()]),
            excluding_fields: Some(vec!["body".into()]),
            with_tag: Some(vec!["news".into(), "featured".into()]),
            ..Default::default()
        };
        let (_, params) = build_multiple(&query).unwrap();
        assert_eq!(params.get("by_uuids"), Some("a,b"));
        assert_eq!(params.get("by_uuids_ordered"), Some("c"));
        assert_eq!(params.get("excluding_ids"), Some("1,2,3"));
        assert_eq!(params.get("excluding_fields"), Some("body"));
        assert_eq!(params.get("with_tag"), Some("news,featured"));
    }

    #[test]
    fn multiple_rejects_empty_lists() {
        let query = MultiLookup {
            with_tag: Some(Vec::new()),
            ..Default::default()
        };
        assert!(matches!(build_multiple(&query), Err(ApiError::InvalidQuery(_))));

        let query = MultiLookup {
            resolve_relations: Some(Vec::new()),
            ..Default::default()
        };
        assert!(matches!(build_multiple(&query), Err(ApiError::InvalidQuery(_))));
    }

    #[test]
    fn multiple_filters_are_independent_entries() {
        let query = MultiLookup {
            filter_queries: vec![
                FilterQuery::new("color", FilterOperation::In, "red"),
                FilterQuery::new("color", FilterOperation::NotIn, "blue"),
                FilterQuery::new("size", FilterOperation::GtInt, "3"),
            ],
            ..Default::default()
        };
        let (_, params) = build_multiple(&query).unwrap();
        assert_eq!(
            params,
            mapping(&[
                ("filter_query[color][in]", "red"),
                ("filter_query[color][not_in]", "blue"),
                ("filter_query[size][gt_int]", "3"),
            ])
        );
    }

    #[test]
    fn multiple_sort_and_search() {
        let query = MultiLookup {
            sort_by: Some(
                SortBy::content("title")
                    .order(SortOrder::Asc)
                    .sort_type(SortType::String),
            ),
            search_term: Some("rust".into()),
            starts_with: Some("blog/".into()),
            ..Default::default()
        };
        let (_, params) = build_multiple(&query).unwrap();
        assert_eq!(params.get("sort_by"), Some("content.title:asc:string"));
        assert_eq!(params.get("search_term"), Some("rust"));
        assert_eq!(params.get("starts_with"), Some("blog/"));
    }

    #[test]
    fn resolve_relations_keeps_single_trailing_comma() {
        let value = resolve_relations_value(&[ResolveRelation::new("a", "b")]).unwrap();
        assert_eq!(value, "a.b,");
    }

    #[test]
    fn later_insert_overwrites() {
        let mut params = ParameterMapping::new();
        params.insert("page", "1");
        params.insert("page", "3");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("page"), Some("3"));
    }
}
