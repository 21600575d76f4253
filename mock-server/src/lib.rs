//! In-memory imitation of the content-delivery API.
//!
//! Serves `/v1/cdn/spaces/me`, `/v1/cdn/stories` and
//! `/v1/cdn/stories/{identifier}` from a `MockSpace`, checks the access
//! token, and records every query it receives so tests can assert on the
//! exact parameters a client sent.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_TOKEN: &str = "mock-token";
const DEFAULT_PER_PAGE: usize = 25;

/// One request as seen by the server.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub path: String,
    pub query: HashMap<String, String>,
}

#[derive(Debug)]
pub struct MockSpace {
    pub token: String,
    pub version: u64,
    pub stories: Vec<Value>,
    pub requests: Vec<RecordedRequest>,
    /// Old full slug → new full slug, answered with 301.
    pub moved: HashMap<String, String>,
}

impl MockSpace {
    pub fn new(token: &str, version: u64) -> Self {
        Self {
            token: token.to_string(),
            version,
            stories: Vec::new(),
            requests: Vec::new(),
            moved: HashMap::new(),
        }
    }

    /// Add a story with a fresh id and uuid, returning its uuid.
    pub fn add_story(&mut self, name: &str, full_slug: &str, tags: &[&str], content: Value) -> String {
        let id = self.stories.len() as u64 + 1;
        let uuid = Uuid::new_v4().to_string();
        let slug = full_slug.rsplit('/').next().unwrap_or(full_slug);
        self.stories.push(json!({
            "id": id,
            "uuid": uuid,
            "name": name,
            "slug": slug,
            "full_slug": full_slug,
            "content": content,
            "tag_list": tags,
            "is_startpage": slug.is_empty() || slug == "home",
            "created_at": "2024-01-01T00:00:00.000Z",
            "published_at": "2024-01-02T00:00:00.000Z",
            "position": id as i64 * -10,
            "lang": "default",
        }));
        uuid
    }

    /// Answer requests for `from` with a permanent redirect to `to`.
    pub fn move_story(&mut self, from: &str, to: &str) {
        self.moved.insert(from.to_string(), to.to_string());
    }

    /// Simulate a publish: the space version moves forward.
    pub fn publish(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn record(&mut self, path: String, query: &HashMap<String, String>) {
        log::debug!("GET /v1/cdn/{path} ({} params)", query.len());
        self.requests.push(RecordedRequest {
            path,
            query: query.clone(),
        });
    }

    fn authorize(&self, query: &HashMap<String, String>) -> Result<(), (StatusCode, String)> {
        match query.get("token") {
            Some(token) if *token == self.token => Ok(()),
            _ => Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string())),
        }
    }

    fn find_by_uuid(&self, uuid: &str) -> Option<&Value> {
        self.stories.iter().find(|s| s["uuid"] == uuid)
    }

    /// Stories referenced through `component.field` relations.
    fn rels_for(&self, stories: &[&Value], relations: &str) -> Vec<Value> {
        let mut rels = Vec::new();
        for relation in relations.split(',').filter(|r| !r.is_empty()) {
            let Some((component, field)) = relation.split_once('.') else {
                continue;
            };
            for story in stories {
                let content = &story["content"];
                if content["component"] != component {
                    continue;
                }
                let uuids: Vec<&str> = match &content[field] {
                    Value::String(uuid) => vec![uuid.as_str()],
                    Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                    _ => Vec::new(),
                };
                for uuid in uuids {
                    if let Some(rel) = self.find_by_uuid(uuid) {
                        if !rels.contains(rel) {
                            rels.push(rel.clone());
                        }
                    }
                }
            }
        }
        rels
    }
}

pub type Db = Arc<RwLock<MockSpace>>;

/// A space with a handful of stories under `blog/` plus a start page.
pub fn seeded() -> Db {
    let mut space = MockSpace::new(DEFAULT_TOKEN, 1);
    let author = space.add_story("Ada", "authors/ada", &[], json!({"component": "author"}));
    space.add_story("Home", "home", &["featured"], json!({"component": "page", "title": "Welcome"}));
    space.add_story(
        "First post",
        "blog/first-post",
        &["news"],
        json!({"component": "article", "title": "First", "color": "red", "author": author}),
    );
    space.add_story(
        "Second post",
        "blog/second-post",
        &["news", "featured"],
        json!({"component": "article", "title": "Second", "color": "blue", "author": author}),
    );
    Arc::new(RwLock::new(space))
}

pub fn app(db: Db) -> Router {
    Router::new()
        .route("/v1/cdn/spaces/me", get(get_space))
        .route("/v1/cdn/stories", get(list_stories))
        .route("/v1/cdn/stories/{*identifier}", get(get_story))
        .with_state(db)
}

pub async fn run(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app(db)).await
}

async fn get_space(
    State(db): State<Db>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut space = db.write().await;
    space.record("spaces/me".to_string(), &query);
    space.authorize(&query)?;
    Ok(Json(json!({
        "space": {
            "id": 1,
            "name": "Mock space",
            "domain": "http://localhost/",
            "version": space.version,
            "language_codes": ["de"],
        }
    })))
}

async fn get_story(
    State(db): State<Db>,
    Path(identifier): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, (StatusCode, String)> {
    let mut space = db.write().await;
    space.record(format!("stories/{identifier}"), &query);
    space.authorize(&query)?;

    if let Some(target) = space.moved.get(&identifier) {
        let location = format!("/v1/cdn/stories/{target}");
        return Ok((StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response());
    }

    let by_uuid = query.get("find_by").map(String::as_str) == Some("uuid");
    let story = space.stories.iter().find(|s| {
        if by_uuid {
            s["uuid"] == identifier.as_str()
        } else if let Ok(id) = identifier.parse::<u64>() {
            s["id"] == id
        } else {
            s["full_slug"] == identifier.as_str()
        }
    });
    let story = story.ok_or((
        StatusCode::NOT_FOUND,
        "This record could not be found".to_string(),
    ))?;

    let rels = query
        .get("resolve_relations")
        .map(|r| space.rels_for(&[story], r))
        .unwrap_or_default();
    Ok(Json(json!({
        "story": story,
        "cv": space.version,
        "rels": rels,
        "links": [],
    }))
    .into_response())
}

async fn list_stories(
    State(db): State<Db>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut space = db.write().await;
    space.record("stories".to_string(), &query);
    space.authorize(&query)?;

    let page = parse_page(&query, "page", 1)?;
    let per_page = parse_page(&query, "per_page", DEFAULT_PER_PAGE)?;

    let matching: Vec<&Value> = space
        .stories
        .iter()
        .filter(|s| matches_query(s, &query))
        .collect();
    let total = matching.len();
    let paged: Vec<&Value> = matching
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    let rels = query
        .get("resolve_relations")
        .map(|r| space.rels_for(&paged, r))
        .unwrap_or_default();
    let body = json!({
        "stories": paged,
        "cv": space.version,
        "rels": rels,
        "links": [],
    });
    Ok((
        [("total", total.to_string()), ("per-page", per_page.to_string())],
        Json(body),
    ))
}

fn parse_page(
    query: &HashMap<String, String>,
    key: &str,
    default: usize,
) -> Result<usize, (StatusCode, String)> {
    match query.get(key) {
        None => Ok(default),
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err((StatusCode::UNPROCESSABLE_ENTITY, format!("invalid {key}"))),
        },
    }
}

fn list_param<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<Vec<&'a str>> {
    query.get(key).map(|v| v.split(',').collect())
}

fn matches_query(story: &Value, query: &HashMap<String, String>) -> bool {
    let str_field = |name: &str| story[name].as_str().unwrap_or_default().to_string();

    if let Some(prefix) = query.get("starts_with") {
        if !str_field("full_slug").starts_with(prefix.as_str()) {
            return false;
        }
    }
    if let Some(uuids) = list_param(query, "by_uuids") {
        if !uuids.contains(&str_field("uuid").as_str()) {
            return false;
        }
    }
    if let Some(ids) = list_param(query, "excluding_ids") {
        if ids.contains(&story["id"].to_string().as_str()) {
            return false;
        }
    }
    if let Some(tags) = list_param(query, "with_tag") {
        let story_tags = story["tag_list"].as_array().cloned().unwrap_or_default();
        if !tags.iter().any(|t| story_tags.iter().any(|st| st == *t)) {
            return false;
        }
    }
    if let Some(flag) = query.get("is_startpage") {
        let wanted = flag == "1";
        if story["is_startpage"].as_bool().unwrap_or(false) != wanted {
            return false;
        }
    }
    for (key, value) in query {
        let Some((attribute, operation)) = parse_filter_key(key) else {
            continue;
        };
        let actual = match &story["content"][attribute] {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let keep = match operation {
            "is" => actual == *value,
            "in" => value.split(',').any(|v| v == actual),
            "not_in" => !value.split(',').any(|v| v == actual),
            _ => true,
        };
        if !keep {
            return false;
        }
    }
    true
}

/// `filter_query[attr][op]` → `(attr, op)`.
fn parse_filter_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix("filter_query[")?.strip_suffix(']')?;
    rest.split_once("][")
}
