use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, seeded, Db, DEFAULT_TOKEN};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

async fn send(db: &Db, uri: &str) -> axum::response::Response {
    app(db.clone()).oneshot(get(uri)).await.unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_token_returns_401() {
    let db = seeded();
    let resp = send(&db, "/v1/cdn/stories").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_token_returns_401() {
    let db = seeded();
    let resp = send(&db, "/v1/cdn/spaces/me?token=nope").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- space ---

#[tokio::test]
async fn space_reports_current_version() {
    let db = seeded();
    let resp = send(&db, &format!("/v1/cdn/spaces/me?token={DEFAULT_TOKEN}")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["space"]["version"], 1);

    db.write().await.publish();
    let resp = send(&db, &format!("/v1/cdn/spaces/me?token={DEFAULT_TOKEN}")).await;
    assert_eq!(body_json(resp).await["space"]["version"], 2);
}

// --- single story ---

#[tokio::test]
async fn story_by_full_slug() {
    let db = seeded();
    let resp = send(
        &db,
        &format!("/v1/cdn/stories/blog/first-post?token={DEFAULT_TOKEN}"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["story"]["name"], "First post");
    assert_eq!(body["cv"], 1);
}

#[tokio::test]
async fn story_by_id_and_uuid() {
    let db = seeded();
    let uuid = db.read().await.stories[1]["uuid"].as_str().unwrap().to_string();

    let resp = send(&db, &format!("/v1/cdn/stories/2?token={DEFAULT_TOKEN}")).await;
    assert_eq!(body_json(resp).await["story"]["uuid"], uuid.as_str());

    let resp = send(
        &db,
        &format!("/v1/cdn/stories/{uuid}?token={DEFAULT_TOKEN}&find_by=uuid"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["story"]["id"], 2);
}

#[tokio::test]
async fn uuid_without_find_by_is_not_found() {
    let db = seeded();
    let uuid = db.read().await.stories[1]["uuid"].as_str().unwrap().to_string();
    let resp = send(&db, &format!("/v1/cdn/stories/{uuid}?token={DEFAULT_TOKEN}")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(!body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn story_resolves_relations() {
    let db = seeded();
    let resp = send(
        &db,
        &format!(
            "/v1/cdn/stories/blog/first-post?token={DEFAULT_TOKEN}&resolve_relations=article.author,"
        ),
    )
    .await;
    let body = body_json(resp).await;
    assert_eq!(body["rels"].as_array().unwrap().len(), 1);
    assert_eq!(body["rels"][0]["name"], "Ada");
}

#[tokio::test]
async fn moved_story_answers_301() {
    let db = seeded();
    db.write().await.move_story("old-home", "home");
    let resp = send(&db, &format!("/v1/cdn/stories/old-home?token={DEFAULT_TOKEN}")).await;
    assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(resp.headers()["location"], "/v1/cdn/stories/home");
}

// --- listing ---

#[tokio::test]
async fn list_filters_by_prefix_and_reports_total() {
    let db = seeded();
    let resp = send(
        &db,
        &format!("/v1/cdn/stories?token={DEFAULT_TOKEN}&starts_with=blog/&per_page=1"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["total"], "2");
    let body = body_json(resp).await;
    let stories = body["stories"].as_array().unwrap();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0]["full_slug"], "blog/first-post");
}

#[tokio::test]
async fn list_second_page() {
    let db = seeded();
    let resp = send(
        &db,
        &format!("/v1/cdn/stories?token={DEFAULT_TOKEN}&starts_with=blog/&page=2&per_page=1"),
    )
    .await;
    let body = body_json(resp).await;
    assert_eq!(body["stories"][0]["full_slug"], "blog/second-post");
}

#[tokio::test]
async fn list_with_tag_and_startpage() {
    let db = seeded();
    let resp = send(&db, &format!("/v1/cdn/stories?token={DEFAULT_TOKEN}&with_tag=featured")).await;
    let body = body_json(resp).await;
    assert_eq!(body["stories"].as_array().unwrap().len(), 2);

    let resp = send(&db, &format!("/v1/cdn/stories?token={DEFAULT_TOKEN}&is_startpage=1")).await;
    let body = body_json(resp).await;
    assert_eq!(body["stories"].as_array().unwrap().len(), 1);
    assert_eq!(body["stories"][0]["full_slug"], "home");
}

#[tokio::test]
async fn list_applies_filter_query() {
    let db = seeded();
    let resp = send(
        &db,
        &format!("/v1/cdn/stories?token={DEFAULT_TOKEN}&filter_query%5Bcolor%5D%5Bin%5D=blue"),
    )
    .await;
    let body = body_json(resp).await;
    let stories = body["stories"].as_array().unwrap();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0]["name"], "Second post");
}

#[tokio::test]
async fn list_rejects_zero_page() {
    let db = seeded();
    let resp = send(&db, &format!("/v1/cdn/stories?token={DEFAULT_TOKEN}&page=0")).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- request log ---

#[tokio::test]
async fn requests_are_recorded() {
    let db = seeded();
    send(&db, &format!("/v1/cdn/stories?token={DEFAULT_TOKEN}&cv=1")).await;
    send(&db, "/v1/cdn/stories/home").await;

    let space = db.read().await;
    assert_eq!(space.requests.len(), 2);
    assert_eq!(space.requests[0].path, "stories");
    assert_eq!(space.requests[0].query.get("cv").map(String::as_str), Some("1"));
    assert_eq!(space.requests[1].path, "stories/home");
    assert!(space.requests[1].query.get("token").is_none());
}
