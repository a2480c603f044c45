mod common;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use info_gpt::config::ConfluenceCredentials;
use info_gpt::connector_confluence::{ConfluenceClient, Space};
use info_gpt::ingest::sync_confluence;
use info_gpt_core::chunk::ChunkConfig;

#[derive(Default)]
struct Hits {
    spaces: AtomicUsize,
    pages: AtomicUsize,
    content: AtomicUsize,
}

async fn spaces(
    State(hits): State<Arc<Hits>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    hits.spaces.fetch_add(1, Ordering::SeqCst);
    assert_eq!(params.get("type").map(String::as_str), Some("global"));
    match params.get("cursor").map(String::as_str) {
        None => Json(json!({
            "results": [
                {"id": "1", "key": "ENG", "name": "Engineering"},
                {"id": "2", "key": "ARC", "name": "Archive"}
            ],
            "_links": {"next": "/wiki/api/v2/spaces?cursor=second&limit=100"}
        })),
        Some(_) => Json(json!({
            "results": [{"id": 3, "key": "OPS", "name": "Operations"}],
            "_links": {}
        })),
    }
}

fn page(id: u32, title: &str, body: Option<&str>) -> serde_json::Value {
    let mut page = json!({
        "id": id.to_string(),
        "title": title,
        "_links": {"webui": format!("/spaces/ENG/pages/{}", id)}
    });
    if let Some(body) = body {
        page["body"] = json!({"storage": {"value": body, "representation": "storage"}});
    }
    page
}

async fn pages(
    State(hits): State<Arc<Hits>>,
    Path(space_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    hits.pages.fetch_add(1, Ordering::SeqCst);
    if space_id != "1" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    assert_eq!(params.get("body-format").map(String::as_str), Some("storage"));
    assert_eq!(params.get("status").map(String::as_str), Some("current"));

    let next = |cursor: &str| format!("/wiki/api/v2/spaces/1/pages?cursor={}", cursor);
    let body = match params.get("cursor").map(String::as_str) {
        None => json!({
            "results": [
                page(101, "VPN", Some("<p>Request <b>VPN</b> access from IT.</p>")),
                page(102, "Deploys", Some("<h2>Deploy</h2><p>Run the release pipeline.</p>"))
            ],
            "_links": {"next": next("p2")}
        }),
        Some("p2") => json!({
            "results": [page(103, "Billing", None)],
            "_links": {"next": next("p3")}
        }),
        Some(_) => json!({
            "results": [page(104, "Holidays", Some("<p>See the HR portal.</p>"))],
            "_links": {"base": "ignored"}
        }),
    };
    Json(body).into_response()
}

async fn content(
    State(hits): State<Arc<Hits>>,
    Path(page_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    hits.content.fetch_add(1, Ordering::SeqCst);
    assert_eq!(params.get("expand").map(String::as_str), Some("body.storage"));
    Json(json!({
        "id": page_id,
        "body": {"storage": {"value": "<p>Billing questions go to finance.</p>"}}
    }))
}

async fn fake_confluence() -> (String, Arc<Hits>) {
    let hits = Arc::new(Hits::default());
    let router = Router::new()
        .route("/wiki/api/v2/spaces", get(spaces))
        .route("/wiki/api/v2/spaces/{id}/pages", get(pages))
        .route("/wiki/rest/api/content/{id}", get(content))
        .with_state(hits.clone());
    let base = common::spawn(router).await;
    (format!("{}/wiki/", base), hits)
}

fn client(base_url: &str) -> ConfluenceClient {
    ConfluenceClient::new(&ConfluenceCredentials {
        base_url: base_url.to_string(),
        username: "bot@acme.io".to_string(),
        password: "token".to_string(),
    })
    .unwrap()
}

#[tokio::test]
async fn test_list_spaces_follows_cursor_and_excludes() {
    let (base_url, hits) = fake_confluence().await;
    let spaces = client(&base_url)
        .list_spaces(&["Archive".to_string()])
        .await
        .unwrap();

    let names: Vec<&str> = spaces.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Engineering", "Operations"]);
    assert_eq!(spaces[1].id, "3");
    assert_eq!(hits.spaces.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_scrape_space_paginates_until_no_next() {
    let (base_url, hits) = fake_confluence().await;
    let space = Space {
        id: "1".to_string(),
        name: "Engineering".to_string(),
        key: Some("ENG".to_string()),
    };

    let docs = client(&base_url).scrape_space(&space).await.unwrap();

    // Three listing pages, no request for a cursor past the last one.
    assert_eq!(hits.pages.load(Ordering::SeqCst), 3);
    assert_eq!(hits.content.load(Ordering::SeqCst), 1);
    assert_eq!(docs.len(), 4);

    assert_eq!(docs[0].content, "Request VPN access from IT.");
    assert_eq!(docs[0].source, format!("{}spaces/ENG/pages/101", base_url));
    assert_eq!(docs[0].title.as_deref(), Some("VPN"));
    assert_eq!(docs[1].content, "Deploy Run the release pipeline.");
    assert_eq!(docs[2].content, "Billing questions go to finance.");
}

#[tokio::test]
async fn test_failed_space_does_not_stop_sync() {
    let (base_url, _hits) = fake_confluence().await;
    let services = common::services(common::test_config(), Default::default());
    let chunking = ChunkConfig::new(600, 20).unwrap();

    let report = sync_confluence(
        &services.vectors,
        &client(&base_url),
        &["Archive".to_string()],
        &chunking,
        false,
    )
    .await
    .unwrap();

    assert_eq!(report.scraped, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.documents, 4);
    assert_eq!(report.records, 4);
    assert_eq!(services.vectors.count().await.unwrap(), 4);

    let hits = services.retriever.retrieve("vpn").await.unwrap();
    assert!(hits[0].source.ends_with("/spaces/ENG/pages/101"));
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let (base_url, _hits) = fake_confluence().await;
    let services = common::services(common::test_config(), Default::default());
    let chunking = ChunkConfig::new(600, 20).unwrap();

    let report = sync_confluence(&services.vectors, &client(&base_url), &[], &chunking, true)
        .await
        .unwrap();

    assert_eq!(report.documents, 4);
    assert_eq!(report.chunks, 4);
    assert_eq!(report.records, 0);
    assert_eq!(services.vectors.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_space_listing_failure_is_error() {
    let router = Router::new().route(
        "/wiki/api/v2/spaces",
        get(|| async { (StatusCode::UNAUTHORIZED, "bad credentials") }),
    );
    let base = common::spawn(router).await;
    let services = common::services(common::test_config(), Default::default());
    let chunking = ChunkConfig::new(600, 20).unwrap();

    let err = sync_confluence(
        &services.vectors,
        &client(&format!("{}/wiki/", base)),
        &[],
        &chunking,
        false,
    )
    .await
    .unwrap_err();
    assert!(format!("{:#}", err).contains("401"));
}
