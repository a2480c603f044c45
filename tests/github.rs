mod common;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use base64::Engine;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use info_gpt::config::GithubConfig;
use info_gpt::connector_github::{GithubClient, Repository};
use info_gpt::ingest::sync_github;
use info_gpt_core::chunk::ChunkConfig;

#[derive(Default)]
struct FakeGithub {
    base: OnceLock<String>,
    repo_pages: AtomicUsize,
    blobs: AtomicUsize,
}

impl FakeGithub {
    fn blob_url(&self, sha: &str) -> String {
        format!("{}/blobs/{}", self.base.get().map(String::as_str).unwrap_or(""), sha)
    }
}

async fn repos(
    State(fake): State<Arc<FakeGithub>>,
    Path(org): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    fake.repo_pages.fetch_add(1, Ordering::SeqCst);
    assert_eq!(org, "acme");
    assert_eq!(
        headers.get("accept").and_then(|v| v.to_str().ok()),
        Some("application/vnd.github.v3+json")
    );
    assert_eq!(
        headers.get("authorization").and_then(|v| v.to_str().ok()),
        Some("Bearer ghp_test")
    );
    assert_eq!(params.get("per_page").map(String::as_str), Some("100"));

    match params.get("page").map(String::as_str) {
        Some("1") => Json(json!([
            {"name": "api", "default_branch": "main", "archived": false},
            {"name": "legacy", "default_branch": "master", "archived": true},
            {"name": "broken-tree", "default_branch": "main", "archived": false},
            {"name": "broken-file", "default_branch": "main", "archived": false}
        ])),
        Some("2") => Json(json!([
            {"name": "policies", "default_branch": "main", "archived": false}
        ])),
        _ => Json(json!([])),
    }
}

fn blob(fake: &FakeGithub, path: &str, sha: &str) -> serde_json::Value {
    json!({"path": path, "mode": "100644", "type": "blob", "sha": sha, "url": fake.blob_url(sha)})
}

async fn tree(
    State(fake): State<Arc<FakeGithub>>,
    Path((org, repo, branch)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    assert_eq!(org, "acme");
    assert_eq!(params.get("recursive").map(String::as_str), Some("1"));

    let entries = match (repo.as_str(), branch.as_str()) {
        ("api", "main") => json!([
            blob(&fake, "README.md", "readme"),
            blob(&fake, "LICENSE.md", "license"),
            blob(&fake, ".github/PULL_REQUEST_TEMPLATE.md", "prt"),
            blob(&fake, ".github/workflows/ci.yml", "ci"),
            blob(&fake, "src/main.rs", "main"),
            {"path": "docs", "mode": "040000", "type": "tree", "sha": "d"},
            blob(&fake, "docs/setup.md", "setup")
        ]),
        ("broken-file", "main") => json!([blob(&fake, "README.md", "missing")]),
        ("policies", "main") => json!([blob(&fake, "CONTRIBUTING.md", "contrib")]),
        _ => return (StatusCode::NOT_FOUND, "Not Found").into_response(),
    };
    Json(json!({"sha": branch, "tree": entries, "truncated": false})).into_response()
}

async fn blob_content(
    State(fake): State<Arc<FakeGithub>>,
    Path(sha): Path<String>,
) -> axum::response::Response {
    fake.blobs.fetch_add(1, Ordering::SeqCst);
    let text = match sha.as_str() {
        "readme" => "# API\n\nDeploy with `make deploy`.\n",
        "setup" => "Ask IT for VPN credentials before cloning.\n",
        _ => return (StatusCode::INTERNAL_SERVER_ERROR, "server error").into_response(),
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(text);
    // The API wraps base64 content at 60 columns.
    let wrapped = encoded
        .as_bytes()
        .chunks(60)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect::<Vec<_>>()
        .join("\n");
    Json(json!({
        "sha": sha,
        "size": text.len(),
        "url": fake.blob_url(&sha),
        "content": wrapped,
        "encoding": "base64"
    }))
    .into_response()
}

async fn fake_github() -> (String, Arc<FakeGithub>) {
    let fake = Arc::new(FakeGithub::default());
    let router = Router::new()
        .route("/orgs/{org}/repos", get(repos))
        .route("/repos/{org}/{repo}/git/trees/{branch}", get(tree))
        .route("/blobs/{sha}", get(blob_content))
        .with_state(fake.clone());
    let base = common::spawn(router).await;
    let _ = fake.base.set(base.clone());
    (base, fake)
}

fn client(api_url: &str) -> GithubClient {
    let config = GithubConfig {
        api_url: api_url.to_string(),
        max_concurrent_fetches: 2,
        ..GithubConfig::default()
    };
    GithubClient::new(&config, "acme", "ghp_test").unwrap()
}

fn repo(name: &str) -> Repository {
    Repository {
        name: name.to_string(),
        default_branch: "main".to_string(),
        archived: false,
    }
}

#[tokio::test]
async fn test_list_repositories_reports_archived() {
    let (base, _fake) = fake_github().await;
    let repos = client(&base).list_repositories(1).await.unwrap();
    assert_eq!(repos.len(), 4);
    assert!(repos.iter().any(|r| r.name == "legacy" && r.archived));
    assert!(client(&base).list_repositories(3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_files_applies_extension_and_exclusions() {
    let (base, _fake) = fake_github().await;
    let files = client(&base).list_files(&repo("api")).await.unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["README.md", "docs/setup.md"]);
}

#[tokio::test]
async fn test_read_file_decodes_wrapped_base64() {
    let (base, fake) = fake_github().await;
    let file = client(&base)
        .read_file(&fake.blob_url("readme"))
        .await
        .unwrap();
    assert_eq!(file.content, "# API\n\nDeploy with `make deploy`.\n");
    assert_eq!(file.size, file.content.len() as u64);
    assert!(file.url.ends_with("/blobs/readme"));
}

#[tokio::test]
async fn test_scrape_repository_builds_documents() {
    let (base, _fake) = fake_github().await;
    let docs = client(&base).scrape_repository(&repo("api")).await.unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].title.as_deref(), Some("api/README.md"));
    assert!(docs[0].source.ends_with("/blobs/readme"));
    assert_eq!(docs[1].title.as_deref(), Some("api/docs/setup.md"));
}

#[tokio::test]
async fn test_sync_github_failure_policy() {
    let (base, fake) = fake_github().await;
    let services = common::services(common::test_config(), Default::default());
    let chunking = ChunkConfig::new(1000, 20).unwrap();

    let report = sync_github(&services.vectors, &client(&base), &chunking, None, false)
        .await
        .unwrap();

    // Pages 1 and 2 have repositories, page 3 is empty and ends the walk.
    assert_eq!(fake.repo_pages.load(Ordering::SeqCst), 3);
    assert_eq!(report.scraped, 1);
    // legacy (archived), broken-tree (404 tree), policies (no matching files)
    assert_eq!(report.skipped, 3);
    // broken-file (blob download failed)
    assert_eq!(report.failed, 1);
    assert_eq!(report.documents, 2);
    assert_eq!(services.vectors.count().await.unwrap(), 2);

    let hits = services.retriever.retrieve("deploy").await.unwrap();
    assert!(hits[0].source.ends_with("/blobs/readme"));
}

#[tokio::test]
async fn test_sync_github_max_repos() {
    let (base, fake) = fake_github().await;
    let services = common::services(common::test_config(), Default::default());
    let chunking = ChunkConfig::new(1000, 20).unwrap();

    let report = sync_github(&services.vectors, &client(&base), &chunking, Some(1), false)
        .await
        .unwrap();
    assert_eq!(report.scraped, 1);
    assert_eq!(fake.repo_pages.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_repository_listing_failure_ends_sync() {
    let router = Router::new().route(
        "/orgs/{org}/repos",
        get(|| async { (StatusCode::FORBIDDEN, "rate limited") }),
    );
    let base = common::spawn(router).await;
    let services = common::services(common::test_config(), Default::default());
    let chunking = ChunkConfig::new(1000, 20).unwrap();

    let err = sync_github(&services.vectors, &client(&base), &chunking, None, false)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("acme"));
}

#[derive(Default)]
struct SlowBlobs {
    base: OnceLock<String>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

const SLOW_FILES: usize = 20;

async fn slow_tree(State(fake): State<Arc<SlowBlobs>>) -> Json<serde_json::Value> {
    let base = fake.base.get().cloned().unwrap_or_default();
    let entries: Vec<serde_json::Value> = (0..SLOW_FILES)
        .map(|n| {
            json!({
                "path": format!("docs/page-{:02}.md", n),
                "type": "blob",
                "url": format!("{}/slow/{}", base, n)
            })
        })
        .collect();
    Json(json!({"tree": entries}))
}

async fn slow_blob(
    State(fake): State<Arc<SlowBlobs>>,
    Path(n): Path<usize>,
) -> Json<serde_json::Value> {
    let now = fake.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    fake.peak.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    fake.in_flight.fetch_sub(1, Ordering::SeqCst);

    let text = format!("Page {}", n);
    Json(json!({
        "size": text.len(),
        "url": format!("{}/slow/{}", fake.base.get().cloned().unwrap_or_default(), n),
        "content": base64::engine::general_purpose::STANDARD.encode(&text)
    }))
}

#[tokio::test]
async fn test_file_downloads_respect_concurrency_cap() {
    let fake = Arc::new(SlowBlobs::default());
    let router = Router::new()
        .route("/repos/acme/{repo}/git/trees/{branch}", get(slow_tree))
        .route("/slow/{n}", get(slow_blob))
        .with_state(fake.clone());
    let base = common::spawn(router).await;
    let _ = fake.base.set(base.clone());

    let config = GithubConfig {
        api_url: base,
        max_concurrent_fetches: 3,
        ..GithubConfig::default()
    };
    let client = GithubClient::new(&config, "acme", "ghp_test").unwrap();

    let docs = client.scrape_repository(&repo("handbook")).await.unwrap();

    assert_eq!(docs.len(), SLOW_FILES);
    assert_eq!(docs[7].content, "Page 7");
    let peak = fake.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight downloads: {}", peak);
    assert!(peak > 1, "downloads never overlapped");
}
