use async_trait::async_trait;
use reqwest::{redirect, StatusCode};
use serde_json::{json, Value};
use shortbox::core::LinkStore;
use shortbox::domain::model::LinkRecord;
use shortbox::shortener::{build_router, AppState, LocalLinkStore};
use shortbox::utils::retry::Backoff;
use shortbox::{ServiceSettings, UnitError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Store double whose every operation fails, counting redirect lookups.
#[derive(Default)]
struct FailingStore {
    lookups: AtomicUsize,
}

fn unavailable() -> UnitError {
    UnitError::StoreError {
        message: "store unavailable".to_string(),
    }
}

#[async_trait]
impl LinkStore for FailingStore {
    async fn insert_mapping(&self, _: &str, _: &str) -> shortbox::Result<LinkRecord> {
        Err(unavailable())
    }

    async fn path_exists(&self, _: &str) -> shortbox::Result<bool> {
        Err(unavailable())
    }

    async fn find_path_by_long_url(&self, _: &str) -> shortbox::Result<Option<String>> {
        Err(unavailable())
    }

    async fn find_long_url_by_path(&self, _: &str) -> shortbox::Result<Option<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Err(unavailable())
    }

    async fn increment_visits(&self, _: &str) -> shortbox::Result<()> {
        Err(unavailable())
    }

    async fn visits(&self, _: &str) -> shortbox::Result<Option<u64>> {
        Err(unavailable())
    }
}

/// Starts the service on a random local port and returns its base URL.
async fn start_server() -> String {
    serve_with(Arc::new(LocalLinkStore::in_memory()), Backoff::default()).await
}

async fn serve_with(store: Arc<dyn LinkStore>, backoff: Backoff) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let settings = ServiceSettings {
        protocol: "http".to_string(),
        service_domain: addr.to_string(),
        api_port: addr.port(),
        link_length: 5,
        store_path: None,
    };
    let state = Arc::new(AppState {
        settings,
        store,
        backoff,
    });
    let app = build_router(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap()
}

async fn shorten(base: &str, long_url: &str) -> String {
    let response = client()
        .post(format!("{base}/generate_short_url"))
        .json(&json!({ "long_url": long_url }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    body["short_url"].as_str().unwrap().to_string()
}

fn path_of(short_url: &str) -> String {
    short_url.rsplit('/').next().unwrap().to_string()
}

#[tokio::test]
async fn test_generate_returns_short_url_on_service_domain() {
    let base = start_server().await;

    let short_url = shorten(&base, "https://www.rust-lang.org/learn").await;

    assert!(short_url.starts_with(&format!("{base}/")));
    let path = path_of(&short_url);
    assert_eq!(path.len(), 5);
    assert!(path.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[tokio::test]
async fn test_generate_is_idempotent_per_long_url() {
    let base = start_server().await;

    let first = shorten(&base, "https://example.com/a").await;
    let again = shorten(&base, "https://example.com/a").await;
    let other = shorten(&base, "https://example.com/b").await;

    assert_eq!(first, again);
    assert_ne!(first, other);
}

#[tokio::test]
async fn test_redirect_counts_visits() {
    let base = start_server().await;
    let path = path_of(&shorten(&base, "https://example.com/target").await);

    for _ in 0..3 {
        let response = client().get(format!("{base}/{path}")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()["location"].to_str().unwrap(),
            "https://example.com/target"
        );
    }

    let count: Value = client()
        .get(format!("{base}/count/{path}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count, json!({ "visits": 3 }));

    let long: Value = client()
        .get(format!("{base}/get_long_url/{path}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(long, json!({ "long_url": "https://example.com/target" }));
}

#[tokio::test]
async fn test_unknown_paths_are_bad_requests() {
    let base = start_server().await;

    let cases = [
        ("/zzzzz", "urls were not found"),
        ("/get_long_url/zzzzz", "long url doesn't exist"),
    ];

    for (route, message) in cases {
        let response = client().get(format!("{base}{route}")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{route}");
        assert_eq!(response.text().await.unwrap(), message);
    }
}

#[tokio::test]
async fn test_count_of_unknown_path_is_null() {
    let base = start_server().await;

    let response = client()
        .get(format!("{base}/count/zzzzz"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "visits": null }));
}

#[tokio::test]
async fn test_store_failures_are_internal_errors() {
    let store = Arc::new(FailingStore::default());
    let backoff = Backoff {
        start: Duration::from_millis(1),
        factor: 2,
        border: Duration::from_millis(8),
    };
    let base = serve_with(store.clone(), backoff).await;

    let response = client()
        .post(format!("{base}/generate_short_url"))
        .json(&json!({ "long_url": "https://example.com/a" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.text().await.unwrap(),
        "An internal server error occurred."
    );

    for route in ["/get_long_url/abc12", "/count/abc12"] {
        let response = client().get(format!("{base}{route}")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{route}");
        assert_eq!(
            response.text().await.unwrap(),
            "An internal server error occurred."
        );
    }

    // get_long_url retried: 1ms, 2ms, 4ms, then gave up at 8ms
    assert_eq!(store.lookups.load(Ordering::SeqCst), 4);

    let response = client().get(format!("{base}/abc12")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.text().await.unwrap(),
        "An internal server error occurred."
    );

    // the redirect looks up once and never retries
    assert_eq!(store.lookups.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_generate_rejects_bad_input() {
    let base = start_server().await;
    let url = format!("{base}/generate_short_url");

    let response = client()
        .post(&url)
        .header("content-type", "application/json")
        .body("{broken")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await.unwrap(),
        "Invalid JSON data in the request body."
    );

    let response = client().post(&url).json(&json!({})).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await.unwrap(),
        "long_url parameter was not specified"
    );

    let response = client()
        .post(&url)
        .json(&json!({ "long_url": "not a url" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["errors"][0]["field"], "long_url");
}
