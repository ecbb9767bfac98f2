use crate::config::ServiceSettings;
use crate::domain::ports::LinkStore;
use crate::shortener::codes;
use crate::shortener::store::LocalLinkStore;
use crate::utils::error::{Result, UnitError};
use crate::utils::retry::Backoff;
use crate::utils::validation;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

const INVALID_JSON: &str = "Invalid JSON data in the request body.";
const INTERNAL_ERROR: &str = "An internal server error occurred.";
const MAX_PATH_ATTEMPTS: usize = 100;

/// Shared state of the shortener service.
pub struct AppState {
    pub settings: ServiceSettings,
    pub store: Arc<dyn LinkStore>,
    pub backoff: Backoff,
}

impl AppState {
    pub fn new(settings: ServiceSettings, store: Arc<dyn LinkStore>) -> Arc<Self> {
        Arc::new(Self {
            settings,
            store,
            backoff: Backoff::default(),
        })
    }

    /// Picks the file store when `STORE_PATH` is set, memory otherwise.
    pub fn from_settings(settings: ServiceSettings) -> Result<Arc<Self>> {
        let store: Arc<dyn LinkStore> = match &settings.store_path {
            Some(path) => Arc::new(LocalLinkStore::open(path)?),
            None => {
                tracing::warn!("STORE_PATH not set, links are kept in memory only");
                Arc::new(LocalLinkStore::in_memory())
            }
        };
        Ok(Self::new(settings, store))
    }

    pub fn full_url(&self, path: &str) -> String {
        format!(
            "{}://{}/{}",
            self.settings.protocol, self.settings.service_domain, path
        )
    }

    async fn unique_path(&self) -> Result<String> {
        for _ in 0..MAX_PATH_ATTEMPTS {
            let candidate = codes::random_path(self.settings.link_length);
            if !self.store.path_exists(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!("Short path {} taken, drawing again", candidate);
        }
        Err(UnitError::StoreError {
            message: format!(
                "no free short path of length {} after {} attempts",
                self.settings.link_length, MAX_PATH_ATTEMPTS
            ),
        })
    }

    /// Existing path for `long_url`, or a fresh one.
    async fn shorten(&self, long_url: &str) -> Result<String> {
        if let Some(existing) = self.store.find_path_by_long_url(long_url).await? {
            return Ok(existing);
        }

        let path = self.unique_path().await?;
        match self.store.insert_mapping(&path, long_url).await {
            Ok(record) => Ok(record.short_url_path),
            // a concurrent request may have stored this URL first
            Err(UnitError::DuplicateLinkError { key, .. }) if key == "long_url" => self
                .store
                .find_path_by_long_url(long_url)
                .await?
                .ok_or_else(|| UnitError::StoreError {
                    message: format!("mapping for {} vanished", long_url),
                }),
            Err(e) => Err(e),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generate_short_url", post(generate_short_url))
        .route("/:short_url_path", get(redirect_to_original_url))
        .route("/get_long_url/:short_url_path", get(get_long_url))
        .route("/count/:short_url_path", get(get_short_url_visits))
        .with_state(state)
}

#[derive(Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn bad_request(text: &str) -> Response {
    (StatusCode::BAD_REQUEST, text.to_string()).into_response()
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR).into_response()
}

fn validation_errors(errors: Vec<FieldError>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
}

/// Pulls a valid `long_url` out of the request body, or builds the 400 response.
fn parse_long_url(body: &[u8]) -> std::result::Result<String, Response> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| bad_request(INVALID_JSON))?;

    let Value::Object(fields) = payload else {
        return Err(validation_errors(vec![FieldError {
            field: "body".to_string(),
            message: "expected a JSON object".to_string(),
        }]));
    };

    let long_url = match fields.get("long_url") {
        None | Some(Value::Null) => return Err(bad_request("long_url parameter was not specified")),
        Some(Value::String(s)) if s.is_empty() => {
            return Err(bad_request("long_url parameter was not specified"))
        }
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(validation_errors(vec![FieldError {
                field: "long_url".to_string(),
                message: "URL input should be a string".to_string(),
            }]))
        }
    };

    if let Err(UnitError::InvalidConfigValueError { field, reason, .. }) =
        validation::validate_url("long_url", &long_url)
    {
        return Err(validation_errors(vec![FieldError {
            field,
            message: reason,
        }]));
    }

    Ok(long_url)
}

async fn generate_short_url(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let long_url = match parse_long_url(&body) {
        Ok(url) => url,
        Err(response) => return response,
    };

    let app: &AppState = &state;
    let url = long_url.as_str();
    match state
        .backoff
        .retry("generate_short_url", move || app.shorten(url))
        .await
    {
        Ok(path) => Json(json!({ "short_url": state.full_url(&path) })).into_response(),
        Err(_) => internal_error(),
    }
}

async fn redirect_to_original_url(
    State(state): State<Arc<AppState>>,
    Path(short_url_path): Path<String>,
) -> Response {
    let long_url = match state.store.find_long_url_by_path(&short_url_path).await {
        Ok(Some(url)) => url,
        Ok(None) => return bad_request("urls were not found"),
        Err(e) => {
            tracing::error!("Lookup of {} failed: {}", short_url_path, e);
            return internal_error();
        }
    };

    if let Err(e) = state.store.increment_visits(&short_url_path).await {
        tracing::error!("Visit counter for {} not updated: {}", short_url_path, e);
    }

    (StatusCode::FOUND, [(header::LOCATION, long_url)]).into_response()
}

async fn get_long_url(
    State(state): State<Arc<AppState>>,
    Path(short_url_path): Path<String>,
) -> Response {
    let store = &state.store;
    let path = short_url_path.as_str();
    match state
        .backoff
        .retry("get_long_url", move || store.find_long_url_by_path(path))
        .await
    {
        Ok(Some(long_url)) => Json(json!({ "long_url": long_url })).into_response(),
        Ok(None) => bad_request("long url doesn't exist"),
        Err(_) => internal_error(),
    }
}

async fn get_short_url_visits(
    State(state): State<Arc<AppState>>,
    Path(short_url_path): Path<String>,
) -> Response {
    let store = &state.store;
    let path = short_url_path.as_str();
    match state
        .backoff
        .retry("get_short_url_visits", move || store.visits(path))
        .await
    {
        // unknown paths report a null count
        Ok(visits) => Json(json!({ "visits": visits })).into_response(),
        Err(_) => internal_error(),
    }
}
