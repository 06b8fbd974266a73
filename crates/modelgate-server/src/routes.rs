//! HTTP routes and handlers

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart, Path,
        Request, State,
    },
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use modelgate_core::{Error, FieldError};
use modelgate_models::{
    AnimalResponse, ArtifactInfo, DepressionRequest, DepressionResponse, Domain, FlightRequest,
    FlightResponse, Gateway, ImageUpload, SearchHit, SearchRequest,
};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CorsConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Multipart field carrying the image
const UPLOAD_FIELD: &str = "file";

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors);
    let body_limit = state.config.server.body_limit_bytes;

    let api = Router::new()
        .route("/depression/predict", post(predict_depression))
        .route("/flight/predict", post(predict_flight))
        .route("/animal/predict", post(predict_animal))
        .route("/recommend/search", post(search))
        .route("/models", get(list_models));

    Router::new()
        .nest("/api/v2", api)
        .route("/admin/reload/:domain", post(reload))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                request_id = %Uuid::new_v4(),
            )
        }))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allow_any_origin {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

async fn fallback() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" })))
}

/// Count the request, time it, and record failures by kind
async fn observed<T, F>(domain: Domain, handler: F) -> Result<Json<T>, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    metrics::counter!("modelgate_requests_total", "domain" => domain.as_str()).increment(1);
    let start = Instant::now();

    let result = handler.await;
    match &result {
        Ok(_) => {
            let latency_us = start.elapsed().as_micros() as f64;
            metrics::histogram!("modelgate_inference_latency_us", "domain" => domain.as_str())
                .record(latency_us);
            debug!(%domain, latency_us, "Prediction served");
        }
        Err(e) => {
            metrics::counter!(
                "modelgate_errors_total",
                "domain" => domain.as_str(),
                "kind" => e.kind()
            )
            .increment(1);
        }
    }

    result.map(Json)
}

async fn predict_depression(
    State(state): State<AppState>,
    payload: Result<Json<DepressionRequest>, JsonRejection>,
) -> Result<Json<DepressionResponse>, AppError> {
    observed(Domain::Depression, async move {
        let Json(request) = payload?;
        Ok::<_, AppError>(state.registry.depression.predict(request).await?)
    })
    .await
}

async fn predict_flight(
    State(state): State<AppState>,
    payload: Result<Json<FlightRequest>, JsonRejection>,
) -> Result<Json<FlightResponse>, AppError> {
    observed(Domain::Flight, async move {
        let Json(request) = payload?;
        Ok::<_, AppError>(state.registry.flight.predict(request).await?)
    })
    .await
}

async fn predict_animal(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnimalResponse>, AppError> {
    observed(Domain::Animal, async move {
        let mut multipart = multipart?;
        let upload = read_upload(&mut multipart).await?;
        Ok::<_, AppError>(state.registry.animal.predict(upload).await?)
    })
    .await
}

/// First multipart field named `file`
async fn read_upload(multipart: &mut Multipart) -> Result<ImageUpload, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?.to_vec();
        debug!(?filename, ?content_type, size = bytes.len(), "Received upload");

        return Ok(ImageUpload {
            filename,
            content_type,
            bytes,
        });
    }

    Err(Error::validation(FieldError::new(UPLOAD_FIELD, "missing", "Field required")).into())
}

async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<Vec<SearchHit>>, AppError> {
    observed(Domain::Recommend, async move {
        let Json(request) = payload?;
        Ok::<_, AppError>(state.registry.recommend.predict(request).await?)
    })
    .await
}

async fn list_models(State(state): State<AppState>) -> Json<Value> {
    let models: Vec<ArtifactInfo> = state.registry.artifacts();
    Json(json!({ "models": models }))
}

/// Re-read one domain's artifact from disk
async fn reload(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<ArtifactInfo>, AppError> {
    let domain: Domain = domain.parse()?;
    let registry = Arc::clone(&state.registry);

    let info = tokio::task::spawn_blocking(move || registry.reload(domain))
        .await
        .map_err(|e| Error::internal(format!("reload task failed: {}", e)))??;

    info!(%domain, version = ?info.meta.version, "Artifact reloaded");
    Ok(Json(info))
}
