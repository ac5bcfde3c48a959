use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    gemini::ContentProvider,
    generator::BuildGenerator,
    models::{BuildRequest, BuildsResponse, ErrorBody, GenerateBody, PCBuild},
    store::{compare, share_text, BuildStore},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<BuildStore>,
    pub generator: Arc<BuildGenerator<dyn ContentProvider>>,
}

fn cors(methods: Vec<Method>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE])
}

/// The CORS layer answers every OPTIONS request itself with 200; the generate endpoint reports 204.
async fn no_content_preflight(req: Request, next: Next) -> Response {
    let is_options = req.method() == Method::OPTIONS;
    let mut resp = next.run(req).await;
    if is_options && resp.status() == StatusCode::OK {
        *resp.status_mut() = StatusCode::NO_CONTENT;
    }
    resp
}

pub fn router(state: AppState) -> Router {
    let generate: Router<AppState> = Router::new()
        .route("/api/generate", post(generate_builds).fallback(method_not_allowed))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(no_content_preflight))
                .layer(cors(vec![Method::POST, Method::OPTIONS])),
        );

    let saved: Router<AppState> = Router::new()
        .route("/api/builds", get(list_builds).post(save_build))
        .route("/api/builds/:id", get(get_build).delete(delete_build))
        .route("/api/builds/:id/share", get(share_build))
        .route("/api/compare", get(compare_builds))
        .layer(ServiceBuilder::new().layer(cors(vec![Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])));

    Router::new()
        .merge(generate)
        .merge(saved)
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody::new(message))).into_response()
}

/// Decodes `{ request: BuildRequest }`, telling a missing payload apart from a malformed one.
fn parse_generate_body(body: &[u8]) -> Result<BuildRequest, Response> {
    let envelope: GenerateBody = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateBody { request: None }
    } else {
        serde_json::from_slice(body)
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}")))?
    };
    let raw = match envelope.request {
        Some(v) if !v.is_null() => v,
        _ => return Err(error_response(StatusCode::BAD_REQUEST, "Missing request payload.")),
    };
    let request: BuildRequest = serde_json::from_value(raw)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Invalid request payload: {e}")))?;
    request.validate()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, format!("Invalid request payload: {e}")))?;
    Ok(request)
}

pub async fn generate_builds(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match parse_generate_body(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    tracing::info!("🎯 Generate request: {} {} / {} / {}", request.budget, request.currency, request.purpose, request.performance_tier);

    match state.generator.generate(&request).await {
        Ok(mut builds) => {
            for build in &mut builds {
                build.assign_id();
            }
            Json(BuildsResponse { builds }).into_response()
        }
        Err(e) => {
            tracing::error!("/api/generate error: {}", e);
            error_response(e.status_code(), e.to_string())
        }
    }
}

async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

pub async fn list_builds(State(state): State<AppState>) -> Response {
    Json(state.store.list()).into_response()
}

pub async fn save_build(State(state): State<AppState>, Json(build): Json<PCBuild>) -> Response {
    (StatusCode::CREATED, Json(state.store.save(build))).into_response()
}

pub async fn get_build(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    if let Some(b) = state.store.get(&id) { Json(b).into_response() } else { StatusCode::NOT_FOUND.into_response() }
}

pub async fn delete_build(Path(id): Path<Uuid>, State(state): State<AppState>) -> StatusCode {
    if state.store.remove(&id) { StatusCode::NO_CONTENT } else { StatusCode::NOT_FOUND }
}

pub async fn share_build(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    match state.store.get(&id) {
        Some(saved) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            share_text(&saved.build),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub left: Uuid,
    pub right: Uuid,
}

pub async fn compare_builds(Query(q): Query<CompareQuery>, State(state): State<AppState>) -> Response {
    let (Some(left), Some(right)) = (state.store.get(&q.left), state.store.get(&q.right)) else {
        return error_response(StatusCode::NOT_FOUND, "Unknown build id");
    };
    Json(compare(&left.build, &right.build)).into_response()
}
