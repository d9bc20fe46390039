//! HTTP server.
//!
//! Exposes the assistant over a small JSON API for the web front end and
//! other local clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer the form field `query` |
//! | `GET`  | `/api/context?q=` | Aggregated context and its briefing |
//! | `GET`  | `/api/steam/owned-games?limit=50` | Owned games in account order |
//! | `GET`  | `/api/steam/owned-count` | `{ "count": N }` |
//! | `GET`  | `/api/ytmusic/liked-all` | Every liked song |
//! | `GET`  | `/api/github/commits?user=&repo=&page=1&per_page=100` | One page of commit history |
//! | `*`    | `/mcp` | MCP tool server (Streamable HTTP), see [`crate::mcp`] |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `upstream_error` (502).
//! A language model that cannot be reached is not an error: `/ask` answers
//! 200 with `warning` and `error` fields instead.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser page served
//! from elsewhere can call the API.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use hub_core::context::SourceContext;
use hub_core::models::{CommitInfo, LikedSong, Scope, FULL_LISTING_LIMIT};
use hub_core::source::SourceError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::dispatch::{game_json, Answer, Assistant, DispatchError};

const DEFAULT_OWNED_GAMES_LIMIT: usize = 50;

#[derive(Clone)]
struct AppState {
    assistant: Arc<Assistant>,
}

/// Build the assistant from `config` and serve on `[server].bind` until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let assistant = Arc::new(Assistant::from_config(config)?);
    run_server_with_assistant(&config.server.bind, assistant).await
}

/// Serve an already-built assistant. Tests use this with in-memory adapters.
pub async fn run_server_with_assistant(
    bind_addr: &str,
    assistant: Arc<Assistant>,
) -> anyhow::Result<()> {
    let app = router(assistant);

    tracing::info!("assistant listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(assistant: Arc<Assistant>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/api/context", get(handle_context))
        .route("/api/steam/owned-games", get(handle_owned_games))
        .route("/api/steam/owned-count", get(handle_owned_count))
        .route("/api/ytmusic/liked-all", get(handle_liked_all))
        .route("/api/github/commits", get(handle_commits))
        .route("/health", get(handle_health))
        .nest_service("/mcp", crate::mcp::service(assistant.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { assistant })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn upstream_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream_error".to_string(),
        message: message.into(),
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        let message = err.to_string();
        match err {
            SourceError::NotFound(_) => not_found(message),
            SourceError::Unavailable(_) => bad_request(message),
            SourceError::Transient(_) | SourceError::Malformed(_) | SourceError::Unreachable(_) => {
                upstream_error(message)
            }
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::EmptyQuery => bad_request(err.to_string()),
            DispatchError::Source { handler, source } => {
                let mut e = AppError::from(source);
                e.message = format!("{}: {}", handler, e.message);
                e
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskForm {
    #[serde(default)]
    query: String,
}

/// Returns 400 for an empty query and for direct requests that cannot be
/// served; everything else is 200.
async fn handle_ask(
    State(state): State<AppState>,
    Form(form): Form<AskForm>,
) -> Result<Json<Answer>, AppError> {
    let answer = state.assistant.answer(&form.query).await?;
    Ok(Json(answer))
}

// ============ GET /api/context ============

#[derive(Deserialize)]
struct ContextParams {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct ContextResponse {
    context: SourceContext,
    briefing: String,
}

async fn handle_context(
    State(state): State<AppState>,
    Query(params): Query<ContextParams>,
) -> Json<ContextResponse> {
    let context = state.assistant.aggregator().gather(&params.q).await;
    let briefing = context.briefing();
    Json(ContextResponse { context, briefing })
}

// ============ Steam ============

#[derive(Deserialize)]
struct OwnedGamesParams {
    limit: Option<usize>,
}

async fn handle_owned_games(
    State(state): State<AppState>,
    Query(params): Query<OwnedGamesParams>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_OWNED_GAMES_LIMIT)
        .clamp(1, FULL_LISTING_LIMIT);
    let games = state
        .assistant
        .adapters()
        .library
        .list_owned(Some(limit))
        .await?;
    Ok(Json(games.iter().map(game_json).collect()))
}

#[derive(Serialize)]
struct CountResponse {
    count: usize,
}

async fn handle_owned_count(State(state): State<AppState>) -> Result<Json<CountResponse>, AppError> {
    let count = state.assistant.adapters().library.owned_count().await?;
    Ok(Json(CountResponse { count }))
}

// ============ YT Music ============

async fn handle_liked_all(State(state): State<AppState>) -> Result<Json<Vec<LikedSong>>, AppError> {
    let songs = state
        .assistant
        .adapters()
        .songs
        .list_liked(FULL_LISTING_LIMIT, Scope::Full)
        .await?;
    Ok(Json(songs))
}

// ============ GitHub ============

#[derive(Deserialize)]
struct CommitsParams {
    #[serde(default)]
    user: String,
    #[serde(default)]
    repo: String,
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn handle_commits(
    State(state): State<AppState>,
    Query(params): Query<CommitsParams>,
) -> Result<Json<Vec<CommitInfo>>, AppError> {
    let user = params.user.trim();
    let repo = params.repo.trim();
    if user.is_empty() || repo.is_empty() {
        return Err(bad_request("user and repo are required"));
    }
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(100).clamp(1, 100);
    let commits = state
        .assistant
        .adapters()
        .host
        .recent_commits(user, repo, page, per_page)
        .await?;
    Ok(Json(commits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_errors_map_to_status() {
        let cases = [
            (SourceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (SourceError::Unavailable("x".into()), StatusCode::BAD_REQUEST),
            (SourceError::Transient("x".into()), StatusCode::BAD_GATEWAY),
            (SourceError::Malformed("x".into()), StatusCode::BAD_GATEWAY),
            (SourceError::Unreachable("x".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn test_dispatch_error_keeps_handler_name() {
        let err = AppError::from(DispatchError::Source {
            handler: "read_note",
            source: SourceError::NotFound("a.txt".into()),
        });
        assert_eq!(err.code, "not_found");
        assert!(err.message.starts_with("read_note: "));
    }
}
