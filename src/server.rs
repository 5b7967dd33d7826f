//! Axum HTTP server: the renderer's view of one live session.
//!
//! The session is shared as `Arc<SessionController<F>>` across handlers; the
//! controller serializes `step` and `reset` internally.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/step` | Advance one turn (unless finished) and return the snapshot |
//! | GET | `/state` | Current snapshot without advancing |
//! | POST | `/reset` | Replace the session with a fresh game |

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::error::CastleError;
use crate::model::ModelFactory;
use crate::session::{SessionController, SessionSnapshot};

type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn create_router<F>(session: Arc<SessionController<F>>) -> Router
where
    F: ModelFactory + 'static,
    F::Model: 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health_check))
        .route("/step", get(handle_step::<F>))
        .route("/state", get(handle_state::<F>))
        .route("/reset", post(handle_reset::<F>))
        .layer(cors)
        .with_state(session)
}

fn error_response(err: &CastleError) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
}

// ── GET handlers ────────────────────────────────────────────────────

async fn handle_health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "OK" }))
}

async fn handle_step<F: ModelFactory>(
    State(session): State<Arc<SessionController<F>>>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    session
        .step()
        .map(Json)
        .map_err(|e| error_response(&e))
}

async fn handle_state<F: ModelFactory>(
    State(session): State<Arc<SessionController<F>>>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    session
        .snapshot()
        .map(Json)
        .map_err(|e| error_response(&e))
}

// ── POST handler ────────────────────────────────────────────────────

async fn handle_reset<F: ModelFactory>(
    State(session): State<Arc<SessionController<F>>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    session.reset().map_err(|e| error_response(&e))?;
    Ok(Json(serde_json::json!({ "gameStatus": "reset" })))
}
