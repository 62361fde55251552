//! Bearer token authentication for editors.
//!
//! Checks `Authorization: Bearer <token>` against the configured editor
//! tokens and sets the [`Editor`] in request extensions.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

/// The authenticated editor of the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Editor {
    pub user_id: Uuid,
}

/// Middleware rejecting requests without a known editor token.
pub async fn require_editor(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token else {
        return unauthorized("Missing bearer token");
    };

    let Some(user_id) = state.config().editor_tokens.get(token).copied() else {
        debug!("unknown editor token");
        return unauthorized("Invalid token");
    };

    request.extensions_mut().insert(Editor { user_id });
    next.run(request).await
}

fn unauthorized(message: &'static str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer error=\"invalid_token\"")],
        message,
    )
        .into_response()
}
