//! HTTP route handlers.

pub mod admin_content;
pub mod cron;
pub mod front;
pub mod health;

use axum::Router;
use axum::middleware::from_fn_with_state;
use tower_http::trace::TraceLayer;

use crate::middleware::{require_editor, sweep_on_request};
use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let editor_routes = Router::new()
        .merge(admin_content::router())
        .merge(cron::status_router())
        .route_layer(from_fn_with_state(state.clone(), require_editor));

    Router::new()
        .merge(front::router())
        .merge(editor_routes)
        .merge(cron::router())
        .merge(health::router())
        // Middleware layers (last added = first executed in request flow):
        .layer(from_fn_with_state(state.clone(), sweep_on_request))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
