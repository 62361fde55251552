//! Expiration sweep before public requests.
//!
//! Front-end requests run the sweep first so an item never outlives its
//! expiration by more than one request, whatever the cron cadence.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use tracing::warn;

use crate::state::AppState;

/// Paths that never trigger the sweep.
const EXEMPT_PREFIXES: &[&str] = &["/admin", "/cron", "/health"];

/// Whether a request path triggers the sweep.
pub fn sweeps(path: &str) -> bool {
    !EXEMPT_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Middleware running the expiration sweep when enabled.
///
/// A failed sweep is logged and the request is served anyway; the listing
/// and access filters still hide expired items.
pub async fn sweep_on_request(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.config().sweep_on_request
        && sweeps(request.uri().path())
        && let Err(e) = state.expiration().sweep_now().await
    {
        warn!(error = %format!("{e:#}"), "expiration sweep on request failed");
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_cron_and_health_are_exempt() {
        assert!(!sweeps("/admin"));
        assert!(!sweeps("/admin/content"));
        assert!(!sweeps("/cron/key"));
        assert!(!sweeps("/health"));
        assert!(sweeps("/"));
        assert!(sweeps("/item/123"));
        assert!(sweeps("/administrivia"));
    }
}
