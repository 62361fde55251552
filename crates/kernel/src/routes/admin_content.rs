//! Admin routes for the content listing and the expiration field.

use axum::extract::{Path, Query, State};
use axum::response::{Html, Redirect};
use axum::routing::get;
use axum::{Extension, Form, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::expiration::SortOrder;
use crate::form::{ExpirationSubmission, SaveOutcome};
use crate::middleware::Editor;
use crate::services::expiration::edit_url;
use crate::state::AppState;

/// Create the admin content router. Mounted behind editor authentication.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/content", get(list_content))
        .route(
            "/admin/content/{id}/expiration",
            get(edit_expiration).post(save_expiration),
        )
}

/// Listing parameters.
#[derive(Debug, Default, Deserialize)]
struct ListParams {
    #[serde(rename = "type")]
    item_type: Option<String>,
    orderby: Option<String>,
    order: Option<SortOrder>,
}

impl ListParams {
    fn sort(&self) -> Option<SortOrder> {
        (self.orderby.as_deref() == Some("expiration")).then(|| self.order.unwrap_or_default())
    }
}

/// List all content with the expiration column.
///
/// GET /admin/content?orderby=expiration&order=desc
async fn list_content(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Html<String>> {
    let sort = params.sort();
    let rows = state
        .expiration()
        .admin_rows(params.item_type.clone(), sort)
        .await?;

    let order = match sort {
        Some(SortOrder::Desc) => "desc",
        _ => "asc",
    };
    let theme = state.theme();
    let table = theme.render_content_list(&rows, params.item_type.as_deref(), order)?;
    Ok(Html(theme.render_page("/admin/content", "Content", &table)?))
}

/// Show the expiration field for an item.
///
/// GET /admin/content/{id}/expiration
async fn edit_expiration(
    State(state): State<AppState>,
    Extension(editor): Extension<Editor>,
    Path(id): Path<Uuid>,
) -> AppResult<Html<String>> {
    let Some(field) = state.expiration().field(editor.user_id, id).await? else {
        return Err(AppError::NotFound);
    };

    let theme = state.theme();
    let form = theme.render_expiration_field(&field)?;
    Ok(Html(theme.render_page(&edit_url(id), "Expiration", &form)?))
}

/// Save the expiration field.
///
/// Skipped saves are silent: the editor lands back on the form either way.
///
/// POST /admin/content/{id}/expiration
async fn save_expiration(
    State(state): State<AppState>,
    Extension(editor): Extension<Editor>,
    Path(id): Path<Uuid>,
    Form(submission): Form<ExpirationSubmission>,
) -> AppResult<Redirect> {
    let Some(item) = state.host().items.load(id).await? else {
        return Err(AppError::NotFound);
    };
    if !state.expiration().manages(&item.item_type) {
        return Err(AppError::NotFound);
    }

    let outcome = state
        .expiration()
        .save_submission(editor.user_id, id, &submission)
        .await?;
    if let SaveOutcome::Skipped(reason) = outcome {
        tracing::debug!(item_id = %id, reason = ?reason, "expiration not saved");
    }

    Ok(Redirect::to(&edit_url(id)))
}
