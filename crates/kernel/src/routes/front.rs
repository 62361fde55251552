//! Public route handlers: listings, direct item access, and menus.

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::expiration::AccessDecision;
use crate::models::{Item, ListingQuery, MenuLink};
use crate::state::AppState;

/// Create the public router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(front_page))
        .route("/items", get(list_items))
        .route("/item/{id}", get(view_item))
        .route("/menu/{name}", get(view_menu))
}

/// Listing filter parameters.
#[derive(Debug, Default, Deserialize)]
struct ListingParams {
    #[serde(rename = "type")]
    item_type: Option<String>,
}

/// Published items of a type, minus the expired ones.
async fn public_listing(state: &AppState, item_type: Option<String>) -> AppResult<Vec<Item>> {
    let mut query = ListingQuery::public(item_type);
    state.expiration().hide_expired(&mut query).await?;
    Ok(state.host().items.list(&query).await?)
}

/// Front page: the public listing as HTML.
async fn front_page(State(state): State<AppState>) -> AppResult<Html<String>> {
    let items = public_listing(&state, None).await?;
    let content = state.theme().render_front_list(&items)?;
    let html = state.theme().render_page("/", "Home", &content)?;
    Ok(Html(html))
}

/// Public listing as JSON.
///
/// GET /items?type=post
async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> AppResult<Json<Vec<Item>>> {
    Ok(Json(public_listing(&state, params.item_type).await?))
}

/// Direct item access.
///
/// Expired managed items are intercepted before the published check, so
/// an expired item redirects (or 404s) even after the sweep made it a
/// draft.
async fn view_item(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Response> {
    let Some(item) = state.host().items.load(id).await? else {
        return Err(AppError::NotFound);
    };

    match state.expiration().access_decision(&item).await? {
        AccessDecision::Redirect(location) => {
            debug!(item_id = %id, location = %location, "redirecting expired item");
            Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
        }
        AccessDecision::NotFound => Err(AppError::NotFound),
        AccessDecision::Render if !item.status.is_published() => Err(AppError::NotFound),
        AccessDecision::Render => Ok(Json(item).into_response()),
    }
}

/// Menu links without links to expired items.
async fn view_menu(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Vec<MenuLink>>> {
    let links = state.host().menus.menu_links(&name).await?;
    Ok(Json(state.expiration().filter_menu(links).await?))
}
