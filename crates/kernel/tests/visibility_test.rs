//! Public visibility of expired content: listings, direct access, menus.

mod common;

use axum::http::{StatusCode, header};
use chrono::Duration;

use common::{TestApp, body_json, body_string};
use sunset_kernel::expiration::AccessPolicy;
use sunset_kernel::models::MenuLink;
use sunset_test_utils::{assert, test_item};

#[tokio::test]
async fn listing_excludes_expired_items() {
    let app = TestApp::new();
    let now = app.now();
    let expired = test_item("post", "Expired promo").expires_in(now, Duration::hours(-1));
    let active = test_item("post", "Running promo").expires_in(now, Duration::days(3));
    let forever = test_item("post", "Evergreen");
    for item in [&expired, &active, &forever] {
        app.insert(item).await;
    }

    let response = app.get("/items?type=post").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let titles: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect();

    assert!(titles.contains(&"Running promo"));
    assert!(titles.contains(&"Evergreen"));
    assert!(!titles.contains(&"Expired promo"));
}

#[tokio::test]
async fn front_page_hides_expired_items() {
    let app = TestApp::new();
    let now = app.now();
    app.insert(&test_item("post", "Gone").expires_in(now, Duration::minutes(-5)))
        .await;
    app.insert(&test_item("post", "Here")).await;

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert::contains(&html, "Here");
    assert::not_contains(&html, "Gone");
}

#[tokio::test]
async fn front_page_escapes_titles() {
    let app = TestApp::new();
    app.insert(&test_item("post", "<script>alert(1)</script>")).await;

    let html = body_string(app.get("/").await).await;
    assert::contains(&html, "&lt;script&gt;alert(1)");
    assert::not_contains(&html, "<script>");
}

#[tokio::test]
async fn expired_item_redirects_home() {
    let app = TestApp::new();
    let item = test_item("post", "Old").expires_in(app.now(), Duration::hours(-2));
    app.insert(&item).await;

    let response = app.get(&item.url()).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/");
}

#[tokio::test]
async fn expired_draft_is_still_redirected() {
    let app = TestApp::new();
    let item = test_item("post", "Swept")
        .unpublished()
        .expires_in(app.now(), Duration::hours(-2));
    app.insert(&item).await;

    let response = app.get(&item.url()).await;
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn not_found_policy_answers_404() {
    let app = TestApp::with_config(|config| {
        config.sweep_on_request = false;
        config.expired_access_policy = AccessPolicy::NotFound;
    });
    let item = test_item("post", "Old").expires_in(app.now(), Duration::hours(-2));
    app.insert(&item).await;

    let response = app.get(&item.url()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn custom_fallback_url() {
    let app = TestApp::with_config(|config| {
        config.sweep_on_request = false;
        config.expired_fallback_url = "/archive".to_string();
    });
    let item = test_item("post", "Old").expires_in(app.now(), Duration::hours(-2));
    app.insert(&item).await;

    let response = app.get(&item.url()).await;
    assert_eq!(response.headers()[header::LOCATION], "/archive");
}

#[tokio::test]
async fn active_item_renders() {
    let app = TestApp::new();
    let item = test_item("post", "Fresh").expires_in(app.now(), Duration::days(1));
    app.insert(&item).await;

    let response = app.get(&item.url()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["title"], "Fresh");
    assert_eq!(json["type"], "post");
}

#[tokio::test]
async fn unexpired_draft_is_not_found() {
    let app = TestApp::new();
    let item = test_item("post", "Hidden").unpublished();
    app.insert(&item).await;

    let response = app.get(&item.url()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_content_types_are_not_managed() {
    let app = TestApp::new();
    let page = test_item("page", "About").expires_in(app.now(), Duration::days(-30));
    app.insert(&page).await;

    let response = app.get(&page.url()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(app.get("/items?type=page").await).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn partial_expiration_is_no_expiration() {
    let app = TestApp::new();
    let item = test_item("post", "Half set").with_partial_expiration("2000-01-01");
    app.insert(&item).await;

    assert_eq!(app.get(&item.url()).await.status(), StatusCode::OK);
    let json = body_json(app.get("/items").await).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn expiration_boundary_is_inclusive() {
    let app = TestApp::new();
    // Expiring at the current second is already expired by the time the
    // request is served.
    let item = test_item("post", "Now").expires_at(app.now());
    app.insert(&item).await;

    assert_eq!(app.get(&item.url()).await.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn menu_drops_links_to_expired_items() {
    let app = TestApp::new();
    let now = app.now();
    let expired = test_item("post", "Old promo").expires_in(now, Duration::hours(-1));
    let active = test_item("post", "New promo").expires_in(now, Duration::hours(5));
    app.insert(&expired).await;
    app.insert(&active).await;

    app.add_menu_link(MenuLink::new("main", "/", "Home"));
    app.add_menu_link(MenuLink::to_item("main", expired.id, "Old promo").weight(1));
    app.add_menu_link(MenuLink::to_item("main", active.id, "New promo").weight(2));

    let json = body_json(app.get("/menu/main").await).await;
    let titles: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|link| link["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Home", "New promo"]);
}

#[tokio::test]
async fn unknown_item_is_not_found() {
    let app = TestApp::new();
    let response = app.get(&format!("/item/{}", uuid::Uuid::now_v7())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
