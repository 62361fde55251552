#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! This module provides test infrastructure that uses the REAL kernel code:
//! the real router, state, and services over the in-memory host adapter.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use chrono::NaiveDateTime;
use http_body_util::BodyExt;
use tower::ServiceExt;

use sunset_kernel::expiration::meta::{EXPIRATION_DATE_KEY, EXPIRATION_TIME_KEY};
use sunset_kernel::host::MetaStore;
use sunset_kernel::models::{Item, ItemStatus, MenuLink};
use sunset_kernel::{AppState, Config, HostServices, MemoryHost, routes};
use sunset_test_utils::{TestEditor, TestItem, test_editor};

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub host: Arc<MemoryHost>,
    pub state: AppState,
    pub editor: TestEditor,
}

impl TestApp {
    /// App with default configuration and the per-request sweep disabled.
    pub fn new() -> Self {
        Self::with_config(|config| config.sweep_on_request = false)
    }

    /// App with configuration adjusted by `adjust`.
    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let editor = test_editor();
        let mut config = Config {
            form_secret: Some(b"integration-test-secret".to_vec()),
            cron_key: "test-cron-key".to_string(),
            editor_tokens: HashMap::from([(editor.token.clone(), editor.id)]),
            ..Config::default()
        };
        adjust(&mut config);

        let host = Arc::new(MemoryHost::new());
        let state = AppState::with_host(&config, HostServices::from_adapter(host.clone()), None)
            .expect("failed to build test state");
        let router = routes::app(state.clone());

        Self {
            router,
            host,
            state,
            editor,
        }
    }

    /// Current site civil time.
    pub fn now(&self) -> NaiveDateTime {
        self.state.expiration().clock().now()
    }

    /// Store a fixture item and its raw expiration meta.
    pub async fn insert(&self, item: &TestItem) {
        self.host.insert_item(Item {
            id: item.id,
            item_type: item.item_type.clone(),
            title: item.title.clone(),
            status: ItemStatus::from(item.status.as_str()),
            changed: 0,
        });
        if let Some(date) = &item.expiration_date {
            self.host
                .set_meta(item.id, EXPIRATION_DATE_KEY, date)
                .await
                .unwrap();
        }
        if let Some(time) = &item.expiration_time {
            self.host
                .set_meta(item.id, EXPIRATION_TIME_KEY, time)
                .await
                .unwrap();
        }
    }

    pub fn add_menu_link(&self, link: MenuLink) {
        self.host.insert_menu_link(link);
    }

    /// Let the test editor edit every item.
    pub fn grant_editor(&self) {
        self.host.grant_editor(self.editor.id);
    }

    pub fn status_of(&self, item: &TestItem) -> ItemStatus {
        self.host.status_of(item.id).expect("item not stored")
    }

    /// Send a request through the router.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_as_editor(&self, uri: &str) -> Response {
        self.request(
            Request::get(uri)
                .header(header::AUTHORIZATION, self.editor.bearer())
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_form_as_editor(&self, uri: &str, body: &str) -> Response {
        self.request(
            Request::post(uri)
                .header(header::AUTHORIZATION, self.editor.bearer())
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post(&self, uri: &str) -> Response {
        self.request(Request::post(uri).body(Body::empty()).unwrap())
            .await
    }
}

/// Collect a response body as text.
pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// Pull the hidden form token out of rendered field HTML.
pub fn extract_token(html: &str) -> String {
    let marker = r#"name="expiration_token" value=""#;
    let start = html.find(marker).expect("token input missing") + marker.len();
    let end = html[start..].find('"').expect("unterminated token") + start;
    html[start..end].to_string()
}
