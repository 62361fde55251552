//! Theme engine with Tera templates.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tera::Tera;
use tracing::debug;

use crate::form::ExpirationField;
use crate::models::Item;
use crate::services::expiration::AdminRow;

/// One link of the public front page listing.
#[derive(Serialize)]
struct FrontEntry<'a> {
    title: &'a str,
    url: String,
}

/// Templates compiled into the binary.
const TEMPLATES: &[(&str, &str)] = &[
    ("page.html", include_str!("../../templates/page.html")),
    ("front.html", include_str!("../../templates/front.html")),
    (
        "admin/content.html",
        include_str!("../../templates/admin/content.html"),
    ),
    (
        "admin/expiration-field.html",
        include_str!("../../templates/admin/expiration-field.html"),
    ),
];

/// Theme engine for rendering templates.
pub struct ThemeEngine {
    /// Tera template engine instance.
    tera: Tera,
}

impl ThemeEngine {
    /// Create a theme engine with the built-in templates.
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())
            .context("failed to initialize Tera templates")?;

        // Register custom filters
        Self::register_filters(&mut tera);

        debug!(count = tera.get_template_names().count(), "loaded templates");
        Ok(Self { tera })
    }

    /// Register custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        // Filter for formatting Unix timestamps as human-readable dates
        tera.register_filter(
            "format_date",
            |value: &tera::Value, _args: &std::collections::HashMap<String, tera::Value>| {
                let timestamp = match value {
                    tera::Value::Number(n) => n.as_i64().unwrap_or(0),
                    _ => return Ok(tera::Value::String(String::new())),
                };

                let formatted = chrono::DateTime::from_timestamp(timestamp, 0)
                    .map(|dt| dt.format("%B %-d, %Y").to_string())
                    .unwrap_or_else(|| "Unknown date".to_string());

                Ok(tera::Value::String(formatted))
            },
        );
    }

    /// Get the underlying Tera instance for custom operations.
    pub fn tera(&self) -> &Tera {
        &self.tera
    }

    /// Check if a path is an admin path.
    pub fn is_admin_path(path: &str) -> bool {
        path == "/admin" || path.starts_with("/admin/")
    }

    /// Render a full page with content.
    pub fn render_page(&self, path: &str, title: &str, content: &str) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("title", title);
        context.insert("content", content);
        context.insert("path", path);
        context.insert("is_admin", &Self::is_admin_path(path));

        self.tera
            .render("page.html", &context)
            .context("failed to render page template")
    }

    /// Render the public front page listing.
    pub fn render_front_list(&self, items: &[Item]) -> Result<String> {
        let entries: Vec<FrontEntry<'_>> = items
            .iter()
            .map(|item| FrontEntry {
                title: &item.title,
                url: item.url(),
            })
            .collect();
        let mut context = tera::Context::new();
        context.insert("items", &entries);

        self.tera
            .render("front.html", &context)
            .context("failed to render front page listing")
    }

    /// Render the admin content listing table.
    pub fn render_content_list(
        &self,
        rows: &[AdminRow],
        item_type: Option<&str>,
        order: &str,
    ) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("rows", rows);
        context.insert("item_type", &item_type);
        context.insert("order", order);
        context.insert("next_order", if order == "desc" { "asc" } else { "desc" });

        self.tera
            .render("admin/content.html", &context)
            .context("failed to render content listing")
    }

    /// Render the expiration form field.
    pub fn render_expiration_field(&self, field: &ExpirationField) -> Result<String> {
        let mut context = tera::Context::new();
        context.insert("field", field);

        self.tera
            .render("admin/expiration-field.html", &context)
            .context("failed to render expiration field")
    }
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("template_count", &self.tera.get_template_names().count())
            .finish()
    }
}

/// Wrap ThemeEngine in Arc for sharing across handlers.
pub type SharedThemeEngine = Arc<ThemeEngine>;
