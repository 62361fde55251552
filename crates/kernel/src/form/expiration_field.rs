//! The expiration side-panel field.

use serde::{Deserialize, Serialize};

use crate::expiration::column::format_display;
use crate::expiration::meta::format_for_input;
use crate::expiration::{ColumnState, ExpiresAt};

/// Form field name of the `datetime-local` input.
pub const FIELD_NAME: &str = "expiration_datetime";

/// Form field name of the CSRF token.
pub const TOKEN_FIELD: &str = "expiration_token";

/// Submitted form values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpirationSubmission {
    /// Raw `datetime-local` value; blank clears the expiration.
    #[serde(default)]
    pub expiration_datetime: Option<String>,

    #[serde(default)]
    pub expiration_token: String,

    /// Set by the editor's autosave; such submissions are ignored.
    #[serde(default)]
    pub autosave: bool,
}

/// Why a submission was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    InvalidToken,
    Autosave,
    Forbidden,
}

/// Result of handling a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(ExpiresAt),
    Cleared,
    Skipped(SkipReason),
}

/// Status panel under the field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldStatus {
    pub state: ColumnState,
    pub label: &'static str,
    /// Expiration in display format.
    pub expires: String,
}

/// Everything the field template needs.
#[derive(Debug, Clone, Serialize)]
pub struct ExpirationField {
    pub field_name: &'static str,
    pub token_field: &'static str,
    /// Current value in `datetime-local` format, or empty.
    pub value: String,
    pub token: String,
    pub offset_label: String,
    pub action: String,
    pub status: Option<FieldStatus>,
}

impl ExpirationField {
    pub fn new(
        expires_at: Option<ExpiresAt>,
        expired: bool,
        token: String,
        offset_label: String,
        action: String,
    ) -> Self {
        let status = expires_at.map(|at| FieldStatus {
            state: if expired {
                ColumnState::Expired
            } else {
                ColumnState::Active
            },
            label: if expired { "EXPIRED" } else { "ACTIVE" },
            expires: format_display(at),
        });

        Self {
            field_name: FIELD_NAME,
            token_field: TOKEN_FIELD,
            value: expires_at.map(format_for_input).unwrap_or_default(),
            token,
            offset_label,
            action,
            status,
        }
    }
}
