//! Action-bound CSRF tokens.
//!
//! A token is an HMAC-SHA256 over the action name, the editor, and a time
//! bucket. It is valid for the bucket it was issued in and the one after,
//! so a token lives between one and two bucket lengths. No server-side
//! state is kept.

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Length of one validity bucket in seconds (12 hours).
const BUCKET_SECS: i64 = 12 * 60 * 60;

/// Action name for editing an item's expiration.
pub fn expiration_action(item_id: Uuid) -> String {
    format!("expiration_edit:{item_id}")
}

/// Issues and verifies action tokens with a shared secret.
#[derive(Clone)]
pub struct ActionTokens {
    secret: Vec<u8>,
}

impl ActionTokens {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Tokens signed with a fresh random secret.
    ///
    /// Tokens stop verifying when the process restarts.
    pub fn random() -> Self {
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::new(secret.to_vec())
    }

    /// Issue a token for `action` by `editor` at unix time `now`.
    pub fn issue(&self, action: &str, editor: Uuid, now: i64) -> Result<String> {
        let mac = self.mac(action, editor, bucket(now))?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify a submitted token. Malformed tokens simply fail.
    pub fn verify(&self, action: &str, editor: Uuid, submitted: &str, now: i64) -> bool {
        let Ok(submitted) = hex::decode(submitted.trim()) else {
            return false;
        };
        if submitted.is_empty() {
            return false;
        }

        let current = bucket(now);
        [current, current - 1].into_iter().any(|b| {
            self.mac(action, editor, b)
                .map(|mac| mac.verify_slice(&submitted).is_ok())
                .unwrap_or(false)
        })
    }

    fn mac(&self, action: &str, editor: Uuid, bucket: i64) -> Result<HmacSha256> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).context("invalid CSRF token secret")?;
        mac.update(action.as_bytes());
        mac.update(b"|");
        mac.update(editor.as_bytes());
        mac.update(b"|");
        mac.update(&bucket.to_le_bytes());
        Ok(mac)
    }
}

fn bucket(now: i64) -> i64 {
    now.div_euclid(BUCKET_SECS)
}

impl std::fmt::Debug for ActionTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionTokens").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_704_103_200;

    #[test]
    fn token_format() {
        let tokens = ActionTokens::new(b"secret".to_vec());
        let token = tokens.issue("a", Uuid::nil(), NOW).unwrap();
        // hex encoded SHA256 (64 chars)
        assert_eq!(token.len(), 64);
    }

    #[test]
    fn token_is_bound_to_action_and_editor() {
        let tokens = ActionTokens::new(b"secret".to_vec());
        let item = Uuid::now_v7();
        let editor = Uuid::now_v7();
        let action = expiration_action(item);
        let token = tokens.issue(&action, editor, NOW).unwrap();

        assert!(tokens.verify(&action, editor, &token, NOW));
        assert!(!tokens.verify(&expiration_action(Uuid::now_v7()), editor, &token, NOW));
        assert!(!tokens.verify(&action, Uuid::now_v7(), &token, NOW));
        assert!(!ActionTokens::new(b"other".to_vec()).verify(&action, editor, &token, NOW));
    }

    #[test]
    fn token_survives_one_bucket_then_expires() {
        let tokens = ActionTokens::new(b"secret".to_vec());
        let token = tokens.issue("a", Uuid::nil(), NOW).unwrap();

        assert!(tokens.verify("a", Uuid::nil(), &token, NOW + BUCKET_SECS));
        assert!(!tokens.verify("a", Uuid::nil(), &token, NOW + 2 * BUCKET_SECS));
    }

    #[test]
    fn garbage_tokens_fail() {
        let tokens = ActionTokens::random();
        assert!(!tokens.verify("a", Uuid::nil(), "", NOW));
        assert!(!tokens.verify("a", Uuid::nil(), "zz", NOW));
        assert!(!tokens.verify("a", Uuid::nil(), "abcd", NOW));
    }
}
