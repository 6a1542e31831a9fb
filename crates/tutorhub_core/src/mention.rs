//! Email mention extraction from free-text notifications.
//!
//! # Responsibility
//! - Find candidate student emails written inside a notification body.
//!
//! # Invariants
//! - Tokens are split on whitespace only.
//! - Only `LEADING_WRAPPERS` / `TRAILING_PUNCTUATION` are stripped from a token;
//!   the rest must be a whole email, so `mailto:a@b.com` is not a mention.
//! - Never fails; unmatched input yields an empty set.
//!
//! Candidates are not checked against storage here.

use crate::model::email::{Email, EmailSet};

const LEADING_WRAPPERS: &[char] = &['(', '[', '{', '<', '"', '\''];
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '>', '"', '\''];

/// Extracts distinct email-shaped tokens from `text`.
pub fn extract_mentions(text: &str) -> EmailSet {
    text.split_whitespace().filter_map(mention_from_token).collect()
}

fn mention_from_token(token: &str) -> Option<Email> {
    let candidate = token
        .trim_start_matches(LEADING_WRAPPERS)
        .trim_end_matches(TRAILING_PUNCTUATION);
    if candidate.is_empty() || !candidate.contains('@') {
        return None;
    }
    Email::parse(candidate).ok()
}
