//! Stable identity for source posts.
//!
//! The identity is half of the `(source, stable_id)` dedup key, so it must be
//! the same every time the same logical post is ingested.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::models::PostRecord;

/// Hex characters kept from the fallback fingerprint.
pub const FALLBACK_HASH_LEN: usize = 16;

/// Opaque platform post token, e.g. `pfbid0abc123`.
static POST_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pfbid[0-9A-Za-z]+").unwrap());

/// `/reel/<digits>`
static REEL_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/reel/([0-9]+)").unwrap());

/// `/posts/<digits>`
static NUMERIC_POST_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/posts/([0-9]+)").unwrap());

/// Upstream ids already in one of the stable shapes.
static UPSTREAM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:pfbid[0-9A-Za-z]+|reel_[0-9]+|post_[0-9]+)$").unwrap());

/// A resolved identity and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StableId {
    /// The record's own id, already in a stable shape.
    Upstream(String),
    /// Platform post token found in the URL.
    PostToken(String),
    /// Digits of a `/reel/<digits>` URL segment.
    Reel(String),
    /// Digits of a `/posts/<digits>` URL segment.
    NumericPost(String),
    /// Truncated hex fingerprint of source and URL (or title).
    Fallback(String),
}

impl StableId {
    /// Whether the id had to be derived from a fingerprint.
    pub fn is_fallback(&self) -> bool {
        matches!(self, StableId::Fallback(_))
    }

    /// The stored form of the id.
    pub fn to_key(&self) -> String {
        match self {
            StableId::Upstream(id) | StableId::PostToken(id) => id.clone(),
            StableId::Reel(digits) => format!("reel_{digits}"),
            StableId::NumericPost(digits) => format!("post_{digits}"),
            StableId::Fallback(hash) => format!("fallback_{hash}"),
        }
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key())
    }
}

/// Extract a platform identity from a post URL.
pub fn extract_platform_id(url: &str) -> Option<StableId> {
    if let Some(m) = POST_TOKEN.find(url) {
        return Some(StableId::PostToken(m.as_str().to_string()));
    }
    if let Some(caps) = REEL_PATH.captures(url) {
        return Some(StableId::Reel(caps[1].to_string()));
    }
    if let Some(caps) = NUMERIC_POST_PATH.captures(url) {
        return Some(StableId::NumericPost(caps[1].to_string()));
    }
    None
}

/// Deterministic fingerprint identity over `source` and a record key.
pub fn fallback_id(source: &str, key: &str) -> StableId {
    let digest = Sha256::digest(format!("{source}:{key}").as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(FALLBACK_HASH_LEN);
    StableId::Fallback(hash)
}

/// Resolve the identity of a post.
///
/// Order: the record's own id when already stable, then an id extracted from
/// the URL, then a fingerprint of `source` with the URL (or the title when
/// there is no URL).
pub fn resolve_stable_id(post: &PostRecord, source: &str) -> StableId {
    if let Some(id) = post.id_str().filter(|id| UPSTREAM_ID.is_match(id)) {
        return StableId::Upstream(id.to_string());
    }

    if let Some(found) = post.url_str().and_then(extract_platform_id) {
        return found;
    }

    let key = post
        .url_str()
        .unwrap_or_else(|| post.title.as_deref().unwrap_or(""));
    let id = fallback_id(source, key);
    let title: String = post.title_trimmed().chars().take(40).collect();
    warn!(
        source = %source,
        title = %title,
        stable_id = %id,
        "no platform id in record, using fallback identity"
    );
    id
}
