//! Replay references and storage-key construction.
//!
//! A `ReplayReference` is a lightweight pointer to a downloadable replay:
//! the id, the group it was listed under, and whatever metadata hints the
//! listing call returned. It is immutable once produced by tree expansion.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::group::GroupId;

/// Canonical identifier for a replay file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplayId(String);

impl ReplayId {
    /// Create a new replay ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the identifier is empty (invalid for API calls).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ReplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReplayId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ReplayId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A pointer to a downloadable replay, distinct from its downloaded bytes.
///
/// Produced by group-tree expansion and never mutated afterwards. The
/// `group_path` carries the sanitized names of the groups from the root down
/// to the containing group, used to build hierarchical storage keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReference {
    /// Replay identifier.
    pub id: ReplayId,
    /// The group this replay was listed under.
    pub group_id: GroupId,
    /// Group names from the root to the containing group (unsanitized).
    pub group_path: Vec<String>,
    /// Replay title, if the listing returned one.
    pub title: Option<String>,
    /// Match date as reported by the API (RFC 3339 text, opaque here).
    pub date: Option<String>,
    /// Size hint in bytes from the listing, when present.
    pub size_hint: Option<u64>,
}

impl ReplayReference {
    /// Create a reference with no metadata hints.
    pub fn new(id: impl Into<ReplayId>, group_id: impl Into<GroupId>) -> Self {
        Self {
            id: id.into(),
            group_id: group_id.into(),
            group_path: Vec::new(),
            title: None,
            date: None,
            size_hint: None,
        }
    }

    /// Attach the group path discovered during expansion.
    #[must_use]
    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.group_path = path;
        self
    }

    /// Build the storage key for this replay under an optional prefix.
    ///
    /// Components are sanitized group names joined with `/`, ending in
    /// `<replay_id>.replay`. The same reference always yields the same key,
    /// which is what makes storage writes idempotent per replay.
    #[must_use]
    pub fn storage_key(&self, prefix: Option<&str>) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.group_path.len() + 2);
        if let Some(prefix) = prefix {
            let trimmed = prefix.trim_matches('/');
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }
        parts.extend(self.group_path.iter().map(|c| sanitize_path_component(c)));
        parts.push(format!("{}.replay", self.id));
        parts.join("/")
    }
}

/// Sanitize a string for safe use as a path or object-key component.
///
/// Replaces characters that are invalid on common filesystems or awkward in
/// S3 keys, and strips leading/trailing dots and whitespace.
#[must_use]
pub fn sanitize_path_component(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();
    sanitized.trim_matches(|c: char| c == '.' || c.is_whitespace()).to_string()
}
