//! Replay group identity and metadata.
//!
//! Groups on ballchasing.com form a hierarchy: a tournament group contains
//! stage groups, which contain match groups, which contain replays. Only the
//! identity and the parent edge are modeled here; child discovery happens
//! through the API client at expansion time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical identifier for a replay group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Create a new group ID.
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

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Metadata for a single group as returned by the remote API.
///
/// The parent edge is an owned reference, not an ownership edge: the group
/// tree is discovered lazily and a group object never holds its children.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group identifier.
    pub id: GroupId,
    /// Human-readable group name (used in storage paths).
    pub name: String,
    /// Parent group, if this group is not a hierarchy root.
    pub parent: Option<GroupId>,
}

impl Group {
    /// Create group metadata.
    pub fn new(id: impl Into<GroupId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent: None,
        }
    }

    /// Attach a parent reference.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<GroupId>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}
