//! Wire types for the ballchasing API.
//!
//! Only the fields the collector needs are modeled; everything else in the
//! payloads is ignored. Conversions into the domain types live here so the
//! client stays free of field-by-field mapping.

use serde::Deserialize;

use rlvault_core::{Group, GroupId, ReplayReference};

/// A group as returned by `GET /api/groups/{id}` and in child listings.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupDto {
    pub id: String,
    pub name: String,
}

impl GroupDto {
    pub fn into_group(self, parent: Option<&GroupId>) -> Group {
        let group = Group::new(self.id, self.name);
        match parent {
            Some(parent) => group.with_parent(parent.clone()),
            None => group,
        }
    }
}

/// One page of child groups from `GET /api/groups?group=...`.
#[derive(Debug, Deserialize)]
pub struct GroupPage {
    #[serde(default)]
    pub list: Vec<GroupDto>,
    /// URL of the next page, absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
}

/// A replay as returned in listings and by `GET /api/replays/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayDto {
    pub id: String,
    #[serde(default)]
    pub replay_title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    /// Group memberships, only present on the detail endpoint.
    #[serde(default)]
    pub groups: Vec<GroupDto>,
}

impl ReplayDto {
    /// Convert into a reference under the group it was listed from.
    pub fn into_reference(self, group_id: &GroupId) -> ReplayReference {
        let mut reference = ReplayReference::new(self.id, group_id.clone());
        reference.title = self.replay_title;
        reference.date = self.date;
        reference
    }

    /// Convert a detail payload, taking the group from the payload itself.
    pub fn into_detail_reference(mut self) -> ReplayReference {
        let group_id = self
            .groups
            .drain(..)
            .next()
            .map_or_else(|| GroupId::from(""), |g| GroupId::from(g.id));
        let mut reference = ReplayReference::new(self.id, group_id);
        reference.title = self.replay_title;
        reference.date = self.date;
        reference
    }
}

/// One page of replays from `GET /api/replays?group=...`.
#[derive(Debug, Deserialize)]
pub struct ReplayPage {
    #[serde(default)]
    pub list: Vec<ReplayDto>,
    /// URL of the next page, absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn group_page_tolerates_missing_fields() {
        let page: GroupPage = serde_json::from_value(json!({})).unwrap();
        assert!(page.list.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn replay_listing_converts_to_reference() {
        let dto: ReplayDto = serde_json::from_value(json!({
            "id": "r1",
            "replay_title": "Game 1",
            "date": "2026-05-01T18:00:00Z"
        }))
        .unwrap();
        let reference = dto.into_reference(&GroupId::from("g1"));
        assert_eq!(reference.id.as_str(), "r1");
        assert_eq!(reference.group_id.as_str(), "g1");
        assert_eq!(reference.title.as_deref(), Some("Game 1"));
    }

    #[test]
    fn replay_detail_takes_group_from_payload() {
        let dto: ReplayDto = serde_json::from_value(json!({
            "id": "r1",
            "groups": [{"id": "g7", "name": "Finals"}]
        }))
        .unwrap();
        let reference = dto.into_detail_reference();
        assert_eq!(reference.group_id.as_str(), "g7");
    }
}
