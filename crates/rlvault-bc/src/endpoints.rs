//! URL construction for the ballchasing API.

use url::Url;

use rlvault_core::{CollectError, CollectResult, GroupId, ReplayId};

/// Default base URL of the production API.
pub const DEFAULT_BASE_URL: &str = "https://ballchasing.com/api/";

/// Builds endpoint URLs from a validated base.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Parse and validate the base URL. The base must be joinable, so a
    /// missing trailing slash is corrected here.
    pub fn new(base: &str) -> CollectResult<Self> {
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base = Url::parse(&normalized)
            .map_err(|e| CollectError::config(format!("invalid API base URL '{base}': {e}")))?;
        Ok(Self { base })
    }

    fn join(&self, path: &str) -> CollectResult<Url> {
        self.base
            .join(path)
            .map_err(|e| CollectError::config(format!("invalid API path '{path}': {e}")))
    }

    /// `GET /api/` credential check.
    pub fn ping(&self) -> CollectResult<Url> {
        Ok(self.base.clone())
    }

    /// `GET /api/groups/{id}`.
    pub fn group(&self, id: &GroupId) -> CollectResult<Url> {
        self.join(&format!("groups/{id}"))
    }

    /// `GET /api/groups?group={id}&count={n}[&after={cursor}]`.
    pub fn child_groups(
        &self,
        id: &GroupId,
        count: u32,
        after: Option<&str>,
    ) -> CollectResult<Url> {
        let mut url = self.join("groups")?;
        append_listing_query(&mut url, id, count, after);
        Ok(url)
    }

    /// `GET /api/replays?group={id}&count={n}[&after={cursor}]`.
    pub fn group_replays(
        &self,
        id: &GroupId,
        count: u32,
        after: Option<&str>,
    ) -> CollectResult<Url> {
        let mut url = self.join("replays")?;
        append_listing_query(&mut url, id, count, after);
        Ok(url)
    }

    /// `GET /api/replays/{id}`.
    pub fn replay(&self, id: &ReplayId) -> CollectResult<Url> {
        self.join(&format!("replays/{id}"))
    }

    /// `GET /api/replays/{id}/file`.
    pub fn replay_file(&self, id: &ReplayId) -> CollectResult<Url> {
        self.join(&format!("replays/{id}/file"))
    }
}

fn append_listing_query(url: &mut Url, group: &GroupId, count: u32, after: Option<&str>) {
    let mut query = url.query_pairs_mut();
    query
        .append_pair("group", group.as_str())
        .append_pair("count", &count.to_string());
    if let Some(after) = after {
        query.append_pair("after", after);
    }
}

/// Extract the pagination cursor from a `next` page URL.
///
/// The API hands back a full URL; only its `after` parameter matters and
/// it is treated as opaque. A `next` without a cursor ends pagination.
pub fn next_cursor(next: Option<&str>) -> Option<String> {
    let next = Url::parse(next?).ok()?;
    next.query_pairs()
        .find(|(key, _)| key == "after")
        .map(|(_, value)| value.into_owned())
}
