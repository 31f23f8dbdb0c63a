//! Scripted API client double shared by the expander and orchestrator tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use rlvault_core::{
    ApiClientPort, CollectError, CollectResult, Group, GroupId, ReplayByteStream, ReplayId,
    ReplayReference,
};

/// In-memory API client with a scriptable group tree and replay files.
#[derive(Default)]
pub struct FakeApi {
    groups: Mutex<HashMap<GroupId, Group>>,
    children: Mutex<HashMap<GroupId, Vec<Group>>>,
    replays: Mutex<HashMap<GroupId, Vec<ReplayReference>>>,
    files: Mutex<HashMap<ReplayId, Bytes>>,
    download_failures: Mutex<HashMap<ReplayId, VecDeque<CollectError>>>,
    hanging_downloads: Mutex<HashSet<ReplayId>>,
    ping_error: Mutex<Option<CollectError>>,
    download_calls: Mutex<Vec<ReplayId>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, id: &str, name: &str) -> Self {
        self.groups
            .lock()
            .unwrap()
            .insert(GroupId::from(id), Group::new(id, name));
        self
    }

    /// Register `child` as a group and link it under `parent`.
    pub fn with_child(self, parent: &str, child: &str, name: &str) -> Self {
        let group = Group::new(child, name).with_parent(parent);
        self.groups
            .lock()
            .unwrap()
            .insert(GroupId::from(child), group.clone());
        self.children
            .lock()
            .unwrap()
            .entry(GroupId::from(parent))
            .or_default()
            .push(group);
        self
    }

    /// Link an already-registered group under another parent (diamonds, cycles).
    pub fn with_edge(self, parent: &str, child: &str) -> Self {
        let group = self
            .groups
            .lock()
            .unwrap()
            .get(&GroupId::from(child))
            .cloned()
            .unwrap_or_else(|| Group::new(child, child));
        self.children
            .lock()
            .unwrap()
            .entry(GroupId::from(parent))
            .or_default()
            .push(group);
        self
    }

    pub fn with_replay(self, group: &str, replay: &str, bytes: &'static [u8]) -> Self {
        self.replays
            .lock()
            .unwrap()
            .entry(GroupId::from(group))
            .or_default()
            .push(ReplayReference::new(replay, group));
        self.files
            .lock()
            .unwrap()
            .insert(ReplayId::from(replay), Bytes::from_static(bytes));
        self
    }

    /// Queue `times` download failures for a replay before it succeeds.
    pub fn fail_download(self, replay: &str, err: &CollectError, times: usize) -> Self {
        {
            let mut failures = self.download_failures.lock().unwrap();
            let entry = failures.entry(ReplayId::from(replay)).or_default();
            for _ in 0..times {
                entry.push_back(err.clone());
            }
        }
        self
    }

    /// Make downloads of this replay hang until cancelled.
    pub fn hang_download(self, replay: &str) -> Self {
        self.hanging_downloads
            .lock()
            .unwrap()
            .insert(ReplayId::from(replay));
        self
    }

    pub fn fail_ping(self, err: CollectError) -> Self {
        *self.ping_error.lock().unwrap() = Some(err);
        self
    }

    /// Every replay id a download was attempted for, in order.
    pub fn download_calls(&self) -> Vec<ReplayId> {
        self.download_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiClientPort for FakeApi {
    async fn ping(&self) -> CollectResult<()> {
        match self.ping_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn get_group(&self, id: &GroupId) -> CollectResult<Group> {
        self.groups
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| CollectError::not_found(format!("groups/{id}")))
    }

    async fn list_child_groups(&self, id: &GroupId) -> CollectResult<Vec<Group>> {
        Ok(self
            .children
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_group_replays(&self, id: &GroupId) -> CollectResult<Vec<ReplayReference>> {
        Ok(self
            .replays
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_replay(&self, id: &ReplayId) -> CollectResult<ReplayReference> {
        let replays = self.replays.lock().unwrap();
        replays
            .iter()
            .flat_map(|(_, list)| list.iter())
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| CollectError::not_found(format!("replays/{id}")))
    }

    async fn download_replay(&self, id: &ReplayId) -> CollectResult<ReplayByteStream> {
        self.download_calls.lock().unwrap().push(id.clone());

        if self.hanging_downloads.lock().unwrap().contains(id) {
            return Ok(Box::pin(futures::stream::pending()));
        }
        if let Some(err) = self
            .download_failures
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        let bytes = self
            .files
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| CollectError::not_found(format!("replays/{id}/file")))?;
        Ok(Box::pin(futures::stream::iter(vec![Ok(bytes)])))
    }
}
