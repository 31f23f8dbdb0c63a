//! Group-tree expansion.
//!
//! Walks the group hierarchy breadth-first from a root, collecting every
//! reachable replay exactly once. The remote tree is not trusted to be a
//! tree: a group reachable through two parents (a diamond) is expanded
//! once, and a group that appears on its own ancestor path (a cycle) is
//! recorded and skipped instead of looping.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

use rlvault_core::{
    ApiClientPort, CollectResult, Group, GroupId, ReplayId, ReplayReference,
};

/// Everything discovered by one expansion.
#[derive(Debug, Default)]
pub struct Expansion {
    /// Deduplicated replay references, each carrying its group path.
    /// For diamonds, the path of the first group the replay was seen under.
    pub replays: Vec<ReplayReference>,
    /// Every expanded group with the number of replays listed directly in it.
    pub groups: Vec<(Group, u64)>,
    /// Group ids that closed a cycle and were skipped.
    pub cycles: Vec<GroupId>,
}

/// Breadth-first expander over the remote group hierarchy.
pub struct GroupTreeExpander {
    api: Arc<dyn ApiClientPort>,
}

struct PendingGroup {
    group: Group,
    /// Group names from the root down to this group.
    path: Vec<String>,
    /// Group ids from the root down to this group, for cycle checks.
    ancestors: Vec<GroupId>,
}

impl GroupTreeExpander {
    pub fn new(api: Arc<dyn ApiClientPort>) -> Self {
        Self { api }
    }

    /// Expand the tree rooted at `root`.
    ///
    /// Listing calls are one per group (plus pagination inside the client),
    /// so the API cost is proportional to the number of distinct groups.
    /// Fails only on unrecoverable API errors; cycles and diamonds are
    /// handled inline.
    pub async fn expand(&self, root: &GroupId) -> CollectResult<Expansion> {
        let root_group = self.api.get_group(root).await?;

        let mut expansion = Expansion::default();
        let mut visited: HashSet<GroupId> = HashSet::new();
        let mut seen_replays: HashSet<ReplayId> = HashSet::new();

        let mut queue = VecDeque::new();
        queue.push_back(PendingGroup {
            path: vec![root_group.name.clone()],
            ancestors: vec![root_group.id.clone()],
            group: root_group,
        });

        while let Some(pending) = queue.pop_front() {
            if !visited.insert(pending.group.id.clone()) {
                continue;
            }

            let listed = self.api.list_group_replays(&pending.group.id).await?;
            let listed_count = listed.len() as u64;
            for reference in listed {
                if seen_replays.insert(reference.id.clone()) {
                    expansion
                        .replays
                        .push(reference.with_path(pending.path.clone()));
                }
            }

            let children = self.api.list_child_groups(&pending.group.id).await?;
            for child in children {
                if pending.ancestors.contains(&child.id) {
                    warn!(group = %child.id, "cycle detected in group tree, skipping branch");
                    expansion.cycles.push(child.id);
                    continue;
                }
                if visited.contains(&child.id) {
                    // Diamond: already expanded through another parent
                    continue;
                }
                let mut path = pending.path.clone();
                path.push(child.name.clone());
                let mut ancestors = pending.ancestors.clone();
                ancestors.push(child.id.clone());
                queue.push_back(PendingGroup {
                    group: child,
                    path,
                    ancestors,
                });
            }

            debug!(group = %pending.group.id, replays = listed_count, "expanded group");
            expansion.groups.push((pending.group, listed_count));
        }

        Ok(expansion)
    }
}
