//! Undo-logged transactions over the in-memory state.

use std::collections::{BTreeMap, HashMap};

use crate::domain::{Allocation, AllocationId, CascadeStep, Presence, Resource, User};

/// `(username, resource)`.
pub(super) type SessionKey = (String, String);

/// Everything the in-memory backend holds, guarded by a single lock.
#[derive(Debug, Default)]
pub(super) struct MemoryState {
    pub closed: bool,
    pub allocations: HashMap<AllocationId, Allocation>,
    pub presences: BTreeMap<SessionKey, Presence>,
    pub resources: BTreeMap<SessionKey, Resource>,
    pub users: HashMap<String, User>,
}

impl MemoryState {
    pub fn clear(&mut self) {
        self.allocations.clear();
        self.presences.clear();
        self.resources.clear();
        self.users.clear();
    }
}

enum Undo {
    Presence(Presence),
    Resource(Resource),
    Allocation(Allocation),
}

/// Mutations applied through a transaction are reverted when it is dropped
/// without [`Transaction::commit`].
pub(super) struct Transaction<'a> {
    state: &'a mut MemoryState,
    undo: Vec<Undo>,
    committed: bool,
}

impl<'a> Transaction<'a> {
    pub fn begin(state: &'a mut MemoryState) -> Self {
        Self {
            state,
            undo: Vec::new(),
            committed: false,
        }
    }

    /// Run one cascade step for `id`. Returns the number of records removed.
    pub fn delete(&mut self, step: CascadeStep, id: &AllocationId) -> usize {
        match step {
            CascadeStep::Presences => {
                let mut removed = Vec::new();
                self.state.presences.retain(|_, presence| {
                    if presence.allocation_id == *id {
                        removed.push(presence.clone());
                        false
                    } else {
                        true
                    }
                });
                let count = removed.len();
                self.undo.extend(removed.into_iter().map(Undo::Presence));
                count
            }
            CascadeStep::Resources => {
                let mut removed = Vec::new();
                self.state.resources.retain(|_, resource| {
                    if resource.allocation_id == *id {
                        removed.push(resource.clone());
                        false
                    } else {
                        true
                    }
                });
                let count = removed.len();
                self.undo.extend(removed.into_iter().map(Undo::Resource));
                count
            }
            CascadeStep::Allocation => match self.state.allocations.remove(id) {
                Some(allocation) => {
                    self.undo.push(Undo::Allocation(allocation));
                    1
                }
                None => 0,
            },
        }
    }

    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        while let Some(undo) = self.undo.pop() {
            match undo {
                Undo::Presence(presence) => {
                    let key = (presence.username.clone(), presence.resource.clone());
                    self.state.presences.insert(key, presence);
                }
                Undo::Resource(resource) => {
                    let key = (resource.username.clone(), resource.resource.clone());
                    self.state.resources.insert(key, resource);
                }
                Undo::Allocation(allocation) => {
                    self.state.allocations.insert(allocation.id.clone(), allocation);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timestamp_now;

    fn seeded() -> MemoryState {
        let node = AllocationId::new("node-a");
        let other = AllocationId::new("node-b");
        let mut state = MemoryState::default();
        state
            .allocations
            .insert(node.clone(), Allocation::new(node.clone(), timestamp_now()));
        for (user, owner) in [("alice", &node), ("bob", &node), ("carol", &other)] {
            state.presences.insert(
                (user.into(), "desk".into()),
                Presence::new(user, "desk", owner.clone()),
            );
        }
        state.resources.insert(
            ("alice".into(), "desk".into()),
            Resource::new("alice", "desk", node),
        );
        state
    }

    #[test]
    fn dropped_transaction_restores_everything() {
        let mut state = seeded();
        let id = AllocationId::new("node-a");
        {
            let mut tx = Transaction::begin(&mut state);
            assert_eq!(tx.delete(CascadeStep::Presences, &id), 2);
            assert_eq!(tx.delete(CascadeStep::Resources, &id), 1);
        }
        assert_eq!(state.presences.len(), 3);
        assert_eq!(state.resources.len(), 1);
        assert!(state.allocations.contains_key(&id));
    }

    #[test]
    fn committed_transaction_keeps_deletions() {
        let mut state = seeded();
        let id = AllocationId::new("node-a");
        let mut tx = Transaction::begin(&mut state);
        for step in CascadeStep::ORDER {
            tx.delete(step, &id);
        }
        tx.commit();

        assert_eq!(state.presences.len(), 1);
        assert!(state.resources.is_empty());
        assert!(state.allocations.is_empty());
    }

    #[test]
    fn deleting_unknown_allocation_touches_nothing() {
        let mut state = seeded();
        let id = AllocationId::new("ghost");
        let mut tx = Transaction::begin(&mut state);
        let removed: usize = CascadeStep::ORDER.iter().map(|s| tx.delete(*s, &id)).sum();
        tx.commit();
        assert_eq!(removed, 0);
        assert_eq!(state.presences.len(), 3);
    }
}
