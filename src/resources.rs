//! Exactly-once bookkeeping for everything a scene allocates.

use std::collections::HashMap;

use crate::render::{ResourceCommand, ResourceKind};
use crate::scene::Generation;

/// Handle to a resource owned by one scene.
///
/// Ids carry the owning scene's [`Generation`], so an id from a previous
/// scene can never alias a live resource of the current one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    generation: Generation,
    index: u32,
}

impl ResourceId {
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

/// The scene resource set.
///
/// Every geometry, material and control listener a scene creates is
/// allocated here, and the ledger guarantees each one is released at most
/// once. GPU-facing allocations and releases are queued as
/// [`ResourceCommand`]s for the render surface.
#[derive(Debug)]
pub struct ResourceLedger {
    generation: Generation,
    next_index: u32,
    live: HashMap<ResourceId, ResourceKind>,
    allocated: usize,
    released: usize,
    rejected_releases: usize,
    commands: Vec<ResourceCommand>,
}

impl ResourceLedger {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            next_index: 0,
            live: HashMap::new(),
            allocated: 0,
            released: 0,
            rejected_releases: 0,
            commands: Vec::new(),
        }
    }

    pub fn allocate(&mut self, kind: ResourceKind) -> ResourceId {
        let id = ResourceId {
            generation: self.generation,
            index: self.next_index,
        };
        self.next_index += 1;
        self.allocated += 1;
        self.live.insert(id, kind);
        if kind.is_gpu() {
            self.commands.push(ResourceCommand::Upload { id, kind });
        }
        id
    }

    /// Release a resource. Returns `false` (and releases nothing) if the id
    /// is not live, which covers double releases and foreign ids.
    pub fn release(&mut self, id: ResourceId) -> bool {
        match self.live.remove(&id) {
            Some(kind) => {
                self.released += 1;
                if kind.is_gpu() {
                    self.commands.push(ResourceCommand::Release { id });
                }
                true
            }
            None => {
                self.rejected_releases += 1;
                tracing::warn!(?id, "rejected release of a resource that is not live");
                false
            }
        }
    }

    /// Release everything still live. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let mut ids: Vec<ResourceId> = self.live.keys().copied().collect();
        ids.sort();
        let count = ids.len();
        for id in ids {
            self.release(id);
        }
        count
    }

    pub fn is_live(&self, id: ResourceId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Total allocations over the ledger's lifetime.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Total successful releases over the ledger's lifetime.
    pub fn released(&self) -> usize {
        self.released
    }

    /// Release attempts that were refused because the id was not live.
    pub fn rejected_releases(&self) -> usize {
        self.rejected_releases
    }

    /// Take the queued surface commands, oldest first.
    pub fn drain_commands(&mut self) -> std::vec::Drain<'_, ResourceCommand> {
        self.commands.drain(..)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Color, Shape};

    fn ledger() -> ResourceLedger {
        ResourceLedger::new(Generation::FIRST)
    }

    #[test]
    fn release_is_exactly_once() {
        let mut ledger = ledger();
        let id = ledger.allocate(ResourceKind::Geometry(Shape::Sphere));

        assert!(ledger.release(id));
        assert!(!ledger.release(id));
        assert_eq!(ledger.released(), 1);
        assert_eq!(ledger.rejected_releases(), 1);
    }

    #[test]
    fn listeners_do_not_reach_the_surface() {
        let mut ledger = ledger();
        let listener = ledger.allocate(ResourceKind::Listener);
        let mat = ledger.allocate(ResourceKind::Material(Color::GOLD));
        ledger.release(listener);
        ledger.release(mat);

        let commands: Vec<_> = ledger.drain_commands().collect();
        assert_eq!(
            commands,
            vec![
                ResourceCommand::Upload {
                    id: mat,
                    kind: ResourceKind::Material(Color::GOLD)
                },
                ResourceCommand::Release { id: mat },
            ]
        );
    }

    #[test]
    fn release_all_balances_the_books() {
        let mut ledger = ledger();
        for _ in 0..5 {
            ledger.allocate(ResourceKind::Geometry(Shape::Cube));
        }
        assert_eq!(ledger.release_all(), 5);
        assert_eq!(ledger.release_all(), 0);
        assert_eq!(ledger.allocated(), ledger.released());
        assert_eq!(ledger.live_count(), 0);
    }

    #[test]
    fn ids_from_other_generations_are_foreign() {
        let mut old = ResourceLedger::new(Generation::FIRST);
        let stale = old.allocate(ResourceKind::Listener);

        let mut current = ResourceLedger::new(Generation::FIRST.next());
        current.allocate(ResourceKind::Listener);
        assert!(!current.release(stale));
        assert_eq!(current.live_count(), 1);
    }
}
