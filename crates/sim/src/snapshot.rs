use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use command::{ClientId, EntityId};

use crate::entity::Entity;

/// The complete world state at a discrete tick (§3). Two snapshots are
/// equal iff their tick counters agree and both maps are element-wise
/// equal — the derived `PartialEq` gives exactly that since `BTreeMap`'s
/// `PartialEq` is already element-wise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: u64,
    pub players: BTreeMap<ClientId, EntityId>,
    pub entities: BTreeMap<EntityId, Entity>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            tick: 0,
            players: BTreeMap::new(),
            entities: BTreeMap::new(),
        }
    }

    /// Smallest-unused-integer policy (§9 Design Notes), so entity ids
    /// stay deterministic across a remove/add cycle.
    pub fn next_free_entity_id(&self) -> EntityId {
        let mut id = 0;
        while self.entities.contains_key(&id) {
            id += 1;
        }
        id
    }

    /// Invariant check used by tests and by the server before trusting a
    /// snapshot it is about to broadcast (§3: "every value in `players`
    /// is a key in `entities`").
    pub fn no_dangling_players(&self) -> bool {
        self.players.values().all(|id| self.entities.contains_key(id))
    }
}
