//! Entity identity: the packed 64-bit [`EntityId`] and the process-wide
//! `global_id -> EntityId` lookup table that lets a component resolve its
//! owning entity without holding a direct reference to it (see module docs
//! on [`GlobalIdRegistry`]).

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

const GRAPH_ID_BITS: u32 = 12;
const GRAPH_SLOT_BITS: u32 = 20;
const GLOBAL_ID_BITS: u32 = 32;

const GRAPH_ID_SHIFT: u32 = GRAPH_SLOT_BITS + GLOBAL_ID_BITS;
const GRAPH_SLOT_SHIFT: u32 = GLOBAL_ID_BITS;

const GRAPH_ID_MASK: u64 = (1u64 << GRAPH_ID_BITS) - 1;
const GRAPH_SLOT_MASK: u64 = (1u64 << GRAPH_SLOT_BITS) - 1;

/// Maximum number of simultaneously active graphs (`2^12`).
pub const MAX_GRAPHS: u32 = 1 << GRAPH_ID_BITS;
/// Maximum entities per graph; slot id `0` is reserved for "unallocated"
/// (`2^20 - 1`).
pub const MAX_SLOTS_PER_GRAPH: u32 = (1 << GRAPH_SLOT_BITS) - 1;
/// Graph id reserved for process-wide persistent entities.
pub const PERSISTENT_GRAPH_ID: u16 = 0;

/// A 64-bit packed entity handle: `[graph_id: 12][graph_slot_id: 20][global_id: 32]`.
///
/// `global_id` is assigned once at construction and never changes for the
/// life of the entity; `graph_id`/`graph_slot_id` change when the entity
/// moves between graphs or is (re)registered.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// Build an id from its three fields. Fatal assertion if `graph_id` or
    /// `graph_slot_id` overflow their bit widths (`CapacityExceeded`).
    pub fn new(graph_id: u16, graph_slot_id: u32, global_id: u32) -> Self {
        assert!(
            (graph_id as u64) <= GRAPH_ID_MASK,
            "graph_id {graph_id} exceeds 12-bit field"
        );
        assert!(
            (graph_slot_id as u64) <= GRAPH_SLOT_MASK,
            "graph_slot_id {graph_slot_id} exceeds 20-bit field"
        );
        let raw = ((graph_id as u64) << GRAPH_ID_SHIFT)
            | ((graph_slot_id as u64) << GRAPH_SLOT_SHIFT)
            | (global_id as u64);
        Self(raw)
    }

    /// An id with `graph_slot_id == 0` ("unallocated") for the given
    /// `global_id`, used before the owning entity has been registered into
    /// a graph.
    pub fn unregistered(global_id: u32) -> Self {
        Self::new(PERSISTENT_GRAPH_ID, 0, global_id)
    }

    /// Returns a copy of this id moved to a new graph/slot, preserving
    /// `global_id` — the contract for moving an entity between graphs.
    pub fn with_graph_slot(self, graph_id: u16, graph_slot_id: u32) -> Self {
        Self::new(graph_id, graph_slot_id, self.global_id())
    }

    #[inline]
    pub fn graph_id(self) -> u16 {
        ((self.0 >> GRAPH_ID_SHIFT) & GRAPH_ID_MASK) as u16
    }

    #[inline]
    pub fn graph_slot_id(self) -> u32 {
        ((self.0 >> GRAPH_SLOT_SHIFT) & GRAPH_SLOT_MASK) as u32
    }

    #[inline]
    pub fn global_id(self) -> u32 {
        self.0 as u32
    }

    /// `true` if this id has never been registered into a graph slot.
    #[inline]
    pub fn is_registered(self) -> bool {
        self.graph_slot_id() != 0
    }

    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EntityId(graph={}, slot={}, global={})",
            self.graph_id(),
            self.graph_slot_id(),
            self.global_id()
        )
    }
}

/// Process-wide `global_id -> EntityId` lookup.
///
/// Components hold only the 32-bit `global_id` of their owning entity
/// (never a direct reference), which breaks the component<->entity
/// reference cycle; this registry is how a component resolves the rest of
/// the identity (current graph/slot) in O(1). Entries are populated at
/// entity construction and removed at destruction.
pub struct GlobalIdRegistry {
    next_id: AtomicU32,
    by_global_id: HashMap<u32, EntityId>,
}

impl GlobalIdRegistry {
    pub fn new() -> Self {
        Self {
            // Start at 1 so a default-initialized `global_id: 0` is never a
            // valid, resolvable entity.
            next_id: AtomicU32::new(1),
            by_global_id: HashMap::new(),
        }
    }

    /// Allocate the next process-wide `global_id`. Uses an atomic
    /// fetch-add (rather than a plain counter) so creation would remain
    /// correct if entity construction were ever parallelized.
    pub fn allocate_global_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Record (or update, e.g. after a graph move / registration) the
    /// current `EntityId` for its `global_id`.
    pub fn set(&mut self, id: EntityId) {
        self.by_global_id.insert(id.global_id(), id);
    }

    /// Remove the entry for `global_id` on entity destruction.
    pub fn remove(&mut self, global_id: u32) {
        self.by_global_id.remove(&global_id);
    }

    /// Resolve the current `EntityId` for a persistent `global_id`.
    pub fn resolve(&self, global_id: u32) -> Option<EntityId> {
        self.by_global_id.get(&global_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_global_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_global_id.is_empty()
    }
}

impl Default for GlobalIdRegistry {
    fn default() -> Self {
        Self::new()
    }
}
