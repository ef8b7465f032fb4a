//! [`EntityGraph`]: per-graph structure-of-arrays hierarchy columns and
//! dirty-flag-driven world transform propagation. [`GraphTable`] is the
//! process-wide table of graphs keyed by `graph_id`, the lookup a
//! [`crate::transform::Transform`] uses to resolve "the graph my entity
//! lives in" from nothing but its own `global_id`.

use crate::bitfield::{BitfieldArray, BITS_PER_BLOCK};
use crate::component::{Component, ComponentRegistry};
use crate::entity::{EntityId, GlobalIdRegistry};
use crate::game_entity::GameEntity;
use crate::math::{Mat4, Trs};
use crate::transform::Transform;

/// Per-graph structure-of-arrays hierarchy storage, indexed by the 0-based
/// internal slot (one less than the 1-based `graph_slot_id`).
pub struct EntityGraph {
    graph_id: u16,
    allocated_bits: BitfieldArray,
    dirty_bits: BitfieldArray,
    parent_id: Vec<i32>,
    first_child_id: Vec<i32>,
    next_sibling_id: Vec<i32>,
    prev_sibling_id: Vec<i32>,
    depth: Vec<i32>,
    local_transform_ref: Vec<Option<usize>>,
    world_transform: Vec<Trs>,
    world_matrix: Vec<Mat4>,
    entity_ref: Vec<Option<EntityId>>,
    // Scratch buffers for `update_transforms`, reused between frames and
    // cleared on entry/exit; safe only under the single-threaded model.
    scratch_worklist: Vec<usize>,
    scratch_stack: Vec<usize>,
    scratch_visited: BitfieldArray,
}

impl EntityGraph {
    pub fn new(graph_id: u16) -> Self {
        Self {
            graph_id,
            allocated_bits: BitfieldArray::new(),
            dirty_bits: BitfieldArray::new(),
            parent_id: Vec::new(),
            first_child_id: Vec::new(),
            next_sibling_id: Vec::new(),
            prev_sibling_id: Vec::new(),
            depth: Vec::new(),
            local_transform_ref: Vec::new(),
            world_transform: Vec::new(),
            world_matrix: Vec::new(),
            entity_ref: Vec::new(),
            scratch_worklist: Vec::new(),
            scratch_stack: Vec::new(),
            scratch_visited: BitfieldArray::new(),
        }
    }

    pub fn graph_id(&self) -> u16 {
        self.graph_id
    }

    fn capacity(&self) -> usize {
        self.parent_id.len()
    }

    fn grow_columns_to(&mut self, new_capacity: usize) {
        if new_capacity <= self.capacity() {
            return;
        }
        self.allocated_bits.reserve(new_capacity);
        self.dirty_bits.reserve(new_capacity);
        self.parent_id.resize(new_capacity, -1);
        self.first_child_id.resize(new_capacity, -1);
        self.next_sibling_id.resize(new_capacity, -1);
        self.prev_sibling_id.resize(new_capacity, -1);
        self.depth.resize(new_capacity, 0);
        self.local_transform_ref.resize(new_capacity, None);
        self.world_transform.resize(new_capacity, Trs::IDENTITY);
        self.world_matrix.resize(new_capacity, Mat4::IDENTITY);
        self.entity_ref.resize(new_capacity, None);
        tracing::trace!(graph_id = self.graph_id, new_capacity, "EntityGraph growing");
    }

    /// Allocate a 0-based internal slot, reusing the lowest freed one.
    fn allocate_slot(&mut self) -> usize {
        let mut slot = self.allocated_bits.find_first_clear();
        if slot < 0 {
            self.grow_columns_to(self.capacity() + BITS_PER_BLOCK);
            slot = self.allocated_bits.find_first_clear();
        }
        let slot = slot as usize;
        if slot >= self.capacity() {
            self.grow_columns_to(slot + 1);
        }

        self.allocated_bits.set_bit(slot);
        self.parent_id[slot] = -1;
        self.first_child_id[slot] = -1;
        self.next_sibling_id[slot] = -1;
        self.prev_sibling_id[slot] = -1;
        self.depth[slot] = 0;
        self.local_transform_ref[slot] = None;
        self.world_transform[slot] = Trs::IDENTITY;
        self.world_matrix[slot] = Mat4::IDENTITY;
        self.entity_ref[slot] = None;
        self.dirty_bits.set_bit(slot);
        slot
    }

    fn slot_index(&self, entity_id: EntityId) -> Option<usize> {
        let slot = entity_id.graph_slot_id();
        if slot == 0 {
            return None;
        }
        let slot0 = (slot - 1) as usize;
        if slot0 >= self.capacity() || !self.allocated_bits.get_bit(slot0) {
            return None;
        }
        Some(slot0)
    }

    /// Allocate a graph slot and a fresh `global_id` for a new entity. The
    /// returned `GameEntity`'s identity carries `graph_slot_id == 0` (not
    /// yet "registered") until [`try_register_entity`](Self::try_register_entity)
    /// stamps it, following the "created -> slot allocated -> ... ->
    /// registered" lifecycle.
    pub fn create_entity(&mut self, global_ids: &mut GlobalIdRegistry) -> GameEntity {
        let slot0 = self.allocate_slot();
        let graph_slot_id = (slot0 + 1) as u32;
        let global_id = global_ids.allocate_global_id();
        let entity_id = EntityId::unregistered(global_id);
        global_ids.set(entity_id);
        self.entity_ref[slot0] = Some(entity_id);
        GameEntity::new(entity_id, graph_slot_id)
    }

    /// Stamp `entity`'s already-allocated graph slot into its `EntityId`,
    /// provided it holds a Transform. Returns `false` (leaving `entity`
    /// unchanged) if it does not.
    pub fn try_register_entity(&mut self, entity: &mut GameEntity, global_ids: &mut GlobalIdRegistry) -> bool {
        let Some(transform_slot) = entity.component_registry_slot(Transform::TYPE_ID) else {
            return false;
        };
        let slot0 = (entity.graph_slot() - 1) as usize;
        assert!(
            slot0 < self.capacity() && self.allocated_bits.get_bit(slot0),
            "try_register_entity: entity's graph slot is not allocated in this graph"
        );

        self.local_transform_ref[slot0] = Some(transform_slot);
        let registered_identity = entity.identity().with_graph_slot(self.graph_id, entity.graph_slot());
        entity.set_identity(registered_identity);
        global_ids.set(registered_identity);
        self.entity_ref[slot0] = Some(registered_identity);
        self.dirty_bits.set_bit(slot0);
        true
    }

    fn detach_from_parent(&mut self, slot: usize) {
        let parent = self.parent_id[slot];
        let prev = self.prev_sibling_id[slot];
        let next = self.next_sibling_id[slot];
        if prev >= 0 {
            self.next_sibling_id[prev as usize] = next;
        } else if parent >= 0 {
            self.first_child_id[parent as usize] = next;
        }
        if next >= 0 {
            self.prev_sibling_id[next as usize] = prev;
        }
        self.parent_id[slot] = -1;
        self.prev_sibling_id[slot] = -1;
        self.next_sibling_id[slot] = -1;
    }

    fn update_depth_recursive(&mut self, root: usize, new_depth: i32) {
        self.depth[root] = new_depth;
        self.scratch_stack.clear();
        self.scratch_stack.push(root);
        while let Some(slot) = self.scratch_stack.pop() {
            let next_depth = self.depth[slot] + 1;
            let mut child = self.first_child_id[slot];
            while child >= 0 {
                let c = child as usize;
                self.depth[c] = next_depth;
                self.scratch_stack.push(c);
                child = self.next_sibling_id[c];
            }
        }
    }

    /// Re-parent `child` under `parent` (or detach to root if `None`),
    /// unlinking it from its previous sibling chain and relinking it into
    /// the new parent's child list. Cyclic parenting is caller-enforced and
    /// unchecked.
    pub fn set_parent(&mut self, child_graph_slot_id: u32, parent_graph_slot_id: Option<u32>) {
        let child = (child_graph_slot_id - 1) as usize;
        assert!(
            child < self.capacity() && self.allocated_bits.get_bit(child),
            "set_parent: child slot not allocated"
        );
        self.detach_from_parent(child);

        match parent_graph_slot_id {
            Some(parent_graph_slot_id) => {
                let parent = (parent_graph_slot_id - 1) as usize;
                assert!(
                    parent < self.capacity() && self.allocated_bits.get_bit(parent),
                    "set_parent: parent slot not allocated"
                );
                let old_first_child = self.first_child_id[parent];
                self.first_child_id[parent] = child as i32;
                self.prev_sibling_id[child] = -1;
                self.next_sibling_id[child] = old_first_child;
                if old_first_child >= 0 {
                    self.prev_sibling_id[old_first_child as usize] = child as i32;
                }
                self.parent_id[child] = parent as i32;
                let parent_depth = self.depth[parent];
                self.update_depth_recursive(child, parent_depth + 1);
            }
            None => {
                self.update_depth_recursive(child, 0);
            }
        }
        self.dirty_bits.set_bit(child);
    }

    /// Flip one slot's dirty bit. No-op (with a warning) if `entity_id`
    /// does not name a currently allocated slot in this graph.
    pub fn mark_dirty(&mut self, entity_id: EntityId) {
        match self.slot_index(entity_id) {
            Some(slot0) => self.dirty_bits.set_bit(slot0),
            None => tracing::warn!(?entity_id, "mark_dirty on unallocated or foreign slot"),
        }
    }

    pub fn is_dirty(&self, entity_id: EntityId) -> bool {
        self.slot_index(entity_id)
            .map(|slot0| self.dirty_bits.get_bit(slot0))
            .unwrap_or(false)
    }

    /// Hierarchy depth (root is 0), or `None` if `entity_id` is unallocated
    /// or foreign to this graph.
    pub fn depth(&self, entity_id: EntityId) -> Option<i32> {
        self.slot_index(entity_id).map(|slot0| self.depth[slot0])
    }

    pub fn try_get_parent_transform(&self, entity_id: EntityId) -> Option<Trs> {
        let slot0 = self.slot_index(entity_id)?;
        let parent = self.parent_id[slot0];
        if parent < 0 {
            return None;
        }
        Some(self.world_transform[parent as usize])
    }

    /// `None` if the entity is unallocated or currently dirty (world matrix
    /// stale).
    pub fn try_get_world_matrix(&self, entity_id: EntityId) -> Option<Mat4> {
        let slot0 = self.slot_index(entity_id)?;
        if self.dirty_bits.get_bit(slot0) {
            return None;
        }
        Some(self.world_matrix[slot0])
    }

    pub fn try_get_local_matrix(
        &self,
        entity_id: EntityId,
        transforms: &ComponentRegistry<Transform>,
    ) -> Option<Mat4> {
        let slot0 = self.slot_index(entity_id)?;
        let transform_slot = self.local_transform_ref[slot0]?;
        let transform = transforms.get(transform_slot)?;
        Some(transform.local().to_matrix())
    }

    fn gather_dirty_subtree(&mut self, root: usize) {
        self.scratch_stack.clear();
        self.scratch_stack.push(root);
        while let Some(slot) = self.scratch_stack.pop() {
            if self.scratch_visited.get_bit(slot) {
                continue;
            }
            self.scratch_visited.set_bit(slot);
            self.scratch_worklist.push(slot);
            let mut child = self.first_child_id[slot];
            while child >= 0 {
                let c = child as usize;
                self.scratch_stack.push(c);
                child = self.next_sibling_id[c];
            }
        }
    }

    /// Recompute world transforms for every dirty subtree: gather each
    /// dirty node's full descendant set, sort by depth then slot id, then
    /// compose parent-before-child. `transforms` is the `ComponentRegistry`
    /// backing every slot's `local_transform_ref`.
    pub fn update_transforms(&mut self, transforms: &ComponentRegistry<Transform>) {
        self.scratch_worklist.clear();
        self.scratch_visited.clear_all();

        // Step 1: gather each dirty subtree exactly once. A slot seeds a
        // gather only if its parent is absent or not itself dirty, so a
        // chain of consecutively dirty ancestors collapses to one gather
        // rooted at the topmost one; `scratch_visited` additionally
        // dedupes the sparser case of two dirty slots on the same branch
        // separated by a clean ancestor.
        for slot in self.dirty_bits.iter_set_bits().collect::<Vec<_>>() {
            if self.scratch_visited.get_bit(slot) {
                continue;
            }
            let parent = self.parent_id[slot];
            let parent_is_dirty = parent >= 0 && self.dirty_bits.get_bit(parent as usize);
            if !parent_is_dirty {
                self.gather_dirty_subtree(slot);
            }
        }

        // Step 2: stable sort by depth ascending; ties broken by slot id
        // ascending, so a parent is always composed before its children.
        let mut worklist = std::mem::take(&mut self.scratch_worklist);
        worklist.sort_by_key(|&slot| (self.depth[slot], slot));

        // Step 3: compose parent-then-child (worklist is depth-ordered, so
        // a slot's parent has already been recomputed this pass if it was
        // dirty, or still holds its valid value from a previous pass).
        for &slot in &worklist {
            let local = self.local_transform_ref[slot]
                .and_then(|s| transforms.get(s))
                .map(|t| t.local())
                .unwrap_or(Trs::IDENTITY);
            let parent = self.parent_id[slot];
            let world = if parent >= 0 {
                self.world_transform[parent as usize].compose(&local)
            } else {
                local
            };
            self.world_transform[slot] = world;
            self.world_matrix[slot] = world.to_matrix();
            self.dirty_bits.clear_bit(slot);
        }

        worklist.clear();
        self.scratch_worklist = worklist;
    }

    /// Detach from parent, orphan children (they become dirty roots rather
    /// than being recursively freed), and clear the slot. Idempotent.
    pub fn free_slot(&mut self, graph_slot_id: u32) {
        if graph_slot_id == 0 {
            return;
        }
        let slot = (graph_slot_id - 1) as usize;
        if slot >= self.capacity() || !self.allocated_bits.get_bit(slot) {
            return;
        }

        self.detach_from_parent(slot);

        let mut child = self.first_child_id[slot];
        while child >= 0 {
            let c = child as usize;
            let next = self.next_sibling_id[c];
            self.parent_id[c] = -1;
            self.next_sibling_id[c] = -1;
            self.prev_sibling_id[c] = -1;
            self.update_depth_recursive(c, 0);
            // Orphaned children lose their composed-from-parent transform
            // basis, so their cached world transform is now stale.
            self.dirty_bits.set_bit(c);
            child = next;
        }
        self.first_child_id[slot] = -1;

        self.allocated_bits.clear_bit(slot);
        self.dirty_bits.clear_bit(slot);
        self.entity_ref[slot] = None;
        self.local_transform_ref[slot] = None;
    }
}

/// Process-wide table of graphs keyed by `graph_id`, constructed lazily the
/// way [`crate::registry_table::ComponentSystem`] constructs registries.
/// This is what [`crate::transform::Transform::mark_dirty`] uses to resolve
/// "my owning graph" from an `EntityId` alone.
pub struct GraphTable {
    graphs: Vec<Option<EntityGraph>>,
}

impl GraphTable {
    pub fn new() -> Self {
        Self { graphs: Vec::new() }
    }

    pub fn get_or_create_mut(&mut self, graph_id: u16) -> &mut EntityGraph {
        let idx = graph_id as usize;
        if idx >= self.graphs.len() {
            self.graphs.resize_with(idx + 1, || None);
        }
        self.graphs[idx].get_or_insert_with(|| EntityGraph::new(graph_id))
    }

    pub fn get_mut(&mut self, graph_id: u16) -> Option<&mut EntityGraph> {
        self.graphs.get_mut(graph_id as usize)?.as_mut()
    }

    pub fn get(&self, graph_id: u16) -> Option<&EntityGraph> {
        self.graphs.get(graph_id as usize)?.as_ref()
    }

    /// Run `update_transforms` on every constructed graph, in ascending
    /// `graph_id` order.
    pub fn update_all(&mut self, transforms: &ComponentRegistry<Transform>) {
        for graph in self.graphs.iter_mut().flatten() {
            graph.update_transforms(transforms);
        }
    }
}

impl Default for GraphTable {
    fn default() -> Self {
        Self::new()
    }
}
