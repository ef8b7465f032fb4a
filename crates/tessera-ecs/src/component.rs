//! The [`Component`] trait surface and [`ComponentRegistry<T>`], the dense
//! per-type store backing it.

use std::ptr;

use crate::bitfield::{BitfieldArray, BITS_PER_BLOCK};
use crate::entity::{EntityId, GlobalIdRegistry};
use crate::slab::SlabAllocator;

/// A component type registered with the ECS.
///
/// `TYPE_ID` and `EXECUTION_PRIORITY` are assigned by hand at each impl's
/// call site, the way system ids are hand-assigned constants elsewhere in
/// this codebase; `ComponentSystem` debug-asserts both are used consistently
/// (no two types sharing a `TYPE_ID`, ids requested in non-decreasing
/// `EXECUTION_PRIORITY` order). `Transform` owns `TYPE_ID = 0` via the
/// lowest possible `EXECUTION_PRIORITY`.
pub trait Component: Sized + 'static {
    const TYPE_ID: u32;
    const EXECUTION_PRIORITY: i32;

    /// The owning entity's 32-bit `global_id`.
    fn entity_global_id(&self) -> u32;

    /// Set by the entity at attach time.
    fn set_entity_global_id(&mut self, global_id: u32);

    /// Resolve the owning entity's full [`EntityId`] via the process-wide
    /// registry. `None` if the entity has since been destroyed.
    fn get_entity_id(&self, registry: &GlobalIdRegistry) -> Option<EntityId> {
        registry.resolve(self.entity_global_id())
    }

    fn on_start(&mut self) {}
    fn on_enable(&mut self) {}
    fn on_disable(&mut self) {}
    fn on_update(&mut self, _dt: f32) {}
    fn on_fixed_update(&mut self, _fixed_dt: f32) {}
}

/// Dense per-type component store: a [`SlabAllocator<T>`] for storage, an
/// `active_bits` set tracking occupied slots, and a dense `components[]`
/// array parallel to it (`components[i]` is live iff `active_bits[i]` is
/// set). A slot index here is what [`crate::game_entity::GameEntity`]'s
/// slot-mapping table stores (1-based, after adding one for "never
/// attached" = 0).
pub struct ComponentRegistry<T: Component> {
    slab: SlabAllocator<T>,
    components: Vec<*mut T>,
    active_bits: BitfieldArray,
    active_count: usize,
}

impl<T: Component> ComponentRegistry<T> {
    pub fn new() -> Self {
        Self {
            slab: SlabAllocator::new(),
            components: Vec::new(),
            active_bits: BitfieldArray::new(),
            active_count: 0,
        }
    }

    /// Like [`new`](Self::new), but the backing slab starts at
    /// `slab_capacity` slots per chunk instead of the default.
    pub fn with_slab_capacity(slab_capacity: usize) -> Self {
        Self {
            slab: SlabAllocator::with_slab_capacity(slab_capacity),
            components: Vec::new(),
            active_bits: BitfieldArray::new(),
            active_count: 0,
        }
    }

    /// Find a clear bit for a new slot, growing `active_bits` and the dense
    /// array by one 256-slot block if the set is currently full.
    fn reserve_slot(&mut self) -> usize {
        let mut slot = self.active_bits.find_first_clear();
        if slot < 0 {
            let new_len = self.components.len() + BITS_PER_BLOCK;
            self.active_bits.reserve(new_len);
            self.components.resize(new_len, ptr::null_mut());
            tracing::trace!(type_id = T::TYPE_ID, new_len, "ComponentRegistry growing");
            slot = self.active_bits.find_first_clear();
        }
        let slot = slot as usize;
        if slot >= self.components.len() {
            self.components.resize(slot + 1, ptr::null_mut());
        }
        slot
    }

    /// Allocate a slot, move `value` into it, and return the slot index.
    pub fn allocate(&mut self, value: T) -> usize {
        let slot = self.reserve_slot();
        let ptr = self.slab.alloc(value);
        self.components[slot] = ptr;
        self.active_bits.set_bit(slot);
        self.active_count += 1;
        slot
    }

    /// Free the component at `slot`. No-op if the slot is already free or
    /// out of range (idempotent).
    pub fn free(&mut self, slot: usize) {
        if slot >= self.components.len() || !self.active_bits.get_bit(slot) {
            return;
        }
        let ptr = self.components[slot];
        self.slab.free(ptr);
        self.components[slot] = ptr::null_mut();
        self.active_bits.clear_bit(slot);
        self.active_count -= 1;
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        if slot >= self.components.len() || !self.active_bits.get_bit(slot) {
            return None;
        }
        // Safety: `active_bits` set implies `components[slot]` is a live
        // pointer from `self.slab`.
        Some(unsafe { &*self.components[slot] })
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        if slot >= self.components.len() || !self.active_bits.get_bit(slot) {
            return None;
        }
        Some(unsafe { &mut *self.components[slot] })
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Total slots the backing slab currently has room for (zero before the
    /// first [`allocate`](Self::allocate)).
    pub fn slab_capacity(&self) -> usize {
        self.slab.capacity()
    }

    /// Iterate live components in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.active_bits
            .iter_set_bits()
            .map(move |slot| unsafe { &*self.components[slot] })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        let components = self.components.as_mut_slice();
        self.active_bits.iter_set_bits().map(move |slot| {
            // Safety: `iter_set_bits` yields each slot at most once, so the
            // raw pointers handed out here are disjoint.
            let ptr = components[slot];
            unsafe { &mut *ptr }
        })
    }

    pub fn update_all(&mut self, dt: f32) {
        for component in self.iter_mut() {
            component.on_update(dt);
        }
    }

    pub fn fixed_update_all(&mut self, fixed_dt: f32) {
        for component in self.iter_mut() {
            component.on_fixed_update(fixed_dt);
        }
    }
}

impl<T: Component> Default for ComponentRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
