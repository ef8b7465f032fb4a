//! [`ComponentSystem`]: the process-wide table of per-type
//! [`ComponentRegistry`]s, keyed by compile-time [`Component::TYPE_ID`].
//!
//! Per-type registries are stored behind a small capability trait
//! ([`AnyRegistry`]) rather than an enum of known component types, per the
//! "dynamic dispatch" design note: a table of per-type registries dispatched
//! uniformly for shutdown and update.

use std::any::Any;

use crate::component::{Component, ComponentRegistry};

/// Type-erased capability surface a [`ComponentRegistry<T>`] exposes to
/// [`ComponentSystem`] for shutdown and the per-frame update dispatch.
pub trait AnyRegistry: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn component_type_id(&self) -> u32;
    fn free_untyped(&mut self, slot: usize);
    fn update_all(&mut self, dt: f32);
    fn fixed_update_all(&mut self, fixed_dt: f32);
}

impl<T: Component> AnyRegistry for ComponentRegistry<T> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn component_type_id(&self) -> u32 {
        T::TYPE_ID
    }

    fn free_untyped(&mut self, slot: usize) {
        self.free(slot);
    }

    fn update_all(&mut self, dt: f32) {
        ComponentRegistry::update_all(self, dt);
    }

    fn fixed_update_all(&mut self, fixed_dt: f32) {
        ComponentRegistry::fixed_update_all(self, fixed_dt);
    }
}

/// Process-wide table of per-type registries, indexed by `TYPE_ID`.
///
/// Registries are constructed lazily on first [`get_registry`](Self::get_registry)
/// access. `registries()` iterates them in first-construction order, which
/// is what the update dispatcher uses each frame.
pub struct ComponentSystem {
    registries: Vec<Option<Box<dyn AnyRegistry>>>,
    creation_order: Vec<u32>,
    last_execution_priority: i32,
    slab_capacity: usize,
    shut_down: bool,
}

impl ComponentSystem {
    pub fn new() -> Self {
        Self::with_slab_capacity(crate::slab::DEFAULT_SLAB_CAPACITY)
    }

    /// Like [`new`](Self::new), but every lazily-constructed registry starts
    /// its backing slab at `slab_capacity` slots per chunk instead of the
    /// default.
    pub fn with_slab_capacity(slab_capacity: usize) -> Self {
        Self {
            registries: Vec::new(),
            creation_order: Vec::new(),
            last_execution_priority: i32::MIN,
            slab_capacity,
            shut_down: false,
        }
    }

    /// The process-wide registry for `T`, constructed lazily on first
    /// access. Fatal if called after [`shutdown`](Self::shutdown).
    pub fn get_registry<T: Component>(&mut self) -> &mut ComponentRegistry<T> {
        assert!(!self.shut_down, "ComponentSystem used after shutdown");

        let idx = T::TYPE_ID as usize;
        if idx >= self.registries.len() {
            self.registries.resize_with(idx + 1, || None);
        }
        if self.registries[idx].is_none() {
            debug_assert!(
                T::EXECUTION_PRIORITY >= self.last_execution_priority,
                "component types must be registered in non-decreasing EXECUTION_PRIORITY order"
            );
            self.last_execution_priority = T::EXECUTION_PRIORITY;
            self.registries[idx] = Some(Box::new(ComponentRegistry::<T>::with_slab_capacity(
                self.slab_capacity,
            )));
            self.creation_order.push(T::TYPE_ID);
            tracing::debug!(type_id = T::TYPE_ID, "ComponentSystem registry created");
        }

        self.registries[idx]
            .as_mut()
            .expect("just inserted")
            .as_any_mut()
            .downcast_mut::<ComponentRegistry<T>>()
            .expect("TYPE_ID collision between two distinct component types")
    }

    /// Dispatch `free` to whichever registry owns `type_id`. No-op if the
    /// registry was never constructed.
    pub fn free_component(&mut self, type_id: u32, slot: usize) {
        assert!(!self.shut_down, "ComponentSystem used after shutdown");
        if let Some(Some(registry)) = self.registries.get_mut(type_id as usize) {
            registry.free_untyped(slot);
        }
    }

    /// Registries in first-construction order (in practice ascending
    /// `TYPE_ID` since ids are assigned in non-decreasing priority order and
    /// registries are created lazily in encounter order).
    pub fn registries(&mut self) -> impl Iterator<Item = &mut Box<dyn AnyRegistry>> {
        assert!(!self.shut_down, "ComponentSystem used after shutdown");
        let order = self.creation_order.clone();
        self.registries
            .iter_mut()
            .enumerate()
            .filter(move |(idx, _)| order.contains(&(*idx as u32)))
            .filter_map(|(_, slot)| slot.as_mut())
    }

    /// Destroy every registry, freeing every live component through its
    /// `Drop`. Subsequent access to this `ComponentSystem` is fatal.
    pub fn shutdown(&mut self) {
        self.registries.clear();
        self.creation_order.clear();
        self.shut_down = true;
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Default for ComponentSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct A {
        entity_global_id: u32,
    }
    impl Component for A {
        const TYPE_ID: u32 = 0;
        const EXECUTION_PRIORITY: i32 = i32::MIN;
        fn entity_global_id(&self) -> u32 {
            self.entity_global_id
        }
        fn set_entity_global_id(&mut self, g: u32) {
            self.entity_global_id = g;
        }
    }

    #[derive(Default)]
    struct B {
        entity_global_id: u32,
    }
    impl Component for B {
        const TYPE_ID: u32 = 1;
        const EXECUTION_PRIORITY: i32 = 10;
        fn entity_global_id(&self) -> u32 {
            self.entity_global_id
        }
        fn set_entity_global_id(&mut self, g: u32) {
            self.entity_global_id = g;
        }
    }

    #[test]
    fn lazily_constructs_per_type_registries() {
        let mut system = ComponentSystem::new();
        let slot = system.get_registry::<A>().allocate(A::default());
        assert_eq!(system.get_registry::<A>().active_count(), 1);
        system.free_component(A::TYPE_ID, slot);
        assert_eq!(system.get_registry::<A>().active_count(), 0);
    }

    #[test]
    fn with_slab_capacity_reaches_lazily_constructed_registries() {
        let mut system = ComponentSystem::with_slab_capacity(4);
        system.get_registry::<A>().allocate(A::default());
        assert_eq!(system.get_registry::<A>().slab_capacity(), 4);
    }

    #[test]
    fn registries_iterate_in_creation_order() {
        let mut system = ComponentSystem::new();
        system.get_registry::<B>();
        system.get_registry::<A>();
        let ids: Vec<u32> = system.registries().map(|r| r.component_type_id()).collect();
        assert_eq!(ids, vec![B::TYPE_ID, A::TYPE_ID]);
    }

    #[test]
    #[should_panic(expected = "after shutdown")]
    fn use_after_shutdown_is_fatal() {
        let mut system = ComponentSystem::new();
        system.get_registry::<A>();
        system.shutdown();
        system.get_registry::<A>();
    }
}
