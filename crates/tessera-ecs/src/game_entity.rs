//! [`GameEntity`]: per-entity component slot-mapping, active-type tracking,
//! enable state, and identity.

use crate::bitfield::BitfieldArray;
use crate::component::Component;
use crate::entity::EntityId;
use crate::registry_table::ComponentSystem;

/// Maximum number of distinct component types one entity may attach.
pub const MAX_COMPONENT_TYPES: usize = 255;

/// Whether an entity runs its per-frame lifecycle callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableState {
    Enabled,
    /// Disabled directly, by the entity itself.
    DisabledLocal,
    /// Disabled because an ancestor in the hierarchy is disabled.
    DisabledFromParent,
}

/// One entry in a [`GameEntity`]'s dense component list: which type occupies
/// this list slot and where its storage lives in that type's registry.
struct ComponentHandle {
    type_id: u32,
    registry_slot: usize,
}

/// Composes a fixed-size `type_id -> list slot` mapping with a dense list of
/// attached components. A type keeps the same list slot for the entity's
/// whole lifetime once first attached; `active_bits` is the sole source of
/// truth for "currently attached", so detaching never has to renumber
/// anything.
pub struct GameEntity {
    identity: EntityId,
    graph_slot: u32,
    enable_state: EnableState,
    slot_mapping: [u32; MAX_COMPONENT_TYPES],
    active_bits: BitfieldArray,
    components: Vec<Option<ComponentHandle>>,
}

impl GameEntity {
    /// Constructed by [`crate::graph::EntityGraph::create_entity`]; not
    /// meant to be built directly since an entity without a graph slot has
    /// nowhere for its Transform to register.
    pub(crate) fn new(identity: EntityId, graph_slot: u32) -> Self {
        Self {
            identity,
            graph_slot,
            enable_state: EnableState::Enabled,
            slot_mapping: [0; MAX_COMPONENT_TYPES],
            active_bits: BitfieldArray::new(),
            components: Vec::new(),
        }
    }

    pub fn identity(&self) -> EntityId {
        self.identity
    }

    pub(crate) fn set_identity(&mut self, identity: EntityId) {
        self.identity = identity;
    }

    pub(crate) fn graph_slot(&self) -> u32 {
        self.graph_slot
    }

    pub fn enable_state(&self) -> EnableState {
        self.enable_state
    }

    pub fn is_enabled(&self) -> bool {
        self.enable_state == EnableState::Enabled
    }

    pub fn set_enabled_local(&mut self, enabled: bool) {
        self.enable_state = if enabled {
            EnableState::Enabled
        } else {
            EnableState::DisabledLocal
        };
    }

    pub(crate) fn set_disabled_from_parent(&mut self) {
        if self.enable_state != EnableState::DisabledLocal {
            self.enable_state = EnableState::DisabledFromParent;
        }
    }

    pub fn has_component_type<T: Component>(&self) -> bool {
        (T::TYPE_ID as usize) < MAX_COMPONENT_TYPES && self.active_bits.get_bit(T::TYPE_ID as usize)
    }

    /// Registry slot for `type_id`, if currently attached. Used by
    /// [`crate::graph::EntityGraph::try_register_entity`] to find the
    /// entity's Transform without a generic parameter.
    pub fn component_registry_slot(&self, type_id: u32) -> Option<usize> {
        let idx = type_id as usize;
        if idx >= MAX_COMPONENT_TYPES || !self.active_bits.get_bit(idx) {
            return None;
        }
        let list_idx = self.slot_mapping[idx];
        self.components[(list_idx - 1) as usize]
            .as_ref()
            .map(|h| h.registry_slot)
    }

    /// Attach a new instance of `T`. `false` (returning `None`) if the
    /// entity already owns one. Fatal if `T::TYPE_ID` exceeds
    /// [`MAX_COMPONENT_TYPES`].
    pub fn try_create_component<'a, T: Component>(
        &mut self,
        mut value: T,
        system: &'a mut ComponentSystem,
    ) -> Option<&'a mut T> {
        let type_idx = T::TYPE_ID as usize;
        assert!(
            type_idx < MAX_COMPONENT_TYPES,
            "component TYPE_ID {type_idx} exceeds MaxComponents ({MAX_COMPONENT_TYPES})"
        );
        if self.active_bits.get_bit(type_idx) {
            return None;
        }

        value.set_entity_global_id(self.identity.global_id());
        let registry_slot = system.get_registry::<T>().allocate(value);

        let list_idx = self.slot_mapping[type_idx];
        if list_idx == 0 {
            self.components.push(Some(ComponentHandle {
                type_id: T::TYPE_ID,
                registry_slot,
            }));
            self.slot_mapping[type_idx] = self.components.len() as u32;
        } else {
            self.components[(list_idx - 1) as usize] = Some(ComponentHandle {
                type_id: T::TYPE_ID,
                registry_slot,
            });
        }
        self.active_bits.set_bit(type_idx);

        system.get_registry::<T>().get_mut(registry_slot)
    }

    pub fn try_get_component<'a, T: Component>(
        &self,
        system: &'a mut ComponentSystem,
    ) -> Option<&'a mut T> {
        let registry_slot = self.component_registry_slot(T::TYPE_ID)?;
        system.get_registry::<T>().get_mut(registry_slot)
    }

    pub fn try_remove_component<T: Component>(&mut self, system: &mut ComponentSystem) -> bool {
        let type_idx = T::TYPE_ID as usize;
        if type_idx >= MAX_COMPONENT_TYPES || !self.active_bits.get_bit(type_idx) {
            return false;
        }
        let list_idx = self.slot_mapping[type_idx];
        if let Some(handle) = self.components[(list_idx - 1) as usize].take() {
            system.get_registry::<T>().free(handle.registry_slot);
        }
        self.active_bits.clear_bit(type_idx);
        true
    }

    /// `(type_id, registry_slot)` for every currently attached component, in
    /// list order (which is attachment order, not type-id order).
    pub fn component_handles(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.components
            .iter()
            .flatten()
            .map(|h| (h.type_id, h.registry_slot))
    }

    /// Detach every attached component through `system`, in ascending
    /// type-id order. Consumes `self`; a `GameEntity` cannot be used after
    /// destruction. No-op per component if `system` has already been shut
    /// down (its registries have already freed everything).
    pub fn destroy(mut self, system: &mut ComponentSystem) {
        if system.is_shut_down() {
            return;
        }
        for type_idx in self.active_bits.iter_set_bits().collect::<Vec<_>>() {
            let list_idx = self.slot_mapping[type_idx];
            if let Some(handle) = self.components[(list_idx - 1) as usize].take() {
                system.free_component(handle.type_id, handle.registry_slot);
            }
        }
        self.active_bits.clear_all();
    }
}

impl Drop for GameEntity {
    fn drop(&mut self) {
        if self.active_bits.popcount() > 0 {
            tracing::warn!(
                identity = ?self.identity,
                "GameEntity dropped with live components still attached; call destroy() first"
            );
        }
    }
}
