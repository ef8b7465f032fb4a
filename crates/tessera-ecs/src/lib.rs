//! Tessera ECS -- the core of a single-threaded, cooperative entity-
//! component-system runtime built from three leaves-first subsystems: a
//! growable [`BitfieldArray`](bitfield::BitfieldArray) with small-object
//! inline optimization, a [`SlabAllocator`](slab::SlabAllocator) + dense
//! [`ComponentRegistry`](component::ComponentRegistry) pair, and an
//! [`EntityGraph`](graph::EntityGraph) that propagates world transforms
//! from dirty-flag marks.
//!
//! # Quick start
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! struct Health { entity_global_id: u32, hp: i32 }
//! impl Component for Health {
//!     const TYPE_ID: u32 = 1;
//!     const EXECUTION_PRIORITY: i32 = 0;
//!     fn entity_global_id(&self) -> u32 { self.entity_global_id }
//!     fn set_entity_global_id(&mut self, g: u32) { self.entity_global_id = g; }
//! }
//!
//! let mut global_ids = GlobalIdRegistry::new();
//! let mut graphs = GraphTable::new();
//! let mut system = ComponentSystem::new();
//!
//! let graph = graphs.get_or_create_mut(1);
//! let mut entity = graph.create_entity(&mut global_ids);
//! entity.try_create_component(Transform::new(Trs::IDENTITY), &mut system).unwrap();
//! assert!(graph.try_register_entity(&mut entity, &mut global_ids));
//!
//! entity.try_create_component(Health { entity_global_id: 0, hp: 10 }, &mut system);
//! assert_eq!(entity.try_get_component::<Health>(&mut system).unwrap().hp, 10);
//!
//! entity.destroy(&mut system);
//! ```

pub mod bitfield;
pub mod bits;
pub mod component;
pub mod entity;
pub mod game_entity;
pub mod graph;
pub mod math;
pub mod registry_table;
pub mod slab;
pub mod transform;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::bitfield::{BitfieldArray, BitfieldBlock};
    pub use crate::component::{Component, ComponentRegistry};
    pub use crate::entity::{EntityId, GlobalIdRegistry};
    pub use crate::game_entity::{EnableState, GameEntity};
    pub use crate::graph::{EntityGraph, GraphTable};
    pub use crate::math::{Mat3x4, Mat4, Quat, Trs, Vec3, Vec4};
    pub use crate::registry_table::{AnyRegistry, ComponentSystem};
    pub use crate::slab::SlabAllocator;
    pub use crate::transform::Transform;
}
