//! End-to-end behavior exercised black-box through the public API only
//! (equivalent unit tests beside each module check implementation details
//! like internal block counts; these check outcomes).

use tessera_ecs::prelude::*;

#[test]
fn inline_bitfield_stays_inline_under_256_bits() {
    let mut bits = BitfieldArray::new();
    bits.set_bit(0);
    bits.set_bit(10);
    bits.set_bit(100);
    bits.set_bit(200);

    assert_eq!(bits.popcount(), 4);
    assert_eq!(
        bits.iter_set_bits().collect::<Vec<_>>(),
        vec![0, 10, 100, 200]
    );
    assert_eq!(bits.capacity(), 256);
}

#[test]
fn setting_a_bit_past_256_grows_into_a_second_block() {
    let mut bits = BitfieldArray::new();
    bits.set_bit(500);

    assert!(bits.capacity() >= 512);
    assert_eq!(bits.find_first_set(), 500);
}

#[derive(Debug)]
struct Marker {
    entity_global_id: u32,
}
impl Component for Marker {
    const TYPE_ID: u32 = 1;
    const EXECUTION_PRIORITY: i32 = 0;
    fn entity_global_id(&self) -> u32 {
        self.entity_global_id
    }
    fn set_entity_global_id(&mut self, g: u32) {
        self.entity_global_id = g;
    }
}

#[test]
fn registry_reuses_freed_slot_and_keeps_dense_iteration_order() {
    let mut registry = ComponentRegistry::<Marker>::with_slab_capacity(2);

    let a = registry.allocate(Marker { entity_global_id: 0 });
    let b = registry.allocate(Marker { entity_global_id: 0 });
    registry.free(a);
    let c = registry.allocate(Marker { entity_global_id: 0 });

    assert_eq!(c, a, "freed slot 0 must be reused by the next allocation");
    assert_eq!(registry.active_count(), 2);
    assert_eq!(registry.iter().collect::<Vec<_>>(), vec![c, b]);
}

fn spawn_with_position(
    graph: &mut EntityGraph,
    global_ids: &mut GlobalIdRegistry,
    system: &mut ComponentSystem,
    position: Vec3,
) -> (EntityId, GameEntity) {
    let mut entity = graph.create_entity(global_ids);
    entity
        .try_create_component(
            Transform::new(Trs {
                position,
                ..Trs::IDENTITY
            }),
            system,
        )
        .unwrap();
    assert!(graph.try_register_entity(&mut entity, global_ids));
    let id = entity.identity();
    (id, entity)
}

#[test]
fn child_world_position_is_parent_position_plus_local_offset() {
    let mut global_ids = GlobalIdRegistry::new();
    let mut system = ComponentSystem::new();
    let mut graphs = GraphTable::new();
    let graph = graphs.get_or_create_mut(5);

    let (p_id, p_entity) =
        spawn_with_position(graph, &mut global_ids, &mut system, Vec3::new(10.0, 0.0, 0.0));
    let (c_id, c_entity) =
        spawn_with_position(graph, &mut global_ids, &mut system, Vec3::new(5.0, 0.0, 0.0));

    graph.set_parent(c_id.graph_slot_id(), Some(p_id.graph_slot_id()));
    graph.update_transforms(system.get_registry::<Transform>());

    let world = graph.try_get_world_matrix(c_id).unwrap();
    let (_, _, translation) = world.to_scale_rotation_translation();
    assert!((translation - Vec3::new(15.0, 0.0, 0.0)).length() < 1e-4);

    p_entity.destroy(&mut system);
    c_entity.destroy(&mut system);
}

#[test]
fn child_world_position_accounts_for_parent_rotation() {
    let mut global_ids = GlobalIdRegistry::new();
    let mut system = ComponentSystem::new();
    let mut graphs = GraphTable::new();
    let graph = graphs.get_or_create_mut(5);

    let mut p_entity = graph.create_entity(&mut global_ids);
    p_entity
        .try_create_component(
            Transform::new(Trs {
                rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
                ..Trs::IDENTITY
            }),
            &mut system,
        )
        .unwrap();
    assert!(graph.try_register_entity(&mut p_entity, &mut global_ids));
    let p_id = p_entity.identity();

    let (c_id, c_entity) =
        spawn_with_position(graph, &mut global_ids, &mut system, Vec3::new(1.0, 0.0, 0.0));

    graph.set_parent(c_id.graph_slot_id(), Some(p_id.graph_slot_id()));
    graph.update_transforms(system.get_registry::<Transform>());

    let world = graph.try_get_world_matrix(c_id).unwrap();
    let (_, _, translation) = world.to_scale_rotation_translation();
    assert!(
        (translation - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-4,
        "got {translation:?}"
    );

    p_entity.destroy(&mut system);
    c_entity.destroy(&mut system);
}

struct ComponentA {
    entity_global_id: u32,
}
impl Component for ComponentA {
    const TYPE_ID: u32 = 2;
    const EXECUTION_PRIORITY: i32 = 0;
    fn entity_global_id(&self) -> u32 {
        self.entity_global_id
    }
    fn set_entity_global_id(&mut self, g: u32) {
        self.entity_global_id = g;
    }
}

struct ComponentB {
    entity_global_id: u32,
}
impl Component for ComponentB {
    const TYPE_ID: u32 = 3;
    const EXECUTION_PRIORITY: i32 = 0;
    fn entity_global_id(&self) -> u32 {
        self.entity_global_id
    }
    fn set_entity_global_id(&mut self, g: u32) {
        self.entity_global_id = g;
    }
}

#[test]
fn destroying_an_entity_frees_all_its_components_for_reuse() {
    let mut global_ids = GlobalIdRegistry::new();
    let mut system = ComponentSystem::new();
    let mut graphs = GraphTable::new();
    let graph = graphs.get_or_create_mut(1);

    let mut entity = graph.create_entity(&mut global_ids);
    entity
        .try_create_component(Transform::new(Trs::IDENTITY), &mut system)
        .unwrap();
    assert!(graph.try_register_entity(&mut entity, &mut global_ids));
    entity
        .try_create_component(ComponentA { entity_global_id: 0 }, &mut system)
        .unwrap();
    entity
        .try_create_component(ComponentB { entity_global_id: 0 }, &mut system)
        .unwrap();

    let a_slot = entity.component_registry_slot(ComponentA::TYPE_ID).unwrap();
    let b_slot = entity.component_registry_slot(ComponentB::TYPE_ID).unwrap();
    entity.destroy(&mut system);

    let next_a = system
        .get_registry::<ComponentA>()
        .allocate(ComponentA { entity_global_id: 0 });
    let next_b = system
        .get_registry::<ComponentB>()
        .allocate(ComponentB { entity_global_id: 0 });
    assert_eq!(next_a, a_slot);
    assert_eq!(next_b, b_slot);
}
