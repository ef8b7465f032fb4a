//! The built-in `Transform` component: a local TRS triple plus the
//! `mark_dirty` helper that flips its owning graph slot's dirty bit.

use crate::component::Component;
use crate::entity::GlobalIdRegistry;
use crate::graph::GraphTable;
use crate::math::Trs;

/// Local translation/rotation/scale. `TYPE_ID` is fixed to 0 via the lowest
/// possible `EXECUTION_PRIORITY`.
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    entity_global_id: u32,
    local: Trs,
}

impl Transform {
    pub fn new(local: Trs) -> Self {
        Self {
            entity_global_id: 0,
            local,
        }
    }

    pub fn local(&self) -> Trs {
        self.local
    }

    /// Replace the local TRS and mark the owning graph slot dirty.
    pub fn set_local(&mut self, local: Trs, global_ids: &GlobalIdRegistry, graphs: &mut GraphTable) {
        self.local = local;
        self.mark_dirty(global_ids, graphs);
    }

    /// Resolve the owning entity through `global_ids` and flip its graph
    /// slot's dirty bit. No-op if the entity has since been destroyed or
    /// was never registered into a graph.
    pub fn mark_dirty(&self, global_ids: &GlobalIdRegistry, graphs: &mut GraphTable) {
        let Some(entity_id) = self.get_entity_id(global_ids) else {
            return;
        };
        if !entity_id.is_registered() {
            return;
        }
        if let Some(graph) = graphs.get_mut(entity_id.graph_id()) {
            graph.mark_dirty(entity_id);
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Trs::IDENTITY)
    }
}

impl Component for Transform {
    const TYPE_ID: u32 = 0;
    const EXECUTION_PRIORITY: i32 = i32::MIN;

    fn entity_global_id(&self) -> u32 {
        self.entity_global_id
    }

    fn set_entity_global_id(&mut self, global_id: u32) {
        self.entity_global_id = global_id;
    }
}
