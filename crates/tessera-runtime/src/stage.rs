//! Fixed-timestep stage loop driving five stages: `Setup`, `FixedUpdate`
//! (repeated while the accumulator is `>= fixed_dt`), `Update`,
//! `LateUpdate`, `Shutdown`.
//!
//! The driver owns the ECS state plus a counter advancing
//! `fixed_update_count * fixed_dt` to avoid float drift, generalized to an
//! accumulator since zero or more fixed updates can run per frame.

use tessera_ecs::prelude::*;

use crate::config::EngineConfig;

/// Per-frame callbacks a [`StageLoop`] dispatches into, in addition to the
/// uniform `ComponentSystem::registries()` update dispatch.
pub type StageFn = fn(&mut ComponentSystem, &mut GraphTable, &mut GlobalIdRegistry);

/// Owns the `ComponentSystem`/`GraphTable` pair and drives them through
/// `Setup -> (FixedUpdate* -> Update -> LateUpdate) -> Shutdown`.
pub struct StageLoop {
    system: ComponentSystem,
    graphs: GraphTable,
    global_ids: GlobalIdRegistry,
    fixed_dt: f64,
    accumulator: f64,
    frame_count: u64,
    fixed_update_count: u64,
    setup_fns: Vec<StageFn>,
    update_fns: Vec<StageFn>,
    late_update_fns: Vec<StageFn>,
    did_setup: bool,
}

impl StageLoop {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            system: ComponentSystem::with_slab_capacity(config.slab_capacity),
            graphs: GraphTable::new(),
            global_ids: GlobalIdRegistry::new(),
            fixed_dt: config.fixed_dt,
            accumulator: 0.0,
            frame_count: 0,
            fixed_update_count: 0,
            setup_fns: Vec::new(),
            update_fns: Vec::new(),
            late_update_fns: Vec::new(),
            did_setup: false,
        }
    }

    pub fn on_setup(&mut self, f: StageFn) {
        self.setup_fns.push(f);
    }

    pub fn on_update(&mut self, f: StageFn) {
        self.update_fns.push(f);
    }

    pub fn on_late_update(&mut self, f: StageFn) {
        self.late_update_fns.push(f);
    }

    /// Run the `Setup` stage once. Idempotent: a second call is a no-op.
    pub fn setup(&mut self) {
        if self.did_setup {
            return;
        }
        for f in &self.setup_fns {
            f(&mut self.system, &mut self.graphs, &mut self.global_ids);
        }
        self.did_setup = true;
    }

    /// Advance the simulation by one real-time frame of `frame_dt` seconds:
    /// zero or more `FixedUpdate`s (while the accumulator holds at least one
    /// full `fixed_dt`), then one `Update`, then one `LateUpdate`, then a
    /// transform propagation pass over every graph.
    pub fn advance_frame(&mut self, frame_dt: f64) {
        self.setup();
        self.accumulator += frame_dt;

        while self.accumulator >= self.fixed_dt {
            for registry in self.system.registries() {
                registry.fixed_update_all(self.fixed_dt as f32);
            }
            self.accumulator -= self.fixed_dt;
            self.fixed_update_count += 1;
        }

        for registry in self.system.registries() {
            registry.update_all(frame_dt as f32);
        }
        for f in &self.update_fns {
            f(&mut self.system, &mut self.graphs, &mut self.global_ids);
        }
        for f in &self.late_update_fns {
            f(&mut self.system, &mut self.graphs, &mut self.global_ids);
        }

        self.graphs.update_all(self.system.get_registry::<Transform>());
        self.frame_count += 1;
    }

    /// Run `Shutdown`: destroy every component registry. The loop must not
    /// be advanced again afterwards.
    pub fn shutdown(&mut self) {
        self.system.shutdown();
    }

    pub fn global_ids_mut(&mut self) -> &mut GlobalIdRegistry {
        &mut self.global_ids
    }

    pub fn graphs_mut(&mut self) -> &mut GraphTable {
        &mut self.graphs
    }

    pub fn system_mut(&mut self) -> &mut ComponentSystem {
        &mut self.system
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fixed_update_count(&self) -> u64 {
        self.fixed_update_count
    }

    /// Simulation time covered by completed fixed updates. Computed as
    /// `fixed_update_count * fixed_dt` rather than accumulated, so repeated
    /// runs with identical input produce bit-identical values.
    pub fn fixed_sim_time(&self) -> f64 {
        self.fixed_update_count as f64 * self.fixed_dt
    }
}
