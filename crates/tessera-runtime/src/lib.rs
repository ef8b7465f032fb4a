//! Tessera Runtime -- the simulation driver built on top of [`tessera_ecs`].
//!
//! This crate provides the stage loop: a fixed-timestep driver that owns a
//! `ComponentSystem`/`GraphTable` pair and runs them through `Setup`,
//! `FixedUpdate` (zero or more times per frame), `Update`, `LateUpdate`, and
//! `Shutdown`, plus the `EngineConfig` used to parameterize a run.
//!
//! # Quick start
//!
//! ```
//! use tessera_runtime::prelude::*;
//!
//! let config = EngineConfig::default();
//! let mut stage_loop = StageLoop::new(&config);
//!
//! for _ in 0..10 {
//!     stage_loop.advance_frame(config.fixed_dt);
//! }
//! assert_eq!(stage_loop.frame_count(), 10);
//!
//! stage_loop.shutdown();
//! ```

pub mod config;
pub mod stage;

/// Re-export the ECS crate for convenience.
pub use tessera_ecs;

/// Convenience re-exports for common runtime usage.
pub mod prelude {
    pub use tessera_ecs::prelude::*;

    pub use crate::config::{ConfigError, EngineConfig};
    pub use crate::stage::{StageFn, StageLoop};
}
