//! Batched world write queue
//!
//! - `ChunkApplier`: per-chunk cell write protocol with a fallback path
//! - `ChunkCoordinator`: time-sliced application across host windows
//! - `QueueCoordinator`: per-world facade that enqueues a configured run
//! - `QueueScheduler`: drives several runs from a host tick loop

mod chunk_applier;
mod coordinator;
mod queue_coordinator;
mod scheduler;
mod side_effects;

pub use chunk_applier::{ChunkApplier, ChunkApplyStats, LocalChunkApplier};
pub use coordinator::{
    ChunkCoordinator, ChunkCoordinatorBuilder, CoordinatorState, ErrorHandler, FinalAction,
    ProgressSubscriber, QueueProgress, QueueStats, WindowReport,
};
pub use queue_coordinator::QueueCoordinator;
pub use scheduler::{QueueId, QueueScheduler, TickReport};
pub use side_effects::{SideEffect, SideEffectSet};
