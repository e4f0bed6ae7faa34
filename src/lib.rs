// Hearth World Queue - batched, time-sliced world writes
//
// Staged block, biome and tile changes are applied to a live world a few
// chunks per host tick, without blocking the tick loop.
// - world::storage::PendingChangeSetBuilder to stage changes
// - queue::QueueCoordinator to enqueue a flush for one world
// - queue::QueueScheduler (or advance_window directly) to drive it

// Constants module
pub mod constants;

// Core modules
pub mod config;
pub mod error;

// Write queue
pub mod queue;

// World types, interfaces and storage
pub mod world;

pub use config::QueueConfig;
pub use error::{
    FallbackCause, OptionExt, QueueError, QueueResult, RestoreError, WriteError,
};

// === Queue ===
pub use queue::{
    ChunkApplier, ChunkApplyStats, ChunkCoordinator, ChunkCoordinatorBuilder, CoordinatorState,
    LocalChunkApplier, QueueCoordinator, QueueId, QueueProgress, QueueScheduler, QueueStats,
    SideEffect, SideEffectSet, TickReport, WindowReport,
};

// === Core World Types ===
pub use world::core::{
    BaseBlock, BiomeId, BlockId, BlockState, ChunkPos, CompoundTag, Tag, VoxelPos,
};
pub use world::interfaces::{FallbackAccess, RawBlock, TagRestorer, WorldStore, WorldTargets};
pub use world::storage::{MemoryWorld, PendingChangeSet, PendingChangeSetBuilder};
pub use world::voxel_to_chunk_pos;
