//! World Module
//!
//! Everything the queue needs to know about the world it writes into.
//!
//! # Architecture Overview
//!
//! - **Core**: Fundamental data types (positions, block states, tags, slot offsets)
//! - **Storage**: Staged changes and the in-memory world store
//! - **Interfaces**: Traits the host implements over its authoritative world

pub mod core;
pub mod interfaces;
pub mod storage;

// Re-export core types for convenience
pub use core::{BaseBlock, BiomeId, BlockId, BlockState, ChunkPos, CompoundTag, Tag, VoxelPos};

// Re-export world interfaces
pub use interfaces::{FallbackAccess, RawBlock, TagRestorer, WorldStore, WorldTargets};

// Re-export storage
pub use storage::{LocalChunk, MemoryWorld, PendingChangeSet, PendingChangeSetBuilder};

/// Chunk column containing a block position
pub fn voxel_to_chunk_pos(voxel_pos: VoxelPos) -> ChunkPos {
    voxel_pos.chunk_pos()
}
