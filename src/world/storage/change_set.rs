//! Pending Change Set - staged edits for one flush
//!
//! Keys are fixed when the set is built and always enumerate in the same
//! order (first-touch order of the builder).

use super::local_chunk::LocalChunk;
use crate::error::{OptionExt, QueueError, QueueResult};
use crate::world::core::{BaseBlock, BiomeId, ChunkPos, CompoundTag, VoxelPos};
use rustc_hash::FxHashMap;

/// Immutable mapping from chunk key to that chunk's staged edits
#[derive(Debug, Clone, Default)]
pub struct PendingChangeSet {
    order: Vec<ChunkPos>,
    chunks: FxHashMap<ChunkPos, LocalChunk>,
}

impl PendingChangeSet {
    pub fn builder() -> PendingChangeSetBuilder {
        PendingChangeSetBuilder::default()
    }

    /// All chunk keys, in processing order
    pub fn keys(&self) -> &[ChunkPos] {
        &self.order
    }

    pub fn get(&self, key: ChunkPos) -> Option<&LocalChunk> {
        self.chunks.get(&key)
    }

    /// Staged chunk for a key taken from [`keys`](Self::keys).
    ///
    /// A miss means the key list and the chunk map were built apart, which is
    /// a staging bug rather than a runtime condition.
    pub fn chunk(&self, key: ChunkPos) -> QueueResult<&LocalChunk> {
        self.chunks
            .get(&key)
            .ok_or_queue(|| QueueError::ChunkNotStaged(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total staged blocks across all chunks
    pub fn block_count(&self) -> usize {
        self.chunks.values().map(LocalChunk::block_count).sum()
    }
}

/// Staging-side accumulator for a [`PendingChangeSet`]
#[derive(Debug, Default)]
pub struct PendingChangeSetBuilder {
    order: Vec<ChunkPos>,
    chunks: FxHashMap<ChunkPos, LocalChunk>,
}

impl PendingChangeSetBuilder {
    fn chunk_mut(&mut self, key: ChunkPos) -> &mut LocalChunk {
        let order = &mut self.order;
        self.chunks.entry(key).or_insert_with(|| {
            order.push(key);
            LocalChunk::new(key)
        })
    }

    /// Stage a block. Returns false when `pos` is outside the buildable height.
    pub fn set_block(&mut self, pos: VoxelPos, block: impl Into<BaseBlock>) -> bool {
        if !pos.in_height_bounds() {
            return false;
        }
        let (x, y, z) = pos.local();
        self.chunk_mut(pos.chunk_pos()).set_block(x, y, z, block.into())
    }

    /// Stage the biome of the (x, z) column
    pub fn set_biome(&mut self, x: i32, z: i32, biome: BiomeId) -> bool {
        let pos = VoxelPos::new(x, 0, z);
        let (lx, _, lz) = pos.local();
        self.chunk_mut(pos.chunk_pos()).set_biome(lx, lz, biome)
    }

    /// Stage tile entity data for `pos` without touching its block
    pub fn set_tile(&mut self, pos: VoxelPos, tag: CompoundTag) -> bool {
        if !pos.in_height_bounds() {
            return false;
        }
        self.chunk_mut(pos.chunk_pos()).set_tile(pos, tag);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn build(self) -> PendingChangeSet {
        PendingChangeSet {
            order: self.order,
            chunks: self.chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::core::{BlockId, BlockState};

    #[test]
    fn test_keys_keep_first_touch_order() {
        let mut builder = PendingChangeSet::builder();
        builder.set_block(VoxelPos::new(40, 1, 0), BlockState::of(BlockId::STONE));
        builder.set_block(VoxelPos::new(-5, 1, -5), BlockState::of(BlockId::STONE));
        builder.set_block(VoxelPos::new(41, 2, 0), BlockState::of(BlockId::DIRT));
        builder.set_biome(0, 0, BiomeId::DESERT);
        let set = builder.build();

        assert_eq!(
            set.keys(),
            &[ChunkPos::new(2, 0), ChunkPos::new(-1, -1), ChunkPos::new(0, 0)]
        );
        assert_eq!(set.block_count(), 3);
    }

    #[test]
    fn test_every_enumerated_key_resolves() {
        let mut builder = PendingChangeSet::builder();
        for x in (-64..64).step_by(7) {
            builder.set_block(VoxelPos::new(x, 10, x * 3), BlockState::of(BlockId::GLASS));
        }
        let set = builder.build();
        for &key in set.keys() {
            assert!(set.chunk(key).is_ok(), "key {} has no chunk", key);
        }
    }

    #[test]
    fn test_unknown_key_is_invariant_violation() {
        let set = PendingChangeSet::builder().build();
        assert!(set.is_empty());
        let err = set.chunk(ChunkPos::new(9, 9)).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_out_of_height_edits_are_refused() {
        let mut builder = PendingChangeSet::builder();
        assert!(!builder.set_block(VoxelPos::new(0, 256, 0), BlockState::of(BlockId::STONE)));
        assert!(!builder.set_tile(VoxelPos::new(0, -1, 0), CompoundTag::new()));
        assert!(builder.is_empty());
    }
}
