//! Local Chunk - staged edits for one chunk column
//!
//! Built by the staging side, then handed to the queue read-only.

use crate::constants::chunk::{LAYER_COUNT, SLOTS_PER_LAYER};
use crate::world::core::{offset_of, slot_of, BaseBlock, BiomeId, ChunkPos, CompoundTag, VoxelPos};
use rustc_hash::FxHashMap;

/// One section's worth of optional values
pub type Layer<T> = Box<[Option<T>]>;

fn empty_layer<T: Clone>() -> Layer<T> {
    vec![None; SLOTS_PER_LAYER].into_boxed_slice()
}

/// Staged blocks, biomes and tile tags for one chunk column
///
/// Layers are allocated lazily, so a chunk that only touches one section costs
/// a single 4096-slot array. Both layer vectors always hold exactly
/// `LAYER_COUNT` entries of `SLOTS_PER_LAYER` slots; only the methods below
/// touch them.
#[derive(Debug, Clone)]
pub struct LocalChunk {
    position: ChunkPos,
    blocks: Vec<Option<Layer<BaseBlock>>>,
    biomes: Vec<Option<Layer<BiomeId>>>,
    tiles: FxHashMap<VoxelPos, CompoundTag>,
}

impl LocalChunk {
    pub fn new(position: ChunkPos) -> Self {
        Self {
            position,
            blocks: vec![None; LAYER_COUNT],
            biomes: vec![None; LAYER_COUNT],
            tiles: FxHashMap::default(),
        }
    }

    /// Stage a block at chunk-relative `(x, y, z)`. Returns false out of range.
    pub fn set_block(&mut self, x: u8, y: i32, z: u8, block: BaseBlock) -> bool {
        let Some((layer, slot)) = slot_of(x, y, z) else {
            return false;
        };
        self.blocks[layer].get_or_insert_with(empty_layer)[slot] = Some(block);
        true
    }

    /// Stage a column biome at chunk-relative `(x, z)`.
    ///
    /// Biomes are per column: the value is kept once, in the `y = 0` slot, and
    /// the store spreads it over the whole column.
    pub fn set_biome(&mut self, x: u8, z: u8, biome: BiomeId) -> bool {
        let Some((layer, slot)) = slot_of(x, 0, z) else {
            return false;
        };
        self.biomes[layer].get_or_insert_with(empty_layer)[slot] = Some(biome);
        true
    }

    pub fn position(&self) -> ChunkPos {
        self.position
    }

    /// Standalone tile tags keyed by absolute position
    pub fn tiles(&self) -> &FxHashMap<VoxelPos, CompoundTag> {
        &self.tiles
    }

    /// Sections with at least one staged block
    pub fn allocated_layers(&self) -> usize {
        self.blocks.iter().filter(|layer| layer.is_some()).count()
    }

    pub fn set_tile(&mut self, pos: VoxelPos, tag: CompoundTag) {
        self.tiles.insert(pos, tag);
    }

    pub fn block(&self, x: u8, y: i32, z: u8) -> Option<&BaseBlock> {
        let (layer, slot) = slot_of(x, y, z)?;
        self.blocks[layer].as_ref()?[slot].as_ref()
    }

    pub fn biome(&self, x: u8, z: u8) -> Option<BiomeId> {
        let (layer, slot) = slot_of(x, 0, z)?;
        self.biomes[layer].as_ref()?[slot]
    }

    /// Every staged block with its absolute position, in layer/slot order
    pub fn staged_blocks(&self) -> impl Iterator<Item = (VoxelPos, &BaseBlock)> + '_ {
        let origin = self.position;
        iter_layers(&self.blocks).map(move |(layer, slot, block)| {
            let (dx, y, dz) = offset_of(layer, slot);
            (origin.block_at(dx, y, dz), block)
        })
    }

    /// Every staged biome with the absolute position of its column anchor
    pub fn staged_biomes(&self) -> impl Iterator<Item = (VoxelPos, BiomeId)> + '_ {
        let origin = self.position;
        iter_layers(&self.biomes).map(move |(layer, slot, biome)| {
            let (dx, y, dz) = offset_of(layer, slot);
            (origin.block_at(dx, y, dz), *biome)
        })
    }

    pub fn block_count(&self) -> usize {
        iter_layers(&self.blocks).count()
    }

    pub fn is_empty(&self) -> bool {
        self.block_count() == 0 && iter_layers(&self.biomes).next().is_none() && self.tiles.is_empty()
    }
}

fn iter_layers<T>(layers: &[Option<Layer<T>>]) -> impl Iterator<Item = (usize, usize, &T)> {
    layers
        .iter()
        .enumerate()
        .filter_map(|(layer, cells)| cells.as_ref().map(|cells| (layer, cells)))
        .flat_map(|(layer, cells)| {
            cells
                .iter()
                .enumerate()
                .filter_map(move |(slot, cell)| cell.as_ref().map(|value| (layer, slot, value)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::chunk::{MAX_Y, MIN_Y};
    use crate::world::core::{BlockId, BlockState};

    #[test]
    fn test_layers_allocate_lazily() {
        let mut chunk = LocalChunk::new(ChunkPos::new(0, 0));
        assert!(chunk.is_empty());

        assert!(chunk.set_block(1, 40, 2, BlockState::of(BlockId::STONE).into()));
        assert!(chunk.blocks[2].is_some());
        assert_eq!(chunk.allocated_layers(), 1);
        assert!(!chunk.set_block(1, 300, 2, BlockState::of(BlockId::STONE).into()));
    }

    #[test]
    fn test_layer_shape_holds_across_full_height() {
        let mut chunk = LocalChunk::new(ChunkPos::new(3, -3));
        for y in [MIN_Y - 1, MIN_Y, 127, MAX_Y - 1, MAX_Y] {
            chunk.set_block(15, y, 15, BlockState::of(BlockId::GLASS).into());
        }
        assert!(!chunk.set_block(16, 5, 0, BlockState::of(BlockId::GLASS).into()));

        assert_eq!(chunk.blocks.len(), LAYER_COUNT);
        assert_eq!(chunk.biomes.len(), LAYER_COUNT);
        assert!(chunk
            .blocks
            .iter()
            .flatten()
            .all(|layer| layer.len() == SLOTS_PER_LAYER));
        assert_eq!(chunk.allocated_layers(), 3);
        assert_eq!(chunk.block_count(), 3);
        assert_eq!(chunk.position(), ChunkPos::new(3, -3));
        assert!(chunk.block(15, MAX_Y - 1, 15).is_some());
    }

    #[test]
    fn test_staged_blocks_report_absolute_positions() {
        let mut chunk = LocalChunk::new(ChunkPos::new(-1, 2));
        chunk.set_block(15, 64, 0, BlockState::of(BlockId::DIRT).into());
        chunk.set_block(0, 3, 7, BlockState::of(BlockId::SAND).into());

        let staged: Vec<_> = chunk
            .staged_blocks()
            .map(|(pos, block)| (pos, block.block_type()))
            .collect();
        // Layer 0 comes before layer 4
        assert_eq!(
            staged,
            vec![
                (VoxelPos::new(-16, 3, 39), BlockId::SAND),
                (VoxelPos::new(-1, 64, 32), BlockId::DIRT),
            ]
        );
    }

    #[test]
    fn test_biome_stored_once_per_column() {
        let mut chunk = LocalChunk::new(ChunkPos::new(1, 0));
        chunk.set_biome(4, 5, BiomeId::DESERT);
        chunk.set_biome(4, 5, BiomeId::FOREST);

        let biomes: Vec<_> = chunk.staged_biomes().collect();
        assert_eq!(biomes, vec![(VoxelPos::new(20, 0, 5), BiomeId::FOREST)]);
        assert_eq!(chunk.biome(4, 5), Some(BiomeId::FOREST));
    }
}
