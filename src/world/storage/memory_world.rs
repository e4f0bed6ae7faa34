//! Memory World - in-process world store
//!
//! Implements every world interface over hash maps. Hosts without a real
//! backend can write into it directly, and the queue's tests use its fault
//! injection and write journal to check ordering and failure isolation.

use crate::error::{RestoreError, WriteError};
use crate::queue::SideEffectSet;
use crate::world::core::{BaseBlock, BiomeId, BlockState, CompoundTag, VoxelPos, ITEMS_KEY};
use crate::world::interfaces::{FallbackAccess, RawBlock, TagRestorer, WorldStore};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// A mutation that reached the store, in arrival order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Block(VoxelPos),
    RawBlock(VoxelPos),
    Biome(VoxelPos),
    ClearInventory(VoxelPos),
    Tag(VoxelPos),
}

/// Call counters, attempts included
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub reads: u64,
    pub block_writes: u64,
    pub biome_writes: u64,
    pub raw_reads: u64,
    pub raw_writes: u64,
    pub inventory_clears: u64,
    pub tag_restores: u64,
}

/// Point-in-time copy of world contents, for comparing runs
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldSnapshot {
    pub blocks: FxHashMap<VoxelPos, BlockState>,
    pub tiles: FxHashMap<VoxelPos, CompoundTag>,
    pub biomes: FxHashMap<(i32, i32), BiomeId>,
}

#[derive(Default)]
struct Faults {
    reject_all_blocks: bool,
    reject_blocks: FxHashSet<VoxelPos>,
    fail_raw: FxHashSet<VoxelPos>,
    fail_restore: FxHashSet<VoxelPos>,
    fail_biomes: FxHashSet<(i32, i32)>,
}

/// In-memory world store
pub struct MemoryWorld {
    name: String,
    contents: RwLock<WorldSnapshot>,
    faults: RwLock<Faults>,
    calls: Mutex<StoreCalls>,
    journal: Mutex<Vec<StoreEvent>>,
    last_effects: Mutex<Option<SideEffectSet>>,
}

impl MemoryWorld {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: RwLock::new(WorldSnapshot::default()),
            faults: RwLock::new(Faults::default()),
            calls: Mutex::new(StoreCalls::default()),
            journal: Mutex::new(Vec::new()),
            last_effects: Mutex::new(None),
        }
    }

    /// Set a block directly, bypassing counters, journal and faults
    pub fn place(&self, pos: VoxelPos, block: BaseBlock) {
        let mut contents = self.contents.write();
        contents.blocks.insert(pos, block.state);
        match block.nbt {
            Some(tag) => {
                contents.tiles.insert(pos, (*tag).clone());
            }
            None => {
                contents.tiles.remove(&pos);
            }
        }
    }

    pub fn block(&self, pos: VoxelPos) -> BlockState {
        self.contents
            .read()
            .blocks
            .get(&pos)
            .copied()
            .unwrap_or(BlockState::AIR)
    }

    pub fn tile(&self, pos: VoxelPos) -> Option<CompoundTag> {
        self.contents.read().tiles.get(&pos).cloned()
    }

    /// Biome of the (x, z) column; unset columns are plains
    pub fn biome(&self, x: i32, z: i32) -> BiomeId {
        self.contents
            .read()
            .biomes
            .get(&(x, z))
            .copied()
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        self.contents.read().clone()
    }

    pub fn calls(&self) -> StoreCalls {
        *self.calls.lock()
    }

    pub fn journal(&self) -> Vec<StoreEvent> {
        self.journal.lock().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().clear();
        *self.calls.lock() = StoreCalls::default();
    }

    /// Side effects requested by the most recent primary block write
    pub fn last_effects(&self) -> Option<SideEffectSet> {
        *self.last_effects.lock()
    }

    // Fault injection

    pub fn reject_block_writes_at(&self, pos: VoxelPos) {
        self.faults.write().reject_blocks.insert(pos);
    }

    pub fn reject_all_block_writes(&self, reject: bool) {
        self.faults.write().reject_all_blocks = reject;
    }

    pub fn fail_raw_writes_at(&self, pos: VoxelPos) {
        self.faults.write().fail_raw.insert(pos);
    }

    pub fn fail_tag_restore_at(&self, pos: VoxelPos) {
        self.faults.write().fail_restore.insert(pos);
    }

    pub fn fail_biome_at(&self, x: i32, z: i32) {
        self.faults.write().fail_biomes.insert((x, z));
    }

    fn record(&self, event: StoreEvent) {
        self.journal.lock().push(event);
    }

    fn check_bounds(pos: VoxelPos) -> Result<(), WriteError> {
        if pos.in_height_bounds() {
            Ok(())
        } else {
            Err(WriteError::OutOfBounds(pos))
        }
    }

    /// Replace a block's state, dropping its tile data when the type changes
    fn replace_state(contents: &mut WorldSnapshot, pos: VoxelPos, state: BlockState) {
        let previous = contents.blocks.insert(pos, state).unwrap_or(BlockState::AIR);
        if previous.id != state.id {
            contents.tiles.remove(&pos);
        }
    }
}

impl WorldStore for MemoryWorld {
    fn world_name(&self) -> &str {
        &self.name
    }

    fn get_block(&self, pos: VoxelPos) -> BaseBlock {
        self.calls.lock().reads += 1;
        let contents = self.contents.read();
        BaseBlock {
            state: contents.blocks.get(&pos).copied().unwrap_or(BlockState::AIR),
            nbt: contents.tiles.get(&pos).cloned().map(Arc::new),
        }
    }

    fn set_block(
        &self,
        pos: VoxelPos,
        block: &BaseBlock,
        effects: SideEffectSet,
    ) -> Result<(), WriteError> {
        self.calls.lock().block_writes += 1;
        Self::check_bounds(pos)?;
        {
            let faults = self.faults.read();
            if faults.reject_all_blocks || faults.reject_blocks.contains(&pos) {
                return Err(WriteError::Rejected {
                    pos,
                    reason: "unsupported block transition".to_string(),
                });
            }
        }

        {
            let mut contents = self.contents.write();
            Self::replace_state(&mut contents, pos, block.state);
            if let Some(tag) = block.nbt_data() {
                contents.tiles.insert(pos, tag.clone());
            }
        }
        *self.last_effects.lock() = Some(effects);
        self.record(StoreEvent::Block(pos));
        Ok(())
    }

    fn set_biome(&self, pos: VoxelPos, biome: BiomeId) -> Result<(), WriteError> {
        self.calls.lock().biome_writes += 1;
        if self.faults.read().fail_biomes.contains(&pos.column()) {
            return Err(WriteError::Rejected {
                pos,
                reason: "biome storage unavailable".to_string(),
            });
        }
        self.contents.write().biomes.insert(pos.column(), biome);
        self.record(StoreEvent::Biome(pos));
        Ok(())
    }
}

impl FallbackAccess for MemoryWorld {
    fn raw_block(&self, pos: VoxelPos) -> Result<RawBlock, WriteError> {
        self.calls.lock().raw_reads += 1;
        Self::check_bounds(pos)?;
        let contents = self.contents.read();
        let state = contents.blocks.get(&pos).copied().unwrap_or(BlockState::AIR);
        let has_inventory = state.id.is_container()
            && contents.tiles.get(&pos).map_or(false, CompoundTag::has_items);
        Ok(RawBlock {
            state,
            has_inventory,
        })
    }

    fn clear_inventory(&self, pos: VoxelPos) -> Result<(), WriteError> {
        self.calls.lock().inventory_clears += 1;
        if let Some(tile) = self.contents.write().tiles.get_mut(&pos) {
            tile.remove(ITEMS_KEY);
        }
        self.record(StoreEvent::ClearInventory(pos));
        Ok(())
    }

    fn set_raw_block(
        &self,
        pos: VoxelPos,
        state: BlockState,
        _apply_physics: bool,
    ) -> Result<(), WriteError> {
        self.calls.lock().raw_writes += 1;
        Self::check_bounds(pos)?;
        if self.faults.read().fail_raw.contains(&pos) {
            return Err(WriteError::Rejected {
                pos,
                reason: "platform refused block data".to_string(),
            });
        }
        Self::replace_state(&mut self.contents.write(), pos, state);
        self.record(StoreEvent::RawBlock(pos));
        Ok(())
    }
}

impl TagRestorer for MemoryWorld {
    fn restore_tag(
        &self,
        world: &str,
        pos: VoxelPos,
        tag: &CompoundTag,
    ) -> Result<(), RestoreError> {
        self.calls.lock().tag_restores += 1;
        if world != self.name {
            return Err(RestoreError::WorldNotFound(world.to_string()));
        }
        if self.faults.read().fail_restore.contains(&pos) {
            return Err(RestoreError::Failed {
                pos,
                reason: "tile entity rejected tag".to_string(),
            });
        }

        let mut contents = self.contents.write();
        let state = contents.blocks.get(&pos).copied().unwrap_or(BlockState::AIR);
        if !state.id.has_tile_entity() {
            return Err(RestoreError::NoTileEntity(pos));
        }
        contents.tiles.entry(pos).or_default().merge(tag);
        drop(contents);

        self.record(StoreEvent::Tag(pos));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::core::{BlockId, Tag};

    fn chest_with_items() -> BaseBlock {
        let tag = CompoundTag::new().with(ITEMS_KEY, Tag::List(vec![Tag::Int(1)]));
        BlockState::of(BlockId::CHEST).with_nbt(Arc::new(tag))
    }

    #[test]
    fn test_biomes_are_per_column() {
        let world = MemoryWorld::new("world");
        world
            .set_biome(VoxelPos::new(5, 0, 6), BiomeId::DESERT)
            .expect("biome write");
        assert_eq!(world.biome(5, 6), BiomeId::DESERT);
        assert_eq!(world.biome(5, 7), BiomeId::PLAINS);
    }

    #[test]
    fn test_raw_block_reports_inventory() {
        let world = MemoryWorld::new("world");
        let pos = VoxelPos::new(0, 1, 0);
        world.place(pos, chest_with_items());

        let raw = world.raw_block(pos).expect("in bounds");
        assert!(raw.has_inventory);

        world.clear_inventory(pos).expect("clear");
        assert!(!world.raw_block(pos).expect("in bounds").has_inventory);
    }

    #[test]
    fn test_type_change_drops_tile() {
        let world = MemoryWorld::new("world");
        let pos = VoxelPos::new(0, 1, 0);
        world.place(pos, chest_with_items());

        world
            .set_raw_block(pos, BlockState::of(BlockId::STONE), false)
            .expect("raw write");
        assert_eq!(world.tile(pos), None);
    }

    #[test]
    fn test_restore_requires_tile_entity_and_world() {
        let world = MemoryWorld::new("world");
        let pos = VoxelPos::new(0, 1, 0);
        let tag = CompoundTag::new().with("Text1", Tag::String("hi".into()));

        assert_eq!(
            world.restore_tag("world", pos, &tag),
            Err(RestoreError::NoTileEntity(pos))
        );
        world.place(pos, BlockState::of(BlockId::SIGN).into());
        assert!(matches!(
            world.restore_tag("nether", pos, &tag),
            Err(RestoreError::WorldNotFound(_))
        ));
        world.restore_tag("world", pos, &tag).expect("restore");
        assert_eq!(world.tile(pos), Some(tag));
    }

    #[test]
    fn test_out_of_bounds_primary_write() {
        let world = MemoryWorld::new("world");
        let pos = VoxelPos::new(0, 300, 0);
        let result = world.set_block(pos, &BlockState::of(BlockId::STONE).into(), SideEffectSet::none());
        assert_eq!(result, Err(WriteError::OutOfBounds(pos)));
        assert!(world.journal().is_empty());
    }
}
