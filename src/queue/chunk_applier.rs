//! Chunk Applier - per-chunk cell write protocol
//!
//! Each staged chunk is applied in three passes, in this order:
//! 1. blocks, primary write first, fallback write on rejection
//! 2. column biomes
//! 3. tile tags whose cell was not written with a tag in pass 1
//!
//! Later passes read the store, so they rely on pass 1 already being visible.
//! A failure costs one cell, never the chunk.

use super::side_effects::SideEffectSet;
use crate::error::{FallbackCause, QueueError, QueueResult};
use crate::world::core::{BaseBlock, ChunkPos, VoxelPos};
use crate::world::interfaces::WorldTargets;
use crate::world::storage::{LocalChunk, PendingChangeSet};
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Applies everything staged for one chunk key
///
/// `report` receives every per-cell error. A returned `Err` is reserved for
/// errors that end the whole run.
pub trait ChunkApplier: Send {
    fn apply_chunk(
        &mut self,
        key: ChunkPos,
        report: &mut dyn FnMut(QueueError),
    ) -> QueueResult<ChunkApplyStats>;
}

impl<F> ChunkApplier for F
where
    F: FnMut(ChunkPos, &mut dyn FnMut(QueueError)) -> QueueResult<ChunkApplyStats> + Send,
{
    fn apply_chunk(
        &mut self,
        key: ChunkPos,
        report: &mut dyn FnMut(QueueError),
    ) -> QueueResult<ChunkApplyStats> {
        self(key, report)
    }
}

/// Outcome counters for applied chunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkApplyStats {
    /// Cells accepted by the primary write
    pub cells_written: usize,
    /// Cells written through the fallback path
    pub cells_via_fallback: usize,
    /// Cells the fallback found already in the target state
    pub cells_unchanged: usize,
    pub cells_failed: usize,
    pub biomes_written: usize,
    pub biomes_failed: usize,
    /// Tile tags written through the primary path
    pub tiles_written: usize,
    /// Tile tags written through the restore side channel
    pub tiles_restored: usize,
    pub tiles_failed: usize,
}

impl ChunkApplyStats {
    pub fn merge(&mut self, other: &ChunkApplyStats) {
        self.cells_written += other.cells_written;
        self.cells_via_fallback += other.cells_via_fallback;
        self.cells_unchanged += other.cells_unchanged;
        self.cells_failed += other.cells_failed;
        self.biomes_written += other.biomes_written;
        self.biomes_failed += other.biomes_failed;
        self.tiles_written += other.tiles_written;
        self.tiles_restored += other.tiles_restored;
        self.tiles_failed += other.tiles_failed;
    }

    pub fn failures(&self) -> usize {
        self.cells_failed + self.biomes_failed + self.tiles_failed
    }
}

/// How a single cell ended up in its target state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallbackOutcome {
    Written,
    Unchanged,
}

/// Default applier: writes a [`PendingChangeSet`] into a world
pub struct LocalChunkApplier {
    changes: Arc<PendingChangeSet>,
    targets: WorldTargets,
    effects: SideEffectSet,
}

impl LocalChunkApplier {
    pub fn new(changes: Arc<PendingChangeSet>, targets: WorldTargets, effects: SideEffectSet) -> Self {
        Self {
            changes,
            targets,
            effects,
        }
    }

    pub fn effects(&self) -> SideEffectSet {
        self.effects
    }

    fn apply_blocks(
        &self,
        chunk: &LocalChunk,
        stats: &mut ChunkApplyStats,
        tagged_cells: &mut FxHashSet<VoxelPos>,
        report: &mut dyn FnMut(QueueError),
    ) {
        for (pos, block) in chunk.staged_blocks() {
            // Only a tag that actually landed covers the standalone tile pass
            let tag_landed = match self.targets.store.set_block(pos, block, self.effects) {
                Ok(()) => {
                    stats.cells_written += 1;
                    true
                }
                Err(rejection) => {
                    log::debug!(
                        "[Queue] Primary write rejected at {} ({}), using fallback",
                        pos,
                        rejection
                    );
                    match self.fallback_write(pos, block) {
                        Ok(FallbackOutcome::Written) => {
                            stats.cells_via_fallback += 1;
                            true
                        }
                        Ok(FallbackOutcome::Unchanged) => {
                            stats.cells_unchanged += 1;
                            false
                        }
                        Err(cause) => {
                            stats.cells_failed += 1;
                            report(QueueError::FallbackFailure { pos, cause });
                            false
                        }
                    }
                }
            };

            if tag_landed && block.has_nbt_data() {
                tagged_cells.insert(pos);
            }
        }
    }

    /// Write a rejected cell straight through the platform layer
    fn fallback_write(&self, pos: VoxelPos, block: &BaseBlock) -> Result<FallbackOutcome, FallbackCause> {
        let fallback = &self.targets.fallback;

        let existing = fallback.raw_block(pos)?;
        if existing.state == block.state {
            return Ok(FallbackOutcome::Unchanged);
        }

        // A type change must not leave old contents behind
        if existing.has_inventory {
            fallback.clear_inventory(pos)?;
        }

        fallback.set_raw_block(pos, block.state, false)?;

        if let Some(tag) = block.nbt_data() {
            self.targets
                .restorer
                .restore_tag(self.targets.world_name(), pos, tag)?;
        }

        Ok(FallbackOutcome::Written)
    }

    fn apply_biomes(
        &self,
        chunk: &LocalChunk,
        stats: &mut ChunkApplyStats,
        report: &mut dyn FnMut(QueueError),
    ) {
        for (pos, biome) in chunk.staged_biomes() {
            match self.targets.store.set_biome(pos, biome) {
                Ok(()) => stats.biomes_written += 1,
                Err(source) => {
                    stats.biomes_failed += 1;
                    report(QueueError::BiomeFailure { pos, source });
                }
            }
        }
    }

    fn apply_tiles(
        &self,
        chunk: &LocalChunk,
        stats: &mut ChunkApplyStats,
        tagged_cells: &FxHashSet<VoxelPos>,
        report: &mut dyn FnMut(QueueError),
    ) {
        let mut tiles: Vec<_> = chunk
            .tiles()
            .iter()
            .filter(|(pos, _)| !tagged_cells.contains(*pos))
            .collect();
        tiles.sort_unstable_by_key(|(pos, _)| **pos);

        for (&pos, tag) in tiles {
            let current = self.targets.store.get_block(pos);
            let block = current.state.with_nbt(Arc::new(tag.clone()));

            let rejection = match self.targets.store.set_block(pos, &block, self.effects) {
                Ok(()) => {
                    stats.tiles_written += 1;
                    continue;
                }
                Err(rejection) => rejection,
            };
            log::debug!(
                "[Queue] Tile write rejected at {} ({}), restoring tag directly",
                pos,
                rejection
            );

            match self
                .targets
                .restorer
                .restore_tag(self.targets.world_name(), pos, tag)
            {
                Ok(()) => stats.tiles_restored += 1,
                Err(error) => {
                    stats.tiles_failed += 1;
                    report(QueueError::FallbackFailure {
                        pos,
                        cause: error.into(),
                    });
                }
            }
        }
    }
}

impl ChunkApplier for LocalChunkApplier {
    fn apply_chunk(
        &mut self,
        key: ChunkPos,
        report: &mut dyn FnMut(QueueError),
    ) -> QueueResult<ChunkApplyStats> {
        let chunk = self.changes.chunk(key)?;

        let mut stats = ChunkApplyStats::default();
        let mut tagged_cells = FxHashSet::default();

        self.apply_blocks(chunk, &mut stats, &mut tagged_cells, report);
        self.apply_biomes(chunk, &mut stats, report);
        if !chunk.tiles().is_empty() {
            self.apply_tiles(chunk, &mut stats, &tagged_cells, report);
        }

        log::trace!(
            "[Queue] Applied chunk {}: {} written, {} via fallback, {} failed",
            key,
            stats.cells_written,
            stats.cells_via_fallback,
            stats.failures()
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{ChunkCoordinator, CoordinatorState};
    use crate::world::core::{BiomeId, BlockId, BlockState, CompoundTag, Tag, ITEMS_KEY};
    use crate::world::storage::{MemoryWorld, StoreEvent};
    use parking_lot::Mutex;

    fn chest_tag(item: &str) -> CompoundTag {
        CompoundTag::new().with(
            ITEMS_KEY,
            Tag::List(vec![Tag::Compound(
                CompoundTag::new().with("id", Tag::String(item.to_string())),
            )]),
        )
    }

    fn applier_for(world: &Arc<MemoryWorld>, changes: PendingChangeSet) -> LocalChunkApplier {
        LocalChunkApplier::new(
            Arc::new(changes),
            WorldTargets::from_shared(world.clone()),
            SideEffectSet::batch(),
        )
    }

    fn apply_first(applier: &mut LocalChunkApplier, key: ChunkPos) -> (ChunkApplyStats, Vec<QueueError>) {
        let mut errors = Vec::new();
        let stats = applier
            .apply_chunk(key, &mut |error| errors.push(error))
            .expect("chunk is staged");
        (stats, errors)
    }

    #[test]
    fn test_primary_write_uses_batch_effects() {
        let world = Arc::new(MemoryWorld::new("world"));
        let pos = VoxelPos::new(3, 64, 3);
        let mut builder = PendingChangeSet::builder();
        builder.set_block(pos, BlockState::of(BlockId::STONE));
        let mut applier = applier_for(&world, builder.build());

        let (stats, errors) = apply_first(&mut applier, pos.chunk_pos());

        assert!(errors.is_empty());
        assert_eq!(stats.cells_written, 1);
        assert_eq!(world.block(pos), BlockState::of(BlockId::STONE));
        assert_eq!(world.last_effects(), Some(SideEffectSet::batch()));
        assert_eq!(world.calls().raw_reads, 0);
    }

    #[test]
    fn test_rejected_cell_does_not_stop_neighbours() {
        let world = Arc::new(MemoryWorld::new("world"));
        let bad = VoxelPos::new(1, 10, 1);
        world.reject_block_writes_at(bad);
        world.fail_raw_writes_at(bad);

        let mut builder = PendingChangeSet::builder();
        for x in 0..4 {
            builder.set_block(VoxelPos::new(x, 10, 1), BlockState::of(BlockId::PLANKS));
        }
        let mut applier = applier_for(&world, builder.build());

        let (stats, errors) = apply_first(&mut applier, ChunkPos::new(0, 0));

        assert_eq!(stats.cells_written, 3);
        assert_eq!(stats.cells_failed, 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].position(), Some(bad));
        for x in [0, 2, 3] {
            assert_eq!(world.block(VoxelPos::new(x, 10, 1)).id, BlockId::PLANKS);
        }
        assert_eq!(world.block(bad), BlockState::AIR);
    }

    #[test]
    fn test_fallback_short_circuits_on_equal_state() {
        let world = Arc::new(MemoryWorld::new("world"));
        let pos = VoxelPos::new(0, 5, 0);
        world.place(pos, BlockState::new(BlockId::SAND, 1).into());
        world.reject_block_writes_at(pos);

        let mut builder = PendingChangeSet::builder();
        builder.set_block(pos, BlockState::new(BlockId::SAND, 1));
        let mut applier = applier_for(&world, builder.build());

        let (stats, errors) = apply_first(&mut applier, pos.chunk_pos());

        assert!(errors.is_empty());
        assert_eq!(stats.cells_unchanged, 1);
        assert_eq!(world.calls().raw_writes, 0);
    }

    #[test]
    fn test_passes_run_blocks_then_biomes_then_tiles() {
        let world = Arc::new(MemoryWorld::new("world"));
        let chest = VoxelPos::new(2, 0, 2);
        let loose_tile = VoxelPos::new(4, 1, 4);
        world.place(loose_tile, BlockState::of(BlockId::FURNACE).into());

        let mut builder = PendingChangeSet::builder();
        builder.set_tile(loose_tile, chest_tag("minecraft:coal"));
        builder.set_biome(2, 2, BiomeId::DESERT);
        builder.set_block(chest, BlockState::of(BlockId::CHEST));
        let mut applier = applier_for(&world, builder.build());

        apply_first(&mut applier, ChunkPos::new(0, 0));

        assert_eq!(
            world.journal(),
            vec![
                StoreEvent::Block(chest),
                StoreEvent::Biome(VoxelPos::new(2, 0, 2)),
                StoreEvent::Block(loose_tile),
            ]
        );
        assert_eq!(world.biome(2, 2), BiomeId::DESERT);
        assert_eq!(world.tile(loose_tile), Some(chest_tag("minecraft:coal")));
    }

    #[test]
    fn test_tile_covered_by_tagged_cell_is_not_written_twice() {
        let world = Arc::new(MemoryWorld::new("world"));
        let pos = VoxelPos::new(8, 30, 8);
        let tag = Arc::new(chest_tag("minecraft:apple"));

        let mut builder = PendingChangeSet::builder();
        builder.set_block(pos, BlockState::of(BlockId::CHEST).with_nbt(tag.clone()));
        builder.set_tile(pos, chest_tag("minecraft:stick"));
        let mut applier = applier_for(&world, builder.build());

        let (stats, _) = apply_first(&mut applier, pos.chunk_pos());

        assert_eq!(stats.cells_written, 1);
        assert_eq!(stats.tiles_written + stats.tiles_restored, 0);
        assert_eq!(world.tile(pos).as_ref(), Some(tag.as_ref()));
    }

    #[test]
    fn test_rejected_tile_falls_back_to_restore() {
        let world = Arc::new(MemoryWorld::new("world"));
        let pos = VoxelPos::new(1, 1, 1);
        world.place(pos, BlockState::of(BlockId::CHEST).into());
        world.reject_block_writes_at(pos);

        let mut builder = PendingChangeSet::builder();
        builder.set_tile(pos, chest_tag("minecraft:bread"));
        let mut applier = applier_for(&world, builder.build());

        let (stats, errors) = apply_first(&mut applier, pos.chunk_pos());

        assert!(errors.is_empty());
        assert_eq!(stats.tiles_restored, 1);
        assert_eq!(world.tile(pos), Some(chest_tag("minecraft:bread")));
    }

    #[test]
    fn test_biome_failure_is_reported_and_chunk_continues() {
        let world = Arc::new(MemoryWorld::new("world"));
        world.fail_biome_at(0, 0);

        let mut builder = PendingChangeSet::builder();
        builder.set_biome(0, 0, BiomeId::TAIGA);
        builder.set_biome(1, 0, BiomeId::TAIGA);
        let mut applier = applier_for(&world, builder.build());

        let (stats, errors) = apply_first(&mut applier, ChunkPos::new(0, 0));

        assert_eq!(stats.biomes_written, 1);
        assert_eq!(stats.biomes_failed, 1);
        assert!(matches!(errors.as_slice(), [QueueError::BiomeFailure { .. }]));
        assert_eq!(world.biome(1, 0), BiomeId::TAIGA);
    }

    #[test]
    fn test_missing_chunk_is_fatal() {
        let world = Arc::new(MemoryWorld::new("world"));
        let mut applier = applier_for(&world, PendingChangeSet::default());

        let result = applier.apply_chunk(ChunkPos::new(3, 3), &mut |_| {});

        assert!(matches!(result, Err(QueueError::ChunkNotStaged(key)) if key == ChunkPos::new(3, 3)));
        assert_eq!(world.calls(), Default::default());
    }

    #[test]
    fn test_failed_tile_restore_reports_once_and_run_completes() {
        let world = Arc::new(MemoryWorld::new("world"));
        let pos = VoxelPos::new(1, 1, 1);
        world.place(pos, BlockState::of(BlockId::CHEST).into());
        world.reject_block_writes_at(pos);
        world.fail_tag_restore_at(pos);

        let mut builder = PendingChangeSet::builder();
        builder.set_tile(pos, chest_tag("minecraft:coal"));
        builder.set_block(VoxelPos::new(3, 1, 1), BlockState::of(BlockId::STONE));
        let changes = builder.build();

        let mut applier = applier_for(&world, changes.clone());
        let (stats, errors) = apply_first(&mut applier, pos.chunk_pos());

        assert_eq!(stats.tiles_failed, 1);
        assert_eq!(stats.tiles_written + stats.tiles_restored, 0);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            QueueError::FallbackFailure { pos: p, cause: FallbackCause::Restore(_) } if p == pos
        ));
        assert_eq!(world.tile(pos), None);

        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = reported.clone();
        let mut coordinator = ChunkCoordinator::builder()
            .with_chunks(changes.keys().iter().copied())
            .with_applier(applier_for(&world, changes))
            .with_error_handler(move |error| sink.lock().push(error.position()))
            .build()
            .expect("build");
        coordinator.start();
        coordinator.advance_window().expect("window");

        assert_eq!(coordinator.state(), CoordinatorState::Completed);
        assert_eq!(*reported.lock(), vec![Some(pos)]);
        assert_eq!(coordinator.stats().cells.tiles_failed, 1);
    }

    #[test]
    fn test_failed_tagged_cell_leaves_tile_pass_to_run() {
        let world = Arc::new(MemoryWorld::new("world"));
        let pos = VoxelPos::new(6, 12, 6);
        world.place(pos, BlockState::of(BlockId::CHEST).into());
        world.reject_block_writes_at(pos);
        world.fail_raw_writes_at(pos);

        let mut builder = PendingChangeSet::builder();
        builder.set_block(
            pos,
            BlockState::of(BlockId::FURNACE).with_nbt(Arc::new(chest_tag("minecraft:apple"))),
        );
        builder.set_tile(pos, chest_tag("minecraft:bread"));
        let mut applier = applier_for(&world, builder.build());

        let (stats, errors) = apply_first(&mut applier, pos.chunk_pos());

        // The furnace never landed, so the staged tile still goes to the chest
        assert_eq!(stats.cells_failed, 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(stats.tiles_restored, 1);
        assert_eq!(world.block(pos).id, BlockId::CHEST);
        assert_eq!(world.tile(pos), Some(chest_tag("minecraft:bread")));
    }
}
