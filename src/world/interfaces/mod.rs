//! Interfaces to the authoritative world
//!
//! The queue never owns the world. It writes through these traits, which the
//! host implements over its real block storage. Implementations are shared
//! (`Arc`) and take `&self`: the world is read concurrently by the simulation
//! while a queue writes into it, so each implementation brings its own
//! interior locking.

use crate::error::{RestoreError, WriteError};
use crate::queue::SideEffectSet;
use crate::world::core::{BaseBlock, BiomeId, BlockState, CompoundTag, VoxelPos};
use std::sync::Arc;

/// Primary block/biome access, the path every write tries first
pub trait WorldStore: Send + Sync {
    /// Name the tag-restore side channel uses to find this world
    fn world_name(&self) -> &str;

    /// Current block at `pos`, including any tile entity payload
    fn get_block(&self, pos: VoxelPos) -> BaseBlock;

    /// Write a full block. Side effects not enabled in `effects` must not run.
    fn set_block(
        &self,
        pos: VoxelPos,
        block: &BaseBlock,
        effects: SideEffectSet,
    ) -> Result<(), WriteError>;

    /// Set the biome of the column containing `pos`
    fn set_biome(&self, pos: VoxelPos, biome: BiomeId) -> Result<(), WriteError>;
}

/// What the fallback path sees of a live cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBlock {
    pub state: BlockState,
    /// The cell's tile entity holds inventory contents
    pub has_inventory: bool,
}

/// Direct platform-level cell access, used when a primary write is rejected
pub trait FallbackAccess: Send + Sync {
    fn raw_block(&self, pos: VoxelPos) -> Result<RawBlock, WriteError>;

    /// Empty the inventory of the container at `pos`
    fn clear_inventory(&self, pos: VoxelPos) -> Result<(), WriteError>;

    /// Set type and aux data in one store call
    fn set_raw_block(
        &self,
        pos: VoxelPos,
        state: BlockState,
        apply_physics: bool,
    ) -> Result<(), WriteError>;
}

/// Side channel that rebuilds tile entity data from a tag
pub trait TagRestorer: Send + Sync {
    fn restore_tag(&self, world: &str, pos: VoxelPos, tag: &CompoundTag)
        -> Result<(), RestoreError>;
}

/// The three world collaborators a queue writes through
#[derive(Clone)]
pub struct WorldTargets {
    pub store: Arc<dyn WorldStore>,
    pub fallback: Arc<dyn FallbackAccess>,
    pub restorer: Arc<dyn TagRestorer>,
}

impl WorldTargets {
    pub fn new(
        store: Arc<dyn WorldStore>,
        fallback: Arc<dyn FallbackAccess>,
        restorer: Arc<dyn TagRestorer>,
    ) -> Self {
        Self {
            store,
            fallback,
            restorer,
        }
    }

    /// Targets backed by a single object implementing every interface
    pub fn from_shared<W>(world: Arc<W>) -> Self
    where
        W: WorldStore + FallbackAccess + TagRestorer + 'static,
    {
        Self {
            store: world.clone(),
            fallback: world.clone(),
            restorer: world,
        }
    }

    pub fn world_name(&self) -> &str {
        self.store.world_name()
    }
}

impl std::fmt::Debug for WorldTargets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldTargets")
            .field("world", &self.store.world_name())
            .finish_non_exhaustive()
    }
}
