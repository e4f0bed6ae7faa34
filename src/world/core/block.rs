use super::tag::CompoundTag;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Unique identifier for a block type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BlockId(pub u16);

impl Default for BlockId {
    fn default() -> Self {
        BlockId::AIR
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display block name if it's a known block
        match *self {
            BlockId::AIR => write!(f, "Air"),
            BlockId::STONE => write!(f, "Stone"),
            BlockId::GRASS => write!(f, "Grass"),
            BlockId::DIRT => write!(f, "Dirt"),
            BlockId::PLANKS => write!(f, "Planks"),
            BlockId::BEDROCK => write!(f, "Bedrock"),
            BlockId::SAND => write!(f, "Sand"),
            BlockId::WATER => write!(f, "Water"),
            BlockId::GLASS => write!(f, "Glass"),
            BlockId::CHEST => write!(f, "Chest"),
            BlockId::FURNACE => write!(f, "Furnace"),
            BlockId::HOPPER => write!(f, "Hopper"),
            BlockId::SIGN => write!(f, "Sign"),
            BlockId::SPAWNER => write!(f, "Spawner"),
            _ => write!(f, "Block({})", self.0),
        }
    }
}

impl BlockId {
    pub const AIR: BlockId = BlockId(0);
    pub const STONE: BlockId = BlockId(1);
    pub const GRASS: BlockId = BlockId(2);
    pub const DIRT: BlockId = BlockId(3);
    pub const PLANKS: BlockId = BlockId(5);
    pub const BEDROCK: BlockId = BlockId(7);
    pub const WATER: BlockId = BlockId(9);
    pub const SAND: BlockId = BlockId(12);
    pub const GLASS: BlockId = BlockId(20);
    pub const SPAWNER: BlockId = BlockId(52);
    pub const CHEST: BlockId = BlockId(54);
    pub const FURNACE: BlockId = BlockId(61);
    pub const SIGN: BlockId = BlockId(63);
    pub const HOPPER: BlockId = BlockId(154);

    pub const fn new(id: u16) -> Self {
        BlockId(id)
    }

    /// Blocks whose tile entity holds an inventory
    pub fn is_container(&self) -> bool {
        matches!(*self, BlockId::CHEST | BlockId::FURNACE | BlockId::HOPPER)
    }

    /// Blocks that carry a tile entity and can accept a restored tag
    pub fn has_tile_entity(&self) -> bool {
        self.is_container() || matches!(*self, BlockId::SIGN | BlockId::SPAWNER)
    }
}

/// Block type plus auxiliary data (facing, variant, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockState {
    pub id: BlockId,
    pub data: u16,
}

impl BlockState {
    pub const AIR: BlockState = BlockState::new(BlockId::AIR, 0);

    pub const fn new(id: BlockId, data: u16) -> Self {
        Self { id, data }
    }

    pub const fn of(id: BlockId) -> Self {
        Self { id, data: 0 }
    }

    /// Full block with no tagged payload
    pub fn to_base_block(self) -> BaseBlock {
        BaseBlock::new(self)
    }

    /// Full block carrying `tag` as its tagged payload
    pub fn with_nbt(self, tag: Arc<CompoundTag>) -> BaseBlock {
        BaseBlock {
            state: self,
            nbt: Some(tag),
        }
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data == 0 {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}:{}", self.id, self.data)
        }
    }
}

/// A block state together with its optional tagged payload
///
/// The payload is shared: staging often stamps the same container contents
/// into many cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaseBlock {
    pub state: BlockState,
    pub nbt: Option<Arc<CompoundTag>>,
}

impl BaseBlock {
    pub fn new(state: BlockState) -> Self {
        Self { state, nbt: None }
    }

    pub fn has_nbt_data(&self) -> bool {
        self.nbt.is_some()
    }

    pub fn nbt_data(&self) -> Option<&CompoundTag> {
        self.nbt.as_deref()
    }

    pub fn block_type(&self) -> BlockId {
        self.state.id
    }
}

impl From<BlockState> for BaseBlock {
    fn from(state: BlockState) -> Self {
        BaseBlock::new(state)
    }
}

/// Biome identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct BiomeId(pub u16);

impl BiomeId {
    pub const OCEAN: BiomeId = BiomeId(0);
    pub const PLAINS: BiomeId = BiomeId(1);
    pub const DESERT: BiomeId = BiomeId(2);
    pub const FOREST: BiomeId = BiomeId(4);
    pub const TAIGA: BiomeId = BiomeId(5);
    pub const THE_VOID: BiomeId = BiomeId(127);
}

impl Default for BiomeId {
    fn default() -> Self {
        BiomeId::PLAINS
    }
}

impl fmt::Display for BiomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            BiomeId::OCEAN => write!(f, "Ocean"),
            BiomeId::PLAINS => write!(f, "Plains"),
            BiomeId::DESERT => write!(f, "Desert"),
            BiomeId::FOREST => write!(f, "Forest"),
            BiomeId::TAIGA => write!(f, "Taiga"),
            BiomeId::THE_VOID => write!(f, "The Void"),
            _ => write!(f, "Biome({})", self.0),
        }
    }
}
