//! Core world data types and fundamental structures
//!
//! Positions, block and biome identifiers, tagged payloads and the layer/slot
//! tables shared by the staging side and the write path.

mod block;
pub mod offsets;
mod position;
mod tag;

pub use block::{BaseBlock, BiomeId, BlockId, BlockState};
pub use offsets::{offset_of, slot_of};
pub use position::{ChunkPos, VoxelPos};
pub use tag::{CompoundTag, Tag, ITEMS_KEY};
