use crate::constants::chunk::{CHUNK_EDGE, CHUNK_SHIFT, MAX_Y, MIN_Y};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute block position in a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk column containing this block.
    ///
    /// Uses floor division so negative coordinates land in the right column
    /// (x = -1 belongs to chunk -1, not chunk 0).
    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos {
            x: self.x.div_euclid(CHUNK_EDGE),
            z: self.z.div_euclid(CHUNK_EDGE),
        }
    }

    /// Position relative to the owning chunk's origin (0..16, y, 0..16)
    pub fn local(&self) -> (u8, i32, u8) {
        (
            self.x.rem_euclid(CHUNK_EDGE) as u8,
            self.y,
            self.z.rem_euclid(CHUNK_EDGE) as u8,
        )
    }

    /// Whether `y` is inside the buildable height range
    pub fn in_height_bounds(&self) -> bool {
        (MIN_Y..MAX_Y).contains(&self.y)
    }

    /// Column key used for per-column data such as biomes
    pub fn column(&self) -> (i32, i32) {
        (self.x, self.z)
    }
}

impl fmt::Display for VoxelPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Chunk column key: one 16x16 column of the world, keyed by x/z only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Lowest block x inside this chunk
    pub fn min_block_x(&self) -> i32 {
        self.x << CHUNK_SHIFT
    }

    /// Lowest block z inside this chunk
    pub fn min_block_z(&self) -> i32 {
        self.z << CHUNK_SHIFT
    }

    /// Absolute position of a chunk-relative offset
    pub fn block_at(&self, dx: i32, y: i32, dz: i32) -> VoxelPos {
        VoxelPos {
            x: self.min_block_x() + dx,
            y,
            z: self.min_block_z() + dz,
        }
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_pos_floor_division() {
        assert_eq!(VoxelPos::new(0, 64, 0).chunk_pos(), ChunkPos::new(0, 0));
        assert_eq!(VoxelPos::new(15, 64, 15).chunk_pos(), ChunkPos::new(0, 0));
        assert_eq!(VoxelPos::new(16, 64, -1).chunk_pos(), ChunkPos::new(1, -1));
        assert_eq!(VoxelPos::new(-17, 0, -16).chunk_pos(), ChunkPos::new(-2, -1));
    }

    #[test]
    fn test_local_and_back() {
        let pos = VoxelPos::new(-3, 70, 35);
        let chunk = pos.chunk_pos();
        let (lx, y, lz) = pos.local();
        assert_eq!((lx, lz), (13, 3));
        assert_eq!(chunk.block_at(lx as i32, y, lz as i32), pos);
    }

    #[test]
    fn test_height_bounds() {
        assert!(VoxelPos::new(0, 0, 0).in_height_bounds());
        assert!(VoxelPos::new(0, 255, 0).in_height_bounds());
        assert!(!VoxelPos::new(0, 256, 0).in_height_bounds());
        assert!(!VoxelPos::new(0, -1, 0).in_height_bounds());
    }
}
