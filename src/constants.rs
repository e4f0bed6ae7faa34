//! Shared constants for the world queue
//!
//! Chunk geometry and queue defaults live here so every module agrees on them.

use static_assertions::const_assert_eq;

/// Chunk geometry
pub mod chunk {
    /// Edge length of a chunk column in blocks (x and z)
    pub const CHUNK_EDGE: i32 = 16;

    /// Shift that converts a block coordinate into a chunk coordinate
    pub const CHUNK_SHIFT: u32 = 4;

    /// Height of one vertical section (a "layer")
    pub const SECTION_HEIGHT: i32 = 16;

    /// Number of vertical sections in a column
    pub const LAYER_COUNT: usize = 16;

    /// Cells in one section: 16 * 16 * 16
    pub const SLOTS_PER_LAYER: usize = 4096;

    /// Lowest buildable y
    pub const MIN_Y: i32 = 0;

    /// One past the highest buildable y
    pub const MAX_Y: i32 = SECTION_HEIGHT * LAYER_COUNT as i32;
}

/// Queue scheduling defaults
pub mod queue {
    /// Chunks attempted per window regardless of elapsed time
    pub const DEFAULT_INITIAL_BATCH_SIZE: usize = 3;

    /// Soft wall-clock ceiling for a single window
    pub const DEFAULT_MAX_ITERATION_TIME_MS: u64 = 40;
}

const_assert_eq!(1 << chunk::CHUNK_SHIFT, chunk::CHUNK_EDGE);
const_assert_eq!(
    chunk::SLOTS_PER_LAYER,
    (chunk::CHUNK_EDGE * chunk::CHUNK_EDGE * chunk::SECTION_HEIGHT) as usize
);
