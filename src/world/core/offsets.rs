//! Layer/slot lookup tables
//!
//! Staged chunks store cells as `LAYER_COUNT` sections of `SLOTS_PER_LAYER`
//! slots. A slot packs its section-relative position as
//! `((y & 15) << 8) | (z << 4) | x`. The tables below hold the inverse so the
//! write path never re-derives coordinates by hand.

use crate::constants::chunk::{LAYER_COUNT, SECTION_HEIGHT, SLOTS_PER_LAYER};
use lazy_static::lazy_static;

lazy_static! {
    /// Chunk-relative (x, y, z) for every (layer, slot), flattened layer-major
    static ref OFFSET_TABLE: Vec<[u16; 3]> = {
        let mut table = Vec::with_capacity(LAYER_COUNT * SLOTS_PER_LAYER);
        for layer in 0..LAYER_COUNT {
            for slot in 0..SLOTS_PER_LAYER {
                let x = (slot & 0xF) as u16;
                let z = ((slot >> 4) & 0xF) as u16;
                let y = (layer as i32 * SECTION_HEIGHT) as u16 + (slot >> 8) as u16;
                table.push([x, y, z]);
            }
        }
        table
    };
}

/// Chunk-relative offset `(dx, y, dz)` of a (layer, slot) pair.
///
/// `y` is absolute since chunks span the full height. Panics if `layer` or
/// `slot` is out of range; both always come from iterating a `LocalChunk`.
pub fn offset_of(layer: usize, slot: usize) -> (i32, i32, i32) {
    debug_assert!(layer < LAYER_COUNT && slot < SLOTS_PER_LAYER);
    let [x, y, z] = OFFSET_TABLE[layer * SLOTS_PER_LAYER + slot];
    (x as i32, y as i32, z as i32)
}

/// Layer and slot for a chunk-relative position, `None` outside the column
pub fn slot_of(x: u8, y: i32, z: u8) -> Option<(usize, usize)> {
    if x > 15 || z > 15 || y < 0 {
        return None;
    }
    let layer = (y / SECTION_HEIGHT) as usize;
    if layer >= LAYER_COUNT {
        return None;
    }
    let slot = (((y & 0xF) as usize) << 8) | ((z as usize) << 4) | x as usize;
    Some((layer, slot))
}
