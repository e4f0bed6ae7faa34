//! Staging and in-memory storage
//!
//! - `LocalChunk` / `PendingChangeSet`: staged edits, read-only once built
//! - `MemoryWorld`: an in-process implementation of the world interfaces

mod change_set;
mod local_chunk;
mod memory_world;

// Staged edits
pub use change_set::{PendingChangeSet, PendingChangeSetBuilder};
pub use local_chunk::{Layer, LocalChunk};

// In-memory world store
pub use memory_world::{MemoryWorld, StoreCalls, StoreEvent, WorldSnapshot};
