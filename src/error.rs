//! Error handling for the world queue
//!
//! Three layers of errors:
//! - `WriteError` and `RestoreError` come back from the world collaborators.
//!   A rejected primary write is expected and routes the cell to the fallback
//!   path; it never reaches the error observer on its own.
//! - `QueueError` is what the coordinator reports to its error observer and
//!   returns to the driver. Only `ChunkNotStaged` is fatal to a run.

use crate::world::core::{ChunkPos, VoxelPos};

/// Rejection returned by a world store write
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    #[error("Write rejected at {pos}: {reason}")]
    Rejected { pos: VoxelPos, reason: String },

    #[error("Position {0} is outside the buildable height")]
    OutOfBounds(VoxelPos),

    #[error("Chunk {0} is not available")]
    ChunkUnavailable(ChunkPos),
}

/// Failure of the tag-restore side channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestoreError {
    #[error("World '{0}' not found")]
    WorldNotFound(String),

    #[error("No tile entity at {0} to restore a tag into")]
    NoTileEntity(VoxelPos),

    #[error("Tag restore failed at {pos}: {reason}")]
    Failed { pos: VoxelPos, reason: String },
}

/// What went wrong on the fallback path for one cell
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FallbackCause {
    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Restore(#[from] RestoreError),
}

/// Main error type for the world queue
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    // Per-cell errors, reported and skipped
    #[error("Fallback write failed at {pos}: {cause}")]
    FallbackFailure {
        pos: VoxelPos,
        #[source]
        cause: FallbackCause,
    },

    #[error("Biome write failed at {pos}: {source}")]
    BiomeFailure {
        pos: VoxelPos,
        #[source]
        source: WriteError,
    },

    // Invariant violations, fatal to the run
    #[error("Chunk {0} was enumerated but has no staged data")]
    ChunkNotStaged(ChunkPos),

    // Configuration errors
    #[error("Invalid config: {field} = {value} ({reason})")]
    InvalidConfig {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required config: {field}")]
    MissingConfig { field: String },

    #[error("Failed to load config from {path}: {error}")]
    ConfigLoad { path: String, error: String },

    // Driver misuse
    #[error("Coordinator has not been started")]
    NotStarted,
}

impl QueueError {
    /// Whether this error ends the run instead of being reported and skipped
    pub fn is_fatal(&self) -> bool {
        matches!(self, QueueError::ChunkNotStaged(_))
    }

    /// Cell the error is about, if it is a per-cell error
    pub fn position(&self) -> Option<VoxelPos> {
        match self {
            QueueError::FallbackFailure { pos, .. } | QueueError::BiomeFailure { pos, .. } => {
                Some(*pos)
            }
            _ => None,
        }
    }
}

/// Type alias for Results in the world queue
pub type QueueResult<T> = Result<T, QueueError>;

impl From<toml::de::Error> for QueueError {
    fn from(error: toml::de::Error) -> Self {
        QueueError::ConfigLoad {
            path: "<inline>".to_string(),
            error: error.to_string(),
        }
    }
}

/// Convert Option to Result with context
pub trait OptionExt<T> {
    fn ok_or_queue<F>(self, f: F) -> QueueResult<T>
    where
        F: FnOnce() -> QueueError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_queue<F>(self, f: F) -> QueueResult<T>
    where
        F: FnOnce() -> QueueError,
    {
        self.ok_or_else(f)
    }
}
