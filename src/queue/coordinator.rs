//! Chunk Coordinator - time-sliced application of staged chunks
//!
//! The host grants the coordinator one window at a time through
//! [`ChunkCoordinator::advance_window`]. Each window applies at least
//! `initial_batch_size` chunks, then keeps taking whole chunks while the
//! window is under `max_iteration_time`. A resume cursor carries the position
//! between windows, so no chunk is applied twice.

use super::chunk_applier::{ChunkApplier, ChunkApplyStats};
use crate::constants::queue::{DEFAULT_INITIAL_BATCH_SIZE, DEFAULT_MAX_ITERATION_TIME_MS};
use crate::error::{OptionExt, QueueError, QueueResult};
use crate::world::core::ChunkPos;
use rustc_hash::FxHashSet;
use std::fmt;
use std::time::{Duration, Instant};

/// Observer for per-cell and per-chunk errors
pub type ErrorHandler = Box<dyn FnMut(QueueError) + Send>;

/// Runs once, after the last chunk has been applied
pub type FinalAction = Box<dyn FnOnce() + Send>;

/// Called after every applied chunk
pub type ProgressSubscriber = Box<dyn FnMut(QueueProgress) + Send>;

/// Lifecycle of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Built but not started
    Pending,
    Running,
    /// Every chunk applied and the final action has run
    Completed,
    Cancelled,
    /// Ended by an invariant violation
    Failed,
}

impl CoordinatorState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CoordinatorState::Completed | CoordinatorState::Cancelled | CoordinatorState::Failed
        )
    }
}

/// Chunks applied out of the run's total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueProgress {
    pub processed: usize,
    pub total: usize,
}

impl QueueProgress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f32 / self.total as f32
        }
    }
}

impl fmt::Display for QueueProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} chunks", self.processed, self.total)
    }
}

/// Totals accumulated over the whole run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QueueStats {
    pub windows: usize,
    pub chunks_processed: usize,
    pub errors_reported: usize,
    pub cells: ChunkApplyStats,
    /// Time spent inside windows, not wall-clock time of the run
    pub busy_time: Duration,
}

/// Result of one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowReport {
    pub chunks_processed: usize,
    pub elapsed: Duration,
    pub remaining: usize,
    pub errors_reported: usize,
    pub state: CoordinatorState,
}

impl WindowReport {
    fn idle(remaining: usize, state: CoordinatorState) -> Self {
        Self {
            chunks_processed: 0,
            elapsed: Duration::ZERO,
            remaining,
            errors_reported: 0,
            state,
        }
    }
}

/// Configuration for a [`ChunkCoordinator`]
pub struct ChunkCoordinatorBuilder {
    chunks: Vec<ChunkPos>,
    applier: Option<Box<dyn ChunkApplier>>,
    initial_batch_size: usize,
    max_iteration_time: Duration,
    error_handler: Option<ErrorHandler>,
    final_action: Option<FinalAction>,
    progress_subscriber: Option<ProgressSubscriber>,
}

impl Default for ChunkCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkCoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            applier: None,
            initial_batch_size: DEFAULT_INITIAL_BATCH_SIZE,
            max_iteration_time: Duration::from_millis(DEFAULT_MAX_ITERATION_TIME_MS),
            error_handler: None,
            final_action: None,
            progress_subscriber: None,
        }
    }

    /// Chunk keys in application order. Repeated keys are applied once.
    pub fn with_chunks(mut self, chunks: impl IntoIterator<Item = ChunkPos>) -> Self {
        let mut seen: FxHashSet<ChunkPos> = self.chunks.iter().copied().collect();
        for key in chunks {
            if seen.insert(key) {
                self.chunks.push(key);
            }
        }
        self
    }

    pub fn with_applier(self, applier: impl ChunkApplier + 'static) -> Self {
        self.with_boxed_applier(Box::new(applier))
    }

    pub fn with_boxed_applier(mut self, applier: Box<dyn ChunkApplier>) -> Self {
        self.applier = Some(applier);
        self
    }

    pub fn with_initial_batch_size(mut self, batch_size: usize) -> Self {
        self.initial_batch_size = batch_size;
        self
    }

    pub fn with_max_iteration_time(mut self, max_iteration_time: Duration) -> Self {
        self.max_iteration_time = max_iteration_time;
        self
    }

    pub fn with_error_handler(mut self, handler: impl FnMut(QueueError) + Send + 'static) -> Self {
        self.error_handler = Some(Box::new(handler));
        self
    }

    pub fn with_final_action(mut self, action: impl FnOnce() + Send + 'static) -> Self {
        self.final_action = Some(Box::new(action));
        self
    }

    pub fn with_progress_subscriber(
        mut self,
        subscriber: impl FnMut(QueueProgress) + Send + 'static,
    ) -> Self {
        self.progress_subscriber = Some(Box::new(subscriber));
        self
    }

    pub fn build(self) -> QueueResult<ChunkCoordinator> {
        let applier = self.applier.ok_or_queue(|| QueueError::MissingConfig {
            field: "applier".to_string(),
        })?;

        if self.initial_batch_size == 0 {
            return Err(QueueError::InvalidConfig {
                field: "initial_batch_size".to_string(),
                value: "0".to_string(),
                reason: "at least one chunk must be attempted per window".to_string(),
            });
        }

        Ok(ChunkCoordinator {
            keys: self.chunks,
            cursor: 0,
            applier,
            batch_size: self.initial_batch_size,
            max_iteration_time: self.max_iteration_time,
            error_handler: self.error_handler.unwrap_or_else(default_error_handler),
            final_action: self.final_action,
            progress_subscriber: self.progress_subscriber,
            state: CoordinatorState::Pending,
            stats: QueueStats::default(),
        })
    }
}

fn default_error_handler() -> ErrorHandler {
    Box::new(|error| log::error!("[Queue] {}", error))
}

/// Applies a fixed list of chunks across host-granted windows
pub struct ChunkCoordinator {
    keys: Vec<ChunkPos>,
    cursor: usize,
    applier: Box<dyn ChunkApplier>,
    batch_size: usize,
    max_iteration_time: Duration,
    error_handler: ErrorHandler,
    final_action: Option<FinalAction>,
    progress_subscriber: Option<ProgressSubscriber>,
    state: CoordinatorState,
    stats: QueueStats,
}

impl ChunkCoordinator {
    pub fn builder() -> ChunkCoordinatorBuilder {
        ChunkCoordinatorBuilder::new()
    }

    /// Begin the run. An empty run completes here.
    pub fn start(&mut self) {
        if self.state != CoordinatorState::Pending {
            log::warn!("[Queue] start() called in state {:?}, ignoring", self.state);
            return;
        }

        self.state = CoordinatorState::Running;
        log::info!(
            "[Queue] Starting run over {} chunks (batch {}, window {:?})",
            self.keys.len(),
            self.batch_size,
            self.max_iteration_time
        );

        if self.keys.is_empty() {
            self.complete();
        }
    }

    /// Apply chunks for one window. Never blocks.
    ///
    /// Returns `Err` only for errors that end the run; the coordinator is then
    /// `Failed` and the final action will not run. Windows granted after the
    /// run has ended do nothing.
    pub fn advance_window(&mut self) -> QueueResult<WindowReport> {
        match self.state {
            CoordinatorState::Pending => return Err(QueueError::NotStarted),
            CoordinatorState::Running => {}
            state => return Ok(WindowReport::idle(self.remaining(), state)),
        }

        let window_start = Instant::now();
        let mut processed = 0;
        let mut errors_reported = 0;

        while self.cursor < self.keys.len() {
            // Past the batch floor, only start another chunk while under budget
            if processed >= self.batch_size && window_start.elapsed() >= self.max_iteration_time {
                break;
            }

            let key = self.keys[self.cursor];
            self.cursor += 1;

            let handler = &mut self.error_handler;
            let mut reported = 0;
            let result = self.applier.apply_chunk(key, &mut |error| {
                reported += 1;
                handler(error);
            });
            errors_reported += reported;

            match result {
                Ok(chunk_stats) => {
                    self.stats.cells.merge(&chunk_stats);
                }
                Err(error) if error.is_fatal() => {
                    self.stats.errors_reported += errors_reported;
                    self.end_window(window_start);
                    self.state = CoordinatorState::Failed;
                    log::error!(
                        "[Queue] Run failed at chunk {} after {} chunks: {}",
                        key,
                        self.stats.chunks_processed,
                        error
                    );
                    return Err(error);
                }
                Err(error) => {
                    errors_reported += 1;
                    (self.error_handler)(error);
                }
            }

            processed += 1;
            self.stats.chunks_processed += 1;
            if let Some(subscriber) = self.progress_subscriber.as_mut() {
                subscriber(QueueProgress {
                    processed: self.stats.chunks_processed,
                    total: self.keys.len(),
                });
            }
        }

        self.stats.errors_reported += errors_reported;
        let elapsed = self.end_window(window_start);
        log::debug!(
            "[Queue] Window applied {} chunks in {:?}, {} remaining",
            processed,
            elapsed,
            self.remaining()
        );

        if self.cursor == self.keys.len() {
            self.complete();
        }

        Ok(WindowReport {
            chunks_processed: processed,
            elapsed,
            remaining: self.remaining(),
            errors_reported,
            state: self.state,
        })
    }

    /// Abandon the run. Applied chunks stay applied.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = CoordinatorState::Cancelled;
        self.final_action = None;
        log::info!(
            "[Queue] Run cancelled with {} of {} chunks applied",
            self.stats.chunks_processed,
            self.keys.len()
        );
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Chunks not yet attempted
    pub fn remaining(&self) -> usize {
        self.keys.len() - self.cursor
    }

    pub fn progress(&self) -> QueueProgress {
        QueueProgress {
            processed: self.stats.chunks_processed,
            total: self.keys.len(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    fn end_window(&mut self, window_start: Instant) -> Duration {
        let elapsed = window_start.elapsed();
        self.stats.windows += 1;
        self.stats.busy_time += elapsed;
        elapsed
    }

    fn complete(&mut self) {
        self.state = CoordinatorState::Completed;
        log::info!(
            "[Queue] Run complete: {} chunks in {} windows, {} errors",
            self.stats.chunks_processed,
            self.stats.windows,
            self.stats.errors_reported
        );
        if let Some(action) = self.final_action.take() {
            action();
        }
    }
}

impl fmt::Debug for ChunkCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkCoordinator")
            .field("state", &self.state)
            .field("progress", &self.progress())
            .field("batch_size", &self.batch_size)
            .field("max_iteration_time", &self.max_iteration_time)
            .finish()
    }
}
