//! Per-world queue facade
//!
//! Owns the staged changes and the world collaborators for one flush, and
//! turns them into a started [`ChunkCoordinator`].

use super::chunk_applier::{ChunkApplier, LocalChunkApplier};
use super::coordinator::{ChunkCoordinator, ErrorHandler, FinalAction, ProgressSubscriber, QueueProgress};
use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::world::core::{BaseBlock, VoxelPos};
use crate::world::interfaces::WorldTargets;
use crate::world::storage::PendingChangeSet;
use std::sync::Arc;

pub struct QueueCoordinator {
    targets: WorldTargets,
    changes: Arc<PendingChangeSet>,
    config: QueueConfig,
    chunk_consumer: Option<Box<dyn ChunkApplier>>,
    complete_task: Option<FinalAction>,
    error_handler: Option<ErrorHandler>,
    progress_subscriber: Option<ProgressSubscriber>,
}

impl QueueCoordinator {
    pub fn new(targets: WorldTargets, changes: PendingChangeSet) -> Self {
        Self {
            targets,
            changes: Arc::new(changes),
            config: QueueConfig::default(),
            chunk_consumer: None,
            complete_task: None,
            error_handler: None,
            progress_subscriber: None,
        }
    }

    pub fn with_config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the per-chunk write protocol. Without one, `enqueue` writes
    /// through a [`LocalChunkApplier`] over this queue's changes and targets.
    pub fn set_chunk_consumer(&mut self, consumer: impl ChunkApplier + 'static) {
        self.chunk_consumer = Some(Box::new(consumer));
    }

    pub fn set_complete_task(&mut self, task: impl FnOnce() + Send + 'static) {
        self.complete_task = Some(Box::new(task));
    }

    pub fn set_error_handler(&mut self, handler: impl FnMut(QueueError) + Send + 'static) {
        self.error_handler = Some(Box::new(handler));
    }

    pub fn set_progress_subscriber(&mut self, subscriber: impl FnMut(QueueProgress) + Send + 'static) {
        self.progress_subscriber = Some(Box::new(subscriber));
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn changes(&self) -> &PendingChangeSet {
        &self.changes
    }

    pub fn world_name(&self) -> &str {
        self.targets.world_name()
    }

    /// Current block in the target world
    pub fn get_block(&self, pos: VoxelPos) -> BaseBlock {
        self.targets.store.get_block(pos)
    }

    /// Build and start a coordinator over every staged chunk
    pub fn enqueue(self) -> QueueResult<ChunkCoordinator> {
        self.config.validate()?;

        log::info!(
            "[Queue] Enqueueing {} chunks ({} cells) for world '{}'",
            self.changes.len(),
            self.changes.block_count(),
            self.targets.world_name()
        );

        let applier: Box<dyn ChunkApplier> = match self.chunk_consumer {
            Some(consumer) => consumer,
            None => Box::new(LocalChunkApplier::new(
                self.changes.clone(),
                self.targets,
                self.config.side_effects,
            )),
        };

        let mut builder = ChunkCoordinator::builder()
            .with_chunks(self.changes.keys().iter().copied())
            .with_boxed_applier(applier)
            .with_initial_batch_size(self.config.initial_batch_size)
            .with_max_iteration_time(self.config.max_iteration_time());

        if let Some(task) = self.complete_task {
            builder = builder.with_final_action(task);
        }
        if let Some(handler) = self.error_handler {
            builder = builder.with_error_handler(handler);
        }
        if let Some(subscriber) = self.progress_subscriber {
            builder = builder.with_progress_subscriber(subscriber);
        }

        let mut coordinator = builder.build()?;
        coordinator.start();
        Ok(coordinator)
    }
}
