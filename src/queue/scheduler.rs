//! Queue Scheduler
//!
//! Host-side driver for several coordinators. Each `tick()` grants every live
//! run one window and retires runs that have ended.

use super::coordinator::{ChunkCoordinator, CoordinatorState};
use crate::error::QueueError;
use std::fmt;

/// Handle to a submitted run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(u64);

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue#{}", self.0)
    }
}

/// What happened during one tick
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    /// Windows granted this tick
    pub windows: usize,
    pub chunks_processed: usize,
    /// Runs that completed this tick
    pub finished: Vec<QueueId>,
    /// Runs that ended on a fatal error this tick
    pub failed: Vec<(QueueId, QueueError)>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.windows == 0
    }
}

#[derive(Debug, Default)]
pub struct QueueScheduler {
    next_id: u64,
    tick: u64,
    queues: Vec<(QueueId, ChunkCoordinator)>,
}

impl QueueScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a run, starting it if needed
    pub fn submit(&mut self, mut coordinator: ChunkCoordinator) -> QueueId {
        let id = QueueId(self.next_id);
        self.next_id += 1;

        if coordinator.state() == CoordinatorState::Pending {
            coordinator.start();
        }
        log::debug!("[Scheduler] Submitted {} ({})", id, coordinator.progress());
        self.queues.push((id, coordinator));
        id
    }

    /// Grant one window to every live run
    pub fn tick(&mut self) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };

        for (id, coordinator) in self.queues.iter_mut() {
            if coordinator.is_finished() {
                continue;
            }
            report.windows += 1;
            match coordinator.advance_window() {
                Ok(window) => report.chunks_processed += window.chunks_processed,
                Err(error) => {
                    log::error!("[Scheduler] {} failed: {}", id, error);
                    report.failed.push((*id, error));
                }
            }
        }

        // Retire everything that has ended, including runs finished before this tick
        self.queues.retain(|(id, coordinator)| match coordinator.state() {
            CoordinatorState::Completed => {
                report.finished.push(*id);
                false
            }
            CoordinatorState::Cancelled | CoordinatorState::Failed => false,
            CoordinatorState::Pending | CoordinatorState::Running => true,
        });

        report
    }

    /// Cancel and drop a run. Returns false for unknown or retired ids.
    pub fn cancel(&mut self, id: QueueId) -> bool {
        let Some(index) = self.queues.iter().position(|(queue_id, _)| *queue_id == id) else {
            return false;
        };
        let (_, mut coordinator) = self.queues.remove(index);
        coordinator.cancel();
        true
    }

    pub fn get(&self, id: QueueId) -> Option<&ChunkCoordinator> {
        self.queues
            .iter()
            .find(|(queue_id, _)| *queue_id == id)
            .map(|(_, coordinator)| coordinator)
    }

    /// Runs not yet retired
    pub fn active(&self) -> usize {
        self.queues.len()
    }

    /// Tick until no runs remain or `max_ticks` is reached. Returns ticks run.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && !self.queues.is_empty() {
            self.tick();
            ticks += 1;
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueueResult;
    use crate::queue::ChunkApplyStats;
    use crate::world::core::ChunkPos;
    use std::time::Duration;

    fn counting_run(chunks: i32, missing: Option<ChunkPos>) -> ChunkCoordinator {
        ChunkCoordinator::builder()
            .with_chunks((0..chunks).map(|z| ChunkPos::new(0, z)))
            .with_applier(
                move |key: ChunkPos, _report: &mut dyn FnMut(QueueError)| -> QueueResult<ChunkApplyStats> {
                    if missing == Some(key) {
                        return Err(QueueError::ChunkNotStaged(key));
                    }
                    Ok(ChunkApplyStats::default())
                },
            )
            .with_initial_batch_size(1)
            .with_max_iteration_time(Duration::ZERO)
            .build()
            .unwrap()
    }

    #[test]
    fn test_tick_interleaves_runs() {
        let mut scheduler = QueueScheduler::new();
        let short = scheduler.submit(counting_run(1, None));
        let long = scheduler.submit(counting_run(3, None));

        let first = scheduler.tick();
        assert_eq!(first.windows, 2);
        assert_eq!(first.chunks_processed, 2);
        assert_eq!(first.finished, vec![short]);
        assert_eq!(scheduler.active(), 1);
        assert_eq!(scheduler.get(long).map(|c| c.remaining()), Some(2));

        assert_eq!(scheduler.run_until_idle(10), 2);
        assert_eq!(scheduler.active(), 0);
        assert!(scheduler.tick().is_idle());
    }

    #[test]
    fn test_fatal_run_is_retired_and_reported() {
        let mut scheduler = QueueScheduler::new();
        let bad = scheduler.submit(counting_run(3, Some(ChunkPos::new(0, 0))));
        let good = scheduler.submit(counting_run(1, None));

        let report = scheduler.tick();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, bad);
        assert!(report.failed[0].1.is_fatal());
        assert_eq!(report.finished, vec![good]);
        assert_eq!(scheduler.active(), 0);
    }

    #[test]
    fn test_cancel_removes_run() {
        let mut scheduler = QueueScheduler::new();
        let id = scheduler.submit(counting_run(5, None));
        scheduler.tick();

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert_eq!(scheduler.active(), 0);
        assert_eq!(id.to_string(), "queue#0");
    }

    #[test]
    fn test_run_until_idle_respects_limit() {
        let mut scheduler = QueueScheduler::new();
        scheduler.submit(counting_run(10, None));

        assert_eq!(scheduler.run_until_idle(4), 4);
        assert_eq!(scheduler.active(), 1);
    }
}
