use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    FirstPass,
    Retry,
}

/// Snapshot for the render surface. `percent` follows the first pass only and
/// does not go down while a batch runs; the retry pass reports through
/// `completed`/`total` with `percent` held at 100. `batch` is bumped each time
/// a batch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub batch: u64,
    pub phase: Phase,
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    // rounded to nearest
    ((completed * 100 + total / 2) / total) as u8
}

/// Publishes progress on a watch channel; sending never fails, with or
/// without subscribers.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    sender: Arc<watch::Sender<Progress>>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Progress::default());
        Self { sender: Arc::new(sender) }
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> Progress {
        *self.sender.borrow()
    }

    /// New batch: bumps `batch` and enters the first pass.
    pub fn begin(&self, total: usize) {
        self.sender.send_modify(|progress| {
            *progress = Progress {
                batch: progress.batch + 1,
                phase: Phase::FirstPass,
                completed: 0,
                total,
                percent: 0,
            };
        });
    }

    /// Same batch, retry pass.
    pub fn retry(&self, total: usize) {
        self.sender.send_modify(|progress| {
            progress.phase = Phase::Retry;
            progress.completed = 0;
            progress.total = total;
            progress.percent = 100;
        });
    }

    pub fn tick(&self, phase: Phase, completed: usize, total: usize) {
        self.sender.send_modify(|progress| {
            progress.phase = phase;
            progress.completed = completed;
            progress.total = total;
            progress.percent = match phase {
                Phase::FirstPass => progress.percent.max(percent(completed, total)),
                Phase::Retry => 100,
                Phase::Idle => 0,
            };
        });
    }

    /// Batch done; back to idle, keeping the batch number.
    pub fn finish(&self) {
        self.sender.send_modify(|progress| {
            *progress = Progress { batch: progress.batch, ..Progress::default() };
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_and_clamps() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(5, 3), 100);
    }

    #[tokio::test]
    async fn subscribers_see_phases() {
        let reporter = ProgressReporter::new();
        let rx = reporter.subscribe();

        reporter.begin(4);
        reporter.tick(Phase::FirstPass, 2, 4);
        assert_eq!(*rx.borrow(), Progress { batch: 1, phase: Phase::FirstPass, completed: 2, total: 4, percent: 50 });

        reporter.retry(1);
        assert_eq!(rx.borrow().percent, 100);
        assert_eq!(rx.borrow().phase, Phase::Retry);

        reporter.finish();
        assert_eq!(*rx.borrow(), Progress { batch: 1, ..Progress::default() });

        reporter.begin(2);
        assert_eq!(rx.borrow().batch, 2);
        assert_eq!(rx.borrow().percent, 0);
    }
}
