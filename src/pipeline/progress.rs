use std::time::Duration;

/// Run-wide progress over a unit count fixed up front, so the percentage
/// never goes backwards across chapters.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: usize,
    done: usize,
    spent: Duration,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: 0,
            spent: Duration::ZERO,
        }
    }

    /// Records one processed unit and the wall-clock time it took.
    pub fn record(&mut self, elapsed: Duration) {
        self.done = (self.done + 1).min(self.total);
        self.spent += elapsed;
    }

    pub fn done(&self) -> usize {
        self.done
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.done * 100) / self.total) as u8
    }

    /// Average time per processed unit times the units left. `None` until a
    /// unit has completed.
    pub fn eta_seconds(&self) -> Option<u64> {
        if self.done == 0 {
            return None;
        }
        let average = self.spent.as_secs_f64() / self.done as f64;
        let remaining = (self.total - self.done) as f64;
        Some((average * remaining).round() as u64)
    }
}
