/// Decides when the name cache is persisted during a resolution batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointPolicy {
    interval: usize,
    total: usize,
}

impl CheckpointPolicy {
    /// `interval` of zero is treated as one.
    pub fn new(interval: usize, total: usize) -> Self {
        Self {
            interval: interval.max(1),
            total,
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// `processed` counts candidates handled so far, starting at one.
    pub fn should_save(&self, processed: usize) -> bool {
        processed > 0 && (processed % self.interval == 0 || processed == self.total)
    }

    /// Number of checkpoint saves a complete batch performs.
    pub fn planned_saves(&self) -> usize {
        (1..=self.total).filter(|n| self.should_save(*n)).count()
    }
}
