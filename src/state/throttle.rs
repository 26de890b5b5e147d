//! Once-per-second gate for external surface updates

/// Remembers the last published coarse second and lets a publish through
/// only when the current second differs from it.
#[derive(Debug, Clone, Default)]
pub struct SnapshotThrottler {
    last_published_second: Option<u64>,
}

impl SnapshotThrottler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `current_ms` falls in a second not yet published.
    /// Records the second when it does.
    pub fn should_publish(&mut self, current_ms: u64) -> bool {
        let second = current_ms / 1000;
        if self.last_published_second == Some(second) {
            return false;
        }
        self.last_published_second = Some(second);
        true
    }

    /// Record a publish that happened outside the periodic path
    pub fn force(&mut self, current_ms: u64) {
        self.last_published_second = Some(current_ms / 1000);
    }

    pub fn last_published_second(&self) -> Option<u64> {
        self.last_published_second
    }
}
