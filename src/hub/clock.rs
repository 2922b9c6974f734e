use std::time::Instant;
use time::{OffsetDateTime, UtcOffset};

/// Time as seen by the scheduler
pub trait Clock: Send {
    /// Local wall-clock time
    fn wall(&self) -> OffsetDateTime;

    /// Milliseconds on a monotonic clock with an arbitrary origin
    fn monotonic_millis(&self) -> u64;
}

/// System clocks, wall time shifted to a fixed UTC offset
#[derive(Debug, Clone)]
pub struct SystemClock {
    offset: UtcOffset,
    origin: Instant,
}

impl SystemClock {
    pub fn new(offset: UtcOffset) -> Self {
        Self {
            offset,
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn wall(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }

    fn monotonic_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
