/// Conversion of accumulated sums into history records at minute boundaries
use time::OffsetDateTime;

use crate::models::HistoryRecord;
use crate::telemetry::accumulator::Accumulator;

/// Second of the minute on which the average is taken
pub const FINALIZE_SECOND: u8 = 59;

/// Fewest samples an interval must hold before it is finalised
pub const MIN_SAMPLES: u32 = 3;

#[derive(Debug, Clone)]
pub struct MinuteFinalizer {
    interval_minutes: u8,
    /// Epoch minute of the last fire, guards against firing twice in one boundary
    last_fired_minute: Option<i64>,
}

impl MinuteFinalizer {
    pub fn new(interval_minutes: u8) -> Self {
        Self {
            interval_minutes: interval_minutes.max(1),
            last_fired_minute: None,
        }
    }

    pub fn is_boundary(&self, now: &OffsetDateTime) -> bool {
        now.second() == FINALIZE_SECOND && now.minute() % self.interval_minutes == 0
    }

    /// Produce the interval average if `now` is a boundary and enough samples exist
    ///
    /// Too few samples leaves the accumulator untouched so they carry into the
    /// next interval.
    pub fn try_finalize(
        &mut self,
        accumulator: &mut Accumulator,
        now: OffsetDateTime,
    ) -> Option<HistoryRecord> {
        if !self.is_boundary(&now) || accumulator.sample_count() < MIN_SAMPLES {
            return None;
        }

        let epoch_minute = now.unix_timestamp().div_euclid(60);
        if self.last_fired_minute == Some(epoch_minute) {
            return None;
        }

        let samples = accumulator.sample_count();
        let (temperature, humidity, co2) = accumulator.averages()?;
        accumulator.reset();
        self.last_fired_minute = Some(epoch_minute);

        Some(HistoryRecord {
            temperature,
            humidity,
            co2,
            samples,
            recorded_at: now,
        })
    }
}
