/// Once-per-second accumulation of canonical readings
use crate::models::Reading;

/// What happened on a tick from the accumulator's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondEdge {
    /// Same wall-clock second as the previous tick (or the very first tick)
    None,
    /// A new second started and the reading was added
    Accumulated,
    /// A new second started but the reading was incomplete
    Skipped,
}

/// Running sums of the canonical reading, one sample per wall-clock second
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    temperature_sum: f64,
    humidity_sum: u64,
    co2_sum: u64,
    sample_count: u32,
    last_second: Option<i64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true only on the first tick of a new second
    ///
    /// The first second ever observed is taken as the baseline.
    pub fn observe_second(&mut self, epoch_secs: i64) -> bool {
        match self.last_second.replace(epoch_secs) {
            Some(previous) => previous != epoch_secs,
            None => false,
        }
    }

    /// Add one sample; incomplete readings are skipped whole
    pub fn add(&mut self, reading: &Reading) -> bool {
        match (reading.temperature, reading.humidity, reading.co2) {
            (Some(temperature), Some(humidity), Some(co2)) => {
                self.temperature_sum += f64::from(temperature.as_celsius());
                self.humidity_sum += u64::from(humidity);
                self.co2_sum += u64::from(co2);
                self.sample_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Edge-triggered accumulation for one tick
    pub fn on_tick(&mut self, epoch_secs: i64, reading: &Reading) -> SecondEdge {
        if !self.observe_second(epoch_secs) {
            return SecondEdge::None;
        }
        if self.add(reading) {
            SecondEdge::Accumulated
        } else {
            SecondEdge::Skipped
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Averages of the accumulated samples, `None` when nothing was added
    ///
    /// Integer channels are truncated by integer division.
    pub fn averages(&self) -> Option<(f32, u32, u32)> {
        if self.sample_count == 0 {
            return None;
        }
        let count = self.sample_count;
        Some((
            (self.temperature_sum / f64::from(count)) as f32,
            (self.humidity_sum / u64::from(count)) as u32,
            (self.co2_sum / u64::from(count)) as u32,
        ))
    }

    /// Zero the sums and count, keeping second tracking
    pub fn reset(&mut self) {
        self.temperature_sum = 0.0;
        self.humidity_sum = 0;
        self.co2_sum = 0;
        self.sample_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Decicelsius;

    fn reading(tenths: i32, humidity: u32, co2: u32) -> Reading {
        Reading {
            temperature: Some(Decicelsius(tenths)),
            humidity: Some(humidity),
            co2: Some(co2),
        }
    }

    #[test]
    fn counts_once_per_second() {
        let mut acc = Accumulator::new();
        let sample = reading(225, 40, 600);
        assert_eq!(acc.on_tick(100, &sample), SecondEdge::None);
        for _ in 0..49 {
            acc.on_tick(100, &sample);
        }
        assert_eq!(acc.sample_count(), 0);
        assert_eq!(acc.on_tick(101, &sample), SecondEdge::Accumulated);
        assert_eq!(acc.on_tick(101, &sample), SecondEdge::None);
        assert_eq!(acc.on_tick(102, &sample), SecondEdge::Accumulated);
        assert_eq!(acc.sample_count(), 2);
    }

    #[test]
    fn incomplete_reading_skips_the_second() {
        let mut acc = Accumulator::new();
        acc.observe_second(0);
        let mut sample = reading(225, 40, 600);
        sample.humidity = None;
        assert_eq!(acc.on_tick(1, &sample), SecondEdge::Skipped);
        assert_eq!(acc.sample_count(), 0);
        assert_eq!(acc.averages(), None);
    }

    #[test]
    fn averages_truncate_integer_channels() {
        let mut acc = Accumulator::new();
        acc.add(&reading(200, 40, 601));
        acc.add(&reading(210, 41, 600));
        let (temperature, humidity, co2) = acc.averages().unwrap();
        assert!((temperature - 20.5).abs() < 1e-4);
        assert_eq!(humidity, 40);
        assert_eq!(co2, 600);
    }

    #[test]
    fn reset_clears_sums() {
        let mut acc = Accumulator::new();
        acc.add(&reading(200, 40, 600));
        acc.reset();
        assert_eq!(acc.sample_count(), 0);
        assert_eq!(acc.averages(), None);
    }
}
