/// Instrument sample sources
use crate::models::RawReading;

/// Supplies one raw sample for all three channels
///
/// Implementations must return within a bounded time (tens of milliseconds);
/// a channel that faulted or has no data yet is reported as `None`.
pub trait SampleSource: Send {
    fn poll(&mut self) -> RawReading;
}

impl<F> SampleSource for F
where
    F: FnMut() -> RawReading + Send,
{
    fn poll(&mut self) -> RawReading {
        self()
    }
}

pub const DEFAULT_SEED: u64 = 0x5EED;

/// Hardware-free source producing a slow pseudo-random walk
///
/// Output is deterministic for a given seed so runs are reproducible.
pub struct SimulatedSource {
    base_temperature: f32,
    base_humidity: f32,
    base_co2: u32,
    /// Every n-th poll reports all channels as faulted (0 disables)
    fault_every: u64,
    step: u64,
    seed: u64,
}

impl SimulatedSource {
    pub fn new(base_temperature: f32, base_humidity: f32, base_co2: u32) -> Self {
        Self {
            base_temperature,
            base_humidity,
            base_co2,
            fault_every: 0,
            step: 0,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_fault_every(mut self, polls: u64) -> Self {
        self.fault_every = polls;
        self
    }

    // Returns a value in -1.0..1.0
    fn noise(&self, lane: u64) -> f32 {
        let hash = (self.seed ^ lane.wrapping_mul(0xA24BAED4963EE407))
            .wrapping_add(self.step)
            .wrapping_mul(0x9E3779B97F4A7C15)
            .wrapping_add(0x6A09E667);
        ((hash >> 40) % 2001) as f32 / 1000.0 - 1.0
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new(21.5, 45.0, 650)
    }
}

impl SampleSource for SimulatedSource {
    fn poll(&mut self) -> RawReading {
        self.step = self.step.wrapping_add(1);

        if self.fault_every > 0 && self.step % self.fault_every == 0 {
            return RawReading::default();
        }

        // Slow drift plus small jitter, similar to an indoor room
        let drift = ((self.step as f32) / 3000.0).sin();
        let temperature = self.base_temperature + drift * 0.8 + self.noise(1) * 0.06;
        let humidity = (self.base_humidity + drift * 3.0 + self.noise(2) * 0.4).clamp(0.0, 100.0);
        let co2 = (self.base_co2 as f32 + drift * 60.0 + self.noise(3) * 4.0).max(400.0);

        RawReading {
            temperature: Some(temperature),
            humidity: Some(humidity),
            co2: Some(co2 as u32),
        }
    }
}
