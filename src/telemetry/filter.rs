/// Noise filtering of raw instrument readings
use crate::models::{Decicelsius, RawReading, Reading};

/// CO2 value the instrument reports when a read fails
pub const CO2_FAULT_SENTINEL: u32 = 0;

/// Truncate temperature to one decimal place
pub fn filter_temperature(celsius: Option<f32>) -> Option<Decicelsius> {
    celsius.and_then(Decicelsius::from_celsius)
}

/// Keep only the integer part of relative humidity, capped at 100%
pub fn filter_humidity(percent: Option<f32>) -> Option<u32> {
    match percent {
        Some(p) if p.is_finite() && p >= 0.0 => Some(p.min(100.0).trunc() as u32),
        _ => None,
    }
}

/// CO2 is already integral; only the fault sentinel is dropped
pub fn filter_co2(ppm: Option<u32>) -> Option<u32> {
    ppm.filter(|&v| v != CO2_FAULT_SENTINEL)
}

/// Normalise a raw sample, suppressing sub-resolution jitter
pub fn filter(raw: RawReading) -> Reading {
    Reading {
        temperature: filter_temperature(raw.temperature),
        humidity: filter_humidity(raw.humidity),
        co2: filter_co2(raw.co2),
    }
}
