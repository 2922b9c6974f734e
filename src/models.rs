use std::fmt;

use time::OffsetDateTime;

/// Temperature in tenths of a degree Celsius
///
/// Fixed point keeps the one-decimal resolution exact, so equality checks in
/// the throttle never trip over float representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decicelsius(pub i32);

impl Decicelsius {
    /// Truncate a Celsius reading toward zero at one decimal place
    ///
    /// An input that is exactly the `f32` nearest to some tenth keeps that
    /// tenth, so re-filtering a filtered value is a no-op.
    pub fn from_celsius(celsius: f32) -> Option<Self> {
        if !celsius.is_finite() {
            return None;
        }

        let scaled = f64::from(celsius) * 10.0;
        let nearest = scaled.round();
        let tenths = if (nearest / 10.0) as f32 == celsius {
            nearest
        } else {
            scaled.trunc()
        };

        if tenths < f64::from(i32::MIN) || tenths > f64::from(i32::MAX) {
            return None;
        }
        Some(Decicelsius(tenths as i32))
    }

    pub fn as_celsius(self) -> f32 {
        self.0 as f32 / 10.0
    }
}

impl fmt::Display for Decicelsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, abs / 10, abs % 10)
    }
}

/// One raw instrument sample, straight from the source
///
/// `None` on a channel means the instrument reported no data or a fault.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawReading {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub co2: Option<u32>,
}

/// Filtered reading: one decimal temperature, integer humidity and CO2
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reading {
    pub temperature: Option<Decicelsius>,
    pub humidity: Option<u32>,
    pub co2: Option<u32>,
}

impl Reading {
    /// True when every channel carries a valid value
    pub fn is_complete(&self) -> bool {
        self.temperature.is_some() && self.humidity.is_some() && self.co2.is_some()
    }
}

/// Average over one save interval, ending at a minute boundary
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub temperature: f32,
    pub humidity: u32,
    pub co2: u32,
    pub samples: u32,
    pub recorded_at: OffsetDateTime,
}
