/// Per-channel rate limiting of live updates
use std::time::Duration;

use crate::models::{Decicelsius, Reading};

/// Last pushed value and push time for one channel
#[derive(Debug, Clone, Copy)]
pub struct ChannelGate<T> {
    last_value: Option<T>,
    last_push_ms: Option<u64>,
}

impl<T> Default for ChannelGate<T> {
    fn default() -> Self {
        Self {
            last_value: None,
            last_push_ms: None,
        }
    }
}

impl<T: Copy + PartialEq> ChannelGate<T> {
    /// Approve `value` for broadcast if it is valid, differs from the last
    /// pushed value and the interval has elapsed; approval records the push.
    pub fn should_push(&mut self, value: Option<T>, now_ms: u64, interval_ms: u64) -> bool {
        let Some(value) = value else {
            return false;
        };
        if self.last_value == Some(value) {
            return false;
        }
        if let Some(last) = self.last_push_ms {
            if now_ms.saturating_sub(last) < interval_ms {
                return false;
            }
        }

        self.last_value = Some(value);
        self.last_push_ms = Some(now_ms);
        true
    }

    /// Restart the interval without changing the value
    pub fn mark_pushed(&mut self, now_ms: u64) {
        self.last_push_ms = Some(now_ms);
    }

    pub fn last_value(&self) -> Option<T> {
        self.last_value
    }
}

/// Throttle state for all three channels
///
/// The last pushed values double as the canonical reading used for
/// accumulation and replay to new subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastThrottle {
    interval_ms: u64,
    pub temperature: ChannelGate<Decicelsius>,
    pub humidity: ChannelGate<u32>,
    pub co2: ChannelGate<u32>,
}

impl BroadcastThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            temperature: ChannelGate::default(),
            humidity: ChannelGate::default(),
            co2: ChannelGate::default(),
        }
    }

    pub fn push_temperature(&mut self, value: Option<Decicelsius>, now_ms: u64) -> bool {
        self.temperature.should_push(value, now_ms, self.interval_ms)
    }

    pub fn push_humidity(&mut self, value: Option<u32>, now_ms: u64) -> bool {
        self.humidity.should_push(value, now_ms, self.interval_ms)
    }

    pub fn push_co2(&mut self, value: Option<u32>, now_ms: u64) -> bool {
        self.co2.should_push(value, now_ms, self.interval_ms)
    }

    /// Most recently approved value of every channel
    pub fn canonical(&self) -> Reading {
        Reading {
            temperature: self.temperature.last_value(),
            humidity: self.humidity.last_value(),
            co2: self.co2.last_value(),
        }
    }
}
