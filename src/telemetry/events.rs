/// Text events exchanged with subscribers
use std::fmt::{self, Write};

use crate::error::{HubError, HubResult};
use crate::models::{Decicelsius, HistoryRecord};

/// Exact payload a subscriber sends to request the history
pub const HISTORY_REQUEST: &str = "G:\n";

pub const UNKNOWN_COMMAND: &str = "unknown command";

/// Reply when the history cannot be rendered within its limit
pub const HISTORY_UNAVAILABLE: &str = "history unavailable";

const SINGLE_MAX: usize = 16;
const AVERAGE_MAX: usize = 32;

// Widest values the record types can carry: an average of i32 tenths printed
// with two decimals and a sign, any u32 CO2, humidity clamped to 100
const TEMPERATURE_WIDTH: usize = 13;
const CO2_WIDTH: usize = 10;
const HUMIDITY_WIDTH: usize = 3;
const HISTORY_LINE_MAX: usize =
    "T:".len() + TEMPERATURE_WIDTH + "\tC:".len() + CO2_WIDTH + "\tH:".len() + HUMIDITY_WIDTH + 1;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Temperature(Decicelsius),
    Humidity(u32),
    Co2(u32),
    Ping,
    Average(HistoryRecord),
    /// Records newest first
    History(Vec<HistoryRecord>),
    HistoryUnavailable,
    UnknownCommand,
}

impl Event {
    fn kind(&self) -> &'static str {
        match self {
            Event::Temperature(_) => "temperature",
            Event::Humidity(_) => "humidity",
            Event::Co2(_) => "co2",
            Event::Ping => "ping",
            Event::Average(_) => "average",
            Event::History(_) => "history",
            Event::HistoryUnavailable => "history-unavailable",
            Event::UnknownCommand => "unknown-command",
        }
    }

    pub fn max_len(&self) -> usize {
        match self {
            Event::Average(_) | Event::HistoryUnavailable => AVERAGE_MAX,
            Event::History(records) => HISTORY_REQUEST.len() + records.len() * HISTORY_LINE_MAX,
            _ => SINGLE_MAX,
        }
    }

    /// Render the wire text, failing if it would exceed `max_len`
    pub fn encode(&self) -> HubResult<String> {
        let mut out = String::with_capacity(self.max_len());
        self.render(&mut out)?;

        let max = self.max_len();
        if out.len() > max {
            return Err(HubError::EventTooLong {
                kind: self.kind(),
                len: out.len(),
                max,
            });
        }
        Ok(out)
    }

    fn render(&self, out: &mut String) -> fmt::Result {
        match self {
            Event::Temperature(t) => write!(out, "T:{}", t),
            Event::Humidity(h) => write!(out, "H:{}", h),
            Event::Co2(c) => write!(out, "C:{}", c),
            Event::Ping => out.write_str("P:"),
            Event::Average(record) => writeln!(
                out,
                "A:\nT:{:.1}\tC:{}\tH:{}",
                record.temperature, record.co2, record.humidity
            ),
            Event::History(records) => {
                out.write_str(HISTORY_REQUEST)?;
                records.iter().try_for_each(|record| {
                    writeln!(
                        out,
                        "T:{:.2}\tC:{}\tH:{}",
                        record.temperature, record.co2, record.humidity
                    )
                })
            }
            Event::HistoryUnavailable => out.write_str(HISTORY_UNAVAILABLE),
            Event::UnknownCommand => out.write_str(UNKNOWN_COMMAND),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn record(temperature: f32, co2: u32, humidity: u32) -> HistoryRecord {
        HistoryRecord {
            temperature,
            humidity,
            co2,
            samples: 60,
            recorded_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn single_channel_updates() {
        assert_eq!(Event::Temperature(Decicelsius(215)).encode().unwrap(), "T:21.5");
        assert_eq!(Event::Humidity(47).encode().unwrap(), "H:47");
        assert_eq!(Event::Co2(812).encode().unwrap(), "C:812");
        assert_eq!(Event::Ping.encode().unwrap(), "P:");
        assert_eq!(Event::UnknownCommand.encode().unwrap(), "unknown command");
    }

    #[test]
    fn average_event() {
        let text = Event::Average(record(22.54, 640, 44)).encode().unwrap();
        assert_eq!(text, "A:\nT:22.5\tC:640\tH:44\n");
    }

    #[test]
    fn history_newest_first() {
        let text = Event::History(vec![record(13.0, 500, 40), record(12.0, 510, 41)])
            .encode()
            .unwrap();
        assert_eq!(text, "G:\nT:13.00\tC:500\tH:40\nT:12.00\tC:510\tH:41\n");
    }

    #[test]
    fn empty_history_is_bare_marker() {
        assert_eq!(Event::History(Vec::new()).encode().unwrap(), HISTORY_REQUEST);
    }

    #[test]
    fn history_fits_widest_values() {
        let text = Event::History(vec![record(-214748364.8, u32::MAX, 100)])
            .encode()
            .unwrap();
        assert!(text.starts_with("G:\nT:-2147483"));

        let text = Event::History(vec![record(-1234.5, 4_000_000_000, 100)])
            .encode()
            .unwrap();
        assert_eq!(text, "G:\nT:-1234.50\tC:4000000000\tH:100\n");
    }

    #[test]
    fn oversized_event_is_rejected() {
        let err = Event::Average(record(-123456.7, u32::MAX, u32::MAX))
            .encode()
            .unwrap_err();
        assert!(matches!(err, HubError::EventTooLong { kind: "average", .. }));
    }
}
