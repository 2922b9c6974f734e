/// Owner of all telemetry state: throttle, accumulation, history
use log::{debug, info, warn};
use std::time::Duration;
use time::OffsetDateTime;

use crate::config::HubConfig;
use crate::hub::subscribers::{SubscriberId, SubscriberSet};
use crate::models::{HistoryRecord, RawReading, Reading};
use crate::telemetry::accumulator::{Accumulator, SecondEdge};
use crate::telemetry::events::{Event, HISTORY_REQUEST};
use crate::telemetry::filter::filter;
use crate::telemetry::finalizer::MinuteFinalizer;
use crate::telemetry::history::BoundedHistory;
use crate::telemetry::throttle::BroadcastThrottle;
use crate::utils::format_datetime;

/// Liveness markers go out on seconds divisible by this
const PING_EVERY_SECS: i64 = 3;

pub struct Aggregator {
    throttle: BroadcastThrottle,
    accumulator: Accumulator,
    finalizer: MinuteFinalizer,
    history: BoundedHistory<HistoryRecord>,
    /// Filtered sample from the most recent tick
    latest: Reading,
}

impl Aggregator {
    pub fn new(
        history_capacity: usize,
        update_interval: Duration,
        save_interval_minutes: u8,
    ) -> Self {
        Self {
            throttle: BroadcastThrottle::new(update_interval),
            accumulator: Accumulator::new(),
            finalizer: MinuteFinalizer::new(save_interval_minutes),
            history: BoundedHistory::new(history_capacity),
            latest: Reading::default(),
        }
    }

    pub fn from_config(config: &HubConfig) -> Self {
        Self::new(
            config.history_capacity,
            config.update_interval,
            config.save_interval_minutes,
        )
    }

    /// Advance one scheduler tick
    pub fn on_tick<S>(
        &mut self,
        raw: RawReading,
        wall: OffsetDateTime,
        now_ms: u64,
        subscribers: &mut S,
    ) where
        S: SubscriberSet + ?Sized,
    {
        self.latest = filter(raw);
        self.push_changes(now_ms, subscribers);
        self.accumulate(wall, subscribers);
        self.finalize(wall, subscribers);
    }

    fn push_changes<S>(&mut self, now_ms: u64, subscribers: &mut S)
    where
        S: SubscriberSet + ?Sized,
    {
        let latest = self.latest;

        if self.throttle.push_co2(latest.co2, now_ms) {
            if let Some(co2) = latest.co2 {
                debug!("CO2 now {} ppm", co2);
                broadcast(subscribers, &Event::Co2(co2));
            }
        }

        if self.throttle.push_temperature(latest.temperature, now_ms) {
            if let Some(temperature) = latest.temperature {
                debug!("Temperature now {}°C", temperature);
                broadcast(subscribers, &Event::Temperature(temperature));
            }
        }

        if self.throttle.push_humidity(latest.humidity, now_ms) {
            if let Some(humidity) = latest.humidity {
                debug!("Humidity now {}%", humidity);
                broadcast(subscribers, &Event::Humidity(humidity));
            }
        }
    }

    fn accumulate<S>(&mut self, wall: OffsetDateTime, subscribers: &mut S)
    where
        S: SubscriberSet + ?Sized,
    {
        // A faulted instrument voids the whole second
        let sample = if self.latest.is_complete() {
            self.throttle.canonical()
        } else {
            Reading::default()
        };

        let epoch_secs = wall.unix_timestamp();
        match self.accumulator.on_tick(epoch_secs, &sample) {
            SecondEdge::None => return,
            SecondEdge::Skipped => debug!("Skipping second {}: incomplete reading", epoch_secs),
            SecondEdge::Accumulated => {}
        }

        if epoch_secs % PING_EVERY_SECS == 0 && !subscribers.is_empty() {
            broadcast(subscribers, &Event::Ping);
        }
    }

    fn finalize<S>(&mut self, wall: OffsetDateTime, subscribers: &mut S)
    where
        S: SubscriberSet + ?Sized,
    {
        let Some(record) = self.finalizer.try_finalize(&mut self.accumulator, wall) else {
            return;
        };

        info!(
            "Saving average of {} samples at {}: temp {:.1}°C, co2 {} ppm, humidity {}%",
            record.samples,
            format_datetime(&record.recorded_at),
            record.temperature,
            record.co2,
            record.humidity
        );

        self.history.insert(record.clone());
        broadcast(subscribers, &Event::Average(record));
    }

    /// Replay the canonical reading to a newly joined subscriber
    pub fn on_subscriber_join<S>(&mut self, id: SubscriberId, now_ms: u64, subscribers: &mut S)
    where
        S: SubscriberSet + ?Sized,
    {
        let canonical = self.throttle.canonical();
        let Some(temperature) = canonical.temperature else {
            debug!("No reading yet, nothing to replay to {}", id);
            return;
        };

        if let Some(humidity) = canonical.humidity {
            send(subscribers, id, &Event::Humidity(humidity));
            self.throttle.humidity.mark_pushed(now_ms);
        }

        send(subscribers, id, &Event::Temperature(temperature));
        self.throttle.temperature.mark_pushed(now_ms);

        if let Some(co2) = canonical.co2 {
            send(subscribers, id, &Event::Co2(co2));
            self.throttle.co2.mark_pushed(now_ms);
        }
    }

    /// Answer an inbound subscriber payload
    pub fn on_subscriber_request<S>(&mut self, id: SubscriberId, payload: &str, subscribers: &mut S)
    where
        S: SubscriberSet + ?Sized,
    {
        if payload != HISTORY_REQUEST {
            debug!("Unknown request from {}: {:?}", id, payload);
            send(subscribers, id, &Event::UnknownCommand);
            return;
        }

        debug!("History requested by {} ({} records)", id, self.history.len());
        match Event::History(self.history.snapshot()).encode() {
            Ok(text) => subscribers.send_to_one(id, &text),
            Err(e) => {
                // the requester always gets an answer
                warn!("History for {} not sent: {}", id, e);
                send(subscribers, id, &Event::HistoryUnavailable);
            }
        }
    }

    /// Most recently pushed value of each channel
    pub fn canonical(&self) -> Reading {
        self.throttle.canonical()
    }

    pub fn history(&self) -> &BoundedHistory<HistoryRecord> {
        &self.history
    }

    pub fn sample_count(&self) -> u32 {
        self.accumulator.sample_count()
    }
}

fn broadcast<S>(subscribers: &mut S, event: &Event)
where
    S: SubscriberSet + ?Sized,
{
    if subscribers.is_empty() {
        return;
    }
    match event.encode() {
        Ok(text) => subscribers.send_to_all(&text),
        Err(e) => warn!("Dropping broadcast: {}", e),
    }
}

fn send<S>(subscribers: &mut S, id: SubscriberId, event: &Event)
where
    S: SubscriberSet + ?Sized,
{
    match event.encode() {
        Ok(text) => subscribers.send_to_one(id, &text),
        Err(e) => warn!("Dropping reply to {}: {}", id, e),
    }
}
