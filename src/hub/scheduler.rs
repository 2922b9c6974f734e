/// Fixed-rate driver for the telemetry aggregator
use log::info;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::error::{HubError, HubResult};
use crate::hub::clock::Clock;
use crate::hub::server::HubCommand;
use crate::hub::subscribers::Subscribers;
use crate::models::RawReading;
use crate::telemetry::Aggregator;

/// Tick the aggregator every `tick_period` and service subscriber commands
///
/// Ticks are scheduled from the previous deadline, not from when processing
/// finished; a late tick is skipped rather than replayed. All telemetry state
/// stays inside this task. Returns the aggregator once the command channel
/// closes, or an error if the sample mailbox loses its writer.
pub async fn run_scheduler<C>(
    mut aggregator: Aggregator,
    mut samples: watch::Receiver<RawReading>,
    mut commands: mpsc::Receiver<HubCommand>,
    clock: C,
    tick_period: Duration,
) -> HubResult<Aggregator>
where
    C: Clock,
{
    let mut subscribers = Subscribers::new();
    let mut ticker = interval(tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Scheduler running every {:?}", tick_period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if samples.has_changed().is_err() {
                    return Err(HubError::ChannelClosed("sample mailbox"));
                }
                let raw = *samples.borrow_and_update();
                aggregator.on_tick(raw, clock.wall(), clock.monotonic_millis(), &mut subscribers);
            }
            command = commands.recv() => match command {
                Some(HubCommand::Join { id, outbox }) => {
                    subscribers.insert(id, outbox);
                    aggregator.on_subscriber_join(id, clock.monotonic_millis(), &mut subscribers);
                }
                Some(HubCommand::Request { id, payload }) => {
                    aggregator.on_subscriber_request(id, &payload, &mut subscribers);
                }
                Some(HubCommand::Leave { id }) => {
                    subscribers.remove(id);
                }
                None => {
                    info!("Command channel closed, stopping scheduler");
                    return Ok(aggregator);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::subscribers::SubscriberId;
    use time::OffsetDateTime;

    /// Wall clock pinned to one second, monotonic clock running freely
    struct FrozenClock {
        wall: OffsetDateTime,
        origin: std::time::Instant,
    }

    impl Clock for FrozenClock {
        fn wall(&self) -> OffsetDateTime {
            self.wall
        }

        fn monotonic_millis(&self) -> u64 {
            self.origin.elapsed().as_millis() as u64
        }
    }

    fn reading() -> RawReading {
        RawReading {
            temperature: Some(21.0),
            humidity: Some(40.0),
            co2: Some(600),
        }
    }

    #[tokio::test]
    async fn replays_canonical_values_to_joining_subscriber() {
        let (_sample_tx, samples) = watch::channel(reading());
        let (command_tx, commands) = mpsc::channel(8);
        let clock = FrozenClock {
            wall: OffsetDateTime::from_unix_timestamp(1_000).unwrap(),
            origin: std::time::Instant::now(),
        };
        let aggregator = Aggregator::new(4, Duration::from_millis(1000), 1);
        let scheduler = tokio::spawn(run_scheduler(
            aggregator,
            samples,
            commands,
            clock,
            Duration::from_millis(5),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let (outbox, mut inbox) = mpsc::channel(16);
        command_tx
            .send(HubCommand::Join {
                id: SubscriberId(1),
                outbox,
            })
            .await
            .unwrap();

        assert_eq!(inbox.recv().await.unwrap(), "H:40");
        assert_eq!(inbox.recv().await.unwrap(), "T:21.0");
        assert_eq!(inbox.recv().await.unwrap(), "C:600");

        command_tx
            .send(HubCommand::Request {
                id: SubscriberId(1),
                payload: "G:\n".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(inbox.recv().await.unwrap(), "G:\n");

        drop(command_tx);
        let aggregator = scheduler.await.unwrap().unwrap();
        assert_eq!(aggregator.canonical().co2, Some(600));
    }

    #[tokio::test]
    async fn stops_when_sampler_is_gone() {
        let (sample_tx, samples) = watch::channel(reading());
        let (_command_tx, commands) = mpsc::channel(8);
        drop(sample_tx);
        let clock = FrozenClock {
            wall: OffsetDateTime::UNIX_EPOCH,
            origin: std::time::Instant::now(),
        };
        let result = run_scheduler(
            Aggregator::new(4, Duration::from_millis(1000), 1),
            samples,
            commands,
            clock,
            Duration::from_millis(5),
        )
        .await;
        assert!(matches!(result, Err(HubError::ChannelClosed("sample mailbox"))));
    }
}
