/// Background polling of the sample source into a single-slot mailbox
use log::{debug, error};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::error::{HubError, HubResult};
use crate::models::RawReading;
use crate::sensors::source::SampleSource;

/// Poll `source` every `period` on the blocking pool and publish the newest sample
///
/// The returned receiver always holds the latest reading; readers never wait on
/// the instrument. The mailbox starts out with an all-faulted reading. The task
/// ends once every receiver has been dropped.
pub fn spawn_sampler<S>(
    source: S,
    period: Duration,
) -> (watch::Receiver<RawReading>, JoinHandle<HubResult<()>>)
where
    S: SampleSource + 'static,
{
    let (tx, rx) = watch::channel(RawReading::default());

    let handle = tokio::spawn(async move {
        let mut source = source;
        let mut ticker = interval(period);
        // A slow instrument skips polls instead of queueing them
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let (returned, reading) = match tokio::task::spawn_blocking(move || {
                let reading = source.poll();
                (source, reading)
            })
            .await
            {
                Ok(result) => result,
                Err(e) => {
                    error!("Sample source task failed: {}", e);
                    return Err(HubError::ChannelClosed("sample source"));
                }
            };
            source = returned;

            if tx.send(reading).is_err() {
                debug!("Sample mailbox has no readers, stopping sampler");
                return Ok(());
            }
        }
    });

    (rx, handle)
}
