//! Background sweep of old messages.

use std::sync::Arc;
use std::time::Duration;

use realmhub_domain::Timestamp;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::ports::{ClockPort, RealmRepo, RepoError};
use crate::use_cases::messages::MessageBus;

pub struct MessageRetention {
    realms: Arc<dyn RealmRepo>,
    bus: Arc<MessageBus>,
    clock: Arc<dyn ClockPort>,
    max_age: Duration,
}

impl MessageRetention {
    pub fn new(
        realms: Arc<dyn RealmRepo>,
        bus: Arc<MessageBus>,
        clock: Arc<dyn ClockPort>,
        max_age: Duration,
    ) -> Self {
        Self {
            realms,
            bus,
            clock,
            max_age,
        }
    }

    /// Clean every realm of messages older than the retention horizon.
    /// A failing realm is logged and skipped.
    pub async fn sweep(&self) -> Result<u64, RepoError> {
        let cutoff = Timestamp::from_datetime(self.clock.now()).saturating_sub(self.max_age);
        let mut deleted = 0;
        for realm_id in self.realms.list_ids().await? {
            match self.bus.clean_before(realm_id, Some(cutoff)).await {
                Ok(n) => deleted += n,
                Err(e) => {
                    tracing::warn!(realm_id = %realm_id, error = %e, "Retention sweep failed for realm");
                }
            }
        }
        Ok(deleted)
    }

    /// Sweep every `interval` until cancelled.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        tracing::info!(
            max_age_secs = self.max_age.as_secs(),
            interval_secs = interval.as_secs(),
            "Starting message retention worker"
        );
        loop {
            match self.sweep().await {
                Ok(0) => {}
                Ok(deleted) => tracing::info!(deleted, "Expired messages removed"),
                Err(e) => tracing::error!(error = %e, "Message retention sweep failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Message retention worker shutting down");
                    break;
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MessageRepo, MockClockPort};
    use crate::use_cases::test_support::{fixed_now, World};
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn sweep_removes_only_messages_older_than_max_age() {
        // Stamps are taken at fixed_now(), then sweeps run an hour and a day later.
        let mut clock = MockClockPort::new();
        let mut seq = mockall::Sequence::new();
        clock
            .expect_now()
            .times(2)
            .in_sequence(&mut seq)
            .returning(fixed_now);
        clock
            .expect_now()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| fixed_now() + ChronoDuration::hours(1));
        clock
            .expect_now()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| fixed_now() + ChronoDuration::days(1));
        let clock: Arc<dyn ClockPort> = Arc::new(clock);

        let world = World::with_clock(clock.clone()).await;
        world.store.append(world.realm_id, None, None, "1").await.expect("1");
        world.store.append(world.realm_id, None, None, "2").await.expect("2");

        let retention = MessageRetention::new(
            world.store.clone(),
            world.bus(),
            clock,
            Duration::from_secs(6 * 3600),
        );

        assert_eq!(retention.sweep().await.expect("early sweep"), 0);
        assert_eq!(retention.sweep().await.expect("late sweep"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_when_cancelled() {
        let world = World::new().await;
        let retention = Arc::new(MessageRetention::new(
            world.store.clone(),
            world.bus(),
            world.clock.clone(),
            Duration::from_secs(3600),
        ));
        let cancel = CancellationToken::new();
        let worker = tokio::spawn(retention.run(Duration::from_secs(60), cancel.clone()));

        tokio::time::sleep(Duration::from_secs(150)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), worker)
            .await
            .expect("worker stops")
            .expect("worker task");
    }
}
