//! Message use cases - the per-realm, topic-partitioned bus.
//!
//! Delivery is pull-based. A receiver hands back the cursor it was last given
//! and gets every message created after it, optionally waiting a bounded time
//! for something to arrive. No receiver state lives on the server.

use std::sync::Arc;
use std::time::Duration;

use realmhub_domain::{
    DeliveredMessage, LandName, Message, NewMessage, PlayerName, RealmId, RealmName, Timestamp,
    Topic,
};
use tokio::time::Instant;

use crate::infrastructure::config::PollConfig;
use crate::infrastructure::notifier::PublishNotifier;
use crate::infrastructure::ports::{MessageRepo, RepoError};
use crate::use_cases::access::{AccessError, RealmAccess};

/// One long-poll.
#[derive(Debug, Clone)]
pub struct PollRequest {
    pub realm_id: RealmId,
    /// `None` is the partition of messages published without a topic.
    pub topic: Option<Topic>,
    /// Messages from this sender are skipped, though the cursor still moves past them.
    pub caller: Option<PlayerName>,
    pub since: Timestamp,
    pub interval: Duration,
    pub max_wait: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Pass back as `since` on the next poll.
    pub cursor: Timestamp,
    pub messages: Vec<DeliveredMessage>,
}

/// Publish, poll and clean over the message repository.
pub struct MessageBus {
    repo: Arc<dyn MessageRepo>,
    notifier: Arc<PublishNotifier>,
    limits: PollConfig,
}

impl MessageBus {
    pub fn new(repo: Arc<dyn MessageRepo>, notifier: Arc<PublishNotifier>, limits: PollConfig) -> Self {
        Self {
            repo,
            notifier,
            limits,
        }
    }

    pub async fn publish(
        &self,
        realm_id: RealmId,
        sender: Option<&PlayerName>,
        topic: Option<&Topic>,
        payload: &str,
    ) -> Result<Timestamp, RepoError> {
        let message = self.repo.append(realm_id, sender, topic, payload).await?;
        self.notifier.notify(realm_id);
        Ok(message.created)
    }

    /// Append every message in order, waking pollers once at the end.
    pub async fn publish_all(
        &self,
        realm_id: RealmId,
        sender: Option<&PlayerName>,
        messages: &[NewMessage],
    ) -> Result<usize, RepoError> {
        let mut published = 0;
        let result = async {
            for message in messages {
                self.repo
                    .append(realm_id, sender, message.topic.as_ref(), &message.payload)
                    .await?;
                published += 1;
            }
            Ok::<_, RepoError>(())
        }
        .await;
        if published > 0 {
            self.notifier.notify(realm_id);
        }
        result.map(|()| published)
    }

    pub async fn poll(&self, request: PollRequest) -> Result<PollOutcome, RepoError> {
        let interval = request.interval.max(self.limits.min_interval);
        let max_wait = request.max_wait.min(self.limits.max_wait);
        let deadline = Instant::now() + max_wait;
        let wakeups = self.notifier.handle(request.realm_id);
        let mut cursor = request.since;

        loop {
            // Registered before querying so a publish landing in between still wakes us.
            let notified = wakeups.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let found = self
                .repo
                .fetch_since(request.realm_id, request.topic.as_ref(), cursor)
                .await?;
            if let Some(latest) = found.last() {
                cursor = latest.created;
            }
            let messages: Vec<DeliveredMessage> = found
                .into_iter()
                .filter(|m| !request.caller.as_ref().is_some_and(|c| m.is_from(c)))
                .map(Message::into_delivered)
                .collect();

            let now = Instant::now();
            if !messages.is_empty() || now >= deadline {
                return Ok(PollOutcome { cursor, messages });
            }

            tokio::select! {
                _ = tokio::time::sleep(interval.min(deadline - now)) => {}
                _ = &mut notified => {}
            }
        }
    }

    /// Delete the realm's messages created strictly before `cutoff`, or all of
    /// them when `cutoff` is `None`.
    pub async fn clean_before(
        &self,
        realm_id: RealmId,
        cutoff: Option<Timestamp>,
    ) -> Result<u64, RepoError> {
        self.repo.delete_before(realm_id, cutoff).await
    }
}

/// Receive parameters as supplied by a client.
#[derive(Debug, Clone)]
pub struct ReceiveOptions {
    pub from: Option<Timestamp>,
    pub topic: Option<Topic>,
    pub every: Duration,
    pub persistence: Duration,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            from: None,
            topic: None,
            every: Duration::from_secs(1),
            persistence: Duration::ZERO,
        }
    }
}

/// Realm-level message operations with membership checks.
pub struct MessageUseCases {
    access: Arc<RealmAccess>,
    bus: Arc<MessageBus>,
}

impl MessageUseCases {
    pub fn new(access: Arc<RealmAccess>, bus: Arc<MessageBus>) -> Self {
        Self { access, bus }
    }

    pub async fn publish(
        &self,
        land: &LandName,
        realm: &RealmName,
        caller: &PlayerName,
        messages: &[NewMessage],
    ) -> Result<usize, MessageError> {
        let realm = self.access.member(land, realm, caller).await?;
        let published = self.bus.publish_all(realm.id(), Some(caller), messages).await?;
        tracing::debug!(realm = %realm.name(), sender = %caller, published, "Messages published");
        Ok(published)
    }

    pub async fn receive(
        &self,
        land: &LandName,
        realm: &RealmName,
        caller: &PlayerName,
        options: ReceiveOptions,
    ) -> Result<PollOutcome, MessageError> {
        let realm = self.access.member(land, realm, caller).await?;
        let outcome = self
            .bus
            .poll(PollRequest {
                realm_id: realm.id(),
                topic: options.topic,
                caller: Some(caller.clone()),
                since: options.from.unwrap_or(Timestamp::EPOCH),
                interval: options.every,
                max_wait: options.persistence,
            })
            .await?;
        Ok(outcome)
    }

    /// Host only.
    pub async fn clean(
        &self,
        land: &LandName,
        realm: &RealmName,
        caller: &PlayerName,
        until: Option<Timestamp>,
    ) -> Result<u64, MessageError> {
        let realm = self.access.host(land, realm, caller).await?;
        let deleted = self.bus.clean_before(realm.id(), until).await?;
        tracing::info!(realm = %realm.name(), deleted, "Realm messages cleaned");
        Ok(deleted)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::RealmRepo;
    use crate::infrastructure::sqlite::test_support::{open_temp, seeded_realm};
    use crate::use_cases::test_support::{fixed_now, player, World};
    use realmhub_domain::Realm;

    fn topic(name: &str) -> Topic {
        Topic::new(name).expect("valid topic")
    }

    fn request(world: &World, caller: &str, since: Timestamp) -> PollRequest {
        PollRequest {
            realm_id: world.realm_id,
            topic: None,
            caller: Some(player(caller)),
            since,
            interval: Duration::from_millis(10),
            max_wait: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn other_senders_see_a_message_its_author_does_not() {
        let world = World::new().await;
        let bus = world.bus();
        bus.publish(world.realm_id, Some(&player("alice")), Some(&topic("chat")), "{\"hi\":1}")
            .await
            .expect("publish");

        let mut for_bob = request(&world, "bob", Timestamp::EPOCH);
        for_bob.topic = Some(topic("chat"));
        let mut for_alice = request(&world, "alice", Timestamp::EPOCH);
        for_alice.topic = Some(topic("chat"));

        let for_bob = bus.poll(for_bob).await.expect("bob");
        assert_eq!(
            for_bob.messages,
            vec![DeliveredMessage {
                topic: Some(topic("chat")),
                payload: "{\"hi\":1}".to_string(),
            }]
        );

        let for_alice = bus.poll(for_alice).await.expect("alice");
        assert!(for_alice.messages.is_empty());
    }

    #[tokio::test]
    async fn cursor_moves_past_self_authored_messages() {
        let world = World::new().await;
        let bus = world.bus();
        let stamp = bus
            .publish(world.realm_id, Some(&player("alice")), None, "1")
            .await
            .expect("publish");

        let first = bus.poll(request(&world, "alice", Timestamp::EPOCH)).await.expect("first");
        assert!(first.messages.is_empty());
        assert_eq!(first.cursor, stamp);

        let second = bus.poll(request(&world, "alice", first.cursor)).await.expect("second");
        assert!(second.cursor >= first.cursor);
        assert!(second.messages.is_empty());
    }

    #[tokio::test]
    async fn cursor_stays_put_when_nothing_is_new() {
        let world = World::new().await;
        let bus = world.bus();
        let since = Timestamp::from_datetime(fixed_now());

        let outcome = bus.poll(request(&world, "bob", since)).await.expect("poll");
        assert_eq!(outcome.cursor, since);
        assert!(outcome.messages.is_empty());
    }

    #[tokio::test]
    async fn topic_filter_limits_results_and_cursor() {
        let world = World::new().await;
        let bus = world.bus();
        let alice = player("alice");
        let chat = bus
            .publish(world.realm_id, Some(&alice), Some(&topic("chat")), "1")
            .await
            .expect("chat");
        bus.publish(world.realm_id, Some(&alice), Some(&topic("moves")), "2")
            .await
            .expect("moves");

        let mut req = request(&world, "bob", Timestamp::EPOCH);
        req.topic = Some(topic("chat"));
        let outcome = bus.poll(req).await.expect("poll");

        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(outcome.cursor, chat);
    }

    #[tokio::test]
    async fn absent_topic_is_its_own_partition() {
        let world = World::new().await;
        let bus = world.bus();
        let alice = player("alice");
        bus.publish(world.realm_id, Some(&alice), Some(&topic("chat")), "topical")
            .await
            .expect("chat");
        let bare = bus
            .publish(world.realm_id, Some(&alice), None, "bare")
            .await
            .expect("bare");

        let outcome = bus.poll(request(&world, "bob", Timestamp::EPOCH)).await.expect("poll");

        let payloads: Vec<&str> = outcome.messages.iter().map(|m| m.payload.as_str()).collect();
        assert_eq!(payloads, vec!["bare"]);
        assert_eq!(outcome.cursor, bare);
    }

    #[tokio::test]
    async fn long_poll_over_sqlite_wakes_on_publish() {
        let (_dir, repos) = open_temp().await;
        let realm_id = seeded_realm(&repos, "lobby").await;
        let bus = Arc::new(MessageBus::new(
            repos.message.clone(),
            Arc::new(PublishNotifier::new()),
            PollConfig {
                min_interval: Duration::from_millis(10),
                max_wait: Duration::from_secs(10),
            },
        ));
        let chat = topic("chat");
        let seen = bus
            .publish(realm_id, Some(&player("alice")), Some(&chat), "early")
            .await
            .expect("early");

        let publisher = bus.clone();
        let late_topic = chat.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            publisher
                .publish(realm_id, Some(&player("bob")), Some(&late_topic), "own")
                .await
                .expect("own");
            publisher
                .publish(realm_id, Some(&player("alice")), Some(&late_topic), "late")
                .await
                .expect("late");
        });

        let started = std::time::Instant::now();
        let outcome = bus
            .poll(PollRequest {
                realm_id,
                topic: Some(chat),
                caller: Some(player("bob")),
                since: seen,
                interval: Duration::from_secs(5),
                max_wait: Duration::from_secs(5),
            })
            .await
            .expect("poll");

        let payloads: Vec<&str> = outcome.messages.iter().map(|m| m.payload.as_str()).collect();
        assert_eq!(payloads, vec!["late"]);
        assert!(outcome.cursor > seen);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_wait_never_sleeps() {
        let world = World::new().await;
        let bus = world.bus();
        let mut req = request(&world, "bob", Timestamp::EPOCH);
        req.interval = Duration::from_secs(1);

        let started = Instant::now();
        let outcome = bus.poll(req).await.expect("poll");

        assert!(outcome.messages.is_empty());
        assert!(started.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_wait_returns_at_the_deadline() {
        let world = World::new().await;
        let bus = world.bus();
        let mut req = request(&world, "bob", Timestamp::EPOCH);
        req.interval = Duration::from_millis(300);
        req.max_wait = Duration::from_secs(1);

        let started = Instant::now();
        let outcome = bus.poll(req).await.expect("poll");

        assert!(outcome.messages.is_empty());
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert!(started.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn publish_during_wait_returns_early() {
        let world = World::new().await;
        let bus = world.bus();
        let publisher = bus.clone();
        let realm_id = world.realm_id;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            publisher
                .publish(realm_id, Some(&player("alice")), None, "late")
                .await
                .expect("publish");
        });

        let mut req = request(&world, "bob", Timestamp::EPOCH);
        req.interval = Duration::from_secs(1);
        req.max_wait = Duration::from_secs(5);
        let started = Instant::now();
        let outcome = bus.poll(req).await.expect("poll");

        assert_eq!(outcome.messages.len(), 1);
        assert_eq!(outcome.messages[0].payload, "late");
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn own_publish_during_wait_keeps_waiting() {
        let world = World::new().await;
        let bus = world.bus();
        let publisher = bus.clone();
        let realm_id = world.realm_id;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            publisher
                .publish(realm_id, Some(&player("bob")), None, "echo")
                .await
                .expect("publish");
        });

        let mut req = request(&world, "bob", Timestamp::EPOCH);
        req.interval = Duration::from_secs(1);
        req.max_wait = Duration::from_secs(2);
        let started = Instant::now();
        let outcome = bus.poll(req).await.expect("poll");

        assert!(outcome.messages.is_empty());
        assert!(outcome.cursor > Timestamp::EPOCH);
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_millis(2100));
    }

    #[tokio::test]
    async fn waits_are_clamped_to_configured_bounds() {
        let world = World::new().await;
        let bus = MessageBus::new(
            world.store.clone(),
            world.notifier.clone(),
            PollConfig {
                min_interval: Duration::from_millis(10),
                max_wait: Duration::ZERO,
            },
        );
        let mut req = request(&world, "bob", Timestamp::EPOCH);
        req.max_wait = Duration::from_secs(30);

        let started = std::time::Instant::now();
        bus.poll(req).await.expect("poll");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn clean_before_is_strict_and_realm_scoped() {
        let world = World::new().await;
        let bus = world.bus();
        let other = Realm::new(
            world.access().land(&world.land).await.expect("land").id(),
            RealmName::new("annex").expect("valid"),
            "",
            player("host"),
            fixed_now(),
        );
        RealmRepo::create(world.store.as_ref(), &other).await.expect("other realm");

        bus.publish(world.realm_id, None, None, "old").await.expect("old");
        let cutoff = bus.publish(world.realm_id, None, None, "edge").await.expect("edge");
        bus.publish(world.realm_id, None, None, "new").await.expect("new");
        bus.publish(other.id(), None, None, "elsewhere").await.expect("other");

        assert_eq!(bus.clean_before(world.realm_id, Some(cutoff)).await.expect("clean"), 1);
        let left = bus.poll(request(&world, "bob", Timestamp::EPOCH)).await.expect("left");
        let payloads: Vec<&str> = left.messages.iter().map(|m| m.payload.as_str()).collect();
        assert_eq!(payloads, vec!["edge", "new"]);

        assert_eq!(bus.clean_before(world.realm_id, None).await.expect("clear"), 2);
        let mut elsewhere = request(&world, "bob", Timestamp::EPOCH);
        elsewhere.realm_id = other.id();
        assert_eq!(bus.poll(elsewhere).await.expect("other").messages.len(), 1);
    }

    #[tokio::test]
    async fn receive_requires_membership_and_clean_requires_host() {
        let world = World::new().await;
        world.join("alice").await;
        let messages = MessageUseCases::new(world.access(), world.bus());

        let err = messages
            .receive(&world.land, &world.realm, &player("mallory"), ReceiveOptions::default())
            .await
            .expect_err("outsider");
        assert!(matches!(err, MessageError::Access(AccessError::NotMember { .. })));

        let err = messages
            .clean(&world.land, &world.realm, &player("alice"), None)
            .await
            .expect_err("not host");
        assert!(matches!(err, MessageError::Access(AccessError::NotHost { .. })));
    }

    #[tokio::test]
    async fn published_batch_arrives_in_order() {
        let world = World::new().await;
        world.join("alice").await;
        world.join("bob").await;
        let messages = MessageUseCases::new(world.access(), world.bus());
        let batch = vec![
            NewMessage {
                topic: Some(topic("moves")),
                payload: "1".to_string(),
            },
            NewMessage {
                topic: None,
                payload: "aside".to_string(),
            },
            NewMessage {
                topic: Some(topic("moves")),
                payload: "2".to_string(),
            },
        ];

        let published = messages
            .publish(&world.land, &world.realm, &player("alice"), &batch)
            .await
            .expect("publish");
        assert_eq!(published, 3);

        let moves = ReceiveOptions {
            topic: Some(topic("moves")),
            ..ReceiveOptions::default()
        };
        let outcome = messages
            .receive(&world.land, &world.realm, &player("bob"), moves)
            .await
            .expect("receive");
        let payloads: Vec<&str> = outcome.messages.iter().map(|m| m.payload.as_str()).collect();
        assert_eq!(payloads, vec!["1", "2"]);
    }
}
