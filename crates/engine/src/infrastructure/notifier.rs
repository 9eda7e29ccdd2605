//! Publish wakeups for long-polling receivers.

use std::sync::Arc;

use dashmap::DashMap;
use realmhub_domain::RealmId;
use tokio::sync::Notify;

/// One [`Notify`] per realm, signalled on every publish into it.
///
/// Waiters re-query after waking; a wakeup carries no data, so a spurious or
/// missed one only changes latency, never what a poll returns.
#[derive(Default)]
pub struct PublishNotifier {
    realms: DashMap<RealmId, Arc<Notify>>,
}

impl PublishNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, realm_id: RealmId) -> Arc<Notify> {
        self.realms
            .entry(realm_id)
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    pub fn notify(&self, realm_id: RealmId) {
        if let Some(notify) = self.realms.get(&realm_id) {
            notify.notify_waiters();
        }
    }

    /// Wake any waiters and drop the realm's entry.
    pub fn forget(&self, realm_id: RealmId) {
        if let Some((_, notify)) = self.realms.remove(&realm_id) {
            notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn notify_wakes_enabled_waiter() {
        let notifier = PublishNotifier::new();
        let realm = RealmId::new();
        let handle = notifier.handle(realm);
        let notified = handle.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        notifier.notify(realm);

        tokio::time::timeout(Duration::from_millis(100), notified)
            .await
            .expect("woken");
    }

    #[tokio::test]
    async fn notify_for_other_realm_does_not_wake() {
        let notifier = PublishNotifier::new();
        let realm = RealmId::new();
        let other = RealmId::new();
        let handle = notifier.handle(realm);
        let _other_handle = notifier.handle(other);
        let notified = handle.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        notifier.notify(other);

        assert!(tokio::time::timeout(Duration::from_millis(50), notified)
            .await
            .is_err());
    }
}
