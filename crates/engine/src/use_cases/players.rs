//! Player use cases.

use std::sync::Arc;

use realmhub_domain::PlayerName;
use serde::Serialize;

use crate::infrastructure::notifier::PublishNotifier;
use crate::infrastructure::ports::{MessageRepo, PropertyRepo, RealmRepo, RepoError};

/// What forgetting a player touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForgetReport {
    pub messages_detached: u64,
    pub properties_deleted: u64,
    pub rosters_left: u64,
    pub realms_deleted: u64,
}

/// Remove every trace of a player except the content of their messages.
pub struct ForgetPlayer {
    realms: Arc<dyn RealmRepo>,
    properties: Arc<dyn PropertyRepo>,
    messages: Arc<dyn MessageRepo>,
    notifier: Arc<PublishNotifier>,
}

impl ForgetPlayer {
    pub fn new(
        realms: Arc<dyn RealmRepo>,
        properties: Arc<dyn PropertyRepo>,
        messages: Arc<dyn MessageRepo>,
        notifier: Arc<PublishNotifier>,
    ) -> Self {
        Self {
            realms,
            properties,
            messages,
            notifier,
        }
    }

    /// Players may only forget themselves.
    pub async fn execute(
        &self,
        caller: &PlayerName,
        player: &PlayerName,
    ) -> Result<ForgetReport, PlayerError> {
        if caller != player {
            return Err(PlayerError::NotSelf);
        }

        let mut report = ForgetReport::default();
        for realm_id in self.realms.list_hosted_by(player).await? {
            if self.realms.delete(realm_id).await? {
                self.notifier.forget(realm_id);
                report.realms_deleted += 1;
            }
        }
        report.rosters_left = self.realms.remove_player_everywhere(player).await?;
        report.properties_deleted = self.properties.delete_owned_by(player).await?;
        report.messages_detached = self.messages.detach_sender(player).await?;

        tracing::info!(
            player = %player,
            realms_deleted = report.realms_deleted,
            rosters_left = report.rosters_left,
            properties_deleted = report.properties_deleted,
            messages_detached = report.messages_detached,
            "Player forgotten"
        );
        Ok(report)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("Players can only forget themselves")]
    NotSelf,
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
