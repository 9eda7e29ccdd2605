//! Storage ports, one per aggregate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use realmhub_domain::{
    Land, LandId, LandName, Message, PlayerName, PropertyFilter, PropertyName, PropertyRecord,
    PropertyScope, Realm, RealmId, RealmName, Timestamp, Topic,
};

use super::RepoError;

#[async_trait]
pub trait LandRepo: Send + Sync {
    /// Insert a new land. Returns false if the name is already taken.
    async fn create(&self, land: &Land) -> Result<bool, RepoError>;
    async fn get_by_name(&self, name: &LandName) -> Result<Option<Land>, RepoError>;
    /// Delete a land together with its realms and every property and
    /// message they own. Returns false if it did not exist.
    async fn delete(&self, id: LandId) -> Result<bool, RepoError>;
}

/// Realm storage. Also the read side of realm membership.
#[async_trait]
pub trait RealmRepo: Send + Sync {
    /// Insert a new realm. Returns false if the land already has a realm of that name.
    async fn create(&self, realm: &Realm) -> Result<bool, RepoError>;
    async fn get_by_name(
        &self,
        land_id: LandId,
        name: &RealmName,
    ) -> Result<Option<Realm>, RepoError>;
    async fn list_names_in_land(&self, land_id: LandId) -> Result<Vec<RealmName>, RepoError>;
    async fn list_ids(&self) -> Result<Vec<RealmId>, RepoError>;
    async fn list_hosted_by(&self, host: &PlayerName) -> Result<Vec<RealmId>, RepoError>;

    /// Returns false if the player had already joined.
    async fn add_player(
        &self,
        realm_id: RealmId,
        player: &PlayerName,
        now: DateTime<Utc>,
    ) -> Result<bool, RepoError>;
    /// Returns false if the player was not joined.
    async fn remove_player(
        &self,
        realm_id: RealmId,
        player: &PlayerName,
        now: DateTime<Utc>,
    ) -> Result<bool, RepoError>;
    /// Remove the player from every realm roster. Returns the number of rosters changed.
    async fn remove_player_everywhere(&self, player: &PlayerName) -> Result<u64, RepoError>;

    /// Delete a realm with its properties and messages. Returns false if it did not exist.
    async fn delete(&self, id: RealmId) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait PropertyRepo: Send + Sync {
    /// Delete every record of (scope, owner, name), then insert `values` in
    /// order, as one atomic step. Returns the number of records written.
    async fn replace(
        &self,
        scope: PropertyScope,
        owner: Option<&PlayerName>,
        name: &PropertyName,
        values: &[String],
    ) -> Result<usize, RepoError>;

    /// Every record in `scope` matching `filter`, ordered by owner, name,
    /// then the order values were written.
    async fn find(
        &self,
        scope: PropertyScope,
        filter: &PropertyFilter,
    ) -> Result<Vec<PropertyRecord>, RepoError>;

    async fn delete_owned_by(&self, owner: &PlayerName) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait MessageRepo: Send + Sync {
    /// Append a message, stamping it with a creation time strictly later than
    /// every message the store has appended before.
    async fn append(
        &self,
        realm_id: RealmId,
        sender: Option<&PlayerName>,
        topic: Option<&Topic>,
        payload: &str,
    ) -> Result<Message, RepoError>;

    /// Messages of one (realm, topic) partition created strictly after
    /// `since`, ordered by (created, id). `topic = None` is the partition of
    /// messages published without a topic.
    async fn fetch_since(
        &self,
        realm_id: RealmId,
        topic: Option<&Topic>,
        since: Timestamp,
    ) -> Result<Vec<Message>, RepoError>;

    /// Delete messages created strictly before `cutoff`, or all of the realm's
    /// messages when `cutoff` is `None`.
    async fn delete_before(
        &self,
        realm_id: RealmId,
        cutoff: Option<Timestamp>,
    ) -> Result<u64, RepoError>;

    /// Null out the sender of every message `sender` published.
    async fn detach_sender(&self, sender: &PlayerName) -> Result<u64, RepoError>;
}
