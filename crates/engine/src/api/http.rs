//! HTTP routes.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::value::RawValue;

use realmhub_domain::{
    DeliveredMessage, Land, LandName, NewMessage, PlayerName, PropertyFilter, PropertyName,
    PropertyRecord, Realm, RealmName, Timestamp, Topic,
};

use super::auth::Caller;
use super::error::ApiError;
use crate::app::App;
use crate::use_cases::{CreateOutcome, ForgetReport, LandInfo, ReceiveOptions};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/lands/create", post(create_land))
        .route("/lands/{land}/info", get(get_land))
        .route("/lands/{land}/delete", post(delete_land))
        .route("/lands/{land}/properties", get(get_land_properties))
        .route("/lands/{land}/properties/{name}", post(set_land_property))
        .route("/lands/{land}/realms/create", post(create_realm))
        .route("/lands/{land}/realms/{realm}/info", get(get_realm))
        .route("/lands/{land}/realms/{realm}/join", post(join_realm))
        .route("/lands/{land}/realms/{realm}/leave", post(leave_realm))
        .route("/lands/{land}/realms/{realm}/delete", post(delete_realm))
        .route(
            "/lands/{land}/realms/{realm}/properties",
            get(get_realm_properties),
        )
        .route(
            "/lands/{land}/realms/{realm}/properties/{name}",
            post(set_realm_property),
        )
        .route("/lands/{land}/realms/{realm}/publish", post(publish))
        .route("/lands/{land}/realms/{realm}/receive", get(receive))
        .route("/lands/{land}/realms/{realm}/clean", post(clean))
        .route("/players/{name}/forget", post(forget_player))
}

async fn health() -> &'static str {
    "OK"
}

// =============================================================================
// Request/response bodies
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateRequest {
    name: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum CreateResponse<T> {
    Created {
        created: bool,
        #[serde(flatten)]
        entity: T,
    },
    Rejected {
        created: bool,
        reason: &'static str,
    },
}

impl<T> CreateResponse<T> {
    fn from_outcome<E>(outcome: CreateOutcome<E>, render: impl FnOnce(E) -> T) -> Self {
        match outcome {
            CreateOutcome::Created(entity) => CreateResponse::Created {
                created: true,
                entity: render(entity),
            },
            CreateOutcome::AlreadyExists => CreateResponse::Rejected {
                created: false,
                reason: "already exists",
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct LandResponse {
    name: String,
    info: String,
    realms: Vec<String>,
    created: String,
    updated: String,
}

impl LandResponse {
    fn new(land: &Land, realms: &[RealmName]) -> Self {
        Self {
            name: land.name().to_string(),
            info: land.info().to_string(),
            realms: realms.iter().map(ToString::to_string).collect(),
            created: Timestamp::from_datetime(land.created_at()).to_iso(),
            updated: Timestamp::from_datetime(land.updated_at()).to_iso(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RealmResponse {
    name: String,
    info: String,
    host: String,
    players: Vec<String>,
    created: String,
    updated: String,
}

impl From<&Realm> for RealmResponse {
    fn from(realm: &Realm) -> Self {
        Self {
            name: realm.name().to_string(),
            info: realm.info().to_string(),
            host: realm.host().to_string(),
            players: realm.players().iter().map(ToString::to_string).collect(),
            created: Timestamp::from_datetime(realm.created_at()).to_iso(),
            updated: Timestamp::from_datetime(realm.updated_at()).to_iso(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    deleted: bool,
}

#[derive(Debug, Deserialize)]
struct PropertiesQuery {
    players: Option<String>,
    names: Option<String>,
}

impl PropertiesQuery {
    fn into_filter(self) -> Result<PropertyFilter, ApiError> {
        let owners = split_list(self.players.as_deref())
            .map(PlayerName::new)
            .collect::<Result<BTreeSet<_>, _>>()?;
        let names = split_list(self.names.as_deref())
            .map(PropertyName::new)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(PropertyFilter::new(owners, names))
    }
}

#[derive(Debug, Serialize)]
struct PropertyResponse {
    player: Option<String>,
    name: String,
    value: String,
}

impl From<PropertyRecord> for PropertyResponse {
    fn from(record: PropertyRecord) -> Self {
        Self {
            player: record.owner.map(String::from),
            name: record.name.into(),
            value: record.value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SetPropertyRequest {
    #[serde(default)]
    players: Vec<String>,
    #[serde(default)]
    values: Vec<String>,
}

impl SetPropertyRequest {
    fn owners(&self) -> Result<Vec<PlayerName>, ApiError> {
        Ok(self
            .players
            .iter()
            .map(PlayerName::new)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

#[derive(Debug, Serialize)]
struct WrittenResponse {
    written: usize,
}

#[derive(Debug, Deserialize)]
struct PublishItem {
    #[serde(default)]
    topic: Option<String>,
    payload: Box<RawValue>,
}

#[derive(Debug, Serialize)]
struct PublishResponse {
    published: usize,
}

#[derive(Debug, Deserialize)]
struct ReceiveQuery {
    from: Option<String>,
    topic: Option<String>,
    every: Option<String>,
    persistence: Option<String>,
}

impl ReceiveQuery {
    fn into_options(self) -> Result<ReceiveOptions, ApiError> {
        let defaults = ReceiveOptions::default();
        Ok(ReceiveOptions {
            from: non_empty(self.from.as_deref())
                .map(Timestamp::parse_iso)
                .transpose()?,
            topic: optional_topic(self.topic.as_deref())?,
            every: match non_empty(self.every.as_deref()) {
                Some(raw) => parse_seconds("every", raw)?,
                None => defaults.every,
            },
            persistence: match non_empty(self.persistence.as_deref()) {
                Some(raw) => parse_seconds("persistence", raw)?,
                None => defaults.persistence,
            },
        })
    }
}

#[derive(Debug, Serialize)]
struct ReceivedMessage {
    topic: Option<String>,
    payload: Box<RawValue>,
}

impl TryFrom<DeliveredMessage> for ReceivedMessage {
    type Error = ApiError;

    fn try_from(message: DeliveredMessage) -> Result<Self, Self::Error> {
        let payload = RawValue::from_string(message.payload)
            .map_err(|e| ApiError::Internal(format!("Stored payload is not JSON: {e}")))?;
        Ok(Self {
            topic: message.topic.map(String::from),
            payload,
        })
    }
}

#[derive(Debug, Serialize)]
struct ReceiveResponse {
    date: String,
    messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Deserialize)]
struct CleanQuery {
    until: Option<String>,
}

#[derive(Debug, Serialize)]
struct CleanResponse {
    deleted: u64,
}

// =============================================================================
// Parsing helpers
// =============================================================================

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid body: {e}")))
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn optional_topic(raw: Option<&str>) -> Result<Option<Topic>, ApiError> {
    Ok(non_empty(raw).map(Topic::new).transpose()?)
}

/// Non-negative, possibly fractional, seconds.
fn parse_seconds(field: &str, raw: &str) -> Result<Duration, ApiError> {
    raw.parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| {
            ApiError::BadRequest(format!("{field} must be a non-negative number of seconds"))
        })
}

fn realm_path(land: String, realm: String) -> Result<(LandName, RealmName), ApiError> {
    Ok((LandName::new(land)?, RealmName::new(realm)?))
}

// =============================================================================
// Lands
// =============================================================================

async fn create_land(
    State(app): State<Arc<App>>,
    Caller(_caller): Caller,
    body: Bytes,
) -> Result<Json<CreateResponse<LandResponse>>, ApiError> {
    let request: CreateRequest = parse_body(&body)?;
    let outcome = app
        .use_cases
        .lands
        .create(LandName::new(request.name)?, request.info)
        .await?;
    Ok(Json(CreateResponse::from_outcome(outcome, |land| {
        LandResponse::new(&land, &[])
    })))
}

async fn get_land(
    State(app): State<Arc<App>>,
    Caller(_caller): Caller,
    Path(land): Path<String>,
) -> Result<Json<LandResponse>, ApiError> {
    let LandInfo { land, realms } = app.use_cases.lands.get(&LandName::new(land)?).await?;
    Ok(Json(LandResponse::new(&land, &realms)))
}

async fn delete_land(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path(land): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let land = LandName::new(land)?;
    app.use_cases.lands.delete(&land).await?;
    tracing::info!(land = %land, by = %caller, "Land deleted via API");
    Ok(Json(DeletedResponse { deleted: true }))
}

async fn get_land_properties(
    State(app): State<Arc<App>>,
    Caller(_caller): Caller,
    Path(land): Path<String>,
    Query(query): Query<PropertiesQuery>,
) -> Result<Json<Vec<PropertyResponse>>, ApiError> {
    let filter = query.into_filter()?;
    let records = app
        .use_cases
        .properties
        .land
        .get(&LandName::new(land)?, &filter)
        .await?;
    Ok(Json(records.into_iter().map(PropertyResponse::from).collect()))
}

async fn set_land_property(
    State(app): State<Arc<App>>,
    Caller(_caller): Caller,
    Path((land, name)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<WrittenResponse>, ApiError> {
    let request: SetPropertyRequest = parse_body(&body)?;
    let written = app
        .use_cases
        .properties
        .land
        .set(
            &LandName::new(land)?,
            &PropertyName::new(name)?,
            &request.owners()?,
            &request.values,
        )
        .await?;
    Ok(Json(WrittenResponse { written }))
}

// =============================================================================
// Realms
// =============================================================================

async fn create_realm(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path(land): Path<String>,
    body: Bytes,
) -> Result<Json<CreateResponse<RealmResponse>>, ApiError> {
    let request: CreateRequest = parse_body(&body)?;
    let outcome = app
        .use_cases
        .realms
        .create(
            &LandName::new(land)?,
            RealmName::new(request.name)?,
            request.info,
            caller,
        )
        .await?;
    Ok(Json(CreateResponse::from_outcome(outcome, |realm| {
        RealmResponse::from(&realm)
    })))
}

async fn get_realm(
    State(app): State<Arc<App>>,
    Caller(_caller): Caller,
    Path((land, realm)): Path<(String, String)>,
) -> Result<Json<RealmResponse>, ApiError> {
    let (land, realm) = realm_path(land, realm)?;
    let realm = app.use_cases.realms.get(&land, &realm).await?;
    Ok(Json(RealmResponse::from(&realm)))
}

async fn join_realm(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path((land, realm)): Path<(String, String)>,
) -> Result<Json<RealmResponse>, ApiError> {
    let (land, realm) = realm_path(land, realm)?;
    let realm = app.use_cases.realms.join(&land, &realm, &caller).await?;
    Ok(Json(RealmResponse::from(&realm)))
}

async fn leave_realm(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path((land, realm)): Path<(String, String)>,
) -> Result<Json<RealmResponse>, ApiError> {
    let (land, realm) = realm_path(land, realm)?;
    let realm = app.use_cases.realms.leave(&land, &realm, &caller).await?;
    Ok(Json(RealmResponse::from(&realm)))
}

async fn delete_realm(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path((land, realm)): Path<(String, String)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let (land, realm) = realm_path(land, realm)?;
    app.use_cases.realms.delete(&land, &realm, &caller).await?;
    Ok(Json(DeletedResponse { deleted: true }))
}

async fn get_realm_properties(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path((land, realm)): Path<(String, String)>,
    Query(query): Query<PropertiesQuery>,
) -> Result<Json<Vec<PropertyResponse>>, ApiError> {
    let (land, realm) = realm_path(land, realm)?;
    let filter = query.into_filter()?;
    let records = app
        .use_cases
        .properties
        .realm
        .get(&land, &realm, &caller, &filter)
        .await?;
    Ok(Json(records.into_iter().map(PropertyResponse::from).collect()))
}

async fn set_realm_property(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path((land, realm, name)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<Json<WrittenResponse>, ApiError> {
    let (land, realm) = realm_path(land, realm)?;
    let request: SetPropertyRequest = parse_body(&body)?;
    let written = app
        .use_cases
        .properties
        .realm
        .set(
            &land,
            &realm,
            &caller,
            &PropertyName::new(name)?,
            &request.owners()?,
            &request.values,
        )
        .await?;
    Ok(Json(WrittenResponse { written }))
}

// =============================================================================
// Messages
// =============================================================================

async fn publish(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path((land, realm)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<PublishResponse>, ApiError> {
    let (land, realm) = realm_path(land, realm)?;
    let items: Vec<PublishItem> = parse_body(&body)?;
    let messages = items
        .into_iter()
        .map(|item| {
            Ok(NewMessage {
                topic: optional_topic(item.topic.as_deref())?,
                payload: item.payload.get().to_string(),
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let published = app
        .use_cases
        .messages
        .publish(&land, &realm, &caller, &messages)
        .await?;
    Ok(Json(PublishResponse { published }))
}

async fn receive(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path((land, realm)): Path<(String, String)>,
    Query(query): Query<ReceiveQuery>,
) -> Result<Json<ReceiveResponse>, ApiError> {
    let (land, realm) = realm_path(land, realm)?;
    let outcome = app
        .use_cases
        .messages
        .receive(&land, &realm, &caller, query.into_options()?)
        .await?;
    let messages = outcome
        .messages
        .into_iter()
        .map(ReceivedMessage::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(ReceiveResponse {
        date: outcome.cursor.to_iso(),
        messages,
    }))
}

async fn clean(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path((land, realm)): Path<(String, String)>,
    Query(query): Query<CleanQuery>,
) -> Result<Json<CleanResponse>, ApiError> {
    let (land, realm) = realm_path(land, realm)?;
    let until = non_empty(query.until.as_deref())
        .map(Timestamp::parse_iso)
        .transpose()?;
    let deleted = app
        .use_cases
        .messages
        .clean(&land, &realm, &caller, until)
        .await?;
    Ok(Json(CleanResponse { deleted }))
}

// =============================================================================
// Players
// =============================================================================

async fn forget_player(
    State(app): State<Arc<App>>,
    Caller(caller): Caller,
    Path(name): Path<String>,
) -> Result<Json<ForgetReport>, ApiError> {
    let report = app
        .use_cases
        .players
        .execute(&caller, &PlayerName::new(name)?)
        .await?;
    Ok(Json(report))
}
