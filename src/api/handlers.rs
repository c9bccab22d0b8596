//! API Handlers
//!
//! HTTP request handlers for the proxy, introspection, admin and cluster
//! endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::cluster::{BroadcastChannel, HttpPeerChannel, InProcessBus, InvalidationPropagator};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::hooks::{HookDispatcher, InvalidationEvent};
use crate::loader::ReadThroughLoader;
use crate::models::{
    AuthenticatedResponse, Consumer, ConsumerPatch, CreateConsumerRequest,
    CreateCredentialRequest, Credential, CredentialPatch, HealthResponse, MessageResponse,
    StatsResponse,
};
use crate::storage::{EntityStore, MemoryEntityStore};

/// Header (and query parameter) carrying the presented API key.
pub const API_KEY_NAME: &str = "apikey";

/// Application state shared across all handlers.
///
/// One `AppState` is one gateway node: its own cache plus handles to the
/// shared entity store and broadcast channel.
#[derive(Clone)]
pub struct AppState {
    /// This node's cache
    pub cache: Arc<CacheStore>,
    pub loader: Arc<ReadThroughLoader>,
    pub dispatcher: Arc<HookDispatcher>,
    pub propagator: Arc<InvalidationPropagator>,
}

impl AppState {
    /// Wires a node around an entity store and a broadcast channel.
    pub fn new(config: &Config, store: Arc<dyn EntityStore>, channel: Arc<dyn BroadcastChannel>) -> Self {
        let cache = Arc::new(
            CacheStore::new(config.max_entries, config.default_ttl)
                .with_tombstone_retention(config.tombstone_retention()),
        );
        let loader = Arc::new(ReadThroughLoader::from_config(
            Arc::clone(&cache),
            Arc::clone(&store),
            config,
        ));
        let propagator = Arc::new(InvalidationPropagator::new(
            config.node_id.clone(),
            Arc::clone(&cache),
            channel,
        ));
        let dispatcher = Arc::new(HookDispatcher::new(store, Arc::clone(&propagator)));

        Self {
            cache,
            loader,
            dispatcher,
            propagator,
        }
    }

    /// Creates a node from configuration alone.
    ///
    /// Uses an in-memory entity store; peers listed in the config are
    /// reached over HTTP, otherwise the node only invalidates itself.
    pub fn from_config(config: &Config) -> Self {
        let store: Arc<dyn EntityStore> = Arc::new(MemoryEntityStore::new());
        let channel: Arc<dyn BroadcastChannel> = if config.peers.is_empty() {
            Arc::new(InProcessBus::new())
        } else {
            Arc::new(HttpPeerChannel::from_config(config))
        };
        Self::new(config, store, channel)
    }
}

// == Proxy ==

#[derive(Debug, Default, Deserialize)]
pub struct ProxyQuery {
    apikey: Option<String>,
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(MessageResponse::new(message))).into_response()
}

/// Handler for GET /proxy
///
/// Authenticates the request by its API key. Unknown keys are rejected with
/// 401; when the entity store is down the request is denied with 503.
pub async fn proxy_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ProxyQuery>,
) -> Response {
    let presented = headers
        .get(API_KEY_NAME)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(query.apikey)
        .filter(|k| !k.is_empty());

    let Some(presented) = presented else {
        return reject(StatusCode::UNAUTHORIZED, "No API key found in request");
    };

    match state.loader.authenticate_by_key(&presented).await {
        Ok(snapshot) => Json(AuthenticatedResponse::from(&snapshot)).into_response(),
        Err(CacheError::EntityNotFound(_)) | Err(CacheError::InvalidRequest(_)) => {
            reject(StatusCode::UNAUTHORIZED, "Invalid authentication credentials")
        }
        Err(CacheError::StoreUnavailable(reason)) => {
            warn!(reason = %reason, "entity store unavailable, denying request");
            reject(StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable")
        }
        Err(e) => {
            error!(error = %e, "authentication failed unexpectedly");
            reject(StatusCode::INTERNAL_SERVER_ERROR, "An unexpected error occurred")
        }
    }
}

// == Introspection ==

/// Handler for GET /cache/:key
///
/// Returns the cached snapshot as JSON, or 404 with an empty body. Never
/// loads from the entity store.
pub async fn introspect_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    match state.cache.peek(&key) {
        Some(entry) if !entry.negative => Ok((
            [(header::CONTENT_TYPE, "application/json")],
            entry.value,
        )
            .into_response()),
        _ => Err(CacheError::NotFound(key)),
    }
}

// == Admin ==

/// Handler for POST /consumers
pub async fn create_consumer_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateConsumerRequest>,
) -> Result<(StatusCode, Json<Consumer>)> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let consumer = state.dispatcher.create_consumer(req.username).await?;
    Ok((StatusCode::CREATED, Json(consumer)))
}

/// Handler for PATCH /consumers/:id
pub async fn update_consumer_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ConsumerPatch>,
) -> Result<Json<Consumer>> {
    if let Some(error_msg) = patch.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    Ok(Json(state.dispatcher.update_consumer(id, patch).await?))
}

/// Handler for DELETE /consumers/:id
pub async fn delete_consumer_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.dispatcher.delete_consumer(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /consumers/:id/credentials
pub async fn create_credential_handler(
    State(state): State<AppState>,
    Path(consumer_id): Path<Uuid>,
    Json(req): Json<CreateCredentialRequest>,
) -> Result<(StatusCode, Json<Credential>)> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    let credential = state
        .dispatcher
        .create_credential(consumer_id, req.key, req.secret)
        .await?;
    Ok((StatusCode::CREATED, Json(credential)))
}

/// Handler for PATCH /credentials/:id
pub async fn update_credential_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<CredentialPatch>,
) -> Result<Json<Credential>> {
    if let Some(error_msg) = patch.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }
    Ok(Json(state.dispatcher.update_credential(id, patch).await?))
}

/// Handler for DELETE /credentials/:id
pub async fn delete_credential_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.dispatcher.delete_credential(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// == Cluster ==

/// Handler for POST /cluster/invalidations
///
/// Receives an event pushed by a peer. Always succeeds once the body parses;
/// repeated deliveries are harmless.
pub async fn receive_invalidation_handler(
    State(state): State<AppState>,
    Json(event): Json<InvalidationEvent>,
) -> StatusCode {
    state.propagator.apply(&event);
    StatusCode::NO_CONTENT
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.propagator.node_id(),
        state.cache.stats(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
