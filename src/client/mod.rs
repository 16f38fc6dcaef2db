//! Authenticated API client.
//!
//! Every backend call goes through [`ApiClient::send`]. The client attaches
//! the session token, performs at most one silent token refresh when the
//! backend answers 401, coalesces identical in-flight reads, caches tagged
//! reads and invalidates tags after successful mutations.

mod error;
mod request;
mod transport;


pub use error::{error_message, map_http_status, ApiError, StatusClass};
pub use request::{segment, with_query, ApiRequest, HttpMethod};
pub use transport::{HttpTransport, Transport, TransportError, TransportRequest, TransportResponse};

use crate::cache::{QueryKey, QuerySubscription, ResponseCache};
use crate::notifications::Notifier;
use crate::settings::{ClientConfig, DEFAULT_REFRESH_PATH};
use crate::state::SessionStore;
use crate::types::AccessTokenPayload;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

type CallResult = Result<Value, ApiError>;
type Inflight = Mutex<HashMap<QueryKey, broadcast::Sender<CallResult>>>;

fn lock_inflight(inflight: &Inflight) -> MutexGuard<'_, HashMap<QueryKey, broadcast::Sender<CallResult>>> {
    inflight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    pub refresh_path: String,
    /// Prefix for the authorization header value; the backend expects the
    /// bare token, so this is `None` by default.
    pub auth_scheme: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            auth_scheme: None,
        }
    }
}

impl From<&ClientConfig> for ClientOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            refresh_path: config.refresh_path.clone(),
            auth_scheme: config.auth_scheme.clone(),
        }
    }
}

pub struct ApiClient<T: Transport> {
    transport: Arc<T>,
    session: SessionStore,
    cache: Arc<ResponseCache>,
    notifier: Notifier,
    options: Arc<ClientOptions>,
    inflight: Arc<Inflight>,
}

impl<T: Transport> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            session: self.session.clone(),
            cache: self.cache.clone(),
            notifier: self.notifier.clone(),
            options: self.options.clone(),
            inflight: self.inflight.clone(),
        }
    }
}

/// Owns the in-flight slot for one coalesced read. Dropping it without
/// completing (task cancelled at shutdown) closes the channel so waiting
/// callers fail instead of hanging. Once completed, the key may already
/// belong to a newer leader, so the slot never touches it again.
struct InflightSlot {
    inflight: Arc<Inflight>,
    key: Option<QueryKey>,
}

impl InflightSlot {
    fn complete(mut self, result: CallResult) {
        let Some(key) = self.key.take() else {
            return;
        };
        let sender = lock_inflight(&self.inflight).remove(&key);
        if let Some(sender) = sender {
            let _ = sender.send(result);
        }
    }
}

impl Drop for InflightSlot {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            lock_inflight(&self.inflight).remove(&key);
        }
    }
}

fn parse_body(body: &str) -> CallResult {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(ApiError::from)
}

impl<T: Transport> ApiClient<T> {
    pub fn new(
        transport: T,
        session: SessionStore,
        cache: Arc<ResponseCache>,
        notifier: Notifier,
        options: ClientOptions,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            session,
            cache,
            notifier,
            options: Arc::new(options),
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Registers a subscriber for the query `request` describes; its cache
    /// entry is kept while the subscription lives and the subscription wakes
    /// when the entry is invalidated.
    pub fn subscribe(&self, request: &ApiRequest) -> QuerySubscription {
        self.cache.subscribe(request.query_key())
    }

    pub async fn send(&self, request: ApiRequest) -> CallResult {
        if request.is_query() {
            self.query(request).await
        } else {
            self.mutate(request).await
        }
    }

    async fn query(&self, request: ApiRequest) -> CallResult {
        let key = request.query_key();
        let cacheable = !request.provides.is_empty();

        if cacheable {
            if let Some(payload) = self.cache.fresh(&key) {
                debug!(%key, "served from cache");
                return Ok(payload);
            }
        }

        let mut rx = {
            let mut inflight = lock_inflight(&self.inflight);
            // The leader stores into the cache before releasing its slot, so a
            // miss here with no slot means nobody is fetching this key.
            if cacheable {
                if let Some(payload) = self.cache.fresh(&key) {
                    return Ok(payload);
                }
            }
            match inflight.get(&key) {
                Some(sender) => {
                    debug!(%key, "joined in-flight request");
                    sender.subscribe()
                }
                None => {
                    let (sender, rx) = broadcast::channel(1);
                    inflight.insert(key.clone(), sender);
                    self.spawn_fetch(key, request);
                    rx
                }
            }
        };

        rx.recv().await.unwrap_or_else(|_| {
            Err(ApiError::Network(
                "request was abandoned before it completed".to_string(),
            ))
        })
    }

    fn spawn_fetch(&self, key: QueryKey, request: ApiRequest) {
        let client = self.clone();
        let ticket = self.cache.begin_read(&request.provides);
        let slot = InflightSlot {
            inflight: self.inflight.clone(),
            key: Some(key.clone()),
        };

        tokio::spawn(async move {
            let result = client.execute(&request).await;
            if let Ok(payload) = &result {
                if !request.provides.is_empty() {
                    let current = client.cache.store(
                        key.clone(),
                        &request.provides,
                        payload.clone(),
                        &ticket,
                    );
                    if !current {
                        debug!(%key, "tag invalidated during fetch; stored stale");
                    }
                }
            }
            slot.complete(result);
        });
    }

    async fn mutate(&self, request: ApiRequest) -> CallResult {
        let payload = self.execute(&request).await?;
        if !request.invalidates.is_empty() {
            self.cache.invalidate(&request.invalidates);
        }
        Ok(payload)
    }

    /// One call plus the single refresh-and-retry cycle. The retried call's
    /// result is final.
    async fn execute(&self, request: &ApiRequest) -> CallResult {
        let session = self.session.snapshot();
        let err = match self.dispatch(request, session.token()).await {
            Ok(payload) => return Ok(payload),
            Err(err) => err,
        };

        if !err.is_unauthenticated() {
            self.surface(&err);
            return Err(err);
        }

        info!(method = %request.method, path = %request.path, "unauthenticated; refreshing access token");
        let Some(token) = self.refresh_access_token().await else {
            self.expire_session(session.user_id());
            return Err(err);
        };

        if let Some(user_id) = session.user_id() {
            self.session.rotate_token(user_id, token.clone());
        }

        let retried = self.dispatch(request, Some(&token)).await;
        if let Err(retry_err) = &retried {
            debug!(method = %request.method, path = %request.path, error = %retry_err, "retry after refresh failed");
            self.surface(retry_err);
        }
        retried
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> CallResult {
        let transport_request = TransportRequest {
            method: request.method,
            path: request.path.clone(),
            authorization: token.map(|t| self.authorization_value(t)),
            body: request.body.clone(),
        };
        debug!(method = %request.method, path = %request.path, authenticated = token.is_some(), "sending request");

        let response = self.transport.perform(transport_request).await.map_err(|e| {
            warn!(method = %request.method, path = %request.path, error = %e, "request failed without a response");
            ApiError::Network(e.0)
        })?;

        if !response.is_success() {
            let message = error_message(response.status, &response.body);
            debug!(method = %request.method, path = %request.path, status = response.status, %message, "request rejected");
            return Err(ApiError::from_status(response.status, message));
        }

        parse_body(&response.body)
    }

    /// Asks the refresh endpoint for a new access token using the ambient
    /// refresh cookie. Any outcome without a token counts as failure.
    async fn refresh_access_token(&self) -> Option<String> {
        let request = TransportRequest {
            method: HttpMethod::Post,
            path: self.options.refresh_path.clone(),
            authorization: None,
            body: None,
        };

        let response = match self.transport.perform(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "token refresh request failed");
                return None;
            }
        };

        let token = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|mut json| json.get_mut("data").map(Value::take))
            .and_then(|data| serde_json::from_value::<AccessTokenPayload>(data).ok())
            .and_then(|payload| payload.token().map(str::to_string));

        match &token {
            Some(_) => info!("access token refreshed"),
            None => warn!(status = response.status, "token refresh returned no access token"),
        }
        token
    }

    fn authorization_value(&self, token: &str) -> String {
        match &self.options.auth_scheme {
            Some(scheme) => format!("{scheme} {token}"),
            None => token.to_string(),
        }
    }

    fn surface(&self, err: &ApiError) {
        if matches!(err.class(), Some(StatusClass::Forbidden | StatusClass::NotFound)) {
            self.notifier.notify_error(err);
        }
    }

    /// Tears down the session the failed request was made under. A session
    /// that has since moved to another user is left alone.
    fn expire_session(&self, user_id: Option<&str>) {
        let Some(user_id) = user_id else {
            return;
        };
        if self.session.expire(user_id) {
            self.cache.clear();
            self.notifier.error("Your session has expired. Please log in again.");
        }
    }
}
