//! Cache-backed calendar API client
//!
//! `CalendarClient` owns the cache, the authenticator and the transport. Coin and
//! category lists are served from the cache while fresh and refetched otherwise;
//! events always go to the server.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

use super::auth::{Authenticator, Credentials};
use super::endpoints::{Endpoints, ResourceKind};
use super::error::ApiError;
use super::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
use super::types::{Category, Coin, Event, EventQuery, Fetched, ResourceId};
use crate::cache::CacheManager;

/// Events per page when the caller does not choose
pub const DEFAULT_PAGE_SIZE: u32 = 150;

/// Time-to-live for the coin and category lists
const LIST_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Client for the calendar API
#[derive(Debug)]
pub struct CalendarClient<T = ReqwestTransport> {
    transport: T,
    cache: CacheManager,
    auth: Authenticator,
    endpoints: Endpoints,
    page_size: u32,
}

impl CalendarClient<ReqwestTransport> {
    /// Creates a client that talks to the network through reqwest
    pub fn connect(credentials: Credentials, cache: CacheManager, endpoints: Endpoints) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::new(transport, cache, credentials, endpoints))
    }
}

impl<T: Transport> CalendarClient<T> {
    pub fn new(transport: T, cache: CacheManager, credentials: Credentials, endpoints: Endpoints) -> Self {
        let auth = Authenticator::new(credentials, endpoints.token());
        Self {
            transport,
            cache,
            auth,
            endpoints,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the default events page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// All coins known to the calendar
    pub async fn get_coins(&self) -> Result<Fetched<Vec<Coin>>, ApiError> {
        self.fetch_list(ResourceKind::Coins).await
    }

    /// All event categories
    pub async fn get_categories(&self) -> Result<Fetched<Vec<Category>>, ApiError> {
        self.fetch_list(ResourceKind::Categories).await
    }

    /// One page of events matching `query`
    ///
    /// Empty filter sets are left out of the request entirely.
    pub async fn get_events(&self, query: &EventQuery) -> Result<Fetched<Vec<Event>>, ApiError> {
        let page_size = query.page_size.unwrap_or(self.page_size).max(1);
        let mut request = HttpRequest::get(self.endpoints.events())
            .query("page", query.page.max(1).to_string())
            .query("max", page_size.to_string());

        if !query.coin_ids.is_empty() {
            request = request.query("coins", join_ids(&query.coin_ids));
        }
        if !query.category_ids.is_empty() {
            request = request.query("categories", join_ids(&query.category_ids));
        }

        let response = self.authorized_get(request).await?;
        match decode_list::<Event>(&response.body) {
            Some(events) if !events.is_empty() => Ok(Fetched::Data(events)),
            Some(_) => Ok(Fetched::Empty),
            None => {
                tracing::warn!("malformed events response");
                Ok(Fetched::Empty)
            }
        }
    }

    async fn fetch_list<R>(&self, kind: ResourceKind) -> Result<Fetched<Vec<R>>, ApiError>
    where
        R: Serialize + DeserializeOwned,
    {
        let key = kind.cache_key();
        if let Some(cached) = self.cache.get::<Vec<R>>(key) {
            if !cached.is_empty() {
                tracing::debug!(key, count = cached.len(), "cache hit");
                return Ok(Fetched::Data(cached));
            }
        }
        tracing::debug!(key, "cache miss");

        let response = self
            .authorized_get(HttpRequest::get(self.endpoints.list(kind)))
            .await?;

        let records = match decode_list::<R>(&response.body) {
            Some(records) => records,
            None => {
                tracing::warn!(key, "malformed list response");
                return Ok(Fetched::Empty);
            }
        };
        if records.is_empty() {
            tracing::warn!(key, "server returned an empty list");
            return Ok(Fetched::Empty);
        }

        if let Err(e) = self.cache.set(key, &records, Some(LIST_TTL)) {
            tracing::warn!(key, error = %e, "failed to cache list");
        }
        Ok(Fetched::Data(records))
    }

    /// Sends a resource request with the current credential attached
    ///
    /// A 401/403 invalidates the credential before the error is returned, so the
    /// following call authenticates from scratch.
    async fn authorized_get(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let credential = self.auth.credential(&self.transport, &self.cache).await?;
        let request = credential.apply(request.header("Accept", "application/json"));
        let url = request.url.clone();

        let response = self.transport.send(request).await.map_err(|e| {
            if let TransportError::Unreachable(msg) = &e {
                tracing::warn!(error = %msg, %url, "server unreachable");
            }
            ApiError::from(e)
        })?;
        match response.status {
            401 | 403 => {
                tracing::warn!(status = response.status, %url, "authentication failed");
                self.auth.invalidate(&credential, &self.cache).await;
                Err(ApiError::AuthenticationRejected {
                    status: response.status,
                })
            }
            _ if response.is_success() => Ok(response),
            status => Err(ApiError::Status { status, url }),
        }
    }
}

fn join_ids(ids: &BTreeSet<ResourceId>) -> String {
    ids.iter()
        .map(ResourceId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Accepts a bare array or an envelope whose `body` field is the array
///
/// Records that do not decode are dropped one by one, so a single bad entry
/// does not cost the whole list. `None` means the body is not a list at all.
fn decode_list<R: DeserializeOwned>(body: &str) -> Option<Vec<R>> {
    let items = match serde_json::from_str::<Value>(body).ok()? {
        Value::Array(items) => items,
        Value::Object(mut envelope) => match envelope.remove("body")? {
            Value::Array(items) => items,
            _ => return None,
        },
        _ => return None,
    };

    let total = items.len();
    let records: Vec<R> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable record");
                None
            }
        })
        .collect();
    if records.len() < total {
        tracing::warn!(kept = records.len(), total, "dropped undecodable records");
    }
    Some(records)
}
