//! Credential acquisition and invalidation
//!
//! OAuth deployments exchange client credentials for a short-lived access token,
//! which is kept in memory for the process lifetime and in the cache across
//! runs. Static key deployments skip all of that and attach the key to every
//! request.

use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;
use tokio::sync::Mutex;

use super::error::ApiError;
use super::transport::{HttpRequest, Transport, TransportError};
use crate::cache::{CacheManager, ACCESS_TOKEN_KEY, CREDENTIALS_KEY};

/// Header carrying the static API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// User-supplied credentials, stored permanently under [`CREDENTIALS_KEY`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    Client {
        #[serde(rename = "clientId")]
        client_id: String,
        #[serde(rename = "clientSecret")]
        client_secret: String,
    },
    ApiKey {
        #[serde(rename = "apiKey")]
        api_key: String,
    },
}

impl Credentials {
    /// Reads stored credentials, ignoring entries with blank fields
    pub fn load(cache: &CacheManager) -> Option<Self> {
        cache
            .get::<Self>(CREDENTIALS_KEY)
            .filter(|credentials| credentials.is_complete())
    }

    /// Stores credentials with no expiry
    pub fn store(&self, cache: &CacheManager) -> io::Result<()> {
        cache.set(CREDENTIALS_KEY, self, None)
    }

    fn is_complete(&self) -> bool {
        match self {
            Self::Client {
                client_id,
                client_secret,
            } => !client_id.is_empty() && !client_secret.is_empty(),
            Self::ApiKey { api_key } => !api_key.is_empty(),
        }
    }
}

/// What gets attached to an outgoing resource request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessCredential {
    Bearer(String),
    ApiKey(String),
}

impl AccessCredential {
    pub fn apply(&self, request: HttpRequest) -> HttpRequest {
        match self {
            Self::Bearer(token) => request.query("access_token", token.as_str()),
            Self::ApiKey(key) => request.header(API_KEY_HEADER, key.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AuthState {
    Unauthenticated,
    Authenticated(String),
    /// The auth endpoint refused the client credentials; not retried for the
    /// rest of the process
    Refused(String),
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: Option<String>,
    /// Lifetime in seconds, sent as a number or a numeric string
    expires_in: Option<serde_json::Value>,
}

impl TokenGrant {
    fn lifetime(&self) -> Option<Duration> {
        let seconds = match self.expires_in.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64()?,
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (seconds.is_finite() && seconds > 0.0).then(|| Duration::from_secs_f64(seconds))
    }
}

/// OAuth client-credentials state machine
///
/// The state lock is held while a token is being requested, so concurrent
/// callers wait for the first exchange instead of starting their own.
#[derive(Debug)]
pub struct TokenAuthenticator {
    client_id: String,
    client_secret: String,
    token_url: String,
    state: Mutex<AuthState>,
}

impl TokenAuthenticator {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: token_url.into(),
            state: Mutex::new(AuthState::Unauthenticated),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(*self.state.lock().await, AuthState::Authenticated(_))
    }

    /// Returns a token, from memory, the cache, or the auth endpoint in that order
    pub async fn access_token<T>(&self, transport: &T, cache: &CacheManager) -> Result<String, ApiError>
    where
        T: Transport + ?Sized,
    {
        let mut state = self.state.lock().await;
        match &*state {
            AuthState::Authenticated(token) => return Ok(token.clone()),
            AuthState::Refused(reason) => return Err(ApiError::Configuration(reason.clone())),
            AuthState::Unauthenticated => {}
        }

        let token = match cache.get::<String>(ACCESS_TOKEN_KEY) {
            Some(token) if !token.is_empty() => {
                tracing::debug!("using cached access token");
                token
            }
            _ => match self.request_token(transport, cache).await {
                Ok(token) => token,
                Err(ApiError::Configuration(reason)) => {
                    *state = AuthState::Refused(reason.clone());
                    return Err(ApiError::Configuration(reason));
                }
                Err(e) => return Err(e),
            },
        };

        *state = AuthState::Authenticated(token.clone());
        Ok(token)
    }

    async fn request_token<T>(&self, transport: &T, cache: &CacheManager) -> Result<String, ApiError>
    where
        T: Transport + ?Sized,
    {
        tracing::info!(url = %self.token_url, "requesting access token");
        let request = HttpRequest::get(self.token_url.as_str())
            .query("grant_type", "client_credentials")
            .query("client_id", self.client_id.as_str())
            .query("client_secret", self.client_secret.as_str());

        let response = transport.send(request).await.map_err(|e| {
            if let TransportError::Unreachable(msg) = &e {
                tracing::warn!(error = %msg, "auth server unreachable");
            }
            ApiError::from(e)
        })?;
        match response.status {
            400 | 401 | 403 => {
                tracing::warn!(status = response.status, "client credentials rejected");
                return Err(ApiError::Configuration(
                    "client credentials were rejected, check your client id and secret".to_string(),
                ));
            }
            _ if !response.is_success() => {
                return Err(ApiError::Status {
                    status: response.status,
                    url: self.token_url.clone(),
                });
            }
            _ => {}
        }

        let grant: TokenGrant = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Malformed(format!("token response: {}", e)))?;
        let token = grant
            .access_token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Malformed("token response has no access_token".to_string()))?;

        // Without a usable lifetime the token is only kept in memory.
        match grant.lifetime() {
            Some(ttl) => {
                if let Err(e) = cache.set(ACCESS_TOKEN_KEY, &token, Some(ttl)) {
                    tracing::warn!(error = %e, "failed to cache access token");
                }
            }
            None => tracing::warn!(expires_in = ?grant.expires_in, "token lifetime not usable, not caching"),
        }

        Ok(token)
    }

    /// Forgets `rejected` so the next request authenticates again
    ///
    /// A token that has already been replaced is left alone, so a late
    /// rejection of an old token cannot discard a renewed one.
    pub async fn invalidate(&self, rejected: &str, cache: &CacheManager) {
        let mut state = self.state.lock().await;
        if *state != AuthState::Authenticated(rejected.to_string()) {
            tracing::debug!("rejected access token was already replaced");
            return;
        }

        *state = AuthState::Unauthenticated;
        if cache.get::<String>(ACCESS_TOKEN_KEY).as_deref() == Some(rejected) {
            if let Err(e) = cache.delete(ACCESS_TOKEN_KEY) {
                tracing::warn!(error = %e, "failed to delete cached access token");
            }
        }
        tracing::info!("discarded rejected access token");
    }
}

/// Supplies the credential for resource requests
#[derive(Debug)]
pub enum Authenticator {
    Token(TokenAuthenticator),
    StaticKey(String),
}

impl Authenticator {
    pub fn new(credentials: Credentials, token_url: impl Into<String>) -> Self {
        match credentials {
            Credentials::Client {
                client_id,
                client_secret,
            } => Self::Token(TokenAuthenticator::new(client_id, client_secret, token_url)),
            Credentials::ApiKey { api_key } => Self::StaticKey(api_key),
        }
    }

    pub async fn credential<T>(&self, transport: &T, cache: &CacheManager) -> Result<AccessCredential, ApiError>
    where
        T: Transport + ?Sized,
    {
        match self {
            Self::Token(auth) => auth
                .access_token(transport, cache)
                .await
                .map(AccessCredential::Bearer),
            Self::StaticKey(key) => Ok(AccessCredential::ApiKey(key.clone())),
        }
    }

    /// Called after a resource endpoint refuses `rejected`
    ///
    /// A static key cannot be refreshed, so there is nothing to reset.
    pub async fn invalidate(&self, rejected: &AccessCredential, cache: &CacheManager) {
        if let (Self::Token(auth), AccessCredential::Bearer(token)) = (self, rejected) {
            auth.invalidate(token, cache).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::mock::MockTransport;
    use crate::cache::ManualClock;
    use std::sync::Arc;
    use tempfile::TempDir;

    const TOKEN_URL: &str = "https://auth.test/oauth/v2/token";

    fn create_test_cache() -> (CacheManager, Arc<ManualClock>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let clock = Arc::new(ManualClock::at(1_000));
        let cache = CacheManager::with_dir(temp_dir.path().to_path_buf()).with_clock(clock.clone());
        (cache, clock, temp_dir)
    }

    fn authenticator() -> TokenAuthenticator {
        TokenAuthenticator::new("my-id", "my-secret", TOKEN_URL)
    }

    #[tokio::test]
    async fn test_cached_token_skips_network() {
        let (cache, _clock, _dir) = create_test_cache();
        cache.set(ACCESS_TOKEN_KEY, &"cached-token", Some(Duration::from_secs(60))).unwrap();
        let transport = MockTransport::new();
        let auth = authenticator();

        let token = auth.access_token(&transport, &cache).await.unwrap();

        assert_eq!(token, "cached-token");
        assert_eq!(transport.call_count(), 0);
        assert!(auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_cache_miss_requests_and_caches_token() {
        let (cache, clock, _dir) = create_test_cache();
        let transport = MockTransport::new();
        transport.respond(TOKEN_URL, 200, r#"{"access_token": "fresh", "expires_in": 3600}"#);
        let auth = authenticator();

        let token = auth.access_token(&transport, &cache).await.unwrap();

        assert_eq!(token, "fresh");
        let request = &transport.requests()[0];
        assert_eq!(request.query_value("grant_type"), Some("client_credentials"));
        assert_eq!(request.query_value("client_id"), Some("my-id"));
        assert_eq!(request.query_value("client_secret"), Some("my-secret"));

        clock.advance(3_599_999);
        assert_eq!(cache.get::<String>(ACCESS_TOKEN_KEY), Some("fresh".to_string()));
        clock.advance(1);
        assert_eq!(cache.get::<String>(ACCESS_TOKEN_KEY), None, "token expires after expires_in");
    }

    #[tokio::test]
    async fn test_authenticated_state_reuses_token_in_memory() {
        let (cache, _clock, _dir) = create_test_cache();
        let transport = MockTransport::new();
        transport.respond(TOKEN_URL, 200, r#"{"access_token": "fresh", "expires_in": 3600}"#);
        let auth = authenticator();

        auth.access_token(&transport, &cache).await.unwrap();
        cache.delete(ACCESS_TOKEN_KEY).unwrap();
        let again = auth.access_token(&transport, &cache).await.unwrap();

        assert_eq!(again, "fresh");
        assert_eq!(transport.calls_to(TOKEN_URL), 1);
    }

    #[tokio::test]
    async fn test_bad_request_is_configuration_error() {
        let (cache, _clock, _dir) = create_test_cache();
        let transport = MockTransport::new();
        transport.respond(TOKEN_URL, 400, r#"{"error": "invalid_client"}"#);
        let auth = authenticator();

        let err = auth.access_token(&transport, &cache).await.unwrap_err();

        assert!(err.is_configuration(), "unexpected error: {err}");
        assert!(!auth.is_authenticated().await);
        assert_eq!(transport.calls_to(TOKEN_URL), 1, "no automatic retry");
    }

    #[tokio::test]
    async fn test_forbidden_is_configuration_error() {
        let (cache, _clock, _dir) = create_test_cache();
        let transport = MockTransport::new();
        transport.respond(TOKEN_URL, 403, "");

        let err = authenticator().access_token(&transport, &cache).await.unwrap_err();

        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_offline() {
        let (cache, _clock, _dir) = create_test_cache();
        let transport = MockTransport::new();
        transport.fail(TOKEN_URL, TransportError::Unreachable("dns error".into()));
        let auth = authenticator();

        let err = auth.access_token(&transport, &cache).await.unwrap_err();

        assert!(matches!(err, ApiError::Offline(_)));
        assert!(!auth.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_missing_access_token_is_malformed() {
        let (cache, _clock, _dir) = create_test_cache();
        let transport = MockTransport::new();
        transport.respond(TOKEN_URL, 200, r#"{"expires_in": 3600}"#);

        let err = authenticator().access_token(&transport, &cache).await.unwrap_err();

        assert!(matches!(err, ApiError::Malformed(_)));
        assert!(cache.get::<String>(ACCESS_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_invalidate_resets_state_and_cache() {
        let (cache, _clock, _dir) = create_test_cache();
        cache.set(ACCESS_TOKEN_KEY, &"revoked", Some(Duration::from_secs(60))).unwrap();
        let transport = MockTransport::new();
        let auth = authenticator();
        auth.access_token(&transport, &cache).await.unwrap();

        auth.invalidate("revoked", &cache).await;

        assert!(!auth.is_authenticated().await);
        assert!(cache.get::<String>(ACCESS_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_late_rejection_keeps_renewed_token() {
        let (cache, _clock, _dir) = create_test_cache();
        cache.set(ACCESS_TOKEN_KEY, &"old", Some(Duration::from_secs(60))).unwrap();
        let transport = MockTransport::new();
        transport.respond(TOKEN_URL, 200, r#"{"access_token": "new", "expires_in": 3600}"#);
        let auth = authenticator();

        auth.access_token(&transport, &cache).await.unwrap();
        auth.invalidate("old", &cache).await;
        assert_eq!(auth.access_token(&transport, &cache).await.unwrap(), "new");

        // A second request that was still in flight with "old" fails afterwards.
        auth.invalidate("old", &cache).await;

        assert!(auth.is_authenticated().await);
        assert_eq!(cache.get::<String>(ACCESS_TOKEN_KEY), Some("new".to_string()));
        assert_eq!(auth.access_token(&transport, &cache).await.unwrap(), "new");
        assert_eq!(transport.calls_to(TOKEN_URL), 1);
    }

    #[tokio::test]
    async fn test_refused_credentials_are_not_retried() {
        let (cache, _clock, _dir) = create_test_cache();
        let transport = MockTransport::new();
        transport.respond(TOKEN_URL, 400, "");
        transport.respond(TOKEN_URL, 200, r#"{"access_token": "never", "expires_in": 3600}"#);
        let auth = authenticator();

        let (first, second) = futures::join!(
            auth.access_token(&transport, &cache),
            auth.access_token(&transport, &cache)
        );

        assert!(first.unwrap_err().is_configuration());
        assert!(second.unwrap_err().is_configuration());
        assert_eq!(transport.calls_to(TOKEN_URL), 1);
    }

    #[tokio::test]
    async fn test_string_lifetime_is_accepted() {
        let (cache, clock, _dir) = create_test_cache();
        let transport = MockTransport::new();
        transport.respond(TOKEN_URL, 200, r#"{"access_token": "tok", "expires_in": "3600"}"#);

        let token = authenticator().access_token(&transport, &cache).await.unwrap();

        assert_eq!(token, "tok");
        clock.advance(3_599_999);
        assert_eq!(cache.get::<String>(ACCESS_TOKEN_KEY), Some("tok".to_string()));
        clock.advance(1);
        assert!(cache.get::<String>(ACCESS_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_fractional_lifetime_is_accepted() {
        let (cache, _clock, _dir) = create_test_cache();
        let transport = MockTransport::new();
        transport.respond(TOKEN_URL, 200, r#"{"access_token": "tok", "expires_in": 3600.5}"#);

        authenticator().access_token(&transport, &cache).await.unwrap();

        assert_eq!(cache.get::<String>(ACCESS_TOKEN_KEY), Some("tok".to_string()));
    }

    #[tokio::test]
    async fn test_unusable_lifetime_keeps_token_in_memory() {
        let (cache, _clock, _dir) = create_test_cache();
        let transport = MockTransport::new();
        transport.respond(TOKEN_URL, 200, r#"{"access_token": "tok", "expires_in": "soon"}"#);
        let auth = authenticator();

        let token = auth.access_token(&transport, &cache).await.unwrap();

        assert_eq!(token, "tok");
        assert!(auth.is_authenticated().await);
        assert!(cache.get::<String>(ACCESS_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_static_key_bypasses_token_flow() {
        let (cache, _clock, temp_dir) = create_test_cache();
        let transport = MockTransport::new();
        let auth = Authenticator::new(
            Credentials::ApiKey {
                api_key: "k3y".into(),
            },
            TOKEN_URL,
        );

        let credential = auth.credential(&transport, &cache).await.unwrap();
        auth.invalidate(&credential, &cache).await;

        assert_eq!(credential, AccessCredential::ApiKey("k3y".into()));
        assert_eq!(transport.call_count(), 0);
        assert!(!temp_dir.path().join("access_token.json").exists());
    }

    #[test]
    fn test_credentials_round_trip_through_cache() {
        let (cache, _clock, _dir) = create_test_cache();
        let credentials = Credentials::Client {
            client_id: "id".into(),
            client_secret: "secret".into(),
        };

        credentials.store(&cache).unwrap();

        assert_eq!(Credentials::load(&cache), Some(credentials));
    }

    #[test]
    fn test_credentials_use_camel_case_fields() {
        let json = serde_json::to_value(Credentials::ApiKey {
            api_key: "abc".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"apiKey": "abc"}));

        let parsed: Credentials =
            serde_json::from_str(r#"{"clientId": "a", "clientSecret": "b"}"#).unwrap();
        assert_eq!(
            parsed,
            Credentials::Client {
                client_id: "a".into(),
                client_secret: "b".into()
            }
        );
    }

    #[test]
    fn test_blank_credentials_are_ignored() {
        let (cache, _clock, _dir) = create_test_cache();
        Credentials::Client {
            client_id: "id".into(),
            client_secret: String::new(),
        }
        .store(&cache)
        .unwrap();

        assert!(Credentials::load(&cache).is_none());
    }

    #[test]
    fn test_access_credential_placement() {
        let bearer = AccessCredential::Bearer("t".into()).apply(HttpRequest::get("u"));
        assert_eq!(bearer.query_value("access_token"), Some("t"));
        assert!(bearer.headers.is_empty());

        let key = AccessCredential::ApiKey("k".into()).apply(HttpRequest::get("u"));
        assert_eq!(key.header_value(API_KEY_HEADER), Some("k"));
        assert!(key.query.is_empty());
    }
}
