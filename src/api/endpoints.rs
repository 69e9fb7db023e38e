//! Calendar API URLs

use super::auth::Credentials;

/// API root for OAuth client-credentials deployments
pub const OAUTH_API_ROOT: &str = "https://api.coinmarketcal.com";

/// API root for static API key deployments
pub const KEY_API_ROOT: &str = "https://developers.coinmarketcal.com";

/// The two cacheable reference lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Coins,
    Categories,
}

impl ResourceKind {
    pub fn cache_key(self) -> &'static str {
        match self {
            Self::Coins => crate::cache::COINS_KEY,
            Self::Categories => crate::cache::CATEGORIES_KEY,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Self::Coins => "coins",
            Self::Categories => "categories",
        }
    }
}

/// URL builder rooted at an API host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    root: String,
}

impl Endpoints {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into().trim_end_matches('/').to_string();
        Self { root }
    }

    /// Default host for the kind of credentials in use
    pub fn default_for(credentials: &Credentials) -> Self {
        match credentials {
            Credentials::Client { .. } => Self::new(OAUTH_API_ROOT),
            Credentials::ApiKey { .. } => Self::new(KEY_API_ROOT),
        }
    }

    pub fn token(&self) -> String {
        format!("{}/oauth/v2/token", self.root)
    }

    pub fn resource(&self, path: &str) -> String {
        format!("{}/v1/{}", self.root, path)
    }

    pub fn list(&self, kind: ResourceKind) -> String {
        self.resource(kind.path())
    }

    pub fn events(&self) -> String {
        self.resource("events")
    }
}
