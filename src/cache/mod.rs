//! Durable key/value cache with per-entry expiry
//!
//! Every cached resource (credentials, access token, coin list, category list) is
//! persisted as its own JSON file. Expiry is lazy: a stale entry stays on disk but
//! reads as absent until it is overwritten or deleted.

mod clock;
mod manager;

#[cfg(test)]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use manager::CacheManager;

/// Key holding the user's API credentials
pub const CREDENTIALS_KEY: &str = "credentials";

/// Key holding the current OAuth access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key holding the coin list
pub const COINS_KEY: &str = "coins";

/// Key holding the category list
pub const CATEGORIES_KEY: &str = "categories";
