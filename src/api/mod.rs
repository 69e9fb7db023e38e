//! CoinMarketCal API access
//!
//! Authentication, cache-backed reference lists and the events query, behind the
//! [`CalendarClient`] façade.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod transport;
pub mod types;

pub use auth::{AccessCredential, Authenticator, Credentials};
pub use client::{CalendarClient, DEFAULT_PAGE_SIZE};
pub use endpoints::{Endpoints, ResourceKind};
pub use error::ApiError;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
pub use types::{Category, Coin, Event, EventQuery, Fetched, Listed, Localized, ResourceId};
