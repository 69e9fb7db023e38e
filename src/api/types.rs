//! Records returned by the calendar API and the query used to list events

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Opaque identifier assigned by the remote service
///
/// The API hands out identifiers as either JSON strings or numbers; both are
/// kept as their string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawId")]
pub struct ResourceId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for ResourceId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        }
    }
}

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text that is either plain or keyed by language code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Localized {
    Text(String),
    Translations(BTreeMap<String, String>),
}

impl Default for Localized {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Localized {
    /// English if present, otherwise any available translation
    pub fn text(&self) -> &str {
        match self {
            Self::Text(s) => s,
            Self::Translations(map) => map
                .get("en")
                .or_else(|| map.values().next())
                .map(String::as_str)
                .unwrap_or_default(),
        }
    }
}

/// A reference-list record that users address by a human-readable name
pub trait Listed {
    fn id(&self) -> &ResourceId;
    fn display_name(&self) -> &str;
}

/// A coin tracked by the calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub id: ResourceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
}

impl Listed for Coin {
    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.symbol
    }
}

/// An event category ("Roadmap", "Burn", ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: ResourceId,
    #[serde(default)]
    pub name: String,
}

impl Listed for Category {
    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

/// A calendar event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub title: Localized,
    #[serde(default)]
    pub description: Localized,
    /// Event date as sent by the API (RFC 3339 or plain date)
    #[serde(default)]
    pub date_event: Option<String>,
    /// Community validity vote, in percent
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub coins: Vec<Coin>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// Filter and pagination for an events request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// 1-based page number
    pub page: u32,
    /// Page size; the client's configured default when unset
    pub page_size: Option<u32>,
    pub coin_ids: BTreeSet<ResourceId>,
    pub category_ids: BTreeSet<ResourceId>,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: None,
            coin_ids: BTreeSet::new(),
            category_ids: BTreeSet::new(),
        }
    }
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn coins(mut self, ids: impl IntoIterator<Item = ResourceId>) -> Self {
        self.coin_ids.extend(ids);
        self
    }

    pub fn categories(mut self, ids: impl IntoIterator<Item = ResourceId>) -> Self {
        self.category_ids.extend(ids);
        self
    }
}

/// Outcome of a successful API operation
///
/// `Data` never holds an empty collection; a remote answer with no records is
/// `Empty`.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Data(T),
    Empty,
}

impl<T> Fetched<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Data(data) => Some(data),
            Self::Empty => None,
        }
    }
}
