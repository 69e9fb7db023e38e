//! Plain-text rendering of events and categories

use chrono::{DateTime, NaiveDate};
use tabled::{settings::Style, Table, Tabled};

use crate::api::{Category, Event, Listed};

/// Placeholder coin the API attaches to events without a listed coin
const CUSTOM_COIN_ID: &str = "custom_coin";

#[derive(Debug, Tabled)]
struct EventRow {
    #[tabled(rename = "Coin(s)")]
    coins: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Desc")]
    description: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Validity (%)")]
    validity: String,
}

impl From<&Event> for EventRow {
    fn from(event: &Event) -> Self {
        let coins = event
            .coins
            .iter()
            .filter(|coin| coin.id().as_str() != CUSTOM_COIN_ID)
            .map(|coin| coin.symbol.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            coins,
            title: event.title.text().to_string(),
            description: event.description.text().to_string(),
            date: event.date_event.as_deref().map(format_event_date).unwrap_or_default(),
            kind: category_names(&event.categories),
            validity: event.percentage.map(|p| p.to_string()).unwrap_or_default(),
        }
    }
}

/// Renders events as a table
pub fn render_events(events: &[Event]) -> String {
    let rows: Vec<EventRow> = events.iter().map(EventRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Comma separated category names
pub fn category_names(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formats an API date as e.g. "Tuesday, March 5, 2024"
///
/// Falls back to the raw value when it is neither RFC 3339 nor `YYYY-MM-DD`.
pub fn format_event_date(raw: &str) -> String {
    const FORMAT: &str = "%A, %B %-d, %Y";

    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return date.format(FORMAT).to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format(FORMAT).to_string();
    }
    raw.to_string()
}
