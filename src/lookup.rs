//! Resolves user-facing coin symbols and category names to API identifiers

use std::collections::BTreeSet;
use std::future::Future;

use crate::api::{ApiError, CalendarClient, Event, EventQuery, Fetched, Listed, ResourceId, Transport};

/// Identifiers matched for the requested filters, plus the names that matched nothing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFilters {
    pub coin_ids: BTreeSet<ResourceId>,
    pub category_ids: BTreeSet<ResourceId>,
    pub unknown_coins: Vec<String>,
    pub unknown_categories: Vec<String>,
}

impl ResolvedFilters {
    /// Builds the events query for these filters
    pub fn to_query(&self, page: u32, page_size: Option<u32>) -> EventQuery {
        let mut query = EventQuery::new()
            .page(page)
            .coins(self.coin_ids.iter().cloned())
            .categories(self.category_ids.iter().cloned());
        query.page_size = page_size;
        query
    }

    /// True when a requested filter matched no identifiers at all
    ///
    /// Querying with that filter left out would widen the search to every
    /// event, so such a search has no results.
    pub fn is_unmatched(&self) -> bool {
        let coins = self.coin_ids.is_empty() && !self.unknown_coins.is_empty();
        let categories = self.category_ids.is_empty() && !self.unknown_categories.is_empty();
        coins || categories
    }
}

/// Outcome of an events search by coin symbol and category name
#[derive(Debug, Clone, PartialEq)]
pub struct EventSearch {
    pub filters: ResolvedFilters,
    pub events: Fetched<Vec<Event>>,
}

/// Trims and upper-cases each value, dropping blanks
pub fn standardize<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().trim().to_uppercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Looks up coin and category identifiers concurrently
///
/// An empty list of names skips its lookup entirely. Names must already be
/// [`standardize`]d; they are matched against upper-cased coin symbols and
/// category names.
pub async fn resolve_filters<T: Transport>(
    client: &CalendarClient<T>,
    coin_symbols: &[String],
    category_names: &[String],
) -> Result<ResolvedFilters, ApiError> {
    let (coins, categories) = futures::join!(
        lookup(coin_symbols, client.get_coins()),
        lookup(category_names, client.get_categories())
    );
    let (coin_ids, unknown_coins) = coins?;
    let (category_ids, unknown_categories) = categories?;

    Ok(ResolvedFilters {
        coin_ids,
        category_ids,
        unknown_coins,
        unknown_categories,
    })
}

/// Resolves the filters, then fetches one page of matching events
///
/// The events endpoint is not called when a requested filter matched nothing.
pub async fn find_events<T: Transport>(
    client: &CalendarClient<T>,
    coin_symbols: &[String],
    category_names: &[String],
    page: u32,
    page_size: Option<u32>,
) -> Result<EventSearch, ApiError> {
    let filters = resolve_filters(client, coin_symbols, category_names).await?;
    if filters.is_unmatched() {
        tracing::info!(
            unknown_coins = ?filters.unknown_coins,
            unknown_categories = ?filters.unknown_categories,
            "filters matched nothing, skipping events request"
        );
        return Ok(EventSearch {
            filters,
            events: Fetched::Empty,
        });
    }

    let events = client.get_events(&filters.to_query(page, page_size)).await?;
    Ok(EventSearch { filters, events })
}

/// Runs `fetch` only when there is something to match
async fn lookup<R, F>(wanted: &[String], fetch: F) -> Result<(BTreeSet<ResourceId>, Vec<String>), ApiError>
where
    R: Listed,
    F: Future<Output = Result<Fetched<Vec<R>>, ApiError>>,
{
    if wanted.is_empty() {
        return Ok((BTreeSet::new(), Vec::new()));
    }
    Ok(match_names(fetch.await?, wanted))
}

fn match_names<R: Listed>(records: Fetched<Vec<R>>, wanted: &[String]) -> (BTreeSet<ResourceId>, Vec<String>) {
    let records = records.into_option().unwrap_or_default();
    let ids = records
        .iter()
        .filter(|r| wanted.contains(&r.display_name().to_uppercase()))
        .map(|r| r.id().clone())
        .collect();
    let unknown = wanted
        .iter()
        .filter(|name| !records.iter().any(|r| r.display_name().to_uppercase() == name.as_str()))
        .cloned()
        .collect();
    (ids, unknown)
}
