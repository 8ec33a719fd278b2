//! Query-string decoding for the facility endpoints.
//!
//! Parameters arrive as raw key/value pairs so that repeated keys work both
//! with and without the `[]` suffix (`cards=a&cards=b`, `cards[]=a`).

use facmap_core::{dedup_tags, Bounds, Location, OrderBy, Page, QueryError, Selection};

fn key_of(raw: &str) -> &str {
    raw.strip_suffix("[]").unwrap_or(raw)
}

/// Last value given for a scalar key.
fn scalar<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| key_of(k) == key)
        .map(|(_, v)| v.as_str())
}

/// Every non-empty value given for a list key, duplicates collapsed.
fn list(pairs: &[(String, String)], keys: &[&str]) -> Vec<String> {
    dedup_tags(
        pairs
            .iter()
            .filter(|(k, _)| keys.contains(&key_of(k)))
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_owned),
    )
}

fn coordinate(pairs: &[(String, String)], key: &str) -> Result<f64, QueryError> {
    let raw = scalar(pairs, key).ok_or_else(|| QueryError::InvalidBounds(format!("missing {key}")))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| QueryError::InvalidBounds(format!("{key} must be a number, got '{raw}'")))
}

/// Decode the selection shared by the map and search endpoints.
///
/// # Errors
///
/// Returns [`QueryError::InvalidBounds`] for missing or malformed corners.
pub(super) fn parse_selection(pairs: &[(String, String)]) -> Result<Selection, QueryError> {
    let bounds = Bounds::new(
        Location::new(coordinate(pairs, "nelat")?, coordinate(pairs, "nelng")?),
        Location::new(coordinate(pairs, "swlat")?, coordinate(pairs, "swlng")?),
    )?;

    let mut selection = Selection::new(bounds);
    selection.name = scalar(pairs, "name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_owned);
    selection.tags.service_types = list(pairs, &["service_types", "serviceTypes"]);
    selection.tags.filters = list(pairs, &["filters"]);
    selection.tags.cards = list(pairs, &["cards"]);
    Ok(selection)
}

/// Decode `orderby` and `page`, both optional.
///
/// # Errors
///
/// Returns [`QueryError::InvalidOrderBy`] or [`QueryError::InvalidPage`].
pub(super) fn parse_paging(pairs: &[(String, String)]) -> Result<(OrderBy, Page), QueryError> {
    let order = scalar(pairs, "orderby")
        .filter(|o| !o.is_empty())
        .map_or(Ok(OrderBy::default()), str::parse)?;
    let page = scalar(pairs, "page")
        .filter(|p| !p.is_empty())
        .map_or(Ok(Page::default()), str::parse)?;
    Ok((order, page))
}
