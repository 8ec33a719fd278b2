//! Multisport facility directory.
//!
//! The whole directory arrives in one response, items under
//! `response.matching_all.docs`.

use std::sync::LazyLock;

use async_trait::async_trait;
use facmap_core::{
    dedup_tags, CanonicalFacility, Location, MultisportConfig, OpenHours, Provider, Source,
    DAYS_PER_WEEK,
};
use regex::Regex;
use serde_json::Value;

use crate::adapter::{ProviderAdapter, RawItem, ValidationError};
use crate::error::ProviderError;
use crate::fetch::{FetchRequest, RawFetcher};
use crate::raw::{is_non_empty_str, link, owned_text, text, translate_ids, truthy};

pub const CACHE_KEY: &str = "multisport";

const DOCS_POINTER: &str = "/response/matching_all/docs";

/// House number, optionally a range or with a letter suffix.
static ADDRESS_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d*-*\d+\s*([A-Z,a-z][^.])*").expect("valid regex"));

static POSTAL_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}-\d{3}").expect("valid regex"));

pub struct MultisportAdapter {
    config: MultisportConfig,
}

impl MultisportAdapter {
    #[must_use]
    pub fn new(config: MultisportConfig) -> Self {
        Self { config }
    }
}

/// `(street name, street number, flat number)` parsed from a one-line address.
///
/// With two or more number tokens the last one is the flat and the one
/// before it the street number.
fn split_address(address: &str) -> (String, String, String) {
    let tokens: Vec<&str> = ADDRESS_TOKEN.find_iter(address).map(|m| m.as_str()).collect();
    let (number, flat) = match tokens.as_slice() {
        [] => return (address.trim().to_owned(), String::new(), String::new()),
        [only] => (*only, ""),
        [.., number, flat] => (*number, *flat),
    };
    let street = address
        .find(number)
        .map_or(address, |idx| &address[..idx])
        .trim();
    (
        street.to_owned(),
        number.trim_end().to_owned(),
        flat.trim_end().to_owned(),
    )
}

/// Explicit `postcode`, else the last postal code in the full address.
///
/// Street number ranges such as `238-240` can look like postal codes, hence
/// the last match.
fn postal_code(item: &Value) -> String {
    let explicit = text(item, "postcode").trim();
    if !explicit.is_empty() {
        return explicit.to_owned();
    }
    POSTAL_CODE
        .find_iter(text(item, "address_full"))
        .last()
        .map(|m| m.as_str().to_owned())
        .unwrap_or_default()
}

fn phone(item: &Value) -> String {
    ["phone", "phone2"]
        .into_iter()
        .map(|key| text(item, key).trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn day_hours(day: &Value) -> String {
    if truthy(day.get("closed")) {
        return String::new();
    }
    [("from", "to"), ("fromSecond", "toSecond")]
        .into_iter()
        .filter_map(|(from, to)| {
            let (from, to) = (text(day, from).trim(), text(day, to).trim());
            (!from.is_empty() && !to.is_empty()).then(|| format!("{from} - {to}"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn open_hours(item: &Value) -> OpenHours {
    let Some(hours) = item.get("hours").filter(|h| h.is_object()) else {
        return OpenHours::default();
    };
    OpenHours::from_slots(
        (1..=DAYS_PER_WEEK).map(|day| hours.get(day.to_string()).map(day_hours).unwrap_or_default()),
    )
}

fn non_zero_number(item: &Value, key: &str) -> Option<f64> {
    item.get(key)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite() && *n != 0.0)
}

#[async_trait]
impl ProviderAdapter for MultisportAdapter {
    fn provider(&self) -> Provider {
        Provider::Multisport
    }

    async fn fetch(&self, fetcher: &dyn RawFetcher) -> Result<Vec<RawItem>, ProviderError> {
        let request = FetchRequest::new(&self.config.base_url, CACHE_KEY);
        let mut body = fetcher.fetch(&request).await?;

        let Some(Value::Array(docs)) = body.pointer_mut(DOCS_POINTER).map(Value::take) else {
            return Err(ProviderError::UnexpectedShape {
                url: request.url,
                reason: "missing response.matching_all.docs array".to_string(),
            });
        };
        Ok(docs.into_iter().map(RawItem::new).collect())
    }

    fn validate(&self, item: &RawItem) -> Result<(), ValidationError> {
        let v = &item.value;
        if !v.get("uid").and_then(Value::as_i64).is_some_and(|uid| uid > 0) {
            return Err(ValidationError::new("uid is not a positive integer"));
        }
        if !is_non_empty_str(v.get("name")) && !is_non_empty_str(v.get("title")) {
            return Err(ValidationError::new("neither name nor title is set"));
        }
        for key in ["lat", "lng"] {
            if non_zero_number(v, key).is_none() {
                return Err(ValidationError::new(format!("{key} is not a non-zero number")));
            }
        }
        for key in ["address", "city", "address_full"] {
            if !is_non_empty_str(v.get(key)) {
                return Err(ValidationError::new(format!("{key} is missing")));
            }
        }
        Ok(())
    }

    fn transform(&self, item: &RawItem) -> CanonicalFacility {
        let v = &item.value;
        let name = [text(v, "name"), text(v, "title")]
            .into_iter()
            .map(str::trim)
            .find(|n| !n.is_empty())
            .unwrap_or_default();
        let uid = v
            .get("uid")
            .and_then(Value::as_i64)
            .map(|uid| uid.to_string())
            .unwrap_or_default();
        let location = Location::new(
            non_zero_number(v, "lat").unwrap_or_default(),
            non_zero_number(v, "lng").unwrap_or_default(),
        );

        let mut record =
            CanonicalFacility::new(name, Source::new(Provider::Multisport, uid), location);

        let (street_name, street_number, flat_number) = split_address(text(v, "address"));
        record.street_name = street_name;
        record.street_number = street_number;
        record.flat_number = flat_number;
        record.postal_code = postal_code(v);
        record.city = owned_text(v, "city");

        record.service_types =
            dedup_tags(translate_ids(v, "categories_all_ids", &self.config.activities));
        record.filters = dedup_tags(translate_ids(v, "parameters_ids", &self.config.filters));
        record.cards = dedup_tags(translate_ids(v, "cards_ids", &self.config.cards));

        record.phone = phone(v);
        record.email = owned_text(v, "email");
        record.website = link(text(v, "webpage"));
        record.fanpage = link(text(v, "fanpage"));
        record.description = owned_text(v, "info");

        let logo = text(v, "logo").trim();
        if !logo.is_empty() {
            record.images = vec![format!("{}{logo}", self.config.image_base_url)];
        }

        record.open_hours = open_hours(v);
        record.open24h = truthy(v.get("open24h"));
        record.seasonal = truthy(v.get("is_seasonal"));
        record
    }
}

#[cfg(test)]
#[path = "multisport_test.rs"]
mod tests;
