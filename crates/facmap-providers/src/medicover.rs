//! Medicover Sport facility search.
//!
//! The search is scoped by card, so the adapter issues one request per
//! configured card and stitches the card lists back together by `vid`.

use std::collections::HashMap;

use async_trait::async_trait;
use facmap_core::{
    dedup_tags, CanonicalFacility, Location, MedicoverCard, MedicoverConfig, OpenHours, Provider,
    Source,
};
use serde_json::Value;

use crate::adapter::{ProviderAdapter, RawItem, ValidationError};
use crate::error::ProviderError;
use crate::fetch::{FetchRequest, RawFetcher};
use crate::raw::{id_key, is_non_empty_str, link, number, owned_text, text};
use crate::throttle::Throttle;

const ALL_DAY: (&str, &str) = ("00:00:00", "23:59:00");

pub struct MedicoverAdapter {
    config: MedicoverConfig,
}

impl MedicoverAdapter {
    #[must_use]
    pub fn new(config: MedicoverConfig) -> Self {
        Self { config }
    }

    async fn fetch_card(
        &self,
        fetcher: &dyn RawFetcher,
        card: &MedicoverCard,
    ) -> Result<Vec<RawItem>, ProviderError> {
        let request = FetchRequest::new(self.config.card_url(card), cache_key(card));
        let mut body = fetcher.fetch(&request).await?;

        let Some(Value::Array(items)) = body.get_mut("items").map(Value::take) else {
            return Err(ProviderError::UnexpectedShape {
                url: request.url,
                reason: "missing items array".to_string(),
            });
        };
        Ok(items
            .into_iter()
            .map(|item| RawItem::tagged(item, &card.name))
            .collect())
    }
}

#[must_use]
pub fn cache_key(card: &MedicoverCard) -> String {
    format!("medicover-card-{}", card.name)
}

/// `08:00:00` → `08:00`; anything else passes through.
fn hour_minute(raw: &str) -> &str {
    let raw = raw.trim();
    if raw.matches(':').count() == 2 {
        raw.rsplit_once(':').map_or(raw, |(hm, _)| hm)
    } else {
        raw
    }
}

fn opening_ranges(item: &Value) -> &[Value] {
    item.pointer("/details/opening_hours")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn open_hours(item: &Value) -> OpenHours {
    let mut hours = OpenHours::default();
    for range in opening_ranges(item) {
        let day = range
            .get("day")
            .and_then(id_key)
            .and_then(|d| d.parse::<usize>().ok());
        let (start, end) = (text(range, "start_hour"), text(range, "end_hour"));
        let Some(day) = day else { continue };
        if start.is_empty() || end.is_empty() {
            continue;
        }
        // Days outside 1..=7 are ignored by push_range.
        hours.push_range(day, &format!("{} - {}", hour_minute(start), hour_minute(end)));
    }
    hours
}

fn is_open24h(item: &Value) -> bool {
    opening_ranges(item).iter().any(|range| {
        (text(range, "start_hour").trim(), text(range, "end_hour").trim()) == ALL_DAY
    })
}

fn service_types(item: &Value) -> Vec<String> {
    dedup_tags(
        item.get("services")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|service| owned_text(service, "name"))
            .filter(|name| !name.is_empty()),
    )
}

fn images(item: &Value) -> Vec<String> {
    item.get("images")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .collect()
}

#[async_trait]
impl ProviderAdapter for MedicoverAdapter {
    fn provider(&self) -> Provider {
        Provider::Medicover
    }

    /// One sub-fetch per card, paced by `request_delay_ms`. A failing card
    /// is skipped unless every card fails.
    async fn fetch(&self, fetcher: &dyn RawFetcher) -> Result<Vec<RawItem>, ProviderError> {
        let mut throttle = Throttle::from_millis(self.config.request_delay_ms);
        let mut items = Vec::new();
        let mut succeeded = 0usize;
        let mut last_error = None;

        for card in &self.config.cards {
            throttle.ready().await;
            let fetched = self.fetch_card(fetcher, card).await;
            throttle.done();
            match fetched {
                Ok(batch) => {
                    tracing::debug!(card = %card.name, items = batch.len(), "fetched medicover card");
                    succeeded += 1;
                    items.extend(batch);
                }
                Err(e) => {
                    tracing::warn!(card = %card.name, error = %e, "medicover card fetch failed, skipping");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if succeeded == 0 => Err(e),
            _ => Ok(items),
        }
    }

    fn validate(&self, item: &RawItem) -> Result<(), ValidationError> {
        let v = &item.value;
        if !is_non_empty_str(v.get("vid")) {
            return Err(ValidationError::new("vid is missing"));
        }
        if !is_non_empty_str(v.get("name")) {
            return Err(ValidationError::new("name is missing"));
        }
        if !v.get("images").is_some_and(Value::is_array) {
            return Err(ValidationError::new("images is not an array"));
        }
        if !v.pointer("/address/city").is_some_and(Value::is_string) {
            return Err(ValidationError::new("address.city is not a string"));
        }
        for axis in ["lat", "lon"] {
            if number(v.pointer(&format!("/coordinates/{axis}"))).is_none() {
                return Err(ValidationError::new(format!("coordinates.{axis} is not a number")));
            }
        }
        for key in ["services", "aspects"] {
            if v.get(key).is_some_and(|list| !list.is_array()) {
                return Err(ValidationError::new(format!("{key} is not an array")));
            }
        }
        Ok(())
    }

    fn transform(&self, item: &RawItem) -> CanonicalFacility {
        let v = &item.value;
        let location = Location::new(
            number(v.pointer("/coordinates/lat")).unwrap_or_default(),
            number(v.pointer("/coordinates/lon")).unwrap_or_default(),
        );
        let mut record = CanonicalFacility::new(
            owned_text(v, "name"),
            Source::new(Provider::Medicover, text(v, "vid").trim()),
            location,
        );

        let address = v.get("address").unwrap_or(&Value::Null);
        record.street_name = owned_text(address, "street");
        record.street_number = owned_text(address, "street_number");
        record.flat_number = owned_text(address, "flat_number");
        record.postal_code = owned_text(address, "postalcode");
        record.city = owned_text(address, "city");
        record.district = owned_text(address, "district");

        record.service_types = service_types(v);
        record.filters = dedup_tags(
            v.get("aspects")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|aspect| aspect.get("id").and_then(id_key))
                .filter_map(|id| self.config.filters.get(&id).cloned()),
        );
        record.cards = item.tag.iter().cloned().collect();

        let details = v.get("details").unwrap_or(&Value::Null);
        record.phone = owned_text(details, "phone");
        record.email = owned_text(details, "mail");
        record.website = link(text(details, "www"));

        record.description = owned_text(v, "description");
        record.images = images(v);
        record.open_hours = open_hours(v);
        record.open24h = is_open24h(v);
        record
    }

    /// The first sighting of a `vid` is kept; later sightings contribute
    /// their card.
    fn aggregate(&self, records: Vec<CanonicalFacility>) -> Vec<CanonicalFacility> {
        let mut by_vid: HashMap<String, usize> = HashMap::new();
        let mut out: Vec<CanonicalFacility> = Vec::with_capacity(records.len());

        for record in records {
            let vid = record
                .sources
                .first()
                .map(|s| s.external_id.clone())
                .unwrap_or_default();
            match by_vid.get(&vid) {
                Some(&idx) => {
                    let kept = &mut out[idx];
                    for card in record.cards {
                        if !kept.cards.contains(&card) {
                            kept.cards.push(card);
                        }
                    }
                }
                None => {
                    by_vid.insert(vid, out.len());
                    out.push(record);
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "medicover_test.rs"]
mod tests;
