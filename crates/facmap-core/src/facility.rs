//! Canonical facility model shared by every provider adapter, the
//! deduplication engine, the stores, and the query layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A WGS84 point. Serialized as `{ "lat": .., "lng": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `true` when both components are finite and inside the WGS84 range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Planar coordinate with `x = lng`, `y = lat`.
    #[must_use]
    pub fn to_coord(self) -> geo::Coord<f64> {
        geo::Coord {
            x: self.lng,
            y: self.lat,
        }
    }

    #[must_use]
    pub fn from_coord(coord: geo::Coord<f64>) -> Self {
        Self {
            lat: coord.y,
            lng: coord.x,
        }
    }
}

/// External source a facility record was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Multisport,
    Medicover,
}

impl Provider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Provider::Multisport => "multisport",
            Provider::Medicover => "medicover",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multisport" => Ok(Provider::Multisport),
            "medicover" => Ok(Provider::Medicover),
            other => Err(CoreError::UnknownProvider(other.to_string())),
        }
    }
}

/// Provenance entry: which provider reported the facility and under which id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub provider: Provider,
    pub external_id: String,
}

impl Source {
    pub fn new(provider: Provider, external_id: impl Into<String>) -> Self {
        Self {
            provider,
            external_id: external_id.into(),
        }
    }
}

/// Number of weekday slots in [`OpenHours`].
pub const DAYS_PER_WEEK: usize = 7;

/// Weekly opening hours, slot 0 is Monday and slot 6 is Sunday.
///
/// Every slot is either empty (unknown or closed) or one or more
/// `"HH:MM - HH:MM"` ranges joined with `", "`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpenHours([String; DAYS_PER_WEEK]);

impl OpenHours {
    /// Build from an arbitrary list of slots. Missing trailing days become
    /// empty slots and anything past Sunday is dropped.
    #[must_use]
    pub fn from_slots<I, S>(slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut hours = Self::default();
        for (slot, value) in hours.0.iter_mut().zip(slots) {
            *slot = value.into();
        }
        hours
    }

    /// Slot for an ISO weekday (`1` = Monday .. `7` = Sunday).
    #[must_use]
    pub fn day(&self, iso_weekday: usize) -> Option<&str> {
        iso_weekday
            .checked_sub(1)
            .and_then(|idx| self.0.get(idx))
            .map(String::as_str)
    }

    /// Append a `"HH:MM - HH:MM"` range to an ISO weekday slot.
    ///
    /// Returns `false` (and changes nothing) for weekdays outside `1..=7`.
    pub fn push_range(&mut self, iso_weekday: usize, range: &str) -> bool {
        let Some(slot) = iso_weekday
            .checked_sub(1)
            .and_then(|idx| self.0.get_mut(idx))
        else {
            return false;
        };
        if !slot.is_empty() {
            slot.push_str(", ");
        }
        slot.push_str(range);
        true
    }

    /// `true` when no day carries any hours.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(String::is_empty)
    }

    #[must_use]
    pub fn slots(&self) -> &[String; DAYS_PER_WEEK] {
        &self.0
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.to_vec()
    }
}

/// The unified facility record produced by provider transforms and merged
/// by the deduplication engine.
///
/// Fields a provider cannot supply hold their zero value (empty string,
/// empty list, `false`), never an absent marker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalFacility {
    pub name: String,
    pub sources: Vec<Source>,
    pub location: Location,
    pub street_name: String,
    pub street_number: String,
    pub flat_number: String,
    pub postal_code: String,
    pub city: String,
    pub district: String,
    pub service_types: Vec<String>,
    pub filters: Vec<String>,
    pub cards: Vec<String>,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub fanpage: String,
    pub description: String,
    pub images: Vec<String>,
    pub open_hours: OpenHours,
    pub open24h: bool,
    pub seasonal: bool,
}

impl CanonicalFacility {
    /// A record with identity fields set and every other field zeroed.
    pub fn new(name: impl Into<String>, source: Source, location: Location) -> Self {
        Self {
            name: name.into(),
            sources: vec![source],
            location,
            ..Self::default()
        }
    }

    /// Tag values of one tag field.
    #[must_use]
    pub fn tags(&self, field: TagField) -> &[String] {
        match field {
            TagField::ServiceTypes => &self.service_types,
            TagField::Filters => &self.filters,
            TagField::Cards => &self.cards,
        }
    }
}

/// A canonical record owned by a store, addressed by its store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: i64,
    #[serde(flatten)]
    pub record: CanonicalFacility,
}

/// The three tag-set fields of a facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagField {
    ServiceTypes,
    Filters,
    Cards,
}

impl TagField {
    pub const ALL: [TagField; 3] = [TagField::ServiceTypes, TagField::Filters, TagField::Cards];

    /// Column name used by SQL-backed stores.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            TagField::ServiceTypes => "service_types",
            TagField::Filters => "filters",
            TagField::Cards => "cards",
        }
    }
}

impl fmt::Display for TagField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TagField::ServiceTypes => "service-types",
            TagField::Filters => "filters",
            TagField::Cards => "cards",
        })
    }
}

impl FromStr for TagField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "service-types" | "service_types" | "serviceTypes" => Ok(TagField::ServiceTypes),
            "filters" => Ok(TagField::Filters),
            "cards" => Ok(TagField::Cards),
            other => Err(CoreError::UnknownTagField(other.to_string())),
        }
    }
}

/// Collapse duplicate tags while keeping first-seen order.
#[must_use]
pub fn dedup_tags<I>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_hours_always_has_seven_slots() {
        let hours = OpenHours::from_slots(["08:00 - 16:00"]);
        assert_eq!(hours.slots().len(), DAYS_PER_WEEK);
        assert_eq!(hours.day(1), Some("08:00 - 16:00"));
        assert_eq!(hours.day(7), Some(""));
        assert_eq!(hours.day(0), None);
        assert_eq!(hours.day(8), None);
    }

    #[test]
    fn open_hours_drops_slots_past_sunday() {
        let hours = OpenHours::from_slots(vec!["a"; 9]);
        assert_eq!(hours.to_vec(), vec!["a"; 7]);
    }

    #[test]
    fn open_hours_push_range_joins_with_comma() {
        let mut hours = OpenHours::default();
        assert!(hours.push_range(3, "08:00 - 12:00"));
        assert!(hours.push_range(3, "13:00 - 18:00"));
        assert!(!hours.push_range(9, "00:00 - 01:00"));
        assert_eq!(hours.day(3), Some("08:00 - 12:00, 13:00 - 18:00"));
        assert!(!hours.is_empty());
        assert!(OpenHours::default().is_empty());
    }

    #[test]
    fn open_hours_serializes_as_plain_array() {
        let json = serde_json::to_value(OpenHours::from_slots(["x"])).expect("serialize");
        assert_eq!(json, serde_json::json!(["x", "", "", "", "", "", ""]));
    }

    #[test]
    fn facility_serializes_with_camel_case_and_flattened_id() {
        let facility = Facility {
            id: 7,
            record: CanonicalFacility::new(
                "Basen",
                Source::new(Provider::Medicover, "vid-1"),
                Location::new(52.0, 21.0),
            ),
        };
        let json = serde_json::to_value(&facility).expect("serialize");
        assert_eq!(json["id"], 7);
        assert_eq!(json["name"], "Basen");
        assert_eq!(json["sources"][0]["provider"], "medicover");
        assert_eq!(json["sources"][0]["externalId"], "vid-1");
        assert!(json["serviceTypes"].is_array());
        assert_eq!(json["openHours"].as_array().map(Vec::len), Some(7));
        assert_eq!(json["open24h"], false);
    }

    #[test]
    fn provider_round_trips_through_str() {
        for provider in [Provider::Multisport, Provider::Medicover] {
            assert_eq!(provider.as_str().parse::<Provider>().ok(), Some(provider));
        }
        assert!("fitprofit".parse::<Provider>().is_err());
    }

    #[test]
    fn tag_field_accepts_route_and_field_spellings() {
        assert_eq!("service-types".parse::<TagField>().ok(), Some(TagField::ServiceTypes));
        assert_eq!("serviceTypes".parse::<TagField>().ok(), Some(TagField::ServiceTypes));
        assert_eq!("cards".parse::<TagField>().ok(), Some(TagField::Cards));
        assert!("tags".parse::<TagField>().is_err());
    }

    #[test]
    fn location_validity_checks_ranges() {
        assert!(Location::new(52.23, 21.01).is_valid());
        assert!(!Location::new(91.0, 0.0).is_valid());
        assert!(!Location::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn dedup_tags_keeps_first_seen_order() {
        let tags = dedup_tags(["b", "a", "b", "c", "a"].map(String::from));
        assert_eq!(tags, vec!["b", "a", "c"]);
    }
}
