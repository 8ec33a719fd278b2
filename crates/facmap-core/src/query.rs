//! Query-side value types: map bounds, tag filters, pagination, and the
//! shapes returned to map and search clients.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::facility::{CanonicalFacility, Location, TagField};
use crate::similarity::name_similarity;

/// Records per page of a full search.
pub const PAGE_SIZE: usize = 10;

/// Upper bound on the number of groups a map query is partitioned into.
pub const MAX_CLUSTERS: usize = 20;

/// Name similarity must be strictly greater than this to match.
pub const SIMILARITY_THRESHOLD: f64 = 0.3;

/// Maximum number of fuzzy search hits.
pub const FUZZY_LIMIT: usize = 10;

/// Rejections raised on query input before any store access.
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),
    #[error("invalid sorting option '{0}'")]
    InvalidOrderBy(String),
    #[error("invalid page '{0}'")]
    InvalidPage(String),
    #[error("id has to be a number, got '{0}'")]
    InvalidId(String),
}

/// Map viewport rectangle given by its north-east and south-west corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub north_east: Location,
    pub south_west: Location,
}

impl Bounds {
    /// Validate and build a bounds rectangle.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidBounds`] when a corner is not a valid
    /// WGS84 point or the south-west corner is not below and left of the
    /// north-east corner.
    pub fn new(north_east: Location, south_west: Location) -> Result<Self, QueryError> {
        if !north_east.is_valid() || !south_west.is_valid() {
            return Err(QueryError::InvalidBounds(
                "coordinates must be finite WGS84 values".to_string(),
            ));
        }
        if south_west.lat > north_east.lat {
            return Err(QueryError::InvalidBounds(
                "south-west latitude exceeds north-east latitude".to_string(),
            ));
        }
        if south_west.lng > north_east.lng {
            return Err(QueryError::InvalidBounds(
                "south-west longitude exceeds north-east longitude".to_string(),
            ));
        }
        Ok(Self {
            north_east,
            south_west,
        })
    }

    /// Strict-interior containment, matching `ST_Within` for points.
    #[must_use]
    pub fn contains(&self, location: Location) -> bool {
        location.lat > self.south_west.lat
            && location.lat < self.north_east.lat
            && location.lng > self.south_west.lng
            && location.lng < self.north_east.lng
    }

    #[must_use]
    pub fn to_rect(&self) -> geo::Rect<f64> {
        geo::Rect::new(self.south_west.to_coord(), self.north_east.to_coord())
    }
}

/// Requested tag sets; a record matches when its tags are a superset of
/// each requested set. Empty sets impose no constraint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagFilters {
    pub service_types: Vec<String>,
    pub filters: Vec<String>,
    pub cards: Vec<String>,
}

impl TagFilters {
    #[must_use]
    pub fn requested(&self, field: TagField) -> &[String] {
        match field {
            TagField::ServiceTypes => &self.service_types,
            TagField::Filters => &self.filters,
            TagField::Cards => &self.cards,
        }
    }

    #[must_use]
    pub fn matches(&self, record: &CanonicalFacility) -> bool {
        TagField::ALL.into_iter().all(|field| {
            let have = record.tags(field);
            self.requested(field).iter().all(|want| have.contains(want))
        })
    }
}

/// The selection predicate shared by map and full search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub bounds: Bounds,
    pub name: Option<String>,
    #[serde(flatten)]
    pub tags: TagFilters,
}

impl Selection {
    #[must_use]
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            name: None,
            tags: TagFilters::default(),
        }
    }

    /// Name filter with blank input treated as absent.
    #[must_use]
    pub fn name_filter(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.trim().is_empty())
    }

    #[must_use]
    pub fn matches(&self, record: &CanonicalFacility) -> bool {
        self.bounds.contains(record.location)
            && self.tags.matches(record)
            && self
                .name_filter()
                .is_none_or(|name| name_similarity(&record.name, name) > SIMILARITY_THRESHOLD)
    }
}

/// Supported result orderings for full search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    #[default]
    Name,
}

impl FromStr for OrderBy {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(OrderBy::Name),
            other => Err(QueryError::InvalidOrderBy(other.to_string())),
        }
    }
}

/// Zero-based page of [`PAGE_SIZE`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Page(pub u32);

impl Page {
    #[must_use]
    pub fn offset(self) -> usize {
        usize::try_from(self.0)
            .unwrap_or(usize::MAX)
            .saturating_mul(PAGE_SIZE)
    }

    #[must_use]
    pub const fn limit(self) -> usize {
        PAGE_SIZE
    }
}

impl FromStr for Page {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Page)
            .map_err(|_| QueryError::InvalidPage(s.to_string()))
    }
}

/// Parse a facility id from path input.
///
/// # Errors
///
/// Returns [`QueryError::InvalidId`] for anything but a positive integer.
pub fn parse_facility_id(raw: &str) -> Result<i64, QueryError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(QueryError::InvalidId(raw.to_string())),
    }
}

/// A group of selected records produced by the store's clustering primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterGroup {
    pub member_ids: Vec<i64>,
    pub centroid: Location,
}

/// A single facility pin on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingletonObject {
    pub id: i64,
    pub location: Location,
}

/// Several nearby facilities collapsed into one marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterObject {
    pub count: usize,
    pub location: Location,
}

/// One marker returned by a map bounds query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MapObject {
    Singleton(SingletonObject),
    Cluster(ClusterObject),
}

impl MapObject {
    /// Convert a cluster group. Returns `None` for an empty group.
    #[must_use]
    pub fn from_group(group: &ClusterGroup) -> Option<Self> {
        match group.member_ids.as_slice() {
            [] => None,
            [id] => Some(MapObject::Singleton(SingletonObject {
                id: *id,
                location: group.centroid,
            })),
            members => Some(MapObject::Cluster(ClusterObject {
                count: members.len(),
                location: group.centroid,
            })),
        }
    }

    /// Number of facilities represented by this marker.
    #[must_use]
    pub fn weight(&self) -> usize {
        match self {
            MapObject::Singleton(_) => 1,
            MapObject::Cluster(c) => c.count,
        }
    }
}

/// One fuzzy name search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyMatch {
    pub id: i64,
    pub name: String,
    pub city: String,
    #[serde(skip)]
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::{Provider, Source};

    fn bounds() -> Bounds {
        Bounds::new(Location::new(53.0, 22.0), Location::new(52.0, 21.0)).expect("bounds")
    }

    fn record(name: &str, lat: f64, lng: f64) -> CanonicalFacility {
        CanonicalFacility::new(name, Source::new(Provider::Multisport, "1"), Location::new(lat, lng))
    }

    #[test]
    fn bounds_reject_inverted_corners() {
        let err = Bounds::new(Location::new(52.0, 22.0), Location::new(53.0, 21.0)).unwrap_err();
        assert!(matches!(err, QueryError::InvalidBounds(_)));
        let err = Bounds::new(Location::new(53.0, 21.0), Location::new(52.0, 22.0)).unwrap_err();
        assert!(matches!(err, QueryError::InvalidBounds(_)));
    }

    #[test]
    fn bounds_reject_non_finite_values() {
        let err = Bounds::new(Location::new(f64::NAN, 22.0), Location::new(52.0, 21.0)).unwrap_err();
        assert!(matches!(err, QueryError::InvalidBounds(_)));
    }

    #[test]
    fn bounds_containment_is_strict_interior() {
        let b = bounds();
        assert!(b.contains(Location::new(52.5, 21.5)));
        assert!(!b.contains(Location::new(52.0, 21.5)));
        assert!(!b.contains(Location::new(52.5, 22.0)));
        assert!(!b.contains(Location::new(54.0, 21.5)));
    }

    #[test]
    fn tag_filters_require_superset() {
        let mut r = record("Gym", 52.5, 21.5);
        r.cards = vec!["A".into(), "B".into()];
        r.filters = vec!["parking".into()];

        let mut tags = TagFilters::default();
        assert!(tags.matches(&r), "empty request imposes no constraint");

        tags.cards = vec!["B".into(), "A".into()];
        assert!(tags.matches(&r));

        tags.cards = vec!["A".into(), "C".into()];
        assert!(!tags.matches(&r));

        tags.cards.clear();
        tags.filters = vec!["parking".into()];
        tags.service_types = vec!["yoga".into()];
        assert!(!tags.matches(&r));
    }

    #[test]
    fn selection_applies_name_threshold() {
        let mut selection = Selection::new(bounds());
        selection.name = Some("baseny".into());
        assert!(selection.matches(&record("Baseny Miejskie", 52.5, 21.5)));
        assert!(!selection.matches(&record("Apteka Centrum", 52.5, 21.5)));
        assert!(!selection.matches(&record("Baseny Miejskie", 10.0, 10.0)));
    }

    #[test]
    fn blank_name_filter_is_ignored() {
        let mut selection = Selection::new(bounds());
        selection.name = Some("   ".into());
        assert!(selection.matches(&record("Apteka", 52.5, 21.5)));
    }

    #[test]
    fn order_by_only_accepts_name() {
        assert_eq!("name".parse::<OrderBy>(), Ok(OrderBy::Name));
        assert_eq!(
            "distance".parse::<OrderBy>(),
            Err(QueryError::InvalidOrderBy("distance".into()))
        );
    }

    #[test]
    fn page_parses_and_computes_offset() {
        assert_eq!("3".parse::<Page>().map(Page::offset), Ok(30));
        assert!("x".parse::<Page>().is_err());
        assert!("-1".parse::<Page>().is_err());
    }

    #[test]
    fn facility_id_must_be_positive_integer() {
        assert_eq!(parse_facility_id("42"), Ok(42));
        assert!(parse_facility_id("abc").is_err());
        assert!(parse_facility_id("0").is_err());
    }

    #[test]
    fn map_object_from_group_distinguishes_singletons() {
        let single = ClusterGroup {
            member_ids: vec![5],
            centroid: Location::new(1.0, 2.0),
        };
        let many = ClusterGroup {
            member_ids: vec![1, 2, 3],
            centroid: Location::new(1.0, 2.0),
        };
        let empty = ClusterGroup {
            member_ids: vec![],
            centroid: Location::new(1.0, 2.0),
        };

        assert!(matches!(
            MapObject::from_group(&single),
            Some(MapObject::Singleton(SingletonObject { id: 5, .. }))
        ));
        assert!(matches!(
            MapObject::from_group(&many),
            Some(MapObject::Cluster(ClusterObject { count: 3, .. }))
        ));
        assert!(MapObject::from_group(&empty).is_none());
    }

    #[test]
    fn map_object_serializes_with_type_and_value() {
        let obj = MapObject::Cluster(ClusterObject {
            count: 4,
            location: Location::new(52.0, 21.0),
        });
        let json = serde_json::to_value(&obj).expect("serialize");
        assert_eq!(json["type"], "cluster");
        assert_eq!(json["value"]["count"], 4);
        assert_eq!(json["value"]["location"]["lng"], 21.0);
    }

    #[test]
    fn fuzzy_match_omits_score() {
        let hit = FuzzyMatch {
            id: 1,
            name: "Basen".into(),
            city: "Kraków".into(),
            score: 0.9,
        };
        let json = serde_json::to_value(&hit).expect("serialize");
        assert!(json.get("score").is_none());
        assert_eq!(json["city"], "Kraków");
    }
}
