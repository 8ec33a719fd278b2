//! Field-level merge of two records judged to be the same facility.

use crate::facility::CanonicalFacility;

fn first_non_empty(first: String, second: String) -> String {
    if first.is_empty() {
        second
    } else {
        first
    }
}

/// Set union preserving first-seen order.
#[must_use]
pub fn union(first: &[String], second: &[String]) -> Vec<String> {
    crate::facility::dedup_tags(first.iter().chain(second).cloned())
}

/// Merge `second` into `first`.
///
/// `first` is the record already held by the bucket and is authoritative
/// for name and location. Text fields take the first non-empty value,
/// `serviceTypes` and `filters` are unioned, `cards`, `sources` and
/// `images` are concatenated, opening hours are taken wholesale from
/// `first` unless it has none, and flags are OR-ed.
#[must_use]
pub fn merge(first: CanonicalFacility, second: CanonicalFacility) -> CanonicalFacility {
    let service_types = union(&first.service_types, &second.service_types);
    let filters = union(&first.filters, &second.filters);

    let mut cards = first.cards;
    cards.extend(second.cards);
    let mut sources = first.sources;
    sources.extend(second.sources);
    let mut images = first.images;
    images.extend(second.images);

    let open_hours = if first.open_hours.is_empty() {
        second.open_hours
    } else {
        first.open_hours
    };

    CanonicalFacility {
        name: first.name,
        sources,
        location: first.location,
        street_name: first_non_empty(first.street_name, second.street_name),
        street_number: first_non_empty(first.street_number, second.street_number),
        flat_number: first_non_empty(first.flat_number, second.flat_number),
        postal_code: first_non_empty(first.postal_code, second.postal_code),
        city: first_non_empty(first.city, second.city),
        district: first_non_empty(first.district, second.district),
        service_types,
        filters,
        cards,
        phone: first_non_empty(first.phone, second.phone),
        email: first_non_empty(first.email, second.email),
        website: first_non_empty(first.website, second.website),
        fanpage: first_non_empty(first.fanpage, second.fanpage),
        description: first_non_empty(first.description, second.description),
        images,
        open_hours,
        open24h: first.open24h || second.open24h,
        seasonal: first.seasonal || second.seasonal,
    }
}
