//! Read-only query commands. Each returns the same JSON the HTTP API
//! would send for the equivalent request.

use anyhow::Context;
use facmap_core::{parse_facility_id, Bounds, Location, OrderBy, Page, Selection, TagField};
use facmap_search::FacilityService;
use serde_json::json;

use crate::SelectionArgs;

/// Parse `swlat,swlng,nelat,nelng`.
pub(crate) fn parse_bounds(raw: &str) -> anyhow::Result<Bounds> {
    let corners = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("bounds component '{}' is not a number", part.trim()))
        })
        .collect::<anyhow::Result<Vec<f64>>>()?;

    let [swlat, swlng, nelat, nelng] = corners[..] else {
        anyhow::bail!("bounds must be swlat,swlng,nelat,nelng; got '{raw}'");
    };
    Ok(Bounds::new(
        Location::new(nelat, nelng),
        Location::new(swlat, swlng),
    )?)
}

pub(crate) fn build_selection(args: &SelectionArgs) -> anyhow::Result<Selection> {
    let mut selection = Selection::new(parse_bounds(&args.bounds)?);
    selection.name = args
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from);
    selection.tags.cards = facmap_core::dedup_tags(args.cards.iter().cloned());
    selection.tags.filters = facmap_core::dedup_tags(args.filters.iter().cloned());
    selection.tags.service_types = facmap_core::dedup_tags(args.service_types.iter().cloned());
    Ok(selection)
}

pub(crate) async fn run_map(
    service: &FacilityService,
    args: &SelectionArgs,
) -> anyhow::Result<serde_json::Value> {
    let objects = service.map_query(&build_selection(args)?).await?;
    Ok(json!({ "objects": objects }))
}

pub(crate) async fn run_search(
    service: &FacilityService,
    args: &SelectionArgs,
    page: u32,
) -> anyhow::Result<serde_json::Value> {
    let objects = service
        .full_search(&build_selection(args)?, OrderBy::Name, Page(page))
        .await?;
    Ok(json!({ "objects": objects }))
}

pub(crate) async fn run_fuzzy(
    service: &FacilityService,
    input: &str,
) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::to_value(service.fuzzy_search(input).await?)?)
}

pub(crate) async fn run_distinct(
    service: &FacilityService,
    field: TagField,
) -> anyhow::Result<serde_json::Value> {
    let values = service.distinct_values(field).await?;
    Ok(serde_json::to_value(values.as_slice())?)
}

pub(crate) async fn run_show(service: &FacilityService, raw_id: &str) -> anyhow::Result<serde_json::Value> {
    let id = parse_facility_id(raw_id)?;
    Ok(serde_json::to_value(service.get_facility(id).await?)?)
}
