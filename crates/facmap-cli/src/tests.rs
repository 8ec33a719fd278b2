use std::sync::Arc;

use facmap_core::{CanonicalFacility, Location, Provider, Source};
use facmap_db::{FacilityStore, MemoryStore};

use super::*;

fn selection_args(bounds: &str) -> SelectionArgs {
    SelectionArgs {
        bounds: bounds.to_string(),
        name: None,
        cards: Vec::new(),
        filters: Vec::new(),
        service_types: Vec::new(),
    }
}

async fn service() -> FacilityService {
    let store = MemoryStore::new();
    let mut pool = CanonicalFacility::new(
        "Baseny Miejskie",
        Source::new(Provider::Multisport, "1"),
        Location::new(52.23, 21.01),
    );
    pool.cards = vec!["Classic".to_string()];
    let clinic = CanonicalFacility::new(
        "Centrum Medyczne",
        Source::new(Provider::Medicover, "m1"),
        Location::new(50.06, 19.94),
    );
    store.replace_all(vec![pool, clinic]).await.expect("seed");
    let store: Arc<dyn FacilityStore> = Arc::new(store);
    FacilityService::new(store)
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["facmap-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_ingest_with_cache_mode() {
    let cli = Cli::try_parse_from(["facmap-cli", "ingest", "--dry-run", "--cache", "read"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Ingest {
            dry_run: true,
            cache: Some(FetchCacheMode::Read)
        })
    ));
}

#[test]
fn ingest_defaults_to_configured_cache() {
    let cli = Cli::try_parse_from(["facmap-cli", "ingest"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Ingest {
            dry_run: false,
            cache: None
        })
    ));
}

#[test]
fn rejects_unknown_cache_mode() {
    assert!(Cli::try_parse_from(["facmap-cli", "ingest", "--cache", "sometimes"]).is_err());
}

#[test]
fn parses_search_with_repeated_tags() {
    let cli = Cli::try_parse_from([
        "facmap-cli",
        "search",
        "--bounds",
        "-10,14,55,24.5",
        "--card",
        "Classic",
        "--card",
        "Plus",
        "--service-type",
        "basen",
        "--page",
        "2",
    ])
    .expect("expected valid cli args");

    let Some(Commands::Search { selection, page }) = cli.command else {
        panic!("expected search command");
    };
    assert_eq!(page, 2);
    assert_eq!(selection.bounds, "-10,14,55,24.5");
    assert_eq!(selection.cards, vec!["Classic", "Plus"]);
    assert_eq!(selection.service_types, vec!["basen"]);
}

#[test]
fn parses_distinct_field() {
    let cli = Cli::try_parse_from(["facmap-cli", "distinct", "service-types"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Distinct {
            field: TagField::ServiceTypes
        })
    ));
    assert!(Cli::try_parse_from(["facmap-cli", "distinct", "colours"]).is_err());
}

#[test]
fn bounds_are_south_west_then_north_east() {
    let bounds = query::parse_bounds("49, 14, 55, 24.5").expect("bounds");
    assert_eq!(bounds.south_west, Location::new(49.0, 14.0));
    assert_eq!(bounds.north_east, Location::new(55.0, 24.5));
}

#[test]
fn malformed_bounds_are_rejected() {
    assert!(query::parse_bounds("49,14,55").is_err());
    assert!(query::parse_bounds("49,14,55,east").is_err());
    assert!(query::parse_bounds("55,24.5,49,14").is_err(), "corners swapped");
}

#[test]
fn selection_trims_name_and_dedups_tags() {
    let mut args = selection_args("49,14,55,24.5");
    args.name = Some("  ".to_string());
    args.cards = vec!["Plus".to_string(), "Plus".to_string()];

    let selection = query::build_selection(&args).expect("selection");
    assert!(selection.name.is_none());
    assert_eq!(selection.tags.cards, vec!["Plus"]);
}

#[tokio::test]
async fn map_and_search_emit_api_shaped_json() {
    let service = service().await;
    let mut args = selection_args("49,14,55,24.5");

    let map = query::run_map(&service, &args).await.expect("map");
    assert_eq!(map["objects"].as_array().expect("objects").len(), 2);

    args.cards = vec!["Classic".to_string()];
    let search = query::run_search(&service, &args, 0).await.expect("search");
    let objects = search["objects"].as_array().expect("objects");
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0]["name"], "Baseny Miejskie");
}

#[tokio::test]
async fn show_and_distinct_read_the_store() {
    let service = service().await;

    let shown = query::run_show(&service, "2").await.expect("show");
    assert_eq!(shown["name"], "Centrum Medyczne");
    assert!(query::run_show(&service, "abc").await.is_err());
    assert!(query::run_show(&service, "9").await.is_err());

    let cards = query::run_distinct(&service, TagField::Cards).await.expect("distinct");
    assert_eq!(cards, serde_json::json!(["Classic"]));
}

#[tokio::test]
async fn fuzzy_returns_suggestions() {
    let service = service().await;
    let hits = query::run_fuzzy(&service, "baseny").await.expect("fuzzy");
    assert_eq!(hits[0]["id"], 1);
    assert_eq!(query::run_fuzzy(&service, "   ").await.expect("fuzzy"), serde_json::json!([]));
}
