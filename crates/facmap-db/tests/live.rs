//! Live tests for the PostGIS store using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated database from the sqlx test
//! harness. They need a PostGIS-enabled `DATABASE_URL` and are ignored by
//! default; run them with `cargo test -p facmap-db -- --ignored`.

use facmap_core::{
    Bounds, CanonicalFacility, Location, OpenHours, OrderBy, Page, Provider, Selection, Source,
    TagField,
};
use facmap_db::{FacilityStore, PgFacilityStore};

fn rec(name: &str, lat: f64, lng: f64) -> CanonicalFacility {
    CanonicalFacility::new(
        name,
        Source::new(Provider::Multisport, name),
        Location::new(lat, lng),
    )
}

fn warsaw() -> Selection {
    Selection::new(Bounds::new(Location::new(53.0, 22.0), Location::new(52.0, 20.0)).expect("bounds"))
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostGIS-enabled DATABASE_URL"]
async fn replace_all_round_trips_records(pool: sqlx::PgPool) {
    let store = PgFacilityStore::new(pool);
    let mut record = rec("Siłownia Fit", 52.23, 21.012);
    record.cards = vec!["Classic".into()];
    record.open_hours = OpenHours::from_slots(["08:00 - 16:00"]);
    record
        .sources
        .push(Source::new(Provider::Medicover, "vid-9"));

    let outcome = store.replace_all(vec![record.clone()]).await.expect("replace");
    assert_eq!(outcome.written, 1);
    assert_eq!(outcome.generation, 1);

    let page = store
        .search(&warsaw(), OrderBy::Name, Page(0))
        .await
        .expect("search");
    assert_eq!(page.len(), 1);
    let stored = store
        .find_one(page[0].id)
        .await
        .expect("find")
        .expect("present");
    assert_eq!(stored.record, record);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostGIS-enabled DATABASE_URL"]
async fn replace_all_clears_previous_generation(pool: sqlx::PgPool) {
    let store = PgFacilityStore::new(pool);
    store
        .replace_all(vec![rec("A", 52.5, 21.0), rec("B", 52.5, 21.1)])
        .await
        .expect("first replace");
    let second = store
        .replace_all(vec![rec("C", 52.5, 21.0)])
        .await
        .expect("second replace");

    assert_eq!(second.generation, 2);
    assert_eq!(store.generation().await.expect("generation"), 2);
    let page = store
        .search(&warsaw(), OrderBy::Name, Page(0))
        .await
        .expect("search");
    let names: Vec<&str> = page.iter().map(|f| f.record.name.as_str()).collect();
    assert_eq!(names, vec!["C"]);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostGIS-enabled DATABASE_URL"]
async fn tag_containment_and_similarity_filters(pool: sqlx::PgPool) {
    let store = PgFacilityStore::new(pool);
    let mut pool_a = rec("Baseny Miejskie", 52.5, 21.0);
    pool_a.cards = vec!["Classic".into(), "Plus".into()];
    let mut pharmacy = rec("Apteka Centrum", 52.5, 21.0);
    pharmacy.cards = vec!["Classic".into()];
    store
        .replace_all(vec![pool_a, pharmacy])
        .await
        .expect("replace");

    let mut selection = warsaw();
    selection.tags.cards = vec!["Plus".into()];
    let carded = store
        .search(&selection, OrderBy::Name, Page(0))
        .await
        .expect("search");
    assert_eq!(carded.len(), 1);

    let mut named = warsaw();
    named.name = Some("baseny".into());
    let by_name = store
        .search(&named, OrderBy::Name, Page(0))
        .await
        .expect("search");
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].record.name, "Baseny Miejskie");

    let fuzzy = store.fuzzy("baseny", 0.3, 10).await.expect("fuzzy");
    assert_eq!(fuzzy.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires a PostGIS-enabled DATABASE_URL"]
async fn cluster_and_distinct_values(pool: sqlx::PgPool) {
    let store = PgFacilityStore::new(pool);
    let mut records = Vec::new();
    for i in 0..30_i32 {
        let mut r = rec(&format!("F{i}"), 52.1 + f64::from(i) * 0.02, 20.5 + f64::from(i % 5) * 0.2);
        r.filters = vec![format!("f{}", i % 3)];
        records.push(r);
    }
    store.replace_all(records).await.expect("replace");

    let groups = store.cluster(&warsaw(), 20).await.expect("cluster");
    assert!(groups.len() <= 20);
    let total: usize = groups.iter().map(|g| g.member_ids.len()).sum();
    assert_eq!(total, 30);

    let filters = store
        .distinct_values(TagField::Filters)
        .await
        .expect("distinct");
    assert_eq!(filters, vec!["f0", "f1", "f2"]);
}
