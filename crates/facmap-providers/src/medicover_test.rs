use std::collections::BTreeMap;

use serde_json::json;

use super::*;
use crate::fetch::StaticFetcher;

fn config(delay_ms: u64) -> MedicoverConfig {
    MedicoverConfig {
        enabled: true,
        base_url: "https://medicover.test/search?lang=pl".to_owned(),
        request_delay_ms: delay_ms,
        cards: vec![
            MedicoverCard {
                name: "Sport".to_owned(),
                category_vid: 11,
            },
            MedicoverCard {
                name: "Plus".to_owned(),
                category_vid: 12,
            },
        ],
        filters: BTreeMap::from([("5".to_owned(), "parking".to_owned())]),
    }
}

fn adapter() -> MedicoverAdapter {
    MedicoverAdapter::new(config(0))
}

fn item(vid: &str) -> serde_json::Value {
    json!({
        "vid": vid,
        "name": "Basen Miejski",
        "images": ["https://img.medicover.test/a.jpg"],
        "address": {
            "street": "Pływacka",
            "street_number": "4",
            "flat_number": "",
            "postalcode": "00-001",
            "city": "Warszawa",
            "district": "Mokotów"
        },
        "coordinates": {"lat": "52.2", "lon": "21.01"},
        "details": {
            "phone": "22 111 22 33",
            "mail": "basen@example.pl",
            "www": "basen.example.pl",
            "opening_hours": [
                {"day": "1", "start_hour": "08:00:00", "end_hour": "12:00:00"},
                {"day": "1", "start_hour": "14:00:00", "end_hour": "20:00:00"},
                {"day": 6, "start_hour": "00:00:00", "end_hour": "23:59:00"},
                {"day": "9", "start_hour": "08:00:00", "end_hour": "09:00:00"}
            ]
        },
        "services": [{"name": "basen"}, {"name": "sauna"}, {"name": "basen"}],
        "description": "Kryty basen",
        "aspects": [{"id": 5}, {"id": 77}]
    })
}

#[test]
fn accepts_a_complete_item() {
    assert_eq!(adapter().validate(&RawItem::tagged(item("v1"), "Sport")), Ok(()));
}

#[test]
fn rejects_malformed_items() {
    let mutations: [(&str, serde_json::Value); 5] = [
        ("vid", json!(17)),
        ("name", json!("")),
        ("images", json!("a.jpg")),
        ("services", json!({"name": "basen"})),
        ("coordinates", json!({"lat": "north", "lon": "21.0"})),
    ];
    for (key, bad) in mutations {
        let mut value = item("v1");
        value[key] = bad;
        assert!(
            adapter().validate(&RawItem::new(value)).is_err(),
            "{key} should be rejected"
        );
    }

    let mut no_city = item("v1");
    no_city["address"] = json!({"street": "Pływacka"});
    assert!(adapter().validate(&RawItem::new(no_city)).is_err());
}

#[test]
fn services_and_aspects_are_optional() {
    let mut value = item("v1");
    let object = value.as_object_mut().expect("object");
    object.remove("services");
    object.remove("aspects");
    let raw = RawItem::tagged(value, "Sport");

    assert!(adapter().validate(&raw).is_ok());
    let record = adapter().transform(&raw);
    assert!(record.service_types.is_empty());
    assert!(record.filters.is_empty());
}

#[test]
fn transform_maps_every_field() {
    let record = adapter().transform(&RawItem::tagged(item("v1"), "Sport"));

    assert_eq!(record.name, "Basen Miejski");
    assert_eq!(record.sources, vec![Source::new(Provider::Medicover, "v1")]);
    assert_eq!(record.location, Location::new(52.2, 21.01));
    assert_eq!(record.street_name, "Pływacka");
    assert_eq!(record.street_number, "4");
    assert_eq!(record.postal_code, "00-001");
    assert_eq!(record.city, "Warszawa");
    assert_eq!(record.district, "Mokotów");
    assert_eq!(record.service_types, vec!["basen", "sauna"]);
    assert_eq!(record.filters, vec!["parking"]);
    assert_eq!(record.cards, vec!["Sport"]);
    assert_eq!(record.phone, "22 111 22 33");
    assert_eq!(record.email, "basen@example.pl");
    assert_eq!(record.website, "https://basen.example.pl");
    assert_eq!(record.fanpage, "");
    assert_eq!(record.description, "Kryty basen");
    assert_eq!(record.images, vec!["https://img.medicover.test/a.jpg"]);
    assert!(!record.seasonal);
}

#[test]
fn opening_hours_drop_seconds_and_join_ranges() {
    let record = adapter().transform(&RawItem::new(item("v1")));

    assert_eq!(record.open_hours.day(1), Some("08:00 - 12:00, 14:00 - 20:00"));
    assert_eq!(record.open_hours.day(2), Some(""));
    assert_eq!(record.open_hours.day(6), Some("00:00 - 23:59"));
    assert!(record.open24h);
}

#[test]
fn no_all_day_range_means_not_open24h() {
    let mut value = item("v1");
    value["details"]["opening_hours"] = json!([
        {"day": "1", "start_hour": "00:00:00", "end_hour": "22:00:00"}
    ]);
    assert!(!adapter().transform(&RawItem::new(value)).open24h);
}

#[test]
fn hour_minute_strips_only_seconds() {
    assert_eq!(hour_minute("08:30:00"), "08:30");
    assert_eq!(hour_minute("08:30"), "08:30");
}

#[test]
fn aggregation_appends_cards_of_later_sightings() {
    let adapter = adapter();
    let records = vec![
        adapter.transform(&RawItem::tagged(item("v1"), "Sport")),
        adapter.transform(&RawItem::tagged(item("v2"), "Sport")),
        adapter.transform(&RawItem::tagged(item("v1"), "Plus")),
    ];

    let aggregated = adapter.aggregate(records);

    assert_eq!(aggregated.len(), 2);
    assert_eq!(aggregated[0].sources[0].external_id, "v1");
    assert_eq!(aggregated[0].cards, vec!["Sport", "Plus"]);
    assert_eq!(aggregated[1].cards, vec!["Sport"]);
}

#[tokio::test]
async fn fetch_issues_one_request_per_card_in_order() {
    let fetcher = StaticFetcher::new()
        .with("medicover-card-Sport", json!({"items": [item("v1"), item("v2")]}))
        .with("medicover-card-Plus", json!({"items": [item("v1")]}));

    let items = adapter().fetch(&fetcher).await.unwrap();

    let urls: Vec<String> = fetcher.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            "https://medicover.test/search?lang=pl&category_vid=11",
            "https://medicover.test/search?lang=pl&category_vid=12",
        ]
    );
    let tags: Vec<Option<&str>> = items.iter().map(|i| i.tag.as_deref()).collect();
    assert_eq!(tags, vec![Some("Sport"), Some("Sport"), Some("Plus")]);
}

#[tokio::test]
async fn failing_card_is_skipped() {
    let fetcher = StaticFetcher::new()
        .failing("medicover-card-Sport")
        .with("medicover-card-Plus", json!({"items": [item("v1")]}));

    let items = adapter().fetch(&fetcher).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].tag.as_deref(), Some("Plus"));
}

#[tokio::test]
async fn every_card_failing_fails_the_provider() {
    let fetcher = StaticFetcher::new()
        .failing("medicover-card-Sport")
        .failing("medicover-card-Plus");

    let err = adapter().fetch(&fetcher).await.unwrap_err();
    assert!(matches!(err, ProviderError::UnexpectedStatus { status: 503, .. }));
}

#[tokio::test]
async fn consecutive_card_fetches_are_paced() {
    let fetcher = StaticFetcher::new()
        .with("medicover-card-Sport", json!({"items": []}))
        .with("medicover-card-Plus", json!({"items": []}));
    let started = tokio::time::Instant::now();

    MedicoverAdapter::new(config(40)).fetch(&fetcher).await.unwrap();

    assert!(started.elapsed() >= std::time::Duration::from_millis(40));
}

/// Answers every card after a fixed latency and records when each request
/// started and finished.
struct SlowFetcher {
    latency: std::time::Duration,
    spans: std::sync::Mutex<Vec<(tokio::time::Instant, tokio::time::Instant)>>,
}

#[async_trait]
impl RawFetcher for SlowFetcher {
    async fn fetch(&self, _request: &FetchRequest) -> Result<serde_json::Value, ProviderError> {
        let start = tokio::time::Instant::now();
        tokio::time::sleep(self.latency).await;
        self.spans
            .lock()
            .expect("spans lock")
            .push((start, tokio::time::Instant::now()));
        Ok(json!({"items": []}))
    }
}

#[tokio::test]
async fn delay_is_honored_after_a_slow_card_fetch() {
    let fetcher = SlowFetcher {
        latency: std::time::Duration::from_millis(150),
        spans: std::sync::Mutex::new(Vec::new()),
    };

    MedicoverAdapter::new(config(100)).fetch(&fetcher).await.unwrap();

    let spans = fetcher.spans.lock().expect("spans lock").clone();
    assert_eq!(spans.len(), 2);
    let gap = spans[1].0 - spans[0].1;
    assert!(
        gap >= std::time::Duration::from_millis(100),
        "next card started {gap:?} after the previous one finished"
    );
}

#[tokio::test]
async fn invalid_items_are_counted_per_card() {
    let fetcher = StaticFetcher::new()
        .with("medicover-card-Sport", json!({"items": [item("v1"), {"vid": "x1"}]}))
        .with("medicover-card-Plus", json!({"items": [{"vid": "x2"}, {"name": "No vid"}]}));

    let run = crate::adapter::run_adapter(&adapter(), &fetcher).await.unwrap();

    assert_eq!(run.report.invalid, 3);
    assert_eq!(
        run.report.invalid_by_tag,
        BTreeMap::from([("Plus".to_owned(), 2), ("Sport".to_owned(), 1)])
    );
    assert_eq!(run.report.emitted, 1);
}
