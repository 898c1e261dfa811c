//! Integration tests against a mock indexer and chain node.
//!
//! The mock indexer evaluates each query body over a saved fixture, so
//! filtering, ordering and paging behave like the real service.

use deal_indexer::{
    Bounds, CancellationToken, ClientConfig, ClientError, DealFilter, DealIndexerClient,
    DealStatus, FetchError, IntegrityError, ListingOrder, NormalizeError, OfferFilter,
    ProviderOrder, ProviderSearch, ProviderSummary, StatusFilter,
};
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

fn load_fixture<T: serde::de::DeserializeOwned>(path: &str) -> T {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../testdata");
    let full = root.join(path);
    let s =
        std::fs::read_to_string(&full).unwrap_or_else(|e| panic!("read {}: {}", full.display(), e));
    serde_json::from_str(&s).unwrap_or_else(|e| panic!("parse {}: {}", path, e))
}

fn client(server: &ServerGuard) -> DealIndexerClient {
    let mut config = ClientConfig::new(&format!("{}/rpc", server.url()), &server.url()).unwrap();
    config.retry_backoff_ms = 1;
    DealIndexerClient::new(config).unwrap()
}

fn reconciling_client(server: &ServerGuard, staleness_window_secs: u64) -> DealIndexerClient {
    let mut config = ClientConfig::new(&format!("{}/rpc", server.url()), &server.url())
        .unwrap()
        .with_market_address(&format!("0x{}", "fe".repeat(20)))
        .unwrap();
    config.retry_backoff_ms = 1;
    config.staleness_window_secs = staleness_window_secs;
    DealIndexerClient::new(config).unwrap()
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (number(a), number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a
            .as_str()
            .unwrap_or_default()
            .cmp(b.as_str().unwrap_or_default()),
    }
}

fn list(v: &Value) -> Vec<Value> {
    v.as_array().cloned().unwrap_or_default()
}

const OPERATORS: [&str; 7] = [
    "_contains_nocase",
    "_containsAny",
    "_containsAll",
    "_eq",
    "_not",
    "_gte",
    "_lte",
];

fn matches(item: &Value, key: &str, expected: &Value) -> bool {
    let (field, op) = OPERATORS
        .iter()
        .find_map(|op| key.strip_suffix(op).map(|f| (f, *op)))
        .unwrap_or_else(|| panic!("unknown filter {key}"));
    let actual = &item[field];
    match op {
        "_eq" => actual == expected,
        "_not" => actual != expected,
        "_gte" => compare(actual, expected) != Ordering::Less,
        "_lte" => compare(actual, expected) != Ordering::Greater,
        "_contains_nocase" => actual
            .as_str()
            .unwrap_or_default()
            .to_lowercase()
            .contains(&expected.as_str().unwrap_or_default().to_lowercase()),
        "_containsAny" => list(expected).iter().any(|e| list(actual).contains(e)),
        _ => list(expected).iter().all(|e| list(actual).contains(e)),
    }
}

/// What the indexer would answer for `query` over `items`.
fn evaluate(items: &[Value], query: &Value) -> Value {
    let mut selected: Vec<Value> = items
        .iter()
        .filter(|item| {
            query["where"]
                .as_object()
                .map(|w| w.iter().all(|(k, v)| matches(item, k, v)))
                .unwrap_or(true)
        })
        .cloned()
        .collect();
    let order = list(&query["orderBy"]);
    selected.sort_by(|a, b| {
        for key in &order {
            let field = key["field"].as_str().unwrap();
            let ord = compare(&a[field], &b[field]);
            let ord = if key["direction"] == "desc" {
                ord.reverse()
            } else {
                ord
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    let skip = query["skip"].as_u64().unwrap() as usize;
    let first = query["first"].as_u64().unwrap() as usize;
    let page: Vec<Value> = selected.into_iter().skip(skip).take(first).collect();
    json!({ "items": page })
}

async fn fake_collection(server: &mut ServerGuard, collection: &str, items: Vec<Value>) -> Mock {
    server
        .mock("POST", format!("/query/{collection}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |req| {
            let query: Value = serde_json::from_slice(req.body().unwrap()).unwrap();
            serde_json::to_vec(&evaluate(&items, &query)).unwrap()
        })
        .create_async()
        .await
}

fn ids(providers: &[ProviderSummary]) -> Vec<String> {
    providers.iter().map(|p| p.id.clone()).collect()
}

fn provider_id(digit: &str) -> String {
    format!("0x{}", digit.repeat(20))
}

#[tokio::test]
async fn effector_search_returns_matching_providers_newest_first() {
    let mut server = mockito::Server::new_async().await;
    let _m = fake_collection(&mut server, "providers", load_fixture("providers.json")).await;
    let client = client(&server);
    let found = client
        .list_providers(
            ProviderSearch::EffectorIds,
            Some("cid123"),
            ProviderOrder::CreatedAt,
            0,
            10,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(
        ids(&found),
        vec![provider_id("55"), provider_id("33"), provider_id("11")]
    );
}

#[tokio::test]
async fn pages_concatenate_to_the_full_listing() {
    let mut server = mockito::Server::new_async().await;
    let _m = fake_collection(&mut server, "providers", load_fixture("providers.json")).await;
    let client = client(&server);
    let cancel = CancellationToken::new();
    let full = client
        .list_providers(
            ProviderSearch::None,
            None,
            ProviderOrder::TotalComputeUnits,
            0,
            100,
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(full.len(), 5);

    let mut paged = Vec::new();
    let mut skip = 0;
    loop {
        let page = client
            .list_providers(
                ProviderSearch::None,
                None,
                ProviderOrder::TotalComputeUnits,
                skip,
                2,
                &cancel,
            )
            .await
            .unwrap();
        assert!(page.len() <= 2);
        if page.is_empty() {
            break;
        }
        skip += page.len() as u64;
        paged.extend(page);
    }
    assert_eq!(ids(&paged), ids(&full));
}

#[tokio::test]
async fn identical_calls_return_identical_order_with_id_tie_break() {
    let mut server = mockito::Server::new_async().await;
    let _m = fake_collection(&mut server, "providers", load_fixture("providers.json")).await;
    let client = client(&server);
    let cancel = CancellationToken::new();
    let call = || {
        client.list_providers(
            ProviderSearch::None,
            None,
            ProviderOrder::TotalComputeUnits,
            0,
            10,
            &cancel,
        )
    };
    let first = call().await.unwrap();
    let second = call().await.unwrap();
    assert_eq!(ids(&first), ids(&second));
    // 33 has 20 units; 11, 22 and 55 tie on 10 and fall back to id order.
    assert_eq!(
        ids(&first),
        vec![
            provider_id("33"),
            provider_id("11"),
            provider_id("22"),
            provider_id("55"),
            provider_id("44"),
        ]
    );
}

#[tokio::test]
async fn offer_listing_sorts_by_price_then_id() {
    let mut server = mockito::Server::new_async().await;
    let _m = fake_collection(&mut server, "offers", load_fixture("offers.json")).await;
    let client = client(&server);
    let filter = OfferFilter {
        effector_ids: Some(vec!["cid123".to_string()]),
        ..Default::default()
    };
    let offers = client
        .list_offers(
            &filter,
            0,
            10,
            ListingOrder::PricePerWorkerEpoch,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    let got: Vec<&str> = offers.iter().map(|o| &o.id[..4]).collect();
    assert_eq!(got, vec!["0xa2", "0xa1", "0xa3"]);
    assert_eq!(offers[0].min_price_per_worker_epoch, 0.25);
    assert_eq!(offers[0].effectors[0].cid, "cid123");
}

#[tokio::test]
async fn inverted_ranges_fail_without_network_calls() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let client = client(&server);
    let cancel = CancellationToken::new();

    let offers = OfferFilter {
        price_per_worker_epoch: Bounds::new(Some(2.0), Some(1.0)),
        ..Default::default()
    };
    let err = client
        .list_offers(&offers, 0, 10, ListingOrder::CreatedAt, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let deals = DealFilter {
        created_at: Bounds::new(Some(200), Some(100)),
        ..Default::default()
    };
    let err = client
        .list_deals(&deals, 0, 10, ListingOrder::CreatedAt, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let deals = DealFilter {
        terms: OfferFilter {
            collateral_per_worker: Bounds::new(Some(5.0), Some(0.5)),
            ..Default::default()
        },
        ..Default::default()
    };
    let err = client
        .list_deals(&deals, 0, 10, ListingOrder::CreatedAt, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    assert_eq!(client.request_count(), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn page_size_out_of_range_is_rejected() {
    let server = mockito::Server::new_async().await;
    let client = client(&server);
    for take in [0, 101] {
        let err = client
            .list_offers(
                &OfferFilter::default(),
                0,
                take,
                ListingOrder::CreatedAt,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }
}

#[tokio::test]
async fn absent_ids_are_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _lookups = server
        .mock("GET", Matcher::Regex(r"^/(providers|offers|deals)/".to_string()))
        .with_status(404)
        .expect(3)
        .create_async()
        .await;
    let _revenue = fake_collection(&mut server, "revenue", Vec::new()).await;
    let client = client(&server);
    let cancel = CancellationToken::new();

    let err = client
        .get_provider(&provider_id("99"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound { entity: "provider", .. }));
    let err = client
        .get_offer(&format!("0x{}", "99".repeat(32)), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound { entity: "offer", .. }));
    let err = client
        .get_deal(&provider_id("98"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound { entity: "deal", .. }));
}

#[tokio::test]
async fn malformed_ids_are_validation_errors() {
    let server = mockito::Server::new_async().await;
    let client = client(&server);
    let cancel = CancellationToken::new();
    let err = client.get_provider("not-an-id", &cancel).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    let err = client
        .list_offers_by_provider("0x12", StatusFilter::All, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn capacity_violation_surfaces_integrity_error() {
    let mut server = mockito::Server::new_async().await;
    let mut offers: Vec<Value> = load_fixture("offers.json");
    offers[1]["freeComputeUnits"] = json!(9);
    let _m = fake_collection(&mut server, "offers", offers).await;
    let client = client(&server);
    let err = client
        .list_offers(
            &OfferFilter::default(),
            0,
            10,
            ListingOrder::CreatedAt,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::DataIntegrity(IntegrityError::ComputeUnits { free: 9, total: 4, .. })
    ));
}

#[tokio::test]
async fn cancelled_token_makes_no_calls() {
    let mut server = mockito::Server::new_async().await;
    let post = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let get = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let client = client(&server);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client
        .list_providers(
            ProviderSearch::None,
            None,
            ProviderOrder::CreatedAt,
            0,
            10,
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    let err = client
        .get_provider(&provider_id("11"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));

    assert_eq!(client.request_count(), 0);
    post.assert_async().await;
    get.assert_async().await;
}

#[tokio::test]
async fn provider_listings_by_status_and_unknown_provider() {
    let mut server = mockito::Server::new_async().await;
    let _m = fake_collection(&mut server, "offers", load_fixture("offers.json")).await;
    let client = client(&server);
    let cancel = CancellationToken::new();

    let active = client
        .list_offers_by_provider(&provider_id("11"), StatusFilter::Active, &cancel)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert!(active[0].id.starts_with("0xa1"));

    let all = client
        .list_offers_by_provider(&provider_id("11"), StatusFilter::All, &cancel)
        .await
        .unwrap();
    let got: Vec<&str> = all.iter().map(|o| &o.id[..4]).collect();
    assert_eq!(got, vec!["0xa2", "0xa1"]);

    let none = client
        .list_offers_by_provider(&provider_id("77"), StatusFilter::All, &cancel)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn provider_details_include_revenue_per_token() {
    let mut server = mockito::Server::new_async().await;
    let id = provider_id("11");
    let _provider = server
        .mock("GET", format!("/providers/{id}").as_str())
        .with_status(200)
        .with_body(
            json!({
                "id": id,
                "name": "Alpha",
                "createdAt": "2023-11-14T22:13:20Z",
                "totalComputeUnits": 10,
                "freeComputeUnits": 2,
                "approved": true,
                "peerCount": 3,
                "effectorCount": 2
            })
            .to_string(),
        )
        .create_async()
        .await;
    let token = json!({
        "address": format!("0x{}", "cc".repeat(20)),
        "symbol": "USDC",
        "decimals": 6
    });
    let rows = vec![
        json!({ "provider": id, "paymentToken": token.clone(), "day": 1_699_920_000, "value": "1.25" }),
        json!({ "provider": id, "paymentToken": token.clone(), "day": 1_700_006_400, "value": "0.75" }),
        json!({ "provider": provider_id("22"), "paymentToken": token, "day": 1_700_006_400, "value": "9" }),
    ];
    let _revenue = fake_collection(&mut server, "revenue", rows).await;
    let client = client(&server);

    let provider = client
        .get_provider(&id, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(provider.created_at, 1_700_000_000);
    assert_eq!(provider.peer_count, 3);
    assert_eq!(provider.revenue.len(), 1);
    assert_eq!(provider.revenue[0].total, 2.0);
    assert_eq!(provider.revenue[0].by_days.len(), 2);
}

fn deal_body(id: &str, unit: &str, updated_at: i64) -> String {
    json!({
        "id": id,
        "owner": provider_id("0e"),
        "appCid": "bafy-app",
        "createdAt": 1_700_000_000,
        "updatedAt": updated_at,
        "minWorkers": 1,
        "targetWorkers": 2,
        "matchedWorkers": 1,
        "registeredWorkers": 1,
        "paymentToken": { "address": format!("0x{}", "cc".repeat(20)), "symbol": "FLT" },
        "pricePerWorkerEpoch": "0.1",
        "collateralPerWorker": "1",
        "totalPaidAmount": "3",
        "status": "active",
        "computeUnits": [
            { "id": unit, "collateral": "1", "workerId": null },
            { "id": unit, "collateral": "1", "workerId": null }
        ]
    })
    .to_string()
}

/// `getComputeUnit` answer: a bound worker and one whole token of collateral.
fn bound_unit_result() -> String {
    let worker = "ab".repeat(32);
    let collateral = format!("{:064x}", 10u128.pow(18));
    json!({ "jsonrpc": "2.0", "id": 1, "result": format!("0x{worker}{collateral}") }).to_string()
}

#[tokio::test]
async fn chain_disagreement_is_integrity_error() {
    let mut server = mockito::Server::new_async().await;
    let id = provider_id("d1");
    let unit = format!("0x{}", "c1".repeat(32));
    let _deal = server
        .mock("GET", format!("/deals/{id}").as_str())
        .with_status(200)
        .with_body(deal_body(&id, &unit, 1_700_000_000))
        .create_async()
        .await;
    let rpc = server
        .mock("POST", "/rpc")
        .match_body(Matcher::PartialJson(json!({ "method": "eth_call" })))
        .with_status(200)
        .with_body(bound_unit_result())
        .expect(1)
        .create_async()
        .await;
    let client = reconciling_client(&server, 60);

    let err = client
        .get_deal(&id, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::DataIntegrity(IntegrityError::SourceMismatch { field: "workerId", .. })
    ));
    rpc.assert_async().await;
}

#[tokio::test]
async fn chain_wins_for_recently_updated_deal() {
    let mut server = mockito::Server::new_async().await;
    let id = provider_id("d2");
    let unit = format!("0x{}", "c2".repeat(32));
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    let _deal = server
        .mock("GET", format!("/deals/{id}").as_str())
        .with_status(200)
        .with_body(deal_body(&id, &unit, now))
        .create_async()
        .await;
    let rpc = server
        .mock("POST", "/rpc")
        .with_status(200)
        .with_body(bound_unit_result())
        .expect(1)
        .create_async()
        .await;
    let client = reconciling_client(&server, 3600);

    let deal = client.get_deal(&id, &CancellationToken::new()).await.unwrap();
    assert_eq!(deal.status, DealStatus::Active);
    assert_eq!(deal.compute_units.len(), 2);
    for unit in &deal.compute_units {
        assert_eq!(unit.worker_id, Some(format!("0x{}", "ab".repeat(32))));
        assert_eq!(unit.collateral, 1.0);
    }
    rpc.assert_async().await;
}

#[tokio::test]
async fn indexer_alone_without_market_address() {
    let mut server = mockito::Server::new_async().await;
    let id = provider_id("d3");
    let unit = format!("0x{}", "c3".repeat(32));
    let _deal = server
        .mock("GET", format!("/deals/{id}").as_str())
        .with_status(200)
        .with_body(deal_body(&id, &unit, 1_700_000_000))
        .create_async()
        .await;
    let rpc = server
        .mock("POST", "/rpc")
        .expect(0)
        .create_async()
        .await;
    let client = client(&server);

    let deal = client.get_deal(&id, &CancellationToken::new()).await.unwrap();
    assert!(deal.compute_units.iter().all(|u| !u.is_bound()));
    assert_eq!(deal.total_paid_amount, 3.0);
    rpc.assert_async().await;
}

#[tokio::test]
async fn server_errors_surface_as_transport_after_retries() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/query/deals")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;
    let client = client(&server);
    let err = client
        .list_deals(
            &DealFilter::default(),
            0,
            10,
            ListingOrder::CreatedAt,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(err.is_retryable());
    mock.assert_async().await;
}

#[tokio::test]
async fn cancellation_interrupts_in_flight_request() {
    let mut server = mockito::Server::new_async().await;
    let _slow = server
        .mock("POST", "/query/providers")
        .with_body_from_request(|_| {
            std::thread::sleep(Duration::from_millis(1_000));
            json!({ "items": [] }).to_string().into()
        })
        .create_async()
        .await;
    let client = client(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = client
        .list_providers(
            ProviderSearch::None,
            None,
            ProviderOrder::CreatedAt,
            0,
            10,
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert!(started.elapsed() < Duration::from_millis(900));
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn provider_details_fail_when_revenue_fails() {
    let mut server = mockito::Server::new_async().await;
    let id = provider_id("11");
    let _provider = server
        .mock("GET", format!("/providers/{id}").as_str())
        .with_status(200)
        .with_body(
            json!({
                "id": id,
                "createdAt": 1_700_000_000,
                "totalComputeUnits": 10,
                "freeComputeUnits": 2
            })
            .to_string(),
        )
        .create_async()
        .await;
    let revenue = server
        .mock("POST", "/query/revenue")
        .with_status(500)
        .expect(3)
        .create_async()
        .await;
    let client = client(&server);

    let err = client
        .get_provider(&id, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(FetchError::Api(500, _))));
    revenue.assert_async().await;
}

#[tokio::test]
async fn deal_listing_applies_creation_window() {
    let mut server = mockito::Server::new_async().await;
    let _m = fake_collection(&mut server, "deals", load_fixture("deals.json")).await;
    let client = client(&server);
    let filter = DealFilter {
        created_at: Bounds::new(Some(1_700_002_000), Some(1_700_003_000)),
        ..Default::default()
    };
    let deals = client
        .list_deals(
            &filter,
            0,
            10,
            ListingOrder::CreatedAt,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    let got: Vec<&str> = deals.iter().map(|d| &d.id[..4]).collect();
    assert_eq!(got, vec!["0xd3", "0xd2"]);
    assert_eq!(deals[1].status, DealStatus::Ended);
    assert_eq!(deals[0].balance, 10.0);
    assert_eq!(deals[0].offer_id, Some(format!("0x{}", "a3".repeat(32))));

    let open_ended = DealFilter {
        created_at: Bounds::new(Some(1_700_003_500), None),
        ..Default::default()
    };
    let deals = client
        .list_deals(
            &open_ended,
            0,
            10,
            ListingOrder::CreatedAt,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(deals.len(), 1);
    assert!(deals[0].id.starts_with("0xd4"));
}

#[tokio::test]
async fn provider_deals_by_status() {
    let mut server = mockito::Server::new_async().await;
    let _m = fake_collection(&mut server, "deals", load_fixture("deals.json")).await;
    let client = client(&server);
    let cancel = CancellationToken::new();
    let prefixes = |deals: &[deal_indexer::DealSummary]| -> Vec<String> {
        deals.iter().map(|d| d.id[..4].to_string()).collect()
    };

    let all = client
        .list_deals_by_provider(&provider_id("11"), StatusFilter::All, &cancel)
        .await
        .unwrap();
    assert_eq!(prefixes(&all), vec!["0xd4", "0xd2", "0xd1"]);

    let active = client
        .list_deals_by_provider(&provider_id("11"), StatusFilter::Active, &cancel)
        .await
        .unwrap();
    assert_eq!(prefixes(&active), vec!["0xd1"]);

    let inactive = client
        .list_deals_by_provider(&provider_id("11"), StatusFilter::Inactive, &cancel)
        .await
        .unwrap();
    assert_eq!(prefixes(&inactive), vec!["0xd4", "0xd2"]);

    let none = client
        .list_deals_by_provider(&provider_id("77"), StatusFilter::All, &cancel)
        .await
        .unwrap();
    assert!(none.is_empty());
}

fn unit_id(byte: &str) -> String {
    format!("0x{}", byte.repeat(32))
}

fn worker_id() -> String {
    format!("0x{}", "ab".repeat(32))
}

/// Offer with two peers: the first holds a bound and an unbound unit, the
/// second one unbound unit. Collateral is two USDC per unit.
fn offer_body(id: &str) -> String {
    let unit = |id: String, worker: Option<String>| {
        json!({ "id": id, "collateral": "2", "workerId": worker })
    };
    json!({
        "id": id,
        "providerId": provider_id("11"),
        "name": "offer-1",
        "createdAt": 100,
        "updatedAt": 150,
        "minPricePerWorkerEpoch": "0.5",
        "maxCollateralPerWorker": "2",
        "paymentToken": { "address": format!("0x{}", "cc".repeat(20)), "symbol": "USDC", "decimals": 6 },
        "totalComputeUnits": 3,
        "freeComputeUnits": 2,
        "peers": [
            {
                "id": format!("0x{}", "b1".repeat(32)),
                "workerSlots": 2,
                "computeUnits": [
                    unit(unit_id("e1"), Some(worker_id())),
                    unit(unit_id("e2"), None)
                ]
            },
            {
                "id": format!("0x{}", "b2".repeat(32)),
                "workerSlots": 1,
                "computeUnits": [unit(unit_id("e3"), None)]
            }
        ]
    })
    .to_string()
}

/// Chain node answering `getComputeUnit` from `units`, keyed by the unit id
/// hex without `0x`: (worker hex or zero, collateral in base units).
async fn chain_node(
    server: &mut ServerGuard,
    units: HashMap<String, (String, u128)>,
    calls: usize,
) -> Mock {
    server
        .mock("POST", "/rpc")
        .match_body(Matcher::PartialJson(json!({ "method": "eth_call" })))
        .with_body_from_request(move |req| {
            let body: Value = serde_json::from_slice(req.body().unwrap()).unwrap();
            let data = body["params"][0]["data"].as_str().unwrap();
            let (worker, collateral) = &units[&data[10..]];
            let result = format!("0x{worker}{collateral:064x}");
            json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string().into()
        })
        .expect(calls)
        .create_async()
        .await
}

#[tokio::test]
async fn offer_details_without_chain() {
    let mut server = mockito::Server::new_async().await;
    let id = unit_id("a1");
    let _offer = server
        .mock("GET", format!("/offers/{id}").as_str())
        .with_status(200)
        .with_body(offer_body(&id))
        .create_async()
        .await;
    let rpc = server.mock("POST", "/rpc").expect(0).create_async().await;
    let client = client(&server);

    let offer = client.get_offer(&id, &CancellationToken::new()).await.unwrap();
    assert_eq!(offer.summary.id, id);
    assert_eq!(offer.peers.len(), 2);
    assert!(offer.peers.iter().all(|p| p.offer_id == id));
    assert_eq!(offer.peers[0].compute_units[0].worker_id, Some(worker_id()));
    assert_eq!(offer.peers[1].compute_units[0].collateral, 2.0);
    rpc.assert_async().await;
}

#[tokio::test]
async fn offer_details_confirmed_on_chain_across_peers() {
    let mut server = mockito::Server::new_async().await;
    let id = unit_id("a1");
    let _offer = server
        .mock("GET", format!("/offers/{id}").as_str())
        .with_status(200)
        .with_body(offer_body(&id))
        .create_async()
        .await;
    let zero = "00".repeat(32);
    let units = HashMap::from([
        ("e1".repeat(32), ("ab".repeat(32), 2_000_000)),
        ("e2".repeat(32), (zero.clone(), 2_000_000)),
        ("e3".repeat(32), (zero, 2_000_000)),
    ]);
    let rpc = chain_node(&mut server, units, 3).await;
    let client = reconciling_client(&server, 0);

    let offer = client.get_offer(&id, &CancellationToken::new()).await.unwrap();
    assert_eq!(offer.compute_units().count(), 3);
    assert!(offer.peers[0].compute_units[0].is_bound());
    assert!(!offer.peers[1].compute_units[0].is_bound());
    rpc.assert_async().await;
}

#[tokio::test]
async fn offer_disagreement_on_second_peer_is_integrity_error() {
    let mut server = mockito::Server::new_async().await;
    let id = unit_id("a1");
    let _offer = server
        .mock("GET", format!("/offers/{id}").as_str())
        .with_status(200)
        .with_body(offer_body(&id))
        .create_async()
        .await;
    let zero = "00".repeat(32);
    let units = HashMap::from([
        ("e1".repeat(32), ("ab".repeat(32), 2_000_000)),
        ("e2".repeat(32), (zero, 2_000_000)),
        ("e3".repeat(32), ("cd".repeat(32), 2_000_000)),
    ]);
    let rpc = chain_node(&mut server, units, 3).await;
    let client = reconciling_client(&server, 0);

    let err = client
        .get_offer(&id, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        ClientError::DataIntegrity(IntegrityError::SourceMismatch { unit, field, .. }) => {
            assert_eq!(unit, unit_id("e3"));
            assert_eq!(field, "workerId");
        }
        other => panic!("unexpected {other:?}"),
    }
    rpc.assert_async().await;
}

#[tokio::test]
async fn chain_rpc_error_surfaces_as_transport() {
    let mut server = mockito::Server::new_async().await;
    let id = provider_id("d4");
    let unit = unit_id("c4");
    let _deal = server
        .mock("GET", format!("/deals/{id}").as_str())
        .with_status(200)
        .with_body(deal_body(&id, &unit, 1_700_000_000))
        .create_async()
        .await;
    let rpc = server
        .mock("POST", "/rpc")
        .with_status(200)
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "execution reverted" }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let client = reconciling_client(&server, 0);

    let err = client
        .get_deal(&id, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Transport(FetchError::Rpc { code: -32000, .. })
    ));
    assert!(!err.is_retryable());
    rpc.assert_async().await;
}

#[tokio::test]
async fn malformed_unit_id_from_indexer_is_integrity_error() {
    let mut server = mockito::Server::new_async().await;
    let id = provider_id("d5");
    let _deal = server
        .mock("GET", format!("/deals/{id}").as_str())
        .with_status(200)
        .with_body(deal_body(&id, "cu-7", 1_700_000_000))
        .create_async()
        .await;
    let rpc = server.mock("POST", "/rpc").expect(0).create_async().await;
    let client = reconciling_client(&server, 0);

    let err = client
        .get_deal(&id, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::DataIntegrity(IntegrityError::Field {
            entity: "compute unit",
            source: NormalizeError::InvalidId { .. },
            ..
        })
    ));
    rpc.assert_async().await;
}

#[tokio::test]
async fn mixed_case_ids_from_indexer_are_lowercased() {
    let mut server = mockito::Server::new_async().await;
    let id = provider_id("d6");
    let unit = format!("0x{}", "C6".repeat(32));
    let _deal = server
        .mock("GET", format!("/deals/{id}").as_str())
        .with_status(200)
        .with_body(deal_body(&id.to_uppercase().replacen("0X", "0x", 1), &unit, 1_700_000_000))
        .create_async()
        .await;
    let client = client(&server);

    let deal = client.get_deal(&id, &CancellationToken::new()).await.unwrap();
    assert_eq!(deal.id, id);
    assert_eq!(deal.compute_units[0].id, unit_id("c6"));
}
