//! Integration tests for search mining: pagination, fan-out, and the
//! hit-count probe.

use std::sync::Arc;

use ia_miner::mine::{ResponseCallback, SearchOptions};
use ia_miner::{CredentialBundle, Miner, MinerOptions, ResponseHandler};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;

async fn mount_rate_limit(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/metadata/iamine-rate-limiter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": { "rate_per_second": 0 }
        })))
        .mount(server)
        .await;
}

fn options(server: &MockServer) -> MinerOptions {
    MinerOptions {
        workers: 4,
        retries: 0,
        hosts: vec![server.address().to_string()],
        ..MinerOptions::default()
    }
}

/// A probe response advertising `num_found` total hits.
fn probe_body(num_found: u64) -> Value {
    json!({
        "responseHeader": { "status": 0, "QTime": 5 },
        "response": { "numFound": num_found, "docs": [] }
    })
}

#[tokio::test]
async fn test_search_fetches_every_page() {
    let Some(server) = support::mock_server().await else {
        return;
    };
    mount_rate_limit(&server).await;

    // Probe: rows=0 reports 2500 hits.
    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("rows", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(probe_body(2500)))
        .expect(1)
        .mount(&server)
        .await;

    // 2500 hits at 500 per page plans 6 pages (a final partial page is
    // always fetched).
    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("rows", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "docs": [] }
        })))
        .expect(6)
        .mount(&server)
        .await;

    let miner = Miner::connect(&CredentialBundle::new(), options(&server))
        .await
        .expect("connect should succeed");
    let search_options = SearchOptions {
        rows: 500,
        ..SearchOptions::default()
    };
    let stats = miner
        .search(Some("collection:nasa"), &search_options, None)
        .await
        .expect("search should succeed");
    assert_eq!(stats.completed(), 6);
}

#[tokio::test]
async fn test_search_with_zero_hits_schedules_nothing() {
    let Some(server) = support::mock_server().await else {
        return;
    };
    mount_rate_limit(&server).await;

    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("rows", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(probe_body(0)))
        .expect(1)
        .mount(&server)
        .await;

    let miner = Miner::connect(&CredentialBundle::new(), options(&server))
        .await
        .expect("connect should succeed");
    let stats = miner
        .search(Some("identifier:does-not-exist"), &SearchOptions::default(), None)
        .await
        .expect("search should succeed");
    assert_eq!(stats.total(), 0);
}

#[tokio::test]
async fn test_unfiltered_search_gets_default_query_and_stable_sort() {
    let Some(server) = support::mock_server().await else {
        return;
    };
    mount_rate_limit(&server).await;

    // The probe only matches when the default query and forced sort are
    // present; a miss would 404 and fail the search.
    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("q", "all:1"))
        .and(query_param("sort[]", "identifier asc"))
        .and(query_param("rows", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(probe_body(0)))
        .expect(1)
        .mount(&server)
        .await;

    let miner = Miner::connect(&CredentialBundle::new(), options(&server))
        .await
        .expect("connect should succeed");
    let result = miner.search(None, &SearchOptions::default(), None).await;
    assert!(result.is_ok(), "unfiltered search failed: {result:?}");
}

#[tokio::test]
async fn test_mine_ids_fans_out_into_metadata_requests() {
    let Some(server) = support::mock_server().await else {
        return;
    };
    mount_rate_limit(&server).await;

    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("rows", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(probe_body(3)))
        .expect(1)
        .mount(&server)
        .await;

    // One page: three docs with identifiers, one without (skipped).
    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("page", "1"))
        .and(query_param("fl[0]", "identifier"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "docs": [
                { "identifier": "alpha" },
                { "identifier": "beta" },
                { "title": "no identifier here" },
                { "identifier": "gamma" },
            ] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    for id in ["alpha", "beta", "gamma"] {
        Mock::given(method("GET"))
            .and(path(format!("/metadata/{id}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "metadata": { "identifier": id } })),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ResponseCallback = Arc::new(move |response| {
        let sink = Arc::clone(&sink);
        Box::pin(async move {
            if let Ok(body) = response.json::<Value>().await {
                sink.lock().await.push(body);
            }
        })
    });

    let miner = Miner::connect(&CredentialBundle::new(), options(&server))
        .await
        .expect("connect should succeed");
    let search_options = SearchOptions {
        mine_ids: true,
        ..SearchOptions::default()
    };
    let stats = miner
        .search(
            Some("collection:nasa"),
            &search_options,
            Some(ResponseHandler::Callback(callback)),
        )
        .await
        .expect("search should succeed");

    // 1 page + 3 metadata fetches.
    assert_eq!(stats.completed(), 4);

    let seen = seen.lock().await;
    let mut ids: Vec<&str> = seen
        .iter()
        .filter_map(|v| v["metadata"]["identifier"].as_str())
        .collect();
    ids.sort_unstable();
    assert_eq!(
        ids,
        vec!["alpha", "beta", "gamma"],
        "caller handler must run on each item response"
    );
}

#[tokio::test]
async fn test_search_info_returns_header_and_hit_count() {
    let Some(server) = support::mock_server().await else {
        return;
    };
    mount_rate_limit(&server).await;

    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("rows", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(probe_body(1234)))
        .mount(&server)
        .await;

    let miner = Miner::connect(&CredentialBundle::new(), options(&server))
        .await
        .expect("connect should succeed");
    let info = miner
        .search_info(Some("collection:nasa"), &SearchOptions::default())
        .await
        .expect("probe should succeed");

    assert_eq!(info.num_found, 1234);
    assert_eq!(info.header["numFound"], json!(1234));
    assert_eq!(info.header["status"], json!(0));
}

#[tokio::test]
async fn test_requested_fields_are_indexed_in_page_params() {
    let Some(server) = support::mock_server().await else {
        return;
    };
    mount_rate_limit(&server).await;

    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .and(query_param("rows", "0"))
        .and(query_param("fl[0]", "identifier"))
        .and(query_param("fl[1]", "title"))
        .respond_with(ResponseTemplate::new(200).set_body_json(probe_body(0)))
        .expect(1)
        .mount(&server)
        .await;

    let miner = Miner::connect(&CredentialBundle::new(), options(&server))
        .await
        .expect("connect should succeed");
    let search_options = SearchOptions {
        fields: vec!["identifier".to_string(), "title".to_string()],
        ..SearchOptions::default()
    };
    let result = miner
        .search(Some("collection:nasa"), &search_options, None)
        .await;
    assert!(result.is_ok(), "field params missing: {result:?}");
}
