//! End-to-end request instrumentation through the axum router.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use tower::ServiceExt;

use stockwatch_core::metrics::exposition;
use stockwatch_gateway::{
    app_state::AppState,
    config,
    obs::metrics::{ERRORS_TOTAL, PROVIDER_DURATION, REQUESTS_TOTAL, REQUEST_LATENCY, SYMBOL_REQUESTS},
    router::build_router,
};

const FIXTURES: &str = r#"
version: 1
provider:
  fixtures:
    - ticker: AAPL
      bars:
        - { date: "2024-04-30", open: 173.3, high: 174.9, low: 170.0, close: 170.3, volume: 65934800 }
        - { date: "2024-05-01", open: 169.6, high: 172.7, low: 169.1, close: 169.3, volume: 50383100 }
      dividends:
        - { date: "2024-02-09", amount: 0.24 }
      options:
        - expiration: "2024-06-21"
          calls:
            - { strike: 190.0, last_price: 4.1, bid: 4.0, ask: 4.2, volume: 120, open_interest: 900 }
        - expiration: "2024-07-19"
    - ticker: BAD
      fail: true
"#;

fn setup(yaml: &str) -> (Router, AppState) {
    let cfg = config::load_from_str(yaml).expect("config");
    let state = AppState::new(cfg).expect("state");
    (build_router(state.clone()), state)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    send(app, Method::GET, uri).await
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_are_all_counted() {
    let (app, state) = setup(FIXTURES);
    const N: usize = 200;

    let mut tasks = Vec::with_capacity(N);
    for _ in 0..N {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            get(&app, "/stock/AAPL/price").await.0
        }));
    }
    for t in tasks {
        assert_eq!(t.await.unwrap(), StatusCode::OK);
    }

    let snap = state.metrics().registry().snapshot();
    let route = ["GET /stock/:ticker/price"];
    assert_eq!(snap.counter(REQUESTS_TOTAL, &route), Some(N as f64));
    let latency = snap.histogram(REQUEST_LATENCY, &route).unwrap();
    assert_eq!(latency.count, N as u64);
    assert_eq!(latency.bucket(f64::INFINITY), Some(N as u64));
    assert_eq!(snap.counter(SYMBOL_REQUESTS, &["AAPL"]), Some(N as f64));
    assert_eq!(snap.histogram(PROVIDER_DURATION, &["history"]).unwrap().count, N as u64);
}

#[tokio::test]
async fn route_label_is_the_template() {
    let (app, _) = setup(FIXTURES);
    let (status, body) = get(&app, "/stock/aapl/price").await;
    assert_eq!(status, StatusCode::OK);
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["current_price"], 169.3);
    assert_eq!(v["volume"], 50383100);

    let (_, text) = get(&app, "/metrics").await;
    assert!(text.contains("market_data_requests_total{route=\"GET /stock/:ticker/price\"} 1\n"));
    assert!(!text.contains("route=\"GET /stock/aapl"));
    assert!(text.contains("stock_symbol_requests_total{symbol=\"AAPL\"} 1\n"));
}

#[tokio::test]
async fn failure_counts_one_error_and_passes_response_through() {
    let (app, state) = setup(FIXTURES);
    let (status, body) = get(&app, "/stock/BAD/dividends").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body,
        r#"{"code":"upstream","detail":"upstream: provider unavailable for BAD"}"#
    );

    let snap = state.metrics().registry().snapshot();
    assert_eq!(snap.counter(ERRORS_TOTAL, &["upstream"]), Some(1.0));
    assert_eq!(snap.family(ERRORS_TOTAL).unwrap().series.len(), 1);
    let route = ["GET /stock/:ticker/dividends"];
    assert_eq!(snap.counter(REQUESTS_TOTAL, &route), Some(1.0));
    assert_eq!(snap.histogram(REQUEST_LATENCY, &route).unwrap().count, 1);
}

#[tokio::test]
async fn success_records_no_error() {
    let (app, state) = setup(FIXTURES);
    assert_eq!(get(&app, "/").await.0, StatusCode::OK);
    assert_eq!(get(&app, "/stock/AAPL/dividends").await.0, StatusCode::OK);
    assert_eq!(get(&app, "/stock/AAPL/historical?period=5d").await.0, StatusCode::OK);

    let snap = state.metrics().registry().snapshot();
    assert!(snap.family(ERRORS_TOTAL).unwrap().series.is_empty());
    assert_eq!(snap.counter(REQUESTS_TOTAL, &["GET /"]), Some(1.0));
}

#[tokio::test]
async fn bad_query_and_unknown_route_are_classified() {
    let (app, state) = setup(FIXTURES);

    let (status, body) = get(&app, "/stock/AAPL/historical?interval=7d").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("\"code\":\"bad_request\""));

    let (status, _) = get(&app, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let snap = state.metrics().registry().snapshot();
    assert_eq!(snap.counter(ERRORS_TOTAL, &["bad_request"]), Some(1.0));
    assert_eq!(snap.counter(ERRORS_TOTAL, &["not_found"]), Some(1.0));
    assert_eq!(snap.counter(REQUESTS_TOTAL, &["GET unmatched"]), Some(1.0));
}

#[tokio::test]
async fn client_chosen_methods_do_not_grow_the_registry() {
    let (app, state) = setup(FIXTURES);
    for i in 0..100 {
        let method = Method::from_bytes(format!("X{i}").as_bytes()).unwrap();
        send(&app, method.clone(), "/nope").await;
        send(&app, method, "/healthz").await;
    }

    let snap = state.metrics().registry().snapshot();
    assert_eq!(snap.family(REQUESTS_TOTAL).unwrap().series.len(), 2);
    assert_eq!(snap.family(REQUEST_LATENCY).unwrap().series.len(), 2);
    assert_eq!(snap.counter(REQUESTS_TOTAL, &["OTHER unmatched"]), Some(100.0));
    assert_eq!(snap.counter(REQUESTS_TOTAL, &["OTHER /healthz"]), Some(100.0));
}

#[tokio::test]
async fn wrong_method_on_known_route_is_an_error() {
    let (app, state) = setup(FIXTURES);
    let (status, body) = send(&app, Method::POST, "/stock/AAPL/price").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body.contains("\"code\":\"method_not_allowed\""));

    let snap = state.metrics().registry().snapshot();
    assert_eq!(snap.counter(ERRORS_TOTAL, &["method_not_allowed"]), Some(1.0));
    assert_eq!(
        snap.counter(REQUESTS_TOTAL, &["POST /stock/:ticker/price"]),
        Some(1.0)
    );
}

#[tokio::test]
async fn options_dates_and_empty_chain() {
    let (app, _) = setup(FIXTURES);

    let (status, body) = get(&app, "/stock/AAPL/options").await;
    assert_eq!(status, StatusCode::OK);
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["options_dates"], serde_json::json!(["2024-06-21", "2024-07-19"]));

    let (status, body) = get(&app, "/stock/AAPL/options?date=2024-06-21").await;
    assert_eq!(status, StatusCode::OK);
    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["calls"][0]["strike"], 190.0);

    let (status, _) = get(&app, "/stock/AAPL/options?date=2024-07-19").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn provider_timeout_is_recorded() {
    let yaml = r#"
version: 1
provider:
  timeout_ms: 100
  simulated_latency_ms: 400
  fixtures:
    - ticker: AAPL
"#;
    let (app, state) = setup(yaml);
    let (status, body) = get(&app, "/stock/AAPL/dividends").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body.contains("\"code\":\"timeout\""));

    let snap = state.metrics().registry().snapshot();
    assert_eq!(snap.counter(ERRORS_TOTAL, &["timeout"]), Some(1.0));
    let provider = snap.histogram(PROVIDER_DURATION, &["dividends"]).unwrap();
    assert_eq!(provider.count, 1);
    assert!(provider.sum >= 0.1 && provider.sum < 0.4);
}

#[tokio::test]
async fn symbol_labels_are_bounded() {
    let yaml = r#"
version: 1
metrics:
  symbols:
    max_tracked: 2
"#;
    let (app, state) = setup(yaml);
    for t in ["AAPL", "MSFT", "TSLA", "GOOG", "aapl", "%20"] {
        get(&app, &format!("/stock/{t}/dividends")).await;
    }

    let snap = state.metrics().registry().snapshot();
    assert_eq!(snap.counter(SYMBOL_REQUESTS, &["AAPL"]), Some(2.0));
    assert_eq!(snap.counter(SYMBOL_REQUESTS, &["MSFT"]), Some(1.0));
    assert_eq!(snap.counter(SYMBOL_REQUESTS, &["__other__"]), Some(2.0));
    assert_eq!(snap.counter(SYMBOL_REQUESTS, &["__invalid__"]), Some(1.0));
    assert_eq!(snap.family(SYMBOL_REQUESTS).unwrap().series.len(), 4);
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let (app, state) = setup(FIXTURES);
    get(&app, "/stock/AAPL/price").await;

    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        exposition::CONTENT_TYPE
    );
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    for name in [REQUESTS_TOTAL, REQUEST_LATENCY, ERRORS_TOTAL, PROVIDER_DURATION, SYMBOL_REQUESTS] {
        assert!(text.contains(&format!("# HELP {name} ")), "{name}");
    }
    assert!(text.contains("# TYPE market_data_request_latency_seconds histogram\n"));

    // Stable while nothing records.
    assert_eq!(state.metrics().render(), state.metrics().render());
}

#[tokio::test]
async fn readiness_follows_draining() {
    let (app, state) = setup(FIXTURES);
    assert_eq!(get(&app, "/healthz").await, (StatusCode::OK, "ok".to_string()));
    assert_eq!(get(&app, "/readyz").await.0, StatusCode::OK);
    state.set_draining();
    assert_eq!(
        get(&app, "/readyz").await,
        (StatusCode::SERVICE_UNAVAILABLE, "draining".to_string())
    );
}
