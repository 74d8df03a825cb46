use std::time::Duration;

use stampede_core::http::Error;
use stampede_core::{HttpClient, HttpRequest};
use stampede_testserver::{PRODUCT_IDS, TestServer, TestServerConfig};

#[tokio::test]
async fn cart_round_trip_against_mock_service() {
    let server = TestServer::start()
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    let base = server.base_url();
    let client = HttpClient::default();

    let product = PRODUCT_IDS[0];
    let add = HttpRequest::post(format!("{base}/api/cart/user-001/items"), Vec::new())
        .json(&serde_json::json!({ "product_id": product, "quantity": 2 }))
        .unwrap_or_else(|e| panic!("{e}"));
    let res = client.request(add).await.unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(res.status, 200);

    let cart: serde_json::Value = client
        .get(&format!("{base}/api/cart/user-001"))
        .await
        .and_then(|r| r.json())
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(cart["user_id"], "user-001");
    assert_eq!(cart["items"][0]["quantity"], 2);

    let total: serde_json::Value = client
        .get(&format!("{base}/api/cart/user-001/total"))
        .await
        .and_then(|r| r.json())
        .unwrap_or_else(|e| panic!("{e}"));
    assert!(total["total"].as_f64().is_some_and(|t| t > 0.0));

    let cleared = client
        .delete(&format!("{base}/api/cart/user-001/items"))
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    assert!(cleared.is_success());
    assert!(res.elapsed > Duration::ZERO);

    let missing = client
        .get(&format!("{base}/api/products/NOPE"))
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(missing.status, 404);
    assert!(!missing.is_success());
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = TestServer::start_with(
        TestServerConfig::default().with_latency(Duration::from_millis(300)),
    )
    .await
    .unwrap_or_else(|e| panic!("{e}"));

    let client = HttpClient::new(Duration::from_millis(50));
    match client.get(&format!("{}/", server.base_url())).await {
        Err(e) => assert!(e.is_timeout(), "{e}"),
        Ok(res) => panic!("expected timeout, got {}", res.status),
    }

    // A per-request timeout overrides the client default.
    let req = HttpRequest::get(format!("{}/", server.base_url())).timeout(Duration::from_secs(5));
    let res = client.request(req).await.unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(res.status, 200);
    assert!(res.elapsed >= Duration::from_millis(300));

    assert!(matches!(
        client.get("https://example.com/").await,
        Err(Error::OnlyHttpSupported(_))
    ));
}
