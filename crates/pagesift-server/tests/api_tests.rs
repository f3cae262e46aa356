mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use pagesift_core::quota::{QuotaRule, RuleScope};
use pagesift_core::testutil::MockFetcher;
use pagesift_server::settings::Environment;

use common::{build_app, dev_app, json_body, post_json, TEST_API_KEY};

const PAGE: &str = r#"<html><head><title>Example Domain</title></head><body>
    <div class="a">Hello world</div>
    <div class="b">Foo bar baz</div>
    <p>This paragraph has more than five words in it.</p>
    </body></html>"#;

#[tokio::test]
async fn health_returns_200() {
    let app = dev_app(MockFetcher::new());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["environment"], "development");
}

#[tokio::test]
async fn extract_returns_success_envelope() {
    let app = dev_app(MockFetcher::new().with_page("https://example.com/", PAGE));

    let response = post_json(
        app,
        "/api/v1/extract",
        serde_json::json!({"url": "https://example.com/"}),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["title"], "Example Domain");
    assert_eq!(json["data"]["metadata"]["extraction_mode"], "standard");
    assert_eq!(json["data"]["metadata"]["status_code"], 200);
    assert!(json["data"]["content"]
        .as_str()
        .unwrap()
        .contains("more than five words"));
}

#[tokio::test]
async fn selective_extraction_over_http() {
    let app = dev_app(MockFetcher::new().with_page("https://example.com/", PAGE));

    let response = post_json(
        app,
        "/api/v1/extract",
        serde_json::json!({
            "url": "https://example.com/",
            "config": {
                "selectors": [".a", ".b"],
                "return_sections": true
            }
        }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(
        json["data"]["content"],
        "[.a]\nHello world\n\n[.b]\nFoo bar baz"
    );
    assert_eq!(json["data"]["metadata"]["extraction_mode"], "selective");
    assert_eq!(json["data"]["metadata"]["total_sections"], 2);
    assert_eq!(
        json["data"]["metadata"]["sections"]["selector_1_.a"]["element_count"],
        1
    );
}

#[tokio::test]
async fn invalid_url_returns_400_error_envelope() {
    let app = dev_app(MockFetcher::new());

    let response = post_json(
        app,
        "/api/v1/extract",
        serde_json::json!({"url": "ftp://example.com/"}),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("http"));
    // Validation failures carry no guidance text.
    assert!(json.get("message").is_none());
}

#[tokio::test]
async fn conflicting_modes_return_400() {
    let app = dev_app(MockFetcher::new());

    let response = post_json(
        app,
        "/api/v1/extract",
        serde_json::json!({
            "url": "https://example.com/",
            "config": {
                "selectors": [".a"],
                "array_selectors": {"x": ".b"}
            }
        }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreachable_target_returns_503() {
    let app = dev_app(MockFetcher::new().with_failure("https://down.example.com/", "refused"));

    let response = post_json(
        app,
        "/api/v1/extract",
        serde_json::json!({"url": "https://down.example.com/"}),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["success"], false);
}

#[tokio::test]
async fn slow_target_returns_408() {
    let fetcher = MockFetcher::new().with_delayed_page(
        "https://slow.example.com/",
        PAGE,
        Duration::from_secs(5),
    );
    let app = dev_app(fetcher);

    let response = post_json(
        app,
        "/api/v1/extract",
        serde_json::json!({"url": "https://slow.example.com/"}),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn batch_preserves_order_and_isolates_failures() {
    let fetcher = MockFetcher::new()
        .with_delayed_page("https://example.com/p0", PAGE, Duration::from_millis(40))
        .with_failure("https://example.com/p1", "refused")
        .with_page("https://example.com/p2", PAGE);
    let app = dev_app(fetcher);

    let response = post_json(
        app,
        "/api/v1/extract/batch",
        serde_json::json!({
            "urls": ["https://example.com/p0", "https://example.com/p1", "https://example.com/p2"],
            "config": {"max_concurrent": 3}
        }),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    let data = &json["data"];
    assert_eq!(data["total_processed"], 3);
    assert_eq!(data["successful"], 2);
    assert_eq!(data["failed"], 1);
    let results = data["results"].as_array().unwrap();
    assert_eq!(results[0]["url"], "https://example.com/p0");
    assert_eq!(results[1]["url"], "https://example.com/p1");
    assert_eq!(results[2]["url"], "https://example.com/p2");
    assert_eq!(results[1]["success"], false);
    assert!(results[1]["data"].is_null());
    assert_eq!(results[0]["success"], true);
}

#[tokio::test]
async fn oversized_batch_returns_400() {
    let app = dev_app(MockFetcher::new());
    let urls: Vec<String> = (0..11).map(|i| format!("https://example.com/p{i}")).collect();

    let response = post_json(
        app,
        "/api/v1/extract/batch",
        serde_json::json!({"urls": urls}),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quota_denies_after_limit_with_headers() {
    let rules = vec![QuotaRule::new(
        RuleScope::Extract,
        3,
        Duration::from_secs(60),
    )];
    let fetcher = MockFetcher::new().with_page("https://example.com/", PAGE);
    let app = build_app(fetcher, Environment::Production, rules);

    for remaining in [2i64, 1, 0] {
        let response = post_json(
            app.clone(),
            "/api/v1/extract",
            serde_json::json!({"url": "https://example.com/"}),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "3");
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            remaining.to_string().as_str()
        );
    }

    let response = post_json(
        app,
        "/api/v1/extract",
        serde_json::json!({"url": "https://example.com/"}),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 60);

    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("use an API key"));
    assert_eq!(json["details"]["retry_after_seconds"], retry_after);
}

#[tokio::test]
async fn api_key_bypasses_quota() {
    let rules = vec![QuotaRule::new(
        RuleScope::Extract,
        1,
        Duration::from_secs(60),
    )];
    let fetcher = MockFetcher::new().with_page("https://example.com/", PAGE);
    let app = build_app(fetcher, Environment::Production, rules);

    for _ in 0..4 {
        let response = post_json(
            app.clone(),
            "/api/v1/extract",
            serde_json::json!({"url": "https://example.com/"}),
            Some(TEST_API_KEY),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        // Bypassed requests carry no rate-limit accounting.
        assert!(response.headers().get("x-ratelimit-limit").is_none());
    }
}

#[tokio::test]
async fn development_environment_is_not_limited() {
    let fetcher = MockFetcher::new().with_page("https://example.com/", PAGE);
    let app = dev_app(fetcher);

    for _ in 0..25 {
        let response = post_json(
            app.clone(),
            "/api/v1/extract",
            serde_json::json!({"url": "https://example.com/"}),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn quota_endpoint_reports_rules() {
    let app = build_app(
        MockFetcher::new(),
        Environment::Production,
        pagesift_core::quota::default_rules(),
    );

    let response = app
        .oneshot(Request::get("/api/v1/quota").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["enabled"], true);
    assert_eq!(json["data"]["bypassed"], false);
    let rules = json["data"]["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 4);
    assert_eq!(rules[0]["scope"], "global");
    assert_eq!(rules[0]["limit"], 100);
}
