//! Integration tests for `DataForSeoClient` using wiremock HTTP mocks.

use aioscan_core::ProviderCredentials;
use aioscan_dataforseo::{
    parse_ranked_keywords, DataForSeoClient, DataForSeoError, RankedKeywordsQuery,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v3/dataforseo_labs/google/ranked_keywords/live";

fn test_client(base_url: &str) -> DataForSeoClient {
    let credentials = ProviderCredentials {
        login: "user".to_string(),
        password: "secret".to_string(),
    };
    DataForSeoClient::with_base_url(credentials, 5, base_url)
        .expect("client construction should not fail")
}

fn ok_body() -> serde_json::Value {
    serde_json::json!({
        "version": "0.1.20240801",
        "status_code": 20000,
        "status_message": "Ok.",
        "tasks": [{
            "status_code": 20000,
            "status_message": "Ok.",
            "result": [{
                "target": "example.com",
                "location_code": 2840,
                "language_code": "en",
                "total_count": 2,
                "items_count": 2,
                "items": [
                    {
                        "keyword_data": {
                            "keyword": "how to brew coffee",
                            "keyword_info": { "search_volume": 1000 },
                            "search_intent_info": { "main_intent": "informational" },
                            "serp_info": { "serp_item_types": ["ai_overview", "organic"] }
                        },
                        "ranked_serp_element": {
                            "serp_item": { "rank_absolute": 1, "etv": 310.4 }
                        }
                    },
                    {
                        "keyword_data": {
                            "keyword": "buy coffee beans",
                            "keyword_info": { "search_volume": 400 },
                            "search_intent_info": { "main_intent": "transactional" },
                            "serp_info": { "serp_item_types": ["organic", "shopping"] }
                        },
                        "ranked_serp_element": {
                            "serp_item": { "rank_absolute": 9, "etv": 4.5 }
                        }
                    }
                ]
            }]
        }]
    })
}

#[tokio::test]
async fn ranked_keywords_posts_task_with_basic_auth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        // base64("user:secret")
        .and(header("authorization", "Basic dXNlcjpzZWNyZXQ="))
        .and(body_json(serde_json::json!([{
            "target": "example.com",
            "location_code": 2840,
            "language_code": "en",
            "limit": 50
        }])))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let payload = client
        .ranked_keywords("example.com")
        .await
        .expect("should fetch payload");

    let parsed = parse_ranked_keywords(&payload);
    assert_eq!(parsed.keywords.len(), 2);
    assert_eq!(parsed.keywords[0].keyword, "how to brew coffee");
    assert_eq!(parsed.keywords[0].etv, 310);
    assert!(parsed.keywords[0].has_ai_overview);
    assert_eq!(parsed.stats.with_overview, 1);
    assert_eq!(parsed.stats.overview_search_volume, 1000);
}

#[tokio::test]
async fn custom_query_is_sent_in_task_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_json(serde_json::json!([{
            "target": "example.org",
            "location_code": 2826,
            "language_code": "de",
            "limit": 10
        }])))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri()).with_query(RankedKeywordsQuery {
        location_code: 2826,
        language_code: "de".to_string(),
        limit: 10,
    });
    client
        .ranked_keywords("example.org")
        .await
        .expect("custom query should match");
}

#[tokio::test]
async fn non_2xx_surfaces_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream maintenance"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .ranked_keywords("example.com")
        .await
        .expect_err("should fail on 503");

    match err {
        DataForSeoError::HttpStatus { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "upstream maintenance");
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn envelope_error_status_is_a_fetch_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status_code": 40200,
            "status_message": "Payment Required.",
            "tasks": []
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .ranked_keywords("example.com")
        .await
        .expect_err("should fail on provider status");

    assert!(
        matches!(
            err,
            DataForSeoError::ApiError { status_code: 40200, ref message } if message == "Payment Required."
        ),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn non_json_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .ranked_keywords("example.com")
        .await
        .expect_err("should fail on html body");

    assert!(matches!(err, DataForSeoError::Deserialize { .. }));
}

#[tokio::test]
async fn task_level_error_is_an_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status_code": 20000,
            "status_message": "Ok.",
            "tasks": [{ "status_code": 40501, "status_message": "Invalid Field.", "result": null }]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .ranked_keywords("example.com")
        .await
        .expect_err("task-level failure should surface");

    assert!(
        matches!(err, DataForSeoError::ApiError { status_code: 40501, .. }),
        "expected ApiError(40501), got: {err:?}"
    );
}
