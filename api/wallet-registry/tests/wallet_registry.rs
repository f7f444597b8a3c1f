use axum::Router;
use axum::body::{Body, to_bytes};
use http::Request;
use serde_json::{Value, json};
use tower::util::ServiceExt;
use wallet_registry::app::{AppState, build_router};
use wallet_registry::config::environment::AppConfig;

fn test_config() -> AppConfig {
    AppConfig {
        rust_env: "test".to_string(),
        api_host: "127.0.0.1".to_string(),
        api_port: 0,
        redis_url: None,
        cors_allowed_origins: vec!["http://localhost:3000".to_string()],
    }
}

fn test_app() -> Router {
    build_router(AppState::new(test_config(), None))
}

async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (http::StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(payload) => {
            builder = builder.header("content-type", "application/json");
            builder.body(Body::from(payload.to_string())).unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn create_then_get_is_case_insensitive() {
    let app = test_app();
    let (status, created) = send_json(
        app.clone(),
        "POST",
        "/wallets",
        Some(json!({"address": "0xAbC0000000000000000000000000000000000001", "label": "Node A"})),
    )
    .await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(
        created["address"],
        "0xabc0000000000000000000000000000000000001"
    );
    assert_eq!(created["label"], "Node A");
    assert_eq!(created["hasLicenses"], false);

    let (status, fetched) = send_json(
        app,
        "GET",
        "/wallets/0xABC0000000000000000000000000000000000001",
        None,
    )
    .await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(fetched["address"], created["address"]);
    assert_eq!(fetched["label"], "Node A");
}

#[tokio::test]
async fn create_rejects_duplicate_differing_only_in_case() {
    let app = test_app();
    let first = json!({"address": "0xdef0000000000000000000000000000000000002", "label": "first"});
    let second = json!({"address": "0xDEF0000000000000000000000000000000000002", "label": "second"});

    let (status, _) = send_json(app.clone(), "POST", "/wallets", Some(first)).await;
    assert_eq!(status, http::StatusCode::OK);

    let (status, body) = send_json(app, "POST", "/wallets", Some(second)).await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "DUPLICATE_ADDRESS");
}

#[tokio::test]
async fn create_rejects_missing_fields_and_bad_address() {
    let app = test_app();

    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/wallets",
        Some(json!({"address": "0xdef0000000000000000000000000000000000003", "label": ""})),
    )
    .await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "MISSING_FIELDS");

    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/wallets",
        Some(json!({"address": "0xdef0000000000000000000000000000000000003"})),
    )
    .await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "MISSING_FIELDS");

    let (status, body) = send_json(
        app,
        "POST",
        "/wallets",
        Some(json!({"address": "not-an-address", "label": "x"})),
    )
    .await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_ADDRESS");
}

#[tokio::test]
async fn concurrent_creates_for_same_address_register_once() {
    let app = test_app();
    let payload = json!({"address": "0xdef000000000000000000000000000000000000a", "label": "racer"});

    let (first, second) = tokio::join!(
        send_json(app.clone(), "POST", "/wallets", Some(payload.clone())),
        send_json(app.clone(), "POST", "/wallets", Some(payload)),
    );
    let statuses = [first.0, second.0];
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == http::StatusCode::OK)
            .count(),
        1
    );
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == http::StatusCode::BAD_REQUEST)
            .count(),
        1
    );

    let (status, listed) = send_json(app, "GET", "/wallets", None).await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn update_missing_wallet_returns_not_found() {
    let app = test_app();
    let (status, body) = send_json(
        app,
        "PUT",
        "/wallets/0x0000000000000000000000000000000000000009",
        Some(json!({"label": "ghost"})),
    )
    .await;
    assert_eq!(status, http::StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "WALLET_NOT_FOUND");
}

#[tokio::test]
async fn update_without_fields_is_rejected() {
    let app = test_app();
    let _ = send_json(
        app.clone(),
        "POST",
        "/wallets",
        Some(json!({"address": "0xdef0000000000000000000000000000000000004", "label": "n"})),
    )
    .await;

    let (status, body) = send_json(
        app,
        "PUT",
        "/wallets/0xdef0000000000000000000000000000000000004",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "NO_UPDATE_FIELDS");
}

#[tokio::test]
async fn update_changes_fields_and_bumps_updated_at() {
    let app = test_app();
    let (_, created) = send_json(
        app.clone(),
        "POST",
        "/wallets",
        Some(json!({"address": "0xdef0000000000000000000000000000000000005", "label": "before"})),
    )
    .await;

    let (status, updated) = send_json(
        app,
        "PUT",
        "/wallets/0xDEF0000000000000000000000000000000000005",
        Some(json!({"label": "after", "hasLicenses": true})),
    )
    .await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(updated["label"], "after");
    assert_eq!(updated["hasLicenses"], true);
    assert!(updated["updatedAt"].as_i64().unwrap() >= created["updatedAt"].as_i64().unwrap());
}

#[tokio::test]
async fn list_returns_registered_wallets() {
    let app = test_app();
    for (address, label) in [
        ("0xdef0000000000000000000000000000000000006", "one"),
        ("0xdef0000000000000000000000000000000000007", "two"),
    ] {
        let (status, _) = send_json(
            app.clone(),
            "POST",
            "/wallets",
            Some(json!({"address": address, "label": label})),
        )
        .await;
        assert_eq!(status, http::StatusCode::OK);
    }

    let (status, listed) = send_json(app, "GET", "/wallets", None).await;
    assert_eq!(status, http::StatusCode::OK);
    let wallets = listed.as_array().unwrap();
    assert_eq!(wallets.len(), 2);
    // Newest first; equal timestamps fall back to address ordering.
    let first_created = wallets[0]["createdAt"].as_i64().unwrap();
    let second_created = wallets[1]["createdAt"].as_i64().unwrap();
    assert!(first_created >= second_created);
}

#[tokio::test]
async fn init_db_is_idempotent() {
    let app = test_app();
    for _ in 0..2 {
        let (status, body) = send_json(app.clone(), "POST", "/init-db", None).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["message"], "database initialized successfully");
    }
}

#[tokio::test]
async fn health_reports_wallet_count() {
    let app = test_app();
    let _ = send_json(
        app.clone(),
        "POST",
        "/wallets",
        Some(json!({"address": "0xdef0000000000000000000000000000000000008", "label": "h"})),
    )
    .await;

    let (status, body) = send_json(app, "GET", "/wallets/health", None).await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["wallet_count"], 1);
}
