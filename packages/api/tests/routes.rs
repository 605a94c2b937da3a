mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{ADMIN_TOKEN, STRIPE_SOURCE};
use relay_api::construct_router;
use relay_routing::{SignatureVerifier, SigningSecret};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
        .header("x-operator", "ops@crm.test");

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn register(app: &Router, processor_id: i32) -> String {
    let (status, body) = send(
        app,
        admin(
            "POST",
            "/api/v1/destinations",
            Some(json!({
                "processor_type": "stripe",
                "processor_id": processor_id,
                "routing_value": "acct_1",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["destination_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let ctx = common::context().await;
    let app = construct_router(ctx.state.clone());

    let (status, body) = send(
        &app,
        Request::get("/api/v1/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(
        &app,
        Request::get("/api/v1/health/db").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["rtt"].is_u64());
}

#[tokio::test]
async fn admin_routes_require_the_token() {
    let ctx = common::context().await;
    let app = construct_router(ctx.state.clone());

    let (status, body) = send(
        &app,
        Request::get("/api/v1/destinations").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(
        &app,
        Request::get("/api/v1/processors")
            .header(header::AUTHORIZATION, "Bearer wrong")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_api_is_closed_without_a_token() {
    let ctx = common::context_with(common::config_with(None)).await;
    let app = construct_router(ctx.state.clone());

    let (status, _) = send(&app, admin("GET", "/api/v1/destinations", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_list_get_and_delete_a_destination() {
    let ctx = common::context().await;
    let app = construct_router(ctx.state.clone());

    let destination_id = register(&app, ctx.stripe_processor).await;

    let (status, body) = send(&app, admin("GET", "/api/v1/destinations", None)).await;
    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["destination_id"], destination_id.as_str());
    assert_eq!(records[0]["created_by"], "ops@crm.test");
    assert!(records[0].get("signing_secret").is_none());

    let record_id = records[0]["id"].as_i64().unwrap();
    let (status, body) = send(
        &app,
        admin("GET", &format!("/api/v1/destinations/{record_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remote_status"], "active");
    assert_eq!(body["url"], "https://crm.test/webhook/stripe");
    assert_eq!(body["source_id"], STRIPE_SOURCE);

    let (status, body) = send(
        &app,
        admin("DELETE", &format!("/api/v1/destinations/{record_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, body) = send(
        &app,
        admin("DELETE", &format!("/api/v1/destinations/{record_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], false);
}

#[tokio::test]
async fn unknown_record_is_not_found() {
    let ctx = common::context().await;
    let app = construct_router(ctx.state.clone());

    let (status, body) = send(&app, admin("GET", "/api/v1/destinations/999", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn unsupported_processor_is_a_bad_request() {
    let ctx = common::context().await;
    let app = construct_router(ctx.state.clone());

    let (status, body) = send(
        &app,
        admin(
            "POST",
            "/api/v1/destinations",
            Some(json!({
                "processor_type": "paypal",
                "processor_id": ctx.stripe_processor,
                "routing_value": "acct_1",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("paypal"));
    assert_eq!(ctx.routing.total_calls(), 0);
}

#[tokio::test]
async fn routing_failures_are_bad_gateway() {
    let ctx = common::context().await;
    ctx.routing
        .fail_operation(relay_routing::client::memory::LIST_DESTINATIONS);
    let app = construct_router(ctx.state.clone());

    let (status, body) = send(
        &app,
        admin(
            "POST",
            "/api/v1/destinations",
            Some(json!({
                "processor_type": "stripe",
                "processor_id": ctx.stripe_processor,
                "routing_value": "acct_1",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"]["id"].is_string());
}

#[tokio::test]
async fn processors_can_be_created_listed_and_deleted() {
    let ctx = common::context().await;
    let app = construct_router(ctx.state.clone());

    let (status, body) = send(
        &app,
        admin(
            "POST",
            "/api/v1/processors",
            Some(json!({ "name": "Square EU", "processor_type": "square" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["processor_type"], "square");
    assert_eq!(body["is_active"], true);
    let processor_id = body["id"].as_i64().unwrap();

    let (_, body) = send(&app, admin("GET", "/api/v1/processors", None)).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = send(
        &app,
        admin("DELETE", &format!("/api/v1/processors/{processor_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);
}

#[tokio::test]
async fn webhook_requires_routing_headers() {
    let ctx = common::context().await;
    let app = construct_router(ctx.state.clone());

    let (status, _) = send(
        &app,
        Request::post("/api/v1/webhook/stripe")
            .body(Body::from(r#"{"test":"data"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_signatures_are_checked() {
    let ctx = common::context().await;
    let app = construct_router(ctx.state.clone());
    let destination_id = register(&app, ctx.stripe_processor).await;
    let record = relay_api::registry::DestinationRegistry::get_by_destination_id(
        &*ctx.registry,
        &destination_id,
    )
    .await
    .unwrap()
    .unwrap();

    let payload = r#"{"account":"acct_1","type":"payment_intent.succeeded"}"#;
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = SignatureVerifier::new()
        .sign(
            "msg_1",
            &timestamp,
            payload.as_bytes(),
            &SigningSecret::new(record.signing_secret),
        )
        .unwrap();

    let webhook = |signature: &str| {
        Request::post("/api/v1/webhook/stripe")
            .header("svix-id", "msg_1")
            .header("svix-timestamp", timestamp.as_str())
            .header("svix-signature", signature)
            .body(Body::from(payload))
            .unwrap()
    };

    let (status, body) = send(&app, webhook(&signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let (status, body) = send(&app, webhook("v1,bad")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn openapi_document_lists_the_routes() {
    let ctx = common::context().await;
    let app = construct_router(ctx.state.clone());

    let (status, body) = send(
        &app,
        Request::get("/api/v1/openapi.json").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/destinations").is_some());
    assert!(body["paths"].get("/webhook/{processor_type}").is_some());
}
