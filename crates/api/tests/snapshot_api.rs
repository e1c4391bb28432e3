//! HTTP-level integration tests for the `/snapshots` endpoints.
//!
//! Uses `tower::ServiceExt` to send requests directly to the router over the
//! in-memory snapshot store, without a TCP listener.

mod common;

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use common::{
    body_bytes, body_json, build_test_app, create, delete, delete_anonymous, get, get_anonymous,
    patch_json, post, post_json, put_json, supervisor_a, supervisor_b, token,
};
use serde_json::json;

const DPR_1: &str = "/api/v1/snapshots/DPR/DPR-1";

// ---------------------------------------------------------------------------
// Create and read
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_returns_201_with_version_and_checksum() {
    let app = build_test_app();
    let response = post_json(
        app.app(),
        DPR_1,
        &supervisor_a(),
        json!({"data": {"notes": "poured slab", "count": 4}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["entity_type"], "DPR");
    assert_eq!(json["data"]["entity_id"], "DPR-1");
    assert_eq!(json["data"]["version"], 1);
    let checksum = json["data"]["data_checksum"].as_str().unwrap();
    assert_eq!(checksum.len(), 64);
    assert!(checksum.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[tokio::test]
async fn get_returns_latest_with_provenance() {
    let app = build_test_app();
    create(&app, &supervisor_a(), "DPR", "DPR-1", json!({"count": 4})).await;

    let response = get(app.app(), DPR_1, &supervisor_a()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["version"], 1);
    assert_eq!(data["data"], json!({"count": 4}));
    assert_eq!(data["organisation_id"], "org-A");
    assert_eq!(data["generated_by"], "sup-1");
    assert_eq!(data["checksum_algorithm"], "sha256");
    assert_eq!(data["is_latest"], true);
}

#[tokio::test]
async fn entity_type_in_path_ignores_case() {
    let app = build_test_app();
    create(&app, &supervisor_a(), "work_order", "wo-9", json!({"qty": 3})).await;

    let response = get(app.app(), "/api/v1/snapshots/WORK_ORDER/wo-9", &supervisor_a()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["entity_type"], "WORK_ORDER");
}

#[tokio::test]
async fn history_is_preserved_across_versions() {
    let app = build_test_app();
    let token = supervisor_a();
    create(&app, &token, "PAYMENT_CERTIFICATE", "pc-1", json!({"amount": 100})).await;
    let second = create(&app, &token, "PAYMENT_CERTIFICATE", "pc-1", json!({"amount": 150})).await;
    assert_eq!(second["version"], 2);

    let base = "/api/v1/snapshots/PAYMENT_CERTIFICATE/pc-1";

    let v1 = body_json(get(app.app(), &format!("{base}?version=1"), &token).await).await;
    assert_eq!(v1["data"]["data"], json!({"amount": 100}));
    assert_eq!(v1["data"]["is_latest"], false);

    let v1_path = body_json(get(app.app(), &format!("{base}/1"), &token).await).await;
    assert_eq!(v1_path["data"]["data"], json!({"amount": 100}));

    let latest = body_json(get(app.app(), base, &token).await).await;
    assert_eq!(latest["data"]["version"], 2);
    assert_eq!(latest["data"]["data"], json!({"amount": 150}));

    let versions = body_json(get(app.app(), &format!("{base}/versions"), &token).await).await;
    let versions = versions["data"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["version"], 1);
    assert_eq!(versions[0]["is_latest"], false);
    assert_eq!(versions[1]["version"], 2);
    assert_eq!(versions[1]["is_latest"], true);
}

#[tokio::test]
async fn versions_of_unknown_entity_is_empty() {
    let app = build_test_app();
    let response = get(app.app(), "/api/v1/snapshots/DPR/never/versions", &supervisor_a()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], json!([]));
}

#[tokio::test]
async fn missing_snapshot_returns_404() {
    let app = build_test_app();
    let response = get(app.app(), "/api/v1/snapshots/DPR/missing", &supervisor_a()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");

    create(&app, &supervisor_a(), "DPR", "DPR-1", json!({"count": 1})).await;
    let response = get(app.app(), &format!("{DPR_1}/7"), &supervisor_a()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn version_below_one_is_a_bad_request() {
    let app = build_test_app();
    create(&app, &supervisor_a(), "DPR", "DPR-1", json!({"count": 1})).await;

    for uri in [
        format!("{DPR_1}/0"),
        format!("{DPR_1}/-3"),
        format!("{DPR_1}?version=0"),
        format!("{DPR_1}/render?version=0"),
    ] {
        let response = get(app.app(), &uri, &supervisor_a()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let json = body_json(response).await;
        assert_eq!(json["code"], "BAD_REQUEST");
        assert!(json["error"].as_str().unwrap().starts_with("version must be at least 1"));
    }

    let response = post(app.app(), &format!("{DPR_1}/verify?version=-1"), &supervisor_a()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn filters_and_pdf_checksum_are_kept() {
    let app = build_test_app();
    let pdf = "ab".repeat(32);
    let response = post_json(
        app.app(),
        DPR_1,
        &supervisor_a(),
        json!({
            "data": {"count": 4},
            "filters": {"date": "2026-03-02", "site": "north"},
            "pdf_checksum": pdf,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(get(app.app(), DPR_1, &supervisor_a()).await).await;
    assert_eq!(json["data"]["filters"], json!({"date": "2026-03-02", "site": "north"}));
    assert_eq!(json["data"]["pdf_checksum"], pdf);
}

#[tokio::test]
async fn invalid_input_returns_400() {
    let app = build_test_app();

    let response = post_json(
        app.app(),
        DPR_1,
        &supervisor_a(),
        json!({"data": {}, "pdf_checksum": "not-a-digest"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let response = post_json(
        app.app(),
        "/api/v1/snapshots/INVOICE/inv-1",
        &supervisor_a(),
        json!({"data": {}}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

// ---------------------------------------------------------------------------
// Verify and render
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verify_after_create_is_valid() {
    let app = build_test_app();
    let created = create(&app, &supervisor_a(), "DPR", "DPR-1", json!({"count": 4})).await;

    let response = post(app.app(), &format!("{DPR_1}/verify?version=1"), &supervisor_a()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["valid"], true);
    assert_eq!(json["data"]["expected"], created["data_checksum"]);
    assert_eq!(json["data"]["actual"], created["data_checksum"]);
    assert_eq!(json["data"]["algorithm"], "sha256");

    let verified = get(app.app(), &format!("{DPR_1}?verify=true"), &supervisor_a()).await;
    assert_eq!(verified.status(), StatusCode::OK);
}

#[tokio::test]
async fn render_json_is_deterministic_and_frozen() {
    let app = build_test_app();
    let token = supervisor_a();
    create(&app, &token, "DPR", "DPR-1", json!({"notes": "poured slab", "count": 4})).await;

    let uri = format!("{DPR_1}/render?version=1&format=json");
    let first = get(app.app(), &uri, &token).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[CONTENT_TYPE], "application/json");
    let first = body_bytes(first).await;

    // The live record moves on; version 1 must still render identically.
    create(&app, &token, "DPR", "DPR-1", json!({"notes": "slab cracked", "count": 5})).await;

    let second = body_bytes(get(app.app(), &uri, &token).await).await;
    assert_eq!(first, second);

    let parsed: serde_json::Value = serde_json::from_slice(&first).unwrap();
    assert_eq!(parsed["data"], json!({"notes": "poured slab", "count": 4}));
}

#[tokio::test]
async fn render_csv_flattens_payload() {
    let app = build_test_app();
    create(&app, &supervisor_a(), "DPR", "DPR-1", json!({"notes": "poured slab", "count": 4})).await;

    let response = get(app.app(), &format!("{DPR_1}/render?format=csv"), &supervisor_a()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/csv; charset=utf-8");

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(body, "path,value\r\n$.count,4\r\n$.notes,poured slab\r\n");
}

#[tokio::test]
async fn render_unknown_format_returns_400() {
    let app = build_test_app();
    create(&app, &supervisor_a(), "DPR", "DPR-1", json!({"count": 4})).await;

    let response = get(app.app(), &format!("{DPR_1}/render?format=pdf"), &supervisor_a()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "UNSUPPORTED_FORMAT");
}

// ---------------------------------------------------------------------------
// Immutability
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_and_delete_are_rejected_and_record_is_unchanged() {
    let app = build_test_app();
    let admin = token("admin-1", "org-A", "admin");
    create(&app, &admin, "DPR", "DPR-1", json!({"count": 4})).await;

    let responses = [
        put_json(app.app(), DPR_1, &admin, json!({"data": {"count": 99}})).await,
        patch_json(app.app(), DPR_1, &admin, json!({"data": {"count": 99}})).await,
        delete(app.app(), DPR_1, &admin).await,
        put_json(app.app(), &format!("{DPR_1}/1"), &admin, json!({"data": {}})).await,
        patch_json(app.app(), &format!("{DPR_1}/1"), &admin, json!({"data": {}})).await,
        delete(app.app(), &format!("{DPR_1}/1"), &admin).await,
    ];
    for response in responses {
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_json(response).await["code"], "IMMUTABLE");
    }

    let json = body_json(get(app.app(), DPR_1, &admin).await).await;
    assert_eq!(json["data"]["version"], 1);
    assert_eq!(json["data"]["data"], json!({"count": 4}));
}

#[tokio::test]
async fn mutations_are_rejected_before_auth_and_path_parsing() {
    let app = build_test_app();
    create(&app, &supervisor_a(), "DPR", "DPR-1", json!({"count": 4})).await;

    let responses = [
        delete_anonymous(app.app(), DPR_1).await,
        delete_anonymous(app.app(), &format!("{DPR_1}/1")).await,
        put_json(app.app(), "/api/v1/snapshots/INVOICE/x", &supervisor_a(), json!({})).await,
        delete(app.app(), &format!("{DPR_1}/latest"), &supervisor_a()).await,
    ];
    for response in responses {
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_json(response).await["code"], "IMMUTABLE");
    }

    let json = body_json(get(app.app(), DPR_1, &supervisor_a()).await).await;
    assert_eq!(json["data"]["data"], json!({"count": 4}));
}

// ---------------------------------------------------------------------------
// Authentication, roles and tenant isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_returns_401() {
    let app = build_test_app();
    let response = get_anonymous(app.app(), DPR_1).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn other_roles_can_read_but_not_create() {
    let app = build_test_app();
    create(&app, &supervisor_a(), "DPR", "DPR-1", json!({"count": 4})).await;
    let viewer = token("viewer-1", "org-A", "other");

    let response = post_json(app.app(), DPR_1, &viewer, json!({"data": {"count": 5}})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");

    let response = get(app.app(), DPR_1, &viewer).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn other_organisation_is_denied_everywhere() {
    let app = build_test_app();
    create(&app, &supervisor_a(), "DPR", "DPR-1", json!({"count": 4})).await;
    let intruder = supervisor_b();

    let responses = [
        get(app.app(), DPR_1, &intruder).await,
        get(app.app(), &format!("{DPR_1}/1"), &intruder).await,
        get(app.app(), &format!("{DPR_1}/2"), &intruder).await,
        get(app.app(), &format!("{DPR_1}/versions"), &intruder).await,
        get(app.app(), &format!("{DPR_1}/render?format=json"), &intruder).await,
        post(app.app(), &format!("{DPR_1}/verify"), &intruder).await,
        post_json(app.app(), DPR_1, &intruder, json!({"data": {"count": 0}})).await,
    ];
    for response in responses {
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["code"], "ACCESS_DENIED");
        assert_eq!(json["error"], "Access denied");
    }

    let listed = body_json(get(app.app(), "/api/v1/snapshots", &intruder).await).await;
    assert_eq!(listed["data"], json!([]));

    // Organisation A's history is untouched by the rejected create.
    let versions = body_json(get(app.app(), &format!("{DPR_1}/versions"), &supervisor_a()).await).await;
    assert_eq!(versions["data"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Organisation listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_latest_filters_by_type_and_limit() {
    let app = build_test_app();
    let token = supervisor_a();
    create(&app, &token, "DPR", "DPR-1", json!({"n": 1})).await;
    create(&app, &token, "DPR", "DPR-1", json!({"n": 2})).await;
    create(&app, &token, "DPR", "DPR-2", json!({"n": 1})).await;
    create(&app, &token, "WORK_ORDER", "wo-1", json!({"n": 1})).await;
    create(&app, &supervisor_b(), "DPR", "DPR-B", json!({"n": 1})).await;

    let all = body_json(get(app.app(), "/api/v1/snapshots", &token).await).await;
    let all = all["data"].as_array().unwrap();
    assert_eq!(all.len(), 3);
    let dpr_1 = all.iter().find(|s| s["entity_id"] == "DPR-1").unwrap();
    assert_eq!(dpr_1["version"], 2);

    let dprs = body_json(get(app.app(), "/api/v1/snapshots?entity_type=DPR", &token).await).await;
    let dprs = dprs["data"].as_array().unwrap();
    assert_eq!(dprs.len(), 2);
    assert!(dprs.iter().all(|s| s["entity_type"] == "DPR"));

    let limited = body_json(get(app.app(), "/api/v1/snapshots?limit=1", &token).await).await;
    assert_eq!(limited["data"].as_array().unwrap().len(), 1);
}
