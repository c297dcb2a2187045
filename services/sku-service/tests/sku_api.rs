//! SKU API integration tests.
//!
//! Runs the full router on the in-memory backend and drives it over HTTP.

use std::sync::Arc;

use epg_sku::SkuFormat;
use epg_sku_service::{
    allocator::{PrefixResolver, SkuAllocator},
    api,
    db::{MemoryStore, Stores},
    state::AppState,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

struct SkuApiHarness {
    base_url: String,
    client: reqwest::Client,
}

impl SkuApiHarness {
    async fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info,epg_sku_service=debug".into()),
            )
            .with_test_writer()
            .try_init();

        let stores = Stores::memory(Arc::new(MemoryStore::new()));
        let allocator = SkuAllocator::new(SkuFormat::default(), PrefixResolver::builtin(), &stores);
        let app = api::create_router(AppState::new(None, allocator));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn create(&self, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url("/v1/equipment-instances"))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }
}

fn chauvet_light() -> Value {
    json!({ "category": "Lighting", "brand": "Chauvet" })
}

#[tokio::test]
async fn test_auto_generated_skus_are_sequential() {
    let harness = SkuApiHarness::new().await;

    let (status, first) = harness.create(chauvet_light()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["sku"], "EPG-LGT-CHV-0001");
    assert_eq!(first["category_prefix"], "LGT");
    assert_eq!(first["brand_prefix"], "CHV");

    let (status, second) = harness.create(chauvet_light()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["sku"], "EPG-LGT-CHV-0002");

    let (status, preview) = harness
        .get("/v1/sku/preview?category_prefix=LGT&brand_prefix=CHV")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["sku"], "EPG-LGT-CHV-0003");
    assert_eq!(preview["sequence"], 3);

    // Preview does not reserve.
    let (_, third) = harness.create(chauvet_light()).await;
    assert_eq!(third["sku"], "EPG-LGT-CHV-0003");
}

#[tokio::test]
async fn test_pairs_have_independent_counters() {
    let harness = SkuApiHarness::new().await;

    harness.create(chauvet_light()).await;
    let (_, audio) = harness
        .create(json!({ "category": "Audio", "brand": "Shure" }))
        .await;
    assert_eq!(audio["sku"], "EPG-AUD-SHR-0001");

    let (_, sequences) = harness.get("/v1/sku/sequences").await;
    assert_eq!(sequences["total"], 2);
    assert_eq!(sequences["items"][0]["category_prefix"], "AUD");
    assert_eq!(sequences["items"][1]["category_prefix"], "LGT");
}

#[tokio::test]
async fn test_unknown_brand_rejected() {
    let harness = SkuApiHarness::new().await;

    let (status, problem) = harness
        .create(json!({ "category": "Lighting", "brand": "Acme" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "unknown_prefix");

    let (_, sequences) = harness.get("/v1/sku/sequences").await;
    assert_eq!(sequences["total"], 0);
}

#[tokio::test]
async fn test_manual_sku_normalized_and_unique() {
    let harness = SkuApiHarness::new().await;

    let (status, created) = harness
        .create(json!({
            "category": "Lighting",
            "brand": "Chauvet",
            "sku": "  epg-lgt-chv-0500 "
        }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["sku"], "EPG-LGT-CHV-0500");

    let (status, problem) = harness
        .post("/v1/sku/validate", json!({ "sku": "EPG-LGT-CHV-0500" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["code"], "duplicate_sku");

    let (status, valid) = harness
        .post(
            "/v1/sku/validate",
            json!({
                "sku": "EPG-LGT-CHV-0500",
                "exclude_instance_id": created["instance_id"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(valid["valid"], true);

    let (status, problem) = harness
        .create(json!({
            "category": "Lighting",
            "brand": "Chauvet",
            "sku": "EPG-LGT-CHV-0500"
        }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["code"], "duplicate_sku");
}

#[tokio::test]
async fn test_malformed_sku_rejected() {
    let harness = SkuApiHarness::new().await;

    for sku in ["EPG-LGT-CHV", "XYZ-LGT-CHV-0001", "EPG-LGT-CHV-00A1"] {
        let (status, problem) = harness
            .post("/v1/sku/validate", json!({ "sku": sku }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{sku}");
        assert_eq!(problem["code"], "malformed_sku", "{sku}");
    }
}

#[tokio::test]
async fn test_update_sku() {
    let harness = SkuApiHarness::new().await;
    let (_, first) = harness.create(chauvet_light()).await;
    let (_, second) = harness.create(chauvet_light()).await;

    let id = second["instance_id"].as_str().unwrap();
    let resp = harness
        .client
        .patch(harness.url(&format!("/v1/equipment-instances/{id}")))
        .json(&json!({ "sku": first["sku"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = harness
        .client
        .patch(harness.url(&format!("/v1/equipment-instances/{id}")))
        .json(&json!({ "sku": "EPG-LGT-CHV-0900" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, fetched) = harness.get(&format!("/v1/equipment-instances/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["sku"], "EPG-LGT-CHV-0900");
}

#[tokio::test]
async fn test_instance_lookup_errors() {
    let harness = SkuApiHarness::new().await;

    let (status, problem) = harness.get("/v1/equipment-instances/not-an-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "invalid_instance_id");

    let missing = epg_sku_service::ids::InstanceId::new();
    let (status, problem) = harness
        .get(&format!("/v1/equipment-instances/{missing}"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["code"], "instance_not_found");
}

#[tokio::test]
async fn test_reset_sequence() {
    let harness = SkuApiHarness::new().await;

    let (status, problem) = harness
        .post("/v1/sku/sequences/LGT/CHV/reset", json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["code"], "sequence_not_found");

    harness.create(chauvet_light()).await;
    harness.create(chauvet_light()).await;

    let (status, reset) = harness
        .post("/v1/sku/sequences/lgt/chv/reset", json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reset["last_issued"], 0);

    let (_, preview) = harness
        .get("/v1/sku/preview?category_prefix=LGT&brand_prefix=CHV")
        .await;
    assert_eq!(preview["sku"], "EPG-LGT-CHV-0001");

    // Existing instances still hold 0001, so the next allocation collides.
    let (status, problem) = harness.create(chauvet_light()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["code"], "sku_collision");
}

#[tokio::test]
async fn test_auto_generation_toggle() {
    let harness = SkuApiHarness::new().await;

    let (_, status_body) = harness.get("/v1/sku/auto-generation").await;
    assert_eq!(status_body["enabled"], true);

    let resp = harness
        .client
        .put(harness.url("/v1/sku/auto-generation"))
        .json(&json!({ "enabled": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, problem) = harness.create(chauvet_light()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "auto_generation_disabled");

    // Manual SKUs are still accepted.
    let (status, _) = harness
        .create(json!({
            "category": "Lighting",
            "brand": "Chauvet",
            "sku": "EPG-LGT-CHV-0001"
        }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_statistics() {
    let harness = SkuApiHarness::new().await;
    harness.create(chauvet_light()).await;
    harness.create(chauvet_light()).await;
    harness
        .create(json!({ "category": "Audio", "brand": "Shure" }))
        .await;

    let (status, stats) = harness.get("/v1/sku/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_sequences"], 2);
    assert_eq!(stats["total_issued"], 3);
    assert_eq!(stats["total_instances"], 3);
    assert_eq!(stats["by_category"]["LGT"]["issued"], 2);
    assert_eq!(stats["by_brand"]["SHR"]["sequences"], 1);
    assert_eq!(stats["auto_generation_enabled"], true);
}

#[tokio::test]
async fn test_preview_rejects_bad_prefix() {
    let harness = SkuApiHarness::new().await;
    let (status, problem) = harness
        .get("/v1/sku/preview?category_prefix=LIGHT&brand_prefix=CHV")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "invalid_prefix");
}

#[tokio::test]
async fn test_health_endpoints() {
    let harness = SkuApiHarness::new().await;

    let (status, body) = harness.get("/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "sku-service");

    let (status, body) = harness.get("/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["components"]["storage"]["status"], "ok");
}
