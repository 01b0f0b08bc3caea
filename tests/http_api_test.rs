mod common;

use common::*;
use serde_json::{json, Value};
use std::sync::Arc;
use vidrag::cli::commands::router;

/// Serve the API on an ephemeral port and return its base URL.
async fn spawn_server(harness: Harness) -> String {
    let app = router(Arc::new(harness.pipeline));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn health_reports_ok() {
    let base = spawn_server(HarnessBuilder::new().build().await).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn process_then_chat() {
    let base = spawn_server(HarnessBuilder::new().build().await).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/process", base))
        .json(&json!({ "url": format!("https://youtu.be/{}", COOKING_ID), "name": "bread" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "status": "success", "chunks": 3 }));

    let resp = client
        .post(format!("{}/chat", base))
        .json(&json!({ "question": "When do I feed the starter?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["answer"], "Feed the starter, then bake.");
    assert_eq!(body["sources"].as_array().unwrap().len(), 3);
    assert_eq!(body["sources"][0], "[0:00:31 - 0:01:05]");

    let body: Value = client
        .get(format!("{}/videos", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["videos"][0]["name"], "bread");
    assert_eq!(body["videos"][0]["chunks"], 3);
}

#[tokio::test]
async fn chat_before_processing_returns_not_found_answer() {
    let base = spawn_server(HarnessBuilder::new().build().await).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/chat", base))
        .json(&json!({ "question": "Anything?" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["answer"], "I couldn't find any relevant info in the video.");
    assert_eq!(body["sources"], json!([]));
}

#[tokio::test]
async fn process_failure_is_server_error() {
    let base = spawn_server(HarnessBuilder::new().build().await).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/process", base))
        .json(&json!({ "url": "zzzzzzzzzzz", "name": "missing" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("No transcript available"));
}

#[tokio::test]
async fn chat_failure_is_server_error() {
    let harness = HarnessBuilder::new()
        .model(ScriptedModel::unavailable())
        .build()
        .await;
    let base = spawn_server(harness).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/process", base))
        .json(&json!({ "url": COOKING_ID, "name": "bread" }))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/chat", base))
        .json(&json!({ "question": "How long does the starter rise?" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("synthesis"));
}
