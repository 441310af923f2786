//! Grade sync integration tests.
//!
//! Publishes and looks up grades through a real server with launch tokens
//! signed by the mocked platform key.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use gs_test_utils::TestGsServer;
use serde_json::{json, Value};

fn instructor_token(server: &TestGsServer) -> Result<String> {
    server.sign(&server.token_builder().as_instructor().build())
}

async fn publish(server: &TestGsServer, body: Value) -> Result<reqwest::Response> {
    let token = instructor_token(server)?;
    Ok(reqwest::Client::new()
        .post(format!("{}/api/v1/grades/sync", server.url()))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await?)
}

async fn lookup(server: &TestGsServer, course_id: &str) -> Result<reqwest::Response> {
    let token = instructor_token(server)?;
    Ok(reqwest::Client::new()
        .get(format!(
            "{}/api/v1/grades/sync/{}/latest",
            server.url(),
            course_id
        ))
        .bearer_auth(token)
        .send()
        .await?)
}

fn passed_and_returned() -> Value {
    json!({
        "courseId": "C1",
        "checkpointId": "cp1",
        "userIds": ["u1", "u2"],
        "checkpoints": [
            {"id": "a", "state": "Passed"},
            {"id": "b", "state": "Returned"}
        ]
    })
}

#[tokio::test]
async fn test_publish_scores_and_stores_record() -> Result<()> {
    let server = TestGsServer::spawn().await?;

    let response = publish(&server, passed_and_returned()).await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["status"], "synced");
    assert_eq!(body["mock"], true);
    assert_eq!(body["mockSyncId"], 1);
    assert_eq!(body["courseId"], "C1");
    assert_eq!(body["checkpointId"], "cp1");
    assert_eq!(body["lineItemId"], "mock-lineitem-cp1");
    assert_eq!(body["resultIds"], json!(["mock-result-u1", "mock-result-u2"]));
    assert_eq!(body["syncedCount"], 2);
    assert_eq!(body["scoreMaximum"], 2.0);
    assert_eq!(body["scoreGiven"], 1.0);
    assert_eq!(body["activityProgress"], "InProgress");
    assert_eq!(body["gradingProgress"], "Pending");
    Ok(())
}

#[tokio::test]
async fn test_lookup_returns_latest_publish() -> Result<()> {
    let server = TestGsServer::spawn().await?;

    let missing = lookup(&server, "C1").await?;
    assert_eq!(missing.status(), 404);

    publish(&server, passed_and_returned()).await?;
    let mut second = passed_and_returned();
    second["checkpointId"] = json!("cp2");
    second["lateMultiplier"] = json!(0.5);
    publish(&server, second).await?;

    let response = lookup(&server, "C1").await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["mockSyncId"], 2);
    assert_eq!(body["checkpointId"], "cp2");
    assert_eq!(body["scoreGiven"], 0.5);
    assert!(body.get("status").is_none());
    Ok(())
}

#[tokio::test]
async fn test_legacy_score_fields_used_without_checkpoints() -> Result<()> {
    let server = TestGsServer::spawn().await?;

    let response = publish(
        &server,
        json!({
            "courseId": "C1",
            "checkpointId": "cp1",
            "groupId": "team-7",
            "scoreGiven": 8,
            "scoreMaximum": 10,
            "activityProgress": "Completed",
            "gradingProgress": "FullyGraded"
        }),
    )
    .await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["scoreGiven"], 8.0);
    assert_eq!(body["scoreMaximum"], 10.0);
    assert_eq!(body["resultIds"], json!(["mock-result-team-7"]));
    assert_eq!(body["syncedCount"], 1);
    Ok(())
}

#[tokio::test]
async fn test_both_recipient_forms_unprocessable() -> Result<()> {
    let server = TestGsServer::spawn().await?;
    let mut body = passed_and_returned();
    body["groupId"] = json!("team-7");

    let response = publish(&server, body).await?;
    assert_eq!(response.status(), 422);

    let error: Value = response.json().await?;
    assert_eq!(error["error"]["code"], "UNPROCESSABLE");
    assert_eq!(lookup(&server, "C1").await?.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_no_recipients_unprocessable() -> Result<()> {
    let server = TestGsServer::spawn().await?;
    let mut body = passed_and_returned();
    body.as_object_mut().unwrap().remove("userIds");

    assert_eq!(publish(&server, body).await?.status(), 422);
    Ok(())
}

async fn error_of(response: reqwest::Response) -> Result<(u16, String)> {
    let status = response.status().as_u16();
    let body: Value = response.json().await?;
    Ok((status, body["error"]["message"].as_str().unwrap().to_string()))
}

#[tokio::test]
async fn test_no_recipients_reported_before_unusable_score() -> Result<()> {
    let server = TestGsServer::spawn().await?;

    let response = publish(
        &server,
        json!({"courseId": "C1", "checkpointId": "cp1", "checkpoints": []}),
    )
    .await?;

    assert_eq!(
        error_of(response).await?,
        (422, "one of userIds or groupId is required".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn test_blank_course_reported_before_unusable_score() -> Result<()> {
    let server = TestGsServer::spawn().await?;

    let response = publish(
        &server,
        json!({
            "courseId": " ",
            "checkpointId": "cp1",
            "userIds": ["u1"],
            "scoreGiven": 5,
            "scoreMaximum": 0
        }),
    )
    .await?;

    assert_eq!(
        error_of(response).await?,
        (400, "courseId is required".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn test_email_recipient_reported_before_unusable_score() -> Result<()> {
    let server = TestGsServer::spawn().await?;

    let response = publish(
        &server,
        json!({
            "courseId": "C1",
            "checkpointId": "cp1",
            "userIds": ["student@school.edu"]
        }),
    )
    .await?;

    assert_eq!(
        error_of(response).await?,
        (
            400,
            "recipient identifiers must not be email addresses".to_string()
        )
    );
    Ok(())
}

#[tokio::test]
async fn test_unusable_score_rejected_once_metadata_is_valid() -> Result<()> {
    let server = TestGsServer::spawn().await?;

    let response = publish(
        &server,
        json!({
            "courseId": "C1",
            "checkpointId": "cp1",
            "userIds": ["u1"],
            "checkpoints": []
        }),
    )
    .await?;

    assert_eq!(
        error_of(response).await?,
        (
            400,
            "scoreMaximum must be greater than 0 when no checkpoints are provided".to_string()
        )
    );
    assert_eq!(lookup(&server, "C1").await?.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_email_recipient_rejected() -> Result<()> {
    let server = TestGsServer::spawn().await?;
    let mut body = passed_and_returned();
    body["userIds"] = json!(["student@school.edu"]);

    let response = publish(&server, body).await?;
    assert_eq!(response.status(), 400);
    assert_eq!(lookup(&server, "C1").await?.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_missing_course_rejected() -> Result<()> {
    let server = TestGsServer::spawn().await?;
    let mut body = passed_and_returned();
    body["courseId"] = json!("  ");

    let response = publish(&server, body).await?;
    assert_eq!(response.status(), 400);

    let error: Value = response.json().await?;
    assert_eq!(error["error"]["message"], "courseId is required");
    Ok(())
}

#[tokio::test]
async fn test_comments_redacted_by_default() -> Result<()> {
    let server = TestGsServer::spawn().await?;
    let mut body = passed_and_returned();
    body["comment"] = json!("nice work");

    let record: Value = publish(&server, body).await?.json().await?;
    assert!(record.get("comment").is_none());
    Ok(())
}

#[tokio::test]
async fn test_comment_kept_unless_it_contains_an_email() -> Result<()> {
    let server = TestGsServer::spawn_with(&[("GRADE_SYNC_REDACT_COMMENTS", "false")]).await?;

    let mut body = passed_and_returned();
    body["comment"] = json!("nice work");
    let record: Value = publish(&server, body).await?.json().await?;
    assert_eq!(record["comment"], "nice work");

    let mut body = passed_and_returned();
    body["comment"] = json!("ask ta@school.edu about part b");
    let record: Value = publish(&server, body).await?.json().await?;
    assert!(record.get("comment").is_none());
    Ok(())
}

#[tokio::test]
async fn test_grade_routes_require_token() -> Result<()> {
    let server = TestGsServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/grades/sync", server.url()))
        .json(&passed_and_returned())
        .send()
        .await?;
    assert_eq!(response.status(), 401);
    assert!(response.headers().contains_key("www-authenticate"));

    let response = client
        .get(format!("{}/api/v1/grades/sync/C1/latest", server.url()))
        .bearer_auth("not-a-jwt")
        .send()
        .await?;
    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_disabled_grade_sync_is_not_found() -> Result<()> {
    let server = TestGsServer::spawn_with(&[("GRADE_SYNC_ENABLED", "false")]).await?;
    let client = reqwest::Client::new();

    // Gate answers before authentication.
    let response = client
        .post(format!("{}/api/v1/grades/sync", server.url()))
        .json(&passed_and_returned())
        .send()
        .await?;
    assert_eq!(response.status(), 404);

    assert_eq!(publish(&server, passed_and_returned()).await?.status(), 404);
    assert_eq!(lookup(&server, "C1").await?.status(), 404);

    let health: Value = reqwest::get(format!("{}/health", server.url()))
        .await?
        .json()
        .await?;
    assert_eq!(health["gradeSyncEnabled"], false);
    Ok(())
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() -> Result<()> {
    let server = TestGsServer::spawn().await?;
    let token = instructor_token(&server)?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/v1/grades/sync", server.url()))
        .bearer_auth(token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    Ok(())
}
