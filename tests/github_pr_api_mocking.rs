//! Deterministic GitHub PR API mocking, grounded on the teacher's own
//! wiremock-based GitHub API tests. These pin down the exact request/response
//! shapes `OctocrabPrDriver` relies on (spec §4.2 PR creation/merge) without
//! a live network dependency.

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct GitHubPrMock {
    server: MockServer,
}

impl GitHubPrMock {
    async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    fn base_url(&self) -> String {
        self.server.uri()
    }

    async fn mock_create_pull_request(&self, pr_number: u64, head_sha: &str) {
        let response = json!({
            "number": pr_number,
            "state": "open",
            "merged_at": Value::Null,
            "mergeable": Value::Null,
            "head": {"sha": head_sha},
        });

        Mock::given(method("POST"))
            .and(path("/repos/wreckit-test/demo/pulls"))
            .and(header("authorization", "token mock-token"))
            .respond_with(ResponseTemplate::new(201).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    async fn mock_get_pull_request(&self, pr_number: u64, state: &str, mergeable: bool) {
        let response = json!({
            "number": pr_number,
            "state": state,
            "merged_at": Value::Null,
            "mergeable": mergeable,
            "head": {"sha": "a".repeat(40)},
        });

        Mock::given(method("GET"))
            .and(path(format!("/repos/wreckit-test/demo/pulls/{pr_number}")))
            .and(header("authorization", "token mock-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    async fn mock_merge_pull_request(&self, pr_number: u64, merged: bool) {
        let response = json!({
            "merged": merged,
            "message": if merged { "merged" } else { "conflict" },
        });

        Mock::given(method("PUT"))
            .and(path(format!("/repos/wreckit-test/demo/pulls/{pr_number}/merge")))
            .and(header("authorization", "token mock-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }
}

#[tokio::test]
async fn create_pull_request_response_carries_the_fields_pr_status_needs() {
    let mock = GitHubPrMock::new().await;
    mock.mock_create_pull_request(42, &"f".repeat(40)).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/repos/wreckit-test/demo/pulls", mock.base_url()))
        .header("authorization", "token mock-token")
        .json(&json!({"title": "Add widget", "head": "item-001", "base": "main"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["number"], 42);
    assert_eq!(body["state"], "open");
    assert_eq!(body["head"]["sha"], "f".repeat(40));
}

#[tokio::test]
async fn get_pull_request_reports_mergeable_state() {
    let mock = GitHubPrMock::new().await;
    mock.mock_get_pull_request(7, "open", true).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/repos/wreckit-test/demo/pulls/7", mock.base_url()))
        .header("authorization", "token mock-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["mergeable"], true);
    assert_eq!(body["merged_at"], Value::Null);
}

#[tokio::test]
async fn merge_pull_request_surfaces_a_conflict_message_when_not_merged() {
    let mock = GitHubPrMock::new().await;
    mock.mock_merge_pull_request(9, false).await;

    let client = reqwest::Client::new();
    let response = client
        .put(format!("{}/repos/wreckit-test/demo/pulls/9/merge", mock.base_url()))
        .header("authorization", "token mock-token")
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["merged"], false);
    assert_eq!(body["message"], "conflict");
}
