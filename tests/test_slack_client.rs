//! Slack Web API client against a mock server.

use hookrelay::slack::{MessageUpdate, MessageUpdater, PostMessage, SlackClient, SlackError};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> SlackClient {
    SlackClient::new(SecretString::from("xoxb-test".to_string()))
        .unwrap()
        .with_api_url(server.uri())
}

fn update() -> MessageUpdate {
    MessageUpdate {
        channel: "C0123".to_string(),
        ts: "1700000000.000100".to_string(),
        text: "✅ Approved by alice".to_string(),
        blocks: None,
    }
}

#[tokio::test]
async fn test_update_message_sends_bearer_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.update"))
        .and(header("authorization", "Bearer xoxb-test"))
        .and(body_partial_json(json!({
            "channel": "C0123",
            "ts": "1700000000.000100",
            "text": "✅ Approved by alice"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).update_message(&update()).await.unwrap();
}

#[tokio::test]
async fn test_ok_false_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.update"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "error": "message_not_found"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).update_message(&update()).await.unwrap_err();
    match err {
        SlackError::Api { method, error } => {
            assert_eq!(method, "chat.update");
            assert_eq!(error, "message_not_found");
        }
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.update"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server).update_message(&update()).await.unwrap_err();
    assert!(matches!(err, SlackError::Status { .. }));
}

#[tokio::test]
async fn test_post_message_returns_ts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(body_partial_json(json!({"channel": "claude-code"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ok": true, "ts": "1700000001.000200"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ts = client(&server)
        .post_message(&PostMessage {
            channel: "claude-code".to_string(),
            text: "🚨 Approval Required: `Bash`".to_string(),
            blocks: None,
        })
        .await
        .unwrap();
    assert_eq!(ts, "1700000001.000200");
}

#[tokio::test]
async fn test_open_socket_url_uses_app_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/apps.connections.open"))
        .and(header("authorization", "Bearer xapp-test"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true, "url": "wss://example.invalid/link"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let url = client(&server)
        .open_socket_url(&SecretString::from("xapp-test".to_string()))
        .await
        .unwrap();
    assert_eq!(url, "wss://example.invalid/link");
}

#[tokio::test]
async fn test_auth_test_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true, "team": "Acme", "user": "relaybot", "user_id": "U999"
        })))
        .mount(&server)
        .await;

    let identity = client(&server).auth_test().await.unwrap();
    assert_eq!(identity.team.as_deref(), Some("Acme"));
    assert_eq!(identity.user_id.as_deref(), Some("U999"));
}
