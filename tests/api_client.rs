#![forbid(unsafe_code)]

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use todotui::api::ApiClient;
use todotui::api::types::{NewTask, Priority, RecurringRule, TaskPatch};
use todotui::error::ApiErrorKind;
use todotui::session::Session;

fn session(user_id: &str, token: Option<&str>) -> Session {
    Session {
        user_id: user_id.to_owned(),
        email: None,
        token: token.map(ToOwned::to_owned),
    }
}

fn task_json(id: i64, title: &str, completed: bool) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": "u1",
        "title": title,
        "description": "",
        "priority": "medium",
        "tags": null,
        "due_date": null,
        "recurring_rule": null,
        "completed": completed,
        "created_at": "2026-08-01T00:00:00",
        "updated_at": "2026-08-01T00:00:00"
    })
}

#[tokio::test]
async fn list_tasks_preserves_server_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/u1/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            task_json(3, "c", false),
            task_json(1, "a", true),
            task_json(2, "b", false),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), &session("u1", None));
    let tasks = client.list_tasks().await.unwrap();
    let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[tokio::test]
async fn create_task_omits_absent_fields_on_the_wire() {
    let server = MockServer::start().await;
    // Exact body match: no priority/tags/due_date/recurring_rule keys at all.
    Mock::given(method("POST"))
        .and(path("/api/u1/tasks"))
        .and(body_json(json!({
            "title": "Buy milk",
            "description": ""
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json(10, "Buy milk", false)))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), &session("u1", None));
    let body = NewTask {
        title: "Buy milk".to_owned(),
        description: String::new(),
        priority: None,
        tags: None,
        due_date: None,
        recurring_rule: None,
    };
    let created = client.create_task(&body).await.unwrap();
    assert_eq!(created.id, 10);
    assert_eq!(created.priority, Priority::Medium);
}

#[tokio::test]
async fn create_task_with_empty_title_never_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/u1/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json(1, "x", false)))
        .expect(0)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), &session("u1", None));
    let body = NewTask {
        title: "   ".to_owned(),
        description: String::new(),
        priority: None,
        tags: None,
        due_date: None,
        recurring_rule: None,
    };
    let err = client.create_task(&body).await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Validation);
}

#[tokio::test]
async fn update_task_puts_only_provided_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/u1/tasks/5"))
        .and(body_json(json!({ "title": "Renamed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json(5, "Renamed", false)))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), &session("u1", None));
    let patch = TaskPatch {
        title: Some("Renamed".to_owned()),
        ..TaskPatch::default()
    };
    let updated = client.update_task(5, &patch).await.unwrap();
    assert_eq!(updated.title, "Renamed");
}

#[tokio::test]
async fn toggle_complete_hits_the_complete_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/u1/tasks/7/complete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_json(7, "t", true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), &session("u1", None));
    let toggled = client.toggle_complete(7).await.unwrap();
    assert!(toggled.completed);
}

#[tokio::test]
async fn delete_task_returns_the_ack() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/u1/tasks/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "id": 9 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), &session("u1", None));
    let ack = client.delete_task(9).await.unwrap();
    assert!(ack.ok);
    assert_eq!(ack.id, 9);
}

#[tokio::test]
async fn chat_threads_the_conversation_id() {
    let server = MockServer::start().await;
    // First send: no conversation_id key in the body.
    Mock::given(method("POST"))
        .and(path("/api/u1/chat"))
        .and(body_json(json!({ "message": "hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": 42,
            "response": "Hi! How can I help?",
            "tool_calls": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Second send echoes the id the backend assigned.
    Mock::given(method("POST"))
        .and(path("/api/u1/chat"))
        .and(body_json(json!({ "message": "add a task", "conversation_id": 42 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": 42,
            "response": "Done.",
            "tool_calls": [{ "name": "create_task", "arguments": { "title": "a task" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), &session("u1", None));
    let first = client.send_chat("hello", None).await.unwrap();
    assert_eq!(first.conversation_id, 42);
    assert!(first.tool_calls.is_empty());

    let second = client
        .send_chat("add a task", Some(first.conversation_id))
        .await
        .unwrap();
    assert_eq!(second.conversation_id, 42);
    assert_eq!(second.tool_calls.len(), 1);
    assert_eq!(second.tool_calls[0].name, "create_task");
}

#[tokio::test]
async fn bearer_token_is_attached_when_present() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/u1/tasks"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), &session("u1", Some("tok-123")));
    client.list_tasks().await.unwrap();
}

#[tokio::test]
async fn missing_token_sends_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/u1/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), &session("u1", None));
    client.list_tasks().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn user_id_is_percent_encoded_in_the_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/alice%40example.com/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), &session("alice@example.com", None));
    client.list_tasks().await.unwrap();
}

#[tokio::test]
async fn error_statuses_map_to_kinds_and_keep_the_body() {
    let cases = [
        (401, ApiErrorKind::Unauthorized),
        (403, ApiErrorKind::Unauthorized),
        (400, ApiErrorKind::Validation),
        (422, ApiErrorKind::Validation),
        (404, ApiErrorKind::NotFound),
        (409, ApiErrorKind::Conflict),
        (500, ApiErrorKind::Unknown),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        let body = format!("backend said no ({status})");
        Mock::given(method("GET"))
            .and(path("/api/u1/tasks"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body.clone()))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), &session("u1", None));
        let err = client.list_tasks().await.unwrap_err();
        assert_eq!(err.kind, expected, "status {status}");
        assert_eq!(err.status, Some(status));
        // The raw body survives untouched for display.
        assert_eq!(err.message, body);
    }
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() {
    // A pooled server (`MockServer::start`) keeps its socket open after drop;
    // a builder-created one actually shuts down, leaving a dead port.
    let server = MockServer::builder().start().await;
    let uri = server.uri();
    drop(server);

    let client = ApiClient::new(&uri, &session("u1", None));
    let err = client.list_tasks().await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Transport);
    assert_eq!(err.status, None);
}

#[tokio::test]
async fn recurring_rule_round_trips_through_the_wire() {
    let server = MockServer::start().await;
    let mut body = task_json(3, "water plants", true);
    body["recurring_rule"] = json!("daily");
    Mock::given(method("PATCH"))
        .and(path("/api/u1/tasks/3/complete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri(), &session("u1", None));
    let toggled = client.toggle_complete(3).await.unwrap();
    assert_eq!(toggled.recurring_rule, Some(RecurringRule::Daily));
    // Completed plus a rule means the server spawned the next occurrence.
    assert!(toggled.spawns_successor());
}
