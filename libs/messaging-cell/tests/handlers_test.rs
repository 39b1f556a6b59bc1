use axum::{
    body::Body,
    extract::{Extension, Json, Path, Query, State},
    http::{Request, StatusCode},
};
use axum_extra::TypedHeader;
use assert_matches::assert_matches;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use messaging_cell::handlers::*;
use messaging_cell::{messaging_routes, ConversationQuery, SendMessageRequest};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

const PROFESSIONAL_ID: &str = "prof-1";

fn typed_bearer(token: &str) -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer(token).unwrap())
}

fn patient_row(id: &str, first: &str, last: &str) -> Value {
    json!({
        "id": id,
        "professional_id": PROFESSIONAL_ID,
        "first_name": first,
        "last_name": last,
        "email": format!("{}@example.com", first.to_lowercase()),
        "phone": null
    })
}

async fn setup() -> (MockServer, TestConfig, User) {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let user = TestUser::professional("doctor@example.com").to_user();

    Mock::given(method("GET"))
        .and(path("/rest/v1/professionals"))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": PROFESSIONAL_ID }])))
        .mount(&mock_server)
        .await;

    (mock_server, config, user)
}

async fn mount_patients(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/professional_patients"))
        .and(query_param("professional_id", format!("eq.{}", PROFESSIONAL_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            patient_row("pat-1", "Marie", "Dupont"),
            patient_row("pat-2", "Jean", "Martin"),
            patient_row("pat-3", "Sarah", "Lemoine"),
        ])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_list_conversations_orders_by_latest_message() {
    let (mock_server, config, user) = setup().await;
    mount_patients(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("professional_id", format!("eq.{}", PROFESSIONAL_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::message_row(PROFESSIONAL_ID, "pat-2", "patient", 5, false),
            MockSupabaseResponses::message_row(PROFESSIONAL_ID, "pat-2", "patient", 15, false),
            MockSupabaseResponses::message_row(PROFESSIONAL_ID, "pat-1", "professional", 60, true),
        ])))
        .mount(&mock_server)
        .await;

    let Json(body) = list_conversations(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Query(ConversationQuery::default()),
    )
    .await
    .unwrap();

    let order: Vec<&str> = body["conversations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["patient"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["pat-2", "pat-1", "pat-3"]);
    assert_eq!(body["conversations"][0]["unread_count"], 2);
    assert_eq!(body["conversations"][2]["latest_message"], Value::Null);
    assert_eq!(body["total"], 3);
    assert_eq!(body["unread_total"], 2);
}

#[tokio::test]
async fn test_list_conversations_search_by_name() {
    let (mock_server, config, user) = setup().await;
    mount_patients(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let Json(body) = list_conversations(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Query(ConversationQuery { search: Some("lemoine".to_string()) }),
    )
    .await
    .unwrap();

    assert_eq!(body["total"], 1);
    assert_eq!(body["conversations"][0]["patient"]["first_name"], "Sarah");
}

#[tokio::test]
async fn test_get_thread_is_chronological() {
    let (mock_server, config, user) = setup().await;

    let newest = MockSupabaseResponses::message_row(PROFESSIONAL_ID, "pat-1", "professional", 1, true);
    let oldest = MockSupabaseResponses::message_row(PROFESSIONAL_ID, "pat-1", "patient", 30, true);

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("patient_id", "eq.pat-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([newest.clone(), oldest.clone()])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let Json(body) = get_thread(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Path("pat-1".to_string()),
    )
    .await
    .unwrap();

    assert_eq!(body["patient_id"], "pat-1");
    assert_eq!(body["messages"][0]["id"], oldest["id"]);
    assert_eq!(body["messages"][1]["id"], newest["id"]);
}

#[tokio::test]
async fn test_send_message_inserts_trimmed_content() {
    let (mock_server, config, user) = setup().await;
    mount_patients(&mock_server).await;

    let mut stored = MockSupabaseResponses::message_row(PROFESSIONAL_ID, "pat-1", "professional", 0, true);
    stored["content"] = json!("Vos résultats sont disponibles");

    Mock::given(method("POST"))
        .and(path("/rest/v1/messages"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "professional_id": PROFESSIONAL_ID,
            "patient_id": "pat-1",
            "sender_type": "professional",
            "content": "Vos résultats sont disponibles",
            "is_read": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([stored])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let Json(body) = send_message(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Path("pat-1".to_string()),
        Json(SendMessageRequest {
            content: "  Vos résultats sont disponibles \n".to_string(),
            attachment_url: None,
        }),
    )
    .await
    .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["message"]["content"], "Vos résultats sont disponibles");
}

#[tokio::test]
async fn test_send_message_rejects_blank_and_unknown_patient() {
    let (mock_server, config, user) = setup().await;
    mount_patients(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let blank = send_message(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user.clone()),
        Path("pat-1".to_string()),
        Json(SendMessageRequest { content: "   ".to_string(), attachment_url: None }),
    )
    .await;
    assert_matches!(blank, Err(AppError::ValidationError(_)));

    let stranger = send_message(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Path("pat-99".to_string()),
        Json(SendMessageRequest { content: "Bonjour".to_string(), attachment_url: None }),
    )
    .await;
    assert_matches!(stranger, Err(AppError::NotFound(msg)) => assert!(msg.contains("pat-99")));
}

#[tokio::test]
async fn test_mark_thread_read_reports_updated_rows() {
    let (mock_server, config, user) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("patient_id", "eq.pat-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::message_row(PROFESSIONAL_ID, "pat-2", "patient", 5, false),
            MockSupabaseResponses::message_row(PROFESSIONAL_ID, "pat-2", "professional", 10, true),
            MockSupabaseResponses::message_row(PROFESSIONAL_ID, "pat-2", "patient", 15, false),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/messages"))
        .and(query_param("patient_id", "eq.pat-2"))
        .and(query_param("sender_type", "eq.patient"))
        .and(query_param("is_read", "eq.false"))
        .and(body_partial_json(json!({ "is_read": true })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let Json(body) = mark_thread_read(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Path("pat-2".to_string()),
    )
    .await
    .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["updated"], 2);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| m["is_read"] == true));
}

#[tokio::test]
async fn test_mark_read_skips_write_when_nothing_unread() {
    let (mock_server, config, user) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::message_row(PROFESSIONAL_ID, "pat-1", "patient", 5, true),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let Json(body) = mark_thread_read(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Path("pat-1".to_string()),
    )
    .await
    .unwrap();

    assert_eq!(body["updated"], 0);
}

#[tokio::test]
async fn test_patient_id_cannot_smuggle_filters() {
    let (mock_server, config, user) = setup().await;
    let crafted = "pat-1&sender_type=eq.patient";

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("patient_id", format!("eq.{}", crafted)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let Json(body) = get_thread(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Path(crafted.to_string()),
    )
    .await
    .unwrap();

    assert_eq!(body["messages"], json!([]));
}

#[tokio::test]
async fn test_user_without_professional_profile_is_forbidden() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/professionals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = list_conversations(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(TestUser::professional("new@example.com").to_user()),
        Query(ConversationQuery::default()),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_database_failure_maps_to_database_error() {
    let (mock_server, config, user) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/professional_patients"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(MockSupabaseResponses::error_response("boom", "500")),
        )
        .mount(&mock_server)
        .await;

    let result = list_conversations(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Query(ConversationQuery::default()),
    )
    .await;

    assert_matches!(result, Err(AppError::Database(_)));
}

#[tokio::test]
async fn test_routes_are_reserved_to_professionals() {
    let config = TestConfig::default();
    let app = messaging_routes(config.to_arc());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/conversations").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/conversations")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
