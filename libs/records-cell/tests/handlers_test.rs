use axum::{
    body::Body,
    extract::{Extension, Json, Query, State},
    http::{Request, StatusCode},
};
use axum_extra::TypedHeader;
use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use records_cell::handlers::*;
use records_cell::{consultation_routes, results_routes, ConsultationQuery, ConsultationRequest, ResultsQuery};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

const PATIENT_ID: &str = "pat-1";
const PROFESSIONAL_ID: &str = "prof-1";

fn typed_bearer(token: &str) -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer(token).unwrap())
}

fn result_row(id: &str, days_ago: i64, abnormal: Option<bool>) -> Value {
    let day = Utc::now().date_naive() - Duration::days(days_ago);
    let items = abnormal.map(|flag| {
        json!([{
            "name": "Glucose",
            "value": "6.1",
            "unit": "mmol/L",
            "reference_range": "3.9-5.5",
            "is_abnormal": flag
        }])
    });
    let pdf_url = match items {
        None => json!("https://files.example.com/report.pdf"),
        Some(_) => Value::Null,
    };
    json!({
        "id": id,
        "patient_id": PATIENT_ID,
        "test_name": "Bilan sanguin",
        "collection_date": (day - Duration::days(2)).to_string(),
        "result_date": day.to_string(),
        "lab_name": "Laboratoire Central",
        "is_pdf": items.is_none(),
        "pdf_url": pdf_url,
        "results": items,
        "created_at": Utc::now().to_rfc3339()
    })
}

fn consultation_row(id: &str, patient_id: &str) -> Value {
    json!({
        "id": id,
        "professional_id": PROFESSIONAL_ID,
        "patient_id": patient_id,
        "appointment_id": null,
        "date": "2024-03-10",
        "diagnosis": "Angine",
        "treatment": null,
        "prescription": "Amoxicilline 1g",
        "notes": null,
        "followup_needed": true,
        "followup_date": "2024-03-24",
        "created_at": Utc::now().to_rfc3339()
    })
}

async fn setup_patient() -> (MockServer, TestConfig, User) {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let user = TestUser::patient("patient@example.com").to_user();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("user_id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": PATIENT_ID }])))
        .mount(&mock_server)
        .await;

    (mock_server, config, user)
}

async fn setup_professional() -> (MockServer, TestConfig, User) {
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

fn consultation_request() -> ConsultationRequest {
    ConsultationRequest {
        patient_id: "pat-2".to_string(),
        appointment_id: Some("apt-9".to_string()),
        date: "2024-03-10".parse().unwrap(),
        diagnosis: Some(" Angine ".to_string()),
        treatment: None,
        prescription: Some("Amoxicilline 1g".to_string()),
        notes: None,
        followup_needed: true,
        followup_date: Some("2024-03-24".parse().unwrap()),
    }
}

#[tokio::test]
async fn test_patient_sees_own_results_newest_first() {
    let (mock_server, config, user) = setup_patient().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_results"))
        .and(query_param("patient_id", format!("eq.{}", PATIENT_ID)))
        .and(query_param("order", "result_date.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            result_row("res-old", 30, Some(true)),
            result_row("res-new", 1, None),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let Json(body) = list_results(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Query(ResultsQuery::default()),
    )
    .await
    .unwrap();

    assert_eq!(body["total"], 2);
    assert_eq!(body["results"][0]["id"], "res-new");
    assert_eq!(body["results"][0]["is_pdf"], true);
    assert_eq!(body["results"][0]["abnormal_count"], 0);
    assert_eq!(body["results"][1]["abnormal_count"], 1);
}

#[tokio::test]
async fn test_abnormal_only_filter() {
    let (mock_server, config, user) = setup_patient().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            result_row("res-1", 3, Some(false)),
            result_row("res-2", 2, Some(true)),
            result_row("res-3", 1, None),
        ])))
        .mount(&mock_server)
        .await;

    let Json(body) = list_results(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Query(ResultsQuery { abnormal_only: Some(true) }),
    )
    .await
    .unwrap();

    assert_eq!(body["total"], 1);
    assert_eq!(body["results"][0]["id"], "res-2");
}

#[tokio::test]
async fn test_user_without_patient_profile_is_forbidden() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = list_results(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(TestUser::patient("ghost@example.com").to_user()),
        Query(ResultsQuery::default()),
    )
    .await;

    assert_matches!(result, Err(AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_list_consultations_filtered_by_patient() {
    let (mock_server, config, user) = setup_professional().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .and(query_param("professional_id", format!("eq.{}", PROFESSIONAL_ID)))
        .and(query_param("patient_id", "eq.pat-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([consultation_row("cons-1", "pat-2")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let Json(body) = list_consultations(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Query(ConsultationQuery { patient_id: Some("pat-2".to_string()) }),
    )
    .await
    .unwrap();

    assert_eq!(body["total"], 1);
    assert_eq!(body["consultations"][0]["diagnosis"], "Angine");
    assert_eq!(body["consultations"][0]["followup_date"], "2024-03-24");
}

#[tokio::test]
async fn test_create_consultation_for_followed_patient() {
    let (mock_server, config, user) = setup_professional().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/professional_patients"))
        .and(query_param("professional_id", format!("eq.{}", PROFESSIONAL_ID)))
        .and(query_param("id", "eq.pat-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "pat-2" }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/consultations"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "professional_id": PROFESSIONAL_ID,
            "patient_id": "pat-2",
            "appointment_id": "apt-9",
            "diagnosis": "Angine",
            "followup_needed": true,
            "followup_date": "2024-03-24"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([consultation_row("cons-7", "pat-2")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let Json(body) = create_consultation(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Json(consultation_request()),
    )
    .await
    .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["consultation"]["id"], "cons-7");
}

#[tokio::test]
async fn test_create_consultation_rejects_unknown_patient_and_bad_followup() {
    let (mock_server, config, user) = setup_professional().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/professional_patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = create_consultation(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user.clone()),
        Json(consultation_request()),
    )
    .await;
    assert_matches!(result, Err(AppError::NotFound(_)));

    let mut request = consultation_request();
    request.followup_date = None;
    let result = create_consultation(State(config.to_arc()), typed_bearer("token"), Extension(user), Json(request)).await;
    assert_matches!(result, Err(AppError::ValidationError(msg)) => assert!(msg.contains("follow-up")));
}

#[tokio::test]
async fn test_database_failure_maps_to_database_error() {
    let (mock_server, config, user) = setup_professional().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/consultations"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .mount(&mock_server)
        .await;

    let result = list_consultations(
        State(config.to_arc()),
        typed_bearer("token"),
        Extension(user),
        Query(ConsultationQuery::default()),
    )
    .await;

    assert_matches!(result, Err(AppError::Database(_)));
}

#[tokio::test]
async fn test_routes_enforce_roles() {
    let config = TestConfig::default();
    let patient = TestUser::patient("patient@example.com");
    let professional = TestUser::professional("doctor@example.com");

    let cases = [
        (results_routes(config.to_arc()), &professional),
        (consultation_routes(config.to_arc()), &patient),
    ];

    for (app, wrong_user) in cases {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let token = JwtTestUtils::create_test_token(wrong_user, &config.jwt_secret, None);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
