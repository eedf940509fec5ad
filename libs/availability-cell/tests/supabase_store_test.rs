use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use availability_cell::models::{
    AvailabilityError, AvailabilityException, ExceptionKind, Modality,
};
use availability_cell::services::{AvailabilityStore, SupabaseAvailabilityStore};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

fn store_for(server: &MockServer) -> SupabaseAvailabilityStore {
    let config = AppConfig {
        supabase_url: server.uri(),
        supabase_service_key: "service-key".to_string(),
        ..AppConfig::default()
    };
    SupabaseAvailabilityStore::new(Arc::new(SupabaseClient::new(&config).unwrap()))
}

#[tokio::test]
async fn reads_weekly_availability_by_professional_and_modality() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/weekly_availability"))
        .and(query_param("professional_id", format!("eq.{}", professional_id)))
        .and(query_param("modality", "eq.in_person"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "professional_id": professional_id,
            "modality": "in_person",
            "days": [{ "weekday": "tuesday", "blocks": [{ "start": "08:00", "end": "24:00" }] }],
            "updated_at": "2030-01-01T00:00:00Z"
        }])))
        .mount(&server)
        .await;

    let availability = store_for(&server)
        .get_weekly_availability(professional_id, Modality::InPerson)
        .await
        .unwrap()
        .expect("pattern");

    assert_eq!(availability.days.len(), 1);
    assert_eq!(availability.days[0].blocks[0].duration_minutes(), 16 * 60);
}

#[tokio::test]
async fn missing_profile_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/professionals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(store_for(&server).get_professional(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn exceptions_are_upserted_with_their_tag() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/availability_exceptions"))
        .and(query_param("on_conflict", "professional_id,modality,date"))
        .and(body_partial_json(json!({ "type": "blocked_day", "date": "2030-01-09" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{}])))
        .expect(1)
        .mount(&server)
        .await;

    let exception = AvailabilityException {
        professional_id,
        modality: Modality::Remote,
        date: NaiveDate::from_ymd_opt(2030, 1, 9).unwrap(),
        kind: ExceptionKind::BlockedDay,
        reason: None,
    };

    store_for(&server).put_exception(&exception).await.unwrap();
}

#[tokio::test]
async fn server_errors_become_database_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_exceptions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let date = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
    let result = store_for(&server)
        .get_exceptions(Uuid::new_v4(), Modality::Remote, date, date)
        .await;

    assert_matches!(result, Err(AvailabilityError::DatabaseError(_)));
}
