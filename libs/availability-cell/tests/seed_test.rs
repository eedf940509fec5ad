use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;

use availability_cell::models::{AvailabilityError, Modality};
use availability_cell::services::{AvailabilityStore, InMemoryAvailabilityStore, MemorySeed};
use shared_utils::time_grid::Weekday;

#[tokio::test]
async fn example_seed_loads_profiles_and_patterns() {
    let seed: MemorySeed = serde_json::from_str(include_str!("../../../apps/api/memory-seed.example.json")).unwrap();
    let store = InMemoryAvailabilityStore::new();
    store.load_seed(seed).await.unwrap();

    let id: Uuid = "7d9f5c1e-2b4a-4c8e-9f3d-1a2b3c4d5e6f".parse().unwrap();
    let profile = store.get_professional(id).await.unwrap().unwrap();
    assert_eq!(profile.timezone, "America/Sao_Paulo");

    let weekly = store.get_weekly_availability(id, Modality::Remote).await.unwrap().unwrap();
    assert_eq!(weekly.blocks_for(Weekday::Monday).len(), 2);
    assert!(store.get_weekly_availability(id, Modality::InPerson).await.unwrap().is_none());
}

#[tokio::test]
async fn patterns_for_unknown_profiles_are_refused() {
    let orphan = Uuid::new_v4();
    let seed: MemorySeed = serde_json::from_value(json!({
        "weekly_availability": [
            { "professional_id": orphan, "modality": "remote", "days": [] }
        ]
    }))
    .unwrap();

    let result = InMemoryAvailabilityStore::new().load_seed(seed).await;
    assert_matches!(result, Err(AvailabilityError::ProfessionalNotFound(id)) if id == orphan);
}

#[tokio::test]
async fn invalid_timezones_are_refused() {
    let seed: MemorySeed = serde_json::from_value(json!({
        "professionals": [{
            "id": Uuid::new_v4(),
            "role": "professional",
            "session_duration_minutes": null,
            "session_price": 0.0,
            "timezone": "Mars/Olympus"
        }]
    }))
    .unwrap();

    let result = InMemoryAvailabilityStore::new().load_seed(seed).await;
    assert_matches!(result, Err(AvailabilityError::ValidationError(_)));
}
