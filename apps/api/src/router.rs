use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::{info, warn};

use appointment_cell::router::appointment_routes;
use appointment_cell::services::{
    AppointmentStore, BookingService, InMemoryAppointmentStore, SlotService, SupabaseAppointmentStore,
    TracingNotificationSink,
};
use appointment_cell::AppointmentState;
use availability_cell::router::availability_routes;
use availability_cell::services::{
    AvailabilityResolver, AvailabilityStore, InMemoryAvailabilityStore, MemorySeed, SupabaseAvailabilityStore,
};
use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;

type Stores = (Arc<dyn AvailabilityStore>, Arc<dyn AppointmentStore>);

async fn seeded_memory_store(config: &AppConfig) -> anyhow::Result<InMemoryAvailabilityStore> {
    let store = InMemoryAvailabilityStore::new();
    let Some(path) = config.memory_seed_file.as_deref() else {
        warn!("In-memory storage starts empty; set MEMORY_SEED_FILE to load professional profiles");
        return Ok(store);
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read seed file {}", path))?;
    let seed: MemorySeed = serde_json::from_str(&raw).with_context(|| format!("invalid seed file {}", path))?;
    store
        .load_seed(seed)
        .await
        .with_context(|| format!("failed to load seed file {}", path))?;
    Ok(store)
}

async fn build_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    match config.storage_backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            let availability: Arc<dyn AvailabilityStore> = Arc::new(seeded_memory_store(config).await?);
            let appointments: Arc<dyn AppointmentStore> = Arc::new(InMemoryAppointmentStore::new());
            Ok((availability, appointments))
        }
        StorageBackend::Supabase => {
            if !config.is_supabase_configured() {
                anyhow::bail!("STORAGE_BACKEND=supabase requires SUPABASE_URL and SUPABASE_SERVICE_KEY");
            }
            let client = Arc::new(SupabaseClient::new(config).context("failed to build Supabase client")?);
            info!("Using Supabase storage at {}", client.get_base_url());
            let availability: Arc<dyn AvailabilityStore> = Arc::new(SupabaseAvailabilityStore::new(client.clone()));
            let appointments: Arc<dyn AppointmentStore> = Arc::new(SupabaseAppointmentStore::new(client));
            Ok((availability, appointments))
        }
    }
}

pub async fn create_router(config: Arc<AppConfig>) -> anyhow::Result<Router> {
    let (availability_store, appointment_store) = build_stores(&config).await?;

    let resolver = Arc::new(AvailabilityResolver::new(availability_store, &config));
    let booking = Arc::new(BookingService::new(
        appointment_store.clone(),
        resolver.clone(),
        Arc::new(TracingNotificationSink),
        &config,
    ));
    let slots = Arc::new(SlotService::new(resolver.clone(), appointment_store, &config));
    let appointment_state = Arc::new(AppointmentState { booking, slots });

    Ok(Router::new()
        .route("/", get(|| async { "Practice booking API is running!" }))
        .route("/health", get(health))
        .merge(availability_routes(resolver))
        .merge(appointment_routes(appointment_state)))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
