#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use appointment_cell::services::{
    BookingService, InMemoryAppointmentStore, NotificationSink, SlotService, TracingNotificationSink,
};
use availability_cell::models::{DaySchedule, Modality, ProfessionalProfile};
use availability_cell::services::{AvailabilityResolver, InMemoryAvailabilityStore};
use shared_config::AppConfig;
use shared_models::auth::{Actor, Role};
use shared_utils::test_utils::{TestConfig, TestUser};
use shared_utils::time_grid::{local_instant, parse_clock_time, TimeRange, Weekday};

/// Wired services over in-memory stores with one professional in UTC.
pub struct Fixture {
    pub config: AppConfig,
    pub availability_store: Arc<InMemoryAvailabilityStore>,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub resolver: Arc<AvailabilityResolver>,
    pub booking: Arc<BookingService>,
    pub slots: Arc<SlotService>,
    pub professional: Actor,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with(TestConfig::default().to_app_config(), Arc::new(TracingNotificationSink)).await
    }

    pub async fn with(config: AppConfig, notifier: Arc<dyn NotificationSink>) -> Self {
        let availability_store = Arc::new(InMemoryAvailabilityStore::new());
        let appointments = Arc::new(InMemoryAppointmentStore::new());
        let professional = TestUser::professional();

        availability_store
            .upsert_professional(ProfessionalProfile {
                id: professional.user_id,
                role: Role::Professional,
                session_duration_minutes: Some(50),
                session_price: 75.0,
                timezone: "UTC".to_string(),
            })
            .await;

        let resolver = Arc::new(AvailabilityResolver::new(availability_store.clone(), &config));
        let booking = Arc::new(BookingService::new(
            appointments.clone(),
            resolver.clone(),
            notifier,
            &config,
        ));
        let slots = Arc::new(SlotService::new(resolver.clone(), appointments.clone(), &config));

        Self {
            config,
            availability_store,
            appointments,
            resolver,
            booking,
            slots,
            professional,
        }
    }

    /// Replace the professional's remote weekly pattern.
    pub async fn open(&self, days: &[(Weekday, &str, &str)]) {
        let schedules = days
            .iter()
            .map(|(weekday, start, end)| DaySchedule {
                weekday: *weekday,
                blocks: vec![TimeRange::parse(start, end).unwrap()],
            })
            .collect();

        self.resolver
            .replace_weekly_availability(&self.professional, self.professional.user_id, Modality::Remote, schedules)
            .await
            .unwrap();
    }
}

pub fn at(date: NaiveDate, clock: &str) -> DateTime<Utc> {
    local_instant(date, parse_clock_time(clock).unwrap(), &chrono_tz::Tz::UTC).unwrap()
}

pub fn client() -> Actor {
    TestUser::client()
}
