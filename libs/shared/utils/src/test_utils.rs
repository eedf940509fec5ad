use axum::http::request::Builder;
use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Actor, Role};

use crate::extractor::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::time_grid::{weekday_of, Weekday};

pub struct TestConfig {
    pub slot_stride_minutes: u32,
    pub default_session_minutes: u32,
    pub storage_timeout_ms: u64,
    pub enforce_availability: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            slot_stride_minutes: 30,
            default_session_minutes: 50,
            storage_timeout_ms: 1_000,
            enforce_availability: true,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            slot_stride_minutes: self.slot_stride_minutes,
            default_session_minutes: self.default_session_minutes,
            storage_timeout_ms: self.storage_timeout_ms,
            enforce_availability: self.enforce_availability,
            ..AppConfig::default()
        }
    }
}

pub struct TestUser;

impl TestUser {
    pub fn client() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Client)
    }

    pub fn professional() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Professional)
    }

    pub fn admin() -> Actor {
        Actor::new(Uuid::new_v4(), Role::Admin)
    }
}

/// Attach the gateway identity headers for `actor` to a request builder.
pub fn with_identity(builder: Builder, actor: &Actor) -> Builder {
    builder
        .header(USER_ID_HEADER, actor.user_id.to_string())
        .header(USER_ROLE_HEADER, actor.role.to_string())
}

/// First date on or after `from` falling on `weekday`.
pub fn next_weekday(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let mut date = from;
    while weekday_of(date) != weekday {
        date += Duration::days(1);
    }
    date
}

/// A Monday far enough ahead that generated slots are never in the past.
pub fn future_monday() -> NaiveDate {
    next_weekday(Utc::now().date_naive() + Duration::days(365), Weekday::Monday)
}
