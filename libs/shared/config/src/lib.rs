use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where appointments and availability documents are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Supabase,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "supabase" => Ok(StorageBackend::Supabase),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Status an appointment lands in once the counterparty accepts a reschedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleAcceptPolicy {
    Confirmed,
    Requested,
}

impl FromStr for RescheduleAcceptPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(RescheduleAcceptPolicy::Confirmed),
            "requested" => Ok(RescheduleAcceptPolicy::Requested),
            other => Err(format!("unknown reschedule accept status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub storage_backend: StorageBackend,
    pub bind_addr: String,
    pub slot_stride_minutes: u32,
    pub default_session_minutes: u32,
    pub storage_timeout_ms: u64,
    pub reschedule_accept_policy: RescheduleAcceptPolicy,
    pub enforce_availability: bool,
    /// JSON seed for the memory backend; ignored by Supabase.
    pub memory_seed_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_service_key: String::new(),
            storage_backend: StorageBackend::Memory,
            bind_addr: "0.0.0.0:3000".to_string(),
            slot_stride_minutes: 30,
            default_session_minutes: 50,
            storage_timeout_ms: 5_000,
            reschedule_accept_policy: RescheduleAcceptPolicy::Confirmed,
            enforce_availability: true,
            memory_seed_file: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            storage_backend: parse_or("STORAGE_BACKEND", defaults.storage_backend),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            slot_stride_minutes: parse_or("SLOT_STRIDE_MINUTES", defaults.slot_stride_minutes),
            default_session_minutes: parse_or("DEFAULT_SESSION_MINUTES", defaults.default_session_minutes),
            storage_timeout_ms: parse_or("STORAGE_TIMEOUT_MS", defaults.storage_timeout_ms),
            reschedule_accept_policy: parse_or("RESCHEDULE_ACCEPT_STATUS", defaults.reschedule_accept_policy),
            enforce_availability: parse_or("ENFORCE_AVAILABILITY", defaults.enforce_availability),
            memory_seed_file: env::var("MEMORY_SEED_FILE").ok().filter(|path| !path.trim().is_empty()),
        };

        if config.slot_stride_minutes == 0 {
            warn!("SLOT_STRIDE_MINUTES must be positive, falling back to 30");
        }

        if config.storage_backend == StorageBackend::Supabase && !config.is_supabase_configured() {
            warn!("Supabase storage selected but SUPABASE_URL / SUPABASE_SERVICE_KEY are missing");
        }

        config
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }

    /// Granularity of candidate slot start times. Never zero.
    pub fn slot_stride(&self) -> u32 {
        if self.slot_stride_minutes == 0 { 30 } else { self.slot_stride_minutes }
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("{} has invalid value '{}' ({}), using default", key, raw, e);
            default
        }),
        Err(_) => default,
    }
}
