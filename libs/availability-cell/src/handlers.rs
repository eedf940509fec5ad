// libs/availability-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::Actor;
use shared_models::error::AppError;
use shared_utils::extractor::{AppJson, AppPath, AppQuery};

use crate::models::{
    AvailabilityError, AvailabilityException, Modality, PutExceptionRequest, ReplaceAvailabilityRequest,
};
use crate::services::AvailabilityResolver;

#[derive(Debug, Deserialize)]
pub struct OpenIntervalsQuery {
    pub modality: Modality,
    pub date: NaiveDate,
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::ProfessionalNotFound(_) => AppError::NotFound(err.to_string()),
            AvailabilityError::ValidationError(msg) => AppError::ValidationError(msg),
            AvailabilityError::Unauthorized => AppError::Forbidden(err.to_string()),
            AvailabilityError::StorageTimeout => AppError::StorageTimeout(err.to_string()),
            AvailabilityError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_open_intervals(
    State(resolver): State<Arc<AvailabilityResolver>>,
    AppPath(professional_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<OpenIntervalsQuery>,
) -> Result<Json<Value>, AppError> {
    resolver.get_professional(professional_id).await?;

    let intervals = resolver
        .open_intervals_for(professional_id, query.modality, query.date)
        .await?;

    Ok(Json(json!({
        "professional_id": professional_id,
        "modality": query.modality,
        "date": query.date,
        "intervals": intervals,
    })))
}

#[axum::debug_handler]
pub async fn get_weekly_availability(
    State(resolver): State<Arc<AvailabilityResolver>>,
    AppPath((professional_id, modality)): AppPath<(Uuid, Modality)>,
) -> Result<Json<Value>, AppError> {
    resolver.get_professional(professional_id).await?;

    let availability = resolver.get_weekly_availability(professional_id, modality).await?;
    let days = availability.map(|a| a.days).unwrap_or_default();

    Ok(Json(json!({
        "professional_id": professional_id,
        "modality": modality,
        "days": days,
    })))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn replace_weekly_availability(
    State(resolver): State<Arc<AvailabilityResolver>>,
    Extension(actor): Extension<Actor>,
    AppPath((professional_id, modality)): AppPath<(Uuid, Modality)>,
    AppJson(request): AppJson<ReplaceAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let availability = resolver
        .replace_weekly_availability(&actor, professional_id, modality, request.days)
        .await?;

    Ok(Json(json!({
        "availability": availability,
        "message": "Weekly availability updated",
    })))
}

#[axum::debug_handler]
pub async fn put_exception(
    State(resolver): State<Arc<AvailabilityResolver>>,
    Extension(actor): Extension<Actor>,
    AppPath((professional_id, modality, date)): AppPath<(Uuid, Modality, NaiveDate)>,
    AppJson(request): AppJson<PutExceptionRequest>,
) -> Result<Json<Value>, AppError> {
    let exception = AvailabilityException {
        professional_id,
        modality,
        date,
        kind: request.kind,
        reason: request.reason,
    };

    let exception = resolver.put_exception(&actor, exception).await?;

    Ok(Json(json!({
        "exception": exception,
        "message": "Availability exception saved",
    })))
}
