// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use availability_cell::models::Modality;
use shared_models::auth::Actor;
use shared_models::error::AppError;
use shared_utils::extractor::{AppJson, AppPath, AppQuery};

use crate::models::{AppointmentError, RecordPaymentRequest, RequestAppointment, SlotQuery, Transition};
use crate::services::{BookingService, SlotService};

pub struct AppointmentState {
    pub booking: Arc<BookingService>,
    pub slots: Arc<SlotService>,
}

#[derive(Debug, Deserialize)]
pub struct SlotsParams {
    pub modality: Modality,
    pub week_start: Option<NaiveDate>,
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::NotFound(_) | AppointmentError::ProfessionalNotFound(_) => AppError::NotFound(message),
            AppointmentError::SlotConflict { .. } => AppError::Conflict(message),
            AppointmentError::InvalidTransition { .. } => AppError::InvalidTransition(message),
            AppointmentError::Unauthorized(msg) => AppError::Forbidden(msg),
            AppointmentError::PreconditionFailed(msg) => AppError::PreconditionFailed(msg),
            AppointmentError::StorageTimeout => AppError::StorageTimeout(message),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_slots(
    State(state): State<Arc<AppointmentState>>,
    AppPath(professional_id): AppPath<Uuid>,
    AppQuery(params): AppQuery<SlotsParams>,
) -> Result<Json<Value>, AppError> {
    let query = SlotQuery {
        professional_id,
        modality: params.modality,
        week_start: params.week_start,
    };

    let response = state.slots.compute_slots(query).await?;
    Ok(Json(json!(response)))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn request_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
    AppJson(request): AppJson<RequestAppointment>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let appointment = state.booking.request_appointment(&actor, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "appointment": appointment,
            "message": "Appointment requested",
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
    AppPath(appointment_id): AppPath<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = state.booking.get_appointment(&actor, appointment_id).await?;
    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn transition_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
    AppPath(appointment_id): AppPath<Uuid>,
    AppJson(transition): AppJson<Transition>,
) -> Result<Json<Value>, AppError> {
    let action = transition.action();
    let appointment = state.booking.transition(&actor, appointment_id, transition).await?;

    Ok(Json(json!({
        "appointment": appointment,
        "action": action,
    })))
}

#[axum::debug_handler]
pub async fn record_payment(
    State(state): State<Arc<AppointmentState>>,
    Extension(actor): Extension<Actor>,
    AppPath(appointment_id): AppPath<Uuid>,
    AppJson(request): AppJson<RecordPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = state
        .booking
        .record_payment(&actor, appointment_id, request.payment_status)
        .await?;

    Ok(Json(json!({
        "appointment": appointment,
        "message": "Payment recorded",
    })))
}
