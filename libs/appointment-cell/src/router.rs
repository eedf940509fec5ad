use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::identity_middleware;

use crate::handlers::{self, AppointmentState};

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    // Public routes (slot listing is advisory and read-only)
    let public_routes = Router::new()
        .route("/professionals/{professional_id}/slots", get(handlers::get_slots));

    // Protected routes (identity required)
    let protected_routes = Router::new()
        .route("/appointments", post(handlers::request_appointment))
        .route("/appointments/{appointment_id}", get(handlers::get_appointment))
        .route("/appointments/{appointment_id}/transitions", post(handlers::transition_appointment))
        .route("/appointments/{appointment_id}/payment", post(handlers::record_payment))
        .layer(middleware::from_fn(identity_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
