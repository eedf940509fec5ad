use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, put},
    Router,
};

use shared_utils::extractor::identity_middleware;

use crate::handlers;
use crate::services::AvailabilityResolver;

pub fn availability_routes(resolver: Arc<AvailabilityResolver>) -> Router {
    // Public routes (no identity required)
    let public_routes = Router::new()
        .route("/professionals/{professional_id}/open-intervals", get(handlers::get_open_intervals))
        .route(
            "/professionals/{professional_id}/availability/{modality}",
            get(handlers::get_weekly_availability),
        );

    // Protected routes (owner professional or admin)
    let protected_routes = Router::new()
        .route(
            "/professionals/{professional_id}/availability/{modality}",
            put(handlers::replace_weekly_availability),
        )
        .route(
            "/professionals/{professional_id}/exceptions/{modality}/{date}",
            put(handlers::put_exception),
        )
        .layer(middleware::from_fn(identity_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(resolver)
}
