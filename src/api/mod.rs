//! HTTP surface: axum router, identity extraction and error mapping over the
//! reservation service.

pub mod auth;
pub mod errors;
pub mod handlers;
pub mod models;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::service::ReservationService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReservationService>,
}

impl AppState {
    pub fn new(service: ReservationService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/reservation", get(handlers::list_reservations))
        .route(
            "/api/reservation/adminaccess",
            get(handlers::list_all_reservations),
        )
        .route(
            "/api/reservation/adminaccess/{id}",
            delete(handlers::admin_delete_reservation),
        )
        .route(
            "/api/reservation/availablelanes/{alley_id}",
            post(handlers::find_available_lanes),
        )
        // POST takes a lane id in this position, the other methods a reservation id.
        .route(
            "/api/reservation/{id}",
            get(handlers::get_reservation)
                .put(handlers::update_reservation)
                .delete(handlers::delete_reservation)
                .post(handlers::create_reservation),
        )
        .route("/api/lane/{lane_id}/freeslots", get(handlers::lane_free_slots))
        .with_state(state)
}
