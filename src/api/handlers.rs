use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
};

use crate::model::{AlleyId, LaneId, ReservationId};
use crate::service::AccessScope;

use super::AppState;
use super::auth::{CurrentUser, RequireAdmin};
use super::errors::Error;
use super::models::*;

type Created<T> = (StatusCode, [(header::HeaderName, String); 1], Json<T>);

// GET /api/reservation - caller's reservations
#[tracing::instrument(skip_all)]
pub async fn list_reservations(
    State(state): State<AppState>,
    user: CurrentUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<ReservationResponse>>, Error> {
    let Query(params) = params?;
    let reservations = state.service.list(&user.owner_scope(), params.into()).await?;
    let views = state.service.views(reservations).await;
    Ok(Json(views.into_iter().map(Into::into).collect()))
}

// GET /api/reservation/adminaccess - every reservation
#[tracing::instrument(skip_all)]
pub async fn list_all_reservations(
    State(state): State<AppState>,
    _: RequireAdmin,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<ReservationResponse>>, Error> {
    let Query(params) = params?;
    let reservations = state.service.list(&AccessScope::Admin, params.into()).await?;
    let views = state.service.views(reservations).await;
    Ok(Json(views.into_iter().map(Into::into).collect()))
}

// GET /api/reservation/{id}
#[tracing::instrument(skip_all)]
pub async fn get_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    id: Result<Path<ReservationId>, PathRejection>,
) -> Result<Json<ReservationResponse>, Error> {
    let Path(id) = id?;
    let reservation = state.service.get(&user.owner_scope(), id).await?;
    Ok(Json(state.service.view(reservation).await.into()))
}

// POST /api/reservation/{laneId} - book a slot
#[tracing::instrument(skip_all)]
pub async fn create_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    lane_id: Result<Path<LaneId>, PathRejection>,
    body: Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<Created<ReservationResponse>, Error> {
    let Path(lane_id) = lane_id?;
    let Json(body) = body?;
    let reservation = state
        .service
        .create(&user.id, lane_id, body.begin_time, body.end_time)
        .await?;
    let location = format!("/api/reservation/{}", reservation.id);
    let response = state.service.view(reservation).await.into();
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(response)))
}

// PUT /api/reservation/{id} - move a reservation
#[tracing::instrument(skip_all)]
pub async fn update_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    id: Result<Path<ReservationId>, PathRejection>,
    body: Result<Json<ReservationRequest>, JsonRejection>,
) -> Result<Json<ReservationResponse>, Error> {
    let Path(id) = id?;
    let Json(body) = body?;
    let reservation = state
        .service
        .update(&user.id, id, body.begin_time, body.end_time)
        .await?;
    Ok(Json(state.service.view(reservation).await.into()))
}

// DELETE /api/reservation/{id} - owner cancels
#[tracing::instrument(skip_all)]
pub async fn delete_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    id: Result<Path<ReservationId>, PathRejection>,
) -> Result<StatusCode, Error> {
    let Path(id) = id?;
    state.service.delete(&user.owner_scope(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// DELETE /api/reservation/adminaccess/{id}
#[tracing::instrument(skip_all)]
pub async fn admin_delete_reservation(
    State(state): State<AppState>,
    _: RequireAdmin,
    id: Result<Path<ReservationId>, PathRejection>,
) -> Result<StatusCode, Error> {
    let Path(id) = id?;
    state.service.delete(&AccessScope::Admin, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/reservation/availablelanes/{alleyId}
#[tracing::instrument(skip_all)]
pub async fn find_available_lanes(
    State(state): State<AppState>,
    user: CurrentUser,
    alley_id: Result<Path<AlleyId>, PathRejection>,
    body: Result<Json<FindLanesRequest>, JsonRejection>,
) -> Result<Json<Vec<LaneResponse>>, Error> {
    let Path(alley_id) = alley_id?;
    let Json(body) = body?;
    let lanes = state
        .service
        .find_available_lanes(
            &user.id,
            alley_id,
            body.begin_time,
            body.end_time,
            body.reservation_id,
        )
        .await?;
    Ok(Json(lanes.into_iter().map(Into::into).collect()))
}

// GET /api/lane/{laneId}/freeslots?date=YYYY-MM-DD
#[tracing::instrument(skip_all)]
pub async fn lane_free_slots(
    State(state): State<AppState>,
    lane_id: Result<Path<LaneId>, PathRejection>,
    params: Result<Query<FreeSlotsParams>, QueryRejection>,
) -> Result<Json<Vec<SlotResponse>>, Error> {
    let Path(lane_id) = lane_id?;
    let Query(params) = params?;
    let slots = state.service.free_slots(lane_id, params.date).await?;
    Ok(Json(slots.into_iter().map(Into::into).collect()))
}
