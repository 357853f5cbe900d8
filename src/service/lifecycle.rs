use std::time::Instant;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::model::*;
use crate::slot::{is_not_past, validate};

use super::{AccessScope, ReservationQuery, ReservationService, ServiceError};

impl ReservationService {
    /// Book `[begin, end)` on a lane for `owner`.
    pub async fn create(
        &self,
        owner: &str,
        lane_id: LaneId,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Reservation, ServiceError> {
        let started = Instant::now();
        let result = self.try_create(owner, lane_id, begin, end).await;
        self.finish("create", started, result)
    }

    async fn try_create(
        &self,
        owner: &str,
        lane_id: LaneId,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Reservation, ServiceError> {
        if !self.catalog.lane_exists(lane_id).await {
            return Err(ServiceError::LaneNotFound(lane_id));
        }
        let span = validate(begin, end)?;
        if !is_not_past(&span, self.clock.now()) {
            return Err(ServiceError::InPast);
        }
        self.require_business_hours(&span, lane_id).await?;
        self.require_available(&span, lane_id, None).await?;

        let reservation = self
            .engine
            .insert_reservation(lane_id, owner.to_owned(), span)
            .await?;
        info!(
            "reservation {} created on lane {lane_id} for {owner}: {begin} - {end}",
            reservation.id
        );
        Ok(reservation)
    }

    /// Move one of `owner`'s reservations to a new window on the same lane.
    pub async fn update(
        &self,
        owner: &str,
        id: ReservationId,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Reservation, ServiceError> {
        let started = Instant::now();
        let result = self.try_update(owner, id, begin, end).await;
        self.finish("update", started, result)
    }

    async fn try_update(
        &self,
        owner: &str,
        id: ReservationId,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Reservation, ServiceError> {
        let existing = self.fetch(id).await?;
        if !existing.is_owned_by(owner) {
            return Err(ServiceError::Forbidden);
        }
        let now = self.clock.now();
        if !is_not_past(&existing.span, now) {
            return Err(ServiceError::AlreadyElapsed);
        }
        let span = validate(begin, end)?;
        if !is_not_past(&span, now) {
            return Err(ServiceError::InPast);
        }
        self.require_business_hours(&span, existing.lane_id).await?;
        self.require_available(&span, existing.lane_id, Some(id)).await?;

        let updated = self.engine.reschedule_reservation(id, span).await?;
        info!("reservation {id} moved to {begin} - {end}");
        Ok(updated)
    }

    /// Owners may cancel their own reservations until they start; admins may
    /// remove any reservation at any time.
    pub async fn delete(&self, scope: &AccessScope, id: ReservationId) -> Result<(), ServiceError> {
        let started = Instant::now();
        let result = self.try_delete(scope, id).await;
        let operation = match scope {
            AccessScope::Owner(_) => "delete",
            AccessScope::Admin => "admin_delete",
        };
        self.finish(operation, started, result)
    }

    async fn try_delete(&self, scope: &AccessScope, id: ReservationId) -> Result<(), ServiceError> {
        let existing = self.fetch(id).await?;
        if let AccessScope::Owner(_) = scope {
            if !scope.permits(&existing) {
                return Err(ServiceError::Forbidden);
            }
            if !is_not_past(&existing.span, self.clock.now()) {
                return Err(ServiceError::AlreadyElapsed);
            }
        }
        self.engine.delete_reservation(id).await?;
        info!("reservation {id} deleted ({scope:?})");
        Ok(())
    }

    pub async fn get(&self, scope: &AccessScope, id: ReservationId) -> Result<Reservation, ServiceError> {
        let started = Instant::now();
        let result = self.fetch(id).await.and_then(|r| {
            if scope.permits(&r) {
                Ok(r)
            } else {
                Err(ServiceError::Forbidden)
            }
        });
        self.finish("get", started, result)
    }

    /// The scope's reservations, filtered and paged by `query`.
    pub async fn list(
        &self,
        scope: &AccessScope,
        query: ReservationQuery,
    ) -> Result<Vec<Reservation>, ServiceError> {
        let started = Instant::now();
        let result = match query.to_filter(scope, self.clock.now()) {
            Ok(filter) => Ok(self.engine.list_reservations(&filter).await),
            Err(e) => Err(e),
        };
        self.finish("list", started, result)
    }

    /// Bookable whole-hour slots on a lane for one date: inside opening hours,
    /// not yet begun and not overlapping any reservation.
    pub async fn free_slots(&self, lane_id: LaneId, date: NaiveDate) -> Result<Vec<Span>, ServiceError> {
        let started = Instant::now();
        let result = self.try_free_slots(lane_id, date).await;
        self.finish("free_slots", started, result)
    }

    async fn try_free_slots(&self, lane_id: LaneId, date: NaiveDate) -> Result<Vec<Span>, ServiceError> {
        let lane = self
            .catalog
            .lane(lane_id)
            .await
            .ok_or(ServiceError::LaneNotFound(lane_id))?;
        let Some(alley) = self.catalog.alley(lane.alley_id).await else {
            warn!("lane {lane_id} points at missing alley {}", lane.alley_id);
            return Ok(Vec::new());
        };
        let Some(window) = alley
            .opening_hours
            .window_for(date)
            .and_then(|hours| hours.on(date))
        else {
            return Ok(Vec::new());
        };

        let now = self.clock.now();
        let slots = self.engine.free_slots(lane_id, &window).await;
        Ok(slots.into_iter().filter(|s| is_not_past(s, now)).collect())
    }
}
