use chrono::NaiveDateTime;

use crate::limits::DEFAULT_PAGE_SIZE;
use crate::model::*;

use super::Engine;
use super::availability::{free_windows, hourly_slots};
use super::conflict::check_no_conflict;

/// Selection for `list_reservations`.
#[derive(Debug, Clone)]
pub struct ReservationFilter {
    /// Only reservations made by this owner; `None` lists everyone's.
    pub owner_id: Option<OwnerId>,
    /// `Some(true)`: ended at or before `now`. `Some(false)`: still ahead or running.
    pub expired: Option<bool>,
    pub now: NaiveDateTime,
    pub skip: usize,
    pub limit: usize,
}

impl ReservationFilter {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            owner_id: None,
            expired: None,
            now,
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }

    fn matches(&self, r: &Reservation) -> bool {
        if let Some(owner) = &self.owner_id
            && !r.is_owned_by(owner)
        {
            return false;
        }
        match self.expired {
            Some(expired) => (r.span.end <= self.now) == expired,
            None => true,
        }
    }
}

impl Engine {
    pub async fn get_reservation(&self, id: ReservationId) -> Option<Reservation> {
        let lane_id = self.lane_for_reservation(id)?;
        let lane = self.existing_lane(lane_id)?;
        let guard = lane.read().await;
        guard.get(id).cloned()
    }

    /// Whether `span` is free on the lane, ignoring `exclude`.
    /// A lane nobody has booked yet is free.
    pub async fn is_available(
        &self,
        lane_id: LaneId,
        span: &Span,
        exclude: Option<ReservationId>,
    ) -> bool {
        let Some(lane) = self.existing_lane(lane_id) else {
            return true;
        };
        let guard = lane.read().await;
        check_no_conflict(&guard, span, exclude).is_ok()
    }

    pub async fn lane_reservations(&self, lane_id: LaneId) -> Vec<Reservation> {
        match self.existing_lane(lane_id) {
            Some(lane) => lane.read().await.reservations.clone(),
            None => Vec::new(),
        }
    }

    /// Matching reservations ordered by begin time then id, paged by `skip`/`limit`.
    pub async fn list_reservations(&self, filter: &ReservationFilter) -> Vec<Reservation> {
        let mut matched = Vec::new();
        for lane in self.all_lanes() {
            let guard = lane.read().await;
            matched.extend(guard.reservations.iter().filter(|r| filter.matches(r)).cloned());
        }
        matched.sort_by_key(|r| (r.span.start, r.id));
        matched
            .into_iter()
            .skip(filter.skip)
            .take(filter.limit)
            .collect()
    }

    /// Whole-hour slots inside `window` that no reservation on the lane touches.
    pub async fn free_slots(&self, lane_id: LaneId, window: &Span) -> Vec<Span> {
        let free = match self.existing_lane(lane_id) {
            Some(lane) => free_windows(&*lane.read().await, window),
            None => vec![*window],
        };
        hourly_slots(&free)
    }

    pub fn reservation_count(&self) -> usize {
        self.reservation_to_lane.len()
    }
}
