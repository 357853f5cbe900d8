//! Reservation lifecycle: runs the slot, opening-hours and availability checks
//! in order and hands the surviving writes to the engine.
//!
//! The first failing check wins and nothing is written. Availability here is a
//! fast path only; the engine re-checks overlap under the lane's write lock.

mod availability;
mod error;
mod lifecycle;
mod search;

pub use error::{ErrorKind, ServiceError};

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::catalog::Catalog;
use crate::engine::{Engine, ReservationFilter};
use crate::limits::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::model::*;
use crate::observability;
use crate::slot::Clock;

/// Who a read or delete is performed on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    Owner(OwnerId),
    Admin,
}

impl AccessScope {
    pub fn permits(&self, reservation: &Reservation) -> bool {
        match self {
            AccessScope::Owner(owner) => reservation.is_owned_by(owner),
            AccessScope::Admin => true,
        }
    }

    fn owner(&self) -> Option<&OwnerId> {
        match self {
            AccessScope::Owner(owner) => Some(owner),
            AccessScope::Admin => None,
        }
    }
}

/// Paging and expiry selection for listing reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationQuery {
    pub is_expired: bool,
    /// 1-based.
    pub page_number: usize,
    pub page_size: usize,
}

impl Default for ReservationQuery {
    fn default() -> Self {
        Self {
            is_expired: false,
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ReservationQuery {
    fn to_filter(self, scope: &AccessScope, now: chrono::NaiveDateTime) -> Result<ReservationFilter, ServiceError> {
        if self.page_number < 1 {
            return Err(ServiceError::InvalidQuery("pageNumber must be at least 1".into()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ServiceError::InvalidQuery(format!(
                "pageSize must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let mut filter = ReservationFilter::new(now);
        filter.owner_id = scope.owner().cloned();
        filter.expired = Some(self.is_expired);
        filter.skip = (self.page_number - 1).saturating_mul(self.page_size);
        filter.limit = self.page_size;
        Ok(filter)
    }
}

/// A reservation joined with its lane and alley for display.
/// Catalog entries that have gone missing are left as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationView {
    pub reservation: Reservation,
    pub lane: Option<Lane>,
    pub alley: Option<Alley>,
}

pub struct ReservationService {
    engine: Arc<Engine>,
    catalog: Arc<dyn Catalog>,
    clock: Arc<dyn Clock>,
}

impl ReservationService {
    pub fn new(engine: Arc<Engine>, catalog: Arc<dyn Catalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine,
            catalog,
            clock,
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Record metrics for a finished operation and pass its result through.
    fn finish<T>(
        &self,
        operation: &'static str,
        started: Instant,
        result: Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => {
                debug!("{operation} rejected: {e}");
                observability::record_rejection(e.reason());
                match e.kind() {
                    ErrorKind::Persistence => "error",
                    _ => "rejected",
                }
            }
        };
        observability::record_operation(operation, outcome, started);
        result
    }

    /// Look a reservation up, `ReservationNotFound` if it is gone.
    async fn fetch(&self, id: ReservationId) -> Result<Reservation, ServiceError> {
        self.engine
            .get_reservation(id)
            .await
            .ok_or(ServiceError::ReservationNotFound(id))
    }

    pub async fn view(&self, reservation: Reservation) -> ReservationView {
        let lane = self.catalog.lane(reservation.lane_id).await;
        let alley = match &lane {
            Some(lane) => self.catalog.alley(lane.alley_id).await,
            None => None,
        };
        ReservationView {
            reservation,
            lane,
            alley,
        }
    }

    pub async fn views(&self, reservations: Vec<Reservation>) -> Vec<ReservationView> {
        let mut views = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            views.push(self.view(reservation).await);
        }
        views
    }
}
