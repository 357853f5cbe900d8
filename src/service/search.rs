use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use tracing::debug;

use crate::hours::check_alley_hours;
use crate::limits::MAX_LANES_PER_SEARCH;
use crate::model::*;
use crate::observability::LANE_SEARCH_RESULTS;

use super::{ReservationService, ServiceError};

impl ReservationService {
    /// Lanes of `alley_id` where `span` is inside opening hours and free,
    /// yielded lazily in catalog order. `existing` is the reservation the
    /// caller wants to move; its own slot does not block its lane.
    ///
    /// The result is a snapshot; nothing is held for the caller.
    pub async fn available_lanes(
        &self,
        existing: Option<&Reservation>,
        alley_id: AlleyId,
        span: Span,
    ) -> BoxStream<'static, Lane> {
        let alley = self.catalog.alley(alley_id).await.map(Arc::new);
        let lanes = match &alley {
            Some(_) => self.catalog.lanes_in_alley(alley_id).await,
            None => Vec::new(),
        };
        let exclude = existing.map(|r| r.id);
        let engine = self.engine.clone();

        stream::iter(lanes.into_iter().take(MAX_LANES_PER_SEARCH))
            .filter_map(move |lane| {
                let engine = engine.clone();
                let alley = alley.clone();
                async move {
                    let alley = alley?;
                    if !check_alley_hours(&alley, &span).is_within() {
                        return None;
                    }
                    engine
                        .is_available(lane.id, &span, exclude)
                        .await
                        .then_some(lane)
                }
            })
            .boxed()
    }

    /// Lane search on behalf of `requester`. A `reservation_id` that does not
    /// resolve is ignored; one that belongs to someone else is `Forbidden`.
    pub async fn find_available_lanes(
        &self,
        requester: &str,
        alley_id: AlleyId,
        begin: NaiveDateTime,
        end: NaiveDateTime,
        reservation_id: Option<ReservationId>,
    ) -> Result<Vec<Lane>, ServiceError> {
        let started = Instant::now();
        let result = self
            .try_find_available_lanes(requester, alley_id, begin, end, reservation_id)
            .await;
        self.finish("find_available_lanes", started, result)
    }

    async fn try_find_available_lanes(
        &self,
        requester: &str,
        alley_id: AlleyId,
        begin: NaiveDateTime,
        end: NaiveDateTime,
        reservation_id: Option<ReservationId>,
    ) -> Result<Vec<Lane>, ServiceError> {
        let span = Span::try_new(begin, end).ok_or(ServiceError::Inverted)?;
        let existing = match reservation_id {
            Some(id) => self.engine.get_reservation(id).await,
            None => None,
        };
        if let Some(r) = &existing
            && !r.is_owned_by(requester)
        {
            return Err(ServiceError::Forbidden);
        }

        let lanes: Vec<Lane> = self
            .available_lanes(existing.as_ref(), alley_id, span)
            .await
            .collect()
            .await;
        metrics::histogram!(LANE_SEARCH_RESULTS).record(lanes.len() as f64);
        debug!("alley {alley_id}: {} lanes free for {begin} - {end}", lanes.len());
        Ok(lanes)
    }
}
