use tracing::debug;

use crate::hours::{HoursCheck, check_business_hours};
use crate::model::*;

use super::{ReservationService, ServiceError};

impl ReservationService {
    /// False iff another reservation on the lane overlaps `span`.
    /// `exclude` is the reservation being moved, if any.
    pub async fn check_availability(
        &self,
        span: &Span,
        lane_id: LaneId,
        exclude: Option<ReservationId>,
    ) -> bool {
        self.engine.is_available(lane_id, span, exclude).await
    }

    pub(super) async fn require_available(
        &self,
        span: &Span,
        lane_id: LaneId,
        exclude: Option<ReservationId>,
    ) -> Result<(), ServiceError> {
        if self.check_availability(span, lane_id, exclude).await {
            Ok(())
        } else {
            Err(ServiceError::Unavailable)
        }
    }

    /// Every verdict other than `Within` is reported to the caller the same
    /// way; the log keeps the distinction.
    pub(super) async fn require_business_hours(
        &self,
        span: &Span,
        lane_id: LaneId,
    ) -> Result<(), ServiceError> {
        match check_business_hours(self.catalog.as_ref(), span, lane_id).await {
            HoursCheck::Within => Ok(()),
            verdict => {
                debug!(
                    "lane {lane_id} slot {} - {} failed opening hours: {}",
                    span.start,
                    span.end,
                    verdict.label()
                );
                Err(ServiceError::OutsideBusinessHours)
            }
        }
    }
}
