use crate::engine::EngineError;
use crate::model::{LaneId, ReservationId};
use crate::slot::SlotError;

/// Coarse classification used for status mapping and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    Conflict,
    Persistence,
}

/// Why a reservation operation was turned down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    Misaligned,
    Inverted,
    InvalidQuery(String),
    LimitExceeded(&'static str),
    ReservationNotFound(ReservationId),
    LaneNotFound(LaneId),
    Forbidden,
    /// The requested slot begins before now.
    InPast,
    /// The existing reservation has already started and can no longer change.
    AlreadyElapsed,
    OutsideBusinessHours,
    Unavailable,
    /// Passed every pre-check but lost the race for the slot; safe to retry.
    ConcurrentConflict,
    Storage(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Misaligned
            | ServiceError::Inverted
            | ServiceError::InvalidQuery(_)
            | ServiceError::LimitExceeded(_) => ErrorKind::Validation,
            ServiceError::ReservationNotFound(_) | ServiceError::LaneNotFound(_) => {
                ErrorKind::NotFound
            }
            ServiceError::Forbidden => ErrorKind::Authorization,
            ServiceError::InPast
            | ServiceError::AlreadyElapsed
            | ServiceError::OutsideBusinessHours
            | ServiceError::Unavailable => ErrorKind::Conflict,
            ServiceError::ConcurrentConflict | ServiceError::Storage(_) => ErrorKind::Persistence,
        }
    }

    /// Short label for the rejection metric.
    pub fn reason(&self) -> &'static str {
        match self {
            ServiceError::Misaligned => "misaligned",
            ServiceError::Inverted => "inverted",
            ServiceError::InvalidQuery(_) => "invalid_query",
            ServiceError::LimitExceeded(_) => "limit_exceeded",
            ServiceError::ReservationNotFound(_) => "reservation_not_found",
            ServiceError::LaneNotFound(_) => "lane_not_found",
            ServiceError::Forbidden => "forbidden",
            ServiceError::InPast => "in_past",
            ServiceError::AlreadyElapsed => "already_elapsed",
            ServiceError::OutsideBusinessHours => "outside_business_hours",
            ServiceError::Unavailable => "unavailable",
            ServiceError::ConcurrentConflict => "concurrent_conflict",
            ServiceError::Storage(_) => "storage",
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Misaligned => write!(f, "{}", SlotError::Misaligned),
            ServiceError::Inverted => write!(f, "{}", SlotError::Inverted),
            ServiceError::InvalidQuery(msg) => write!(f, "invalid query: {msg}"),
            ServiceError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            ServiceError::ReservationNotFound(id) => write!(f, "reservation {id} not found"),
            ServiceError::LaneNotFound(id) => write!(f, "lane {id} does not exist"),
            ServiceError::Forbidden => write!(f, "forbidden"),
            ServiceError::InPast => write!(f, "cannot book a slot in the past"),
            ServiceError::AlreadyElapsed => {
                write!(f, "reservation has already started and can no longer be changed")
            }
            ServiceError::OutsideBusinessHours => {
                write!(f, "slot is outside the alley's opening hours")
            }
            ServiceError::Unavailable => write!(f, "slot is not available"),
            ServiceError::ConcurrentConflict => {
                write!(f, "slot was taken by a concurrent booking, try again")
            }
            ServiceError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<SlotError> for ServiceError {
    fn from(e: SlotError) -> Self {
        match e {
            SlotError::Misaligned => ServiceError::Misaligned,
            SlotError::Inverted => ServiceError::Inverted,
        }
    }
}

impl From<EngineError> for ServiceError {
    fn from(e: EngineError) -> Self {
        match e {
            // Deleted between the lookup and the write.
            EngineError::NotFound(id) => ServiceError::ReservationNotFound(id),
            EngineError::Conflict(_) => {
                metrics::counter!(crate::observability::BACKSTOP_CONFLICTS_TOTAL).increment(1);
                ServiceError::ConcurrentConflict
            }
            EngineError::LimitExceeded(msg) => ServiceError::LimitExceeded(msg),
            EngineError::WalError(e) => ServiceError::Storage(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(ServiceError::Misaligned.kind(), ErrorKind::Validation);
        assert_eq!(ServiceError::LaneNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(ServiceError::Forbidden.kind(), ErrorKind::Authorization);
        assert_eq!(ServiceError::AlreadyElapsed.kind(), ErrorKind::Conflict);
        assert_eq!(ServiceError::ConcurrentConflict.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn engine_errors_map_across() {
        assert_eq!(
            ServiceError::from(EngineError::Conflict(3)),
            ServiceError::ConcurrentConflict
        );
        assert_eq!(
            ServiceError::from(EngineError::NotFound(3)),
            ServiceError::ReservationNotFound(3)
        );
        assert!(matches!(
            ServiceError::from(EngineError::WalError("disk full".into())),
            ServiceError::Storage(e) if e == "disk full"
        ));
    }

    #[test]
    fn slot_errors_keep_their_message() {
        assert_eq!(
            ServiceError::from(SlotError::Misaligned).to_string(),
            SlotError::Misaligned.to_string()
        );
    }
}
