use crate::model::*;

use super::EngineError;

pub(crate) fn validate_span(span: &Span) -> Result<(), EngineError> {
    use crate::limits::MAX_SLOT_HOURS;
    if span.duration() > chrono::TimeDelta::hours(MAX_SLOT_HOURS) {
        return Err(EngineError::LimitExceeded("slot too long"));
    }
    Ok(())
}

/// Half-open overlap test against every reservation on the lane except `exclude`.
/// Returns the first blocking reservation as `Conflict`.
pub(crate) fn check_no_conflict(
    ls: &LaneState,
    span: &Span,
    exclude: Option<ReservationId>,
) -> Result<(), EngineError> {
    match ls
        .overlapping(span)
        .find(|r| exclude != Some(r.id))
    {
        Some(blocking) => Err(EngineError::Conflict(blocking.id)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, 7)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn lane_with(slots: &[(ReservationId, u32, u32)]) -> LaneState {
        let mut ls = LaneState::new(1);
        for &(id, begin_h, end_h) in slots {
            ls.insert_reservation(Reservation {
                id,
                lane_id: 1,
                owner_id: "alice".into(),
                span: Span::new(at(begin_h, 0), at(end_h, 59)),
            });
        }
        ls
    }

    #[test]
    fn overlap_is_a_conflict() {
        let ls = lane_with(&[(1, 14, 14)]);
        let result = check_no_conflict(&ls, &Span::new(at(14, 0), at(14, 59)), None);
        assert!(matches!(result, Err(EngineError::Conflict(1))));
    }

    #[test]
    fn touching_endpoints_do_not_conflict() {
        let ls = lane_with(&[(1, 11, 11)]);
        assert!(check_no_conflict(&ls, &Span::new(at(12, 0), at(12, 59)), None).is_ok());
        assert!(check_no_conflict(&ls, &Span::new(at(10, 0), at(10, 59)), None).is_ok());
    }

    #[test]
    fn excluded_reservation_is_ignored() {
        let ls = lane_with(&[(1, 14, 15)]);
        let span = Span::new(at(15, 0), at(16, 59));
        assert!(check_no_conflict(&ls, &span, Some(1)).is_ok());
        assert!(matches!(
            check_no_conflict(&ls, &span, Some(2)),
            Err(EngineError::Conflict(1))
        ));
    }

    #[test]
    fn exclusion_does_not_hide_other_conflicts() {
        let ls = lane_with(&[(1, 14, 14), (2, 15, 15)]);
        let span = Span::new(at(14, 0), at(15, 59));
        assert!(matches!(
            check_no_conflict(&ls, &span, Some(1)),
            Err(EngineError::Conflict(2))
        ));
    }

    #[test]
    fn validate_span_limits_duration() {
        let day = Span::new(at(0, 0), at(23, 59));
        assert!(validate_span(&day).is_ok());
        let too_long = Span::new(at(0, 0), at(0, 0) + chrono::TimeDelta::hours(25));
        assert!(matches!(
            validate_span(&too_long),
            Err(EngineError::LimitExceeded(_))
        ));
    }
}
