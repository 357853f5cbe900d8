//! Opening-hours check: a slot must sit inside one of its alley's windows. A
//! window that closes after midnight also covers the early hours of the next
//! date.

use chrono::NaiveTime;
use tracing::warn;

use crate::catalog::Catalog;
use crate::model::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoursCheck {
    Within,
    /// Open that day, but the slot leaks out of the window.
    Outside,
    /// No opening window on the slot's date.
    Closed,
    /// Lane or its alley is missing from the catalog.
    LaneUnresolved,
}

impl HoursCheck {
    pub fn is_within(self) -> bool {
        self == HoursCheck::Within
    }

    pub fn label(self) -> &'static str {
        match self {
            HoursCheck::Within => "within",
            HoursCheck::Outside => "outside",
            HoursCheck::Closed => "closed",
            HoursCheck::LaneUnresolved => "lane_unresolved",
        }
    }
}

/// Evaluate a slot against an already-resolved alley.
pub fn check_alley_hours(alley: &Alley, span: &Span) -> HoursCheck {
    let date = span.start.date();
    let day_start = date.and_time(NaiveTime::MIN);
    // The previous date's window only matters when it runs past midnight.
    let windows: Vec<Span> = [date.pred_opt(), Some(date)]
        .into_iter()
        .flatten()
        .filter_map(|d| alley.opening_hours.window_for(d).and_then(|hours| hours.on(d)))
        .filter(|window| window.end > day_start)
        .collect();
    if windows.is_empty() {
        HoursCheck::Closed
    } else if windows.iter().any(|window| window.contains_span(span)) {
        HoursCheck::Within
    } else {
        HoursCheck::Outside
    }
}

/// Resolve lane → alley and evaluate the slot against the alley's calendar.
pub async fn check_business_hours(catalog: &dyn Catalog, span: &Span, lane_id: LaneId) -> HoursCheck {
    let Some(lane) = catalog.lane(lane_id).await else {
        return HoursCheck::LaneUnresolved;
    };
    let Some(alley) = catalog.alley(lane.alley_id).await else {
        warn!("lane {lane_id} points at missing alley {}", lane.alley_id);
        return HoursCheck::LaneUnresolved;
    };
    check_alley_hours(&alley, span)
}

/// True iff the slot lies inside the lane's alley opening window.
pub async fn check_dates(catalog: &dyn Catalog, span: &Span, lane_id: LaneId) -> bool {
    check_business_hours(catalog, span, lane_id).await.is_within()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn alley() -> Alley {
        let holiday = NaiveDate::from_ymd_opt(2030, 1, 8).unwrap();
        Alley {
            id: 1,
            name: "Strike Zone".into(),
            city: "Vienna".into(),
            address: "Ringstrasse 1".into(),
            opening_hours: OpeningHours::daily(hm(10, 0), hm(22, 0)).with_override(holiday, None),
        }
    }

    #[test]
    fn inside_window() {
        let span = Span::new(at(7, 10, 0), at(7, 10, 59));
        assert_eq!(check_alley_hours(&alley(), &span), HoursCheck::Within);
        let last = Span::new(at(7, 21, 0), at(7, 21, 59));
        assert_eq!(check_alley_hours(&alley(), &last), HoursCheck::Within);
    }

    #[test]
    fn before_opening() {
        let span = Span::new(at(7, 9, 0), at(7, 9, 59));
        assert_eq!(check_alley_hours(&alley(), &span), HoursCheck::Outside);
    }

    #[test]
    fn past_closing() {
        let span = Span::new(at(7, 21, 0), at(7, 22, 59));
        assert_eq!(check_alley_hours(&alley(), &span), HoursCheck::Outside);
    }

    #[test]
    fn overnight_slot_checked_against_begin_date() {
        let span = Span::new(at(7, 21, 0), at(8, 0, 59));
        assert_eq!(check_alley_hours(&alley(), &span), HoursCheck::Outside);
    }

    #[test]
    fn window_closing_at_midnight() {
        let mut alley = alley();
        alley.opening_hours = OpeningHours::daily(hm(16, 0), hm(0, 0));

        let evening = Span::new(at(7, 18, 0), at(7, 18, 59));
        assert_eq!(check_alley_hours(&alley, &evening), HoursCheck::Within);
        let last = Span::new(at(7, 23, 0), at(7, 23, 59));
        assert_eq!(check_alley_hours(&alley, &last), HoursCheck::Within);
        let after = Span::new(at(8, 0, 0), at(8, 0, 59));
        assert_eq!(check_alley_hours(&alley, &after), HoursCheck::Outside);
    }

    #[test]
    fn window_running_into_next_date() {
        let mut alley = alley();
        let saturday = NaiveDate::from_ymd_opt(2030, 1, 12).unwrap();
        alley.opening_hours = OpeningHours::default()
            .with_override(saturday, Some(DayHours::new(hm(18, 0), hm(2, 0))));

        let late = Span::new(at(13, 1, 0), at(13, 1, 59));
        assert_eq!(check_alley_hours(&alley, &late), HoursCheck::Within);
        let too_late = Span::new(at(13, 2, 0), at(13, 2, 59));
        assert_eq!(check_alley_hours(&alley, &too_late), HoursCheck::Outside);
        // Sunday itself has no window of its own
        let sunday_noon = Span::new(at(13, 12, 0), at(13, 12, 59));
        assert_eq!(check_alley_hours(&alley, &sunday_noon), HoursCheck::Outside);
        let monday = Span::new(at(14, 12, 0), at(14, 12, 59));
        assert_eq!(check_alley_hours(&alley, &monday), HoursCheck::Closed);
    }

    #[test]
    fn closed_override() {
        let span = Span::new(at(8, 14, 0), at(8, 14, 59));
        assert_eq!(check_alley_hours(&alley(), &span), HoursCheck::Closed);
    }

    #[tokio::test]
    async fn resolves_lane_through_catalog() {
        let catalog = InMemoryCatalog::new();
        catalog.insert_alley(alley());
        catalog.insert_lane(Lane { id: 5, number: 1, alley_id: 1 });
        catalog.insert_lane(Lane { id: 6, number: 2, alley_id: 9 });

        let span = Span::new(at(7, 14, 0), at(7, 14, 59));
        assert!(check_dates(&catalog, &span, 5).await);
        assert_eq!(
            check_business_hours(&catalog, &span, 404).await,
            HoursCheck::LaneUnresolved
        );
        // Lane whose alley is missing
        assert_eq!(
            check_business_hours(&catalog, &span, 6).await,
            HoursCheck::LaneUnresolved
        );
        assert!(!check_dates(&catalog, &span, 6).await);
    }
}
