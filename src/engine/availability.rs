use chrono::{NaiveDateTime, TimeDelta, Timelike};

use crate::model::*;

// ── Free-time computation ─────────────────────────────────────────

/// Free time inside `window` once every reservation on the lane is removed.
pub fn free_windows(lane: &LaneState, window: &Span) -> Vec<Span> {
    let busy: Vec<Span> = lane.overlapping(window).map(|r| r.span).collect();
    // `overlapping` yields in start order, so `busy` is already sorted.
    subtract_intervals(&[*window], &merge_overlapping(&busy))
}

/// Cut free windows into whole-hour slots `[HH:00, HH:59)` that fit entirely inside them.
pub fn hourly_slots(free: &[Span]) -> Vec<Span> {
    let slot_len = TimeDelta::minutes(59);
    let mut slots = Vec::new();
    for span in free {
        let mut begin = ceil_to_hour(span.start);
        while begin + slot_len <= span.end {
            slots.push(Span::new(begin, begin + slot_len));
            begin += TimeDelta::hours(1);
        }
    }
    slots
}

fn ceil_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    let past_hour = TimeDelta::seconds(i64::from(t.minute() * 60 + t.second()))
        + TimeDelta::nanoseconds(i64::from(t.nanosecond()));
    if past_hour.is_zero() {
        t
    } else {
        t - past_hour + TimeDelta::hours(1)
    }
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end
        {
            last.end = last.end.max(span.end);
            continue;
        }
        merged.push(span);
    }
    merged
}

/// Remove every span of `to_remove` from `base`. Both inputs sorted and disjoint.
pub fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < b.end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Span::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < b.end {
            result.push(Span::new(current_start, b.end));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, 7)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn span(bh: u32, bm: u32, eh: u32, em: u32) -> Span {
        Span::new(at(bh, bm), at(eh, em))
    }

    #[test]
    fn subtract_no_overlap() {
        let result = subtract_intervals(&[span(10, 0, 12, 0)], &[span(13, 0, 14, 0)]);
        assert_eq!(result, vec![span(10, 0, 12, 0)]);
    }

    #[test]
    fn subtract_full_overlap() {
        let result = subtract_intervals(&[span(10, 0, 12, 0)], &[span(9, 0, 13, 0)]);
        assert!(result.is_empty());
    }

    #[test]
    fn subtract_middle_punch() {
        let result = subtract_intervals(&[span(10, 0, 22, 0)], &[span(14, 0, 14, 59)]);
        assert_eq!(result, vec![span(10, 0, 14, 0), span(14, 59, 22, 0)]);
    }

    #[test]
    fn subtract_multiple_punches() {
        let result = subtract_intervals(
            &[span(10, 0, 22, 0)],
            &[span(10, 0, 10, 59), span(12, 0, 13, 59), span(21, 0, 21, 59)],
        );
        assert_eq!(
            result,
            vec![span(10, 59, 12, 0), span(13, 59, 21, 0), span(21, 59, 22, 0)]
        );
    }

    #[test]
    fn merge_overlapping_joins_touching() {
        let merged = merge_overlapping(&[span(10, 0, 11, 0), span(11, 0, 11, 59), span(13, 0, 13, 59)]);
        assert_eq!(merged, vec![span(10, 0, 11, 59), span(13, 0, 13, 59)]);
    }

    #[test]
    fn hourly_slots_align_to_the_hour() {
        // 14:59 → 17:30 holds the 15:00 and 16:00 slots only
        let slots = hourly_slots(&[span(14, 59, 17, 30)]);
        assert_eq!(slots, vec![span(15, 0, 15, 59), span(16, 0, 16, 59)]);
    }

    #[test]
    fn hourly_slots_need_the_full_hour() {
        assert!(hourly_slots(&[span(14, 59, 15, 30)]).is_empty());
        assert_eq!(hourly_slots(&[span(21, 0, 22, 0)]), vec![span(21, 0, 21, 59)]);
    }

    #[test]
    fn free_windows_around_reservations() {
        let mut lane = LaneState::new(1);
        lane.insert_reservation(Reservation {
            id: 1,
            lane_id: 1,
            owner_id: "alice".into(),
            span: span(14, 0, 14, 59),
        });
        let free = free_windows(&lane, &span(10, 0, 22, 0));
        assert_eq!(free, vec![span(10, 0, 14, 0), span(14, 59, 22, 0)]);

        let slots = hourly_slots(&free);
        assert_eq!(slots.len(), 11); // 10..=21 minus 14
        assert!(!slots.contains(&span(14, 0, 14, 59)));
        assert!(slots.contains(&span(15, 0, 15, 59)));
    }
}
