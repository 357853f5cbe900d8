use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::limits::DEFAULT_PAGE_SIZE;
use crate::model::*;
use crate::service::{ReservationQuery, ReservationView};

// ── Requests ─────────────────────────────────────────────────────

/// Request timestamps are alley-local wall-clock times (`2030-01-07T10:00:00`).
/// A timestamp carrying an offset, as a browser's `toISOString()` produces
/// (`2030-01-07T09:00:00.000Z`), is converted to the server's local time.
mod local_time {
    use chrono::{DateTime, Local, NaiveDateTime};
    use serde::{Deserialize, Deserializer, de::Error as _};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(naive) = raw.parse::<NaiveDateTime>() {
            return Ok(naive);
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Local).naive_local())
            .map_err(|_| {
                D::Error::custom(format!(
                    "invalid timestamp `{raw}`, expected e.g. 2030-01-07T10:00:00"
                ))
            })
    }
}

/// Body of create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    #[serde(deserialize_with = "local_time::deserialize")]
    pub begin_time: NaiveDateTime,
    #[serde(deserialize_with = "local_time::deserialize")]
    pub end_time: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindLanesRequest {
    #[serde(deserialize_with = "local_time::deserialize")]
    pub begin_time: NaiveDateTime,
    #[serde(deserialize_with = "local_time::deserialize")]
    pub end_time: NaiveDateTime,
    #[serde(default)]
    pub reservation_id: Option<ReservationId>,
}

// Query parameters for listing reservations
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub is_expired: Option<bool>,
    pub page_number: Option<usize>,
    pub page_size: Option<usize>,
}

impl From<ListParams> for ReservationQuery {
    fn from(p: ListParams) -> Self {
        ReservationQuery {
            is_expired: p.is_expired.unwrap_or(false),
            page_number: p.page_number.unwrap_or(1),
            page_size: p.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FreeSlotsParams {
    pub date: NaiveDate,
}

// ── Responses ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub id: ReservationId,
    pub begin_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub lane_id: LaneId,
    pub lane_number: Option<u32>,
    pub alley_id: Option<AlleyId>,
    pub alley_name: Option<String>,
    pub alley_city: Option<String>,
    pub alley_address: Option<String>,
    pub reservation_user_name: OwnerId,
}

impl From<ReservationView> for ReservationResponse {
    fn from(view: ReservationView) -> Self {
        let ReservationView {
            reservation,
            lane,
            alley,
        } = view;
        ReservationResponse {
            id: reservation.id,
            begin_time: reservation.begin_time(),
            end_time: reservation.end_time(),
            lane_id: reservation.lane_id,
            lane_number: lane.as_ref().map(|l| l.number),
            alley_id: lane.as_ref().map(|l| l.alley_id),
            alley_name: alley.as_ref().map(|a| a.name.clone()),
            alley_city: alley.as_ref().map(|a| a.city.clone()),
            alley_address: alley.map(|a| a.address),
            reservation_user_name: reservation.owner_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneResponse {
    pub id: LaneId,
    pub number: u32,
    pub alley_id: AlleyId,
}

impl From<Lane> for LaneResponse {
    fn from(lane: Lane) -> Self {
        LaneResponse {
            id: lane.id,
            number: lane.number,
            alley_id: lane.alley_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotResponse {
    pub begin_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl From<Span> for SlotResponse {
    fn from(span: Span) -> Self {
        SlotResponse {
            begin_time: span.start,
            end_time: span.end,
        }
    }
}
