use std::sync::atomic::Ordering;

use tokio::sync::oneshot;

use crate::limits::*;
use crate::model::*;

use super::conflict::{check_no_conflict, validate_span};
use super::{Engine, EngineError, WalCommand};

impl Engine {
    /// Store a new reservation. The overlap check runs under the lane's write
    /// lock, so a raced duplicate is rejected here even if it passed every
    /// pre-check upstream.
    pub async fn insert_reservation(
        &self,
        lane_id: LaneId,
        owner_id: OwnerId,
        span: Span,
    ) -> Result<Reservation, EngineError> {
        validate_span(&span)?;
        if owner_id.len() > MAX_OWNER_ID_LEN {
            return Err(EngineError::LimitExceeded("owner id too long"));
        }
        let gate = self.write_gate.clone().read_owned().await;
        let guard = self.lane_state(lane_id).write_owned().await;
        if guard.reservations.len() >= MAX_RESERVATIONS_PER_LANE {
            return Err(EngineError::LimitExceeded("too many reservations on lane"));
        }

        check_no_conflict(&guard, &span, None)?;

        let id = self.allocate_id();
        let event = Event::ReservationCreated {
            id,
            lane_id,
            owner_id: owner_id.clone(),
            span,
        };
        self.persist_and_apply(gate, guard, event).await?;
        Ok(Reservation {
            id,
            lane_id,
            owner_id,
            span,
        })
    }

    /// Move a reservation to a new window on its own lane. The reservation's
    /// current slot does not count against itself.
    pub async fn reschedule_reservation(
        &self,
        id: ReservationId,
        span: Span,
    ) -> Result<Reservation, EngineError> {
        validate_span(&span)?;
        let gate = self.write_gate.clone().read_owned().await;
        let (current, guard) = self.resolve_reservation_write(id).await?;

        check_no_conflict(&guard, &span, Some(id))?;

        let event = Event::ReservationRescheduled {
            id,
            lane_id: current.lane_id,
            span,
        };
        self.persist_and_apply(gate, guard, event).await?;
        Ok(Reservation { span, ..current })
    }

    pub async fn delete_reservation(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        let gate = self.write_gate.clone().read_owned().await;
        let (current, guard) = self.resolve_reservation_write(id).await?;
        let event = Event::ReservationDeleted {
            id,
            lane_id: current.lane_id,
        };
        self.persist_and_apply(gate, guard, event).await?;
        Ok(current)
    }

    /// Rewrite the WAL with only the events needed to recreate the current state:
    /// an id watermark followed by one creation per live reservation.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        let _gate = self.write_gate.write().await;

        let mut events = vec![Event::SequenceAdvanced {
            next_id: self.next_id.load(Ordering::SeqCst),
        }];
        for lane in self.all_lanes() {
            let guard = lane.read().await;
            events.extend(guard.reservations.iter().map(|r| Event::ReservationCreated {
                id: r.id,
                lane_id: r.lane_id,
                owner_id: r.owner_id.clone(),
                span: r.span,
            }));
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
