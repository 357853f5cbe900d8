//! Reservation store: per-lane schedules in memory, made durable by the WAL.
//!
//! Every mutation takes the lane's write lock, re-checks the half-open overlap
//! constraint, appends to the WAL and only then applies. Two writers racing for
//! overlapping windows on one lane are serialized by that lock, so at most one
//! of them is persisted.

mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;

pub use availability::{free_windows, hourly_slots, merge_overlapping, subtract_intervals};
pub use error::EngineError;
pub use queries::ReservationFilter;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock, mpsc, oneshot};
use tracing::{info, warn};

use crate::model::*;
use crate::wal::Wal;

pub type SharedLaneState = Arc<RwLock<LaneState>>;

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit:
/// block for the first append, drain whatever else is already queued,
/// then a single fsync answers the whole batch.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let (event, response) = match cmd {
            WalCommand::Append { event, response } => (event, response),
            other => {
                handle_non_append(&mut wal, other);
                continue;
            }
        };
        let mut batch = vec![(event, response)];
        let mut deferred = None;

        loop {
            match rx.try_recv() {
                Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                Ok(other) => {
                    // Non-append commands run after the batch that precedes them.
                    deferred = Some(other);
                    break;
                }
                Err(_) => break,
            }
        }

        commit_batch(&mut wal, &mut batch);
        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd);
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        tracing::error!("WAL flush failed for batch of {}: {e}", batch.len());
    }
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let append_result = batch
        .iter()
        .try_for_each(|(event, _)| wal.append_buffered(event));
    // Flush even after an append error so partially buffered bytes don't leak
    // into the next batch.
    let flush_result = wal.flush_sync();
    append_result.and(flush_result)
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

pub struct Engine {
    lanes: DashMap<LaneId, SharedLaneState>,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Reverse lookup: reservation id → lane id.
    pub(super) reservation_to_lane: Arc<DashMap<ReservationId, LaneId>>,
    /// Next id handed out by `insert_reservation`.
    pub(super) next_id: AtomicI64,
    /// Mutations hold it shared; compaction holds it exclusively so no append
    /// can land between the snapshot and the log swap.
    pub(super) write_gate: Arc<RwLock<()>>,
}

/// Apply an event to a lane schedule (caller holds the lock).
fn apply_to_lane(ls: &mut LaneState, event: &Event, index: &DashMap<ReservationId, LaneId>) {
    match event {
        Event::ReservationCreated {
            id,
            lane_id,
            owner_id,
            span,
        } => {
            ls.insert_reservation(Reservation {
                id: *id,
                lane_id: *lane_id,
                owner_id: owner_id.clone(),
                span: *span,
            });
            index.insert(*id, *lane_id);
        }
        Event::ReservationRescheduled { id, span, .. } => {
            if let Some(mut reservation) = ls.remove_reservation(*id) {
                reservation.span = *span;
                ls.insert_reservation(reservation);
            }
        }
        Event::ReservationDeleted { id, .. } => {
            ls.remove_reservation(*id);
            index.remove(id);
        }
        Event::SequenceAdvanced { .. } => {}
    }
}

/// Write event to WAL via the background group-commit writer.
async fn wal_append(wal_tx: &mpsc::Sender<WalCommand>, event: &Event) -> Result<(), EngineError> {
    let (tx, rx) = oneshot::channel();
    wal_tx
        .send(WalCommand::Append {
            event: event.clone(),
            response: tx,
        })
        .await
        .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
    rx.await
        .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
        .map_err(|e| EngineError::WalError(e.to_string()))
}

/// A replayed create or reschedule that would overlap what is already applied.
/// Returns the blocking reservation.
fn replay_conflict(ls: &LaneState, event: &Event) -> Option<ReservationId> {
    let (span, exclude) = match event {
        Event::ReservationCreated { span, .. } => (span, None),
        Event::ReservationRescheduled { id, span, .. } => (span, Some(*id)),
        _ => return None,
    };
    conflict::check_no_conflict(ls, span, exclude)
        .err()
        .and_then(|e| match e {
            EngineError::Conflict(blocking) => Some(blocking),
            _ => None,
        })
}

impl Engine {
    /// Replay the WAL at `wal_path` and start the background writer.
    /// Must be called from within a tokio runtime.
    pub fn new(wal_path: PathBuf) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let engine = Self {
            lanes: DashMap::new(),
            wal_tx,
            reservation_to_lane: Arc::new(DashMap::new()),
            next_id: AtomicI64::new(1),
            write_gate: Arc::new(RwLock::new(())),
        };

        // Sole owner of every Arc during replay, so try_write never contends.
        // blocking_write would panic here when called from async context.
        for event in &events {
            match event {
                Event::SequenceAdvanced { next_id } => engine.bump_next_id(*next_id),
                Event::ReservationCreated { id, .. } => engine.bump_next_id(id + 1),
                _ => {}
            }
            if let Some(lane_id) = event.lane_id() {
                let lane = engine.lane_state(lane_id);
                let Ok(mut guard) = lane.try_write() else {
                    return Err(io::Error::other("replay: lane state contended"));
                };
                if let Some(blocking) = replay_conflict(&guard, event) {
                    warn!(
                        "replay: skipping {event:?}, overlaps reservation {blocking} on lane {lane_id}"
                    );
                    continue;
                }
                apply_to_lane(&mut guard, event, &engine.reservation_to_lane);
            }
        }

        info!(
            "replayed {} WAL events: {} reservations on {} lanes",
            events.len(),
            engine.reservation_to_lane.len(),
            engine.lanes.len()
        );
        Ok(engine)
    }

    fn bump_next_id(&self, candidate: ReservationId) {
        self.next_id.fetch_max(candidate, Ordering::SeqCst);
    }

    pub(super) fn allocate_id(&self) -> ReservationId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Lane schedule, created empty on first touch.
    pub(super) fn lane_state(&self, lane_id: LaneId) -> SharedLaneState {
        self.lanes
            .entry(lane_id)
            .or_insert_with(|| Arc::new(RwLock::new(LaneState::new(lane_id))))
            .value()
            .clone()
    }

    /// Existing lane schedule, without creating one.
    pub(super) fn existing_lane(&self, lane_id: LaneId) -> Option<SharedLaneState> {
        self.lanes.get(&lane_id).map(|e| e.value().clone())
    }

    /// Snapshot of all lane handles. Shard guards are released before returning.
    pub(super) fn all_lanes(&self) -> Vec<SharedLaneState> {
        self.lanes.iter().map(|e| e.value().clone()).collect()
    }

    pub fn lane_for_reservation(&self, id: ReservationId) -> Option<LaneId> {
        self.reservation_to_lane.get(&id).map(|e| *e.value())
    }

    /// WAL-append then apply, holding the gate and the lane's write lock until
    /// both are done.
    ///
    /// The commit runs on its own task, so dropping the caller's future cannot
    /// leave an event on disk that the in-memory schedule never saw.
    pub(super) async fn persist_and_apply(
        &self,
        gate: OwnedRwLockReadGuard<()>,
        mut guard: OwnedRwLockWriteGuard<LaneState>,
        event: Event,
    ) -> Result<(), EngineError> {
        let wal_tx = self.wal_tx.clone();
        let index = self.reservation_to_lane.clone();
        tokio::spawn(async move {
            let _gate = gate;
            wal_append(&wal_tx, &event).await?;
            apply_to_lane(&mut guard, &event, &index);
            Ok::<(), EngineError>(())
        })
        .await
        .map_err(|e| EngineError::WalError(format!("commit task failed: {e}")))?
    }

    /// Lookup reservation → lane, acquire the lane's write lock, and confirm the
    /// reservation is still there once the lock is held.
    pub(super) async fn resolve_reservation_write(
        &self,
        id: ReservationId,
    ) -> Result<(Reservation, OwnedRwLockWriteGuard<LaneState>), EngineError> {
        let lane_id = self
            .lane_for_reservation(id)
            .ok_or(EngineError::NotFound(id))?;
        let lane = self.existing_lane(lane_id).ok_or(EngineError::NotFound(id))?;
        let guard = lane.write_owned().await;
        let reservation = guard.get(id).cloned().ok_or(EngineError::NotFound(id))?;
        Ok((reservation, guard))
    }
}
