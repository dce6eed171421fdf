//! Reconciliation of optimistic overlays with authoritative snapshots.
//!
//! Each (entity, participant) pair owns at most one pending mutation and moves
//! through:
//!
//! ```text
//! Idle ──act──▶ InFlight ──Acknowledged──▶ AwaitingSnapshot ──snapshot──▶ Idle (settled)
//!                  │  └──────────────snapshot already counts us────────▶ Idle (settled)
//!                  └──Failed──▶ Idle (rolled back, notice queued)
//! ```
//!
//! An acknowledged overlay stays visible until a snapshot that already counts
//! the participant arrives. Dropping it earlier would flash the stale count.

use std::collections::{BTreeMap, HashMap};

use futures::future::AbortHandle;
use tracing::{debug, warn};

use crate::dispatcher::{MutationDispatcher, PendingDispatch, RemoteStore};
use crate::error::{DispatchFailure, ReconcileError};
use crate::models::{Collection, DispatchResult, Entity, Mutation, MutationKey, MutationStatus, PendingMutation, Snapshot};
use crate::projector::project_all;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    InFlight,
    AwaitingSnapshot,
}

/// What a dispatcher result did to the pending slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Write confirmed, overlay kept until the store's snapshot catches up.
    Acknowledged,
    /// Overlay dropped because the snapshot already reflects the write.
    Settled,
    /// Overlay discarded and the last snapshot restored.
    RolledBack(DispatchFailure),
    /// Overlay discarded without a notice because the dispatch was cancelled.
    Cancelled,
    /// Nothing to reconcile: no such slot, or the view is gone.
    Ignored,
}

/// A non-blocking, user-visible failure report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub entity_id: String,
    pub failure: DispatchFailure,
}

impl Notice {
    pub fn message(&self) -> String {
        match self.failure {
            DispatchFailure::NetworkUnavailable => "You appear to be offline. Your change was not saved, please try again.".into(),
            DispatchFailure::RemoteRejected => "The server did not accept your change.".into(),
            DispatchFailure::Unknown => "Your change could not be confirmed. Please try again.".into(),
        }
    }
}

pub struct Reconciler {
    query: Collection,
    snapshots: HashMap<String, Snapshot>,
    order: Vec<String>,
    pending: BTreeMap<MutationKey, PendingMutation>,
    handles: HashMap<MutationKey, AbortHandle>,
    notices: Vec<Notice>,
    arrivals: u64,
    disposed: bool,
}

impl Reconciler {
    pub fn new(query: Collection) -> Self {
        Self {
            query,
            snapshots: HashMap::new(),
            order: Vec::new(),
            pending: BTreeMap::new(),
            handles: HashMap::new(),
            notices: Vec::new(),
            arrivals: 0,
            disposed: false,
        }
    }

    pub fn query(&self) -> Collection {
        self.query
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Arrival number of the latest applied snapshot, 0 before the first.
    pub fn last_arrival(&self) -> u64 {
        self.arrivals
    }

    /// Replaces every snapshot with a freshly delivered collection and settles
    /// pending mutations the new state already reflects. Returns how many
    /// were settled.
    pub fn apply_snapshot(&mut self, entities: Vec<Entity>) -> usize {
        if self.disposed {
            return 0;
        }
        self.arrivals += 1;
        let seq = self.arrivals;
        let kind = self.query.kind();

        self.snapshots.clear();
        self.order.clear();
        for entity in entities {
            if entity.kind != kind {
                warn!(entity = %entity.id, query = %self.query, "skipping entity of another kind");
                continue;
            }
            if self.snapshots.contains_key(&entity.id) {
                warn!(entity = %entity.id, "duplicate entity in snapshot, keeping the first");
                continue;
            }
            self.order.push(entity.id.clone());
            self.snapshots.insert(entity.id.clone(), Snapshot { seq, entity });
        }

        let snapshots = &self.snapshots;
        let handles = &mut self.handles;
        let before = self.pending.len();
        self.pending.retain(|key, pending| {
            let Some(snapshot) = snapshots.get(&key.entity_id) else {
                debug!(entity = %key.entity_id, "entity vanished, discarding pending mutation");
                handles.remove(key);
                return false;
            };
            if !snapshot.entity.has_participant(&key.participant_id) {
                return true;
            }
            match pending.status {
                MutationStatus::InFlight => debug!(entity = %key.entity_id, seq, "snapshot overtook in-flight write, settling"),
                _ => debug!(entity = %key.entity_id, seq, "write confirmed by snapshot"),
            }
            handles.remove(key);
            false
        });
        before - self.pending.len()
    }

    /// Starts an optimistic mutation: checks it against the current view,
    /// dispatches it and installs the overlay. The returned dispatch must be
    /// driven by the caller and its result fed back through [`Self::complete`].
    pub fn act<S: RemoteStore>(
        &mut self,
        dispatcher: &MutationDispatcher<S>,
        mutation: Mutation,
    ) -> Result<PendingDispatch, ReconcileError> {
        if self.disposed {
            return Err(ReconcileError::Disposed);
        }
        let key = mutation.key();
        if self.pending.contains_key(&key) {
            return Err(ReconcileError::DuplicatePending {
                entity: key.entity_id,
                participant: key.participant_id,
            });
        }
        let view = self.view(&mutation.entity_id)
            .ok_or_else(|| ReconcileError::UnknownEntity(mutation.entity_id.clone()))?;

        let dispatch = dispatcher.dispatch(&view, &mutation).map_err(|err| {
            debug!(%err, "mutation rejected locally");
            err
        })?;

        self.handles.insert(key.clone(), dispatch.abort_handle());
        self.pending.insert(key, PendingMutation::in_flight(mutation));
        Ok(dispatch)
    }

    /// Feeds back the outcome of a dispatch. `None` means it was cancelled.
    pub fn complete(&mut self, key: &MutationKey, result: Option<DispatchResult>) -> Transition {
        if self.disposed {
            return Transition::Ignored;
        }
        self.handles.remove(key);

        let Some(pending) = self.pending.get_mut(key) else {
            return Transition::Ignored;
        };
        if pending.status != MutationStatus::InFlight {
            return Transition::Ignored;
        }

        match result {
            None => {
                self.pending.remove(key);
                Transition::Cancelled
            }
            Some(DispatchResult::Acknowledged) => {
                let confirmed = self.snapshots.get(&key.entity_id)
                    .is_some_and(|snapshot| snapshot.entity.has_participant(&key.participant_id));
                if confirmed {
                    self.pending.remove(key);
                    Transition::Settled
                } else {
                    pending.status = MutationStatus::Acknowledged;
                    Transition::Acknowledged
                }
            }
            Some(DispatchResult::Failed(failure)) => {
                self.pending.remove(key);
                warn!(entity = %key.entity_id, %failure, "rolling back optimistic update");
                self.notices.push(Notice { entity_id: key.entity_id.clone(), failure });
                Transition::RolledBack(failure)
            }
        }
    }

    /// The entity as the user should see it right now.
    pub fn view(&self, id: &str) -> Option<Entity> {
        let snapshot = self.snapshots.get(id)?;
        Some(project_all(
            &snapshot.entity,
            self.pending.values().filter(|pending| pending.mutation.entity_id == id),
        ))
    }

    /// All entities in delivery order, with overlays applied.
    pub fn views(&self) -> Vec<Entity> {
        self.order.iter().filter_map(|id| self.view(id)).collect()
    }

    pub fn snapshot(&self, id: &str) -> Option<&Snapshot> {
        self.snapshots.get(id)
    }

    pub fn pending(&self, key: &MutationKey) -> Option<&PendingMutation> {
        self.pending.get(key)
    }

    pub fn phase(&self, key: &MutationKey) -> Phase {
        match self.pending.get(key).map(|pending| pending.status) {
            Some(MutationStatus::InFlight) => Phase::InFlight,
            Some(MutationStatus::Acknowledged) => Phase::AwaitingSnapshot,
            Some(MutationStatus::Failed) | None => Phase::Idle,
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Tears the view down: outstanding dispatches are aborted and every later
    /// result or snapshot is ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
        if !self.pending.is_empty() {
            debug!(pending = self.pending.len(), "disposing with writes in flight");
        }
        self.pending.clear();
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.dispose();
    }
}
