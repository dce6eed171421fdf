//! Sends one optimistic mutation to the backing store.
//!
//! The store is reached only through [`RemoteStore`]. Every dispatch yields a
//! [`PendingDispatch`]: a future that settles once, paired with an abort
//! handle the owning view cancels on teardown.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::{self, AbortHandle, Abortable, Either, FutureExt, LocalBoxFuture};
use futures::stream::LocalBoxStream;
use tracing::{debug, warn};

use crate::error::{DispatchFailure, ReconcileError};
use crate::models::{Collection, DispatchResult, Entity, Mutation, MutationKey};

/// The two operations required from the backing store.
pub trait RemoteStore {
    /// Increments the entity total and the target sub-item count, adding the
    /// participant with set-union semantics. Replays with the same
    /// `(entity, participant)` pair must leave the store unchanged.
    fn apply_atomic_increment(&self, mutation: &Mutation) -> LocalBoxFuture<'static, Result<(), DispatchFailure>>;

    /// Lazy, unbounded sequence of full-collection snapshots. Calling it again
    /// starts a fresh sequence.
    fn subscribe(&self, collection: Collection) -> LocalBoxStream<'static, Result<Vec<Entity>, DispatchFailure>>;
}

/// Source of delays for the optional write timeout.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

pub struct MutationDispatcher<S> {
    store: Rc<S>,
    timeout: Option<(Duration, Rc<dyn Timer>)>,
}

impl<S> Clone for MutationDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
            timeout: self.timeout.clone(),
        }
    }
}

impl<S: RemoteStore> MutationDispatcher<S> {
    pub fn new(store: Rc<S>) -> Self {
        Self { store, timeout: None }
    }

    /// Writes still pending after `duration` resolve as `Failed(Unknown)`.
    pub fn with_timeout(mut self, duration: Duration, timer: impl Timer + 'static) -> Self {
        self.timeout = Some((duration, Rc::new(timer)));
        self
    }

    pub fn store(&self) -> &Rc<S> {
        &self.store
    }

    /// Checks `mutation` against the caller's current projected `view` and,
    /// if it may proceed, issues the remote write.
    ///
    /// Rejections happen before the store is touched.
    pub fn dispatch(&self, view: &Entity, mutation: &Mutation) -> Result<PendingDispatch, ReconcileError> {
        if view.id != mutation.entity_id {
            return Err(ReconcileError::UnknownEntity(mutation.entity_id.clone()));
        }
        if view.has_participant(&mutation.participant_id) {
            return Err(ReconcileError::AlreadyParticipated {
                entity: mutation.entity_id.clone(),
                participant: mutation.participant_id.clone(),
            });
        }
        if view.sub_item(&mutation.sub_item_id).is_none() {
            return Err(ReconcileError::UnknownSubItem {
                entity: mutation.entity_id.clone(),
                sub_item: mutation.sub_item_id.clone(),
            });
        }

        let key = mutation.key();
        debug!(entity = %key.entity_id, sub_item = %mutation.sub_item_id, "dispatching increment");

        let write = self.store.apply_atomic_increment(mutation)
            .map(|result| match result {
                Ok(()) => DispatchResult::Acknowledged,
                Err(failure) => DispatchResult::Failed(failure),
            })
            .boxed_local();

        let settled = match &self.timeout {
            Some((duration, timer)) => {
                let sleep = timer.sleep(*duration);
                let duration = *duration;
                let entity = key.entity_id.clone();
                async move {
                    match future::select(write, sleep).await {
                        Either::Left((result, _)) => result,
                        Either::Right(((), _)) => {
                            warn!(%entity, ?duration, "increment timed out");
                            DispatchResult::Failed(DispatchFailure::Unknown)
                        }
                    }
                }
                .boxed_local()
            }
            None => write,
        };

        Ok(PendingDispatch::new(key, settled))
    }
}

enum DispatchState {
    Pending(Abortable<LocalBoxFuture<'static, DispatchResult>>),
    Settled(Option<DispatchResult>),
}

/// A dispatched write: pending until the store answers, then settled.
///
/// Resolves to `None` when cancelled through its abort handle.
pub struct PendingDispatch {
    key: MutationKey,
    handle: AbortHandle,
    state: DispatchState,
}

impl PendingDispatch {
    fn new(key: MutationKey, write: LocalBoxFuture<'static, DispatchResult>) -> Self {
        let (handle, registration) = AbortHandle::new_pair();
        Self {
            key,
            handle,
            state: DispatchState::Pending(Abortable::new(write, registration)),
        }
    }

    pub fn key(&self) -> &MutationKey {
        &self.key
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.clone()
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.state, DispatchState::Settled(_))
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Future for PendingDispatch {
    type Output = Option<DispatchResult>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            DispatchState::Settled(result) => Poll::Ready(*result),
            DispatchState::Pending(write) => match Pin::new(write).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(outcome) => {
                    let result = outcome.ok();
                    this.state = DispatchState::Settled(result);
                    Poll::Ready(result)
                }
            },
        }
    }
}
