use std::rc::Rc;

use futures::future::{self, AbortHandle, Abortable, FutureExt, LocalBoxFuture};
use futures::StreamExt;
use tracing::debug;

use crate::dispatcher::RemoteStore;
use crate::error::DispatchFailure;
use crate::models::{Collection, Entity};

/// A view-owned subscription to one collection.
///
/// `on_snapshot` hands back the driver future; the owner spawns it on its
/// executor. Registering a new handler restarts the subscription, and
/// `dispose` (or dropping the store) stops delivery.
pub struct LiveStore<S> {
    remote: Rc<S>,
    query: Collection,
    subscription: Option<AbortHandle>,
}

impl<S: RemoteStore> LiveStore<S> {
    pub fn init(remote: Rc<S>, query: Collection) -> Self {
        Self { remote, query, subscription: None }
    }

    pub fn on_snapshot<F>(&mut self, mut handler: F) -> LocalBoxFuture<'static, ()>
    where
        F: FnMut(Result<Vec<Entity>, DispatchFailure>) + 'static,
    {
        self.dispose();

        let (handle, registration) = AbortHandle::new_pair();
        let snapshots = Abortable::new(self.remote.subscribe(self.query), registration);
        self.subscription = Some(handle);

        let query = self.query;
        debug!(%query, "subscription started");
        async move {
            snapshots
                .for_each(move |snapshot| {
                    handler(snapshot);
                    future::ready(())
                })
                .await;
            debug!(%query, "subscription ended");
        }
        .boxed_local()
    }
}

impl<S> LiveStore<S> {
    pub fn query(&self) -> Collection {
        self.query
    }

    pub fn is_active(&self) -> bool {
        self.subscription.as_ref().is_some_and(|handle| !handle.is_aborted())
    }

    pub fn dispose(&mut self) {
        if let Some(handle) = self.subscription.take() {
            handle.abort();
        }
    }
}

impl<S> Drop for LiveStore<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
