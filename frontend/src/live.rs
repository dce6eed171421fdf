use std::rc::Rc;

use shared::{
    Action, Collection, DispatchFailure, DispatchResult, Entity, LiveStore, MutationDispatcher, MutationKey, Notice, Phase,
    ReconcileError, Reconciler, Transition,
};
use yew::Callback;

use crate::api::{dispatch_timeout, GlooTimer, HttpStore};

pub type SnapshotResult = Result<Vec<Entity>, DispatchFailure>;

/// One live collection as a component sees it: the subscription, the
/// reconciler holding snapshots and overlays, and the dispatcher for writes.
pub struct LiveView {
    reconciler: Reconciler,
    live: LiveStore<HttpStore>,
    dispatcher: MutationDispatcher<HttpStore>,
    stale: Option<DispatchFailure>,
    loaded: bool,
}

impl LiveView {
    pub fn new(store: Rc<HttpStore>, collection: Collection) -> Self {
        Self {
            reconciler: Reconciler::new(collection),
            live: LiveStore::init(Rc::clone(&store), collection),
            dispatcher: MutationDispatcher::new(store).with_timeout(dispatch_timeout(), GlooTimer),
            stale: None,
            loaded: false,
        }
    }

    pub fn subscribe(&mut self, on_snapshot: Callback<SnapshotResult>) {
        let driver = self.live.on_snapshot(move |snapshot| on_snapshot.emit(snapshot));
        wasm_bindgen_futures::spawn_local(driver);
    }

    /// Applies a delivered snapshot. A failed delivery keeps the last good
    /// state and only marks it stale.
    pub fn receive(&mut self, snapshot: SnapshotResult) {
        match snapshot {
            Ok(entities) => {
                self.reconciler.apply_snapshot(entities);
                self.stale = None;
                self.loaded = true;
            }
            Err(failure) => self.stale = Some(failure),
        }
    }

    /// Starts an optimistic action. The outcome comes back through `on_done`
    /// and must be passed to [`Self::complete`].
    pub fn act(
        &mut self,
        action: Action,
        participant_id: &str,
        on_done: Callback<(MutationKey, Option<DispatchResult>)>,
    ) -> Result<MutationKey, ReconcileError> {
        let dispatch = self.reconciler.act(&self.dispatcher, action.into_mutation(participant_id))?;
        let key = dispatch.key().clone();
        let done_key = key.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = dispatch.await;
            on_done.emit((done_key, result));
        });
        Ok(key)
    }

    pub fn complete(&mut self, key: &MutationKey, result: Option<DispatchResult>) -> Transition {
        self.reconciler.complete(key, result)
    }

    pub fn views(&self) -> Vec<Entity> {
        self.reconciler.views()
    }

    pub fn view(&self, id: &str) -> Option<Entity> {
        self.reconciler.view(id)
    }

    pub fn phase(&self, entity_id: &str, participant_id: &str) -> Phase {
        self.reconciler.phase(&MutationKey {
            entity_id: entity_id.to_string(),
            participant_id: participant_id.to_string(),
        })
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.reconciler.take_notices()
    }

    pub fn stale(&self) -> Option<DispatchFailure> {
        self.stale
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn dispose(&mut self) {
        self.live.dispose();
        self.reconciler.dispose();
    }
}
