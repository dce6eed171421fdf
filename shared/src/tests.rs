#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeMap, VecDeque};
    use std::rc::Rc;
    use std::time::Duration;

    use futures::channel::{mpsc, oneshot};
    use futures::executor::{block_on, LocalPool};
    use futures::future::{self, FutureExt, LocalBoxFuture};
    use futures::stream::{LocalBoxStream, StreamExt};
    use futures::task::LocalSpawnExt;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::*;

    type Gate = (Mutation, oneshot::Sender<Result<(), DispatchFailure>>);

    /// In-memory store whose writes stay pending until the test releases them.
    #[derive(Default)]
    struct MemoryStore {
        entities: RefCell<BTreeMap<String, Entity>>,
        gates: RefCell<VecDeque<Gate>>,
        subscribers: RefCell<Vec<mpsc::UnboundedSender<Result<Vec<Entity>, DispatchFailure>>>>,
        calls: Cell<usize>,
    }

    impl MemoryStore {
        fn with(entities: &[Entity]) -> Rc<Self> {
            let store = Self::default();
            for entity in entities {
                store.entities.borrow_mut().insert(entity.id.clone(), entity.clone());
            }
            Rc::new(store)
        }

        fn collection(&self) -> Vec<Entity> {
            self.entities.borrow().values().cloned().collect()
        }

        fn entity(&self, id: &str) -> Entity {
            self.entities.borrow()[id].clone()
        }

        fn increment(&self, mutation: &Mutation) -> Result<(), DispatchFailure> {
            let mut entities = self.entities.borrow_mut();
            let entity = entities.get_mut(&mutation.entity_id).ok_or(DispatchFailure::RemoteRejected)?;
            match entity.apply_increment(&mutation.sub_item_id, &mutation.participant_id) {
                IncrementOutcome::Applied | IncrementOutcome::AlreadyCounted => Ok(()),
                IncrementOutcome::Conflict | IncrementOutcome::UnknownSubItem => Err(DispatchFailure::RemoteRejected),
            }
        }

        /// Lands the oldest pending write, or fails it without touching state.
        fn release(&self, outcome: Result<(), DispatchFailure>) {
            let (mutation, reply) = self.gates.borrow_mut().pop_front().expect("no pending write");
            let result = outcome.and_then(|()| self.increment(&mutation));
            let _ = reply.send(result);
        }

        fn publish(&self) {
            let collection = self.collection();
            self.subscribers.borrow_mut().retain(|tx| tx.unbounded_send(Ok(collection.clone())).is_ok());
        }
    }

    impl RemoteStore for MemoryStore {
        fn apply_atomic_increment(&self, mutation: &Mutation) -> LocalBoxFuture<'static, Result<(), DispatchFailure>> {
            self.calls.set(self.calls.get() + 1);
            let (tx, rx) = oneshot::channel();
            self.gates.borrow_mut().push_back((mutation.clone(), tx));
            rx.map(|reply| reply.unwrap_or(Err(DispatchFailure::NetworkUnavailable))).boxed_local()
        }

        fn subscribe(&self, _collection: Collection) -> LocalBoxStream<'static, Result<Vec<Entity>, DispatchFailure>> {
            let (tx, rx) = mpsc::unbounded();
            self.subscribers.borrow_mut().push(tx);
            rx.boxed_local()
        }
    }

    struct InstantTimer;

    impl Timer for InstantTimer {
        fn sleep(&self, _duration: Duration) -> LocalBoxFuture<'static, ()> {
            future::ready(()).boxed_local()
        }
    }

    fn poll_entity(a: &[&str], b: &[&str]) -> Entity {
        let option = |id: &str, label: &str, members: &[&str]| SubItem {
            id: id.into(),
            label: label.into(),
            count: members.len() as u32,
            participants: members.iter().map(|m| m.to_string()).collect(),
        };
        Entity {
            id: "poll-1".into(),
            kind: EntityKind::Poll,
            title: "Best weekend activity?".into(),
            body: String::new(),
            author: "dad".into(),
            total_count: (a.len() + b.len()) as u32,
            sub_items: vec![option("A", "Hiking", a), option("B", "Fishing", b)],
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn starting_poll() -> Entity {
        poll_entity(&["p1", "p2"], &["p3"])
    }

    fn counts(entity: &Entity) -> (u32, u32, u32) {
        (entity.total_count, entity.sub_items[0].count, entity.sub_items[1].count)
    }

    fn vote(option: &str, participant: &str) -> Mutation {
        Action::Vote { poll_id: "poll-1".into(), option_id: option.into() }.into_mutation(participant)
    }

    fn setup(entities: &[Entity]) -> (Rc<MemoryStore>, MutationDispatcher<MemoryStore>, Reconciler) {
        let store = MemoryStore::with(entities);
        let dispatcher = MutationDispatcher::new(Rc::clone(&store));
        let mut reconciler = Reconciler::new(Collection::Polls);
        reconciler.apply_snapshot(store.collection());
        (store, dispatcher, reconciler)
    }

    #[test]
    fn test_projection_is_pure() {
        let snapshot = starting_poll();
        assert_eq!(project(&snapshot, None), snapshot);

        let pending = PendingMutation::in_flight(vote("A", "u1"));
        let first = project(&snapshot, Some(&pending));
        let second = project(&snapshot, Some(&pending));
        assert_eq!(first, second);
        assert_eq!(counts(&first), (4, 3, 1));
        assert!(first.sub_items[0].participants.contains("u1"));
        assert!(first.is_consistent());
        assert_eq!(counts(&snapshot), (3, 2, 1));
    }

    #[test]
    fn test_projection_skips_existing_participant_and_failed_status() {
        let snapshot = starting_poll();
        let already_in_b = PendingMutation::in_flight(vote("A", "p3"));
        assert_eq!(project(&snapshot, Some(&already_in_b)), snapshot);

        let failed = PendingMutation { mutation: vote("A", "u1"), status: MutationStatus::Failed };
        assert_eq!(project(&snapshot, Some(&failed)), snapshot);

        let acknowledged = PendingMutation { mutation: vote("A", "u1"), status: MutationStatus::Acknowledged };
        assert_eq!(counts(&project(&snapshot, Some(&acknowledged))), (4, 3, 1));

        let unknown = PendingMutation::in_flight(vote("Z", "u1"));
        assert_eq!(project(&snapshot, Some(&unknown)), snapshot);
    }

    #[test]
    fn test_project_all_folds_several_participants() {
        let snapshot = starting_poll();
        let pending = [
            PendingMutation::in_flight(vote("A", "u1")),
            PendingMutation::in_flight(vote("B", "u2")),
            PendingMutation::in_flight(vote("B", "u1")),
        ];
        let view = project_all(&snapshot, pending.iter());
        assert_eq!(counts(&view), (5, 3, 2));
        assert!(view.is_consistent());
    }

    #[test]
    fn test_optimistic_then_settle() {
        let (store, dispatcher, mut reconciler) = setup(&[starting_poll()]);
        let mutation = vote("A", "u1");
        let key = mutation.key();

        let dispatch = reconciler.act(&dispatcher, mutation).unwrap();
        assert_eq!(counts(&reconciler.view("poll-1").unwrap()), (4, 3, 1));
        assert_eq!(reconciler.phase(&key), Phase::InFlight);

        store.release(Ok(()));
        let result = block_on(dispatch);
        assert_eq!(result, Some(DispatchResult::Acknowledged));
        assert_eq!(reconciler.complete(&key, result), Transition::Acknowledged);

        // No fresh snapshot yet: the overlay must stay up.
        assert_eq!(reconciler.phase(&key), Phase::AwaitingSnapshot);
        assert_eq!(counts(&reconciler.view("poll-1").unwrap()), (4, 3, 1));

        // A stale snapshot without u1 does not drop the overlay either.
        reconciler.apply_snapshot(vec![starting_poll()]);
        assert_eq!(reconciler.phase(&key), Phase::AwaitingSnapshot);
        assert_eq!(counts(&reconciler.view("poll-1").unwrap()), (4, 3, 1));

        assert_eq!(reconciler.apply_snapshot(store.collection()), 1);
        assert_eq!(reconciler.phase(&key), Phase::Idle);
        let view = reconciler.view("poll-1").unwrap();
        assert_eq!(counts(&view), (4, 3, 1));
        assert_eq!(view, reconciler.snapshot("poll-1").unwrap().entity);
        assert!(reconciler.take_notices().is_empty());
    }

    #[test]
    fn test_rollback_on_failure() {
        let (store, dispatcher, mut reconciler) = setup(&[starting_poll()]);
        let mutation = vote("A", "u1");
        let key = mutation.key();

        let dispatch = reconciler.act(&dispatcher, mutation.clone()).unwrap();
        assert_eq!(counts(&reconciler.view("poll-1").unwrap()), (4, 3, 1));

        store.release(Err(DispatchFailure::NetworkUnavailable));
        let result = block_on(dispatch);
        assert_eq!(
            reconciler.complete(&key, result),
            Transition::RolledBack(DispatchFailure::NetworkUnavailable)
        );

        assert_eq!(reconciler.view("poll-1").unwrap(), starting_poll());
        assert_eq!(reconciler.phase(&key), Phase::Idle);
        let notices = reconciler.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].failure, DispatchFailure::NetworkUnavailable);
        assert!(!notices[0].message().is_empty());

        // Retry is a fresh user action.
        assert!(reconciler.act(&dispatcher, mutation).is_ok());
    }

    #[test]
    fn test_duplicate_vote_rejected_locally() {
        let (store, dispatcher, mut reconciler) = setup(&[poll_entity(&["p1", "p2"], &["u1"])]);
        let before = reconciler.view("poll-1").unwrap();

        let err = reconciler.act(&dispatcher, vote("A", "u1")).err().unwrap();
        assert!(matches!(err, ReconcileError::AlreadyParticipated { .. }));
        assert_eq!(store.calls.get(), 0);
        assert_eq!(reconciler.view("poll-1").unwrap(), before);
        assert!(!reconciler.has_pending());
        assert_eq!(Error::from(&err).code, ErrorCode::AlreadyParticipated);
    }

    #[test]
    fn test_http_status_classification() {
        for status in [400, 403, 404, 409, 422, 429] {
            assert_eq!(DispatchFailure::from_status(status), DispatchFailure::RemoteRejected, "status {}", status);
        }
        for status in [0, 302, 500, 502, 503] {
            assert_eq!(DispatchFailure::from_status(status), DispatchFailure::Unknown, "status {}", status);
        }
    }

    #[test]
    fn test_second_action_while_in_flight_rejected() {
        let (store, dispatcher, mut reconciler) = setup(&[starting_poll()]);
        let _dispatch = reconciler.act(&dispatcher, vote("A", "u1")).unwrap();

        let err = reconciler.act(&dispatcher, vote("B", "u1")).err().unwrap();
        assert!(matches!(err, ReconcileError::DuplicatePending { .. }));
        assert_eq!(store.calls.get(), 1);
        assert_eq!(counts(&reconciler.view("poll-1").unwrap()), (4, 3, 1));
    }

    #[test]
    fn test_unknown_targets_rejected() {
        let (store, dispatcher, mut reconciler) = setup(&[starting_poll()]);
        let missing_poll = Action::Vote { poll_id: "nope".into(), option_id: "A".into() }.into_mutation("u1");
        assert_eq!(
            reconciler.act(&dispatcher, missing_poll).err(),
            Some(ReconcileError::UnknownEntity("nope".into()))
        );
        assert!(matches!(
            reconciler.act(&dispatcher, vote("Z", "u1")),
            Err(ReconcileError::UnknownSubItem { .. })
        ));
        assert_eq!(store.calls.get(), 0);
    }

    #[test]
    fn test_concurrent_snapshot_race() {
        let (store, dispatcher, mut reconciler) = setup(&[starting_poll()]);
        let mutation = vote("A", "u1");
        let key = mutation.key();
        let dispatch = reconciler.act(&dispatcher, mutation).unwrap();

        // The live subscription delivers the write before the promise resolves.
        store.release(Ok(()));
        assert_eq!(counts(&store.entity("poll-1")), (4, 3, 1));
        assert_eq!(reconciler.apply_snapshot(store.collection()), 1);
        assert_eq!(reconciler.phase(&key), Phase::Idle);
        assert_eq!(counts(&reconciler.view("poll-1").unwrap()), (4, 3, 1));

        let result = block_on(dispatch);
        assert_eq!(reconciler.complete(&key, result), Transition::Ignored);
        assert_eq!(counts(&reconciler.view("poll-1").unwrap()), (4, 3, 1));
    }

    #[test]
    fn test_snapshot_recomputes_overlay_while_in_flight() {
        let (_store, dispatcher, mut reconciler) = setup(&[starting_poll()]);
        let _dispatch = reconciler.act(&dispatcher, vote("A", "u1")).unwrap();

        // Someone else voted B in the meantime.
        reconciler.apply_snapshot(vec![poll_entity(&["p1", "p2"], &["p3", "p4"])]);
        let view = reconciler.view("poll-1").unwrap();
        assert_eq!(counts(&view), (5, 3, 2));
        assert!(view.is_consistent());
    }

    #[test]
    fn test_vanished_entity_drops_pending() {
        let (_store, dispatcher, mut reconciler) = setup(&[starting_poll()]);
        let mutation = vote("A", "u1");
        let key = mutation.key();
        let _dispatch = reconciler.act(&dispatcher, mutation).unwrap();

        assert_eq!(reconciler.apply_snapshot(Vec::new()), 1);
        assert!(reconciler.view("poll-1").is_none());
        assert_eq!(reconciler.complete(&key, Some(DispatchResult::Acknowledged)), Transition::Ignored);
    }

    #[test]
    fn test_acknowledged_after_snapshot_already_counted_settles() {
        let (store, dispatcher, mut reconciler) = setup(&[starting_poll()]);
        let mutation = vote("B", "u1");
        let key = mutation.key();
        let dispatch = reconciler.act(&dispatcher, mutation).unwrap();

        store.release(Ok(()));
        let result = block_on(dispatch);
        // Snapshot arrives between the reply and the reconcile call.
        let mut latest = store.entity("poll-1");
        latest.title = "renamed".into();
        reconciler.apply_snapshot(vec![latest]);
        assert_eq!(reconciler.complete(&key, result), Transition::Ignored);
        assert_eq!(counts(&reconciler.view("poll-1").unwrap()), (4, 2, 2));
    }

    #[test]
    fn test_teardown_while_in_flight_is_noop() {
        let (store, dispatcher, mut reconciler) = setup(&[starting_poll()]);
        let mutation = vote("A", "u1");
        let key = mutation.key();
        let dispatch = reconciler.act(&dispatcher, mutation.clone()).unwrap();
        assert!(!dispatch.is_settled());

        reconciler.dispose();
        assert!(reconciler.is_disposed());

        let result = block_on(dispatch);
        assert_eq!(result, None);
        assert_eq!(reconciler.complete(&key, result), Transition::Ignored);
        assert_eq!(reconciler.complete(&key, Some(DispatchResult::Acknowledged)), Transition::Ignored);
        assert_eq!(reconciler.apply_snapshot(store.collection()), 0);
        assert_eq!(reconciler.act(&dispatcher, mutation).err(), Some(ReconcileError::Disposed));

        // The store may still answer; nobody listens.
        store.release(Ok(()));
    }

    #[test]
    fn test_cancelled_dispatch_discards_overlay() {
        let (_store, dispatcher, mut reconciler) = setup(&[starting_poll()]);
        let mutation = vote("A", "u1");
        let key = mutation.key();
        let dispatch = reconciler.act(&dispatcher, mutation).unwrap();
        assert_eq!(dispatch.key(), &key);

        dispatch.cancel();
        let result = block_on(dispatch);
        assert_eq!(reconciler.complete(&key, result), Transition::Cancelled);
        assert_eq!(reconciler.view("poll-1").unwrap(), starting_poll());
        assert!(reconciler.take_notices().is_empty());
    }

    #[test]
    fn test_timeout_reports_unknown_failure() {
        let store = MemoryStore::with(&[starting_poll()]);
        let dispatcher = MutationDispatcher::new(Rc::clone(&store))
            .with_timeout(Duration::from_secs(10), InstantTimer);
        let mut reconciler = Reconciler::new(Collection::Polls);
        reconciler.apply_snapshot(store.collection());

        let mutation = vote("A", "u1");
        let key = mutation.key();
        let dispatch = reconciler.act(&dispatcher, mutation).unwrap();
        let result = block_on(dispatch);

        assert_eq!(result, Some(DispatchResult::Failed(DispatchFailure::Unknown)));
        assert_eq!(reconciler.complete(&key, result), Transition::RolledBack(DispatchFailure::Unknown));
        assert_eq!(reconciler.view("poll-1").unwrap(), starting_poll());
    }

    #[test]
    fn test_increment_is_idempotent() {
        let mut entity = starting_poll();
        assert_eq!(entity.apply_increment("A", "u1"), IncrementOutcome::Applied);
        let once = entity.clone();
        assert_eq!(entity.apply_increment("A", "u1"), IncrementOutcome::AlreadyCounted);
        assert_eq!(entity, once);

        assert_eq!(entity.apply_increment("B", "u1"), IncrementOutcome::Conflict);
        assert_eq!(entity.apply_increment("Z", "u2"), IncrementOutcome::UnknownSubItem);
        assert_eq!(entity, once);
        assert!(entity.is_consistent());
    }

    #[test]
    fn test_invariants_hold_across_mixed_actions() {
        let (store, dispatcher, mut reconciler) = setup(&[starting_poll()]);
        let users = ["u1", "u2", "u3", "u4", "p1"];
        let mut dispatches = Vec::new();
        for (i, user) in users.iter().enumerate() {
            let option = if i % 2 == 0 { "A" } else { "B" };
            if let Ok(dispatch) = reconciler.act(&dispatcher, vote(option, user)) {
                dispatches.push(dispatch);
            }
            let view = reconciler.view("poll-1").unwrap();
            assert!(view.is_consistent());
        }
        // p1 was already counted and never reached the store.
        assert_eq!(dispatches.len(), 4);

        for (i, dispatch) in dispatches.into_iter().enumerate() {
            let key = dispatch.key().clone();
            store.release(if i == 1 { Err(DispatchFailure::RemoteRejected) } else { Ok(()) });
            let result = block_on(dispatch);
            reconciler.complete(&key, result);
            assert!(reconciler.view("poll-1").unwrap().is_consistent());
        }
        reconciler.apply_snapshot(store.collection());

        let view = reconciler.view("poll-1").unwrap();
        assert!(view.is_consistent());
        assert_eq!(view.total_count, 6);
        assert!(!reconciler.has_pending());
    }

    #[test]
    fn test_like_and_comment_call_sites() {
        let post = Entity {
            id: "post-9".into(),
            kind: EntityKind::Post,
            title: "First week back at work".into(),
            body: "Any tips?".into(),
            author: "sam".into(),
            total_count: 0,
            sub_items: vec![SubItem::new(LIKES_SUB_ITEM, "Likes")],
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let like = Action::Like { post_id: "post-9".into() };
        assert_eq!(like.collection(), Collection::Posts);
        let mutation = like.into_mutation("u1");
        assert_eq!(mutation.sub_item_id, LIKES_SUB_ITEM);

        let store = MemoryStore::with(&[post]);
        let dispatcher = MutationDispatcher::new(Rc::clone(&store));
        let mut posts = Reconciler::new(Collection::Posts);
        posts.apply_snapshot(store.collection());
        let _like = posts.act(&dispatcher, mutation).unwrap();
        assert_eq!(posts.view("post-9").unwrap().total_count, 1);

        let comment_id = Uuid::new_v4();
        let comment = Action::Comment {
            post_id: "post-9".into(),
            comment_id,
            draft: CommentDraft { author: "u1".into(), body: "Hang in there".into() },
        };
        assert_eq!(comment.collection(), Collection::Comments);
        let mutation = comment.into_mutation("u1");
        assert_eq!(mutation.entity_id, comment_thread_id("post-9"));
        assert_eq!(mutation.participant_id, comment_id.to_string());
        assert_eq!(IncrementRequest::from(&mutation).comment, mutation.comment);
    }

    #[test]
    fn test_snapshot_filters_foreign_kinds_and_duplicates() {
        let mut reconciler = Reconciler::new(Collection::Polls);
        let mut post = starting_poll();
        post.id = "post-1".into();
        post.kind = EntityKind::Post;
        let mut renamed = starting_poll();
        renamed.title = "second copy".into();

        reconciler.apply_snapshot(vec![starting_poll(), post, renamed]);
        let views = reconciler.views();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].title, "Best weekend activity?");
        assert_eq!(reconciler.snapshot("poll-1").unwrap().seq, reconciler.last_arrival());
    }

    #[test]
    fn test_boundary_rejects_malformed_entities() {
        let raw: Vec<RawEntity> = serde_json::from_str(r#"[
            {"id": "poll-1", "kind": "poll", "totalCount": 1,
             "subItems": [{"id": "A", "count": 1, "participants": ["u1"]}]},
            {"id": "poll-2", "kind": "poll", "totalCount": 2,
             "subItems": [{"id": "A", "count": 1, "participants": ["u1"]}]}
        ]"#).unwrap();
        assert!(matches!(
            parse_collection(raw),
            Err(ValidationError::MalformedEntity { id, .. }) if id == "poll-2"
        ));

        let negative: RawEntity = serde_json::from_str(r#"{"id": "x", "kind": "post", "totalCount": -1}"#).unwrap();
        assert!(Entity::try_from(negative).is_err());

        let twice: RawEntity = serde_json::from_str(r#"{"id": "x", "kind": "poll", "totalCount": 2,
            "subItems": [{"id": "A", "count": 1, "participants": ["u1"]},
                         {"id": "B", "count": 1, "participants": ["u1"]}]}"#).unwrap();
        assert!(Entity::try_from(twice).is_err());

        let unknown_kind: RawEntity = serde_json::from_str(r#"{"id": "x", "kind": "chat"}"#).unwrap();
        assert!(Entity::try_from(unknown_kind).is_err());

        let wire = serde_json::to_string(&starting_poll()).unwrap();
        let raw: RawEntity = serde_json::from_str(&wire).unwrap();
        assert_eq!(Entity::try_from(raw).unwrap(), starting_poll());
    }

    #[test]
    fn test_poll_request_validation() {
        let request = |options: &[&str]| CreatePollRequest {
            csrf_token: String::new(),
            title: "Bedtime routines".into(),
            description: String::new(),
            options: options.iter().map(|o| o.to_string()).collect(),
            author: "dad".into(),
        };
        assert!(validate_poll_request(&request(&["Story", "Song"])).is_ok());
        assert_eq!(validate_poll_request(&request(&["Story"])), Err(ValidationError::TooFewOptions));
        assert_eq!(
            validate_poll_request(&request(&["Story", "story "])),
            Err(ValidationError::DuplicateOption("story ".into()))
        );
        assert_eq!(validate_poll_request(&request(&["Story", " "])), Err(ValidationError::EmptyOption));

        let mut untitled = request(&["Story", "Song"]);
        untitled.title = "  ".into();
        assert_eq!(validate_poll_request(&untitled), Err(ValidationError::EmptyTitle));

        let empty = CommentDraft { author: "dad".into(), body: "\n".into() };
        assert_eq!(validate_comment(&empty), Err(ValidationError::EmptyComment));
    }

    #[test]
    fn test_live_store_lifecycle() {
        let store = MemoryStore::with(&[starting_poll()]);
        let mut live = LiveStore::init(Rc::clone(&store), Collection::Polls);
        assert!(!live.is_active());

        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        let driver = live.on_snapshot(move |snapshot| sink.borrow_mut().push(snapshot));
        assert!(live.is_active());

        let mut pool = LocalPool::new();
        pool.spawner().spawn_local(driver).unwrap();
        store.publish();
        store.publish();
        pool.run_until_stalled();
        assert_eq!(received.borrow().len(), 2);

        live.dispose();
        assert!(!live.is_active());
        store.publish();
        pool.run_until_stalled();
        assert_eq!(received.borrow().len(), 2);

        // Subscribing again restarts delivery.
        let sink = Rc::clone(&received);
        let driver = live.on_snapshot(move |snapshot| sink.borrow_mut().push(snapshot));
        pool.spawner().spawn_local(driver).unwrap();
        store.publish();
        pool.run_until_stalled();
        assert_eq!(received.borrow().len(), 3);
        assert_eq!(live.query(), Collection::Polls);
        assert!(received.borrow().iter().all(|snapshot| snapshot.as_ref().is_ok_and(|s| s.len() == 1)));
    }
}
