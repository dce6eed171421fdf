#[cfg(test)]
mod tests {
    use rocket::http::Status;
    use time::{Duration, OffsetDateTime};

    use crate::error::ApiError;
    use crate::rate_limiter::RateLimiter;
    use crate::routes::CsrfGuard;
    use crate::utils::*;
    use shared::{classify_participation, Collection, IncrementOutcome, IncrementResponse};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_rate_limiter_blocks_after_limit() {
        init_tracing();
        let limiter = RateLimiter::new(2, Duration::minutes(1));
        let now = OffsetDateTime::now_utc();

        assert!(limiter.check_at("increment:abc", now).is_ok());
        assert!(limiter.check_at("increment:abc", now).is_ok());
        assert_eq!(limiter.remaining_at("increment:abc", now), 0);

        let err = limiter.check_at("increment:abc", now + Duration::seconds(5)).unwrap_err();
        assert!(matches!(err, ApiError::RateLimited(_)));
        assert_eq!(err.status(), Status::TooManyRequests);

        // Other callers are unaffected.
        assert!(limiter.check_at("increment:xyz", now).is_ok());
    }

    #[test]
    fn test_rate_limiter_resets_after_window() {
        let limiter = RateLimiter::new(1, Duration::minutes(1));
        let now = OffsetDateTime::now_utc();

        assert!(limiter.check_at("create:abc", now).is_ok());
        assert!(limiter.check_at("create:abc", now + Duration::seconds(30)).is_err());
        assert!(limiter.check_at("create:abc", now + Duration::seconds(61)).is_ok());
        assert_eq!(limiter.remaining_at("create:abc", now + Duration::seconds(200)), 1);
    }

    #[test]
    fn test_csrf_tokens_are_single_use() {
        let guard = CsrfGuard::new();
        let token = guard.generate_token().unwrap();
        assert!(!token.is_empty());

        assert!(guard.verify_token(&token).is_ok());
        match guard.verify_token(&token) {
            Err(ApiError::Forbidden(message)) => assert!(message.contains("please use new token")),
            other => panic!("expected a forbidden error, got {:?}", other),
        }
    }

    #[test]
    fn test_participation_classification() {
        assert_eq!(classify_participation(None, "opt-0"), IncrementOutcome::Applied);
        assert_eq!(classify_participation(Some("opt-0"), "opt-0"), IncrementOutcome::AlreadyCounted);
        assert_eq!(classify_participation(Some("opt-1"), "opt-0"), IncrementOutcome::Conflict);
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(ApiError::AlreadyParticipated.status(), Status::Conflict);
        assert_eq!(ApiError::NotFound.status(), Status::NotFound);
        assert_eq!(ApiError::UnknownSubItem("opt-9".into()).status(), Status::NotFound);
        assert_eq!(ApiError::InvalidId.status(), Status::BadRequest);
        assert_eq!(ApiError::Internal("db".into()).status(), Status::InternalServerError);

        let validation: ApiError = shared::ValidationError::TooFewOptions.into();
        assert_eq!(validation.status(), Status::BadRequest);
    }

    #[test]
    fn test_path_parsing() {
        assert_eq!(parse_collection_name("polls").unwrap(), Collection::Polls);
        assert_eq!(parse_collection_name("comments").unwrap(), Collection::Comments);
        assert!(parse_collection_name("votes").is_err());

        let id = uuid::Uuid::new_v4();
        assert_eq!(parse_uuid(&id.to_string()).unwrap(), id);
        assert!(parse_uuid("not-a-uuid").is_err());

        assert!(check_entity_id(&format!("{}:comments", id)).is_ok());
        assert!(check_entity_id("").is_err());
        assert!(check_entity_id("../etc/passwd").is_err());

        assert!(check_participant_id("  ").is_err());
        assert!(check_participant_id(&"x".repeat(200)).is_err());
        assert!(check_participant_id("u1").is_ok());
    }

    #[test]
    fn test_profanity_checks() {
        assert!(check_profanity("title", "Sunday pancakes").is_ok());
        assert!(check_profanity("title", "what the fuck").is_err());

        let clean = vec!["Park".to_string(), "Pool".to_string()];
        assert!(check_options_for_profanity(&clean).is_ok());
        let split = vec!["fu".to_string(), "ck".to_string()];
        assert!(check_options_for_profanity(&split).is_err());
    }

    #[test]
    fn test_increment_response_wire_shape() {
        let response = IncrementResponse { entity_id: "poll-1".into(), applied: false, total_count: 4 };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["entityId"], "poll-1");
        assert_eq!(json["applied"], false);
        assert_eq!(json["totalCount"], 4);
    }

    mod api {
        use rocket::http::{ContentType, Header, Status};
        use rocket::local::asynchronous::Client;
        use sqlx::postgres::PgPoolOptions;
        use sqlx::PgPool;

        use crate::catchers::json_catchers;
        use crate::processor::EntityProcessor;
        use crate::routes::{api_routes, AppState};
        use shared::{generate_server_fingerprint, CreatePollRequest, ErrorResponse, IncrementResponse};

        async fn client_with(pool: PgPool) -> Client {
            let rocket = rocket::build()
                .manage(AppState::new(pool))
                .mount("/api", api_routes())
                .register("/", json_catchers());
            Client::tracked(rocket).await.unwrap()
        }

        // None of these requests get past validation, so the pool never connects.
        async fn client() -> Client {
            let pool = PgPoolOptions::new()
                .connect_lazy("postgres://localhost/dadcircle")
                .unwrap();
            client_with(pool).await
        }

        #[tokio::test]
        async fn test_csrf_token_is_issued() {
            let client = client().await;
            let response = client.get("/api/csrf-token").dispatch().await;
            assert_eq!(response.status(), Status::Ok);
            let token = response.into_string().await.unwrap();
            assert_eq!(token.len(), 43);
        }

        #[tokio::test]
        async fn test_participant_id_comes_from_the_connection() {
            let client = client().await;
            let response = client
                .get("/api/participant")
                .header(Header::new("X-Real-IP", "10.0.0.7"))
                .header(Header::new("User-Agent", "dad-browser"))
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::Ok);
            let id = response.into_string().await.unwrap();
            assert_eq!(id, generate_server_fingerprint("10.0.0.7", Some("dad-browser")));
        }

        #[tokio::test]
        async fn test_foreign_participant_id_is_forbidden() {
            let client = client().await;
            let response = client
                .post("/api/entities/poll-1/increment")
                .header(ContentType::JSON)
                .body(r#"{"subItemId":"opt-0","participantId":"somebody-else"}"#)
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::Forbidden);
        }

        #[tokio::test]
        async fn test_stale_csrf_token_returns_a_fresh_one() {
            let client = client().await;
            let response = client
                .post("/api/polls")
                .header(ContentType::JSON)
                .body(r#"{"csrfToken":"stale","title":"Park or pool?","description":"","options":["Park","Pool"],"author":"Sam"}"#)
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::Forbidden);
            let body: ErrorResponse = response.into_json().await.unwrap();
            assert!(body.error.starts_with("CSRF token expired, please use new token: "));
        }

        #[tokio::test]
        async fn test_unknown_collection_is_bad_request() {
            let client = client().await;
            let response = client.get("/api/collections/votes").dispatch().await;
            assert_eq!(response.status(), Status::BadRequest);
        }

        #[tokio::test]
        async fn test_malformed_entity_id_is_rejected() {
            let client = client().await;
            let response = client
                .post("/api/entities/bad!id/increment")
                .header(ContentType::JSON)
                .body(r#"{"subItemId":"opt-0","participantId":""}"#)
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::BadRequest);
        }

        #[tokio::test]
        async fn test_comment_under_non_uuid_id_is_rejected() {
            let client = client().await;
            let response = client
                .post("/api/entities/post-1:comments/increment")
                .header(ContentType::JSON)
                .body(r#"{"subItemId":"comments","participantId":"not-a-uuid","comment":{"author":"Sam","body":"Same here"}}"#)
                .dispatch()
                .await;
            assert_eq!(response.status(), Status::BadRequest);
        }

        #[tokio::test]
        async fn test_comments_need_a_post_uuid() {
            let client = client().await;
            let response = client.get("/api/posts/nope/comments").dispatch().await;
            assert_eq!(response.status(), Status::BadRequest);
        }

        #[tokio::test]
        async fn test_unknown_route_gets_json_404() {
            let client = client().await;
            let response = client.get("/api/nothing/here").dispatch().await;
            assert_eq!(response.status(), Status::NotFound);
            let body = response.into_string().await.unwrap();
            assert!(body.contains("\"status\":404"));
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_votes_count_the_connection_not_the_body(pool: PgPool) {
            let request = CreatePollRequest {
                csrf_token: String::new(),
                title: "Park or pool?".into(),
                description: String::new(),
                options: vec!["Park".into(), "Pool".into()],
                author: "Sam".into(),
            };
            let poll = EntityProcessor::create_poll(&pool, &request, "fp").await.unwrap();
            let client = client_with(pool).await;
            let url = format!("/api/entities/{}/increment", poll.id);

            for claimed in ["x1", "x2"] {
                let response = client
                    .post(url.as_str())
                    .header(ContentType::JSON)
                    .body(format!(r#"{{"subItemId":"opt-0","participantId":"{}"}}"#, claimed))
                    .dispatch()
                    .await;
                assert_eq!(response.status(), Status::Forbidden);
            }

            let mut totals = Vec::new();
            for _ in 0..2 {
                let response = client
                    .post(url.as_str())
                    .header(ContentType::JSON)
                    .body(r#"{"subItemId":"opt-0","participantId":""}"#)
                    .dispatch()
                    .await;
                assert_eq!(response.status(), Status::Ok);
                let body: IncrementResponse = response.into_json().await.unwrap();
                totals.push((body.applied, body.total_count));
            }
            assert_eq!(totals, vec![(true, 1), (false, 1)]);
        }
    }

    mod store {
        use sqlx::PgPool;
        use uuid::Uuid;

        use crate::error::ApiError;
        use crate::processor::EntityProcessor;
        use shared::{
            comment_thread_id, Collection, CommentDraft, CreatePollRequest, CreatePostRequest, Entity,
            IncrementRequest, COMMENTS_SUB_ITEM, LIKES_SUB_ITEM,
        };

        async fn new_poll(pool: &PgPool) -> Entity {
            let request = CreatePollRequest {
                csrf_token: String::new(),
                title: "Bedtime?".into(),
                description: "For the under fives".into(),
                options: vec!["7pm".into(), "8pm".into()],
                author: "Sam".into(),
            };
            EntityProcessor::create_poll(pool, &request, "fp").await.unwrap()
        }

        async fn new_post(pool: &PgPool) -> Entity {
            let request = CreatePostRequest {
                csrf_token: String::new(),
                title: "First week back at work".into(),
                body: "How did you handle it?".into(),
                author: "Alex".into(),
            };
            EntityProcessor::create_post(pool, &request, "fp").await.unwrap()
        }

        fn count_on(sub_item_id: &str, participant: &str) -> IncrementRequest {
            IncrementRequest {
                sub_item_id: sub_item_id.into(),
                participant_id: participant.into(),
                comment: None,
            }
        }

        fn comment(body: &str) -> IncrementRequest {
            IncrementRequest {
                sub_item_id: COMMENTS_SUB_ITEM.into(),
                participant_id: Uuid::new_v4().to_string(),
                comment: Some(CommentDraft { author: "Alex".into(), body: body.into() }),
            }
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_increment_replay_changes_nothing(pool: PgPool) {
            let poll = new_poll(&pool).await;

            let first = EntityProcessor::apply_increment(&pool, &poll.id, &count_on("opt-0", "dad-1")).await.unwrap();
            assert!(first.applied);
            assert_eq!(first.total_count, 1);

            let replay = EntityProcessor::apply_increment(&pool, &poll.id, &count_on("opt-0", "dad-1")).await.unwrap();
            assert!(!replay.applied);
            assert_eq!(replay.total_count, 1);
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_second_option_for_same_participant_conflicts(pool: PgPool) {
            let poll = new_poll(&pool).await;
            EntityProcessor::apply_increment(&pool, &poll.id, &count_on("opt-0", "dad-1")).await.unwrap();

            let err = EntityProcessor::apply_increment(&pool, &poll.id, &count_on("opt-1", "dad-1")).await.unwrap_err();
            assert!(matches!(err, ApiError::AlreadyParticipated));
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_increment_rejects_wrong_targets(pool: PgPool) {
            let poll = new_poll(&pool).await;
            let post = new_post(&pool).await;

            let mut with_comment = comment("Nice");
            with_comment.sub_item_id = "opt-0".into();
            let err = EntityProcessor::apply_increment(&pool, &poll.id, &with_comment).await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidInput(_)));

            let thread_id = comment_thread_id(&post.id);
            let bare = count_on(COMMENTS_SUB_ITEM, &Uuid::new_v4().to_string());
            let err = EntityProcessor::apply_increment(&pool, &thread_id, &bare).await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidInput(_)));

            let err = EntityProcessor::apply_increment(&pool, &poll.id, &count_on("opt-9", "dad-1")).await.unwrap_err();
            assert!(matches!(err, ApiError::UnknownSubItem(_)));

            let err = EntityProcessor::apply_increment(&pool, "missing", &count_on("opt-0", "dad-1")).await.unwrap_err();
            assert!(matches!(err, ApiError::NotFound));
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_likes_and_comments_are_counted(pool: PgPool) {
            let post = new_post(&pool).await;
            let liked = EntityProcessor::apply_increment(&pool, &post.id, &count_on(LIKES_SUB_ITEM, "dad-1")).await.unwrap();
            assert_eq!(liked.total_count, 1);

            let thread_id = comment_thread_id(&post.id);
            EntityProcessor::apply_increment(&pool, &thread_id, &comment("Same here")).await.unwrap();
            let second = EntityProcessor::apply_increment(&pool, &thread_id, &comment("It gets easier")).await.unwrap();
            assert_eq!(second.total_count, 2);

            let post_id = Uuid::parse_str(&post.id).unwrap();
            let comments = EntityProcessor::list_comments(&pool, post_id).await.unwrap();
            let bodies: Vec<&str> = comments.iter().map(|c| c.body.as_str()).collect();
            assert_eq!(bodies, vec!["Same here", "It gets easier"]);

            let threads = EntityProcessor::fetch_collection(&pool, Collection::Comments).await.unwrap();
            assert_eq!(threads.len(), 1);
            assert_eq!(threads[0].total_count, 2);
            assert!(threads[0].is_consistent());
        }

        #[sqlx::test(migrations = "./migrations")]
        async fn test_collection_snapshot_is_consistent(pool: PgPool) {
            let poll = new_poll(&pool).await;
            let older = new_poll(&pool).await;

            for (option, dad) in [("opt-0", "dad-1"), ("opt-1", "dad-2"), ("opt-1", "dad-3"), ("opt-1", "dad-3")] {
                EntityProcessor::apply_increment(&pool, &poll.id, &count_on(option, dad)).await.unwrap();
            }
            assert!(EntityProcessor::apply_increment(&pool, &poll.id, &count_on("opt-0", "dad-2")).await.is_err());

            let polls = EntityProcessor::fetch_collection(&pool, Collection::Polls).await.unwrap();
            assert_eq!(polls.len(), 2);
            assert!(polls.iter().all(Entity::is_consistent));

            let counted = polls.iter().find(|p| p.id == poll.id).unwrap();
            assert_eq!(counted.total_count, 3);
            let counts: Vec<u32> = counted.sub_items.iter().map(|item| item.count).collect();
            assert_eq!(counts, vec![1, 2]);
            assert!(counted.sub_items[1].participants.contains("dad-3"));

            let untouched = polls.iter().find(|p| p.id == older.id).unwrap();
            assert_eq!(untouched.total_count, 0);
        }
    }
}
