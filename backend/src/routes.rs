use rocket::{State, Route, get, post, routes, http::Status, serde::json::Json};
use tracing::{error, debug, info, instrument, warn};
use std::sync::Mutex;
use std::collections::HashSet;
use ring::rand::{SecureRandom, SystemRandom};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sqlx::PgPool;
use time::Duration;
use shared::{models::*, user_info::UserInfo, validate_comment, validate_poll_request, validate_post_request};
use crate::{
    error::ApiError,
    processor::EntityProcessor,
    rate_limiter::RateLimiter,
    utils::{check_entity_id, check_options_for_profanity, check_participant_id, check_profanity, parse_collection_name, parse_uuid},
};

const CREATE_LIMIT: u32 = 3;
const CREATE_WINDOW_MINUTES: i64 = 10;
const INCREMENT_LIMIT: u32 = 30;
const INCREMENT_WINDOW_MINUTES: i64 = 1;
const MAX_TOKENS: usize = 10000;

pub struct CsrfGuard {
    tokens: Mutex<HashSet<String>>,
    rng: SystemRandom,
}

impl CsrfGuard {
    pub(crate) fn new() -> Self {
        Self {
            tokens: Mutex::new(HashSet::new()),
            rng: SystemRandom::new(),
        }
    }

    fn cleanup_old_tokens(&self) {
        if let Ok(mut tokens) = self.tokens.lock() {
            if tokens.len() > MAX_TOKENS {
                tokens.clear();
            }
        }
    }

    pub(crate) fn generate_token(&self) -> Result<String, Status> {
        self.cleanup_old_tokens();
        let mut bytes = [0u8; 32];
        self.rng.fill(&mut bytes).map_err(|_| Status::InternalServerError)?;
        let token = URL_SAFE_NO_PAD.encode(bytes);
        let mut tokens = self.tokens.lock().map_err(|_| {
            error!("Failed to acquire lock for token storage");
            Status::InternalServerError
        })?;
        tokens.insert(token.clone());
        debug!("Generated new CSRF token");
        Ok(token)
    }

    /// Consumes `token`. A rejected token comes back as `Forbidden` carrying a
    /// fresh one so the form can resubmit.
    pub(crate) fn verify_token(&self, token: &str) -> Result<(), ApiError> {
        let mut tokens = self.tokens.lock()
            .map_err(|_| ApiError::Internal("csrf lock poisoned".into()))?;
        if tokens.remove(token) {
            return Ok(());
        }
        drop(tokens);
        debug!("CSRF token validation failed. Token not found or already used.");
        let fresh = self.generate_token()
            .map_err(|_| ApiError::Internal("Failed to generate new CSRF token".into()))?;
        Err(ApiError::Forbidden(format!("CSRF token expired, please use new token: {}", fresh)))
    }
}

pub struct AppState {
    pub create_limiter: RateLimiter,
    pub increment_limiter: RateLimiter,
    pub csrf: CsrfGuard,
    pub db: PgPool,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            create_limiter: RateLimiter::new(CREATE_LIMIT, Duration::minutes(CREATE_WINDOW_MINUTES)),
            increment_limiter: RateLimiter::new(INCREMENT_LIMIT, Duration::minutes(INCREMENT_WINDOW_MINUTES)),
            csrf: CsrfGuard::new(),
            db: pool,
        }
    }
}

#[get("/csrf-token")]
pub async fn get_csrf_token(state: &State<AppState>) -> Result<String, Status> {
    state.csrf.generate_token()
}

/// The id this connection is counted under for votes and likes.
#[get("/participant")]
pub async fn get_participant(user_info: UserInfo) -> String {
    user_info.participant_id
}

#[get("/collections/<name>")]
pub async fn get_collection(state: &State<AppState>, name: &str) -> Result<Json<Vec<Entity>>, ApiError> {
    let collection = parse_collection_name(name)?;
    EntityProcessor::fetch_collection(&state.db, collection).await.map(Json)
}

#[instrument(skip(state, request, user_info), fields(poll_id))]
#[post("/polls", format = "json", data = "<request>")]
pub async fn create_poll(
    state: &State<AppState>,
    request: Json<CreatePollRequest>,
    user_info: UserInfo,
) -> Result<Json<Entity>, ApiError> {
    let request = request.into_inner();
    state.csrf.verify_token(&request.csrf_token)?;

    validate_poll_request(&request)?;
    check_profanity("title", &request.title)?;
    check_profanity("description", &request.description)?;
    check_profanity("author", &request.author)?;
    check_options_for_profanity(&request.options)?;

    state.create_limiter.check(&format!("create:{}", user_info.user_fingerprint))?;

    let poll = EntityProcessor::create_poll(&state.db, &request, &user_info.user_fingerprint).await?;
    tracing::Span::current().record("poll_id", poll.id.as_str());
    info!(options = poll.sub_items.len(), "poll created");
    Ok(Json(poll))
}

#[instrument(skip(state, request, user_info), fields(post_id))]
#[post("/posts", format = "json", data = "<request>")]
pub async fn create_post(
    state: &State<AppState>,
    request: Json<CreatePostRequest>,
    user_info: UserInfo,
) -> Result<Json<Entity>, ApiError> {
    let request = request.into_inner();
    state.csrf.verify_token(&request.csrf_token)?;

    validate_post_request(&request)?;
    check_profanity("title", &request.title)?;
    check_profanity("body", &request.body)?;
    check_profanity("author", &request.author)?;

    state.create_limiter.check(&format!("create:{}", user_info.user_fingerprint))?;

    let post = EntityProcessor::create_post(&state.db, &request, &user_info.user_fingerprint).await?;
    tracing::Span::current().record("post_id", post.id.as_str());
    info!("post created");
    Ok(Json(post))
}

#[instrument(skip(state, request, user_info), fields(entity_id = %id, sub_item))]
#[post("/entities/<id>/increment", format = "json", data = "<request>")]
pub async fn increment(
    state: &State<AppState>,
    id: &str,
    request: Json<IncrementRequest>,
    user_info: UserInfo,
) -> Result<Json<IncrementResponse>, ApiError> {
    let mut request = request.into_inner();
    check_entity_id(id)?;
    tracing::Span::current().record("sub_item", request.sub_item_id.as_str());

    match &request.comment {
        // Votes and likes count the connection, whatever the body claims.
        None => {
            if request.participant_id.trim().is_empty() {
                request.participant_id = user_info.participant_id.clone();
            } else if request.participant_id != user_info.participant_id {
                warn!("participant id does not match the connection");
                return Err(ApiError::Forbidden("Participant id does not belong to this connection".into()));
            }
        }
        // Comments are counted under their own id.
        Some(draft) => {
            validate_comment(draft)?;
            check_profanity("comment", &draft.body)?;
            check_profanity("author", &draft.author)?;
            parse_uuid(&request.participant_id)?;
        }
    }
    check_participant_id(&request.participant_id)?;

    state.increment_limiter.check(&format!("increment:{}", user_info.user_fingerprint))?;

    let response = EntityProcessor::apply_increment(&state.db, id, &request).await?;
    debug!(applied = response.applied, total = response.total_count, "increment handled");
    Ok(Json(response))
}

#[get("/posts/<id>/comments")]
pub async fn list_comments(state: &State<AppState>, id: &str) -> Result<Json<Vec<Comment>>, ApiError> {
    let post_id = parse_uuid(id)?;
    EntityProcessor::list_comments(&state.db, post_id).await.map(Json)
}

pub fn api_routes() -> Vec<Route> {
    routes![
        get_csrf_token,
        get_participant,
        get_collection,
        create_poll,
        create_post,
        increment,
        list_comments
    ]
}
