use std::time::Duration;

use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{self, LocalBoxStream, StreamExt};
use gloo_net::http::{Request, Response};
use gloo_timers::future::TimeoutFuture;
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    parse_collection, Collection, Comment, CreatePollRequest, CreatePostRequest, DispatchFailure, Entity,
    ErrorResponse, IncrementRequest, Mutation, RawEntity, RemoteStore, Timer,
};

use crate::config::CONFIG;

/// The backend reached over HTTP. Snapshots are produced by polling the
/// collection endpoint.
pub struct HttpStore {
    base_url: String,
    interval_ms: u32,
}

impl HttpStore {
    pub fn new() -> Self {
        Self {
            base_url: CONFIG.api_base_url.to_string(),
            interval_ms: CONFIG.snapshot_interval_ms,
        }
    }
}

async fn fetch_collection(base_url: String, collection: Collection) -> Result<Vec<Entity>, DispatchFailure> {
    let response = Request::get(&format!("{}/collections/{}", base_url, collection))
        .send()
        .await
        .map_err(|_| DispatchFailure::NetworkUnavailable)?;
    if !response.ok() {
        return Err(DispatchFailure::from_status(response.status()));
    }

    let raw = response.json::<Vec<RawEntity>>().await.map_err(|e| {
        log(&format!("Unreadable {} snapshot: {}", collection, e));
        DispatchFailure::Unknown
    })?;
    parse_collection(raw).map_err(|e| {
        log(&format!("Rejected {} snapshot: {}", collection, e));
        DispatchFailure::Unknown
    })
}

impl RemoteStore for HttpStore {
    fn apply_atomic_increment(&self, mutation: &Mutation) -> LocalBoxFuture<'static, Result<(), DispatchFailure>> {
        let url = format!("{}/entities/{}/increment", self.base_url, mutation.entity_id);
        let body = IncrementRequest::from(mutation);

        async move {
            let request = Request::post(&url)
                .json(&body)
                .map_err(|_| DispatchFailure::Unknown)?;
            let response = request.send().await.map_err(|_| DispatchFailure::NetworkUnavailable)?;
            if response.ok() {
                Ok(())
            } else {
                Err(DispatchFailure::from_status(response.status()))
            }
        }
        .boxed_local()
    }

    fn subscribe(&self, collection: Collection) -> LocalBoxStream<'static, Result<Vec<Entity>, DispatchFailure>> {
        let base_url = self.base_url.clone();
        let interval_ms = self.interval_ms;
        // First snapshot right away. Each later one waits a full interval
        // after the previous fetch finished, so a stall never queues up.
        stream::unfold(true, move |first| {
            let base_url = base_url.clone();
            async move {
                if !first {
                    TimeoutFuture::new(interval_ms).await;
                }
                Some((fetch_collection(base_url, collection).await, false))
            }
        })
        .boxed_local()
    }
}

pub struct GlooTimer;

impl Timer for GlooTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        TimeoutFuture::new(millis).boxed_local()
    }
}

pub fn dispatch_timeout() -> Duration {
    Duration::from_millis(u64::from(CONFIG.dispatch_timeout_ms))
}

pub fn log(message: &str) {
    web_sys::console::log_1(&message.into());
}

pub async fn fetch_csrf_token() -> Result<String, String> {
    let response = Request::get(&format!("{}/csrf-token", CONFIG.api_base_url))
        .send()
        .await
        .map_err(|e| e.to_string())?;
    response.text().await.map_err(|e| e.to_string())
}

/// The id the server counts this browser under for votes and likes.
pub async fn fetch_participant() -> Result<String, String> {
    let response = Request::get(&format!("{}/participant", CONFIG.api_base_url))
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !response.ok() {
        return Err(error_message(response, "Could not identify this browser").await);
    }
    response.text().await.map_err(|e| e.to_string())
}

pub async fn fetch_comments(post_id: &str) -> Result<Vec<Comment>, String> {
    let response = Request::get(&format!("{}/posts/{}/comments", CONFIG.api_base_url, post_id))
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !response.ok() {
        return Err(error_message(response, "Could not load comments").await);
    }
    response.json::<Vec<Comment>>().await.map_err(|e| e.to_string())
}

enum SubmitError {
    CsrfExpired(String),
    Message(String),
}

async fn error_message(response: Response, fallback: &str) -> String {
    response.json::<ErrorResponse>().await
        .map(|err| err.error)
        .unwrap_or_else(|_| fallback.to_string())
}

async fn submit<Req: Serialize, Resp: DeserializeOwned>(path: &str, request: &Req) -> Result<Resp, SubmitError> {
    let response = Request::post(&format!("{}{}", CONFIG.api_base_url, path))
        .json(request)
        .map_err(|e| SubmitError::Message(e.to_string()))?
        .send()
        .await
        .map_err(|e| SubmitError::Message(e.to_string()))?;

    match response.status() {
        200 => response.json::<Resp>().await.map_err(|e| SubmitError::Message(e.to_string())),
        429 => Err(SubmitError::Message("You're posting too quickly. Please wait a few minutes.".into())),
        403 => {
            let error = error_message(response, "Please try submitting again").await;
            match error.strip_prefix("CSRF token expired, please use new token: ") {
                Some(token) => Err(SubmitError::CsrfExpired(token.to_string())),
                None => Err(SubmitError::Message(error)),
            }
        }
        400 | 404 => Err(SubmitError::Message(error_message(response, "Invalid request").await)),
        _ => Err(SubmitError::Message("An unexpected error occurred".into())),
    }
}

pub async fn create_poll(mut request: CreatePollRequest) -> Result<Entity, String> {
    match submit("/polls", &request).await {
        Ok(poll) => Ok(poll),
        Err(SubmitError::CsrfExpired(token)) => {
            request.csrf_token = token;
            submit("/polls", &request).await.map_err(into_message)
        }
        Err(SubmitError::Message(error)) => Err(error),
    }
}

pub async fn create_post(mut request: CreatePostRequest) -> Result<Entity, String> {
    match submit("/posts", &request).await {
        Ok(post) => Ok(post),
        Err(SubmitError::CsrfExpired(token)) => {
            request.csrf_token = token;
            submit("/posts", &request).await.map_err(into_message)
        }
        Err(SubmitError::Message(error)) => Err(error),
    }
}

fn into_message(err: SubmitError) -> String {
    match err {
        SubmitError::CsrfExpired(_) => "Your session expired, please reload the page".into(),
        SubmitError::Message(message) => message,
    }
}
