use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::ErrorResponse;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Entity not found")]
    NotFound,
    #[error("Unknown sub-item: {0}")]
    UnknownSubItem(String),
    #[error("Invalid id")]
    InvalidId,
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Participant already counted on another item")]
    AlreadyParticipated,
    #[error("{0}")]
    RateLimited(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::NotFound | ApiError::UnknownSubItem(_) => Status::NotFound,
            ApiError::InvalidId | ApiError::InvalidInput(_) => Status::BadRequest,
            ApiError::Forbidden(_) => Status::Forbidden,
            ApiError::AlreadyParticipated => Status::Conflict,
            ApiError::RateLimited(_) => Status::TooManyRequests,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }
}

impl From<shared::ValidationError> for ApiError {
    fn from(err: shared::ValidationError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        // Internal details stay in the logs.
        let error = match &self {
            ApiError::Internal(details) => {
                tracing::error!(%details, "request failed");
                "An internal server error occurred.".to_string()
            }
            other => other.to_string(),
        };

        rocket::Response::build_from(Json(ErrorResponse { error }).respond_to(req)?)
            .status(status)
            .ok()
    }
}
