use rocket::{Catcher, Request, catch, catchers, serde::json::Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorMessage {
    error: String,
    status: u16,
}

fn message(error: &str, status: u16) -> Json<ErrorMessage> {
    Json(ErrorMessage { error: error.into(), status })
}

#[catch(403)]
pub fn forbidden(_req: &Request) -> Json<ErrorMessage> {
    message("Access forbidden. Refresh the page and try again.", 403)
}

#[catch(409)]
pub fn conflict(req: &Request) -> Json<ErrorMessage> {
    let error = match req.uri().path().segments().next() {
        Some("api") => "You have already been counted here.",
        _ => "The request conflicts with the current state.",
    };
    message(error, 409)
}

#[catch(429)]
pub fn too_many_requests(_req: &Request) -> Json<ErrorMessage> {
    message("Rate limit exceeded. Please wait before trying again.", 429)
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorMessage> {
    message("Invalid request parameters.", 400)
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Json<ErrorMessage> {
    message("The request body could not be understood.", 422)
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorMessage> {
    message("An internal server error occurred.", 500)
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Json<ErrorMessage> {
    message("The requested resource was not found.", 404)
}

pub fn json_catchers() -> Vec<Catcher> {
    catchers![
        forbidden,
        conflict,
        too_many_requests,
        bad_request,
        unprocessable,
        internal_error,
        not_found
    ]
}
