use crate::error::ApiError;
use rustrict::CensorStr;
use shared::Collection;
use uuid::Uuid;

const MAX_ENTITY_ID_LENGTH: usize = 80;
const MAX_PARTICIPANT_ID_LENGTH: usize = 128;

pub fn parse_collection_name(name: &str) -> Result<Collection, ApiError> {
    name.parse().map_err(ApiError::InvalidInput)
}

pub fn parse_uuid(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::InvalidId)
}

/// Entity ids are uuids, optionally suffixed (`<uuid>:comments`).
pub fn check_entity_id(id: &str) -> Result<(), ApiError> {
    let well_formed = !id.is_empty()
        && id.len() <= MAX_ENTITY_ID_LENGTH
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':');
    if well_formed { Ok(()) } else { Err(ApiError::InvalidId) }
}

pub fn check_participant_id(id: &str) -> Result<(), ApiError> {
    if id.trim().is_empty() || id.len() > MAX_PARTICIPANT_ID_LENGTH {
        return Err(ApiError::InvalidInput("Missing or oversized participant id".into()));
    }
    Ok(())
}

pub fn check_profanity(field: &str, text: &str) -> Result<(), ApiError> {
    if text.is_inappropriate() {
        return Err(ApiError::InvalidInput(format!("Possible profanity detected in {}", field)));
    }
    Ok(())
}

/// Checks each option alone and every run of adjacent options joined
/// together, which catches words split across entries.
pub fn check_options_for_profanity(options: &[String]) -> Result<(), ApiError> {
    for option in options {
        check_profanity("option", option)?;
    }
    for window_size in 2..=options.len() {
        for window in options.windows(window_size) {
            if window.join("").is_inappropriate() {
                return Err(ApiError::InvalidInput(format!(
                    "Inappropriate content detected across options: {}",
                    window.join(", ")
                )));
            }
        }
    }
    Ok(())
}
