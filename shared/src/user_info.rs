use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    /// Identifier the user is counted under in vote and like participant
    /// sets. Derived on the server, never taken from the client.
    pub participant_id: String,
    /// Hash of the connection, used to key rate limits.
    pub user_fingerprint: String,
    pub ip: String,
}

// Backend-specific code
#[cfg(not(target_arch = "wasm32"))]
pub fn generate_server_fingerprint(ip: &str, user_agent: Option<&str>) -> String {
    hash_parts(&[ip, user_agent.unwrap_or_default()])
}

#[cfg(not(target_arch = "wasm32"))]
fn hash_parts(parts: &[&str]) -> String {
    use base64::engine::general_purpose::URL_SAFE;
    use base64::Engine;
    use sha2::{Sha256, Digest};

    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"-");
    }
    URL_SAFE.encode(hasher.finalize())
}

// Backend-specific Rocket implementation
#[cfg(feature = "backend")]
mod backend_impl {
    use super::*;
    use rocket::request::{FromRequest, Outcome};
    use rocket::Request;

    #[rocket::async_trait]
    impl<'r> FromRequest<'r> for UserInfo {
        type Error = ();

        async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
            let headers = req.headers();
            let ip = headers.get_one("X-Real-IP")
                .or_else(|| headers.get_one("X-Forwarded-For"))
                .unwrap_or("0.0.0.0")
                .to_string();

            let fingerprint = generate_server_fingerprint(&ip, headers.get_one("User-Agent"));

            Outcome::Success(UserInfo {
                participant_id: fingerprint.clone(),
                user_fingerprint: fingerprint,
                ip,
            })
        }
    }
}
