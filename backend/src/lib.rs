pub mod processor;
pub mod routes;
pub mod error;
pub mod utils;
pub mod rate_limiter;
pub mod catchers;
pub use shared::user_info;
pub use shared::{models::*, error::*, user_info::*};

#[cfg(test)]
mod tests;
