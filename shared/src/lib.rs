pub mod error;
pub mod models;
pub mod validation;
pub mod user_info;
pub mod projector;
pub mod dispatcher;
pub mod reconciler;
pub mod store;
pub mod actions;

pub use error::{Error, ErrorCode, ErrorResponse, DispatchFailure, ReconcileError};
pub use models::*;
pub use validation::*;
pub use user_info::*;
pub use projector::{project, project_all};
pub use dispatcher::{MutationDispatcher, PendingDispatch, RemoteStore, Timer};
pub use reconciler::{Notice, Phase, Reconciler, Transition};
pub use store::LiveStore;
pub use actions::{option_id, Action};

#[cfg(test)]
mod tests;
