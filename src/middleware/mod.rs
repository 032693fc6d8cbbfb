//! Request extractors shared by the HTTP handlers.

pub mod auth;
pub mod extract;

pub use auth::{AuthUser, SetupUser};
pub use extract::{AppJson, AppQuery};
