//! HTTP request handlers.

pub mod http;
pub mod issues;
pub mod proxy;
pub mod public;

pub use http::*;
