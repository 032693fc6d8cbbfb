//! `Json` and `Query` extractors whose rejections become [`AppError::Validation`].

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body; a missing field or bad syntax answers 400 `{"error": ...}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string; a mistyped parameter answers 400 `{"error": ...}`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
