//! Request extractors whose rejections use the JSON error body.
//!
//! Axum's own `Json` and `Path` reject with plain text. These wrap them and
//! turn a rejection into [`AppError::Validation`], so malformed input gets
//! the same `{"message": "..."}` shape as every other error.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Typed path parameter.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParam<T>(pub T);
