//! JSON and query extractors whose rejections surface as `400 {message}`.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query},
};

use crate::error::AppError;

/// [`Json`] with malformed bodies reported through [`AppError::BadRequest`].
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// [`Query`] with malformed query strings reported through [`AppError::BadRequest`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
