use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON body extractor whose rejections render as `{"error": ...}` with 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
