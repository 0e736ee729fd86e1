//! `Path`, `Query` and `Json` extractors whose rejections render as the
//! usual `AppError` JSON body instead of axum's plain-text responses.

use axum::extract::{FromRequest, FromRequestParts};
use crate::AppError;

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);
