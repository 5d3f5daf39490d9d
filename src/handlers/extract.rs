use axum::extract::{FromRequest, FromRequestParts};

use crate::errors::AppError;

/// `Json` whose rejection renders as a `validation_error` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `Query` whose rejection renders as a `validation_error` body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);
