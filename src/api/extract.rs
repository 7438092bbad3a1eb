//! Custom extractors.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use super::error::ApiError;
use super::validation::flatten_errors;

/// JSON body extraction with validation.
///
/// Deserializes the body into `T` and runs its `Validate` implementation
/// before the handler sees it. Malformed JSON or a missing field rejects
/// with 400 naming the offending field; rule violations reject with a
/// field-level validation error.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| ApiError::validation(flatten_errors(&errors)))?;

        Ok(Self(value))
    }
}
