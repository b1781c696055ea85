//! Free-form JSON bodies for the loan and withdrawal validators.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde_json::Value;

use crate::errors::AppError;

/// A non-empty JSON object, handed to the domain validators as is.
///
/// A missing or unparsable body, a non-object, or `{}` is rejected with
/// "No input data provided".
pub struct JsonPayload(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonPayload
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let no_input = || AppError::validation("No input data provided");
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|_| no_input())?;

        match value.as_object() {
            Some(object) if !object.is_empty() => Ok(JsonPayload(value)),
            _ => Err(no_input()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header::CONTENT_TYPE};

    async fn extract(body: &'static str) -> Result<Value, AppError> {
        let request = Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        JsonPayload::from_request(request, &())
            .await
            .map(|JsonPayload(value)| value)
    }

    #[tokio::test]
    async fn test_object_is_accepted() {
        let value = extract(r#"{"amount": 150000}"#).await.unwrap();
        assert_eq!(value["amount"], 150000);
    }

    #[tokio::test]
    async fn test_empty_inputs_are_rejected() {
        for body in ["{}", "[]", "null", "", "not json"] {
            let err = extract(body).await.unwrap_err();
            assert_eq!(err.to_string(), "No input data provided");
        }
    }
}
