//! `Json<T>` plus `validator::Validate`
//!
//! Malformed bodies answer 400 `INVALID_JSON`; bodies that parse but fail
//! validation answer 422 `INVALID_ARGUMENT` with one `field: message` entry
//! per violated rule.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use super::ApiResponse;

pub struct ValidatedJson<T>(pub T);

pub enum ValidatedJsonRejection {
    Json(JsonRejection),
    Invalid(ValidationErrors),
}

fn describe(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{field}: {msg}"),
                None => format!("{field}: {}", e.code),
            })
        })
        .collect();
    // HashMap iteration order is not stable
    parts.sort();

    if parts.is_empty() {
        "Validation failed".to_string()
    } else {
        parts.join("; ")
    }
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Json(rejection) => (
                StatusCode::BAD_REQUEST,
                ApiResponse::<()>::error_with_code(
                    "INVALID_JSON",
                    format!("Invalid JSON: {rejection}"),
                ),
            ),
            Self::Invalid(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiResponse::<()>::error_with_code("INVALID_ARGUMENT", describe(&errors)),
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::Json)?;
        value.validate().map_err(ValidatedJsonRejection::Invalid)?;
        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use tower::ServiceExt;

    use super::*;

    #[derive(Debug, Deserialize, Validate)]
    struct NewStream {
        #[validate(length(min = 1, max = 8))]
        name: String,
        #[validate(length(min = 1))]
        owner_id: String,
    }

    async fn create(ValidatedJson(body): ValidatedJson<NewStream>) -> String {
        format!("{}:{}", body.name, body.owner_id)
    }

    async fn post_json(body: &'static str) -> (StatusCode, serde_json::Value) {
        let app = Router::new().route("/streams", post(create));
        let req = Request::builder()
            .method("POST")
            .uri("/streams")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let (status, _) = post_json(r#"{"name":"orders","owner_id":"o1"}"#).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (status, json) = post_json("{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INVALID_JSON");
    }

    #[tokio::test]
    async fn rule_violations_are_listed_per_field() {
        let (status, json) = post_json(r#"{"name":"much-too-long","owner_id":""}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["code"], "INVALID_ARGUMENT");
        let message = json["error"].as_str().unwrap();
        assert!(message.starts_with("name: "));
        assert!(message.contains("; owner_id: "));
    }
}
