//! The `{status, message, payload}` envelope every endpoint answers with.
//!
//! All responses, including every failure, are built here so the body
//! shape and the `Content-Type` header never diverge between endpoints.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Written when even a failure envelope cannot be serialized.
const FALLBACK_BODY: &[u8] = br#"{"status":"FAIL","message":"failed to encode response"}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAIL")]
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>, payload: Option<serde_json::Value>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
            payload,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            message: message.into(),
            payload: None,
        }
    }
}

impl Error {
    /// HTTP status a failure envelope is sent with.
    ///
    /// Adapter failures are business results and keep `200 OK`.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Decode(_) | Error::Serialization(_) | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Error::Io(_)
            | Error::CommandFailed(_)
            | Error::Adapter(_)
            | Error::Timeout { .. } => StatusCode::OK,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        encode_failure(&self)
    }
}

/// `{OK, message, payload}`. Falls back to a failure envelope if `payload` cannot be serialized.
pub fn encode_success<T: Serialize + ?Sized>(message: &str, payload: &T) -> Response {
    match serde_json::to_value(payload) {
        Ok(value) => respond(StatusCode::OK, &Envelope::ok(message, Some(value))),
        Err(e) => encode_failure(&Error::Serialization(e)),
    }
}

/// `{OK, message}` with no payload.
pub fn encode_message(message: &str) -> Response {
    respond(StatusCode::OK, &Envelope::ok(message, None))
}

/// `{FAIL, err-text}`. Every error path of the gateway ends here.
pub fn encode_failure(err: &Error) -> Response {
    tracing::error!(error = %err, "Request failed");
    respond(err.status_code(), &Envelope::fail(err.to_string()))
}

/// Parses a JSON request body into `T`.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))
}

fn respond(status: StatusCode, envelope: &Envelope) -> Response {
    let (status, body) = match serde_json::to_vec(envelope) {
        Ok(body) => (status, body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode envelope");
            (StatusCode::INTERNAL_SERVER_ERROR, FALLBACK_BODY.to_vec())
        }
    };

    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::collections::HashMap;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_wraps_payload() {
        let response = encode_success("Networks", &vec!["a", "b"]);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status": "OK", "message": "Networks", "payload": ["a", "b"]})
        );
    }

    #[tokio::test]
    async fn message_only_omits_payload() {
        let json = body_json(encode_message("Killing service.")).await;
        assert_eq!(json, serde_json::json!({"status": "OK", "message": "Killing service."}));
    }

    #[tokio::test]
    async fn failure_carries_error_text_and_no_payload() {
        let response = encode_failure(&Error::Adapter("radio is off".to_string()));
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "FAIL");
        assert_eq!(json["message"], "radio is off");
        assert!(json.get("payload").is_none());
    }

    #[tokio::test]
    async fn unserializable_payload_becomes_failure_envelope() {
        // JSON object keys must be strings.
        let mut payload = HashMap::new();
        payload.insert((1u8, 2u8), "x");

        let response = encode_success("status", &payload);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["status"], "FAIL");
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn decode_rejects_malformed_json() {
        let err = decode_body::<crate::structs::Credentials>(b"{\"ssid\":").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn decode_rejects_type_mismatch() {
        let err = decode_body::<crate::structs::Credentials>(br#"{"ssid": 42}"#).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn shutting_down_maps_to_service_unavailable() {
        assert_eq!(
            Error::ShuttingDown.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
