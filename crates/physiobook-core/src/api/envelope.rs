use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ApiError;

/// The `{success, message, data}` wrapper every backend endpoint returns.
///
/// It is decoded exactly once here; nothing downstream re-checks
/// `success` by hand.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(
                self.message
                    .unwrap_or_else(|| "Request rejected by server".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| ApiError::InvalidResponse("success envelope missing data".to_string()))
    }
}

/// Decode a response into the payload type. Non-2xx statuses map through
/// `ApiError::from_status`; 2xx bodies must carry a success envelope with
/// data.
pub fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, ApiError> {
    if !status.is_success() {
        return Err(ApiError::from_status(status, body));
    }
    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|e| ApiError::InvalidResponse(format!("malformed envelope: {}", e)))?;
    envelope.into_result()
}

/// Decode an acknowledgement-style response where only `success` and
/// `message` matter (logout, booking decision, name update). Returns the
/// server message.
pub fn decode_ack(status: StatusCode, body: &str) -> Result<String, ApiError> {
    if !status.is_success() {
        return Err(ApiError::from_status(status, body));
    }
    let envelope: Envelope<serde_json::Value> = serde_json::from_str(body)
        .map_err(|e| ApiError::InvalidResponse(format!("malformed envelope: {}", e)))?;
    if !envelope.success {
        return Err(ApiError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "Request rejected by server".to_string()),
        ));
    }
    Ok(envelope.message.unwrap_or_else(|| "ok".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: i32,
    }

    #[test]
    fn success_with_data_decodes() {
        let body = r#"{"success": true, "data": {"value": 7}}"#;
        let payload: Payload = decode(StatusCode::OK, body).unwrap();
        assert_eq!(payload, Payload { value: 7 });
    }

    #[test]
    fn success_without_data_is_invalid() {
        let body = r#"{"success": true, "message": "done"}"#;
        let result: Result<Payload, _> = decode(StatusCode::OK, body);
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    }

    #[test]
    fn failure_carries_server_message() {
        let body = r#"{"success": false, "message": "Insufficient balance"}"#;
        let result: Result<Payload, _> = decode(StatusCode::OK, body);
        match result {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Insufficient balance"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn failure_without_message_gets_default() {
        let result: Result<Payload, _> = decode(StatusCode::OK, r#"{"success": false}"#);
        match result {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Request rejected by server"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn non_success_status_short_circuits() {
        let result: Result<Payload, _> = decode(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[test]
    fn non_envelope_body_is_invalid() {
        let result: Result<Payload, _> = decode(StatusCode::OK, "not json at all");
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    }

    #[test]
    fn ack_returns_message() {
        let body = r#"{"success": true, "message": "Logged out successfully"}"#;
        assert_eq!(
            decode_ack(StatusCode::OK, body).unwrap(),
            "Logged out successfully"
        );
    }

    #[test]
    fn ack_rejection_surfaces_message() {
        let body = r#"{"success": false, "message": "Booking already decided"}"#;
        match decode_ack(StatusCode::OK, body) {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Booking already decided"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
