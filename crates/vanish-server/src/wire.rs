//! JSON request and response bodies.
//!
//! Keys and ciphertexts travel as standard-alphabet base64. Timestamps are
//! unix seconds as floating point.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use vanish_core::Envelope;

use crate::error::ApiError;

/// `POST /register` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// User publishing the key.
    pub user_id: String,
    /// Public key, base64.
    pub public_key_b64: String,
}

/// `POST /register` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Echo of the registered user.
    pub user_id: String,
}

/// `GET /public_key/:user_id` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    /// User looked up.
    pub user_id: String,
    /// Registered public key, base64.
    pub public_key_b64: String,
}

/// `POST /send` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequestBody {
    /// Claimed sender.
    pub sender: String,
    /// Recipient mailbox.
    pub recipient: String,
    /// Sealed payload, base64.
    pub ciphertext_b64: String,
    /// Lifetime in seconds. Absent, null or zero means no TTL; negative is
    /// refused.
    #[serde(default)]
    pub ttl_seconds: Option<i64>,
}

impl SendRequestBody {
    /// Lifetime to hand to the relay.
    pub fn ttl(&self) -> Result<Option<u64>, ApiError> {
        self.ttl_seconds
            .map(u64::try_from)
            .transpose()
            .map_err(|_| ApiError::bad_request("ttl_seconds must not be negative"))
    }
}

/// `POST /send` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    /// Always `"stored"`.
    pub status: String,
    /// Envelope id.
    pub id: String,
}

/// One delivered message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    /// Envelope id.
    pub id: String,
    /// Claimed sender.
    pub sender: String,
    /// Sealed payload, base64.
    pub ciphertext_b64: String,
    /// Unix seconds the relay accepted the envelope.
    pub created_at: f64,
    /// Unix seconds after which the envelope would have been discarded.
    pub expire_at: Option<f64>,
}

impl From<Envelope> for MessageBody {
    fn from(envelope: Envelope) -> Self {
        Self {
            id: envelope.id.to_string(),
            sender: envelope.sender,
            ciphertext_b64: BASE64.encode(&envelope.ciphertext),
            created_at: envelope.created_at.as_secs_f64(),
            expire_at: envelope.expire_at.map(|t| t.as_secs_f64()),
        }
    }
}

/// `GET /receive/:user_id` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiveResponse {
    /// Messages in send order; empty when nothing is waiting.
    pub messages: Vec<MessageBody>,
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Envelopes waiting across all mailboxes.
    pub pending: usize,
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Reason for the failure.
    pub detail: String,
}

/// Decode a base64 request field.
pub(crate) fn decode_b64(field: &str, value: &str) -> Result<Bytes, ApiError> {
    BASE64
        .decode(value)
        .map(Bytes::from)
        .map_err(|e| ApiError::bad_request(format!("{field} is not valid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use vanish_core::{EnvelopeId, Timestamp};

    use super::*;

    #[test]
    fn message_body_from_envelope() {
        let created_at = Timestamp::from_millis(1_700_000_000_500);
        let envelope = Envelope {
            id: EnvelopeId::new(created_at, 3),
            sender: "alice".to_string(),
            ciphertext: Bytes::from_static(b"hi"),
            created_at,
            expire_at: None,
        };

        let body = MessageBody::from(envelope);

        assert_eq!(body.id, "msg-1700000000500-3");
        assert_eq!(body.ciphertext_b64, "aGk=");
        assert!((body.created_at - 1_700_000_000.5).abs() < 1e-6);
        assert_eq!(body.expire_at, None);
    }

    #[test]
    fn missing_ttl_is_none() {
        let body: SendRequestBody =
            serde_json::from_str(r#"{"sender":"a","recipient":"b","ciphertext_b64":"eA=="}"#)
                .unwrap();
        assert_eq!(body.ttl_seconds, None);
        assert_eq!(body.ttl().unwrap(), None);
    }

    #[test]
    fn negative_ttl_is_refused() {
        let body: SendRequestBody = serde_json::from_str(
            r#"{"sender":"a","recipient":"b","ciphertext_b64":"eA==","ttl_seconds":-5}"#,
        )
        .unwrap();

        let err = body.ttl().unwrap_err();
        assert_eq!(err.detail(), "ttl_seconds must not be negative");
        assert_eq!(SendRequestBody { ttl_seconds: Some(0), ..body.clone() }.ttl().unwrap(), Some(0));
        assert_eq!(SendRequestBody { ttl_seconds: Some(30), ..body }.ttl().unwrap(), Some(30));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode_b64("ciphertext_b64", "not base64!").unwrap_err();
        assert!(err.detail().starts_with("ciphertext_b64 is not valid base64"));
    }
}
