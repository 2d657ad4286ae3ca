//! Wire types exchanged with the intake backend.
//!
//! Everything here is plain data: no key material and no crypto. The client
//! crate turns these shapes into ciphertext and back.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ExchangeError;

// ---------------------------------------------------------------------------
// Submission record
// ---------------------------------------------------------------------------

/// One questionnaire page as submitted by a patient.
///
/// Serialises with camelCase keys in declaration order
/// (`userId`, `pageNo`, `questions`, `date`). `questions` keeps the insertion
/// order of its fields; `date` is omitted when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    /// Opaque user identifier issued by the backend.
    pub user_id: String,
    /// Backend routing tag for the questionnaire page.
    pub page_no: u8,
    /// Field name to answer: strings, booleans, lists, or nested groups.
    pub questions: Map<String, Value>,
    /// ISO-8601 submission timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Which key-handling convention a payload is encrypted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherMode {
    /// Secret used as a passphrase; salt travels inside the ciphertext.
    Passphrase,
    /// Secret used as the AES key; IV travels next to the ciphertext.
    RawKey,
}

/// `{"data": "..."}`: self-contained passphrase-mode ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyEnvelope {
    /// Base64 of `Salted__ ‖ salt ‖ ciphertext`.
    pub data: String,
}

/// `{"iv": "...", "ciphertext": "..."}`: raw-key ciphertext with explicit IV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedEnvelope {
    /// 16-byte IV as 32 hex characters.
    pub iv: String,
    /// Base64 CBC ciphertext.
    pub ciphertext: String,
}

/// Either wire shape. Exactly one is ever present in a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Legacy(LegacyEnvelope),
    Versioned(VersionedEnvelope),
}

impl Envelope {
    /// The cipher mode this envelope must be decoded with.
    pub fn mode(&self) -> CipherMode {
        match self {
            Envelope::Legacy(_) => CipherMode::Passphrase,
            Envelope::Versioned(_) => CipherMode::RawKey,
        }
    }

    /// Parse a JSON body into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::MalformedEnvelope`] if the body is not a JSON
    /// object, or if it carries both field sets, neither, or half of the
    /// versioned pair.
    pub fn from_json(body: &[u8]) -> Result<Self, ExchangeError> {
        let raw: RawEnvelope = serde_json::from_slice(body).map_err(|e| {
            ExchangeError::MalformedEnvelope(format!("body is not an envelope object: {e}"))
        })?;
        Self::try_from(raw)
    }

    /// Same as [`Envelope::from_json`] for an already-parsed value.
    pub fn from_value(value: Value) -> Result<Self, ExchangeError> {
        let raw: RawEnvelope = serde_json::from_value(value).map_err(|e| {
            ExchangeError::MalformedEnvelope(format!("body is not an envelope object: {e}"))
        })?;
        Self::try_from(raw)
    }
}

/// Every envelope field, each optional. Only used to classify a body.
#[derive(Debug, Default, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    iv: Option<String>,
    #[serde(default)]
    ciphertext: Option<String>,
}

impl TryFrom<RawEnvelope> for Envelope {
    type Error = ExchangeError;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        match (raw.data, raw.iv, raw.ciphertext) {
            (Some(data), None, None) => Ok(Envelope::Legacy(LegacyEnvelope { data })),
            (None, Some(iv), Some(ciphertext)) => {
                Ok(Envelope::Versioned(VersionedEnvelope { iv, ciphertext }))
            }
            (Some(_), _, _) => Err(ExchangeError::MalformedEnvelope(
                "both `data` and `iv`/`ciphertext` present".into(),
            )),
            (None, None, None) => Err(ExchangeError::MalformedEnvelope(
                "neither `data` nor `iv`/`ciphertext` present".into(),
            )),
            (None, _, _) => Err(ExchangeError::MalformedEnvelope(
                "`iv` and `ciphertext` must appear together".into(),
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEnvelope::deserialize(deserializer)?;
        Envelope::try_from(raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Backend replies
// ---------------------------------------------------------------------------

/// Body of a record retrieval `GET`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalResponse {
    pub successful: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ciphertext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
}

/// The parts of a submission `POST` reply the client looks at.
///
/// Older endpoints answer with arbitrary JSON, so both fields are optional and
/// unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmitReply {
    #[serde(default)]
    pub successful: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SubmitReply {
    /// Extract the reply fields from a JSON body. Non-objects yield defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Transport`] when `successful` or `message` is
    /// present with the wrong type.
    pub fn from_value(value: &Value) -> Result<Self, ExchangeError> {
        if !value.is_object() {
            return Ok(Self::default());
        }
        Self::deserialize(value)
            .map_err(|e| ExchangeError::Transport(format!("unexpected submission reply: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_serialises_in_declaration_order() {
        let mut questions = Map::new();
        questions.insert("name".into(), json!("Jane"));
        let record = SubmissionRecord {
            user_id: "u1".into(),
            page_no: 1,
            questions,
            date: None,
        };
        let s = serde_json::to_string(&record).unwrap();
        assert_eq!(s, r#"{"userId":"u1","pageNo":1,"questions":{"name":"Jane"}}"#);
    }

    #[test]
    fn legacy_envelope_classified() {
        let env = Envelope::from_json(br#"{"data":"U2FsdGVkX1"}"#).unwrap();
        assert_eq!(env.mode(), CipherMode::Passphrase);
    }

    #[test]
    fn versioned_envelope_classified() {
        let env = Envelope::from_json(br#"{"iv":"00","ciphertext":"AA=="}"#).unwrap();
        assert_eq!(env.mode(), CipherMode::RawKey);
    }

    #[test]
    fn both_shapes_rejected() {
        let err = Envelope::from_json(br#"{"data":"x","iv":"00","ciphertext":"AA=="}"#)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::MalformedEnvelope(_)));
    }

    #[test]
    fn data_with_lone_iv_rejected() {
        let err = Envelope::from_json(br#"{"data":"x","iv":"00"}"#).unwrap_err();
        assert!(matches!(err, ExchangeError::MalformedEnvelope(_)));
    }

    #[test]
    fn neither_shape_rejected() {
        let err = Envelope::from_json(br#"{"successful":true}"#).unwrap_err();
        assert!(matches!(err, ExchangeError::MalformedEnvelope(_)));
    }

    #[test]
    fn half_versioned_rejected() {
        let err = Envelope::from_json(br#"{"ciphertext":"AA=="}"#).unwrap_err();
        assert!(matches!(err, ExchangeError::MalformedEnvelope(_)));
    }

    #[test]
    fn non_object_rejected() {
        let err = Envelope::from_json(b"[1,2,3]").unwrap_err();
        assert!(matches!(err, ExchangeError::MalformedEnvelope(_)));
    }

    #[test]
    fn envelope_serialises_without_tag() {
        let env = Envelope::Versioned(VersionedEnvelope {
            iv: "0f".into(),
            ciphertext: "AA==".into(),
        });
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"iv": "0f", "ciphertext": "AA=="})
        );
        let env = Envelope::Legacy(LegacyEnvelope { data: "abc".into() });
        assert_eq!(serde_json::to_value(&env).unwrap(), json!({"data": "abc"}));
    }

    #[test]
    fn retrieval_failure_body() {
        let r: RetrievalResponse =
            serde_json::from_str(r#"{"successful":false,"message":"nothing yet"}"#).unwrap();
        assert!(!r.successful);
        assert_eq!(r.message.as_deref(), Some("nothing yet"));
        assert!(r.ciphertext.is_none());
    }

    #[test]
    fn submit_reply_tolerates_foreign_bodies() {
        assert_eq!(
            SubmitReply::from_value(&json!({"id": 101})).unwrap(),
            SubmitReply::default()
        );
        assert_eq!(SubmitReply::from_value(&json!("ok")).unwrap(), SubmitReply::default());
        let r = SubmitReply::from_value(&json!({"successful": false, "message": "expired"}))
            .unwrap();
        assert_eq!(r.successful, Some(false));
    }

    #[test]
    fn submit_reply_with_mistyped_flag_is_an_error() {
        let err = SubmitReply::from_value(&json!({"successful": "false"})).unwrap_err();
        assert!(matches!(err, ExchangeError::Transport(_)));
        assert!(SubmitReply::from_value(&json!({"message": 42})).is_err());
    }
}
