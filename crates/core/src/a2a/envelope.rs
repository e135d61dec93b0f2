//! # Envelope Codec
//!
//! The message wrapper every service speaks.
//!
//! ```text
//! {
//!   "role": "user",
//!   "messageId": "5f0c…",
//!   "parts": [ {"root": {"text": "…"}}, {"root": {"data": {…}}} ],
//!   "attachment": {"stage": "task_breakdown", "data": {…}},   (optional)
//!   "timestamp": "2026-01-01T00:00:00Z",
//!   …unknown keys are kept as-is
//! }
//! ```
//!
//! Decoding also accepts the older shapes still produced by some peers:
//! a bare string as a part, `{"root": "text"}`, flat `{"text": …}` parts,
//! and a missing `messageId`.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::skills::StageKind;

/// Who produced the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Originator of a request.
    User,
    /// A service answering a request.
    Assistant,
    System,
}

impl Role {
    fn parse(raw: &str) -> Option<Role> {
        match raw {
            "user" => Some(Role::User),
            "assistant" | "agent" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

/// One content part.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Data(Map<String, Value>),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(t) => Some(t),
            Part::Data(_) => None,
        }
    }

    fn to_wire(&self) -> Value {
        let root = match self {
            Part::Text(text) => serde_json::json!({ "text": text }),
            Part::Data(data) => serde_json::json!({ "data": data }),
        };
        serde_json::json!({ "root": root })
    }

    fn from_wire(index: usize, raw: Value) -> Result<Part, String> {
        match raw {
            Value::String(text) => Ok(Part::Text(text)),
            Value::Object(mut obj) => match obj.remove("root") {
                Some(Value::String(text)) => Ok(Part::Text(text)),
                Some(Value::Object(root)) => Self::from_root(index, root),
                Some(_) => Err(format!("part {} has an untypeable root", index)),
                None => Self::from_root(index, obj),
            },
            _ => Err(format!("part {} is neither text nor data", index)),
        }
    }

    fn from_root(index: usize, mut root: Map<String, Value>) -> Result<Part, String> {
        if let Some(text) = root.remove("text") {
            return match text {
                Value::String(t) => Ok(Part::Text(t)),
                _ => Err(format!("part {} text is not a string", index)),
            };
        }
        match root.remove("data") {
            Some(Value::Object(data)) => Ok(Part::Data(data)),
            Some(_) => Err(format!("part {} data is not an object", index)),
            None => Err(format!("part {} has neither text nor data", index)),
        }
    }
}

/// Stage-specific structured payload riding along with a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub stage: StageKind,
    pub data: Value,
}

impl Attachment {
    pub fn new<T: Serialize>(stage: StageKind, data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            stage,
            data: serde_json::to_value(data)?,
        })
    }

    /// Deserialize the payload into the type the stage expects.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

/// Canonical message wrapper.
///
/// Immutable once built; a reply is a new envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message_id: String,
    pub role: Role,
    /// Never empty.
    pub parts: Vec<Part>,
    pub attachment: Option<Attachment>,
    pub timestamp: String,
    /// Unknown top-level keys, preserved opaquely.
    pub extra: BTreeMap<String, Value>,
}

impl Envelope {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            role,
            parts,
            attachment: None,
            timestamp: now_timestamp(),
            extra: BTreeMap::new(),
        }
    }

    /// A request carrying a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// A service reply carrying a single text part.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![Part::text(text)])
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// All text parts joined with newlines.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Serialize to canonical bytes.
    pub fn encode(&self) -> Vec<u8> {
        // Serializing a `Value` built from owned maps cannot fail.
        serde_json::to_vec(&self.to_value()).unwrap_or_default()
    }

    /// Parse bytes, normalizing legacy shapes.
    pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| DecodeError::MalformedEnvelope(format!("invalid JSON: {}", e)))?;
        Envelope::from_value(value)
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("role".into(), serde_json::json!(self.role));
        obj.insert("messageId".into(), Value::String(self.message_id.clone()));
        obj.insert(
            "parts".into(),
            Value::Array(self.parts.iter().map(Part::to_wire).collect()),
        );
        if let Some(attachment) = &self.attachment {
            obj.insert(
                "attachment".into(),
                serde_json::json!({ "stage": attachment.stage, "data": attachment.data }),
            );
        }
        obj.insert("timestamp".into(), Value::String(self.timestamp.clone()));
        for (key, value) in &self.extra {
            obj.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(obj)
    }

    pub fn from_value(value: Value) -> Result<Envelope, DecodeError> {
        let malformed = DecodeError::MalformedEnvelope;
        let Value::Object(mut obj) = value else {
            return Err(malformed("envelope is not a JSON object".into()));
        };

        let role = match obj.remove("role") {
            Some(Value::String(raw)) => Role::parse(&raw)
                .ok_or_else(|| malformed(format!("unrecognized role '{}'", raw)))?,
            Some(_) => return Err(malformed("role is not a string".into())),
            None => return Err(malformed("missing role".into())),
        };

        let raw_parts = match obj.remove("parts") {
            Some(Value::Array(parts)) => parts,
            Some(_) => return Err(malformed("parts is not an array".into())),
            None => return Err(malformed("missing parts".into())),
        };
        if raw_parts.is_empty() {
            return Err(malformed("payload has no parts".into()));
        }
        let parts = raw_parts
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Part::from_wire(i, raw))
            .collect::<Result<Vec<_>, _>>()
            .map_err(malformed)?;

        let message_id = match obj.remove("messageId").or_else(|| obj.remove("message_id")) {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(Value::String(_)) | None | Some(Value::Null) => uuid::Uuid::new_v4().to_string(),
            Some(_) => return Err(malformed("messageId is not a string".into())),
        };

        let attachment = match obj.remove("attachment") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(
                serde_json::from_value::<Attachment>(raw)
                    .map_err(|e| malformed(format!("attachment: {}", e)))?,
            ),
        };

        let timestamp = match obj.remove("timestamp") {
            Some(Value::String(ts)) => ts,
            None | Some(Value::Null) => now_timestamp(),
            Some(_) => return Err(malformed("timestamp is not a string".into())),
        };

        Ok(Envelope {
            message_id,
            role,
            parts,
            attachment,
            timestamp,
            extra: obj.into_iter().collect(),
        })
    }
}

impl Serialize for Envelope {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Envelope::from_value(value).map_err(serde::de::Error::custom)
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut data = Map::new();
        data.insert("weeks".into(), json!(8));
        let envelope = Envelope::user_text("Plan a blog")
            .with_part(Part::Data(data))
            .with_attachment(
                Attachment::new(StageKind::MilestonePlanning, &json!({"k": "v"})).unwrap(),
            );

        let bytes = envelope.encode();
        let decoded = Envelope::decode(&bytes).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.encode(), bytes);
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let raw = json!({
            "role": "assistant",
            "messageId": "m-1",
            "parts": [{"root": {"text": "hi"}}],
            "timestamp": "2024-05-01T10:00:00",
            "contextId": "ctx-9",
            "metadata": {"trace": [1, 2]}
        });
        let envelope = Envelope::from_value(raw).unwrap();
        assert_eq!(envelope.extra["contextId"], json!("ctx-9"));

        let again = Envelope::decode(&envelope.encode()).unwrap();
        assert_eq!(again.extra["metadata"], json!({"trace": [1, 2]}));
        assert_eq!(again.timestamp, "2024-05-01T10:00:00");
    }

    #[test]
    fn test_legacy_shapes_are_normalized() {
        let raw = json!({
            "role": "user",
            "parts": ["plain", {"root": "rooted"}, {"kind": "text", "text": "flat"}]
        });
        let envelope = Envelope::from_value(raw).unwrap();
        assert_eq!(envelope.text(), "plain\nrooted\nflat");
        assert!(!envelope.message_id.is_empty());
    }

    #[test]
    fn test_rejects_unknown_role() {
        let err = Envelope::decode(br#"{"role":"robot","parts":["x"]}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEnvelope(m) if m.contains("robot")));
    }

    #[test]
    fn test_rejects_empty_payload() {
        let err = Envelope::decode(br#"{"role":"user","parts":[]}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_rejects_untypeable_part() {
        let err =
            Envelope::decode(br#"{"role":"user","parts":[{"root":{"data":[1,2]}}]}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEnvelope(m) if m.contains("part 0")));

        let err = Envelope::decode(br#"{"role":"user","parts":[42]}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(Envelope::decode(b"not json").is_err());
        assert!(Envelope::decode(b"[1,2,3]").is_err());
    }

    fn arb_part() -> impl Strategy<Value = Part> {
        prop_oneof![
            ".{0,40}".prop_map(Part::Text),
            prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..4).prop_map(|m| {
                Part::Data(m.into_iter().map(|(k, v)| (k, json!(v))).collect())
            }),
        ]
    }

    fn arb_envelope() -> impl Strategy<Value = Envelope> {
        (
            "[a-f0-9-]{1,36}",
            prop_oneof![Just(Role::User), Just(Role::Assistant), Just(Role::System)],
            prop::collection::vec(arb_part(), 1..5),
            prop::collection::btree_map("x-[a-z]{1,6}", ".{0,12}", 0..3),
        )
            .prop_map(|(id, role, parts, extra)| Envelope {
                message_id: id,
                role,
                parts,
                attachment: None,
                timestamp: "2026-01-01T00:00:00.000Z".to_string(),
                extra: extra.into_iter().map(|(k, v)| (k, json!(v))).collect(),
            })
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(envelope in arb_envelope()) {
            let bytes = envelope.encode();
            let decoded = Envelope::decode(&bytes).unwrap();
            prop_assert_eq!(&decoded, &envelope);
            prop_assert_eq!(decoded.encode(), bytes);
        }
    }
}
