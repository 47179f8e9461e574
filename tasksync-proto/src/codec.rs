//! JSON encode/decode helpers for push frames and API bodies.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::event::TaskEvent;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Encodes a [`TaskEvent`] as a push-channel text frame.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the event cannot be serialized.
pub fn encode_event(event: &TaskEvent) -> Result<String, CodecError> {
    encode(event)
}

/// Decodes a push-channel text frame into a [`TaskEvent`].
///
/// # Errors
///
/// Returns `CodecError::Serialization` for malformed JSON, unknown event
/// names, or payloads that do not match the event.
pub fn decode_event(frame: &str) -> Result<TaskEvent, CodecError> {
    decode(frame.as_bytes())
}

/// Encodes any serializable value as JSON text.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes a JSON body.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes are not valid JSON for `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Task, TaskId};

    #[test]
    fn event_frame_survives_encode_decode() {
        let event = TaskEvent::TaskCreated(Task::new("t1", "Buy milk"));
        let frame = encode_event(&event).unwrap();
        assert_eq!(decode_event(&frame).unwrap(), event);
    }

    #[test]
    fn decode_garbage_fails() {
        assert!(decode_event("not json").is_err());
        assert!(decode_event("").is_err());
    }

    #[test]
    fn decode_task_list_body() {
        let tasks: Vec<Task> =
            decode(br#"[{"_id":"a","title":"A"},{"_id":"b","title":"B"}]"#).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].id, TaskId::new("b"));
    }
}
