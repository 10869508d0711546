//! JSON codec for the session protocol.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use super::messages::{ClientCommand, InboundMessage};

/// Why a frame could not be decoded or a command encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no string `type` field")]
    MissingType,

    #[error("invalid `{kind}` payload: {reason}")]
    InvalidPayload { kind: String, reason: String },

    #[error("failed to encode command: {0}")]
    Encode(String),
}

/// Serializes an outbound command.
pub fn encode(command: &ClientCommand) -> Result<String, CodecError> {
    serde_json::to_string(command).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Parses one inbound text frame.
pub fn decode(text: &str) -> Result<InboundMessage, CodecError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| CodecError::InvalidJson(e.to_string()))?;
    let Value::Object(mut fields) = value else {
        return Err(CodecError::NotAnObject);
    };
    let kind = match fields.remove("type") {
        Some(Value::String(kind)) => kind,
        _ => return Err(CodecError::MissingType),
    };

    let message = match kind.as_str() {
        "session_update" => InboundMessage::SessionUpdate(required(&kind, &mut fields, "session")?),
        "session_info" => InboundMessage::SessionInfo(required(&kind, &mut fields, "session")?),
        "session_ended" => InboundMessage::SessionEnded(whole(&kind, fields)?),
        "select_number_result" => {
            let accepted = !rejects(&fields);
            InboundMessage::SelectNumberResult {
                accepted,
                details: Value::Object(fields),
            }
        }
        "game_session_manager_result" => {
            InboundMessage::GameSessionManagerResult(optional(&kind, &mut fields, "result")?)
        }
        "end_session_and_create_new_result" => {
            InboundMessage::EndSessionAndCreateNewResult(optional(&kind, &mut fields, "result")?)
        }
        "update_user_stats_result" => InboundMessage::UpdateUserStatsResult(Value::Object(fields)),
        "error" => InboundMessage::Error {
            message: error_message(fields),
        },
        _ => InboundMessage::Unrecognized {
            kind,
            payload: Value::Object(fields),
        },
    };
    Ok(message)
}

fn required<T: DeserializeOwned>(
    kind: &str,
    fields: &mut Map<String, Value>,
    name: &str,
) -> Result<T, CodecError> {
    let value = fields.remove(name).ok_or_else(|| CodecError::InvalidPayload {
        kind: kind.to_string(),
        reason: format!("missing field `{}`", name),
    })?;
    serde_json::from_value(value).map_err(|e| invalid(kind, e))
}

fn optional<T: DeserializeOwned + Default>(
    kind: &str,
    fields: &mut Map<String, Value>,
    name: &str,
) -> Result<T, CodecError> {
    match fields.remove(name) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| invalid(kind, e)),
    }
}

fn whole<T: DeserializeOwned>(kind: &str, fields: Map<String, Value>) -> Result<T, CodecError> {
    serde_json::from_value(Value::Object(fields)).map_err(|e| invalid(kind, e))
}

fn invalid(kind: &str, err: serde_json::Error) -> CodecError {
    CodecError::InvalidPayload {
        kind: kind.to_string(),
        reason: err.to_string(),
    }
}

// A pick result counts as rejected only when the server says so explicitly.
fn rejects(fields: &Map<String, Value>) -> bool {
    matches!(fields.get("success"), Some(Value::Bool(false)))
        || fields.get("error").is_some_and(|e| !e.is_null())
}

fn error_message(fields: Map<String, Value>) -> String {
    match fields.get("message") {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => Value::Object(fields).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(value: Value) -> String {
        value.to_string()
    }

    #[test]
    fn decodes_session_update() {
        let message = decode(&frame(json!({
            "type": "session_update",
            "session": {"session_id": "r1", "is_active": true, "time_remaining": 12}
        })))
        .unwrap();

        match message {
            InboundMessage::SessionUpdate(snapshot) => {
                assert_eq!(snapshot.round_id.as_str(), "r1");
                assert_eq!(snapshot.time_remaining, 12);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn decodes_session_info() {
        let message = decode(&frame(json!({
            "type": "session_info",
            "session": {"session_id": 4}
        })))
        .unwrap();
        assert_eq!(message.kind(), "session_info");
    }

    #[test]
    fn decodes_session_ended() {
        let message = decode(&frame(json!({
            "type": "session_ended",
            "winning_number": 7,
            "winners": ["alice"],
            "participations": [{"username": "alice", "selected_number": 7}]
        })))
        .unwrap();

        match message {
            InboundMessage::SessionEnded(closed) => {
                assert_eq!(closed.winning_number, 7);
                assert_eq!(closed.winners, vec!["alice"]);
                assert_eq!(closed.participations.len(), 1);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn decodes_manager_result_with_missing_result_as_empty() {
        let message = decode(r#"{"type":"game_session_manager_result"}"#).unwrap();
        assert_eq!(
            message,
            InboundMessage::GameSessionManagerResult(Default::default())
        );
    }

    #[test]
    fn decodes_rollover_ack() {
        let message = decode(&frame(json!({
            "type": "end_session_and_create_new_result",
            "result": {"new_session_id": "r2", "new_session_start_time": "2025-05-01T10:00:00Z"}
        })))
        .unwrap();

        match message {
            InboundMessage::EndSessionAndCreateNewResult(ack) => {
                assert_eq!(ack.new_session_id.unwrap().as_str(), "r2");
                assert!(ack.new_session_start_time.is_some());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn select_number_result_is_accepted_unless_rejected() {
        let ok = decode(r#"{"type":"select_number_result","details":{"number":7}}"#).unwrap();
        assert!(matches!(
            ok,
            InboundMessage::SelectNumberResult { accepted: true, .. }
        ));

        let refused = decode(r#"{"type":"select_number_result","success":false}"#).unwrap();
        assert!(matches!(
            refused,
            InboundMessage::SelectNumberResult { accepted: false, .. }
        ));

        let errored =
            decode(r#"{"type":"select_number_result","error":"round closed"}"#).unwrap();
        assert!(matches!(
            errored,
            InboundMessage::SelectNumberResult { accepted: false, .. }
        ));
    }

    #[test]
    fn decodes_error_message() {
        let message = decode(r#"{"type":"error","message":"Session not active"}"#).unwrap();
        assert_eq!(
            message,
            InboundMessage::Error {
                message: "Session not active".into()
            }
        );
    }

    #[test]
    fn error_without_message_keeps_payload_text() {
        let message = decode(r#"{"type":"error","code":42}"#).unwrap();
        match message {
            InboundMessage::Error { message } => assert!(message.contains("42")),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn unknown_tag_passes_through() {
        let message = decode(r#"{"type":"chat","text":"hi"}"#).unwrap();
        assert_eq!(
            message,
            InboundMessage::Unrecognized {
                kind: "chat".into(),
                payload: json!({"text": "hi"}),
            }
        );
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(matches!(decode("{not json"), Err(CodecError::InvalidJson(_))));
    }

    #[test]
    fn rejects_non_object() {
        assert_eq!(decode("[1,2]"), Err(CodecError::NotAnObject));
    }

    #[test]
    fn rejects_missing_or_non_string_type() {
        assert_eq!(decode(r#"{"session":{}}"#), Err(CodecError::MissingType));
        assert_eq!(decode(r#"{"type":5}"#), Err(CodecError::MissingType));
    }

    #[test]
    fn rejects_known_tag_with_bad_payload() {
        let err = decode(r#"{"type":"session_update"}"#).unwrap_err();
        assert!(matches!(err, CodecError::InvalidPayload { ref kind, .. } if kind == "session_update"));

        let err = decode(r#"{"type":"session_ended","winners":[]}"#).unwrap_err();
        assert!(matches!(err, CodecError::InvalidPayload { .. }));
    }

    #[test]
    fn encode_produces_tagged_json() {
        let text = encode(&ClientCommand::select_number(3)).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "select_number");
        assert_eq!(value["number"], 3);
    }
}
