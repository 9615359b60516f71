use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::server_utils::normalize_seconds;
use crate::types::ArenaState;

pub const UPDATE_STATE: &str = "UPDATE_STATE";

/// Intents accepted on the real-time channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaCommand {
    StartMatch { duration: Option<u32> },
    PauseMain,
    ResetMain { seconds: Option<u32> },
    StartRecovery { seconds: Option<u32> },
    StopRecovery,
    EndMatch { match_id: Option<String> },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("message is not an object")]
    NotAnObject,
    #[error("missing message type")]
    MissingType,
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("invalid field `{0}`")]
    InvalidField(&'static str),
}

pub fn parse_command(raw: &str) -> Result<ArenaCommand, CommandError> {
    let value: Value = serde_json::from_str(raw)?;
    let object = value.as_object().ok_or(CommandError::NotAnObject)?;
    let message_type = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(CommandError::MissingType)?;
    let payload = match object.get("payload") {
        None | Some(Value::Null) => None,
        Some(Value::Object(payload)) => Some(payload),
        Some(_) => return Err(CommandError::InvalidField("payload")),
    };

    match message_type {
        "START_MATCH" => Ok(ArenaCommand::StartMatch {
            duration: parse_optional_seconds(payload, "duration")?,
        }),
        "PAUSE_MAIN" => Ok(ArenaCommand::PauseMain),
        "RESET_MAIN" => Ok(ArenaCommand::ResetMain {
            seconds: parse_optional_seconds(payload, "seconds")?,
        }),
        "START_RECOVERY" => Ok(ArenaCommand::StartRecovery {
            seconds: parse_optional_seconds(payload, "seconds")?,
        }),
        "STOP_RECOVERY" => Ok(ArenaCommand::StopRecovery),
        "END_MATCH" => {
            let match_id = match payload.and_then(|payload| payload.get("matchId")) {
                None | Some(Value::Null) => None,
                Some(Value::String(id)) => Some(id.clone()),
                Some(_) => return Err(CommandError::InvalidField("matchId")),
            };
            Ok(ArenaCommand::EndMatch { match_id })
        }
        other => Err(CommandError::UnknownType(other.to_string())),
    }
}

fn parse_optional_seconds(
    payload: Option<&Map<String, Value>>,
    field: &'static str,
) -> Result<Option<u32>, CommandError> {
    let Some(value) = payload.and_then(|payload| payload.get(field)) else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    if let Some(number) = value.as_i64() {
        return Ok(Some(normalize_seconds(number)));
    }
    if value.as_u64().is_some() {
        return Ok(Some(normalize_seconds(i64::MAX)));
    }
    if let Some(number) = value.as_f64() {
        if number.is_finite() {
            let floored = number.floor().clamp(i64::MIN as f64, i64::MAX as f64);
            return Ok(Some(normalize_seconds(floored as i64)));
        }
    }
    Err(CommandError::InvalidField(field))
}

#[derive(Serialize)]
struct UpdateStateMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    payload: UpdateStatePayload<'a>,
}

#[derive(Serialize)]
struct UpdateStatePayload<'a> {
    state: &'a ArenaState,
}

pub fn encode_update_state(state: &ArenaState) -> Result<String, serde_json::Error> {
    serde_json::to_string(&UpdateStateMessage {
        kind: UPDATE_STATE,
        payload: UpdateStatePayload { state },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_TIMER_SECONDS;

    #[test]
    fn parse_start_match_with_and_without_duration() {
        assert_eq!(
            parse_command(r#"{"type":"START_MATCH","payload":{"duration":90}}"#).ok(),
            Some(ArenaCommand::StartMatch { duration: Some(90) })
        );
        assert_eq!(
            parse_command(r#"{"type":"START_MATCH"}"#).ok(),
            Some(ArenaCommand::StartMatch { duration: None })
        );
        assert_eq!(
            parse_command(r#"{"type":"START_MATCH","payload":{}}"#).ok(),
            Some(ArenaCommand::StartMatch { duration: None })
        );
    }

    #[test]
    fn parse_timer_commands() {
        assert_eq!(
            parse_command(r#"{"type":"PAUSE_MAIN"}"#).ok(),
            Some(ArenaCommand::PauseMain)
        );
        assert_eq!(
            parse_command(r#"{"type":"RESET_MAIN","payload":{"seconds":120}}"#).ok(),
            Some(ArenaCommand::ResetMain { seconds: Some(120) })
        );
        assert_eq!(
            parse_command(r#"{"type":"START_RECOVERY","payload":{"seconds":12.9}}"#).ok(),
            Some(ArenaCommand::StartRecovery { seconds: Some(12) })
        );
        assert_eq!(
            parse_command(r#"{"type":"STOP_RECOVERY","payload":null}"#).ok(),
            Some(ArenaCommand::StopRecovery)
        );
    }

    #[test]
    fn parse_end_match_keeps_optional_match_id() {
        assert_eq!(
            parse_command(r#"{"type":"END_MATCH","payload":{"matchId":"match_4"}}"#).ok(),
            Some(ArenaCommand::EndMatch {
                match_id: Some("match_4".to_string())
            })
        );
        assert_eq!(
            parse_command(r#"{"type":"END_MATCH"}"#).ok(),
            Some(ArenaCommand::EndMatch { match_id: None })
        );
        assert!(matches!(
            parse_command(r#"{"type":"END_MATCH","payload":{"matchId":4}}"#),
            Err(CommandError::InvalidField("matchId"))
        ));
    }

    #[test]
    fn seconds_are_clamped() {
        assert_eq!(
            parse_command(r#"{"type":"RESET_MAIN","payload":{"seconds":-5}}"#).ok(),
            Some(ArenaCommand::ResetMain { seconds: Some(0) })
        );
        assert_eq!(
            parse_command(r#"{"type":"RESET_MAIN","payload":{"seconds":99999999999}}"#).ok(),
            Some(ArenaCommand::ResetMain {
                seconds: Some(MAX_TIMER_SECONDS)
            })
        );
    }

    #[test]
    fn malformed_messages_are_rejected() {
        assert!(matches!(parse_command("not json"), Err(CommandError::InvalidJson(_))));
        assert!(matches!(parse_command("[1,2]"), Err(CommandError::NotAnObject)));
        assert!(matches!(parse_command(r#"{"payload":{}}"#), Err(CommandError::MissingType)));
        assert!(matches!(
            parse_command(r#"{"type":"FLY"}"#),
            Err(CommandError::UnknownType(kind)) if kind == "FLY"
        ));
        assert!(matches!(
            parse_command(r#"{"type":"START_MATCH","payload":{"duration":"long"}}"#),
            Err(CommandError::InvalidField("duration"))
        ));
        assert!(matches!(
            parse_command(r#"{"type":"START_MATCH","payload":5}"#),
            Err(CommandError::InvalidField("payload"))
        ));
    }

    #[test]
    fn update_state_envelope_shape() {
        let state = ArenaState::new(180);
        let encoded = encode_update_state(&state).expect("encode");
        let value: Value = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(value["type"], "UPDATE_STATE");
        assert_eq!(value["payload"]["state"]["mainTimer"], 180);
        assert_eq!(value["payload"]["state"]["mainStatus"], "idle");
    }
}
