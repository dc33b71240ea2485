use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::progress::ProgressEvent;

pub const WELCOME_MESSAGE: &str = "Connected to the JobMatch progress stream.";

/// Commands accepted from observers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientCommand {
    Subscribe {
        #[serde(rename = "requestId", alias = "progressId")]
        request_id: String,
    },
    Unsubscribe {
        #[serde(rename = "requestId", alias = "progressId")]
        request_id: String,
    },
    SubscribeAll,
    Ping,
}

/// Messages sent to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        message: String,
    },
    Subscribed {
        #[serde(rename = "requestId")]
        request_id: String,
    },
    Unsubscribed {
        #[serde(rename = "requestId")]
        request_id: String,
    },
    SubscribedAll,
    Pong {
        timestamp: String,
    },
    Error {
        message: String,
    },
    Progress(ProgressEvent),
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        // Every variant is plain strings and JSON values, so this cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| String::from(r#"{"type":"error"}"#))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid JSON payload")]
    InvalidJson,

    #[error("Unrecognized message type")]
    UnknownType,

    #[error("requestId must be a non-empty string")]
    EmptyRequestId,
}

impl ProtocolError {
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Error {
            message: self.to_string(),
        }
    }
}

/// Parses one inbound frame. Request ids are trimmed.
pub fn parse_command(raw: &str) -> Result<ClientCommand, ProtocolError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| ProtocolError::InvalidJson)?;
    let command: ClientCommand =
        serde_json::from_value(value).map_err(|_| ProtocolError::UnknownType)?;

    match command {
        ClientCommand::Subscribe { request_id } => Ok(ClientCommand::Subscribe {
            request_id: non_empty(request_id)?,
        }),
        ClientCommand::Unsubscribe { request_id } => Ok(ClientCommand::Unsubscribe {
            request_id: non_empty(request_id)?,
        }),
        other => Ok(other),
    }
}

fn non_empty(request_id: String) -> Result<String, ProtocolError> {
    let trimmed = request_id.trim();
    if trimmed.is_empty() {
        Err(ProtocolError::EmptyRequestId)
    } else {
        Ok(trimmed.to_string())
    }
}
