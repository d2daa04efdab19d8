use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::validate_not_blank,
    state::presence::PresenceMeta,
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from presence WebSocket clients.
#[serde(tag = "type")]
pub enum PresenceInboundMessage {
    /// Start (or refresh) tracking this connection.
    #[serde(rename = "track")]
    Track(TrackPayload),
    /// Stop tracking without closing the socket.
    #[serde(rename = "untrack")]
    Untrack,
    #[serde(other)]
    Unknown,
}

/// Presence metadata announced by a client.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct TrackPayload {
    pub user_id: Uuid,
    #[validate(custom(function = "validate_not_blank"), length(max = 40))]
    pub username: String,
    #[serde(default)]
    #[validate(url)]
    pub avatar_url: Option<String>,
}

impl From<TrackPayload> for PresenceMeta {
    fn from(value: TrackPayload) -> Self {
        Self {
            user_id: value.user_id,
            username: value.username,
            avatar_url: value.avatar_url,
        }
    }
}

/// Error raised when an inbound frame cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl PresenceInboundMessage {
    /// Parse a text frame and validate any track payload.
    pub fn from_json_str(text: &str) -> Result<Self, InboundError> {
        let message: Self = serde_json::from_str(text)?;
        if let Self::Track(payload) = &message {
            payload.validate()?;
        }
        Ok(message)
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Messages pushed to presence sockets.
#[serde(tag = "type")]
pub enum PresenceOutboundMessage {
    /// Full online list for the session.
    #[serde(rename = "presence.sync")]
    Sync { online: Vec<PresenceMeta> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_message_parses_and_validates() {
        let user_id = Uuid::new_v4();
        let message = PresenceInboundMessage::from_json_str(&format!(
            r#"{{ "type": "track", "user_id": "{user_id}", "username": "ada" }}"#
        ))
        .unwrap();
        match message {
            PresenceInboundMessage::Track(payload) => {
                assert_eq!(payload.user_id, user_id);
                assert!(payload.avatar_url.is_none());
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn blank_username_is_rejected() {
        let err = PresenceInboundMessage::from_json_str(&format!(
            r#"{{ "type": "track", "user_id": "{}", "username": "  " }}"#,
            Uuid::new_v4()
        ))
        .unwrap_err();
        assert!(matches!(err, InboundError::Invalid(_)));
    }

    #[test]
    fn unknown_types_are_tolerated() {
        let message = PresenceInboundMessage::from_json_str(r#"{ "type": "wave" }"#).unwrap();
        assert!(matches!(message, PresenceInboundMessage::Unknown));
    }

    #[test]
    fn sync_message_is_tagged() {
        let json = serde_json::to_value(PresenceOutboundMessage::Sync { online: vec![] }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "presence.sync", "online": [] }));
    }
}
