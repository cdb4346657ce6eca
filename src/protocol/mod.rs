//! Boundary events exchanged with peers over the WebSocket transport.
//!
//! Every frame is a JSON object tagged by `type` (snake_case) with camelCase
//! fields. Inbound frames parse into [`ClientEvent`], outbound frames are
//! serialized from [`ServerEvent`].
//!
//! ```json
//! {"type": "register", "platform": "claude", "userId": "u-1"}
//! {"type": "user_message", "content": "hello", "userId": "u-1"}
//! {"type": "agent_response", "roundId": "…", "content": "hi there"}
//! {"type": "status_request"}
//! ```

use crate::deliberation::{AgentResponse, MessageId, QueryMessage, RoundId, Synthesis};
use crate::peers::{PeerId, PeerSummary};
use crate::types::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events peers send to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    Register {
        platform: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    UserMessage {
        content: String,
        user_id: String,
        #[serde(default)]
        conversation_id: Option<String>,
    },
    #[serde(alias = "ai_response")]
    AgentResponse {
        #[serde(alias = "deliberationId")]
        round_id: RoundId,
        /// Defaults to the platform the sending peer registered with
        #[serde(default)]
        platform: Option<String>,
        content: String,
    },
    StatusRequest,
}

impl ClientEvent {
    /// Parse and validate one inbound frame.
    pub fn parse(text: &str) -> Result<Self> {
        let event: ClientEvent =
            serde_json::from_str(text).map_err(|e| AppError::MalformedEvent(e.to_string()))?;
        event.validate()?;
        Ok(event)
    }

    fn validate(&self) -> Result<()> {
        let missing = match self {
            ClientEvent::Register { platform, .. } if platform.trim().is_empty() => {
                Some("platform")
            }
            ClientEvent::UserMessage { content, .. } if content.trim().is_empty() => {
                Some("content")
            }
            ClientEvent::UserMessage { user_id, .. } if user_id.trim().is_empty() => {
                Some("userId")
            }
            ClientEvent::AgentResponse { content, .. } if content.trim().is_empty() => {
                Some("content")
            }
            _ => None,
        };

        match missing {
            Some(field) => Err(AppError::MalformedEvent(format!(
                "field `{}` must not be empty",
                field
            ))),
            None => Ok(()),
        }
    }
}

/// Events the server delivers to peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Welcome {
        message: String,
        timestamp: DateTime<Utc>,
    },
    Registered {
        peer_id: PeerId,
        platform: String,
        connected_peers: Vec<PeerSummary>,
    },
    MessageReceived {
        message_id: MessageId,
        round_id: RoundId,
        required_responses: usize,
        recipients: usize,
        status: String,
    },
    CollectiveQuery {
        round_id: RoundId,
        query: QueryMessage,
        required_responses: usize,
    },
    ResponseRecorded {
        round_id: RoundId,
        counted: bool,
        count: usize,
        required: usize,
    },
    CollectiveResponse {
        round_id: RoundId,
        synthesis: Synthesis,
        responses: Vec<AgentResponse>,
    },
    StatusUpdate {
        connected_peers: Vec<PeerSummary>,
        total_connections: usize,
        timestamp: DateTime<Utc>,
    },
    Status {
        connected_peers: Vec<PeerSummary>,
        total_connections: usize,
        total_messages: usize,
        active_rounds: usize,
        timestamp: DateTime<Utc>,
    },
    Error {
        error: String,
        code: String,
    },
}

impl ServerEvent {
    pub fn welcome() -> Self {
        ServerEvent::Welcome {
            message: "Connected to the Convergence sync server".to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(err: &AppError) -> Self {
        ServerEvent::Error {
            error: err.to_string(),
            code: err.code().to_string(),
        }
    }

    /// The `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Welcome { .. } => "welcome",
            ServerEvent::Registered { .. } => "registered",
            ServerEvent::MessageReceived { .. } => "message_received",
            ServerEvent::CollectiveQuery { .. } => "collective_query",
            ServerEvent::ResponseRecorded { .. } => "response_recorded",
            ServerEvent::CollectiveResponse { .. } => "collective_response",
            ServerEvent::StatusUpdate { .. } => "status_update",
            ServerEvent::Status { .. } => "status",
            ServerEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_register() {
        let event = ClientEvent::parse(r#"{"type":"register","platform":"claude","userId":"u1"}"#)
            .unwrap();
        assert_eq!(
            event,
            ClientEvent::Register {
                platform: "claude".into(),
                user_id: Some("u1".into())
            }
        );
    }

    #[test]
    fn test_parse_legacy_ai_response() {
        let round_id = RoundId::new();
        let text = format!(
            r#"{{"type":"ai_response","deliberationId":"{}","platform":"manus","content":"hi"}}"#,
            round_id
        );

        match ClientEvent::parse(&text).unwrap() {
            ClientEvent::AgentResponse {
                round_id: parsed,
                platform,
                content,
            } => {
                assert_eq!(parsed, round_id);
                assert_eq!(platform.as_deref(), Some("manus"));
                assert_eq!(content, "hi");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_parse_status_request() {
        assert_eq!(
            ClientEvent::parse(r#"{"type":"status_request"}"#).unwrap(),
            ClientEvent::StatusRequest
        );
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let err = ClientEvent::parse(r#"{"type":"user_message","userId":"u1"}"#).unwrap_err();
        assert!(matches!(err, AppError::MalformedEvent(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_type_and_garbage() {
        assert!(matches!(
            ClientEvent::parse(r#"{"type":"teleport"}"#),
            Err(AppError::MalformedEvent(_))
        ));
        assert!(matches!(
            ClientEvent::parse("not json"),
            Err(AppError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_parse_rejects_empty_content() {
        let err = ClientEvent::parse(r#"{"type":"user_message","content":"  ","userId":"u1"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("content"));
    }

    #[test]
    fn test_server_event_wire_shape() {
        let event = ServerEvent::ResponseRecorded {
            round_id: RoundId::new(),
            counted: true,
            count: 2,
            required: 3,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "response_recorded");
        assert_eq!(json["count"], 2);
        assert!(json["roundId"].is_string());
        assert_eq!(event.kind(), "response_recorded");
    }

    #[test]
    fn test_error_event_carries_code() {
        let event = ServerEvent::error(&AppError::RoundNotFound(RoundId::new()));
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "round_not_found");
    }
}
