use serde::{Deserialize, Serialize};

pub const HISTORY_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationRecordType {
    Conversation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRecordType {
    Turn,
}

/// First line of a durable history file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationHeader {
    #[serde(rename = "type")]
    pub record_type: ConversationRecordType,
    pub version: u32,
    pub conversation_id: String,
    pub created_at: String,
}

impl ConversationHeader {
    #[must_use]
    pub fn v1(conversation_id: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            record_type: ConversationRecordType::Conversation,
            version: HISTORY_VERSION,
            conversation_id: conversation_id.into(),
            created_at: created_at.into(),
        }
    }
}

/// One persisted user/response exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TurnRecord {
    #[serde(rename = "type")]
    pub record_type: TurnRecordType,
    pub seq: u64,
    pub ts: String,
    pub user: String,
    pub response: String,
}

impl TurnRecord {
    #[must_use]
    pub fn new(
        seq: u64,
        ts: impl Into<String>,
        user: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            record_type: TurnRecordType::Turn,
            seq,
            ts: ts.into(),
            user: user.into(),
            response: response.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JsonLine {
    Conversation(ConversationHeader),
    Turn(TurnRecord),
}
