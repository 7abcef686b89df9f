use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// The record published for every unit of load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message_id: String,
    pub room_id: String,
    pub user_id: String,
    pub username: String,
    pub message: String,
    pub timestamp: String,
    pub message_type: String,
}

/// Builds the messages of one worker. Ids are `msg_<destination>_<worker>_<seq>`, so they are
/// unique across a run without any coordination between workers.
#[derive(Debug, Clone)]
pub struct MessageFactory {
    destination_id: u64,
    worker_id: u64,
    user_pool: u64,
    message_type: String,
}

impl MessageFactory {
    pub fn new(
        destination_id: u64,
        worker_id: u64,
        user_pool: u64,
        message_type: impl Into<String>,
    ) -> Self {
        Self {
            destination_id,
            worker_id,
            user_pool: user_pool.max(1),
            message_type: message_type.into(),
        }
    }

    pub fn build(&self, seq: u64) -> ChatMessage {
        self.build_at(seq, Utc::now())
    }

    pub fn build_at(&self, seq: u64, now: DateTime<Utc>) -> ChatMessage {
        let user = seq % self.user_pool;
        ChatMessage {
            message_id: message_id(self.destination_id, self.worker_id, seq),
            room_id: self.destination_id.to_string(),
            user_id: format!("user_{user}"),
            username: format!("TestUser{user}"),
            message: format!("Load test message {seq}"),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            message_type: self.message_type.clone(),
        }
    }
}

pub fn message_id(destination_id: u64, worker_id: u64, seq: u64) -> String {
    format!("msg_{destination_id}_{worker_id}_{seq}")
}
