use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conversation entity - a thread between an agent team and one contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub assigned_to: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(contact_id: Uuid, assigned_to: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_id,
            assigned_to,
            last_message_at: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// A single message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub direction: MessageDirection,
    pub author: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn outbound(conversation_id: Uuid, author: String, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            direction: MessageDirection::Outbound,
            author,
            body,
            sent_at: Utc::now(),
        }
    }
}
