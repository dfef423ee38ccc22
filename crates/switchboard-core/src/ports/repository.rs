use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Contact, Conversation, Message};
use crate::error::RepoError;

/// Contact storage.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Contact>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contact>, RepoError>;

    /// Save a contact (create or update).
    async fn save(&self, contact: Contact) -> Result<Contact, RepoError>;
}

/// Conversation and message storage.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Conversation>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Conversation>, RepoError>;

    async fn save(&self, conversation: Conversation) -> Result<Conversation, RepoError>;

    /// Messages of a conversation, oldest first.
    async fn messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, RepoError>;

    /// Append a message and bump the conversation's `last_message_at`.
    async fn append_message(&self, message: Message) -> Result<Message, RepoError>;
}
