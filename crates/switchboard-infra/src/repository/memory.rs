//! In-memory repositories for running without the document store.
//!
//! Note: Data is lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use switchboard_core::domain::{Contact, Conversation, Message};
use switchboard_core::error::RepoError;
use switchboard_core::ports::{ContactRepository, ConversationRepository};

#[derive(Default)]
pub struct InMemoryContactRepository {
    contacts: RwLock<HashMap<Uuid, Contact>>,
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn list(&self) -> Result<Vec<Contact>, RepoError> {
        let contacts = self.contacts.read().await;
        let mut all: Vec<Contact> = contacts.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Contact>, RepoError> {
        Ok(self.contacts.read().await.get(&id).cloned())
    }

    async fn save(&self, contact: Contact) -> Result<Contact, RepoError> {
        let mut contacts = self.contacts.write().await;

        let duplicate = contacts
            .values()
            .any(|c| c.id != contact.id && c.phone == contact.phone);
        if duplicate {
            return Err(RepoError::Constraint(format!(
                "phone {} already belongs to another contact",
                contact.phone
            )));
        }

        contacts.insert(contact.id, contact.clone());
        Ok(contact)
    }
}

#[derive(Default)]
struct ConversationStore {
    conversations: HashMap<Uuid, Conversation>,
    messages: HashMap<Uuid, Vec<Message>>,
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    store: RwLock<ConversationStore>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn list(&self) -> Result<Vec<Conversation>, RepoError> {
        let store = self.store.read().await;
        let mut all: Vec<Conversation> = store.conversations.values().cloned().collect();
        // Most recently active first.
        all.sort_by(|a, b| {
            b.last_message_at
                .unwrap_or(b.created_at)
                .cmp(&a.last_message_at.unwrap_or(a.created_at))
        });
        Ok(all)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Conversation>, RepoError> {
        Ok(self.store.read().await.conversations.get(&id).cloned())
    }

    async fn save(&self, conversation: Conversation) -> Result<Conversation, RepoError> {
        let mut store = self.store.write().await;
        store
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, RepoError> {
        let store = self.store.read().await;
        if !store.conversations.contains_key(&conversation_id) {
            return Err(RepoError::NotFound);
        }
        Ok(store
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_message(&self, message: Message) -> Result<Message, RepoError> {
        let mut store = self.store.write().await;

        let conversation = store
            .conversations
            .get_mut(&message.conversation_id)
            .ok_or(RepoError::NotFound)?;
        conversation.last_message_at = Some(message.sent_at);

        store
            .messages
            .entry(message.conversation_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }
}
