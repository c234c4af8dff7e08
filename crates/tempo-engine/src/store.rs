//! In-memory conversation store.

use tempo_types::{Conversation, Feedback, Id, MIN_MESSAGES, Message, MessagePatch, Role};

use crate::config::DEFAULT_MAX_MESSAGES;
use crate::error::{EngineError, Result};

/// Owns every conversation and tracks which one is selected.
///
/// Messages are only ever appended or patched by id.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    selected: Option<Id>,
    max_messages: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES)
    }
}

impl ConversationStore {
    /// Create an empty store keeping at most `max_messages` per conversation.
    pub fn new(max_messages: usize) -> Self {
        Self {
            conversations: Vec::new(),
            selected: None,
            max_messages: max_messages.max(MIN_MESSAGES),
        }
    }

    /// Create an untitled conversation and select it.
    pub fn create(&mut self) -> Id {
        let conversation = Conversation::default();
        let id = conversation.id;
        self.conversations.push(conversation);
        self.selected = Some(id);
        tracing::debug!(conversation = %id, "Created conversation");
        id
    }

    /// Select a conversation.
    pub fn select(&mut self, id: Id) -> Result<()> {
        self.get(id)?;
        self.selected = Some(id);
        Ok(())
    }

    /// Get the selected conversation id.
    pub fn selected_id(&self) -> Option<Id> {
        self.selected
    }

    /// Get the selected conversation.
    pub fn selected(&self) -> Option<&Conversation> {
        self.selected.and_then(|id| self.get(id).ok())
    }

    /// Conversations in creation order.
    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Get a conversation by id.
    pub fn get(&self, id: Id) -> Result<&Conversation> {
        self.conversations
            .iter()
            .find(|c| c.id == id)
            .ok_or(EngineError::ConversationNotFound(id))
    }

    fn get_mut(&mut self, id: Id) -> Result<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(EngineError::ConversationNotFound(id))
    }

    /// Rename a conversation.
    pub fn rename(&mut self, id: Id, title: impl Into<String>) -> Result<()> {
        let conversation = self.get_mut(id)?;
        conversation.title = title.into();
        conversation.touch();
        Ok(())
    }

    /// Remove a conversation. Deleting the selected one selects the most
    /// recently updated remaining conversation.
    pub fn delete(&mut self, id: Id) -> Result<Conversation> {
        let index = self
            .conversations
            .iter()
            .position(|c| c.id == id)
            .ok_or(EngineError::ConversationNotFound(id))?;
        let removed = self.conversations.remove(index);

        if self.selected == Some(id) {
            self.selected = self
                .conversations
                .iter()
                .max_by_key(|c| c.updated_at)
                .map(|c| c.id);
        }
        tracing::debug!(conversation = %id, "Deleted conversation");
        Ok(removed)
    }

    /// Append a message.
    ///
    /// An open message is refused while another one is open. The first user
    /// message names an untitled conversation.
    pub fn append(&mut self, conversation_id: Id, message: Message) -> Result<Id> {
        let max_messages = self.max_messages;
        let conversation = self.get_mut(conversation_id)?;
        if message.is_open() && conversation.open_message().is_some() {
            return Err(EngineError::TurnInProgress(conversation_id));
        }
        if message.role == Role::User && conversation.is_untitled() {
            conversation.title = Conversation::title_from(message.content());
        }

        let id = message.id;
        let evicted = conversation.push_message(message, max_messages);
        if evicted > 0 {
            tracing::debug!(conversation = %conversation_id, evicted, "Evicted oldest messages");
        }
        Ok(id)
    }

    /// Get a message by id.
    pub fn message(&self, conversation_id: Id, message_id: Id) -> Result<&Message> {
        self.get(conversation_id)?
            .message(message_id)
            .ok_or(EngineError::MessageNotFound(message_id))
    }

    /// Mutable access for the owning turn.
    pub(crate) fn message_mut(&mut self, conversation_id: Id, message_id: Id) -> Result<&mut Message> {
        let conversation = self.get_mut(conversation_id)?;
        conversation.touch();
        conversation
            .message_mut(message_id)
            .ok_or(EngineError::MessageNotFound(message_id))
    }

    pub fn patch(&mut self, conversation_id: Id, message_id: Id, patch: MessagePatch) -> Result<()> {
        self.message_mut(conversation_id, message_id)?.apply(patch)?;
        Ok(())
    }

    /// Toggle a rating on an assistant message.
    pub fn toggle_feedback(
        &mut self,
        conversation_id: Id,
        message_id: Id,
        feedback: Feedback,
    ) -> Result<Option<Feedback>> {
        let message = self.message_mut(conversation_id, message_id)?;
        if message.role != Role::Assistant {
            return Err(EngineError::NotAssistant(message_id));
        }
        message.toggle_feedback(feedback);
        Ok(message.feedback())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_types::{DEFAULT_CONVERSATION_TITLE, MessageStatus};

    #[test]
    fn test_create_selects() {
        let mut store = ConversationStore::default();
        let id = store.create();
        assert_eq!(store.selected_id(), Some(id));
        assert_eq!(store.get(id).unwrap().title, DEFAULT_CONVERSATION_TITLE);
    }

    #[test]
    fn test_first_user_message_names_conversation() {
        let mut store = ConversationStore::default();
        let id = store.create();
        store.append(id, Message::user("Can my landlord raise the rent?")).unwrap();
        store.append(id, Message::user("Second question")).unwrap();

        assert_eq!(store.get(id).unwrap().title, "Can my landlord raise the rent?");
    }

    #[test]
    fn test_single_open_message() {
        let mut store = ConversationStore::default();
        let id = store.create();
        store.append(id, Message::assistant_pending()).unwrap();

        let err = store.append(id, Message::assistant_pending()).unwrap_err();
        assert!(matches!(err, EngineError::TurnInProgress(_)));
        store.append(id, Message::user("still fine")).unwrap();
    }

    #[test]
    fn test_patch_goes_through_status_machine() {
        let mut store = ConversationStore::default();
        let id = store.create();
        let msg = store.append(id, Message::assistant_pending()).unwrap();

        store.patch(id, msg, MessagePatch::content("Hel")).unwrap();
        store.patch(id, msg, MessagePatch::status(MessageStatus::Complete)).unwrap();
        let err = store.patch(id, msg, MessagePatch::content("Hello")).unwrap_err();
        assert!(matches!(err, EngineError::Model(_)));
        assert_eq!(store.message(id, msg).unwrap().content(), "Hel");
    }

    #[test]
    fn test_feedback_only_on_assistant() {
        let mut store = ConversationStore::default();
        let id = store.create();
        let user = store.append(id, Message::user("q")).unwrap();
        let reply = store.append(id, Message::assistant("a")).unwrap();

        assert!(matches!(
            store.toggle_feedback(id, user, Feedback::Positive),
            Err(EngineError::NotAssistant(_))
        ));
        assert_eq!(
            store.toggle_feedback(id, reply, Feedback::Positive).unwrap(),
            Some(Feedback::Positive)
        );
        assert_eq!(store.toggle_feedback(id, reply, Feedback::Positive).unwrap(), None);
    }

    #[test]
    fn test_delete_reselects() {
        let mut store = ConversationStore::default();
        let first = store.create();
        let second = store.create();

        store.delete(second).unwrap();
        assert_eq!(store.selected_id(), Some(first));
        store.delete(first).unwrap();
        assert_eq!(store.selected_id(), None);
        assert!(matches!(store.delete(first), Err(EngineError::ConversationNotFound(_))));
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut store = ConversationStore::new(20);
        let id = store.create();
        for i in 0..25 {
            store.append(id, Message::user(format!("m{i}"))).unwrap();
        }
        let messages = &store.get(id).unwrap().messages;
        assert!(messages.len() <= 20);
        assert_eq!(messages.last().unwrap().content(), "m24");
    }
}
