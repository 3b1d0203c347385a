use crate::{
    ActorId, Clock, Conversation, InMemoryStorage, ListingSummary, Message, PersistenceAdapter,
    Result, SellerProfile, SessionEvent, SessionScope, StorageAdapter, StoreName, SystemClock,
};
use crossbeam_channel::Receiver;
use std::sync::Arc;

/// What the chat surface is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatView {
    Closed,
    List,
    Conversation(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Sent(Message),
    EmptyText,
    InvalidSender,
    UnknownConversation,
    NoActor,
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent(_))
    }

    pub fn message(&self) -> Option<&Message> {
        match self {
            SendOutcome::Sent(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Number of messages whose flag changed.
    Marked(usize),
    UnknownConversation,
    NoActor,
}

/// Buyer/seller conversations of the current actor plus the chat UI state.
///
/// Every change to the conversation list is written through to the
/// persistence layer before it becomes visible in memory; a failed write
/// leaves the store as it was and returns the storage error.
pub struct ConversationStore {
    persistence: PersistenceAdapter,
    session: Arc<SessionScope>,
    clock: Arc<dyn Clock>,
    events: Receiver<SessionEvent>,
    actor: Option<ActorId>,
    conversations: Vec<Conversation>,
    active: Option<String>,
    is_open: bool,
}

impl ConversationStore {
    pub fn new(session: Arc<SessionScope>, storage: Option<Arc<dyn StorageAdapter>>) -> Self {
        let storage = storage.unwrap_or_else(|| Arc::new(InMemoryStorage::new()));
        Self::with_clock(
            session,
            PersistenceAdapter::new(storage),
            Arc::new(SystemClock),
        )
    }

    pub fn with_clock(
        session: Arc<SessionScope>,
        persistence: PersistenceAdapter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = session.subscribe();
        let mut store = Self {
            persistence,
            session,
            clock,
            events,
            actor: None,
            conversations: Vec::new(),
            active: None,
            is_open: false,
        };
        store.load();
        store
    }

    fn load(&mut self) {
        self.actor = self.session.current_actor_id();
        self.conversations = match &self.actor {
            Some(actor) => self
                .persistence
                .read(actor, StoreName::Conversations)
                .unwrap_or_default(),
            None => Vec::new(),
        };
        self.active = None;
        self.is_open = false;
        tracing::debug!(
            actor = ?self.actor.as_ref().map(ActorId::as_str),
            conversations = self.conversations.len(),
            "conversation store loaded"
        );
    }

    /// Re-initializes under the session's current actor if it changed since
    /// the last load. Every public call runs this first, so hosts never see
    /// a previous actor's conversations. Returns true if the store reloaded.
    pub fn sync(&mut self) -> bool {
        let pending = self.events.try_iter().count() > 0;
        if !pending && self.actor == self.session.current_actor_id() {
            return false;
        }
        self.load();
        true
    }

    /// Drops in-memory state and re-reads the snapshot of the current actor.
    pub fn reload(&mut self) {
        self.events.try_iter().for_each(drop);
        self.load();
    }

    pub fn actor(&mut self) -> Option<&ActorId> {
        self.sync();
        self.actor.as_ref()
    }

    pub fn conversations(&mut self) -> &[Conversation] {
        self.sync();
        &self.conversations
    }

    pub fn conversation(&mut self, conversation_id: &str) -> Option<&Conversation> {
        self.sync();
        self.get(conversation_id)
    }

    pub fn find_conversation(&mut self, seller_id: &str, listing_id: &str) -> Option<&Conversation> {
        self.sync();
        self.conversations
            .iter()
            .find(|c| c.is_about(seller_id, listing_id))
    }

    pub fn active_conversation(&mut self) -> Option<&Conversation> {
        self.sync();
        self.get(self.active.as_deref()?)
    }

    pub fn is_chat_open(&mut self) -> bool {
        self.sync();
        self.is_open && self.actor.is_some()
    }

    pub fn chat_view(&mut self) -> ChatView {
        if !self.is_chat_open() {
            return ChatView::Closed;
        }
        match self.active.as_deref().and_then(|id| self.get(id)) {
            Some(conversation) => ChatView::Conversation(conversation.id.clone()),
            None => ChatView::List,
        }
    }

    /// Total unread messages from counterparts, across all conversations.
    pub fn unread_count(&mut self) -> usize {
        self.sync();
        let Some(viewer) = &self.actor else {
            return 0;
        };
        self.conversations
            .iter()
            .map(|c| c.unread_for(viewer.as_str()))
            .sum()
    }

    pub fn unread_count_for(&mut self, conversation_id: &str) -> usize {
        self.sync();
        match (&self.actor, self.get(conversation_id)) {
            (Some(viewer), Some(conversation)) => conversation.unread_for(viewer.as_str()),
            _ => 0,
        }
    }

    /// Returns the conversation for `(seller, listing)`, creating it if needed,
    /// and shows it in the chat surface. `None` when nobody is logged in.
    pub fn start_conversation(
        &mut self,
        seller: &SellerProfile,
        listing: &ListingSummary,
    ) -> Result<Option<Conversation>> {
        self.sync();
        let Some(actor) = self.actor.clone() else {
            return Ok(None);
        };

        if let Some(existing) = self
            .conversations
            .iter()
            .find(|c| c.is_about(&seller.id, &listing.id))
            .cloned()
        {
            self.active = Some(existing.id.clone());
            self.is_open = true;
            return Ok(Some(existing));
        }

        let conversation = Conversation::new(seller, listing, self.clock.now());
        self.conversations.insert(0, conversation.clone());
        if let Err(e) = self.persist(&actor) {
            self.conversations.remove(0);
            return Err(e);
        }

        tracing::debug!(
            conversation = %conversation.id,
            seller = %seller.id,
            listing = %listing.id,
            "conversation started"
        );
        self.active = Some(conversation.id.clone());
        self.is_open = true;
        Ok(Some(conversation))
    }

    /// Appends a message from the current actor.
    pub fn send_message(&mut self, conversation_id: &str, text: &str) -> Result<SendOutcome> {
        self.sync();
        let Some(actor) = self.actor.clone() else {
            return Ok(SendOutcome::NoActor);
        };
        self.append(&actor, conversation_id, actor.as_str(), text)
    }

    /// Appends a message authored by the counterpart, as delivered by the transport.
    pub fn receive_message(
        &mut self,
        conversation_id: &str,
        sender_id: &str,
        text: &str,
    ) -> Result<SendOutcome> {
        self.sync();
        let Some(actor) = self.actor.clone() else {
            return Ok(SendOutcome::NoActor);
        };
        let sender_id = sender_id.trim();
        if sender_id.is_empty() || sender_id == actor.as_str() {
            return Ok(SendOutcome::InvalidSender);
        }
        self.append(&actor, conversation_id, sender_id, text)
    }

    fn append(
        &mut self,
        actor: &ActorId,
        conversation_id: &str,
        sender_id: &str,
        text: &str,
    ) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::EmptyText);
        }
        let Some(index) = self.index_of(conversation_id) else {
            return Ok(SendOutcome::UnknownConversation);
        };

        let now = self.clock.now();
        let message = self.conversations[index].push_message(sender_id, text.to_string(), now);
        if let Err(e) = self.persist(actor) {
            self.conversations[index].messages.pop();
            return Err(e);
        }

        tracing::debug!(
            conversation = %conversation_id,
            message = message.id,
            "message appended"
        );
        Ok(SendOutcome::Sent(message))
    }

    /// Marks the counterpart's messages in a conversation as read.
    ///
    /// Messages the viewer sent are left alone: their flag belongs to the
    /// counterpart's view, which this store does not track.
    pub fn mark_as_read(&mut self, conversation_id: &str) -> Result<ReadOutcome> {
        self.sync();
        let Some(actor) = self.actor.clone() else {
            return Ok(ReadOutcome::NoActor);
        };
        let Some(index) = self.index_of(conversation_id) else {
            return Ok(ReadOutcome::UnknownConversation);
        };

        let mut changed = Vec::new();
        for (i, message) in self.conversations[index].messages.iter_mut().enumerate() {
            if !message.read && !message.is_from(actor.as_str()) {
                message.read = true;
                changed.push(i);
            }
        }
        if changed.is_empty() {
            return Ok(ReadOutcome::Marked(0));
        }

        if let Err(e) = self.persist(&actor) {
            for i in changed {
                self.conversations[index].messages[i].read = false;
            }
            return Err(e);
        }
        Ok(ReadOutcome::Marked(changed.len()))
    }

    /// Opens the chat surface, optionally on a specific conversation.
    pub fn open_chat(&mut self, conversation_id: Option<&str>) {
        self.sync();
        if self.actor.is_none() {
            return;
        }
        self.is_open = true;
        if let Some(id) = conversation_id {
            self.set_active_conversation(Some(id));
        }
    }

    pub fn close_chat(&mut self) {
        self.sync();
        self.is_open = false;
        self.active = None;
    }

    /// `None` returns to the list view without closing the chat.
    pub fn set_active_conversation(&mut self, conversation_id: Option<&str>) {
        self.sync();
        match conversation_id {
            None => self.active = None,
            Some(id) => {
                if self.index_of(id).is_some() {
                    self.active = Some(id.to_string());
                }
            }
        }
    }

    /// Deletes the persisted conversations of the current actor.
    pub fn reset(&mut self) -> Result<()> {
        self.sync();
        let Some(actor) = self.actor.clone() else {
            return Ok(());
        };
        self.persistence.clear(&actor, StoreName::Conversations)?;
        self.conversations.clear();
        self.active = None;
        self.is_open = false;
        Ok(())
    }

    fn get(&self, conversation_id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == conversation_id)
    }

    fn index_of(&self, conversation_id: &str) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == conversation_id)
    }

    fn persist(&self, actor: &ActorId) -> Result<()> {
        self.persistence
            .write(actor, StoreName::Conversations, &self.conversations)
    }
}
