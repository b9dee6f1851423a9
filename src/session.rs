//! Conversation view state and the message exchange it drives.
//!
//! State changes are synchronous (`begin_*` / `finish_*`) so the component can
//! apply them to a signal; the network part ([`exchange`], [`load`]) is a plain
//! future over the store and gateway traits. Each dispatch captures the view
//! epoch in a [`Ticket`]; starting a new session or opening another
//! conversation bumps the epoch, so late results are dropped instead of being
//! written into the wrong conversation.

use crate::config::{ChatConfig, SessionContext};
use crate::error::ChatError;
use crate::gateway::{BotGateway, FALLBACK_NO_REPLY, FALLBACK_UNREACHABLE};
use crate::state::{Conversation, ConversationSummary, Message};
use crate::store::ConversationStore;
use leptos::logging::{log, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    NoConversation,
    ConversationLoaded,
    AwaitingReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub conversation_id: Option<String>,
    pub messages: Vec<Message>,
    pending: Option<Ticket>,
    epoch: u64,
}

impl Default for ChatSession {
    fn default() -> Self {
        ChatSession {
            conversation_id: None,
            messages: vec![Message::welcome()],
            pending: None,
            epoch: 0,
        }
    }
}

/// Everything the network half of a submission needs.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub ticket: Ticket,
    pub conversation_id: Option<String>,
    pub message: Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: Level,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Notice {
            level: Level::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice {
            level: Level::Error,
            text: text.into(),
        }
    }
}

impl From<&ChatError> for Notice {
    fn from(err: &ChatError) -> Self {
        Notice::error(err.notice())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Exchange {
    /// Id assigned by the store when this submission opened the conversation.
    pub created: Option<String>,
    pub replies: Vec<Message>,
    pub notices: Vec<Notice>,
    pub summaries: Option<Vec<ConversationSummary>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    Stale,
}

impl ChatSession {
    pub fn state(&self) -> ViewState {
        if self.pending.is_some() {
            ViewState::AwaitingReply
        } else if self.conversation_id.is_some() {
            ViewState::ConversationLoaded
        } else {
            ViewState::NoConversation
        }
    }

    /// Drops the current conversation; the welcome message is never stored.
    pub fn new_session(&mut self) {
        self.epoch += 1;
        self.conversation_id = None;
        self.messages = vec![Message::welcome()];
        self.pending = None;
    }

    /// Accepts `text` for sending. Blank input or a pending reply leaves the
    /// session untouched.
    pub fn begin_submit(&mut self, text: &str) -> Result<Outgoing, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }
        if self.pending.is_some() {
            return Err(ChatError::Busy);
        }
        let ticket = Ticket { epoch: self.epoch };
        let message = Message::user(text.trim());
        self.messages.push(message.clone());
        self.pending = Some(ticket);
        Ok(Outgoing {
            ticket,
            conversation_id: self.conversation_id.clone(),
            message,
        })
    }

    pub fn finish_submit(&mut self, ticket: Ticket, exchange: Exchange) -> Applied {
        if self.pending != Some(ticket) || ticket.epoch != self.epoch {
            warn!("Dropping stale reply from epoch {}", ticket.epoch);
            return Applied::Stale;
        }
        self.pending = None;
        if let Some(id) = exchange.created {
            self.conversation_id = Some(id);
        }
        self.messages.extend(exchange.replies);
        Applied::Applied
    }

    /// Starts opening another conversation; any in-flight reply becomes stale.
    pub fn begin_load(&mut self) -> Ticket {
        self.epoch += 1;
        self.pending = None;
        Ticket { epoch: self.epoch }
    }

    /// Replaces local state with the store's copy.
    pub fn finish_load(&mut self, ticket: Ticket, conversation: Conversation) -> Applied {
        if ticket.epoch != self.epoch {
            return Applied::Stale;
        }
        self.conversation_id = Some(conversation.id);
        self.messages = conversation.messages;
        Applied::Applied
    }
}

async fn refresh(store: &dyn ConversationStore, exchange: &mut Exchange) {
    match store.list().await {
        Ok(summaries) => exchange.summaries = Some(summaries),
        Err(err) => warn!("Could not refresh conversations: {err}"),
    }
}

/// Persists the user message, asks the bot, and collects what to show.
/// Never fails: problems become fallback replies or notices.
pub async fn exchange(
    store: &dyn ConversationStore,
    gateway: &dyn BotGateway,
    context: &SessionContext,
    config: &ChatConfig,
    outgoing: &Outgoing,
) -> Exchange {
    let mut exchange = Exchange::default();
    let mut conversation_id = outgoing.conversation_id.clone();

    let persisted = if let Some(id) = outgoing.conversation_id.as_deref() {
        match store.append(id, &outgoing.message).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(ChatError::BackendError(format!(
                "conversation {id} did not store the message"
            ))),
            Err(err) => Err(err),
        }
    } else {
        match store.create(&outgoing.message).await {
            Ok(id) => {
                conversation_id = Some(id.clone());
                exchange.created = Some(id);
                Ok(())
            }
            Err(err) => Err(err),
        }
    };
    match persisted {
        Ok(()) => refresh(store, &mut exchange).await,
        Err(err) => {
            warn!("Could not store message: {err}");
            exchange.notices.push(Notice::from(&err));
        }
    }

    let sender = context.sender_for(conversation_id.as_deref());
    exchange.replies = match gateway.send(&outgoing.message.text, &sender).await {
        Ok(replies) if replies.is_empty() => vec![Message::bot(FALLBACK_NO_REPLY)],
        Ok(replies) => replies.into_iter().map(Message::from).collect(),
        Err(err) => {
            warn!("Bot gateway failed: {err}");
            vec![Message::bot(FALLBACK_UNREACHABLE)]
        }
    };

    if config.persist_bot_replies {
        if let Some(id) = &conversation_id {
            for reply in &exchange.replies {
                match store.append(id, reply).await {
                    Ok(true) => {}
                    Ok(false) => warn!("Conversation {id} did not store a bot reply"),
                    Err(err) => warn!("Could not store bot reply: {err}"),
                }
            }
            refresh(store, &mut exchange).await;
        }
    }
    log!("Exchange done with {} replies", exchange.replies.len());
    exchange
}

pub async fn load(
    store: &dyn ConversationStore,
    conversation_id: &str,
) -> Result<Conversation, ChatError> {
    store.fetch(conversation_id).await
}
