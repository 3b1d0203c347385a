use anyhow::{bail, Context, Result};
use market_stores::{
    ActorId, Conversation, ListingSummary, Message, ReadOutcome, SellerProfile, SendOutcome,
};
use serde::Serialize;

use super::Stores;
use crate::output::Output;

#[derive(Serialize)]
struct ConversationSummary {
    id: String,
    seller_id: String,
    seller_name: String,
    listing_id: String,
    listing_title: String,
    messages: usize,
    unread: usize,
    last_message: Option<String>,
    created_at: String,
}

#[derive(Serialize)]
struct ChatListResult {
    conversations: Vec<ConversationSummary>,
}

#[derive(Serialize)]
struct ChatShowResult<'a> {
    conversation: &'a Conversation,
    unread: usize,
}

#[derive(Serialize)]
struct MessageResult<'a> {
    conversation_id: &'a str,
    message: &'a Message,
}

#[derive(Serialize)]
struct ReadResult<'a> {
    conversation_id: &'a str,
    marked: usize,
}

#[derive(Serialize)]
struct UnreadResult {
    unread: usize,
}

pub struct StartArgs {
    pub seller_id: String,
    pub listing_id: String,
    pub seller_name: Option<String>,
    pub rating: Option<f32>,
    pub title: Option<String>,
    pub image: Option<String>,
}

fn summarize(viewer: &ActorId, conversation: &Conversation) -> ConversationSummary {
    ConversationSummary {
        id: conversation.id.clone(),
        seller_id: conversation.seller_id.clone(),
        seller_name: conversation.seller_display_name.clone(),
        listing_id: conversation.account_listing_id.clone(),
        listing_title: conversation.listing_title.clone(),
        messages: conversation.messages.len(),
        unread: conversation.unread_for(viewer.as_str()),
        last_message: conversation.last_message().map(|m| m.text.clone()),
        created_at: conversation.created_at.to_rfc3339(),
    }
}

/// Start (or reopen) a conversation with a seller about a listing
pub fn start(args: StartArgs, stores: &mut Stores, output: &Output) -> Result<()> {
    let viewer = stores.require_actor()?;

    let seller = SellerProfile {
        display_name: args.seller_name.unwrap_or_else(|| args.seller_id.clone()),
        id: args.seller_id,
        rating: args.rating.unwrap_or_default(),
    };
    let listing = ListingSummary {
        title: args.title.unwrap_or_else(|| args.listing_id.clone()),
        id: args.listing_id,
        image: args.image,
    };

    let conversation = stores
        .conversations
        .start_conversation(&seller, &listing)?
        .context("Not logged in")?;

    output.success("chat start", summarize(&viewer, &conversation));
    Ok(())
}

/// List conversations, most recent first
pub fn list(stores: &mut Stores, output: &Output) -> Result<()> {
    let viewer = stores.require_actor()?;
    let conversations = stores
        .conversations
        .conversations()
        .iter()
        .map(|c| summarize(&viewer, c))
        .collect();

    output.success("chat list", ChatListResult { conversations });
    Ok(())
}

/// Show a conversation with all its messages
pub fn show(id: &str, stores: &mut Stores, output: &Output) -> Result<()> {
    let viewer = stores.require_actor()?;
    let conversation = stores
        .conversations
        .conversation(id)
        .with_context(|| format!("Conversation not found: {}", id))?;

    output.success(
        "chat show",
        ChatShowResult {
            conversation,
            unread: conversation.unread_for(viewer.as_str()),
        },
    );
    Ok(())
}

fn report_send(command: &str, id: &str, outcome: SendOutcome, output: &Output) -> Result<()> {
    match outcome {
        SendOutcome::Sent(message) => {
            output.success(
                command,
                MessageResult {
                    conversation_id: id,
                    message: &message,
                },
            );
            Ok(())
        }
        SendOutcome::EmptyText => bail!("Message text is empty"),
        SendOutcome::InvalidSender => bail!("Sender must be someone other than the logged-in user"),
        SendOutcome::UnknownConversation => bail!("Conversation not found: {}", id),
        SendOutcome::NoActor => bail!("Not logged in"),
    }
}

/// Send a message as the logged-in user
pub fn send(id: &str, text: &str, stores: &mut Stores, output: &Output) -> Result<()> {
    stores.require_actor()?;
    let outcome = stores.conversations.send_message(id, text)?;
    report_send("chat send", id, outcome, output)
}

/// Record a message from the seller side of a conversation
pub fn receive(id: &str, sender: &str, text: &str, stores: &mut Stores, output: &Output) -> Result<()> {
    stores.require_actor()?;
    let outcome = stores.conversations.receive_message(id, sender, text)?;
    report_send("chat receive", id, outcome, output)
}

/// Mark the seller's messages in a conversation as read
pub fn read(id: &str, stores: &mut Stores, output: &Output) -> Result<()> {
    stores.require_actor()?;
    match stores.conversations.mark_as_read(id)? {
        ReadOutcome::Marked(marked) => {
            output.success(
                "chat read",
                ReadResult {
                    conversation_id: id,
                    marked,
                },
            );
            Ok(())
        }
        ReadOutcome::UnknownConversation => bail!("Conversation not found: {}", id),
        ReadOutcome::NoActor => bail!("Not logged in"),
    }
}

/// Total unread messages across conversations
pub fn unread(stores: &mut Stores, output: &Output) -> Result<()> {
    stores.require_actor()?;
    output.success(
        "chat unread",
        UnreadResult {
            unread: stores.conversations.unread_count(),
        },
    );
    Ok(())
}
