use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const COINS_PER_TRANSACTION: u64 = 20;
pub const MAX_MONTHLY_TRANSACTIONS: u32 = 5;
pub const PREMIUM_COST_IN_COINS: u64 = 100;

pub const PREMIUM_VOUCHER_PERCENT: u32 = 50;
pub const PRO_VOUCHER_PERCENT: u32 = 20;

pub type MessageId = u64;

/// Seller snapshot captured when a conversation starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfile {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub rating: f32,
}

/// Listing snapshot captured when a conversation starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Message {
    pub fn is_from(&self, actor: &str) -> bool {
        self.sender_id == actor
    }
}

/// One buyer/seller thread about one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub seller_id: String,
    pub account_listing_id: String,
    pub seller_display_name: String,
    #[serde(default)]
    pub seller_rating: f32,
    pub listing_title: String,
    #[serde(default)]
    pub listing_image: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(seller: &SellerProfile, listing: &ListingSummary, created_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            seller_id: seller.id.clone(),
            account_listing_id: listing.id.clone(),
            seller_display_name: seller.display_name.clone(),
            seller_rating: seller.rating,
            listing_title: listing.title.clone(),
            listing_image: listing.image.clone(),
            messages: Vec::new(),
            created_at,
        }
    }

    pub fn is_about(&self, seller_id: &str, listing_id: &str) -> bool {
        self.seller_id == seller_id && self.account_listing_id == listing_id
    }

    /// Preview entry for conversation lists; always the newest message.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Messages from the counterpart the viewer has not marked read.
    pub fn unread_for(&self, viewer: &str) -> usize {
        self.messages
            .iter()
            .filter(|m| !m.read && !m.is_from(viewer))
            .count()
    }

    /// Appends a message, keeping ids increasing and timestamps non-decreasing.
    pub(crate) fn push_message(
        &mut self,
        sender_id: &str,
        text: String,
        now: DateTime<Utc>,
    ) -> Message {
        let (id, timestamp) = match self.messages.last() {
            Some(last) => (last.id + 1, now.max(last.timestamp)),
            None => (1, now),
        };
        let message = Message {
            id,
            sender_id: sender_id.to_string(),
            text,
            timestamp,
            read: false,
        };
        self.messages.push(message.clone());
        message
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Earned,
    Spent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    /// Positive for earnings, negative for spending.
    pub amount: i64,
    pub reason: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    pub balance: u64,
    pub monthly_transaction_count: u32,
    pub monthly_earned: u64,
    pub last_reset_month: u32,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl LedgerState {
    pub fn starting_in(month: u32) -> Self {
        Self {
            last_reset_month: month,
            ..Default::default()
        }
    }

    /// Resets the monthly counters when `month` differs from the last reset.
    /// Balance and history are kept. Returns whether a reset happened.
    pub fn roll_over(&mut self, month: u32) -> bool {
        if self.last_reset_month == month {
            return false;
        }
        self.monthly_transaction_count = 0;
        self.monthly_earned = 0;
        self.last_reset_month = month;
        true
    }
}
