//! Per-user client-side stores for the marketplace: buyer/seller
//! conversations and the reward coin ledger, both persisted as JSON
//! snapshots keyed by the logged-in actor.

pub mod clock;
pub mod conversation_store;
pub mod error;
pub mod file_storage;
pub mod persistence;
pub mod reward_ledger;
pub mod session;
pub mod storage;
pub mod types;

pub use clock::{month_index_of, Clock, ManualClock, SystemClock};
pub use conversation_store::{ChatView, ConversationStore, ReadOutcome, SendOutcome};
pub use error::{Error, Result};
pub use file_storage::FileStorageAdapter;
pub use persistence::{PersistenceAdapter, StoreName};
pub use reward_ledger::{
    get_voucher_discount, voucher_for, EarnOutcome, RewardConfig, RewardLedger, SpendOutcome,
    SubscriptionTier, Voucher, PREMIUM_UPGRADE_REASON,
};
pub use session::{ActorId, SessionEvent, SessionScope};
pub use storage::{InMemoryStorage, StorageAdapter};
pub use types::*;
