pub mod chat;
pub mod coins;
pub mod identity;

use anyhow::{Context, Result};
use market_stores::{
    ActorId, Clock, ConversationStore, FileStorageAdapter, PersistenceAdapter, RewardLedger,
    SessionScope, StorageAdapter, SystemClock,
};
use std::sync::Arc;

use crate::config::Config;

/// Session plus both stores, wired over the on-disk store directory.
pub struct Stores {
    pub session: Arc<SessionScope>,
    pub persistence: PersistenceAdapter,
    pub conversations: ConversationStore,
    pub ledger: RewardLedger,
}

impl Stores {
    pub fn open(config: &Config) -> Result<Self> {
        let storage: Arc<dyn StorageAdapter> = Arc::new(
            FileStorageAdapter::new(config.storage_dir()).context("Failed to open store directory")?,
        );
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_storage(config, storage, clock)
    }

    pub fn with_storage(
        config: &Config,
        storage: Arc<dyn StorageAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let session = Arc::new(match config.actor()? {
            Some(actor) => SessionScope::with_actor(actor),
            None => SessionScope::new(),
        });
        let persistence = PersistenceAdapter::new(storage);
        let conversations =
            ConversationStore::with_clock(session.clone(), persistence.clone(), clock.clone());
        let ledger = RewardLedger::with_config(
            session.clone(),
            persistence.clone(),
            clock,
            config.rewards.clone(),
        );

        Ok(Self {
            session,
            persistence,
            conversations,
            ledger,
        })
    }

    pub fn require_actor(&self) -> Result<ActorId> {
        self.session
            .current_actor_id()
            .context("Not logged in. Run `mkt login <user-id>` first")
    }
}
