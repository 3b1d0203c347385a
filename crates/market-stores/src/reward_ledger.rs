use crate::{
    ActorId, Clock, EntryKind, HistoryEntry, InMemoryStorage, LedgerState, PersistenceAdapter,
    Result, SessionEvent, SessionScope, StorageAdapter, StoreName, SystemClock,
    COINS_PER_TRANSACTION, MAX_MONTHLY_TRANSACTIONS, PREMIUM_COST_IN_COINS,
    PREMIUM_VOUCHER_PERCENT, PRO_VOUCHER_PERCENT,
};
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

pub const PREMIUM_UPGRADE_REASON: &str = "Premium upgrade";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewardConfig {
    pub coins_per_transaction: u64,
    pub max_monthly_transactions: u32,
    pub premium_cost_in_coins: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            coins_per_transaction: COINS_PER_TRANSACTION,
            max_monthly_transactions: MAX_MONTHLY_TRANSACTIONS,
            premium_cost_in_coins: PREMIUM_COST_IN_COINS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Premium,
}

impl SubscriptionTier {
    /// Unknown tier names fall back to `Free`.
    pub fn parse_lenient(tier: &str) -> Self {
        tier.parse().unwrap_or_default()
    }
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "pro" => Ok(SubscriptionTier::Pro),
            "premium" => Ok(SubscriptionTier::Premium),
            other => Err(format!("unknown subscription tier: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    pub tier: SubscriptionTier,
    pub discount_percent: u32,
}

pub fn voucher_for(tier: SubscriptionTier) -> Voucher {
    let discount_percent = match tier {
        SubscriptionTier::Premium => PREMIUM_VOUCHER_PERCENT,
        SubscriptionTier::Pro => PRO_VOUCHER_PERCENT,
        SubscriptionTier::Free => 0,
    };
    Voucher {
        tier,
        discount_percent,
    }
}

pub fn get_voucher_discount(tier: &str) -> u32 {
    voucher_for(SubscriptionTier::parse_lenient(tier)).discount_percent
}

/// Amounts a history entry can record exactly; zero is never a valid change.
fn signed_amount(amount: u64) -> Option<i64> {
    i64::try_from(amount).ok().filter(|signed| *signed > 0)
}

#[derive(Debug, Clone, PartialEq)]
pub enum EarnOutcome {
    Earned { entry: HistoryEntry },
    CapReached,
    InvalidAmount,
    NoActor,
}

impl EarnOutcome {
    pub fn is_earned(&self) -> bool {
        matches!(self, EarnOutcome::Earned { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpendOutcome {
    Spent { entry: HistoryEntry },
    InsufficientBalance { balance: u64, requested: u64 },
    InvalidAmount,
    NoActor,
}

impl SpendOutcome {
    pub fn is_spent(&self) -> bool {
        matches!(self, SpendOutcome::Spent { .. })
    }
}

/// Coin balance, monthly earn cap and history for the current actor.
///
/// The ledger stays on disk across logout; while nobody is logged in it
/// reads as zero and refuses every mutation with `NoActor`.
pub struct RewardLedger {
    persistence: PersistenceAdapter,
    session: Arc<SessionScope>,
    clock: Arc<dyn Clock>,
    config: RewardConfig,
    events: Receiver<SessionEvent>,
    actor: Option<ActorId>,
    state: LedgerState,
}

impl RewardLedger {
    pub fn new(session: Arc<SessionScope>, storage: Option<Arc<dyn StorageAdapter>>) -> Self {
        let storage = storage.unwrap_or_else(|| Arc::new(InMemoryStorage::new()));
        Self::with_config(
            session,
            PersistenceAdapter::new(storage),
            Arc::new(SystemClock),
            RewardConfig::default(),
        )
    }

    pub fn with_config(
        session: Arc<SessionScope>,
        persistence: PersistenceAdapter,
        clock: Arc<dyn Clock>,
        config: RewardConfig,
    ) -> Self {
        let events = session.subscribe();
        let mut ledger = Self {
            persistence,
            session,
            clock,
            config,
            events,
            actor: None,
            state: LedgerState::default(),
        };
        ledger.load();
        ledger
    }

    fn load(&mut self) {
        let month = self.clock.month_index();
        self.actor = self.session.current_actor_id();
        self.state = match &self.actor {
            Some(actor) => self
                .persistence
                .read(actor, StoreName::Rewards)
                .unwrap_or_else(|| LedgerState::starting_in(month)),
            None => LedgerState::default(),
        };
        if self.actor.is_some() && self.state.roll_over(month) {
            tracing::debug!(month, "reward ledger rolled over on load");
        }
    }

    /// Re-initializes under the session's current actor if it changed since
    /// the last load. Every public call runs this first. Returns true if the
    /// ledger reloaded.
    pub fn sync(&mut self) -> bool {
        let pending = self.events.try_iter().count() > 0;
        if !pending && self.actor == self.session.current_actor_id() {
            return false;
        }
        self.load();
        true
    }

    pub fn reload(&mut self) {
        self.events.try_iter().for_each(drop);
        self.load();
    }

    /// Month counters are stale once the calendar month moves on.
    fn counters_current(&self) -> bool {
        self.state.last_reset_month == self.clock.month_index()
    }

    fn current_transaction_count(&self) -> u32 {
        if self.counters_current() {
            self.state.monthly_transaction_count
        } else {
            0
        }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    pub fn actor(&mut self) -> Option<&ActorId> {
        self.sync();
        self.actor.as_ref()
    }

    pub fn balance(&mut self) -> u64 {
        self.sync();
        self.state.balance
    }

    pub fn monthly_earned(&mut self) -> u64 {
        self.sync();
        if self.counters_current() {
            self.state.monthly_earned
        } else {
            0
        }
    }

    pub fn monthly_transaction_count(&mut self) -> u32 {
        self.sync();
        self.current_transaction_count()
    }

    pub fn history(&mut self) -> &[HistoryEntry] {
        self.sync();
        &self.state.history
    }

    /// Snapshot as it would be persisted, with any pending rollover applied.
    pub fn snapshot(&mut self) -> LedgerState {
        self.sync();
        if self.actor.is_none() {
            return LedgerState::default();
        }
        let mut state = self.state.clone();
        state.roll_over(self.clock.month_index());
        state
    }

    pub fn can_earn_coins(&mut self) -> bool {
        self.sync();
        self.actor.is_some()
            && self.current_transaction_count() < self.config.max_monthly_transactions
    }

    pub fn remaining_monthly_transactions(&mut self) -> u32 {
        self.sync();
        if self.actor.is_none() {
            return 0;
        }
        self.config
            .max_monthly_transactions
            .saturating_sub(self.current_transaction_count())
    }

    pub fn can_afford_premium(&mut self) -> bool {
        self.sync();
        self.actor.is_some() && self.state.balance >= self.config.premium_cost_in_coins
    }

    pub fn voucher_discount(&self, tier: &str) -> u32 {
        get_voucher_discount(tier)
    }

    /// Credits `amount` unless this month's earn cap is used up.
    pub fn add_coins(&mut self, amount: u64, reason: &str) -> Result<EarnOutcome> {
        self.sync();
        let Some(actor) = self.actor.clone() else {
            return Ok(EarnOutcome::NoActor);
        };
        let Some(signed) = signed_amount(amount) else {
            return Ok(EarnOutcome::InvalidAmount);
        };

        let mut next = self.state.clone();
        next.roll_over(self.clock.month_index());
        if next.monthly_transaction_count >= self.config.max_monthly_transactions {
            tracing::debug!(actor = %actor, "earn cap reached");
            return Ok(EarnOutcome::CapReached);
        }

        let entry = self.entry(signed, reason, EntryKind::Earned);
        next.balance = next.balance.saturating_add(amount);
        next.monthly_transaction_count += 1;
        next.monthly_earned = next.monthly_earned.saturating_add(amount);
        next.history.push(entry.clone());

        self.commit(&actor, next)?;
        tracing::debug!(actor = %actor, amount, balance = self.state.balance, "coins earned");
        Ok(EarnOutcome::Earned { entry })
    }

    /// Earns the configured per-transaction reward.
    pub fn award_transaction(&mut self, reason: &str) -> Result<EarnOutcome> {
        self.add_coins(self.config.coins_per_transaction, reason)
    }

    /// Debits `amount` if the balance covers it. Spending never counts
    /// against the monthly cap.
    pub fn spend_coins(&mut self, amount: u64, reason: &str) -> Result<SpendOutcome> {
        self.sync();
        let Some(actor) = self.actor.clone() else {
            return Ok(SpendOutcome::NoActor);
        };
        let Some(signed) = signed_amount(amount) else {
            return Ok(SpendOutcome::InvalidAmount);
        };
        if self.state.balance < amount {
            return Ok(SpendOutcome::InsufficientBalance {
                balance: self.state.balance,
                requested: amount,
            });
        }

        let mut next = self.state.clone();
        next.roll_over(self.clock.month_index());
        let entry = self.entry(-signed, reason, EntryKind::Spent);
        next.balance -= amount;
        next.history.push(entry.clone());

        self.commit(&actor, next)?;
        tracing::debug!(actor = %actor, amount, balance = self.state.balance, "coins spent");
        Ok(SpendOutcome::Spent { entry })
    }

    pub fn redeem_premium(&mut self) -> Result<SpendOutcome> {
        self.spend_coins(self.config.premium_cost_in_coins, PREMIUM_UPGRADE_REASON)
    }

    /// Deletes the persisted ledger of the current actor and starts from zero.
    pub fn reset(&mut self) -> Result<()> {
        self.sync();
        let Some(actor) = self.actor.clone() else {
            return Ok(());
        };
        self.persistence.clear(&actor, StoreName::Rewards)?;
        self.state = LedgerState::starting_in(self.clock.month_index());
        Ok(())
    }

    fn entry(&self, amount: i64, reason: &str, kind: EntryKind) -> HistoryEntry {
        HistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            amount,
            reason: reason.trim().to_string(),
            date: self.clock.now(),
            kind,
        }
    }

    fn commit(&mut self, actor: &ActorId, next: LedgerState) -> Result<()> {
        self.persistence.write(actor, StoreName::Rewards, &next)?;
        self.state = next;
        Ok(())
    }
}
