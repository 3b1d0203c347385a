use std::sync::Arc;

use chrono::{TimeZone, Utc};
use market_stores::{
    ActorId, EarnOutcome, EntryKind, HistoryEntry, InMemoryStorage, LedgerState, ManualClock,
    PersistenceAdapter, Result, RewardConfig, RewardLedger, SessionScope, SpendOutcome,
    StorageAdapter, StoreName,
};

fn actor(id: &str) -> ActorId {
    ActorId::new(id).unwrap()
}

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap())
}

fn ledger(storage: &InMemoryStorage, session: &Arc<SessionScope>, clock: &ManualClock) -> RewardLedger {
    RewardLedger::with_config(
        session.clone(),
        PersistenceAdapter::new(Arc::new(storage.clone())),
        Arc::new(clock.clone()),
        RewardConfig::default(),
    )
}

#[test]
fn test_earn_cap_drops_the_sixth_call() -> Result<()> {
    let session = Arc::new(SessionScope::with_actor(actor("alice")));
    let mut ledger = ledger(&InMemoryStorage::new(), &session, &clock());

    for _ in 0..5 {
        assert!(ledger.add_coins(20, "x")?.is_earned());
    }
    let before = ledger.snapshot();

    assert_eq!(ledger.add_coins(20, "x")?, EarnOutcome::CapReached);

    assert_eq!(ledger.snapshot(), before);
    assert_eq!(ledger.monthly_transaction_count(), 5);
    assert_eq!(ledger.balance(), 100);
    assert_eq!(ledger.monthly_earned(), 100);
    assert_eq!(ledger.history().len(), 5);
    assert!(!ledger.can_earn_coins());
    Ok(())
}

#[test]
fn test_spend_guard_leaves_state_untouched() -> Result<()> {
    let session = Arc::new(SessionScope::with_actor(actor("alice")));
    let mut ledger = ledger(&InMemoryStorage::new(), &session, &clock());
    for _ in 0..5 {
        ledger.add_coins(20, "purchase")?;
    }
    let before = ledger.snapshot();

    let outcome = ledger.spend_coins(150, "y")?;

    assert_eq!(
        outcome,
        SpendOutcome::InsufficientBalance {
            balance: 100,
            requested: 150
        }
    );
    assert!(!outcome.is_spent());
    assert_eq!(ledger.snapshot(), before);
    Ok(())
}

#[test]
fn test_monthly_reset_preserves_balance_and_history() -> Result<()> {
    let storage = InMemoryStorage::new();
    let alice = actor("alice");
    let history = vec![HistoryEntry {
        id: "h-1".to_string(),
        amount: 60,
        reason: "legacy".to_string(),
        date: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        kind: EntryKind::Earned,
    }];
    PersistenceAdapter::new(Arc::new(storage.clone())).write(
        &alice,
        StoreName::Rewards,
        &LedgerState {
            balance: 60,
            monthly_transaction_count: 5,
            monthly_earned: 60,
            last_reset_month: 2,
            history: history.clone(),
        },
    )?;

    let clock = clock();
    clock.set_month_index(2);
    let session = Arc::new(SessionScope::with_actor(alice));
    let mut same_month = ledger(&storage, &session, &clock);
    assert_eq!(same_month.monthly_transaction_count(), 5);
    assert!(!same_month.can_earn_coins());

    clock.set_month_index(3);
    let mut rolled = ledger(&storage, &session, &clock);
    let state = rolled.snapshot();
    assert_eq!(state.monthly_transaction_count, 0);
    assert_eq!(state.monthly_earned, 0);
    assert_eq!(state.last_reset_month, 3);
    assert_eq!(state.balance, 60);
    assert_eq!(state.history, history);

    assert!(rolled.add_coins(20, "march")?.is_earned());
    assert_eq!(rolled.balance(), 80);
    assert_eq!(rolled.monthly_transaction_count(), 1);
    Ok(())
}

#[test]
fn test_corrupt_ledger_matches_fresh_ledger() -> Result<()> {
    let corrupt = InMemoryStorage::new();
    corrupt.put("v1/rewards/alice", "{\"balance\": 9".to_string())?;
    let session = Arc::new(SessionScope::with_actor(actor("alice")));
    let clock = clock();

    let mut from_corrupt = ledger(&corrupt, &session, &clock);
    let mut from_nothing = ledger(&InMemoryStorage::new(), &session, &clock);

    assert_eq!(from_corrupt.snapshot(), from_nothing.snapshot());
    assert_eq!(from_corrupt.balance(), 0);
    assert!(from_corrupt.history().is_empty());
    Ok(())
}

#[test]
fn test_ledger_survives_logout_but_is_hidden() -> Result<()> {
    let storage = InMemoryStorage::new();
    let session = Arc::new(SessionScope::with_actor(actor("alice")));
    let clock = clock();
    let mut ledger = ledger(&storage, &session, &clock);

    ledger.add_coins(20, "purchase")?;
    ledger.add_coins(20, "purchase")?;

    session.logout();
    assert_eq!(ledger.balance(), 0);
    assert!(ledger.history().is_empty());
    assert!(!ledger.can_earn_coins());
    assert_eq!(ledger.add_coins(20, "ghost")?, EarnOutcome::NoActor);
    assert_eq!(ledger.spend_coins(10, "ghost")?, SpendOutcome::NoActor);

    session.login(actor("bob"));
    assert_eq!(ledger.balance(), 0);
    ledger.add_coins(20, "bob's first")?;

    session.login(actor("alice"));
    assert_eq!(ledger.balance(), 40);
    assert_eq!(ledger.history().len(), 2);
    assert!(ledger.history().iter().all(|e| e.reason == "purchase"));
    assert!(!ledger.sync());
    Ok(())
}

#[test]
fn test_login_shows_stored_ledger_on_first_read() -> Result<()> {
    let storage = InMemoryStorage::new();
    let session = Arc::new(SessionScope::with_actor(actor("bob")));
    let clock = clock();
    ledger(&storage, &session, &clock).award_transaction("purchase")?;

    session.logout();
    let mut ledger = ledger(&storage, &session, &clock);
    assert!(ledger.actor().is_none());
    assert_eq!(ledger.balance(), 0);

    session.login(actor("bob"));
    assert_eq!(ledger.balance(), 20);
    assert_eq!(ledger.monthly_earned(), 20);
    assert_eq!(ledger.monthly_transaction_count(), 1);
    assert_eq!(ledger.remaining_monthly_transactions(), 4);
    assert_eq!(ledger.history().len(), 1);
    assert_eq!(ledger.snapshot().balance, 20);
    Ok(())
}

#[test]
fn test_every_mutation_is_persisted_immediately() -> Result<()> {
    let storage = InMemoryStorage::new();
    let session = Arc::new(SessionScope::with_actor(actor("alice")));
    let clock = clock();
    let mut ledger = ledger(&storage, &session, &clock);

    ledger.add_coins(20, "purchase")?;
    ledger.spend_coins(5, "sticker")?;

    let reader = PersistenceAdapter::new(Arc::new(storage) as Arc<dyn StorageAdapter>);
    let stored: LedgerState = reader
        .read(&actor("alice"), StoreName::Rewards)
        .expect("ledger snapshot");
    assert_eq!(stored, ledger.snapshot());
    assert_eq!(stored.balance, 15);
    assert_eq!(
        stored.history.iter().map(|e| e.amount).collect::<Vec<_>>(),
        vec![20, -5]
    );
    Ok(())
}
