use anyhow::{bail, Result};
use market_stores::{voucher_for, EarnOutcome, HistoryEntry, SpendOutcome, SubscriptionTier};
use serde::Serialize;

use super::Stores;
use crate::config::Config;
use crate::output::Output;

#[derive(Serialize)]
struct BalanceResult {
    balance: u64,
    monthly_earned: u64,
    monthly_transactions: u32,
    remaining_transactions: u32,
    can_earn: bool,
    can_afford_premium: bool,
    coins_per_transaction: u64,
    max_monthly_transactions: u32,
    premium_cost: u64,
}

#[derive(Serialize)]
struct HistoryResult<'a> {
    history: &'a [HistoryEntry],
}

#[derive(Serialize)]
struct EarnResult {
    earned: bool,
    status: &'static str,
    entry: Option<HistoryEntry>,
    balance: u64,
    remaining_transactions: u32,
}

#[derive(Serialize)]
struct SpendResult {
    spent: bool,
    status: &'static str,
    entry: Option<HistoryEntry>,
    balance: u64,
}

#[derive(Serialize)]
struct VoucherResult {
    tier: SubscriptionTier,
    discount_percent: u32,
}

fn balance_report(stores: &mut Stores) -> BalanceResult {
    let ledger = &mut stores.ledger;
    let config = ledger.config().clone();

    BalanceResult {
        balance: ledger.balance(),
        monthly_earned: ledger.monthly_earned(),
        monthly_transactions: ledger.monthly_transaction_count(),
        remaining_transactions: ledger.remaining_monthly_transactions(),
        can_earn: ledger.can_earn_coins(),
        can_afford_premium: ledger.can_afford_premium(),
        coins_per_transaction: config.coins_per_transaction,
        max_monthly_transactions: config.max_monthly_transactions,
        premium_cost: config.premium_cost_in_coins,
    }
}

/// Balance and this month's earning progress
pub fn balance(stores: &mut Stores, output: &Output) -> Result<()> {
    stores.require_actor()?;
    output.success("coins balance", balance_report(stores));
    Ok(())
}

/// Earn and spend history, oldest first
pub fn history(stores: &mut Stores, output: &Output) -> Result<()> {
    stores.require_actor()?;
    output.success(
        "coins history",
        HistoryResult {
            history: stores.ledger.history(),
        },
    );
    Ok(())
}

/// Earn coins; silently capped once the monthly limit is used up
pub fn earn(amount: Option<u64>, reason: &str, stores: &mut Stores, output: &Output) -> Result<()> {
    stores.require_actor()?;
    let outcome = match amount {
        Some(amount) => stores.ledger.add_coins(amount, reason)?,
        None => stores.ledger.award_transaction(reason)?,
    };

    let (status, entry) = match outcome {
        EarnOutcome::Earned { entry } => ("earned", Some(entry)),
        EarnOutcome::CapReached => ("cap_reached", None),
        EarnOutcome::InvalidAmount => bail!("Amount must be greater than zero"),
        EarnOutcome::NoActor => bail!("Not logged in"),
    };

    output.success(
        "coins earn",
        EarnResult {
            earned: entry.is_some(),
            status,
            entry,
            balance: stores.ledger.balance(),
            remaining_transactions: stores.ledger.remaining_monthly_transactions(),
        },
    );
    Ok(())
}

fn report_spend(
    command: &str,
    outcome: SpendOutcome,
    stores: &mut Stores,
    output: &Output,
) -> Result<()> {
    let (status, entry) = match outcome {
        SpendOutcome::Spent { entry } => ("spent", Some(entry)),
        SpendOutcome::InsufficientBalance { .. } => ("insufficient_balance", None),
        SpendOutcome::InvalidAmount => bail!("Amount must be greater than zero"),
        SpendOutcome::NoActor => bail!("Not logged in"),
    };

    output.success(
        command,
        SpendResult {
            spent: entry.is_some(),
            status,
            entry,
            balance: stores.ledger.balance(),
        },
    );
    Ok(())
}

/// Spend coins if the balance covers it
pub fn spend(amount: u64, reason: &str, stores: &mut Stores, output: &Output) -> Result<()> {
    stores.require_actor()?;
    let outcome = stores.ledger.spend_coins(amount, reason)?;
    report_spend("coins spend", outcome, stores, output)
}

/// Spend the premium upgrade cost
pub fn redeem_premium(stores: &mut Stores, output: &Output) -> Result<()> {
    stores.require_actor()?;
    let outcome = stores.ledger.redeem_premium()?;
    report_spend("coins redeem-premium", outcome, stores, output)
}

fn voucher_report(tier: Option<&str>, config: &Config) -> VoucherResult {
    let tier = tier
        .map(SubscriptionTier::parse_lenient)
        .unwrap_or(config.tier);
    let voucher = voucher_for(tier);

    VoucherResult {
        tier: voucher.tier,
        discount_percent: voucher.discount_percent,
    }
}

/// Voucher discount for a tier (defaults to the logged-in user's tier)
pub fn voucher(tier: Option<&str>, config: &Config, output: &Output) -> Result<()> {
    output.success("coins voucher", voucher_report(tier, config));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::setup;

    #[test]
    fn test_earn_until_capped() {
        let (_temp, _config, mut stores) = setup(Some("alice"));
        let output = Output::new(true);

        for _ in 0..6 {
            earn(None, "purchase", &mut stores, &output).unwrap();
        }

        let report = balance_report(&mut stores);
        assert_eq!(report.balance, 100);
        assert_eq!(report.monthly_earned, 100);
        assert_eq!(report.monthly_transactions, 5);
        assert_eq!(report.remaining_transactions, 0);
        assert!(!report.can_earn);
        assert!(report.can_afford_premium);
        assert_eq!(report.premium_cost, 100);
        assert_eq!(stores.ledger.history().len(), 5);

        balance(&mut stores, &output).unwrap();
        history(&mut stores, &output).unwrap();
    }

    #[test]
    fn test_spend_and_redeem() {
        let (_temp, _config, mut stores) = setup(Some("alice"));
        let output = Output::new(true);
        for _ in 0..5 {
            earn(None, "purchase", &mut stores, &output).unwrap();
        }

        spend(150, "too much", &mut stores, &output).unwrap();
        assert_eq!(stores.ledger.balance(), 100);

        redeem_premium(&mut stores, &output).unwrap();
        assert_eq!(stores.ledger.balance(), 0);
        assert!(spend(0, "nothing", &mut stores, &output).is_err());
    }

    #[test]
    fn test_voucher_uses_config_tier() {
        let (_temp, mut config, _stores) = setup(None);
        let output = Output::new(true);

        let report = voucher_report(None, &config);
        assert_eq!(report.tier, SubscriptionTier::Free);
        assert_eq!(report.discount_percent, 0);

        config.tier = SubscriptionTier::Pro;
        let report = voucher_report(None, &config);
        assert_eq!(report.tier, SubscriptionTier::Pro);
        assert_eq!(report.discount_percent, 20);

        let report = voucher_report(Some("premium"), &config);
        assert_eq!(report.tier, SubscriptionTier::Premium);
        assert_eq!(report.discount_percent, 50);

        voucher(None, &config, &output).unwrap();
    }

    #[test]
    fn test_coins_require_login() {
        let (_temp, _config, mut stores) = setup(None);
        let output = Output::new(true);

        assert!(earn(Some(5), "x", &mut stores, &output).is_err());
        assert!(balance(&mut stores, &output).is_err());
    }
}
