use anyhow::Result;
use market_stores::{ActorId, StoreName, SubscriptionTier};
use serde::Serialize;
use std::collections::BTreeSet;

use super::Stores;
use crate::config::Config;
use crate::output::Output;

#[derive(Serialize)]
struct LoginResult {
    user_id: String,
    display_name: Option<String>,
    tier: SubscriptionTier,
    balance: u64,
    conversations: usize,
}

#[derive(Serialize)]
struct WhoamiResult {
    user_id: String,
    display_name: Option<String>,
    tier: SubscriptionTier,
    logged_in: bool,
    unread: usize,
    balance: u64,
}

#[derive(Serialize)]
struct AccountsResult {
    accounts: Vec<String>,
}

/// Login as a user; their stored conversations and ledger become active
pub fn login(
    user_id: &str,
    display_name: Option<String>,
    tier: Option<&str>,
    config: &mut Config,
    stores: &mut Stores,
    output: &Output,
) -> Result<()> {
    let tier = tier
        .map(SubscriptionTier::parse_lenient)
        .unwrap_or_default();
    let actor = config.set_user(user_id, display_name.clone(), tier)?;

    stores.session.login(actor.clone());

    let result = LoginResult {
        user_id: actor.to_string(),
        display_name,
        tier,
        balance: stores.ledger.balance(),
        conversations: stores.conversations.conversations().len(),
    };

    output.success("login", result);
    Ok(())
}

/// Logout. Stored data stays on disk for the next login.
pub fn logout(config: &mut Config, stores: &mut Stores, output: &Output) -> Result<()> {
    config.clear_user()?;
    stores.session.logout();

    output.success_message("logout", "Logged out; stored data kept for the next login");
    Ok(())
}

/// Show current identity
pub fn whoami(config: &Config, stores: &mut Stores, output: &Output) -> Result<()> {
    let result = match stores.session.current_actor_id() {
        Some(actor) => WhoamiResult {
            user_id: actor.to_string(),
            display_name: config.display_name.clone(),
            tier: config.tier,
            logged_in: true,
            unread: stores.conversations.unread_count(),
            balance: stores.ledger.balance(),
        },
        None => WhoamiResult {
            user_id: String::new(),
            display_name: None,
            tier: SubscriptionTier::default(),
            logged_in: false,
            unread: 0,
            balance: 0,
        },
    };

    output.success("whoami", result);
    Ok(())
}

/// List users that have stored data
pub fn accounts(stores: &Stores, output: &Output) -> Result<()> {
    let mut accounts = BTreeSet::new();
    for store in [StoreName::Conversations, StoreName::Rewards] {
        accounts.extend(
            stores
                .persistence
                .stored_actors(store)?
                .iter()
                .map(ActorId::to_string),
        );
    }

    output.success(
        "accounts",
        AccountsResult {
            accounts: accounts.into_iter().collect(),
        },
    );
    Ok(())
}
