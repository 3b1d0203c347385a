use anyhow::{Context, Result};
use market_stores::{ActorId, RewardConfig, SubscriptionTier};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logged-in user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Name shown to sellers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Subscription tier, drives the voucher discount
    #[serde(default)]
    pub tier: SubscriptionTier,

    /// Reward economy overrides
    #[serde(default)]
    pub rewards: RewardConfig,

    /// Path to the config file
    #[serde(skip)]
    pub path: PathBuf,
}

impl Config {
    /// Load config from the data directory
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join("config.json");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let mut config: Config = serde_json::from_str(&content)
                .context("Failed to parse config file")?;
            config.path = config_path;
            Ok(config)
        } else {
            Ok(Config {
                path: config_path,
                ..Default::default()
            })
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(&self.path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    pub fn set_user(
        &mut self,
        user_id: &str,
        display_name: Option<String>,
        tier: SubscriptionTier,
    ) -> Result<ActorId> {
        let actor = ActorId::new(user_id).context("Invalid user id")?;
        self.user_id = Some(actor.as_str().to_string());
        self.display_name = display_name;
        self.tier = tier;
        self.save()?;
        Ok(actor)
    }

    /// Forget the logged-in user and save. Stored data is kept.
    pub fn clear_user(&mut self) -> Result<()> {
        self.user_id = None;
        self.display_name = None;
        self.tier = SubscriptionTier::default();
        self.save()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn actor(&self) -> Result<Option<ActorId>> {
        self.user_id
            .as_deref()
            .map(|id| ActorId::new(id).context("Invalid user id in config"))
            .transpose()
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(|dir| dir.join("store"))
            .unwrap_or_else(|| PathBuf::from("store"))
    }
}
