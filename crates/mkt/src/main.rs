use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::Stores;
use output::Output;

#[derive(Parser)]
#[command(name = "mkt")]
#[command(version)]
#[command(about = "Marketplace chat and reward coins from the command line")]
struct Cli {
    /// Output in JSON format (for agents/scripts)
    #[arg(short, long, global = true)]
    json: bool,

    /// Data directory (default: platform data dir/mkt)
    #[arg(long, global = true, env = "MKT_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Login as a user
    Login {
        /// User id
        user_id: String,
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
        /// Subscription tier: free, pro or premium
        #[arg(short, long)]
        tier: Option<String>,
    },

    /// Logout (stored data is kept)
    Logout,

    /// Show current identity
    Whoami,

    /// List users with stored data
    Accounts,

    /// Buyer/seller conversations
    #[command(subcommand)]
    Chat(ChatCommands),

    /// Reward coins
    #[command(subcommand)]
    Coins(CoinsCommands),
}

#[derive(Subcommand)]
enum ChatCommands {
    /// Start or reopen a conversation about a listing
    Start {
        /// Seller id
        seller_id: String,
        /// Listing id
        listing_id: String,
        /// Seller display name
        #[arg(long)]
        seller_name: Option<String>,
        /// Seller rating
        #[arg(long)]
        rating: Option<f32>,
        /// Listing title
        #[arg(long)]
        title: Option<String>,
        /// Listing image URL
        #[arg(long)]
        image: Option<String>,
    },

    /// List conversations
    List,

    /// Show a conversation
    Show {
        /// Conversation ID
        id: String,
    },

    /// Send a message
    Send {
        /// Conversation ID
        id: String,
        /// Message text
        text: String,
    },

    /// Record a message from the seller
    Receive {
        /// Conversation ID
        id: String,
        /// Sender id
        sender: String,
        /// Message text
        text: String,
    },

    /// Mark a conversation as read
    Read {
        /// Conversation ID
        id: String,
    },

    /// Count unread messages
    Unread,
}

#[derive(Subcommand)]
enum CoinsCommands {
    /// Show balance and monthly progress
    Balance,

    /// Show earn/spend history
    History,

    /// Earn coins (default amount: coins per transaction)
    Earn {
        /// Reason shown in history
        reason: String,
        /// Amount to earn
        #[arg(short, long)]
        amount: Option<u64>,
    },

    /// Spend coins
    Spend {
        /// Amount to spend
        amount: u64,
        /// Reason shown in history
        reason: String,
    },

    /// Spend coins on a premium upgrade
    RedeemPremium,

    /// Show the voucher discount for a tier
    Voucher {
        /// Tier (defaults to the logged-in user's tier)
        #[arg(short, long)]
        tier: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new(cli.json);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("MKT_LOG")
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run(cli, &output) {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli, output: &Output) -> anyhow::Result<()> {
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?
            .join("mkt"),
    };

    std::fs::create_dir_all(&data_dir)?;

    let mut config = config::Config::load(&data_dir)?;
    let mut stores = Stores::open(&config)?;

    match cli.command {
        Commands::Login { user_id, name, tier } => commands::identity::login(
            &user_id,
            name,
            tier.as_deref(),
            &mut config,
            &mut stores,
            output,
        ),
        Commands::Logout => commands::identity::logout(&mut config, &mut stores, output),
        Commands::Whoami => commands::identity::whoami(&config, &mut stores, output),
        Commands::Accounts => commands::identity::accounts(&stores, output),
        Commands::Chat(cmd) => match cmd {
            ChatCommands::Start {
                seller_id,
                listing_id,
                seller_name,
                rating,
                title,
                image,
            } => commands::chat::start(
                commands::chat::StartArgs {
                    seller_id,
                    listing_id,
                    seller_name,
                    rating,
                    title,
                    image,
                },
                &mut stores,
                output,
            ),
            ChatCommands::List => commands::chat::list(&mut stores, output),
            ChatCommands::Show { id } => commands::chat::show(&id, &mut stores, output),
            ChatCommands::Send { id, text } => {
                commands::chat::send(&id, &text, &mut stores, output)
            }
            ChatCommands::Receive { id, sender, text } => {
                commands::chat::receive(&id, &sender, &text, &mut stores, output)
            }
            ChatCommands::Read { id } => commands::chat::read(&id, &mut stores, output),
            ChatCommands::Unread => commands::chat::unread(&mut stores, output),
        },
        Commands::Coins(cmd) => match cmd {
            CoinsCommands::Balance => commands::coins::balance(&mut stores, output),
            CoinsCommands::History => commands::coins::history(&mut stores, output),
            CoinsCommands::Earn { reason, amount } => {
                commands::coins::earn(amount, &reason, &mut stores, output)
            }
            CoinsCommands::Spend { amount, reason } => {
                commands::coins::spend(amount, &reason, &mut stores, output)
            }
            CoinsCommands::RedeemPremium => commands::coins::redeem_premium(&mut stores, output),
            CoinsCommands::Voucher { tier } => {
                commands::coins::voucher(tier.as_deref(), &config, output)
            }
        },
    }
}
