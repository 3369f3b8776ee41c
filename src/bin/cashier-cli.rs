use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::sync::broadcast::{self, error::RecvError};

use cashier::api::{CashierApi, HttpCashierApi, PreparedWithdrawal, StatusRequest};
use cashier::blockchain::{BlockchainError, ContractSubmitter, Wallet, WithdrawSubmitter};
use cashier::config::{load_config, CashierConfig};
use cashier::lifecycle::wait_for_signal;
use cashier::observability::logging;
use cashier::realtime::{
    ChatMessage, ConnectionManager, ConnectionStatus, MessageKind, PushMessage, RealtimeHub,
    WsConnector,
};
use cashier::withdraw::{TokenInfo, UserProfile, WithdrawEvent, WithdrawOrchestrator, WithdrawOutcome};

#[derive(Parser)]
#[command(name = "cashier-cli")]
#[command(about = "Command-line client for the cashier service", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User identity sent to the realtime and REST services.
    #[arg(short, long, env = "CASHIER_USER_ID")]
    identity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print push notifications until Ctrl-C
    Watch,
    /// Send one chat line and print replies until Ctrl-C
    Chat {
        text: String,
    },
    /// Run one withdrawal and wait for its outcome
    Withdraw {
        #[arg(long)]
        token: String,
        #[arg(long)]
        token_address: String,
        #[arg(long)]
        network: u64,
        #[arg(long, default_value = "ERC20")]
        token_type: String,
        #[arg(long, default_value = "0")]
        fee: Decimal,
        #[arg(long)]
        balance: Decimal,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        to: String,
        /// Route to manual approval instead of submitting on-chain
        #[arg(long)]
        manual: bool,
    },
    /// Query the status of a withdrawal hash
    Status {
        hash: String,
    },
}

/// Submitter for manual withdrawals, which never reach the chain.
struct NoWallet;

#[async_trait]
impl WithdrawSubmitter for NoWallet {
    async fn submit(&self, _: &PreparedWithdrawal, _: Decimal) -> Result<String, BlockchainError> {
        Err(BlockchainError::Wallet("no wallet configured".to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CashierConfig::default(),
    };
    logging::init_logging(&config.observability.log_level);

    match cli.command {
        Commands::Watch => watch(&config, &cli.identity).await?,
        Commands::Chat { text } => chat(&config, &cli.identity, text).await?,
        Commands::Withdraw {
            token,
            token_address,
            network,
            token_type,
            fee,
            balance,
            amount,
            to,
            manual,
        } => {
            let token = TokenInfo {
                symbol: token,
                address: token_address,
                network,
                token_type,
                withdraw_fee: fee,
            };
            withdraw(&config, &cli.identity, token, balance, &amount, &to, manual).await?
        }
        Commands::Status { hash } => {
            let api = HttpCashierApi::from_config(&config.api)?;
            let status = api
                .transaction_status(&StatusRequest::withdraw(hash, cli.identity))
                .await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

async fn watch(config: &CashierConfig, identity: &str) -> Result<(), Box<dyn std::error::Error>> {
    let hub = RealtimeHub::init(&config.realtime, Arc::new(WsConnector::default()))?;
    let registry = hub.notifications().registry();
    let subscriptions = [MessageKind::Deposit, MessageKind::Withdraw, MessageKind::AutoStatus]
        .map(|kind| registry.subscribe(kind, print_push));

    hub.connect_notifications(identity);
    wait_for_signal().await;

    for subscription in subscriptions {
        subscription.unsubscribe();
    }
    hub.shutdown();
    Ok(())
}

async fn chat(config: &CashierConfig, identity: &str, text: String) -> Result<(), Box<dyn std::error::Error>> {
    let hub = RealtimeHub::init(&config.realtime, Arc::new(WsConnector::default()))?;
    let _replies = hub.chat().subscribe(|line| {
        let who = if line.is_agent { "agent" } else { line.sender.as_str() };
        println!("{}: {}", who, line.text);
    });

    hub.connect_chat(identity);
    wait_until_connected(hub.channel(cashier::realtime::ChannelKind::Chat)).await?;
    hub.chat().send(&ChatMessage {
        text,
        sender: identity.to_string(),
        is_agent: false,
    })?;

    wait_for_signal().await;
    hub.shutdown();
    Ok(())
}

async fn wait_until_connected(manager: &ConnectionManager) -> Result<(), Box<dyn std::error::Error>> {
    let connected = tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            match manager.status() {
                ConnectionStatus::Connected => return true,
                ConnectionStatus::Disconnected => return false,
                _ => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
    })
    .await
    .unwrap_or(false);

    if connected {
        Ok(())
    } else {
        Err(format!("{} channel did not connect", manager.channel()).into())
    }
}

async fn withdraw(
    config: &CashierConfig,
    identity: &str,
    token: TokenInfo,
    balance: Decimal,
    amount: &str,
    to: &str,
    manual: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let api: Arc<dyn CashierApi> = Arc::new(HttpCashierApi::from_config(&config.api)?);
    let submitter: Arc<dyn WithdrawSubmitter> = if manual {
        Arc::new(NoWallet)
    } else {
        let wallet = Wallet::from_env(config.blockchain.chain_id)?;
        let submitter = ContractSubmitter::new(&config.blockchain, wallet)?;
        submitter.verify_chain_id().await?;
        Arc::new(submitter)
    };

    let orchestrator =
        WithdrawOrchestrator::new(api, submitter, &config.withdraw, config.explorers.clone());
    let mut events = orchestrator.events();

    let hub = RealtimeHub::init(&config.realtime, Arc::new(WsConnector::default()))?;
    let push = orchestrator.attach_push(hub.notifications().registry());
    hub.connect_notifications(identity);

    orchestrator.select_token(token, balance).await?;
    orchestrator.set_amount(amount);
    orchestrator.set_destination(to);

    let profile = UserProfile {
        identity: identity.to_string(),
        has_pending_withdrawal: false,
        auto_withdraw_enabled: !manual,
    };

    match orchestrator.execute_withdraw(&profile).await? {
        WithdrawOutcome::Reserved => {
            println!("Withdrawal temporarily held for security review. Please try again later.");
        }
        WithdrawOutcome::Submitted(tx) => {
            println!("Submitted: {}", tx.hash);
            if let Some(link) = orchestrator.explorer_url() {
                println!("Explorer: {}", link);
            }
            if tx.hash.on_chain().is_some() {
                wait_for_outcome(&orchestrator, &mut events).await;
            } else {
                println!("Awaiting manual approval.");
            }
        }
    }

    push.unsubscribe();
    orchestrator.reset();
    hub.shutdown();
    Ok(())
}

async fn wait_for_outcome(
    orchestrator: &WithdrawOrchestrator,
    events: &mut broadcast::Receiver<WithdrawEvent>,
) {
    let mut progress = tokio::time::interval(Duration::from_secs(10));
    let signal = wait_for_signal();
    tokio::pin!(signal);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(WithdrawEvent::Confirmed { hash }) => {
                    println!("Confirmed: {}", hash);
                    return;
                }
                Ok(WithdrawEvent::Failed { hash }) => {
                    println!("Failed: {}", hash);
                    return;
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return,
            },
            _ = progress.tick() => {
                println!("Pending... ({}s)", orchestrator.countdown_remaining());
            }
            _ = &mut signal => return,
        }
    }
}

fn print_push(message: &PushMessage) {
    let line = match message {
        PushMessage::Deposit(n) => serde_json::to_string(n),
        PushMessage::Withdraw(n) => serde_json::to_string(n),
        PushMessage::AutoStatus(n) => serde_json::to_string(n),
        PushMessage::Chat(n) => serde_json::to_string(n),
    };
    match line {
        Ok(line) => println!("{} {}", message.kind().as_str(), line),
        Err(e) => eprintln!("Error: {}", e),
    }
}
