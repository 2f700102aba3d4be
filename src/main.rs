use algo_dashboard::{
    backend::{BackendClient, HttpTransport},
    config::ClientConfig,
    dashboard::{Dashboard, DashboardSnapshot, DerivedMetrics, NoticeLevel, NumLots},
    error::ApiError,
    session::{AuthFlow, FileTokenStorage, Route, SessionStore},
    Trade,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "algo-dashboard")]
#[command(author, version, about = "Terminal console for the algo trading backend")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Backend origin (endpoints live under <origin>/api)
    #[arg(long, global = true, env = "ALGO_API_URL")]
    api_url: Option<String>,

    /// Status poll period in seconds
    #[arg(long, global = true)]
    poll_interval: Option<u64>,

    /// Where the session token is stored
    #[arg(long, global = true, env = "ALGO_SESSION_FILE")]
    session_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "ALGO_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and log straight in
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "ALGO_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Drop the stored session
    Logout,

    /// Show account configuration and trading status
    Status,

    /// List trades with total P&L
    Trades,

    /// Save broker credentials and lot size (omitted values keep their current setting)
    SaveConfig {
        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        api_secret: Option<String>,

        #[arg(long)]
        num_lots: Option<String>,
    },

    /// Exchange a request token for a fresh access token
    GenerateToken {
        /// Request token from the broker login redirect
        request_token: String,
    },

    /// Start trading if stopped, stop it if running
    Toggle,

    /// Live view, refreshed every poll period until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("algo_dashboard=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }
    if let Some(secs) = args.poll_interval {
        config.poll_interval = Duration::from_secs(secs);
    }
    if let Some(path) = args.session_file {
        config.session_file = path;
    }
    config.validate()?;

    let session = SessionStore::open(FileTokenStorage::new(config.session_file.clone()))
        .context("Failed to open session storage")?;
    let transport = HttpTransport::new(config.api_base(), config.request_timeout)?;
    let client = BackendClient::new(Arc::new(transport), session.clone());

    info!("Backend: {}", config.api_base());

    match args.command {
        Commands::Login { username, password } => {
            let auth = AuthFlow::new(client);
            match auth.login(&username, &password).await {
                Ok(()) => println!("Logged in as {}", username),
                Err(e) => bail!(AuthFlow::failure_message(&e)),
            }
        }
        Commands::Register { username, password } => {
            let auth = AuthFlow::new(client);
            match auth.register(&username, &password).await {
                Ok(()) => println!("Registered and logged in as {}", username),
                Err(e) => bail!(AuthFlow::failure_message(&e)),
            }
        }
        Commands::Logout => {
            AuthFlow::new(client).logout();
            println!("Logged out");
        }
        Commands::Status => {
            let dashboard = mount(client, &config).await?;
            print_status(&dashboard.snapshot().await);
            dashboard.unmount().await;
        }
        Commands::Trades => {
            let dashboard = mount(client, &config).await?;
            dashboard.refresh().await?;
            let snapshot = dashboard.snapshot().await;
            print_trades(&snapshot.trades, &snapshot.metrics);
            dashboard.unmount().await;
        }
        Commands::SaveConfig {
            api_key,
            api_secret,
            num_lots,
        } => {
            let num_lots = num_lots.as_deref().map(NumLots::parse).transpose()?;
            let dashboard = mount(client, &config).await?;
            let edits = dashboard
                .config()
                .merge_edits(api_key, api_secret, num_lots)
                .await?;
            let result = dashboard
                .dispatcher()
                .update_credentials(edits.api_key, edits.api_secret, edits.num_lots)
                .await;
            finish(dashboard, result).await?;
        }
        Commands::GenerateToken { request_token } => {
            let dashboard = mount(client, &config).await?;
            let result = dashboard.dispatcher().generate_token(&request_token).await;
            finish(dashboard, result).await?;
        }
        Commands::Toggle => {
            let dashboard = mount(client, &config).await?;
            let result = dashboard.dispatcher().toggle_trading().await.map(|_| ());
            finish(dashboard, result).await?;
        }
        Commands::Watch => {
            let dashboard = mount(client, &config).await?;
            watch(&dashboard, config.poll_interval).await;
            let signed_out = !dashboard.is_mounted() && !session.is_authenticated();
            dashboard.unmount().await;
            if signed_out {
                bail!("Session expired, log in again");
            }
        }
    }

    Ok(())
}

async fn mount(client: BackendClient, config: &ClientConfig) -> Result<Dashboard> {
    if client.session().route(Some(Route::Dashboard)) == Route::Login {
        bail!("Not logged in. Run `algo-dashboard login` first");
    }
    match Dashboard::mount(client, config).await {
        Ok(dashboard) => Ok(dashboard),
        Err(e) if e.is_authorization() => bail!("Session expired, log in again"),
        Err(e) => Err(e.into()),
    }
}

/// Print the outcome of an action and unmount
async fn finish(dashboard: Dashboard, result: Result<(), ApiError>) -> Result<()> {
    dashboard.dispatcher().settled().await;
    let notice = dashboard.notices().current();
    let snapshot = dashboard.snapshot().await;
    dashboard.unmount().await;

    match result {
        Ok(()) => {
            print_status(&snapshot);
            Ok(())
        }
        Err(e) if e.is_authorization() => bail!("Session expired, log in again"),
        Err(e) => match notice.filter(|n| n.level == NoticeLevel::Failure) {
            Some(notice) => bail!(notice.text),
            None => Err(e.into()),
        },
    }
}

async fn watch(dashboard: &Dashboard, period: Duration) {
    loop {
        let snapshot = dashboard.snapshot().await;
        print_status(&snapshot);
        print_trades(&snapshot.trades, &snapshot.metrics);

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            _ = dashboard.closed() => {
                warn!("Dashboard closed");
                break;
            }
            _ = tokio::time::sleep(period) => {}
        }
    }
}

fn print_status(snapshot: &DashboardSnapshot) {
    println!("\n═══════════════════════════════════════════════════════════");
    let Some(status) = &snapshot.status else {
        println!("Loading...");
        return;
    };
    println!("Account:        {}", status.username);
    if let Some(config) = &snapshot.config {
        println!("API key:        {}", mask_key(&config.api_key));
        println!("API secret:     {}", mask_secret(&config.api_secret));
        println!("Lots:           {}", config.num_lots);
    }
    println!("Access token:   {}", status.access_token_label());
    println!("Token updated:  {}", status.token_updated_label());
    println!("Trading:        {}", status.trading_label());
    if let Some(notice) = &snapshot.notice {
        println!("> {}", notice.text);
    }
}

fn print_trades(trades: &[Trade], metrics: &DerivedMetrics) {
    println!(
        "\n{:<20} {:<4} {:<20} {:>9} {:>9} {:>6} {:>10} {:<7} {}",
        "SYMBOL", "SIDE", "ENTRY", "ENTRY PX", "EXIT PX", "QTY", "P&L", "STATUS", "REASON"
    );
    for trade in trades {
        println!(
            "{:<20} {:<4} {:<20} {:>9.2} {:>9} {:>6} {:>10} {:<7} {}",
            trade.symbol,
            trade.option_kind().to_string(),
            trade.entry_time.format("%Y-%m-%d %H:%M:%S"),
            trade.entry_price,
            trade
                .exit_price
                .map(|p| format!("{:.2}", p))
                .unwrap_or_else(|| "-".to_string()),
            trade.quantity,
            trade
                .pnl
                .map(|p| format!("{:.2}", p))
                .unwrap_or_else(|| "-".to_string()),
            trade.status.to_string(),
            trade.reason.as_deref().unwrap_or("-"),
        );
    }
    println!(
        "\nTotal P&L: {:.2} {} | Trades: {}",
        metrics.total_pnl,
        if metrics.is_profitable() { "▲" } else { "▼" },
        metrics.trade_count
    );
}

/// Key prefix, shown only when enough stays hidden
fn mask_key(value: &str) -> String {
    if value.is_empty() {
        return "(not set)".to_string();
    }
    if value.chars().count() <= 8 {
        return "********".to_string();
    }
    let visible: String = value.chars().take(4).collect();
    format!("{}****", visible)
}

fn mask_secret(value: &str) -> &'static str {
    if value.is_empty() {
        "(not set)"
    } else {
        "********"
    }
}
