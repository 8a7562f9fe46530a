use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use switchboard_core::utils::{DEFAULT_HOST, DEFAULT_PORT};
use switchboard_server::{DuplicatePolicy, RelayConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "switchboard", version, about = "WebRTC signaling relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve {
        #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
        host: String,

        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// `reject` or `rename` a join that claims an identity already in use.
        #[arg(long, env = "DUPLICATE_POLICY", default_value_t = DuplicatePolicy::Reject)]
        duplicate_policy: DuplicatePolicy,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Serve {
            host,
            port,
            duplicate_policy,
        } => {
            let config = RelayConfig {
                host,
                port,
                duplicate_policy,
            };

            println!("{}", "Starting switchboard relay...".green().bold());
            println!("   Address:    ws://{}:{}", config.host, config.port);
            println!("   Duplicates: {}", config.duplicate_policy.to_string().cyan());

            info!("Configuration: {:?}", config);
            switchboard_server::serve(config).await?;

            println!("{}", "Relay stopped.".yellow());
        }
    }

    Ok(())
}
