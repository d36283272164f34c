use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use solace::{config, gateway};

#[derive(Parser)]
#[command(name = "solace")]
#[command(about = "Companion chat backend with a bounded conversation context")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat gateway
    Serve {
        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Auth token (required for non-loopback)
        #[arg(long, env = "SOLACE_TOKEN")]
        token: Option<String>,
    },

    /// Show runtime status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, bind, token } => {
            let mut config = config::load()?;
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(bind) = bind {
                config.gateway.bind = bind;
            }
            gateway::run(config, token).await
        }
        Commands::Status => {
            println!("solace v{}", env!("CARGO_PKG_VERSION"));
            println!("status: idle");
            Ok(())
        }
    }
}
