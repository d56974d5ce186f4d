mod commands;
mod util;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::guard::GuardArgs;
use crate::commands::watch::WatchArgs;
use crate::util::{authed_config, client_config};

#[derive(Parser)]
#[command(name = "coachline", version, about = "Coachline CLI: inspect and drive the training plan lifecycle")]
struct Cli {
    /// API base URL
    #[arg(long, env = "COACHLINE_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// API key (falls back to stored credentials)
    #[arg(long, env = "COACHLINE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Read the plan status endpoint once
    Status,
    /// Read the profile snapshot once
    Profile,
    /// Evaluate the navigation guard for a given state, without contacting the API
    Guard(GuardArgs),
    /// Run the lifecycle engine and print state changes and redirects as JSON lines
    Watch(WatchArgs),
    /// Submit onboarding answers and print the resulting lifecycle state
    Onboard {
        /// JSON file with the answers ("-" for stdin)
        #[arg(long)]
        answers: String,
    },
    /// Remove stored credentials
    Logout,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coachline_client=info,coachline_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Health => commands::health::run(&client_config(&cli.api_url, None)).await,
        Commands::Guard(args) => commands::guard::run(args),
        Commands::Logout => commands::auth::logout(),
        Commands::Status => {
            commands::plan::status(&authed_config(&cli.api_url, cli.api_key)).await
        }
        Commands::Profile => {
            commands::plan::profile(&authed_config(&cli.api_url, cli.api_key)).await
        }
        Commands::Onboard { answers } => {
            commands::plan::onboard(&authed_config(&cli.api_url, cli.api_key), &answers).await
        }
        Commands::Watch(args) => {
            commands::watch::run(&authed_config(&cli.api_url, cli.api_key), args).await
        }
    };

    std::process::exit(code);
}
