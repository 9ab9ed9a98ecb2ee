use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use prefix_authz::authz::web::{self, AuthzService};
use prefix_authz::authz::{dot, loader, Rulebase, SharedRulebase};
use prefix_authz::settings::Settings;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "prefix-authz",
    version,
    about = "Prefix/wildcard ACL decision engine"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve decisions over HTTP
    Serve,
    /// Decide a single subject/resource pair and print the result
    Check {
        #[arg(short, long)]
        subject: String,
        #[arg(short, long)]
        resource: String,
    },
    /// Print the rule trie in Graphviz DOT format
    Graph,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;
    tracing::debug!(?settings, "Loaded configuration");

    let default_access = settings.access.default_permissions()?;
    let rulebase = loader::load_policies(&settings.policies.dir, default_access, settings.access.mode)?;

    match cli.command {
        Command::Serve => serve(cli.config, settings, rulebase).await,
        Command::Check { subject, resource } => {
            let decision = rulebase.decide(&subject, &resource);
            println!("{decision} ({})", decision.bits());
            Ok(())
        }
        Command::Graph => {
            print!("{}", dot::render(rulebase.trie()));
            Ok(())
        }
    }
}

async fn serve(config_path: String, settings: Settings, rulebase: Rulebase) -> Result<()> {
    let state = Arc::new(AuthzService {
        rulebase: SharedRulebase::new(rulebase),
        config_path,
    });

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await.into_diagnostic()?;
    tracing::info!(%addr, "Serving authorization decisions");

    axum::serve(listener, web::router(state))
        .await
        .into_diagnostic()?;
    Ok(())
}
