// ABOUTME: Entry point for the pqc-migrate tool.
// ABOUTME: Collects client credentials, runs the migration and prints a summary.

use anyhow::Result;
use clap::Parser;
use pqc_migrate::config::{MigrationConfig, TransportKind};
use pqc_migrate::prompt::{collect_credentials, DialoguerPrompt};
use pqc_migrate::transport::build_transport;
use pqc_migrate::{summary, CommandRunner, Orchestrator, SystemRunner};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "pqc-migrate",
    about = "Migrate this server and one client to post-quantum hybrid SSH keys"
)]
struct Cli {
    /// Config file (defaults to ~/.config/pqc-migrate/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Client IP address or hostname (prompted if omitted)
    #[arg(long)]
    host: Option<String>,

    /// Client username (prompted if omitted)
    #[arg(long, short = 'u')]
    user: Option<String>,

    /// Client password (prompted if omitted)
    #[arg(long, env = "PQC_MIGRATE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Client SSH port
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// SSH client implementation for remote sessions
    #[arg(long, value_enum)]
    transport: Option<TransportKind>,

    /// Fail instead of building OQS OpenSSH when it is missing
    #[arg(long)]
    no_install: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    pqc_log::init();

    let cli = Cli::parse();

    let mut config = MigrationConfig::load_or_default(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(transport) = cli.transport {
        config.transport = transport;
    }
    if cli.no_install {
        config.capability.auto_install = false;
    }

    let credentials = collect_credentials(&DialoguerPrompt, cli.host, cli.user, cli.password)?;

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let transport = build_transport(&config, runner.clone());
    let orchestrator = Orchestrator::new(config, runner, transport);

    let report = orchestrator.run(&credentials).await;

    println!();
    println!("{}", summary::render(&report));
    println!();

    let code = report.outcome.exit_code();
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
