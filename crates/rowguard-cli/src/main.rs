mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rowguard_core::RowguardConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rowguard")]
#[command(about = "Tenant-isolation tooling for Postgres row-level security")]
#[command(version)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "ROWGUARD_CONFIG", default_value = "rowguard.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit row-level security coverage and write the JSON report.
    Compliance {
        /// Schema to audit. Repeat to audit several; overrides `compliance.schemas`.
        #[arg(long = "schema")]
        schemas: Vec<String>,

        /// Report path, overriding `compliance.report_path`.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Bearer credential utilities.
    Token {
        #[command(subcommand)]
        cmd: TokenCommand,
    },

    /// Signing secret management.
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },

    /// Bind a principal, release it, and confirm the pooled connection comes back clean.
    Probe {
        /// Principal id to bind.
        #[arg(long)]
        principal: String,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Verify a credential against the configured secret.
    Verify {
        /// Token string, or path to a file containing it.
        #[arg(env = "ROWGUARD_TOKEN")]
        token: String,
    },

    /// Print the claims of a credential without checking its signature.
    Inspect {
        /// Token string, or path to a file containing it.
        #[arg(env = "ROWGUARD_TOKEN")]
        token: String,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate a new signing secret.
    Generate {
        /// Write the secret to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RowguardConfig::load_or_default(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Compliance { schemas, output } => {
            commands::compliance::run(config, schemas, output).await?;
        }
        Command::Token { cmd } => match cmd {
            TokenCommand::Verify { token } => commands::token::verify(&config, &token)?,
            TokenCommand::Inspect { token } => commands::token::inspect(&token)?,
        },
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { output } => commands::keys::generate(output)?,
        },
        Command::Probe { principal } => commands::probe::run(&config, &principal).await?,
    }

    Ok(())
}
