mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    agency::AgencySubcommand, case::CaseSubcommand, config::ConfigSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "caseflow",
    about = "Reject cases back to the queue and reallocate them to the next trusted agency",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .caseflow/)
    #[arg(long, global = true, env = "CASEFLOW_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .caseflow/, the default config and the database
    Init,

    /// Reject a case on behalf of an agency and try to reallocate it
    Reject {
        /// Case to reject
        #[arg(long, alias = "case_id")]
        case_id: String,
        /// Free-text rejection reason recorded in the audit trail
        #[arg(long)]
        reason: String,
        /// Agency handing the case back
        #[arg(long, alias = "rejected_by")]
        rejected_by: String,
    },

    /// Inspect and seed cases
    Case {
        #[command(subcommand)]
        subcommand: CaseSubcommand,
    },

    /// Inspect the agency registry
    Agency {
        #[command(subcommand)]
        subcommand: AgencySubcommand,
    },

    /// Validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Check a proof-of-payment document (exit 0 when valid)
    VerifyProof {
        /// Path or name of the document
        #[arg(long)]
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Reject {
            case_id,
            reason,
            rejected_by,
        } => cmd::reject::run(&root, &case_id, &reason, &rejected_by, cli.json),
        Commands::Case { subcommand } => cmd::case::run(&root, subcommand, cli.json),
        Commands::Agency { subcommand } => cmd::agency::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::VerifyProof { file } => cmd::verify::run(&file, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
