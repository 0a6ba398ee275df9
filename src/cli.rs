use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Loan application forms - resolve, validate and replay conditional form schemas
#[derive(Parser, Debug, Clone)]
#[command(name = "loanform", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "LOANFORM_CONFIG", default_value = "loanform.toml", global = true)]
    pub config: PathBuf,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "LOANFORM_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Directory of additional tab schemas
    #[arg(long, env = "LOANFORM_SCHEMAS_DIR", global = true)]
    pub schemas_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List the available tabs
    Tabs,

    /// Print the effective schema of a tab, optionally for a given document
    Schema {
        /// Tab name (defaults to form.default_tab)
        #[arg(short, long)]
        tab: Option<String>,

        /// Form document (JSON, YAML or TOML)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Validate a document and print the errors
    Validate {
        #[arg(short, long)]
        tab: Option<String>,

        #[arg(short, long)]
        data: PathBuf,
    },

    /// Submit a document; exits non-zero when rejected
    Submit {
        #[arg(short, long)]
        tab: Option<String>,

        #[arg(short, long)]
        data: PathBuf,
    },

    /// Replay a JSON Lines event log against a fresh session
    Replay {
        #[arg(short, long)]
        tab: Option<String>,

        #[arg(short, long)]
        events: PathBuf,
    },
}

impl Command {
    /// The `--tab` argument, if the command takes one
    pub fn tab(&self) -> Option<&str> {
        match self {
            Command::Tabs => None,
            Command::Schema { tab, .. }
            | Command::Validate { tab, .. }
            | Command::Submit { tab, .. }
            | Command::Replay { tab, .. } => tab.as_deref(),
        }
    }
}
