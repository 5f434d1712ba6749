//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ilabs_api::{DEFAULT_ENDPOINT, DEFAULT_USER_AGENT};
use ilabs_api::config::{ENV_ENDPOINT, ENV_USER_AGENT, ENV_USER_KEY};

/// Run InnodataLabs prediction microservices from the command line.
#[derive(Parser, Debug)]
#[command(name = "ilabs")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// User key for authenticated requests
    #[arg(long, env = ENV_USER_KEY, hide_env_values = true)]
    pub user_key: Option<String>,

    /// Service endpoint
    #[arg(long, env = ENV_ENDPOINT, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// User-Agent sent with authenticated requests
    #[arg(long, env = ENV_USER_AGENT, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the endpoint is reachable (no user key needed)
    Ping,

    /// Upload a file, run a prediction on it and fetch the result
    Predict {
        /// Prediction domain
        domain: String,

        /// Input file to process
        input: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Query parameter for the prediction service (repeatable)
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Print the status of a task
    Status {
        /// Prediction domain
        domain: String,
        /// Task id
        task_id: String,
    },

    /// Cancel a task
    Cancel {
        /// Prediction domain
        domain: String,
        /// Task id
        task_id: String,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    ilabs_api::PredictParams::parse_pair(raw)
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))
}
