//! CLI entry point for the ilabs prediction client.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use ilabs_api::{Client, ClientConfig, PredictParams};
use tracing::{debug, info, warn};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(command = ?args.command, endpoint = %args.endpoint, "CLI arguments parsed");

    let mut config = ClientConfig::anonymous()
        .with_endpoint(&args.endpoint)
        .with_user_agent(&args.user_agent);
    if let Some(user_key) = &args.user_key {
        config = config.with_user_key(user_key);
    }
    let client = Client::new(config).context("invalid client configuration")?;

    match args.command {
        Command::Ping => {
            let payload = client.ping().await.context("ping failed")?;
            println!("{payload}");
        }
        Command::Predict {
            domain,
            input,
            output,
            params,
        } => {
            let params: PredictParams = params.into_iter().collect();
            let content = tokio::fs::read(&input)
                .await
                .with_context(|| format!("failed to read {}", input.display()))?;

            info!(domain = %domain, input = %input.display(), "running prediction");
            let result = tokio::select! {
                result = client.run(&domain, content, Some(&params)) => {
                    result.with_context(|| format!("prediction on {} failed", input.display()))?
                }
                signal = tokio::signal::ctrl_c() => {
                    signal.context("failed to listen for Ctrl-C")?;
                    warn!("interrupted, cancelling the running task");
                    client.drain_cancellations().await;
                    anyhow::bail!("prediction on {} interrupted", input.display());
                }
            };

            match output {
                Some(path) => {
                    tokio::fs::write(&path, &result)
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), bytes = result.len(), "result written");
                }
                None => {
                    let mut stdout = io::stdout().lock();
                    stdout.write_all(&result)?;
                    stdout.flush()?;
                }
            }
        }
        Command::Status { domain, task_id } => {
            let report = client
                .poll_status(&domain, &task_id)
                .await
                .context("status request failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Cancel { domain, task_id } => {
            client
                .cancel(&domain, &task_id)
                .await
                .context("cancel request failed")?;
            info!(task_id = %task_id, "task cancelled");
        }
    }

    Ok(())
}
