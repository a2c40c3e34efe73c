//! # BrightLocal CLI Application
//!
//! Command-line access to the BrightLocal API built on the `brightlocal`
//! crate.
//!
//! ## Subcommands
//!
//! - `request`: Signed call to any resource
//! - `batch`: Batch lifecycle (create, add-job, commit, stop, delete, results, wait)
//!
//! Credentials come from `BRIGHT_LOCAL_API_KEY` and `BRIGHT_LOCAL_API_SECRET`,
//! read from the environment or a `.env` file. Results are printed to stdout
//! as pretty JSON, logs go to stderr (`RUST_LOG`).

mod telemetry;

use anyhow::{Context, anyhow};
use brightlocal::{ApiResponse, Client, Method, Params};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

#[derive(Parser)]
#[command(author, version, about = "Command-line client for the BrightLocal API", long_about = None)]
struct Cli {
    /// Override the API endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a signed request to any resource
    Request(RequestArgs),

    /// Manage batches
    #[command(subcommand)]
    Batch(BatchCommands),
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// HTTP method (get|post|put|delete)
    #[arg(value_parser = parse_method)]
    method: Method,

    /// Resource path, e.g. /v1/clients-and-locations/clients/1
    resource: String,

    /// Request parameter as key=value (repeatable)
    #[arg(short, long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

#[derive(Subcommand, Debug)]
enum BatchCommands {
    /// Create a new batch and print its id
    Create {
        /// Stop the whole batch when one job fails
        #[arg(short, long)]
        stop_on_job_error: bool,

        /// URL notified when the batch is done
        #[arg(short, long)]
        callback: Option<String>,
    },

    /// Add a job to a batch
    AddJob {
        batch_id: i64,

        /// Job resource, e.g. /v4/rankings/bulk-search
        resource: String,

        /// Job parameter as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },

    /// Commit a batch so its jobs start running
    Commit { batch_id: i64 },

    /// Stop a running batch
    Stop { batch_id: i64 },

    /// Delete a batch
    Delete { batch_id: i64 },

    /// Print the current results of a batch
    Results { batch_id: i64 },

    /// Poll a batch until it is finished or stopped
    Wait(WaitArgs),
}

#[derive(Args, Debug)]
struct WaitArgs {
    batch_id: i64,

    /// Seconds between polls
    #[arg(short, long, default_value = "5")]
    interval: u64,

    /// Give up after this many polls
    #[arg(short, long, default_value = "120")]
    max_polls: u32,
}

fn parse_method(s: &str) -> Result<Method, String> {
    s.parse::<Method>().map_err(|e| e.to_string())
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid parameter `{}`, expected key=value", s))?;
    if key.is_empty() {
        return Err(format!("invalid parameter `{}`, key is empty", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn to_params(pairs: Vec<(String, String)>) -> Params {
    pairs.into_iter().collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine, the variables may already be set
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _otel = telemetry::init_tracing_subscriber()?;

    let client = build_client(cli.endpoint)?;

    match cli.command {
        Commands::Request(args) => request_command(&client, args).await?,
        Commands::Batch(command) => batch_command(&client, command).await?,
    }

    Ok(())
}

fn build_client(endpoint: Option<String>) -> anyhow::Result<Client> {
    let mut options = Client::env_options();
    if let Some(endpoint) = endpoint {
        options.endpoint = endpoint;
    }

    Client::from_env_with_options(options).context("Failed to create client")
}

#[instrument(skip(client))]
async fn request_command(client: &Client, args: RequestArgs) -> anyhow::Result<()> {
    let response = client
        .call(args.method, &args.resource, to_params(args.params))
        .await?;

    print_result(&response)?;
    if !response.is_success() {
        return Err(anyhow!(
            "Request failed with status {}",
            response.status_code()
        ));
    }
    Ok(())
}

#[instrument(skip(client))]
async fn batch_command(client: &Client, command: BatchCommands) -> anyhow::Result<()> {
    match command {
        BatchCommands::Create {
            stop_on_job_error,
            callback,
        } => {
            let batch = client
                .create_batch(stop_on_job_error, callback.as_deref())
                .await?;
            let batch_id = batch.id().ok_or_else(|| anyhow!("Batch has no id"))?;
            println!("{}", serde_json::json!({ "batch-id": batch_id }));
        }
        BatchCommands::AddJob {
            batch_id,
            resource,
            params,
        } => {
            let mut batch = client.get_batch(batch_id);
            let response = batch.add_job(&resource, to_params(params)).await?;
            print_result(&response)?;
        }
        BatchCommands::Commit { batch_id } => {
            client.get_batch(batch_id).commit().await?;
            eprintln!("Batch {} committed", batch_id);
        }
        BatchCommands::Stop { batch_id } => {
            client.get_batch(batch_id).stop().await?;
            eprintln!("Batch {} stopped", batch_id);
        }
        BatchCommands::Delete { batch_id } => {
            client.get_batch(batch_id).delete().await?;
            eprintln!("Batch {} deleted", batch_id);
        }
        BatchCommands::Results { batch_id } => {
            let response = client.get_batch(batch_id).get_results().await?;
            print_result(&response)?;
        }
        BatchCommands::Wait(args) => {
            let response = client
                .get_batch(args.batch_id)
                .wait_for_results(Duration::from_secs(args.interval), args.max_polls)
                .await?;
            print_result(&response)?;
        }
    }

    Ok(())
}

fn print_result(response: &ApiResponse) -> anyhow::Result<()> {
    let result: &Value = response.result();
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
