//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod auth;
pub mod model_list;
pub mod say;
pub mod set_model;

#[cfg(test)]
mod tests;

use std::error::Error;

use clap::{ArgAction, Parser, Subcommand};

use crate::cli::auth::{run_auth, run_deauth};
use crate::cli::model_list::list_models;
use crate::cli::say::{run_say, SayOptions};
use crate::cli::set_model::run_set_model;
use crate::core::error::ChatError;
use crate::core::message::ReasoningEffort;
use crate::logging;

#[derive(Parser)]
#[command(name = "routechat")]
#[command(about = "Streaming chat completions from OpenRouter-style APIs")]
#[command(
    long_about = "routechat sends chat-completion requests to an OpenRouter-compatible API \
and prints the reply as it streams in.\n\n\
Authentication:\n\
  Use 'routechat auth' to store an API key in your system keyring.\n\n\
Environment Variables:\n\
  OPENROUTER_API_KEY    API key, used when the keyring has none\n\
  ROUTECHAT_BASE_URL    Override the API base URL for this run\n\
  RUST_LOG              Log filter (overrides -v)\n\n\
Controls:\n\
  Ctrl+C            Cancel the request in flight"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log output on stderr (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a single prompt and print the reply
    Say {
        /// Prompt text (multiple words are joined with spaces)
        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,

        /// Model to use instead of the configured default
        #[arg(short = 'm', long, value_name = "MODEL")]
        model: Option<String>,

        /// Wait for the whole reply instead of streaming it
        #[arg(long)]
        no_stream: bool,

        /// Sampling temperature
        #[arg(long, value_name = "T")]
        temperature: Option<f64>,

        /// Upper bound on generated tokens
        #[arg(long, value_name = "N")]
        max_tokens: Option<u32>,

        /// Reasoning effort for models that support it (minimal, low, medium, high)
        #[arg(long, value_name = "EFFORT")]
        reasoning_effort: Option<ReasoningEffort>,
    },
    /// List models available from the configured endpoint
    Models,
    /// Store an API key in the system keyring (read from stdin)
    Auth,
    /// Remove the stored API key
    Deauth,
    /// Save the default model in the config file (omit MODEL to clear it)
    SetModel {
        /// Model id, e.g. openai/gpt-4o
        #[arg(value_name = "MODEL")]
        model: Option<String>,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    let runtime = tokio::runtime::Runtime::new()?;
    if let Err(err) = runtime.block_on(async_main(args.command)) {
        report_error(err.as_ref());
        std::process::exit(1);
    }
    Ok(())
}

async fn async_main(command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Say {
            prompt,
            model,
            no_stream,
            temperature,
            max_tokens,
            reasoning_effort,
        } => {
            run_say(SayOptions {
                prompt,
                model,
                stream: !no_stream,
                temperature,
                max_tokens,
                reasoning_effort,
            })
            .await
        }
        Commands::Models => list_models().await,
        Commands::Auth => run_auth(),
        Commands::Deauth => run_deauth(),
        Commands::SetModel { model } => run_set_model(model),
    }
}

fn report_error(err: &(dyn Error + 'static)) {
    match err.downcast_ref::<ChatError>() {
        Some(chat_error) => {
            let (summary, hint) = describe_error(chat_error);
            eprintln!("❌ {summary}");
            if let Some(hint) = hint {
                eprintln!("💡 {hint}");
            }
        }
        None => eprintln!("❌ Error: {err}"),
    }
}

/// A short description of `err` plus an optional remediation hint.
pub fn describe_error(err: &ChatError) -> (String, Option<String>) {
    match err {
        ChatError::ApiKeyMissing => (
            "No API key configured".to_string(),
            Some("Run 'routechat auth' or set OPENROUTER_API_KEY".to_string()),
        ),
        ChatError::ApiKeyInvalid => (
            "The API key was rejected".to_string(),
            Some("Check your API key, then run 'routechat auth' again".to_string()),
        ),
        ChatError::NetworkUnavailable(detail) => (
            format!("Could not reach the API: {detail}"),
            Some("Check your network connection and the configured base_url".to_string()),
        ),
        ChatError::RateLimited {
            retry_after_seconds: Some(seconds),
        } => (
            "Rate limited by the API".to_string(),
            Some(format!("Try again in {seconds} seconds")),
        ),
        ChatError::RateLimited {
            retry_after_seconds: None,
        } => (
            "Rate limited by the API".to_string(),
            Some("Wait a moment and try again".to_string()),
        ),
        ChatError::InsufficientCredits => (
            "Your account has insufficient credits".to_string(),
            Some("Add credits to your account, or pick a free model".to_string()),
        ),
        ChatError::ModelUnavailable { model_id } => (
            format!("Model {model_id} is currently unavailable"),
            Some("Try again later or choose another model with -m".to_string()),
        ),
        ChatError::ServerError { status, message } => {
            (format!("Server error {status}: {message}"), None)
        }
        ChatError::Decoding(detail) => (format!("Unexpected response from the API: {detail}"), None),
        ChatError::Streaming(detail) => (
            format!("The response stream broke off: {detail}"),
            Some("Try again; partial output above may be incomplete".to_string()),
        ),
        ChatError::InvalidConfiguration(detail) => (
            format!("Invalid configuration: {detail}"),
            Some("Check base_url and related settings in the config file".to_string()),
        ),
        ChatError::Cancelled => ("Request cancelled".to_string(), None),
    }
}
