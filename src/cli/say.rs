//! One-shot "say" command

use std::error::Error;
use std::io::{self, Write};

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::auth::api_key_for_cli;
use crate::core::chat_stream::StreamState;
use crate::core::client::ChatClient;
use crate::core::config::Config;
use crate::core::error::ChatError;
use crate::core::message::{ChatMessage, ChatParameters, ModelCallRequest, ReasoningEffort};
use crate::core::stream_event::StreamEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct SayOptions {
    pub prompt: Vec<String>,
    pub model: Option<String>,
    pub stream: bool,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl SayOptions {
    pub(crate) fn parameters(&self) -> ChatParameters {
        ChatParameters {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            reasoning_enabled: self.reasoning_effort.map(|_| true),
            reasoning_effort: self.reasoning_effort,
            ..ChatParameters::default()
        }
    }
}

pub async fn run_say(options: SayOptions) -> Result<(), Box<dyn Error>> {
    let prompt = options.prompt.join(" ");
    if prompt.trim().is_empty() {
        return Err("Usage: routechat say <prompt>".into());
    }

    let config = Config::load()?;
    let model = options
        .model
        .clone()
        .or_else(|| config.default_model.clone())
        .ok_or("No model selected. Pass -m MODEL or set default_model in the config file.")?;
    let api_key = api_key_for_cli()?;

    let client = ChatClient::from_config(&config)?;
    let request = ModelCallRequest::new(model, vec![ChatMessage::user(prompt)], api_key)
        .with_parameters(options.parameters());

    if options.stream {
        stream_reply(&client, request).await
    } else {
        complete_reply(&client, request).await
    }
}

async fn stream_reply(client: &ChatClient, request: ModelCallRequest) -> Result<(), Box<dyn Error>> {
    let mut stream = client.stream_message(request);
    let watcher = cancel_on_ctrl_c(stream.cancel_token());
    let mut stdout = io::stdout();

    while let Some(item) = stream.next().await {
        match item {
            Ok(StreamEvent::Delta(content)) => {
                write!(stdout, "{content}")?;
                stdout.flush()?;
            }
            Ok(StreamEvent::Error(err)) => {
                eprintln!("\n⚠️  {err}");
            }
            Ok(StreamEvent::Usage(usage)) => {
                debug!(
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "usage reported"
                );
            }
            Ok(StreamEvent::ModelId(model)) => debug!(%model, "served by"),
            Ok(StreamEvent::FinishReason(reason)) => debug!(%reason, "finished"),
            Ok(StreamEvent::GenerationId(_)) | Ok(StreamEvent::Done) => {}
            Err(err) => {
                watcher.abort();
                println!();
                return Err(err.into());
            }
        }
    }

    watcher.abort();
    println!();
    if stream.state() == StreamState::Cancelled {
        debug!("stream cancelled by user");
    }
    Ok(())
}

async fn complete_reply(
    client: &ChatClient,
    request: ModelCallRequest,
) -> Result<(), Box<dyn Error>> {
    let cancel_token = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(cancel_token.clone());
    let result = client.send_message(&request, &cancel_token).await;
    watcher.abort();

    match result {
        Ok(completion) => {
            println!("{}", completion.content);
            debug!(
                model = %completion.model_id,
                prompt_tokens = completion.prompt_tokens,
                completion_tokens = completion.completion_tokens,
                "completion received"
            );
            Ok(())
        }
        Err(ChatError::Cancelled) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Cancel `token` on the first Ctrl-C. Abort the handle once the call is over.
fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    token.cancel();
                }
            }
        }
    })
}
