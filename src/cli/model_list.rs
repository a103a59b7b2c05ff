//! Model listing functionality

use std::error::Error;

use chrono::{DateTime, Utc};

use crate::api::ModelInfo;
use crate::cli::auth::api_key_for_cli;
use crate::core::client::ChatClient;
use crate::core::config::Config;

pub async fn list_models() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let api_key = api_key_for_cli()?;
    let client = ChatClient::from_config(&config)?;

    let endpoint = config.endpoint();
    println!("🤖 Available Models at {}", endpoint.base_url);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if let Some(default_model) = &config.default_model {
        println!("🎯 Default model: {default_model} (from config)");
        println!();
    }

    let models = client.list_models(&api_key).await?;
    if models.is_empty() {
        println!("No models found.");
        return Ok(());
    }

    println!("Found {} models (sorted newest first):", models.len());
    println!();
    for model in &models {
        for line in describe_model(model) {
            println!("{line}");
        }
        println!();
    }

    Ok(())
}

pub(crate) fn describe_model(model: &ModelInfo) -> Vec<String> {
    let mut lines = vec![format!("  • {}", model.id)];
    if let Some(name) = model.name.as_deref() {
        if !name.is_empty() && name != model.id {
            lines.push(format!("    Name: {name}"));
        }
    }
    if let Some(created) = model.created.and_then(format_created) {
        lines.push(format!("    Created: {created}"));
    }
    if let Some(context_length) = model.context_length {
        lines.push(format!("    Context: {context_length} tokens"));
    }
    if let Some(pricing) = &model.pricing {
        if let (Some(prompt), Some(completion)) =
            (pricing.prompt.as_deref(), pricing.completion.as_deref())
        {
            lines.push(format!("    Pricing: {prompt} prompt / {completion} completion per token"));
        }
    }
    lines
}

/// Some APIs report creation times in milliseconds, others in seconds.
fn format_created(created: u64) -> Option<String> {
    if created == 0 {
        return None;
    }
    let seconds = if created > 10_000_000_000 {
        created / 1000
    } else {
        created
    };
    let datetime = DateTime::<Utc>::from_timestamp(i64::try_from(seconds).ok()?, 0)?;
    Some(datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}
