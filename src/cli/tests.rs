use super::*;
use crate::cli::auth::{read_key, store_key};
use crate::cli::model_list::describe_model;
use crate::cli::say::SayOptions;
use crate::cli::set_model::apply_default_model;
use crate::core::config::Config;
use crate::api::{ModelInfo, ModelPricing};
use crate::core::keyring::{CredentialStore, MemoryCredentialStore};
use std::io::Cursor;
use tempfile::tempdir;

mod test_helpers {
    use super::*;

    pub(super) fn parse_args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv)
            .unwrap_or_else(|err| panic!("argv={argv:?} should parse successfully: {err}"))
    }
}

use test_helpers::parse_args;

#[test]
fn say_joins_trailing_words_and_reads_flags() {
    let argv = [
        "routechat",
        "-v",
        "say",
        "-m",
        "openai/gpt-4o",
        "--temperature",
        "0.4",
        "--max-tokens",
        "128",
        "--reasoning-effort",
        "high",
        "why",
        "is",
        "the",
        "sky",
        "blue?",
    ];
    let args = parse_args(&argv);
    assert_eq!(args.verbose, 1);

    match args.command {
        Commands::Say {
            prompt,
            model,
            no_stream,
            temperature,
            max_tokens,
            reasoning_effort,
        } => {
            assert_eq!(prompt.join(" "), "why is the sky blue?");
            assert_eq!(model.as_deref(), Some("openai/gpt-4o"));
            assert!(!no_stream);
            assert_eq!(temperature, Some(0.4));
            assert_eq!(max_tokens, Some(128));
            assert_eq!(reasoning_effort, Some(ReasoningEffort::High));
        }
        _ => panic!("expected say subcommand for argv={argv:?}"),
    }
}

#[test]
fn say_accepts_no_stream_and_repeated_verbosity() {
    let argv = ["routechat", "say", "--no-stream", "-vv", "hello"];
    let args = parse_args(&argv);
    assert_eq!(args.verbose, 2);
    assert!(matches!(
        args.command,
        Commands::Say { no_stream: true, .. }
    ));
}

#[test]
fn say_requires_a_prompt() {
    assert!(Args::try_parse_from(["routechat", "say"]).is_err());
}

#[test]
fn invalid_reasoning_effort_is_rejected() {
    assert!(
        Args::try_parse_from(["routechat", "say", "--reasoning-effort", "max", "hi"]).is_err()
    );
}

#[test]
fn simple_subcommands_parse() {
    assert!(matches!(parse_args(&["routechat", "models"]).command, Commands::Models));
    assert!(matches!(parse_args(&["routechat", "auth"]).command, Commands::Auth));
    assert!(matches!(parse_args(&["routechat", "deauth"]).command, Commands::Deauth));
}

#[test]
fn reasoning_effort_enables_reasoning() {
    let options = SayOptions {
        prompt: vec!["hi".to_string()],
        model: None,
        stream: true,
        temperature: Some(0.2),
        max_tokens: None,
        reasoning_effort: Some(ReasoningEffort::Low),
    };
    let parameters = options.parameters();
    assert_eq!(parameters.temperature, Some(0.2));
    assert_eq!(parameters.reasoning_enabled, Some(true));
    assert_eq!(parameters.reasoning_effort, Some(ReasoningEffort::Low));

    let plain = SayOptions {
        reasoning_effort: None,
        ..options
    };
    assert_eq!(plain.parameters().reasoning_enabled, None);
}

#[test]
fn every_error_has_a_summary() {
    let errors = [
        ChatError::ApiKeyMissing,
        ChatError::ApiKeyInvalid,
        ChatError::NetworkUnavailable("dns".to_string()),
        ChatError::RateLimited {
            retry_after_seconds: None,
        },
        ChatError::InsufficientCredits,
        ChatError::ModelUnavailable {
            model_id: "m".to_string(),
        },
        ChatError::ServerError {
            status: 500,
            message: "boom".to_string(),
        },
        ChatError::Decoding("eof".to_string()),
        ChatError::Streaming("reset".to_string()),
        ChatError::InvalidConfiguration("bad url".to_string()),
        ChatError::Cancelled,
    ];
    for err in errors {
        let (summary, _) = describe_error(&err);
        assert!(!summary.is_empty(), "empty summary for {err:?}");
    }
}

#[test]
fn error_descriptions_use_structured_fields() {
    let (_, hint) = describe_error(&ChatError::RateLimited {
        retry_after_seconds: Some(12),
    });
    assert_eq!(hint.as_deref(), Some("Try again in 12 seconds"));

    let (summary, _) = describe_error(&ChatError::ModelUnavailable {
        model_id: "anthropic/claude-3.5-sonnet".to_string(),
    });
    assert!(summary.contains("anthropic/claude-3.5-sonnet"));

    let (summary, hint) = describe_error(&ChatError::ServerError {
        status: 500,
        message: "Internal error".to_string(),
    });
    assert_eq!(summary, "Server error 500: Internal error");
    assert_eq!(hint, None);

    let (_, hint) = describe_error(&ChatError::ApiKeyInvalid);
    assert!(hint.unwrap().contains("API key"));
}

#[test]
fn read_key_trims_and_rejects_blank_input() {
    assert_eq!(
        read_key(Cursor::new("  sk-or-v1-abc \n")).unwrap(),
        "sk-or-v1-abc"
    );
    assert!(read_key(Cursor::new("\n")).is_err());
    assert!(read_key(Cursor::new("")).is_err());
}

#[test]
fn store_key_saves_into_the_store() {
    let store = MemoryCredentialStore::default();
    store_key(&store, "sk-or-v1-abc").unwrap();
    assert_eq!(store.load_key().unwrap().as_deref(), Some("sk-or-v1-abc"));
}

#[test]
fn model_description_includes_known_details() {
    let model = ModelInfo {
        id: "openai/gpt-4o".to_string(),
        name: Some("GPT-4o".to_string()),
        created: Some(1_715_367_049),
        context_length: Some(128_000),
        pricing: Some(ModelPricing {
            prompt: Some("0.000005".to_string()),
            completion: Some("0.000015".to_string()),
        }),
    };
    assert_eq!(
        describe_model(&model),
        vec![
            "  • openai/gpt-4o".to_string(),
            "    Name: GPT-4o".to_string(),
            "    Created: 2024-05-10 18:50:49 UTC".to_string(),
            "    Context: 128000 tokens".to_string(),
            "    Pricing: 0.000005 prompt / 0.000015 completion per token".to_string(),
        ]
    );

    let bare = ModelInfo {
        id: "x/y".to_string(),
        name: Some("x/y".to_string()),
        created: None,
        context_length: None,
        pricing: None,
    };
    assert_eq!(describe_model(&bare), vec!["  • x/y".to_string()]);

    let millis = ModelInfo {
        created: Some(1_715_367_049_000),
        ..bare
    };
    assert_eq!(
        describe_model(&millis)[1],
        "    Created: 2024-05-10 18:50:49 UTC"
    );
}

#[test]
fn set_model_parses_with_and_without_a_model() {
    match parse_args(&["routechat", "set-model", "anthropic/claude-3.5-sonnet"]).command {
        Commands::SetModel { model } => {
            assert_eq!(model.as_deref(), Some("anthropic/claude-3.5-sonnet"))
        }
        _ => panic!("expected set-model subcommand"),
    }
    assert!(matches!(
        parse_args(&["routechat", "set-model"]).command,
        Commands::SetModel { model: None }
    ));
}

#[test]
fn default_model_is_set_and_cleared() {
    let mut config = Config::default();
    assert_eq!(
        apply_default_model(&mut config, Some("  openai/gpt-4o ".to_string())),
        "Set default-model to: openai/gpt-4o"
    );
    assert_eq!(config.default_model.as_deref(), Some("openai/gpt-4o"));

    assert_eq!(
        apply_default_model(&mut config, Some("   ".to_string())),
        "Unset default-model"
    );
    assert_eq!(config.default_model, None);
}

#[test]
fn default_model_survives_a_save_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::load_from_path(&path).unwrap();
    config.base_url = Some("https://router.test/api/v1".to_string());
    apply_default_model(&mut config, Some("openai/gpt-4o".to_string()));
    config.save_to_path(&path).unwrap();

    let reloaded = Config::load_from_path(&path).unwrap();
    assert_eq!(reloaded.default_model.as_deref(), Some("openai/gpt-4o"));
    assert_eq!(reloaded.base_url.as_deref(), Some("https://router.test/api/v1"));
}
