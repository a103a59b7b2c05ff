use serde::{Deserialize, Serialize};

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => ROLE_SYSTEM,
            Role::User => ROLE_USER,
            Role::Assistant => ROLE_ASSISTANT,
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            ROLE_SYSTEM => Ok(Role::System),
            ROLE_USER => Ok(Role::User),
            ROLE_ASSISTANT => Ok(Role::Assistant),
            other => Err(format!("Unknown chat role: {other}")),
        }
    }
}

/// A single turn in a conversation, serialized verbatim into the request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

impl std::str::FromStr for ReasoningEffort {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(ReasoningEffort::Minimal),
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            other => Err(format!(
                "Invalid reasoning effort '{other}' (expected minimal, low, medium or high)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Low,
    Medium,
    High,
}

/// Optional sampling, penalty and reasoning knobs.
///
/// Every field is optional; `None` means "let the server decide". The request
/// builder additionally drops values that equal the provider's neutral default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatParameters {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub repetition_penalty: Option<f64>,
    pub min_p: Option<f64>,
    pub top_a: Option<f64>,
    pub reasoning_enabled: Option<bool>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub reasoning_max_tokens: Option<u32>,
    pub reasoning_exclude: Option<bool>,
    pub verbosity: Option<Verbosity>,
}

/// Everything needed for one chat-completion call. Not retained after the call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCallRequest {
    pub messages: Vec<ChatMessage>,
    pub model_id: String,
    pub parameters: ChatParameters,
    pub api_key: String,
    pub stream: bool,
}

impl ModelCallRequest {
    pub fn new(
        model_id: impl Into<String>,
        messages: Vec<ChatMessage>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            messages,
            model_id: model_id.into(),
            parameters: ChatParameters::default(),
            api_key: api_key.into(),
            stream: false,
        }
    }

    pub fn with_parameters(mut self, parameters: ChatParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletionResult {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub model_id: String,
}
