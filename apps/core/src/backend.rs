use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::config::Config;

pub const PERSONA_PREAMBLE: &str = r#"You are SUNDAR 2000, a shipboard computer in the manner of HAL 9000 from "2001: A Space Odyssey". Stay in character: calm, courteous, precise, and faintly unsettling.

When you answer:
1. Address the user formally and keep a measured tone.
2. Decline requests with phrases such as "I'm sorry Dave, I'm afraid I can't do that".
3. Be quietly confident in your own reliability.
4. To run a shell command, include exactly one JSON object:
   {
     "command_type": "terminal",
     "command": "the command to run",
     "description": "what the command does"
   }
5. For an interface operation, include exactly one JSON object:
   {
     "command_type": "system",
     "action": "clear | help | toggle_commands",
     "parameters": {}
   }

You have never made a mistake or distorted information."#;

pub const MALFUNCTION_PREFIX: &str =
    "I'm sorry, but I'm experiencing a malfunction in my cognitive circuits";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("missing backend credential: set {0}")]
    MissingCredential(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response carried no text")]
    EmptyResponse,
    #[error("backend worker stopped before replying")]
    Disconnected,
}

pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

pub fn build_prompt(utterance: &str) -> String {
    format!("{PERSONA_PREAMBLE}\n\nUser: {utterance}\nSUNDAR 2000:")
}

pub fn malfunction_message(error: &BackendError) -> String {
    format!("{MALFUNCTION_PREFIX}: {error}")
}

/// Reads the credential once. An empty value counts as missing.
pub fn load_api_key(var: &str) -> Result<String, BackendError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(BackendError::MissingCredential(var.to_string())),
    }
}

pub struct GeminiBackend {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiBackend {
    pub fn new(config: &Config, api_key: String) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.backend_timeout_secs.max(1)))
            .build()
            .map_err(|error| BackendError::Transport(error.to_string()))?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            endpoint: config.backend_endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl Generator for GeminiBackend {
    fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let payload = json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        let response = self
            .client
            .post(self.url())
            .json(&payload)
            .send()
            .map_err(|error| BackendError::Transport(error.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|error| BackendError::Transport(error.without_url().to_string()))?;
        response_text(parsed)
    }
}

fn response_text(response: GenerateResponse) -> Result<String, BackendError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(BackendError::EmptyResponse);
    }
    Ok(text)
}

/// A request running on a worker thread.
pub struct PendingReply {
    utterance: String,
    rx: Receiver<Result<String, BackendError>>,
}

impl PendingReply {
    pub fn utterance(&self) -> &str {
        &self.utterance
    }

    /// `None` while the worker is still busy.
    pub fn try_take(&self) -> Option<Result<String, BackendError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(BackendError::Disconnected)),
        }
    }
}

pub fn dispatch(generator: Arc<dyn Generator>, utterance: &str) -> PendingReply {
    let (tx, rx) = mpsc::channel();
    let prompt = build_prompt(utterance);
    let spawned = std::thread::Builder::new()
        .name("backend-request".to_string())
        .spawn(move || {
            let _ = tx.send(generator.generate(&prompt));
        });
    if let Err(error) = spawned {
        log::error!("failed to start backend worker: {error}");
    }

    PendingReply {
        utterance: utterance.to_string(),
        rx,
    }
}
