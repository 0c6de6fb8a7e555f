//! Spanish rewriting through an OpenRouter chat-completion endpoint.
//!
//! Two operations, one per field: the article body gets a professional
//! sports-editor persona and a long timeout; the title gets a headline-writer
//! persona and a short one. Both run at low temperature so repeated calls on
//! the same input stay close in register.
//!
//! Quality gating lives in [`with_retry`]: a single combinator that re-invokes
//! an operation with the same input until the result passes a predicate or
//! the attempt budget runs out. The orchestrator decides what a rejection
//! means (abort for the body, fall back to the original title).

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::normalize::{strip_emphasis, strip_stray_letters, wrap_headings};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

const BODY_SYSTEM_PROMPT: &str = "Eres un redactor profesional de deportes. \
    Responde siempre en español. \
    Reescribe el siguiente texto en español con un estilo natural, claro y fluido, \
    100% único, sin plagio, en 3–5 párrafos separados por líneas en blanco. \
    No incluyas nombres de autores ni menciones del sitio original. \
    El texto debe estar limpio, sin letras sueltas ni fragmentos extraños.";

const TITLE_SYSTEM_PROMPT: &str = "Eres un redactor de titulares. \
    Escribe un titular breve y llamativo en español con máximo 12 palabras, \
    sin signos de puntuación ni caracteres extraños. \
    Responde solo con el titular limpio y directo, sin letras sueltas.";

const BODY_TEMPERATURE: f32 = 0.6;
const TITLE_TEMPERATURE: f32 = 0.5;
const BODY_TIMEOUT: Duration = Duration::from_secs(60);
const TITLE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("nothing to rewrite: input is empty")]
    EmptyInput,
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion response contained no choices")]
    NoChoices,
}

/// Capability of rewriting article text in Spanish.
pub trait Rewriter {
    async fn rewrite_body(&self, text: &str) -> Result<String, RewriteError>;
    async fn rewrite_title(&self, title: &str) -> Result<String, RewriteError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Rewriting client backed by OpenRouter.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(http: reqwest::Client, api_key: String, model: String) -> Self {
        Self { http, api_key, model }
    }

    #[instrument(level = "info", skip_all, fields(model = %self.model, %temperature))]
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<String, RewriteError> {
        let request = ChatRequest {
            model: &self.model,
            temperature,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
        };

        let response: ChatResponse = self
            .http
            .post(OPENROUTER_URL)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or(RewriteError::NoChoices)?
            .message
            .content;
        info!(bytes = content.len(), "Completion received");
        Ok(content.trim().to_string())
    }
}

impl Rewriter for OpenRouterClient {
    async fn rewrite_body(&self, text: &str) -> Result<String, RewriteError> {
        if text.trim().is_empty() {
            return Err(RewriteError::EmptyInput);
        }
        let raw = self
            .complete(BODY_SYSTEM_PROMPT, text, BODY_TEMPERATURE, BODY_TIMEOUT)
            .await?;
        Ok(polish_body(&raw))
    }

    async fn rewrite_title(&self, title: &str) -> Result<String, RewriteError> {
        if title.trim().is_empty() {
            return Err(RewriteError::EmptyInput);
        }
        let raw = self
            .complete(TITLE_SYSTEM_PROMPT, title, TITLE_TEMPERATURE, TITLE_TIMEOUT)
            .await?;
        Ok(sanitize_title(&raw))
    }
}

/// Clean up a rewritten body: stray letters, emphasis markers, headings, and
/// paragraphs joined with blank-line separators.
fn polish_body(raw: &str) -> String {
    let text = strip_stray_letters(raw);
    let text = strip_emphasis(&text);
    let text = wrap_headings(&text);
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Clean up a rewritten title: same cleanup as the body, then only letters,
/// whitespace, and heading-markup residue survive, with collapsed whitespace.
fn sanitize_title(raw: &str) -> String {
    let text = strip_stray_letters(raw);
    let text = strip_emphasis(&text);
    let text = wrap_headings(&text);
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace() || "<>/h2".contains(*c))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Outcome of a quality-gated operation.
#[derive(Debug)]
pub enum Attempted<T> {
    /// A result passed the quality predicate.
    Accepted(T),
    /// Attempts exhausted; carries the last below-threshold result, if any
    /// attempt produced one at all.
    Rejected(Option<T>),
}

/// Run `op` up to `max_attempts` times until a result satisfies `accept`.
///
/// Transport errors and below-threshold results both consume an attempt; the
/// operation is re-invoked with the same input each time.
pub async fn with_retry<T, E, Fut, Op, Accept>(
    max_attempts: usize,
    mut op: Op,
    accept: Accept,
) -> Attempted<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    Accept: Fn(&T) -> bool,
{
    let mut last = None;
    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) if accept(&value) => return Attempted::Accepted(value),
            Ok(value) => {
                warn!(attempt, max_attempts, "Result below quality threshold");
                last = Some(value);
            }
            Err(e) => warn!(attempt, max_attempts, error = %e, "Attempt failed"),
        }
    }
    Attempted::Rejected(last)
}
