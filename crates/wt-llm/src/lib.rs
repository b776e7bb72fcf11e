//! Chat-completion integration for the web time tracker.
//!
//! Talks to any OpenAI-compatible chat-completions endpoint (Groq by
//! default) and provides:
//! - Batch domain categorization, exposed as a [`Classifier`]
//! - A one-sentence productivity insight for a day's activity
//! - Free-form questions answered with the day's top sites as context

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wt_core::{Category, Classifier, Domain, DomainUsage, format_duration};

/// Default request timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default chat-completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
/// Default model name.
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

const CATEGORIZE_MAX_TOKENS: u32 = 200;
const CATEGORIZE_TEMPERATURE: f32 = 0.0;
const INSIGHT_MAX_TOKENS: u32 = 50;
const INSIGHT_TEMPERATURE: f32 = 0.7;
const INSIGHT_TOP_SITES: usize = 5;
const CHAT_MAX_TOKENS: u32 = 100;
const CHAT_TEMPERATURE: f32 = 0.7;
const CHAT_CONTEXT_SITES: usize = 10;

/// LLM client errors.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Failed to encode request context.
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Chat-completions client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client with the given API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();

        if api_key.is_empty() {
            return Err(LlmError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }
        if api_key.trim().is_empty() {
            return Err(LlmError::InvalidApiKey {
                reason: "API key cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(LlmError::ClientBuild)?;

        Ok(Self {
            http,
            api_key,
            endpoint: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Asks for one category per domain in a single request.
    ///
    /// The result only contains domains the model answered for; callers
    /// decide what to do with the rest.
    pub async fn categorize_domains(
        &self,
        domains: &[Domain],
    ) -> Result<HashMap<Domain, Category>, LlmError> {
        if domains.is_empty() {
            return Ok(HashMap::new());
        }
        let text = self
            .complete(
                vec![Message::user(build_categorize_prompt(domains))],
                CATEGORIZE_MAX_TOKENS,
                CATEGORIZE_TEMPERATURE,
            )
            .await?;
        Ok(parse_categories(&text, domains))
    }

    /// Short coaching sentence for a day. `None` for a day with no tracked
    /// time or an empty answer.
    pub async fn insight(&self, input: &InsightRequest) -> Result<Option<String>, LlmError> {
        if input.total_secs == 0 {
            return Ok(None);
        }
        let text = self
            .complete(
                vec![Message::user(build_insight_prompt(input))],
                INSIGHT_MAX_TOKENS,
                INSIGHT_TEMPERATURE,
            )
            .await?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    /// Answers a question about a day, with its top sites as context.
    /// `None` when the model replies with nothing.
    pub async fn chat(&self, input: &AskRequest) -> Result<Option<String>, LlmError> {
        let text = self
            .complete(build_chat_messages(input)?, CHAT_MAX_TOKENS, CHAT_TEMPERATURE)
            .await?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    async fn complete(
        &self,
        messages: Vec<Message>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            max_tokens,
            temperature,
            messages,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| LlmError::Api {
                message: format!("status {status}: {body}"),
            }));
        }

        let payload: ChatResponse = serde_json::from_str(&body)
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;
        extract_text(payload)
    }
}

impl Classifier for Client {
    type Error = LlmError;

    async fn classify_domains(
        &self,
        domains: &[Domain],
    ) -> Result<HashMap<Domain, Category>, Self::Error> {
        self.categorize_domains(domains).await
    }
}

/// Day summary sent for an insight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightRequest {
    /// Domains with their seconds, longest first.
    pub top_sites: Vec<(String, u64)>,
    pub focus_rate: u8,
    pub total_secs: u64,
}

/// A question about one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskRequest {
    pub question: String,
    /// The day's domains, longest first.
    pub sites: Vec<DomainUsage>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

impl Message {
    const fn system(content: String) -> Self {
        Self {
            role: "system",
            content,
        }
    }

    const fn user(content: String) -> Self {
        Self {
            role: "user",
            content,
        }
    }
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
    #[serde(default)]
    content: Option<String>,
}

fn extract_text(payload: ChatResponse) -> Result<String, LlmError> {
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LlmError::InvalidResponse("missing message content".to_string()))
}

fn parse_api_error(body: &str) -> Option<LlmError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| LlmError::Api {
            message: payload.error.message,
        })
}

fn build_categorize_prompt(domains: &[Domain]) -> String {
    let mut lines = Vec::new();
    lines.push("Categorize each website domain into exactly ONE category.".to_string());
    lines.push(String::new());
    lines.push("Domains:".to_string());
    for (index, domain) in domains.iter().enumerate() {
        lines.push(format!("{}. {domain}", index + 1));
    }
    lines.push(String::new());
    lines.push("Categories:".to_string());
    lines.push(
        "- Work: coding, documentation, productivity tools, professional sites".to_string(),
    );
    lines.push("- Social: social media, messaging, networking".to_string());
    lines.push("- Entertainment: videos, streaming, games, music, news, shopping".to_string());
    lines.push("- Other: anything that doesn't fit above".to_string());
    lines.push(String::new());
    lines.push("Reply in this exact format, one per line:".to_string());
    lines.push("domain1: Category".to_string());
    lines.push("domain2: Category".to_string());
    lines.push(String::new());
    lines.push("Only use: Work, Social, Entertainment, or Other.".to_string());
    lines.join("\n")
}

/// Parses `domain: Category` lines and maps each answer onto a requested
/// domain. Numbering like `3. ` is tolerated and unparseable lines are
/// skipped.
///
/// Exact names are matched first. A remaining line then matches a domain
/// that has no answer yet when either name contains the other. The first
/// answer for a domain is kept.
fn parse_categories(text: &str, requested: &[Domain]) -> HashMap<Domain, Category> {
    let lines: Vec<_> = text.lines().filter_map(parse_category_line).collect();
    let mut answers = HashMap::new();

    let mut unmatched = Vec::new();
    for (name, category) in lines {
        match requested.iter().find(|domain| domain.as_str() == name) {
            Some(domain) => {
                answers.entry(domain.clone()).or_insert(category);
            }
            None => unmatched.push((name, category)),
        }
    }

    for (name, category) in unmatched {
        let matched = requested.iter().find(|domain| {
            let domain = domain.as_str();
            !answers.contains_key(domain)
                && (domain.contains(name.as_str()) || name.contains(domain))
        });
        if let Some(domain) = matched {
            answers.insert(domain.clone(), category);
        }
    }
    answers
}

fn parse_category_line(line: &str) -> Option<(String, Category)> {
    let (name, rest) = line.split_once(':')?;
    let rest = rest.trim_start();
    let category = Category::ALL.into_iter().find(|category| {
        let label = category.as_str();
        rest.get(..label.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(label))
    })?;
    let name = strip_numbering(name.trim()).to_ascii_lowercase();
    (!name.is_empty()).then_some((name, category))
}

fn strip_numbering(name: &str) -> &str {
    let digits = name.len() - name.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return name;
    }
    name[digits..]
        .strip_prefix('.')
        .map_or(name, str::trim_start)
}

fn build_insight_prompt(input: &InsightRequest) -> String {
    let top_sites = input
        .top_sites
        .iter()
        .take(INSIGHT_TOP_SITES)
        .map(|(domain, seconds)| format!("{domain}: {}", format_duration(*seconds)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You're a productivity coach. Give ONE specific insight (max 20 words). \
         Top sites: {top_sites}. Focus: {}%. Total: {}.",
        input.focus_rate,
        format_duration(input.total_secs)
    )
}

fn build_chat_messages(input: &AskRequest) -> Result<Vec<Message>, LlmError> {
    let sites = &input.sites[..input.sites.len().min(CHAT_CONTEXT_SITES)];
    let data = serde_json::to_string(sites).map_err(LlmError::Encode)?;
    Ok(vec![
        Message::system(format!(
            "You're a productivity coach. Answer concisely (max 40 words). Data: {data}"
        )),
        Message::user(input.question.clone()),
    ])
}
