//! Optional external vision classifier.
//!
//! When an API key is configured, structurally valid submissions are sent
//! to a vision model that judges whether the image plausibly shows the
//! goal being completed. The classifier is strictly best-effort: every
//! failure mode (missing configuration, transport errors, a verdict we
//! cannot parse) collapses into [`ClassifierOutcome::Unavailable`], so
//! the verification pipeline can never fail because of it.

use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the vision classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Chat-completions endpoint URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key. When absent the classifier is disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Vision model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Token budget for the model's reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "llama-3.2-90b-vision-preview".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_tokens() -> u32 {
    300
}

/// What the classifier stage produced for one submission.
#[derive(Debug, Clone)]
pub enum ClassifierOutcome {
    /// The model returned a usable verdict.
    Verdict {
        /// Whether the image plausibly shows the goal being completed.
        plausible: bool,
        /// The model's confidence estimate, clamped to [0, 100].
        confidence: u8,
        /// Free-text feedback for the user.
        feedback: String,
    },
    /// The classifier could not be consulted; apply no adjustment.
    Unavailable {
        /// Why the classifier was skipped.
        note: String,
    },
}

/// The verdict shape the model is asked to reply with.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    plausible: bool,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default = "default_feedback")]
    feedback: String,
}

const fn default_confidence() -> f64 {
    50.0
}

fn default_feedback() -> String {
    "Verification completed".to_string()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Best-effort client for the external vision model.
pub struct VisionClassifier {
    config: ClassifierConfig,
    http: Option<reqwest::Client>,
    retry: RetryConfig,
}

impl VisionClassifier {
    /// Create a classifier from configuration.
    ///
    /// Without an API key the classifier is inert: [`Self::assess`]
    /// reports it as unavailable and no network calls are made.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        let http = if config.api_key.is_some() {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .map_err(|e| Error::Config(format!("failed to build classifier client: {e}")))?;
            Some(client)
        } else {
            info!("vision classifier not configured (no API key); running on heuristics alone");
            None
        };

        Ok(Self {
            config,
            http,
            retry: RetryConfig::quick(),
        })
    }

    /// Replace the retry policy used for the transport call.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Whether the classifier is configured to make external calls.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.http.is_some()
    }

    /// Ask the vision model whether the submission is plausible.
    ///
    /// This never returns an error: if the call cannot be made or keeps
    /// failing, the outcome is [`ClassifierOutcome::Unavailable`] and the
    /// pipeline applies no score adjustment.
    pub async fn assess(
        &self,
        goal_name: &str,
        reflection: &str,
        image_data_url: &str,
        second_image_data_url: Option<&str>,
    ) -> ClassifierOutcome {
        let Some(ref http) = self.http else {
            return ClassifierOutcome::Unavailable {
                note: "AI verification not configured (no API key)".to_string(),
            };
        };

        let result = self
            .retry
            .execute(|| {
                self.request_verdict(http, goal_name, reflection, image_data_url, second_image_data_url)
            })
            .await;

        match result {
            Ok(verdict) => {
                debug!(
                    "classifier verdict: plausible={} confidence={}",
                    verdict.plausible, verdict.confidence
                );
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let confidence = verdict.confidence.clamp(0.0, 100.0) as u8;
                ClassifierOutcome::Verdict {
                    plausible: verdict.plausible,
                    confidence,
                    feedback: verdict.feedback,
                }
            }
            Err(err) => {
                warn!("vision classifier unavailable: {err}");
                ClassifierOutcome::Unavailable {
                    note: format!("AI verification unavailable: {err}"),
                }
            }
        }
    }

    /// One round-trip to the vision model.
    async fn request_verdict(
        &self,
        http: &reqwest::Client,
        goal_name: &str,
        reflection: &str,
        image_data_url: &str,
        second_image_data_url: Option<&str>,
    ) -> Result<RawVerdict> {
        let mut prompt = format!(
            "You are verifying a proof submission for the goal: \"{goal_name}\".\n\n\
             The user provided this reflection:\n\"{reflection}\"\n\n\
             Analyze the provided image(s) and determine if they genuinely show \
             evidence of completing the goal.\n\n\
             Respond with a JSON object containing:\n\
             - \"plausible\": boolean (true if image shows evidence of goal completion)\n\
             - \"confidence\": number 0-100 (your confidence in the verification)\n\
             - \"feedback\": string (brief feedback for the user)\n\n\
             Consider:\n\
             1. Does the image relate to the stated goal?\n\
             2. Does the reflection match what's shown in the image?\n\
             3. Are there signs of genuine effort vs. stock photos?\n"
        );

        if second_image_data_url.is_some() {
            prompt.push_str("\n\nA second image was provided for additional verification.");
        }

        let mut content = vec![
            json!({"type": "text", "text": prompt}),
            json!({"type": "image_url", "image_url": {"url": image_data_url}}),
        ];
        if let Some(second) = second_image_data_url {
            content.push(json!({"type": "image_url", "image_url": {"url": second}}));
        }

        let payload = json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": content}],
            "max_tokens": self.config.max_tokens,
            "temperature": 0.5,
        });

        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let response = http
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Network(format!("classifier request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "classifier returned {}",
                response.status()
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::UnexpectedPayload(format!("malformed classifier response: {e}")))?;

        let content = chat
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| Error::UnexpectedPayload("classifier returned no choices".to_string()))?;

        serde_json::from_str(content)
            .map_err(|e| Error::UnexpectedPayload(format!("classifier verdict is not JSON: {e}")))
    }
}
