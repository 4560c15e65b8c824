//! Hosted chat-model client (Gemini `generateContent` REST endpoint).

use anyhow::{anyhow, Context};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use buddy_core::config::LlmSettings;
use buddy_core::traits::Generator;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
	contents: Vec<Content<'a>>,
	generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
	role: &'static str,
	parts: Vec<OutPart<'a>>,
}

#[derive(Serialize)]
struct OutPart<'a> {
	text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
	temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
	#[serde(default)]
	candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
	content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
	#[serde(default)]
	parts: Vec<InPart>,
}

#[derive(Deserialize)]
struct InPart {
	text: Option<String>,
}

#[derive(Clone)]
pub struct GeminiClient {
	client: Client,
	base_url: String,
	model: String,
	api_key: String,
	temperature: f32,
}

impl GeminiClient {
	pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>, temperature: f32, timeout: Duration) -> anyhow::Result<Self> {
		let client = Client::builder().timeout(timeout).build().context("building http client")?;
		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
			model: model.into(),
			api_key: api_key.into(),
			temperature,
		})
	}

	/// Reads the API key from the environment variable named in `settings`.
	pub fn from_settings(settings: &LlmSettings) -> buddy_core::Result<Self> {
		let key = settings.api_key()?;
		Self::new(&settings.base_url, &settings.model, key, settings.temperature, Duration::from_secs(settings.timeout_secs))
			.map_err(|e| buddy_core::Error::InvalidConfig(format!("{e:#}")))
	}

	pub fn model(&self) -> &str { &self.model }

	fn endpoint(&self) -> String {
		format!("{}/models/{}:generateContent", self.base_url, self.model)
	}

	async fn generate_text(&self, prompt: &str) -> anyhow::Result<String> {
		let body = GenerateRequest {
			contents: vec![Content { role: "user", parts: vec![OutPart { text: prompt }] }],
			generation_config: GenerationConfig { temperature: self.temperature },
		};
		debug!(model = %self.model, prompt_chars = prompt.len(), "calling generateContent");
		let response = self
			.client
			.post(self.endpoint())
			.header("x-goog-api-key", &self.api_key)
			.json(&body)
			.send()
			.await
			.context("request to model API failed")?;

		let status = response.status();
		if !status.is_success() {
			let text = response.text().await.unwrap_or_default();
			return Err(anyhow!("model API returned {status}: {}", text.trim()));
		}
		let parsed: GenerateResponse = response.json().await.context("decoding model response")?;
		let text: String = parsed
			.candidates
			.into_iter()
			.next()
			.and_then(|c| c.content)
			.map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
			.unwrap_or_default();
		if text.is_empty() {
			return Err(anyhow!("model response contained no text"));
		}
		Ok(text)
	}
}

impl Generator for GeminiClient {
	async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
		self.generate_text(prompt).await
	}
}
