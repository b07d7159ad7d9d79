//! Ollama LLM provider

use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::http::{check_response, create_client};

/// Ollama LLM provider
pub struct OllamaLlm {
    client: Client,
    host: String,
    model_name: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    done: bool,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider
    pub fn new(model_name: String, host: Option<String>) -> anyhow::Result<Self> {
        let host = host
            .or_else(|| env::var("OLLAMA_HOST").ok())
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        let client = create_client()?;

        info!("Ollama LLM provider: {} @ {}", model_name, host);

        Ok(Self {
            client,
            host,
            model_name,
        })
    }

    /// Generate a response
    pub async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let request = GenerateRequest {
            model: &self.model_name,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: 0.2 },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.host.trim_end_matches('/')))
            .json(&request)
            .send()
            .await?;

        let response = check_response(response, "Ollama").await?;
        let text = response.text().await?;

        // Some servers stream newline-delimited objects even when asked not to
        let mut full_response = String::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let part: GenerateResponse = serde_json::from_str(line)?;
            full_response.push_str(&part.response);
            if part.done {
                break;
            }
        }

        debug!("Ollama returned {} characters", full_response.len());

        Ok(full_response)
    }
}
