//! Ollama embedding backend
//!
//! Talks to `/api/embed`, which accepts a batch per request. Servers older
//! than the batch endpoint answer 404 there; those are served one text at a
//! time through `/api/embeddings`.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::http::{check_response, create_client};

const DEFAULT_HOST: &str = "http://localhost:11434";

/// Texts per `/api/embed` request
const BATCH_SIZE: usize = 32;

pub struct OllamaEmbedding {
    client: Client,
    host: String,
    model_name: String,
    legacy: AtomicBool,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    truncate: bool,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct LegacyRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct LegacyResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    pub fn new(model_name: String, host: Option<String>) -> anyhow::Result<Self> {
        let host = normalize_host(
            &host
                .or_else(|| env::var("OLLAMA_HOST").ok())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        );

        info!("Ollama embedding backend: {} @ {}", model_name, host);

        Ok(Self {
            client: create_client()?,
            host,
            model_name,
            legacy: AtomicBool::new(false),
        })
    }

    pub async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(BATCH_SIZE) {
            if self.legacy.load(Ordering::Relaxed) {
                vectors.extend(self.embed_legacy(batch).await?);
                continue;
            }

            match self.embed_batch(batch).await? {
                Some(batch_vectors) => {
                    if batch_vectors.len() != batch.len() {
                        anyhow::bail!(
                            "Ollama returned {} embeddings for {} inputs",
                            batch_vectors.len(),
                            batch.len()
                        );
                    }
                    vectors.extend(batch_vectors);
                }
                None => {
                    warn!("{} has no /api/embed; using /api/embeddings", self.host);
                    self.legacy.store(true, Ordering::Relaxed);
                    vectors.extend(self.embed_legacy(batch).await?);
                }
            }
        }

        Ok(vectors)
    }

    /// `None` when the server lacks the batch endpoint
    async fn embed_batch(&self, batch: &[&str]) -> anyhow::Result<Option<Vec<Vec<f32>>>> {
        let request = EmbedRequest {
            model: &self.model_name,
            input: batch,
            truncate: true,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.host))
            .json(&request)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            // A missing model is also a 404, but with an error body naming it
            if body.contains("model") {
                anyhow::bail!("Ollama API error 404: {}", body.trim());
            }
            return Ok(None);
        }

        let response = check_response(response, "Ollama").await?;
        let parsed: EmbedResponse = response.json().await?;
        debug!("Ollama embedded {} texts", parsed.embeddings.len());
        Ok(Some(parsed.embeddings))
    }

    async fn embed_legacy(&self, batch: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(batch.len());
        for text in batch {
            let response = self
                .client
                .post(format!("{}/api/embeddings", self.host))
                .json(&LegacyRequest {
                    model: &self.model_name,
                    prompt: text,
                })
                .send()
                .await?;
            let response = check_response(response, "Ollama").await?;
            let parsed: LegacyResponse = response.json().await?;
            vectors.push(parsed.embedding);
        }
        Ok(vectors)
    }
}

/// Accept `host:port` as well as full URLs, without a trailing slash
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
