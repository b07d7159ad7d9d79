//! OpenAI-compatible embedding backend

use std::env;

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client,
};
use tracing::{debug, info};

/// Inputs per request; the API rejects larger arrays
const BATCH_SIZE: usize = 100;

pub struct OpenAIEmbedding {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl OpenAIEmbedding {
    pub fn new(
        model_name: String,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> anyhow::Result<Self> {
        let api_key = api_key
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let mut config = OpenAIConfig::new().with_api_key(api_key);
        let base_url = base_url.or_else(|| env::var("OPENAI_BASE_URL").ok());
        if let Some(url) = &base_url {
            config = config.with_api_base(url);
        }

        info!(
            "OpenAI embedding backend: {}{}",
            model_name,
            base_url.map(|u| format!(" @ {}", u)).unwrap_or_default()
        );

        Ok(Self {
            client: Client::with_config(config),
            model_name,
        })
    }

    pub async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }

    async fn embed_batch(&self, batch: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model_name)
            .input(EmbeddingInput::StringArray(
                batch.iter().map(|s| s.to_string()).collect(),
            ))
            .build()?;

        let response = self.client.embeddings().create(request).await?;
        debug!(
            "OpenAI embedded {} texts ({} prompt tokens)",
            response.data.len(),
            response.usage.prompt_tokens
        );

        in_input_order(
            batch.len(),
            response
                .data
                .into_iter()
                .map(|d| (d.index as usize, d.embedding)),
        )
    }
}

/// Place each indexed vector at its input position, rejecting gaps and repeats
fn in_input_order(
    expected: usize,
    indexed: impl IntoIterator<Item = (usize, Vec<f32>)>,
) -> anyhow::Result<Vec<Vec<f32>>> {
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for (index, vector) in indexed {
        let Some(slot) = slots.get_mut(index) else {
            anyhow::bail!("embedding index {} out of range for {} inputs", index, expected);
        };
        if slot.is_some() {
            anyhow::bail!("embedding index {} returned twice", index);
        }
        *slot = Some(vector);
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| slot.ok_or_else(|| anyhow::anyhow!("no embedding returned for input {}", i)))
        .collect()
}
