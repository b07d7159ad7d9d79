//! LLM module - answer generation from retrieved context

mod ollama;
mod openai;
mod simulated;

use tracing::info;

/// LLM provider type
#[derive(Debug, Clone)]
pub enum LlmType {
    Ollama { host: Option<String> },
    OpenAI { api_key: Option<String>, base_url: Option<String> },
    /// Offline canned responses
    Simulated,
}

impl LlmType {
    /// Parse a provider name as used in config files and on the command line
    pub fn from_provider(
        provider: &str,
        host: Option<String>,
        base_url: Option<String>,
        api_key: Option<String>,
    ) -> anyhow::Result<Self> {
        match provider.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama { host }),
            "openai" => Ok(Self::OpenAI { api_key, base_url }),
            "simulated" => Ok(Self::Simulated),
            other => anyhow::bail!("Unknown LLM provider: {}", other),
        }
    }
}

/// Unified LLM provider
pub struct LlmProvider {
    model_name: String,
    inner: LlmProviderInner,
}

enum LlmProviderInner {
    Ollama(ollama::OllamaLlm),
    OpenAI(openai::OpenAILlm),
    Simulated(simulated::SimulatedLlm),
}

impl LlmProvider {
    /// Create a new LLM provider
    pub fn new(model_name: String, llm_type: LlmType) -> anyhow::Result<Self> {
        let inner = match llm_type {
            LlmType::Ollama { host } => {
                LlmProviderInner::Ollama(ollama::OllamaLlm::new(model_name.clone(), host)?)
            }
            LlmType::OpenAI { api_key, base_url } => LlmProviderInner::OpenAI(
                openai::OpenAILlm::new(model_name.clone(), api_key, base_url)?,
            ),
            LlmType::Simulated => {
                LlmProviderInner::Simulated(simulated::SimulatedLlm::new(model_name.clone()))
            }
        };

        info!("Initialized LLM provider: {}", model_name);

        Ok(Self { model_name, inner })
    }

    /// Answer `query` using `context` as supporting material
    pub async fn generate_response(&self, query: &str, context: &str) -> anyhow::Result<String> {
        self.generate(&build_prompt(query, context)).await
    }

    /// Generate a response for a raw prompt
    pub async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        match &self.inner {
            LlmProviderInner::Ollama(llm) => llm.generate(prompt).await,
            LlmProviderInner::OpenAI(llm) => llm.generate(prompt).await,
            LlmProviderInner::Simulated(llm) => Ok(llm.generate(prompt)),
        }
    }

    /// Get model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Prompt with the retrieved context ahead of the question
pub fn build_prompt(query: &str, context: &str) -> String {
    if context.trim().is_empty() {
        return format!(
            "No mission records matched this question.\n\nQuestion: {}\n\n\
             Say that the records do not cover it rather than guessing.",
            query
        );
    }

    format!(
        "You answer questions about space mission transcripts and logs.\n\
         Use only the context below and cite sources by their [n] marker.\n\n\
         Context:\n{}\n\nQuestion: {}\n\nAnswer:",
        context, query
    )
}
