//! Local embeddings using Candle (sentence-transformers compatible)

use std::path::PathBuf;
use std::sync::Mutex;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};
use tracing::info;

/// Default local model, the same one the Ollama `all-minilm` tag ships
pub const DEFAULT_LOCAL_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Longest input the BERT position table accepts
const MAX_SEQUENCE_LENGTH: usize = 512;

/// Local embedding provider using Candle
pub struct CandleEmbedding {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimensions: usize,
    normalize: bool,
    /// One forward pass at a time
    inference: Mutex<()>,
}

impl CandleEmbedding {
    /// Load a BERT-family model from a local directory or the HuggingFace Hub
    ///
    /// Supports models like:
    /// - sentence-transformers/all-MiniLM-L6-v2 (384 dims)
    /// - sentence-transformers/all-mpnet-base-v2 (768 dims)
    /// - BAAI/bge-small-en-v1.5 (384 dims)
    pub fn new(model_name: String, model_path: Option<String>) -> anyhow::Result<Self> {
        info!("Loading local embedding model: {}", model_name);

        let device = Device::Cpu;

        let (config_path, tokenizer_path, weights_path) = if let Some(path) = model_path {
            let base = PathBuf::from(path);
            (
                base.join("config.json"),
                base.join("tokenizer.json"),
                base.join("model.safetensors"),
            )
        } else {
            let api = Api::new()?;
            let repo = api.repo(Repo::new(model_name.clone(), RepoType::Model));

            let config = repo.get("config.json")?;
            let tokenizer = repo.get("tokenizer.json")?;

            // Try safetensors first, fall back to pytorch
            let weights = repo
                .get("model.safetensors")
                .or_else(|_| repo.get("pytorch_model.bin"))?;

            (config, tokenizer, weights)
        };

        let config_content = std::fs::read_to_string(&config_path)?;
        let config: BertConfig = serde_json::from_str(&config_content)?;
        let dimensions = config.hidden_size;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer.with_padding(Some(PaddingParams::default()));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure tokenizer: {}", e))?;

        let vb = if weights_path
            .extension()
            .map(|e| e == "safetensors")
            .unwrap_or(false)
        {
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)? }
        } else {
            VarBuilder::from_pth(weights_path, DTYPE, &device)?
        };

        let model = BertModel::load(vb, &config)?;

        // sentence-transformers pipelines end with a Normalize layer
        let normalize = model_name.contains("sentence-transformers")
            || model_name.contains("bge")
            || model_name.contains("e5");

        info!(
            "Loaded model: {} dims, device: {:?}, normalize: {}",
            dimensions, device, normalize
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            dimensions,
            normalize,
            inference: Mutex::new(()),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Compute embeddings for texts
    pub fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        // Process in batches to avoid memory issues
        let batch_size = 32;
        for batch in texts.chunks(batch_size) {
            all_embeddings.extend(self.embed_batch(batch)?);
        }

        Ok(all_embeddings)
    }

    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let batch_size = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

        let mut input_ids = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        let mut token_type_ids = Vec::with_capacity(batch_size * seq_len);

        for encoding in &encodings {
            input_ids.extend_from_slice(encoding.get_ids());
            attention_mask.extend_from_slice(encoding.get_attention_mask());
            token_type_ids.extend_from_slice(encoding.get_type_ids());
        }

        let input_ids = Tensor::from_vec(input_ids, (batch_size, seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(attention_mask, (batch_size, seq_len), &self.device)?;
        let token_type_ids = Tensor::from_vec(token_type_ids, (batch_size, seq_len), &self.device)?;

        let output = {
            let _guard = self
                .inference
                .lock()
                .map_err(|_| anyhow::anyhow!("inference lock poisoned"))?;
            self.model
                .forward(&input_ids, &token_type_ids, Some(&attention_mask))?
        };

        let embeddings = mean_pooling(&output, &attention_mask)?;

        let embeddings = if self.normalize {
            l2_normalize(&embeddings)?
        } else {
            embeddings
        };

        Ok(embeddings.to_dtype(DType::F32)?.to_vec2::<f32>()?)
    }
}

/// Mean over the sequence axis, ignoring padding
fn mean_pooling(output: &Tensor, attention_mask: &Tensor) -> anyhow::Result<Tensor> {
    // output: (batch, seq_len, hidden), attention_mask: (batch, seq_len)
    let mask = attention_mask
        .to_dtype(output.dtype())?
        .unsqueeze(2)?
        .broadcast_as(output.shape())?;

    let sum = output.mul(&mask)?.sum(1)?;

    let count = attention_mask
        .to_dtype(output.dtype())?
        .sum(1)?
        .unsqueeze(1)?
        .broadcast_as(sum.shape())?;

    Ok(sum.div(&count.clamp(1e-9, f64::INFINITY)?)?)
}

fn l2_normalize(embeddings: &Tensor) -> anyhow::Result<Tensor> {
    let norm = embeddings
        .sqr()?
        .sum_keepdim(1)?
        .sqrt()?
        .clamp(1e-12, f64::INFINITY)?;
    Ok(embeddings.broadcast_div(&norm)?)
}
