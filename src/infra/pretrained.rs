// ============================================================
// Layer 6 - Pre-trained Checkpoint Loader
// ============================================================
// Reads a HuggingFace BERT-family checkpoint directory:
//
//   models/bert-base-uncased/
//     config.json        ← architecture (hidden size, layers, ...)
//     pytorch_model.bin  ← torch.save'd state dict
//     tokenizer.json     ← the tokenizer the weights were trained with
//
// The state dict goes through burn-import's PyTorchFileRecorder
// straight into a BertEncoderRecord. HuggingFace key names are
// remapped onto burn's module paths; Linear weights are transposed
// and LayerNorm weight/bias become gamma/beta by the recorder.
// The classification head is not in the checkpoint and starts
// from its random initialisation.
//
// Reference: burn-import PyTorch guide (Burn Book, "Import Models")

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    module::Module,
    prelude::Backend,
    record::{FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

use crate::ml::model::{BertEncoderRecord, TransformerClassifier, TransformerClassifierConfig};

pub const DEFAULT_CHECKPOINT_DIR: &str = "models/bert-base-uncased";

const CONFIG_FILE: &str = "config.json";
const WEIGHTS_FILE: &str = "pytorch_model.bin";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// HuggingFace key pattern → burn module path, applied in order.
pub const KEY_REMAPS: [(&str, &str); 13] = [
    ("^(bert|roberta)\\.", ""),
    ("LayerNorm\\.gamma$", "LayerNorm.weight"),
    ("LayerNorm\\.beta$", "LayerNorm.bias"),
    ("^embeddings\\.LayerNorm", "embeddings.layer_norm"),
    ("^encoder\\.layer\\.([0-9]+)\\.attention\\.self\\.query", "encoder.layers.$1.mha.query"),
    ("^encoder\\.layer\\.([0-9]+)\\.attention\\.self\\.key", "encoder.layers.$1.mha.key"),
    ("^encoder\\.layer\\.([0-9]+)\\.attention\\.self\\.value", "encoder.layers.$1.mha.value"),
    ("^encoder\\.layer\\.([0-9]+)\\.attention\\.output\\.dense", "encoder.layers.$1.mha.output"),
    ("^encoder\\.layer\\.([0-9]+)\\.attention\\.output\\.LayerNorm", "encoder.layers.$1.norm_1"),
    ("^encoder\\.layer\\.([0-9]+)\\.intermediate\\.dense", "encoder.layers.$1.pwff.linear_inner"),
    ("^encoder\\.layer\\.([0-9]+)\\.output\\.dense", "encoder.layers.$1.pwff.linear_outer"),
    ("^encoder\\.layer\\.([0-9]+)\\.output\\.LayerNorm", "encoder.layers.$1.norm_2"),
    ("^pooler\\.dense", "pooler"),
];

/// The subset of a HuggingFace `config.json` the encoder needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HfBertConfig {
    #[serde(default = "default_model_type")]
    pub model_type:              String,
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size:         usize,
    #[serde(default = "default_dropout")]
    pub hidden_dropout_prob:     f64,
    #[serde(default)]
    pub pad_token_id:            usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps:          f64,
}

fn default_model_type() -> String {
    "bert".to_string()
}
fn default_type_vocab_size() -> usize {
    2
}
fn default_dropout() -> f64 {
    0.1
}
fn default_layer_norm_eps() -> f64 {
    1e-12
}

impl HfBertConfig {
    pub fn to_model_config(&self) -> Result<TransformerClassifierConfig> {
        match self.model_type.as_str() {
            "bert" | "roberta" => {}
            other => bail!("unsupported model_type '{other}' (expected bert or roberta)"),
        }
        if self.hidden_size % self.num_attention_heads != 0 {
            bail!(
                "hidden_size {} is not divisible by {} attention heads",
                self.hidden_size,
                self.num_attention_heads
            );
        }
        // RoBERTa numbers positions from pad_token_id + 1
        let position_offset = if self.model_type == "roberta" { self.pad_token_id + 1 } else { 0 };

        Ok(TransformerClassifierConfig::new(self.vocab_size, self.max_position_embeddings)
            .with_d_model(self.hidden_size)
            .with_num_heads(self.num_attention_heads)
            .with_num_layers(self.num_hidden_layers)
            .with_d_ff(self.intermediate_size)
            .with_dropout(self.hidden_dropout_prob)
            .with_type_vocab_size(self.type_vocab_size)
            .with_position_offset(position_offset)
            .with_layer_norm_eps(self.layer_norm_eps))
    }
}

/// A checkpoint directory whose three files are all present.
pub struct PretrainedCheckpoint {
    dir: PathBuf,
}

impl PretrainedCheckpoint {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        for file in [CONFIG_FILE, WEIGHTS_FILE, TOKENIZER_FILE] {
            let path = dir.join(file);
            if !path.is_file() {
                bail!("'{}' not found", path.display());
            }
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> Result<HfBertConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed checkpoint config '{}'", path.display()))
    }

    pub fn tokenizer(&self) -> Result<Tokenizer> {
        let path = self.dir.join(TOKENIZER_FILE);
        Tokenizer::from_file(&path).map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    /// Fresh classifier with the checkpoint's encoder weights.
    pub fn load_classifier<B: Backend>(
        &self,
        config: &TransformerClassifierConfig,
        device: &B::Device,
    ) -> Result<TransformerClassifier<B>> {
        let path = self.dir.join(WEIGHTS_FILE);
        let args = KEY_REMAPS
            .iter()
            .fold(LoadArgs::new(path.clone()), |args, (pattern, replacement)| {
                args.with_key_remap(pattern, replacement)
            });
        let record: BertEncoderRecord<B> = PyTorchFileRecorder::<FullPrecisionSettings>::default()
            .load(args, device)
            .map_err(|e| anyhow!("Cannot load weights from '{}': {:?}", path.display(), e))?;

        let mut model = config.init::<B>(device);
        model.bert = model.bert.load_record(record);
        tracing::info!("Loaded {} encoder parameters from '{}'", model.bert.num_params(), path.display());
        Ok(model)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn remap(key: &str) -> String {
        KEY_REMAPS.iter().fold(key.to_string(), |k, (pattern, replacement)| {
            Regex::new(pattern).unwrap().replace(&k, *replacement).into_owned()
        })
    }

    #[test]
    fn test_huggingface_keys_map_onto_module_paths() {
        assert_eq!(remap("bert.embeddings.word_embeddings.weight"), "embeddings.word_embeddings.weight");
        assert_eq!(remap("bert.embeddings.LayerNorm.gamma"), "embeddings.layer_norm.weight");
        assert_eq!(remap("bert.encoder.layer.11.attention.self.query.weight"), "encoder.layers.11.mha.query.weight");
        assert_eq!(remap("bert.encoder.layer.0.attention.output.dense.bias"), "encoder.layers.0.mha.output.bias");
        assert_eq!(remap("bert.encoder.layer.0.attention.output.LayerNorm.weight"), "encoder.layers.0.norm_1.weight");
        assert_eq!(remap("bert.encoder.layer.2.intermediate.dense.weight"), "encoder.layers.2.pwff.linear_inner.weight");
        assert_eq!(remap("bert.encoder.layer.2.output.dense.weight"), "encoder.layers.2.pwff.linear_outer.weight");
        assert_eq!(remap("bert.encoder.layer.2.output.LayerNorm.bias"), "encoder.layers.2.norm_2.bias");
        assert_eq!(remap("bert.pooler.dense.weight"), "pooler.weight");
        assert_eq!(remap("roberta.encoder.layer.1.attention.self.key.bias"), "encoder.layers.1.mha.key.bias");
    }

    #[test]
    fn test_config_maps_to_encoder_shape() {
        let json = r#"{
            "model_type": "bert", "vocab_size": 30522, "hidden_size": 768,
            "num_hidden_layers": 12, "num_attention_heads": 12, "intermediate_size": 3072,
            "max_position_embeddings": 512, "type_vocab_size": 2, "hidden_dropout_prob": 0.1,
            "pad_token_id": 0, "layer_norm_eps": 1e-12, "hidden_act": "gelu"
        }"#;
        let hf: HfBertConfig = serde_json::from_str(json).unwrap();
        let cfg = hf.to_model_config().unwrap();
        assert_eq!(cfg.vocab_size, 30522);
        assert_eq!(cfg.d_model, 768);
        assert_eq!(cfg.num_layers, 12);
        assert_eq!(cfg.d_ff, 3072);
        assert_eq!(cfg.position_offset, 0);
        assert_eq!(cfg.max_input_len(), 512);
    }

    #[test]
    fn test_roberta_positions_start_after_padding() {
        let json = r#"{
            "model_type": "roberta", "vocab_size": 50265, "hidden_size": 768,
            "num_hidden_layers": 12, "num_attention_heads": 12, "intermediate_size": 3072,
            "max_position_embeddings": 514, "type_vocab_size": 1, "pad_token_id": 1
        }"#;
        let cfg = serde_json::from_str::<HfBertConfig>(json).unwrap().to_model_config().unwrap();
        assert_eq!(cfg.position_offset, 2);
        assert_eq!(cfg.max_input_len(), 512);
    }

    #[test]
    fn test_unsupported_architecture_is_rejected() {
        let json = r#"{
            "model_type": "gpt2", "vocab_size": 10, "hidden_size": 8, "num_hidden_layers": 1,
            "num_attention_heads": 2, "intermediate_size": 16, "max_position_embeddings": 8
        }"#;
        assert!(serde_json::from_str::<HfBertConfig>(json).unwrap().to_model_config().is_err());
    }

    #[test]
    fn test_incomplete_directory_names_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();
        let err = PretrainedCheckpoint::open(dir.path()).err().unwrap();
        assert!(err.to_string().contains(WEIGHTS_FILE), "{err}");
    }
}
