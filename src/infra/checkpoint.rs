// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores everything a neural run produces, using
// Burn's CompactRecorder for weights and JSON for the rest.
//
// File naming convention:
//   checkpoints/
//     rnn_best.mpk           ← weights of the best epoch
//     lstm_best.mpk
//     transformer_best.mpk
//     neural_config.json     ← effective NeuralConfig of the run
//     sequence_vocab.json    ← SequenceVocabulary (recurrent models)
//     tokenizer.json         ← written by TokenizerStore
//     rnn_metrics.csv        ← written by MetricsLogger
//
// CompactRecorder is type-safe: loading fails if the saved
// architecture does not match the model passed in.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save the weights of `model` as `{dir}/{name}_best`.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, name: &str) -> Result<PathBuf> {
        // Recorder adds the file extension
        let path = self.dir.join(format!("{name}_best"));
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        tracing::debug!("Saved checkpoint '{}'", path.display());
        Ok(path)
    }

    /// Restore weights saved by save_model into a freshly built `model`.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, name: &str, device: &B::Device) -> Result<M> {
        load_weights(model, &self.dir.join(format!("{name}_best")), device)
    }

    /// Write any serde value as pretty JSON to `{dir}/{file}`.
    pub fn save_json<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.dir.join(file);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    pub fn load_json<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.dir.join(file);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'. Has a neural run been made?", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
    }
}

/// Load a CompactRecorder file (with or without extension) into `model`.
pub fn load_weights<B: Backend, M: Module<B>>(model: M, path: &Path, device: &B::Device) -> Result<M> {
    let path = path.with_extension("");
    let record = CompactRecorder::new()
        .load(path.clone(), device)
        .with_context(|| format!("Cannot load weights from '{}'", path.display()))?;
    Ok(model.load_record(record))
}
