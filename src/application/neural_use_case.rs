// ============================================================
// Layer 2 - NeuralUseCase
// ============================================================
// Orchestrates the neural benchmark in order:
//
//   Step 1: Load and split train / test     (application::prepare)
//   Step 2: Carve validation out of train   (Layer 4 - data)
//   Step 3: Clean every split               (Layer 4 - data)
//   Step 4: Save the run config             (Layer 6 - infra)
//   Step 5: Encode sequences                (Layer 4c - encoding)
//             word ids for rnn / lstm, fitted on the training part;
//             sub-word ids for the transformer, from the checkpoint's
//             tokenizer.json or a WordPiece learned on the training part
//   Step 6: Train with early stopping       (Layer 5b - ml)
//   Step 7: Score the test split            (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::{anyhow, bail, Result};
use burn::{module::AutodiffModule, prelude::Backend};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::application::prepare::{DataConfig, PreparedData};
use crate::data::{
    dataset::{SequenceDataset, SequenceSample},
    preprocessor::Preprocessor,
    splitter::split_indices,
};
use crate::domain::{
    email::{CleanedRecord, EmailRecord, Label, LabelDistribution},
    report::{ModelFamily, ModelReport, RunReport},
    traits::EmailSource,
};
use crate::encoding::{
    sequence::{PaddingSide, SequenceVocabulary, TruncationPolicy},
    subword::SubwordEncoder,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::evaluate,
    pretrained::{PretrainedCheckpoint, DEFAULT_CHECKPOINT_DIR},
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    model::{
        LstmClassifierConfig, RnnClassifierConfig, SequenceClassifier, TransformerClassifier,
        TransformerClassifierConfig,
    },
    trainer::{score_samples, train_classifier, Device, EvalBackend, TrainBackend, TrainerConfig},
    NeuralModelKind,
};

// ─── Neural Configuration ────────────────────────────────────────────────────
// Serialisable so the effective settings of a run are saved next
// to its checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralConfig {
    pub data:             DataConfig,
    pub trainer:          TrainerConfig,
    pub models:           Vec<NeuralModelKind>,
    /// Share of the training split held back for early stopping
    pub validation_ratio: f64,
    pub checkpoint_dir:   String,

    // word sequences (rnn, lstm)
    pub max_len:          usize,
    pub max_vocab:        Option<usize>,
    pub truncation:       TruncationPolicy,
    pub padding:          PaddingSide,
    pub embed_dim:        usize,
    pub hidden_size:      usize,
    pub rnn_dropout:      f64,

    // sub-word sequences (transformer)
    pub subword_max_len:     usize,
    /// HuggingFace checkpoint directory; None trains from scratch
    pub pretrained_model:    Option<String>,
    // shape of a transformer trained from scratch
    pub subword_vocab_size:  usize,
    pub d_model:             usize,
    pub num_heads:           usize,
    pub num_layers:          usize,
    pub d_ff:                usize,
    pub transformer_dropout: f64,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            data:                DataConfig::default(),
            trainer:             TrainerConfig::default(),
            models:              NeuralModelKind::ALL.to_vec(),
            validation_ratio:    0.1,
            checkpoint_dir:      "checkpoints".to_string(),
            max_len:             200,
            max_vocab:           Some(20_000),
            truncation:          TruncationPolicy::KeepHead,
            padding:             PaddingSide::Pre,
            embed_dim:           128,
            hidden_size:         128,
            rnn_dropout:         0.2,
            subword_max_len:     128,
            pretrained_model:    Some(DEFAULT_CHECKPOINT_DIR.to_string()),
            subword_vocab_size:  30_000,
            d_model:             128,
            num_heads:           4,
            num_layers:          2,
            d_ff:                256,
            transformer_dropout: 0.1,
        }
    }
}

/// Encoded train / validation / test samples for one id space.
#[derive(Clone)]
struct EncodedSplits {
    /// Embedding rows needed for this id space
    vocab_size: usize,
    train:      Vec<SequenceSample>,
    validation: Vec<SequenceSample>,
    test:       Vec<SequenceSample>,
}

/// Training, validation and test records, raw and cleaned.
struct NeuralSplits {
    train_raw:   Vec<EmailRecord>,
    val_raw:     Vec<EmailRecord>,
    test_raw:    Vec<EmailRecord>,
    train_clean: Vec<CleanedRecord>,
    val_clean:   Vec<CleanedRecord>,
    test_clean:  Vec<CleanedRecord>,
}

// ─── NeuralUseCase ────────────────────────────────────────────────────────────
pub struct NeuralUseCase {
    config: NeuralConfig,
}

impl NeuralUseCase {
    pub fn new(config: NeuralConfig) -> Self {
        Self { config }
    }

    /// Run against the configured CSV file.
    pub fn execute(&self) -> Result<RunReport> {
        self.run(&self.config.data.source())
    }

    pub fn run(&self, source: &dyn EmailSource) -> Result<RunReport> {
        let prepared = PreparedData::load(source, &self.config.data)?;
        self.run_prepared(&prepared)
    }

    pub fn run_prepared(&self, prepared: &PreparedData) -> Result<RunReport> {
        let cfg = &self.config;
        let mut report = prepared.new_report();

        // ── Step 2: Validation slice of the training split ──
        let train_labels = prepared.train_labels();
        let carve = split_indices(&train_labels, 1.0 - cfg.validation_ratio, cfg.data.seed, cfg.data.stratify);
        let (train_raw, val_raw) = carve.apply(&prepared.train);
        let val_dist = LabelDistribution::from_labels(val_raw.iter().map(|r| r.label()));
        if val_raw.is_empty() {
            let msg = "validation slice is empty; early stopping monitors training loss".to_string();
            tracing::warn!("{}", msg);
            report.warnings.push(msg);
        }
        report.splits.validation = Some(val_dist);
        tracing::info!("Neural split: {} train / {} validation / {} test", train_raw.len(), val_raw.len(), prepared.test.len());

        // ── Step 3: Clean ──
        let preprocessor = Preprocessor::new(cfg.data.preprocess.clone());
        let splits = NeuralSplits {
            train_clean: preprocessor.clean_all(&train_raw),
            val_clean:   preprocessor.clean_all(&val_raw),
            test_clean:  preprocessor.clean_all(&prepared.test),
            train_raw,
            val_raw,
            test_raw:    prepared.test.clone(),
        };

        // ── Step 4: Save config ──
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_json("neural_config.json", cfg)?;

        // ── Step 5: Word sequences, shared by both recurrent models ──
        let word_splits = if cfg.models.iter().any(|k| !k.uses_subwords()) {
            Some(self.encode_words(&splits, &ckpt)?)
        } else {
            None
        };

        // ── Steps 6 + 7: Train and evaluate each model ──
        let device = Device::default();
        for &kind in &cfg.models {
            tracing::info!("Training {}", kind);
            let words = word_splits.as_ref().ok_or_else(|| anyhow!("word sequences were not built"));
            let result = match kind {
                NeuralModelKind::Rnn => words.and_then(|w| self.run_rnn(w, &ckpt, &device)),
                NeuralModelKind::Lstm => words.and_then(|w| self.run_lstm(w, &ckpt, &device)),
                NeuralModelKind::Transformer => self.run_transformer(&splits, &ckpt, &device),
            };
            let model_report = result.unwrap_or_else(|e| {
                tracing::warn!("{} failed: {:#}", kind, e);
                ModelReport::failed(kind.name(), ModelFamily::Neural, format!("training failed: {e:#}"))
            });
            report.models.push(model_report);
        }

        Ok(report)
    }

    fn encode_words(&self, splits: &NeuralSplits, ckpt: &CheckpointManager) -> Result<EncodedSplits> {
        let cfg = &self.config;
        let vocab = SequenceVocabulary::fit(&splits.train_clean, cfg.max_vocab, cfg.truncation, cfg.padding);
        ckpt.save_json("sequence_vocab.json", &vocab)?;

        let encode = |records: &[CleanedRecord]| -> Vec<SequenceSample> {
            records.iter().map(|r| vocab.encode_record(r, cfg.max_len)).collect()
        };
        Ok(EncodedSplits {
            vocab_size: vocab.vocab_size(),
            train:      encode(&splits.train_clean),
            validation: encode(&splits.val_clean),
            test:       encode(&splits.test_clean),
        })
    }

    fn run_rnn(&self, words: &EncodedSplits, ckpt: &CheckpointManager, device: &Device) -> Result<ModelReport> {
        let cfg = &self.config;
        TrainBackend::seed(cfg.trainer.seed);
        let model = RnnClassifierConfig::new(words.vocab_size)
            .with_embed_dim(cfg.embed_dim)
            .with_hidden_size(cfg.hidden_size)
            .with_dropout(cfg.rnn_dropout)
            .init::<TrainBackend>(device);
        self.train_and_evaluate(NeuralModelKind::Rnn, model, words.clone(), Vec::new(), ckpt, device)
    }

    fn run_lstm(&self, words: &EncodedSplits, ckpt: &CheckpointManager, device: &Device) -> Result<ModelReport> {
        let cfg = &self.config;
        TrainBackend::seed(cfg.trainer.seed);
        let model = LstmClassifierConfig::new(words.vocab_size)
            .with_embed_dim(cfg.embed_dim)
            .with_hidden_size(cfg.hidden_size)
            .with_dropout(cfg.rnn_dropout)
            .init::<TrainBackend>(device);
        self.train_and_evaluate(NeuralModelKind::Lstm, model, words.clone(), Vec::new(), ckpt, device)
    }

    fn run_transformer(&self, splits: &NeuralSplits, ckpt: &CheckpointManager, device: &Device) -> Result<ModelReport> {
        let cfg = &self.config;
        let preprocessor = Preprocessor::new(cfg.data.preprocess.clone());
        let texts = |records: &[EmailRecord]| -> Vec<String> {
            records.iter().map(|r| preprocessor.clean_text(r.raw_text())).collect()
        };
        let train_texts = texts(&splits.train_raw);

        // ── Encoder and tokenizer: checkpoint first, scratch otherwise ──
        TrainBackend::seed(cfg.trainer.seed);
        let mut warnings = Vec::new();
        let pretrained = match &cfg.pretrained_model {
            Some(dir) => self.pretrained_start(dir, device).map_err(|e| format!("'{dir}': {e:#}")),
            None => Err("--from-scratch".to_string()),
        };
        let (encoder, model) = match pretrained {
            Ok(start) => start,
            Err(reason) => {
                let msg = format!("no pre-trained checkpoint ({reason}); transformer trained from scratch");
                tracing::warn!("{}", msg);
                warnings.push(msg);
                TrainBackend::seed(cfg.trainer.seed);
                self.scratch_start(&train_texts, ckpt, device)?
            }
        };

        let encode = |texts: &[String], records: &[EmailRecord]| -> Result<Vec<SequenceSample>> {
            texts.iter().zip(records).map(|(t, r)| encoder.encode_text(t, r.label())).collect()
        };
        let encoded = EncodedSplits {
            vocab_size: encoder.embedding_size(),
            train:      encode(&train_texts, &splits.train_raw)?,
            validation: encode(&texts(&splits.val_raw), &splits.val_raw)?,
            test:       encode(&texts(&splits.test_raw), &splits.test_raw)?,
        };

        self.train_and_evaluate(NeuralModelKind::Transformer, model, encoded, warnings, ckpt, device)
    }

    /// Tokenizer and encoder weights of a HuggingFace checkpoint.
    fn pretrained_start(
        &self,
        dir: &str,
        device: &Device,
    ) -> Result<(SubwordEncoder, TransformerClassifier<TrainBackend>)> {
        let cfg = &self.config;
        let checkpoint = PretrainedCheckpoint::open(dir)?;
        let model_cfg  = checkpoint.config()?.to_model_config()?;
        if cfg.subword_max_len > model_cfg.max_input_len() {
            bail!(
                "subword_max_len {} exceeds the {} positions of the checkpoint",
                cfg.subword_max_len,
                model_cfg.max_input_len()
            );
        }

        let encoder = SubwordEncoder::new(checkpoint.tokenizer()?, cfg.subword_max_len)?;
        if encoder.embedding_size() > model_cfg.vocab_size {
            bail!(
                "tokenizer emits ids up to {} but the checkpoint has {} embeddings",
                encoder.embedding_size() - 1,
                model_cfg.vocab_size
            );
        }
        let model = checkpoint.load_classifier::<TrainBackend>(&model_cfg, device)?;
        tracing::info!("Fine-tuning pre-trained encoder from '{}'", checkpoint.dir().display());
        Ok((encoder, model))
    }

    /// WordPiece tokenizer learned from the training text and a small
    /// randomly initialised encoder.
    fn scratch_start(
        &self,
        train_texts: &[String],
        ckpt: &CheckpointManager,
        device: &Device,
    ) -> Result<(SubwordEncoder, TransformerClassifier<TrainBackend>)> {
        let cfg = &self.config;
        let tokenizer = TokenizerStore::new(ckpt.dir()).train(train_texts, cfg.subword_vocab_size)?;
        let encoder   = SubwordEncoder::new(tokenizer, cfg.subword_max_len)?;
        let model = TransformerClassifierConfig::new(encoder.embedding_size(), cfg.subword_max_len)
            .with_d_model(cfg.d_model)
            .with_num_heads(cfg.num_heads)
            .with_num_layers(cfg.num_layers)
            .with_d_ff(cfg.d_ff)
            .with_dropout(cfg.transformer_dropout)
            .init::<TrainBackend>(device);
        Ok((encoder, model))
    }

    fn train_and_evaluate<M>(
        &self,
        kind:         NeuralModelKind,
        model:        M,
        encoded:      EncodedSplits,
        mut warnings: Vec<String>,
        ckpt:         &CheckpointManager,
        device:       &Device,
    ) -> Result<ModelReport>
    where
        M: AutodiffModule<TrainBackend> + SequenceClassifier<TrainBackend>,
        M::InnerModule: SequenceClassifier<EvalBackend>,
    {
        let cfg = &self.config.trainer;
        let test_labels: Vec<Label> = encoded.test.iter().map(|s| s.label).collect();

        let start   = Instant::now();
        let outcome = train_classifier(
            kind.name(),
            model,
            SequenceDataset::new(encoded.train),
            &SequenceDataset::new(encoded.validation),
            cfg,
            ckpt,
            device,
        )?;
        let train_seconds = start.elapsed().as_secs_f64();
        if outcome.stopped_early {
            tracing::info!("{} stopped early; best epoch {} of {}", kind, outcome.best_epoch, outcome.history.len());
        }

        let (test_loss, probs) = score_samples(&outcome.model, &encoded.test, cfg.batch_size, device)?;
        let eval = evaluate(&test_labels, &probs, 0.5)?;
        tracing::info!(
            "{}: test_loss={:.4} accuracy={:.4} f1={:.4} roc_auc={:.4} ({:.1}s)",
            kind, test_loss, eval.metrics.accuracy, eval.metrics.f1, eval.metrics.roc_auc, train_seconds,
        );

        warnings.extend(eval.warnings);
        Ok(ModelReport {
            model: kind.name().to_string(),
            family: ModelFamily::Neural,
            metrics: Some(eval.metrics),
            train_seconds,
            warnings,
        })
    }
}
