// ============================================================
// Layer 5b - Training Loop
// ============================================================
// One generic train + validation loop shared by every
// SequenceClassifier, using Burn's DataLoader and Adam.
//
//   for each epoch:
//     train on shuffled mini-batches (seeded)
//     validate on the held-out validation slice
//     if val_loss improved → keep model.valid(), checkpoint it
//     else if `patience` epochs without improvement → stop
//
// The returned model is the best epoch's, not the last one.
//
// Key Burn insight:
//   - Training uses TrainBackend (Autodiff<NdArray>) for gradients
//   - model.valid() returns the model on EvalBackend (NdArray),
//     with dropout disabled
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam,
//            Prechelt (1998) early stopping

use anyhow::{anyhow, Result};
use burn::{
    data::dataloader::{batcher::Batcher, DataLoaderBuilder},
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::activation::softmax,
};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::SequenceBatcher,
    dataset::{SequenceDataset, SequenceSample},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{evaluate, EpochMetrics, MetricsLogger},
};
use crate::ml::model::SequenceClassifier;

pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
pub type EvalBackend  = burn::backend::NdArray;
pub type Device       = burn::backend::ndarray::NdArrayDevice;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub epochs:        usize,
    pub batch_size:    usize,
    pub learning_rate: f64,
    /// Epochs without val_loss improvement before stopping; 0 disables
    pub patience:      usize,
    pub seed:          u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self { epochs: 10, batch_size: 32, learning_rate: 1e-3, patience: 3, seed: 42 }
    }
}

/// The best model found plus how training went.
pub struct TrainingOutcome<M> {
    pub model:         M,
    pub best_epoch:    usize,
    pub best_val_loss: f64,
    pub stopped_early: bool,
    pub history:       Vec<EpochMetrics>,
}

/// Train `model` and return the epoch with the lowest validation loss.
///
/// With an empty validation slice the training loss is monitored
/// instead, so early stopping still has a signal.
pub fn train_classifier<M>(
    name:       &str,
    mut model:  M,
    train:      SequenceDataset,
    validation: &SequenceDataset,
    cfg:        &TrainerConfig,
    ckpt:       &CheckpointManager,
    device:     &Device,
) -> Result<TrainingOutcome<M::InnerModule>>
where
    M: AutodiffModule<TrainBackend> + SequenceClassifier<TrainBackend>,
    M::InnerModule: SequenceClassifier<EvalBackend>,
{
    if train.samples().is_empty() {
        return Err(anyhow!("{name}: no training samples"));
    }
    let mut logger = MetricsLogger::new(ckpt.dir(), name)?;

    // ── Adam optimiser ──
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    let train_loader = DataLoaderBuilder::new(SequenceBatcher::<TrainBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train);
    let ce = CrossEntropyLossConfig::new().init(device);

    let mut best: Option<(M::InnerModule, usize, f64)> = None;
    let mut since_best    = 0usize;
    let mut stopped_early = false;
    let mut history       = Vec::new();

    for epoch in 1..=cfg.epochs {
        // ── Training phase ──
        let mut train_loss_sum = 0.0f64;
        let mut train_seen     = 0usize;
        for batch in train_loader.iter() {
            let n = batch.labels.dims()[0];
            let logits = model.forward(batch.token_ids, batch.attention_mask);
            let loss   = ce.forward(logits, batch.labels);

            train_loss_sum += loss.clone().into_scalar().elem::<f64>() * n as f64;
            train_seen     += n;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }
        let train_loss = train_loss_sum / train_seen.max(1) as f64;

        // ── Validation phase ──
        let model_valid = model.valid();
        let (val_loss, val_accuracy, val_f1) = if validation.samples().is_empty() {
            (train_loss, f64::NAN, f64::NAN)
        } else {
            let (loss, probs) = score_samples(&model_valid, validation.samples(), cfg.batch_size, device)?;
            let eval = evaluate(&validation.labels(), &probs, 0.5)?;
            (loss, eval.metrics.accuracy, eval.metrics.f1)
        };

        let metrics = EpochMetrics { epoch, train_loss, val_loss, val_accuracy, val_f1 };
        println!(
            "[{name}] Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}% | val_f1={:.3}",
            epoch, cfg.epochs, train_loss, val_loss, val_accuracy * 100.0, val_f1,
        );
        logger.log(&metrics)?;

        let best_loss = best.as_ref().map_or(f64::INFINITY, |(_, _, l)| *l);
        let improved  = metrics.is_improvement(best_loss);
        history.push(metrics);

        if improved {
            ckpt.save_model::<EvalBackend, _>(&model_valid, name)?;
            best = Some((model_valid, epoch, val_loss));
            since_best = 0;
        } else {
            since_best += 1;
            if cfg.patience > 0 && since_best >= cfg.patience {
                tracing::info!("{}: early stop after epoch {} ({} epochs without improvement)", name, epoch, since_best);
                stopped_early = true;
                break;
            }
        }
    }

    // A NaN loss never counts as an improvement; fall back to the last model.
    let (model, best_epoch, best_val_loss) = match best {
        Some(b) => b,
        None => (model.valid(), history.len(), f64::NAN),
    };
    tracing::info!("{}: training complete, best epoch {} (val_loss={:.4})", name, best_epoch, best_val_loss);

    Ok(TrainingOutcome { model, best_epoch, best_val_loss, stopped_early, history })
}

/// Mean cross-entropy and per-sample spam probability, in input order.
pub fn score_samples<M: SequenceClassifier<EvalBackend>>(
    model:      &M,
    samples:    &[SequenceSample],
    batch_size: usize,
    device:     &Device,
) -> Result<(f64, Vec<f32>)> {
    let batcher = SequenceBatcher::<EvalBackend>::new(device.clone());
    let ce      = CrossEntropyLossConfig::new().init(device);

    let mut loss_sum = 0.0f64;
    let mut probs    = Vec::with_capacity(samples.len());
    for chunk in samples.chunks(batch_size.max(1)) {
        let batch  = batcher.batch(chunk.to_vec());
        let n      = chunk.len();
        let logits = model.forward(batch.token_ids, batch.attention_mask);

        loss_sum += ce.forward(logits.clone(), batch.labels).into_scalar().elem::<f64>() * n as f64;

        // softmax over the class axis, keep the spam column
        let spam = softmax(logits, 1).slice([0..n, 1..2]).reshape([n]);
        let spam = spam
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("cannot read probabilities: {e:?}"))?;
        probs.extend(spam);
    }
    Ok((loss_sum / samples.len().max(1) as f64, probs))
}
