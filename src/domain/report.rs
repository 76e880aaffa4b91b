// ============================================================
// Layer 3 - Report Types
// ============================================================
// Everything a run prints or writes to disk at the end.
// The numbers themselves are computed in infra::metrics.

use serde::{Deserialize, Serialize};

use crate::domain::email::LabelDistribution;

/// Counts of the four prediction outcomes, spam being positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive:  usize,
    pub false_positive: usize,
    pub true_negative:  usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }
}

/// Precision / recall / F1 for one class, with its support in the
/// evaluated split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   usize,
}

/// The five headline metrics (spam as positive class) plus the per-class
/// breakdown that keeps the class imbalance visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub roc_auc:   f64,
    pub legit:     ClassMetrics,
    pub spam:      ClassMetrics,
    pub confusion: ConfusionMatrix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Classical,
    Neural,
}

/// Result of training and evaluating one model variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReport {
    pub model:         String,
    pub family:        ModelFamily,
    /// None when the model could not be fitted at all
    pub metrics:       Option<MetricsReport>,
    pub train_seconds: f64,
    pub warnings:      Vec<String>,
}

impl ModelReport {
    pub fn failed(model: impl Into<String>, family: ModelFamily, reason: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            family,
            metrics: None,
            train_seconds: 0.0,
            warnings: vec![reason.into()],
        }
    }
}

/// Sizes and class balance of every partition used in a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitSummary {
    pub train:      LabelDistribution,
    pub validation: Option<LabelDistribution>,
    pub test:       LabelDistribution,
}

/// Top-level, machine-readable summary of one benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub dataset:     String,
    pub seed:        u64,
    pub train_ratio: f64,
    pub stratified:  bool,
    pub splits:      SplitSummary,
    pub models:      Vec<ModelReport>,
    pub warnings:    Vec<String>,
}

impl RunReport {
    pub fn new(dataset: impl Into<String>, seed: u64, train_ratio: f64, stratified: bool) -> Self {
        Self {
            dataset: dataset.into(),
            seed,
            train_ratio,
            stratified,
            splits: SplitSummary::default(),
            models: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn model(&self, name: &str) -> Option<&ModelReport> {
        self.models.iter().find(|m| m.model == name)
    }

    /// Fold another report over the same split into this one.
    pub fn absorb(&mut self, other: RunReport) {
        if self.splits.validation.is_none() {
            self.splits.validation = other.splits.validation;
        }
        self.models.extend(other.models);
        for w in other.warnings {
            if !self.warnings.contains(&w) {
                self.warnings.push(w);
            }
        }
    }
}
