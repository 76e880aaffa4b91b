// ============================================================
// Layer 6 - Metrics
// ============================================================
// Two concerns live here:
//
//   1. evaluate(): truth + decision scores + threshold → the
//      MetricsReport every model is compared on. Spam is the
//      positive class.
//
//        precision = TP / (TP + FP)
//        recall    = TP / (TP + FN)
//        F1        = 2TP / (2TP + FP + FN)
//        ROC-AUC   = Mann-Whitney U / (n_pos · n_neg),
//                    tied scores share their average rank
//
//      A zero denominator gives 0.0 and a single-class split
//      gives ROC-AUC 0.5. Both add a warning instead of failing.
//
//   2. MetricsLogger: one CSV row per neural training epoch.
//
// Example CSV output (checkpoints/lstm_metrics.csv):
//   epoch,train_loss,val_loss,val_accuracy,val_f1
//   1,0.612000,0.540100,0.781000,0.702000
//   2,0.401300,0.388800,0.866000,0.829000

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::domain::email::Label;
use crate::domain::report::{ClassMetrics, ConfusionMatrix, MetricsReport};

// ─── Evaluation ───────────────────────────────────────────────────────────────

/// Metrics for one model on one split, plus any conventions applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub metrics:  MetricsReport,
    pub warnings: Vec<String>,
}

pub fn confusion_matrix(truth: &[Label], predicted: &[Label]) -> ConfusionMatrix {
    let mut cm = ConfusionMatrix::default();
    for (t, p) in truth.iter().zip(predicted) {
        match (t, p) {
            (Label::Spam, Label::Spam) => cm.true_positive += 1,
            (Label::Legit, Label::Spam) => cm.false_positive += 1,
            (Label::Legit, Label::Legit) => cm.true_negative += 1,
            (Label::Spam, Label::Legit) => cm.false_negative += 1,
        }
    }
    cm
}

/// Area under the ROC curve, or None when `truth` holds a single class.
pub fn roc_auc(truth: &[Label], scores: &[f32]) -> Option<f64> {
    let n_pos = truth.iter().filter(|l| l.is_spam()).count();
    let n_neg = truth.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Average 1-based rank per tie group, summed over positives
    let mut pos_rank_sum = 0.0f64;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        pos_rank_sum += avg_rank * order[i..=j].iter().filter(|&&k| truth[k].is_spam()).count() as f64;
        i = j + 1;
    }

    let (p, n) = (n_pos as f64, n_neg as f64);
    Some((pos_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

fn ratio(num: usize, den: usize, what: &str, warnings: &mut Vec<String>) -> f64 {
    if den == 0 {
        warnings.push(format!("{what} is undefined (zero denominator); reported as 0.0"));
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Score a model's output against the ground truth.
pub fn evaluate(truth: &[Label], scores: &[f32], threshold: f32) -> Result<Evaluation> {
    if truth.len() != scores.len() {
        bail!("{} labels but {} scores", truth.len(), scores.len());
    }
    if truth.is_empty() {
        bail!("cannot evaluate on an empty split");
    }

    let predicted: Vec<Label> = scores
        .iter()
        .map(|&s| if s >= threshold { Label::Spam } else { Label::Legit })
        .collect();
    let cm = confusion_matrix(truth, &predicted);
    let (tp, fp, tn, fn_) = (cm.true_positive, cm.false_positive, cm.true_negative, cm.false_negative);

    let mut warnings = Vec::new();
    let spam = ClassMetrics {
        precision: ratio(tp, tp + fp, "spam precision", &mut warnings),
        recall:    ratio(tp, tp + fn_, "spam recall", &mut warnings),
        f1:        ratio(2 * tp, 2 * tp + fp + fn_, "spam F1", &mut warnings),
        support:   tp + fn_,
    };
    let legit = ClassMetrics {
        precision: ratio(tn, tn + fn_, "legit precision", &mut warnings),
        recall:    ratio(tn, tn + fp, "legit recall", &mut warnings),
        f1:        ratio(2 * tn, 2 * tn + fp + fn_, "legit F1", &mut warnings),
        support:   tn + fp,
    };

    let roc_auc = roc_auc(truth, scores).unwrap_or_else(|| {
        warnings.push("ROC-AUC is undefined for a single-class split; reported as 0.5".to_string());
        0.5
    });

    Ok(Evaluation {
        metrics: MetricsReport {
            accuracy: (tp + tn) as f64 / cm.total() as f64,
            precision: spam.precision,
            recall: spam.recall,
            f1: spam.f1,
            roc_auc,
            legit,
            spam,
            confusion: cm,
        },
        warnings,
    })
}

// ─── Epoch Logging ────────────────────────────────────────────────────────────

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average cross-entropy loss over all training batches
    pub train_loss: f64,

    /// Average cross-entropy loss on the validation slice.
    /// Early stopping watches this value.
    pub val_loss: f64,

    pub val_accuracy: f64,

    /// Spam F1 on the validation slice
    pub val_f1: f64,
}

impl EpochMetrics {
    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Logs epoch metrics for one model to `{dir}/{model}_metrics.csv`.
pub struct MetricsLogger {
    csv_path: PathBuf,
    writer:   csv::Writer<fs::File>,
}

impl MetricsLogger {
    /// Starts a fresh file, so each run's curve stands alone.
    pub fn new(dir: impl Into<PathBuf>, model: &str) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join(format!("{model}_metrics.csv"));
        let writer = csv::Writer::from_path(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path, writer })
    }

    /// Append one epoch's metrics and flush, so a crashed run keeps its curve.
    pub fn log(&mut self, m: &EpochMetrics) -> Result<()> {
        self.writer.serialize(m)?;
        self.writer.flush()?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use Label::{Legit, Spam};

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics { epoch: 2, train_loss: 2.5, val_loss: 2.3, val_accuracy: 0.5, val_f1: 0.4 };
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
    }

    #[test]
    fn test_perfect_classifier() {
        let truth  = [Spam, Legit, Spam, Legit];
        let scores = [0.9, 0.1, 0.8, 0.3];
        let e = evaluate(&truth, &scores, 0.5).unwrap();
        assert_eq!(e.metrics.accuracy, 1.0);
        assert_eq!(e.metrics.f1, 1.0);
        assert_eq!(e.metrics.roc_auc, 1.0);
        assert!(e.warnings.is_empty());
    }

    #[test]
    fn test_known_confusion() {
        // TP=2 FN=1 FP=1 TN=2
        let truth  = [Spam, Spam, Spam, Legit, Legit, Legit];
        let scores = [0.9, 0.7, 0.2, 0.6, 0.1, 0.3];
        let e = evaluate(&truth, &scores, 0.5).unwrap();
        let m = &e.metrics;
        assert_eq!(m.confusion, ConfusionMatrix { true_positive: 2, false_positive: 1, true_negative: 2, false_negative: 1 });
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.legit.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(m.spam.support, 3);
        assert_eq!(m.legit.support, 3);
        // 7 of 9 positive/negative pairs are ordered correctly
        assert!((m.roc_auc - 7.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_ties_count_half() {
        let truth = [Spam, Legit];
        assert_eq!(roc_auc(&truth, &[0.5, 0.5]), Some(0.5));
    }

    #[test]
    fn test_no_predicted_positives_is_defined() {
        let truth  = [Spam, Legit, Legit];
        let scores = [0.1, 0.2, 0.3];
        let e = evaluate(&truth, &scores, 0.5).unwrap();
        assert_eq!(e.metrics.precision, 0.0);
        assert_eq!(e.metrics.recall, 0.0);
        assert_eq!(e.metrics.f1, 0.0);
        assert!(e.warnings.iter().any(|w| w.contains("spam precision")));
    }

    #[test]
    fn test_single_class_split() {
        let e = evaluate(&[Spam], &[0.7], 0.5).unwrap();
        let m = &e.metrics;
        for v in [m.accuracy, m.precision, m.recall, m.f1, m.roc_auc] {
            assert!(v.is_finite());
        }
        assert_eq!(m.roc_auc, 0.5);
        assert!(e.warnings.iter().any(|w| w.contains("ROC-AUC")));
    }

    #[test]
    fn test_length_mismatch_is_error() {
        assert!(evaluate(&[Spam, Legit], &[0.1], 0.5).is_err());
        assert!(evaluate(&[], &[], 0.5).is_err());
    }

    #[test]
    fn test_logger_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = MetricsLogger::new(dir.path(), "rnn").unwrap();
        logger.log(&EpochMetrics { epoch: 1, train_loss: 0.7, val_loss: 0.6, val_accuracy: 0.5, val_f1: 0.4 }).unwrap();
        let text = std::fs::read_to_string(logger.csv_path()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("epoch,train_loss,val_loss,val_accuracy,val_f1"));
        assert!(lines.next().unwrap().starts_with("1,0.7,0.6"));
    }
}
