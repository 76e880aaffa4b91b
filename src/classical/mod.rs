// ============================================================
// Layer 5a - Classical Classifiers
// ============================================================
// Four supervised models over the dense TF-IDF matrix, each a thin
// adapter around a registry solver:
//
//   logistic.rs   - L2 logistic regression   (linfa-logistic)
//   linear_svc.rs - C-SVM with linear kernel (linfa-svm)
//   forest.rs     - bagged decision trees    (linfa-trees)
//   boosting.rs   - gradient-boosted trees   (gbdt)
//
// They all implement BinaryClassifier so the use case can fit and
// score them in one loop over the same train/test matrices.
//
// A training split holding a single class cannot be handed to any
// of the solvers. The adapters then remember that class, score every
// row as it and say so in FitOutcome.

pub mod boosting;
pub mod forest;
pub mod linear_svc;
pub mod logistic;

use anyhow::{bail, Result};
use linfa::Dataset;
use ndarray::{Array1, ArrayView2, Ix1};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::email::Label;
use boosting::{BoostingParams, GradientBoosting};
use forest::{ForestParams, RandomForest};
use linear_svc::{LinearSvc, SvcParams};
use logistic::{LogisticParams, LogisticRegression};

/// What a successful fit reports back besides the model itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitOutcome {
    /// Non-fatal problems, e.g. a single-class training split
    pub warnings:   Vec<String>,
    pub iterations: Option<usize>,
}

impl FitOutcome {
    fn single_class(model: &str, only: Label) -> Self {
        let msg = format!("{model}: training split holds only {only} records, every email is scored as {only}");
        tracing::warn!("{}", msg);
        Self { warnings: vec![msg], iterations: None }
    }
}

pub trait BinaryClassifier {
    fn name(&self) -> &'static str;

    fn fit(&mut self, x: ArrayView2<f32>, y: &[Label]) -> Result<FitOutcome>;

    /// Higher means more spam-like. Comparable against threshold().
    fn decision_scores(&self, x: ArrayView2<f32>) -> Result<Vec<f32>>;

    fn threshold(&self) -> f32;

    fn predict(&self, x: ArrayView2<f32>) -> Result<Vec<Label>> {
        let t = self.threshold();
        Ok(self
            .decision_scores(x)?
            .into_iter()
            .map(|s| if s >= t { Label::Spam } else { Label::Legit })
            .collect())
    }
}

/// A fitted solver, or the lone class of a degenerate training split.
pub(crate) enum Fitted<M> {
    Model(M),
    Constant(Label),
}

/// Scores of a constant fit, half a unit either side of the threshold.
pub(crate) fn constant_scores(label: Label, n_rows: usize, threshold: f32) -> Vec<f32> {
    let score = if label.is_spam() { threshold + 0.5 } else { threshold - 0.5 };
    vec![score; n_rows]
}

/// Shared precondition for every fit().
pub(crate) fn check_training_input(x: ArrayView2<f32>, y: &[Label]) -> Result<()> {
    if x.nrows() != y.len() {
        bail!("feature matrix has {} rows but {} labels were given", x.nrows(), y.len());
    }
    if y.is_empty() {
        bail!("cannot fit on an empty training set");
    }
    Ok(())
}

pub(crate) fn check_predict_input(x: ArrayView2<f32>, expected_cols: usize) -> Result<()> {
    if x.ncols() != expected_cols {
        bail!("model was fitted on {} features but got {}", expected_cols, x.ncols());
    }
    Ok(())
}

/// The class every label shares, if there is only one.
pub(crate) fn single_class(y: &[Label]) -> Option<Label> {
    let first = *y.first()?;
    y.iter().all(|&l| l == first).then_some(first)
}

/// linfa dataset with `true` marking spam.
pub(crate) fn to_dataset(x: ArrayView2<f32>, y: &[Label]) -> Dataset<f64, bool, Ix1> {
    let targets: Array1<bool> = y.iter().map(|l| l.is_spam()).collect();
    Dataset::new(x.mapv(f64::from), targets)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassicalModelKind {
    LogisticRegression,
    LinearSvc,
    RandomForest,
    GradientBoosting,
}

impl ClassicalModelKind {
    pub const ALL: [ClassicalModelKind; 4] = [
        ClassicalModelKind::LogisticRegression,
        ClassicalModelKind::LinearSvc,
        ClassicalModelKind::RandomForest,
        ClassicalModelKind::GradientBoosting,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClassicalModelKind::LogisticRegression => "logistic_regression",
            ClassicalModelKind::LinearSvc => "linear_svc",
            ClassicalModelKind::RandomForest => "random_forest",
            ClassicalModelKind::GradientBoosting => "gradient_boosting",
        }
    }
}

impl fmt::Display for ClassicalModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hyperparameters for every classical variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassicalParams {
    pub logistic: LogisticParams,
    pub svc:      SvcParams,
    pub forest:   ForestParams,
    pub boosting: BoostingParams,
}

pub fn build_classifier(kind: ClassicalModelKind, params: &ClassicalParams, seed: u64) -> Box<dyn BinaryClassifier> {
    match kind {
        ClassicalModelKind::LogisticRegression => Box::new(LogisticRegression::new(params.logistic.clone())),
        ClassicalModelKind::LinearSvc => Box::new(LinearSvc::new(params.svc.clone())),
        ClassicalModelKind::RandomForest => Box::new(RandomForest::new(params.forest.clone(), seed)),
        ClassicalModelKind::GradientBoosting => Box::new(GradientBoosting::new(params.boosting.clone())),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use ndarray::Array2;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::domain::email::Label;

    /// Two noisy clusters in 6 dimensions: spam loads on the first three
    /// features, legit on the last three. Linearly separable up to noise.
    pub fn blobs(n_per_class: usize, seed: u64) -> (Array2<f32>, Vec<Label>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = n_per_class * 2;
        let mut x = Array2::<f32>::zeros((n, 6));
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let spam = i % 2 == 0;
            for j in 0..6 {
                let hot = (j < 3) == spam;
                let base = if hot { 1.0 } else { 0.0 };
                x[[i, j]] = base + rng.gen_range(0.0..0.4);
            }
            y.push(if spam { Label::Spam } else { Label::Legit });
        }
        (x, y)
    }

    pub fn accuracy(pred: &[Label], truth: &[Label]) -> f64 {
        let hits = pred.iter().zip(truth).filter(|(p, t)| p == t).count();
        hits as f64 / truth.len() as f64
    }
}
