// Gradient-boosted regression trees on the binomial log-likelihood,
// trained by the gbdt crate.
//
// gbdt wants labels in {-1, +1} and returns P(spam) for this loss.
// Row and column subsampling stay at 1.0: gbdt draws those samples
// from an unseeded generator, and refits must be reproducible.
//
// Reference: Friedman (2001), "Greedy Function Approximation"

use anyhow::{anyhow, bail, Result};
use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::{check_predict_input, check_training_input, constant_scores, single_class, BinaryClassifier, FitOutcome, Fitted};
use crate::domain::email::Label;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators:  usize,
    pub learning_rate: f64,
    pub max_depth:     usize,
    pub min_leaf_size: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self { n_estimators: 100, learning_rate: 0.1, max_depth: 3, min_leaf_size: 1 }
    }
}

pub struct GradientBoosting {
    params:     BoostingParams,
    fitted:     Option<Fitted<GBDT>>,
    n_features: usize,
}

impl GradientBoosting {
    pub fn new(params: BoostingParams) -> Self {
        Self { params, fitted: None, n_features: 0 }
    }

    fn config(&self, n_features: usize) -> Config {
        let mut cfg = Config::new();
        cfg.set_feature_size(n_features);
        cfg.set_max_depth(self.params.max_depth as u32);
        cfg.set_iterations(self.params.n_estimators);
        cfg.set_shrinkage(self.params.learning_rate as f32);
        cfg.set_min_leaf_size(self.params.min_leaf_size);
        cfg.set_loss("LogLikelyhood");
        cfg.set_data_sample_ratio(1.0);
        cfg.set_feature_sample_ratio(1.0);
        cfg.set_training_optimization_level(2);
        cfg.set_debug(false);
        cfg
    }
}

fn training_rows(x: ArrayView2<f32>, y: &[Label]) -> DataVec {
    x.rows()
        .into_iter()
        .zip(y)
        .map(|(row, label)| {
            let target = if label.is_spam() { 1.0 } else { -1.0 };
            Data::new_training_data(row.to_vec(), 1.0, target, None)
        })
        .collect()
}

fn test_rows(x: ArrayView2<f32>) -> DataVec {
    x.rows().into_iter().map(|row| Data::new_test_data(row.to_vec(), None)).collect()
}

impl BinaryClassifier for GradientBoosting {
    fn name(&self) -> &'static str {
        "gradient_boosting"
    }

    fn fit(&mut self, x: ArrayView2<f32>, y: &[Label]) -> Result<FitOutcome> {
        check_training_input(x, y)?;
        if self.params.n_estimators == 0 {
            bail!("gradient_boosting needs at least one estimator");
        }
        if self.params.max_depth == 0 {
            bail!("gradient_boosting needs trees of depth >= 1");
        }
        self.n_features = x.ncols();
        if let Some(only) = single_class(y) {
            self.fitted = Some(Fitted::Constant(only));
            return Ok(FitOutcome::single_class(self.name(), only));
        }

        let mut model = GBDT::new(&self.config(x.ncols()));
        let mut train = training_rows(x, y);
        model.fit(&mut train);
        tracing::debug!("gradient boosting grew {} trees", self.params.n_estimators);

        self.fitted = Some(Fitted::Model(model));
        Ok(FitOutcome { warnings: Vec::new(), iterations: Some(self.params.n_estimators) })
    }

    /// P(spam | x)
    fn decision_scores(&self, x: ArrayView2<f32>) -> Result<Vec<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| anyhow!("gradient_boosting is not fitted"))?;
        check_predict_input(x, self.n_features)?;
        match fitted {
            Fitted::Constant(label) => Ok(constant_scores(*label, x.nrows(), self.threshold())),
            Fitted::Model(model) => Ok(model.predict(&test_rows(x))),
        }
    }

    fn threshold(&self) -> f32 {
        0.5
    }
}
