// L2-regularised logistic regression on linfa-logistic.
//
// linfa minimises the summed log-loss plus (alpha / 2) ||w||², so the
// familiar inverse strength C maps to alpha = 1 / C. The bias is not
// penalised.

use anyhow::{anyhow, bail, Result};
use linfa::traits::Fit;
use linfa_logistic::FittedLogisticRegression;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::{
    check_predict_input, check_training_input, constant_scores, single_class, to_dataset, BinaryClassifier,
    FitOutcome, Fitted,
};
use crate::domain::email::Label;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularisation strength
    pub c:        f64,
    pub max_iter: usize,
    /// Stop once the gradient norm falls below this
    pub tol:      f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self { c: 1.0, max_iter: 1000, tol: 1e-4 }
    }
}

pub struct LogisticRegression {
    params:     LogisticParams,
    fitted:     Option<Fitted<FittedLogisticRegression<f64, bool>>>,
    n_features: usize,
}

impl LogisticRegression {
    pub fn new(params: LogisticParams) -> Self {
        Self { params, fitted: None, n_features: 0 }
    }
}

impl BinaryClassifier for LogisticRegression {
    fn name(&self) -> &'static str {
        "logistic_regression"
    }

    fn fit(&mut self, x: ArrayView2<f32>, y: &[Label]) -> Result<FitOutcome> {
        check_training_input(x, y)?;
        if self.params.c <= 0.0 {
            bail!("logistic_regression needs C > 0, got {}", self.params.c);
        }
        self.n_features = x.ncols();
        if let Some(only) = single_class(y) {
            self.fitted = Some(Fitted::Constant(only));
            return Ok(FitOutcome::single_class(self.name(), only));
        }

        let model = linfa_logistic::LogisticRegression::<f64>::default()
            .alpha(1.0 / self.params.c)
            .max_iterations(self.params.max_iter as u64)
            .gradient_tolerance(self.params.tol)
            .fit(&to_dataset(x, y))
            .map_err(|e| anyhow!("logistic_regression: {e}"))?;
        tracing::debug!("logistic regression intercept {:.4}", model.intercept());

        self.fitted = Some(Fitted::Model(model));
        Ok(FitOutcome::default())
    }

    /// P(spam | x)
    fn decision_scores(&self, x: ArrayView2<f32>) -> Result<Vec<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| anyhow!("logistic_regression is not fitted"))?;
        check_predict_input(x, self.n_features)?;
        match fitted {
            Fitted::Constant(label) => Ok(constant_scores(*label, x.nrows(), self.threshold())),
            Fitted::Model(model) => {
                let spam_is_positive = model.labels().pos.class;
                Ok(model
                    .predict_probabilities(&x.mapv(f64::from))
                    .iter()
                    .map(|&p| (if spam_is_positive { p } else { 1.0 - p }) as f32)
                    .collect())
            }
        }
    }

    fn threshold(&self) -> f32 {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classical::test_support::{accuracy, blobs};

    #[test]
    fn test_probabilities_point_towards_spam() {
        let (x, y) = blobs(40, 11);
        let mut model = LogisticRegression::new(LogisticParams::default());
        model.fit(x.view(), &y).unwrap();
        let p = model.decision_scores(x.view()).unwrap();
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(accuracy(&model.predict(x.view()).unwrap(), &y) > 0.95);

        let spam_mean: f32 = p.iter().zip(&y).filter(|(_, l)| l.is_spam()).map(|(v, _)| v).sum::<f32>() / 40.0;
        assert!(spam_mean > 0.5);
    }

    #[test]
    fn test_stronger_regularisation_flattens_probabilities() {
        let (x, y) = blobs(30, 4);
        let spread = |c: f64| {
            let mut m = LogisticRegression::new(LogisticParams { c, ..Default::default() });
            m.fit(x.view(), &y).unwrap();
            let p = m.decision_scores(x.view()).unwrap();
            p.iter().map(|v| (v - 0.5).abs()).sum::<f32>()
        };
        assert!(spread(0.001) < spread(10.0));
    }

    #[test]
    fn test_non_positive_c_is_rejected() {
        let (x, y) = blobs(5, 0);
        let mut model = LogisticRegression::new(LogisticParams { c: 0.0, ..Default::default() });
        assert!(model.fit(x.view(), &y).is_err());
    }

    #[test]
    fn test_wrong_width_at_predict() {
        let (x, y) = blobs(5, 0);
        let mut model = LogisticRegression::new(LogisticParams::default());
        model.fit(x.view(), &y).unwrap();
        let narrow = ndarray::Array2::<f32>::zeros((2, 3));
        assert!(model.decision_scores(narrow.view()).is_err());
    }
}
