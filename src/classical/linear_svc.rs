// Linear support vector classifier on linfa-svm.
//
// C-SVM with a linear kernel; both classes share the same C. The
// decision value w·x - rho is not a probability: ranking metrics use
// it directly and the class boundary is 0.

use anyhow::{anyhow, bail, Result};
use linfa::traits::Fit;
use linfa_svm::Svm;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::{
    check_predict_input, check_training_input, constant_scores, single_class, to_dataset, BinaryClassifier,
    FitOutcome, Fitted,
};
use crate::domain::email::Label;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvcParams {
    pub c:   f64,
    /// Stopping tolerance of the SMO solver
    pub tol: f64,
}

impl Default for SvcParams {
    fn default() -> Self {
        Self { c: 1.0, tol: 1e-3 }
    }
}

pub struct LinearSvc {
    params:     SvcParams,
    fitted:     Option<Fitted<Svm<f64, bool>>>,
    n_features: usize,
}

impl LinearSvc {
    pub fn new(params: SvcParams) -> Self {
        Self { params, fitted: None, n_features: 0 }
    }
}

impl BinaryClassifier for LinearSvc {
    fn name(&self) -> &'static str {
        "linear_svc"
    }

    fn fit(&mut self, x: ArrayView2<f32>, y: &[Label]) -> Result<FitOutcome> {
        check_training_input(x, y)?;
        if self.params.c <= 0.0 {
            bail!("linear_svc needs C > 0, got {}", self.params.c);
        }
        self.n_features = x.ncols();
        if let Some(only) = single_class(y) {
            self.fitted = Some(Fitted::Constant(only));
            return Ok(FitOutcome::single_class(self.name(), only));
        }

        let svm = Svm::<f64, bool>::params()
            .pos_neg_weights(self.params.c, self.params.c)
            .eps(self.params.tol)
            .linear_kernel()
            .fit(&to_dataset(x, y))
            .map_err(|e| anyhow!("linear_svc: {e}"))?;
        tracing::debug!("linear_svc kept {} support vectors", svm.nsupport());

        self.fitted = Some(Fitted::Model(svm));
        Ok(FitOutcome::default())
    }

    fn decision_scores(&self, x: ArrayView2<f32>) -> Result<Vec<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| anyhow!("linear_svc is not fitted"))?;
        check_predict_input(x, self.n_features)?;
        match fitted {
            Fitted::Constant(label) => Ok(constant_scores(*label, x.nrows(), self.threshold())),
            Fitted::Model(svm) => {
                let x = x.mapv(f64::from);
                Ok(x.rows().into_iter().map(|row| (svm.weighted_sum(&row) - svm.rho) as f32).collect())
            }
        }
    }

    fn threshold(&self) -> f32 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classical::test_support::{accuracy, blobs};

    #[test]
    fn test_margin_sign_matches_label() {
        let (x, y) = blobs(40, 7);
        let mut model = LinearSvc::new(SvcParams::default());
        model.fit(x.view(), &y).unwrap();
        let scores = model.decision_scores(x.view()).unwrap();
        let agree = scores.iter().zip(&y).filter(|(s, l)| (**s >= 0.0) == l.is_spam()).count();
        assert!(agree as f64 / y.len() as f64 > 0.95);
        assert!(accuracy(&model.predict(x.view()).unwrap(), &y) > 0.95);
    }

    #[test]
    fn test_non_positive_c_is_rejected() {
        let (x, y) = blobs(5, 0);
        let mut model = LinearSvc::new(SvcParams { c: -1.0, ..Default::default() });
        assert!(model.fit(x.view(), &y).is_err());
    }
}
