// Random forest: bootstrap-aggregated linfa-trees CART classifiers.
//
// Every tree sees its own bootstrap sample of the rows and its own
// random subset of the columns. The forest score is the fraction of
// trees voting spam, so it doubles as a probability for ROC-AUC.

use anyhow::{anyhow, bail, Result};
use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, ArrayView2, Axis};
use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{check_predict_input, check_training_input, constant_scores, single_class, BinaryClassifier, FitOutcome, Fitted};
use crate::domain::email::Label;

/// How many columns each tree may split on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
    Log2,
    Fraction(f64),
}

impl MaxFeatures {
    /// At least one, at most `n_features`.
    pub fn resolve(self, n_features: usize) -> usize {
        let d = n_features as f64;
        let k = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => d.sqrt() as usize,
            MaxFeatures::Log2 => d.log2().max(0.0) as usize,
            MaxFeatures::Fraction(f) => (f * d) as usize,
        };
        k.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees:      usize,
    /// None grows every tree until its leaves are pure
    pub max_depth:    Option<usize>,
    pub max_features: MaxFeatures,
    pub bootstrap:    bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self { n_trees: 100, max_depth: None, max_features: MaxFeatures::Sqrt, bootstrap: true }
    }
}

struct Member {
    columns: Vec<usize>,
    tree:    DecisionTree<f32, bool>,
}

pub struct RandomForest {
    params:     ForestParams,
    seed:       u64,
    fitted:     Option<Fitted<Vec<Member>>>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(params: ForestParams, seed: u64) -> Self {
        Self { params, seed, fitted: None, n_features: 0 }
    }
}

impl BinaryClassifier for RandomForest {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn fit(&mut self, x: ArrayView2<f32>, y: &[Label]) -> Result<FitOutcome> {
        check_training_input(x, y)?;
        if self.params.n_trees == 0 {
            bail!("random_forest needs at least one tree");
        }
        self.n_features = x.ncols();
        if let Some(only) = single_class(y) {
            self.fitted = Some(Fitted::Constant(only));
            return Ok(FitOutcome::single_class(self.name(), only));
        }

        let n = x.nrows();
        let d = x.ncols();
        let k = self.params.max_features.resolve(d);
        let targets: Array1<bool> = y.iter().map(|l| l.is_spam()).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut members = Vec::with_capacity(self.params.n_trees);
        for t in 0..self.params.n_trees {
            // ── Step 1: Bootstrap rows, sample columns ──
            let rows: Vec<usize> = if self.params.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            let mut columns = index::sample(&mut rng, d, k).into_vec();
            columns.sort_unstable();

            // ── Step 2: Grow one tree on that view ──
            let records = x.select(Axis(1), &columns).select(Axis(0), &rows);
            let dataset = Dataset::new(records, targets.select(Axis(0), &rows));
            let tree = DecisionTree::<f32, bool>::params()
                .split_quality(SplitQuality::Gini)
                .max_depth(self.params.max_depth)
                .fit(&dataset)
                .map_err(|e| anyhow!("random_forest tree {}: {e}", t + 1))?;
            tracing::debug!("tree {}/{}: depth {}", t + 1, self.params.n_trees, tree.max_depth());
            members.push(Member { columns, tree });
        }

        self.fitted = Some(Fitted::Model(members));
        Ok(FitOutcome::default())
    }

    /// Fraction of trees voting spam.
    fn decision_scores(&self, x: ArrayView2<f32>) -> Result<Vec<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| anyhow!("random_forest is not fitted"))?;
        check_predict_input(x, self.n_features)?;
        let members = match fitted {
            Fitted::Constant(label) => return Ok(constant_scores(*label, x.nrows(), self.threshold())),
            Fitted::Model(members) => members,
        };

        let mut votes = vec![0usize; x.nrows()];
        for member in members {
            let predicted: Array1<bool> = member.tree.predict(&x.select(Axis(1), &member.columns));
            for (v, spam) in votes.iter_mut().zip(predicted.iter()) {
                *v += usize::from(*spam);
            }
        }
        let k = members.len() as f32;
        Ok(votes.into_iter().map(|v| v as f32 / k).collect())
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
    fn test_builds_requested_number_of_trees() {
        let (x, y) = blobs(20, 4);
        let mut forest = RandomForest::new(ForestParams { n_trees: 7, ..Default::default() }, 1);
        forest.fit(x.view(), &y).unwrap();
        match &forest.fitted {
            Some(Fitted::Model(members)) => {
                assert_eq!(members.len(), 7);
                // √6 rounds down to two columns per tree
                assert!(members.iter().all(|m| m.columns.len() == 2));
            }
            _ => panic!("forest was not grown"),
        }
        let scores = forest.decision_scores(x.view()).unwrap();
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_generalises_to_fresh_blobs() {
        let (x, y) = blobs(50, 6);
        let (xt, yt) = blobs(25, 7);
        let mut forest = RandomForest::new(ForestParams { n_trees: 25, ..Default::default() }, 3);
        forest.fit(x.view(), &y).unwrap();
        assert!(accuracy(&forest.predict(xt.view()).unwrap(), &yt) >= 0.95);
    }

    #[test]
    fn test_zero_trees_rejected() {
        let (x, y) = blobs(3, 0);
        let mut forest = RandomForest::new(ForestParams { n_trees: 0, ..Default::default() }, 0);
        assert!(forest.fit(x.view(), &y).is_err());
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(100), 10);
        assert_eq!(MaxFeatures::Log2.resolve(1024), 10);
        assert_eq!(MaxFeatures::Fraction(0.25).resolve(8), 2);
        assert_eq!(MaxFeatures::Fraction(0.01).resolve(8), 1);
        assert_eq!(MaxFeatures::All.resolve(5), 5);
    }
}
