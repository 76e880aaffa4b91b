// ============================================================
// Layer 2 - CompareUseCase
// ============================================================
// Runs both pipelines on one identical train / test split and
// folds their model reports into a single RunReport:
//
//   Step 1: Load and split once        (application::prepare)
//   Step 2: Classical pipeline         (ClassicalUseCase)
//   Step 3: Neural pipeline            (NeuralUseCase)
//   Step 4: Merge the reports

use anyhow::{ensure, Result};

use crate::application::{
    classical_use_case::{ClassicalConfig, ClassicalUseCase},
    neural_use_case::{NeuralConfig, NeuralUseCase},
    prepare::PreparedData,
};
use crate::domain::{report::RunReport, traits::EmailSource};

pub struct CompareUseCase {
    classical: ClassicalConfig,
    neural:    NeuralConfig,
}

impl CompareUseCase {
    /// Both configs must describe the same data and split.
    pub fn new(classical: ClassicalConfig, neural: NeuralConfig) -> Result<Self> {
        ensure!(
            classical.data == neural.data,
            "classical and neural runs must share one data configuration"
        );
        Ok(Self { classical, neural })
    }

    pub fn execute(&self) -> Result<RunReport> {
        self.run(&self.classical.data.source())
    }

    pub fn run(&self, source: &dyn EmailSource) -> Result<RunReport> {
        // ── Step 1: One split for everything ──
        let prepared = PreparedData::load(source, &self.classical.data)?;

        // ── Step 2 + 3: Both pipelines ──
        let mut report = ClassicalUseCase::new(self.classical.clone()).run_prepared(&prepared)?;
        let neural     = NeuralUseCase::new(self.neural.clone()).run_prepared(&prepared)?;

        // ── Step 4: Merge ──
        report.absorb(neural);
        Ok(report)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::prepare::DataConfig;
    use crate::classical::ClassicalModelKind;
    use crate::domain::{
        email::{EmailRecord, Label},
        report::ModelFamily,
        traits::InMemorySource,
    };
    use crate::ml::{trainer::TrainerConfig, NeuralModelKind};

    fn corpus() -> InMemorySource {
        let mut records = Vec::new();
        for i in 0..10 {
            records.push(EmailRecord::new(format!("claim free prize now {i}"), Label::Spam));
            records.push(EmailRecord::new(format!("project meeting notes {i}"), Label::Legit));
        }
        InMemorySource::new(records)
    }

    #[test]
    fn test_both_families_share_one_split() {
        let dir = tempfile::tempdir().unwrap();
        let classical = ClassicalConfig {
            models: vec![ClassicalModelKind::LogisticRegression],
            ..Default::default()
        };
        let neural = NeuralConfig {
            models: vec![NeuralModelKind::Lstm],
            trainer: TrainerConfig { epochs: 2, batch_size: 4, ..Default::default() },
            checkpoint_dir: dir.path().display().to_string(),
            embed_dim: 4,
            hidden_size: 4,
            max_len: 6,
            ..Default::default()
        };

        let report = CompareUseCase::new(classical, neural).unwrap().run(&corpus()).unwrap();
        assert_eq!(report.models.len(), 2);
        assert_eq!(report.models[0].family, ModelFamily::Classical);
        assert_eq!(report.models[1].family, ModelFamily::Neural);
        assert_eq!(report.splits.test.total(), 4);
        assert!(report.splits.validation.is_some());
    }

    #[test]
    fn test_mismatched_data_configs_are_rejected() {
        let neural = NeuralConfig {
            data: DataConfig { seed: 7, ..Default::default() },
            ..Default::default()
        };
        assert!(CompareUseCase::new(ClassicalConfig::default(), neural).is_err());
    }
}
