// ============================================================
// Layer 2 - Shared Data Preparation
// ============================================================
// The steps every pipeline starts with:
//
//   Step 1: Load the labelled emails   (Layer 4 - data)
//   Step 2: Split train / test         (Layer 4 - data)
//
// Splitting happens on raw records, before anything is fitted,
// so no fitted artifact ever sees a test record. `compare`
// prepares once and hands the same split to both pipelines.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    loader::{ColumnMapping, CsvEmailLoader},
    preprocessor::PreprocessConfig,
    splitter::split_indices,
};
use crate::domain::{
    email::{EmailRecord, Label, LabelDistribution},
    report::RunReport,
    traits::EmailSource,
};

// ─── Data Configuration ──────────────────────────────────────────────────────
// Everything about where the data comes from, how it is split and
// how it is cleaned. Shared by every command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub dataset:     String,
    pub columns:     ColumnMapping,
    pub train_ratio: f64,
    pub seed:        u64,
    pub stratify:    bool,
    pub output_dir:  String,
    pub preprocess:  PreprocessConfig,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset:     "data/emails.csv".to_string(),
            columns:     ColumnMapping::default(),
            train_ratio: 0.8,
            seed:        42,
            stratify:    true,
            output_dir:  "reports".to_string(),
            preprocess:  PreprocessConfig::default(),
        }
    }
}

impl DataConfig {
    /// The CSV loader described by this config.
    pub fn source(&self) -> CsvEmailLoader {
        CsvEmailLoader::new(&self.dataset, self.columns.clone())
    }
}

// ─── PreparedData ─────────────────────────────────────────────────────────────
/// Raw records, already split. Nothing has been fitted yet.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub dataset: String,
    pub train:   Vec<EmailRecord>,
    pub test:    Vec<EmailRecord>,
    config:      DataConfig,
}

impl PreparedData {
    pub fn load(source: &dyn EmailSource, config: &DataConfig) -> Result<Self> {
        if !(config.train_ratio > 0.0 && config.train_ratio < 1.0) {
            bail!("train ratio must be strictly between 0 and 1, got {}", config.train_ratio);
        }

        // ── Step 1: Load ──
        let records = source.load_all()?;
        if records.len() < 2 {
            bail!("{} holds {} record(s); at least 2 are needed to split", source.describe(), records.len());
        }
        let all = LabelDistribution::from_labels(records.iter().map(|r| r.label()));
        tracing::info!("Class distribution: {}", all);

        // ── Step 2: Split ──
        let labels: Vec<Label> = records.iter().map(|r| r.label()).collect();
        let split = split_indices(&labels, config.train_ratio, config.seed, config.stratify);
        let (train, test) = split.apply(&records);
        tracing::info!(
            "Split {} records into {} train / {} test (seed {}, stratified: {})",
            records.len(), train.len(), test.len(), config.seed, config.stratify,
        );

        Ok(Self { dataset: source.describe(), train, test, config: config.clone() })
    }

    pub fn train_labels(&self) -> Vec<Label> {
        self.train.iter().map(|r| r.label()).collect()
    }

    pub fn test_labels(&self) -> Vec<Label> {
        self.test.iter().map(|r| r.label()).collect()
    }

    /// An empty report carrying the split sizes and any split warnings.
    pub fn new_report(&self) -> RunReport {
        let mut report = RunReport::new(&self.dataset, self.config.seed, self.config.train_ratio, self.config.stratify);
        report.splits.train = LabelDistribution::from_labels(self.train_labels());
        report.splits.test  = LabelDistribution::from_labels(self.test_labels());

        for (name, dist) in [("training", report.splits.train), ("test", report.splits.test)] {
            if !dist.has_both_classes() {
                let msg = format!("{name} split contains a single class ({dist})");
                tracing::warn!("{}", msg);
                report.warnings.push(msg);
            }
        }
        report
    }
}
