// ============================================================
// Layer 2 - ClassicalUseCase
// ============================================================
// Orchestrates the classical benchmark in order:
//
//   Step 1: Load and split              (application::prepare)
//   Step 2: Clean both splits           (Layer 4 - data)
//   Step 3: Fit TF-IDF on train only    (Layer 4b - features)
//   Step 4: Transform train and test    (Layer 4b - features)
//   Step 5: Fit + evaluate each model   (Layer 5a - classical)
//
// Every model sees the same matrices. A model that fails to fit
// is recorded in the report and the remaining models still run.

use anyhow::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::application::prepare::{DataConfig, PreparedData};
use crate::classical::{build_classifier, ClassicalModelKind, ClassicalParams};
use crate::data::preprocessor::Preprocessor;
use crate::domain::{
    email::Label,
    report::{ModelFamily, ModelReport, RunReport},
    traits::EmailSource,
};
use crate::features::{tfidf::TfidfConfig, FeaturePipeline};
use crate::infra::metrics::evaluate;

// ─── Classical Configuration ─────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicalConfig {
    pub data:            DataConfig,
    pub tfidf:           TfidfConfig,
    /// Append sender-format features to the TF-IDF matrix
    pub sender_features: bool,
    pub models:          Vec<ClassicalModelKind>,
    pub params:          ClassicalParams,
}

impl Default for ClassicalConfig {
    fn default() -> Self {
        Self {
            data:            DataConfig::default(),
            tfidf:           TfidfConfig::default(),
            sender_features: false,
            models:          ClassicalModelKind::ALL.to_vec(),
            params:          ClassicalParams::default(),
        }
    }
}

// ─── ClassicalUseCase ─────────────────────────────────────────────────────────
pub struct ClassicalUseCase {
    config: ClassicalConfig,
}

impl ClassicalUseCase {
    pub fn new(config: ClassicalConfig) -> Self {
        Self { config }
    }

    /// Run against the configured CSV file.
    pub fn execute(&self) -> Result<RunReport> {
        self.run(&self.config.data.source())
    }

    pub fn run(&self, source: &dyn EmailSource) -> Result<RunReport> {
        let prepared = PreparedData::load(source, &self.config.data)?;
        self.run_prepared(&prepared)
    }

    pub fn run_prepared(&self, prepared: &PreparedData) -> Result<RunReport> {
        let mut report = prepared.new_report();

        // ── Step 2: Clean ──
        let preprocessor = Preprocessor::new(self.config.data.preprocess.clone());
        let train_clean  = preprocessor.clean_all(&prepared.train);
        let test_clean   = preprocessor.clean_all(&prepared.test);

        // ── Step 3: Fit features on the training split ──
        let features = FeaturePipeline::fit(&self.config.tfidf, &train_clean, self.config.sender_features);
        tracing::info!("Feature matrix width: {} ({} TF-IDF terms)", features.dim(), features.vocabulary().dim());

        // ── Step 4: Transform ──
        let x_train = features.transform(&train_clean, &prepared.train)?;
        let x_test  = features.transform(&test_clean, &prepared.test)?;
        let y_train = prepared.train_labels();
        let y_test  = prepared.test_labels();

        // ── Step 5: Fit and evaluate each model ──
        for &kind in &self.config.models {
            tracing::info!("Training {}", kind);
            let model_report = self
                .fit_and_evaluate(kind, &x_train, &y_train, &x_test, &y_test)
                .unwrap_or_else(|e| {
                    tracing::warn!("{} failed: {:#}", kind, e);
                    ModelReport::failed(kind.name(), ModelFamily::Classical, format!("fit failed: {e:#}"))
                });
            report.models.push(model_report);
        }

        Ok(report)
    }

    fn fit_and_evaluate(
        &self,
        kind:    ClassicalModelKind,
        x_train: &Array2<f32>,
        y_train: &[Label],
        x_test:  &Array2<f32>,
        y_test:  &[Label],
    ) -> Result<ModelReport> {
        let mut model = build_classifier(kind, &self.config.params, self.config.data.seed);

        let start   = Instant::now();
        let outcome = model.fit(x_train.view(), y_train)?;
        let train_seconds = start.elapsed().as_secs_f64();
        if let Some(iters) = outcome.iterations {
            tracing::debug!("{} stopped after {} iterations", kind, iters);
        }

        let scores = model.decision_scores(x_test.view())?;
        let eval   = evaluate(y_test, &scores, model.threshold())?;
        tracing::info!(
            "{}: accuracy={:.4} f1={:.4} roc_auc={:.4} ({:.1}s)",
            kind, eval.metrics.accuracy, eval.metrics.f1, eval.metrics.roc_auc, train_seconds,
        );

        let mut warnings = outcome.warnings;
        warnings.extend(eval.warnings);
        Ok(ModelReport {
            model: kind.name().to_string(),
            family: ModelFamily::Classical,
            metrics: Some(eval.metrics),
            train_seconds,
            warnings,
        })
    }
}
