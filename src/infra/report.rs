// ============================================================
// Layer 6 - Run Report Output
// ============================================================
// The two outputs of every command:
//
//   print_report - human readable table on stdout, one row per
//                  model plus the per-class breakdown
//   write_report - the RunReport as pretty JSON at
//                  <output-dir>/<command>_report.json
//
// Reference: serde_json documentation

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::report::{ModelReport, RunReport};

/// Print the split summary, the results table and every warning.
pub fn print_report(report: &RunReport) {
    println!();
    println!("Dataset : {}", report.dataset);
    println!(
        "Split   : {:.0}% train, seed {}, {}",
        report.train_ratio * 100.0,
        report.seed,
        if report.stratified { "stratified" } else { "random" },
    );
    println!("  train      : {}", report.splits.train);
    if let Some(val) = &report.splits.validation {
        println!("  validation : {}", val);
    }
    println!("  test       : {}", report.splits.test);
    println!();

    println!(
        "{:<22} {:>8} {:>9} {:>8} {:>8} {:>8} {:>9}",
        "model", "accuracy", "precision", "recall", "f1", "roc_auc", "train_s",
    );
    println!("{}", "-".repeat(77));
    for model in &report.models {
        println!("{}", summary_row(model));
    }

    println!();
    println!("Per-class (precision / recall / f1 / support)");
    for model in &report.models {
        if let Some(m) = &model.metrics {
            println!(
                "  {:<20} legit {:.4} / {:.4} / {:.4} / {:<6} spam {:.4} / {:.4} / {:.4} / {}",
                model.model,
                m.legit.precision, m.legit.recall, m.legit.f1, m.legit.support,
                m.spam.precision, m.spam.recall, m.spam.f1, m.spam.support,
            );
        }
    }

    let warnings: Vec<String> = report
        .warnings
        .iter()
        .cloned()
        .chain(report.models.iter().flat_map(|m| m.warnings.iter().map(move |w| format!("{}: {}", m.model, w))))
        .collect();
    if !warnings.is_empty() {
        println!();
        println!("Warnings");
        for w in warnings {
            println!("  - {w}");
        }
    }
}

fn summary_row(model: &ModelReport) -> String {
    match &model.metrics {
        Some(m) => format!(
            "{:<22} {:>8.4} {:>9.4} {:>8.4} {:>8.4} {:>8.4} {:>9.1}",
            model.model, m.accuracy, m.precision, m.recall, m.f1, m.roc_auc, model.train_seconds,
        ),
        None => format!("{:<22} {:>8}", model.model, "failed"),
    }
}

/// Write `report` as JSON to `{output_dir}/{command}_report.json`.
pub fn write_report(report: &RunReport, output_dir: &Path, command: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Cannot create output directory '{}'", output_dir.display()))?;
    let path = output_dir.join(format!("{command}_report.json"));
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::info!("Report written to '{}'", path.display());
    Ok(path)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::{ClassMetrics, ConfusionMatrix, MetricsReport, ModelFamily};

    fn sample_report() -> RunReport {
        let mut report = RunReport::new("emails.csv", 42, 0.8, true);
        report.models.push(ModelReport {
            model:         "linear_svc".to_string(),
            family:        ModelFamily::Classical,
            metrics:       Some(MetricsReport {
                accuracy:  0.98,
                precision: 0.97,
                recall:    0.96,
                f1:        0.965,
                roc_auc:   0.97,
                legit:     ClassMetrics { precision: 0.99, recall: 0.99, f1: 0.99, support: 80 },
                spam:      ClassMetrics { precision: 0.97, recall: 0.96, f1: 0.965, support: 20 },
                confusion: ConfusionMatrix::default(),
            }),
            train_seconds: 1.5,
            warnings:      vec![],
        });
        report.models.push(ModelReport::failed("rnn", ModelFamily::Neural, "boom"));
        report
    }

    #[test]
    fn test_write_report_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(&sample_report(), dir.path(), "classical").unwrap();
        assert_eq!(path.file_name().unwrap(), "classical_report.json");

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["seed"], 42);
        assert_eq!(json["train_ratio"], 0.8);
        assert_eq!(json["models"][0]["metrics"]["accuracy"], 0.98);
        assert!(json["models"][1]["metrics"].is_null());
    }

    #[test]
    fn test_summary_row_marks_failures() {
        let report = sample_report();
        assert!(summary_row(&report.models[0]).starts_with("linear_svc"));
        assert!(summary_row(&report.models[1]).contains("failed"));
    }
}
