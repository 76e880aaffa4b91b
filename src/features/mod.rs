// ============================================================
// Layer 4b - Feature Extraction (classical path)
// ============================================================
// Turns cleaned records into a dense f32 matrix for the
// classical models:
//
//   tfidf.rs  - fitted TF-IDF vocabulary (the only fitted state)
//   sender.rs - stateless sender-format features
//
// FeaturePipeline glues the two together so the use case has a
// single fit-on-train / transform-anything object.

pub mod sender;
pub mod tfidf;

use anyhow::{ensure, Result};
use ndarray::{concatenate, Array2, Axis};

use crate::domain::email::{CleanedRecord, EmailRecord};
use sender::{sender_matrix, SENDER_FEATURE_COUNT};
use tfidf::{FittedVocabulary, TfidfConfig, TfidfVectorizer};

pub struct FeaturePipeline {
    vocabulary:  FittedVocabulary,
    with_sender: bool,
}

impl FeaturePipeline {
    /// Fit on training records only.
    pub fn fit(config: &TfidfConfig, training: &[CleanedRecord], with_sender: bool) -> Self {
        let vocabulary = TfidfVectorizer::new(config.clone()).fit(training);
        Self { vocabulary, with_sender }
    }

    pub fn vocabulary(&self) -> &FittedVocabulary {
        &self.vocabulary
    }

    pub fn dim(&self) -> usize {
        self.vocabulary.dim() + if self.with_sender { SENDER_FEATURE_COUNT } else { 0 }
    }

    /// `cleaned[i]` must be the cleaned form of `raw[i]`.
    pub fn transform(&self, cleaned: &[CleanedRecord], raw: &[EmailRecord]) -> Result<Array2<f32>> {
        let text = self.vocabulary.transform(cleaned);
        if !self.with_sender {
            return Ok(text);
        }
        ensure!(
            cleaned.len() == raw.len(),
            "cleaned/raw record counts differ ({} vs {})",
            cleaned.len(),
            raw.len()
        );
        let sender = sender_matrix(raw);
        Ok(concatenate(Axis(1), &[text.view(), sender.view()])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email::Label;

    #[test]
    fn test_sender_columns_are_appended() {
        let raw = vec![
            EmailRecord::new("x", Label::Spam).with_sender("a@b.com"),
            EmailRecord::new("y", Label::Legit),
        ];
        let cleaned = vec![
            CleanedRecord::new(vec!["prize".into()], Label::Spam),
            CleanedRecord::new(vec!["lunch".into()], Label::Legit),
        ];
        let pipeline = FeaturePipeline::fit(&TfidfConfig::default(), &cleaned, true);
        let m = pipeline.transform(&cleaned, &raw).unwrap();
        assert_eq!(m.shape(), &[2, 2 + SENDER_FEATURE_COUNT]);
        assert_eq!(pipeline.dim(), 2 + SENDER_FEATURE_COUNT);
    }

    #[test]
    fn test_empty_record_without_sender_is_the_zero_row() {
        let training = vec![
            CleanedRecord::new(vec!["prize".into()], Label::Spam),
            CleanedRecord::new(vec!["lunch".into()], Label::Legit),
        ];
        let pipeline = FeaturePipeline::fit(&TfidfConfig::default(), &training, true);

        let cleaned = vec![CleanedRecord::new(Vec::new(), Label::Legit)];
        let raw = vec![EmailRecord::new("", Label::Legit)];
        let m = pipeline.transform(&cleaned, &raw).unwrap();
        assert_eq!(m.shape(), &[1, pipeline.dim()]);
        assert!(m.iter().all(|&v| v == 0.0));
    }
}
