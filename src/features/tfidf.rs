// ============================================================
// Layer 4b - TF-IDF Feature Extractor
// ============================================================
// fit()       : training CleanedRecords → FittedVocabulary
// transform() : CleanedRecords + FittedVocabulary → Array2<f32>
//
// The vocabulary is the only state, and it is built from the
// records passed to fit() and nothing else. FittedVocabulary has
// no public constructor, so every transform is paired with a
// vocabulary that some fit() produced.
//
// Weighting:
//   tf    = raw count, or 1 + ln(count) when sublinear_tf
//   idf   = ln((1 + n_docs) / (1 + df)) + 1
//   row   = tf * idf, then L2-normalised
//
// Out-of-vocabulary tokens contribute nothing. A record with no
// in-vocabulary tokens is the zero row.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::domain::email::CleanedRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfConfig {
    /// Keep only the most frequent terms (by corpus count)
    pub max_features: Option<usize>,
    /// Minimum number of training documents a term must appear in
    pub min_df:       usize,
    pub sublinear_tf: bool,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self { max_features: Some(5000), min_df: 1, sublinear_tf: false }
    }
}

pub struct TfidfVectorizer {
    config: TfidfConfig,
}

impl TfidfVectorizer {
    pub fn new(config: TfidfConfig) -> Self {
        Self { config }
    }

    /// Build the vocabulary and IDF weights from training records only.
    pub fn fit(&self, training: &[CleanedRecord]) -> FittedVocabulary {
        let n_docs = training.len();

        // term → (corpus count, document frequency); BTreeMap keeps the
        // iteration order independent of hashing.
        let mut stats: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for record in training {
            let mut seen: HashSet<&str> = HashSet::new();
            for token in &record.tokens {
                let entry = stats.entry(token.as_str()).or_insert((0, 0));
                entry.0 += 1;
                if seen.insert(token.as_str()) {
                    entry.1 += 1;
                }
            }
        }

        let mut candidates: Vec<(&str, usize, usize)> = stats
            .into_iter()
            .filter(|(_, (_, df))| *df >= self.config.min_df)
            .map(|(t, (count, df))| (t, count, df))
            .collect();

        if let Some(max) = self.config.max_features {
            // Highest corpus count first, alphabetical among ties
            candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            candidates.truncate(max);
            candidates.sort_by(|a, b| a.0.cmp(b.0));
        }

        let terms: Vec<String> = candidates.iter().map(|(t, _, _)| t.to_string()).collect();
        let idf: Vec<f32> = candidates
            .iter()
            .map(|&(_, _, df)| (((1 + n_docs) as f64 / (1 + df) as f64).ln() + 1.0) as f32)
            .collect();
        let index = terms.iter().enumerate().map(|(i, t)| (t.clone(), i)).collect();

        tracing::info!(
            "TF-IDF vocabulary fitted on {} documents: {} terms",
            n_docs,
            terms.len()
        );

        FittedVocabulary {
            terms,
            index,
            idf,
            sublinear_tf: self.config.sublinear_tf,
        }
    }
}

/// The fitted artifact: term → column mapping plus IDF weights.
#[derive(Debug, Clone)]
pub struct FittedVocabulary {
    terms:        Vec<String>,
    index:        HashMap<String, usize>,
    idf:          Vec<f32>,
    sublinear_tf: bool,
}

impl FittedVocabulary {
    /// Width of every feature vector this vocabulary produces.
    pub fn dim(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn idf(&self, term: &str) -> Option<f32> {
        self.column(term).map(|i| self.idf[i])
    }

    fn column(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// TF-IDF vector for one token sequence.
    pub fn transform_tokens(&self, tokens: &[String]) -> Array1<f32> {
        let mut row = Array1::<f32>::zeros(self.dim());
        self.fill_row(tokens, row.view_mut());
        row
    }

    /// One row per record, in input order.
    pub fn transform(&self, records: &[CleanedRecord]) -> Array2<f32> {
        let mut matrix = Array2::<f32>::zeros((records.len(), self.dim()));
        for (record, row) in records.iter().zip(matrix.rows_mut()) {
            self.fill_row(&record.tokens, row);
        }
        matrix
    }

    fn fill_row(&self, tokens: &[String], mut row: ndarray::ArrayViewMut1<f32>) {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for token in tokens {
            if let Some(col) = self.column(token) {
                *counts.entry(col).or_insert(0) += 1;
            }
        }
        if counts.is_empty() {
            return;
        }

        let mut norm_sq = 0.0f64;
        for (&col, &count) in &counts {
            let tf = if self.sublinear_tf { 1.0 + (count as f64).ln() } else { count as f64 };
            let w  = tf * self.idf[col] as f64;
            row[col] = w as f32;
            norm_sq += w * w;
        }
        let norm = norm_sq.sqrt() as f32;
        if norm > 0.0 {
            row.mapv_inplace(|v| v / norm);
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email::Label;

    fn rec(tokens: &[&str]) -> CleanedRecord {
        CleanedRecord::new(tokens.iter().map(|t| t.to_string()).collect(), Label::Legit)
    }

    fn corpus() -> Vec<CleanedRecord> {
        vec![
            rec(&["verify", "account", "now"]),
            rec(&["account", "statement", "attached"]),
            rec(&["meeting", "agenda", "attached"]),
        ]
    }

    #[test]
    fn test_vocabulary_is_sorted_and_complete() {
        let vocab = TfidfVectorizer::new(TfidfConfig { max_features: None, ..Default::default() })
            .fit(&corpus());
        assert_eq!(
            vocab.terms(),
            &["account", "agenda", "attached", "meeting", "now", "statement", "verify"]
        );
    }

    #[test]
    fn test_empty_tokens_give_zero_vector_of_full_width() {
        let vocab = TfidfVectorizer::new(TfidfConfig::default()).fit(&corpus());
        let v = vocab.transform_tokens(&[]);
        assert_eq!(v.len(), vocab.dim());
        assert!(v.iter().all(|&x| x == 0.0));

        let m = vocab.transform(&[rec(&[])]);
        assert_eq!(m.shape(), &[1, vocab.dim()]);
        assert!(m.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_out_of_vocabulary_tokens_are_ignored() {
        let vocab = TfidfVectorizer::new(TfidfConfig::default()).fit(&corpus());
        let disjoint = vec![rec(&["lottery", "winner"]), rec(&["account", "lottery"])];
        let m = vocab.transform(&disjoint);
        assert!(m.row(0).iter().all(|&x| x == 0.0));
        // only "account" is known, so the normalised row is a unit vector on it
        let col = vocab.terms().iter().position(|t| t == "account").unwrap();
        assert!((m[[1, col]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rows_are_l2_normalised() {
        let vocab = TfidfVectorizer::new(TfidfConfig::default()).fit(&corpus());
        let m = vocab.transform(&corpus());
        for row in m.rows() {
            let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rarer_terms_get_higher_idf() {
        let vocab = TfidfVectorizer::new(TfidfConfig::default()).fit(&corpus());
        assert!(vocab.idf("verify").unwrap() > vocab.idf("account").unwrap());
        // "attached" is in 2 of 3 documents: ln(4/3) + 1
        let expected = (4.0f64 / 3.0).ln() as f32 + 1.0;
        assert!((vocab.idf("attached").unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let vocab = TfidfVectorizer::new(TfidfConfig { max_features: Some(2), ..Default::default() })
            .fit(&corpus());
        assert_eq!(vocab.terms(), &["account", "attached"]);
    }

    #[test]
    fn test_min_df_filters_rare_terms() {
        let vocab = TfidfVectorizer::new(TfidfConfig { max_features: None, min_df: 2, sublinear_tf: false })
            .fit(&corpus());
        assert_eq!(vocab.terms(), &["account", "attached"]);
    }
}
