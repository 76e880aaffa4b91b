// Integer sequence encoding for the recurrent models.
//
// Id layout:
//   0      padding
//   1      out-of-vocabulary
//   2..    training terms, most frequent first (ties alphabetical)
//
// Every encoded sequence has exactly `max_len` ids. Long inputs are
// cut by the TruncationPolicy, short ones are filled with 0 on the
// PaddingSide. The attention mask marks real tokens with 1.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::data::dataset::SequenceSample;
use crate::domain::email::CleanedRecord;

pub const PAD_ID: u32 = 0;
pub const OOV_ID: u32 = 1;
const RESERVED: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationPolicy {
    /// Keep the first `max_len` tokens
    #[default]
    KeepHead,
    /// Keep the last `max_len` tokens
    KeepTail,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaddingSide {
    /// Padding before the tokens, so the last step is always real
    #[default]
    Pre,
    Post,
}

/// On-disk form; the lookup index is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    terms:      Vec<String>,
    truncation: TruncationPolicy,
    padding:    PaddingSide,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "VocabularyFile", into = "VocabularyFile")]
pub struct SequenceVocabulary {
    terms:      Vec<String>,
    index:      HashMap<String, u32>,
    truncation: TruncationPolicy,
    padding:    PaddingSide,
}

impl From<VocabularyFile> for SequenceVocabulary {
    fn from(file: VocabularyFile) -> Self {
        let index = file
            .terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), (i + RESERVED) as u32))
            .collect();
        Self { terms: file.terms, index, truncation: file.truncation, padding: file.padding }
    }
}

impl From<SequenceVocabulary> for VocabularyFile {
    fn from(v: SequenceVocabulary) -> Self {
        Self { terms: v.terms, truncation: v.truncation, padding: v.padding }
    }
}

impl SequenceVocabulary {
    /// Build from training records. `max_vocab` caps the total id count,
    /// reserved ids included.
    pub fn fit(
        training:   &[CleanedRecord],
        max_vocab:  Option<usize>,
        truncation: TruncationPolicy,
        padding:    PaddingSide,
    ) -> Self {
        let mut freq: BTreeMap<&str, usize> = BTreeMap::new();
        for record in training {
            for token in &record.tokens {
                *freq.entry(token.as_str()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(&str, usize)> = freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        if let Some(cap) = max_vocab {
            ranked.truncate(cap.saturating_sub(RESERVED));
        }

        let terms: Vec<String> = ranked.into_iter().map(|(t, _)| t.to_string()).collect();
        tracing::info!("Sequence vocabulary: {} terms + {} reserved ids", terms.len(), RESERVED);
        VocabularyFile { terms, truncation, padding }.into()
    }

    /// Embedding table size.
    pub fn vocab_size(&self) -> usize {
        self.terms.len() + RESERVED
    }

    pub fn id(&self, token: &str) -> u32 {
        self.index.get(token).copied().unwrap_or(OOV_ID)
    }

    pub fn truncation(&self) -> TruncationPolicy {
        self.truncation
    }

    pub fn padding(&self) -> PaddingSide {
        self.padding
    }

    /// (token ids, attention mask), both exactly `max_len` long.
    pub fn encode(&self, tokens: &[String], max_len: usize) -> (Vec<u32>, Vec<u32>) {
        let ids: Vec<u32> = tokens.iter().map(|t| self.id(t)).collect();
        let kept: &[u32] = if ids.len() <= max_len {
            &ids
        } else {
            match self.truncation {
                TruncationPolicy::KeepHead => &ids[..max_len],
                TruncationPolicy::KeepTail => &ids[ids.len() - max_len..],
            }
        };

        let fill = max_len - kept.len();
        let mut token_ids = Vec::with_capacity(max_len);
        let mut mask      = Vec::with_capacity(max_len);
        if self.padding == PaddingSide::Pre {
            token_ids.resize(fill, PAD_ID);
            mask.resize(fill, 0);
        }
        token_ids.extend_from_slice(kept);
        mask.extend(std::iter::repeat(1).take(kept.len()));
        if self.padding == PaddingSide::Post {
            token_ids.resize(max_len, PAD_ID);
            mask.resize(max_len, 0);
        }
        (token_ids, mask)
    }

    pub fn encode_record(&self, record: &CleanedRecord, max_len: usize) -> SequenceSample {
        let (token_ids, attention_mask) = self.encode(&record.tokens, max_len);
        SequenceSample { token_ids, attention_mask, label: record.label }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email::Label;

    fn rec(tokens: &[&str]) -> CleanedRecord {
        CleanedRecord::new(tokens.iter().map(|t| t.to_string()).collect(), Label::Spam)
    }

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    fn vocab(truncation: TruncationPolicy, padding: PaddingSide) -> SequenceVocabulary {
        let corpus = vec![rec(&["click", "link", "click"]), rec(&["invoice", "link", "click"])];
        SequenceVocabulary::fit(&corpus, None, truncation, padding)
    }

    #[test]
    fn test_ids_follow_frequency() {
        let v = vocab(TruncationPolicy::KeepHead, PaddingSide::Pre);
        assert_eq!(v.id("click"), 2);
        assert_eq!(v.id("link"), 3);
        assert_eq!(v.id("invoice"), 4);
        assert_eq!(v.id("never-seen"), OOV_ID);
        assert_eq!(v.vocab_size(), 5);
    }

    #[test]
    fn test_pre_padding_and_head_truncation() {
        let v = vocab(TruncationPolicy::KeepHead, PaddingSide::Pre);
        let (ids, mask) = v.encode(&toks("link click"), 4);
        assert_eq!(ids, vec![0, 0, 3, 2]);
        assert_eq!(mask, vec![0, 0, 1, 1]);

        let (ids, mask) = v.encode(&toks("invoice link click click"), 2);
        assert_eq!(ids, vec![4, 3]);
        assert_eq!(mask, vec![1, 1]);
    }

    #[test]
    fn test_post_padding_and_tail_truncation() {
        let v = vocab(TruncationPolicy::KeepTail, PaddingSide::Post);
        let (ids, mask) = v.encode(&toks("link"), 3);
        assert_eq!(ids, vec![3, 0, 0]);
        assert_eq!(mask, vec![1, 0, 0]);

        let (ids, _) = v.encode(&toks("invoice link click"), 2);
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_empty_input_is_all_padding() {
        let v = vocab(TruncationPolicy::KeepHead, PaddingSide::Pre);
        let (ids, mask) = v.encode(&[], 5);
        assert_eq!(ids, vec![0; 5]);
        assert_eq!(mask, vec![0; 5]);
    }

    #[test]
    fn test_max_vocab_counts_reserved_ids() {
        let corpus = vec![rec(&["click", "link", "click"]), rec(&["invoice", "link", "click"])];
        let v = SequenceVocabulary::fit(&corpus, Some(3), TruncationPolicy::KeepHead, PaddingSide::Pre);
        assert_eq!(v.vocab_size(), 3);
        assert_eq!(v.id("link"), OOV_ID);
    }

    #[test]
    fn test_json_round_trip_restores_lookup() {
        let v = vocab(TruncationPolicy::KeepTail, PaddingSide::Post);
        let json = serde_json::to_string(&v).unwrap();
        let back: SequenceVocabulary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id("invoice"), 4);
        assert_eq!(back.truncation(), TruncationPolicy::KeepTail);
        assert_eq!(back.padding(), PaddingSide::Post);
    }
}
