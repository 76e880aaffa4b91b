use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::email::Label;

/// One encoded email, padded to the configured maximum length.
/// attention_mask is 1 for real tokens and 0 for padding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceSample {
    pub token_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub label:          Label,
}

impl SequenceSample {
    pub fn real_length(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

pub struct SequenceDataset {
    samples: Vec<SequenceSample>,
}

impl SequenceDataset {
    pub fn new(samples: Vec<SequenceSample>) -> Self { Self { samples } }

    pub fn samples(&self) -> &[SequenceSample] {
        &self.samples
    }

    pub fn labels(&self) -> Vec<Label> {
        self.samples.iter().map(|s| s.label).collect()
    }
}

impl Dataset<SequenceSample> for SequenceDataset {
    fn get(&self, index: usize) -> Option<SequenceSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
