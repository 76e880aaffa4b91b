// ============================================================
// Layer 4 - Sequence Batcher
// ============================================================
// Implements burn's Batcher trait: stacks N pre-padded samples
// of length S into [N, S] tensors.
//
//   [s1_t1, ..., s1_tS, s2_t1, ..., sN_tS] → [N, S]
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::SequenceSample;

/// A batch ready for the forward pass.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Token ids, shape [batch_size, seq_len]
    pub token_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding, shape [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Class index per sample (0 legit, 1 spam), shape [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SequenceSample, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<SequenceSample>) -> SequenceBatch<B> {
        let batch_size = items.len();
        // Every sample was padded to the same length by the encoder
        let seq_len    = items.first().map(|s| s.token_ids.len()).unwrap_or(0);

        let ids_flat: Vec<i64> = items
            .iter()
            .flat_map(|s| s.token_ids.iter().map(|&x| x as i64))
            .collect();
        let mask_flat: Vec<i64> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i64))
            .collect();
        let labels: Vec<i64> = items
            .iter()
            .map(|s| s.label.as_index() as i64)
            .collect();

        let token_ids = Tensor::<B, 2, Int>::from_data(
            TensorData::new(ids_flat, [batch_size, seq_len]),
            &self.device,
        );
        let attention_mask = Tensor::<B, 2, Int>::from_data(
            TensorData::new(mask_flat, [batch_size, seq_len]),
            &self.device,
        );
        let labels = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]),
            &self.device,
        );

        SequenceBatch { token_ids, attention_mask, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email::Label;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_batch_shapes() {
        let batcher = SequenceBatcher::<TestBackend>::new(Default::default());
        let items = vec![
            SequenceSample { token_ids: vec![0, 5, 6], attention_mask: vec![0, 1, 1], label: Label::Spam },
            SequenceSample { token_ids: vec![2, 3, 4], attention_mask: vec![1, 1, 1], label: Label::Legit },
        ];
        let batch = batcher.batch(items);
        assert_eq!(batch.token_ids.dims(), [2, 3]);
        assert_eq!(batch.attention_mask.dims(), [2, 3]);
        assert_eq!(batch.labels.dims(), [2]);

        let labels = batch.labels.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![1, 0]);
    }
}
