// Sub-word id encoding for the transformer.
//
//   "verify your account"
//       │ tokenizer.encode, with its own post-processor
//       ▼
//   [CLS] 812 77 1902 [SEP] [PAD] [PAD] ...   (exactly max_len)
//   1     1   1  1    1     0     0           (attention mask)
//
// Which special tokens wrap the ids is the tokenizer's business:
// BERT tokenizers add [CLS]/[SEP], RoBERTa ones <s>/</s>. Long inputs
// keep their head and the closing token survives truncation. Padding
// goes after the tokens, which is what pre-trained encoders expect.

use anyhow::{anyhow, bail, Result};
use tokenizers::{PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::data::dataset::SequenceSample;
use crate::domain::email::Label;

const PAD_CANDIDATES: [&str; 2] = ["[PAD]", "<pad>"];

pub struct SubwordEncoder {
    tokenizer: Tokenizer,
}

impl SubwordEncoder {
    /// Configure `tokenizer` to truncate and pad to exactly `max_len`.
    pub fn new(mut tokenizer: Tokenizer, max_len: usize) -> Result<Self> {
        if max_len < 2 {
            bail!("max_len must leave room for the special tokens (got {max_len})");
        }
        let (pad_id, pad_token) = match tokenizer.get_padding() {
            Some(p) => (p.pad_id, p.pad_token.clone()),
            None => PAD_CANDIDATES
                .iter()
                .find_map(|t| tokenizer.token_to_id(t).map(|id| (id, t.to_string())))
                .ok_or_else(|| anyhow!("tokenizer has no padding token (tried {:?})", PAD_CANDIDATES))?,
        };

        tokenizer
            .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
            .map_err(|e| anyhow!("cannot truncate to {max_len} tokens: {e}"))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_len),
            direction: PaddingDirection::Right,
            pad_id,
            pad_token,
            ..Default::default()
        }));
        Ok(Self { tokenizer })
    }

    /// Embedding rows needed to cover every id the tokenizer can emit.
    pub fn embedding_size(&self) -> usize {
        self.tokenizer
            .get_vocab(true)
            .values()
            .max()
            .map(|&id| id as usize + 1)
            .unwrap_or(0)
    }

    /// (token ids, attention mask), both exactly `max_len` long.
    pub fn encode(&self, text: &str) -> Result<(Vec<u32>, Vec<u32>)> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("tokenizer failed: {e}"))?;
        Ok((encoding.get_ids().to_vec(), encoding.get_attention_mask().to_vec()))
    }

    pub fn encode_text(&self, text: &str, label: Label) -> Result<SequenceSample> {
        let (token_ids, attention_mask) = self.encode(text)?;
        Ok(SequenceSample { token_ids, attention_mask, label })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::TokenizerStore;
    use std::str::FromStr;

    fn encoder(max_len: usize) -> (tempfile::TempDir, SubwordEncoder) {
        let dir = tempfile::tempdir().unwrap();
        let texts = vec!["claim your prize now".to_string(), "your meeting notes".to_string()];
        let tok = TokenizerStore::new(dir.path()).train(&texts, 60).unwrap();
        (dir, SubwordEncoder::new(tok, max_len).unwrap())
    }

    /// A RoBERTa-style tokenizer: <s> … </s>, <pad> = 1.
    fn roberta_style() -> Tokenizer {
        Tokenizer::from_str(
            r#"{
                "version": "1.0", "truncation": null, "padding": null,
                "added_tokens": [
                    {"id": 0, "content": "<s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                    {"id": 1, "content": "<pad>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                    {"id": 2, "content": "</s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                    {"id": 3, "content": "<unk>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
                ],
                "normalizer": null,
                "pre_tokenizer": {"type": "Whitespace"},
                "post_processor": {"type": "RobertaProcessing", "sep": ["</s>", 2], "cls": ["<s>", 0], "trim_offsets": true, "add_prefix_space": false},
                "decoder": null,
                "model": {"type": "WordLevel", "vocab": {"<s>": 0, "<pad>": 1, "</s>": 2, "<unk>": 3, "hello": 4, "world": 5}, "unk_token": "<unk>"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_wraps_and_pads() {
        let (_dir, enc) = encoder(8);
        let (ids, mask) = enc.encode("your prize").unwrap();
        assert_eq!(ids.len(), 8);
        assert_eq!(ids[0], 2); // [CLS]
        let real = mask.iter().filter(|&&m| m == 1).count();
        assert_eq!(ids[real - 1], 3); // [SEP] closes the real part
        assert!(ids[real..].iter().all(|&id| id == 0));
        assert!(mask[..real].iter().all(|&m| m == 1));
    }

    #[test]
    fn test_truncation_keeps_head_and_sep() {
        let (_dir, enc) = encoder(4);
        let (ids, mask) = enc.encode("claim your prize now").unwrap();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], 2);
        assert_eq!(ids[3], 3);
        assert_eq!(mask, vec![1; 4]);
    }

    #[test]
    fn test_empty_text_is_cls_sep_only() {
        let (_dir, enc) = encoder(4);
        let (ids, mask) = enc.encode("").unwrap();
        assert_eq!(ids, vec![2, 3, 0, 0]);
        assert_eq!(mask, vec![1, 1, 0, 0]);
    }

    #[test]
    fn test_roberta_special_tokens_are_accepted() {
        let enc = SubwordEncoder::new(roberta_style(), 6).unwrap();
        let (ids, mask) = enc.encode("hello world").unwrap();
        assert_eq!(ids, vec![0, 4, 5, 2, 1, 1]);
        assert_eq!(mask, vec![1, 1, 1, 1, 0, 0]);
        assert_eq!(enc.embedding_size(), 6);
    }

    #[test]
    fn test_tiny_max_len_rejected() {
        assert!(SubwordEncoder::new(roberta_style(), 1).is_err());
    }
}
