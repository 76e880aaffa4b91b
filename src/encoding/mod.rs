// ============================================================
// Layer 4c - Sequence Encoding (neural path)
// ============================================================
// Turns cleaned text into fixed-length id sequences:
//
//   sequence.rs - word ids from a SequenceVocabulary fitted on the
//                 training split (recurrent models)
//   subword.rs  - ids from a HuggingFace tokenizer, wrapped in
//                 [CLS] ... [SEP] (transformer)
//
// Both produce SequenceSample { token_ids, attention_mask, label }
// so the same Dataset/Batcher feeds every neural model.

pub mod sequence;
pub mod subword;
