// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by more than one pipeline:
//
//   checkpoint.rs      - best-epoch weights (CompactRecorder),
//                        run config and vocabulary as JSON
//
//   pretrained.rs      - HuggingFace BERT / RoBERTa checkpoint
//                        directory: config, encoder weights and
//                        the tokenizer.json they were trained with
//
//   tokenizer_store.rs - WordPiece tokenizer learned from the
//                        training split when no checkpoint is used
//
//   metrics.rs         - evaluation metrics (accuracy, precision,
//                        recall, F1, ROC-AUC, per-class) and the
//                        per-epoch CSV logger
//
//   report.rs          - results table on stdout and the JSON
//                        run report
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Pre-trained encoder checkpoints
pub mod pretrained;

/// Fallback tokenizer training and saving
pub mod tokenizer_store;

/// Evaluation metrics and epoch CSV logging
pub mod metrics;

/// Printed and JSON run reports
pub mod report;
