// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything between the CSV file on disk and either a cleaned
// token sequence (classical path) or a tensor batch (neural path).
//
//   emails.csv
//       │
//       ▼
//   CsvEmailLoader    → EmailRecord { raw_text, sender, label }
//       │
//       ▼
//   split_indices     → disjoint train / test positions
//       │
//       ▼
//   Preprocessor      → CleanedRecord { tokens, label }
//       │
//       ├──► features::tfidf      (classical)
//       │
//       └──► encoding::*          (neural)
//                │
//                ▼
//            SequenceDataset → SequenceBatcher → DataLoader
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads labelled emails from CSV
pub mod loader;

/// Cleans raw email text into tokens
pub mod preprocessor;

/// English stop-word list
pub mod stopwords;

/// Plural-stripping noun lemmatizer
pub mod lemmatizer;

/// Seeded, optionally stratified train/test split
pub mod splitter;

/// burn Dataset over encoded sequences
pub mod dataset;

/// burn Batcher producing tensor batches
pub mod batcher;
