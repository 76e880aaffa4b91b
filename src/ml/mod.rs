// ============================================================
// Layer 5b - ML / Neural Layer (Burn)
// ============================================================
// All Burn model and training code lives here:
//
//   model.rs   - RnnClassifier, LstmClassifier and
//                TransformerClassifier behind the shared
//                SequenceClassifier contract
//
//   trainer.rs - generic train loop: Adam, cross-entropy,
//                seeded shuffling, early stopping on val_loss,
//                best-epoch checkpointing, CSV epoch metrics
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Recurrent and transformer classifier architectures
pub mod model;

/// Training loop with validation, early stopping and checkpointing
pub mod trainer;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeuralModelKind {
    Rnn,
    Lstm,
    Transformer,
}

impl NeuralModelKind {
    pub const ALL: [NeuralModelKind; 3] = [NeuralModelKind::Rnn, NeuralModelKind::Lstm, NeuralModelKind::Transformer];

    pub fn name(self) -> &'static str {
        match self {
            NeuralModelKind::Rnn => "rnn",
            NeuralModelKind::Lstm => "lstm",
            NeuralModelKind::Transformer => "transformer",
        }
    }

    /// The transformer reads sub-word ids, the recurrent models word ids.
    pub fn uses_subwords(self) -> bool {
        self == NeuralModelKind::Transformer
    }
}

impl fmt::Display for NeuralModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
