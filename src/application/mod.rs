// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// This layer orchestrates the other layers into the three
// benchmark workflows.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No result printing here (that's Layer 1)
//   - Only workflow coordination
//
// Every use case returns a RunReport; the CLI decides how to
// show and store it.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Shared loading and train / test splitting
pub mod prepare;

// TF-IDF + classical classifiers
pub mod classical_use_case;

// Sequence encoding + recurrent and transformer classifiers
pub mod neural_use_case;

// Both pipelines on one split
pub mod compare_use_case;
