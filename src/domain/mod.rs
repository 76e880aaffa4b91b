// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs, enums and traits that name the core
// concepts of the benchmark: emails, labels, cleaned token
// sequences and the reports produced at the end of a run.
//
// Rules for this layer:
//   - NO burn or ndarray types
//   - NO file I/O
//   - Only data types, error types and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Email records, cleaned records and the binary label
pub mod email;

// Typed errors for malformed datasets
pub mod error;

// Metrics and run reports
pub mod report;

// Core abstractions implemented by other layers
pub mod traits;
