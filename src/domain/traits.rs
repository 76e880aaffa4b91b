// ============================================================
// Layer 3 - Core Traits
// ============================================================
// The application layer programs against these, so a new dataset
// format only needs a new EmailSource implementation.

use anyhow::Result;

use crate::domain::email::EmailRecord;

// ─── EmailSource ──────────────────────────────────────────────────────────────
/// Anything that can produce the full, ordered list of labelled emails.
///
/// Implementations:
///   - CsvEmailLoader → a CSV file with text and label columns
pub trait EmailSource {
    fn load_all(&self) -> Result<Vec<EmailRecord>>;

    /// Human readable origin, used in reports
    fn describe(&self) -> String;
}

// ─── InMemorySource ───────────────────────────────────────────────────────────
/// Records that are already in memory. Used by tests and by callers that
/// build a corpus programmatically.
pub struct InMemorySource {
    records: Vec<EmailRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<EmailRecord>) -> Self {
        Self { records }
    }
}

impl EmailSource for InMemorySource {
    fn load_all(&self) -> Result<Vec<EmailRecord>> {
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        format!("<in-memory: {} records>", self.records.len())
    }
}
