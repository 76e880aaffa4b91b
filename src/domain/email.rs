// ============================================================
// Layer 3 - Email Domain Types
// ============================================================
// An EmailRecord is one row of the dataset: raw text, an
// optional sender string and exactly one label.
// A CleanedRecord is what the preprocessor turns it into.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary target. Spam (phishing) is the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Legit,
    Spam,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Legit, Label::Spam];

    /// 0 for legit, 1 for spam. Used as the class index by every model.
    pub fn as_index(self) -> usize {
        match self {
            Label::Legit => 0,
            Label::Spam => 1,
        }
    }

    pub fn from_index(index: usize) -> Self {
        if index == 0 { Label::Legit } else { Label::Spam }
    }

    pub fn is_spam(self) -> bool {
        self == Label::Spam
    }

    /// Parse a dataset label cell. Returns None for anything that is not a
    /// recognised binary value.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "1.0" | "spam" | "phishing" | "true" => Some(Label::Spam),
            "0" | "0.0" | "ham" | "legit" | "legitimate" | "false" => Some(Label::Legit),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Legit => write!(f, "legit"),
            Label::Spam => write!(f, "spam"),
        }
    }
}

/// One email as loaded from disk. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRecord {
    raw_text: String,
    sender:   Option<String>,
    label:    Label,
}

impl EmailRecord {
    pub fn new(raw_text: impl Into<String>, label: Label) -> Self {
        Self { raw_text: raw_text.into(), sender: None, label }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn label(&self) -> Label {
        self.label
    }
}

/// Output of the preprocessor: an ordered token sequence plus the label
/// carried over from the source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub tokens: Vec<String>,
    pub label:  Label,
}

impl CleanedRecord {
    pub fn new(tokens: Vec<String>, label: Label) -> Self {
        Self { tokens, label }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Count of each class in a slice of labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDistribution {
    pub legit: usize,
    pub spam:  usize,
}

impl LabelDistribution {
    pub fn from_labels<I: IntoIterator<Item = Label>>(labels: I) -> Self {
        let mut dist = Self::default();
        for label in labels {
            match label {
                Label::Legit => dist.legit += 1,
                Label::Spam => dist.spam += 1,
            }
        }
        dist
    }

    pub fn total(&self) -> usize {
        self.legit + self.spam
    }

    /// legit:spam ratio, None when there is no spam at all
    pub fn imbalance_ratio(&self) -> Option<f64> {
        if self.spam == 0 {
            None
        } else {
            Some(self.legit as f64 / self.spam as f64)
        }
    }

    pub fn has_both_classes(&self) -> bool {
        self.legit > 0 && self.spam > 0
    }
}

impl fmt::Display for LabelDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.imbalance_ratio() {
            Some(r) => write!(f, "{} legit / {} spam ({:.2}:1)", self.legit, self.spam, r),
            None => write!(f, "{} legit / {} spam", self.legit, self.spam),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recognised_labels() {
        assert_eq!(Label::parse("1"), Some(Label::Spam));
        assert_eq!(Label::parse(" Spam "), Some(Label::Spam));
        assert_eq!(Label::parse("0.0"), Some(Label::Legit));
        assert_eq!(Label::parse("HAM"), Some(Label::Legit));
    }

    #[test]
    fn test_parse_rejects_unknown_labels() {
        assert_eq!(Label::parse("2"), None);
        assert_eq!(Label::parse(""), None);
        assert_eq!(Label::parse("maybe"), None);
    }

    #[test]
    fn test_index_round_trip() {
        for label in Label::ALL {
            assert_eq!(Label::from_index(label.as_index()), label);
        }
    }

    #[test]
    fn test_distribution_counts() {
        let dist = LabelDistribution::from_labels(vec![
            Label::Legit, Label::Legit, Label::Legit, Label::Spam,
        ]);
        assert_eq!(dist.legit, 3);
        assert_eq!(dist.spam, 1);
        assert_eq!(dist.imbalance_ratio(), Some(3.0));
        assert!(dist.has_both_classes());
    }
}
