//! Fixed English stop-word list (the NLTK `english` corpus).
//!
//! Contraction fragments appear both with and without the apostrophe so the
//! list still matches after punctuation stripping.

use lazy_static::lazy_static;
use std::collections::HashSet;

pub const ENGLISH: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're",
    "youre", "you've", "youve", "you'll", "youll", "you'd", "youd", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "she's", "shes",
    "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them", "their",
    "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "thatll", "these", "those", "am", "is", "are", "was", "were", "be", "been",
    "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at",
    "by", "for", "with", "about", "against", "between", "into", "through", "during",
    "before", "after", "above", "below", "to", "from", "up", "down", "in", "out", "on",
    "off", "over", "under", "again", "further", "then", "once", "here", "there",
    "when", "where", "why", "how", "all", "any", "both", "each", "few", "more", "most",
    "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "dont", "should",
    "should've", "shouldve", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain",
    "aren", "aren't", "arent", "couldn", "couldn't", "couldnt", "didn", "didn't",
    "didnt", "doesn", "doesn't", "doesnt", "hadn", "hadn't", "hadnt", "hasn",
    "hasn't", "hasnt", "haven", "haven't", "havent", "isn", "isn't", "isnt", "ma",
    "mightn", "mightn't", "mightnt", "mustn", "mustn't", "mustnt", "needn", "needn't",
    "neednt", "shan", "shan't", "shant", "shouldn", "shouldn't", "shouldnt", "wasn",
    "wasn't", "wasnt", "weren", "weren't", "werent", "won", "won't", "wont",
    "wouldn", "wouldn't", "wouldnt",
];

lazy_static! {
    static ref ENGLISH_SET: HashSet<&'static str> = ENGLISH.iter().copied().collect();
}

/// Case-insensitive membership test.
pub fn is_stop_word(token: &str) -> bool {
    if token.chars().any(char::is_uppercase) {
        ENGLISH_SET.contains(token.to_lowercase().as_str())
    } else {
        ENGLISH_SET.contains(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_words_are_stop_words() {
        for w in ["the", "and", "of", "The", "AND"] {
            assert!(is_stop_word(w), "{w}");
        }
    }

    #[test]
    fn test_content_words_are_kept() {
        for w in ["account", "verify", "password", "invoice"] {
            assert!(!is_stop_word(w), "{w}");
        }
    }
}
