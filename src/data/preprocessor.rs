// ============================================================
// Layer 4 - Email Text Preprocessor
// ============================================================
// Turns the raw text of one email into an ordered sequence of
// clean tokens. Downstream vocabularies depend on exact token
// identity, so every step is a pure function of its input.
//
// Steps (applied in order, each one can be switched off):
//   a. strip non-body content: header block, HTML, entities
//   a'. mask URLs and email addresses with placeholders
//   b. lowercase
//   c. delete punctuation / non-word characters
//   d. tokenize on whitespace or on word boundaries
//   e. drop stop words
//   f. stem or lemmatize each remaining token
//
// An email that cleans down to nothing yields an empty Vec.
//
// Reference: regex crate documentation
//            rust-stemmers crate documentation

use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};

use crate::data::{lemmatizer, stopwords};
use crate::domain::email::{CleanedRecord, EmailRecord};

lazy_static! {
    static ref HEADER_LINE_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9-]*:\s").unwrap();
    static ref SCRIPT_STYLE_RE: Regex =
        Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").unwrap();
    static ref HTML_COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref NUMERIC_ENTITY_RE: Regex = Regex::new(r"&#(\d{1,7});").unwrap();
    static ref URL_RE: Regex = Regex::new(r"http\S+|www\S+").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"\S+@\S+").unwrap();
    static ref PUNCT_RE: Regex = Regex::new(r"[^\w\s]").unwrap();
    static ref WORD_RE: Regex = Regex::new(r"\w+").unwrap();
}

/// How step (d) splits text into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tokenization {
    Whitespace,
    WordBoundary,
}

/// Step (f): how each surviving token is reduced to a base form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenNormalizer {
    None,
    Stem,
    Lemmatize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub strip_markup:      bool,
    pub mask_addresses:    bool,
    pub lowercase:         bool,
    pub strip_punctuation: bool,
    pub tokenization:      Tokenization,
    pub remove_stop_words: bool,
    pub normalizer:        TokenNormalizer,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            strip_markup:      true,
            mask_addresses:    true,
            lowercase:         true,
            strip_punctuation: true,
            tokenization:      Tokenization::Whitespace,
            remove_stop_words: true,
            normalizer:        TokenNormalizer::Lemmatize,
        }
    }
}

pub struct Preprocessor {
    config:  PreprocessConfig,
    stemmer: Option<Stemmer>,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        let stemmer = match config.normalizer {
            TokenNormalizer::Stem => Some(Stemmer::create(Algorithm::English)),
            _ => None,
        };
        Self { config, stemmer }
    }

    /// Clean raw email text into tokens.
    pub fn clean(&self, raw: &str) -> Vec<String> {
        let cfg = &self.config;

        // ── a. Strip headers and markup ──────────────────────────────────────
        let mut text = if cfg.strip_markup {
            strip_markup(strip_header_block(raw))
        } else {
            raw.to_string()
        };

        // ── a'. Mask URLs, then addresses ─────────────────────────────────────
        if cfg.mask_addresses {
            text = URL_RE.replace_all(&text, " URL ").into_owned();
            text = EMAIL_RE.replace_all(&text, " EMAIL ").into_owned();
        }

        // ── b. Lowercase ──────────────────────────────────────────────────────
        if cfg.lowercase {
            text = text.to_lowercase();
        }

        // ── c. Delete punctuation ─────────────────────────────────────────────
        if cfg.strip_punctuation {
            text = PUNCT_RE.replace_all(&text, "").into_owned();
        }

        // ── d. Tokenize ───────────────────────────────────────────────────────
        let tokens: Vec<&str> = match cfg.tokenization {
            Tokenization::Whitespace => text.split_whitespace().collect(),
            Tokenization::WordBoundary => WORD_RE.find_iter(&text).map(|m| m.as_str()).collect(),
        };

        // ── e + f. Stop words, then normalisation ─────────────────────────────
        tokens
            .into_iter()
            .filter(|t| !(cfg.remove_stop_words && stopwords::is_stop_word(t)))
            .map(|t| self.normalize(t))
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Clean text and join the tokens with single spaces. This is the form
    /// handed to sub-word tokenizers.
    pub fn clean_text(&self, raw: &str) -> String {
        self.clean(raw).join(" ")
    }

    pub fn clean_record(&self, record: &EmailRecord) -> CleanedRecord {
        CleanedRecord::new(self.clean(record.raw_text()), record.label())
    }

    pub fn clean_all(&self, records: &[EmailRecord]) -> Vec<CleanedRecord> {
        let cleaned: Vec<CleanedRecord> = records.iter().map(|r| self.clean_record(r)).collect();
        let empty = cleaned.iter().filter(|r| r.is_empty()).count();
        if empty > 0 {
            tracing::debug!("{} of {} records cleaned down to no tokens", empty, cleaned.len());
        }
        cleaned
    }

    fn normalize(&self, token: &str) -> String {
        match self.config.normalizer {
            TokenNormalizer::None => token.to_string(),
            TokenNormalizer::Lemmatize => lemmatizer::lemmatize(token),
            TokenNormalizer::Stem => match &self.stemmer {
                Some(stemmer) => stemmer.stem(token).into_owned(),
                None => token.to_string(),
            },
        }
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(PreprocessConfig::default())
    }
}

/// Drop a leading RFC-822 style header block. The block must consist only of
/// `Name: value` lines (plus indented continuations) and end at a blank line;
/// otherwise the text is returned unchanged.
fn strip_header_block(raw: &str) -> &str {
    let mut offset = 0usize;
    let mut saw_header = false;

    for line in raw.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        if content.trim().is_empty() {
            return if saw_header { &raw[offset + line.len()..] } else { raw };
        }
        let is_continuation = saw_header && content.starts_with([' ', '\t']);
        if !(HEADER_LINE_RE.is_match(content) || is_continuation) {
            return raw;
        }
        saw_header = true;
        offset += line.len();
    }
    raw
}

/// Remove scripts, styles, comments and tags, then decode common entities.
fn strip_markup(text: &str) -> String {
    let text = SCRIPT_STYLE_RE.replace_all(text, " ");
    let text = HTML_COMMENT_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, " ");
    let text = NUMERIC_ENTITY_RE.replace_all(&text, |caps: &regex::Captures| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
