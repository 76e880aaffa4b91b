// ============================================================
// Layer 6 - Tokenizer Store
// ============================================================
// Trains the sub-word tokenizer used when the transformer has no
// pre-trained checkpoint (a checkpoint brings its own
// tokenizer.json, see infra::pretrained).
//
// The fallback is a BERT-style WordPiece tokenizer learned from the
// training text of this run only, saved to {dir}/tokenizer.json so
// the run can be reproduced. Words never seen in training still
// split into known pieces ("accounts" → "account" "##s") instead of
// collapsing to [UNK].
//
// Training goes through the typed TokenizerImpl, whose Trainer::Model
// is WordPiece itself; the untyped Tokenizer wrapper would need a
// ModelWrapper trainer. The saved JSON is then reloaded as a plain
// Tokenizer.
//
// Fallback id layout:
//   [PAD]=0 [UNK]=1 [CLS]=2 [SEP]=3 [MASK]=4, learned pieces from 5

use anyhow::{anyhow, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokenizers::{
    decoders::wordpiece::WordPiece as WordPieceDecoder,
    models::wordpiece::{WordPiece, WordPieceTrainer},
    normalizers::bert::BertNormalizer,
    pre_tokenizers::bert::BertPreTokenizer,
    processors::bert::BertProcessing,
    AddedToken, Tokenizer, TokenizerBuilder, TokenizerImpl,
};

const SPECIAL_TOKENS: [&str; 5] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]"];
const CLS_ID: u32 = 2;
const SEP_ID: u32 = 3;

type WordPieceTokenizer = TokenizerImpl<WordPiece, BertNormalizer, BertPreTokenizer, BertProcessing, WordPieceDecoder>;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Learn a WordPiece vocabulary of at most `vocab_size` entries from
    /// `texts` (the training split only) and save it.
    pub fn train(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        tracing::info!("Training WordPiece tokenizer on {} texts (vocab_size={})", texts.len(), vocab_size);

        // ── Step 1: Trainer, special tokens first so their ids are fixed ──
        let mut trainer = WordPieceTrainer::builder()
            .vocab_size(vocab_size)
            .min_frequency(0)
            .show_progress(false)
            .special_tokens(SPECIAL_TOKENS.iter().map(|t| AddedToken::from(t.to_string(), true)).collect())
            .build();

        // ── Step 2: BERT pipeline ──
        let mut tokenizer: WordPieceTokenizer = TokenizerBuilder::new()
            .with_model(WordPiece::default())
            .with_normalizer(Some(BertNormalizer::default()))
            .with_pre_tokenizer(Some(BertPreTokenizer))
            .with_post_processor(Some(BertProcessing::new(
                (SPECIAL_TOKENS[SEP_ID as usize].to_string(), SEP_ID),
                (SPECIAL_TOKENS[CLS_ID as usize].to_string(), CLS_ID),
            )))
            .with_decoder(Some(WordPieceDecoder::default()))
            .build()
            .map_err(|e| anyhow!("Cannot assemble tokenizer: {e}"))?;

        // ── Step 3: Train and save ──
        tokenizer
            .train(&mut trainer, texts.iter())
            .map_err(|e| anyhow!("Tokenizer training failed: {e}"))?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| anyhow!("Cannot write tokenizer JSON to '{}': {e}", path.display()))?;
        tracing::info!("Tokenizer learned {} entries, saved to '{}'", tokenizer.get_vocab_size(true), path.display());

        load(&path)
    }
}

fn load(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path).map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
}
