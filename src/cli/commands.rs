// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `classical`, `neural` and
// `compare`, and all their configurable flags.
//
// Flag groups are separate Args structs flattened into each
// command, so `compare` accepts exactly the union of the
// other two without repeating any definitions.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for bad values
//   - type conversion (string → usize, f64, enums)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{
    classical_use_case::ClassicalConfig,
    neural_use_case::NeuralConfig,
    prepare::DataConfig,
};
use crate::classical::{ClassicalModelKind, ClassicalParams};
use crate::data::{
    loader::ColumnMapping,
    preprocessor::{PreprocessConfig, TokenNormalizer, Tokenization},
};
use crate::encoding::sequence::{PaddingSide, TruncationPolicy};
use crate::features::tfidf::TfidfConfig;
use crate::infra::pretrained::DEFAULT_CHECKPOINT_DIR;
use crate::ml::{trainer::TrainerConfig, NeuralModelKind};

/// The three top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// TF-IDF features with logistic regression, linear SVC,
    /// random forest and gradient boosting
    Classical(ClassicalArgs),

    /// Sequence encodings with an RNN, an LSTM and a transformer
    Neural(NeuralArgs),

    /// Both pipelines on the same split, one combined table
    Compare(CompareArgs),
}

// ─── Shared data flags ────────────────────────────────────────────────────────

#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// CSV file with a header row
    #[arg(long, default_value = "data/emails.csv")]
    pub dataset: String,

    /// Column(s) holding email text, joined in order (comma separated)
    #[arg(long, value_delimiter = ',', default_value = "text")]
    pub text_columns: Vec<String>,

    /// Column holding the label (1/spam/phishing vs 0/ham/legit)
    #[arg(long, default_value = "label")]
    pub label_column: String,

    /// Optional column holding the sender address
    #[arg(long)]
    pub sender_column: Option<String>,

    /// Fraction of records used for training
    #[arg(long, default_value_t = 0.8)]
    pub train_ratio: f64,

    /// Seed for splitting, shuffling and model initialisation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Split at random instead of preserving class proportions
    #[arg(long)]
    pub no_stratify: bool,

    /// Directory for the JSON run report
    #[arg(long, default_value = "reports")]
    pub output_dir: String,

    #[command(flatten)]
    pub preprocess: PreprocessArgs,
}

/// Each cleaning step can be switched off on its own.
#[derive(Args, Debug, Clone)]
pub struct PreprocessArgs {
    /// Keep header blocks and HTML markup
    #[arg(long)]
    pub keep_markup: bool,

    /// Do not replace URLs and email addresses with placeholders
    #[arg(long)]
    pub no_mask_addresses: bool,

    #[arg(long)]
    pub keep_case: bool,

    #[arg(long)]
    pub keep_punctuation: bool,

    #[arg(long, value_enum, default_value_t = TokenizationArg::Whitespace)]
    pub tokenization: TokenizationArg,

    #[arg(long)]
    pub keep_stop_words: bool,

    /// How tokens are reduced to a base form
    #[arg(long, value_enum, default_value_t = NormalizerArg::Lemmatize)]
    pub normalizer: NormalizerArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizationArg {
    Whitespace,
    WordBoundary,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizerArg {
    None,
    Stem,
    Lemmatize,
}

impl From<TokenizationArg> for Tokenization {
    fn from(a: TokenizationArg) -> Self {
        match a {
            TokenizationArg::Whitespace => Tokenization::Whitespace,
            TokenizationArg::WordBoundary => Tokenization::WordBoundary,
        }
    }
}

impl From<NormalizerArg> for TokenNormalizer {
    fn from(a: NormalizerArg) -> Self {
        match a {
            NormalizerArg::None => TokenNormalizer::None,
            NormalizerArg::Stem => TokenNormalizer::Stem,
            NormalizerArg::Lemmatize => TokenNormalizer::Lemmatize,
        }
    }
}

impl From<PreprocessArgs> for PreprocessConfig {
    fn from(a: PreprocessArgs) -> Self {
        PreprocessConfig {
            strip_markup:      !a.keep_markup,
            mask_addresses:    !a.no_mask_addresses,
            lowercase:         !a.keep_case,
            strip_punctuation: !a.keep_punctuation,
            tokenization:      a.tokenization.into(),
            remove_stop_words: !a.keep_stop_words,
            normalizer:        a.normalizer.into(),
        }
    }
}

/// Convert CLI DataArgs into the application-layer DataConfig.
/// The application layer never sees clap types.
impl From<DataArgs> for DataConfig {
    fn from(a: DataArgs) -> Self {
        DataConfig {
            dataset:     a.dataset,
            columns:     ColumnMapping {
                text:   a.text_columns,
                label:  a.label_column,
                sender: a.sender_column,
            },
            train_ratio: a.train_ratio,
            seed:        a.seed,
            stratify:    !a.no_stratify,
            output_dir:  a.output_dir,
            preprocess:  a.preprocess.into(),
        }
    }
}

// ─── Classical flags ──────────────────────────────────────────────────────────

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassicalModelArg {
    LogisticRegression,
    LinearSvc,
    RandomForest,
    GradientBoosting,
}

impl From<ClassicalModelArg> for ClassicalModelKind {
    fn from(a: ClassicalModelArg) -> Self {
        match a {
            ClassicalModelArg::LogisticRegression => ClassicalModelKind::LogisticRegression,
            ClassicalModelArg::LinearSvc => ClassicalModelKind::LinearSvc,
            ClassicalModelArg::RandomForest => ClassicalModelKind::RandomForest,
            ClassicalModelArg::GradientBoosting => ClassicalModelKind::GradientBoosting,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClassicalOptions {
    /// Which classical models to train (comma separated)
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [
            ClassicalModelArg::LogisticRegression,
            ClassicalModelArg::LinearSvc,
            ClassicalModelArg::RandomForest,
            ClassicalModelArg::GradientBoosting,
        ]
    )]
    pub classical_models: Vec<ClassicalModelArg>,

    /// Keep only the most frequent TF-IDF terms; 0 keeps all
    #[arg(long, default_value_t = 5000)]
    pub max_features: usize,

    /// Minimum number of training documents a term must appear in
    #[arg(long, default_value_t = 1)]
    pub min_df: usize,

    /// Use 1 + ln(tf) instead of raw term counts
    #[arg(long)]
    pub sublinear_tf: bool,

    /// Append sender-format features (needs --sender-column)
    #[arg(long)]
    pub sender_features: bool,

    /// Inverse regularisation strength of logistic regression
    #[arg(long, default_value_t = 1.0)]
    pub lr_c: f64,

    /// Inverse regularisation strength of the linear SVC
    #[arg(long, default_value_t = 1.0)]
    pub svc_c: f64,

    /// Iteration cap of the logistic regression solver
    #[arg(long, default_value_t = 1000)]
    pub max_iter: usize,

    /// Trees in the random forest
    #[arg(long, default_value_t = 100)]
    pub n_trees: usize,

    /// Depth limit of random forest trees (unlimited if unset)
    #[arg(long)]
    pub forest_max_depth: Option<usize>,

    /// Boosting rounds
    #[arg(long, default_value_t = 100)]
    pub n_estimators: usize,

    /// Shrinkage applied to every boosting round
    #[arg(long, default_value_t = 0.1)]
    pub boost_learning_rate: f64,

    /// Depth of each boosted tree
    #[arg(long, default_value_t = 3)]
    pub boost_max_depth: usize,
}

impl ClassicalOptions {
    fn into_config(self, data: DataConfig) -> ClassicalConfig {
        let mut params = ClassicalParams::default();
        params.logistic.c             = self.lr_c;
        params.logistic.max_iter      = self.max_iter;
        params.svc.c                  = self.svc_c;
        params.forest.n_trees         = self.n_trees;
        params.forest.max_depth       = self.forest_max_depth;
        params.boosting.n_estimators  = self.n_estimators;
        params.boosting.learning_rate = self.boost_learning_rate;
        params.boosting.max_depth     = self.boost_max_depth;

        ClassicalConfig {
            data,
            tfidf: TfidfConfig {
                max_features: (self.max_features > 0).then_some(self.max_features),
                min_df:       self.min_df,
                sublinear_tf: self.sublinear_tf,
            },
            sender_features: self.sender_features,
            models: self.classical_models.into_iter().map(Into::into).collect(),
            params,
        }
    }
}

/// All arguments for the `classical` command
#[derive(Args, Debug)]
pub struct ClassicalArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub classical: ClassicalOptions,
}

impl From<ClassicalArgs> for ClassicalConfig {
    fn from(a: ClassicalArgs) -> Self {
        a.classical.into_config(a.data.into())
    }
}

// ─── Neural flags ─────────────────────────────────────────────────────────────

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeuralModelArg {
    Rnn,
    Lstm,
    Transformer,
}

impl From<NeuralModelArg> for NeuralModelKind {
    fn from(a: NeuralModelArg) -> Self {
        match a {
            NeuralModelArg::Rnn => NeuralModelKind::Rnn,
            NeuralModelArg::Lstm => NeuralModelKind::Lstm,
            NeuralModelArg::Transformer => NeuralModelKind::Transformer,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationArg {
    /// Keep the first tokens
    KeepHead,
    /// Keep the last tokens
    KeepTail,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddingArg {
    Pre,
    Post,
}

impl From<TruncationArg> for TruncationPolicy {
    fn from(a: TruncationArg) -> Self {
        match a {
            TruncationArg::KeepHead => TruncationPolicy::KeepHead,
            TruncationArg::KeepTail => TruncationPolicy::KeepTail,
        }
    }
}

impl From<PaddingArg> for PaddingSide {
    fn from(a: PaddingArg) -> Self {
        match a {
            PaddingArg::Pre => PaddingSide::Pre,
            PaddingArg::Post => PaddingSide::Post,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct NeuralOptions {
    /// Which neural models to train (comma separated)
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = [NeuralModelArg::Rnn, NeuralModelArg::Lstm, NeuralModelArg::Transformer]
    )]
    pub neural_models: Vec<NeuralModelArg>,

    /// Directory to save checkpoints, vocabularies and epoch metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Maximum number of full passes through the training data
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Number of samples processed together in one forward pass
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Epochs without validation improvement before stopping; 0 disables
    #[arg(long, default_value_t = 3)]
    pub patience: usize,

    /// Share of the training split held back for validation
    #[arg(long, default_value_t = 0.1)]
    pub validation_ratio: f64,

    /// Word sequence length for the recurrent models
    #[arg(long, default_value_t = 200)]
    pub max_len: usize,

    /// Cap on the word vocabulary, reserved ids included; 0 keeps all
    #[arg(long, default_value_t = 20_000)]
    pub max_vocab: usize,

    #[arg(long, value_enum, default_value_t = TruncationArg::KeepHead)]
    pub truncation: TruncationArg,

    #[arg(long, value_enum, default_value_t = PaddingArg::Pre)]
    pub padding: PaddingArg,

    #[arg(long, default_value_t = 128)]
    pub embed_dim: usize,

    /// Hidden state size of the RNN and LSTM
    #[arg(long, default_value_t = 128)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 0.2)]
    pub rnn_dropout: f64,

    /// Sub-word sequence length for the transformer, special tokens included
    #[arg(long, default_value_t = 128)]
    pub subword_max_len: usize,

    /// HuggingFace BERT or RoBERTa checkpoint directory
    /// (config.json, pytorch_model.bin, tokenizer.json) to fine-tune
    #[arg(long, default_value = DEFAULT_CHECKPOINT_DIR)]
    pub pretrained_model: String,

    /// Ignore --pretrained-model and train a small transformer from scratch
    #[arg(long)]
    pub from_scratch: bool,

    /// Vocabulary size of the tokenizer learned when training from scratch
    #[arg(long, default_value_t = 30_000)]
    pub subword_vocab_size: usize,

    /// Hidden dimension of a transformer trained from scratch
    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 256)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub transformer_dropout: f64,
}

impl NeuralOptions {
    fn into_config(self, data: DataConfig) -> NeuralConfig {
        NeuralConfig {
            trainer: TrainerConfig {
                epochs:        self.epochs,
                batch_size:    self.batch_size,
                learning_rate: self.lr,
                patience:      self.patience,
                seed:          data.seed,
            },
            data,
            models:              self.neural_models.into_iter().map(Into::into).collect(),
            validation_ratio:    self.validation_ratio,
            checkpoint_dir:      self.checkpoint_dir,
            max_len:             self.max_len,
            max_vocab:           (self.max_vocab > 0).then_some(self.max_vocab),
            truncation:          self.truncation.into(),
            padding:             self.padding.into(),
            embed_dim:           self.embed_dim,
            hidden_size:         self.hidden_size,
            rnn_dropout:         self.rnn_dropout,
            subword_max_len:     self.subword_max_len,
            subword_vocab_size:  self.subword_vocab_size,
            d_model:             self.d_model,
            num_heads:           self.num_heads,
            num_layers:          self.num_layers,
            d_ff:                self.d_ff,
            transformer_dropout: self.transformer_dropout,
            pretrained_model:    (!self.from_scratch).then_some(self.pretrained_model),
        }
    }
}

/// All arguments for the `neural` command
#[derive(Args, Debug)]
pub struct NeuralArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub neural: NeuralOptions,
}

impl From<NeuralArgs> for NeuralConfig {
    fn from(a: NeuralArgs) -> Self {
        a.neural.into_config(a.data.into())
    }
}

// ─── Compare ──────────────────────────────────────────────────────────────────

/// All arguments for the `compare` command
#[derive(Args, Debug)]
pub struct CompareArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub classical: ClassicalOptions,

    #[command(flatten)]
    pub neural: NeuralOptions,
}

impl From<CompareArgs> for (ClassicalConfig, NeuralConfig) {
    fn from(a: CompareArgs) -> Self {
        let data: DataConfig = a.data.into();
        (a.classical.into_config(data.clone()), a.neural.into_config(data))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        let mut argv = vec!["phish-bench"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    #[test]
    fn test_classical_defaults_match_config_defaults() {
        let Commands::Classical(args) = parse(&["classical"]) else { panic!("wrong command") };
        let config: ClassicalConfig = args.into();
        assert_eq!(config, ClassicalConfig::default());
    }

    #[test]
    fn test_neural_defaults_match_config_defaults() {
        let Commands::Neural(args) = parse(&["neural"]) else { panic!("wrong command") };
        let config: NeuralConfig = args.into();
        assert_eq!(config, NeuralConfig::default());
    }

    #[test]
    fn test_flags_reach_the_config() {
        let Commands::Classical(args) = parse(&[
            "classical",
            "--dataset", "mail.csv",
            "--text-columns", "subject,body",
            "--no-stratify",
            "--normalizer", "stem",
            "--classical-models", "linear-svc,random-forest",
            "--max-features", "0",
        ]) else {
            panic!("wrong command")
        };
        let config: ClassicalConfig = args.into();
        assert_eq!(config.data.dataset, "mail.csv");
        assert_eq!(config.data.columns.text, vec!["subject", "body"]);
        assert!(!config.data.stratify);
        assert_eq!(config.data.preprocess.normalizer, TokenNormalizer::Stem);
        assert_eq!(config.models, vec![ClassicalModelKind::LinearSvc, ClassicalModelKind::RandomForest]);
        assert_eq!(config.tfidf.max_features, None);
    }

    #[test]
    fn test_compare_shares_data_config() {
        let Commands::Compare(args) = parse(&["compare", "--seed", "7", "--neural-models", "lstm"]) else {
            panic!("wrong command")
        };
        let (classical, neural): (ClassicalConfig, NeuralConfig) = args.into();
        assert_eq!(classical.data, neural.data);
        assert_eq!(neural.trainer.seed, 7);
        assert_eq!(neural.models, vec![NeuralModelKind::Lstm]);
    }

    #[test]
    fn test_transformer_fine_tunes_a_checkpoint_unless_told_otherwise() {
        let Commands::Neural(args) = parse(&["neural"]) else { panic!("wrong command") };
        let config: NeuralConfig = args.into();
        assert_eq!(config.pretrained_model.as_deref(), Some(DEFAULT_CHECKPOINT_DIR));

        let Commands::Neural(args) = parse(&["neural", "--pretrained-model", "models/roberta-base"]) else {
            panic!("wrong command")
        };
        let config: NeuralConfig = args.into();
        assert_eq!(config.pretrained_model.as_deref(), Some("models/roberta-base"));

        let Commands::Neural(args) = parse(&["neural", "--from-scratch"]) else { panic!("wrong command") };
        let config: NeuralConfig = args.into();
        assert_eq!(config.pretrained_model, None);
    }
}
