use thiserror::Error;

/// A dataset that cannot be turned into labelled email records.
/// Always fatal: the run stops before any model is fitted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataFormatError {
    #[error("dataset '{path}' is missing required column '{column}'")]
    MissingColumn { path: String, column: String },

    #[error("row {row}: label '{value}' is not a recognised binary value")]
    UnrecognisedLabel { row: usize, value: String },

    #[error("row {row}: {message}")]
    MalformedRow { row: usize, message: String },
}
