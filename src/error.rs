use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A plain-text offset outside `1..=len` was looked up.
    #[error("plain text offset {offset} is out of range (valid: 1..={len})")]
    OutOfRange { offset: usize, len: usize },

    /// A rule match span does not fit the plain text it was reported for.
    #[error("rule match span {start}..{end} does not fit plain text of length {len}")]
    InvalidSpan { start: usize, end: usize, len: usize },

    #[error("page not found: {page}")]
    PageNotFound { page: String },

    #[error(transparent)]
    RuleEngine(anyhow::Error),

    #[error(transparent)]
    Config(anyhow::Error),
}
