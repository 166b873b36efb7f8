use thiserror::Error;

/// Hard failures raised by the restricted parse entry points and the
/// serialization escapers. Recoverable parse errors never surface here; they
/// are recorded through the [`crate::error_logger::ErrorLogger`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("unexpected end of stream")]
    UnexpectedEof,
    #[error("invalid character: {0}")]
    InvalidCharacter(String),
}
