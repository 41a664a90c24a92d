use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Returned when a string is not one of the known transaction types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid transaction type '{0}', must be one of ['deposit', 'withdrawal', 'transfer']")]
pub struct ParseTransactionTypeError(pub String);
