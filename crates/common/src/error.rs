use thiserror::Error;

#[derive(Debug, Error)]
pub enum TtlGateError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("key expired: {0}")]
    Expired(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("background task error: {0}")]
    Task(String),

    #[error("owning store has been dropped")]
    Closed,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("code delivery failed: {0}")]
    Delivery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TtlGateError {
    /// Returns `true` for the two expected, recoverable lookup misses.
    pub fn is_miss(&self) -> bool {
        matches!(self, TtlGateError::NotFound(_) | TtlGateError::Expired(_))
    }
}

pub type TtlGateResult<T> = Result<T, TtlGateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misses_are_distinguished_from_failures() {
        assert!(TtlGateError::NotFound("a".into()).is_miss());
        assert!(TtlGateError::Expired("a".into()).is_miss());
        assert!(!TtlGateError::Closed.is_miss());
        assert!(!TtlGateError::Config("bad".into()).is_miss());
    }

    #[test]
    fn display_names_the_key() {
        let err = TtlGateError::Expired("otp:+100".into());
        assert_eq!(err.to_string(), "key expired: otp:+100");
    }
}
