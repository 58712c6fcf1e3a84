use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("request failed: {message}")]
    Fetch { message: String, retryable: bool },

    #[error("no reports found in the requested date range")]
    NoData,

    #[error("unexpected response shape: {0}")]
    Malformed(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn fetch(message: impl Into<String>, retryable: bool) -> Self {
        Error::Fetch {
            message: message.into(),
            retryable,
        }
    }

    /// Whether retrying the whole invocation could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Fetch { retryable: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_retryable_fetch_is_retryable() {
        assert!(Error::fetch("rate limited", true).is_retryable());
        assert!(!Error::fetch("bad request", false).is_retryable());
        assert!(!Error::Auth("expired".to_string()).is_retryable());
        assert!(!Error::NoData.is_retryable());
    }
}
