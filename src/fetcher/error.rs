use std::fmt;
use thiserror::Error;

/// Why a single URL could not be fetched. Terminal for that URL.
///
/// The `Display` output is exactly what ends up in a failed record's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP Error: {0}")]
    Http(u16),

    #[error("{0}")]
    Network(NetworkErrorKind),

    #[error("{0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    DnsLookup,
    Timeout,
}

/// A DOM or markup query that could not run. Never escapes the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkErrorKind::DnsLookup => f.write_str("DNS Lookup Error"),
            NetworkErrorKind::Timeout => f.write_str("Timeout Error"),
        }
    }
}

impl FetchError {
    /// Transport-level failures worth another attempt at the fetch layer
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Http(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_strings() {
        assert_eq!(FetchError::Http(404).to_string(), "HTTP Error: 404");
        assert_eq!(
            FetchError::Network(NetworkErrorKind::DnsLookup).to_string(),
            "DNS Lookup Error"
        );
        assert_eq!(
            FetchError::Network(NetworkErrorKind::Timeout).to_string(),
            "Timeout Error"
        );
        assert_eq!(
            FetchError::Unknown("connection reset".to_string()).to_string(),
            "connection reset"
        );
    }
}
