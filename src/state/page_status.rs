/// Outcome of auditing one page
use crate::FetchError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Fetched, extracted and scored
    Audited,

    // ===== Failure States =====
    /// Returned HTTP 4xx/5xx
    DeadLink,

    /// Connection refused, DNS failure, TLS error
    Unreachable,

    /// Navigation did not finish in time
    TimedOut,

    /// Content-Type is not HTML
    ContentMismatch,

    /// Anything else, including a missing browser session
    Failed,
}

impl PageStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Audited)
    }

    /// Classifies a fetch failure
    pub fn from_fetch_error(error: &FetchError) -> Self {
        match error {
            FetchError::HttpStatus { .. } => Self::DeadLink,
            FetchError::Network { .. } => Self::Unreachable,
            FetchError::Timeout { .. } => Self::TimedOut,
            FetchError::NotHtml { .. } => Self::ContentMismatch,
            FetchError::SessionUnavailable { .. } => Self::Failed,
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Audited => "audited",
            Self::DeadLink => "dead_link",
            Self::Unreachable => "unreachable",
            Self::TimedOut => "timed_out",
            Self::ContentMismatch => "content_mismatch",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "audited" => Some(Self::Audited),
            "dead_link" => Some(Self::DeadLink),
            "unreachable" => Some(Self::Unreachable),
            "timed_out" => Some(Self::TimedOut),
            "content_mismatch" => Some(Self::ContentMismatch),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn all_states() -> [Self; 6] {
        [
            Self::Audited,
            Self::DeadLink,
            Self::Unreachable,
            Self::TimedOut,
            Self::ContentMismatch,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success() {
        assert!(PageStatus::Audited.is_success());
        assert!(!PageStatus::DeadLink.is_success());
        assert!(!PageStatus::Failed.is_success());
    }

    #[test]
    fn test_from_fetch_error() {
        let url = "https://example.com/".to_string();
        assert_eq!(
            PageStatus::from_fetch_error(&FetchError::HttpStatus {
                url: url.clone(),
                status: 404
            }),
            PageStatus::DeadLink
        );
        assert_eq!(
            PageStatus::from_fetch_error(&FetchError::Timeout {
                url: url.clone(),
                timeout_ms: 15_000
            }),
            PageStatus::TimedOut
        );
        assert_eq!(
            PageStatus::from_fetch_error(&FetchError::SessionUnavailable {
                url,
                message: "closed".to_string()
            }),
            PageStatus::Failed
        );
    }

    #[test]
    fn test_roundtrip_db_string() {
        for state in PageStatus::all_states() {
            assert_eq!(PageStatus::from_db_string(state.to_db_string()), Some(state));
        }
        assert_eq!(PageStatus::from_db_string("processed"), None);
    }
}
