/// Lifecycle of one crawl
///
/// `Pending -> Crawling -> {Completed | Failed}`. Interior page failures never
/// move a crawl to `Failed`; only an unrecoverable condition does.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// Created but not started
    Pending,

    /// Frontier is being drained
    Crawling,

    /// Frontier emptied or the page limit was reached
    Completed,

    /// Seed unreachable or nothing could be audited
    Failed,
}

impl AuditStatus {
    /// Returns true once no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(&self, next: AuditStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Crawling)
                | (Self::Pending, Self::Failed)
                | (Self::Crawling, Self::Completed)
                | (Self::Crawling, Self::Failed)
        )
    }

    /// Moves to `next`, rejecting illegal transitions
    ///
    /// # Returns
    ///
    /// * `Ok(next)` - The transition is allowed
    /// * `Err(LensError::InvalidTransition)` - It is not
    pub fn transition(self, next: AuditStatus) -> crate::Result<AuditStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(crate::LensError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Crawling => "crawling",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "crawling" => Some(Self::Crawling),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(AuditStatus::Pending.can_transition_to(AuditStatus::Crawling));
        assert!(AuditStatus::Crawling.can_transition_to(AuditStatus::Completed));
        assert!(AuditStatus::Crawling.can_transition_to(AuditStatus::Failed));
        assert!(AuditStatus::Pending.can_transition_to(AuditStatus::Failed));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!AuditStatus::Completed.can_transition_to(AuditStatus::Crawling));
        assert!(!AuditStatus::Failed.can_transition_to(AuditStatus::Completed));
        assert!(!AuditStatus::Pending.can_transition_to(AuditStatus::Completed));

        let err = AuditStatus::Completed
            .transition(AuditStatus::Pending)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid state transition: completed -> pending"
        );
    }

    #[test]
    fn test_is_terminal() {
        assert!(!AuditStatus::Pending.is_terminal());
        assert!(!AuditStatus::Crawling.is_terminal());
        assert!(AuditStatus::Completed.is_terminal());
        assert!(AuditStatus::Failed.is_terminal());
    }

    #[test]
    fn test_db_string() {
        assert_eq!(AuditStatus::Crawling.to_db_string(), "crawling");
        assert_eq!(
            AuditStatus::from_db_string("completed"),
            Some(AuditStatus::Completed)
        );
        assert_eq!(AuditStatus::from_db_string("done"), None);
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AuditStatus::Failed).unwrap(),
            "\"failed\""
        );
    }
}
