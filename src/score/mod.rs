//! Page scoring
//!
//! The [`Scorer`] evaluates [`RawSignals`] against a fixed rule table and
//! produces one [`AuditCheck`] per applicable rule, in declaration order.
//! Scoring is pure: the same signals always yield identical checks and scores.
//!
//! Scores:
//! - a check scores 100 (pass), 50 (warning) or 0 (fail)
//! - a category scores the mean of its checks, or 0 when it has none
//! - a page scores the mean of all its checks

mod rules;

pub use rules::{rule_names, RULE_COUNT};

use crate::extract::RawSignals;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Check outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

impl CheckStatus {
    /// Score awarded for this outcome
    pub fn score(self) -> u8 {
        match self {
            CheckStatus::Pass => 100,
            CheckStatus::Warning => 50,
            CheckStatus::Fail => 0,
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Warning => "warning",
            CheckStatus::Fail => "fail",
        })
    }
}

/// Check category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CheckCategory {
    Technical,
    #[serde(rename = "On-Page")]
    OnPage,
    Performance,
    Content,
}

impl CheckCategory {
    pub const ALL: [CheckCategory; 4] = [
        CheckCategory::Technical,
        CheckCategory::OnPage,
        CheckCategory::Performance,
        CheckCategory::Content,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CheckCategory::Technical => "Technical",
            CheckCategory::OnPage => "On-Page",
            CheckCategory::Performance => "Performance",
            CheckCategory::Content => "Content",
        }
    }
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much a rule matters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Critical,
    High,
    Medium,
    Low,
}

impl Importance {
    pub fn as_str(self) -> &'static str {
        match self {
            Importance::Critical => "critical",
            Importance::High => "high",
            Importance::Medium => "medium",
            Importance::Low => "low",
        }
    }
}

/// Severity used when counting issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Notice,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
        }
    }
}

/// One evaluated rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditCheck {
    /// Position of the rule in the table (1-based)
    pub id: u32,
    pub name: String,
    pub category: CheckCategory,
    pub status: CheckStatus,
    pub importance: Importance,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl AuditCheck {
    /// Issue severity for a non-passing check
    ///
    /// Failures are errors. Warnings on critical/high rules are warnings;
    /// warnings on medium/low rules are notices.
    pub fn severity(&self) -> Option<Severity> {
        match (self.status, self.importance) {
            (CheckStatus::Pass, _) => None,
            (CheckStatus::Fail, _) => Some(Severity::Error),
            (CheckStatus::Warning, Importance::Critical | Importance::High) => {
                Some(Severity::Warning)
            }
            (CheckStatus::Warning, _) => Some(Severity::Notice),
        }
    }
}

/// Mean score per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScores {
    #[serde(rename = "Technical")]
    pub technical: u8,
    #[serde(rename = "On-Page")]
    pub on_page: u8,
    #[serde(rename = "Performance")]
    pub performance: u8,
    #[serde(rename = "Content")]
    pub content: u8,
}

impl CategoryScores {
    pub fn get(&self, category: CheckCategory) -> u8 {
        match category {
            CheckCategory::Technical => self.technical,
            CheckCategory::OnPage => self.on_page,
            CheckCategory::Performance => self.performance,
            CheckCategory::Content => self.content,
        }
    }

    fn set(&mut self, category: CheckCategory, score: u8) {
        match category {
            CheckCategory::Technical => self.technical = score,
            CheckCategory::OnPage => self.on_page = score,
            CheckCategory::Performance => self.performance = score,
            CheckCategory::Content => self.content = score,
        }
    }

    /// Mean of several category score sets, per category (0 when empty)
    pub fn mean_of<'a, I>(scores: I) -> Self
    where
        I: IntoIterator<Item = &'a CategoryScores>,
    {
        let all: Vec<&CategoryScores> = scores.into_iter().collect();
        let mut result = CategoryScores::default();
        for category in CheckCategory::ALL {
            result.set(category, mean(all.iter().map(|s| s.get(category))));
        }
        result
    }
}

/// The scored form of one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageScore {
    pub checks: Vec<AuditCheck>,
    pub category_scores: CategoryScores,
    pub overall: u8,
}

/// Rounded mean of scores; 0 for an empty input
pub fn mean<I: IntoIterator<Item = u8>>(scores: I) -> u8 {
    let (sum, count) = scores
        .into_iter()
        .fold((0u32, 0u32), |(sum, count), s| (sum + u32::from(s), count + 1));
    if count == 0 {
        0
    } else {
        (f64::from(sum) / f64::from(count)).round() as u8
    }
}

/// Evaluates the rule table
#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer;

impl Scorer {
    pub fn new() -> Self {
        Self
    }

    /// Scores one page's signals
    pub fn score(&self, signals: &RawSignals) -> PageScore {
        let checks = rules::evaluate(signals);
        let category_scores = category_scores(&checks);
        let overall = mean(checks.iter().map(|c| c.score));
        PageScore {
            checks,
            category_scores,
            overall,
        }
    }
}

/// Rolls checks up into per-category means
pub fn category_scores(checks: &[AuditCheck]) -> CategoryScores {
    let mut scores = CategoryScores::default();
    for category in CheckCategory::ALL {
        scores.set(
            category,
            mean(
                checks
                    .iter()
                    .filter(|c| c.category == category)
                    .map(|c| c.score),
            ),
        );
    }
    scores
}
