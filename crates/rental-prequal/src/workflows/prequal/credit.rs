use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Self-reported credit bracket. Labels follow the wording used in the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CreditBracket {
    #[serde(rename = "760-900")]
    Excellent,
    #[serde(rename = "725-760")]
    VeryGood,
    #[serde(rename = "660-725")]
    Good,
    #[serde(rename = "550-660")]
    Fair,
    #[serde(rename = "300-560")]
    Poor,
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "not_in_canada_over_12mo")]
    NotInCanadaOver12mo,
}

impl CreditBracket {
    pub const ALL: [CreditBracket; 7] = [
        CreditBracket::Excellent,
        CreditBracket::VeryGood,
        CreditBracket::Good,
        CreditBracket::Fair,
        CreditBracket::Poor,
        CreditBracket::Unknown,
        CreditBracket::NotInCanadaOver12mo,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            CreditBracket::Excellent => "760-900",
            CreditBracket::VeryGood => "725-760",
            CreditBracket::Good => "660-725",
            CreditBracket::Fair => "550-660",
            CreditBracket::Poor => "300-560",
            CreditBracket::Unknown => "unknown",
            CreditBracket::NotInCanadaOver12mo => "not_in_canada_over_12mo",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|bracket| bracket.label().eq_ignore_ascii_case(trimmed))
    }

    /// Brackets that never need manual review, whatever the employment code.
    pub const fn is_auto_qualify(self) -> bool {
        matches!(self, CreditBracket::VeryGood | CreditBracket::Good)
    }

    /// Key used by credit-only tables: the two sub-660 brackets share one bucket.
    pub const fn credit_only_key(self) -> Self {
        match self {
            CreditBracket::Poor => CreditBracket::Fair,
            other => other,
        }
    }
}

impl fmt::Display for CreditBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Score predicate for a single bracket.
#[derive(Debug, Clone)]
pub struct BracketRange {
    pub bracket: CreditBracket,
    pub scores: RangeInclusive<u16>,
}

/// Maps raw scores onto brackets. Every predicate is evaluated so overlapping
/// ranges surface as an error instead of resolving to whichever comes first.
#[derive(Debug, Clone)]
pub struct BracketPartition {
    ranges: Vec<BracketRange>,
}

impl BracketPartition {
    pub fn standard() -> Self {
        Self::new(vec![
            BracketRange {
                bracket: CreditBracket::Excellent,
                scores: 760..=900,
            },
            BracketRange {
                bracket: CreditBracket::VeryGood,
                scores: 725..=759,
            },
            BracketRange {
                bracket: CreditBracket::Good,
                scores: 660..=724,
            },
            BracketRange {
                bracket: CreditBracket::Fair,
                scores: 550..=659,
            },
            BracketRange {
                bracket: CreditBracket::Poor,
                scores: 300..=549,
            },
        ])
    }

    pub fn new(ranges: Vec<BracketRange>) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &[BracketRange] {
        &self.ranges
    }

    pub fn bracket_for(&self, score: u16) -> Result<CreditBracket, DomainError> {
        let matches: Vec<CreditBracket> = self
            .ranges
            .iter()
            .filter(|range| range.scores.contains(&score))
            .map(|range| range.bracket)
            .collect();

        match matches.as_slice() {
            [single] => Ok(*single),
            [] => Err(DomainError::UnmatchedCreditScore { score }),
            _ => Err(DomainError::AmbiguousCreditScore { score, matches }),
        }
    }
}

impl Default for BracketPartition {
    fn default() -> Self {
        Self::standard()
    }
}
