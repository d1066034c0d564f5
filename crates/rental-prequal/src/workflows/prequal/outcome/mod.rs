//! Outcome tables: per-variant lookups from (employment code × credit axis) to
//! an opaque outcome code, guarded by the cross-cutting auto-qualify rule.

mod catalog;
mod table;

pub(crate) use catalog::employment_codes_for;
pub use catalog::{OutcomeCatalog, TableLayout, STANDARD_LAYOUTS};
pub use table::{OutcomeEntry, OutcomeTable};

use std::fmt;

use serde::{Deserialize, Serialize};

use super::credit::CreditBracket;

/// Sentinel emitted when no flag or manual review is needed.
pub const AUTO_QUALIFY: &str = "AUTO_QUALIFY";

/// Opaque result identifier. Never parsed or compared numerically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeCode(String);

impl OutcomeCode {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Outcome {
    AutoQualify,
    Code(OutcomeCode),
}

impl Outcome {
    pub fn is_auto_qualify(&self) -> bool {
        matches!(self, Outcome::AutoQualify)
    }

    pub fn code(&self) -> Option<&OutcomeCode> {
        match self {
            Outcome::AutoQualify => None,
            Outcome::Code(code) => Some(code),
        }
    }
}

impl From<String> for Outcome {
    fn from(value: String) -> Self {
        if value == AUTO_QUALIFY {
            Outcome::AutoQualify
        } else {
            Outcome::Code(OutcomeCode(value))
        }
    }
}

impl From<Outcome> for String {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::AutoQualify => AUTO_QUALIFY.to_string(),
            Outcome::Code(code) => code.0,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::AutoQualify => f.write_str(AUTO_QUALIFY),
            Outcome::Code(code) => write!(f, "{code}"),
        }
    }
}

/// Second coordinate of an outcome entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "axis", rename_all = "snake_case")]
pub enum AxisKey {
    Credit {
        credit: CreditBracket,
    },
    CreditDeposit {
        credit: CreditBracket,
        deposit: bool,
    },
}

impl AxisKey {
    pub const fn credit(self) -> CreditBracket {
        match self {
            AxisKey::Credit { credit } | AxisKey::CreditDeposit { credit, .. } => credit,
        }
    }
}

impl fmt::Display for AxisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisKey::Credit { credit } => write!(f, "{credit}"),
            AxisKey::CreditDeposit { credit, deposit } => {
                let deposit = if *deposit { "yes" } else { "no" };
                write!(f, "{credit}/deposit={deposit}")
            }
        }
    }
}

/// Answers an outcome lookup reads. `deposit` is `None` when the deposit step
/// was never presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeQuery {
    pub credit: CreditBracket,
    pub deposit: Option<bool>,
}

impl OutcomeQuery {
    pub fn credit(credit: CreditBracket) -> Self {
        Self {
            credit,
            deposit: None,
        }
    }

    pub fn with_deposit(credit: CreditBracket, deposit: bool) -> Self {
        Self {
            credit,
            deposit: Some(deposit),
        }
    }
}
