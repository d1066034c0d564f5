use std::collections::{BTreeSet, HashSet};
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::{AxisKey, Outcome, OutcomeCode, OutcomeQuery};
use crate::workflows::prequal::classifier::EmploymentTypeCode;
use crate::workflows::prequal::credit::CreditBracket;
use crate::workflows::prequal::errors::DomainError;
use crate::workflows::prequal::variant::{OutcomeAxis, WorkflowVariant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub employment_type_code: EmploymentTypeCode,
    pub axis_key: AxisKey,
    pub outcome_code: OutcomeCode,
}

/// Validated outcome lookup for one variant.
#[derive(Debug, Clone)]
pub struct OutcomeTable {
    variant: WorkflowVariant,
    axis: OutcomeAxis,
    range: RangeInclusive<u32>,
    codes: Vec<EmploymentTypeCode>,
    entries: Vec<OutcomeEntry>,
}

impl OutcomeTable {
    /// Keys every employment code must cover for `axis`, in authoring order.
    /// Auto-qualify brackets never appear; the credit-only axis folds the
    /// sub-660 brackets into one key.
    pub fn keys_for(axis: OutcomeAxis) -> Vec<AxisKey> {
        match axis {
            OutcomeAxis::None => Vec::new(),
            OutcomeAxis::CreditAndDeposit => CreditBracket::ALL
                .into_iter()
                .filter(|bracket| !bracket.is_auto_qualify())
                .flat_map(|credit| {
                    [true, false]
                        .into_iter()
                        .map(move |deposit| AxisKey::CreditDeposit { credit, deposit })
                })
                .collect(),
            OutcomeAxis::CreditOnly => {
                let mut seen = BTreeSet::new();
                CreditBracket::ALL
                    .into_iter()
                    .filter(|bracket| !bracket.is_auto_qualify())
                    .map(CreditBracket::credit_only_key)
                    .filter(|bracket| seen.insert(*bracket))
                    .map(|credit| AxisKey::Credit { credit })
                    .collect()
            }
        }
    }

    /// Validate `entries` against the employment codes the variant classifies
    /// into. Rejects gaps, duplicates, authored auto-qualify keys, stray keys
    /// and reused outcome codes.
    pub fn from_entries(
        variant: WorkflowVariant,
        range: RangeInclusive<u32>,
        codes: Vec<EmploymentTypeCode>,
        entries: Vec<OutcomeEntry>,
    ) -> Result<Self, DomainError> {
        let axis = variant.outcome_axis();
        if axis == OutcomeAxis::None {
            return Err(DomainError::NoOutcomeAxis { variant });
        }

        let keys = Self::keys_for(axis);
        let known_codes: HashSet<&EmploymentTypeCode> = codes.iter().collect();
        let mut seen_keys = HashSet::new();
        let mut seen_outcomes = HashSet::new();

        for entry in &entries {
            let credit = entry.axis_key.credit();
            if credit.is_auto_qualify() {
                return Err(DomainError::AuthoredAutoQualifyEntry {
                    variant,
                    code: entry.employment_type_code.to_string(),
                    bracket: credit,
                });
            }
            if !keys.contains(&entry.axis_key)
                || !known_codes.contains(&entry.employment_type_code)
            {
                return Err(DomainError::UnexpectedOutcomeKey {
                    variant,
                    code: entry.employment_type_code.to_string(),
                    key: entry.axis_key.to_string(),
                });
            }
            if !seen_keys.insert((&entry.employment_type_code, entry.axis_key)) {
                return Err(DomainError::AmbiguousOutcome {
                    variant,
                    code: entry.employment_type_code.to_string(),
                    key: entry.axis_key.to_string(),
                    matches: 2,
                });
            }
            if !seen_outcomes.insert(&entry.outcome_code) {
                return Err(DomainError::DuplicateOutcomeCode {
                    variant,
                    outcome: entry.outcome_code.to_string(),
                });
            }
        }

        let expected = codes.len() * keys.len();
        if seen_keys.len() != expected {
            return Err(DomainError::IncompleteOutcomeTable {
                variant,
                expected,
                found: seen_keys.len(),
            });
        }

        Ok(Self {
            variant,
            axis,
            range,
            codes,
            entries,
        })
    }

    /// Skips validation so lookup behaviour on malformed tables can be tested.
    #[cfg(test)]
    pub(crate) fn unchecked(variant: WorkflowVariant, entries: Vec<OutcomeEntry>) -> Self {
        Self {
            variant,
            axis: variant.outcome_axis(),
            range: 0..=0,
            codes: Vec::new(),
            entries,
        }
    }

    pub fn variant(&self) -> WorkflowVariant {
        self.variant
    }

    pub fn axis(&self) -> OutcomeAxis {
        self.axis
    }

    /// Numeric range the codes were authored in. Informational only.
    pub fn range(&self) -> &RangeInclusive<u32> {
        &self.range
    }

    pub fn employment_codes(&self) -> &[EmploymentTypeCode] {
        &self.codes
    }

    pub fn entries(&self) -> &[OutcomeEntry] {
        &self.entries
    }

    /// Outcomes authored for one employment code, in key order.
    pub fn outcomes_for(&self, code: &EmploymentTypeCode) -> Vec<&OutcomeCode> {
        self.entries
            .iter()
            .filter(|entry| &entry.employment_type_code == code)
            .map(|entry| &entry.outcome_code)
            .collect()
    }

    pub fn resolve(
        &self,
        code: &EmploymentTypeCode,
        query: OutcomeQuery,
    ) -> Result<Outcome, DomainError> {
        if query.credit.is_auto_qualify() {
            return Ok(Outcome::AutoQualify);
        }

        let key = match self.axis {
            OutcomeAxis::None => {
                return Err(DomainError::NoOutcomeAxis {
                    variant: self.variant,
                })
            }
            OutcomeAxis::CreditAndDeposit => AxisKey::CreditDeposit {
                credit: query.credit,
                deposit: query.deposit.ok_or(DomainError::MissingAnswer {
                    field: "can_provide_extra_deposit",
                })?,
            },
            OutcomeAxis::CreditOnly => AxisKey::Credit {
                credit: query.credit.credit_only_key(),
            },
        };

        let matches: Vec<&OutcomeEntry> = self
            .entries
            .iter()
            .filter(|entry| &entry.employment_type_code == code && entry.axis_key == key)
            .collect();

        match matches.as_slice() {
            [single] => Ok(Outcome::Code(single.outcome_code.clone())),
            [] => Err(DomainError::MissingOutcome {
                variant: self.variant,
                code: code.to_string(),
                key: key.to_string(),
            }),
            many => Err(DomainError::AmbiguousOutcome {
                variant: self.variant,
                code: code.to_string(),
                key: key.to_string(),
                matches: many.len(),
            }),
        }
    }
}
