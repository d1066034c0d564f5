use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::answers::{EmploymentSet, EmploymentStatus, RentResponsibility};
use super::errors::DomainError;
use super::variant::{VariantFamily, WorkflowVariant};

/// Largest number of simultaneous statuses the tables define.
pub const MAX_STATUSES: usize = 3;

/// Which rent obligation an applicant carries for classification purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsibilityClass {
    Responsible,
    Guarantor,
    NotResponsible,
}

impl ResponsibilityClass {
    pub const ALL: [ResponsibilityClass; 3] = [
        ResponsibilityClass::Responsible,
        ResponsibilityClass::Guarantor,
        ResponsibilityClass::NotResponsible,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ResponsibilityClass::Responsible => "responsible",
            ResponsibilityClass::Guarantor => "guarantor",
            ResponsibilityClass::NotResponsible => "not_responsible",
        }
    }

    const fn family_prefix(self, is_student: bool) -> &'static str {
        match (self, is_student) {
            (ResponsibilityClass::Responsible, true) => "RS",
            (ResponsibilityClass::Responsible, false) => "RN",
            (ResponsibilityClass::Guarantor, true) => "GS",
            (ResponsibilityClass::Guarantor, false) => "GN",
            (ResponsibilityClass::NotResponsible, true) => "NS",
            (ResponsibilityClass::NotResponsible, false) => "NN",
        }
    }

    /// Class a variant classifies under, given the answered responsibility.
    /// Mismatches mean the run should have handed off or converted instead.
    pub fn for_variant(
        variant: WorkflowVariant,
        responsibility: RentResponsibility,
    ) -> Result<Self, DomainError> {
        let class = match (variant.family(), responsibility) {
            (VariantFamily::GroupIntake, _) => {
                return Err(DomainError::NoOutcomeAxis { variant });
            }
            (VariantFamily::CoSigner, _) => ResponsibilityClass::Guarantor,
            (
                VariantFamily::Leaseholder,
                RentResponsibility::Full | RentResponsibility::Partial,
            ) => ResponsibilityClass::Responsible,
            (VariantFamily::Leaseholder, RentResponsibility::None) => {
                return Err(DomainError::ResponsibilityMismatch {
                    variant,
                    class: ResponsibilityClass::NotResponsible,
                });
            }
            (
                VariantFamily::NotResponsibleLeaseholder | VariantFamily::OtherOccupant,
                RentResponsibility::None,
            ) => ResponsibilityClass::NotResponsible,
            (
                VariantFamily::NotResponsibleLeaseholder | VariantFamily::OtherOccupant,
                RentResponsibility::Full | RentResponsibility::Partial,
            ) => {
                return Err(DomainError::ResponsibilityMismatch {
                    variant,
                    class: ResponsibilityClass::Responsible,
                });
            }
        };
        Ok(class)
    }
}

impl fmt::Display for ResponsibilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical identifier for one applicant's employment combination within a
/// classification family. Opaque to callers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmploymentTypeCode(String);

impl EmploymentTypeCode {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmploymentTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationContext {
    pub is_student: bool,
    pub responsibility_class: ResponsibilityClass,
}

use EmploymentStatus::{FullTime, PartTime, Retired, SelfEmployed, Unemployed};

/// Slot assignments shared by every family. A family's code is its prefix plus
/// the slot, e.g. `NS-01` for a retired, not responsible student.
const EMPLOYMENT_SLOTS: [(u8, &[EmploymentStatus]); 25] = [
    (1, &[Retired]),
    (2, &[Unemployed]),
    (3, &[FullTime]),
    (4, &[PartTime]),
    (5, &[SelfEmployed]),
    (6, &[Retired, Unemployed]),
    (7, &[Retired, FullTime]),
    (8, &[Retired, PartTime]),
    (9, &[Retired, SelfEmployed]),
    (10, &[Unemployed, FullTime]),
    (11, &[Unemployed, PartTime]),
    (12, &[Unemployed, SelfEmployed]),
    (13, &[FullTime, PartTime]),
    (14, &[FullTime, SelfEmployed]),
    (15, &[PartTime, SelfEmployed]),
    (16, &[Retired, Unemployed, FullTime]),
    (17, &[Retired, Unemployed, PartTime]),
    (18, &[Retired, Unemployed, SelfEmployed]),
    (19, &[Retired, FullTime, PartTime]),
    (20, &[Retired, FullTime, SelfEmployed]),
    (21, &[Retired, PartTime, SelfEmployed]),
    (22, &[Unemployed, FullTime, PartTime]),
    (23, &[Unemployed, FullTime, SelfEmployed]),
    (24, &[Unemployed, PartTime, SelfEmployed]),
    (25, &[FullTime, PartTime, SelfEmployed]),
];

/// One row of a family table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmploymentCodeEntry {
    pub code: EmploymentTypeCode,
    pub statuses: EmploymentSet,
    pub is_student: bool,
    pub responsibility_class: ResponsibilityClass,
}

#[derive(Debug)]
struct FamilyTable {
    entries: BTreeMap<EmploymentSet, EmploymentCodeEntry>,
}

/// Exact-match lookup over the six (class × student) family tables.
#[derive(Debug)]
pub struct EmploymentClassifier {
    families: BTreeMap<(ResponsibilityClass, bool), FamilyTable>,
}

impl EmploymentClassifier {
    /// Build and validate the standard tables.
    pub fn standard() -> Result<Self, DomainError> {
        let expected = EmploymentSet::all_up_to(MAX_STATUSES).len();
        let mut families = BTreeMap::new();
        let mut seen_codes = HashSet::new();

        for class in ResponsibilityClass::ALL {
            for is_student in [true, false] {
                let prefix = class.family_prefix(is_student);
                let mut entries = BTreeMap::new();

                for (slot, statuses) in EMPLOYMENT_SLOTS {
                    let key: EmploymentSet = statuses.iter().copied().collect();
                    let code = EmploymentTypeCode(format!("{prefix}-{slot:02}"));
                    if !seen_codes.insert(code.clone()) {
                        return Err(DomainError::DuplicateEmploymentCode { code: code.0 });
                    }

                    let entry = EmploymentCodeEntry {
                        code,
                        statuses: key,
                        is_student,
                        responsibility_class: class,
                    };
                    if entries.insert(key, entry).is_some() {
                        return Err(DomainError::DuplicateEmploymentEntry {
                            family: prefix,
                            statuses: key,
                        });
                    }
                }

                let in_domain = entries
                    .keys()
                    .filter(|set| !set.is_empty() && set.len() <= MAX_STATUSES)
                    .count();
                if in_domain != expected || entries.len() != expected {
                    return Err(DomainError::IncompleteEmploymentTable {
                        family: prefix,
                        expected,
                        found: in_domain,
                    });
                }

                families.insert((class, is_student), FamilyTable { entries });
            }
        }

        Ok(Self { families })
    }

    /// Process-wide validated tables, built on first use.
    pub fn shared() -> Result<&'static Self, DomainError> {
        static SHARED: OnceLock<Result<EmploymentClassifier, DomainError>> = OnceLock::new();
        SHARED
            .get_or_init(EmploymentClassifier::standard)
            .as_ref()
            .map_err(|err| err.clone())
    }

    pub fn classify(
        &self,
        statuses: EmploymentSet,
        context: ClassificationContext,
    ) -> Result<EmploymentTypeCode, DomainError> {
        if statuses.is_empty() {
            return Err(DomainError::EmptyEmployment);
        }
        if statuses.len() > MAX_STATUSES {
            return Err(DomainError::TooManyStatuses {
                count: statuses.len(),
            });
        }

        self.families
            .get(&(context.responsibility_class, context.is_student))
            .and_then(|family| family.entries.get(&statuses))
            .map(|entry| entry.code.clone())
            .ok_or(DomainError::UnrecognizedEmployment {
                statuses,
                is_student: context.is_student,
                class: context.responsibility_class,
            })
    }

    /// Codes in one family, in slot order.
    pub fn codes_for(
        &self,
        class: ResponsibilityClass,
        is_student: bool,
    ) -> Vec<EmploymentTypeCode> {
        let mut entries: Vec<&EmploymentCodeEntry> = self
            .families
            .get(&(class, is_student))
            .map(|family| family.entries.values().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.code.cmp(&b.code));
        entries.into_iter().map(|entry| entry.code.clone()).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &EmploymentCodeEntry> {
        self.families
            .values()
            .flat_map(|family| family.entries.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(is_student: bool, class: ResponsibilityClass) -> ClassificationContext {
        ClassificationContext {
            is_student,
            responsibility_class: class,
        }
    }

    #[test]
    fn retired_student_not_responsible_has_fixed_code() {
        let classifier = EmploymentClassifier::standard().expect("tables valid");
        let code = classifier
            .classify(
                EmploymentSet::empty().with(Retired),
                context(true, ResponsibilityClass::NotResponsible),
            )
            .expect("classifies");
        assert_eq!(code.as_str(), "NS-01");
    }

    #[test]
    fn same_statuses_differ_across_families() {
        let classifier = EmploymentClassifier::standard().expect("tables valid");
        let statuses: EmploymentSet = vec![FullTime, PartTime].into();

        let mut codes = HashSet::new();
        for class in ResponsibilityClass::ALL {
            for is_student in [true, false] {
                let code = classifier
                    .classify(statuses, context(is_student, class))
                    .expect("classifies");
                assert!(codes.insert(code));
            }
        }
        assert_eq!(codes.len(), 6);
    }

    #[test]
    fn four_statuses_are_outside_the_domain() {
        let classifier = EmploymentClassifier::standard().expect("tables valid");
        let statuses: EmploymentSet = vec![Retired, FullTime, PartTime, SelfEmployed].into();

        let err = classifier
            .classify(statuses, context(false, ResponsibilityClass::Responsible))
            .expect_err("domain error");
        assert_eq!(err, DomainError::TooManyStatuses { count: 4 });
    }

    #[test]
    fn empty_set_is_rejected() {
        let classifier = EmploymentClassifier::standard().expect("tables valid");
        assert_eq!(
            classifier.classify(
                EmploymentSet::empty(),
                context(false, ResponsibilityClass::Guarantor)
            ),
            Err(DomainError::EmptyEmployment)
        );
    }

    #[test]
    fn responsibility_class_follows_variant_family() {
        assert_eq!(
            ResponsibilityClass::for_variant(WorkflowVariant::Csg1, RentResponsibility::None),
            Ok(ResponsibilityClass::Guarantor)
        );
        assert_eq!(
            ResponsibilityClass::for_variant(WorkflowVariant::Ls2, RentResponsibility::Partial),
            Ok(ResponsibilityClass::Responsible)
        );
        assert!(matches!(
            ResponsibilityClass::for_variant(WorkflowVariant::Ls1, RentResponsibility::None),
            Err(DomainError::ResponsibilityMismatch { .. })
        ));
        assert!(matches!(
            ResponsibilityClass::for_variant(WorkflowVariant::Gc1, RentResponsibility::Full),
            Err(DomainError::NoOutcomeAxis { .. })
        ));
    }

    #[test]
    fn shared_tables_are_reused() {
        let first = EmploymentClassifier::shared().expect("tables valid");
        let second = EmploymentClassifier::shared().expect("tables valid");
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.entries().count(), 150);
    }
}
