use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::credit::{BracketPartition, CreditBracket};
use super::errors::{AnswerRejection, DomainError, ValidationError};
use super::group::{MemberRole, OccupantId};
use super::steps::StepId;
use super::variant::WorkflowVariant;

/// Employment situations an applicant can select. Declaration order is the
/// canonical order used for table keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Retired,
    Unemployed,
    FullTime,
    PartTime,
    SelfEmployed,
}

impl EmploymentStatus {
    pub const ALL: [EmploymentStatus; 5] = [
        EmploymentStatus::Retired,
        EmploymentStatus::Unemployed,
        EmploymentStatus::FullTime,
        EmploymentStatus::PartTime,
        EmploymentStatus::SelfEmployed,
    ];

    const fn bit(self) -> u8 {
        match self {
            EmploymentStatus::Retired => 1,
            EmploymentStatus::Unemployed => 1 << 1,
            EmploymentStatus::FullTime => 1 << 2,
            EmploymentStatus::PartTime => 1 << 3,
            EmploymentStatus::SelfEmployed => 1 << 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            EmploymentStatus::Retired => "retired",
            EmploymentStatus::Unemployed => "unemployed",
            EmploymentStatus::FullTime => "full_time",
            EmploymentStatus::PartTime => "part_time",
            EmploymentStatus::SelfEmployed => "self_employed",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
    }
}

/// Canonical set of employment statuses. Insertion order never matters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<EmploymentStatus>", into = "Vec<EmploymentStatus>")]
pub struct EmploymentSet(u8);

impl EmploymentSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn with(mut self, status: EmploymentStatus) -> Self {
        self.0 |= status.bit();
        self
    }

    pub fn contains(&self, status: EmploymentStatus) -> bool {
        self.0 & status.bit() != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = EmploymentStatus> + '_ {
        EmploymentStatus::ALL
            .into_iter()
            .filter(move |status| self.contains(*status))
    }

    /// Every non-empty set of at most `max` statuses, in canonical order.
    pub fn all_up_to(max: usize) -> Vec<EmploymentSet> {
        let mut sets: Vec<EmploymentSet> = (1u8..32)
            .map(EmploymentSet)
            .filter(|set| set.len() <= max)
            .collect();
        sets.sort_by_key(|set| (set.len(), set.iter().collect::<Vec<_>>()));
        sets
    }
}

impl FromIterator<EmploymentStatus> for EmploymentSet {
    fn from_iter<T: IntoIterator<Item = EmploymentStatus>>(iter: T) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl From<Vec<EmploymentStatus>> for EmploymentSet {
    fn from(value: Vec<EmploymentStatus>) -> Self {
        value.into_iter().collect()
    }
}

impl From<EmploymentSet> for Vec<EmploymentStatus> {
    fn from(value: EmploymentSet) -> Self {
        value.iter().collect()
    }
}

impl fmt::Display for EmploymentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("{}");
        }
        let labels: Vec<&str> = self.iter().map(EmploymentStatus::label).collect();
        f.write_str(&labels.join("+"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentResponsibility {
    Full,
    Partial,
    None,
}

impl RentResponsibility {
    pub const fn label(self) -> &'static str {
        match self {
            RentResponsibility::Full => "full",
            RentResponsibility::Partial => "partial",
            RentResponsibility::None => "none",
        }
    }

    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "full" => Some(Self::Full),
            "partial" => Some(Self::Partial),
            "none" | "not_responsible" => Some(Self::None),
            _ => None,
        }
    }
}

/// Everything one applicant has answered in a single workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicantAnswers {
    pub employment_statuses: EmploymentSet,
    pub is_student: Option<bool>,
    pub rent_responsibility: Option<RentResponsibility>,
    pub credit_bracket: Option<CreditBracket>,
    pub citizen_or_pr: Option<bool>,
    pub working_with_realtor: Option<bool>,
    pub signed_exclusivity: Option<bool>,
    pub can_provide_extra_deposit: Option<bool>,
    pub represented_occupant_ids: BTreeSet<OccupantId>,
    pub create_group: Option<bool>,
    pub group_role: Option<MemberRole>,
    pub accept_invite: Option<bool>,
    pub leaseholder_invited: Option<bool>,
}

/// Raw answer payload sent by the UI for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    YesNo(bool),
    Responsibility(RentResponsibility),
    CreditBracket(CreditBracket),
    CreditScore(u16),
    Employment(Vec<EmploymentStatus>),
    Occupants(Vec<OccupantId>),
    Role(MemberRole),
}

impl AnswerValue {
    fn kind(&self) -> &'static str {
        match self {
            AnswerValue::YesNo(_) => "yes/no",
            AnswerValue::Responsibility(_) => "rent responsibility",
            AnswerValue::CreditBracket(_) => "credit bracket",
            AnswerValue::CreditScore(_) => "credit score",
            AnswerValue::Employment(_) => "employment statuses",
            AnswerValue::Occupants(_) => "occupant selection",
            AnswerValue::Role(_) => "group role",
        }
    }
}

const MIN_CREDIT_SCORE: u16 = 300;
const MAX_CREDIT_SCORE: u16 = 900;

impl ApplicantAnswers {
    /// Write `value` into the field owned by `step`. Shape mismatches are
    /// validation errors; predicate checks happen afterwards in the step.
    pub(crate) fn apply(
        &mut self,
        step: StepId,
        value: AnswerValue,
        partition: &BracketPartition,
    ) -> Result<(), AnswerRejection> {
        match (step, value) {
            (StepId::CreateGroup, AnswerValue::YesNo(answer)) => self.create_group = Some(answer),
            (StepId::GroupRole, AnswerValue::Role(role)) => self.group_role = Some(role),
            (StepId::AcceptInvite, AnswerValue::YesNo(answer)) => self.accept_invite = Some(answer),
            (StepId::InviteLeaseholder, AnswerValue::YesNo(answer)) => {
                self.leaseholder_invited = Some(answer)
            }
            (StepId::RealtorStatus, AnswerValue::YesNo(answer)) => {
                self.working_with_realtor = Some(answer)
            }
            (StepId::ExclusivityAgreement, AnswerValue::YesNo(answer)) => {
                self.signed_exclusivity = Some(answer)
            }
            (StepId::Citizenship, AnswerValue::YesNo(answer)) => self.citizen_or_pr = Some(answer),
            (StepId::RentResponsibility, AnswerValue::Responsibility(level)) => {
                self.rent_responsibility = Some(level)
            }
            (StepId::RepresentedOccupants, AnswerValue::Occupants(ids)) => {
                self.represented_occupant_ids = ids.into_iter().collect()
            }
            (StepId::EmploymentStatus, AnswerValue::Employment(statuses)) => {
                self.employment_statuses = statuses.into_iter().collect()
            }
            (StepId::StudentStatus, AnswerValue::YesNo(answer)) => self.is_student = Some(answer),
            (StepId::CreditBracket, AnswerValue::CreditBracket(bracket)) => {
                self.credit_bracket = Some(bracket)
            }
            (StepId::CreditBracket, AnswerValue::CreditScore(score)) => {
                if !(MIN_CREDIT_SCORE..=MAX_CREDIT_SCORE).contains(&score) {
                    return Err(ValidationError::new(
                        step,
                        format!(
                            "credit scores range from {MIN_CREDIT_SCORE} to {MAX_CREDIT_SCORE}"
                        ),
                    )
                    .into());
                }
                self.credit_bracket = Some(partition.bracket_for(score)?);
            }
            (StepId::ExtraDeposit, AnswerValue::YesNo(answer)) => {
                self.can_provide_extra_deposit = Some(answer)
            }
            (StepId::Complete, _) => {
                return Err(ValidationError::new(step, "workflow is already complete").into());
            }
            (step, other) => {
                return Err(ValidationError::new(
                    step,
                    format!("{} is not a valid answer for this question", other.kind()),
                )
                .into());
            }
        }

        Ok(())
    }

    /// Reset the field owned by `step` to its unanswered state.
    pub(crate) fn clear(&mut self, step: StepId) {
        match step {
            StepId::CreateGroup => self.create_group = None,
            StepId::GroupRole => self.group_role = None,
            StepId::AcceptInvite => self.accept_invite = None,
            StepId::InviteLeaseholder => self.leaseholder_invited = None,
            StepId::RealtorStatus => self.working_with_realtor = None,
            StepId::ExclusivityAgreement => self.signed_exclusivity = None,
            StepId::Citizenship => self.citizen_or_pr = None,
            StepId::RentResponsibility => self.rent_responsibility = None,
            StepId::RepresentedOccupants => self.represented_occupant_ids.clear(),
            StepId::EmploymentStatus => self.employment_statuses = EmploymentSet::empty(),
            StepId::StudentStatus => self.is_student = None,
            StepId::CreditBracket => self.credit_bracket = None,
            StepId::ExtraDeposit => self.can_provide_extra_deposit = None,
            StepId::Complete => {}
        }
    }

    /// The stated responsibility, or the one `variant` implies when it never
    /// asks.
    pub fn responsibility_for(
        &self,
        variant: WorkflowVariant,
    ) -> Result<RentResponsibility, DomainError> {
        self.rent_responsibility
            .or(variant.implied_responsibility())
            .ok_or(DomainError::MissingAnswer {
                field: "rent_responsibility",
            })
    }

    /// Record the implied responsibility so flags and classification read
    /// the same value. A stated answer is left alone.
    pub fn imply_responsibility(&mut self, variant: WorkflowVariant) {
        if self.rent_responsibility.is_none() {
            self.rent_responsibility = variant.implied_responsibility();
        }
    }

    pub fn require_credit_bracket(&self) -> Result<CreditBracket, DomainError> {
        self.credit_bracket.ok_or(DomainError::MissingAnswer {
            field: "credit_bracket",
        })
    }

    pub fn require_student(&self) -> Result<bool, DomainError> {
        self.is_student.ok_or(DomainError::MissingAnswer {
            field: "is_student",
        })
    }

    pub fn require_yes_no(
        value: Option<bool>,
        field: &'static str,
    ) -> Result<bool, DomainError> {
        value.ok_or(DomainError::MissingAnswer { field })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employment_set_is_order_independent() {
        let a: EmploymentSet = vec![EmploymentStatus::PartTime, EmploymentStatus::Retired].into();
        let b: EmploymentSet = vec![
            EmploymentStatus::Retired,
            EmploymentStatus::PartTime,
            EmploymentStatus::PartTime,
        ]
        .into();

        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.to_string(), "retired+part_time");
    }

    #[test]
    fn employment_set_serializes_as_canonical_list() {
        let set: EmploymentSet =
            vec![EmploymentStatus::SelfEmployed, EmploymentStatus::FullTime].into();
        let json = serde_json::to_value(set).expect("serializes");
        assert_eq!(json, serde_json::json!(["full_time", "self_employed"]));

        let back: EmploymentSet = serde_json::from_value(json).expect("deserializes");
        assert_eq!(back, set);
    }

    #[test]
    fn all_up_to_three_enumerates_twenty_five_sets() {
        let sets = EmploymentSet::all_up_to(3);
        assert_eq!(sets.len(), 25);
        assert_eq!(sets[0].to_string(), "retired");
        assert!(sets.iter().all(|set| !set.is_empty() && set.len() <= 3));
    }

    #[test]
    fn apply_rejects_mismatched_answer_shapes() {
        let mut answers = ApplicantAnswers::default();
        let result = answers.apply(
            StepId::Citizenship,
            AnswerValue::Responsibility(RentResponsibility::Full),
            &BracketPartition::standard(),
        );

        match result {
            Err(AnswerRejection::Invalid(err)) => {
                assert_eq!(err.step, StepId::Citizenship);
                assert!(err.message.contains("rent responsibility"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(answers, ApplicantAnswers::default());
    }

    #[test]
    fn credit_scores_are_mapped_through_the_partition() {
        let mut answers = ApplicantAnswers::default();
        answers
            .apply(
                StepId::CreditBracket,
                AnswerValue::CreditScore(742),
                &BracketPartition::standard(),
            )
            .expect("score accepted");
        assert_eq!(answers.credit_bracket, Some(CreditBracket::VeryGood));

        let result = answers.apply(
            StepId::CreditBracket,
            AnswerValue::CreditScore(120),
            &BracketPartition::standard(),
        );
        assert!(matches!(result, Err(AnswerRejection::Invalid(_))));
    }

    #[test]
    fn clear_resets_owned_field_only() {
        let mut answers = ApplicantAnswers {
            working_with_realtor: Some(true),
            signed_exclusivity: Some(true),
            ..ApplicantAnswers::default()
        };
        answers.clear(StepId::ExclusivityAgreement);
        assert_eq!(answers.signed_exclusivity, None);
        assert_eq!(answers.working_with_realtor, Some(true));
    }
}
