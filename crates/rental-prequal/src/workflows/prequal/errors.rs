use super::answers::EmploymentSet;
use super::classifier::ResponsibilityClass;
use super::credit::CreditBracket;
use super::steps::StepId;
use super::variant::WorkflowVariant;

/// The current step's answer failed its predicate. Recoverable: the run stays
/// on the step and the message is rendered inline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{step}: {message}")]
pub struct ValidationError {
    pub step: StepId,
    pub message: String,
}

impl ValidationError {
    pub fn new(step: StepId, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }
}

/// A classification, outcome or transition table has no single entry for an
/// otherwise valid combination. Never defaulted; always surfaced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("employment status set is empty")]
    EmptyEmployment,
    #[error("employment combination outside the defined domain ({count} statuses, at most 3)")]
    TooManyStatuses { count: usize },
    #[error(
        "unrecognized employment combination: statuses={statuses} student={is_student} class={class}"
    )]
    UnrecognizedEmployment {
        statuses: EmploymentSet,
        is_student: bool,
        class: ResponsibilityClass,
    },
    #[error("employment table {family} lists {statuses} more than once")]
    DuplicateEmploymentEntry {
        family: &'static str,
        statuses: EmploymentSet,
    },
    #[error("employment table {family} has {found} entries, expected {expected}")]
    IncompleteEmploymentTable {
        family: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("employment code {code} is assigned twice")]
    DuplicateEmploymentCode { code: String },
    #[error("{variant} has no outcome axis")]
    NoOutcomeAxis { variant: WorkflowVariant },
    #[error("{variant} cannot classify a {class} applicant")]
    ResponsibilityMismatch {
        variant: WorkflowVariant,
        class: ResponsibilityClass,
    },
    #[error("{variant} has no outcome for employment code {code} at {key}")]
    MissingOutcome {
        variant: WorkflowVariant,
        code: String,
        key: String,
    },
    #[error("{variant} has {matches} outcomes for employment code {code} at {key}")]
    AmbiguousOutcome {
        variant: WorkflowVariant,
        code: String,
        key: String,
        matches: usize,
    },
    #[error("{variant} authors an entry for auto-qualify bracket {bracket} (code {code})")]
    AuthoredAutoQualifyEntry {
        variant: WorkflowVariant,
        code: String,
        bracket: CreditBracket,
    },
    #[error("{variant} reuses outcome code {outcome}")]
    DuplicateOutcomeCode {
        variant: WorkflowVariant,
        outcome: String,
    },
    #[error("{variant} outcome table has an entry for {code} at unexpected key {key}")]
    UnexpectedOutcomeKey {
        variant: WorkflowVariant,
        code: String,
        key: String,
    },
    #[error("{variant} outcome table covers {found} entries, expected {expected}")]
    IncompleteOutcomeTable {
        variant: WorkflowVariant,
        expected: usize,
        found: usize,
    },
    #[error("credit score {score} matches no bracket")]
    UnmatchedCreditScore { score: u16 },
    #[error("credit score {score} matches several brackets: {matches:?}")]
    AmbiguousCreditScore {
        score: u16,
        matches: Vec<CreditBracket>,
    },
    #[error("required answer `{field}` is missing")]
    MissingAnswer { field: &'static str },
    #[error("{variant} step {step} has no successor for the current answer")]
    UndefinedTransition {
        variant: WorkflowVariant,
        step: StepId,
    },
    #[error("{variant} step catalog is invalid: {detail}")]
    InvalidStepCatalog {
        variant: WorkflowVariant,
        detail: String,
    },
}

/// A group or flag state violates a routing invariant. Each variant names the
/// workflow that remediates it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingPreconditionError {
    #[error("group {group_id} has no leaseholder-eligible member")]
    NoLeaseholder { group_id: String },
    #[error("invitation cannot be matched to a member of the group")]
    UnknownInvitee,
}

impl RoutingPreconditionError {
    pub const fn remediation(&self) -> WorkflowVariant {
        match self {
            RoutingPreconditionError::NoLeaseholder { .. } => WorkflowVariant::Gc5,
            RoutingPreconditionError::UnknownInvitee => WorkflowVariant::Gc1,
        }
    }
}

/// Why an answer event was not committed.
#[derive(Debug)]
pub(crate) enum AnswerRejection {
    Invalid(ValidationError),
    Domain(DomainError),
}

impl From<ValidationError> for AnswerRejection {
    fn from(value: ValidationError) -> Self {
        Self::Invalid(value)
    }
}

impl From<DomainError> for AnswerRejection {
    fn from(value: DomainError) -> Self {
        Self::Domain(value)
    }
}
