//! Per-variant question sequences and the run pointer machine that walks them.

mod catalog;
mod machine;

pub use catalog::{steps_for, validate_catalog};
pub use machine::{RunId, StepView, WorkflowRun};

use std::fmt;

use serde::{Deserialize, Serialize};

use super::answers::ApplicantAnswers;
use super::errors::{DomainError, ValidationError};
use super::flags::FlagSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    CreateGroup,
    GroupRole,
    AcceptInvite,
    InviteLeaseholder,
    RealtorStatus,
    ExclusivityAgreement,
    Citizenship,
    RentResponsibility,
    RepresentedOccupants,
    EmploymentStatus,
    StudentStatus,
    CreditBracket,
    ExtraDeposit,
    /// Reserved terminal step.
    Complete,
}

impl StepId {
    pub const fn label(self) -> &'static str {
        match self {
            StepId::CreateGroup => "create_group",
            StepId::GroupRole => "group_role",
            StepId::AcceptInvite => "accept_invite",
            StepId::InviteLeaseholder => "invite_leaseholder",
            StepId::RealtorStatus => "realtor_status",
            StepId::ExclusivityAgreement => "exclusivity_agreement",
            StepId::Citizenship => "citizenship",
            StepId::RentResponsibility => "rent_responsibility",
            StepId::RepresentedOccupants => "represented_occupants",
            StepId::EmploymentStatus => "employment_status",
            StepId::StudentStatus => "student_status",
            StepId::CreditBracket => "credit_bracket",
            StepId::ExtraDeposit => "extra_deposit",
            StepId::Complete => "complete",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, StepId::Complete)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub type Validator = fn(&ApplicantAnswers) -> Result<(), ValidationError>;
pub type Brancher = fn(&ApplicantAnswers, &FlagSet) -> Result<Branch, DomainError>;

/// Successor chosen by a branching step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Continue,
    SkipTo(StepId),
    Complete,
}

#[derive(Clone, Copy)]
pub enum Transition {
    /// Fall through to the next step in the list, or `COMPLETE` at the end.
    Next,
    /// `targets` lists every step `decide` may skip to.
    Branch {
        decide: Brancher,
        targets: &'static [StepId],
    },
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Next => f.write_str("Next"),
            Transition::Branch { targets, .. } => {
                f.debug_struct("Branch").field("targets", targets).finish()
            }
        }
    }
}

#[derive(Clone, Copy)]
pub struct StepDefinition {
    pub id: StepId,
    pub question: &'static str,
    pub validate: Validator,
    pub transition: Transition,
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("id", &self.id)
            .field("question", &self.question)
            .field("transition", &self.transition)
            .finish()
    }
}
