use std::collections::HashSet;

use super::{Branch, StepDefinition, StepId, Transition};
use crate::workflows::prequal::answers::{ApplicantAnswers, RentResponsibility};
use crate::workflows::prequal::classifier::MAX_STATUSES;
use crate::workflows::prequal::errors::{DomainError, ValidationError};
use crate::workflows::prequal::flags::{Flag, FlagSet, RESPONSIBILITY_FLAGS};
use crate::workflows::prequal::variant::WorkflowVariant;

fn present<T>(value: Option<T>, step: StepId, message: &str) -> Result<(), ValidationError> {
    match value {
        Some(_) => Ok(()),
        None => Err(ValidationError::new(step, message)),
    }
}

fn validate_create_group(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    present(
        answers.create_group,
        StepId::CreateGroup,
        "choose whether to create a rental group",
    )
}

fn validate_group_role(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    present(answers.group_role, StepId::GroupRole, "choose your role in the group")
}

fn validate_accept_invite(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    present(
        answers.accept_invite,
        StepId::AcceptInvite,
        "accept or decline the invitation",
    )
}

fn validate_invite_leaseholder(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    present(
        answers.leaseholder_invited,
        StepId::InviteLeaseholder,
        "tell us whether you invited a leaseholder",
    )
}

fn validate_realtor(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    present(
        answers.working_with_realtor,
        StepId::RealtorStatus,
        "tell us whether you work with a realtor",
    )
}

fn validate_exclusivity(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    present(
        answers.signed_exclusivity,
        StepId::ExclusivityAgreement,
        "tell us whether you signed an exclusivity agreement",
    )
}

fn validate_citizenship(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    present(
        answers.citizen_or_pr,
        StepId::Citizenship,
        "tell us whether you are a citizen or permanent resident",
    )
}

fn validate_responsibility(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    present(
        answers.rent_responsibility,
        StepId::RentResponsibility,
        "choose how much of the rent you will cover",
    )
}

fn validate_sole_responsibility(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    validate_responsibility(answers)?;
    if answers.rent_responsibility == Some(RentResponsibility::Partial) {
        return Err(ValidationError::new(
            StepId::RentResponsibility,
            "a sole applicant covers either the full rent or none of it",
        ));
    }
    Ok(())
}

fn represented_count(answers: &ApplicantAnswers) -> usize {
    answers.represented_occupant_ids.len()
}

fn validate_some_represented(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    if represented_count(answers) == 0 {
        return Err(ValidationError::new(
            StepId::RepresentedOccupants,
            "select at least one occupant you answer for",
        ));
    }
    Ok(())
}

fn validate_one_guaranteed(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    if represented_count(answers) != 1 {
        return Err(ValidationError::new(
            StepId::RepresentedOccupants,
            "select the one occupant you are co-signing for",
        ));
    }
    Ok(())
}

fn validate_several_guaranteed(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    if represented_count(answers) < 2 {
        return Err(ValidationError::new(
            StepId::RepresentedOccupants,
            "select every occupant you are co-signing for (two or more)",
        ));
    }
    Ok(())
}

fn validate_employment(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    let count = answers.employment_statuses.len();
    if count == 0 {
        return Err(ValidationError::new(
            StepId::EmploymentStatus,
            "select at least one employment status",
        ));
    }
    if count > MAX_STATUSES {
        return Err(ValidationError::new(
            StepId::EmploymentStatus,
            format!("select at most {MAX_STATUSES} employment statuses"),
        ));
    }
    Ok(())
}

fn validate_student(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    present(
        answers.is_student,
        StepId::StudentStatus,
        "tell us whether you are a student",
    )
}

fn validate_credit(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    present(
        answers.credit_bracket,
        StepId::CreditBracket,
        "choose a credit score range",
    )
}

fn validate_deposit(answers: &ApplicantAnswers) -> Result<(), ValidationError> {
    present(
        answers.can_provide_extra_deposit,
        StepId::ExtraDeposit,
        "tell us whether you can provide an extra deposit",
    )
}

fn branch_on_create_group(answers: &ApplicantAnswers, _: &FlagSet) -> Result<Branch, DomainError> {
    match ApplicantAnswers::require_yes_no(answers.create_group, "create_group")? {
        true => Ok(Branch::Continue),
        false => Ok(Branch::Complete),
    }
}

fn branch_on_realtor(answers: &ApplicantAnswers, _: &FlagSet) -> Result<Branch, DomainError> {
    match ApplicantAnswers::require_yes_no(answers.working_with_realtor, "working_with_realtor")? {
        true => Ok(Branch::Continue),
        false => Ok(Branch::SkipTo(StepId::Citizenship)),
    }
}

fn responsibility_flag(flags: &FlagSet) -> Result<Flag, DomainError> {
    RESPONSIBILITY_FLAGS
        .into_iter()
        .find(|flag| flags.is_set(*flag))
        .ok_or(DomainError::MissingAnswer {
            field: "rent_responsibility",
        })
}

/// Leaseholders who pay nothing hand off to the not-responsible workflow.
fn branch_leaseholder_responsibility(
    _: &ApplicantAnswers,
    flags: &FlagSet,
) -> Result<Branch, DomainError> {
    match responsibility_flag(flags)? {
        Flag::NotResponsible => Ok(Branch::Complete),
        _ => Ok(Branch::Continue),
    }
}

/// Occupants who pay rent convert to co-signers.
fn branch_occupant_responsibility(
    _: &ApplicantAnswers,
    flags: &FlagSet,
) -> Result<Branch, DomainError> {
    match responsibility_flag(flags)? {
        Flag::NotResponsible => Ok(Branch::Continue),
        _ => Ok(Branch::Complete),
    }
}

fn branch_on_credit(answers: &ApplicantAnswers, _: &FlagSet) -> Result<Branch, DomainError> {
    if answers.require_credit_bracket()?.is_auto_qualify() {
        Ok(Branch::Complete)
    } else {
        Ok(Branch::Continue)
    }
}

const CREATE_GROUP: StepDefinition = StepDefinition {
    id: StepId::CreateGroup,
    question: "Would you like to create a rental group?",
    validate: validate_create_group,
    transition: Transition::Branch {
        decide: branch_on_create_group,
        targets: &[],
    },
};

const GROUP_ROLE: StepDefinition = StepDefinition {
    id: StepId::GroupRole,
    question: "What is your role in the group?",
    validate: validate_group_role,
    transition: Transition::Next,
};

const ACCEPT_INVITE: StepDefinition = StepDefinition {
    id: StepId::AcceptInvite,
    question: "You have been invited to a rental group. Do you accept?",
    validate: validate_accept_invite,
    transition: Transition::Next,
};

const INVITE_LEASEHOLDER: StepDefinition = StepDefinition {
    id: StepId::InviteLeaseholder,
    question: "Your group needs someone who can sign the lease. Have you invited one?",
    validate: validate_invite_leaseholder,
    transition: Transition::Next,
};

const REALTOR: StepDefinition = StepDefinition {
    id: StepId::RealtorStatus,
    question: "Are you working with a realtor?",
    validate: validate_realtor,
    transition: Transition::Branch {
        decide: branch_on_realtor,
        targets: &[StepId::Citizenship],
    },
};

const EXCLUSIVITY: StepDefinition = StepDefinition {
    id: StepId::ExclusivityAgreement,
    question: "Have you signed an exclusivity agreement with your realtor?",
    validate: validate_exclusivity,
    transition: Transition::Next,
};

const CITIZENSHIP: StepDefinition = StepDefinition {
    id: StepId::Citizenship,
    question: "Are you a Canadian citizen or permanent resident?",
    validate: validate_citizenship,
    transition: Transition::Next,
};

const LEASEHOLDER_RESPONSIBILITY: StepDefinition = StepDefinition {
    id: StepId::RentResponsibility,
    question: "How much of the rent will you be responsible for?",
    validate: validate_responsibility,
    transition: Transition::Branch {
        decide: branch_leaseholder_responsibility,
        targets: &[],
    },
};

const SOLE_RESPONSIBILITY: StepDefinition = StepDefinition {
    validate: validate_sole_responsibility,
    ..LEASEHOLDER_RESPONSIBILITY
};

const OCCUPANT_RESPONSIBILITY: StepDefinition = StepDefinition {
    id: StepId::RentResponsibility,
    question: "Will you contribute to the rent?",
    validate: validate_responsibility,
    transition: Transition::Branch {
        decide: branch_occupant_responsibility,
        targets: &[],
    },
};

const REPRESENTED_OCCUPANTS: StepDefinition = StepDefinition {
    id: StepId::RepresentedOccupants,
    question: "Which occupants are you answering for?",
    validate: validate_some_represented,
    transition: Transition::Next,
};

const GUARANTEES_ONE: StepDefinition = StepDefinition {
    id: StepId::RepresentedOccupants,
    question: "Which occupant are you co-signing for?",
    validate: validate_one_guaranteed,
    transition: Transition::Next,
};

const GUARANTEES_SEVERAL: StepDefinition = StepDefinition {
    question: "Which occupants are you co-signing for?",
    validate: validate_several_guaranteed,
    ..GUARANTEES_ONE
};

const EMPLOYMENT: StepDefinition = StepDefinition {
    id: StepId::EmploymentStatus,
    question: "What is your current employment status? Select all that apply.",
    validate: validate_employment,
    transition: Transition::Next,
};

const STUDENT: StepDefinition = StepDefinition {
    id: StepId::StudentStatus,
    question: "Are you currently a student?",
    validate: validate_student,
    transition: Transition::Next,
};

const CREDIT_THEN_DEPOSIT: StepDefinition = StepDefinition {
    id: StepId::CreditBracket,
    question: "What is your approximate credit score?",
    validate: validate_credit,
    transition: Transition::Branch {
        decide: branch_on_credit,
        targets: &[],
    },
};

const CREDIT_ONLY: StepDefinition = StepDefinition {
    transition: Transition::Next,
    ..CREDIT_THEN_DEPOSIT
};

const DEPOSIT: StepDefinition = StepDefinition {
    id: StepId::ExtraDeposit,
    question: "Could you provide an additional deposit?",
    validate: validate_deposit,
    transition: Transition::Next,
};

static GC1_STEPS: [StepDefinition; 2] = [CREATE_GROUP, GROUP_ROLE];
static GC5_STEPS: [StepDefinition; 1] = [INVITE_LEASEHOLDER];
static GI1_STEPS: [StepDefinition; 1] = [ACCEPT_INVITE];

static LS1_STEPS: [StepDefinition; 8] = [
    REALTOR,
    EXCLUSIVITY,
    CITIZENSHIP,
    SOLE_RESPONSIBILITY,
    EMPLOYMENT,
    STUDENT,
    CREDIT_THEN_DEPOSIT,
    DEPOSIT,
];
static LS_GROUP_STEPS: [StepDefinition; 8] = [
    REALTOR,
    EXCLUSIVITY,
    CITIZENSHIP,
    LEASEHOLDER_RESPONSIBILITY,
    EMPLOYMENT,
    STUDENT,
    CREDIT_THEN_DEPOSIT,
    DEPOSIT,
];
static LS3_STEPS: [StepDefinition; 9] = [
    REALTOR,
    EXCLUSIVITY,
    CITIZENSHIP,
    LEASEHOLDER_RESPONSIBILITY,
    REPRESENTED_OCCUPANTS,
    EMPLOYMENT,
    STUDENT,
    CREDIT_THEN_DEPOSIT,
    DEPOSIT,
];

static NLS_STEPS: [StepDefinition; 3] = [EMPLOYMENT, STUDENT, CREDIT_ONLY];

static CSG1_STEPS: [StepDefinition; 6] = [
    GUARANTEES_ONE,
    CITIZENSHIP,
    EMPLOYMENT,
    STUDENT,
    CREDIT_THEN_DEPOSIT,
    DEPOSIT,
];
static CSG2_STEPS: [StepDefinition; 6] = [
    GUARANTEES_SEVERAL,
    CITIZENSHIP,
    EMPLOYMENT,
    STUDENT,
    CREDIT_THEN_DEPOSIT,
    DEPOSIT,
];
static CSG3_STEPS: [StepDefinition; 5] =
    [CITIZENSHIP, EMPLOYMENT, STUDENT, CREDIT_THEN_DEPOSIT, DEPOSIT];

static OTH_STEPS: [StepDefinition; 5] = [
    OCCUPANT_RESPONSIBILITY,
    CITIZENSHIP,
    EMPLOYMENT,
    STUDENT,
    CREDIT_ONLY,
];

/// Ordered question list for `variant`.
pub fn steps_for(variant: WorkflowVariant) -> &'static [StepDefinition] {
    match variant {
        WorkflowVariant::Gc1 => &GC1_STEPS,
        WorkflowVariant::Gc5 => &GC5_STEPS,
        WorkflowVariant::Gi1 => &GI1_STEPS,
        WorkflowVariant::Ls1 => &LS1_STEPS,
        WorkflowVariant::Ls2 | WorkflowVariant::Ls4 => &LS_GROUP_STEPS,
        WorkflowVariant::Ls3 => &LS3_STEPS,
        WorkflowVariant::Nls1 | WorkflowVariant::Nls2 | WorkflowVariant::Nls3 => &NLS_STEPS,
        WorkflowVariant::Csg1 => &CSG1_STEPS,
        WorkflowVariant::Csg2 => &CSG2_STEPS,
        WorkflowVariant::Csg3 => &CSG3_STEPS,
        WorkflowVariant::Oth1 | WorkflowVariant::Oth2 | WorkflowVariant::Oth3 => &OTH_STEPS,
    }
}

/// Check every variant's list once at startup: non-empty, unique ids, no
/// reserved terminal id, and skip targets that point forward.
pub fn validate_catalog() -> Result<(), DomainError> {
    for variant in WorkflowVariant::ALL {
        let steps = steps_for(variant);
        let invalid = |detail: String| DomainError::InvalidStepCatalog { variant, detail };

        if steps.is_empty() {
            return Err(invalid("no steps defined".to_string()));
        }

        let mut seen = HashSet::new();
        for step in steps {
            if step.id.is_terminal() {
                return Err(invalid("lists the reserved complete step".to_string()));
            }
            if !seen.insert(step.id) {
                return Err(invalid(format!("step {} appears twice", step.id)));
            }
        }

        for (index, step) in steps.iter().enumerate() {
            if let Transition::Branch { targets, .. } = step.transition {
                for target in targets {
                    let later = steps[index + 1..].iter().any(|later| later.id == *target);
                    if !later {
                        return Err(invalid(format!(
                            "step {} skips to {target}, which is not a later step",
                            step.id
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}
