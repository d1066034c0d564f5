use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::answers::{ApplicantAnswers, RentResponsibility};
use super::errors::RoutingPreconditionError;
use super::flags::{Flag, FlagSet, ROLE_FLAGS};
use super::group::{GroupContext, MemberRole, OccupantId};
use super::variant::{VariantFamily, WorkflowVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "variant", rename_all = "snake_case")]
pub enum RouteDecision {
    Next(WorkflowVariant),
    /// Stay on the current screen.
    Terminate,
}

/// The subset of a finished run handed to the next variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarriedState {
    pub citizen_or_pr: Option<bool>,
    pub working_with_realtor: Option<bool>,
    pub signed_exclusivity: Option<bool>,
    pub rent_responsibility: Option<RentResponsibility>,
    #[serde(default)]
    pub represented_occupant_ids: BTreeSet<OccupantId>,
    #[serde(default)]
    pub flags: FlagSet,
}

impl CarriedState {
    /// Only role and transition flags travel; everything else is re-derived
    /// from the carried answers.
    pub fn capture(
        answers: &ApplicantAnswers,
        flags: &FlagSet,
        transition: Option<Flag>,
    ) -> Self {
        let mut carried: FlagSet = flags
            .iter()
            .filter(|flag| flag.is_transition_flag() || ROLE_FLAGS.contains(flag))
            .collect();
        if let Some(flag) = transition {
            carried.set(flag);
        }

        Self {
            citizen_or_pr: answers.citizen_or_pr,
            working_with_realtor: answers.working_with_realtor,
            signed_exclusivity: answers.signed_exclusivity,
            rent_responsibility: answers.rent_responsibility,
            represented_occupant_ids: answers.represented_occupant_ids.clone(),
            flags: carried,
        }
    }

    /// Initial answers for a run started from this state.
    pub fn seed_answers(&self) -> ApplicantAnswers {
        ApplicantAnswers {
            citizen_or_pr: self.citizen_or_pr,
            working_with_realtor: self.working_with_realtor,
            signed_exclusivity: self.signed_exclusivity,
            rent_responsibility: self.rent_responsibility,
            represented_occupant_ids: self.represented_occupant_ids.clone(),
            ..ApplicantAnswers::default()
        }
    }
}

/// Flag the router raises when moving between two variants, if any.
pub fn transition_flag(from: WorkflowVariant, to: WorkflowVariant) -> Option<Flag> {
    match (from.family(), to.family()) {
        (VariantFamily::Leaseholder, VariantFamily::NotResponsibleLeaseholder) => {
            Some(Flag::ResponsibilityHandoff)
        }
        (VariantFamily::OtherOccupant, VariantFamily::CoSigner) => {
            Some(Flag::UserTypeChangedOthToCsg)
        }
        _ => None,
    }
}

/// Decide what follows a completed `current` run. Reads only the flags and the
/// group; every decision that starts a variant other than the remediation one
/// requires a leaseholder-eligible member when a group exists.
pub fn route(
    current: WorkflowVariant,
    flags: &FlagSet,
    group: &GroupContext,
) -> Result<RouteDecision, RoutingPreconditionError> {
    let decision = decide(current, flags, group)?;

    if let RouteDecision::Next(next) = decision {
        if next != WorkflowVariant::Gc5 {
            if let Some(group) = &group.group {
                group.ensure_leaseholder()?;
            }
        }
    }

    tracing::debug!(%current, ?decision, "routing decision");
    Ok(decision)
}

fn decide(
    current: WorkflowVariant,
    flags: &FlagSet,
    group: &GroupContext,
) -> Result<RouteDecision, RoutingPreconditionError> {
    let decision = match current {
        WorkflowVariant::Gc1 => {
            if flags.is_set(Flag::GroupOptOut) {
                RouteDecision::Terminate
            } else {
                by_role_flag(flags, group).map_or(RouteDecision::Terminate, RouteDecision::Next)
            }
        }
        WorkflowVariant::Gi1 => {
            if flags.is_set(Flag::InviteDeclined) {
                RouteDecision::Terminate
            } else {
                let role = group
                    .current_role()
                    .ok_or(RoutingPreconditionError::UnknownInvitee)?;
                RouteDecision::Next(invitee_variant(role, group))
            }
        }
        WorkflowVariant::Gc5 => {
            if let Some(group) = &group.group {
                group.ensure_leaseholder()?;
            }
            by_role_flag(flags, group)
                .or_else(|| group.current_role().map(|role| creator_variant(role, group)))
                .map_or(RouteDecision::Terminate, RouteDecision::Next)
        }
        _ => match current.family() {
            VariantFamily::Leaseholder if flags.is_set(Flag::NotResponsible) => current
                .not_responsible_counterpart()
                .map_or(RouteDecision::Terminate, RouteDecision::Next),
            VariantFamily::OtherOccupant
                if flags.is_set(Flag::FullyResponsible)
                    || flags.is_set(Flag::PartiallyResponsible) =>
            {
                RouteDecision::Next(WorkflowVariant::Csg3)
            }
            _ => RouteDecision::Terminate,
        },
    };

    Ok(decision)
}

fn by_role_flag(flags: &FlagSet, group: &GroupContext) -> Option<WorkflowVariant> {
    let role = if flags.is_set(Flag::RoleLeaseholder) {
        MemberRole::Applicant
    } else if flags.is_set(Flag::RoleCoSigner) {
        MemberRole::CoSigner
    } else if flags.is_set(Flag::RoleOther) {
        MemberRole::Other
    } else {
        return None;
    };
    Some(creator_variant(role, group))
}

fn co_signer_variant(group: &GroupContext) -> WorkflowVariant {
    if group.occupant_count() > 1 {
        WorkflowVariant::Csg2
    } else {
        WorkflowVariant::Csg1
    }
}

/// Variant for someone who set the group up themselves.
fn creator_variant(role: MemberRole, group: &GroupContext) -> WorkflowVariant {
    match role {
        MemberRole::MainApplicant | MemberRole::Applicant => match &group.group {
            Some(group) if group.has_represented_occupants() => WorkflowVariant::Ls3,
            Some(group) if group.occupant_count() > 1 => WorkflowVariant::Ls2,
            _ => WorkflowVariant::Ls1,
        },
        MemberRole::CoSigner => co_signer_variant(group),
        MemberRole::Dependent | MemberRole::Other if group.current_is_occupant() => {
            WorkflowVariant::Oth1
        }
        MemberRole::Dependent | MemberRole::Other => WorkflowVariant::Oth3,
    }
}

/// Variant for someone who joined through an invitation.
fn invitee_variant(role: MemberRole, group: &GroupContext) -> WorkflowVariant {
    match role {
        MemberRole::MainApplicant | MemberRole::Applicant => WorkflowVariant::Ls4,
        MemberRole::CoSigner => co_signer_variant(group),
        MemberRole::Dependent | MemberRole::Other if group.current_is_occupant() => {
            WorkflowVariant::Oth2
        }
        MemberRole::Dependent | MemberRole::Other => WorkflowVariant::Oth3,
    }
}
