use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::RoutingPreconditionError;

/// Identifier for a person attached to a rental group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OccupantId(pub String);

impl fmt::Display for OccupantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    Occupant,
    NonOccupant,
}

/// Sub-type of a group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    MainApplicant,
    Applicant,
    CoSigner,
    Dependent,
    Other,
}

impl MemberRole {
    /// Roles that can legally sign a lease.
    pub const fn is_leaseholder_eligible(self) -> bool {
        matches!(
            self,
            MemberRole::MainApplicant | MemberRole::Applicant | MemberRole::CoSigner
        )
    }

    pub const fn label(self) -> &'static str {
        match self {
            MemberRole::MainApplicant => "main_applicant",
            MemberRole::Applicant => "applicant",
            MemberRole::CoSigner => "co_signer",
            MemberRole::Dependent => "dependent",
            MemberRole::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Active,
    Invited,
    /// Occupant without an account whose answers are given by another member.
    Represented,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: OccupantId,
    pub member_type: MemberType,
    pub role: MemberRole,
    #[serde(default)]
    pub is_admin: bool,
    pub group_status: GroupStatus,
}

impl GroupMember {
    pub fn is_occupant(&self) -> bool {
        self.member_type == MemberType::Occupant
    }
}

/// Composition of the applicant's rental group as seen by the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub group_id: String,
    pub members: Vec<GroupMember>,
}

impl Group {
    pub fn occupant_count(&self) -> usize {
        self.members.iter().filter(|member| member.is_occupant()).count()
    }

    pub fn has_leaseholder(&self) -> bool {
        self.members
            .iter()
            .any(|member| member.role.is_leaseholder_eligible())
    }

    pub fn has_represented_occupants(&self) -> bool {
        self.members.iter().any(|member| {
            member.is_occupant() && member.group_status == GroupStatus::Represented
        })
    }

    pub fn member(&self, id: &OccupantId) -> Option<&GroupMember> {
        self.members.iter().find(|member| &member.id == id)
    }

    /// Fails when nobody in the group can sign the lease.
    pub fn ensure_leaseholder(&self) -> Result<(), RoutingPreconditionError> {
        if self.has_leaseholder() {
            Ok(())
        } else {
            Err(RoutingPreconditionError::NoLeaseholder {
                group_id: self.group_id.clone(),
            })
        }
    }
}

/// Group facts handed to the router alongside the run's flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupContext {
    #[serde(default)]
    pub group: Option<Group>,
    /// The member the current run belongs to, when known.
    #[serde(default)]
    pub current_member: Option<OccupantId>,
}

impl GroupContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_group(group: Group) -> Self {
        Self {
            group: Some(group),
            current_member: None,
        }
    }

    pub fn for_member(mut self, member: OccupantId) -> Self {
        self.current_member = Some(member);
        self
    }

    pub fn occupant_count(&self) -> usize {
        self.group.as_ref().map_or(0, Group::occupant_count)
    }

    pub fn current(&self) -> Option<&GroupMember> {
        let group = self.group.as_ref()?;
        let id = self.current_member.as_ref()?;
        group.member(id)
    }

    pub fn current_role(&self) -> Option<MemberRole> {
        self.current().map(|member| member.role)
    }

    /// Unknown members are treated as occupants.
    pub fn current_is_occupant(&self) -> bool {
        self.current().map_or(true, GroupMember::is_occupant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, role: MemberRole, status: GroupStatus) -> GroupMember {
        GroupMember {
            id: OccupantId(id.to_string()),
            member_type: MemberType::Occupant,
            role,
            is_admin: false,
            group_status: status,
        }
    }

    #[test]
    fn co_signer_counts_as_leaseholder() {
        let group = Group {
            group_id: "grp-1".to_string(),
            members: vec![
                member("a", MemberRole::Other, GroupStatus::Active),
                GroupMember {
                    member_type: MemberType::NonOccupant,
                    ..member("b", MemberRole::CoSigner, GroupStatus::Invited)
                },
            ],
        };

        assert!(group.ensure_leaseholder().is_ok());
        assert_eq!(group.occupant_count(), 1);
    }

    #[test]
    fn dependents_only_group_fails_precondition() {
        let group = Group {
            group_id: "grp-2".to_string(),
            members: vec![member("a", MemberRole::Dependent, GroupStatus::Represented)],
        };

        assert_eq!(
            group.ensure_leaseholder(),
            Err(RoutingPreconditionError::NoLeaseholder {
                group_id: "grp-2".to_string()
            })
        );
        assert!(group.has_represented_occupants());
    }

    #[test]
    fn current_role_requires_membership() {
        let group = Group {
            group_id: "grp-3".to_string(),
            members: vec![member("a", MemberRole::Applicant, GroupStatus::Active)],
        };
        let context = GroupContext::with_group(group);

        assert_eq!(context.current_role(), None);
        let context = context.for_member(OccupantId("a".to_string()));
        assert_eq!(context.current_role(), Some(MemberRole::Applicant));
    }
}
