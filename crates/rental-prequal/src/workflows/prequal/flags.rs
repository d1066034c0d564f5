use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::answers::{ApplicantAnswers, RentResponsibility};
use super::credit::CreditBracket;
use super::group::MemberRole;

/// Every flag the engine knows about. Names are checked at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    FullyResponsible,
    PartiallyResponsible,
    NotResponsible,
    ExclusiveRealtor,
    NonCitizen,
    Student,
    AutoQualifyCredit,
    NewToCanada,
    ExtraDepositOffered,
    RoleLeaseholder,
    RoleCoSigner,
    RoleOther,
    GroupOptOut,
    InviteDeclined,
    LeaseholderInvited,
    /// Set by the router when an OTH run converts into a co-signer run.
    UserTypeChangedOthToCsg,
    /// Set by the router when an LS run hands off to its NLS counterpart.
    ResponsibilityHandoff,
}

pub const RESPONSIBILITY_FLAGS: [Flag; 3] = [
    Flag::FullyResponsible,
    Flag::PartiallyResponsible,
    Flag::NotResponsible,
];

pub const ROLE_FLAGS: [Flag; 3] = [Flag::RoleLeaseholder, Flag::RoleCoSigner, Flag::RoleOther];

impl Flag {
    pub const ALL: [Flag; 17] = [
        Flag::FullyResponsible,
        Flag::PartiallyResponsible,
        Flag::NotResponsible,
        Flag::ExclusiveRealtor,
        Flag::NonCitizen,
        Flag::Student,
        Flag::AutoQualifyCredit,
        Flag::NewToCanada,
        Flag::ExtraDepositOffered,
        Flag::RoleLeaseholder,
        Flag::RoleCoSigner,
        Flag::RoleOther,
        Flag::GroupOptOut,
        Flag::InviteDeclined,
        Flag::LeaseholderInvited,
        Flag::UserTypeChangedOthToCsg,
        Flag::ResponsibilityHandoff,
    ];

    /// Flags that only the router may raise.
    pub const fn is_transition_flag(self) -> bool {
        matches!(
            self,
            Flag::UserTypeChangedOthToCsg | Flag::ResponsibilityHandoff
        )
    }
}

/// Closed set of raised flags. Serialized as `{flag: bool}` over every flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    raised: BTreeSet<Flag>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self, flag: Flag) -> bool {
        self.raised.contains(&flag)
    }

    pub fn set(&mut self, flag: Flag) {
        self.raised.insert(flag);
    }

    /// Raise `flag` and clear the rest of its exclusive group in one step.
    pub fn set_exclusive(&mut self, flag: Flag, group: &[Flag]) {
        for other in group {
            self.raised.remove(other);
        }
        self.raised.insert(flag);
    }

    pub fn with(mut self, flag: Flag) -> Self {
        self.set(flag);
        self
    }

    pub fn union(&self, other: &FlagSet) -> FlagSet {
        FlagSet {
            raised: self.raised.union(&other.raised).copied().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.raised.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.raised.is_empty()
    }

    /// Number of raised flags from `group`.
    pub fn count_of(&self, group: &[Flag]) -> usize {
        group.iter().filter(|flag| self.is_set(**flag)).count()
    }

    pub fn to_map(&self) -> BTreeMap<Flag, bool> {
        Flag::ALL
            .into_iter()
            .map(|flag| (flag, self.is_set(flag)))
            .collect()
    }
}

impl FromIterator<Flag> for FlagSet {
    fn from_iter<T: IntoIterator<Item = Flag>>(iter: T) -> Self {
        Self {
            raised: iter.into_iter().collect(),
        }
    }
}

impl Serialize for FlagSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FlagSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let map = BTreeMap::<Flag, bool>::deserialize(deserializer)?;
        Ok(map
            .into_iter()
            .filter_map(|(flag, raised)| raised.then_some(flag))
            .collect())
    }
}

/// Recompute every derivable flag from scratch. Transition flags are never
/// produced here.
pub fn derive_flags(answers: &ApplicantAnswers) -> FlagSet {
    let mut flags = FlagSet::new();

    if let Some(level) = answers.rent_responsibility {
        let flag = match level {
            RentResponsibility::Full => Flag::FullyResponsible,
            RentResponsibility::Partial => Flag::PartiallyResponsible,
            RentResponsibility::None => Flag::NotResponsible,
        };
        flags.set_exclusive(flag, &RESPONSIBILITY_FLAGS);
    }

    if answers.working_with_realtor == Some(true) && answers.signed_exclusivity == Some(true) {
        flags.set(Flag::ExclusiveRealtor);
    }

    if answers.citizen_or_pr == Some(false) {
        flags.set(Flag::NonCitizen);
    }

    if answers.is_student == Some(true) {
        flags.set(Flag::Student);
    }

    match answers.credit_bracket {
        Some(bracket) if bracket.is_auto_qualify() => flags.set(Flag::AutoQualifyCredit),
        Some(CreditBracket::NotInCanadaOver12mo) => flags.set(Flag::NewToCanada),
        _ => {}
    }

    if answers.can_provide_extra_deposit == Some(true) {
        flags.set(Flag::ExtraDepositOffered);
    }

    if let Some(role) = answers.group_role {
        let flag = match role {
            MemberRole::MainApplicant | MemberRole::Applicant => Flag::RoleLeaseholder,
            MemberRole::CoSigner => Flag::RoleCoSigner,
            MemberRole::Dependent | MemberRole::Other => Flag::RoleOther,
        };
        flags.set_exclusive(flag, &ROLE_FLAGS);
    }

    if answers.create_group == Some(false) {
        flags.set(Flag::GroupOptOut);
    }
    if answers.accept_invite == Some(false) {
        flags.set(Flag::InviteDeclined);
    }
    if answers.leaseholder_invited == Some(true) {
        flags.set(Flag::LeaseholderInvited);
    }

    flags
}
