use std::fmt;

use serde::{Deserialize, Serialize};

use super::answers::RentResponsibility;

/// Named branch of the qualification process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkflowVariant {
    #[serde(rename = "GC1")]
    Gc1,
    #[serde(rename = "GC5")]
    Gc5,
    #[serde(rename = "GI1")]
    Gi1,
    #[serde(rename = "LS1")]
    Ls1,
    #[serde(rename = "LS2")]
    Ls2,
    #[serde(rename = "LS3")]
    Ls3,
    #[serde(rename = "LS4")]
    Ls4,
    #[serde(rename = "NLS1")]
    Nls1,
    #[serde(rename = "NLS2")]
    Nls2,
    #[serde(rename = "NLS3")]
    Nls3,
    #[serde(rename = "CSG1")]
    Csg1,
    #[serde(rename = "CSG2")]
    Csg2,
    #[serde(rename = "CSG3")]
    Csg3,
    #[serde(rename = "OTH1")]
    Oth1,
    #[serde(rename = "OTH2")]
    Oth2,
    #[serde(rename = "OTH3")]
    Oth3,
}

/// Workflow families share step skeletons, outcome axes and routing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantFamily {
    GroupIntake,
    Leaseholder,
    NotResponsibleLeaseholder,
    CoSigner,
    OtherOccupant,
}

/// Shape of the outcome lookup a variant performs at completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeAxis {
    /// Group intake variants only route; they never classify.
    None,
    /// Credit bracket crossed with the extra-deposit decision.
    CreditAndDeposit,
    /// Credit bracket alone.
    CreditOnly,
}

impl WorkflowVariant {
    pub const ALL: [WorkflowVariant; 16] = [
        WorkflowVariant::Gc1,
        WorkflowVariant::Gc5,
        WorkflowVariant::Gi1,
        WorkflowVariant::Ls1,
        WorkflowVariant::Ls2,
        WorkflowVariant::Ls3,
        WorkflowVariant::Ls4,
        WorkflowVariant::Nls1,
        WorkflowVariant::Nls2,
        WorkflowVariant::Nls3,
        WorkflowVariant::Csg1,
        WorkflowVariant::Csg2,
        WorkflowVariant::Csg3,
        WorkflowVariant::Oth1,
        WorkflowVariant::Oth2,
        WorkflowVariant::Oth3,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            WorkflowVariant::Gc1 => "GC1",
            WorkflowVariant::Gc5 => "GC5",
            WorkflowVariant::Gi1 => "GI1",
            WorkflowVariant::Ls1 => "LS1",
            WorkflowVariant::Ls2 => "LS2",
            WorkflowVariant::Ls3 => "LS3",
            WorkflowVariant::Ls4 => "LS4",
            WorkflowVariant::Nls1 => "NLS1",
            WorkflowVariant::Nls2 => "NLS2",
            WorkflowVariant::Nls3 => "NLS3",
            WorkflowVariant::Csg1 => "CSG1",
            WorkflowVariant::Csg2 => "CSG2",
            WorkflowVariant::Csg3 => "CSG3",
            WorkflowVariant::Oth1 => "OTH1",
            WorkflowVariant::Oth2 => "OTH2",
            WorkflowVariant::Oth3 => "OTH3",
        }
    }

    pub fn from_code(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|variant| variant.code().eq_ignore_ascii_case(trimmed))
    }

    pub const fn family(self) -> VariantFamily {
        match self {
            WorkflowVariant::Gc1 | WorkflowVariant::Gc5 | WorkflowVariant::Gi1 => {
                VariantFamily::GroupIntake
            }
            WorkflowVariant::Ls1
            | WorkflowVariant::Ls2
            | WorkflowVariant::Ls3
            | WorkflowVariant::Ls4 => VariantFamily::Leaseholder,
            WorkflowVariant::Nls1 | WorkflowVariant::Nls2 | WorkflowVariant::Nls3 => {
                VariantFamily::NotResponsibleLeaseholder
            }
            WorkflowVariant::Csg1 | WorkflowVariant::Csg2 | WorkflowVariant::Csg3 => {
                VariantFamily::CoSigner
            }
            WorkflowVariant::Oth1 | WorkflowVariant::Oth2 | WorkflowVariant::Oth3 => {
                VariantFamily::OtherOccupant
            }
        }
    }

    pub const fn outcome_axis(self) -> OutcomeAxis {
        match self.family() {
            VariantFamily::GroupIntake => OutcomeAxis::None,
            VariantFamily::Leaseholder | VariantFamily::CoSigner => OutcomeAxis::CreditAndDeposit,
            VariantFamily::NotResponsibleLeaseholder | VariantFamily::OtherOccupant => {
                OutcomeAxis::CreditOnly
            }
        }
    }

    pub const fn has_credit_axis(self) -> bool {
        !matches!(self.outcome_axis(), OutcomeAxis::None)
    }

    /// Rent responsibility for families that never ask the question:
    /// co-signers guarantee all of it and NLS applicants pay none of it.
    pub const fn implied_responsibility(self) -> Option<RentResponsibility> {
        match self.family() {
            VariantFamily::CoSigner => Some(RentResponsibility::Full),
            VariantFamily::NotResponsibleLeaseholder => Some(RentResponsibility::None),
            VariantFamily::GroupIntake
            | VariantFamily::Leaseholder
            | VariantFamily::OtherOccupant => None,
        }
    }

    /// Not-responsible counterpart an LS run hands off to.
    pub const fn not_responsible_counterpart(self) -> Option<WorkflowVariant> {
        match self {
            WorkflowVariant::Ls1 => Some(WorkflowVariant::Nls1),
            WorkflowVariant::Ls2 | WorkflowVariant::Ls4 => Some(WorkflowVariant::Nls2),
            WorkflowVariant::Ls3 => Some(WorkflowVariant::Nls3),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
