//! Prequalification wizard engine.
//!
//! Answers flow through a per-variant step machine; completed runs are
//! classified into an employment code, resolved against a validated outcome
//! table, and handed to the router to pick the next workflow variant.

pub mod answers;
pub mod classifier;
pub mod credit;
pub mod engine;
pub mod errors;
pub mod flags;
pub mod group;
pub mod http;
pub mod import;
pub mod outcome;
pub mod router;
pub mod steps;
pub mod store;
pub mod variant;

#[cfg(test)]
mod tests;

pub use answers::{
    AnswerValue, ApplicantAnswers, EmploymentSet, EmploymentStatus, RentResponsibility,
};
pub use classifier::{
    ClassificationContext, EmploymentClassifier, EmploymentTypeCode, ResponsibilityClass,
};
pub use credit::{BracketPartition, BracketRange, CreditBracket};
pub use engine::{
    Classification, CompletionReport, EngineError, PrequalEngine, Remediation, RoutingOutput,
};
pub use errors::{DomainError, RoutingPreconditionError, ValidationError};
pub use flags::{derive_flags, Flag, FlagSet};
pub use group::{Group, GroupContext, GroupMember, GroupStatus, MemberRole, MemberType, OccupantId};
pub use http::{prequal_router, PrequalService, PrequalServiceError};
pub use import::{
    classify_sheet, export_table, import_table, load_table_overrides, write_sheet_results,
    ImportError, SheetResult,
};
pub use outcome::{AxisKey, Outcome, OutcomeCatalog, OutcomeCode, OutcomeQuery, OutcomeTable};
pub use router::{route, CarriedState, RouteDecision};
pub use steps::{RunId, StepId, StepView, WorkflowRun};
pub use store::{InMemorySnapshotStore, RunSnapshot, SnapshotStore, StoreError};
pub use variant::{OutcomeAxis, VariantFamily, WorkflowVariant};
