use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::prequal::answers::{AnswerValue, EmploymentStatus, RentResponsibility};
use crate::workflows::prequal::credit::CreditBracket;
use crate::workflows::prequal::engine::PrequalEngine;
use crate::workflows::prequal::group::{
    Group, GroupContext, GroupMember, GroupStatus, MemberRole, MemberType, OccupantId,
};
use crate::workflows::prequal::steps::{RunId, StepId, StepView, WorkflowRun};
use crate::workflows::prequal::store::{
    InMemorySnapshotStore, RunSnapshot, SnapshotStore, StoreError,
};
use crate::workflows::prequal::variant::WorkflowVariant;

pub(super) fn engine() -> (PrequalEngine<InMemorySnapshotStore>, Arc<InMemorySnapshotStore>) {
    let store = Arc::new(InMemorySnapshotStore::new());
    let engine = PrequalEngine::new(store.clone()).expect("standard tables are valid");
    (engine, store)
}

/// Store whose saves always fail; loads report nothing stored.
#[derive(Default)]
pub(super) struct OfflineStore {
    pub(super) save_attempts: AtomicUsize,
}

impl OfflineStore {
    pub(super) fn attempts(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for OfflineStore {
    fn save(&self, _snapshot: &RunSnapshot) -> Result<(), StoreError> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("key-value store offline".to_string()))
    }

    fn load(&self, _run_id: &RunId) -> Result<Option<RunSnapshot>, StoreError> {
        Err(StoreError::Unavailable("key-value store offline".to_string()))
    }
}

pub(super) fn yes() -> AnswerValue {
    AnswerValue::YesNo(true)
}

pub(super) fn no() -> AnswerValue {
    AnswerValue::YesNo(false)
}

pub(super) fn responsibility(level: RentResponsibility) -> AnswerValue {
    AnswerValue::Responsibility(level)
}

pub(super) fn employment(statuses: &[EmploymentStatus]) -> AnswerValue {
    AnswerValue::Employment(statuses.to_vec())
}

pub(super) fn credit(bracket: CreditBracket) -> AnswerValue {
    AnswerValue::CreditBracket(bracket)
}

pub(super) fn occupants(ids: &[&str]) -> AnswerValue {
    AnswerValue::Occupants(ids.iter().map(|id| OccupantId(id.to_string())).collect())
}

/// Submit an answer that must be accepted.
pub(super) fn accept<S>(
    engine: &PrequalEngine<S>,
    run: &mut WorkflowRun,
    step: StepId,
    value: AnswerValue,
) -> StepView
where
    S: SnapshotStore + 'static,
{
    let view = engine
        .submit(run, step, value)
        .unwrap_or_else(|err| panic!("{step} failed: {err}"));
    assert_eq!(
        view.validation_error, None,
        "{step} should have been accepted"
    );
    view
}

/// Answer each step in order and return the run.
pub(super) fn walk<S>(
    engine: &PrequalEngine<S>,
    variant: WorkflowVariant,
    answers: Vec<(StepId, AnswerValue)>,
) -> WorkflowRun
where
    S: SnapshotStore + 'static,
{
    let mut run = engine.start(variant, None);
    for (step, value) in answers {
        accept(engine, &mut run, step, value);
    }
    run
}

/// LS answers up to the credit step for a full-time, non-student applicant.
pub(super) fn leaseholder_answers(
    bracket: CreditBracket,
    deposit: Option<bool>,
) -> Vec<(StepId, AnswerValue)> {
    let mut answers = vec![
        (StepId::RealtorStatus, no()),
        (StepId::Citizenship, yes()),
        (
            StepId::RentResponsibility,
            responsibility(RentResponsibility::Full),
        ),
        (
            StepId::EmploymentStatus,
            employment(&[EmploymentStatus::FullTime]),
        ),
        (StepId::StudentStatus, no()),
        (StepId::CreditBracket, credit(bracket)),
    ];
    if let Some(deposit) = deposit {
        answers.push((StepId::ExtraDeposit, AnswerValue::YesNo(deposit)));
    }
    answers
}

pub(super) fn member(id: &str, role: MemberRole) -> GroupMember {
    GroupMember {
        id: OccupantId(id.to_string()),
        member_type: MemberType::Occupant,
        role,
        is_admin: false,
        group_status: GroupStatus::Active,
    }
}

pub(super) fn group_of(members: Vec<GroupMember>) -> GroupContext {
    GroupContext::with_group(Group {
        group_id: "grp-100".to_string(),
        members,
    })
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
