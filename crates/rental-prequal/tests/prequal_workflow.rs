use std::sync::Arc;

use rental_prequal::workflows::prequal::{
    AnswerValue, CreditBracket, EmploymentStatus, Flag, Group, GroupContext, GroupMember,
    GroupStatus, InMemorySnapshotStore, MemberRole, MemberType, OccupantId, Outcome,
    PrequalEngine, RentResponsibility, SnapshotStore, StepId, WorkflowRun, WorkflowVariant,
};

fn engine() -> PrequalEngine<InMemorySnapshotStore> {
    PrequalEngine::new(Arc::new(InMemorySnapshotStore::new())).expect("standard tables are valid")
}

fn member(id: &str, member_type: MemberType, role: MemberRole, status: GroupStatus) -> GroupMember {
    GroupMember {
        id: OccupantId(id.to_string()),
        member_type,
        role,
        is_admin: false,
        group_status: status,
    }
}

fn answer_all(
    engine: &PrequalEngine<InMemorySnapshotStore>,
    run: &mut WorkflowRun,
    answers: Vec<(StepId, AnswerValue)>,
) {
    for (step, value) in answers {
        let view = engine.submit(run, step, value).expect("answer event");
        assert!(
            view.validation_error.is_none(),
            "{step} rejected: {:?}",
            view.validation_error
        );
    }
}

#[test]
fn creator_who_pays_nothing_is_handed_to_the_not_responsible_workflow() {
    let engine = engine();
    let group = Group {
        group_id: "grp-7".to_string(),
        members: vec![
            member("mia", MemberType::Occupant, MemberRole::MainApplicant, GroupStatus::Active),
            member("leo", MemberType::Occupant, MemberRole::Dependent, GroupStatus::Active),
        ],
    };
    let context = GroupContext {
        group: Some(group),
        current_member: Some(OccupantId("mia".to_string())),
    };

    let mut intake = engine.start(WorkflowVariant::Gc1, None);
    answer_all(
        &engine,
        &mut intake,
        vec![
            (StepId::CreateGroup, AnswerValue::YesNo(true)),
            (StepId::GroupRole, AnswerValue::Role(MemberRole::MainApplicant)),
        ],
    );
    let output = engine.route(&intake, &context).expect("routes");
    assert_eq!(output.next_variant, Some(WorkflowVariant::Ls2));

    let mut leaseholder = engine.start_next(&output).expect("LS2 run");
    answer_all(
        &engine,
        &mut leaseholder,
        vec![
            (StepId::RealtorStatus, AnswerValue::YesNo(false)),
            (StepId::Citizenship, AnswerValue::YesNo(true)),
            (
                StepId::RentResponsibility,
                AnswerValue::Responsibility(RentResponsibility::None),
            ),
        ],
    );
    assert!(leaseholder.is_terminal());
    let output = engine.route(&leaseholder, &context).expect("routes");
    assert_eq!(output.next_variant, Some(WorkflowVariant::Nls2));
    let carried = output.carried_state.as_ref().expect("carried state");
    assert_eq!(carried.citizen_or_pr, Some(true));
    assert!(carried.flags.is_set(Flag::ResponsibilityHandoff));

    let mut not_responsible = engine.start_next(&output).expect("NLS2 run");
    assert_eq!(not_responsible.current_step(), StepId::EmploymentStatus);
    answer_all(
        &engine,
        &mut not_responsible,
        vec![
            (
                StepId::EmploymentStatus,
                AnswerValue::Employment(vec![EmploymentStatus::PartTime]),
            ),
            (StepId::StudentStatus, AnswerValue::YesNo(false)),
            (StepId::CreditBracket, AnswerValue::CreditScore(880)),
        ],
    );

    let report = engine.complete(&not_responsible).expect("report");
    assert_eq!(
        report.employment_type_code.map(|code| code.to_string()),
        Some("NN-04".to_string())
    );
    assert!(matches!(report.outcome, Some(Outcome::Code(_))));
    assert!(report.flags.is_set(Flag::NotResponsible));
    assert!(report.flags.is_set(Flag::RoleLeaseholder));

    let output = engine.route(&not_responsible, &context).expect("routes");
    assert_eq!(output.next_variant, None);
}

#[test]
fn co_signer_for_several_occupants_qualifies_on_strong_credit() {
    let engine = engine();
    let group = Group {
        group_id: "grp-8".to_string(),
        members: vec![
            member("uma", MemberType::NonOccupant, MemberRole::CoSigner, GroupStatus::Active),
            member("ray", MemberType::Occupant, MemberRole::Applicant, GroupStatus::Active),
            member("zoe", MemberType::Occupant, MemberRole::Applicant, GroupStatus::Invited),
        ],
    };
    let context = GroupContext {
        group: Some(group),
        current_member: Some(OccupantId("uma".to_string())),
    };

    let mut intake = engine.start(WorkflowVariant::Gc1, None);
    answer_all(
        &engine,
        &mut intake,
        vec![
            (StepId::CreateGroup, AnswerValue::YesNo(true)),
            (StepId::GroupRole, AnswerValue::Role(MemberRole::CoSigner)),
        ],
    );
    let output = engine.route(&intake, &context).expect("routes");
    assert_eq!(output.next_variant, Some(WorkflowVariant::Csg2));

    let mut co_signer = engine.start_next(&output).expect("CSG2 run");
    answer_all(
        &engine,
        &mut co_signer,
        vec![
            (
                StepId::RepresentedOccupants,
                AnswerValue::Occupants(vec![
                    OccupantId("ray".to_string()),
                    OccupantId("zoe".to_string()),
                ]),
            ),
            (StepId::Citizenship, AnswerValue::YesNo(true)),
            (
                StepId::EmploymentStatus,
                AnswerValue::Employment(vec![
                    EmploymentStatus::SelfEmployed,
                    EmploymentStatus::FullTime,
                ]),
            ),
            (StepId::StudentStatus, AnswerValue::YesNo(false)),
            (
                StepId::CreditBracket,
                AnswerValue::CreditBracket(CreditBracket::Good),
            ),
        ],
    );

    assert!(co_signer.is_terminal());
    let report = engine.complete(&co_signer).expect("report");
    assert_eq!(
        report.employment_type_code.map(|code| code.to_string()),
        Some("GN-14".to_string())
    );
    assert_eq!(report.outcome, Some(Outcome::AutoQualify));
    assert!(report.flags.is_set(Flag::AutoQualifyCredit));
    assert!(report.flags.is_set(Flag::RoleCoSigner));
    assert!(report.flags.is_set(Flag::FullyResponsible));
    assert!(!report.flags.is_set(Flag::PartiallyResponsible));
    assert!(!report.flags.is_set(Flag::NotResponsible));
}

#[test]
fn interrupted_runs_resume_from_the_store() {
    let store = Arc::new(InMemorySnapshotStore::new());
    let first = PrequalEngine::new(store.clone()).expect("engine");

    let mut run = first.start(WorkflowVariant::Oth3, None);
    answer_all(
        &first,
        &mut run,
        vec![
            (
                StepId::RentResponsibility,
                AnswerValue::Responsibility(RentResponsibility::None),
            ),
            (StepId::Citizenship, AnswerValue::YesNo(false)),
        ],
    );
    let run_id = run.run_id().clone();
    drop(run);

    let second = PrequalEngine::new(store.clone()).expect("engine");
    let mut resumed = second
        .resume(&run_id, WorkflowVariant::Oth3)
        .expect("resumes");
    assert_eq!(resumed.current_step(), StepId::EmploymentStatus);
    assert!(resumed.flags().is_set(Flag::NonCitizen));

    answer_all(
        &second,
        &mut resumed,
        vec![
            (
                StepId::EmploymentStatus,
                AnswerValue::Employment(vec![EmploymentStatus::Unemployed]),
            ),
            (StepId::StudentStatus, AnswerValue::YesNo(true)),
            (
                StepId::CreditBracket,
                AnswerValue::CreditBracket(CreditBracket::NotInCanadaOver12mo),
            ),
        ],
    );
    let report = second.complete(&resumed).expect("report");
    assert_eq!(
        report.employment_type_code.map(|code| code.to_string()),
        Some("NS-02".to_string())
    );
    assert!(report.flags.is_set(Flag::NewToCanada));

    let stored = store.load(&run_id).expect("load").expect("snapshot");
    assert_eq!(stored.current_step, StepId::Complete);
}
