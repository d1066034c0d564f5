use super::common::*;
use crate::workflows::prequal::answers::{AnswerValue, EmploymentStatus, RentResponsibility};
use crate::workflows::prequal::credit::CreditBracket;
use crate::workflows::prequal::flags::{Flag, RESPONSIBILITY_FLAGS, ROLE_FLAGS};
use crate::workflows::prequal::group::MemberRole;
use crate::workflows::prequal::router::CarriedState;
use crate::workflows::prequal::steps::StepId;
use crate::workflows::prequal::variant::{VariantFamily, WorkflowVariant};

const LEVELS: [RentResponsibility; 3] = [
    RentResponsibility::Full,
    RentResponsibility::Partial,
    RentResponsibility::None,
];

#[test]
fn responsibility_flags_stay_exclusive_across_revisions() {
    let (engine, _) = engine();

    for first in LEVELS {
        for second in LEVELS {
            for third in LEVELS {
                let mut run = walk(
                    &engine,
                    WorkflowVariant::Oth2,
                    vec![(StepId::RentResponsibility, responsibility(first))],
                );
                for level in [second, third] {
                    if run.is_terminal() {
                        run = engine.start(WorkflowVariant::Oth2, None);
                    } else {
                        engine.back(&mut run).expect("back");
                    }
                    accept(&engine, &mut run, StepId::RentResponsibility, responsibility(level));

                    let flags = run.flags();
                    assert_eq!(
                        flags.count_of(&RESPONSIBILITY_FLAGS),
                        1,
                        "{first:?} -> {second:?} -> {third:?}"
                    );
                }
            }
        }
    }
}

#[test]
fn runs_never_asked_about_rent_hold_exactly_one_responsibility_flag() {
    let (engine, _) = engine();
    let tail = || {
        vec![
            (
                StepId::EmploymentStatus,
                employment(&[EmploymentStatus::Retired]),
            ),
            (StepId::StudentStatus, no()),
            (StepId::CreditBracket, credit(CreditBracket::Good)),
        ]
    };
    let cases = [
        (WorkflowVariant::Csg1, Some(occupants(&["ola"])), Flag::FullyResponsible),
        (WorkflowVariant::Csg2, Some(occupants(&["ola", "kai"])), Flag::FullyResponsible),
        (WorkflowVariant::Csg3, None, Flag::FullyResponsible),
        (WorkflowVariant::Nls1, None, Flag::NotResponsible),
        (WorkflowVariant::Nls2, None, Flag::NotResponsible),
        (WorkflowVariant::Nls3, None, Flag::NotResponsible),
    ];

    for (variant, guaranteed, expected) in cases {
        let run = engine.start(variant, None);
        assert_eq!(run.flags().count_of(&RESPONSIBILITY_FLAGS), 1, "{variant} at start");
        assert!(run.flags().is_set(expected), "{variant} at start");

        let mut answers = Vec::new();
        if let Some(ids) = guaranteed {
            answers.push((StepId::RepresentedOccupants, ids));
        }
        if variant.family() == VariantFamily::CoSigner {
            answers.push((StepId::Citizenship, yes()));
        }
        answers.extend(tail());
        let run = walk(&engine, variant, answers);
        assert!(run.is_terminal(), "{variant} should be complete");

        let report = engine.complete(&run).expect("report");
        assert!(report.employment_type_code.is_some(), "{variant} classified");
        assert_eq!(report.flags.count_of(&RESPONSIBILITY_FLAGS), 1, "{variant}");
        assert!(report.flags.is_set(expected), "{variant}");
    }
}

#[test]
fn a_stated_responsibility_is_not_overridden_by_the_variant() {
    let (engine, _) = engine();
    let conversion = walk(
        &engine,
        WorkflowVariant::Oth1,
        vec![(
            StepId::RentResponsibility,
            responsibility(RentResponsibility::Partial),
        )],
    );
    let carried = CarriedState::capture(
        conversion.answers(),
        &conversion.flags(),
        Some(Flag::UserTypeChangedOthToCsg),
    );

    let co_signer = engine.start(WorkflowVariant::Csg3, Some(&carried));
    let flags = co_signer.flags();
    assert!(flags.is_set(Flag::PartiallyResponsible));
    assert_eq!(flags.count_of(&RESPONSIBILITY_FLAGS), 1);
}

#[test]
fn role_flags_stay_exclusive_when_the_role_changes() {
    let (engine, _) = engine();
    let mut run = walk(&engine, WorkflowVariant::Gc1, vec![(StepId::CreateGroup, yes())]);

    for role in [
        MemberRole::CoSigner,
        MemberRole::Applicant,
        MemberRole::Dependent,
        MemberRole::MainApplicant,
    ] {
        let mut candidate = run.clone();
        accept(&engine, &mut candidate, StepId::GroupRole, AnswerValue::Role(role));
        assert_eq!(candidate.flags().count_of(&ROLE_FLAGS), 1, "{role:?}");
    }

    // Opting out ends the run before any role is chosen.
    engine.back(&mut run).expect("back");
    accept(&engine, &mut run, StepId::CreateGroup, no());
    let flags = run.flags();
    assert!(flags.is_set(Flag::GroupOptOut));
    assert_eq!(flags.count_of(&ROLE_FLAGS), 0);
}

#[test]
fn carried_state_only_forwards_role_and_transition_flags() {
    let (engine, _) = engine();
    let run = walk(
        &engine,
        WorkflowVariant::Ls2,
        vec![
            (StepId::RealtorStatus, no()),
            (StepId::Citizenship, no()),
            (
                StepId::RentResponsibility,
                responsibility(RentResponsibility::None),
            ),
        ],
    );
    let flags = run.flags().with(Flag::RoleLeaseholder);

    let carried = CarriedState::capture(run.answers(), &flags, Some(Flag::ResponsibilityHandoff));

    assert!(carried.flags.is_set(Flag::RoleLeaseholder));
    assert!(carried.flags.is_set(Flag::ResponsibilityHandoff));
    assert!(!carried.flags.is_set(Flag::NotResponsible));
    assert!(!carried.flags.is_set(Flag::NonCitizen));
    assert_eq!(carried.citizen_or_pr, Some(false));

    let next = engine.start(WorkflowVariant::Nls2, Some(&carried));
    let flags = next.flags();
    assert!(flags.is_set(Flag::NotResponsible));
    assert!(flags.is_set(Flag::NonCitizen));
    assert_eq!(flags.count_of(&RESPONSIBILITY_FLAGS), 1);
}
