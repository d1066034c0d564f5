use crate::infra::ConfiguredStore;
use clap::Args;
use rental_prequal::config::StoreConfig;
use rental_prequal::error::AppError;
use rental_prequal::workflows::prequal::{
    AnswerValue, CompletionReport, CreditBracket, EmploymentStatus, Group, GroupContext,
    GroupMember, GroupStatus, MemberRole, MemberType, OccupantId, PrequalEngine,
    RentResponsibility, RoutingOutput, StepId, WorkflowRun, WorkflowVariant,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Persist demo runs as JSON snapshots in this directory
    #[arg(long)]
    pub(crate) snapshot_dir: Option<PathBuf>,
    /// Credit score reported by the occupant who ends up co-signing
    #[arg(long, default_value_t = 612)]
    pub(crate) co_signer_score: u16,
    /// Print completion reports as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

type Script = Vec<(StepId, AnswerValue)>;

struct Participant {
    name: &'static str,
    member: OccupantId,
    intake: Script,
    /// Answers for each routed variant, in the order they are reached.
    follow_ups: Vec<(WorkflowVariant, Script)>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = ConfiguredStore::from_config(&StoreConfig {
        snapshot_dir: args.snapshot_dir.clone(),
    })?;
    println!("Rental prequalification demo (snapshots: {})", store.describe());
    let engine = PrequalEngine::new(Arc::new(store))?;

    let group = demo_group();
    println!(
        "Group {} with {} members ({} occupants)",
        group.group_id,
        group.members.len(),
        group.occupant_count()
    );

    for participant in demo_participants(args.co_signer_score) {
        println!("\n== {} ==", participant.name);
        let context = GroupContext {
            group: Some(group.clone()),
            current_member: Some(participant.member.clone()),
        };
        run_participant(&engine, participant, &context, args.json)?;
    }

    Ok(())
}

fn run_participant(
    engine: &PrequalEngine<ConfiguredStore>,
    participant: Participant,
    context: &GroupContext,
    as_json: bool,
) -> Result<(), AppError> {
    let mut run = engine.start(WorkflowVariant::Gc1, None);
    let mut script = participant.intake;
    let mut follow_ups = participant.follow_ups.into_iter();

    loop {
        if !drive(engine, &mut run, script)? {
            return Ok(());
        }
        let report = engine.complete(&run)?;
        render_report(&report, as_json);

        let output = engine.route(&run, context)?;
        render_routing(&output);
        let Some(next) = engine.start_next(&output) else {
            return Ok(());
        };

        match follow_ups.next() {
            Some((expected, answers)) if expected == next.variant() => {
                run = next;
                script = answers;
            }
            Some((expected, _)) => {
                println!(
                    "  Script expected {expected} but the router chose {}; stopping",
                    next.variant()
                );
                return Ok(());
            }
            None => return Ok(()),
        }
    }
}

/// Feed scripted answers into `run`. Returns false when an answer is
/// rejected or the script ends before the run is terminal.
fn drive(
    engine: &PrequalEngine<ConfiguredStore>,
    run: &mut WorkflowRun,
    script: Script,
) -> Result<bool, AppError> {
    println!("  [{}] {}", run.variant(), run.run_id());
    for (step, answer) in script {
        let view = engine.submit(run, step, answer)?;
        if let Some(error) = view.validation_error {
            println!("    {step}: rejected ({error})");
            return Ok(false);
        }
        println!("    {step}: accepted -> {}", view.current_step);
    }

    if !run.is_terminal() {
        println!("    script ended on {}", run.current_step());
        return Ok(false);
    }
    Ok(true)
}

fn render_report(report: &CompletionReport, as_json: bool) {
    if as_json {
        match serde_json::to_string_pretty(report) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => println!("  Report unavailable: {err}"),
        }
        return;
    }

    match (&report.employment_type_code, &report.outcome) {
        (Some(code), Some(outcome)) => {
            println!("  Completed {}: {} -> {}", report.variant, code, outcome)
        }
        _ => println!("  Completed {} without classification", report.variant),
    }
    let flags: Vec<String> = report.flags.iter().map(|flag| format!("{flag:?}")).collect();
    if !flags.is_empty() {
        println!("  Flags: {}", flags.join(", "));
    }
}

fn render_routing(output: &RoutingOutput) {
    if let Some(remediation) = &output.remediation {
        println!(
            "  Remediation via {}: {}",
            remediation.variant, remediation.reason
        );
    }
    match output.next_variant {
        Some(next) => println!("  Next workflow: {next}"),
        None => println!("  No further workflow"),
    }
}

fn demo_group() -> Group {
    let member = |id: &str, member_type: MemberType, role: MemberRole| GroupMember {
        id: OccupantId(id.to_string()),
        member_type,
        role,
        is_admin: role == MemberRole::MainApplicant,
        group_status: GroupStatus::Active,
    };
    Group {
        group_id: "grp-demo".to_string(),
        members: vec![
            member("ava", MemberType::Occupant, MemberRole::MainApplicant),
            member("ben", MemberType::Occupant, MemberRole::Dependent),
        ],
    }
}

fn demo_participants(co_signer_score: u16) -> Vec<Participant> {
    vec![
        Participant {
            name: "Main applicant who pays no rent",
            member: OccupantId("ava".to_string()),
            intake: vec![
                (StepId::CreateGroup, AnswerValue::YesNo(true)),
                (StepId::GroupRole, AnswerValue::Role(MemberRole::MainApplicant)),
            ],
            follow_ups: vec![
                (
                    WorkflowVariant::Ls2,
                    vec![
                        (StepId::RealtorStatus, AnswerValue::YesNo(true)),
                        (StepId::ExclusivityAgreement, AnswerValue::YesNo(false)),
                        (StepId::Citizenship, AnswerValue::YesNo(false)),
                        (
                            StepId::RentResponsibility,
                            AnswerValue::Responsibility(RentResponsibility::None),
                        ),
                    ],
                ),
                (
                    WorkflowVariant::Nls2,
                    vec![
                        (
                            StepId::EmploymentStatus,
                            AnswerValue::Employment(vec![
                                EmploymentStatus::Retired,
                                EmploymentStatus::PartTime,
                            ]),
                        ),
                        (StepId::StudentStatus, AnswerValue::YesNo(false)),
                        (
                            StepId::CreditBracket,
                            AnswerValue::CreditBracket(CreditBracket::Poor),
                        ),
                    ],
                ),
            ],
        },
        Participant {
            name: "Dependent who covers part of the rent",
            member: OccupantId("ben".to_string()),
            intake: vec![
                (StepId::CreateGroup, AnswerValue::YesNo(true)),
                (StepId::GroupRole, AnswerValue::Role(MemberRole::Dependent)),
            ],
            follow_ups: vec![
                (
                    WorkflowVariant::Oth1,
                    vec![(
                        StepId::RentResponsibility,
                        AnswerValue::Responsibility(RentResponsibility::Partial),
                    )],
                ),
                (
                    WorkflowVariant::Csg3,
                    vec![
                        (StepId::Citizenship, AnswerValue::YesNo(true)),
                        (
                            StepId::EmploymentStatus,
                            AnswerValue::Employment(vec![EmploymentStatus::FullTime]),
                        ),
                        (StepId::StudentStatus, AnswerValue::YesNo(true)),
                        (StepId::CreditBracket, AnswerValue::CreditScore(co_signer_score)),
                        (StepId::ExtraDeposit, AnswerValue::YesNo(true)),
                    ],
                ),
            ],
        },
    ]
}
