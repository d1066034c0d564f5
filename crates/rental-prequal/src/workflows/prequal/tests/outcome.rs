use std::collections::HashSet;

use super::common::*;
use crate::workflows::prequal::answers::{
    ApplicantAnswers, EmploymentSet, EmploymentStatus, RentResponsibility,
};
use crate::workflows::prequal::classifier::{EmploymentClassifier, EmploymentTypeCode, MAX_STATUSES};
use crate::workflows::prequal::credit::CreditBracket;
use crate::workflows::prequal::errors::DomainError;
use crate::workflows::prequal::outcome::{
    AxisKey, Outcome, OutcomeCatalog, OutcomeCode, OutcomeEntry, OutcomeQuery, OutcomeTable,
    TableLayout, STANDARD_LAYOUTS,
};
use crate::workflows::prequal::variant::{OutcomeAxis, VariantFamily, WorkflowVariant};

fn responsibilities_for(variant: WorkflowVariant) -> Vec<Option<RentResponsibility>> {
    match variant.family() {
        VariantFamily::Leaseholder => vec![
            Some(RentResponsibility::Full),
            Some(RentResponsibility::Partial),
        ],
        VariantFamily::CoSigner => vec![None, Some(RentResponsibility::Full)],
        VariantFamily::NotResponsibleLeaseholder | VariantFamily::OtherOccupant => {
            vec![Some(RentResponsibility::None)]
        }
        VariantFamily::GroupIntake => Vec::new(),
    }
}

fn answers(
    statuses: EmploymentSet,
    is_student: bool,
    responsibility: Option<RentResponsibility>,
    credit: CreditBracket,
    deposit: Option<bool>,
) -> ApplicantAnswers {
    ApplicantAnswers {
        employment_statuses: statuses,
        is_student: Some(is_student),
        rent_responsibility: responsibility,
        credit_bracket: Some(credit),
        can_provide_extra_deposit: deposit,
        ..ApplicantAnswers::default()
    }
}

fn deposits_for(variant: WorkflowVariant) -> Vec<Option<bool>> {
    match variant.outcome_axis() {
        OutcomeAxis::CreditAndDeposit => vec![Some(true), Some(false)],
        _ => vec![None],
    }
}

#[test]
fn every_valid_answer_tuple_classifies_to_exactly_one_outcome() {
    let (engine, _) = engine();
    let mut checked = 0;

    for variant in WorkflowVariant::ALL
        .into_iter()
        .filter(|variant| variant.has_credit_axis())
    {
        for statuses in EmploymentSet::all_up_to(MAX_STATUSES) {
            for is_student in [true, false] {
                for responsibility in responsibilities_for(variant) {
                    for credit in CreditBracket::ALL {
                        for deposit in deposits_for(variant) {
                            let answers =
                                answers(statuses, is_student, responsibility, credit, deposit);
                            let first = engine.classify(variant, &answers).unwrap_or_else(|err| {
                                panic!("{variant} {statuses} student={is_student}: {err}")
                            });
                            let second = engine
                                .classify(variant, &answers)
                                .expect("second classification");
                            assert_eq!(first, second, "classification must be deterministic");
                            checked += 1;
                        }
                    }
                }
            }
        }
    }

    assert!(checked > 10_000, "only {checked} tuples checked");
}

#[test]
fn auto_qualify_brackets_short_circuit_every_table() {
    let (engine, _) = engine();

    for table in engine.outcomes().tables() {
        for code in table.employment_codes() {
            for credit in [CreditBracket::VeryGood, CreditBracket::Good] {
                for deposit in [None, Some(true), Some(false)] {
                    let outcome = table
                        .resolve(code, OutcomeQuery { credit, deposit })
                        .expect("auto-qualify never fails");
                    assert_eq!(outcome, Outcome::AutoQualify);
                }
            }
        }
        assert!(table
            .entries()
            .iter()
            .all(|entry| !entry.axis_key.credit().is_auto_qualify()));
    }
}

#[test]
fn outcome_codes_are_unique_within_and_across_tables() {
    let (engine, _) = engine();
    let mut everywhere = HashSet::new();

    for table in engine.outcomes().tables() {
        for entry in table.entries() {
            assert!(
                everywhere.insert(entry.outcome_code.clone()),
                "{} reused {}",
                table.variant(),
                entry.outcome_code
            );
            let raw: u32 = entry.outcome_code.as_str().parse().expect("numeric code");
            assert!(
                table.range().contains(&raw),
                "{} outside {:?}",
                entry.outcome_code,
                table.range()
            );
        }
    }
}

#[test]
fn credit_only_tables_give_four_distinct_outcomes_per_code() {
    let (engine, _) = engine();

    for table in engine
        .outcomes()
        .tables()
        .filter(|table| table.axis() == OutcomeAxis::CreditOnly)
    {
        assert_eq!(table.employment_codes().len(), 50);
        for code in table.employment_codes() {
            let outcomes = table.outcomes_for(code);
            let distinct: HashSet<_> = outcomes.iter().collect();
            assert_eq!(outcomes.len(), 4, "{} {code}", table.variant());
            assert_eq!(distinct.len(), 4, "{} {code}", table.variant());
        }
    }
}

#[test]
fn credit_and_deposit_tables_give_ten_outcomes_per_code() {
    let (engine, _) = engine();
    let table = engine
        .outcomes()
        .table(WorkflowVariant::Csg2)
        .expect("CSG2 table");

    assert_eq!(table.axis(), OutcomeAxis::CreditAndDeposit);
    for code in table.employment_codes() {
        assert_eq!(table.outcomes_for(code).len(), 10);
    }
}

#[test]
fn retired_student_with_excellent_credit_gets_first_of_four_outcomes() {
    let (engine, _) = engine();
    let retired: EmploymentSet = vec![EmploymentStatus::Retired].into();

    let excellent = engine
        .classify(
            WorkflowVariant::Nls1,
            &answers(
                retired,
                true,
                Some(RentResponsibility::None),
                CreditBracket::Excellent,
                None,
            ),
        )
        .expect("classifies");
    let fair = engine
        .classify(
            WorkflowVariant::Nls1,
            &answers(
                retired,
                true,
                Some(RentResponsibility::None),
                CreditBracket::Fair,
                None,
            ),
        )
        .expect("classifies");

    assert_eq!(excellent.employment_type_code.as_str(), "NS-01");
    let table = engine
        .outcomes()
        .table(WorkflowVariant::Nls1)
        .expect("NLS1 table");
    let authored = table.outcomes_for(&excellent.employment_type_code);
    assert_eq!(excellent.outcome.code(), Some(authored[0]));
    assert_ne!(excellent.outcome, fair.outcome);
    assert!(!fair.outcome.is_auto_qualify());
}

#[test]
fn credit_only_tables_share_one_bucket_below_660() {
    let (engine, _) = engine();
    let table = engine
        .outcomes()
        .table(WorkflowVariant::Oth2)
        .expect("OTH2 table");
    let code = &table.employment_codes()[7];

    let fair = table
        .resolve(code, OutcomeQuery::credit(CreditBracket::Fair))
        .expect("fair");
    let poor = table
        .resolve(code, OutcomeQuery::credit(CreditBracket::Poor))
        .expect("poor");
    let unknown = table
        .resolve(code, OutcomeQuery::credit(CreditBracket::Unknown))
        .expect("unknown");

    assert_eq!(fair, poor);
    assert_ne!(fair, unknown);
}

#[test]
fn three_statuses_with_poor_credit_split_on_deposit() {
    let (engine, _) = engine();
    let statuses: EmploymentSet = vec![
        EmploymentStatus::FullTime,
        EmploymentStatus::PartTime,
        EmploymentStatus::SelfEmployed,
    ]
    .into();

    let classify = |deposit| {
        engine
            .classify(
                WorkflowVariant::Ls1,
                &answers(
                    statuses,
                    false,
                    Some(RentResponsibility::Full),
                    CreditBracket::Poor,
                    Some(deposit),
                ),
            )
            .expect("classifies")
    };
    let with_deposit = classify(true);
    let without_deposit = classify(false);

    assert_eq!(with_deposit.employment_type_code.as_str(), "RN-25");
    assert_eq!(
        with_deposit.employment_type_code,
        without_deposit.employment_type_code
    );
    assert_ne!(with_deposit.outcome, without_deposit.outcome);
    assert!(!with_deposit.outcome.is_auto_qualify());
    assert!(!without_deposit.outcome.is_auto_qualify());
}

#[test]
fn deposit_axis_requires_the_deposit_answer() {
    let (engine, _) = engine();
    let result = engine.classify(
        WorkflowVariant::Csg1,
        &answers(
            vec![EmploymentStatus::FullTime].into(),
            false,
            None,
            CreditBracket::Unknown,
            None,
        ),
    );

    match result {
        Err(DomainError::MissingAnswer { field }) => {
            assert_eq!(field, "can_provide_extra_deposit")
        }
        other => panic!("expected missing deposit answer, got {other:?}"),
    }
}

fn standard_table(variant: WorkflowVariant) -> OutcomeTable {
    OutcomeCatalog::standard()
        .expect("standard catalog")
        .table(variant)
        .expect("table")
        .clone()
}

fn rebuild(table: &OutcomeTable, entries: Vec<OutcomeEntry>) -> Result<OutcomeTable, DomainError> {
    OutcomeTable::from_entries(
        table.variant(),
        table.range().clone(),
        table.employment_codes().to_vec(),
        entries,
    )
}

#[test]
fn rejects_reused_outcome_codes() {
    let table = standard_table(WorkflowVariant::Nls2);
    let mut entries = table.entries().to_vec();
    entries[1].outcome_code = entries[0].outcome_code.clone();

    match rebuild(&table, entries) {
        Err(DomainError::DuplicateOutcomeCode { variant, .. }) => {
            assert_eq!(variant, WorkflowVariant::Nls2)
        }
        other => panic!("expected duplicate outcome code, got {other:?}"),
    }
}

#[test]
fn rejects_authored_auto_qualify_entries() {
    let table = standard_table(WorkflowVariant::Ls2);
    let mut entries = table.entries().to_vec();
    entries.push(OutcomeEntry {
        employment_type_code: entries[0].employment_type_code.clone(),
        axis_key: AxisKey::CreditDeposit {
            credit: CreditBracket::Good,
            deposit: true,
        },
        outcome_code: OutcomeCode::new("99999"),
    });

    match rebuild(&table, entries) {
        Err(DomainError::AuthoredAutoQualifyEntry { bracket, .. }) => {
            assert_eq!(bracket, CreditBracket::Good)
        }
        other => panic!("expected authored auto-qualify entry, got {other:?}"),
    }
}

#[test]
fn rejects_gaps_and_doubled_keys() {
    let table = standard_table(WorkflowVariant::Oth1);

    let mut missing = table.entries().to_vec();
    missing.pop();
    match rebuild(&table, missing) {
        Err(DomainError::IncompleteOutcomeTable {
            expected, found, ..
        }) => assert_eq!(found + 1, expected),
        other => panic!("expected incomplete table, got {other:?}"),
    }

    let mut doubled = table.entries().to_vec();
    let mut copy = doubled[3].clone();
    copy.outcome_code = OutcomeCode::new("49999");
    doubled.push(copy);
    match rebuild(&table, doubled) {
        Err(DomainError::AmbiguousOutcome { matches, .. }) => assert_eq!(matches, 2),
        other => panic!("expected ambiguous outcome, got {other:?}"),
    }
}

#[test]
fn rejects_keys_from_the_wrong_axis() {
    let table = standard_table(WorkflowVariant::Nls3);
    let mut entries = table.entries().to_vec();
    entries[0].axis_key = AxisKey::CreditDeposit {
        credit: CreditBracket::Excellent,
        deposit: false,
    };

    assert!(matches!(
        rebuild(&table, entries),
        Err(DomainError::UnexpectedOutcomeKey { .. })
    ));
}

#[test]
fn lookup_surfaces_ambiguity_and_gaps_in_malformed_tables() {
    let code = EmploymentTypeCode::new("NN-03");
    let entry = |outcome: &str| OutcomeEntry {
        employment_type_code: code.clone(),
        axis_key: AxisKey::Credit {
            credit: CreditBracket::Unknown,
        },
        outcome_code: OutcomeCode::new(outcome),
    };
    let table = OutcomeTable::unchecked(WorkflowVariant::Nls1, vec![entry("1"), entry("2")]);

    match table.resolve(&code, OutcomeQuery::credit(CreditBracket::Unknown)) {
        Err(DomainError::AmbiguousOutcome { matches, .. }) => assert_eq!(matches, 2),
        other => panic!("expected ambiguous outcome, got {other:?}"),
    }
    match table.resolve(&code, OutcomeQuery::credit(CreditBracket::Excellent)) {
        Err(DomainError::MissingOutcome { key, .. }) => assert_eq!(key, "760-900"),
        other => panic!("expected missing outcome, got {other:?}"),
    }
}

#[test]
fn catalog_requires_a_table_for_every_credit_variant() {
    let classifier = EmploymentClassifier::shared().expect("classifier");
    let partial: Vec<TableLayout> = STANDARD_LAYOUTS
        .iter()
        .filter(|layout| layout.variant != WorkflowVariant::Oth3)
        .copied()
        .collect();

    match OutcomeCatalog::from_layouts(&partial, classifier) {
        Err(DomainError::IncompleteOutcomeTable { variant, .. }) => {
            assert_eq!(variant, WorkflowVariant::Oth3)
        }
        other => panic!("expected missing OTH3 table, got {other:?}"),
    }
}

#[test]
fn catalog_rejects_ranges_too_small_for_the_table() {
    let classifier = EmploymentClassifier::shared().expect("classifier");
    let mut layouts = STANDARD_LAYOUTS.to_vec();
    layouts[0] = TableLayout {
        variant: WorkflowVariant::Ls1,
        first: 10000,
        last: 10099,
    };

    match OutcomeCatalog::from_layouts(&layouts, classifier) {
        Err(DomainError::IncompleteOutcomeTable {
            variant, expected, ..
        }) => {
            assert_eq!(variant, WorkflowVariant::Ls1);
            assert_eq!(expected, 500);
        }
        other => panic!("expected capacity failure, got {other:?}"),
    }
}

#[test]
fn group_intake_variants_have_no_table() {
    let (engine, _) = engine();
    assert!(matches!(
        engine.outcomes().table(WorkflowVariant::Gc1),
        Err(DomainError::NoOutcomeAxis { .. })
    ));
}
