//! CSV batch classification of answer sheets, plus CSV export and re-import of
//! outcome tables so they can be reviewed and repaired outside the engine.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::answers::{ApplicantAnswers, EmploymentSet, EmploymentStatus, RentResponsibility};
use super::classifier::{EmploymentClassifier, EmploymentTypeCode};
use super::credit::CreditBracket;
use super::engine::PrequalEngine;
use super::outcome::{
    employment_codes_for, AxisKey, OutcomeCatalog, OutcomeCode, OutcomeEntry, OutcomeTable,
    STANDARD_LAYOUTS,
};
use super::store::SnapshotStore;
use super::variant::WorkflowVariant;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {line}: {detail}")]
    InvalidRow { line: usize, detail: String },
    #[error("table for {expected} contains a row for {found}")]
    VariantMismatch {
        expected: WorkflowVariant,
        found: WorkflowVariant,
    },
    #[error("imported table rejected: {0}")]
    Table(#[from] super::errors::DomainError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct SheetRow {
    applicant_id: String,
    variant: String,
    employment_statuses: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    is_student: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    rent_responsibility: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    credit_bracket: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    credit_score: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    can_provide_extra_deposit: Option<String>,
}

/// One classified line of an answer sheet. Rows that could not be classified
/// carry the reason instead of a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetResult {
    pub applicant_id: String,
    pub variant: String,
    pub employment_type_code: Option<String>,
    pub outcome: Option<String>,
    pub error: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_yes_no(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_statuses(raw: &str) -> Result<EmploymentSet, String> {
    raw.split(['+', ';', '|'])
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            EmploymentStatus::from_label(part)
                .ok_or_else(|| format!("unknown employment status `{}`", part.trim()))
        })
        .collect()
}

impl SheetRow {
    fn to_answers<S>(&self, engine: &PrequalEngine<S>) -> Result<ApplicantAnswers, String>
    where
        S: SnapshotStore + 'static,
    {
        let yes_no = |field: &str, value: &Option<String>| -> Result<Option<bool>, String> {
            value
                .as_deref()
                .map(|raw| parse_yes_no(raw).ok_or_else(|| format!("{field} must be yes or no")))
                .transpose()
        };

        let rent_responsibility = self
            .rent_responsibility
            .as_deref()
            .map(|raw| {
                RentResponsibility::from_label(raw)
                    .ok_or_else(|| format!("unknown rent responsibility `{raw}`"))
            })
            .transpose()?;

        let credit_bracket = match (&self.credit_bracket, &self.credit_score) {
            (Some(label), _) => Some(
                CreditBracket::from_label(label)
                    .ok_or_else(|| format!("unknown credit bracket `{label}`"))?,
            ),
            (None, Some(score)) => {
                let score: u16 = score
                    .trim()
                    .parse()
                    .map_err(|_| format!("credit score `{score}` is not a number"))?;
                Some(
                    engine
                        .partition()
                        .bracket_for(score)
                        .map_err(|err| err.to_string())?,
                )
            }
            (None, None) => None,
        };

        Ok(ApplicantAnswers {
            employment_statuses: parse_statuses(&self.employment_statuses)?,
            is_student: yes_no("is_student", &self.is_student)?,
            rent_responsibility,
            credit_bracket,
            can_provide_extra_deposit: yes_no(
                "can_provide_extra_deposit",
                &self.can_provide_extra_deposit,
            )?,
            ..ApplicantAnswers::default()
        })
    }
}

/// Classify every row of an answer sheet.
pub fn classify_sheet<R, S>(
    reader: R,
    engine: &PrequalEngine<S>,
) -> Result<Vec<SheetResult>, ImportError>
where
    R: Read,
    S: SnapshotStore + 'static,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut results = Vec::new();

    for record in csv_reader.deserialize::<SheetRow>() {
        let row = record?;
        let mut result = SheetResult {
            applicant_id: row.applicant_id.clone(),
            variant: row.variant.clone(),
            employment_type_code: None,
            outcome: None,
            error: None,
        };

        let classified = WorkflowVariant::from_code(&row.variant)
            .ok_or_else(|| format!("unknown workflow variant `{}`", row.variant))
            .and_then(|variant| {
                let answers = row.to_answers(engine)?;
                engine
                    .classify(variant, &answers)
                    .map_err(|err| err.to_string())
            });

        match classified {
            Ok(classification) => {
                result.employment_type_code =
                    Some(classification.employment_type_code.to_string());
                result.outcome = Some(classification.outcome.to_string());
            }
            Err(reason) => {
                tracing::warn!(
                    applicant_id = %row.applicant_id,
                    %reason,
                    "sheet row not classified"
                );
                result.error = Some(reason);
            }
        }
        results.push(result);
    }

    tracing::info!(rows = results.len(), "answer sheet classified");
    Ok(results)
}

pub fn write_sheet_results<W: Write>(
    writer: W,
    results: &[SheetResult],
) -> Result<(), ImportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for result in results {
        csv_writer.serialize(result)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct TableRow {
    variant: WorkflowVariant,
    employment_type_code: String,
    credit_bracket: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    deposit: Option<String>,
    outcome_code: String,
}

pub fn export_table<W: Write>(writer: W, table: &OutcomeTable) -> Result<(), ImportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in table.entries() {
        let (credit, deposit) = match entry.axis_key {
            AxisKey::Credit { credit } => (credit, None),
            AxisKey::CreditDeposit { credit, deposit } => {
                (credit, Some(if deposit { "yes" } else { "no" }.to_string()))
            }
        };
        csv_writer.serialize(TableRow {
            variant: table.variant(),
            employment_type_code: entry.employment_type_code.to_string(),
            credit_bracket: credit.label().to_string(),
            deposit,
            outcome_code: entry.outcome_code.to_string(),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read a table written by [`export_table`] and run the same validation the
/// generated tables go through.
pub fn import_table<R: Read>(
    reader: R,
    variant: WorkflowVariant,
    classifier: &EmploymentClassifier,
) -> Result<OutcomeTable, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();

    for (index, record) in csv_reader.deserialize::<TableRow>().enumerate() {
        let line = index + 2;
        let row = record?;
        if row.variant != variant {
            return Err(ImportError::VariantMismatch {
                expected: variant,
                found: row.variant,
            });
        }

        let credit = CreditBracket::from_label(&row.credit_bracket).ok_or_else(|| {
            ImportError::InvalidRow {
                line,
                detail: format!("unknown credit bracket `{}`", row.credit_bracket),
            }
        })?;
        let axis_key = match row.deposit.as_deref() {
            None => AxisKey::Credit { credit },
            Some(raw) => AxisKey::CreditDeposit {
                credit,
                deposit: parse_yes_no(raw).ok_or_else(|| ImportError::InvalidRow {
                    line,
                    detail: format!("deposit `{raw}` must be yes or no"),
                })?,
            },
        };

        entries.push(OutcomeEntry {
            employment_type_code: EmploymentTypeCode::new(row.employment_type_code),
            axis_key,
            outcome_code: OutcomeCode::new(row.outcome_code),
        });
    }

    let range = STANDARD_LAYOUTS
        .iter()
        .find(|layout| layout.variant == variant)
        .map_or(0..=0, |layout| layout.range());
    let codes = employment_codes_for(variant, classifier)?;
    Ok(OutcomeTable::from_entries(variant, range, codes, entries)?)
}

/// Replace generated tables with the repaired exports found in `dir`, one
/// `<VARIANT>.csv` per variant. Every file is validated before any table is
/// swapped, so a bad file leaves `catalog` untouched.
pub fn load_table_overrides(
    catalog: &mut OutcomeCatalog,
    dir: &Path,
    classifier: &EmploymentClassifier,
) -> Result<Vec<WorkflowVariant>, ImportError> {
    let mut repaired = Vec::new();
    for variant in WorkflowVariant::ALL {
        if !variant.has_credit_axis() {
            continue;
        }
        let path = dir.join(format!("{}.csv", variant.code()));
        if !path.is_file() {
            continue;
        }
        let table = import_table(BufReader::new(File::open(&path)?), variant, classifier)?;
        tracing::info!(%variant, path = %path.display(), "outcome table override loaded");
        repaired.push(table);
    }

    let variants = repaired.iter().map(OutcomeTable::variant).collect();
    for table in repaired {
        catalog.replace(table);
    }
    Ok(variants)
}
