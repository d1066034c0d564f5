use crate::demo::{run_demo, DemoArgs};
use crate::infra::{
    ensure_parent, outcome_catalog, parse_bracket, parse_responsibility, parse_status,
    parse_variant, parse_yes_no,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use rental_prequal::config::TablesConfig;
use rental_prequal::error::AppError;
use rental_prequal::workflows::prequal::steps::validate_catalog;
use rental_prequal::workflows::prequal::{
    classify_sheet, derive_flags, export_table, import_table, write_sheet_results,
    ApplicantAnswers, CreditBracket, EmploymentClassifier, EmploymentStatus, InMemorySnapshotStore,
    PrequalEngine, RentResponsibility, WorkflowVariant,
};
use serde_json::json;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "Rental Prequalification Engine",
    about = "Classify rental applicants and route them through the prequalification workflows",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Classify a single applicant and print the employment code and outcome
    Classify(ClassifyArgs),
    /// Classify every row of an answer sheet CSV
    ClassifySheet(ClassifySheetArgs),
    /// Inspect, export or re-check the outcome tables
    Tables {
        #[command(subcommand)]
        command: TablesCommand,
    },
    /// Walk a scripted group through several chained workflow variants
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum TablesCommand {
    /// Build and validate every table, with repaired exports applied
    Check(TablesCheckArgs),
    /// Write one variant's outcome table as CSV
    Export(TablesExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Workflow variant whose outcome table is consulted (e.g. LS1, NLS2, CSG3)
    #[arg(long, value_parser = parse_variant)]
    pub(crate) variant: WorkflowVariant,
    /// Comma-separated employment statuses (retired, unemployed, full_time, part_time, self_employed)
    #[arg(long, value_delimiter = ',', required = true, value_parser = parse_status)]
    pub(crate) statuses: Vec<EmploymentStatus>,
    /// The applicant is a student
    #[arg(long)]
    pub(crate) student: bool,
    /// Share of rent the applicant pays (full, partial, none)
    #[arg(long, value_parser = parse_responsibility)]
    pub(crate) responsibility: Option<RentResponsibility>,
    /// Self-reported credit bracket label (e.g. 760-900, unknown)
    #[arg(long, value_parser = parse_bracket, conflicts_with = "score")]
    pub(crate) credit: Option<CreditBracket>,
    /// Numeric credit score, mapped onto a bracket
    #[arg(long)]
    pub(crate) score: Option<u16>,
    /// Whether an extra deposit can be provided (yes/no)
    #[arg(long, value_parser = parse_yes_no)]
    pub(crate) deposit: Option<bool>,
}

#[derive(Args, Debug)]
pub(crate) struct ClassifySheetArgs {
    /// Answer sheet with one applicant per row
    pub(crate) sheet: PathBuf,
    /// Write results here instead of stdout
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct TablesCheckArgs {
    /// Directory of repaired `<VARIANT>.csv` exports to apply before checking
    #[arg(long, conflicts_with = "file")]
    pub(crate) dir: Option<PathBuf>,
    /// Single exported table to validate
    #[arg(long, requires = "variant")]
    pub(crate) file: Option<PathBuf>,
    /// Variant the exported table belongs to
    #[arg(long, value_parser = parse_variant)]
    pub(crate) variant: Option<WorkflowVariant>,
}

#[derive(Args, Debug)]
pub(crate) struct TablesExportArgs {
    #[arg(long, value_parser = parse_variant)]
    pub(crate) variant: WorkflowVariant,
    /// Write the table here instead of stdout
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Classify(args) => run_classify(args),
        Command::ClassifySheet(args) => run_classify_sheet(args),
        Command::Tables {
            command: TablesCommand::Check(args),
        } => run_tables_check(args),
        Command::Tables {
            command: TablesCommand::Export(args),
        } => run_tables_export(args),
        Command::Demo(args) => run_demo(args),
    }
}

/// Offline commands never persist runs.
fn offline_engine() -> Result<PrequalEngine<InMemorySnapshotStore>, AppError> {
    Ok(PrequalEngine::new(Arc::new(InMemorySnapshotStore::new()))?)
}

fn output_writer(out: Option<&PathBuf>) -> Result<Box<dyn Write>, AppError> {
    match out {
        Some(path) => {
            ensure_parent(path)?;
            Ok(Box::new(File::create(path)?))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let engine = offline_engine()?;
    let credit_bracket = match (args.credit, args.score) {
        (Some(bracket), _) => Some(bracket),
        (None, Some(score)) => Some(engine.partition().bracket_for(score)?),
        (None, None) => None,
    };

    let mut answers = ApplicantAnswers {
        employment_statuses: args.statuses.into_iter().collect(),
        is_student: Some(args.student),
        rent_responsibility: args.responsibility,
        credit_bracket,
        can_provide_extra_deposit: args.deposit,
        ..ApplicantAnswers::default()
    };
    answers.imply_responsibility(args.variant);

    let classification = engine.classify(args.variant, &answers)?;
    let flags = derive_flags(&answers);
    let payload = json!({
        "variant": args.variant,
        "employment_type_code": classification.employment_type_code,
        "outcome": classification.outcome,
        "flags": flags.iter().collect::<Vec<_>>(),
    });

    match serde_json::to_string_pretty(&payload) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => println!("classification rendered without formatting ({err}): {payload}"),
    }
    Ok(())
}

pub(crate) fn run_classify_sheet(args: ClassifySheetArgs) -> Result<(), AppError> {
    let engine = offline_engine()?;
    let reader = BufReader::new(File::open(&args.sheet)?);
    let results = classify_sheet(reader, &engine)?;

    let failed = results.iter().filter(|row| row.error.is_some()).count();
    write_sheet_results(output_writer(args.out.as_ref())?, &results)?;
    eprintln!(
        "{} rows classified, {} rows need attention",
        results.len() - failed,
        failed
    );
    Ok(())
}

pub(crate) fn run_tables_check(args: TablesCheckArgs) -> Result<(), AppError> {
    if let (Some(path), Some(variant)) = (args.file.as_ref(), args.variant) {
        let classifier = EmploymentClassifier::shared()?;
        let table = import_table(BufReader::new(File::open(path)?), variant, classifier)?;
        println!(
            "{}: {} entries validated from {}",
            table.variant(),
            table.entries().len(),
            path.display()
        );
        return Ok(());
    }

    validate_catalog()?;
    let catalog = outcome_catalog(&TablesConfig {
        override_dir: args.dir.clone(),
    })?;
    println!("Outcome tables");
    for table in catalog.tables() {
        println!(
            "- {:<4} {:>5}..={:<5} {:>3} codes {:>4} entries ({:?})",
            table.variant().code(),
            table.range().start(),
            table.range().end(),
            table.employment_codes().len(),
            table.entries().len(),
            table.axis()
        );
    }
    println!("Step catalog and all outcome tables are total and unambiguous.");
    Ok(())
}

pub(crate) fn run_tables_export(args: TablesExportArgs) -> Result<(), AppError> {
    let engine = offline_engine()?;
    let table = engine.outcomes().table(args.variant)?;
    export_table(output_writer(args.out.as_ref())?, table)?;
    if let Some(path) = &args.out {
        eprintln!("{} table written to {}", args.variant, path.display());
    }
    Ok(())
}
