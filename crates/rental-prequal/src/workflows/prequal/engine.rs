use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::answers::{AnswerValue, ApplicantAnswers};
use super::classifier::{
    ClassificationContext, EmploymentClassifier, EmploymentTypeCode, ResponsibilityClass,
};
use super::credit::BracketPartition;
use super::errors::{DomainError, RoutingPreconditionError};
use super::flags::FlagSet;
use super::group::GroupContext;
use super::outcome::{Outcome, OutcomeCatalog, OutcomeQuery};
use super::router::{self, CarriedState, RouteDecision};
use super::steps::{validate_catalog, RunId, StepId, StepView, WorkflowRun};
use super::store::SnapshotStore;
use super::variant::WorkflowVariant;

/// Employment code and outcome for one set of answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub employment_type_code: EmploymentTypeCode,
    pub outcome: Outcome,
}

/// Emitted once a run reaches `COMPLETE`. Code and outcome are absent for
/// group intake runs and for runs that finished by handing off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub run_id: RunId,
    pub variant: WorkflowVariant,
    pub employment_type_code: Option<EmploymentTypeCode>,
    pub outcome: Option<Outcome>,
    pub flags: FlagSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remediation {
    pub variant: WorkflowVariant,
    pub reason: String,
}

impl From<&RoutingPreconditionError> for Remediation {
    fn from(value: &RoutingPreconditionError) -> Self {
        Self {
            variant: value.remediation(),
            reason: value.to_string(),
        }
    }
}

/// What the UI loads next. Everything empty means stay put.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingOutput {
    pub next_variant: Option<WorkflowVariant>,
    pub carried_state: Option<CarriedState>,
    pub remediation: Option<Remediation>,
}

impl RoutingOutput {
    pub fn terminate() -> Self {
        Self::default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("run {run_id} is still on step {step}")]
    NotTerminal { run_id: RunId, step: StepId },
    #[error("run {run_id} is already complete")]
    AlreadyComplete { run_id: RunId },
    #[error("run {run_id} not found")]
    RunNotFound { run_id: RunId },
}

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_run_id() -> RunId {
    let id = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RunId::new(format!("run-{}-{id:06}", Utc::now().format("%Y%m%d%H%M%S")))
}

/// Owns the validated tables and the injected snapshot store. Everything
/// except persistence is a pure computation over the run it is handed.
pub struct PrequalEngine<S> {
    classifier: &'static EmploymentClassifier,
    outcomes: OutcomeCatalog,
    partition: BracketPartition,
    store: Arc<S>,
}

impl<S> PrequalEngine<S>
where
    S: SnapshotStore + 'static,
{
    /// Build with the standard tables, failing fast on any table defect.
    pub fn new(store: Arc<S>) -> Result<Self, DomainError> {
        Self::with_tables(store, OutcomeCatalog::standard()?, BracketPartition::standard())
    }

    pub fn with_tables(
        store: Arc<S>,
        outcomes: OutcomeCatalog,
        partition: BracketPartition,
    ) -> Result<Self, DomainError> {
        validate_catalog()?;
        let classifier = EmploymentClassifier::shared()?;
        Ok(Self {
            classifier,
            outcomes,
            partition,
            store,
        })
    }

    pub fn outcomes(&self) -> &OutcomeCatalog {
        &self.outcomes
    }

    pub fn partition(&self) -> &BracketPartition {
        &self.partition
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Start a fresh run, optionally seeded from a routing decision.
    pub fn start(&self, variant: WorkflowVariant, carried: Option<&CarriedState>) -> WorkflowRun {
        let run = match carried {
            Some(state) => WorkflowRun::seeded(
                next_run_id(),
                variant,
                state.seed_answers(),
                state.flags.clone(),
            ),
            None => WorkflowRun::start(next_run_id(), variant),
        };
        tracing::info!(run_id = %run.run_id(), %variant, "workflow run started");
        self.persist(&run);
        run
    }

    /// Start the run a routing decision points at, if any.
    pub fn start_next(&self, output: &RoutingOutput) -> Option<WorkflowRun> {
        output
            .next_variant
            .map(|variant| self.start(variant, output.carried_state.as_ref()))
    }

    /// Load a stored run. Unreadable snapshots are logged and treated as absent.
    pub fn load(&self, run_id: &RunId) -> Result<Option<WorkflowRun>, EngineError> {
        let snapshot = match self.store.load(run_id) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(%run_id, error = %err, "snapshot load failed");
                None
            }
        };
        match snapshot {
            Some(snapshot) => Ok(Some(WorkflowRun::restore(snapshot)?)),
            None => Ok(None),
        }
    }

    /// Continue a stored run, or start `variant` afresh under the same id when
    /// nothing was stored.
    pub fn resume(
        &self,
        run_id: &RunId,
        variant: WorkflowVariant,
    ) -> Result<WorkflowRun, EngineError> {
        match self.load(run_id)? {
            Some(run) => Ok(run),
            None => {
                tracing::debug!(%run_id, %variant, "no snapshot found, starting fresh");
                let run = WorkflowRun::start(run_id.clone(), variant);
                self.persist(&run);
                Ok(run)
            }
        }
    }

    pub fn submit(
        &self,
        run: &mut WorkflowRun,
        step: StepId,
        value: AnswerValue,
    ) -> Result<StepView, EngineError> {
        if run.is_terminal() {
            return Err(EngineError::AlreadyComplete {
                run_id: run.run_id().clone(),
            });
        }

        let view = run.submit(step, value, &self.partition).map_err(|err| {
            tracing::error!(
                run_id = %run.run_id(),
                variant = %run.variant(),
                %step,
                answers = ?run.answers(),
                error = %err,
                "answer could not be processed"
            );
            err
        })?;

        if view.validation_error.is_none() {
            self.persist(run);
        }
        Ok(view)
    }

    pub fn back(&self, run: &mut WorkflowRun) -> Result<StepView, EngineError> {
        if run.is_terminal() {
            return Err(EngineError::AlreadyComplete {
                run_id: run.run_id().clone(),
            });
        }
        let view = run.back();
        self.persist(run);
        Ok(view)
    }

    /// Classify arbitrary answers against `variant`'s tables.
    pub fn classify(
        &self,
        variant: WorkflowVariant,
        answers: &ApplicantAnswers,
    ) -> Result<Classification, DomainError> {
        self.try_classify(variant, answers).map_err(|err| {
            tracing::error!(
                %variant,
                statuses = %answers.employment_statuses,
                is_student = ?answers.is_student,
                responsibility = ?answers.rent_responsibility,
                credit = ?answers.credit_bracket,
                deposit = ?answers.can_provide_extra_deposit,
                error = %err,
                "classification failed"
            );
            err
        })
    }

    fn try_classify(
        &self,
        variant: WorkflowVariant,
        answers: &ApplicantAnswers,
    ) -> Result<Classification, DomainError> {
        let responsibility = answers.responsibility_for(variant)?;
        let context = ClassificationContext {
            is_student: answers.require_student()?,
            responsibility_class: ResponsibilityClass::for_variant(variant, responsibility)?,
        };
        let code = self
            .classifier
            .classify(answers.employment_statuses, context)?;

        let query = OutcomeQuery {
            credit: answers.require_credit_bracket()?,
            deposit: answers.can_provide_extra_deposit,
        };
        let outcome = self.outcomes.resolve(variant, &code, query)?;

        Ok(Classification {
            employment_type_code: code,
            outcome,
        })
    }

    /// Produce the completion report for a finished run.
    pub fn complete(&self, run: &WorkflowRun) -> Result<CompletionReport, EngineError> {
        if !run.is_terminal() {
            return Err(EngineError::NotTerminal {
                run_id: run.run_id().clone(),
                step: run.current_step(),
            });
        }

        let classified = run.variant().has_credit_axis()
            && run.history().contains(&StepId::CreditBracket);
        let (employment_type_code, outcome) = if classified {
            let classification = self.classify(run.variant(), run.answers()).map_err(|err| {
                tracing::error!(run_id = %run.run_id(), "completion failed");
                err
            })?;
            (
                Some(classification.employment_type_code),
                Some(classification.outcome),
            )
        } else {
            (None, None)
        };

        let report = CompletionReport {
            run_id: run.run_id().clone(),
            variant: run.variant(),
            employment_type_code,
            outcome,
            flags: run.flags(),
        };
        tracing::info!(
            run_id = %report.run_id,
            variant = %report.variant,
            outcome = ?report.outcome,
            "workflow run completed"
        );
        Ok(report)
    }

    /// Decide the next variant for a finished run. Precondition failures
    /// become a remediation output instead of an error.
    pub fn route(
        &self,
        run: &WorkflowRun,
        group: &GroupContext,
    ) -> Result<RoutingOutput, EngineError> {
        if !run.is_terminal() {
            return Err(EngineError::NotTerminal {
                run_id: run.run_id().clone(),
                step: run.current_step(),
            });
        }

        let flags = run.flags();
        let output = match router::route(run.variant(), &flags, group) {
            Ok(RouteDecision::Next(next)) => {
                let transition = router::transition_flag(run.variant(), next);
                RoutingOutput {
                    next_variant: Some(next),
                    carried_state: Some(CarriedState::capture(run.answers(), &flags, transition)),
                    remediation: None,
                }
            }
            Ok(RouteDecision::Terminate) => RoutingOutput::terminate(),
            Err(err) => {
                tracing::warn!(run_id = %run.run_id(), error = %err, "routing precondition failed");
                self.remediate(&err, run.answers(), &flags)
            }
        };
        Ok(output)
    }

    /// Re-check the leaseholder precondition after a membership change.
    /// Returns the remediation to show, if any.
    pub fn group_changed(&self, run: &WorkflowRun, group: &GroupContext) -> Option<RoutingOutput> {
        if run.variant() == WorkflowVariant::Gc5 {
            return None;
        }
        let group_state = group.group.as_ref()?;
        match group_state.ensure_leaseholder() {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(
                    run_id = %run.run_id(),
                    group_id = %group_state.group_id,
                    "group lost its last leaseholder"
                );
                Some(self.remediate(&err, run.answers(), &run.flags()))
            }
        }
    }

    fn remediate(
        &self,
        err: &RoutingPreconditionError,
        answers: &ApplicantAnswers,
        flags: &FlagSet,
    ) -> RoutingOutput {
        RoutingOutput {
            next_variant: Some(err.remediation()),
            carried_state: Some(CarriedState::capture(answers, flags, None)),
            remediation: Some(Remediation::from(err)),
        }
    }

    fn persist(&self, run: &WorkflowRun) {
        if let Err(err) = self.store.save(&run.snapshot(Utc::now())) {
            tracing::warn!(run_id = %run.run_id(), error = %err, "snapshot save failed");
        }
    }
}
