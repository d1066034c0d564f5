use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::steps_for;
use super::{Branch, StepDefinition, StepId, Transition};
use crate::workflows::prequal::answers::{AnswerValue, ApplicantAnswers};
use crate::workflows::prequal::credit::BracketPartition;
use crate::workflows::prequal::errors::{AnswerRejection, DomainError, ValidationError};
use crate::workflows::prequal::flags::{derive_flags, FlagSet};
use crate::workflows::prequal::store::RunSnapshot;
use crate::workflows::prequal::variant::WorkflowVariant;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the UI renders after every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepView {
    pub run_id: RunId,
    pub variant: WorkflowVariant,
    pub current_step: StepId,
    pub question: Option<String>,
    pub is_terminal: bool,
    pub validation_error: Option<String>,
}

/// One applicant's walk through one variant's questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    run_id: RunId,
    variant: WorkflowVariant,
    current_step: StepId,
    history: Vec<StepId>,
    answers: ApplicantAnswers,
    carried_flags: FlagSet,
}

impl WorkflowRun {
    pub fn start(run_id: RunId, variant: WorkflowVariant) -> Self {
        Self::seeded(run_id, variant, ApplicantAnswers::default(), FlagSet::new())
    }

    /// Start with answers and flags carried over from a previous variant.
    pub fn seeded(
        run_id: RunId,
        variant: WorkflowVariant,
        mut answers: ApplicantAnswers,
        carried_flags: FlagSet,
    ) -> Self {
        answers.imply_responsibility(variant);
        let current_step = steps_for(variant)
            .first()
            .map_or(StepId::Complete, |step| step.id);
        Self {
            run_id,
            variant,
            current_step,
            history: Vec::new(),
            answers,
            carried_flags,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn variant(&self) -> WorkflowVariant {
        self.variant
    }

    pub fn current_step(&self) -> StepId {
        self.current_step
    }

    pub fn history(&self) -> &[StepId] {
        &self.history
    }

    pub fn answers(&self) -> &ApplicantAnswers {
        &self.answers
    }

    pub fn carried_flags(&self) -> &FlagSet {
        &self.carried_flags
    }

    /// Flags derived from the committed answers plus anything carried in.
    pub fn flags(&self) -> FlagSet {
        derive_flags(&self.answers).union(&self.carried_flags)
    }

    pub fn is_terminal(&self) -> bool {
        self.current_step.is_terminal()
    }

    pub fn view(&self) -> StepView {
        self.view_with(None)
    }

    fn view_with(&self, error: Option<ValidationError>) -> StepView {
        let question = self
            .definition()
            .map(|(_, step)| step.question.to_string());
        StepView {
            run_id: self.run_id.clone(),
            variant: self.variant,
            current_step: self.current_step,
            question,
            is_terminal: self.is_terminal(),
            validation_error: error.map(|err| err.message),
        }
    }

    fn definition(&self) -> Option<(usize, &'static StepDefinition)> {
        steps_for(self.variant)
            .iter()
            .enumerate()
            .find(|(_, step)| step.id == self.current_step)
    }

    /// Apply one answer event. Invalid answers come back in the view and leave
    /// the run untouched; table defects are returned as errors.
    pub fn submit(
        &mut self,
        step: StepId,
        value: AnswerValue,
        partition: &BracketPartition,
    ) -> Result<StepView, DomainError> {
        if self.is_terminal() {
            let error = ValidationError::new(step, "this workflow is already complete");
            return Ok(self.view_with(Some(error)));
        }
        if step != self.current_step {
            let error = ValidationError::new(
                step,
                format!("expected an answer for {}", self.current_step),
            );
            return Ok(self.view_with(Some(error)));
        }

        let (index, definition) = self.definition().ok_or(DomainError::UndefinedTransition {
            variant: self.variant,
            step,
        })?;

        let mut candidate = self.answers.clone();
        match candidate.apply(step, value, partition) {
            Ok(()) => {}
            Err(AnswerRejection::Invalid(error)) => return Ok(self.view_with(Some(error))),
            Err(AnswerRejection::Domain(error)) => return Err(error),
        }
        if let Err(error) = (definition.validate)(&candidate) {
            return Ok(self.view_with(Some(error)));
        }

        let flags = derive_flags(&candidate).union(&self.carried_flags);
        let next = self.successor(index, definition, &candidate, &flags)?;

        self.answers = candidate;
        self.history.push(step);
        self.current_step = next;
        if next.is_terminal() {
            self.prune();
        }

        Ok(self.view())
    }

    fn successor(
        &self,
        index: usize,
        definition: &StepDefinition,
        answers: &ApplicantAnswers,
        flags: &FlagSet,
    ) -> Result<StepId, DomainError> {
        let undefined = DomainError::UndefinedTransition {
            variant: self.variant,
            step: definition.id,
        };
        let branch = match definition.transition {
            Transition::Next => Branch::Continue,
            Transition::Branch { decide, targets } => {
                let branch = decide(answers, flags)?;
                if let Branch::SkipTo(target) = branch {
                    if !targets.contains(&target) {
                        return Err(undefined);
                    }
                }
                branch
            }
        };

        let remaining = &steps_for(self.variant)[index + 1..];
        match branch {
            Branch::Continue => Ok(remaining.first().map_or(StepId::Complete, |step| step.id)),
            Branch::SkipTo(target) => remaining
                .iter()
                .find(|step| step.id == target)
                .map(|step| step.id)
                .ok_or(undefined),
            Branch::Complete => Ok(StepId::Complete),
        }
    }

    /// Drop answers owned by this variant's steps that the final path never
    /// visited, so abandoned branches leave nothing behind.
    fn prune(&mut self) {
        let visited: HashSet<StepId> = self.history.iter().copied().collect();
        for step in steps_for(self.variant) {
            if !visited.contains(&step.id) {
                self.answers.clear(step.id);
            }
        }
    }

    /// Re-enter the previously answered step. Answers stay as they are and
    /// flags are recomputed from them on demand.
    pub fn back(&mut self) -> StepView {
        if self.is_terminal() {
            let error = ValidationError::new(StepId::Complete, "this workflow is already complete");
            return self.view_with(Some(error));
        }
        if let Some(previous) = self.history.pop() {
            self.current_step = previous;
        }
        self.view()
    }

    pub fn snapshot(&self, saved_at: DateTime<Utc>) -> RunSnapshot {
        RunSnapshot {
            run_id: self.run_id.clone(),
            variant: self.variant,
            current_step: self.current_step,
            history: self.history.clone(),
            answers: self.answers.clone(),
            flags: self.flags(),
            carried_flags: self.carried_flags.clone(),
            saved_at,
        }
    }

    /// Rebuild a run from a stored snapshot. Steps that no longer exist in the
    /// variant's list are rejected rather than guessed.
    pub fn restore(snapshot: RunSnapshot) -> Result<Self, DomainError> {
        let steps = steps_for(snapshot.variant);
        let known = |id: StepId| steps.iter().any(|step| step.id == id);

        for step in snapshot.history.iter().chain([&snapshot.current_step]) {
            if !step.is_terminal() && !known(*step) {
                return Err(DomainError::UndefinedTransition {
                    variant: snapshot.variant,
                    step: *step,
                });
            }
        }

        let mut answers = snapshot.answers;
        answers.imply_responsibility(snapshot.variant);

        Ok(Self {
            run_id: snapshot.run_id,
            variant: snapshot.variant,
            current_step: snapshot.current_step,
            history: snapshot.history,
            answers,
            carried_flags: snapshot.carried_flags,
        })
    }
}
