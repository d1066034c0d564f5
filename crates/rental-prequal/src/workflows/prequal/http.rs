use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::answers::{AnswerValue, ApplicantAnswers};
use super::engine::{Classification, CompletionReport, EngineError, PrequalEngine, RoutingOutput};
use super::errors::DomainError;
use super::flags::{derive_flags, FlagSet};
use super::group::GroupContext;
use super::router::CarriedState;
use super::steps::{RunId, StepId, StepView, WorkflowRun};
use super::store::SnapshotStore;
use super::variant::{OutcomeAxis, WorkflowVariant};

#[derive(Debug, Clone, Deserialize)]
pub struct StartRunRequest {
    #[serde(default = "default_variant")]
    pub variant: WorkflowVariant,
    #[serde(default)]
    pub carried_state: Option<CarriedState>,
    /// Resume this run when a snapshot exists.
    #[serde(default)]
    pub run_id: Option<RunId>,
}

fn default_variant() -> WorkflowVariant {
    WorkflowVariant::Gc1
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRequest {
    pub step: StepId,
    pub answer: AnswerValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyRequest {
    pub variant: WorkflowVariant,
    pub answers: ApplicantAnswers,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyResponse {
    #[serde(flatten)]
    pub classification: Classification,
    pub flags: FlagSet,
}

#[derive(Debug, thiserror::Error)]
pub enum PrequalServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("run registry unavailable")]
    Unavailable,
    #[error("answer `{field}` is required to classify {variant}")]
    MissingAnswer {
        variant: WorkflowVariant,
        field: &'static str,
    },
    #[error("{variant} has no outcome table")]
    NotClassifiable { variant: WorkflowVariant },
}

impl From<DomainError> for PrequalServiceError {
    fn from(value: DomainError) -> Self {
        Self::Engine(EngineError::Domain(value))
    }
}

/// Keeps live runs in memory and falls back to the snapshot store on a miss.
pub struct PrequalService<S> {
    engine: PrequalEngine<S>,
    runs: Mutex<HashMap<RunId, WorkflowRun>>,
}

impl ClassifyRequest {
    /// Reject requests that leave out an answer the tables key on, before
    /// they reach the engine.
    fn ensure_complete(&self) -> Result<(), PrequalServiceError> {
        let variant = self.variant;
        if !variant.has_credit_axis() {
            return Err(PrequalServiceError::NotClassifiable { variant });
        }
        let missing = |field| PrequalServiceError::MissingAnswer { variant, field };
        if self.answers.employment_statuses.is_empty() {
            return Err(missing("employment_statuses"));
        }
        if self.answers.is_student.is_none() {
            return Err(missing("is_student"));
        }
        if self.answers.responsibility_for(variant).is_err() {
            return Err(missing("rent_responsibility"));
        }
        let bracket = self.answers.credit_bracket.ok_or_else(|| missing("credit_bracket"))?;
        if matches!(variant.outcome_axis(), OutcomeAxis::CreditAndDeposit)
            && !bracket.is_auto_qualify()
            && self.answers.can_provide_extra_deposit.is_none()
        {
            return Err(missing("can_provide_extra_deposit"));
        }
        Ok(())
    }
}

impl<S> PrequalService<S>
where
    S: SnapshotStore + 'static,
{
    pub fn new(engine: PrequalEngine<S>) -> Self {
        Self {
            engine,
            runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &PrequalEngine<S> {
        &self.engine
    }

    /// Number of runs currently held in memory.
    pub fn live_runs(&self) -> Result<usize, PrequalServiceError> {
        self.runs
            .lock()
            .map(|runs| runs.len())
            .map_err(|_| PrequalServiceError::Unavailable)
    }

    fn with_run<T>(
        &self,
        run_id: &RunId,
        action: impl FnOnce(&PrequalEngine<S>, &mut WorkflowRun) -> Result<T, EngineError>,
    ) -> Result<T, PrequalServiceError> {
        let mut runs = self
            .runs
            .lock()
            .map_err(|_| PrequalServiceError::Unavailable)?;

        if !runs.contains_key(run_id) {
            let run = self
                .engine
                .load(run_id)?
                .ok_or_else(|| EngineError::RunNotFound {
                    run_id: run_id.clone(),
                })?;
            runs.insert(run_id.clone(), run);
        }

        let run = runs.get_mut(run_id).ok_or_else(|| EngineError::RunNotFound {
            run_id: run_id.clone(),
        })?;
        Ok(action(&self.engine, run)?)
    }

    pub fn start(&self, request: StartRunRequest) -> Result<StepView, PrequalServiceError> {
        let run = match &request.run_id {
            Some(run_id) => self.engine.resume(run_id, request.variant)?,
            None => self
                .engine
                .start(request.variant, request.carried_state.as_ref()),
        };
        let view = run.view();
        let mut runs = self
            .runs
            .lock()
            .map_err(|_| PrequalServiceError::Unavailable)?;
        runs.insert(run.run_id().clone(), run);
        Ok(view)
    }

    pub fn view(&self, run_id: &RunId) -> Result<StepView, PrequalServiceError> {
        self.with_run(run_id, |_, run| Ok(run.view()))
    }

    pub fn answer(
        &self,
        run_id: &RunId,
        request: AnswerRequest,
    ) -> Result<StepView, PrequalServiceError> {
        self.with_run(run_id, |engine, run| {
            engine.submit(run, request.step, request.answer)
        })
    }

    pub fn back(&self, run_id: &RunId) -> Result<StepView, PrequalServiceError> {
        self.with_run(run_id, |engine, run| engine.back(run))
    }

    pub fn complete(&self, run_id: &RunId) -> Result<CompletionReport, PrequalServiceError> {
        self.with_run(run_id, |engine, run| engine.complete(run))
    }

    pub fn route(
        &self,
        run_id: &RunId,
        group: &GroupContext,
    ) -> Result<RoutingOutput, PrequalServiceError> {
        let output = self.with_run(run_id, |engine, run| engine.route(run, group))?;
        // Routed runs are finished; later reads come from the snapshot store.
        self.runs
            .lock()
            .map_err(|_| PrequalServiceError::Unavailable)?
            .remove(run_id);
        Ok(output)
    }

    pub fn group_changed(
        &self,
        run_id: &RunId,
        group: &GroupContext,
    ) -> Result<Option<RoutingOutput>, PrequalServiceError> {
        self.with_run(run_id, |engine, run| Ok(engine.group_changed(run, group)))
    }

    pub fn classify(
        &self,
        request: &ClassifyRequest,
    ) -> Result<ClassifyResponse, PrequalServiceError> {
        request.ensure_complete()?;
        let mut answers = request.answers.clone();
        answers.imply_responsibility(request.variant);

        let classification = self.engine.classify(request.variant, &answers)?;
        Ok(ClassifyResponse {
            classification,
            flags: derive_flags(&answers),
        })
    }
}

/// Routes exposing the step machine, completion and routing to a UI.
pub fn prequal_router<S>(service: Arc<PrequalService<S>>) -> Router
where
    S: SnapshotStore + 'static,
{
    Router::new()
        .route("/api/v1/prequal/runs", post(start_handler::<S>))
        .route("/api/v1/prequal/runs/:run_id", get(view_handler::<S>))
        .route("/api/v1/prequal/runs/:run_id/answers", post(answer_handler::<S>))
        .route("/api/v1/prequal/runs/:run_id/back", post(back_handler::<S>))
        .route("/api/v1/prequal/runs/:run_id/complete", post(complete_handler::<S>))
        .route("/api/v1/prequal/runs/:run_id/route", post(route_handler::<S>))
        .route("/api/v1/prequal/runs/:run_id/group", post(group_handler::<S>))
        .route("/api/v1/prequal/classify", post(classify_handler::<S>))
        .with_state(service)
}

fn error_response(error: PrequalServiceError) -> Response {
    let (status, message) = match &error {
        PrequalServiceError::Engine(EngineError::RunNotFound { .. }) => {
            (StatusCode::NOT_FOUND, error.to_string())
        }
        PrequalServiceError::Engine(
            EngineError::NotTerminal { .. } | EngineError::AlreadyComplete { .. },
        ) => (StatusCode::CONFLICT, error.to_string()),
        // Table defects are logged with their full input by the engine.
        PrequalServiceError::Engine(EngineError::Domain(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "unable to process".to_string(),
        ),
        PrequalServiceError::Unavailable => {
            (StatusCode::SERVICE_UNAVAILABLE, error.to_string())
        }
        PrequalServiceError::MissingAnswer { .. } | PrequalServiceError::NotClassifiable { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
    };
    (status, axum::Json(json!({ "error": message }))).into_response()
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, PrequalServiceError>) -> Response {
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn start_handler<S>(
    State(service): State<Arc<PrequalService<S>>>,
    axum::Json(request): axum::Json<StartRunRequest>,
) -> Response
where
    S: SnapshotStore + 'static,
{
    respond(StatusCode::CREATED, service.start(request))
}

pub(crate) async fn view_handler<S>(
    State(service): State<Arc<PrequalService<S>>>,
    Path(run_id): Path<String>,
) -> Response
where
    S: SnapshotStore + 'static,
{
    respond(StatusCode::OK, service.view(&RunId::new(run_id)))
}

pub(crate) async fn answer_handler<S>(
    State(service): State<Arc<PrequalService<S>>>,
    Path(run_id): Path<String>,
    axum::Json(request): axum::Json<AnswerRequest>,
) -> Response
where
    S: SnapshotStore + 'static,
{
    respond(StatusCode::OK, service.answer(&RunId::new(run_id), request))
}

pub(crate) async fn back_handler<S>(
    State(service): State<Arc<PrequalService<S>>>,
    Path(run_id): Path<String>,
) -> Response
where
    S: SnapshotStore + 'static,
{
    respond(StatusCode::OK, service.back(&RunId::new(run_id)))
}

pub(crate) async fn complete_handler<S>(
    State(service): State<Arc<PrequalService<S>>>,
    Path(run_id): Path<String>,
) -> Response
where
    S: SnapshotStore + 'static,
{
    respond(StatusCode::OK, service.complete(&RunId::new(run_id)))
}

pub(crate) async fn route_handler<S>(
    State(service): State<Arc<PrequalService<S>>>,
    Path(run_id): Path<String>,
    axum::Json(group): axum::Json<GroupContext>,
) -> Response
where
    S: SnapshotStore + 'static,
{
    respond(StatusCode::OK, service.route(&RunId::new(run_id), &group))
}

pub(crate) async fn group_handler<S>(
    State(service): State<Arc<PrequalService<S>>>,
    Path(run_id): Path<String>,
    axum::Json(group): axum::Json<GroupContext>,
) -> Response
where
    S: SnapshotStore + 'static,
{
    let result = service
        .group_changed(&RunId::new(run_id), &group)
        .map(|remediation| json!({ "remediation": remediation }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn classify_handler<S>(
    State(service): State<Arc<PrequalService<S>>>,
    axum::Json(request): axum::Json<ClassifyRequest>,
) -> Response
where
    S: SnapshotStore + 'static,
{
    respond(StatusCode::OK, service.classify(&request))
}
