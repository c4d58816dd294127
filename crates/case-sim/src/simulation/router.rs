use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::dialogue::DialogueGenerator;
use super::domain::{
    Case, CaseId, DisorderId, GameMode, LifeAspect, Patient, SymptomId, TestId, TreatmentId,
};
use super::lifecycle::CaseError;
use super::repository::{CaseRepository, CaseView, RepositoryError, ResolutionView};
use super::service::{CaseService, CaseServiceError};

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub patient: Patient,
    pub mode: GameMode,
}

#[derive(Debug, Deserialize)]
pub struct SymptomRequest {
    pub symptom_id: SymptomId,
}

#[derive(Debug, Deserialize)]
pub struct DiagnosisRequest {
    pub disorder_id: DisorderId,
}

#[derive(Debug, Deserialize)]
pub struct TreatmentRequest {
    pub treatment_id: TreatmentId,
}

#[derive(Debug, Deserialize)]
pub struct LifeAspectRequest {
    pub aspect: LifeAspect,
}

#[derive(Debug, Deserialize)]
pub struct TestRequest {
    pub test_id: TestId,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

/// Router builder exposing the case lifecycle over HTTP.
pub fn case_router<R, D>(service: Arc<CaseService<R, D>>) -> Router
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    Router::new()
        .route("/api/v1/cases", post(intake_handler::<R, D>))
        .route("/api/v1/cases/:case_id", get(case_handler::<R, D>))
        .route(
            "/api/v1/cases/:case_id/activate",
            post(activate_handler::<R, D>),
        )
        .route(
            "/api/v1/cases/:case_id/symptoms",
            post(symptom_handler::<R, D>),
        )
        .route(
            "/api/v1/cases/:case_id/hypotheses",
            get(hypotheses_handler::<R, D>),
        )
        .route(
            "/api/v1/cases/:case_id/diagnosis",
            post(diagnosis_handler::<R, D>),
        )
        .route(
            "/api/v1/cases/:case_id/treatment",
            post(treatment_handler::<R, D>),
        )
        .route(
            "/api/v1/cases/:case_id/treatment/resolve",
            post(resolve_handler::<R, D>),
        )
        .route("/api/v1/cases/:case_id/cancel", post(cancel_handler::<R, D>))
        .route(
            "/api/v1/cases/:case_id/life-aspects",
            post(life_aspect_handler::<R, D>),
        )
        .route("/api/v1/cases/:case_id/tests", post(test_handler::<R, D>))
        .route(
            "/api/v1/cases/:case_id/sessions",
            post(session_handler::<R, D>),
        )
        .route(
            "/api/v1/cases/:case_id/messages",
            post(message_handler::<R, D>),
        )
        .with_state(service)
}

type Service<R, D> = State<Arc<CaseService<R, D>>>;

pub(crate) async fn intake_handler<R, D>(
    State(service): Service<R, D>,
    Json(request): Json<IntakeRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    match service.intake(request.patient, request.mode) {
        Ok(case) => (StatusCode::CREATED, Json(CaseView::from_case(&case))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn case_handler<R, D>(
    State(service): Service<R, D>,
    Path(case_id): Path<String>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    view_response(service.get(&CaseId(case_id)))
}

pub(crate) async fn activate_handler<R, D>(
    State(service): Service<R, D>,
    Path(case_id): Path<String>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    view_response(service.activate(&CaseId(case_id)))
}

pub(crate) async fn symptom_handler<R, D>(
    State(service): Service<R, D>,
    Path(case_id): Path<String>,
    Json(request): Json<SymptomRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    match service.record_symptom(&CaseId(case_id), request.symptom_id) {
        Ok(toggle) => (StatusCode::OK, Json(toggle)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn hypotheses_handler<R, D>(
    State(service): Service<R, D>,
    Path(case_id): Path<String>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    let id = CaseId(case_id);
    match service.hypotheses(&id) {
        Ok(hypotheses) => {
            let payload = json!({
                "case_id": id,
                "hypotheses": hypotheses,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn diagnosis_handler<R, D>(
    State(service): Service<R, D>,
    Path(case_id): Path<String>,
    Json(request): Json<DiagnosisRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    view_response(service.submit_diagnosis(&CaseId(case_id), request.disorder_id))
}

pub(crate) async fn treatment_handler<R, D>(
    State(service): Service<R, D>,
    Path(case_id): Path<String>,
    Json(request): Json<TreatmentRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    match service.submit_treatment(&CaseId(case_id), request.treatment_id) {
        Ok(case) => (StatusCode::ACCEPTED, Json(CaseView::from_case(&case))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn resolve_handler<R, D>(
    State(service): Service<R, D>,
    Path(case_id): Path<String>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    match service.resolve_treatment(&CaseId(case_id)) {
        Ok(resolution) => {
            (StatusCode::OK, Json(ResolutionView::from_resolution(&resolution))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler<R, D>(
    State(service): Service<R, D>,
    Path(case_id): Path<String>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    view_response(service.cancel(&CaseId(case_id)))
}

pub(crate) async fn life_aspect_handler<R, D>(
    State(service): Service<R, D>,
    Path(case_id): Path<String>,
    Json(request): Json<LifeAspectRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    view_response(service.record_life_aspect(&CaseId(case_id), request.aspect))
}

pub(crate) async fn test_handler<R, D>(
    State(service): Service<R, D>,
    Path(case_id): Path<String>,
    Json(request): Json<TestRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    match service.apply_test(&CaseId(case_id), request.test_id) {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn session_handler<R, D>(
    State(service): Service<R, D>,
    Path(case_id): Path<String>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    view_response(service.resume_session(&CaseId(case_id)))
}

pub(crate) async fn message_handler<R, D>(
    State(service): Service<R, D>,
    Path(case_id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Response
where
    R: CaseRepository + 'static,
    D: DialogueGenerator + 'static,
{
    match service.ask(&CaseId(case_id), &request.text).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

fn view_response(result: Result<Case, CaseServiceError>) -> Response {
    match result {
        Ok(case) => (StatusCode::OK, Json(CaseView::from_case(&case))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_response(error: CaseServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });

    let status = match &error {
        CaseServiceError::Case(CaseError::NotReady { remaining_secs }) => {
            let payload = json!({
                "error": error.to_string(),
                "retry_after_secs": remaining_secs,
            });
            return (
                too_early(),
                [(header::RETRY_AFTER, remaining_secs.to_string())],
                Json(payload),
            )
                .into_response();
        }
        CaseServiceError::Case(
            CaseError::InvalidState { .. }
            | CaseError::AlreadyDiagnosed
            | CaseError::AttemptsExhausted
            | CaseError::TestsExhausted { .. }
            | CaseError::TestAlreadyApplied(_),
        ) => StatusCode::CONFLICT,
        CaseServiceError::Case(
            CaseError::UnknownSymptom(_)
            | CaseError::UnknownDisorder(_)
            | CaseError::UnknownTreatment(_)
            | CaseError::UnknownTest(_)
            | CaseError::RawScoreOutOfRange { .. },
        ) => StatusCode::UNPROCESSABLE_ENTITY,
        CaseServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        CaseServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        CaseServiceError::Case(CaseError::Catalog(_))
        | CaseServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, Json(payload)).into_response()
}

fn too_early() -> StatusCode {
    StatusCode::from_u16(425).unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
}
