use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{PenyaId, ProvaId, Season};
use super::lifecycle::LifecycleError;
use super::repository::{CircuitRepository, RepositoryError};
use super::roster::NewPenya;
use super::service::{CircuitService, CircuitServiceError, NewProva, PenyaUpdate, ResultUpdate};

/// Router builder exposing the admin and public circuit endpoints.
pub fn circuit_router<R>(service: Arc<CircuitService<R>>) -> Router
where
    R: CircuitRepository + 'static,
{
    Router::new()
        .route("/api/v1/seasons", get(seasons_handler::<R>))
        .route(
            "/api/v1/seasons/:year/standings",
            get(standings_handler::<R>),
        )
        .route("/api/v1/seasons/:year/penyes", post(add_penyes_handler::<R>))
        .route(
            "/api/v1/seasons/:year/penyes/import",
            post(import_roster_handler::<R>),
        )
        .route(
            "/api/v1/seasons/:year/penyes/:penya_id",
            get(penya_summary_handler::<R>).put(update_penya_handler::<R>),
        )
        .route(
            "/api/v1/seasons/:year/proves",
            get(proves_handler::<R>).post(create_prova_handler::<R>),
        )
        .route(
            "/api/v1/seasons/:year/proves/:prova_id",
            get(prova_handler::<R>),
        )
        .route(
            "/api/v1/seasons/:year/proves/:prova_id/participants/:penya_id",
            put(record_result_handler::<R>),
        )
        .route(
            "/api/v1/seasons/:year/proves/:prova_id/close",
            post(close_handler::<R>),
        )
        .route(
            "/api/v1/seasons/:year/proves/:prova_id/reopen",
            post(reopen_handler::<R>),
        )
        .with_state(service)
}

/// Roster entries may be posted as bare names or as full records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PenyaInput {
    Name(String),
    Record(NewPenya),
}

impl From<PenyaInput> for NewPenya {
    fn from(input: PenyaInput) -> Self {
        match input {
            PenyaInput::Name(name) => NewPenya::named(name),
            PenyaInput::Record(record) => record,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CloseRequest {
    #[serde(default)]
    pub force: bool,
}

pub(crate) async fn seasons_handler<R>(State(service): State<Arc<CircuitService<R>>>) -> Response
where
    R: CircuitRepository + 'static,
{
    match service.seasons() {
        Ok(seasons) => (StatusCode::OK, axum::Json(json!({ "seasons": seasons }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn standings_handler<R>(
    State(service): State<Arc<CircuitService<R>>>,
    Path(year): Path<i32>,
) -> Response
where
    R: CircuitRepository + 'static,
{
    match service.standings(Season(year)) {
        Ok(standings) => {
            let rows: Vec<_> = standings.iter().map(|row| row.public_view()).collect();
            (StatusCode::OK, axum::Json(rows)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_penyes_handler<R>(
    State(service): State<Arc<CircuitService<R>>>,
    Path(year): Path<i32>,
    axum::Json(penyes): axum::Json<Vec<PenyaInput>>,
) -> Response
where
    R: CircuitRepository + 'static,
{
    let penyes = penyes.into_iter().map(NewPenya::from).collect();
    match service.add_penyes(Season(year), penyes) {
        Ok(added) => (StatusCode::OK, axum::Json(json!({ "added": added }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn import_roster_handler<R>(
    State(service): State<Arc<CircuitService<R>>>,
    Path(year): Path<i32>,
    body: String,
) -> Response
where
    R: CircuitRepository + 'static,
{
    match service.import_roster(Season(year), body.as_bytes()) {
        Ok(added) => (StatusCode::OK, axum::Json(json!({ "added": added }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_penya_handler<R>(
    State(service): State<Arc<CircuitService<R>>>,
    Path((year, penya_id)): Path<(i32, String)>,
    axum::Json(update): axum::Json<PenyaUpdate>,
) -> Response
where
    R: CircuitRepository + 'static,
{
    match service.update_penya(Season(year), &PenyaId(penya_id), update) {
        Ok(penya) => (StatusCode::OK, axum::Json(penya)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn penya_summary_handler<R>(
    State(service): State<Arc<CircuitService<R>>>,
    Path((year, penya_id)): Path<(i32, String)>,
) -> Response
where
    R: CircuitRepository + 'static,
{
    match service.penya_summary(Season(year), &PenyaId(penya_id)) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary.public_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn proves_handler<R>(
    State(service): State<Arc<CircuitService<R>>>,
    Path(year): Path<i32>,
) -> Response
where
    R: CircuitRepository + 'static,
{
    match service.proves(Season(year)) {
        Ok(proves) => {
            let proves: Vec<_> = proves.into_iter().map(|prova| prova.public_view()).collect();
            (StatusCode::OK, axum::Json(proves)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_prova_handler<R>(
    State(service): State<Arc<CircuitService<R>>>,
    Path(year): Path<i32>,
    axum::Json(new_prova): axum::Json<NewProva>,
) -> Response
where
    R: CircuitRepository + 'static,
{
    match service.create_prova(Season(year), new_prova) {
        Ok(prova) => (StatusCode::CREATED, axum::Json(prova)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn prova_handler<R>(
    State(service): State<Arc<CircuitService<R>>>,
    Path((year, prova_id)): Path<(i32, String)>,
) -> Response
where
    R: CircuitRepository + 'static,
{
    match service.prova_view(Season(year), &ProvaId(prova_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view.public_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_result_handler<R>(
    State(service): State<Arc<CircuitService<R>>>,
    Path((year, prova_id, penya_id)): Path<(i32, String, String)>,
    axum::Json(update): axum::Json<ResultUpdate>,
) -> Response
where
    R: CircuitRepository + 'static,
{
    match service.record_result(Season(year), &ProvaId(prova_id), &PenyaId(penya_id), update) {
        Ok(entry) => (StatusCode::OK, axum::Json(entry)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn close_handler<R>(
    State(service): State<Arc<CircuitService<R>>>,
    Path((year, prova_id)): Path<(i32, String)>,
    axum::Json(request): axum::Json<CloseRequest>,
) -> Response
where
    R: CircuitRepository + 'static,
{
    match service.close_prova(Season(year), &ProvaId(prova_id), request.force) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reopen_handler<R>(
    State(service): State<Arc<CircuitService<R>>>,
    Path((year, prova_id)): Path<(i32, String)>,
) -> Response
where
    R: CircuitRepository + 'static,
{
    match service.reopen_prova(Season(year), &ProvaId(prova_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

/// HTTP status for a service failure.
pub(crate) fn status_for(error: &CircuitServiceError) -> StatusCode {
    match error {
        CircuitServiceError::Validation(_)
        | CircuitServiceError::Ranking(_)
        | CircuitServiceError::Roster(_)
        | CircuitServiceError::Lifecycle(LifecycleError::Ranking(_)) => StatusCode::BAD_REQUEST,
        CircuitServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        CircuitServiceError::Repository(RepositoryError::Conflict)
        | CircuitServiceError::Lifecycle(_) => StatusCode::CONFLICT,
        CircuitServiceError::Repository(RepositoryError::Unavailable(_))
        | CircuitServiceError::TrackerPoisoned(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(error: CircuitServiceError) -> Response {
    let status = status_for(&error);
    let payload = match &error {
        CircuitServiceError::Lifecycle(LifecycleError::IncompleteResults { missing, .. }) => {
            json!({
                "error": error.to_string(),
                "missing": missing,
            })
        }
        _ => json!({
            "error": error.to_string(),
        }),
    };
    (status, axum::Json(payload)).into_response()
}
