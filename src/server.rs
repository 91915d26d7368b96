use std::net::SocketAddr;

use anyhow::Result;
use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json};
use axum::routing::{get, patch, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::backend::BackendClient;
use crate::config::AppConfig;
use crate::feedback::{
    DialogError, DialogEvent, FeedbackController, FeedbackOutcome, FeedbackState, FeedbackTarget,
    InMemoryFeedbackStore,
};
use crate::history::{build_history, HistoryEntry};
use crate::jobs::JobTracker;
use crate::models::{
    CitationAction, JobStatus, JobUpdate, NewJobRequest, ParsedAnswer, RawAnswer, RawCitation,
    RenderedAnswer, ViewContext,
};
use crate::render::AnswerRenderer;

#[derive(Clone)]
pub struct AppState {
    config: AppConfig,
    renderer: AnswerRenderer,
    feedback: FeedbackController<InMemoryFeedbackStore>,
    backend: BackendClient,
    jobs: JobTracker,
}

impl AppState {
    pub fn new(config: AppConfig, backend: BackendClient) -> Self {
        Self {
            renderer: AnswerRenderer::new(&config),
            feedback: FeedbackController::new(InMemoryFeedbackStore::new()),
            jobs: JobTracker::new(),
            backend,
            config,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/answer", post(answer_page))
        .route("/history", get(history_page))
        .route("/api/answer/parse", post(parse_answer))
        .route("/api/answer/render", post(render_answer))
        .route("/api/citations/resolve", post(resolve_citation))
        .route("/api/feedback/:message_id", get(get_feedback))
        .route("/api/feedback/:message_id/like", post(like_answer))
        .route("/api/feedback/:message_id/dislike", post(dislike_answer))
        .route("/api/feedback/:message_id/dialog", post(feedback_dialog))
        .route("/api/history", get(history_json))
        .route("/api/jobs", get(list_jobs).post(add_job))
        .route("/api/jobs/:job_id", patch(update_job).delete(remove_job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: AppConfig, backend: BackendClient) -> Result<()> {
    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!(
        sanitize = config.render.sanitize_answer,
        feedback = config.feedback_enabled,
        backend = %backend.base_url(),
        "listening on http://{}",
        addr
    );

    let app = router(AppState::new(config, backend));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ParseResponse {
    #[serde(flatten)]
    parsed: ParsedAnswer,
    followups: Vec<String>,
}

async fn parse_answer(
    State(state): State<AppState>,
    Json(answer): Json<RawAnswer>,
) -> Json<ParseResponse> {
    Json(ParseResponse {
        parsed: state.renderer.parse(&answer),
        followups: state.renderer.followups(&answer),
    })
}

async fn render_answer(
    State(state): State<AppState>,
    Json(answer): Json<RawAnswer>,
) -> Json<RenderedAnswer> {
    Json(state.renderer.render(&answer))
}

async fn answer_page(
    State(state): State<AppState>,
    Json(answer): Json<RawAnswer>,
) -> Result<Html<String>, ApiError> {
    let rendered = state.renderer.render(&answer);
    let feedback_state = state
        .feedback
        .current(FeedbackTarget::from(&answer))
        .map(|state| state.wire_value())
        .unwrap_or_default();

    let template = AnswerTemplate {
        message_id: rendered.message_id.clone().unwrap_or_default(),
        html: rendered.html,
        followup_heading: state.config.render.followup_delimiter.clone(),
        followups: rendered.followups,
        chart: rendered.chart_data_uri.unwrap_or_default(),
        citations: rendered
            .citations
            .into_iter()
            .map(|entry| CitationLink::new(entry.ordinal, entry.label, entry.action))
            .collect(),
        feedback_enabled: state.config.feedback_enabled && answer.message_id.is_some(),
        feedback_state,
    };
    Ok(Html(template.render()?))
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    citation: RawCitation,
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    context: ViewContext,
}

async fn resolve_citation(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<CitationAction>, ApiError> {
    let action = state
        .renderer
        .resolver_for(request.organization.as_deref())
        .resolve(&request.citation, request.context)
        .map_err(|err| ApiError::unprocessable(err.to_string()))?;
    Ok(Json(action))
}

#[derive(Debug, Default, Deserialize)]
struct FeedbackRequest {
    /// Feedback value stored with the message when it was loaded.
    #[serde(default)]
    stored: Option<String>,
}

#[derive(Debug, Serialize)]
struct FeedbackView {
    message_id: String,
    state: Option<FeedbackState>,
}

async fn get_feedback(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Json<FeedbackView> {
    let current = state.feedback.current(FeedbackTarget {
        message_id: Some(&message_id),
        stored: None,
    });
    Json(FeedbackView {
        message_id,
        state: current,
    })
}

async fn like_answer(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    body: Option<Json<FeedbackRequest>>,
) -> Result<Json<FeedbackOutcome>, ApiError> {
    ensure_feedback_enabled(&state)?;
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let outcome = state
        .feedback
        .like(FeedbackTarget {
            message_id: Some(&message_id),
            stored: request.stored.as_deref(),
        })
        .ok_or_else(|| ApiError::unprocessable("answer has no message id".to_string()))?;
    persist_feedback(&state, &message_id, &outcome);
    Ok(Json(outcome))
}

async fn dislike_answer(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    body: Option<Json<FeedbackRequest>>,
) -> Result<Json<FeedbackOutcome>, ApiError> {
    ensure_feedback_enabled(&state)?;
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let outcome = state
        .feedback
        .dislike(FeedbackTarget {
            message_id: Some(&message_id),
            stored: request.stored.as_deref(),
        })
        .ok_or_else(|| ApiError::unprocessable("answer has no message id".to_string()))?;
    persist_feedback(&state, &message_id, &outcome);
    Ok(Json(outcome))
}

async fn feedback_dialog(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(event): Json<DialogEvent>,
) -> Result<Json<FeedbackOutcome>, ApiError> {
    ensure_feedback_enabled(&state)?;
    let outcome = state.feedback.dialog_event(Some(&message_id), event)?;
    persist_feedback(&state, &message_id, &outcome);
    Ok(Json(outcome))
}

fn ensure_feedback_enabled(state: &AppState) -> Result<(), ApiError> {
    if state.config.feedback_enabled {
        Ok(())
    } else {
        Err(ApiError {
            status: StatusCode::FORBIDDEN,
            message: "feedback is disabled".to_string(),
        })
    }
}

// The feedback API call does not hold up the response.
fn persist_feedback(state: &AppState, message_id: &str, outcome: &FeedbackOutcome) {
    let Some(value) = outcome.persist.clone() else {
        return;
    };
    let backend = state.backend.clone();
    let message_id = message_id.to_string();
    tokio::spawn(async move {
        if let Err(err) = backend.submit_feedback(&message_id, &value).await {
            tracing::error!("feedback for message {} not stored: {}", message_id, err);
        }
    });
}

async fn history_entries(state: &AppState) -> Result<Vec<HistoryEntry>, ApiError> {
    let rows = state.backend.history_rows().await?;
    Ok(build_history(&rows, &state.renderer))
}

async fn history_json(State(state): State<AppState>) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    Ok(Json(history_entries(&state).await?))
}

async fn history_page(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let template = match history_entries(&state).await {
        Ok(rows) => HistoryTemplate { rows, error: String::new() },
        Err(err) => {
            tracing::error!("history unavailable: {}", err.message);
            HistoryTemplate {
                rows: vec![],
                error: err.message,
            }
        }
    };
    Ok(Html(template.render()?))
}

async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobStatus>> {
    Json(state.jobs.list())
}

async fn add_job(
    State(state): State<AppState>,
    Json(request): Json<NewJobRequest>,
) -> (StatusCode, Json<JobStatus>) {
    (StatusCode::CREATED, Json(state.jobs.add(request)))
}

async fn update_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(update): Json<JobUpdate>,
) -> Result<Json<JobStatus>, ApiError> {
    match state.jobs.update(&job_id, update) {
        Some(job) => Ok(Json(job)),
        None => Err(ApiError::not_found(format!("job not found: {}", job_id))),
    }
}

async fn remove_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    match state.jobs.remove(&job_id) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::not_found(format!("job not found: {}", job_id))),
    }
}

struct CitationLink {
    ordinal: usize,
    label: String,
    href: String,
    modal_html: String,
}

impl CitationLink {
    fn new(ordinal: usize, label: String, action: Option<CitationAction>) -> Self {
        let (href, modal_html) = match action {
            Some(CitationAction::OpenPdf { url }) | Some(CitationAction::OpenViewer { url }) => {
                (url, String::new())
            }
            Some(CitationAction::ShowContent { html, .. }) => (String::new(), html),
            None => (String::new(), String::new()),
        };
        Self {
            ordinal,
            label,
            href,
            modal_html,
        }
    }
}

#[derive(Template)]
#[template(path = "answer.html")]
struct AnswerTemplate {
    message_id: String,
    html: String,
    followup_heading: String,
    followups: Vec<String>,
    chart: String,
    citations: Vec<CitationLink>,
    feedback_enabled: bool,
    feedback_state: String,
}

#[derive(Template)]
#[template(path = "history.html")]
struct HistoryTemplate {
    rows: Vec<HistoryEntry>,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }

    fn unprocessable(message: String) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl From<askama::Error> for ApiError {
    fn from(value: askama::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl From<DialogError> for ApiError {
    fn from(value: DialogError) -> Self {
        Self::unprocessable(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
