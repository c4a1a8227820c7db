//! Axum server and routes.

use crate::posts::{NewPost, Post, PostError, PostPatch, PostStore, PostUpdate};
use crate::request::WebInvocation;
use activity_core::{ActivityLogger, LogOutcome};
use activity_types::{ActivityDispatcher, DeliveryJob, EventKind, LifecycleEvent};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub logger: ActivityLogger,
    pub dispatcher: Arc<dyn ActivityDispatcher>,
    pub posts: PostStore,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/posts", post(handle_create_post))
        .route(
            "/posts/:id",
            get(handle_get_post)
                .put(handle_update_post)
                .delete(handle_delete_post),
        )
        .route("/posts/:id/restore", post(handle_restore_post))
        .route("/activity/jobs/:job_id", get(handle_job_status))
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            code: 200,
            message: "Success".to_string(),
            data: Some(data),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PostError> for ApiError {
    fn from(e: PostError) -> Self {
        match e {
            PostError::NotFound(_) => ApiError::NotFound(e.to_string()),
            PostError::NotDeleted(_) => ApiError::Conflict(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiResponse::<()> {
            code: status.as_u16() as i32,
            message: self.to_string(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

/// What happened to the activity record for a mutation.
#[derive(Debug, Serialize)]
pub struct ActivitySummary {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl From<LogOutcome> for ActivitySummary {
    fn from(outcome: LogOutcome) -> Self {
        match outcome {
            LogOutcome::Skipped(reason) => Self {
                status: "skipped",
                record_id: None,
                job_id: None,
                reason: Some(reason.as_str()),
            },
            LogOutcome::Enqueued { record_id, job_id } => Self {
                status: "enqueued",
                record_id: Some(record_id),
                job_id: Some(job_id),
                reason: None,
            },
            LogOutcome::DispatchFailed { record_id } => Self {
                status: "dispatch_failed",
                record_id: Some(record_id),
                job_id: None,
                reason: None,
            },
        }
    }
}

/// A mutated post with one activity summary per lifecycle event it fired, in firing order.
#[derive(Debug, Serialize)]
pub struct PostMutation {
    pub post: Post,
    pub activity: Vec<ActivitySummary>,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

async fn handle_create_post(
    State(state): State<Arc<AppState>>,
    WebInvocation(invocation): WebInvocation,
    Json(req): Json<NewPost>,
) -> ApiResult<PostMutation> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    let committed = state.posts.create(req).await;
    let event = LifecycleEvent::of(EventKind::Created, &committed.value)
        .with_transaction_id(committed.transaction_id);
    let outcome = state.logger.log(&event, &invocation);
    tracing::info!(post_id = committed.value.id, "post created");
    Ok(ApiResponse::ok(PostMutation {
        post: committed.value,
        activity: vec![outcome.into()],
    }))
}

async fn handle_get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Post> {
    let post = state
        .posts
        .get(id)
        .await
        .ok_or(PostError::NotFound(id))?;
    Ok(ApiResponse::ok(post))
}

async fn handle_update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    WebInvocation(invocation): WebInvocation,
    Json(patch): Json<PostPatch>,
) -> ApiResult<PostMutation> {
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }
    let committed = match state.posts.update(id, patch).await? {
        PostUpdate::Changed(committed) => committed,
        PostUpdate::Unchanged(post) => {
            tracing::debug!(post_id = id, "update changed nothing, no activity recorded");
            return Ok(ApiResponse::ok(PostMutation {
                post,
                activity: Vec::new(),
            }));
        }
    };
    let (before, after) = committed.value;
    let event =
        LifecycleEvent::update_of(&before, &after).with_transaction_id(committed.transaction_id);
    let outcome = state.logger.log(&event, &invocation);
    Ok(ApiResponse::ok(PostMutation {
        post: after,
        activity: vec![outcome.into()],
    }))
}

async fn handle_delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    WebInvocation(invocation): WebInvocation,
) -> ApiResult<PostMutation> {
    let committed = state.posts.delete(id).await?;
    let event = LifecycleEvent::of(EventKind::Deleted, &committed.value)
        .with_transaction_id(committed.transaction_id);
    let outcome = state.logger.log(&event, &invocation);
    tracing::info!(post_id = id, "post deleted");
    Ok(ApiResponse::ok(PostMutation {
        post: committed.value,
        activity: vec![outcome.into()],
    }))
}

async fn handle_restore_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    WebInvocation(invocation): WebInvocation,
) -> ApiResult<PostMutation> {
    let committed = state.posts.restore(id).await?;
    let (before, after) = committed.value;
    // Restoring saves the row, so `updated` (deleted_at cleared) fires before `restored`.
    let updated = LifecycleEvent::update_of(&before, &after)
        .with_transaction_id(committed.transaction_id.clone());
    let restored = LifecycleEvent::of(EventKind::Restored, &after)
        .with_transaction_id(committed.transaction_id);
    let activity: Vec<ActivitySummary> = [updated, restored]
        .iter()
        .map(|event| ActivitySummary::from(state.logger.log(event, &invocation)))
        .collect();
    tracing::info!(post_id = id, "post restored");
    Ok(ApiResponse::ok(PostMutation {
        post: after,
        activity,
    }))
}

async fn handle_job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<DeliveryJob> {
    match state.dispatcher.job(&job_id).await {
        Ok(Some(job)) => Ok(ApiResponse::ok(job)),
        Ok(None) => Err(ApiError::NotFound("Job not found".to_string())),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

async fn handle_health() -> &'static str {
    "ok"
}
