//! HTTP boundary: extractors, responses and a mountable router
//!
//! [`Submission`] extracts from both `application/x-www-form-urlencoded` and
//! `multipart/form-data` bodies, so one handler serves plain forms and file
//! uploads. [`router`] wires a [`CrudHandler`] into the standard
//! form-POST / redirect-after-POST flow.

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::crud::{CrudHandler, FormData, Submission, SubmissionOutcome};
use crate::db::{ListQuery, SortDirection};
use crate::error::DynCrudError;
use crate::uploads::UploadedFile;

/// Redirect-after-post: 303 See Other to the given location
pub fn see_other(location: &str) -> Redirect {
    Redirect::to(location)
}

/// Rejection for [`Submission`] extraction
#[derive(Debug)]
pub enum SubmissionRejection {
    /// Request content type is neither urlencoded nor multipart
    UnsupportedContentType,
    /// Body could not be parsed
    Malformed(String),
}

impl std::fmt::Display for SubmissionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedContentType => f.write_str("unsupported form content type"),
            Self::Malformed(detail) => write!(f, "malformed form body: {detail}"),
        }
    }
}

impl std::error::Error for SubmissionRejection {}

impl IntoResponse for SubmissionRejection {
    fn into_response(self) -> Response {
        let status = match self {
            Self::UnsupportedContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

impl<S> FromRequest<S> for Submission
where
    S: Send + Sync,
{
    type Rejection = SubmissionRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| SubmissionRejection::Malformed(e.to_string()))?;
            let mut submission = Submission::default();

            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| SubmissionRejection::Malformed(e.to_string()))?
            {
                let name = field.name().unwrap_or_default().to_string();
                if let Some(filename) = field.file_name().map(ToString::to_string) {
                    let content_type = field.content_type().map(ToString::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| SubmissionRejection::Malformed(e.to_string()))?;
                    submission.files.push(UploadedFile {
                        field_name: name,
                        filename,
                        content_type,
                        data,
                    });
                } else {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| SubmissionRejection::Malformed(e.to_string()))?;
                    submission.fields.insert(name, value);
                }
            }
            return Ok(submission);
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<FormData>::from_request(req, state)
                .await
                .map_err(|e| SubmissionRejection::Malformed(e.to_string()))?;
            return Ok(Submission::from_fields(fields));
        }

        Err(SubmissionRejection::UnsupportedContentType)
    }
}

impl IntoResponse for DynCrudError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::CsrfMismatch => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidIdentifier(_) | Self::UnknownColumn(_) | Self::EmptySubmission => {
                StatusCode::BAD_REQUEST
            }
            Self::HookVeto { .. } => StatusCode::CONFLICT,
            Self::Upload(crate::uploads::UploadError::TooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::Upload(_) => StatusCode::BAD_REQUEST,
            Self::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            Self::Database(_)
            | Self::Config(_)
            | Self::Cache(_)
            | Self::Coerce { .. }
            | Self::UnsupportedDialect(_)
            | Self::NoPrimaryKey(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            // Internals stay out of the response body.
            return (status, "internal error").into_response();
        }
        (status, self.to_string()).into_response()
    }
}

/// Query parameters accepted by the list route
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    /// 1-based page number
    pub page: Option<u32>,
    /// Rows per page
    pub per_page: Option<u32>,
    /// Column to order by
    pub order_by: Option<String>,
    /// `asc` or `desc`
    pub direction: Option<SortDirection>,
    /// Search term
    pub q: Option<String>,
}

impl From<ListParams> for ListQuery {
    fn from(params: ListParams) -> Self {
        let defaults = Self::default();
        Self {
            page: params.page.unwrap_or(defaults.page).max(1),
            per_page: params.per_page.unwrap_or(defaults.per_page).clamp(1, 500),
            order_by: params.order_by,
            direction: params.direction.unwrap_or_default(),
            search: params.q.filter(|q| !q.trim().is_empty()),
        }
    }
}

#[derive(Clone)]
struct RouterState {
    handler: Arc<CrudHandler>,
    base: String,
}

/// Build a router serving the standard CRUD flow for one handler
///
/// Routes (relative to the mount point, with `base` used for redirects):
/// `GET /` list, `GET /new` create form, `POST /` submit,
/// `GET /{id}` detail, `GET /{id}/edit` edit form, `POST /{id}/delete`.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use dyncrud::{crud::CrudHandler, db::CrudPool, web};
///
/// # async fn demo() -> dyncrud::error::Result<()> {
/// let pool = CrudPool::connect("postgres://localhost/app").await?;
/// let contacts = Arc::new(CrudHandler::new(pool, "contacts").await?);
/// let app: axum::Router = axum::Router::new()
///     .nest("/contacts", web::router("/contacts", contacts));
/// # Ok(())
/// # }
/// ```
pub fn router(base: impl Into<String>, handler: Arc<CrudHandler>) -> Router {
    let state = RouterState {
        handler,
        base: base.into().trim_end_matches('/').to_string(),
    };
    Router::new()
        .route("/", get(list_rows).post(submit))
        .route("/new", get(new_form))
        .route("/{id}", get(detail))
        .route("/{id}/edit", get(edit_form))
        .route("/{id}/delete", post(delete_row))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn list_rows(
    State(state): State<RouterState>,
    Query(params): Query<ListParams>,
) -> Result<Html<String>, DynCrudError> {
    let page = state.handler.list(&params.into()).await?;
    Ok(Html(state.handler.render_list(&page)))
}

async fn new_form(State(state): State<RouterState>) -> Result<Html<String>, DynCrudError> {
    let html = state
        .handler
        .render_form_at(&state.base, None, None)
        .await?;
    Ok(Html(html))
}

async fn edit_form(
    State(state): State<RouterState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, DynCrudError> {
    let html = state
        .handler
        .render_form_at(&state.base, Some(id), None)
        .await?;
    Ok(Html(html))
}

async fn detail(
    State(state): State<RouterState>,
    Path(id): Path<i64>,
) -> Result<Response, DynCrudError> {
    match state.handler.find(id).await? {
        Some(record) => Ok(Html(state.handler.render_detail(&record)).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

async fn submit(
    State(state): State<RouterState>,
    submission: Submission,
) -> Result<Response, DynCrudError> {
    let id = submission
        .fields
        .get(&state.handler.schema().primary_key)
        .and_then(|v| v.trim().parse::<i64>().ok());

    match state.handler.handle_submission(submission).await? {
        SubmissionOutcome::Created { id } | SubmissionOutcome::Updated { id } => {
            Ok(see_other(&format!("{}/{id}", state.base)).into_response())
        }
        SubmissionOutcome::Rejected(errors) => {
            let html = state
                .handler
                .render_form_at(&state.base, id, Some(&errors))
                .await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response())
        }
    }
}

async fn delete_row(
    State(state): State<RouterState>,
    Path(id): Path<i64>,
) -> Result<Response, DynCrudError> {
    state.handler.delete(id).await?;
    Ok(see_other(&state.base).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_defaults_and_clamps() {
        let query: ListQuery = ListParams::default().into();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 25);

        let query: ListQuery = ListParams {
            page: Some(0),
            per_page: Some(10_000),
            q: Some("  ".into()),
            ..ListParams::default()
        }
        .into();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 500);
        assert_eq!(query.search, None);
    }
}
