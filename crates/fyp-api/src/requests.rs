use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use fyp_types::api::{Claims, RequestQuery, SendRequestBody};
use fyp_types::models::{GroupView, Request, RequestFilter, RequestKind};

use crate::error::{ApiError, blocking};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub request: Request,
    /// The caller's group after a partner acceptance.
    pub group: Option<GroupView>,
}

pub async fn send_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<SendRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = blocking(move || {
        state
            .requests
            .send(claims.sub, body.to_student_id, body.kind, body.reason)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<RequestQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = RequestFilter {
        direction: query.direction,
        status: query.status,
        kind: query.kind,
    };
    let requests = blocking(move || state.requests.list(claims.sub, filter)).await?;
    Ok(Json(requests))
}

pub async fn get_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let request = blocking(move || state.requests.get(request_id, claims.sub)).await?;
    Ok(Json(request))
}

pub async fn accept_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((kind, request_id)): Path<(RequestKind, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let response = blocking(move || {
        let accepted = state.requests.accept(request_id, claims.sub, kind)?;
        let group = match accepted.group {
            Some(_) => state.groups.group_for_member(claims.sub)?,
            None => None,
        };
        Ok(AcceptResponse {
            request: accepted.request,
            group,
        })
    })
    .await?;

    Ok(Json(response))
}

pub async fn reject_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((kind, request_id)): Path<(RequestKind, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let request = blocking(move || state.requests.reject(request_id, claims.sub, kind)).await?;
    Ok(Json(request))
}
