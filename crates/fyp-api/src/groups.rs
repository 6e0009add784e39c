use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use fyp_types::api::{Claims, GroupQuery, UpdateGroupBody};
use fyp_types::models::Membership;

use crate::error::{ApiError, blocking};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub group_id: Uuid,
    pub member_count: u32,
    pub is_locked: bool,
}

impl From<Membership> for MembershipResponse {
    fn from(m: Membership) -> Self {
        Self {
            group_id: m.group_id,
            member_count: m.member_count,
            is_locked: m.is_locked,
        }
    }
}

pub async fn my_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let group = blocking(move || state.groups.group_for_member(claims.sub))
        .await?
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(group))
}

/// Moderation listing. Read-only.
pub async fn list_groups(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Query(query): Query<GroupQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let groups = blocking(move || state.groups.list(query.locked)).await?;
    Ok(Json(groups))
}

pub async fn update_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<UpdateGroupBody>,
) -> Result<impl IntoResponse, ApiError> {
    let group = blocking(move || {
        state
            .groups
            .update_details(claims.sub, body.project_name, body.description)
    })
    .await?;
    Ok(Json(group))
}

pub async fn lock_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let membership = blocking(move || state.groups.lock(claims.sub)).await?;
    Ok(Json(MembershipResponse::from(membership)))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(student_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let membership = blocking(move || state.groups.remove_member(claims.sub, student_id)).await?;
    Ok(Json(MembershipResponse::from(membership)))
}
