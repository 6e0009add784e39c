use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use fyp_types::api::SyncStudentBody;
use fyp_types::models::Student;

use crate::error::{ApiError, blocking};
use crate::middleware::bearer_token;
use crate::state::AppState;

/// PUT /sync/students/{id}: the profile provider pushes the read-only
/// student fields this core checks eligibility against.
pub async fn upsert_student(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<SyncStudentBody>,
) -> Result<impl IntoResponse, ApiError> {
    let expected = state.sync_token.as_deref().ok_or(StatusCode::NOT_FOUND)?;
    if bearer_token(&headers) != Some(expected) {
        warn!(%student_id, "Rejected profile sync with bad token");
        return Err(StatusCode::UNAUTHORIZED.into());
    }

    let student = Student {
        id: student_id,
        display_name: body.display_name,
        current_semester: body.current_semester,
        account_status: body.account_status,
    };
    let db = state.db.clone();
    blocking(move || {
        db.upsert_student(&student)?;
        Ok(student)
    })
    .await
    .map(|student| {
        info!(student_id = %student.id, semester = student.current_semester, "Student profile synced");
        (StatusCode::OK, Json(student))
    })
}
