use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AccountStatus, Direction, RequestKind, RequestStatus};

// -- JWT Claims --

/// Bearer token claims. Tokens are minted by the campus login service;
/// `sub` is the student id this core acts on behalf of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Requests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendRequestBody {
    pub to_student_id: Uuid,
    pub kind: RequestKind,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestQuery {
    #[serde(default)]
    pub direction: Direction,
    pub status: Option<RequestStatus>,
    pub kind: Option<RequestKind>,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateGroupBody {
    pub project_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupQuery {
    pub locked: Option<bool>,
}

// -- Profile sync --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncStudentBody {
    pub display_name: String,
    pub current_semester: u32,
    pub account_status: AccountStatus,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
    pub message: String,
    pub retryable: bool,
}
