//! Error taxonomy for the matching core.

use thiserror::Error;
use uuid::Uuid;

use fyp_types::models::RequestKind;

pub type Result<T> = std::result::Result<T, MatchError>;

/// Coarse classification every [`MatchError`] falls into. Stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Eligibility,
    Conflict,
    Authorization,
    RetryableConflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Eligibility => "eligibility",
            Self::Conflict => "conflict",
            Self::Authorization => "authorization",
            Self::RetryableConflict => "retryable_conflict",
            Self::Internal => "internal",
        }
    }
}

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("A student cannot send a request to themselves")]
    SelfRequest,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Request {0} is not a {1} request")]
    TypeMismatch(Uuid, RequestKind),

    #[error("Students are in different semesters ({0} vs {1})")]
    SemesterMismatch(u32, u32),

    #[error("Student {0} does not have an active account")]
    AccountInactive(Uuid),

    #[error("A pending {0} request to this student already exists")]
    DuplicateRequest(RequestKind),

    #[error("Request {0} has already been processed")]
    AlreadyProcessed(Uuid),

    #[error("Group {0} is locked")]
    GroupLocked(Uuid),

    #[error("Group {0} already has the maximum number of members")]
    GroupFull(Uuid),

    #[error("Both students already belong to a group")]
    Conflict,

    #[error("Group {0} cannot drop below the minimum number of members")]
    MinMembers(Uuid),

    #[error("Only the recipient may respond to request {0}")]
    Unauthorized(Uuid),

    #[error("Student {0} is not a member of any group")]
    NotGroupMember(Uuid),

    #[error("Students do not share a group")]
    NotSameGroup,

    /// Lost a race for the write lock. Nothing was committed.
    #[error("Transaction conflicted with a concurrent update, retry")]
    RetryableConflict,

    #[error(transparent)]
    Storage(anyhow::Error),
}

impl MatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SelfRequest | Self::NotFound { .. } | Self::TypeMismatch(..) => {
                ErrorKind::Validation
            }
            Self::SemesterMismatch(..) | Self::AccountInactive(_) => ErrorKind::Eligibility,
            Self::DuplicateRequest(_)
            | Self::AlreadyProcessed(_)
            | Self::GroupLocked(_)
            | Self::GroupFull(_)
            | Self::Conflict
            | Self::MinMembers(_) => ErrorKind::Conflict,
            Self::Unauthorized(_) | Self::NotGroupMember(_) | Self::NotSameGroup => {
                ErrorKind::Authorization
            }
            Self::RetryableConflict => ErrorKind::RetryableConflict,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SelfRequest => "self_request",
            Self::NotFound { .. } => "not_found",
            Self::TypeMismatch(..) => "type_mismatch",
            Self::SemesterMismatch(..) => "semester_mismatch",
            Self::AccountInactive(_) => "account_inactive",
            Self::DuplicateRequest(_) => "duplicate_request",
            Self::AlreadyProcessed(_) => "already_processed",
            Self::GroupLocked(_) => "group_locked",
            Self::GroupFull(_) => "group_full",
            Self::Conflict => "already_grouped",
            Self::MinMembers(_) => "min_members",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotGroupMember(_) => "not_group_member",
            Self::NotSameGroup => "not_same_group",
            Self::RetryableConflict => "retryable_conflict",
            Self::Storage(_) => "internal",
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::RetryableConflict
    }

    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

impl From<anyhow::Error> for MatchError {
    fn from(err: anyhow::Error) -> Self {
        if fyp_db::is_serialization_failure(&err) {
            Self::RetryableConflict
        } else {
            Self::Storage(err)
        }
    }
}

/// Map a schema constraint hit to `on_violation`, otherwise convert normally.
pub(crate) fn constraint_as(err: anyhow::Error, on_violation: MatchError) -> MatchError {
    if fyp_db::is_constraint_violation(&err) {
        on_violation
    } else {
        MatchError::from(err)
    }
}
