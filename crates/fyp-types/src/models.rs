use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard cap on group size. A group reaching this count locks itself.
pub const MAX_GROUP_MEMBERS: u32 = 3;

/// Removal may never take a group below this many members.
pub const MIN_GROUP_MEMBERS: u32 = 2;

/// Project name given to a group created by a partner acceptance.
pub const PLACEHOLDER_PROJECT_NAME: &str = "Untitled FYP Project";

/// Returned when a stored enum column holds a value we do not recognise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub column: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} value '{}'", self.column, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

// -- Students --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
    DeletionRequested,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::DeletionRequested => "deletion_requested",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "deletion_requested" => Ok(Self::DeletionRequested),
            other => Err(UnknownVariant {
                column: "account_status",
                value: other.to_string(),
            }),
        }
    }
}

/// Read-only view of a student as supplied by the profile provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub display_name: String,
    pub current_semester: u32,
    pub account_status: AccountStatus,
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.account_status == AccountStatus::Active
    }
}

/// A student's current group as seen at a single point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub group_id: Uuid,
    pub is_locked: bool,
    pub member_count: u32,
}

impl Membership {
    pub fn is_full(&self) -> bool {
        self.member_count >= MAX_GROUP_MEMBERS
    }
}

// -- Requests --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Message,
    Partner,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Partner => "partner",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Self::Message),
            "partner" => Ok(Self::Partner),
            other => Err(UnknownVariant {
                column: "kind",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Accepted and rejected are terminal; nothing leaves them.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(UnknownVariant {
                column: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    pub kind: RequestKind,
    pub from_student_id: Uuid,
    pub to_student_id: Uuid,
    pub status: RequestStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl Request {
    /// A fresh request in the `Pending` state.
    pub fn pending(kind: RequestKind, from: Uuid, to: Uuid, reason: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            from_student_id: from,
            to_student_id: to,
            status: RequestStatus::Pending,
            reason,
            created_at: Utc::now(),
            responded_at: None,
        }
    }

    pub fn involves(&self, student_id: Uuid) -> bool {
        self.from_student_id == student_id || self.to_student_id == student_id
    }
}

/// Which side of a request the caller is on when listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Sent,
    Received,
    #[default]
    Any,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub direction: Direction,
    pub status: Option<RequestStatus>,
    pub kind: Option<RequestKind>,
}

// -- Groups --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub project_name: String,
    pub description: String,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub student_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

/// A group together with its current members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub group: Group,
    pub members: Vec<GroupMember>,
}

impl GroupView {
    pub fn member_count(&self) -> u32 {
        self.members.len() as u32
    }

    pub fn has_member(&self, student_id: Uuid) -> bool {
        self.members.iter().any(|m| m.student_id == student_id)
    }
}
