use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{RequestKind, RequestStatus};

/// State-change notifications handed to the event sink after a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MatchEvent {
    /// A request was created, accepted or rejected
    RequestChanged {
        request_id: Uuid,
        kind: RequestKind,
        from_id: Uuid,
        to_id: Uuid,
        status: RequestStatus,
    },

    /// Group membership or lock state changed
    GroupChanged {
        group_id: Uuid,
        member_count: u32,
        is_locked: bool,
    },
}
