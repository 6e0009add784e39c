//! Group formation: merging two students into one capacity-bounded team.
//!
//! [`merge`] runs inside the caller's transaction. It re-reads both students
//! and their memberships there instead of trusting anything loaded earlier,
//! so a concurrent accept that committed in between is always seen. The
//! member insert carries the capacity and lock checks in the same statement,
//! and the schema triggers refuse a fourth row regardless.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use fyp_db::{Connection, groups, students};
use fyp_types::models::{Group, MAX_GROUP_MEMBERS, Membership, PLACEHOLDER_PROJECT_NAME};

use crate::eligibility::check_partner_pair;
use crate::error::{MatchError, Result, constraint_as};

/// Resulting state of the group a merge touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub group_id: Uuid,
    pub member_count: u32,
    pub is_locked: bool,
    pub created: bool,
}

pub fn merge(conn: &Connection, from_id: Uuid, to_id: Uuid) -> Result<MergeOutcome> {
    let sender = students::get_student(conn, from_id)?
        .ok_or_else(|| MatchError::not_found("Student", from_id))?;
    let receiver = students::get_student(conn, to_id)?
        .ok_or_else(|| MatchError::not_found("Student", to_id))?;
    check_partner_pair(&sender, &receiver)?;

    let now = Utc::now();
    let sender_group = groups::membership_of(conn, from_id)?;
    let receiver_group = groups::membership_of(conn, to_id)?;

    let (group_id, created) = match (sender_group, receiver_group) {
        (Some(_), Some(_)) => {
            warn!(%from_id, %to_id, "Merge refused: both students already grouped");
            return Err(MatchError::Conflict);
        }
        (Some(group), None) => (join(conn, group, to_id, now)?, false),
        (None, Some(group)) => (join(conn, group, from_id, now)?, false),
        (None, None) => (create_pair(conn, from_id, to_id, now)?, true),
    };

    let member_count = groups::member_count(conn, group_id)?;
    let is_locked = if member_count >= MAX_GROUP_MEMBERS {
        groups::lock_group(conn, group_id)?;
        info!(%group_id, "Group reached capacity and locked");
        true
    } else {
        false
    };

    Ok(MergeOutcome {
        group_id,
        member_count,
        is_locked,
        created,
    })
}

fn join(conn: &Connection, group: Membership, student_id: Uuid, now: DateTime<Utc>) -> Result<Uuid> {
    // A group locks itself on reaching capacity, so full is checked first.
    if group.is_full() {
        return Err(MatchError::GroupFull(group.group_id));
    }
    if group.is_locked {
        return Err(MatchError::GroupLocked(group.group_id));
    }

    let inserted = groups::add_member(conn, group.group_id, student_id, now)
        .map_err(|e| constraint_as(e, MatchError::Conflict))?;
    if !inserted {
        warn!(group_id = %group.group_id, %student_id, "Capacity guard refused member insert");
        return Err(MatchError::GroupFull(group.group_id));
    }

    info!(group_id = %group.group_id, %student_id, "Student joined group");
    Ok(group.group_id)
}

fn create_pair(conn: &Connection, a: Uuid, b: Uuid, now: DateTime<Utc>) -> Result<Uuid> {
    let group = Group {
        id: Uuid::new_v4(),
        project_name: PLACEHOLDER_PROJECT_NAME.to_string(),
        description: String::new(),
        is_locked: false,
        created_at: now,
    };
    groups::insert_group(conn, &group)?;

    for student_id in [a, b] {
        let inserted = groups::add_member(conn, group.id, student_id, now)
            .map_err(|e| constraint_as(e, MatchError::Conflict))?;
        if !inserted {
            return Err(MatchError::GroupFull(group.id));
        }
    }

    info!(group_id = %group.id, %a, %b, "Created group");
    Ok(group.id)
}
