//! Manual group mutations: lock, member removal and project details.
//!
//! Every mutation here is refused once the group is locked.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use fyp_db::{Connection, Database, groups};
use fyp_types::events::MatchEvent;
use fyp_types::models::{GroupView, MAX_GROUP_MEMBERS, MIN_GROUP_MEMBERS, Membership};

use crate::error::{MatchError, Result};
use crate::events::EventSink;

const MAX_PROJECT_NAME_LEN: usize = 120;

pub struct GroupService {
    db: Arc<Database>,
    events: Arc<dyn EventSink>,
}

impl GroupService {
    pub fn new(db: Arc<Database>, events: Arc<dyn EventSink>) -> Self {
        Self { db, events }
    }

    /// Lock the caller's group at its current size (2 or 3 members).
    pub fn lock(&self, student_id: Uuid) -> Result<Membership> {
        let locked: Result<Membership> = self.db.transaction(|tx| {
            let membership = current_membership(tx, student_id)?;
            if membership.is_locked {
                return Err(MatchError::GroupLocked(membership.group_id));
            }
            if !(MIN_GROUP_MEMBERS..=MAX_GROUP_MEMBERS).contains(&membership.member_count) {
                return Err(MatchError::MinMembers(membership.group_id));
            }
            if !groups::lock_group(tx, membership.group_id)? {
                return Err(MatchError::GroupLocked(membership.group_id));
            }
            Ok(Membership {
                is_locked: true,
                ..membership
            })
        });
        let locked = locked?;

        info!(group_id = %locked.group_id, %student_id, "Group locked by member");
        self.publish(locked);
        Ok(locked)
    }

    /// Remove `target_id` from the group both students share.
    pub fn remove_member(&self, requester_id: Uuid, target_id: Uuid) -> Result<Membership> {
        let remaining: Result<Membership> = self.db.transaction(|tx| {
            let requester = current_membership(tx, requester_id)?;
            let target = groups::membership_of(tx, target_id)?;
            if target.map(|t| t.group_id) != Some(requester.group_id) {
                return Err(MatchError::NotSameGroup);
            }
            if requester.is_locked {
                return Err(MatchError::GroupLocked(requester.group_id));
            }
            if requester.member_count <= MIN_GROUP_MEMBERS {
                return Err(MatchError::MinMembers(requester.group_id));
            }

            groups::remove_member(tx, requester.group_id, target_id)?;
            Ok(Membership {
                member_count: groups::member_count(tx, requester.group_id)?,
                ..requester
            })
        });
        let remaining = remaining?;

        info!(group_id = %remaining.group_id, %requester_id, %target_id, "Member removed");
        self.publish(remaining);
        Ok(remaining)
    }

    /// Rename the project or change its description while the group is open.
    pub fn update_details(
        &self,
        student_id: Uuid,
        project_name: Option<String>,
        description: Option<String>,
    ) -> Result<GroupView> {
        self.db.transaction(|tx| {
            let membership = current_membership(tx, student_id)?;
            if membership.is_locked {
                return Err(MatchError::GroupLocked(membership.group_id));
            }
            let current = groups::get_group(tx, membership.group_id)?
                .ok_or_else(|| MatchError::not_found("Group", membership.group_id))?;

            let name = project_name
                .map(|n| n.trim().chars().take(MAX_PROJECT_NAME_LEN).collect::<String>())
                .filter(|n| !n.is_empty())
                .unwrap_or(current.group.project_name);
            let description = description
                .map(|d| d.trim().to_string())
                .unwrap_or(current.group.description);

            if !groups::update_details(tx, membership.group_id, &name, &description)? {
                return Err(MatchError::GroupLocked(membership.group_id));
            }
            groups::get_group(tx, membership.group_id)?
                .ok_or_else(|| MatchError::not_found("Group", membership.group_id))
        })
    }

    pub fn group_for_member(&self, student_id: Uuid) -> Result<Option<GroupView>> {
        Ok(self.db.group_for_member(student_id)?)
    }

    pub fn list(&self, locked: Option<bool>) -> Result<Vec<GroupView>> {
        Ok(self.db.list_groups(locked)?)
    }

    fn publish(&self, membership: Membership) {
        self.events.publish(MatchEvent::GroupChanged {
            group_id: membership.group_id,
            member_count: membership.member_count,
            is_locked: membership.is_locked,
        });
    }
}

fn current_membership(conn: &Connection, student_id: Uuid) -> Result<Membership> {
    groups::membership_of(conn, student_id)?.ok_or(MatchError::NotGroupMember(student_id))
}
