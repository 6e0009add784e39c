//! Database row types. These map directly to SQLite rows and are
//! converted into fyp-types models at the store boundary.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use fyp_types::models::{Group, GroupMember, Membership, Request, Student};

pub struct StudentRow {
    pub id: String,
    pub display_name: String,
    pub current_semester: u32,
    pub account_status: String,
}

pub struct RequestRow {
    pub id: String,
    pub kind: String,
    pub from_student_id: String,
    pub to_student_id: String,
    pub status: String,
    pub reason: Option<String>,
    pub created_at: String,
    pub responded_at: Option<String>,
}

pub struct GroupRow {
    pub id: String,
    pub project_name: String,
    pub description: String,
    pub is_locked: bool,
    pub created_at: String,
}

pub struct MemberRow {
    pub group_id: String,
    pub student_id: String,
    pub joined_at: String,
}

pub struct MembershipRow {
    pub group_id: String,
    pub is_locked: bool,
    pub member_count: u32,
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse()
        .with_context(|| format!("corrupt id '{}'", raw))
}

/// Timestamps are written as RFC 3339. Rows inserted by hand through the
/// sqlite shell may carry `datetime('now')` format instead; accept both.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

impl StudentRow {
    pub fn into_model(self) -> Result<Student> {
        Ok(Student {
            id: parse_id(&self.id)?,
            display_name: self.display_name,
            current_semester: self.current_semester,
            account_status: self.account_status.parse()?,
        })
    }
}

impl RequestRow {
    pub fn into_model(self) -> Result<Request> {
        Ok(Request {
            id: parse_id(&self.id)?,
            kind: self.kind.parse()?,
            from_student_id: parse_id(&self.from_student_id)?,
            to_student_id: parse_id(&self.to_student_id)?,
            status: self.status.parse()?,
            reason: self.reason,
            created_at: parse_timestamp(&self.created_at)?,
            responded_at: self.responded_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

impl GroupRow {
    pub fn into_model(self) -> Result<Group> {
        Ok(Group {
            id: parse_id(&self.id)?,
            project_name: self.project_name,
            description: self.description,
            is_locked: self.is_locked,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl MemberRow {
    pub fn into_model(self) -> Result<GroupMember> {
        Ok(GroupMember {
            group_id: parse_id(&self.group_id)?,
            student_id: parse_id(&self.student_id)?,
            joined_at: parse_timestamp(&self.joined_at)?,
        })
    }
}

impl MembershipRow {
    pub fn into_model(self) -> Result<Membership> {
        Ok(Membership {
            group_id: parse_id(&self.group_id)?,
            is_locked: self.is_locked,
            member_count: self.member_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_timestamp_formats() {
        let rfc = parse_timestamp("2026-03-01T10:00:00+00:00").unwrap();
        let sqlite = parse_timestamp("2026-03-01 10:00:00").unwrap();
        assert_eq!(rfc, sqlite);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
