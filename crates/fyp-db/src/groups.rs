use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use fyp_types::models::{Group, GroupMember, GroupView, MAX_GROUP_MEMBERS, Membership};

use crate::models::{GroupRow, MemberRow, MembershipRow, format_timestamp};
use crate::{Database, OptionalExt};

impl Database {
    pub fn group_for_member(&self, student_id: Uuid) -> Result<Option<GroupView>> {
        self.with_conn(|conn| group_for_member(conn, student_id))
    }

    pub fn list_groups(&self, locked: Option<bool>) -> Result<Vec<GroupView>> {
        self.with_conn(|conn| list_groups(conn, locked))
    }
}

/// The student's current group, with the member count read in the same query.
pub fn membership_of(conn: &Connection, student_id: Uuid) -> Result<Option<Membership>> {
    let row = conn
        .query_row(
            "SELECT g.id, g.is_locked,
                    (SELECT COUNT(*) FROM group_members c WHERE c.group_id = g.id)
             FROM group_members m
             JOIN project_groups g ON g.id = m.group_id
             WHERE m.student_id = ?1",
            [student_id.to_string()],
            |row| {
                Ok(MembershipRow {
                    group_id: row.get(0)?,
                    is_locked: row.get(1)?,
                    member_count: row.get(2)?,
                })
            },
        )
        .optional()?;

    row.map(MembershipRow::into_model).transpose()
}

pub fn insert_group(conn: &Connection, group: &Group) -> Result<()> {
    conn.execute(
        "INSERT INTO project_groups (id, project_name, description, is_locked, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            group.id.to_string(),
            group.project_name,
            group.description,
            group.is_locked,
            format_timestamp(group.created_at),
        ],
    )?;
    Ok(())
}

/// Insert a member only while the group is unlocked and below capacity.
/// The capacity test and the insert are one statement. Returns false when
/// the guard held the row back.
pub fn add_member(
    conn: &Connection,
    group_id: Uuid,
    student_id: Uuid,
    at: DateTime<Utc>,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO group_members (group_id, student_id, joined_at)
         SELECT ?1, ?2, ?3
         WHERE (SELECT COUNT(*) FROM group_members WHERE group_id = ?1) < ?4
           AND (SELECT is_locked FROM project_groups WHERE id = ?1) = 0",
        rusqlite::params![
            group_id.to_string(),
            student_id.to_string(),
            format_timestamp(at),
            MAX_GROUP_MEMBERS,
        ],
    )?;
    Ok(inserted == 1)
}

pub fn remove_member(conn: &Connection, group_id: Uuid, student_id: Uuid) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM group_members WHERE group_id = ?1 AND student_id = ?2",
        [group_id.to_string(), student_id.to_string()],
    )?;
    Ok(removed == 1)
}

pub fn member_count(conn: &Connection, group_id: Uuid) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM group_members WHERE group_id = ?1",
        [group_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Set the terminal lock flag. Returns false if it was already set.
pub fn lock_group(conn: &Connection, group_id: Uuid) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE project_groups SET is_locked = 1 WHERE id = ?1 AND is_locked = 0",
        [group_id.to_string()],
    )?;
    Ok(changed == 1)
}

/// Rewrite project details of an unlocked group. Returns false if the group
/// is locked or missing.
pub fn update_details(
    conn: &Connection,
    group_id: Uuid,
    project_name: &str,
    description: &str,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE project_groups SET project_name = ?2, description = ?3
         WHERE id = ?1 AND is_locked = 0",
        rusqlite::params![group_id.to_string(), project_name, description],
    )?;
    Ok(changed == 1)
}

pub fn get_group(conn: &Connection, group_id: Uuid) -> Result<Option<GroupView>> {
    let row = conn
        .query_row(
            "SELECT id, project_name, description, is_locked, created_at
             FROM project_groups WHERE id = ?1",
            [group_id.to_string()],
            map_group_row,
        )
        .optional()?;

    match row {
        Some(row) => {
            let group = row.into_model()?;
            let members = list_members(conn, group.id)?;
            Ok(Some(GroupView { group, members }))
        }
        None => Ok(None),
    }
}

pub fn group_for_member(conn: &Connection, student_id: Uuid) -> Result<Option<GroupView>> {
    match membership_of(conn, student_id)? {
        Some(membership) => get_group(conn, membership.group_id),
        None => Ok(None),
    }
}

pub fn list_members(conn: &Connection, group_id: Uuid) -> Result<Vec<GroupMember>> {
    let mut stmt = conn.prepare(
        "SELECT group_id, student_id, joined_at FROM group_members
         WHERE group_id = ?1
         ORDER BY joined_at ASC, student_id ASC",
    )?;

    let rows = stmt
        .query_map([group_id.to_string()], |row| {
            Ok(MemberRow {
                group_id: row.get(0)?,
                student_id: row.get(1)?,
                joined_at: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(MemberRow::into_model).collect()
}

pub fn list_groups(conn: &Connection, locked: Option<bool>) -> Result<Vec<GroupView>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_name, description, is_locked, created_at
         FROM project_groups
         WHERE ?1 IS NULL OR is_locked = ?1
         ORDER BY created_at DESC",
    )?;

    let rows = stmt
        .query_map([locked], map_group_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut groups = Vec::with_capacity(rows.len());
    for row in rows {
        let group = row.into_model()?;
        let members = list_members(conn, group.id)?;
        groups.push(GroupView { group, members });
    }
    Ok(groups)
}

fn map_group_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        project_name: row.get(1)?,
        description: row.get(2)?,
        is_locked: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_constraint_violation;
    use crate::students::upsert_student;
    use fyp_types::models::{AccountStatus, PLACEHOLDER_PROJECT_NAME, Student};

    fn student(db: &Database) -> Uuid {
        let student = Student {
            id: Uuid::new_v4(),
            display_name: "s".into(),
            current_semester: 5,
            account_status: AccountStatus::Active,
        };
        db.with_conn(|conn| upsert_student(conn, &student)).unwrap();
        student.id
    }

    fn group(db: &Database) -> Uuid {
        let group = Group {
            id: Uuid::new_v4(),
            project_name: PLACEHOLDER_PROJECT_NAME.into(),
            description: String::new(),
            is_locked: false,
            created_at: Utc::now(),
        };
        db.with_conn(|conn| insert_group(conn, &group)).unwrap();
        group.id
    }

    #[test]
    fn add_member_stops_at_capacity() {
        let db = Database::open_in_memory().unwrap();
        let gid = group(&db);
        let now = Utc::now();

        for _ in 0..3 {
            let sid = student(&db);
            assert!(db.with_conn(|conn| add_member(conn, gid, sid, now)).unwrap());
        }
        let fourth = student(&db);
        assert!(!db.with_conn(|conn| add_member(conn, gid, fourth, now)).unwrap());
        assert_eq!(db.with_conn(|conn| member_count(conn, gid)).unwrap(), 3);
    }

    #[test]
    fn student_cannot_join_two_groups() {
        let db = Database::open_in_memory().unwrap();
        let (g1, g2) = (group(&db), group(&db));
        let sid = student(&db);
        let now = Utc::now();

        assert!(db.with_conn(|conn| add_member(conn, g1, sid, now)).unwrap());
        let err = db.with_conn(|conn| add_member(conn, g2, sid, now)).unwrap_err();
        assert!(is_constraint_violation(&err));
    }

    #[test]
    fn locked_group_rejects_membership_changes() {
        let db = Database::open_in_memory().unwrap();
        let gid = group(&db);
        let (a, b) = (student(&db), student(&db));
        let now = Utc::now();
        db.with_conn(|conn| add_member(conn, gid, a, now)).unwrap();
        db.with_conn(|conn| add_member(conn, gid, b, now)).unwrap();

        assert!(db.with_conn(|conn| lock_group(conn, gid)).unwrap());
        assert!(!db.with_conn(|conn| lock_group(conn, gid)).unwrap());

        let c = student(&db);
        assert!(!db.with_conn(|conn| add_member(conn, gid, c, now)).unwrap());

        // The delete trigger backs up the guard in the service layer.
        let err = db.with_conn(|conn| remove_member(conn, gid, a)).unwrap_err();
        assert!(is_constraint_violation(&err));

        assert!(!db.with_conn(|conn| update_details(conn, gid, "x", "y")).unwrap());
    }

    #[test]
    fn membership_reports_count_and_lock() {
        let db = Database::open_in_memory().unwrap();
        let gid = group(&db);
        let (a, b) = (student(&db), student(&db));
        let now = Utc::now();
        db.with_conn(|conn| add_member(conn, gid, a, now)).unwrap();
        db.with_conn(|conn| add_member(conn, gid, b, now)).unwrap();

        let membership = db.with_conn(|conn| membership_of(conn, a)).unwrap().unwrap();
        assert_eq!(membership.group_id, gid);
        assert_eq!(membership.member_count, 2);
        assert!(!membership.is_locked);

        let view = db.group_for_member(b).unwrap().unwrap();
        assert!(view.has_member(a));
        assert_eq!(db.list_groups(Some(true)).unwrap().len(), 0);
        assert_eq!(db.list_groups(None).unwrap().len(), 1);
    }
}
