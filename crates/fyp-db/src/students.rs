//! Local mirror of the profile provider. This core only reads students;
//! `upsert_student` exists for the provider's sync feed.

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use fyp_types::models::Student;

use crate::models::{StudentRow, format_timestamp};
use crate::{Database, OptionalExt};

impl Database {
    pub fn upsert_student(&self, student: &Student) -> Result<()> {
        self.with_conn(|conn| upsert_student(conn, student))
    }

    pub fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
        self.with_conn(|conn| get_student(conn, id))
    }
}

pub fn upsert_student(conn: &Connection, student: &Student) -> Result<()> {
    conn.execute(
        "INSERT INTO students (id, display_name, current_semester, account_status, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            display_name = excluded.display_name,
            current_semester = excluded.current_semester,
            account_status = excluded.account_status,
            updated_at = excluded.updated_at",
        rusqlite::params![
            student.id.to_string(),
            student.display_name,
            student.current_semester,
            student.account_status.as_str(),
            format_timestamp(Utc::now()),
        ],
    )?;
    Ok(())
}

pub fn get_student(conn: &Connection, id: Uuid) -> Result<Option<Student>> {
    let row = conn
        .query_row(
            "SELECT id, display_name, current_semester, account_status FROM students WHERE id = ?1",
            [id.to_string()],
            |row| {
                Ok(StudentRow {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    current_semester: row.get(2)?,
                    account_status: row.get(3)?,
                })
            },
        )
        .optional()?;

    row.map(StudentRow::into_model).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fyp_types::models::AccountStatus;

    #[test]
    fn upsert_overwrites_profile_fields() {
        let db = Database::open_in_memory().unwrap();
        let mut student = Student {
            id: Uuid::new_v4(),
            display_name: "Grace".into(),
            current_semester: 5,
            account_status: AccountStatus::Active,
        };
        db.upsert_student(&student).unwrap();

        student.current_semester = 6;
        student.account_status = AccountStatus::Suspended;
        db.upsert_student(&student).unwrap();

        assert_eq!(db.get_student(student.id).unwrap(), Some(student));
        assert_eq!(db.get_student(Uuid::new_v4()).unwrap(), None);
    }
}
