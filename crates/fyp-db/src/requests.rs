use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rusqlite::types::ToSql;
use uuid::Uuid;

use fyp_types::models::{Direction, Request, RequestFilter, RequestKind, RequestStatus};

use crate::models::{RequestRow, format_timestamp};
use crate::{Database, OptionalExt};

const REQUEST_COLUMNS: &str =
    "id, kind, from_student_id, to_student_id, status, reason, created_at, responded_at";

impl Database {
    pub fn get_request(&self, id: Uuid) -> Result<Option<Request>> {
        self.with_conn(|conn| get_request(conn, id))
    }

    pub fn list_requests(&self, student_id: Uuid, filter: RequestFilter) -> Result<Vec<Request>> {
        self.with_conn(|conn| list_requests(conn, student_id, filter))
    }
}

pub fn insert_request(conn: &Connection, request: &Request) -> Result<()> {
    conn.execute(
        "INSERT INTO requests (id, kind, from_student_id, to_student_id, status, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            request.id.to_string(),
            request.kind.as_str(),
            request.from_student_id.to_string(),
            request.to_student_id.to_string(),
            request.status.as_str(),
            request.reason,
            format_timestamp(request.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_request(conn: &Connection, id: Uuid) -> Result<Option<Request>> {
    let sql = format!("SELECT {} FROM requests WHERE id = ?1", REQUEST_COLUMNS);
    let row = conn
        .query_row(&sql, [id.to_string()], map_row)
        .optional()?;

    row.map(RequestRow::into_model).transpose()
}

/// Whether an open request already exists in exactly this direction.
pub fn has_pending(conn: &Connection, from: Uuid, to: Uuid, kind: RequestKind) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM requests
            WHERE from_student_id = ?1 AND to_student_id = ?2 AND kind = ?3 AND status = 'pending'
         )",
        rusqlite::params![from.to_string(), to.to_string(), kind.as_str()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Move a pending request to `status`. Returns false if the request was no
/// longer pending, in which case nothing was written.
pub fn resolve(
    conn: &Connection,
    id: Uuid,
    status: RequestStatus,
    at: DateTime<Utc>,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE requests SET status = ?2, responded_at = ?3 WHERE id = ?1 AND status = 'pending'",
        rusqlite::params![id.to_string(), status.as_str(), format_timestamp(at)],
    )?;
    Ok(changed == 1)
}

pub fn list_requests(
    conn: &Connection,
    student_id: Uuid,
    filter: RequestFilter,
) -> Result<Vec<Request>> {
    let sid = student_id.to_string();
    let mut clauses = vec![match filter.direction {
        Direction::Sent => "from_student_id = ?1",
        Direction::Received => "to_student_id = ?1",
        Direction::Any => "(from_student_id = ?1 OR to_student_id = ?1)",
    }
    .to_string()];
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(sid)];

    if let Some(status) = filter.status {
        params.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", params.len()));
    }
    if let Some(kind) = filter.kind {
        params.push(Box::new(kind.as_str()));
        clauses.push(format!("kind = ?{}", params.len()));
    }

    let sql = format!(
        "SELECT {} FROM requests WHERE {} ORDER BY created_at DESC",
        REQUEST_COLUMNS,
        clauses.join(" AND ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(RequestRow::into_model).collect()
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        from_student_id: row.get(2)?,
        to_student_id: row.get(3)?,
        status: row.get(4)?,
        reason: row.get(5)?,
        created_at: row.get(6)?,
        responded_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_constraint_violation;
    use crate::students::upsert_student;
    use fyp_types::models::{AccountStatus, Student};

    fn seed(db: &Database, n: usize) -> Vec<Uuid> {
        (0..n)
            .map(|i| {
                let student = Student {
                    id: Uuid::new_v4(),
                    display_name: format!("student-{}", i),
                    current_semester: 5,
                    account_status: AccountStatus::Active,
                };
                db.with_conn(|conn| upsert_student(conn, &student)).unwrap();
                student.id
            })
            .collect()
    }

    #[test]
    fn pending_index_rejects_same_direction_duplicate() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed(&db, 2);

        let first = Request::pending(RequestKind::Partner, ids[0], ids[1], None);
        db.with_conn(|conn| insert_request(conn, &first)).unwrap();

        let dup = Request::pending(RequestKind::Partner, ids[0], ids[1], None);
        let err = db.with_conn(|conn| insert_request(conn, &dup)).unwrap_err();
        assert!(is_constraint_violation(&err));

        // Reverse direction and other kinds are independent.
        let reverse = Request::pending(RequestKind::Partner, ids[1], ids[0], None);
        db.with_conn(|conn| insert_request(conn, &reverse)).unwrap();
        let message = Request::pending(RequestKind::Message, ids[0], ids[1], None);
        db.with_conn(|conn| insert_request(conn, &message)).unwrap();
    }

    #[test]
    fn resolve_only_moves_pending_requests() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed(&db, 2);
        let request = Request::pending(RequestKind::Message, ids[0], ids[1], Some("hi".into()));
        db.with_conn(|conn| insert_request(conn, &request)).unwrap();

        let now = Utc::now();
        assert!(db.with_conn(|conn| resolve(conn, request.id, RequestStatus::Rejected, now)).unwrap());
        assert!(!db.with_conn(|conn| resolve(conn, request.id, RequestStatus::Accepted, now)).unwrap());

        let stored = db.get_request(request.id).unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Rejected);
        assert!(stored.responded_at.is_some());
        assert_eq!(stored.reason.as_deref(), Some("hi"));
    }

    #[test]
    fn list_filters_by_direction_and_status() {
        let db = Database::open_in_memory().unwrap();
        let ids = seed(&db, 3);
        for (from, to) in [(0, 1), (2, 0), (1, 2)] {
            let request = Request::pending(RequestKind::Partner, ids[from], ids[to], None);
            db.with_conn(|conn| insert_request(conn, &request)).unwrap();
        }

        let any = db.list_requests(ids[0], RequestFilter::default()).unwrap();
        assert_eq!(any.len(), 2);

        let sent = db
            .list_requests(
                ids[0],
                RequestFilter {
                    direction: Direction::Sent,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_student_id, ids[1]);

        let accepted = db
            .list_requests(
                ids[0],
                RequestFilter {
                    status: Some(RequestStatus::Accepted),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(accepted.is_empty());
    }
}
