use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE students (
                id                  TEXT PRIMARY KEY,
                display_name        TEXT NOT NULL,
                current_semester    INTEGER NOT NULL,
                account_status      TEXT NOT NULL
                    CHECK (account_status IN ('active', 'suspended', 'deletion_requested')),
                updated_at          TEXT NOT NULL
            );

            CREATE TABLE requests (
                id                  TEXT PRIMARY KEY,
                kind                TEXT NOT NULL CHECK (kind IN ('message', 'partner')),
                from_student_id     TEXT NOT NULL REFERENCES students(id),
                to_student_id       TEXT NOT NULL REFERENCES students(id),
                status              TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'accepted', 'rejected')),
                reason              TEXT,
                created_at          TEXT NOT NULL,
                responded_at        TEXT,
                CHECK (from_student_id <> to_student_id)
            );

            -- One open request per direction and kind. The reverse direction is not covered.
            CREATE UNIQUE INDEX idx_requests_one_pending
                ON requests(from_student_id, to_student_id, kind)
                WHERE status = 'pending';

            CREATE INDEX idx_requests_from ON requests(from_student_id, status, created_at);
            CREATE INDEX idx_requests_to ON requests(to_student_id, status, created_at);

            CREATE TRIGGER requests_status_terminal
            BEFORE UPDATE OF status ON requests
            WHEN OLD.status <> 'pending'
            BEGIN
                SELECT RAISE(ABORT, 'request already processed');
            END;

            CREATE TABLE project_groups (
                id              TEXT PRIMARY KEY,
                project_name    TEXT NOT NULL,
                description     TEXT NOT NULL DEFAULT '',
                is_locked       INTEGER NOT NULL DEFAULT 0 CHECK (is_locked IN (0, 1)),
                created_at      TEXT NOT NULL
            );

            CREATE TRIGGER project_groups_lock_terminal
            BEFORE UPDATE OF is_locked ON project_groups
            WHEN OLD.is_locked = 1 AND NEW.is_locked = 0
            BEGIN
                SELECT RAISE(ABORT, 'group lock is terminal');
            END;

            CREATE TABLE group_members (
                group_id    TEXT NOT NULL REFERENCES project_groups(id),
                student_id  TEXT NOT NULL UNIQUE REFERENCES students(id),
                joined_at   TEXT NOT NULL,
                PRIMARY KEY (group_id, student_id)
            );

            CREATE TRIGGER group_members_capacity
            BEFORE INSERT ON group_members
            WHEN (SELECT COUNT(*) FROM group_members WHERE group_id = NEW.group_id) >= 3
            BEGIN
                SELECT RAISE(ABORT, 'group capacity exceeded');
            END;

            CREATE TRIGGER group_members_locked_insert
            BEFORE INSERT ON group_members
            WHEN (SELECT is_locked FROM project_groups WHERE id = NEW.group_id) = 1
            BEGIN
                SELECT RAISE(ABORT, 'group is locked');
            END;

            CREATE TRIGGER group_members_locked_delete
            BEFORE DELETE ON group_members
            WHEN (SELECT is_locked FROM project_groups WHERE id = OLD.group_id) = 1
            BEGIN
                SELECT RAISE(ABORT, 'group is locked');
            END;

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
