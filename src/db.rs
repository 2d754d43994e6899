use sqlx::SqlitePool;

pub async fn init_db(database_url: &str) -> SqlitePool {
    SqlitePool::connect(database_url)
        .await
        .expect("Failed to connect to database")
}

/// Create the attendance schema if missing. The unique constraint is the
/// record identity: one row per (person, program, date, checkpoint).
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id TEXT NOT NULL,
            program_name TEXT NOT NULL,
            week INTEGER NOT NULL DEFAULT 0,
            date TEXT NOT NULL,
            checkpoint_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'present',
            recorded_by TEXT NOT NULL DEFAULT '',
            recorded_at TEXT NOT NULL DEFAULT (datetime('now')),
            notes TEXT,
            UNIQUE (person_id, program_name, date, checkpoint_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_attendance_date_program
        ON attendance_records (date, program_name)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
