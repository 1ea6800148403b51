use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, StorageError};
use crate::models::{Application, ApplicationDraft, ApplicationId};
use crate::status::{Priority, Status};
use crate::store::Store;

const COLUMNS: &str = "id, company, position, location, job_link, source, status,
    applied_date, follow_up_date, salary_min, salary_max, contact_name, contact_email,
    resume_version, priority, tags, notes, created_at, updated_at";

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StorageError::from)?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Private database that disappears with the connection. Schema is
    /// created up front.
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company TEXT NOT NULL CHECK (length(trim(company)) > 0),
                position TEXT NOT NULL CHECK (length(trim(position)) > 0),
                location TEXT,
                job_link TEXT,
                source TEXT,
                status TEXT NOT NULL DEFAULT 'applied'
                    CHECK (status IN ('saved', 'applied', 'interviewing', 'offer', 'rejected', 'ghosted')),
                applied_date TEXT,
                follow_up_date TEXT,
                salary_min REAL CHECK (salary_min IS NULL OR salary_min >= 0),
                salary_max REAL CHECK (salary_max IS NULL OR salary_max >= 0),
                contact_name TEXT,
                contact_email TEXT,
                resume_version TEXT,
                priority TEXT NOT NULL DEFAULT 'medium'
                    CHECK (priority IN ('low', 'medium', 'high', 'urgent')),
                tags TEXT NOT NULL DEFAULT '[]',
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);
            CREATE INDEX IF NOT EXISTS idx_applications_created ON applications(created_at);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='applications'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(StorageError::NotInitialized.into());
        }
        Ok(())
    }

    fn row_to_application(row: &Row) -> rusqlite::Result<Application> {
        let tags: String = row.get(15)?;
        let tags = serde_json::from_str(&tags).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(15, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Application {
            id: row.get(0)?,
            company: row.get(1)?,
            position: row.get(2)?,
            location: row.get(3)?,
            job_link: row.get(4)?,
            source: row.get(5)?,
            status: row.get(6)?,
            applied_date: row.get(7)?,
            follow_up_date: row.get(8)?,
            salary_min: row.get(9)?,
            salary_max: row.get(10)?,
            contact_name: row.get(11)?,
            contact_email: row.get(12)?,
            resume_version: row.get(13)?,
            priority: row.get(14)?,
            tags,
            notes: row.get(16)?,
            created_at: row.get(17)?,
            updated_at: row.get(18)?,
        })
    }
}

impl Store for Database {
    fn get(&self, id: ApplicationId) -> Result<Application> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM applications WHERE id = ?1", COLUMNS),
                [id],
                Self::row_to_application,
            )
            .optional()?
            .ok_or(Error::NotFound(id))
    }

    fn insert(&self, draft: ApplicationDraft) -> Result<Application> {
        let now = Utc::now();
        let tags = serde_json::to_string(&draft.tags).map_err(StorageError::from)?;

        self.conn.execute(
            "INSERT INTO applications (company, position, location, job_link, source, status,
                 applied_date, follow_up_date, salary_min, salary_max, contact_name,
                 contact_email, resume_version, priority, tags, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)",
            params![
                draft.company,
                draft.position,
                draft.location,
                draft.job_link,
                draft.source,
                draft.status,
                draft.applied_date,
                draft.follow_up_date,
                draft.salary_min,
                draft.salary_max,
                draft.contact_name,
                draft.contact_email,
                draft.resume_version,
                draft.priority,
                tags,
                draft.notes,
                now,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        Ok(draft.into_application(id, now))
    }

    fn replace(&self, id: ApplicationId, record: &Application) -> Result<()> {
        let tags = serde_json::to_string(&record.tags).map_err(StorageError::from)?;

        let changed = self.conn.execute(
            "UPDATE applications SET company = ?2, position = ?3, location = ?4, job_link = ?5,
                 source = ?6, status = ?7, applied_date = ?8, follow_up_date = ?9,
                 salary_min = ?10, salary_max = ?11, contact_name = ?12, contact_email = ?13,
                 resume_version = ?14, priority = ?15, tags = ?16, notes = ?17, updated_at = ?18
             WHERE id = ?1",
            params![
                id,
                record.company,
                record.position,
                record.location,
                record.job_link,
                record.source,
                record.status,
                record.applied_date,
                record.follow_up_date,
                record.salary_min,
                record.salary_max,
                record.contact_name,
                record.contact_email,
                record.resume_version,
                record.priority,
                tags,
                record.notes,
                record.updated_at,
            ],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }

    fn delete(&self, id: ApplicationId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM applications WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Application>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM applications ORDER BY created_at DESC, id DESC",
            COLUMNS
        ))?;
        let rows = stmt.query_map([], Self::row_to_application)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApplicationInput, TagsInput};
    use crate::validate::validate_create;
    use chrono::NaiveDate;

    fn draft(company: &str) -> ApplicationDraft {
        validate_create(ApplicationInput {
            company: Some(company.to_string()),
            position: Some("Engineer".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_insert_and_get_round_trip_every_field() {
        let db = Database::open_in_memory().unwrap();
        let full = validate_create(ApplicationInput {
            company: Some("Acme".to_string()),
            position: Some("Engineer".to_string()),
            location: Some("Remote".to_string()),
            job_link: Some("https://acme.example/jobs/1".to_string()),
            source: Some("referral".to_string()),
            status: Some("saved".to_string()),
            applied_date: Some("2024-03-01".to_string()),
            follow_up_date: Some("2024-03-08".to_string()),
            salary_min: Some(0.0),
            salary_max: Some(150_000.5),
            contact_name: Some("Wile E.".to_string()),
            contact_email: Some("wile@acme.example".to_string()),
            resume_version: Some("v3".to_string()),
            priority: Some("urgent".to_string()),
            tags: Some(TagsInput::Csv("rust, remote".to_string())),
            notes: Some("Ask about on-call".to_string()),
        })
        .unwrap();

        let created = db.insert(full).unwrap();
        let loaded = db.get(created.id).unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.salary_min, Some(0.0));
        assert_eq!(loaded.salary_max, Some(150_000.5));
        assert_eq!(loaded.applied_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(loaded.tags, vec!["rust", "remote"]);
        assert_eq!(loaded.priority, Priority::Urgent);
    }

    #[test]
    fn test_unset_fields_come_back_unset() {
        let db = Database::open_in_memory().unwrap();
        let created = db.insert(draft("Acme")).unwrap();
        let loaded = db.get(created.id).unwrap();
        assert_eq!(loaded.location, None);
        assert_eq!(loaded.salary_max, None);
        assert_eq!(loaded.follow_up_date, None);
        assert!(loaded.tags.is_empty());
    }

    #[test]
    fn test_replace_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let mut record = db.insert(draft("Acme")).unwrap();
        record.status = Status::Offer;
        record.tags = vec!["dream".to_string()];
        db.replace(record.id, &record).unwrap();
        assert_eq!(db.get(record.id).unwrap(), record);

        db.delete(record.id).unwrap();
        assert!(matches!(db.get(record.id), Err(Error::NotFound(_))));
        assert!(matches!(db.delete(record.id), Err(Error::NotFound(_))));
        assert!(matches!(db.replace(record.id, &record), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_autoincrement_never_reuses_ids() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert(draft("Acme")).unwrap();
        db.delete(a.id).unwrap();
        let b = db.insert(draft("Globex")).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn test_list_all_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert(draft("Acme")).unwrap();
        let b = db.insert(draft("Globex")).unwrap();
        let c = db.insert(draft("Initech")).unwrap();
        let ids: Vec<_> = db.list_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[test]
    fn test_schema_rejects_unknown_status() {
        let db = Database::open_in_memory().unwrap();
        let record = db.insert(draft("Acme")).unwrap();
        let result = db.conn.execute(
            "UPDATE applications SET status = 'hired' WHERE id = ?1",
            [record.id],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_ensure_initialized() {
        let db = Database {
            conn: Connection::open_in_memory().unwrap(),
            path: PathBuf::from(":memory:"),
        };
        assert!(matches!(
            db.ensure_initialized(),
            Err(Error::Storage(StorageError::NotInitialized))
        ));
        db.init().unwrap();
        db.ensure_initialized().unwrap();
    }
}
