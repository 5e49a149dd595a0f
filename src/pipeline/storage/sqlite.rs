use chrono::{NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, error, info};

use super::{
    AuditLogEntry, AuditLogRow, ClientErrorRate, ClientMemberCount, StoredMember, ZipMemberCount,
};
use crate::app::ports::MemberStore;
use crate::domain::{Gender, NormalizedMember};
use crate::error::StorageError;
use crate::metrics::PersistenceMetrics;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS members (
        member_id       TEXT NOT NULL,
        first_name      TEXT NOT NULL,
        last_name       TEXT NOT NULL,
        dob             TEXT NOT NULL,
        gender          TEXT NOT NULL,
        phone           TEXT NOT NULL,
        email           TEXT,
        zip5            TEXT NOT NULL,
        plan_id         TEXT NOT NULL,
        client_id       TEXT NOT NULL,
        ingestion_time  TEXT NOT NULL,
        PRIMARY KEY (member_id, client_id)
    );
    CREATE TABLE IF NOT EXISTS audit_log (
        audit_id        INTEGER PRIMARY KEY AUTOINCREMENT,
        client_id       TEXT NOT NULL,
        file_name       TEXT NOT NULL,
        total_rows      INTEGER NOT NULL,
        valid_rows      INTEGER NOT NULL,
        invalid_rows    INTEGER NOT NULL,
        ingestion_time  TEXT NOT NULL
    );
"#;

const UPSERT_MEMBER: &str = r#"
    INSERT INTO members
        (member_id, first_name, last_name, dob, gender, phone, email, zip5, plan_id, client_id, ingestion_time)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    ON CONFLICT(member_id, client_id) DO UPDATE SET
        first_name = excluded.first_name,
        last_name = excluded.last_name,
        dob = excluded.dob,
        gender = excluded.gender,
        phone = excluded.phone,
        email = excluded.email,
        zip5 = excluded.zip5,
        plan_id = excluded.plan_id,
        ingestion_time = excluded.ingestion_time
"#;

/// SQLite-backed member store
pub struct SqliteMemberStore {
    conn: Connection,
}

impl SqliteMemberStore {
    /// Open (creating if needed) the database at `db_path`
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(db_path)?;
        info!("Opened member database at {}", db_path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn write_members(
        &mut self,
        client_id: &str,
        members: &[NormalizedMember],
    ) -> Result<usize, StorageError> {
        let ingestion_time = now_text();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_MEMBER)?;
            for m in members {
                stmt.execute(params![
                    m.member_id(),
                    m.first_name(),
                    m.last_name(),
                    m.dob().format("%Y-%m-%d").to_string(),
                    m.gender().as_str(),
                    m.phone(),
                    m.email(),
                    m.zip5(),
                    m.plan_id(),
                    client_id,
                    ingestion_time,
                ])?;
            }
        }
        tx.commit()?;
        Ok(members.len())
    }

    pub fn get_member(
        &self,
        client_id: &str,
        member_id: &str,
    ) -> Result<Option<StoredMember>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT member_id, first_name, last_name, dob, gender, phone, email, zip5, plan_id, ingestion_time
                 FROM members WHERE client_id = ?1 AND member_id = ?2",
                params![client_id, member_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<String>>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, String>(9)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            member_id,
            first_name,
            last_name,
            dob,
            gender,
            phone,
            email,
            zip5,
            plan_id,
            ingestion_time,
        )) = row
        else {
            return Ok(None);
        };

        let dob = NaiveDate::parse_from_str(&dob, "%Y-%m-%d").map_err(|_| {
            StorageError::InvalidStoredValue {
                column: "dob",
                value: dob.clone(),
            }
        })?;
        let gender =
            Gender::from_code(&gender).ok_or_else(|| StorageError::InvalidStoredValue {
                column: "gender",
                value: gender.clone(),
            })?;

        Ok(Some(StoredMember {
            client_id: client_id.to_string(),
            member: NormalizedMember {
                member_id,
                first_name,
                last_name,
                dob,
                gender,
                phone,
                email,
                zip5,
                plan_id,
            },
            ingestion_time,
        }))
    }

    /// Every audit row, oldest first
    pub fn audit_entries(&self) -> Result<Vec<AuditLogEntry>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT audit_id, client_id, file_name, total_rows, valid_rows, invalid_rows, ingestion_time
             FROM audit_log ORDER BY audit_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(AuditLogEntry {
                audit_id: row.get(0)?,
                client_id: row.get(1)?,
                file_name: row.get(2)?,
                total_rows: row.get(3)?,
                valid_rows: row.get(4)?,
                invalid_rows: row.get(5)?,
                ingestion_time: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn unique_members_per_client(&self) -> Result<Vec<ClientMemberCount>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT client_id, COUNT(DISTINCT member_id) AS unique_members
             FROM members GROUP BY client_id ORDER BY client_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ClientMemberCount {
                client_id: row.get(0)?,
                unique_members: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// ZIP codes by member count, largest first; ties by ZIP
    pub fn members_per_zip(&self) -> Result<Vec<ZipMemberCount>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT zip5, COUNT(*) AS member_count
             FROM members GROUP BY zip5 ORDER BY member_count DESC, zip5 ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ZipMemberCount {
                zip5: row.get(0)?,
                member_count: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Rejected over total rows per client; `0.0` for clients that sent no rows
    pub fn ingestion_error_rate(&self) -> Result<Vec<ClientErrorRate>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT client_id,
                    CASE WHEN SUM(total_rows) = 0 THEN 0.0
                         ELSE SUM(invalid_rows) * 1.0 / SUM(total_rows) END AS error_rate
             FROM audit_log GROUP BY client_id ORDER BY client_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ClientErrorRate {
                client_id: row.get(0)?,
                error_rate: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl MemberStore for SqliteMemberStore {
    fn upsert_members(
        &mut self,
        client_id: &str,
        members: &[NormalizedMember],
    ) -> Result<usize, StorageError> {
        match self.write_members(client_id, members) {
            Ok(count) => {
                PersistenceMetrics::record_members_upserted(count);
                debug!(client_id, count, "Members upserted");
                Ok(count)
            }
            Err(e) => {
                PersistenceMetrics::record_upsert_error();
                error!(client_id, "Member upsert failed: {}", e);
                Err(e)
            }
        }
    }

    fn insert_audit_log(&mut self, row: &AuditLogRow) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO audit_log (client_id, file_name, total_rows, valid_rows, invalid_rows, ingestion_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.client_id(),
                row.file_name(),
                row.total_rows() as i64,
                row.valid_rows() as i64,
                row.invalid_rows() as i64,
                row.ingestion_time().to_rfc3339_opts(SecondsFormat::Secs, true),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

fn now_text() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawRow;
    use crate::pipeline::audit::reconcile;
    use crate::pipeline::ingestion::IngestionMetadata;
    use crate::pipeline::processing::validate::RecordValidator;
    use crate::pipeline::processing::IngestionBatch;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn member(id: &str, first: &str, zip: &str) -> NormalizedMember {
        RecordValidator::default()
            .validate(&RawRow::from_pairs(
                1,
                [
                    ("member_id", id),
                    ("first_name", first),
                    ("last_name", "Doe"),
                    ("dob", "1980-01-15"),
                    ("gender", "M"),
                    ("phone", "5551234567"),
                    ("zip5", zip),
                    ("plan_id", "PLAN_A"),
                ],
            ))
            .unwrap()
    }

    fn audit_row(client_id: &str, valid: usize, rejected: usize) -> AuditLogRow {
        let batch = IngestionBatch {
            batch_id: Uuid::new_v4(),
            client_id: client_id.to_string(),
            file_name: "members.csv".to_string(),
            accepted: (0..valid).map(|i| member(&i.to_string(), "A", "94105")).collect(),
            rejected: Vec::new(),
            total_rows_read: valid,
            quarantine_path: None,
        };
        let mut record = reconcile(
            &batch,
            &IngestionMetadata {
                client_id: client_id.to_string(),
                file_name: "members.csv".to_string(),
                local_path: PathBuf::from("raw/members.csv"),
                ingestion_time: Utc::now(),
                checksum: "abc".to_string(),
                file_size: 1,
            },
        );
        // Only the counts matter here
        record.rejected_row_count = rejected;
        record.total_row_processed = valid + rejected;
        AuditLogRow::from(&record)
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("nested").join("members.db");
        SqliteMemberStore::open(&db).unwrap();
        assert!(db.exists());
    }

    #[test]
    fn test_upsert_is_last_write_wins() {
        let mut store = SqliteMemberStore::open_in_memory().unwrap();

        store.upsert_members("acme", &[member("1", "John", "94105")]).unwrap();
        store.upsert_members("acme", &[member("1", "Johnny", "10001")]).unwrap();

        let stored = store.get_member("acme", "1").unwrap().unwrap();
        assert_eq!(stored.member.first_name(), "Johnny");
        assert_eq!(stored.member.zip5(), "10001");
        assert_eq!(store.unique_members_per_client().unwrap()[0].unique_members, 1);
    }

    #[test]
    fn test_same_member_id_is_distinct_per_client() {
        let mut store = SqliteMemberStore::open_in_memory().unwrap();

        store.upsert_members("acme", &[member("1", "John", "94105")]).unwrap();
        store.upsert_members("globex", &[member("1", "Jane", "94105")]).unwrap();

        assert_eq!(
            store.get_member("acme", "1").unwrap().unwrap().member.first_name(),
            "John"
        );
        assert_eq!(
            store.get_member("globex", "1").unwrap().unwrap().member.first_name(),
            "Jane"
        );
        assert!(store.get_member("initech", "1").unwrap().is_none());
    }

    #[test]
    fn test_stored_member_round_trips_typed_fields() {
        let mut store = SqliteMemberStore::open_in_memory().unwrap();
        let original = member("7", "Ann", "02139");
        store.upsert_members("acme", &[original.clone()]).unwrap();

        let stored = store.get_member("acme", "7").unwrap().unwrap();
        assert_eq!(stored.member, original);
    }

    #[test]
    fn test_members_per_zip_ordering() {
        let mut store = SqliteMemberStore::open_in_memory().unwrap();
        store
            .upsert_members(
                "acme",
                &[
                    member("1", "A", "22222"),
                    member("2", "B", "11111"),
                    member("3", "C", "33333"),
                    member("4", "D", "33333"),
                ],
            )
            .unwrap();

        let zips: Vec<(String, i64)> = store
            .members_per_zip()
            .unwrap()
            .into_iter()
            .map(|z| (z.zip5, z.member_count))
            .collect();
        assert_eq!(
            zips,
            vec![
                ("33333".to_string(), 2),
                ("11111".to_string(), 1),
                ("22222".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_audit_log_and_error_rate() {
        let mut store = SqliteMemberStore::open_in_memory().unwrap();

        let first = store.insert_audit_log(&audit_row("acme", 3, 1)).unwrap();
        let second = store.insert_audit_log(&audit_row("acme", 4, 2)).unwrap();
        store.insert_audit_log(&audit_row("empty", 0, 0)).unwrap();
        assert!(second > first);

        let entries = store.audit_entries().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].total_rows, 4);
        assert_eq!(entries[0].invalid_rows, 1);

        let rates = store.ingestion_error_rate().unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].client_id, "acme");
        assert!((rates[0].error_rate - 3.0 / 10.0).abs() < 1e-9);
        assert_eq!(rates[1].client_id, "empty");
        assert_eq!(rates[1].error_rate, 0.0);
    }
}
