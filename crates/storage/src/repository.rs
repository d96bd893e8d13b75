//! Repository Implementation

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use crate::{validate_read_only, ConfigRecord, NameCardRecord, Record, StorageError, Value};

const INSERT_CONFIG: &str = "INSERT INTO test (id, name, config) VALUES (?, ?, ?)";
const INSERT_NAME_CARD: &str = "INSERT INTO name_card (name, age) VALUES (?, ?)";

/// Access layer for the record store.
///
/// Holds no connection between calls: every operation opens its own,
/// runs one statement and closes it again. Dropping the connection on an
/// error path releases it as well.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    /// Point the store at an existing SQLite file. Nothing is opened yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        info!("Using record store at {}", path.display());
        Self { path }
    }

    /// Run caller supplied read-only query text.
    ///
    /// Rows come back in store order with columns in result-set order.
    pub async fn query(&self, text: &str) -> Result<Vec<Record>, StorageError> {
        if let Err(e) = validate_read_only(text) {
            warn!("Rejected query: {}", e);
            metrics::counter!("records_rejected_queries_total").increment(1);
            return Err(e);
        }

        let mut conn = self.connect(true).await?;
        let rows = sqlx::query(text)
            .fetch_all(&mut conn)
            .await
            .map_err(read_error)?;
        close(conn).await?;

        let records = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_error)?;

        debug!("Query returned {} rows", records.len());
        metrics::counter!("records_queries_total").increment(1);
        Ok(records)
    }

    /// Insert one row into `test`
    pub async fn insert_config(&self, id: i64, name: &str, config: &str) -> Result<(), StorageError> {
        let mut conn = self.connect(false).await?;
        sqlx::query(INSERT_CONFIG)
            .bind(id)
            .bind(name)
            .bind(config)
            .execute(&mut conn)
            .await
            .map_err(write_error)?;
        close(conn).await?;

        debug!("Inserted config record {}", id);
        metrics::counter!("records_inserts_total", "table" => "test").increment(1);
        Ok(())
    }

    /// Insert one row into `name_card`
    pub async fn insert_name_card(&self, name: &str, age: i64) -> Result<(), StorageError> {
        let mut conn = self.connect(false).await?;
        sqlx::query(INSERT_NAME_CARD)
            .bind(name)
            .bind(age)
            .execute(&mut conn)
            .await
            .map_err(write_error)?;
        close(conn).await?;

        debug!("Inserted name card for {}", name);
        metrics::counter!("records_inserts_total", "table" => "name_card").increment(1);
        Ok(())
    }

    pub async fn insert_config_record(&self, record: &ConfigRecord) -> Result<(), StorageError> {
        self.insert_config(record.id, &record.name, &record.config).await
    }

    pub async fn insert_name_card_record(&self, record: &NameCardRecord) -> Result<(), StorageError> {
        self.insert_name_card(&record.name, record.age).await
    }

    /// Open and close a connection to check that the store is reachable
    pub async fn ping(&self) -> Result<(), StorageError> {
        let conn = self.connect(true).await?;
        close(conn).await
    }

    async fn connect(&self, read_only: bool) -> Result<SqliteConnection, StorageError> {
        SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(read_only)
            .connect()
            .await
            .map_err(|e| {
                warn!("Failed to open {}: {}", self.path.display(), e);
                StorageError::StoreConnectionError(e.to_string())
            })
    }
}

async fn close(conn: SqliteConnection) -> Result<(), StorageError> {
    conn.close()
        .await
        .map_err(|e| StorageError::StoreConnectionError(e.to_string()))
}

/// Primary SQLite result codes that blame the statement rather than the
/// store: SQLITE_ERROR, SQLITE_READONLY, SQLITE_TOOBIG, SQLITE_MISMATCH,
/// SQLITE_AUTH and SQLITE_RANGE.
const STATEMENT_ERROR_CODES: [i32; 6] = [1, 8, 18, 20, 23, 25];

/// Statement errors (syntax, unknown table, write attempted on the
/// read-only connection) are the caller's fault. Busy, locked, I/O and
/// corruption errors belong to the store.
fn read_error(err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Database(e) => {
            warn!("Query failed: {}", e);
            // sqlite reports the extended code; the low byte is the primary code
            let primary = e
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| code & 0xff);
            match primary {
                Some(code) if STATEMENT_ERROR_CODES.contains(&code) => {
                    StorageError::InvalidQuery(e.to_string())
                }
                _ => StorageError::StoreConnectionError(e.to_string()),
            }
        }
        other => StorageError::StoreConnectionError(other.to_string()),
    }
}

fn write_error(err: sqlx::Error) -> StorageError {
    warn!("Insert failed: {}", err);
    StorageError::StoreWriteError(err.to_string())
}

fn decode_row(row: &SqliteRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::with_capacity(row.len());

    for (i, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(i)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            // runtime storage class of the cell, not the declared column type
            match raw.type_info().name() {
                "INTEGER" => Value::Integer(row.try_get(i)?),
                "REAL" => Value::Real(row.try_get(i)?),
                "BLOB" => Value::Blob(row.try_get(i)?),
                // TEXT is not guaranteed to be valid UTF-8 in SQLite
                _ => {
                    let bytes: Vec<u8> = row.try_get_unchecked(i)?;
                    Value::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
            }
        };
        record.push(column.name(), value);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Executor;
    use tempfile::TempDir;

    const SCHEMA: &str = "CREATE TABLE test (id INTEGER, name TEXT, config TEXT);
                          CREATE TABLE name_card (name TEXT, age INTEGER);";

    async fn setup(schema: &str) -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.db");

        let mut conn = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .connect()
            .await
            .unwrap();
        conn.execute(schema).await.unwrap();
        conn.close().await.unwrap();

        (dir, RecordStore::new(path))
    }

    #[tokio::test]
    async fn test_config_insert_and_query() {
        let (_dir, store) = setup(SCHEMA).await;

        store.insert_config(1, "alpha", "{\"x\":1}").await.unwrap();

        let rows = store
            .query("SELECT id,name,config FROM test WHERE id=1")
            .await
            .unwrap();
        let expected: Record = [
            ("id", Value::Integer(1)),
            ("name", Value::from("alpha")),
            ("config", Value::from("{\"x\":1}")),
        ]
        .into_iter()
        .collect();
        assert_eq!(rows, vec![expected]);
    }

    #[tokio::test]
    async fn test_name_card_insert_and_query() {
        let (_dir, store) = setup(SCHEMA).await;

        store.insert_name_card("Jay", 30).await.unwrap();

        let rows = store
            .query("SELECT name,age FROM name_card WHERE name='Jay'")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::from("Jay")));
        assert_eq!(rows[0].get("age"), Some(&Value::Integer(30)));
    }

    #[tokio::test]
    async fn test_quotes_round_trip_through_bound_parameters() {
        let (_dir, store) = setup(SCHEMA).await;

        store.insert_name_card("O'Brien", 41).await.unwrap();
        store
            .insert_config(2, "x'); DROP TABLE test; --", "{\"q\":\"it's\"}")
            .await
            .unwrap();

        let cards = store.query("SELECT name FROM name_card").await.unwrap();
        assert_eq!(cards[0].get("name"), Some(&Value::from("O'Brien")));

        let configs = store.query("SELECT name, config FROM test").await.unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(
            configs[0].get("name"),
            Some(&Value::from("x'); DROP TABLE test; --"))
        );
        assert_eq!(configs[0].get("config"), Some(&Value::from("{\"q\":\"it's\"}")));
    }

    #[tokio::test]
    async fn test_rejected_statement_does_not_mutate() {
        let (_dir, store) = setup(SCHEMA).await;
        store.insert_config(1, "alpha", "{}").await.unwrap();

        let err = store.query("DROP TABLE test").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidQuery(_)));

        let err = store.query("SELECT 1; DELETE FROM test").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidQuery(_)));

        let rows = store.query("SELECT id FROM test").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_cte_write_blocked_by_read_only_connection() {
        let (_dir, store) = setup(SCHEMA).await;
        store.insert_name_card("Jay", 30).await.unwrap();

        let err = store
            .query("WITH doomed AS (SELECT 1) DELETE FROM name_card")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidQuery(_)));

        let rows = store.query("SELECT name FROM name_card").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_select_is_invalid_query() {
        let (_dir, store) = setup(SCHEMA).await;

        let err = store.query("SELECT FROM WHERE").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidQuery(_)));

        let err = store.query("SELECT * FROM missing_table").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_rows_keep_store_order_and_types() {
        let (_dir, store) = setup(SCHEMA).await;
        for (name, age) in [("c", 3), ("a", 1), ("b", 2)] {
            store.insert_name_card(name, age).await.unwrap();
        }

        let rows = store
            .query("SELECT age, name, NULL AS empty, 1.5 AS ratio, x'00ff' AS raw FROM name_card")
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().filter_map(|r| r.get("name")).cloned().collect();
        assert_eq!(names, vec![Value::from("c"), Value::from("a"), Value::from("b")]);

        let first = &rows[0];
        assert_eq!(
            first.columns().collect::<Vec<_>>(),
            vec!["age", "name", "empty", "ratio", "raw"]
        );
        assert_eq!(first.get("empty"), Some(&Value::Null));
        assert_eq!(first.get("ratio"), Some(&Value::Real(1.5)));
        assert_eq!(first.get("raw"), Some(&Value::Blob(vec![0x00, 0xff])));
    }

    #[tokio::test]
    async fn test_invalid_utf8_text_is_decoded_lossily() {
        let (_dir, store) = setup(SCHEMA).await;

        let rows = store
            .query("SELECT CAST(x'ff' AS TEXT) AS t, CAST(x'4a6179' AS TEXT) AS ok")
            .await
            .unwrap();
        assert_eq!(rows[0].get("t"), Some(&Value::from("\u{FFFD}")));
        assert_eq!(rows[0].get("ok"), Some(&Value::from("Jay")));
    }

    #[tokio::test]
    async fn test_locked_store_is_connection_error() {
        let (_dir, store) = setup(SCHEMA).await;
        store.insert_name_card("Jay", 30).await.unwrap();

        let mut holder = SqliteConnectOptions::new()
            .filename(store.path.clone())
            .busy_timeout(std::time::Duration::from_millis(0))
            .connect()
            .await
            .unwrap();
        holder.execute("BEGIN EXCLUSIVE").await.unwrap();

        let err = store.query("SELECT * FROM name_card").await.unwrap_err();
        assert!(
            matches!(err, StorageError::StoreConnectionError(_)),
            "unexpected error: {:?}",
            err
        );

        holder.execute("ROLLBACK").await.unwrap();
        holder.close().await.unwrap();

        let rows = store.query("SELECT * FROM name_card").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_config_ids_are_accepted_without_constraint() {
        let (_dir, store) = setup(SCHEMA).await;

        store.insert_config(1, "first", "{}").await.unwrap();
        store.insert_config(1, "second", "{}").await.unwrap();

        let rows = store.query("SELECT name FROM test WHERE id = 1").await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_constraint_violation_is_write_error() {
        let (_dir, store) = setup(
            "CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT, config TEXT);
             CREATE TABLE name_card (name TEXT NOT NULL, age INTEGER);",
        )
        .await;

        store.insert_config(1, "first", "{}").await.unwrap();
        let err = store.insert_config(1, "second", "{}").await.unwrap_err();
        assert!(matches!(err, StorageError::StoreWriteError(_)));

        let rows = store.query("SELECT name FROM test").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_table_on_insert_is_write_error() {
        let (_dir, store) = setup("CREATE TABLE other (x INTEGER);").await;

        let err = store.insert_name_card("Jay", 30).await.unwrap_err();
        assert!(matches!(err, StorageError::StoreWriteError(_)));
    }

    #[tokio::test]
    async fn test_missing_file_is_connection_error() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().join("absent.db"));

        assert!(matches!(
            store.ping().await,
            Err(StorageError::StoreConnectionError(_))
        ));
        assert!(matches!(
            store.insert_name_card("Jay", 30).await,
            Err(StorageError::StoreConnectionError(_))
        ));
        assert!(matches!(
            store.query("SELECT 1").await,
            Err(StorageError::StoreConnectionError(_))
        ));
        assert!(!dir.path().join("absent.db").exists());
    }

    #[tokio::test]
    async fn test_record_wrappers() {
        let (_dir, store) = setup(SCHEMA).await;

        store
            .insert_config_record(&ConfigRecord {
                id: 9,
                name: "wrapped".to_string(),
                config: "[]".to_string(),
            })
            .await
            .unwrap();
        store
            .insert_name_card_record(&NameCardRecord {
                name: "Ann".to_string(),
                age: 5,
            })
            .await
            .unwrap();

        let rows = store.query("SELECT id FROM test").await.unwrap();
        assert_eq!(rows[0].get("id"), Some(&Value::Integer(9)));
        let rows = store.query("SELECT age FROM name_card").await.unwrap();
        assert_eq!(rows[0].get("age"), Some(&Value::Integer(5)));
    }
}
