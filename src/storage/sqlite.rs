//! SqliteStore: one table per frame type on a single rusqlite connection.

use std::path::Path;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::error::{Result, StorageError};
use crate::sa::{Activity, FrameType, Gvcid, SaFilter, SaParams, SaState, SecAssn, SpiScid};

use super::traits::{SaStore, StoreSession};

const COLUMNS: &str = "spi, scid, tfvn, vcid, mapid, sa_state, ekid, ecs, ecs_len, akid, acs, \
     acs_len, iv, iv_len, arsn, arsn_len, arsnw, abm, abm_len, shivf_len, shsnf_len, shplf_len, \
     stmacf_len, est, ast";

const PLACEHOLDERS: &str =
    "?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, \
     ?21, ?22, ?23, ?24, ?25";

/// Position of `sa_state` in [`COLUMNS`].
const STATE_COLUMN: usize = 5;

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            spi         INTEGER NOT NULL,
            scid        INTEGER NOT NULL,
            tfvn        INTEGER NOT NULL,
            vcid        INTEGER NOT NULL,
            mapid       INTEGER NOT NULL,
            sa_state    INTEGER NOT NULL,
            ekid        TEXT,
            ecs         BLOB NOT NULL,
            ecs_len     INTEGER NOT NULL,
            akid        TEXT,
            acs         BLOB NOT NULL,
            acs_len     INTEGER NOT NULL,
            iv          BLOB,
            iv_len      INTEGER NOT NULL,
            arsn        BLOB NOT NULL,
            arsn_len    INTEGER NOT NULL,
            arsnw       INTEGER NOT NULL,
            abm         BLOB NOT NULL,
            abm_len     INTEGER NOT NULL,
            shivf_len   INTEGER NOT NULL,
            shsnf_len   INTEGER NOT NULL,
            shplf_len   INTEGER NOT NULL,
            stmacf_len  INTEGER NOT NULL,
            est         INTEGER NOT NULL,
            ast         INTEGER NOT NULL,
            PRIMARY KEY (spi, scid)
        );
        CREATE INDEX IF NOT EXISTS idx_{table}_gvcid ON {table} (scid, tfvn, vcid, mapid);"
    )
}

fn row_to_sa(frame_type: FrameType, row: &Row<'_>) -> rusqlite::Result<SecAssn> {
    let code: u8 = row.get(STATE_COLUMN)?;
    let state = SaState::from_code(code)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(STATE_COLUMN, i64::from(code)))?;
    Ok(SecAssn {
        frame_type,
        id: SpiScid::new(row.get(0)?, row.get(1)?),
        tfvn: row.get(2)?,
        vcid: row.get(3)?,
        mapid: row.get(4)?,
        state,
        params: SaParams {
            ekid: row.get(6)?,
            ecs: row.get(7)?,
            ecs_len: row.get(8)?,
            akid: row.get(9)?,
            acs: row.get(10)?,
            acs_len: row.get(11)?,
            iv: row.get(12)?,
            iv_len: row.get(13)?,
            arsn: row.get(14)?,
            arsn_len: row.get(15)?,
            arsnw: row.get(16)?,
            abm: row.get(17)?,
            abm_len: row.get(18)?,
            shivf_len: row.get(19)?,
            shsnf_len: row.get(20)?,
            shplf_len: row.get(21)?,
            stmacf_len: row.get(22)?,
            est: row.get(23)?,
            ast: row.get(24)?,
        },
    })
}

// ============================================================================
// SqliteStore
// ============================================================================

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) a database file and make sure the SA tables exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock();
        for frame_type in FrameType::ALL {
            conn.execute_batch(&create_table_sql(frame_type.table_name()))?;
        }
        Ok(())
    }
}

impl SaStore for SqliteStore {
    type Session<'s> = SqliteSession<'s>;

    fn open_session(&self) -> Result<SqliteSession<'_>> {
        Ok(SqliteSession {
            conn: self.conn.lock(),
            active: false,
        })
    }

    fn status(&self) -> bool {
        self.conn
            .lock()
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }
}

// ============================================================================
// SqliteSession
// ============================================================================

pub struct SqliteSession<'a> {
    conn: MutexGuard<'a, Connection>,
    active: bool,
}

impl SqliteSession<'_> {
    fn write(&mut self, verb: &str, sa: &SecAssn) -> Result<()> {
        let table = sa.frame_type.table_name();
        let p = &sa.params;
        self.conn.execute(
            &format!("{verb} INTO {table} ({COLUMNS}) VALUES ({PLACEHOLDERS})"),
            params![
                sa.id.spi,
                sa.id.scid,
                sa.tfvn,
                sa.vcid,
                sa.mapid,
                sa.state.code(),
                p.ekid,
                p.ecs,
                p.ecs_len,
                p.akid,
                p.acs,
                p.acs_len,
                p.iv,
                p.iv_len,
                p.arsn,
                p.arsn_len,
                p.arsnw,
                p.abm,
                p.abm_len,
                p.shivf_len,
                p.shsnf_len,
                p.shplf_len,
                p.stmacf_len,
                p.est,
                p.ast,
            ],
        )?;
        debug!("{} {} SA {}", verb, sa.frame_type, sa.id);
        Ok(())
    }

    fn query(
        &mut self,
        frame_type: FrameType,
        condition: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<SecAssn>> {
        let table = frame_type.table_name();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM {table} WHERE {condition} ORDER BY scid, spi"
        ))?;
        let rows = stmt.query_map(params, |row| row_to_sa(frame_type, row))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl Drop for SqliteSession<'_> {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("rollback of abandoned session failed: {}", e);
            }
        }
    }
}

impl StoreSession for SqliteSession<'_> {
    fn begin_transaction(&mut self) -> Result<()> {
        if self.active {
            return Err(
                StorageError::transaction("nested transactions are not supported").into(),
            );
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.active = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if !self.active {
            return Err(StorageError::transaction("commit without an open transaction").into());
        }
        self.conn.execute_batch("COMMIT")?;
        self.active = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.active {
            return Err(StorageError::transaction("rollback without an open transaction").into());
        }
        self.active = false;
        self.conn.execute_batch("ROLLBACK")?;
        debug!("sqlite transaction rolled back");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // Statements execute eagerly; later reads in the transaction already see them.
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn find(&mut self, frame_type: FrameType, id: SpiScid) -> Result<Option<SecAssn>> {
        let table = frame_type.table_name();
        let sa = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM {table} WHERE spi = ?1 AND scid = ?2"),
                params![id.spi, id.scid],
                |row| row_to_sa(frame_type, row),
            )
            .optional()?;
        Ok(sa)
    }

    fn find_all(&mut self, frame_type: FrameType, filter: &SaFilter) -> Result<Vec<SecAssn>> {
        let activity = match filter.activity {
            Activity::Any => "1 = 1",
            Activity::Active => "sa_state = 3",
            Activity::Inactive => "sa_state <> 3",
        };
        self.query(
            frame_type,
            &format!("(?1 IS NULL OR spi = ?1) AND (?2 IS NULL OR scid = ?2) AND {activity}"),
            params![filter.spi, filter.scid],
        )
    }

    fn find_by_gvcid(
        &mut self,
        frame_type: FrameType,
        gvcid: &Gvcid,
        excluding_spi: Option<u32>,
    ) -> Result<Vec<SecAssn>> {
        self.query(
            frame_type,
            "scid = ?1 AND tfvn = ?2 AND vcid = ?3 AND mapid = ?4 AND (?5 IS NULL OR spi <> ?5)",
            params![gvcid.scid, gvcid.tfvn, gvcid.vcid, gvcid.mapid, excluding_spi],
        )
    }

    fn max_spi(&mut self, frame_type: FrameType, scid: u16) -> Result<Option<u32>> {
        let table = frame_type.table_name();
        let max = self.conn.query_row(
            &format!("SELECT MAX(spi) FROM {table} WHERE scid = ?1"),
            params![scid],
            |row| row.get::<_, Option<u32>>(0),
        )?;
        Ok(max)
    }

    fn persist(&mut self, sa: &SecAssn) -> Result<()> {
        if self.find(sa.frame_type, sa.id)?.is_some() {
            return Err(StorageError::UniqueConstraint {
                frame_type: sa.frame_type,
                id: sa.id,
            }
            .into());
        }
        self.write("INSERT", sa)
    }

    fn merge(&mut self, sa: &SecAssn) -> Result<()> {
        self.write("INSERT OR REPLACE", sa)
    }

    fn remove(&mut self, frame_type: FrameType, id: SpiScid) -> Result<bool> {
        let table = frame_type.table_name();
        let n = self.conn.execute(
            &format!("DELETE FROM {table} WHERE spi = ?1 AND scid = ?2"),
            params![id.spi, id.scid],
        )?;
        Ok(n > 0)
    }
}

// ============================================================================
// Tests
// ============================================================================
