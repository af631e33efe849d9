//! MemoryStore: SA tables held in memory.
//!
//! A session locks the store for its whole lifetime. Inside a transaction,
//! writes land in a per-session buffer that reads consult first; commit merges
//! the buffer into the tables and rollback discards it.

use std::collections::HashMap;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::sa::{FrameType, Gvcid, SaFilter, SecAssn, SpiScid};

use super::traits::{SaStore, StoreSession};

type Tables = HashMap<FrameType, HashMap<SpiScid, SecAssn>>;

/// Transaction buffer: frame type → (id → Option<record>), None = removed.
type TxBuffer = HashMap<FrameType, HashMap<SpiScid, Option<SecAssn>>>;

// ============================================================================
// MemoryStore
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed records across all frame types.
    pub fn len(&self) -> usize {
        self.tables.lock().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SaStore for MemoryStore {
    type Session<'s> = MemorySession<'s>;

    fn open_session(&self) -> Result<MemorySession<'_>> {
        Ok(MemorySession {
            tables: self.tables.lock(),
            tx: None,
        })
    }

    fn status(&self) -> bool {
        true
    }
}

// ============================================================================
// MemorySession
// ============================================================================

pub struct MemorySession<'a> {
    tables: MutexGuard<'a, Tables>,
    tx: Option<TxBuffer>,
}

impl MemorySession<'_> {
    /// Get a record, checking the tx buffer first then the tables.
    fn get_record(&self, frame_type: FrameType, id: SpiScid) -> Option<SecAssn> {
        if let Some(entry) = self
            .tx
            .as_ref()
            .and_then(|tx| tx.get(&frame_type))
            .and_then(|buf| buf.get(&id))
        {
            return entry.clone(); // None = removed in tx
        }
        self.tables
            .get(&frame_type)
            .and_then(|table| table.get(&id))
            .cloned()
    }

    /// Records of one frame type with the tx buffer applied.
    fn iter_table(&self, frame_type: FrameType) -> Vec<SecAssn> {
        let buffered = self.tx.as_ref().and_then(|tx| tx.get(&frame_type));
        let mut results = Vec::new();

        if let Some(table) = self.tables.get(&frame_type) {
            for (id, sa) in table {
                if buffered.is_some_and(|buf| buf.contains_key(id)) {
                    continue; // handled in buffer pass
                }
                results.push(sa.clone());
            }
        }
        if let Some(buf) = buffered {
            results.extend(buf.values().flatten().cloned());
        }

        results.sort_by_key(|sa| (sa.id.scid, sa.id.spi));
        results
    }

    fn write(&mut self, frame_type: FrameType, id: SpiScid, entry: Option<SecAssn>) {
        match self.tx.as_mut() {
            Some(tx) => {
                tx.entry(frame_type).or_default().insert(id, entry);
            }
            None => {
                let table = self.tables.entry(frame_type).or_default();
                match entry {
                    Some(sa) => {
                        table.insert(id, sa);
                    }
                    None => {
                        table.remove(&id);
                    }
                }
            }
        }
    }
}

impl StoreSession for MemorySession<'_> {
    fn begin_transaction(&mut self) -> Result<()> {
        if self.tx.is_some() {
            return Err(
                StorageError::transaction("nested transactions are not supported").into(),
            );
        }
        self.tx = Some(HashMap::new());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StorageError::transaction("commit without an open transaction"))?;
        for (frame_type, buf) in tx {
            let table = self.tables.entry(frame_type).or_default();
            for (id, entry) in buf {
                match entry {
                    Some(sa) => {
                        table.insert(id, sa);
                    }
                    None => {
                        table.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if self.tx.take().is_none() {
            return Err(StorageError::transaction("rollback without an open transaction").into());
        }
        debug!("memory store transaction rolled back");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        // Buffered writes are already visible to this session's reads.
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.tx.is_some()
    }

    fn find(&mut self, frame_type: FrameType, id: SpiScid) -> Result<Option<SecAssn>> {
        Ok(self.get_record(frame_type, id))
    }

    fn find_all(&mut self, frame_type: FrameType, filter: &SaFilter) -> Result<Vec<SecAssn>> {
        Ok(self
            .iter_table(frame_type)
            .into_iter()
            .filter(|sa| filter.matches(sa))
            .collect())
    }

    fn find_by_gvcid(
        &mut self,
        frame_type: FrameType,
        gvcid: &Gvcid,
        excluding_spi: Option<u32>,
    ) -> Result<Vec<SecAssn>> {
        Ok(self
            .iter_table(frame_type)
            .into_iter()
            .filter(|sa| sa.gvcid() == *gvcid && Some(sa.id.spi) != excluding_spi)
            .collect())
    }

    fn max_spi(&mut self, frame_type: FrameType, scid: u16) -> Result<Option<u32>> {
        Ok(self
            .iter_table(frame_type)
            .iter()
            .filter(|sa| sa.id.scid == scid)
            .map(|sa| sa.id.spi)
            .max())
    }

    fn persist(&mut self, sa: &SecAssn) -> Result<()> {
        if self.get_record(sa.frame_type, sa.id).is_some() {
            return Err(StorageError::UniqueConstraint {
                frame_type: sa.frame_type,
                id: sa.id,
            }
            .into());
        }
        self.write(sa.frame_type, sa.id, Some(sa.clone()));
        Ok(())
    }

    fn merge(&mut self, sa: &SecAssn) -> Result<()> {
        self.write(sa.frame_type, sa.id, Some(sa.clone()));
        Ok(())
    }

    fn remove(&mut self, frame_type: FrameType, id: SpiScid) -> Result<bool> {
        if self.get_record(frame_type, id).is_none() {
            return Ok(false);
        }
        self.write(frame_type, id, None);
        Ok(true)
    }
}

// ============================================================================
// Tests
// ============================================================================
