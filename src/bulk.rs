//! Bulk import and bulk update.
//!
//! A batch runs on one session with a transaction per record: a record that
//! fails is rolled back and reported, and the batch moves on. Records that
//! were already committed stay committed.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dao::{create_in, update_in, SaDao};
use crate::error::Result;
use crate::sa::{FrameType, SaCandidate, SaUpdate, SpiScid};
use crate::storage::{SaStore, StoreSession};

/// A per-record failure inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkError {
    /// Position of the record in the batch.
    pub index: usize,
    pub id: Option<SpiScid>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<BulkError>,
}

impl BulkReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn record_failure(&mut self, index: usize, id: Option<SpiScid>, message: String) {
        warn!("Batch record {} failed: {}", index, message);
        self.failed += 1;
        self.errors.push(BulkError { index, id, message });
    }
}

/// One entry of a bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaPatch {
    pub frame_type: FrameType,
    pub id: SpiScid,
    #[serde(flatten)]
    pub update: SaUpdate,
}

/// Run `op` in its own transaction on `session`, committing on success.
fn isolated<T>(
    session: &mut dyn StoreSession,
    op: impl FnOnce(&mut dyn StoreSession) -> Result<T>,
) -> Result<T> {
    session.begin_transaction()?;
    match op(&mut *session).and_then(|value| session.commit().map(|()| value)) {
        Ok(value) => Ok(value),
        Err(e) => {
            if session.is_active() {
                session.rollback()?;
            }
            Err(e)
        }
    }
}

fn import_one(
    session: &mut dyn StoreSession,
    candidate: &SaCandidate,
    overwrite: bool,
) -> Result<SpiScid> {
    if let Some(id) = candidate.id().filter(|_| overwrite) {
        if session.remove(candidate.frame_type, id)? {
            session.flush()?;
        }
    }
    create_in(session, candidate).map(|sa| sa.id)
}

impl<S: SaStore> SaDao<S> {
    /// Create each candidate in order. With `overwrite`, an existing SA with
    /// the same identity is replaced rather than reported as a duplicate.
    pub fn bulk_import(&self, records: &[SaCandidate], overwrite: bool) -> Result<BulkReport> {
        let mut session = self.store().open_session()?;
        let mut report = BulkReport::default();

        for (index, candidate) in records.iter().enumerate() {
            report.attempted += 1;
            match isolated(&mut session, |s| import_one(s, candidate, overwrite)) {
                Ok(_) => report.succeeded += 1,
                Err(e) => report.record_failure(index, candidate.id(), e.to_string()),
            }
        }

        info!(
            "Bulk import: {} attempted, {} succeeded, {} failed",
            report.attempted, report.succeeded, report.failed
        );
        Ok(report)
    }

    /// Apply each patch in order. Missing SAs are reported, not fatal.
    pub fn bulk_update(&self, patches: &[SaPatch]) -> Result<BulkReport> {
        let mut session = self.store().open_session()?;
        let mut report = BulkReport::default();

        for (index, patch) in patches.iter().enumerate() {
            report.attempted += 1;
            match isolated(&mut session, |s| {
                update_in(s, patch.frame_type, patch.id, &patch.update)
            }) {
                Ok(_) => report.succeeded += 1,
                Err(e) => report.record_failure(index, Some(patch.id), e.to_string()),
            }
        }

        info!(
            "Bulk update: {} attempted, {} succeeded, {} failed",
            report.attempted, report.succeeded, report.failed
        );
        Ok(report)
    }
}
