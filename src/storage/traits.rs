//! Record store abstraction consumed by the lifecycle engine.

use crate::error::Result;
use crate::sa::{FrameType, Gvcid, SaFilter, SecAssn, SpiScid};

/// A backend that hands out transactional sessions.
pub trait SaStore: Send + Sync {
    type Session<'s>: StoreSession
    where
        Self: 's;

    /// Open a session. A session has exclusive use of the store until dropped.
    fn open_session(&self) -> Result<Self::Session<'_>>;

    /// True when the backend answers a trivial query.
    fn status(&self) -> bool;
}

/// One unit of work against the store.
///
/// Writes issued outside `begin_transaction`/`commit` apply immediately.
/// Dropping a session with an open transaction rolls it back.
pub trait StoreSession {
    fn begin_transaction(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Push pending writes to the backend without ending the transaction.
    fn flush(&mut self) -> Result<()>;

    fn is_active(&self) -> bool;

    fn find(&mut self, frame_type: FrameType, id: SpiScid) -> Result<Option<SecAssn>>;

    /// Records matching `filter`, ordered by (scid, spi).
    fn find_all(&mut self, frame_type: FrameType, filter: &SaFilter) -> Result<Vec<SecAssn>>;

    /// Records on `gvcid`, optionally leaving out one SPI.
    fn find_by_gvcid(
        &mut self,
        frame_type: FrameType,
        gvcid: &Gvcid,
        excluding_spi: Option<u32>,
    ) -> Result<Vec<SecAssn>>;

    /// Highest SPI in use for `scid`, if any.
    fn max_spi(&mut self, frame_type: FrameType, scid: u16) -> Result<Option<u32>>;

    /// Insert a new record. Fails with `StorageError::UniqueConstraint` if the
    /// identity is taken.
    fn persist(&mut self, sa: &SecAssn) -> Result<()>;

    /// Insert or replace.
    fn merge(&mut self, sa: &SecAssn) -> Result<()>;

    /// Returns whether a record was removed.
    fn remove(&mut self, frame_type: FrameType, id: SpiScid) -> Result<bool>;
}
