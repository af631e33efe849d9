//! Integration tests for the SA lifecycle against both store backends.

use sdls_sadb::{FrameType, MemoryStore, SaCandidate, SaDao, SqliteStore};

// ============================================================================
// Helpers
// ============================================================================

/// Call a generic `fn(&SaDao<S>)` once per backend, each with a fresh store.
macro_rules! on_both_stores {
    ($check:ident) => {{
        $check(&crate::memory_dao());
        $check(&crate::sqlite_dao());
    }};
}

mod bulk;
mod create;
mod persistence;
mod transitions;
mod validation;

pub fn memory_dao() -> SaDao<MemoryStore> {
    SaDao::new(MemoryStore::new())
}

pub fn sqlite_dao() -> SaDao<SqliteStore> {
    SaDao::new(SqliteStore::open_in_memory().expect("open in-memory SQLite"))
}

/// TC candidate on spacecraft 46, virtual channel `vcid`.
pub fn tc(vcid: u8) -> SaCandidate {
    SaCandidate::new(FrameType::Tc, 46, 0, vcid, 0)
}
