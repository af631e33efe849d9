//! Security Association database for CCSDS SDLS.
//!
//! [`SaDao`] runs the SA lifecycle over any [`SaStore`]; [`validator`] holds the
//! parameter checks it applies before writing.

pub mod bulk;
pub mod config;
pub mod dao;
pub mod error;
pub mod hexstr;
pub mod logging;
pub mod sa;
pub mod storage;
pub mod validator;

pub use bulk::{BulkError, BulkReport, SaPatch};
pub use config::SadbConfig;
pub use dao::{PadReport, SaDao, UpdateOutcome};
pub use error::{Result, SadbError, StorageError};
pub use sa::{
    Activity, FrameType, Gvcid, SaCandidate, SaFilter, SaParams, SaState, SaUpdate, SecAssn,
    ServiceType, SpiScid,
};
pub use storage::{MemoryStore, SaStore, StoreSession};
#[cfg(feature = "sqlite")]
pub use storage::SqliteStore;
