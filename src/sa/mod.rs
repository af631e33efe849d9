//! Security Association data model.

pub mod defaults;
mod record;
mod types;

pub use record::{Activity, SaCandidate, SaFilter, SaParams, SaUpdate, SecAssn};
pub use types::{EncryptionSuite, FrameType, Gvcid, SaState, ServiceType, SpiScid};
