//! Error types for SA management.
//!
//! `SadbError` is what every lifecycle operation returns; its `Display` text is
//! meant to be shown to an operator as-is. `StorageError` covers failures of the
//! record store underneath and is wrapped by `SadbError::Storage`.

use thiserror::Error;

use crate::sa::{FrameType, Gvcid, SpiScid};

// ============================================================================
// StorageError
// ============================================================================

#[derive(Debug, Error)]
pub enum StorageError {
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("{frame_type} SA {id} already exists in the store")]
    UniqueConstraint { frame_type: FrameType, id: SpiScid },
}

impl StorageError {
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }
}

// ============================================================================
// SadbError
// ============================================================================

#[derive(Debug, Error)]
pub enum SadbError {
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("SA create failed: an SA with the SPI/SCID combination {id} already exists")]
    Duplicate { frame_type: FrameType, id: SpiScid },

    #[error("{frame_type} SA {id} does not exist, cannot {action}")]
    NotFound {
        frame_type: FrameType,
        id: SpiScid,
        action: &'static str,
    },

    #[error("SA {conflicting} is already operational for GVCID {gvcid}, cannot start SA {id}")]
    Conflict {
        frame_type: FrameType,
        id: SpiScid,
        conflicting: SpiScid,
        gvcid: Gvcid,
    },

    #[error("SA {id} is already operational")]
    AlreadyOperational { frame_type: FrameType, id: SpiScid },

    #[error("SA {id} is not operational, cannot stop")]
    NotOperational { frame_type: FrameType, id: SpiScid },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SadbError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// True for rejections of caller-supplied data (never worth retrying).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when the request conflicted with the current SA population or state.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Duplicate { .. }
                | Self::Conflict { .. }
                | Self::AlreadyOperational { .. }
                | Self::NotOperational { .. }
        )
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for SadbError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Sqlite(e))
    }
}

pub type Result<T> = std::result::Result<T, SadbError>;
