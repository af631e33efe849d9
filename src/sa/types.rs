//! Identity, channel, and enum types shared by every SA family.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// FrameType
// ============================================================================

/// Frame family an SA protects. Each family lives in its own table/collection;
/// the lifecycle rules are identical across them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FrameType {
    /// Telecommand
    Tc,
    /// Telemetry
    Tm,
    /// Advanced Orbiting Systems
    Aos,
}

impl FrameType {
    pub const ALL: [FrameType; 3] = [FrameType::Tc, FrameType::Tm, FrameType::Aos];

    /// Table holding this family's records.
    pub fn table_name(self) -> &'static str {
        match self {
            FrameType::Tc => "security_associations",
            FrameType::Tm => "security_associations_tm",
            FrameType::Aos => "security_associations_aos",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameType::Tc => "TC",
            FrameType::Tm => "TM",
            FrameType::Aos => "AOS",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TC" => Ok(FrameType::Tc),
            "TM" => Ok(FrameType::Tm),
            "AOS" => Ok(FrameType::Aos),
            other => Err(format!("unknown frame type '{other}'")),
        }
    }
}

// ============================================================================
// SpiScid
// ============================================================================

/// Composite SA identity: Security Parameter Index plus spacecraft ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpiScid {
    pub spi: u32,
    pub scid: u16,
}

impl SpiScid {
    pub fn new(spi: u32, scid: u16) -> Self {
        Self { spi, scid }
    }
}

impl fmt::Display for SpiScid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.spi, self.scid)
    }
}

// ============================================================================
// Gvcid
// ============================================================================

/// Global virtual channel: the channel an SA protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gvcid {
    pub scid: u16,
    pub tfvn: u8,
    pub vcid: u8,
    pub mapid: u8,
}

impl Gvcid {
    pub fn new(scid: u16, tfvn: u8, vcid: u8, mapid: u8) -> Self {
        Self {
            scid,
            tfvn,
            vcid,
            mapid,
        }
    }
}

impl fmt::Display for Gvcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(scid {}, tfvn {}, vcid {}, mapid {})",
            self.scid, self.tfvn, self.vcid, self.mapid
        )
    }
}

// ============================================================================
// SaState
// ============================================================================

/// Lifecycle state.
///
/// `Expired` is kept apart from `Unkeyed` so an SA that was explicitly expired
/// can be told from one that was never keyed. Both carry no keys and accept the
/// same transitions; `sdls_code` reports the shared protocol code for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaState {
    Unkeyed,
    Keyed,
    Operational,
    Expired,
}

impl SaState {
    /// Stored state code.
    pub fn code(self) -> u8 {
        match self {
            SaState::Unkeyed => 1,
            SaState::Keyed => 2,
            SaState::Operational => 3,
            SaState::Expired => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(SaState::Unkeyed),
            2 => Some(SaState::Keyed),
            3 => Some(SaState::Operational),
            4 => Some(SaState::Expired),
            _ => None,
        }
    }

    /// Code as exchanged with SDLS endpoints, where expired and unkeyed share `1`.
    pub fn sdls_code(self) -> u8 {
        match self {
            SaState::Expired => 1,
            other => other.code(),
        }
    }

    /// No keys bound: freshly created or expired.
    pub fn is_unkeyed(self) -> bool {
        matches!(self, SaState::Unkeyed | SaState::Expired)
    }

    pub fn is_operational(self) -> bool {
        self == SaState::Operational
    }
}

impl fmt::Display for SaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaState::Unkeyed => "UNKEYED",
            SaState::Keyed => "KEYED",
            SaState::Operational => "OPERATIONAL",
            SaState::Expired => "EXPIRED",
        };
        f.write_str(name)
    }
}

// ============================================================================
// ServiceType
// ============================================================================

/// Security service provided by an SA, the pairing of two independent flags.
///
/// | variant | encryption | authentication |
/// |---|---|---|
/// | Plaintext | 0 | 0 |
/// | Encryption | 1 | 0 |
/// | Authentication | 0 | 1 |
/// | AuthenticatedEncryption | 1 | 1 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Plaintext,
    Encryption,
    Authentication,
    AuthenticatedEncryption,
}

impl ServiceType {
    pub fn from_flags(encryption: bool, authentication: bool) -> Self {
        match (encryption, authentication) {
            (false, false) => ServiceType::Plaintext,
            (true, false) => ServiceType::Encryption,
            (false, true) => ServiceType::Authentication,
            (true, true) => ServiceType::AuthenticatedEncryption,
        }
    }

    /// `(encryption, authentication)`
    pub fn flags(self) -> (bool, bool) {
        match self {
            ServiceType::Plaintext => (false, false),
            ServiceType::Encryption => (true, false),
            ServiceType::Authentication => (false, true),
            ServiceType::AuthenticatedEncryption => (true, true),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ServiceType::Plaintext => 0,
            ServiceType::Encryption => 1,
            ServiceType::Authentication => 2,
            ServiceType::AuthenticatedEncryption => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ServiceType::Plaintext),
            1 => Some(ServiceType::Encryption),
            2 => Some(ServiceType::Authentication),
            3 => Some(ServiceType::AuthenticatedEncryption),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::Plaintext => "PLAINTEXT",
            ServiceType::Encryption => "ENCRYPTION",
            ServiceType::Authentication => "AUTHENTICATION",
            ServiceType::AuthenticatedEncryption => "AUTHENTICATED_ENCRYPTION",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PLAINTEXT" => Some(ServiceType::Plaintext),
            "ENCRYPTION" => Some(ServiceType::Encryption),
            "AUTHENTICATION" => Some(ServiceType::Authentication),
            "AUTHENTICATED_ENCRYPTION" => Some(ServiceType::AuthenticatedEncryption),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// EncryptionSuite
// ============================================================================

/// Encryption cipher suites known to need a fixed IV length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionSuite {
    AesGcm,
    AesCbc,
}

impl EncryptionSuite {
    /// Look up a one-byte ECS code. Unknown codes carry no IV requirement.
    pub fn from_ecs(ecs: &[u8]) -> Option<Self> {
        match ecs {
            [0x01] => Some(EncryptionSuite::AesGcm),
            [0x02] => Some(EncryptionSuite::AesCbc),
            _ => None,
        }
    }

    pub fn iv_len(self) -> u16 {
        match self {
            EncryptionSuite::AesGcm => 12,
            EncryptionSuite::AesCbc => 16,
        }
    }
}
