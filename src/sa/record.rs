//! The SA record and the shapes callers use to create, patch, and query it.

use serde::{Deserialize, Serialize, Serializer};

use super::defaults::{
    default_abm, default_arsn, DEFAULT_ABM_LEN, DEFAULT_ARSN_LEN, DEFAULT_ECS,
    DEFAULT_IV_LEN, DEFAULT_SHIVF_LEN, DEFAULT_SHPLF_LEN, DEFAULT_SHSNF_LEN, DEFAULT_STMACF_LEN,
};
use super::types::{FrameType, Gvcid, SaState, ServiceType, SpiScid};

// ============================================================================
// SaParams
// ============================================================================

/// Cryptographic metadata carried by an SA.
///
/// The service type is not stored: it is derived from the `est`/`ast` flags,
/// which can only be written together through [`SaParams::set_service_type`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaParams {
    pub ekid: Option<String>,
    #[serde(with = "crate::hexstr::bytes")]
    pub ecs: Vec<u8>,
    pub ecs_len: u16,
    pub akid: Option<String>,
    #[serde(with = "crate::hexstr::bytes")]
    pub acs: Vec<u8>,
    pub acs_len: u16,
    #[serde(with = "crate::hexstr::opt_bytes")]
    pub iv: Option<Vec<u8>>,
    pub iv_len: u16,
    #[serde(with = "crate::hexstr::bytes")]
    pub arsn: Vec<u8>,
    pub arsn_len: u16,
    pub arsnw: u16,
    #[serde(with = "crate::hexstr::bytes")]
    pub abm: Vec<u8>,
    pub abm_len: u32,
    pub shivf_len: u16,
    pub shsnf_len: u16,
    pub shplf_len: u16,
    pub stmacf_len: u16,
    pub(crate) est: bool,
    pub(crate) ast: bool,
}

impl Default for SaParams {
    fn default() -> Self {
        Self {
            ekid: None,
            ecs: DEFAULT_ECS.to_vec(),
            ecs_len: DEFAULT_ECS.len() as u16,
            akid: None,
            acs: Vec::new(),
            acs_len: 0,
            iv: None,
            iv_len: DEFAULT_IV_LEN,
            arsn: default_arsn(),
            arsn_len: DEFAULT_ARSN_LEN,
            arsnw: 0,
            abm: default_abm(),
            abm_len: DEFAULT_ABM_LEN,
            shivf_len: DEFAULT_SHIVF_LEN,
            shsnf_len: DEFAULT_SHSNF_LEN,
            shplf_len: DEFAULT_SHPLF_LEN,
            stmacf_len: DEFAULT_STMACF_LEN,
            est: false,
            ast: false,
        }
    }
}

impl SaParams {
    pub fn service_type(&self) -> ServiceType {
        ServiceType::from_flags(self.est, self.ast)
    }

    pub fn set_service_type(&mut self, service_type: ServiceType) {
        let (est, ast) = service_type.flags();
        self.est = est;
        self.ast = ast;
    }

    pub fn encryption_enabled(&self) -> bool {
        self.est
    }

    pub fn authentication_enabled(&self) -> bool {
        self.ast
    }

    pub fn has_key(&self) -> bool {
        self.ekid.is_some() || self.akid.is_some()
    }

    /// Set the ARSN and reset the bitmask to the default mask.
    ///
    /// The mask covers the frame header, not the sequence number field, so the
    /// reset is the same at every ARSN width.
    pub fn set_arsn(&mut self, arsn: Vec<u8>, arsn_len: u16) {
        self.arsn = arsn;
        self.arsn_len = arsn_len;
        self.abm = default_abm();
        self.abm_len = DEFAULT_ABM_LEN;
    }
}

// ============================================================================
// SecAssn
// ============================================================================

/// A stored Security Association.
///
/// Serializes with the derived `service_type` alongside the raw flags; the
/// field is ignored on input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SecAssn {
    pub frame_type: FrameType,
    pub id: SpiScid,
    pub tfvn: u8,
    pub vcid: u8,
    pub mapid: u8,
    pub state: SaState,
    #[serde(flatten)]
    pub params: SaParams,
}

impl SecAssn {
    pub fn gvcid(&self) -> Gvcid {
        Gvcid::new(self.id.scid, self.tfvn, self.vcid, self.mapid)
    }

    pub fn service_type(&self) -> ServiceType {
        self.params.service_type()
    }

    pub fn is_operational(&self) -> bool {
        self.state.is_operational()
    }
}

impl Serialize for SecAssn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a> {
            frame_type: FrameType,
            id: SpiScid,
            tfvn: u8,
            vcid: u8,
            mapid: u8,
            state: SaState,
            service_type: ServiceType,
            #[serde(flatten)]
            params: &'a SaParams,
        }

        View {
            frame_type: self.frame_type,
            id: self.id,
            tfvn: self.tfvn,
            vcid: self.vcid,
            mapid: self.mapid,
            state: self.state,
            service_type: self.service_type(),
            params: &self.params,
        }
        .serialize(serializer)
    }
}

// ============================================================================
// SaCandidate
// ============================================================================

/// A record that has not been stored yet. `spi` may be left for the store to assign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaCandidate {
    pub frame_type: FrameType,
    #[serde(default)]
    pub spi: Option<u32>,
    pub scid: u16,
    pub tfvn: u8,
    pub vcid: u8,
    pub mapid: u8,
    #[serde(default)]
    pub state: Option<SaState>,
    #[serde(flatten)]
    pub params: SaParams,
}

impl SaCandidate {
    /// A candidate on the given channel with every crypto parameter defaulted.
    pub fn new(frame_type: FrameType, scid: u16, tfvn: u8, vcid: u8, mapid: u8) -> Self {
        Self {
            frame_type,
            spi: None,
            scid,
            tfvn,
            vcid,
            mapid,
            state: None,
            params: SaParams::default(),
        }
    }

    pub fn with_spi(mut self, spi: u32) -> Self {
        self.spi = Some(spi);
        self
    }

    pub fn with_encryption(mut self, ekid: impl Into<String>, ecs: Vec<u8>) -> Self {
        self.params.ekid = Some(ekid.into());
        self.params.ecs_len = ecs.len() as u16;
        self.params.ecs = ecs;
        self
    }

    pub fn with_authentication(mut self, akid: impl Into<String>, acs: Vec<u8>) -> Self {
        self.params.akid = Some(akid.into());
        self.params.acs_len = acs.len() as u16;
        self.params.acs = acs;
        self
    }

    pub fn with_iv(mut self, iv: Vec<u8>) -> Self {
        self.params.iv_len = iv.len() as u16;
        self.params.iv = Some(iv);
        self
    }

    /// Sets the ARSN and its derived bitmask. Call [`with_abm`](Self::with_abm)
    /// afterwards to override the mask.
    pub fn with_arsn(mut self, arsn: Vec<u8>) -> Self {
        let len = arsn.len() as u16;
        self.params.set_arsn(arsn, len);
        self
    }

    pub fn with_abm(mut self, abm: Vec<u8>) -> Self {
        self.params.abm_len = abm.len() as u32;
        self.params.abm = abm;
        self
    }

    pub fn with_arsnw(mut self, arsnw: u16) -> Self {
        self.params.arsnw = arsnw;
        self
    }

    pub fn with_service_type(mut self, service_type: ServiceType) -> Self {
        self.params.set_service_type(service_type);
        self
    }

    pub fn with_state(mut self, state: SaState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn gvcid(&self) -> Gvcid {
        Gvcid::new(self.scid, self.tfvn, self.vcid, self.mapid)
    }

    /// Identity, when the caller chose the SPI.
    pub fn id(&self) -> Option<SpiScid> {
        self.spi.map(|spi| SpiScid::new(spi, self.scid))
    }
}

// ============================================================================
// SaUpdate
// ============================================================================

/// Partial update of the mutable, non-key fields of an SA.
///
/// `None` leaves a field as it is. For `iv`, `Some(None)` clears the IV; in
/// JSON an absent `iv` leaves it, `null` clears it and a hex string sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaUpdate {
    #[serde(with = "crate::hexstr::opt_bytes")]
    pub arsn: Option<Vec<u8>>,
    pub arsn_len: Option<u16>,
    pub arsnw: Option<u16>,
    #[serde(
        with = "crate::hexstr::opt_opt_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    pub iv: Option<Option<Vec<u8>>>,
    pub iv_len: Option<u16>,
    #[serde(with = "crate::hexstr::opt_bytes")]
    pub abm: Option<Vec<u8>>,
    pub abm_len: Option<u32>,
    pub service_type: Option<ServiceType>,
    pub shivf_len: Option<u16>,
    pub shsnf_len: Option<u16>,
    pub shplf_len: Option<u16>,
    pub stmacf_len: Option<u16>,
}

impl SaUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// ARSN with its declared length. The declared length is checked against
    /// the value when the update is applied.
    pub fn arsn(mut self, arsn: Vec<u8>, arsn_len: u16) -> Self {
        self.arsn = Some(arsn);
        self.arsn_len = Some(arsn_len);
        self
    }

    pub fn arsnw(mut self, arsnw: u16) -> Self {
        self.arsnw = Some(arsnw);
        self
    }

    pub fn iv(mut self, iv: Option<Vec<u8>>, iv_len: u16) -> Self {
        self.iv = Some(iv);
        self.iv_len = Some(iv_len);
        self
    }

    pub fn abm(mut self, abm: Vec<u8>, abm_len: u32) -> Self {
        self.abm = Some(abm);
        self.abm_len = Some(abm_len);
        self
    }

    pub fn service_type(mut self, service_type: ServiceType) -> Self {
        self.service_type = Some(service_type);
        self
    }

    pub fn header_lengths(mut self, shivf: u16, shsnf: u16, shplf: u16, stmacf: u16) -> Self {
        self.shivf_len = Some(shivf);
        self.shsnf_len = Some(shsnf);
        self.shplf_len = Some(shplf);
        self.stmacf_len = Some(stmacf);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write the supplied fields into `params`. Setting an ARSN re-derives the
    /// bitmask unless this update also carries an explicit one.
    pub fn apply_to(&self, params: &mut SaParams) {
        if let Some(arsn) = &self.arsn {
            let len = self.arsn_len.unwrap_or(arsn.len() as u16);
            params.set_arsn(arsn.clone(), len);
        } else if let Some(len) = self.arsn_len {
            params.arsn_len = len;
        }
        if let Some(arsnw) = self.arsnw {
            params.arsnw = arsnw;
        }
        if let Some(iv) = &self.iv {
            params.iv = iv.clone();
        }
        if let Some(iv_len) = self.iv_len {
            params.iv_len = iv_len;
        }
        if let Some(abm) = &self.abm {
            params.abm = abm.clone();
            params.abm_len = self.abm_len.unwrap_or(abm.len() as u32);
        } else if let Some(len) = self.abm_len {
            params.abm_len = len;
        }
        if let Some(service_type) = self.service_type {
            params.set_service_type(service_type);
        }
        if let Some(v) = self.shivf_len {
            params.shivf_len = v;
        }
        if let Some(v) = self.shsnf_len {
            params.shsnf_len = v;
        }
        if let Some(v) = self.shplf_len {
            params.shplf_len = v;
        }
        if let Some(v) = self.stmacf_len {
            params.stmacf_len = v;
        }
    }
}

// ============================================================================
// SaFilter
// ============================================================================

/// Operational-state filter for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    #[default]
    Any,
    Active,
    Inactive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaFilter {
    pub spi: Option<u32>,
    pub scid: Option<u16>,
    pub activity: Activity,
}

impl SaFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn active() -> Self {
        Self {
            activity: Activity::Active,
            ..Self::default()
        }
    }

    pub fn scid(mut self, scid: u16) -> Self {
        self.scid = Some(scid);
        self
    }

    pub fn spi(mut self, spi: u32) -> Self {
        self.spi = Some(spi);
        self
    }

    pub fn matches(&self, sa: &SecAssn) -> bool {
        if self.spi.is_some_and(|spi| spi != sa.id.spi) {
            return false;
        }
        if self.scid.is_some_and(|scid| scid != sa.id.scid) {
            return false;
        }
        match self.activity {
            Activity::Any => true,
            Activity::Active => sa.is_operational(),
            Activity::Inactive => !sa.is_operational(),
        }
    }
}
