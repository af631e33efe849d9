//! Lifecycle engine.
//!
//! The `*_in` functions run one lifecycle operation against a caller-provided
//! session, so several operations can share a transaction (a forced start
//! stops the conflicting SA in the same transaction as the start itself).
//! [`SaDao`] wraps each of them in a transaction of its own: commit on
//! success, roll back on any error.

use tracing::{debug, error, info, warn};

use crate::error::{Result, SadbError};
use crate::sa::{
    FrameType, Gvcid, SaCandidate, SaFilter, SaState, SaUpdate, SecAssn, SpiScid,
};
use crate::storage::{SaStore, StoreSession};
use crate::validator::validate_params;

// ============================================================================
// Outcomes
// ============================================================================

/// Result of an update. `Unchanged` means the update matched what was stored
/// and nothing was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(SecAssn),
    Unchanged(SecAssn),
}

impl UpdateOutcome {
    pub fn sa(&self) -> &SecAssn {
        match self {
            UpdateOutcome::Updated(sa) | UpdateOutcome::Unchanged(sa) => sa,
        }
    }

    pub fn into_sa(self) -> SecAssn {
        match self {
            UpdateOutcome::Updated(sa) | UpdateOutcome::Unchanged(sa) => sa,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, UpdateOutcome::Updated(_))
    }
}

/// Result of an ARSN or IV reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadReport {
    pub outcome: UpdateOutcome,
    /// Zero bytes prepended to reach the declared length.
    pub padded_by: usize,
}

// ============================================================================
// Session-scoped operations
// ============================================================================

fn load(
    session: &mut dyn StoreSession,
    frame_type: FrameType,
    id: SpiScid,
    action: &'static str,
) -> Result<SecAssn> {
    session
        .find(frame_type, id)?
        .ok_or(SadbError::NotFound {
            frame_type,
            id,
            action,
        })
}

/// Operational SAs on `gvcid` other than `id`.
fn operational_on(
    session: &mut dyn StoreSession,
    frame_type: FrameType,
    id: SpiScid,
    gvcid: &Gvcid,
) -> Result<Vec<SecAssn>> {
    Ok(session
        .find_by_gvcid(frame_type, gvcid, Some(id.spi))?
        .into_iter()
        .filter(SecAssn::is_operational)
        .collect())
}

fn next_spi(session: &mut dyn StoreSession, frame_type: FrameType, scid: u16) -> Result<u32> {
    match session.max_spi(frame_type, scid)? {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| SadbError::validation("SPI", format!("no SPI left for SCID {scid}"))),
    }
}

pub fn create_in(session: &mut dyn StoreSession, candidate: &SaCandidate) -> Result<SecAssn> {
    validate_params(&candidate.params)?;

    let frame_type = candidate.frame_type;
    let spi = match candidate.spi {
        Some(spi) => spi,
        None => next_spi(session, frame_type, candidate.scid)?,
    };
    let id = SpiScid::new(spi, candidate.scid);
    if session.find(frame_type, id)?.is_some() {
        return Err(SadbError::Duplicate { frame_type, id });
    }

    let state = candidate.state.unwrap_or(if candidate.params.has_key() {
        SaState::Keyed
    } else {
        SaState::Unkeyed
    });
    let gvcid = candidate.gvcid();
    if state.is_operational() {
        if let Some(other) = operational_on(session, frame_type, id, &gvcid)?.first() {
            return Err(SadbError::Conflict {
                frame_type,
                id,
                conflicting: other.id,
                gvcid,
            });
        }
    }

    let sa = SecAssn {
        frame_type,
        id,
        tfvn: candidate.tfvn,
        vcid: candidate.vcid,
        mapid: candidate.mapid,
        state,
        params: candidate.params.clone(),
    };
    session.persist(&sa)?;
    info!("Created {} SA {} on {} ({})", frame_type, id, gvcid, state);
    Ok(sa)
}

pub fn rekey_encryption_in(
    session: &mut dyn StoreSession,
    frame_type: FrameType,
    id: SpiScid,
    ekid: &str,
    ecs: &[u8],
) -> Result<SecAssn> {
    let mut sa = load(session, frame_type, id, "rekey")?;
    sa.params.ekid = Some(ekid.to_string());
    sa.params.ecs = ecs.to_vec();
    sa.params.ecs_len = ecs.len() as u16;
    validate_params(&sa.params)?;
    sa.state = SaState::Keyed;
    session.merge(&sa)?;
    info!("Rekeyed encryption of {} SA {} with key {}", frame_type, id, ekid);
    Ok(sa)
}

pub fn rekey_authentication_in(
    session: &mut dyn StoreSession,
    frame_type: FrameType,
    id: SpiScid,
    akid: &str,
    acs: &[u8],
) -> Result<SecAssn> {
    let mut sa = load(session, frame_type, id, "rekey")?;
    sa.params.akid = Some(akid.to_string());
    sa.params.acs = acs.to_vec();
    sa.params.acs_len = acs.len() as u16;
    validate_params(&sa.params)?;
    sa.state = SaState::Keyed;
    session.merge(&sa)?;
    info!("Rekeyed authentication of {} SA {} with key {}", frame_type, id, akid);
    Ok(sa)
}

/// Rebind key ids while keeping the stored cipher suites. Only ids that differ
/// from the stored ones are rekeyed; if none differ the SA is returned as is.
pub fn rekey_in(
    session: &mut dyn StoreSession,
    frame_type: FrameType,
    id: SpiScid,
    ekid: Option<&str>,
    akid: Option<&str>,
) -> Result<SecAssn> {
    let mut sa = load(session, frame_type, id, "rekey")?;
    if let Some(ekid) = ekid.filter(|k| sa.params.ekid.as_deref() != Some(*k)) {
        let ecs = sa.params.ecs.clone();
        sa = rekey_encryption_in(session, frame_type, id, ekid, &ecs)?;
    }
    if let Some(akid) = akid.filter(|k| sa.params.akid.as_deref() != Some(*k)) {
        let acs = sa.params.acs.clone();
        sa = rekey_authentication_in(session, frame_type, id, akid, &acs)?;
    }
    Ok(sa)
}

pub fn expire_in(
    session: &mut dyn StoreSession,
    frame_type: FrameType,
    id: SpiScid,
) -> Result<SecAssn> {
    let mut sa = load(session, frame_type, id, "expire")?;
    sa.params.ekid = None;
    sa.params.akid = None;
    sa.state = SaState::Expired;
    session.merge(&sa)?;
    info!("Expired {} SA {}", frame_type, id);
    Ok(sa)
}

pub fn start_in(
    session: &mut dyn StoreSession,
    frame_type: FrameType,
    id: SpiScid,
    force: bool,
) -> Result<SecAssn> {
    let mut sa = load(session, frame_type, id, "start")?;
    if sa.is_operational() {
        return Err(SadbError::AlreadyOperational { frame_type, id });
    }

    let gvcid = sa.gvcid();
    for other in operational_on(session, frame_type, id, &gvcid)? {
        if !force {
            return Err(SadbError::Conflict {
                frame_type,
                id,
                conflicting: other.id,
                gvcid,
            });
        }
        warn!(
            "Force-stopping {} SA {} to start SA {} on {}",
            frame_type, other.id, id, gvcid
        );
        stop_in(session, frame_type, other.id)?;
    }

    sa.state = SaState::Operational;
    session.merge(&sa)?;
    info!("Started {} SA {} on {}", frame_type, id, gvcid);
    Ok(sa)
}

pub fn stop_in(session: &mut dyn StoreSession, frame_type: FrameType, id: SpiScid) -> Result<SecAssn> {
    let mut sa = load(session, frame_type, id, "stop")?;
    if !sa.is_operational() {
        return Err(SadbError::NotOperational { frame_type, id });
    }
    sa.state = SaState::Keyed;
    session.merge(&sa)?;
    info!("Stopped {} SA {}", frame_type, id);
    Ok(sa)
}

/// Apply `update` to `current` and write it back if anything changed.
fn apply_update(
    session: &mut dyn StoreSession,
    current: SecAssn,
    update: &SaUpdate,
) -> Result<UpdateOutcome> {
    let mut next = current.clone();
    update.apply_to(&mut next.params);
    validate_params(&next.params)?;
    if next == current {
        return Ok(UpdateOutcome::Unchanged(current));
    }
    session.merge(&next)?;
    Ok(UpdateOutcome::Updated(next))
}

pub fn update_in(
    session: &mut dyn StoreSession,
    frame_type: FrameType,
    id: SpiScid,
    update: &SaUpdate,
) -> Result<UpdateOutcome> {
    let current = load(session, frame_type, id, "update")?;
    if update.is_empty() {
        warn!("Update of {} SA {} carried no fields", frame_type, id);
        return Ok(UpdateOutcome::Unchanged(current));
    }
    let outcome = apply_update(session, current, update)?;
    if outcome.is_changed() {
        info!("Updated {} SA {}", frame_type, id);
    } else {
        warn!("Update of {} SA {} changed nothing", frame_type, id);
    }
    Ok(outcome)
}

/// Drive the SA to `target` through the lifecycle, then apply `update`.
///
/// Operational is reached by a forced start, Keyed by a stop, and Unkeyed or
/// Expired by an expiry (which always lands on Expired).
pub fn apply_state_in(
    session: &mut dyn StoreSession,
    frame_type: FrameType,
    id: SpiScid,
    target: SaState,
    update: &SaUpdate,
) -> Result<UpdateOutcome> {
    let before = load(session, frame_type, id, "update")?;
    let current = match target {
        SaState::Operational if !before.is_operational() => start_in(session, frame_type, id, true)?,
        SaState::Keyed if before.is_operational() => stop_in(session, frame_type, id)?,
        SaState::Unkeyed | SaState::Expired => expire_in(session, frame_type, id)?,
        _ => before.clone(),
    };
    let sa = apply_update(session, current, update)?.into_sa();
    if sa == before {
        warn!("Update of {} SA {} changed nothing", frame_type, id);
        Ok(UpdateOutcome::Unchanged(sa))
    } else {
        info!("Updated {} SA {} ({})", frame_type, id, sa.state);
        Ok(UpdateOutcome::Updated(sa))
    }
}

fn left_pad(field: &'static str, value: Vec<u8>, len: usize) -> Result<(Vec<u8>, usize)> {
    if value.len() > len {
        return Err(SadbError::validation(
            field,
            format!("value is {} bytes, longer than the declared length {len}", value.len()),
        ));
    }
    let pad = len - value.len();
    if pad == 0 {
        return Ok((value, 0));
    }
    let mut padded = vec![0u8; pad];
    padded.extend_from_slice(&value);
    Ok((padded, pad))
}

/// Reset the ARSN (and optionally the window). A value shorter than `arsn_len`
/// is left-padded with zero bytes.
pub fn reset_arsn_in(
    session: &mut dyn StoreSession,
    frame_type: FrameType,
    id: SpiScid,
    arsn: Vec<u8>,
    arsn_len: u16,
    arsnw: Option<u16>,
) -> Result<PadReport> {
    let (arsn, padded_by) = left_pad("ARSN", arsn, arsn_len as usize)?;
    let mut update = SaUpdate::new().arsn(arsn, arsn_len);
    update.arsnw = arsnw;
    let outcome = update_in(session, frame_type, id, &update)?;
    if padded_by > 0 {
        debug!("Padded ARSN of {} SA {} by {} bytes", frame_type, id, padded_by);
    }
    Ok(PadReport { outcome, padded_by })
}

/// Reset the IV. A value shorter than `iv_len` is left-padded with zero bytes.
pub fn reset_iv_in(
    session: &mut dyn StoreSession,
    frame_type: FrameType,
    id: SpiScid,
    iv: Vec<u8>,
    iv_len: u16,
) -> Result<PadReport> {
    let (iv, padded_by) = left_pad("IV", iv, iv_len as usize)?;
    let outcome = update_in(session, frame_type, id, &SaUpdate::new().iv(Some(iv), iv_len))?;
    if padded_by > 0 {
        debug!("Padded IV of {} SA {} by {} bytes", frame_type, id, padded_by);
    }
    Ok(PadReport { outcome, padded_by })
}

pub fn delete_in(session: &mut dyn StoreSession, frame_type: FrameType, id: SpiScid) -> Result<()> {
    if !session.remove(frame_type, id)? {
        return Err(SadbError::NotFound {
            frame_type,
            id,
            action: "delete",
        });
    }
    info!("Deleted {} SA {}", frame_type, id);
    Ok(())
}

// ============================================================================
// SaDao
// ============================================================================

/// Lifecycle operations over a store, one transaction per call.
pub struct SaDao<S: SaStore> {
    store: S,
}

impl<S: SaStore> SaDao<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn status(&self) -> bool {
        self.store.status()
    }

    /// Run `f` inside a fresh transaction.
    pub fn in_transaction<T>(
        &self,
        op: &str,
        f: impl FnOnce(&mut dyn StoreSession) -> Result<T>,
    ) -> Result<T> {
        let mut session = self.store.open_session()?;
        session.begin_transaction()?;
        match f(&mut session) {
            Ok(value) => {
                session.commit()?;
                Ok(value)
            }
            Err(e) => {
                error!("{} failed, rolling back: {}", op, e);
                if let Err(rb) = session.rollback() {
                    error!("rollback after failed {} also failed: {}", op, rb);
                }
                Err(e)
            }
        }
    }

    pub fn get(&self, frame_type: FrameType, id: SpiScid) -> Result<Option<SecAssn>> {
        self.store.open_session()?.find(frame_type, id)
    }

    pub fn list(&self, frame_type: FrameType, filter: &SaFilter) -> Result<Vec<SecAssn>> {
        self.store.open_session()?.find_all(frame_type, filter)
    }

    pub fn list_active(&self, frame_type: FrameType) -> Result<Vec<SecAssn>> {
        self.list(frame_type, &SaFilter::active())
    }

    pub fn create(&self, candidate: &SaCandidate) -> Result<SecAssn> {
        self.in_transaction("create", |s| create_in(s, candidate))
    }

    pub fn rekey_encryption(
        &self,
        frame_type: FrameType,
        id: SpiScid,
        ekid: &str,
        ecs: &[u8],
    ) -> Result<SecAssn> {
        self.in_transaction("rekey", |s| rekey_encryption_in(s, frame_type, id, ekid, ecs))
    }

    pub fn rekey_authentication(
        &self,
        frame_type: FrameType,
        id: SpiScid,
        akid: &str,
        acs: &[u8],
    ) -> Result<SecAssn> {
        self.in_transaction("rekey", |s| rekey_authentication_in(s, frame_type, id, akid, acs))
    }

    pub fn rekey(
        &self,
        frame_type: FrameType,
        id: SpiScid,
        ekid: Option<&str>,
        akid: Option<&str>,
    ) -> Result<SecAssn> {
        self.in_transaction("rekey", |s| rekey_in(s, frame_type, id, ekid, akid))
    }

    pub fn expire(&self, frame_type: FrameType, id: SpiScid) -> Result<SecAssn> {
        self.in_transaction("expire", |s| expire_in(s, frame_type, id))
    }

    pub fn start(&self, frame_type: FrameType, id: SpiScid, force: bool) -> Result<SecAssn> {
        self.in_transaction("start", |s| start_in(s, frame_type, id, force))
    }

    pub fn stop(&self, frame_type: FrameType, id: SpiScid) -> Result<SecAssn> {
        self.in_transaction("stop", |s| stop_in(s, frame_type, id))
    }

    pub fn update(
        &self,
        frame_type: FrameType,
        id: SpiScid,
        update: &SaUpdate,
    ) -> Result<UpdateOutcome> {
        self.in_transaction("update", |s| update_in(s, frame_type, id, update))
    }

    pub fn apply_state(
        &self,
        frame_type: FrameType,
        id: SpiScid,
        target: SaState,
        update: &SaUpdate,
    ) -> Result<UpdateOutcome> {
        self.in_transaction("update", |s| apply_state_in(s, frame_type, id, target, update))
    }

    pub fn reset_arsn(
        &self,
        frame_type: FrameType,
        id: SpiScid,
        arsn: Vec<u8>,
        arsn_len: u16,
        arsnw: Option<u16>,
    ) -> Result<PadReport> {
        self.in_transaction("reset ARSN", |s| {
            reset_arsn_in(s, frame_type, id, arsn, arsn_len, arsnw)
        })
    }

    pub fn reset_iv(
        &self,
        frame_type: FrameType,
        id: SpiScid,
        iv: Vec<u8>,
        iv_len: u16,
    ) -> Result<PadReport> {
        self.in_transaction("reset IV", |s| reset_iv_in(s, frame_type, id, iv, iv_len))
    }

    pub fn delete(&self, frame_type: FrameType, id: SpiScid) -> Result<()> {
        self.in_transaction("delete", |s| delete_in(s, frame_type, id))
    }

    /// Delete every listed SA, or none of them.
    pub fn delete_many(&self, frame_type: FrameType, ids: &[SpiScid]) -> Result<usize> {
        self.in_transaction("delete", |s| {
            for id in ids {
                delete_in(s, frame_type, *id)?;
            }
            Ok(ids.len())
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
