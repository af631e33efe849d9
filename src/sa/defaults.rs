//! Protocol defaults applied to freshly created SAs.

/// Default encryption cipher suite (AES-GCM).
pub const DEFAULT_ECS: [u8; 1] = [0x01];
pub const DEFAULT_IV_LEN: u16 = 12;

pub const MIN_ARSN_LEN: u16 = 1;
pub const MAX_ARSN_LEN: u16 = 20;
pub const DEFAULT_ARSN_LEN: u16 = MAX_ARSN_LEN;

pub const DEFAULT_ABM_LEN: u32 = 19;

pub const DEFAULT_SHIVF_LEN: u16 = 12;
pub const DEFAULT_SHSNF_LEN: u16 = 0;
pub const DEFAULT_SHPLF_LEN: u16 = 0;
pub const DEFAULT_STMACF_LEN: u16 = 16;

/// Header coverage for the default authentication bitmask. Trailing bytes are zero.
const DEFAULT_ABM_PREFIX: [u8; 7] = [0x00, 0x00, 0xfc, 0x00, 0x00, 0xff, 0xff];

pub fn default_abm() -> Vec<u8> {
    let mut abm = vec![0u8; DEFAULT_ABM_LEN as usize];
    abm[..DEFAULT_ABM_PREFIX.len()].copy_from_slice(&DEFAULT_ABM_PREFIX);
    abm
}

pub fn default_arsn() -> Vec<u8> {
    vec![0u8; DEFAULT_ARSN_LEN as usize]
}
