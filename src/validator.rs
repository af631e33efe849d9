//! Parameter validation.
//!
//! The `verify_*` functions check one operator-supplied field (usually a hex
//! string plus a declared length) and return the normalized value.
//! [`validate_params`] checks a whole parameter set for cross-field
//! consistency and runs before anything is written to the store.
//!
//! Every failure is a [`SadbError::Validation`] naming the field.

use crate::error::{Result, SadbError};
use crate::hexstr::{is_null_token, parse_hex};
use crate::sa::defaults::{MAX_ARSN_LEN, MIN_ARSN_LEN};
use crate::sa::{EncryptionSuite, SaParams, ServiceType};

/// A key reference with the cipher suite it is used with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub key_id: String,
    pub cipher_suite: Vec<u8>,
}

fn decode(field: &'static str, input: &str) -> Result<Vec<u8>> {
    parse_hex(input).map_err(|e| SadbError::validation(field, e.to_string()))
}

// ============================================================================
// Field checks
// ============================================================================

/// Numeric code `0..=3` first, then the symbolic name (case-sensitive).
pub fn check_service_type(input: &str) -> Result<ServiceType> {
    let trimmed = input.trim();
    let resolved = match trimmed.parse::<i64>() {
        Ok(code) => ServiceType::from_code(code),
        Err(_) => ServiceType::from_name(trimmed),
    };
    resolved.ok_or_else(|| {
        SadbError::validation(
            "service type",
            format!(
                "'{trimmed}' is not one of 0-3, PLAINTEXT, ENCRYPTION, AUTHENTICATION, AUTHENTICATED_ENCRYPTION"
            ),
        )
    })
}

/// Check an IV against its declared length and, when `ecs` names a suite
/// with a fixed IV size, against that size. `None` or `"null"` means no IV.
pub fn verify_iv(iv: Option<&str>, iv_len: u16, ecs: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
    let iv = match iv {
        Some(s) if !is_null_token(s) => s,
        _ => return Ok(None),
    };
    let bytes = decode("IV", iv)?;
    if let Some(required) = ecs.and_then(EncryptionSuite::from_ecs).map(|s| s.iv_len()) {
        if iv_len != required {
            return Err(SadbError::validation(
                "IV",
                format!("declared length {iv_len} but the cipher suite requires {required} bytes"),
            ));
        }
    }
    if bytes.len() != iv_len as usize {
        return Err(SadbError::validation(
            "IV",
            format!("declared length {iv_len} but the value is {} bytes", bytes.len()),
        ));
    }
    Ok(Some(bytes))
}

fn verify_key(
    field: &'static str,
    key_id: Option<&str>,
    cipher_suite: Option<&str>,
) -> Result<Option<KeyBinding>> {
    match (key_id, cipher_suite) {
        (None, None) => Ok(None),
        (Some(_), None) | (None, Some(_)) => Err(SadbError::validation(
            field,
            "a key id and a cipher suite must be supplied together",
        )),
        (Some(key_id), Some(cs)) => {
            let key_id = key_id.trim();
            if key_id.is_empty() {
                return Err(SadbError::validation(field, "key id is empty"));
            }
            let cipher_suite = decode(field, cs)?;
            if cipher_suite.len() != 1 {
                return Err(SadbError::validation(
                    field,
                    format!("cipher suite must be 1 byte, got {}", cipher_suite.len()),
                ));
            }
            Ok(Some(KeyBinding {
                key_id: key_id.to_string(),
                cipher_suite,
            }))
        }
    }
}

/// Encryption key id plus ECS: both or neither.
pub fn verify_enc(ekid: Option<&str>, ecs: Option<&str>) -> Result<Option<KeyBinding>> {
    verify_key("encryption key", ekid, ecs)
}

/// Authentication key id plus ACS: both or neither.
pub fn verify_auth(akid: Option<&str>, acs: Option<&str>) -> Result<Option<KeyBinding>> {
    verify_key("authentication key", akid, acs)
}

fn check_arsn_len(arsn_len: u16) -> Result<()> {
    if !(MIN_ARSN_LEN..=MAX_ARSN_LEN).contains(&arsn_len) {
        return Err(SadbError::validation(
            "ARSN",
            format!("length {arsn_len} is outside {MIN_ARSN_LEN}..={MAX_ARSN_LEN}"),
        ));
    }
    Ok(())
}

/// ARSN plus declared length: both or neither.
pub fn verify_arsn(arsn: Option<&str>, arsn_len: Option<u16>) -> Result<Option<Vec<u8>>> {
    match (arsn, arsn_len) {
        (None, None) => Ok(None),
        (Some(_), None) | (None, Some(_)) => Err(SadbError::validation(
            "ARSN",
            "a value and a length must be supplied together",
        )),
        (Some(arsn), Some(arsn_len)) => {
            check_arsn_len(arsn_len)?;
            let bytes = decode("ARSN", arsn)?;
            if bytes.len() != arsn_len as usize {
                return Err(SadbError::validation(
                    "ARSN",
                    format!("declared length {arsn_len} but the value is {} bytes", bytes.len()),
                ));
            }
            Ok(Some(bytes))
        }
    }
}

pub fn verify_arsnw(arsnw: i64) -> Result<u16> {
    u16::try_from(arsnw).map_err(|_| {
        SadbError::validation("ARSNW", format!("{arsnw} is outside 0..={}", u16::MAX))
    })
}

/// ABM plus declared length: both or neither.
pub fn verify_abm(abm: Option<&str>, abm_len: Option<u32>) -> Result<Option<Vec<u8>>> {
    match (abm, abm_len) {
        (None, None) => Ok(None),
        (Some(_), None) | (None, Some(_)) => Err(SadbError::validation(
            "ABM",
            "a value and a length must be supplied together",
        )),
        (Some(abm), Some(abm_len)) => {
            let bytes = decode("ABM", abm)?;
            if bytes.len() != abm_len as usize {
                return Err(SadbError::validation(
                    "ABM",
                    format!("declared length {abm_len} but the value is {} bytes", bytes.len()),
                ));
            }
            Ok(Some(bytes))
        }
    }
}

// ============================================================================
// Record check
// ============================================================================

fn check_len(field: &'static str, declared: usize, actual: usize) -> Result<()> {
    if declared != actual {
        return Err(SadbError::validation(
            field,
            format!("declared length {declared} but the value is {actual} bytes"),
        ));
    }
    Ok(())
}

fn check_binding(field: &'static str, key_id: Option<&str>, cipher_suite: &[u8]) -> Result<()> {
    if let Some(key_id) = key_id {
        if key_id.trim().is_empty() {
            return Err(SadbError::validation(field, "key id is empty"));
        }
        if cipher_suite.len() != 1 {
            return Err(SadbError::validation(
                field,
                format!("cipher suite must be 1 byte, got {}", cipher_suite.len()),
            ));
        }
    }
    Ok(())
}

/// Cross-field consistency of a full parameter set.
pub fn validate_params(params: &SaParams) -> Result<()> {
    check_len("ECS", params.ecs_len as usize, params.ecs.len())?;
    check_len("ACS", params.acs_len as usize, params.acs.len())?;
    check_binding("encryption key", params.ekid.as_deref(), &params.ecs)?;
    check_binding("authentication key", params.akid.as_deref(), &params.acs)?;

    if let Some(iv) = &params.iv {
        check_len("IV", params.iv_len as usize, iv.len())?;
    }
    if params.ekid.is_some() {
        if let Some(suite) = EncryptionSuite::from_ecs(&params.ecs) {
            if params.iv_len != suite.iv_len() {
                return Err(SadbError::validation(
                    "IV",
                    format!(
                        "declared length {} but the cipher suite requires {} bytes",
                        params.iv_len,
                        suite.iv_len()
                    ),
                ));
            }
        }
    }

    check_arsn_len(params.arsn_len)?;
    check_len("ARSN", params.arsn_len as usize, params.arsn.len())?;
    check_len("ABM", params.abm_len as usize, params.abm.len())?;
    Ok(())
}
