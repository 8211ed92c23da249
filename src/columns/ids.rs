//! Integer object ids for supernovae.
//!
//! A supernova hosted by a real galaxy gets `host * 1024 + 22`, the usual
//! galaxy-derived id with the supernova object type in the low bits. Hosts
//! below [`GALAXY_HOST_THRESHOLD`] are not real galaxies; those get
//! `host + MAX_STAR_ID + 1`, which keeps them clear of every star id.

use super::ColumnError;

/// The largest id given to any star.
pub const MAX_STAR_ID: i64 = 41021613038;

/// The object-type tag for supernovae.
pub const SN_OBJECT_TYPE: i64 = 22;

/// Host ids at or above this are real galaxies.
pub const GALAXY_HOST_THRESHOLD: i64 = 100000;

const OFFSET: i64 = MAX_STAR_ID + 1;

/// The integer id of a supernova with host id `host`.
///
/// # Panics
///
/// Panics on arithmetic overflow in debug builds; use [`try_make_sn_int_id`]
/// for untrusted input.
pub fn make_sn_int_id(host: i64) -> i64 {
    if host < GALAXY_HOST_THRESHOLD {
        host + OFFSET
    } else {
        host * 1024 + SN_OBJECT_TYPE
    }
}

/// As [`make_sn_int_id`], but reject hosts that can't produce a unique id:
/// negative hosts, hosts so large the id overflows, and galaxy hosts whose id
/// would land in the range used by hosts below the threshold.
pub fn try_make_sn_int_id(host: i64) -> Result<i64, ColumnError> {
    if host < 0 {
        return Err(ColumnError::NegativeHost(host));
    }
    if host < GALAXY_HOST_THRESHOLD {
        return Ok(host + OFFSET);
    }

    let id = host
        .checked_mul(1024)
        .and_then(|i| i.checked_add(SN_OBJECT_TYPE))
        .ok_or(ColumnError::HostOverflow(host))?;
    if (OFFSET..OFFSET + GALAXY_HOST_THRESHOLD).contains(&id) {
        return Err(ColumnError::IdCollision { host, id });
    }
    Ok(id)
}
