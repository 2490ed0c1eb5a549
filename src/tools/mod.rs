//! Shared low-level helpers for the compression modules.

pub mod bitio;
pub mod crc;

use crate::Error;

/// Allocate a zeroed/filled scratch buffer, reporting failure instead of
/// aborting.  The per-session window and tree arenas go through this.
pub fn try_vec<T: Clone>(fill: T, n: usize) -> Result<Vec<T>,Error> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(n).map_err(|_| Error::OutOfMemory)?;
    v.resize(n,fill);
    Ok(v)
}
