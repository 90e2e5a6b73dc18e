//! Pattern file format.
//!
//! A saved pattern is a fixed 37-byte record:
//!
//! | offset | size | content                                      |
//! |--------|------|----------------------------------------------|
//! | 0      | 4    | magic `BBXP`                                 |
//! | 4      | 1    | format version                               |
//! | 5      | 32   | cell bits, track-major, least significant first |
//!
//! Anything else is rejected before the caller's pattern is touched.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::pattern::{Pattern, CELL_COUNT};

pub const MAGIC: [u8; 4] = *b"BBXP";

pub const FORMAT_VERSION: u8 = 1;

/// File extension used for saved patterns.
pub const EXTENSION: &str = "bbxp";

const HEADER_LEN: usize = MAGIC.len() + 1;
const BITSET_LEN: usize = CELL_COUNT / 8;

/// Total size of an encoded pattern.
pub const RECORD_LEN: usize = HEADER_LEN + BITSET_LEN;

pub fn encode(pattern: &Pattern) -> Vec<u8> {
    let mut out = Vec::with_capacity(RECORD_LEN);
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);

    let mut bits = [0u8; BITSET_LEN];
    for (i, _) in pattern.export_all().iter().enumerate().filter(|(_, on)| **on) {
        bits[i / 8] |= 1 << (i % 8);
    }
    out.extend_from_slice(&bits);
    out
}

pub fn decode(bytes: &[u8]) -> Result<Pattern> {
    if bytes.len() != RECORD_LEN {
        return Err(Error::InvalidPersistedData(format!(
            "expected {} bytes, got {}",
            RECORD_LEN,
            bytes.len()
        )));
    }

    let (header, bits) = bytes.split_at(HEADER_LEN);
    if header[..MAGIC.len()] != MAGIC {
        return Err(Error::InvalidPersistedData(
            "not a pattern file (bad magic)".to_string(),
        ));
    }
    let version = header[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(Error::InvalidPersistedData(format!(
            "unsupported format version {}",
            version
        )));
    }

    let mut values = [false; CELL_COUNT];
    for (i, value) in values.iter_mut().enumerate() {
        *value = bits[i / 8] & (1 << (i % 8)) != 0;
    }
    let mut pattern = Pattern::new();
    pattern.set_all(values);
    Ok(pattern)
}

/// Write `pattern` to `path`, replacing any existing file.
pub fn save<P: AsRef<Path>>(path: P, pattern: &Pattern) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, encode(pattern))?;
    info!(path = %path.display(), active_cells = pattern.active_count(), "Pattern saved");
    Ok(())
}

/// Read a pattern from `path`.
///
/// At most one byte past a full record is read, so picking a large file by
/// mistake fails fast.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Pattern> {
    let path = path.as_ref();
    let mut bytes = Vec::with_capacity(RECORD_LEN + 1);
    File::open(path)?
        .take(RECORD_LEN as u64 + 1)
        .read_to_end(&mut bytes)?;

    let decoded = if bytes.len() > RECORD_LEN {
        Err(Error::InvalidPersistedData(format!(
            "file is larger than {} bytes",
            RECORD_LEN
        )))
    } else {
        decode(&bytes)
    };
    let pattern = decoded.inspect_err(|e| {
        warn!(path = %path.display(), error = %e, "Rejected pattern file");
    })?;
    info!(path = %path.display(), active_cells = pattern.active_count(), "Pattern loaded");
    Ok(pattern)
}
