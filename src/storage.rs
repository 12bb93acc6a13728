//! # Settings Slot Persistence
//!
//! The device stores each task's custom settings in a numbered slot. This
//! module defines that collaborator as the [`SettingsStore`] trait and ships
//! two backends:
//!
//! - [`FileSettingsStore`]: one file per slot, used by the host binary
//! - [`MemorySettingsStore`]: in-memory slots for tests and simulation
//!
//! ## Slot Layout
//!
//! A slot holds a frame `<len:u16 LE><payload>`. [`write_frame`] and
//! [`read_frame`] build and parse it; a length prefix larger than what was
//! actually read or larger than the capacity is clamped rather than trusted.
//!
//! Every call is a single synchronous attempt. There is no retry: a failed
//! write is reported to the caller, which keeps its previous state.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Size of the frame's length prefix.
pub const LENGTH_PREFIX: usize = 2;

/// Errors reported by a settings backend.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Reading or writing the backing file failed
    #[error("settings IO: {0}")]
    Io(#[from] io::Error),

    /// The backend refused the write
    #[error("settings write failed: {0}")]
    WriteFailed(String),
}

/// Slot-addressed byte storage.
pub trait SettingsStore {
    /// Fill `buf` from `slot` and return the number of bytes read.
    ///
    /// `buf.len()` is the maximum to read. An empty slot reads 0 bytes.
    fn load(&mut self, slot: u16, buf: &mut [u8]) -> Result<usize, PersistenceError>;

    /// Replace the contents of `slot` with `bytes`.
    fn save(&mut self, slot: u16, bytes: &[u8]) -> Result<(), PersistenceError>;
}

/// Prefix `payload` with its little-endian u16 length.
pub fn write_frame(payload: &[u8]) -> Vec<u8> {
    let len = u16::try_from(payload.len()).unwrap_or(u16::MAX);
    let mut frame = Vec::with_capacity(LENGTH_PREFIX + usize::from(len));
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload[..usize::from(len)]);
    frame
}

/// Extract the payload from the bytes read out of a slot.
///
/// Returns an empty payload for a frame shorter than the prefix.
pub fn read_frame(frame: &[u8], capacity: usize) -> &[u8] {
    if frame.len() < LENGTH_PREFIX {
        return &[];
    }
    let (prefix, rest) = frame.split_at(LENGTH_PREFIX);
    let declared = usize::from(u16::from_le_bytes([prefix[0], prefix[1]]));
    let len = declared.min(rest.len()).min(capacity);
    if len != declared {
        debug!(declared, len, "clamped settings frame length");
    }
    &rest[..len]
}

/// Slots stored as `slot-<n>.bin` files under a directory.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    dir: PathBuf,
}

impl FileSettingsStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        FileSettingsStore {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn slot_path(&self, slot: u16) -> PathBuf {
        self.dir.join(format!("slot-{slot}.bin"))
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&mut self, slot: u16, buf: &mut [u8]) -> Result<usize, PersistenceError> {
        let data = match fs::read(self.slot_path(slot)) {
            Ok(data) => data,
            // First run: nothing saved yet
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn save(&mut self, slot: u16, bytes: &[u8]) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        // Write to a sibling file first so a failed write can't truncate the slot.
        let path = self.slot_path(slot);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        debug!(slot, len = bytes.len(), path = %path.display(), "saved settings slot");
        Ok(())
    }
}

/// In-memory slots.
#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    slots: HashMap<u16, Vec<u8>>,
    fail_writes: Option<String>,
    fail_reads: Option<String>,
    writes: usize,
    reads: usize,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `save` fail with `message`.
    pub fn fail_writes(&mut self, message: impl Into<String>) {
        self.fail_writes = Some(message.into());
    }

    /// Make every following `load` fail with `message`.
    pub fn fail_reads(&mut self, message: impl Into<String>) {
        self.fail_reads = Some(message.into());
    }

    /// Number of load attempts so far, failed ones included.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Number of successful saves so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn slot(&self, slot: u16) -> Option<&[u8]> {
        self.slots.get(&slot).map(Vec::as_slice)
    }

    /// Seed a slot directly, bypassing the write counter.
    pub fn insert(&mut self, slot: u16, bytes: Vec<u8>) {
        self.slots.insert(slot, bytes);
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&mut self, slot: u16, buf: &mut [u8]) -> Result<usize, PersistenceError> {
        self.reads += 1;
        if let Some(message) = &self.fail_reads {
            return Err(io::Error::new(io::ErrorKind::Other, message.clone()).into());
        }
        let Some(data) = self.slots.get(&slot) else {
            return Ok(0);
        };
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn save(&mut self, slot: u16, bytes: &[u8]) -> Result<(), PersistenceError> {
        if let Some(message) = &self.fail_writes {
            return Err(PersistenceError::WriteFailed(message.clone()));
        }
        self.slots.insert(slot, bytes.to_vec());
        self.writes += 1;
        Ok(())
    }
}
