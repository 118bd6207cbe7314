//! Cross-process liveness marker: a small mapped file two processes can use
//! to tell whether the other is still alive, built on
//! [`AtomicBuffer`]'s `Mapped` backing — the only component in this crate
//! that performs file I/O.
//!
//! Grounded on `buffer::backing::MappedRegion` (already wired for the `mmap`
//! feature); this module only adds the layout, existence policy, and
//! idempotent close around it.

use crate::buffer::AtomicBuffer;
use crate::clock::{EpochClock, SystemEpochClock};
use crate::error::MarkFileError;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

/// What [`MarkFile::open`] requires about the file's prior existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistencePolicy {
    /// The file must already exist; opening a missing file is an error.
    MustExist,
    /// The file must not already exist; opening an existing file is an error.
    MustNotExist,
    /// Remove any existing file first, then create fresh.
    Recreate,
}

fn validate_layout(version_offset: usize, timestamp_offset: usize, total_length: usize) -> Result<(), MarkFileError> {
    if version_offset + 4 > timestamp_offset {
        return Err(MarkFileError::InvalidLayout {
            version_offset,
            timestamp_offset,
        });
    }
    if timestamp_offset + 8 > total_length {
        return Err(MarkFileError::InvalidLayout {
            version_offset,
            timestamp_offset,
        });
    }
    Ok(())
}

/// A fixed-size mapped file storing a 32-bit `version` and 64-bit
/// `timestamp` at caller-configured offsets, plus whatever user-defined bytes
/// the caller places after them.
///
/// `version` starts at `0`; a reader treats `0` as "not yet initialized" —
/// [`MarkFile::is_active`] is false until a writer calls
/// [`MarkFile::signal_ready`] with a nonzero version.
pub struct MarkFile<C: EpochClock = SystemEpochClock> {
    buffer: Mutex<Option<AtomicBuffer<'static>>>,
    version_offset: usize,
    timestamp_offset: usize,
    clock: C,
}

impl MarkFile<SystemEpochClock> {
    /// Opens or creates the mark file at `path` per `policy`, using the
    /// system wall clock for [`MarkFile::is_active`].
    ///
    /// # Errors
    /// Returns [`MarkFileError::InvalidLayout`] if `version_offset + 4 >
    /// timestamp_offset` or the timestamp field would not fit in
    /// `total_length`; [`MarkFileError::ExistencePolicy`] if `policy` is
    /// violated; [`MarkFileError::Io`] for file/mapping failures.
    pub fn open(
        path: impl AsRef<Path>,
        policy: ExistencePolicy,
        total_length: usize,
        version_offset: usize,
        timestamp_offset: usize,
    ) -> Result<Self, MarkFileError> {
        Self::open_with_clock(path, policy, total_length, version_offset, timestamp_offset, SystemEpochClock)
    }
}

impl<C: EpochClock> MarkFile<C> {
    /// As [`MarkFile::open`], but with an explicit clock (for testing, or to
    /// share a [`crate::clock::CachedEpochClock`] across several collaborators).
    ///
    /// # Errors
    /// See [`MarkFile::open`].
    pub fn open_with_clock(
        path: impl AsRef<Path>,
        policy: ExistencePolicy,
        total_length: usize,
        version_offset: usize,
        timestamp_offset: usize,
        clock: C,
    ) -> Result<Self, MarkFileError> {
        validate_layout(version_offset, timestamp_offset, total_length)?;

        let path = path.as_ref();
        let existed = path.exists();
        match policy {
            ExistencePolicy::MustExist if !existed => {
                return Err(MarkFileError::ExistencePolicy("mark file does not exist"));
            }
            ExistencePolicy::MustNotExist if existed => {
                return Err(MarkFileError::ExistencePolicy("mark file already exists"));
            }
            ExistencePolicy::Recreate if existed => {
                std::fs::remove_file(path)?;
            }
            _ => {}
        }

        let file = OpenOptions::new().read(true).write(true).create(true).truncate(false).open(path)?;
        file.set_len(u64::try_from(total_length).expect("total_length fits in u64"))?;

        let region = crate::buffer::backing::MappedRegion::map(file, total_length)?;
        let buffer = AtomicBuffer::from_mapped(region, total_length);

        Ok(Self {
            buffer: Mutex::new(Some(buffer)),
            version_offset,
            timestamp_offset,
            clock,
        })
    }

    fn with_buffer<T>(&self, f: impl FnOnce(&AtomicBuffer<'static>) -> Result<T, MarkFileError>) -> Result<T, MarkFileError> {
        let guard = self.buffer.lock().expect("mark file mutex poisoned");
        match guard.as_ref() {
            Some(buffer) => f(buffer),
            None => Err(MarkFileError::ExistencePolicy("mark file is closed")),
        }
    }

    /// Publishes a nonzero version via a release-store, marking this file
    /// "ready" for readers polling [`MarkFile::is_active`].
    ///
    /// # Errors
    /// Propagates a buffer error, or [`MarkFileError::ExistencePolicy`] if
    /// already closed.
    pub fn signal_ready(&self, version: i32) -> Result<(), MarkFileError> {
        self.with_buffer(|buffer| Ok(buffer.put_i32_release(self.version_offset, version)?))
    }

    /// Publishes a heartbeat timestamp via a release-store.
    ///
    /// # Errors
    /// See [`MarkFile::signal_ready`].
    pub fn timestamp_ordered(&self, timestamp_millis: i64) -> Result<(), MarkFileError> {
        self.with_buffer(|buffer| Ok(buffer.put_i64_release(self.timestamp_offset, timestamp_millis)?))
    }

    /// Sequentially-consistent read of the version field.
    ///
    /// # Errors
    /// See [`MarkFile::signal_ready`].
    pub fn version_volatile(&self) -> Result<i32, MarkFileError> {
        self.with_buffer(|buffer| Ok(buffer.get_i32(self.version_offset)?))
    }

    /// Sequentially-consistent read of the timestamp field.
    ///
    /// # Errors
    /// See [`MarkFile::signal_ready`].
    pub fn timestamp_volatile(&self) -> Result<i64, MarkFileError> {
        self.with_buffer(|buffer| Ok(buffer.get_i64(self.timestamp_offset)?))
    }

    /// Plain (non-atomic) read of the version field; the caller externally
    /// synchronizes, e.g. a single reader thread re-checking its own last
    /// observation.
    ///
    /// # Errors
    /// See [`MarkFile::signal_ready`].
    pub fn version_weak(&self) -> Result<i32, MarkFileError> {
        self.with_buffer(|buffer| Ok(buffer.get_i32_plain(self.version_offset)?))
    }

    /// Plain (non-atomic) read of the timestamp field.
    ///
    /// # Errors
    /// See [`MarkFile::signal_ready`].
    pub fn timestamp_weak(&self) -> Result<i64, MarkFileError> {
        self.with_buffer(|buffer| Ok(buffer.get_i64_plain(self.timestamp_offset)?))
    }

    /// `true` iff a nonzero version has appeared and `now - timestamp <=
    /// timeout_millis`.
    ///
    /// # Errors
    /// See [`MarkFile::signal_ready`].
    pub fn is_active(&self, timeout_millis: i64) -> Result<bool, MarkFileError> {
        let version = self.version_volatile()?;
        if version == 0 {
            return Ok(false);
        }
        let timestamp = self.timestamp_volatile()?;
        let now = self.clock.time_millis();
        Ok(now - timestamp <= timeout_millis)
    }

    /// Raw access to user-defined bytes past the timestamp field, for
    /// callers storing their own payload in the mark file.
    ///
    /// # Errors
    /// See [`MarkFile::signal_ready`].
    pub fn user_region(&self, f: impl FnOnce(&AtomicBuffer<'static>) -> Result<(), MarkFileError>) -> Result<(), MarkFileError> {
        self.with_buffer(f)
    }

    /// Unmaps the file. Idempotent: a second call is a no-op.
    pub fn close(&self) {
        let mut guard = self.buffer.lock().expect("mark file mutex poisoned");
        *guard = None;
    }

    /// Whether [`MarkFile::close`] has already run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.buffer.lock().expect("mark file mutex poisoned").is_none()
    }
}
