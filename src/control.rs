//! Sidecar control record for in-progress transfers
//!
//! The control file is the single source of truth for "there is a resumable
//! partial copy of this destination". It holds the source's modification
//! timestamp as captured when the transfer first started; a later invocation
//! compares it against the source's current timestamp to decide whether the
//! partial bytes on disk still correspond to the source content.

use anyhow::{Context, Result};
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A file modification timestamp at the filesystem's native resolution.
///
/// Stored as seconds + nanoseconds rather than a formatted date so the
/// equality comparison against a freshly captured [`FileTime`] is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStamp {
    pub secs: i64,
    pub nanos: u32,
}

impl SourceStamp {
    pub fn of(meta: &Metadata) -> Self {
        FileTime::from_last_modification_time(meta).into()
    }
}

impl From<FileTime> for SourceStamp {
    fn from(ft: FileTime) -> Self {
        Self {
            secs: ft.unix_seconds(),
            nanos: ft.nanoseconds(),
        }
    }
}

impl From<SourceStamp> for FileTime {
    fn from(stamp: SourceStamp) -> Self {
        FileTime::from_unix_time(stamp.secs, stamp.nanos)
    }
}

/// Durable state that makes resume safe across process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRecord {
    pub timestamp: SourceStamp,
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("control file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("control file {} is corrupt: {1}", .0.display())]
    Corrupt(PathBuf, #[source] serde_json::Error),
    #[error("failed to read control file: {0}")]
    Io(#[from] std::io::Error),
}

/// Read and deserialize the control record at `path`.
///
/// A missing file is reported as [`ControlError::NotFound`] so the caller can
/// distinguish "never started" from "started but unreadable".
pub fn read_record(path: &Path) -> Result<ControlRecord, ControlError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ControlError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(ControlError::Io(e)),
    };
    serde_json::from_slice(&data).map_err(|e| ControlError::Corrupt(path.to_path_buf(), e))
}

/// Serialize and persist the control record at `path`.
pub fn write_record(path: &Path, record: &ControlRecord) -> Result<()> {
    let data = serde_json::to_vec(record).context("Failed to serialize control record")?;
    fs::write(path, data)
        .with_context(|| format!("Failed to write control file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp() -> SourceStamp {
        SourceStamp {
            secs: 1_700_000_000,
            nanos: 123_456_789,
        }
    }

    #[test]
    fn record_round_trips() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("x.ctrl");
        let record = ControlRecord { timestamp: stamp() };
        write_record(&path, &record)?;
        let back = read_record(&path).unwrap();
        assert_eq!(back, record);
        Ok(())
    }

    #[test]
    fn wire_shape_is_a_timestamp_object() {
        let value = serde_json::to_value(ControlRecord { timestamp: stamp() }).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"timestamp": {"secs": 1_700_000_000i64, "nanos": 123_456_789u32}})
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_record(&dir.path().join("absent.ctrl")).unwrap_err();
        assert!(matches!(err, ControlError::NotFound(_)));
    }

    #[test]
    fn garbage_is_corrupt_not_missing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("x.ctrl");
        fs::write(&path, b"not json at all")?;
        let err = read_record(&path).unwrap_err();
        assert!(matches!(err, ControlError::Corrupt(..)));
        Ok(())
    }

    #[test]
    fn stamp_converts_through_filetime_exactly() {
        let s = stamp();
        let ft: FileTime = s.into();
        assert_eq!(SourceStamp::from(ft), s);
    }
}
