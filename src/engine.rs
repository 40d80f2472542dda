//! Resumable single-file copy engine
//!
//! One invocation either starts a fresh transfer, resumes a valid partial
//! one, or rejects stale/corrupt state. Bytes land in `<dest>.copying` with
//! a `<dest>.ctrl` sidecar carrying the source's modification time; a clean
//! completion renames the partial file into place, restores the timestamp
//! and removes the sidecar. Rejected artifacts are never auto-deleted, so an
//! operator can inspect them before restarting fresh.

use anyhow::{anyhow, Context};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::control::{self, ControlError, ControlRecord, SourceStamp};
use crate::logger::Logger;
use crate::progress::ProgressSink;

pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;
pub const PART_SUFFIX: &str = "copying";
pub const CONTROL_SUFFIX: &str = "ctrl";

/// Conditions the user can fix by changing inputs or cleaning up artifacts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserError {
    #[error("source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("destination folder not found: {}", .0.display())]
    DestinationFolderNotFound(PathBuf),
    #[error("destination file already exists: {}", .0.display())]
    DestinationAlreadyExists(PathBuf),
    #[error("partial copy found but its control file is missing: {}", .0.display())]
    ControlFileNotFound(PathBuf),
    #[error("source file changed since the previous copy attempt")]
    SourceChangedSinceLastCopy,
    #[error("source file changed while the copy was running")]
    SourceChangedDuringCopy,
}

/// Engine outcome split the way the CLI displays it: short message for
/// user-correctable conditions, full diagnostic chain for everything else.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl From<std::io::Error> for CopyError {
    fn from(e: std::io::Error) -> Self {
        CopyError::Fatal(e.into())
    }
}

#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Block size for the read/append loop.
    pub buffer_size: usize,
    /// Minimum spacing between liveness checks and progress callbacks.
    pub check_interval: Duration,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            check_interval: Duration::from_secs(1),
        }
    }
}

/// On-disk artifacts for one destination name.
#[derive(Debug, Clone)]
pub struct TransferPaths {
    pub destination: PathBuf,
    pub partial: PathBuf,
    pub control: PathBuf,
}

impl TransferPaths {
    pub fn derive(source: &Path, destination_folder: &Path) -> Result<Self, CopyError> {
        let name = source
            .file_name()
            .ok_or_else(|| anyhow!("source path {} has no file name", source.display()))?;
        let destination = destination_folder.join(name);
        Ok(Self {
            partial: with_suffix(&destination, PART_SUFFIX),
            control: with_suffix(&destination, CONTROL_SUFFIX),
            destination,
        })
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(suffix);
    PathBuf::from(os)
}

#[derive(Debug)]
pub struct CopySummary {
    /// Byte offset the transfer started from (0 for a fresh start).
    pub resume_offset: u64,
    /// Bytes appended by this invocation.
    pub bytes_copied: u64,
    pub total_len: u64,
    pub elapsed: Duration,
    /// Set when the control file could not be removed after a successful
    /// finalize; the copy itself still succeeded.
    pub control_cleanup: Option<String>,
}

/// Copy `source` into `destination_folder`, resuming a previous attempt if a
/// valid partial artifact pair is present.
///
/// Preconditions fail fast before any side effect; validation failures and
/// staleness are [`CopyError::User`], corrupt control state and unexpected
/// I/O faults are [`CopyError::Fatal`]. Nothing is retried internally —
/// re-invoking the tool is the retry, and is what resumption exists for.
pub fn copy_with_resume(
    source: &Path,
    destination_folder: &Path,
    opts: &CopyOptions,
    sink: &dyn ProgressSink,
    logger: &dyn Logger,
) -> Result<CopySummary, CopyError> {
    let source_meta = match fs::metadata(source) {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(UserError::SourceNotFound(source.to_path_buf()).into()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(UserError::SourceNotFound(source.to_path_buf()).into())
        }
        Err(e) => return Err(e.into()),
    };
    if !destination_folder.is_dir() {
        return Err(UserError::DestinationFolderNotFound(destination_folder.to_path_buf()).into());
    }
    let paths = TransferPaths::derive(source, destination_folder)?;
    if paths.destination.exists() {
        return Err(UserError::DestinationAlreadyExists(paths.destination).into());
    }

    let source_stamp = SourceStamp::of(&source_meta);
    let total_len = source_meta.len();

    logger.start(source, &paths.destination);

    let resume_offset = match fs::metadata(&paths.partial) {
        Ok(partial_meta) => {
            // A partial file without a readable, matching control record is
            // untrustworthy; never silently resume or restart over it.
            let record = match control::read_record(&paths.control) {
                Ok(record) => record,
                Err(ControlError::NotFound(path)) => {
                    return Err(UserError::ControlFileNotFound(path).into())
                }
                Err(e) => return Err(CopyError::Fatal(e.into())),
            };
            if record.timestamp != source_stamp {
                return Err(UserError::SourceChangedSinceLastCopy.into());
            }
            let offset = partial_meta.len();
            if offset > total_len {
                return Err(CopyError::Fatal(anyhow!(
                    "partial file {} is longer than the source ({} > {} bytes)",
                    paths.partial.display(),
                    offset,
                    total_len
                )));
            }
            logger.resume(&paths.destination, offset);
            offset
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            // Fresh start. The control record goes down before any bytes so
            // a crash right after creating the partial file still leaves a
            // resumable pair behind.
            control::write_record(
                &paths.control,
                &ControlRecord {
                    timestamp: source_stamp,
                },
            )?;
            0
        }
        Err(e) => return Err(e.into()),
    };

    let mut reader = File::open(source)
        .with_context(|| format!("Failed to open source file {}", source.display()))?;
    reader.seek(SeekFrom::Start(resume_offset))?;

    let mut writer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.partial)
        .with_context(|| format!("Failed to open partial file {}", paths.partial.display()))?;
    // One transfer per destination name at a time; a second invocation must
    // fail fast instead of interleaving appends.
    writer.try_lock_exclusive().with_context(|| {
        format!(
            "Another copy to {} appears to be in progress",
            paths.destination.display()
        )
    })?;

    let mut buffer = vec![0u8; opts.buffer_size.max(1)];
    let mut bytes_done = resume_offset;
    let start = Instant::now();
    let mut last_check = Instant::now();

    sink.on_progress(bytes_done, total_len, start.elapsed());

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buffer[..n])?;
        bytes_done += n as u64;

        if last_check.elapsed() >= opts.check_interval {
            let current = SourceStamp::of(&fs::metadata(source)?);
            if current != source_stamp {
                // Bytes written so far may be based on stale content; leave
                // the pair on disk for the next run's resume-or-reject
                // decision under the new timestamp.
                return Err(UserError::SourceChangedDuringCopy.into());
            }
            sink.on_progress(bytes_done, total_len, start.elapsed());
            last_check = Instant::now();
        }
    }

    // Mandatory final update so 100% is always observable.
    sink.on_progress(bytes_done, total_len, start.elapsed());

    // Close and unlock before the rename.
    drop(writer);

    fs::rename(&paths.partial, &paths.destination).with_context(|| {
        format!(
            "Failed to finalize {} into place",
            paths.destination.display()
        )
    })?;
    filetime::set_file_mtime(&paths.destination, source_stamp.into())
        .context("Failed to restore the destination timestamp")?;

    let control_cleanup = match fs::remove_file(&paths.control) {
        Ok(()) => None,
        Err(e) => {
            // The data is already in place; an orphaned control file is a
            // warning, not a failed copy.
            let msg = format!(
                "could not remove control file {}: {e}",
                paths.control.display()
            );
            logger.warn("finalize", &msg);
            Some(msg)
        }
    };

    let elapsed = start.elapsed();
    logger.done(
        &paths.destination,
        bytes_done - resume_offset,
        elapsed.as_secs_f64(),
    );

    Ok(CopySummary {
        resume_offset,
        bytes_copied: bytes_done - resume_offset,
        total_len,
        elapsed,
        control_cleanup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_names_extend_the_destination_name() {
        let paths = TransferPaths::derive(Path::new("/data/video.mkv"), Path::new("/backup"))
            .expect("derive");
        assert_eq!(paths.destination, Path::new("/backup/video.mkv"));
        assert_eq!(paths.partial, Path::new("/backup/video.mkv.copying"));
        assert_eq!(paths.control, Path::new("/backup/video.mkv.ctrl"));
    }

    #[test]
    fn suffix_applies_to_extensionless_names() {
        assert_eq!(
            with_suffix(Path::new("/backup/blob"), PART_SUFFIX),
            Path::new("/backup/blob.copying")
        );
    }
}
