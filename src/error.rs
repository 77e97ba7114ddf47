use std::fmt;
use std::path::{Path, PathBuf};

/// Error type shared by every stage of the pipeline.
///
/// Each variant carries enough context to print the standard
/// `Error: <path> (<role>): <strerror>` line and to derive the process
/// exit status (the negated errno). There is no in-process retry;
/// recovery is by re-executing against the same workdir.
#[derive(Debug)]
pub enum SolowordError {
    /// An OS-level read/write/open/fsync/stat failure.
    Io {
        errno: i32,
        path: PathBuf,
        role: &'static str,
    },
    /// The recovery log contains an unknown record type or a record
    /// that contradicts the replayed state. Requires human intervention.
    CorruptLog { path: PathBuf },
    /// The original input file is absent, not a regular file, or too
    /// short for the progress already recorded in the log.
    MissingInput { errno: i32, path: PathBuf },
    /// The log was written by an incompatible build.
    VersionMismatch { path: PathBuf, found: String },
    /// A single word is larger than the entire working memory.
    InsufficientMemory { path: PathBuf },
}

impl SolowordError {
    pub fn io(err: &std::io::Error, path: &Path, role: &'static str) -> Self {
        SolowordError::Io {
            errno: err.raw_os_error().unwrap_or(libc::EIO),
            path: path.to_path_buf(),
            role,
        }
    }

    /// Errno-like code used for the process exit status.
    pub fn errno(&self) -> i32 {
        match self {
            SolowordError::Io { errno, .. } => *errno,
            SolowordError::CorruptLog { .. } => libc::EIO,
            SolowordError::MissingInput { errno, .. } => *errno,
            SolowordError::VersionMismatch { .. } => libc::EIO,
            SolowordError::InsufficientMemory { .. } => libc::ENOMEM,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SolowordError::Io { path, .. }
            | SolowordError::CorruptLog { path }
            | SolowordError::MissingInput { path, .. }
            | SolowordError::VersionMismatch { path, .. }
            | SolowordError::InsufficientMemory { path } => path,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            SolowordError::Io { role, .. } => role,
            SolowordError::CorruptLog { .. } => "log",
            SolowordError::MissingInput { .. } => "original-file",
            SolowordError::VersionMismatch { .. } => "log",
            SolowordError::InsufficientMemory { .. } => "workmem",
        }
    }
}

impl fmt::Display for SolowordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strerror = std::io::Error::from_raw_os_error(self.errno());
        write!(
            f,
            "{} ({}): {}",
            self.path().display(),
            self.role(),
            strerror
        )?;
        if let SolowordError::VersionMismatch { found, .. } = self {
            write!(f, " [log version {:?} is not supported]", found)?;
        }
        Ok(())
    }
}

impl std::error::Error for SolowordError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_errno_per_kind() {
        let corrupt = SolowordError::CorruptLog {
            path: PathBuf::from("/w/log"),
        };
        assert_eq!(corrupt.errno(), libc::EIO);

        let oom = SolowordError::InsufficientMemory {
            path: PathBuf::from("big.txt"),
        };
        assert_eq!(oom.errno(), libc::ENOMEM);

        let io = SolowordError::io(
            &std::io::Error::from_raw_os_error(libc::ENOENT),
            Path::new("missing"),
            "original-file",
        );
        assert_eq!(io.errno(), libc::ENOENT);
        assert_eq!(io.role(), "original-file");
    }

    #[test]
    fn test_display_contains_path_and_role() {
        let err = SolowordError::io(
            &std::io::Error::from_raw_os_error(libc::EACCES),
            Path::new("/data/input.txt"),
            "original-file",
        );
        let text = err.to_string();
        assert!(text.contains("/data/input.txt"));
        assert!(text.contains("(original-file)"));
    }
}
