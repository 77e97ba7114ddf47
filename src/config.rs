use crate::append_writer::{AppendWriter, WritePolicy};
use crate::dedup::DedupKind;
use crate::error::SolowordError;
use crate::profile::{ProfileReader, ProfileWriter, SingularReader};
use crate::seq_reader::SequentialReader;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stamped into the log as its first record. A workdir written by a
/// different version cannot be resumed.
pub const LOG_VERSION: &str = "20190609.0001";

/// Smallest accepted working memory.
pub const MIN_WORKMEM: usize = 4096;

/// Knobs shared by all stages.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub workmem: usize,
    pub page_pinned: bool,
    pub dedup: DedupKind,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            workmem: 1 << 30,
            page_pinned: false,
            dedup: DedupKind::Tree,
        }
    }
}

/// Workdir state shared by the stages: the profile files, and the
/// recovery log in exactly one of its two phases, replaying (reader
/// open) or appending (writer open).
///
/// The phase transition is explicit: stages call `recovery_done()` once
/// their replay is finished, which drops the reader and opens the
/// appender. Asking for the wrong half is a programming error, not an
/// I/O error.
#[derive(Debug)]
pub struct Config {
    workdir: PathBuf,
    log_path: PathBuf,
    ilog: Option<SequentialReader>,
    olog: Option<AppendWriter>,
    pub settings: Settings,
}

impl Config {
    /// Bootstrap the workdir: create it if absent, open the log on the
    /// appropriate side, and check the version stamp.
    ///
    /// An existing-but-empty log means the previous run died between
    /// creating the file and its first sync; since a sync unit that
    /// never completed is treated as absent, the workdir counts as fresh.
    pub fn open(workdir: &Path, settings: Settings) -> Result<Config, SolowordError> {
        let mut cfg = Config {
            workdir: workdir.to_path_buf(),
            log_path: workdir.join("log"),
            ilog: None,
            olog: None,
            settings,
        };

        match fs::metadata(&cfg.workdir) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir(&cfg.workdir)
                    .map_err(|e| SolowordError::io(&e, &cfg.workdir, "workdir"))?;
                cfg.start_fresh_log()?;
            }
            Err(e) => return Err(SolowordError::io(&e, &cfg.workdir, "workdir")),
            Ok(md) => {
                if !md.is_dir() {
                    return Err(SolowordError::Io {
                        errno: libc::ENOTDIR,
                        path: cfg.workdir.clone(),
                        role: "workdir",
                    });
                }
                match fs::metadata(&cfg.log_path) {
                    Err(e) if e.kind() == ErrorKind::NotFound => cfg.start_fresh_log()?,
                    Err(e) => return Err(SolowordError::io(&e, &cfg.log_path, "log")),
                    Ok(lmd) if !lmd.is_file() => return Err(cfg.corrupt_log()),
                    Ok(lmd) if lmd.len() == 0 => cfg.start_fresh_log()?,
                    Ok(_) => {
                        let mut ilog = SequentialReader::open(&cfg.log_path, "log", 0)?;
                        let mut version = Vec::new();
                        ilog.read_string(&mut version)?;
                        if version != LOG_VERSION.as_bytes() {
                            return Err(SolowordError::VersionMismatch {
                                path: cfg.log_path.clone(),
                                found: String::from_utf8_lossy(&version).into_owned(),
                            });
                        }
                        cfg.ilog = Some(ilog);
                    }
                }
            }
        }
        Ok(cfg)
    }

    fn start_fresh_log(&mut self) -> Result<(), SolowordError> {
        let mut olog = AppendWriter::open(&self.log_path, "log", WritePolicy::Log, false)?;
        olog.write_str(LOG_VERSION.as_bytes())?;
        olog.sync()?;
        self.olog = Some(olog);
        Ok(())
    }

    /// True while log records remain to be replayed (or until a stage
    /// declares its replay finished).
    pub fn recovery_pending(&self) -> bool {
        self.ilog.is_some()
    }

    /// The replay half of the log.
    pub fn ilog(&mut self) -> &mut SequentialReader {
        self.ilog.as_mut().expect("log already switched to append mode")
    }

    /// Finish replay: close the reader and reopen the log for appending.
    /// Idempotent once the appender is open.
    pub fn recovery_done(&mut self) -> Result<(), SolowordError> {
        if self.olog.is_some() {
            return Ok(());
        }
        self.ilog = None;
        self.olog = Some(AppendWriter::open(
            &self.log_path,
            "log",
            WritePolicy::Log,
            false,
        )?);
        Ok(())
    }

    /// The append half of the log. Only valid after `recovery_done`.
    pub fn olog(&mut self) -> &mut AppendWriter {
        self.olog.as_mut().expect("log replay not finished yet")
    }

    pub fn corrupt_log(&self) -> SolowordError {
        SolowordError::CorruptLog {
            path: self.log_path.clone(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Profile files are named by their numeric id, directly under the
    /// workdir.
    pub fn profile_path(&self, id: u64) -> PathBuf {
        self.workdir.join(id.to_string())
    }

    pub fn open_output(&self, id: u64) -> Result<ProfileWriter, SolowordError> {
        ProfileWriter::create(&self.profile_path(id))
    }

    pub fn open_input(&self, id: u64) -> Result<ProfileReader, SolowordError> {
        ProfileReader::open(&self.profile_path(id))
    }

    pub fn open_singular(&self, id: u64) -> Result<SingularReader, SolowordError> {
        SingularReader::new(self.open_input(id)?)
    }

    /// Remove a profile file; a file already gone is fine (GC may have
    /// run in a previous execution).
    pub fn remove(&self, id: u64) -> Result<(), SolowordError> {
        let path = self.profile_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SolowordError::io(&e, &path, "profile")),
        }
    }
}

/// Parse a memory size like `4096`, `64k`, `512M`, `1g`, `2tb` (base-2
/// units, optional trailing `b`, case-insensitive).
pub fn parse_memory_size(text: &str) -> Option<usize> {
    let digits_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    if digits_end == 0 {
        return None;
    }
    let value: usize = text[..digits_end].parse().ok()?;
    let shift = match text[digits_end..].to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" => 10,
        "m" | "mb" => 20,
        "g" | "gb" => 30,
        "t" | "tb" => 40,
        _ => return None,
    };
    value.checked_mul(1usize << shift)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_size_units() {
        assert_eq!(parse_memory_size("4096"), Some(4096));
        assert_eq!(parse_memory_size("16k"), Some(16 << 10));
        assert_eq!(parse_memory_size("16KB"), Some(16 << 10));
        assert_eq!(parse_memory_size("3m"), Some(3 << 20));
        assert_eq!(parse_memory_size("1g"), Some(1 << 30));
        assert_eq!(parse_memory_size("2tb"), Some(2usize << 40));
        assert_eq!(parse_memory_size("128b"), Some(128));
    }

    #[test]
    fn test_parse_memory_size_rejects_garbage() {
        assert_eq!(parse_memory_size(""), None);
        assert_eq!(parse_memory_size("g"), None);
        assert_eq!(parse_memory_size("12x"), None);
        assert_eq!(parse_memory_size("1gbb"), None);
        assert_eq!(parse_memory_size("-4"), None);
    }

    #[test]
    fn test_fresh_workdir_is_created_with_versioned_log() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("work");

        let cfg = Config::open(&workdir, Settings::default()).unwrap();
        assert!(!cfg.recovery_pending());
        drop(cfg);

        // Reopening finds the version stamp and enters replay mode.
        let mut cfg = Config::open(&workdir, Settings::default()).unwrap();
        assert!(cfg.recovery_pending());
        assert!(cfg.ilog().eof().unwrap());
    }

    #[test]
    fn test_version_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("work");
        fs::create_dir(&workdir).unwrap();
        fs::write(workdir.join("log"), b"19991231.9999\0").unwrap();

        let err = Config::open(&workdir, Settings::default()).unwrap_err();
        assert!(matches!(err, SolowordError::VersionMismatch { .. }));
    }

    #[test]
    fn test_empty_log_counts_as_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("work");
        fs::create_dir(&workdir).unwrap();
        fs::write(workdir.join("log"), b"").unwrap();

        let cfg = Config::open(&workdir, Settings::default()).unwrap();
        assert!(!cfg.recovery_pending());
    }

    #[test]
    fn test_workdir_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("file");
        fs::write(&not_a_dir, b"x").unwrap();

        let err = Config::open(&not_a_dir, Settings::default()).unwrap_err();
        assert_eq!(err.errno(), libc::ENOTDIR);
    }

    #[test]
    fn test_remove_tolerates_missing_profile() {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("work");
        let cfg = Config::open(&workdir, Settings::default()).unwrap();
        cfg.remove(42).unwrap();
    }
}
