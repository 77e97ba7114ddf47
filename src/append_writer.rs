use crate::error::SolowordError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const WRITE_BUF_SIZE: usize = 4096;

/// How an `AppendWriter` treats its in-memory buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Fixed-size buffer flushed on overflow or on `sync`. No durability
    /// guarantee between syncs. Used for profile files.
    Buffered,
    /// Unbounded staging buffer written out and fsync'd as one unit on
    /// `sync`. Nothing between two syncs ever reaches disk partially.
    /// Used for the recovery log.
    Log,
}

/// Append-only writer with typed encode helpers.
#[derive(Debug)]
pub struct AppendWriter {
    file: File,
    path: PathBuf,
    role: &'static str,
    policy: WritePolicy,
    buf: Vec<u8>,
    tell: u64,
}

impl AppendWriter {
    /// Open (or create) `path` for appending. `truncate` discards any
    /// existing content first; profile outputs use this so a stale file
    /// from an unlogged crash cannot be appended to.
    pub fn open(
        path: &Path,
        role: &'static str,
        policy: WritePolicy,
        truncate: bool,
    ) -> Result<AppendWriter, SolowordError> {
        let file = if truncate {
            // append+truncate is rejected by the OS; recreate instead.
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
        } else {
            OpenOptions::new().append(true).create(true).open(path)
        }
        .map_err(|e| SolowordError::io(&e, path, role))?;
        let tell = file
            .metadata()
            .map_err(|e| SolowordError::io(&e, path, role))?
            .len();
        Ok(AppendWriter {
            file,
            path: path.to_path_buf(),
            role,
            policy,
            buf: Vec::with_capacity(WRITE_BUF_SIZE),
            tell,
        })
    }

    fn flush_buf(&mut self) -> Result<(), SolowordError> {
        if !self.buf.is_empty() {
            self.file
                .write_all(&self.buf)
                .map_err(|e| SolowordError::io(&e, &self.path, self.role))?;
            self.buf.clear();
        }
        Ok(())
    }

    /// Queue `data` for writing. Under `Buffered` the fixed buffer is
    /// flushed when it overflows; under `Log` everything stays staged
    /// until `sync`.
    pub fn write(&mut self, data: &[u8]) -> Result<(), SolowordError> {
        self.buf.extend_from_slice(data);
        if self.policy == WritePolicy::Buffered && self.buf.len() >= WRITE_BUF_SIZE {
            self.flush_buf()?;
        }
        self.tell += data.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<(), SolowordError> {
        self.write(&[v])
    }

    pub fn write_u64(&mut self, v: u64) -> Result<(), SolowordError> {
        self.write(&v.to_ne_bytes())
    }

    /// Write a byte string followed by its NUL terminator. Callers must
    /// guarantee the string itself contains no NUL (the tokenizer treats
    /// NUL as whitespace, so words never do).
    pub fn write_str(&mut self, s: &[u8]) -> Result<(), SolowordError> {
        debug_assert!(!s.contains(&0));
        self.write(s)?;
        self.write(&[0])
    }

    /// Position as if everything buffered had been flushed.
    pub fn tell(&self) -> u64 {
        self.tell
    }

    /// Group-commit boundary. Under `Log` the staged bytes land on disk
    /// as one fsync'd unit; under `Buffered` the buffer is drained
    /// without a durability barrier.
    pub fn sync(&mut self) -> Result<(), SolowordError> {
        self.flush_buf()?;
        if self.policy == WritePolicy::Log {
            self.file
                .sync_all()
                .map_err(|e| SolowordError::io(&e, &self.path, self.role))?;
        }
        Ok(())
    }

    /// Flush, fsync, and return the final size. Profile files are closed
    /// through this before their log record is synced, so the log never
    /// names a file that is not durably on disk.
    pub fn close(mut self) -> Result<u64, SolowordError> {
        self.flush_buf()?;
        self.file
            .sync_all()
            .map_err(|e| SolowordError::io(&e, &self.path, self.role))?;
        Ok(self.tell)
    }
}
