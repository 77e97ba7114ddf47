use crate::error::SolowordError;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Read-ahead buffer size. One page keeps the transfer granularity
/// aligned with what the kernel readahead hands us anyway.
pub const READ_BUF_SIZE: usize = 4096;

/// Forward-only buffered reader over a regular file.
///
/// Tracks its own absolute position: `tell()` stays meaningful at EOF,
/// which a generic `Seek`-based position query does not guarantee. The
/// read-ahead buffer is exposed through `peek_buffer`/`advance` so the
/// tokenizer can scan bytes in place instead of copying one at a time.
#[derive(Debug)]
pub struct SequentialReader {
    file: File,
    path: PathBuf,
    role: &'static str,
    buf: Vec<u8>,
    pos: usize,
    len: usize,
    /// Absolute file offset of `buf[0]`.
    base: u64,
}

impl SequentialReader {
    /// Open `path` and position the stream at absolute offset `seekset`.
    pub fn open(
        path: &Path,
        role: &'static str,
        seekset: u64,
    ) -> Result<SequentialReader, SolowordError> {
        let mut file = File::open(path).map_err(|e| SolowordError::io(&e, path, role))?;
        if seekset > 0 {
            file.seek(SeekFrom::Start(seekset))
                .map_err(|e| SolowordError::io(&e, path, role))?;
        }
        Ok(SequentialReader {
            file,
            path: path.to_path_buf(),
            role,
            buf: vec![0u8; READ_BUF_SIZE],
            pos: 0,
            len: 0,
            base: seekset,
        })
    }

    fn fail(&self, errno: i32) -> SolowordError {
        SolowordError::Io {
            errno,
            path: self.path.clone(),
            role: self.role,
        }
    }

    /// Refill the buffer if it is fully consumed. Leaves `pos == len == 0`
    /// at EOF.
    fn refill(&mut self) -> Result<(), SolowordError> {
        if self.pos < self.len {
            return Ok(());
        }
        self.base += self.len as u64;
        self.pos = 0;
        self.len = self
            .file
            .read(&mut self.buf)
            .map_err(|e| SolowordError::io(&e, &self.path, self.role))?;
        Ok(())
    }

    /// Bytes consumed since the start of the file (absolute, not since
    /// the initial seek).
    pub fn tell(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// True iff a subsequent one-byte read would see no bytes.
    pub fn eof(&mut self) -> Result<bool, SolowordError> {
        self.refill()?;
        Ok(self.pos == self.len)
    }

    /// The unconsumed portion of the read-ahead buffer, refilled first if
    /// necessary. An empty slice means EOF.
    pub fn peek_buffer(&mut self) -> Result<&[u8], SolowordError> {
        self.refill()?;
        Ok(&self.buf[self.pos..self.len])
    }

    /// Consume `n` bytes previously observed through `peek_buffer`.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.len - self.pos);
        self.pos += n;
    }

    /// Read exactly `out.len()` bytes or fail with a premature-EOF error.
    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<(), SolowordError> {
        let mut filled = 0;
        while filled < out.len() {
            self.refill()?;
            if self.pos == self.len {
                return Err(self.fail(libc::EIO));
            }
            let take = (self.len - self.pos).min(out.len() - filled);
            out[filled..filled + take].copy_from_slice(&self.buf[self.pos..self.pos + take]);
            self.pos += take;
            filled += take;
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, SolowordError> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    pub fn read_u64(&mut self) -> Result<u64, SolowordError> {
        let mut b = [0u8; 8];
        self.read_exact(&mut b)?;
        Ok(u64::from_ne_bytes(b))
    }

    /// Read a NUL-terminated byte string into `out` (cleared first). The
    /// terminator is consumed but not stored.
    pub fn read_string(&mut self, out: &mut Vec<u8>) -> Result<(), SolowordError> {
        out.clear();
        loop {
            let chunk = self.peek_buffer()?;
            if chunk.is_empty() {
                return Err(self.fail(libc::EIO));
            }
            match chunk.iter().position(|&b| b == 0) {
                Some(i) => {
                    out.extend_from_slice(&chunk[..i]);
                    self.advance(i + 1);
                    return Ok(());
                }
                None => {
                    out.extend_from_slice(chunk);
                    let n = chunk.len();
                    self.advance(n);
                }
            }
        }
    }
}
