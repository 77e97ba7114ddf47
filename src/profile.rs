use crate::append_writer::{AppendWriter, WritePolicy};
use crate::error::SolowordError;
use crate::seq_reader::SequentialReader;
use std::path::Path;

const PROFILE_ROLE: &str = "profile";

/// One logical record of a profile file.
///
/// A profile is a byte-lexicographically sorted run of these, one per
/// distinct word in the covered input range. `occur` is only meaningful
/// for words seen exactly once in that range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileItem {
    Unique { word: Vec<u8>, occur: u64 },
    Repeated { word: Vec<u8> },
}

impl ProfileItem {
    pub fn word(&self) -> &[u8] {
        match self {
            ProfileItem::Unique { word, .. } | ProfileItem::Repeated { word } => word,
        }
    }

    pub fn into_word(self) -> Vec<u8> {
        match self {
            ProfileItem::Unique { word, .. } | ProfileItem::Repeated { word } => word,
        }
    }

    pub fn is_repeated(&self) -> bool {
        matches!(self, ProfileItem::Repeated { .. })
    }

    pub fn occur(&self) -> Option<u64> {
        match self {
            ProfileItem::Unique { occur, .. } => Some(*occur),
            ProfileItem::Repeated { .. } => None,
        }
    }
}

/// Streaming writer for one profile file.
///
/// On-disk record: the word bytes, a NUL, one flag byte (nonzero =
/// repeated), then the 8-byte occurrence offset iff unique.
pub struct ProfileWriter {
    out: AppendWriter,
}

impl ProfileWriter {
    /// Create (truncating any stale leftover from an unlogged crash).
    pub fn create(path: &Path) -> Result<ProfileWriter, SolowordError> {
        let out = AppendWriter::open(path, PROFILE_ROLE, WritePolicy::Buffered, true)?;
        Ok(ProfileWriter { out })
    }

    pub fn push(&mut self, item: &ProfileItem) -> Result<(), SolowordError> {
        self.push_word(item.word(), item.occur())
    }

    /// `occur == None` marks the word repeated.
    pub fn push_word(&mut self, word: &[u8], occur: Option<u64>) -> Result<(), SolowordError> {
        self.out.write_str(word)?;
        match occur {
            Some(off) => {
                self.out.write_u8(0)?;
                self.out.write_u64(off)?;
            }
            None => self.out.write_u8(1)?,
        }
        Ok(())
    }

    /// Flush, make durable, and report the physical size. Callers sync
    /// their log record only after this returns.
    pub fn close(self) -> Result<u64, SolowordError> {
        self.out.close()
    }
}

/// Forward-only reader with a one-item prefetch: `empty()` is accurate
/// immediately after `open` and after every `pop`.
pub struct ProfileReader {
    input: SequentialReader,
    head: Option<ProfileItem>,
}

impl ProfileReader {
    pub fn open(path: &Path) -> Result<ProfileReader, SolowordError> {
        let input = SequentialReader::open(path, PROFILE_ROLE, 0)?;
        let mut reader = ProfileReader { input, head: None };
        reader.fetch()?;
        Ok(reader)
    }

    fn fetch(&mut self) -> Result<(), SolowordError> {
        if self.input.eof()? {
            self.head = None;
            return Ok(());
        }
        let mut word = Vec::new();
        self.input.read_string(&mut word)?;
        let flag = self.input.read_u8()?;
        self.head = Some(if flag != 0 {
            ProfileItem::Repeated { word }
        } else {
            let occur = self.input.read_u64()?;
            ProfileItem::Unique { word, occur }
        });
        Ok(())
    }

    pub fn empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn peek(&self) -> &ProfileItem {
        self.head.as_ref().expect("peek on drained profile")
    }

    pub fn pop(&mut self) -> Result<ProfileItem, SolowordError> {
        let item = self.head.take().expect("pop on drained profile");
        self.fetch()?;
        Ok(item)
    }
}

/// Decorator that hides `Repeated` items, so a scan sees only words that
/// occurred exactly once.
pub struct SingularReader {
    inner: ProfileReader,
}

impl SingularReader {
    pub fn new(inner: ProfileReader) -> Result<SingularReader, SolowordError> {
        let mut reader = SingularReader { inner };
        reader.skip_repeated()?;
        Ok(reader)
    }

    fn skip_repeated(&mut self) -> Result<(), SolowordError> {
        while !self.inner.empty() && self.inner.peek().is_repeated() {
            self.inner.pop()?;
        }
        Ok(())
    }

    pub fn empty(&self) -> bool {
        self.inner.empty()
    }

    pub fn peek(&self) -> &ProfileItem {
        self.inner.peek()
    }

    pub fn pop(&mut self) -> Result<ProfileItem, SolowordError> {
        let item = self.inner.pop()?;
        self.skip_repeated()?;
        Ok(item)
    }
}
