use crate::config::Config;
use crate::dedup::InCoreDedup;
use crate::error::SolowordError;
use crate::planner::ProfileSegment;
use crate::seq_reader::SequentialReader;
use std::fs;
use std::path::Path;

/// Log record tags owned by this stage.
const SEGMENT_RECORD: u8 = b's';
const END_RECORD: u8 = b'e';

/// Word separators. NUL is included so the NUL-terminated profile
/// encoding can never be confused by input bytes.
fn is_separator(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0)
}

/// Scan the next word into `word` (cleared first) and return its absolute
/// offset, or `None` at end of input. Works directly on the reader's
/// prefetch buffer; the word only gets copied once, into `word`.
fn next_word(
    input: &mut SequentialReader,
    word: &mut Vec<u8>,
) -> Result<Option<u64>, SolowordError> {
    word.clear();

    loop {
        let chunk = input.peek_buffer()?;
        if chunk.is_empty() {
            return Ok(None);
        }
        match chunk.iter().position(|&b| !is_separator(b)) {
            Some(i) => {
                input.advance(i);
                break;
            }
            None => {
                let n = chunk.len();
                input.advance(n);
            }
        }
    }

    let offset = input.tell();
    loop {
        let chunk = input.peek_buffer()?;
        if chunk.is_empty() {
            break;
        }
        match chunk.iter().position(|&b| is_separator(b)) {
            Some(i) => {
                word.extend_from_slice(&chunk[..i]);
                input.advance(i + 1);
                break;
            }
            None => {
                word.extend_from_slice(chunk);
                let n = chunk.len();
                input.advance(n);
            }
        }
    }
    Ok(Some(offset))
}

/// Stat gauntlet for the original file: it must exist, be regular, and be
/// long enough for the progress already recorded in the log.
fn check_input(path: &Path, resume_offset: u64) -> Result<(), SolowordError> {
    let md = fs::metadata(path).map_err(|e| SolowordError::MissingInput {
        errno: e.raw_os_error().unwrap_or(libc::EIO),
        path: path.to_path_buf(),
    })?;
    if md.is_dir() {
        return Err(SolowordError::MissingInput {
            errno: libc::EISDIR,
            path: path.to_path_buf(),
        });
    }
    if !md.is_file() {
        return Err(SolowordError::MissingInput {
            errno: libc::EIO,
            path: path.to_path_buf(),
        });
    }
    if md.len() < resume_offset {
        return Err(SolowordError::MissingInput {
            errno: libc::EIO,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// The profile stage: split the input into working-memory-sized segments,
/// emit one sorted deduplicated profile per segment, and log each one as
/// an atomic sync unit.
///
/// A `segment` record is only synced after its profile file is durably
/// closed, so on resume the log never names a missing file. If the log
/// already carries the stage's end record this replays to the recorded
/// segment list without touching the input at all.
pub fn run(cfg: &mut Config, input: &Path) -> Result<Vec<ProfileSegment>, SolowordError> {
    let mut segments: Vec<ProfileSegment> = Vec::new();
    let mut offset: u64 = 0;

    if cfg.recovery_pending() {
        while !cfg.ilog().eof()? {
            match cfg.ilog().read_u8()? {
                END_RECORD => {
                    eprintln!("[wprof] complete in log, {} segments", segments.len());
                    return Ok(segments);
                }
                SEGMENT_RECORD => {
                    let start = cfg.ilog().read_u64()?;
                    let end = cfg.ilog().read_u64()?;
                    if start != offset {
                        return Err(cfg.corrupt_log());
                    }
                    offset = end + 1;
                    segments.push(ProfileSegment {
                        id: segments.len() as u64,
                        start,
                        end,
                        size: end - start + 1,
                    });
                }
                _ => return Err(cfg.corrupt_log()),
            }
        }
        if !segments.is_empty() {
            eprintln!(
                "[wprof] resuming at byte {} after {} logged segments",
                offset,
                segments.len()
            );
        }
    }
    cfg.recovery_done()?;

    check_input(input, offset)?;
    let mut reader = SequentialReader::open(input, "original-file", offset)?;

    let mut word = Vec::new();
    let mut pending = Vec::new();
    let mut pending_off: u64 = 0;
    let mut have_pending = false;
    let mut at_eof = false;

    while !at_eof || have_pending {
        let mut dedup = InCoreDedup::new(
            cfg.settings.dedup,
            cfg.settings.workmem,
            cfg.settings.page_pinned,
        )?;

        // The word that overflowed the previous fill leads this one.
        if have_pending {
            if !dedup.insert(&pending, pending_off) {
                return Err(SolowordError::InsufficientMemory {
                    path: input.to_path_buf(),
                });
            }
            have_pending = false;
        }

        let mut prev_off = reader.tell();
        while !at_eof {
            prev_off = reader.tell();
            match next_word(&mut reader, &mut word)? {
                Some(woff) => {
                    if !dedup.insert(&word, woff) {
                        std::mem::swap(&mut pending, &mut word);
                        pending_off = woff;
                        have_pending = true;
                        break;
                    }
                }
                None => {
                    prev_off = reader.tell();
                    at_eof = true;
                }
            }
        }

        if dedup.is_empty() && prev_off == offset {
            if have_pending {
                // A single word wider than the whole working memory.
                return Err(SolowordError::InsufficientMemory {
                    path: input.to_path_buf(),
                });
            }
            break; // empty input, nothing to profile
        }

        let id = segments.len() as u64;
        dedup.pour(cfg.open_output(id)?)?;

        let end = prev_off - 1;
        let olog = cfg.olog();
        olog.write_u8(SEGMENT_RECORD)?;
        olog.write_u64(offset)?;
        olog.write_u64(end)?;
        olog.sync()?;

        segments.push(ProfileSegment {
            id,
            start: offset,
            end,
            size: end - offset + 1,
        });
        offset = prev_off;
    }

    let olog = cfg.olog();
    olog.write_u8(END_RECORD)?;
    olog.sync()?;
    eprintln!("[wprof] profiled {} segments", segments.len());
    Ok(segments)
}
