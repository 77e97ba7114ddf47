use soloword::config::{Config, Settings, MIN_WORKMEM};
use soloword::dedup::DedupKind;
use soloword::planner::MergePlanner;
use soloword::{find_first, merger, profiler};
use std::fs;
use std::path::Path;

/// Drive the three stages the way the binary does and return what would
/// be printed (without the newline).
fn run_pipeline(
    input: &Path,
    workdir: &Path,
    settings: Settings,
    dp_planner: bool,
) -> Option<Vec<u8>> {
    let mut cfg = Config::open(workdir, settings).unwrap();
    let segments = profiler::run(&mut cfg, input).unwrap();
    if segments.is_empty() {
        return None;
    }
    let mut planner = if dp_planner {
        MergePlanner::io_optimal(&segments)
    } else {
        MergePlanner::balanced(&segments)
    }
    .unwrap();
    let root = merger::run(&mut cfg, &mut planner, false).unwrap();
    find_first::run(&mut cfg, root).unwrap()
}

fn answer_for(content: &[u8], settings: Settings, dp_planner: bool) -> Option<Vec<u8>> {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.txt");
    fs::write(&input, content).unwrap();
    run_pipeline(&input, &dir.path().join("work"), settings, dp_planner)
}

#[test]
fn test_earliest_unique_wins() {
    // a and b repeat; c (offset 4) beats d (offset 10).
    assert_eq!(
        answer_for(b"a b c a b d\n", Settings::default(), false),
        Some(b"c".to_vec())
    );
}

#[test]
fn test_single_word_input() {
    assert_eq!(
        answer_for(b"alpha\n", Settings::default(), false),
        Some(b"alpha".to_vec())
    );
}

#[test]
fn test_all_words_repeat() {
    assert_eq!(answer_for(b"x x x\n", Settings::default(), false), None);
}

#[test]
fn test_sole_unique_candidate() {
    assert_eq!(
        answer_for(b"aa bb aa cc bb dd cc\n", Settings::default(), false),
        Some(b"dd".to_vec())
    );
}

#[test]
fn test_empty_input_prints_nothing() {
    assert_eq!(answer_for(b"", Settings::default(), false), None);
}

#[test]
fn test_whitespace_only_input_prints_nothing() {
    assert_eq!(
        answer_for(b"  \t\r\n \n\n", Settings::default(), false),
        None
    );
}

#[test]
fn test_both_dedup_kinds_and_planners_agree() {
    let content = b"orange pear orange plum kiwi pear fig\n";
    for dedup in [DedupKind::Tree, DedupKind::Sort] {
        for dp in [false, true] {
            let settings = Settings {
                dedup,
                ..Settings::default()
            };
            assert_eq!(
                answer_for(content, settings, dp),
                Some(b"plum".to_vec()),
                "dedup {:?}, dp_planner {}",
                dedup,
                dp
            );
        }
    }
}

#[test]
fn test_megabyte_of_repeats_with_two_uniques() {
    // "zebra" at offset 0 and "apple" appended at the end are the only
    // unique words; "word" fills roughly a mebibyte between them. A small
    // working memory forces many segments, so uniqueness is only decided
    // by the merge.
    let mut content = Vec::with_capacity(1 << 20);
    content.extend_from_slice(b"zebra ");
    while content.len() < (1 << 20) {
        content.extend_from_slice(b"word ");
    }
    content.extend_from_slice(b"apple");

    let settings = Settings {
        workmem: 16 << 10,
        dedup: DedupKind::Sort,
        ..Settings::default()
    };
    assert_eq!(answer_for(&content, settings, false), Some(b"zebra".to_vec()));
}

#[test]
fn test_duplicates_split_across_segments() {
    // Every word appears twice, far enough apart that the pair never
    // shares a segment at the minimum working memory; one word in the
    // middle appears once.
    let mut content = String::new();
    for i in 0..400 {
        content.push_str(&format!("pair{:03} ", i));
    }
    content.push_str("lonely ");
    for i in 0..400 {
        content.push_str(&format!("pair{:03} ", i));
    }

    let settings = Settings {
        workmem: MIN_WORKMEM,
        dedup: DedupKind::Tree,
        ..Settings::default()
    };
    assert_eq!(
        answer_for(content.as_bytes(), settings, false),
        Some(b"lonely".to_vec())
    );

    // The DP planner must reach the same answer over the same segments.
    assert_eq!(
        answer_for(content.as_bytes(), settings, true),
        Some(b"lonely".to_vec())
    );
}

#[test]
fn test_long_words_beyond_the_packed_prefix() {
    let content = b"pneumonoultramicroscopic pneumonoultramicroscopix \
                    pneumonoultramicroscopic shorter\n";
    assert_eq!(
        answer_for(content, Settings::default(), false),
        Some(b"pneumonoultramicroscopix".to_vec())
    );
}

#[test]
fn test_word_wider_than_working_memory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.txt");
    let mut content = vec![b'a'; 2 * MIN_WORKMEM];
    content.push(b'\n');
    fs::write(&input, &content).unwrap();

    let settings = Settings {
        workmem: MIN_WORKMEM,
        ..Settings::default()
    };
    let mut cfg = Config::open(&dir.path().join("work"), settings).unwrap();
    let err = profiler::run(&mut cfg, &input).unwrap_err();
    assert_eq!(err.errno(), libc::ENOMEM);
}

#[test]
fn test_gc_leaves_only_root_and_log() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.txt");
    let text: String = (0..600).map(|i| format!("w{:03} ", i % 300)).collect();
    fs::write(&input, &text).unwrap();
    let workdir = dir.path().join("work");

    let settings = Settings {
        workmem: MIN_WORKMEM,
        ..Settings::default()
    };
    let mut cfg = Config::open(&workdir, settings).unwrap();
    let segments = profiler::run(&mut cfg, &input).unwrap();
    assert!(segments.len() > 1);
    let mut planner = MergePlanner::balanced(&segments).unwrap();
    let root = merger::run(&mut cfg, &mut planner, false).unwrap();

    let mut names: Vec<String> = fs::read_dir(&workdir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec![root.to_string(), "log".to_string()]);
}
