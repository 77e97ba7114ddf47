use clap::{Parser, ValueEnum};
use soloword::config::{self, Config, Settings};
use soloword::dedup::DedupKind;
use soloword::error::SolowordError;
use soloword::planner::MergePlanner;
use soloword::{find_first, merger, profiler};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "soloword",
    version,
    about = "Finds the first word that appears exactly once in a large file.\n\
             Interrupted runs resume from the recovery log in WORKDIR."
)]
struct Cli {
    /// File to scan; only regular files are accepted
    file: PathBuf,

    /// Directory for intermediate profiles and the recovery log; created
    /// if absent
    workdir: PathBuf,

    /// Working memory size, base-2 units k/m/g/t (minimum 4k)
    #[arg(short = 'm', long, default_value = "1g", value_parser = parse_memory_arg)]
    memory_size: usize,

    /// Pin the working memory so it cannot be swapped out
    #[arg(short = 'p', long)]
    page_pinned: bool,

    /// Exit as soon as the profile stage completes
    #[arg(long)]
    wprof_only: bool,

    /// Exit as soon as the merge stage completes
    #[arg(long)]
    wmerge_only: bool,

    /// Keep consumed intermediate profiles for inspection
    #[arg(long)]
    disable_gc: bool,

    /// In-core deduplicator used by the profile stage
    #[arg(long, value_enum, default_value_t = DedupArg::Tree)]
    dedup: DedupArg,

    /// Plan merges with the I/O-optimal planner instead of balanced
    /// pairing
    #[arg(long)]
    dp_planner: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DedupArg {
    /// One tree node per distinct word
    Tree,
    /// One slot per occurrence, sorted at segment end
    Sort,
}

fn parse_memory_arg(text: &str) -> Result<usize, String> {
    match config::parse_memory_size(text) {
        Some(size) if size >= config::MIN_WORKMEM => Ok(size),
        Some(_) => Err(format!(
            "at least {} bytes of working memory are required",
            config::MIN_WORKMEM
        )),
        None => Err(format!("malformed memory size: {:?}", text)),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("Error: {}", err);
        std::process::exit(-err.errno());
    }
}

fn run(cli: &Cli) -> Result<(), SolowordError> {
    let settings = Settings {
        workmem: cli.memory_size,
        page_pinned: cli.page_pinned,
        dedup: match cli.dedup {
            DedupArg::Tree => DedupKind::Tree,
            DedupArg::Sort => DedupKind::Sort,
        },
    };
    let mut cfg = Config::open(&cli.workdir, settings)?;

    let segments = profiler::run(&mut cfg, &cli.file)?;
    if cli.wprof_only {
        return Ok(());
    }
    if segments.is_empty() {
        // Not a single word in the input; nothing to merge or report.
        return Ok(());
    }

    let mut planner = if cli.dp_planner {
        MergePlanner::io_optimal(&segments)
    } else {
        MergePlanner::balanced(&segments)
    }
    .expect("segment list is non-empty");

    let root = merger::run(&mut cfg, &mut planner, cli.disable_gc)?;
    if cli.wmerge_only {
        return Ok(());
    }

    if let Some(word) = find_first::run(&mut cfg, root)? {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        out.write_all(&word)
            .and_then(|_| out.write_all(b"\n"))
            .and_then(|_| out.flush())
            .map_err(|e| SolowordError::io(&e, std::path::Path::new("stdout"), "stdout"))?;
    }
    Ok(())
}
