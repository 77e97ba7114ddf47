//! Find the first word that appears exactly once in a (possibly huge)
//! text file, using bounded working memory and a crash-recoverable
//! three-stage pipeline: profile → merge → find-first.

pub mod append_writer;
pub mod arena;
pub mod config;
pub mod dedup;
pub mod error;
pub mod find_first;
pub mod merger;
pub mod planner;
pub mod prefix_key;
pub mod profile;
pub mod profiler;
pub mod seq_reader;
pub mod sort_dedup;
pub mod tree_dedup;

pub use config::{Config, Settings};
pub use dedup::DedupKind;
pub use error::SolowordError;
pub use planner::MergePlanner;
