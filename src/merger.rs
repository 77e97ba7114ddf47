use crate::config::Config;
use crate::error::SolowordError;
use crate::planner::{MergePlanner, MergeSegment};
use std::cmp::Ordering;

/// Log record tags owned by this stage.
const MERGE_RECORD: u8 = b'm';
const END_RECORD: u8 = b'x';

/// The merge stage: execute the planner's pair-merges until a single
/// root profile remains, logging each completed merge as an atomic sync
/// unit and garbage-collecting consumed inputs.
///
/// On replay every logged merge must equal the plan the planner yields
/// for that position; anything else means the log and the planner
/// disagree and the workdir cannot be trusted. The merge collapses equal
/// words from both sides into a single `Repeated` record, which is what
/// makes "unique in the root profile" mean "occurred exactly once in the
/// whole input".
pub fn run(
    cfg: &mut Config,
    planner: &mut MergePlanner,
    disable_gc: bool,
) -> Result<u64, SolowordError> {
    if cfg.recovery_pending() {
        let mut replayed = 0usize;
        while !cfg.ilog().eof()? {
            match cfg.ilog().read_u8()? {
                END_RECORD => {
                    if planner.pop().is_some() {
                        return Err(cfg.corrupt_log());
                    }
                    eprintln!("[wmerge] complete in log, {} merges", replayed);
                    return Ok(planner.root());
                }
                MERGE_RECORD => {
                    let left = cfg.ilog().read_u64()?;
                    let right = cfg.ilog().read_u64()?;
                    let out = cfg.ilog().read_u64()?;
                    let size = cfg.ilog().read_u64()?;

                    let plan = match planner.pop() {
                        Some(plan) => plan,
                        None => return Err(cfg.corrupt_log()),
                    };
                    if plan.left != left || plan.right != right || plan.out != out {
                        return Err(cfg.corrupt_log());
                    }
                    if !disable_gc {
                        cfg.remove(left)?;
                        cfg.remove(right)?;
                    }
                    planner.push(MergeSegment { plan, size });
                    replayed += 1;
                }
                _ => return Err(cfg.corrupt_log()),
            }
        }
        if replayed > 0 {
            eprintln!("[wmerge] resuming after {} logged merges", replayed);
        }
    }
    cfg.recovery_done()?;

    let mut merged = 0usize;
    while let Some(plan) = planner.pop() {
        let mut left = cfg.open_input(plan.left)?;
        let mut right = cfg.open_input(plan.right)?;
        let mut out = cfg.open_output(plan.out)?;

        while !left.empty() && !right.empty() {
            match left.peek().word().cmp(right.peek().word()) {
                Ordering::Less => out.push(&left.pop()?)?,
                Ordering::Greater => out.push(&right.pop()?)?,
                Ordering::Equal => {
                    // Present on both sides means at least two occurrences,
                    // whatever each side thought individually.
                    let item = left.pop()?;
                    right.pop()?;
                    out.push_word(item.word(), None)?;
                }
            }
        }
        while !left.empty() {
            out.push(&left.pop()?)?;
        }
        while !right.empty() {
            out.push(&right.pop()?)?;
        }

        // The output must be durable before the log says it exists.
        let size = out.close()?;
        let olog = cfg.olog();
        olog.write_u8(MERGE_RECORD)?;
        olog.write_u64(plan.left)?;
        olog.write_u64(plan.right)?;
        olog.write_u64(plan.out)?;
        olog.write_u64(size)?;
        olog.sync()?;

        if !disable_gc {
            cfg.remove(plan.left)?;
            cfg.remove(plan.right)?;
        }
        planner.push(MergeSegment { plan, size });
        merged += 1;
    }

    let olog = cfg.olog();
    olog.write_u8(END_RECORD)?;
    olog.sync()?;
    eprintln!("[wmerge] {} merges, root profile {}", merged, planner.root());
    Ok(planner.root())
}
