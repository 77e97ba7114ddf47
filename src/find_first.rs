use crate::config::Config;
use crate::error::SolowordError;

/// Scan the root profile through the singular view and return the unique
/// word with the smallest occurrence offset, or `None` when every word
/// repeats.
///
/// Writes no log: re-running against a finished workdir just scans again,
/// which also leaves the root profile available for other queries.
pub fn run(cfg: &mut Config, root: u64) -> Result<Option<Vec<u8>>, SolowordError> {
    let mut input = cfg.open_singular(root)?;

    let mut best: Option<(Vec<u8>, u64)> = None;
    while !input.empty() {
        let item = input.pop()?;
        let occur = item.occur().expect("singular view yields unique items only");
        let replace = match &best {
            None => true,
            Some((_, best_occur)) => occur < *best_occur,
        };
        if replace {
            best = Some((item.into_word(), occur));
        }
    }
    Ok(best.map(|(word, _)| word))
}
