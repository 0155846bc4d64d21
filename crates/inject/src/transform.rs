//! The injection approaches that rewrite existing code instead of inserting snippets.

use crate::{error::InjectError, report::Approach, tracker::OffsetTracker};
use regex::Regex;
use solidifi_config::{TransformRule, WeakenRule};

const GUARD: &str = "revert();";
const DISABLED_GUARD: &str = "//revert();";

fn compile(pattern: &str) -> Result<Regex, InjectError> {
    Regex::new(pattern)
        .map_err(|source| InjectError::Pattern { pattern: pattern.to_string(), source })
}

/// Replaces every match of each rule's secure pattern by its vulnerable replacement.
///
/// Logs one single-line entry per match, at the first line of the replacement. Matches are
/// rewritten last first, so a multi-line replacement moves the entries below it. Returns the
/// number of rewritten matches.
pub fn code_transform<'a>(
    tracker: &mut OffsetTracker,
    rules: impl IntoIterator<Item = &'a TransformRule>,
    bug_type: &str,
) -> Result<usize, InjectError> {
    let mut count = 0;
    for rule in rules {
        let re = compile(&rule.secure)?;
        let edits: Vec<_> = re
            .captures_iter(tracker.text())
            .filter_map(|caps| {
                let m = caps.get(0)?;
                let mut replacement = String::new();
                caps.expand(&rule.vulnerable, &mut replacement);
                Some((m.range(), replacement))
            })
            .collect();
        for (range, replacement) in edits.into_iter().rev() {
            tracker.rewrite(range, &replacement, bug_type, Approach::CodeTransform);
            count += 1;
        }
    }
    Ok(count)
}

/// Comments out the `revert();` guards of every line matching a rule's pattern.
///
/// Lines whose guard is already disabled are skipped. Returns the number of weakened lines.
pub fn weaken_security<'a>(
    tracker: &mut OffsetTracker,
    rules: impl IntoIterator<Item = &'a WeakenRule>,
    bug_type: &str,
) -> Result<usize, InjectError> {
    let mut count = 0;
    for rule in rules {
        let re = compile(&rule.pattern)?;
        let mut lines = Vec::new();
        let mut start = 0;
        for line in tracker.text().split_inclusive('\n') {
            if re.is_match(line) && line.contains(GUARD) && !line.contains(DISABLED_GUARD) {
                let guards: Vec<_> = line.match_indices(GUARD).map(|(i, _)| start + i).collect();
                lines.push(guards);
            }
            start += line.len();
        }
        for guards in lines.into_iter().rev() {
            let Some((&first, rest)) = guards.split_first() else { continue };
            for &at in rest.iter().rev() {
                tracker.splice(at..at + GUARD.len(), DISABLED_GUARD);
            }
            let range = first..first + GUARD.len();
            tracker.rewrite(range, DISABLED_GUARD, bug_type, Approach::WeakeningSecurity);
            count += 1;
        }
    }
    Ok(count)
}
