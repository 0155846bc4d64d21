//! Errors shared by the SolidiFI crates, and helpers to print their chains.

use std::error::Error;

mod fs;
pub use fs::FsPathError;

mod solc;
pub use solc::SolcError;

/// The messages of `error` and its sources, outermost first.
///
/// A source whose message the previous one already contains is dropped, since the error
/// enums of the repair and injection crates embed their source in their own message.
pub fn causes(error: &(dyn Error + 'static)) -> Vec<String> {
    let mut causes: Vec<_> =
        eyre::Chain::new(error).map(|cause| cause.to_string().trim().to_string()).collect();
    causes.dedup_by(|inner, outer| outer.contains(inner.as_str()));
    causes
}

/// Displays [`causes`] on a single line.
///
/// Used at the file boundary of batch runs, where a failure is logged and the next file is
/// processed.
pub fn display_chain(error: &(dyn Error + 'static)) -> String {
    causes(error).join("; ")
}
