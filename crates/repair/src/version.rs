//! Detection and repair of the `pragma solidity` version declaration.

use regex::Regex;
use semver::Version;
use std::{fmt, sync::LazyLock};

/// A well-formed pragma. Range pragmas (`>=0.4.22 <0.6.0`) resolve to their first constraint.
static PRAGMA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"pragma\s+solidity\s+([\^~>=<]*)\s*(\d+)\.(\d+)\.(\d+)[^;\n]*;").unwrap()
});

/// A pragma with stray whitespace around the dots or a missing semicolon.
static MALFORMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(pragma\s+solidity\s+[\^~>=<]*\s*\d+)\s*\.\s*(\d+)\s*\.\s*(\d+)").unwrap()
});

/// Any pragma at all, to tell "malformed" apart from "missing".
static ANY_PRAGMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pragma\s+solidity\b[^;\n]*;?").unwrap());

/// The version declared by a source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionTag {
    /// `pragma solidity <op><major>.<minor>.<patch>;`
    Declared {
        /// The comparison operator, possibly empty.
        op: String,
        /// The declared triple, exactly as written.
        version: Version,
    },
    /// The file has no pragma.
    Missing,
    /// A pragma exists but does not parse, holds the offending text.
    Malformed(String),
}

impl VersionTag {
    /// Detects the pragma of `text`.
    pub fn detect(text: &str) -> Self {
        if let Some(caps) = PRAGMA.captures(text) {
            let part = |i: usize| caps[i].parse::<u64>();
            if let (Ok(major), Ok(minor), Ok(patch)) = (part(2), part(3), part(4)) {
                return Self::Declared {
                    op: caps[1].to_string(),
                    version: Version::new(major, minor, patch),
                };
            }
        }
        match ANY_PRAGMA.find(text) {
            Some(m) => Self::Malformed(m.as_str().to_string()),
            None => Self::Missing,
        }
    }

    /// The declared triple, if any.
    pub fn version(&self) -> Option<&Version> {
        match self {
            Self::Declared { version, .. } => Some(version),
            _ => None,
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared { op, version } => write!(f, "{op}{version}"),
            Self::Missing => f.write_str("<missing>"),
            Self::Malformed(raw) => write!(f, "<malformed: {raw}>"),
        }
    }
}

/// What the resolver had to do to the text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolveAction {
    /// The pragma was well-formed.
    Unchanged,
    /// The punctuation of a malformed pragma was repaired in place.
    RepairedPunctuation,
    /// A default pragma was prepended.
    Synthesized,
}

/// The outcome of [`VersionResolver::resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// The pragma of the original text, before any repair.
    pub original: VersionTag,
    /// The pragma of [`Self::text`], always [`VersionTag::Declared`].
    pub tag: VersionTag,
    /// The compiler version to use.
    pub compiler: Version,
    /// The possibly rewritten text.
    pub text: String,
    /// What was done to the text.
    pub action: ResolveAction,
}

impl Resolution {
    /// Whether [`Self::text`] differs from the input.
    pub fn is_modified(&self) -> bool {
        self.action != ResolveAction::Unchanged
    }
}

/// Version resolution failures.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// A pragma exists but neither parses nor can be repaired.
    #[error("unrecognized version pragma `{0}`")]
    Unrecognized(String),
}

/// Determines the compiler version of a source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionResolver {
    default_pragma: Version,
    legacy_caret: Version,
}

impl Default for VersionResolver {
    fn default() -> Self {
        Self::new(Version::new(0, 4, 25), Version::new(0, 4, 26))
    }
}

impl VersionResolver {
    /// Creates a resolver that prepends `^<default_pragma>` to files without a pragma and
    /// compiles caret or comparison `0.4.x` pragmas with `legacy_caret`.
    pub fn new(default_pragma: Version, legacy_caret: Version) -> Self {
        Self { default_pragma, legacy_caret }
    }

    /// Resolves the compiler version of `text`, repairing or synthesizing the pragma first if
    /// needed.
    pub fn resolve(&self, text: &str) -> Result<Resolution, VersionError> {
        let original = VersionTag::detect(text);
        let (text, action) = match &original {
            VersionTag::Declared { .. } => (text.to_string(), ResolveAction::Unchanged),
            VersionTag::Malformed(raw) => {
                let fixed = repair_punctuation(text);
                if fixed == text {
                    return Err(VersionError::Unrecognized(raw.clone()));
                }
                (fixed, ResolveAction::RepairedPunctuation)
            }
            VersionTag::Missing => (self.synthesize(text), ResolveAction::Synthesized),
        };

        let tag = VersionTag::detect(&text);
        let VersionTag::Declared { op, version } = &tag else {
            return Err(VersionError::Unrecognized(original.to_string()));
        };
        let compiler = self.compiler_version(op, version);
        debug!(target: "solidifi::repair", %original, %compiler, ?action, "resolved pragma");
        Ok(Resolution { original, compiler, text, action, tag })
    }

    /// Returns the compiler version for a declared pragma.
    ///
    /// A caret or comparison pragma of the `0.4` line resolves to the legacy caret version, all
    /// others to the declared triple.
    pub fn compiler_version(&self, op: &str, declared: &Version) -> Version {
        if (op.contains('^') || op.contains('>')) && declared.major == 0 && declared.minor == 4 {
            self.legacy_caret.clone()
        } else {
            declared.clone()
        }
    }

    /// Returns `text` with the default pragma line prepended.
    pub fn synthesize(&self, text: &str) -> String {
        format!("pragma solidity ^{};\n\n{text}", self.default_pragma)
    }
}

/// Rewrites `pragma solidity 0 . 4 . 24` into `pragma solidity 0.4.24;`.
///
/// Only the first pragma is touched. A terminating `;` is added unless the pragma line already
/// has one.
pub fn repair_punctuation(text: &str) -> String {
    let Some(caps) = MALFORMED.captures(text) else { return text.to_string() };
    let Some(whole) = caps.get(0) else { return text.to_string() };
    let rest_of_line = text[whole.end()..].split('\n').next().unwrap_or_default();
    let terminator = if rest_of_line.contains(';') { "" } else { ";" };
    format!(
        "{}{}.{}.{}{terminator}{}",
        &text[..whole.start()],
        &caps[1],
        &caps[2],
        &caps[3],
        &text[whole.end()..]
    )
}
