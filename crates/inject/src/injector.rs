use crate::{
    ast,
    error::InjectError,
    report::BugLog,
    scanner::InjectionPointScanner,
    snippets::{SnippetForm, SnippetLibrary},
    tracker::OffsetTracker,
    transform,
};
use solidifi_common::{Compiler, DiagnosticExt, SolcInput, errors::SolcError, fs};
use solidifi_config::{BugType, SnippetForms, TransformRule, WeakenRule};
use solidifi_repair::{AutoRepairEngine, Converged, SourceFile};
use std::{
    cmp::Reverse,
    path::{Path, PathBuf},
};

/// What [`BugInjector::inject`] did to one file.
#[derive(Clone, Debug)]
pub struct InjectionReport {
    /// The input file.
    pub source: PathBuf,
    /// The written buggy file.
    pub buggy: PathBuf,
    /// The written CSV bug log.
    pub bug_log: PathBuf,
    pub bug_type: String,
    /// The repair run that preceded injection.
    pub repair: Converged,
    /// All injected bugs, lines refer to [`Self::buggy`].
    pub log: BugLog,
    /// Number of candidate sites over both forms.
    pub candidates: usize,
    /// Whether a form ran out of snippets before all its candidates were tried.
    pub exhausted: bool,
}

impl InjectionReport {
    pub fn injected(&self) -> usize {
        self.log.len()
    }
}

/// Injects the snippets of one bug type into source files.
///
/// A file is copied to `<out>/buggy/<bug type>/buggy_<file>`, repaired until it compiles,
/// compiled once more for its AST and then injected at the scanned sites, in descending
/// source order.
#[derive(Clone, Debug)]
pub struct BugInjector<C> {
    engine: AutoRepairEngine<C>,
    bugs_dir: PathBuf,
    forms: SnippetForms,
    transforms: Vec<TransformRule>,
    weakenings: Vec<WeakenRule>,
}

impl<C: Compiler> BugInjector<C> {
    pub fn new(engine: AutoRepairEngine<C>, bugs_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            bugs_dir: bugs_dir.into(),
            forms: SnippetForms::default(),
            transforms: Vec::new(),
            weakenings: Vec::new(),
        }
    }

    /// Sets the snippet sub-directory names.
    #[must_use]
    pub fn snippet_forms(mut self, forms: SnippetForms) -> Self {
        self.forms = forms;
        self
    }

    /// Sets the code-transform rules. Rules of other bug types are ignored.
    #[must_use]
    pub fn transforms(mut self, rules: Vec<TransformRule>) -> Self {
        self.transforms = rules;
        self
    }

    /// Sets the weaken-security rules. Rules of other bug types are ignored.
    #[must_use]
    pub fn weakenings(mut self, rules: Vec<WeakenRule>) -> Self {
        self.weakenings = rules;
        self
    }

    pub fn engine(&self) -> &AutoRepairEngine<C> {
        &self.engine
    }

    /// The directory buggy files of `bug` are written to.
    pub fn output_dir(out: &Path, bug: &BugType) -> PathBuf {
        out.join("buggy").join(&bug.name)
    }

    /// Injects bugs of type `bug` into `file`, writing the results below `out`.
    pub fn inject(
        &self,
        file: &Path,
        bug: &BugType,
        out: &Path,
    ) -> Result<InjectionReport, InjectError> {
        let library = SnippetLibrary::load(&self.bugs_dir, bug, &self.forms)?;

        let dir = Self::output_dir(out, bug);
        fs::create_dir_all(&dir)?;
        let file_name =
            file.file_name().map_or_else(|| "source.sol".into(), |n| n.to_string_lossy());
        let buggy = dir.join(format!("buggy_{file_name}"));
        fs::copy(file, &buggy)?;

        let mut source = SourceFile::open(&buggy)?;
        let repair = self.engine.repair_file(&mut source)?;
        let name = source.name();
        let pristine = source.into_text();

        let output = self
            .engine
            .compiler()
            .compile(&repair.version, &SolcInput::ast(name.as_str(), pristine.as_str()))?;
        if let Some(error) = output.errors().next() {
            return Err(InjectError::AstErrors(error.formatted().trim().to_string()));
        }
        let ast = output.ast(&name).ok_or_else(|| SolcError::MissingAst(name.clone()))?;
        let nodes = ast::flatten(ast);
        let scanner = InjectionPointScanner::new(&nodes, &pristine);
        let mut tracker = OffsetTracker::new(pristine);

        let mut candidates = 0;
        let mut exhausted = false;
        for form in SnippetForm::ALL {
            let Some(mut queue) = library.queue(form) else { continue };
            let mut sites = scanner.scan(form);
            candidates += sites.len();
            sites.sort_by_key(|site| Reverse(site.offset_key()));
            for site in &sites {
                let Some(snippet) = queue.peek() else {
                    info!(target: "solidifi::inject", file = %file.display(), bug_type = %bug.name, %form, "Running out of bug snippets");
                    exhausted = true;
                    break;
                };
                if tracker.inject(site, snippet.fragment(), &bug.name).is_injected() {
                    queue.pop();
                }
            }
        }

        let rules = self.transforms.iter().filter(|rule| bug.matches(&rule.bug_type));
        transform::code_transform(&mut tracker, rules, &bug.name)?;
        let rules = self.weakenings.iter().filter(|rule| bug.matches(&rule.bug_type));
        transform::weaken_security(&mut tracker, rules, &bug.name)?;

        let (text, log) = tracker.into_parts();
        fs::write(&buggy, &text)?;
        let stem = file.file_stem().map_or_else(|| "source".into(), |s| s.to_string_lossy());
        let bug_log = dir.join(format!("BugLog_{stem}.csv"));
        log.write_csv(&bug_log)?;

        info!(
            target: "solidifi::inject",
            file = %file.display(),
            bug_type = %bug.name,
            injected = log.len(),
            candidates,
            rounds = repair.rounds,
            "injected bugs"
        );
        Ok(InjectionReport {
            source: file.to_path_buf(),
            buggy,
            bug_log,
            bug_type: bug.name.clone(),
            repair,
            log,
            candidates,
            exhausted,
        })
    }
}
