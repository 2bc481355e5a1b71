use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Opaque handle into the file arena. Stable for the lifetime of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// Opaque handle into the layer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub u32);

/// A single non-excluded filesystem entry, normalized to forward slashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    /// Relative path from the project root, `/`-separated.
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub is_dir: bool,
    /// 1 = direct child of root.
    pub depth: usize,
    /// Relative path of the parent directory; empty string for root children.
    pub parent: String,
    pub directives: Vec<IgnoreDirective>,
}

impl FileRecord {
    pub fn base_name(&self) -> &str {
        self.rel_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.rel_path)
    }

    /// Base name without its final extension.
    pub fn stem(&self) -> &str {
        let base = self.base_name();
        match base.rfind('.') {
            Some(0) | None => base,
            Some(i) => &base[..i],
        }
    }
}

/// An ignore directive parsed from a file's leading comments.
///
/// `@structurelint:ignore <rule> [reason]` or `@structurelint:no-test [reason]`.
/// `rule` is `None` for a catch-all ignore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreDirective {
    pub rule: Option<String>,
    pub reason: Option<String>,
    pub is_no_test: bool,
}

impl IgnoreDirective {
    /// Does this directive silence the named rule?
    pub fn silences(&self, rule_name: &str) -> bool {
        match &self.rule {
            None => !self.is_no_test,
            Some(r) => r == rule_name,
        }
    }
}

/// Aggregate metadata about a directory, keyed by its relative path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirRecord {
    pub rel_path: String,
    pub depth: usize,
    /// Direct file children, excluding test files.
    pub file_count: usize,
    /// Direct file children that are test files.
    pub test_file_count: usize,
    pub subdir_count: usize,
}

/// A directed import edge from one file to an import specifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEdge {
    pub source: FileId,
    pub specifier: String,
    /// `None` when the specifier could not be resolved to a known file.
    pub resolved: Option<FileId>,
    pub line: usize,
}

/// A symbol exported by a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRecord {
    pub name: String,
    pub is_default: bool,
    pub line: usize,
}

/// A named architectural layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    /// Declaration-order glob patterns; first match wins.
    pub patterns: Vec<String>,
    /// Layer names this layer may depend on. `["*"]` means "any".
    pub allowed_dependencies: Vec<String>,
}

impl Layer {
    pub fn allows_any(&self) -> bool {
        self.allowed_dependencies.iter().any(|d| d == "*")
    }

    pub fn allows(&self, other_name: &str) -> bool {
        self.allows_any() || self.allowed_dependencies.iter().any(|d| d == other_name)
    }
}

/// Severity used to rank and, eventually, filter violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A proposed, not-yet-applied fix for a violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AutoFix {
    /// Replace the full content of `path`.
    WriteFile { path: String, content: String },
    /// Move/rename a file.
    MoveFile { from: String, to: String },
}

/// Extra structured context a rule can attach to a violation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViolationContext {
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

/// An immutable record of a rule violation. Rules only ever produce these;
/// they never mutate the context they were given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub path: String,
    pub message: String,
    #[serde(default)]
    pub details: ViolationContext,
    #[serde(default)]
    pub fix: Option<AutoFix>,
}

impl Violation {
    pub fn new(rule: impl Into<String>, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            path: path.into(),
            message: message.into(),
            details: ViolationContext::default(),
            fix: None,
        }
    }

    pub fn with_details(mut self, details: ViolationContext) -> Self {
        self.details = details;
        self
    }

    pub fn with_fix(mut self, fix: AutoFix) -> Self {
        self.fix = Some(fix);
        self
    }
}

/// Sort key used to give violations a deterministic, reproducible order:
/// by path, then rule name, then message.
pub fn violation_sort_key(v: &Violation) -> (String, String, String) {
    (v.path.clone(), v.rule.clone(), v.message.clone())
}
