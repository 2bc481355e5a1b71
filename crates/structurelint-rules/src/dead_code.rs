use structurelint_core::rule::{AnalysisContext, Rule};
use structurelint_core::types::Violation;

use crate::config_util::as_str_list;
use crate::glob_capture;

const BUILTIN_ENTRY_PATTERNS: &[&str] = &[
    "main.*",
    "index.*",
    "app.*",
    "__init__.py",
    "manage.py",
    "*_test.*",
    "*.test.*",
    "*.spec.*",
];

/// A file with zero incoming resolved imports that isn't itself an entry
/// point (built-in name patterns, rule-config `entry-point-patterns`, or
/// config-level `entrypoints`).
pub struct DisallowOrphanedFilesRule;

impl Rule for DisallowOrphanedFilesRule {
    fn name(&self) -> &'static str {
        "disallow-orphaned-files"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for file in ctx.files.iter().filter(|f| !f.is_dir) {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &file.rel_path) else {
                continue;
            };
            if ctx.graph.incoming_count(file.id) > 0 {
                continue;
            }
            let extra_patterns = as_str_list(&cfg, "entry-point-patterns");
            let is_entry = BUILTIN_ENTRY_PATTERNS
                .iter()
                .any(|p| glob_capture::matches(p, file.base_name()))
                || extra_patterns
                    .iter()
                    .any(|p| glob_capture::matches(p, &file.rel_path) || glob_capture::matches(p, file.base_name()))
                || ctx
                    .config
                    .entrypoints
                    .iter()
                    .any(|p| p == &file.rel_path || glob_capture::matches(p, &file.rel_path));
            if !is_entry {
                violations.push(Violation::new(
                    self.name(),
                    &file.rel_path,
                    "file has no incoming references and is not an entry point",
                ));
            }
        }
        violations
    }
}

/// Files never imported by anything contribute no used exports; every
/// export on such a file is reported. (Import edges don't currently track
/// which names were imported, only the resolved target file, so a file
/// that *is* imported is assumed to use all of its exports.)
pub struct DisallowUnusedExportsRule;

impl Rule for DisallowUnusedExportsRule {
    fn name(&self) -> &'static str {
        "disallow-unused-exports"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for file in ctx.files.iter().filter(|f| !f.is_dir) {
            if ctx.config.effective_rule_value(self.name(), &file.rel_path).is_none() {
                continue;
            }
            if ctx.graph.incoming_count(file.id) > 0 {
                continue;
            }
            for export in ctx.graph.exports_of(file.id) {
                violations.push(Violation::new(
                    self.name(),
                    &file.rel_path,
                    format!("export '{}' is never imported", export.name),
                ));
            }
        }
        violations
    }
}
