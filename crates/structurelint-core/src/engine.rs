use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info_span;

use crate::config::{discover_configs, merge_configs, Config};
use crate::diagnostics::{Diagnostic, EngineError};
use crate::graph::{ImportGraph, LayerTable};
use crate::parser::ParserRegistry;
use crate::rule::{AnalysisContext, RuleRegistry};
use crate::types::{violation_sort_key, Violation};
use crate::walker::Walker;

/// Everything a single analysis run produced: the sorted violations, any
/// non-fatal diagnostics collected along the way, and the resolved config
/// (handed back so a caller can inspect what was actually applied).
pub struct AnalysisOutcome {
    pub violations: Vec<Violation>,
    pub diagnostics: Vec<Diagnostic>,
    pub config: Config,
}

/// Cooperative cancellation: checked at per-file and per-phase boundaries.
/// Analysis stops as soon as convenient after the flag is set; it never
/// leaves partial, inconsistent state behind because nothing is mutated
/// in place.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ties config discovery, the walker, per-language parsers and the rule
/// registry together into a single analysis pass over a project root.
pub struct Engine {
    parsers: ParserRegistry,
    rules: RuleRegistry,
}

impl Engine {
    pub fn new(parsers: ParserRegistry, rules: RuleRegistry) -> Self {
        Self { parsers, rules }
    }

    pub fn analyze(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<AnalysisOutcome, EngineError> {
        if !root.exists() {
            return Err(EngineError::RootNotFound(root.to_path_buf()));
        }

        let mut diagnostics = Vec::new();

        let config = {
            let _span = info_span!("load_config", root = %root.display()).entered();
            let raw_configs = discover_configs(root)?;
            merge_configs(&raw_configs, &mut diagnostics)?
        };

        if cancel.is_cancelled() {
            return Ok(AnalysisOutcome {
                violations: Vec::new(),
                diagnostics,
                config,
            });
        }

        let walk_output = {
            let _span = info_span!("walk").entered();
            let walker = Walker::new(&config.exclude);
            walker.walk(root, &mut diagnostics)
        };

        if cancel.is_cancelled() {
            return Ok(AnalysisOutcome {
                violations: Vec::new(),
                diagnostics,
                config,
            });
        }

        let (parsed, edges) = {
            let _span = info_span!("parse", files = walk_output.files.len()).entered();
            let parsed = self.parsers.parse_all(&walk_output.files, |_d| {});
            let edges = self.parsers.resolve_all(&parsed, &walk_output.files);
            (parsed, edges)
        };

        if cancel.is_cancelled() {
            return Ok(AnalysisOutcome {
                violations: Vec::new(),
                diagnostics,
                config,
            });
        }

        let exports = parsed
            .iter()
            .map(|(id, p)| (*id, p.exports.clone()))
            .collect();

        let graph = {
            let _span = info_span!("build_graph").entered();
            let layer_table = LayerTable::new(&config.layers);
            ImportGraph::build(&walk_output.files, &layer_table, &edges, &exports)
        };

        if cancel.is_cancelled() {
            return Ok(AnalysisOutcome {
                violations: Vec::new(),
                diagnostics,
                config,
            });
        }

        let mut violations = {
            let _span = info_span!("run_rules", rules = self.rules.names().len()).entered();
            let ctx = AnalysisContext {
                config: &config,
                files: &walk_output.files,
                dirs: &walk_output.dirs,
                graph: &graph,
            };
            self.rules.run_all(&ctx, &mut diagnostics)
        };

        violations.sort_by_key(violation_sort_key);

        Ok(AnalysisOutcome {
            violations,
            diagnostics,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;
    use crate::types::FileRecord;
    use std::fs;

    struct FlagEveryFile;

    impl Rule for FlagEveryFile {
        fn name(&self) -> &'static str {
            "flag-every-file"
        }

        fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
            ctx.files
                .iter()
                .filter(|f: &&FileRecord| !f.is_dir)
                .map(|f| Violation::new("flag-every-file", &f.rel_path, "flagged"))
                .collect()
        }
    }

    fn build_flag_every_file(_cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, crate::rule::ConfigFieldError> {
        Ok(Box::new(FlagEveryFile))
    }

    #[test]
    fn test_analyze_runs_rules_over_walked_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "").unwrap();
        fs::write(dir.path().join("b.ts"), "").unwrap();

        let mut rules = RuleRegistry::new();
        rules.register("flag-every-file", build_flag_every_file);
        let engine = Engine::new(ParserRegistry::new(), rules);

        let outcome = engine.analyze(dir.path(), &CancellationToken::new()).unwrap();
        assert_eq!(outcome.violations.len(), 2);
        assert_eq!(outcome.violations[0].path, "a.ts");
        assert_eq!(outcome.violations[1].path, "b.ts");
    }

    #[test]
    fn test_analyze_reports_unknown_rule_in_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".structurelint.yml"),
            "root: true\nrules:\n  not-a-real-rule: true\n",
        )
        .unwrap();

        let mut rules = RuleRegistry::new();
        rules.register("flag-every-file", build_flag_every_file);
        let engine = Engine::new(ParserRegistry::new(), rules);

        let outcome = engine.analyze(dir.path(), &CancellationToken::new()).unwrap();
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnknownRule(name) if name == "not-a-real-rule")));
    }

    #[test]
    fn test_analyze_rejects_missing_root() {
        let engine = Engine::new(ParserRegistry::new(), RuleRegistry::new());
        let err = engine
            .analyze(Path::new("/definitely/not/a/real/path"), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::RootNotFound(_)));
    }

    #[test]
    fn test_analyze_honors_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "").unwrap();

        let mut rules = RuleRegistry::new();
        rules.register("flag-every-file", build_flag_every_file);
        let engine = Engine::new(ParserRegistry::new(), rules);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = engine.analyze(dir.path(), &cancel).unwrap();
        assert!(outcome.violations.is_empty());
    }
}
