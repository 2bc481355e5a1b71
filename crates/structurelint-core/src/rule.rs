use std::collections::{HashMap, HashSet};

use crate::config::Config;
use crate::diagnostics::Diagnostic;
use crate::graph::ImportGraph;
use crate::types::{DirRecord, FileRecord, Violation};

/// Read-only view handed to every rule. Rules never mutate this; they only
/// read from it and produce [`Violation`]s.
pub struct AnalysisContext<'a> {
    pub config: &'a Config,
    pub files: &'a [FileRecord],
    pub dirs: &'a HashMap<String, DirRecord>,
    pub graph: &'a ImportGraph,
}

impl<'a> AnalysisContext<'a> {
    pub fn file_by_path(&self, rel_path: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.rel_path == rel_path)
    }

    pub fn file_by_id(&self, id: crate::types::FileId) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn dir(&self, rel_path: &str) -> Option<&DirRecord> {
        self.dirs.get(rel_path)
    }

    /// Is `rule_name` silenced for `file` by an in-file ignore directive?
    pub fn is_silenced(&self, file: &FileRecord, rule_name: &str) -> bool {
        file.directives.iter().any(|d| d.silences(rule_name))
    }
}

/// A single check. Implementations must be side-effect-free and
/// idempotent: running `check` twice on the same context yields the same
/// violations.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation>;
}

/// A rule config value didn't have the shape a rule's factory expected.
/// Carries enough to build a [`Diagnostic::ConfigTypeError`] without the
/// factory needing to know about diagnostics itself.
#[derive(Debug, Clone)]
pub struct ConfigFieldError {
    pub field: String,
    pub expected: String,
    pub got: String,
}

/// Builds a rule instance from its raw config value, rejecting a
/// wrong-shaped value instead of constructing a rule that would silently
/// no-op on every file. Stateless rules ignore `cfg` beyond validating it;
/// nothing here currently needs per-instance fields, since each rule reads
/// its config fresh per file via `AnalysisContext::config`.
pub type RuleFactory = fn(&serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError>;

/// Registry of all known rules, keyed by name, to a factory rather than a
/// pre-built instance: config-shape validation runs once per rule at the
/// start of a pass instead of being silently skipped file-by-file.
#[derive(Default)]
pub struct RuleRegistry {
    factories: Vec<(&'static str, RuleFactory)>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, factory: RuleFactory) -> &mut Self {
        self.factories.push((name, factory));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|(name, _)| *name).collect()
    }

    /// Run every registered rule that is neither disabled in config nor
    /// silenced file-by-file. A rule whose base config fails its factory's
    /// validation is skipped entirely for this pass, recorded as a
    /// `ConfigTypeError` plus a `RuleSkipped` diagnostic rather than being
    /// constructed and left to no-op on every file. A rule name present in
    /// config but not in this registry is reported as `UnknownRule`.
    pub fn run_all(&self, ctx: &AnalysisContext<'_>, diagnostics: &mut Vec<Diagnostic>) -> Vec<Violation> {
        let known: HashSet<&str> = self.factories.iter().map(|(name, _)| *name).collect();
        for configured in ctx.config.rules.keys() {
            if !known.contains(configured.as_str()) {
                diagnostics.push(Diagnostic::UnknownRule(configured.clone()));
            }
        }

        let mut violations = Vec::new();
        for (name, factory) in &self.factories {
            if ctx.config.rule_disabled(name) {
                continue;
            }
            let base_cfg = ctx.config.rules.get(*name);
            let shape = base_cfg.cloned().unwrap_or(serde_yaml::Value::Null);
            let rule = match factory(&shape) {
                Ok(rule) => rule,
                Err(err) => {
                    diagnostics.push(Diagnostic::ConfigTypeError {
                        rule: (*name).to_string(),
                        field: err.field,
                        expected: err.expected,
                        got: err.got,
                    });
                    diagnostics.push(Diagnostic::RuleSkipped {
                        rule: (*name).to_string(),
                        reason: "invalid rule config".to_string(),
                    });
                    continue;
                }
            };

            for v in rule.check(ctx) {
                let silenced = ctx
                    .file_by_path(&v.path)
                    .map(|f| ctx.is_silenced(f, rule.name()))
                    .unwrap_or(false);
                if !silenced {
                    violations.push(v);
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;
    use crate::graph::LayerTable;
    use crate::types::{FileId, IgnoreDirective};

    struct AlwaysFlags;

    impl Rule for AlwaysFlags {
        fn name(&self) -> &'static str {
            "always-flags"
        }

        fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
            ctx.files
                .iter()
                .filter(|f| !f.is_dir)
                .map(|f| Violation::new("always-flags", &f.rel_path, "flagged"))
                .collect()
        }
    }

    fn build_always_flags(_cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
        Ok(Box::new(AlwaysFlags))
    }

    fn build_with_required_max(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
        match cfg.get("max") {
            None => Ok(Box::new(AlwaysFlags)),
            Some(v) if v.as_u64().is_some() => Ok(Box::new(AlwaysFlags)),
            Some(v) => Err(ConfigFieldError {
                field: "max".to_string(),
                expected: "integer".to_string(),
                got: format!("{v:?}"),
            }),
        }
    }

    fn base_ctx_parts() -> (Config, Vec<FileRecord>, HashMap<String, DirRecord>, ImportGraph) {
        let config = Config::default();
        let files = vec![
            FileRecord {
                id: FileId(0),
                rel_path: "a.ts".into(),
                abs_path: "a.ts".into(),
                is_dir: false,
                depth: 1,
                parent: String::new(),
                directives: vec![],
            },
            FileRecord {
                id: FileId(1),
                rel_path: "b.ts".into(),
                abs_path: "b.ts".into(),
                is_dir: false,
                depth: 1,
                parent: String::new(),
                directives: vec![IgnoreDirective {
                    rule: Some("always-flags".into()),
                    reason: None,
                    is_no_test: false,
                }],
            },
        ];
        let dirs = HashMap::new();
        let table = LayerTable::new(&Vec::<LayerConfig>::new());
        let graph = ImportGraph::build(&files, &table, &HashMap::new(), &HashMap::new());
        (config, files, dirs, graph)
    }

    #[test]
    fn test_run_all_filters_silenced_violations() {
        let (config, files, dirs, graph) = base_ctx_parts();
        let ctx = AnalysisContext {
            config: &config,
            files: &files,
            dirs: &dirs,
            graph: &graph,
        };
        let mut registry = RuleRegistry::new();
        registry.register("always-flags", build_always_flags);
        let mut diagnostics = Vec::new();
        let violations = registry.run_all(&ctx, &mut diagnostics);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "a.ts");
    }

    #[test]
    fn test_run_all_skips_disabled_rule() {
        let (mut config, files, dirs, graph) = base_ctx_parts();
        config
            .rules
            .insert("always-flags".into(), serde_yaml::Value::Bool(false));
        let ctx = AnalysisContext {
            config: &config,
            files: &files,
            dirs: &dirs,
            graph: &graph,
        };
        let mut registry = RuleRegistry::new();
        registry.register("always-flags", build_always_flags);
        let mut diagnostics = Vec::new();
        assert!(registry.run_all(&ctx, &mut diagnostics).is_empty());
    }

    #[test]
    fn test_run_all_reports_unknown_rule_name() {
        let (mut config, files, dirs, graph) = base_ctx_parts();
        config
            .rules
            .insert("not-a-real-rule".into(), serde_yaml::Value::Bool(true));
        let ctx = AnalysisContext {
            config: &config,
            files: &files,
            dirs: &dirs,
            graph: &graph,
        };
        let mut registry = RuleRegistry::new();
        registry.register("always-flags", build_always_flags);
        let mut diagnostics = Vec::new();
        registry.run_all(&ctx, &mut diagnostics);
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::UnknownRule(name) if name == "not-a-real-rule")));
    }

    #[test]
    fn test_run_all_disables_rule_on_config_type_error() {
        let (mut config, files, dirs, graph) = base_ctx_parts();
        config.rules.insert(
            "always-flags".into(),
            serde_yaml::from_str("max: ten").unwrap(),
        );
        let ctx = AnalysisContext {
            config: &config,
            files: &files,
            dirs: &dirs,
            graph: &graph,
        };
        let mut registry = RuleRegistry::new();
        registry.register("always-flags", build_with_required_max);
        let mut diagnostics = Vec::new();
        let violations = registry.run_all(&ctx, &mut diagnostics);
        assert!(violations.is_empty());
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::ConfigTypeError { rule, field, .. } if rule == "always-flags" && field == "max")));
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::RuleSkipped { rule, .. } if rule == "always-flags")));
    }
}
