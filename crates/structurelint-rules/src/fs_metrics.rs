use structurelint_core::rule::{AnalysisContext, Rule};
use structurelint_core::types::Violation;

use crate::config_util::as_u64;

/// Flags every file or directory deeper than `max` path separators from the
/// project root.
pub struct MaxDepthRule;

impl Rule for MaxDepthRule {
    fn name(&self) -> &'static str {
        "max-depth"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for file in ctx.files {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &file.rel_path) else {
                continue;
            };
            let Some(max) = as_u64(&cfg, "max") else {
                continue;
            };
            if file.depth as u64 > max {
                violations.push(Violation::new(
                    self.name(),
                    &file.rel_path,
                    format!("exceeds max depth ({} > {max})", file.depth),
                ));
            }
        }
        violations
    }
}

/// Flags directories with more non-test files than `max` (and, if
/// `test-max` is set, more test files than that separate limit).
pub struct MaxFilesInDirRule;

impl Rule for MaxFilesInDirRule {
    fn name(&self) -> &'static str {
        "max-files-in-dir"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for dir in ctx.dirs.values() {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &dir.rel_path) else {
                continue;
            };
            if let Some(max) = as_u64(&cfg, "max") {
                if dir.file_count as u64 > max {
                    violations.push(Violation::new(
                        self.name(),
                        &dir.rel_path,
                        format!("directory has {} files, exceeds max of {max}", dir.file_count),
                    ));
                }
            }
            if let Some(test_max) = as_u64(&cfg, "test-max") {
                if dir.test_file_count as u64 > test_max {
                    violations.push(Violation::new(
                        self.name(),
                        &dir.rel_path,
                        format!(
                            "directory has {} test files, exceeds test-max of {test_max}",
                            dir.test_file_count
                        ),
                    ));
                }
            }
        }
        violations
    }
}

/// Flags directories with more direct subdirectories than `max`.
pub struct MaxSubdirsRule;

impl Rule for MaxSubdirsRule {
    fn name(&self) -> &'static str {
        "max-subdirs"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for dir in ctx.dirs.values() {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &dir.rel_path) else {
                continue;
            };
            let Some(max) = as_u64(&cfg, "max") else {
                continue;
            };
            if dir.subdir_count as u64 > max {
                violations.push(Violation::new(
                    self.name(),
                    &dir.rel_path,
                    format!(
                        "directory has {} subdirectories, exceeds max of {max}",
                        dir.subdir_count
                    ),
                ));
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use structurelint_core::config::{Config, LayerConfig};
    use structurelint_core::graph::{ImportGraph, LayerTable};
    use structurelint_core::types::{DirRecord, FileId, FileRecord};

    fn file(id: u32, path: &str, depth: usize) -> FileRecord {
        FileRecord {
            id: FileId(id),
            rel_path: path.to_string(),
            abs_path: path.into(),
            is_dir: false,
            depth,
            parent: path.rsplit_once('/').map(|(p, _)| p.to_string()).unwrap_or_default(),
            directives: vec![],
        }
    }

    #[test]
    fn test_max_depth_flags_only_files_past_limit() {
        let mut config = Config::default();
        config
            .rules
            .insert("max-depth".into(), serde_yaml::from_str("max: 3").unwrap());
        let files = vec![
            file(0, "a/b/c.ts", 3),
            file(1, "a/b/c/d.ts", 4),
        ];
        let dirs = HashMap::new();
        let table = LayerTable::new(&Vec::<LayerConfig>::new());
        let graph = ImportGraph::build(&files, &table, &HashMap::new(), &HashMap::new());
        let ctx = AnalysisContext {
            config: &config,
            files: &files,
            dirs: &dirs,
            graph: &graph,
        };
        let violations = MaxDepthRule.check(&ctx);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "a/b/c/d.ts");
    }

    #[test]
    fn test_max_subdirs_flags_directory() {
        let mut config = Config::default();
        config
            .rules
            .insert("max-subdirs".into(), serde_yaml::from_str("max: 1").unwrap());
        let files = Vec::new();
        let mut dirs = HashMap::new();
        dirs.insert(
            "src".to_string(),
            DirRecord {
                rel_path: "src".into(),
                depth: 1,
                file_count: 0,
                test_file_count: 0,
                subdir_count: 2,
            },
        );
        let table = LayerTable::new(&Vec::<LayerConfig>::new());
        let graph = ImportGraph::build(&files, &table, &HashMap::new(), &HashMap::new());
        let ctx = AnalysisContext {
            config: &config,
            files: &files,
            dirs: &dirs,
            graph: &graph,
        };
        let violations = MaxSubdirsRule.check(&ctx);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "src");
    }
}
