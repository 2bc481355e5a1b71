use std::path::PathBuf;

use regex::Regex;
use serde_yaml::Value;

use structurelint_core::rule::{AnalysisContext, Rule};
use structurelint_core::types::{FileRecord, Violation};

use crate::config_util::{as_sequence_of_strings, as_str, as_u64};
use crate::glob_capture;
use crate::metrics;

fn ext_of(rel_path: &str) -> &str {
    rel_path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

fn looks_like_test(base_name: &str) -> bool {
    let lower = base_name.to_lowercase();
    lower.ends_with("_test.go")
        || lower.starts_with("test_")
        || lower.ends_with("_test.py")
        || lower.contains(".test.")
        || lower.contains(".spec.")
        || lower.ends_with("test.java")
        || lower.ends_with("tests.cs")
        || lower.ends_with("test.cs")
        || lower.ends_with("_test.cpp")
        || lower.ends_with("_test.cc")
}

fn expected_test_names(stem: &str, ext: &str) -> Vec<String> {
    match ext {
        "go" => vec![format!("{stem}_test.go")],
        "py" => vec![format!("test_{stem}.py"), format!("{stem}_test.py")],
        "js" | "jsx" | "mjs" | "cjs" => vec![format!("{stem}.test.{ext}"), format!("{stem}.spec.{ext}")],
        "ts" | "tsx" => vec![format!("{stem}.test.{ext}"), format!("{stem}.spec.{ext}")],
        "java" => vec![format!("{stem}Test.java")],
        "cs" => vec![format!("{stem}Tests.cs"), format!("{stem}Test.cs")],
        "cpp" | "cc" | "h" | "hpp" => vec![format!("{stem}_test.{ext}"), format!("{stem}Test.{ext}")],
        _ => Vec::new(),
    }
}

/// Every non-test source file must have a matching test file, either in the
/// same directory (`mode: adjacent`, the default) or mirrored under
/// `test-dir` (`mode: separate`).
pub struct TestAdjacencyRule;

impl Rule for TestAdjacencyRule {
    fn name(&self) -> &'static str {
        "test-adjacency"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for file in ctx.files.iter().filter(|f| !f.is_dir) {
            if looks_like_test(file.base_name()) {
                continue;
            }
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &file.rel_path) else {
                continue;
            };
            let ext = ext_of(&file.rel_path);
            let candidates = expected_test_names(file.stem(), ext);
            if candidates.is_empty() {
                continue;
            }
            let mode = as_str(&cfg, "mode").unwrap_or("adjacent");
            let found = if mode == "separate" {
                let test_dir = as_str(&cfg, "test-dir").unwrap_or("test");
                candidates.iter().any(|name| {
                    let mirrored = if file.parent.is_empty() {
                        format!("{test_dir}/{name}")
                    } else {
                        format!("{test_dir}/{}/{name}", file.parent)
                    };
                    ctx.file_by_path(&mirrored).is_some()
                })
            } else {
                candidates.iter().any(|name| {
                    let adjacent = if file.parent.is_empty() {
                        name.clone()
                    } else {
                        format!("{}/{name}", file.parent)
                    };
                    ctx.file_by_path(&adjacent).is_some()
                })
            };
            if !found {
                violations.push(Violation::new(
                    self.name(),
                    &file.rel_path,
                    format!("no test file found (expected one of: {})", candidates.join(", ")),
                ));
            }
        }
        violations
    }
}

struct ContentRuleSpec {
    files: String,
    template: String,
}

fn parse_content_rules(cfg: &Value) -> Vec<ContentRuleSpec> {
    cfg.get("rules")
        .and_then(Value::as_sequence)
        .map(|seq| {
            seq.iter()
                .filter_map(|v| {
                    let files = v.get("files")?.as_str()?.to_string();
                    let template = v.get("template")?.as_str()?.to_string();
                    Some(ContentRuleSpec { files, template })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Project root of `file`, derived from its relative path's depth rather
/// than from any ambient config (the rule context doesn't carry the root).
fn project_root(file: &FileRecord) -> PathBuf {
    let components = file.rel_path.split('/').count();
    let mut root = file.abs_path.clone();
    for _ in 0..components {
        root.pop();
    }
    root
}

/// Checks a file's content against a line-directive template: each template
/// line beginning with one of a handful of `# directive:` prefixes asserts
/// something about the target file's content. Not a general template
/// engine, just enough structure to express "must contain X", "must not
/// contain Y", and "must start/end with Z".
fn check_template(template_src: &str, file_src: &str) -> Vec<String> {
    let mut violations = Vec::new();
    for line in template_src.lines() {
        let line = line.trim();
        if let Some(name) = line.strip_prefix("# requires-section:").map(str::trim) {
            let marker = format!(r"(?m)^\s*(//|#|/\*)\s*{}", regex::escape(name));
            let present = Regex::new(&marker).map(|re| re.is_match(file_src)).unwrap_or(false);
            if !present {
                violations.push(format!("missing required section '{name}'"));
            }
        } else if let Some(pat) = line.strip_prefix("# requires-pattern:").map(str::trim) {
            if let Ok(re) = Regex::new(pat) {
                if !re.is_match(file_src) {
                    violations.push(format!("missing required pattern '{pat}'"));
                }
            }
        } else if let Some(pat) = line.strip_prefix("# forbids-pattern:").map(str::trim) {
            if let Ok(re) = Regex::new(pat) {
                if re.is_match(file_src) {
                    violations.push(format!("contains forbidden pattern '{pat}'"));
                }
            }
        } else if let Some(text) = line.strip_prefix("# must-start-with:").map(str::trim) {
            if !file_src.trim_start().starts_with(text) {
                violations.push(format!("must start with '{text}'"));
            }
        } else if let Some(text) = line.strip_prefix("# must-end-with:").map(str::trim) {
            if !file_src.trim_end().ends_with(text) {
                violations.push(format!("must end with '{text}'"));
            }
        }
    }
    violations
}

/// Validates file bodies against a template keyed by glob, read from disk
/// at check time (`template-dir`, default `templates`, relative to the
/// project root).
pub struct FileContentRule;

impl Rule for FileContentRule {
    fn name(&self) -> &'static str {
        "file-content"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for file in ctx.files.iter().filter(|f| !f.is_dir) {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &file.rel_path) else {
                continue;
            };
            let template_dir = as_str(&cfg, "template-dir").unwrap_or("templates");
            for spec in parse_content_rules(&cfg) {
                if !glob_capture::matches(&spec.files, &file.rel_path) {
                    continue;
                }
                let template_path = project_root(file).join(template_dir).join(&spec.template);
                let template_src = match std::fs::read_to_string(&template_path) {
                    Ok(src) => src,
                    Err(_) => {
                        violations.push(Violation::new(
                            self.name(),
                            &file.rel_path,
                            format!("template '{}' could not be read", template_path.display()),
                        ));
                        continue;
                    }
                };
                let Ok(file_src) = std::fs::read_to_string(&file.abs_path) else {
                    continue;
                };
                for message in check_template(&template_src, &file_src) {
                    violations.push(Violation::new(self.name(), &file.rel_path, message));
                }
            }
        }
        violations
    }
}

fn matches_file_patterns(cfg: &Value, file: &FileRecord) -> bool {
    let patterns = as_sequence_of_strings(&cfg.get("file-patterns").cloned().unwrap_or(Value::Null));
    patterns.is_empty() || patterns.iter().any(|p| glob_capture::matches(p, &file.rel_path))
}

/// Flags functions whose estimated cognitive complexity exceeds `max` (or
/// `test-max` for test files). Complexity is a generic, language-agnostic
/// heuristic over raw source text, not a precise per-language CST metric.
pub struct MaxCognitiveComplexityRule;

impl Rule for MaxCognitiveComplexityRule {
    fn name(&self) -> &'static str {
        "max-cognitive-complexity"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for file in ctx.files.iter().filter(|f| !f.is_dir) {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &file.rel_path) else {
                continue;
            };
            if !matches_file_patterns(&cfg, file) {
                continue;
            }
            let is_test = looks_like_test(file.base_name());
            let test_max = as_u64(&cfg, "test-max");
            if is_test && test_max.is_none() {
                continue;
            }
            let Some(max) = as_u64(&cfg, "max") else {
                continue;
            };
            let limit = if is_test { test_max.unwrap_or(max) } else { max };
            let Ok(source) = std::fs::read_to_string(&file.abs_path) else {
                continue;
            };
            let ext = ext_of(&file.rel_path);
            for func in metrics::extract_functions(&source, ext) {
                let score = metrics::cognitive_complexity(&func.body, ext == "py") as u64;
                if score > limit {
                    violations.push(Violation::new(
                        self.name(),
                        &file.rel_path,
                        format!("function '{}' has cognitive complexity {score} (max {limit})", func.name),
                    ));
                }
            }
        }
        violations
    }
}

/// Flags functions whose estimated Halstead effort exceeds `max`.
pub struct MaxHalsteadEffortRule;

impl Rule for MaxHalsteadEffortRule {
    fn name(&self) -> &'static str {
        "max-halstead-effort"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for file in ctx.files.iter().filter(|f| !f.is_dir) {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &file.rel_path) else {
                continue;
            };
            if !matches_file_patterns(&cfg, file) {
                continue;
            }
            let Some(max) = cfg.get("max").and_then(Value::as_f64) else {
                continue;
            };
            let Ok(source) = std::fs::read_to_string(&file.abs_path) else {
                continue;
            };
            let ext = ext_of(&file.rel_path);
            for func in metrics::extract_functions(&source, ext) {
                let effort = metrics::halstead(&func.body).effort();
                if effort > max {
                    violations.push(Violation::new(
                        self.name(),
                        &file.rel_path,
                        format!("function '{}' has Halstead effort {effort:.0} (max {max:.0})", func.name),
                    ));
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use structurelint_core::config::{Config, LayerConfig};
    use structurelint_core::graph::{ImportGraph, LayerTable};
    use structurelint_core::types::FileId;
    use tempfile::tempdir;

    fn file(id: u32, path: &str, abs: PathBuf, parent: &str) -> FileRecord {
        FileRecord {
            id: FileId(id),
            rel_path: path.to_string(),
            abs_path: abs,
            is_dir: false,
            depth: path.matches('/').count() + 1,
            parent: parent.to_string(),
            directives: vec![],
        }
    }

    #[test]
    fn test_adjacency_flags_missing_test_file() {
        let mut config = Config::default();
        config
            .rules
            .insert("test-adjacency".into(), serde_yaml::Value::Bool(true));
        let files = vec![file(0, "src/helper.go", PathBuf::from("src/helper.go"), "src")];
        let table = LayerTable::new(&Vec::<LayerConfig>::new());
        let graph = ImportGraph::build(&files, &table, &HashMap::new(), &HashMap::new());
        let dirs = HashMap::new();
        let ctx = AnalysisContext {
            config: &config,
            files: &files,
            dirs: &dirs,
            graph: &graph,
        };
        let violations = TestAdjacencyRule.check(&ctx);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_adjacency_passes_when_test_file_present() {
        let mut config = Config::default();
        config
            .rules
            .insert("test-adjacency".into(), serde_yaml::Value::Bool(true));
        let files = vec![
            file(0, "src/helper.go", PathBuf::from("src/helper.go"), "src"),
            file(1, "src/helper_test.go", PathBuf::from("src/helper_test.go"), "src"),
        ];
        let table = LayerTable::new(&Vec::<LayerConfig>::new());
        let graph = ImportGraph::build(&files, &table, &HashMap::new(), &HashMap::new());
        let dirs = HashMap::new();
        let ctx = AnalysisContext {
            config: &config,
            files: &files,
            dirs: &dirs,
            graph: &graph,
        };
        let violations = TestAdjacencyRule.check(&ctx);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_max_cognitive_complexity_flags_nested_function() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.js");
        fs::write(
            &path,
            "function risky(x) {\n  if (x) {\n    if (x > 1) {\n      doThing();\n    }\n  }\n}\n",
        )
        .unwrap();

        let mut config = Config::default();
        config
            .rules
            .insert("max-cognitive-complexity".into(), serde_yaml::from_str("max: 2").unwrap());
        let files = vec![file(0, "a.js", path, "")];
        let table = LayerTable::new(&Vec::<LayerConfig>::new());
        let graph = ImportGraph::build(&files, &table, &HashMap::new(), &HashMap::new());
        let dirs = HashMap::new();
        let ctx = AnalysisContext {
            config: &config,
            files: &files,
            dirs: &dirs,
            graph: &graph,
        };
        let violations = MaxCognitiveComplexityRule.check(&ctx);
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_file_content_requires_section() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("templates")).unwrap();
        fs::write(
            dir.path().join("templates").join("controller.tpl"),
            "# requires-section: License\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let target = dir.path().join("src").join("thing.controller.ts");
        fs::write(&target, "export class ThingController {}\n").unwrap();

        let mut config = Config::default();
        config.rules.insert(
            "file-content".into(),
            serde_yaml::from_str("rules:\n  - files: \"src/*.controller.ts\"\n    template: controller.tpl\n").unwrap(),
        );
        let files = vec![file(0, "src/thing.controller.ts", target, "src")];
        let table = LayerTable::new(&Vec::<LayerConfig>::new());
        let graph = ImportGraph::build(&files, &table, &HashMap::new(), &HashMap::new());
        let dirs = HashMap::new();
        let ctx = AnalysisContext {
            config: &config,
            files: &files,
            dirs: &dirs,
            graph: &graph,
        };
        let violations = FileContentRule.check(&ctx);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("License"));
    }

    #[test]
    fn test_file_content_flags_missing_template() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let target = dir.path().join("src").join("thing.controller.ts");
        fs::write(&target, "export class ThingController {}\n").unwrap();

        let mut config = Config::default();
        config.rules.insert(
            "file-content".into(),
            serde_yaml::from_str("rules:\n  - files: \"src/*.controller.ts\"\n    template: missing.tpl\n").unwrap(),
        );
        let files = vec![file(0, "src/thing.controller.ts", target, "src")];
        let table = LayerTable::new(&Vec::<LayerConfig>::new());
        let graph = ImportGraph::build(&files, &table, &HashMap::new(), &HashMap::new());
        let dirs = HashMap::new();
        let ctx = AnalysisContext {
            config: &config,
            files: &files,
            dirs: &dirs,
            graph: &graph,
        };
        let violations = FileContentRule.check(&ctx);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("could not be read"));
    }
}
