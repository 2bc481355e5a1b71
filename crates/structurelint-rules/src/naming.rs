use structurelint_core::rule::{AnalysisContext, Rule};
use structurelint_core::types::Violation;

use crate::config_util::{as_mapping, as_sequence_of_strings};
use crate::glob_capture;

fn default_style_for_ext(rel_path: &str) -> &'static str {
    match rel_path.rsplit('.').next().unwrap_or("") {
        "go" | "py" | "cpp" | "cc" | "cxx" | "h" | "hpp" => "snake_case",
        "java" | "cs" => "PascalCase",
        _ => "camelCase",
    }
}

fn is_camel_case(name: &str) -> bool {
    !name.is_empty()
        && name.chars().next().map(|c| c.is_lowercase()).unwrap_or(false)
        && name.chars().all(|c| c.is_alphanumeric())
}

fn is_pascal_case(name: &str) -> bool {
    !name.is_empty()
        && name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
        && name.chars().all(|c| c.is_alphanumeric())
}

fn is_kebab_case(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn is_snake_case(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('_')
        && !name.ends_with('_')
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn matches_style(name: &str, style: &str) -> bool {
    match style {
        "camelCase" => is_camel_case(name),
        "PascalCase" => is_pascal_case(name),
        "kebab-case" => is_kebab_case(name),
        "snake_case" => is_snake_case(name),
        "lowercase" => !name.is_empty() && name.chars().all(|c| !c.is_alphabetic() || c.is_lowercase()),
        "UPPERCASE" => !name.is_empty() && name.chars().all(|c| !c.is_alphabetic() || c.is_uppercase()),
        _ => true,
    }
}

/// `{ "<glob>": "<style>" }` — validates each matched file's stem against a
/// naming style. An empty/`"auto"` style falls back to a per-language
/// default when `autoLanguageNaming` is on.
pub struct NamingConventionRule;

impl Rule for NamingConventionRule {
    fn name(&self) -> &'static str {
        "naming-convention"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for file in ctx.files.iter().filter(|f| !f.is_dir) {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &file.rel_path) else {
                continue;
            };
            for (glob, style_value) in as_mapping(&cfg) {
                if !glob_capture::matches(&glob, &file.rel_path) {
                    continue;
                }
                let mut style = style_value.as_str().unwrap_or("auto").to_string();
                if style.is_empty() || style == "auto" {
                    if !ctx.config.auto_language_naming {
                        continue;
                    }
                    style = default_style_for_ext(&file.rel_path).to_string();
                }
                let stem = file.stem();
                if !matches_style(stem, &style) {
                    violations.push(Violation::new(
                        self.name(),
                        &file.rel_path,
                        format!("name '{stem}' does not follow {style}"),
                    ));
                }
            }
        }
        violations
    }
}

/// `{ "<glob>": "regex:[!]<pattern>" }` — `${N}` substitutes the Nth
/// wildcard segment captured from the glob.
pub struct RegexMatchRule;

impl Rule for RegexMatchRule {
    fn name(&self) -> &'static str {
        "regex-match"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for file in ctx.files.iter().filter(|f| !f.is_dir) {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &file.rel_path) else {
                continue;
            };
            for (glob, value) in as_mapping(&cfg) {
                let Some(caps) = glob_capture::captures(&glob, &file.rel_path) else {
                    continue;
                };
                let Some(spec) = value.as_str() else { continue };
                let Some(rest) = spec.strip_prefix("regex:") else {
                    continue;
                };
                let (negate, pattern) = match rest.strip_prefix('!') {
                    Some(p) => (true, p),
                    None => (false, rest),
                };
                let mut substituted = pattern.to_string();
                for (i, cap) in caps.iter().enumerate() {
                    substituted = substituted.replace(&format!("${{{i}}}"), cap);
                }
                let Ok(re) = regex::Regex::new(&substituted) else {
                    continue;
                };
                let is_match = re.is_match(file.stem());
                let satisfied = if negate { !is_match } else { is_match };
                if !satisfied {
                    violations.push(Violation::new(
                        self.name(),
                        &file.rel_path,
                        format!("name '{}' does not satisfy pattern '{pattern}'", file.stem()),
                    ));
                }
            }
        }
        violations
    }
}

/// `{ "<pattern>[|<pattern>][.dir]": "exists:N[-M]" }` — per directory,
/// asserts the count of matching children (files, or subdirectories when the
/// key ends in `.dir`) falls within `[N, M]`.
pub struct FileExistenceRule;

fn parse_exists_spec(spec: &str) -> Option<(u64, u64)> {
    let rest = spec.strip_prefix("exists:")?;
    if let Some((a, b)) = rest.split_once('-') {
        Some((a.parse().ok()?, b.parse().ok()?))
    } else {
        let n: u64 = rest.parse().ok()?;
        Some((n, n))
    }
}

impl Rule for FileExistenceRule {
    fn name(&self) -> &'static str {
        "file-existence"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for dir in ctx.dirs.values() {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &dir.rel_path) else {
                continue;
            };
            for (key, value) in as_mapping(&cfg) {
                let Some(spec) = value.as_str() else { continue };
                let Some((min, max)) = parse_exists_spec(spec) else {
                    continue;
                };
                let wants_dirs = key.ends_with(".dir");
                let key_trimmed = key.strip_suffix(".dir").unwrap_or(&key);
                let alts: Vec<&str> = key_trimmed.split('|').collect();
                let count = ctx
                    .files
                    .iter()
                    .filter(|f| {
                        f.is_dir == wants_dirs
                            && f.parent == dir.rel_path
                            && alts.iter().any(|p| glob_capture::matches(p, f.base_name()))
                    })
                    .count() as u64;
                if count < min || count > max {
                    violations.push(Violation::new(
                        self.name(),
                        &dir.rel_path,
                        format!("expected {min}-{max} of '{key}', found {count}"),
                    ));
                }
            }
        }
        violations
    }
}

/// `[<glob>, "!<glob>", ...]` — any file matching a glob is disallowed
/// unless a later negated glob excludes it again.
pub struct DisallowedPatternsRule;

impl Rule for DisallowedPatternsRule {
    fn name(&self) -> &'static str {
        "disallowed-patterns"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for file in ctx.files.iter().filter(|f| !f.is_dir) {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &file.rel_path) else {
                continue;
            };
            let mut disallowed = false;
            for pat in as_sequence_of_strings(&cfg) {
                if let Some(negated) = pat.strip_prefix('!') {
                    if glob_capture::matches(negated, &file.rel_path) {
                        disallowed = false;
                    }
                } else if glob_capture::matches(&pat, &file.rel_path) {
                    disallowed = true;
                }
            }
            if disallowed {
                violations.push(Violation::new(
                    self.name(),
                    &file.rel_path,
                    "path matches a disallowed pattern",
                ));
            }
        }
        violations
    }
}

/// `{ "<pattern>": "singleton" }` — in any directory with more than one
/// match, every file past the first (by path) is a violation.
pub struct UniquenessConstraintsRule;

impl Rule for UniquenessConstraintsRule {
    fn name(&self) -> &'static str {
        "uniqueness-constraints"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for dir in ctx.dirs.values() {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &dir.rel_path) else {
                continue;
            };
            for (pattern, singleton) in as_mapping(&cfg) {
                if singleton.as_str() != Some("singleton") {
                    continue;
                }
                let mut matching: Vec<_> = ctx
                    .files
                    .iter()
                    .filter(|f| {
                        !f.is_dir && f.parent == dir.rel_path && glob_capture::matches(&pattern, f.base_name())
                    })
                    .collect();
                matching.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
                for extra in matching.iter().skip(1) {
                    violations.push(Violation::new(
                        self.name(),
                        &extra.rel_path,
                        format!("duplicate match for singleton pattern '{pattern}'"),
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
    use structurelint_core::config::{Config, LayerConfig};
    use structurelint_core::graph::{ImportGraph, LayerTable};
    use structurelint_core::types::{DirRecord, FileId, FileRecord};

    fn file(id: u32, path: &str) -> FileRecord {
        FileRecord {
            id: FileId(id),
            rel_path: path.to_string(),
            abs_path: path.into(),
            is_dir: false,
            depth: 1,
            parent: String::new(),
            directives: vec![],
        }
    }

    fn ctx_with<'a>(
        config: &'a Config,
        files: &'a [FileRecord],
        dirs: &'a HashMap<String, DirRecord>,
        graph: &'a ImportGraph,
    ) -> AnalysisContext<'a> {
        AnalysisContext {
            config,
            files,
            dirs,
            graph,
        }
    }

    #[test]
    fn test_naming_convention_flags_wrong_case() {
        let mut config = Config::default();
        config.rules.insert(
            "naming-convention".into(),
            serde_yaml::from_str("\"*.ts\": camelCase").unwrap(),
        );
        let files = vec![
            file(0, "validName.ts"),
            file(1, "InvalidName.ts"),
            file(2, "another-invalid.ts"),
        ];
        let dirs = HashMap::new();
        let table = LayerTable::new(&Vec::<LayerConfig>::new());
        let graph = ImportGraph::build(&files, &table, &HashMap::new(), &HashMap::new());
        let ctx = ctx_with(&config, &files, &dirs, &graph);
        let violations = NamingConventionRule.check(&ctx);
        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&"InvalidName.ts"));
        assert!(paths.contains(&"another-invalid.ts"));
    }

    #[test]
    fn test_disallowed_patterns_honors_negation() {
        let mut config = Config::default();
        config.rules.insert(
            "disallowed-patterns".into(),
            serde_yaml::from_str("[\"internal/**/*.md\", \"!**/README.md\"]").unwrap(),
        );
        let files = vec![
            FileRecord {
                parent: "internal/x".into(),
                ..file(0, "internal/x/README.md")
            },
            FileRecord {
                parent: "internal/x".into(),
                ..file(1, "internal/x/DESIGN.md")
            },
            file(2, "README.md"),
        ];
        let dirs = HashMap::new();
        let table = LayerTable::new(&Vec::<LayerConfig>::new());
        let graph = ImportGraph::build(&files, &table, &HashMap::new(), &HashMap::new());
        let ctx = ctx_with(&config, &files, &dirs, &graph);
        let violations = DisallowedPatternsRule.check(&ctx);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "internal/x/DESIGN.md");
    }

    #[test]
    fn test_uniqueness_constraints_flags_all_but_first() {
        let mut config = Config::default();
        config.rules.insert(
            "uniqueness-constraints".into(),
            serde_yaml::from_str("\"*_service*.py\": singleton").unwrap(),
        );
        let files = vec![
            FileRecord {
                parent: "src/auth".into(),
                ..file(0, "src/auth/auth_service.py")
            },
            FileRecord {
                parent: "src/auth".into(),
                ..file(1, "src/auth/auth_service_v2.py")
            },
        ];
        let mut dirs = HashMap::new();
        dirs.insert(
            "src/auth".to_string(),
            DirRecord {
                rel_path: "src/auth".into(),
                depth: 2,
                file_count: 2,
                test_file_count: 0,
                subdir_count: 0,
            },
        );
        let table = LayerTable::new(&Vec::<LayerConfig>::new());
        let graph = ImportGraph::build(&files, &table, &HashMap::new(), &HashMap::new());
        let ctx = ctx_with(&config, &files, &dirs, &graph);
        let violations = UniquenessConstraintsRule.check(&ctx);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "src/auth/auth_service_v2.py");
    }
}
