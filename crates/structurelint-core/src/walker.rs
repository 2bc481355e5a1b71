use std::collections::HashMap;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::diagnostics::Diagnostic;
use crate::types::{DirRecord, FileId, FileRecord, IgnoreDirective};

const MAX_DIRECTIVE_LINES: usize = 64;

/// Result of a single filesystem walk: the file arena plus directory
/// aggregates. Built once per run and never mutated afterward.
#[derive(Debug, Default)]
pub struct WalkOutput {
    pub files: Vec<FileRecord>,
    pub dirs: HashMap<String, DirRecord>,
}

fn build_exclude_set(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder
        .build()
        .unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
}

fn is_test_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with("_test.go")
        || lower.ends_with("_test.py")
        || lower.ends_with("test_.py")
        || lower.ends_with(".test.ts")
        || lower.ends_with(".test.tsx")
        || lower.ends_with(".test.js")
        || lower.ends_with(".spec.ts")
        || lower.ends_with(".spec.js")
        || lower.contains("test")
            && (lower.ends_with(".java") || lower.ends_with(".cs") || lower.ends_with(".cpp"))
}

fn normalize_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Filesystem walker built on `walkdir`, sorted by file name at every level
/// so traversal order is reproducible across runs and platforms.
pub struct Walker {
    exclude: GlobSet,
}

impl Walker {
    pub fn new(exclude_patterns: &[String]) -> Self {
        Self {
            exclude: build_exclude_set(exclude_patterns),
        }
    }

    fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude.is_match(rel_path)
    }

    /// Walk `root`, returning file/dir metadata. I/O errors on individual
    /// entries are logged as diagnostics and the entry is skipped; excluded
    /// directories are pruned before descent rather than filtered after.
    pub fn walk(&self, root: &Path, diagnostics: &mut Vec<Diagnostic>) -> WalkOutput {
        let mut output = WalkOutput::default();
        output.dirs.insert(
            String::new(),
            DirRecord {
                rel_path: String::new(),
                depth: 0,
                file_count: 0,
                test_file_count: 0,
                subdir_count: 0,
            },
        );

        let mut next_id = 0u32;

        let entries = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(&normalize_relative(root, entry.path())));

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                    diagnostics.push(Diagnostic::WalkError {
                        path,
                        cause: e.to_string(),
                    });
                    continue;
                }
            };

            let abs_path = entry.path().to_path_buf();
            let normalized = normalize_relative(root, &abs_path);
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().is_dir();
            let depth = normalized.matches('/').count() + 1;
            let parent = normalized
                .rsplit_once('/')
                .map(|(p, _)| p.to_string())
                .unwrap_or_default();

            let directives = if is_dir {
                Vec::new()
            } else {
                read_ignore_directives(&abs_path, diagnostics)
            };

            let id = FileId(next_id);
            next_id += 1;
            output.files.push(FileRecord {
                id,
                rel_path: normalized.clone(),
                abs_path: abs_path.clone(),
                is_dir,
                depth,
                parent: parent.clone(),
                directives,
            });

            let parent_entry = output.dirs.entry(parent).or_insert_with(|| DirRecord {
                rel_path: String::new(),
                depth: 0,
                file_count: 0,
                test_file_count: 0,
                subdir_count: 0,
            });
            if is_dir {
                parent_entry.subdir_count += 1;
            } else if is_test_name(&name) {
                parent_entry.test_file_count += 1;
            } else {
                parent_entry.file_count += 1;
            }

            if is_dir {
                output.dirs.entry(normalized.clone()).or_insert(DirRecord {
                    rel_path: normalized.clone(),
                    depth,
                    file_count: 0,
                    test_file_count: 0,
                    subdir_count: 0,
                });
            }
        }

        output
    }
}

/// Read up to the first 64 lines of `path` for
/// `@structurelint:ignore <rule> [reason]` / `@structurelint:no-test [reason]`
/// directives inside comments.
fn read_ignore_directives(path: &Path, diagnostics: &mut Vec<Diagnostic>) -> Vec<IgnoreDirective> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            diagnostics.push(Diagnostic::WalkError {
                path: path.to_path_buf(),
                cause: e.to_string(),
            });
            return Vec::new();
        }
    };

    let mut directives = Vec::new();
    for line in content.lines().take(MAX_DIRECTIVE_LINES) {
        if let Some(idx) = line.find("@structurelint:ignore") {
            let rest = line[idx + "@structurelint:ignore".len()..].trim();
            let mut parts = rest.splitn(2, char::is_whitespace);
            let rule = parts.next().filter(|s| !s.is_empty()).map(String::from);
            let reason = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
            directives.push(IgnoreDirective {
                rule,
                reason,
                is_no_test: false,
            });
        } else if let Some(idx) = line.find("@structurelint:no-test") {
            let reason = line[idx + "@structurelint:no-test".len()..]
                .trim()
                .to_string();
            directives.push(IgnoreDirective {
                rule: None,
                reason: if reason.is_empty() { None } else { Some(reason) },
                is_no_test: true,
            });
        }
    }
    directives
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_walk_produces_nested_files_and_dirs() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/f.ts"), "// hi").unwrap();

        let walker = Walker::new(&[]);
        let mut diags = Vec::new();
        let out = walker.walk(dir.path(), &mut diags);

        assert!(out.files.iter().any(|f| f.rel_path == "a"));
        assert!(out.files.iter().any(|f| f.rel_path == "a/b"));
        assert!(out.files.iter().any(|f| f.rel_path == "a/b/f.ts"));
        let f = out.files.iter().find(|f| f.rel_path == "a/b/f.ts").unwrap();
        assert_eq!(f.depth, 3);
        assert!(out.dirs.contains_key(""));
        assert_eq!(out.dirs[""].subdir_count, 1);
    }

    #[test]
    fn test_exclude_glob_skips_descent() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "").unwrap();
        fs::write(dir.path().join("main.js"), "").unwrap();

        let walker = Walker::new(&["node_modules/**".to_string()]);
        let mut diags = Vec::new();
        let out = walker.walk(dir.path(), &mut diags);

        assert!(out.files.iter().any(|f| f.rel_path == "main.js"));
        assert!(!out.files.iter().any(|f| f.rel_path.starts_with("node_modules")));
    }

    #[test]
    fn test_ignore_directive_parsing() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("legacy.ts"),
            "// @structurelint:ignore max-depth grandfathered in\nexport {}\n",
        )
        .unwrap();

        let walker = Walker::new(&[]);
        let mut diags = Vec::new();
        let out = walker.walk(dir.path(), &mut diags);
        let f = out.files.iter().find(|f| f.rel_path == "legacy.ts").unwrap();
        assert_eq!(f.directives.len(), 1);
        assert_eq!(f.directives[0].rule.as_deref(), Some("max-depth"));
        assert_eq!(
            f.directives[0].reason.as_deref(),
            Some("grandfathered in")
        );
    }

    #[test]
    fn test_catch_all_ignore_directive() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("generated.ts"),
            "// @structurelint:ignore\nexport {}\n",
        )
        .unwrap();
        let walker = Walker::new(&[]);
        let mut diags = Vec::new();
        let out = walker.walk(dir.path(), &mut diags);
        let f = out
            .files
            .iter()
            .find(|f| f.rel_path == "generated.ts")
            .unwrap();
        assert!(f.directives[0].silences("anything"));
    }

    #[test]
    fn test_walk_is_deterministic_across_runs() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/one.ts"), "").unwrap();
        fs::write(dir.path().join("a/two.ts"), "").unwrap();

        let walker = Walker::new(&[]);
        let mut d1 = Vec::new();
        let mut d2 = Vec::new();
        let out1 = walker.walk(dir.path(), &mut d1);
        let out2 = walker.walk(dir.path(), &mut d2);

        let paths1: Vec<_> = out1.files.iter().map(|f| f.rel_path.clone()).collect();
        let paths2: Vec<_> = out2.files.iter().map(|f| f.rel_path.clone()).collect();
        assert_eq!(paths1, paths2);
    }
}
