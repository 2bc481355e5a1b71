use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

use structurelint_core::parser::{LanguageParser, ParsedFile, UnresolvedImport};
use structurelint_core::types::ExportRecord;

const IMPORT_QUERY_SRC: &str = r#"
[
  (import_statement name: (dotted_name) @module)
  (import_statement name: (aliased_import name: (dotted_name) @module))
  (import_from_statement module_name: (dotted_name) @module)
  (import_from_statement module_name: (relative_import) @relative)
]
"#;

/// Python front end using tree-sitter.
pub struct PythonParser {
    language: Language,
    import_query: Query,
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let import_query = Query::new(&language, IMPORT_QUERY_SRC)
            .context("failed to compile Python import query")?;
        Ok(Self {
            language,
            import_query,
        })
    }
}

impl Default for PythonParser {
    fn default() -> Self {
        Self::new().expect("built-in Python grammar and queries must compile")
    }
}

impl LanguageParser for PythonParser {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn parse(&self, _abs_path: &Path, source: &str) -> Result<ParsedFile, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| e.to_string())?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| "tree-sitter failed to produce a Python parse tree".to_string())?;

        let module_idx = capture_index(&self.import_query, "module");
        let relative_idx = capture_index(&self.import_query, "relative");
        let mut imports = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.import_query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let line = capture.node.start_position().row + 1;
                if capture.index as usize == module_idx {
                    imports.push(UnresolvedImport {
                        specifier: node_text(capture.node, source),
                        line,
                    });
                } else if capture.index as usize == relative_idx {
                    imports.push(UnresolvedImport {
                        specifier: node_text(capture.node, source),
                        line,
                    });
                }
            }
        }

        let exports = collect_exports(tree.root_node(), source);

        Ok(ParsedFile { imports, exports })
    }

    /// Relative imports (`.foo`, `..bar.baz`) resolve against the importing
    /// file's package directory, walking up one level per extra leading
    /// dot. Absolute dotted modules are matched against candidates as
    /// `pkg/mod.py` or `pkg/mod/__init__.py`; a bare prefix is treated as an
    /// external package and left unresolved when no file matches.
    fn resolve(
        &self,
        from_rel_path: &str,
        specifier: &str,
        candidate_rel_paths: &[String],
    ) -> Option<String> {
        let from_dir = from_rel_path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");

        let module_path = if let Some(rest) = specifier.strip_prefix('.') {
            let dots = 1 + rest.chars().take_while(|c| *c == '.').count();
            let tail = rest.trim_start_matches('.');
            let mut dir_parts: Vec<&str> = if from_dir.is_empty() {
                Vec::new()
            } else {
                from_dir.split('/').collect()
            };
            for _ in 1..dots {
                dir_parts.pop();
            }
            if tail.is_empty() {
                dir_parts.join("/")
            } else {
                let joined = dir_parts.join("/");
                let tail_path = tail.replace('.', "/");
                if joined.is_empty() {
                    tail_path
                } else {
                    format!("{joined}/{tail_path}")
                }
            }
        } else {
            specifier.replace('.', "/")
        };

        let file_candidate = format!("{module_path}.py");
        let pkg_candidate = format!("{module_path}/__init__.py");

        candidate_rel_paths
            .iter()
            .find(|p| **p == file_candidate || **p == pkg_candidate)
            .cloned()
    }
}

fn collect_exports(root: Node, source: &str) -> Vec<ExportRecord> {
    if let Some(all) = find_dunder_all(root, source) {
        return all;
    }

    let mut exports = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "function_definition" | "class_definition" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let name = node_text(name_node, source);
                    if !name.starts_with('_') {
                        exports.push(ExportRecord {
                            name,
                            is_default: false,
                            line: child.start_position().row + 1,
                        });
                    }
                }
            }
            "expression_statement" => {
                collect_top_level_assignment_names(child, source, &mut exports);
            }
            _ => {}
        }
    }
    exports
}

fn collect_top_level_assignment_names(
    stmt: Node,
    source: &str,
    exports: &mut Vec<ExportRecord>,
) {
    let mut cursor = stmt.walk();
    for child in stmt.children(&mut cursor) {
        if child.kind() == "assignment" {
            if let Some(left) = child.child_by_field_name("left") {
                if left.kind() == "identifier" {
                    let name = node_text(left, source);
                    if !name.starts_with('_') {
                        exports.push(ExportRecord {
                            name,
                            is_default: false,
                            line: stmt.start_position().row + 1,
                        });
                    }
                }
            }
        }
    }
}

/// If the module defines `__all__ = [...]`, that list is the authoritative
/// export set and overrides the underscore-prefix convention.
fn find_dunder_all(root: Node, source: &str) -> Option<Vec<ExportRecord>> {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() != "expression_statement" {
            continue;
        }
        let mut inner = child.walk();
        for assignment in child.children(&mut inner) {
            if assignment.kind() != "assignment" {
                continue;
            }
            let Some(left) = assignment.child_by_field_name("left") else {
                continue;
            };
            if node_text(left, source) != "__all__" {
                continue;
            }
            let Some(right) = assignment.child_by_field_name("right") else {
                continue;
            };
            let mut names = Vec::new();
            let mut list_cursor = right.walk();
            for item in right.children(&mut list_cursor) {
                if item.kind() == "string" {
                    let raw = node_text(item, source);
                    let name = raw.trim_matches(|c| c == '\'' || c == '"').to_string();
                    names.push(ExportRecord {
                        name,
                        is_default: false,
                        line: assignment.start_position().row + 1,
                    });
                }
            }
            return Some(names);
        }
    }
    None
}

fn capture_index(query: &Query, name: &str) -> usize {
    query
        .capture_names()
        .iter()
        .position(|n| *n == name)
        .unwrap_or(usize::MAX)
}

fn node_text(node: Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_absolute_and_from_imports() {
        let parser = PythonParser::new().unwrap();
        let content = "import os\nfrom pkg.util import helper\n";
        let parsed = parser.parse(&PathBuf::from("app/main.py"), content).unwrap();
        let specs: Vec<&str> = parsed.imports.iter().map(|i| i.specifier.as_str()).collect();
        assert!(specs.contains(&"os"));
        assert!(specs.contains(&"pkg.util"));
    }

    #[test]
    fn test_relative_import_capture() {
        let parser = PythonParser::new().unwrap();
        let content = "from . import sibling\nfrom ..pkg import other\n";
        let parsed = parser.parse(&PathBuf::from("app/sub/main.py"), content).unwrap();
        assert_eq!(parsed.imports.len(), 2);
    }

    #[test]
    fn test_export_defaults_to_non_underscore_top_level() {
        let parser = PythonParser::new().unwrap();
        let content = "def helper():\n    pass\n\ndef _private():\n    pass\n\nclass Widget:\n    pass\n";
        let parsed = parser.parse(&PathBuf::from("app/widgets.py"), content).unwrap();
        let names: Vec<&str> = parsed.exports.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"helper"));
        assert!(names.contains(&"Widget"));
        assert!(!names.contains(&"_private"));
    }

    #[test]
    fn test_dunder_all_overrides_convention() {
        let parser = PythonParser::new().unwrap();
        let content = "__all__ = [\"helper\"]\n\ndef helper():\n    pass\n\ndef other():\n    pass\n";
        let parsed = parser.parse(&PathBuf::from("app/widgets.py"), content).unwrap();
        let names: Vec<&str> = parsed.exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["helper"]);
    }

    #[test]
    fn test_resolve_absolute_module_to_package_init() {
        let parser = PythonParser::new().unwrap();
        let candidates = vec!["pkg/util/__init__.py".to_string()];
        let resolved = parser.resolve("app/main.py", "pkg.util", &candidates);
        assert_eq!(resolved, Some("pkg/util/__init__.py".to_string()));
    }

    #[test]
    fn test_resolve_relative_import_walks_up() {
        let parser = PythonParser::new().unwrap();
        let candidates = vec!["app/other.py".to_string()];
        let resolved = parser.resolve("app/sub/main.py", "..other", &candidates);
        assert_eq!(resolved, Some("app/other.py".to_string()));
    }
}
