use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

use structurelint_core::parser::{LanguageParser, ParsedFile, UnresolvedImport};
use structurelint_core::types::ExportRecord;

const INCLUDE_QUERY_SRC: &str = r#"
[
  (preproc_include path: (string_literal) @quoted)
  (preproc_include path: (system_lib_string) @system)
]
"#;

const EXPORT_QUERY_SRC: &str = r#"
[
  (class_specifier name: (type_identifier) @name)
  (struct_specifier name: (type_identifier) @name)
]
"#;

/// C/C++ front end using tree-sitter. Only the preprocessor and top-level
/// declaration shapes are queried; the language has no module system to
/// resolve imports into, so includes are matched heuristically by path.
pub struct CppParser {
    language: Language,
    include_query: Query,
    export_query: Query,
}

impl CppParser {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_cpp::LANGUAGE.into();
        let include_query = Query::new(&language, INCLUDE_QUERY_SRC)
            .context("failed to compile C++ include query")?;
        let export_query = Query::new(&language, EXPORT_QUERY_SRC)
            .context("failed to compile C++ export query")?;
        Ok(Self {
            language,
            include_query,
            export_query,
        })
    }
}

impl Default for CppParser {
    fn default() -> Self {
        Self::new().expect("built-in C++ grammar and queries must compile")
    }
}

impl LanguageParser for CppParser {
    fn language(&self) -> &'static str {
        "cpp"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cpp", "cc", "cxx", "h", "hpp", "hh"]
    }

    fn parse(&self, _abs_path: &Path, source: &str) -> Result<ParsedFile, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| e.to_string())?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| "tree-sitter failed to produce a C++ parse tree".to_string())?;

        let mut imports = Vec::new();
        let quoted_idx = capture_index(&self.include_query, "quoted");
        let system_idx = capture_index(&self.include_query, "system");
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.include_query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let line = capture.node.start_position().row + 1;
                if capture.index as usize == quoted_idx {
                    let raw = node_text(capture.node, source);
                    imports.push(UnresolvedImport {
                        specifier: raw.trim_matches('"').to_string(),
                        line,
                    });
                } else if capture.index as usize == system_idx {
                    let raw = node_text(capture.node, source);
                    let trimmed = raw.trim_start_matches('<').trim_end_matches('>').to_string();
                    imports.push(UnresolvedImport {
                        specifier: trimmed,
                        line,
                    });
                }
            }
        }

        let mut exports = Vec::new();
        let name_idx = capture_index(&self.export_query, "name");
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.export_query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if capture.index as usize == name_idx {
                    exports.push(ExportRecord {
                        name: node_text(capture.node, source),
                        is_default: false,
                        line: capture.node.start_position().row + 1,
                    });
                }
            }
        }
        exports.extend(collect_free_functions(tree.root_node(), source));

        Ok(ParsedFile { imports, exports })
    }

    /// Quoted includes (`"foo.h"`) resolve relative to the including file's
    /// directory, then against every candidate's base name as a fallback
    /// for flat include-path layouts. Angle-bracket includes are always
    /// external.
    fn resolve(
        &self,
        from_rel_path: &str,
        specifier: &str,
        candidate_rel_paths: &[String],
    ) -> Option<String> {
        let from_dir = from_rel_path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        let joined = if from_dir.is_empty() {
            specifier.to_string()
        } else {
            format!("{from_dir}/{specifier}")
        };
        if let Some(found) = candidate_rel_paths.iter().find(|p| **p == joined) {
            return Some(found.clone());
        }
        candidate_rel_paths
            .iter()
            .find(|p| p.ends_with(&format!("/{specifier}")) || **p == specifier)
            .cloned()
    }
}

/// Top-level (non-member) function definitions are exported symbols unless
/// marked `static`, which gives them internal linkage.
fn collect_free_functions(root: Node, source: &str) -> Vec<ExportRecord> {
    let mut exports = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() != "function_definition" {
            continue;
        }
        let text = node_text(child, source);
        if text.trim_start().starts_with("static") {
            continue;
        }
        let Some(declarator) = child.child_by_field_name("declarator") else {
            continue;
        };
        if let Some(name) = find_function_name(declarator, source) {
            exports.push(ExportRecord {
                name,
                is_default: false,
                line: child.start_position().row + 1,
            });
        }
    }
    exports
}

fn find_function_name(node: Node, source: &str) -> Option<String> {
    if node.kind() == "identifier" || node.kind() == "field_identifier" {
        return Some(node_text(node, source));
    }
    node.child_by_field_name("declarator")
        .and_then(|d| find_function_name(d, source))
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
    fn test_quoted_and_system_includes() {
        let parser = CppParser::new().unwrap();
        let content = "#include \"widget.h\"\n#include <vector>\n";
        let parsed = parser.parse(&PathBuf::from("src/app.cpp"), content).unwrap();
        let specs: Vec<&str> = parsed.imports.iter().map(|i| i.specifier.as_str()).collect();
        assert!(specs.contains(&"widget.h"));
        assert!(specs.contains(&"vector"));
    }

    #[test]
    fn test_class_and_struct_exports() {
        let parser = CppParser::new().unwrap();
        let content = "class Widget {\npublic:\n    void render();\n};\n\nstruct Point { int x; int y; };\n";
        let parsed = parser.parse(&PathBuf::from("src/widget.h"), content).unwrap();
        let names: Vec<&str> = parsed.exports.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"Widget"));
        assert!(names.contains(&"Point"));
    }

    #[test]
    fn test_static_function_not_exported() {
        let parser = CppParser::new().unwrap();
        let content = "static void helper() {}\n\nvoid render() {}\n";
        let parsed = parser.parse(&PathBuf::from("src/app.cpp"), content).unwrap();
        let names: Vec<&str> = parsed.exports.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"render"));
        assert!(!names.contains(&"helper"));
    }

    #[test]
    fn test_resolve_quoted_include_relative() {
        let parser = CppParser::new().unwrap();
        let candidates = vec!["src/widget.h".to_string()];
        let resolved = parser.resolve("src/app.cpp", "widget.h", &candidates);
        assert_eq!(resolved, Some("src/widget.h".to_string()));
    }
}
