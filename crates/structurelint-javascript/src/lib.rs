use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

use structurelint_core::parser::{LanguageParser, ParsedFile, UnresolvedImport};
use structurelint_core::types::ExportRecord;

const IMPORT_QUERY_SRC: &str = r#"
[
  (import_statement source: (string) @path)
  (export_statement source: (string) @path)
]
"#;

/// JavaScript/JSX front end using tree-sitter. Shares its export-walking
/// logic with the TypeScript front end's grammar shape since both grammars
/// derive from the same base.
pub struct JavaScriptParser {
    language: Language,
    import_query: Query,
}

impl JavaScriptParser {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_javascript::LANGUAGE.into();
        let import_query = Query::new(&language, IMPORT_QUERY_SRC)
            .context("failed to compile JavaScript import query")?;
        Ok(Self {
            language,
            import_query,
        })
    }
}

impl Default for JavaScriptParser {
    fn default() -> Self {
        Self::new().expect("built-in JavaScript grammar and queries must compile")
    }
}

impl LanguageParser for JavaScriptParser {
    fn language(&self) -> &'static str {
        "javascript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn parse(&self, _abs_path: &Path, source: &str) -> Result<ParsedFile, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| e.to_string())?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| "tree-sitter failed to produce a JavaScript parse tree".to_string())?;

        let mut imports = Vec::new();
        let path_idx = capture_index(&self.import_query, "path");
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.import_query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if capture.index as usize == path_idx {
                    let raw = node_text(capture.node, source);
                    imports.push(UnresolvedImport {
                        specifier: raw.trim_matches('"').trim_matches('\'').to_string(),
                        line: capture.node.start_position().row + 1,
                    });
                }
            }
        }

        let mut exports = Vec::new();
        collect_exports(tree.root_node(), source, &mut exports);

        Ok(ParsedFile { imports, exports })
    }

    fn resolve(
        &self,
        from_rel_path: &str,
        specifier: &str,
        candidate_rel_paths: &[String],
    ) -> Option<String> {
        if !specifier.starts_with('.') {
            return None;
        }
        let from_dir = from_rel_path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        let joined = normalize_path(from_dir, specifier);

        const EXTS: &[&str] = &["js", "jsx", "mjs", "cjs"];
        let mut tried = vec![joined.clone()];
        for ext in EXTS {
            tried.push(format!("{joined}.{ext}"));
        }
        for ext in EXTS {
            tried.push(format!("{joined}/index.{ext}"));
        }
        tried
            .into_iter()
            .find(|candidate| candidate_rel_paths.iter().any(|p| p == candidate))
    }
}

fn normalize_path(base_dir: &str, specifier: &str) -> String {
    let mut parts: Vec<&str> = if base_dir.is_empty() {
        Vec::new()
    } else {
        base_dir.split('/').collect()
    };
    for seg in specifier.split('/') {
        match seg {
            "." | "" => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn collect_exports(node: Node, source: &str, exports: &mut Vec<ExportRecord>) {
    if node.kind() == "export_statement" {
        let line = node.start_position().row + 1;
        let is_default = {
            let mut cursor = node.walk();
            node.children(&mut cursor).any(|c| c.kind() == "default")
        };

        if let Some(decl) = node.child_by_field_name("declaration") {
            collect_declaration_names(decl, source, is_default, line, exports);
        } else if let Some(clause) = find_child_of_kind(node, "export_clause") {
            let mut cursor = clause.walk();
            for specifier in clause
                .children(&mut cursor)
                .filter(|c| c.kind() == "export_specifier")
            {
                let exported = specifier
                    .child_by_field_name("alias")
                    .or_else(|| specifier.child_by_field_name("name"));
                if let Some(exported) = exported {
                    exports.push(ExportRecord {
                        name: node_text(exported, source),
                        is_default: false,
                        line,
                    });
                }
            }
        } else if is_default {
            exports.push(ExportRecord {
                name: "default".to_string(),
                is_default: true,
                line,
            });
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_exports(child, source, exports);
    }
}

fn find_child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

fn collect_declaration_names(
    decl: Node,
    source: &str,
    is_default: bool,
    line: usize,
    exports: &mut Vec<ExportRecord>,
) {
    match decl.kind() {
        "class_declaration" | "function_declaration" | "generator_function_declaration" => {
            let name = decl
                .child_by_field_name("name")
                .map(|n| node_text(n, source))
                .unwrap_or_else(|| "default".to_string());
            exports.push(ExportRecord {
                name,
                is_default,
                line,
            });
        }
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = decl.walk();
            for declarator in decl
                .children(&mut cursor)
                .filter(|c| c.kind() == "variable_declarator")
            {
                if let Some(name_node) = declarator.child_by_field_name("name") {
                    exports.push(ExportRecord {
                        name: node_text(name_node, source),
                        is_default,
                        line,
                    });
                }
            }
        }
        _ => {
            exports.push(ExportRecord {
                name: "default".to_string(),
                is_default,
                line,
            });
        }
    }
}

fn capture_index(query: &Query, name: &str) -> usize {
    query
        .capture_names()
        .iter()
        .position(|n| *n == name)
        .unwrap_or(0)
}

fn node_text(node: Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}
