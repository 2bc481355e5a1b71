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

/// TypeScript/TSX front end using tree-sitter. Two grammars are kept
/// compiled side by side since `.tsx` enables JSX syntax the plain `.ts`
/// grammar rejects.
pub struct TypeScriptParser {
    ts_language: Language,
    tsx_language: Language,
    ts_import_query: Query,
    tsx_import_query: Query,
}

impl TypeScriptParser {
    pub fn new() -> Result<Self> {
        let ts_language: Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
        let tsx_language: Language = tree_sitter_typescript::LANGUAGE_TSX.into();

        let ts_import_query = Query::new(&ts_language, IMPORT_QUERY_SRC)
            .context("failed to compile TypeScript import query")?;
        let tsx_import_query = Query::new(&tsx_language, IMPORT_QUERY_SRC)
            .context("failed to compile TSX import query")?;

        Ok(Self {
            ts_language,
            tsx_language,
            ts_import_query,
            tsx_import_query,
        })
    }

    fn language_for(&self, path: &Path) -> &Language {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tsx") => &self.tsx_language,
            _ => &self.ts_language,
        }
    }

    fn import_query_for(&self, path: &Path) -> &Query {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tsx") => &self.tsx_import_query,
            _ => &self.ts_import_query,
        }
    }
}

impl Default for TypeScriptParser {
    fn default() -> Self {
        Self::new().expect("built-in TypeScript grammars and queries must compile")
    }
}

impl LanguageParser for TypeScriptParser {
    fn language(&self) -> &'static str {
        "typescript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx"]
    }

    fn parse(&self, abs_path: &Path, source: &str) -> Result<ParsedFile, String> {
        let language = self.language_for(abs_path);
        let mut parser = Parser::new();
        parser.set_language(language).map_err(|e| e.to_string())?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| "tree-sitter failed to produce a TypeScript parse tree".to_string())?;

        let mut imports = Vec::new();
        let query = self.import_query_for(abs_path);
        let path_idx = capture_index(query, "path");
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, tree.root_node(), source.as_bytes());
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

    /// Relative specifiers (`./foo`, `../bar`) resolve against the
    /// importing file's directory, trying the bare path and each of the
    /// usual extensions plus an `index` file inside a directory of that
    /// name. Bare package specifiers (`react`, `@scope/pkg`) are treated as
    /// external and left unresolved.
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

        const EXTS: &[&str] = &["ts", "tsx", "js", "jsx"];
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

/// Join a `./`/`../`-relative specifier onto `base_dir`, collapsing `.`/`..`
/// segments without touching the filesystem.
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
        "class_declaration" | "interface_declaration" | "type_alias_declaration"
        | "function_declaration" | "enum_declaration" => {
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
