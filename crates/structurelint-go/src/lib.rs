use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Parser, Query, QueryCursor, StreamingIterator};

use structurelint_core::parser::{LanguageParser, ParsedFile, UnresolvedImport};
use structurelint_core::types::ExportRecord;

/// Go language front end using tree-sitter.
pub struct GoParser {
    language: Language,
    import_query: Query,
    export_query: Query,
}

impl GoParser {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_go::LANGUAGE.into();

        let import_query = Query::new(
            &language,
            r#"
            (import_spec
              path: (interpreted_string_literal) @path)
            "#,
        )
        .context("failed to compile Go import query")?;

        let export_query = Query::new(
            &language,
            r#"
            [
              (function_declaration name: (identifier) @name)
              (type_declaration (type_spec name: (type_identifier) @name))
              (var_declaration (var_spec name: (identifier) @name))
              (const_declaration (const_spec name: (identifier) @name))
            ]
            "#,
        )
        .context("failed to compile Go export query")?;

        Ok(Self {
            language,
            import_query,
            export_query,
        })
    }
}

impl Default for GoParser {
    fn default() -> Self {
        Self::new().expect("built-in Go grammar and queries must compile")
    }
}

impl LanguageParser for GoParser {
    fn language(&self) -> &'static str {
        "go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn parse(&self, _abs_path: &Path, source: &str) -> Result<ParsedFile, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| e.to_string())?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| "tree-sitter failed to produce a Go parse tree".to_string())?;

        let mut imports = Vec::new();
        let mut cursor = QueryCursor::new();
        let path_idx = capture_index(&self.import_query, "path");
        let mut matches = cursor.matches(&self.import_query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if capture.index as usize == path_idx {
                    let raw = node_text(capture.node, source);
                    imports.push(UnresolvedImport {
                        specifier: raw.trim_matches('"').to_string(),
                        line: capture.node.start_position().row + 1,
                    });
                }
            }
        }

        let mut exports = Vec::new();
        let mut cursor = QueryCursor::new();
        let name_idx = capture_index(&self.export_query, "name");
        let mut matches = cursor.matches(&self.export_query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if capture.index as usize == name_idx {
                    let name = node_text(capture.node, source);
                    if name.chars().next().is_some_and(|c| c.is_uppercase()) {
                        exports.push(ExportRecord {
                            name: name.clone(),
                            is_default: false,
                            line: capture.node.start_position().row + 1,
                        });
                    }
                }
            }
        }

        Ok(ParsedFile { imports, exports })
    }

    /// Go imports name a package path, not a file. Resolve against the
    /// directories of candidate files: the package directory whose path is
    /// the longest suffix match of the import specifier wins; on a tie
    /// between equally long matches the import is left unresolved.
    fn resolve(
        &self,
        _from_rel_path: &str,
        specifier: &str,
        candidate_rel_paths: &[String],
    ) -> Option<String> {
        let mut best: Option<(usize, &str, &str)> = None;
        let mut tied = false;

        for candidate in candidate_rel_paths {
            let Some(dir) = candidate.rsplit_once('/').map(|(d, _)| d) else {
                continue;
            };
            if dir.is_empty() {
                continue;
            }
            let matches = specifier == dir || specifier.ends_with(&format!("/{dir}"));
            if !matches {
                continue;
            }
            match best {
                None => best = Some((dir.len(), dir, candidate)),
                Some((len, best_dir, _)) if dir.len() > len => {
                    best = Some((dir.len(), dir, candidate));
                    tied = false;
                }
                Some((len, best_dir, _)) if dir.len() == len && dir != best_dir => {
                    tied = true;
                }
                _ => {}
            }
        }

        match best {
            Some(_) if tied => None,
            Some((_, _, path)) => Some(path.to_string()),
            None => None,
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

fn node_text(node: tree_sitter::Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}
