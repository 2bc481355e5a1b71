use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Parser, Query, QueryCursor, StreamingIterator};

use structurelint_core::parser::{LanguageParser, ParsedFile, UnresolvedImport};
use structurelint_core::types::ExportRecord;

const USING_QUERY_SRC: &str = r#"
(using_directive (qualified_name) @name)
(using_directive (identifier) @name)
"#;

const EXPORT_QUERY_SRC: &str = r#"
[
  (class_declaration name: (identifier) @name)
  (interface_declaration name: (identifier) @name)
  (struct_declaration name: (identifier) @name)
  (record_declaration name: (identifier) @name)
  (enum_declaration name: (identifier) @name)
]
"#;

/// C# front end using tree-sitter.
pub struct CSharpParser {
    language: Language,
    using_query: Query,
    export_query: Query,
}

impl CSharpParser {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_c_sharp::LANGUAGE.into();
        let using_query = Query::new(&language, USING_QUERY_SRC)
            .context("failed to compile C# using query")?;
        let export_query = Query::new(&language, EXPORT_QUERY_SRC)
            .context("failed to compile C# export query")?;
        Ok(Self {
            language,
            using_query,
            export_query,
        })
    }
}

impl Default for CSharpParser {
    fn default() -> Self {
        Self::new().expect("built-in C# grammar and queries must compile")
    }
}

impl LanguageParser for CSharpParser {
    fn language(&self) -> &'static str {
        "csharp"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["cs"]
    }

    fn parse(&self, _abs_path: &Path, source: &str) -> Result<ParsedFile, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| e.to_string())?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| "tree-sitter failed to produce a C# parse tree".to_string())?;

        let mut imports = Vec::new();
        let name_idx = capture_index(&self.using_query, "name");
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.using_query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if capture.index as usize == name_idx {
                    imports.push(UnresolvedImport {
                        specifier: node_text(capture.node, source),
                        line: capture.node.start_position().row + 1,
                    });
                }
            }
        }

        let mut exports = Vec::new();
        let export_name_idx = capture_index(&self.export_query, "name");
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.export_query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if capture.index as usize == export_name_idx {
                    exports.push(ExportRecord {
                        name: node_text(capture.node, source),
                        is_default: false,
                        line: capture.node.start_position().row + 1,
                    });
                }
            }
        }

        Ok(ParsedFile { imports, exports })
    }

    /// `using` directives name a namespace, not a file. As with Java, match
    /// against the conventional layout where a file's namespace mirrors its
    /// directory path with dots in place of slashes; any file under a
    /// matching namespace directory is treated as satisfying the using.
    fn resolve(
        &self,
        _from_rel_path: &str,
        specifier: &str,
        candidate_rel_paths: &[String],
    ) -> Option<String> {
        let target_dir = specifier.replace('.', "/");
        candidate_rel_paths
            .iter()
            .find(|p| {
                p.rsplit_once('/')
                    .map(|(dir, _)| dir == target_dir || target_dir.ends_with(&format!("/{dir}")))
                    .unwrap_or(false)
            })
            .cloned()
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_extract_using_directives() {
        let parser = CSharpParser::new().unwrap();
        let content = "using System;\nusing MyApp.Domain.Users;\n\nnamespace MyApp.Application;\n";
        let parsed = parser.parse(&PathBuf::from("Application/UserService.cs"), content).unwrap();
        let specs: Vec<&str> = parsed.imports.iter().map(|i| i.specifier.as_str()).collect();
        assert!(specs.contains(&"System"));
        assert!(specs.contains(&"MyApp.Domain.Users"));
    }

    #[test]
    fn test_extract_class_and_interface_exports() {
        let parser = CSharpParser::new().unwrap();
        let content = "namespace MyApp.Domain.Users;\n\npublic interface IUserRepository {}\n\npublic class User {}\n";
        let parsed = parser.parse(&PathBuf::from("Domain/Users/User.cs"), content).unwrap();
        let names: Vec<&str> = parsed.exports.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"IUserRepository"));
        assert!(names.contains(&"User"));
    }

    #[test]
    fn test_resolve_using_to_namespace_directory() {
        let parser = CSharpParser::new().unwrap();
        let candidates = vec!["Domain/Users/User.cs".to_string()];
        let resolved = parser.resolve(
            "Application/UserService.cs",
            "MyApp.Domain.Users",
            &candidates,
        );
        assert_eq!(resolved, Some("Domain/Users/User.cs".to_string()));
    }
}
