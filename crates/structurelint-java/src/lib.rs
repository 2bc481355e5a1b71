use std::path::Path;

use anyhow::{Context, Result};
use tree_sitter::{Language, Parser, Query, QueryCursor, StreamingIterator};

use structurelint_core::parser::{LanguageParser, ParsedFile, UnresolvedImport};
use structurelint_core::types::ExportRecord;

/// Java front end using tree-sitter.
pub struct JavaParser {
    language: Language,
    import_query: Query,
    export_query: Query,
}

impl JavaParser {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_java::LANGUAGE.into();

        let import_query = Query::new(
            &language,
            r#"
            (import_declaration (scoped_identifier) @path)
            (import_declaration (identifier) @path)
            "#,
        )
        .context("failed to compile Java import query")?;

        let export_query = Query::new(
            &language,
            r#"
            [
              (class_declaration name: (identifier) @name)
              (interface_declaration name: (identifier) @name)
              (enum_declaration name: (identifier) @name)
              (record_declaration name: (identifier) @name)
            ]
            "#,
        )
        .context("failed to compile Java export query")?;

        Ok(Self {
            language,
            import_query,
            export_query,
        })
    }
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new().expect("built-in Java grammar and queries must compile")
    }
}

impl LanguageParser for JavaParser {
    fn language(&self) -> &'static str {
        "java"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn parse(&self, _abs_path: &Path, source: &str) -> Result<ParsedFile, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| e.to_string())?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| "tree-sitter failed to produce a Java parse tree".to_string())?;

        let mut imports = Vec::new();
        let path_idx = capture_index(&self.import_query, "path");
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.import_query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if capture.index as usize == path_idx {
                    let fqn = node_text(capture.node, source);
                    if fqn.starts_with("java.") || fqn.starts_with("javax.") {
                        continue;
                    }
                    imports.push(UnresolvedImport {
                        specifier: fqn,
                        line: capture.node.start_position().row + 1,
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

        Ok(ParsedFile { imports, exports })
    }

    /// Java imports name a fully-qualified class (`pkg.sub.Class`). Split
    /// off the last segment as the class name and the rest as the package,
    /// then match against the conventional Maven/Gradle layout where a
    /// file's package is its directory path under `java/` with slashes
    /// turned into dots and its class is the file stem.
    fn resolve(
        &self,
        _from_rel_path: &str,
        specifier: &str,
        candidate_rel_paths: &[String],
    ) -> Option<String> {
        let (package, class) = specifier.rsplit_once('.')?;
        candidate_rel_paths
            .iter()
            .find(|p| {
                let stem = p.rsplit('/').next().and_then(|n| n.strip_suffix(".java"));
                stem == Some(class) && derive_java_package(p) == package
            })
            .cloned()
    }
}

fn derive_java_package(rel_path: &str) -> String {
    let dir = rel_path.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
    let dir = dir.split("java/").last().unwrap_or(dir);
    dir.replace('/', ".")
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
    fn test_extract_imports_skips_jdk() {
        let parser = JavaParser::new().unwrap();
        let content = r#"
package com.example.application;

import java.util.List;
import com.example.domain.user.User;
import com.example.domain.user.UserRepository;
"#;
        let parsed = parser
            .parse(
                &PathBuf::from("src/main/java/com/example/application/UserService.java"),
                content,
            )
            .unwrap();
        let specs: Vec<&str> = parsed.imports.iter().map(|i| i.specifier.as_str()).collect();
        assert!(!specs.iter().any(|s| s.starts_with("java.")));
        assert!(specs.contains(&"com.example.domain.user.User"));
        assert!(specs.contains(&"com.example.domain.user.UserRepository"));
    }

    #[test]
    fn test_extract_class_and_interface_exports() {
        let parser = JavaParser::new().unwrap();
        let content = r#"
package com.example.domain.user;

public interface UserRepository {
    void save(User user);
}
"#;
        let parsed = parser
            .parse(
                &PathBuf::from("src/main/java/com/example/domain/user/UserRepository.java"),
                content,
            )
            .unwrap();
        assert!(parsed.exports.iter().any(|e| e.name == "UserRepository"));
    }

    #[test]
    fn test_resolve_fully_qualified_import() {
        let parser = JavaParser::new().unwrap();
        let candidates = vec![
            "src/main/java/com/example/domain/user/User.java".to_string(),
            "src/main/java/com/example/domain/user/UserRepository.java".to_string(),
        ];
        let resolved = parser.resolve(
            "src/main/java/com/example/application/UserService.java",
            "com.example.domain.user.User",
            &candidates,
        );
        assert_eq!(
            resolved,
            Some("src/main/java/com/example/domain/user/User.java".to_string())
        );
    }

    #[test]
    fn test_resolve_no_match() {
        let parser = JavaParser::new().unwrap();
        let candidates = vec!["src/main/java/com/example/domain/user/User.java".to_string()];
        let resolved = parser.resolve(
            "src/main/java/com/example/application/UserService.java",
            "com.example.domain.payment.Payment",
            &candidates,
        );
        assert_eq!(resolved, None);
    }
}
