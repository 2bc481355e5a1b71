use crate::diagnostics::Diagnostic;
use crate::types::{ExportRecord, FileId, ImportEdge};

/// Raw output of parsing a single file's imports/exports, before import
/// specifiers are resolved against the rest of the project.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub imports: Vec<UnresolvedImport>,
    pub exports: Vec<ExportRecord>,
}

/// An import specifier as it appeared in source, not yet resolved to a
/// [`FileId`].
#[derive(Debug, Clone)]
pub struct UnresolvedImport {
    pub specifier: String,
    pub line: usize,
}

/// A single-language front end: recognizes files by extension and turns
/// their contents into import/export facts via a tree-sitter query. One
/// implementation per supported language, each in its own crate so the
/// relevant grammar is an isolated dependency.
pub trait LanguageParser: Send + Sync {
    /// Short identifier, e.g. `"go"`, `"typescript"`.
    fn language(&self) -> &'static str;

    /// File extensions this parser claims, without the leading dot.
    fn extensions(&self) -> &'static [&'static str];

    fn parse(&self, abs_path: &std::path::Path, source: &str) -> Result<ParsedFile, String>;

    /// Resolve an import specifier relative to `from_rel_path` into one of
    /// `candidate_rel_paths`. Each language has its own module resolution
    /// rules (relative paths, package prefixes, etc).
    fn resolve(
        &self,
        from_rel_path: &str,
        specifier: &str,
        candidate_rel_paths: &[String],
    ) -> Option<String>;
}

/// Dispatches to the right [`LanguageParser`] by file extension.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn LanguageParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parser: Box<dyn LanguageParser>) -> &mut Self {
        self.parsers.push(parser);
        self
    }

    pub fn for_path(&self, rel_path: &str) -> Option<&dyn LanguageParser> {
        let ext = rel_path.rsplit('.').next()?;
        self.parsers
            .iter()
            .find(|p| p.extensions().contains(&ext))
            .map(|p| p.as_ref())
    }

    /// Parse every file this registry recognizes, returning per-file
    /// unresolved import/export facts. Files with no matching parser are
    /// skipped silently; parse failures become diagnostics.
    pub fn parse_all(
        &self,
        files: &[crate::types::FileRecord],
        diagnostics_sink: impl Fn(Diagnostic) + Sync,
    ) -> std::collections::HashMap<FileId, ParsedFile> {
        use rayon::prelude::*;

        files
            .par_iter()
            .filter(|f| !f.is_dir)
            .filter_map(|f| {
                let parser = self.for_path(&f.rel_path)?;
                let source = match std::fs::read_to_string(&f.abs_path) {
                    Ok(s) => s,
                    Err(e) => {
                        diagnostics_sink(Diagnostic::ParseError {
                            file: f.rel_path.clone(),
                            cause: e.to_string(),
                        });
                        return None;
                    }
                };
                match parser.parse(&f.abs_path, &source) {
                    Ok(parsed) => Some((f.id, parsed)),
                    Err(cause) => {
                        diagnostics_sink(Diagnostic::ParseError {
                            file: f.rel_path.clone(),
                            cause,
                        });
                        None
                    }
                }
            })
            .collect()
    }

    /// Resolve every parsed file's imports against the project's file list,
    /// producing the [`ImportEdge`]s the graph is built from.
    pub fn resolve_all(
        &self,
        parsed: &std::collections::HashMap<FileId, ParsedFile>,
        files: &[crate::types::FileRecord],
    ) -> std::collections::HashMap<FileId, Vec<ImportEdge>> {
        let rel_paths: Vec<String> = files.iter().map(|f| f.rel_path.clone()).collect();
        let by_path: std::collections::HashMap<&str, FileId> =
            files.iter().map(|f| (f.rel_path.as_str(), f.id)).collect();

        let mut out = std::collections::HashMap::new();
        for (file_id, parsed_file) in parsed {
            let Some(source_file) = files.iter().find(|f| f.id == *file_id) else {
                continue;
            };
            let Some(parser) = self.for_path(&source_file.rel_path) else {
                continue;
            };
            let mut edges = Vec::new();
            for import in &parsed_file.imports {
                let resolved = parser
                    .resolve(&source_file.rel_path, &import.specifier, &rel_paths)
                    .and_then(|p| by_path.get(p.as_str()).copied());
                edges.push(ImportEdge {
                    source: *file_id,
                    specifier: import.specifier.clone(),
                    resolved,
                    line: import.line,
                });
            }
            out.insert(*file_id, edges);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileRecord;

    struct FakeGo;

    impl LanguageParser for FakeGo {
        fn language(&self) -> &'static str {
            "go"
        }

        fn extensions(&self) -> &'static [&'static str] {
            &["go"]
        }

        fn parse(&self, _abs_path: &std::path::Path, source: &str) -> Result<ParsedFile, String> {
            let imports = source
                .lines()
                .enumerate()
                .filter(|(_, l)| l.trim_start().starts_with("import"))
                .map(|(i, l)| UnresolvedImport {
                    specifier: l.trim_start().trim_start_matches("import").trim().trim_matches('"').to_string(),
                    line: i + 1,
                })
                .collect();
            Ok(ParsedFile {
                imports,
                exports: vec![],
            })
        }

        fn resolve(
            &self,
            _from_rel_path: &str,
            specifier: &str,
            candidate_rel_paths: &[String],
        ) -> Option<String> {
            candidate_rel_paths
                .iter()
                .find(|p| p.ends_with(&format!("{specifier}.go")))
                .cloned()
        }
    }

    #[test]
    fn test_for_path_dispatches_by_extension() {
        let mut registry = ParserRegistry::new();
        registry.register(Box::new(FakeGo));
        assert!(registry.for_path("main.go").is_some());
        assert!(registry.for_path("main.py").is_none());
    }

    #[test]
    fn test_parse_all_and_resolve_all() {
        let mut registry = ParserRegistry::new();
        registry.register(Box::new(FakeGo));

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.go"), "import \"pkg/util\"\n").unwrap();
        std::fs::write(dir.path().join("util.go"), "").unwrap();

        let files = vec![
            FileRecord {
                id: FileId(0),
                rel_path: "main.go".into(),
                abs_path: dir.path().join("main.go"),
                is_dir: false,
                depth: 1,
                parent: String::new(),
                directives: vec![],
            },
            FileRecord {
                id: FileId(1),
                rel_path: "pkg/util.go".into(),
                abs_path: dir.path().join("util.go"),
                is_dir: false,
                depth: 2,
                parent: "pkg".into(),
                directives: vec![],
            },
        ];

        let parsed = registry.parse_all(&files, |_| {});
        assert_eq!(parsed.len(), 1);

        let edges = registry.resolve_all(&parsed, &files);
        let main_edges = &edges[&FileId(0)];
        assert_eq!(main_edges.len(), 1);
        assert_eq!(main_edges[0].resolved, Some(FileId(1)));
    }
}
