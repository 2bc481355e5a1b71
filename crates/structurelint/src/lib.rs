//! Top-level entry point wiring config discovery, the walker, every
//! built-in language front end and the built-in rule set into a single
//! [`Engine`].

use std::path::Path;

use structurelint_core::engine::{AnalysisOutcome, CancellationToken, Engine};
use structurelint_core::diagnostics::EngineError;
use structurelint_core::parser::ParserRegistry;
use structurelint_core::rule::RuleRegistry;

/// A [`ParserRegistry`] with every in-tree language front end registered.
pub fn default_parsers() -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    registry
        .register(Box::new(structurelint_go::GoParser::default()))
        .register(Box::new(structurelint_python::PythonParser::default()))
        .register(Box::new(structurelint_javascript::JavaScriptParser::default()))
        .register(Box::new(structurelint_typescript::TypeScriptParser::default()))
        .register(Box::new(structurelint_java::JavaParser::default()))
        .register(Box::new(structurelint_cpp::CppParser::default()))
        .register(Box::new(structurelint_csharp::CSharpParser::default()));
    registry
}

/// The built-in [`RuleRegistry`] (`structurelint_rules::default_registry`).
pub fn default_rules() -> RuleRegistry {
    structurelint_rules::default_registry()
}

/// An [`Engine`] built from every in-tree language front end and rule.
pub fn default_engine() -> Engine {
    Engine::new(default_parsers(), default_rules())
}

/// Run a full analysis of `root` with the default engine, using a fresh,
/// never-cancelled [`CancellationToken`]. Most callers that don't need to
/// cancel mid-run or reuse an engine across multiple roots want this.
pub fn analyze(root: &Path) -> Result<AnalysisOutcome, EngineError> {
    default_engine().analyze(root, &CancellationToken::new())
}
