pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod graph;
pub mod parser;
pub mod rule;
pub mod types;
pub mod walker;

pub use config::Config;
pub use diagnostics::{Diagnostic, EngineError};
pub use engine::{AnalysisOutcome, CancellationToken, Engine};
pub use graph::{ImportGraph, LayerTable};
pub use parser::{LanguageParser, ParsedFile, ParserRegistry, UnresolvedImport};
pub use rule::{AnalysisContext, Rule, RuleRegistry};
pub use types::*;
pub use walker::{WalkOutput, Walker};
