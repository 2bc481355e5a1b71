use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors that abort a run and propagate to the engine's caller.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to parse config at {path}:{line}: {reason}")]
    ConfigParseError {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("project root not found: {0}")]
    RootNotFound(PathBuf),
}

/// Non-fatal, informational records of something the engine could not do.
/// Diagnostics never abort a run; they are collected and returned alongside
/// the violation list.
#[derive(Debug, Clone, Error)]
pub enum Diagnostic {
    #[error("no .structurelint.yml found above {0}; using default configuration")]
    ConfigNotFound(PathBuf),

    #[error("rule '{rule}' field '{field}': expected {expected}, got {got}; rule disabled")]
    ConfigTypeError {
        rule: String,
        field: String,
        expected: String,
        got: String,
    },

    #[error("unknown rule '{0}' in config; ignored")]
    UnknownRule(String),

    #[error("failed to walk {path}: {cause}")]
    WalkError { path: PathBuf, cause: String },

    #[error("failed to parse {file}: {cause}")]
    ParseError { file: String, cause: String },

    #[error("rule '{rule}' skipped: {reason}")]
    RuleSkipped { rule: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_messages_are_human_readable() {
        let d = Diagnostic::RuleSkipped {
            rule: "enforce-layer-boundaries".into(),
            reason: "graph unavailable".into(),
        };
        assert_eq!(
            d.to_string(),
            "rule 'enforce-layer-boundaries' skipped: graph unavailable"
        );
    }

    #[test]
    fn test_engine_error_root_not_found() {
        let e = EngineError::RootNotFound(PathBuf::from("/nope"));
        assert!(e.to_string().contains("/nope"));
    }
}
