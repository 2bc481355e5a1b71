use structurelint_core::rule::{ConfigFieldError, Rule, RuleRegistry};

use crate::architectural::{EnforceLayerBoundariesRule, PathBasedLayersRule};
use crate::config_util::{
    validate_is_mapping, validate_is_sequence, validate_number_field, validate_sequence_field, validate_u64_field,
};
use crate::content::{FileContentRule, MaxCognitiveComplexityRule, MaxHalsteadEffortRule, TestAdjacencyRule};
use crate::dead_code::{DisallowOrphanedFilesRule, DisallowUnusedExportsRule};
use crate::fs_metrics::{MaxDepthRule, MaxFilesInDirRule, MaxSubdirsRule};
use crate::naming::{
    DisallowedPatternsRule, FileExistenceRule, NamingConventionRule, RegexMatchRule, UniquenessConstraintsRule,
};

fn build_max_depth(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_u64_field(cfg, "max")?;
    Ok(Box::new(MaxDepthRule))
}

fn build_max_files_in_dir(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_u64_field(cfg, "max")?;
    validate_u64_field(cfg, "test-max")?;
    Ok(Box::new(MaxFilesInDirRule))
}

fn build_max_subdirs(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_u64_field(cfg, "max")?;
    Ok(Box::new(MaxSubdirsRule))
}

fn build_naming_convention(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_is_mapping(cfg)?;
    Ok(Box::new(NamingConventionRule))
}

fn build_regex_match(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_is_mapping(cfg)?;
    Ok(Box::new(RegexMatchRule))
}

fn build_file_existence(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_is_mapping(cfg)?;
    Ok(Box::new(FileExistenceRule))
}

fn build_disallowed_patterns(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_is_sequence(cfg)?;
    Ok(Box::new(DisallowedPatternsRule))
}

fn build_uniqueness_constraints(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_is_mapping(cfg)?;
    Ok(Box::new(UniquenessConstraintsRule))
}

fn build_enforce_layer_boundaries(_cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    Ok(Box::new(EnforceLayerBoundariesRule))
}

fn build_path_based_layers(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_sequence_field(cfg, "layers")?;
    Ok(Box::new(PathBasedLayersRule))
}

fn build_disallow_orphaned_files(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_sequence_field(cfg, "entry-point-patterns")?;
    Ok(Box::new(DisallowOrphanedFilesRule))
}

fn build_disallow_unused_exports(_cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    Ok(Box::new(DisallowUnusedExportsRule))
}

fn build_max_cognitive_complexity(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_u64_field(cfg, "max")?;
    validate_u64_field(cfg, "test-max")?;
    validate_sequence_field(cfg, "file-patterns")?;
    Ok(Box::new(MaxCognitiveComplexityRule))
}

fn build_max_halstead_effort(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_number_field(cfg, "max")?;
    validate_sequence_field(cfg, "file-patterns")?;
    Ok(Box::new(MaxHalsteadEffortRule))
}

fn build_file_content(cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    validate_sequence_field(cfg, "rules")?;
    Ok(Box::new(FileContentRule))
}

fn build_test_adjacency(_cfg: &serde_yaml::Value) -> Result<Box<dyn Rule>, ConfigFieldError> {
    Ok(Box::new(TestAdjacencyRule))
}

/// Every built-in rule, registered under its stable name with a factory
/// that validates its base config shape before the rule ever sees a file.
pub fn default_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    registry
        .register("max-depth", build_max_depth)
        .register("max-files-in-dir", build_max_files_in_dir)
        .register("max-subdirs", build_max_subdirs)
        .register("naming-convention", build_naming_convention)
        .register("regex-match", build_regex_match)
        .register("file-existence", build_file_existence)
        .register("disallowed-patterns", build_disallowed_patterns)
        .register("uniqueness-constraints", build_uniqueness_constraints)
        .register("enforce-layer-boundaries", build_enforce_layer_boundaries)
        .register("path-based-layers", build_path_based_layers)
        .register("disallow-orphaned-files", build_disallow_orphaned_files)
        .register("disallow-unused-exports", build_disallow_unused_exports)
        .register("max-cognitive-complexity", build_max_cognitive_complexity)
        .register("max-halstead-effort", build_max_halstead_effort)
        .register("file-content", build_file_content)
        .register("test-adjacency", build_test_adjacency);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use structurelint_core::config::{Config, LayerConfig};
    use structurelint_core::graph::{ImportGraph, LayerTable};
    use structurelint_core::rule::AnalysisContext;

    #[test]
    fn test_default_registry_has_all_sixteen_rules() {
        let registry = default_registry();
        assert_eq!(registry.names().len(), 16);
    }

    #[test]
    fn test_bad_max_depth_config_is_reported_and_disabled() {
        let mut config = Config::default();
        config
            .rules
            .insert("max-depth".into(), serde_yaml::from_str("max: ten").unwrap());
        let files = Vec::new();
        let dirs = HashMap::new();
        let table = LayerTable::new(&Vec::<LayerConfig>::new());
        let graph = ImportGraph::build(&files, &table, &HashMap::new(), &HashMap::new());
        let ctx = AnalysisContext {
            config: &config,
            files: &files,
            dirs: &dirs,
            graph: &graph,
        };
        let registry = default_registry();
        let mut diagnostics = Vec::new();
        registry.run_all(&ctx, &mut diagnostics);
        assert!(diagnostics.iter().any(|d| matches!(
            d,
            structurelint_core::diagnostics::Diagnostic::ConfigTypeError { rule, field, .. }
                if rule == "max-depth" && field == "max"
        )));
    }
}
