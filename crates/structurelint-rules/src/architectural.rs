use serde_yaml::Value;

use structurelint_core::rule::{AnalysisContext, Rule};
use structurelint_core::types::Violation;

use crate::config_util::as_sequence_of_strings;
use crate::glob_capture;

/// For every resolved import edge where the source's layer may not depend
/// on the target's layer, flags the source file.
pub struct EnforceLayerBoundariesRule;

impl Rule for EnforceLayerBoundariesRule {
    fn name(&self) -> &'static str {
        "enforce-layer-boundaries"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for file in ctx.files.iter().filter(|f| !f.is_dir) {
            let from_layer = ctx.graph.layer_of(file.id);
            for target in ctx.graph.deps_of(file.id) {
                let to_layer = ctx.graph.layer_of(target);
                if ctx.graph.can_depend(from_layer, to_layer) {
                    continue;
                }
                let from_name = from_layer
                    .and_then(|l| ctx.graph.layer_by_id(l))
                    .map(|l| l.name.as_str())
                    .unwrap_or("unclassified");
                let to_name = to_layer
                    .and_then(|l| ctx.graph.layer_by_id(l))
                    .map(|l| l.name.as_str())
                    .unwrap_or("unclassified");
                let target_path = ctx.file_by_id(target).map(|f| f.rel_path.as_str()).unwrap_or("");
                violations.push(Violation::new(
                    self.name(),
                    &file.rel_path,
                    format!("{from_name} cannot import from {to_name} ({target_path})"),
                ));
            }
        }
        violations
    }
}

struct PathLayer {
    name: String,
    patterns: Vec<String>,
    forbidden: Vec<String>,
}

fn parse_path_layers(cfg: &Value) -> Vec<PathLayer> {
    cfg.get("layers")
        .and_then(Value::as_sequence)
        .map(|seq| {
            seq.iter()
                .filter_map(|v| {
                    let name = v.get("name")?.as_str()?.to_string();
                    let patterns = v.get("patterns").map(as_sequence_of_strings).unwrap_or_default();
                    let forbidden = v
                        .get("forbiddenPaths")
                        .map(as_sequence_of_strings)
                        .unwrap_or_default();
                    Some(PathLayer {
                        name,
                        patterns,
                        forbidden,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Pure-topology layering independent of the import graph: each file is
/// assigned to at most one layer by path glob, and may not itself live
/// under that layer's `forbiddenPaths`.
pub struct PathBasedLayersRule;

impl Rule for PathBasedLayersRule {
    fn name(&self) -> &'static str {
        "path-based-layers"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for file in ctx.files.iter().filter(|f| !f.is_dir) {
            let Some(cfg) = ctx.config.effective_rule_value(self.name(), &file.rel_path) else {
                continue;
            };
            let layers = parse_path_layers(&cfg);
            let Some(layer) = layers
                .iter()
                .find(|l| l.patterns.iter().any(|p| glob_capture::matches(p, &file.rel_path)))
            else {
                continue;
            };
            if layer.forbidden.iter().any(|p| glob_capture::matches(p, &file.rel_path)) {
                violations.push(Violation::new(
                    self.name(),
                    &file.rel_path,
                    format!("path is forbidden within layer '{}'", layer.name),
                ));
            }
        }
        violations
    }
}
