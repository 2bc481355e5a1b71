use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, EngineError};

pub const CONFIG_FILE_NAMES: [&str; 2] = [".structurelint.yml", ".structurelint.yaml"];

/// A glob pattern mapped to an architectural layer name, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    pub name: String,
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default, rename = "dependsOn")]
    pub depends_on: Vec<String>,
}

/// An `overrides` block: for files matching any of `files`, overlay `rules`
/// on top of the base configuration's rule map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverrideConfig {
    pub files: Vec<String>,
    #[serde(default)]
    pub rules: HashMap<String, serde_yaml::Value>,
}

/// One `.structurelint.yml` file, as deserialized directly from YAML,
/// before cascading merge with parents/extends/overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub root: bool,
    #[serde(default)]
    pub extends: ExtendsValue,
    #[serde(default = "default_true", rename = "autoLoadGitignore")]
    pub auto_load_gitignore: bool,
    #[serde(default = "default_true", rename = "autoLanguageNaming")]
    pub auto_language_naming: bool,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub entrypoints: Vec<String>,
    #[serde(default, rename = "infrastructurePatterns")]
    pub infrastructure_patterns: Vec<String>,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub rules: HashMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub overrides: Vec<OverrideConfig>,
}

fn default_true() -> bool {
    true
}

/// `extends` may be a single string or a list of strings in YAML.
#[derive(Debug, Clone, Default)]
pub struct ExtendsValue(pub Vec<String>);

impl<'de> Deserialize<'de> for ExtendsValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(String),
            Many(Vec<String>),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::One(s) => ExtendsValue(vec![s]),
            Repr::Many(v) => ExtendsValue(v),
        })
    }
}

/// A fully merged, resolved configuration ready to hand to the engine.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub auto_load_gitignore: bool,
    pub auto_language_naming: bool,
    pub exclude: Vec<String>,
    pub entrypoints: Vec<String>,
    pub infrastructure_patterns: Vec<String>,
    pub layers: Vec<LayerConfig>,
    pub rules: HashMap<String, serde_yaml::Value>,
    pub overrides: Vec<OverrideConfig>,
}

impl Config {
    /// Is the rule explicitly disabled (value `false` or `0`)?
    pub fn rule_disabled(&self, name: &str) -> bool {
        match self.rules.get(name) {
            None => false,
            Some(v) => is_falsey(v),
        }
    }

    /// Resolve the effective rule config value for `path`, applying any
    /// matching override on top of the base value. Returns `None` if the
    /// rule is absent or disabled for this file.
    pub fn effective_rule_value(
        &self,
        rule_name: &str,
        rel_path: &str,
    ) -> Option<serde_yaml::Value> {
        let mut value = self.rules.get(rule_name).cloned();
        for over in &self.overrides {
            if over.files.iter().any(|g| glob_match(g, rel_path)) {
                if let Some(ov) = over.rules.get(rule_name) {
                    value = Some(ov.clone());
                }
            }
        }
        match value {
            Some(v) if !is_falsey(&v) => Some(v),
            _ => None,
        }
    }
}

fn is_falsey(v: &serde_yaml::Value) -> bool {
    match v {
        serde_yaml::Value::Bool(b) => !b,
        serde_yaml::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_yaml::Value::Null => true,
        _ => false,
    }
}

fn glob_match(pattern: &str, path: &str) -> bool {
    globset::Glob::new(pattern)
        .map(|g| g.compile_matcher().is_match(path))
        .unwrap_or(false)
}

/// Discover every `.structurelint.yml`/`.yaml` from `start` up to (and
/// including) the first one marked `root: true`, or to the filesystem root.
/// Returned outermost-first so later entries override earlier ones.
pub fn discover_configs(start: &Path) -> Result<Vec<(PathBuf, RawConfig)>, EngineError> {
    let mut dir = if start.is_file() {
        start.parent().map(|p| p.to_path_buf())
    } else {
        Some(start.to_path_buf())
    };
    let mut found = Vec::new();

    while let Some(d) = dir {
        for name in CONFIG_FILE_NAMES {
            let candidate = d.join(name);
            if candidate.exists() {
                let content =
                    std::fs::read_to_string(&candidate).map_err(|e| EngineError::ConfigParseError {
                        path: candidate.clone(),
                        line: 0,
                        reason: e.to_string(),
                    })?;
                let parsed: RawConfig =
                    serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
                        path: candidate.clone(),
                        line: e.location().map(|l| l.line()).unwrap_or(0),
                        reason: e.to_string(),
                    })?;
                let is_root = parsed.root;
                found.push((candidate, parsed));
                if is_root {
                    found.reverse();
                    return Ok(found);
                }
                break;
            }
        }
        dir = d.parent().map(|p| p.to_path_buf());
    }
    found.reverse();
    Ok(found)
}

/// Merge a sequence of raw configs (outermost first) into one effective
/// `Config`, then resolve `extends` chains and auto-loaded `.gitignore`.
///
/// Precedence, lowest to highest: parents by depth, `extends`, local,
/// `overrides` (overrides are carried as-is and applied per-file at query
/// time via [`Config::effective_rule_value`]).
pub fn merge_configs(
    configs: &[(PathBuf, RawConfig)],
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Config, EngineError> {
    if configs.is_empty() {
        diagnostics.push(Diagnostic::ConfigNotFound(PathBuf::from(".")));
        return Ok(Config {
            auto_load_gitignore: true,
            auto_language_naming: true,
            ..Config::default()
        });
    }

    let mut merged = Config {
        auto_load_gitignore: true,
        auto_language_naming: true,
        ..Config::default()
    };

    for (path, raw) in configs {
        apply_extends(path, raw, &mut merged, diagnostics)?;
    }

    if merged.auto_load_gitignore {
        if let Some((first_path, _)) = configs.first() {
            if let Some(dir) = first_path.parent() {
                load_gitignore(dir, &mut merged);
            }
        }
    }

    Ok(merged)
}

fn apply_extends(
    path: &Path,
    raw: &RawConfig,
    merged: &mut Config,
    _diagnostics: &mut [Diagnostic],
) -> Result<(), EngineError> {
    // `extends` are merged *underneath* the local file: load and apply them
    // first, then apply this file's own settings on top.
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    for ext in &raw.extends.0 {
        let ext_path = resolve_extends_path(base_dir, ext);
        if let Ok(content) = std::fs::read_to_string(&ext_path) {
            let ext_raw: RawConfig =
                serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
                    path: ext_path.clone(),
                    line: e.location().map(|l| l.line()).unwrap_or(0),
                    reason: e.to_string(),
                })?;
            apply_extends(&ext_path, &ext_raw, merged, _diagnostics)?;
        }
    }

    merged.auto_load_gitignore = raw.auto_load_gitignore;
    merged.auto_language_naming = raw.auto_language_naming;

    for pat in &raw.exclude {
        if !merged.exclude.contains(pat) {
            merged.exclude.push(pat.clone());
        }
    }
    for ep in &raw.entrypoints {
        if !merged.entrypoints.contains(ep) {
            merged.entrypoints.push(ep.clone());
        }
    }
    for pat in &raw.infrastructure_patterns {
        if !merged.infrastructure_patterns.contains(pat) {
            merged.infrastructure_patterns.push(pat.clone());
        }
    }
    for layer in &raw.layers {
        if let Some(existing) = merged.layers.iter_mut().find(|l| l.name == layer.name) {
            *existing = layer.clone();
        } else {
            merged.layers.push(layer.clone());
        }
    }
    for (name, value) in &raw.rules {
        merged.rules.insert(name.clone(), value.clone());
    }
    merged.overrides.extend(raw.overrides.iter().cloned());

    Ok(())
}

fn resolve_extends_path(base_dir: &Path, ext: &str) -> PathBuf {
    let p = Path::new(ext);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn load_gitignore(dir: &Path, merged: &mut Config) {
    let gi_path = dir.join(".gitignore");
    let Ok(content) = std::fs::read_to_string(&gi_path) else {
        return;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let glob = gitignore_line_to_glob(line);
        if !merged.exclude.contains(&glob) {
            merged.exclude.push(glob);
        }
    }
}

/// Convert a single `.gitignore` line to a glob pattern per the mapping in
/// the spec: `foo` -> `**/foo`, `foo/` -> `foo/**`, `/foo` -> `foo`.
fn gitignore_line_to_glob(line: &str) -> String {
    if let Some(rest) = line.strip_prefix('/') {
        rest.trim_end_matches('/').to_string()
    } else if let Some(dir) = line.strip_suffix('/') {
        format!("{dir}/**")
    } else {
        format!("**/{line}")
    }
}
