use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

/// One entrypoint rule as written in configuration. All present criteria
/// must match for a node to become a reachability root.
#[derive(Debug, Clone, Deserialize)]
pub struct EntrypointRuleConfig {
    /// Regex over the node's bare name (e.g. `"^handle_"`, `"^main$"`).
    pub name: Option<String>,
    /// Node kinds the rule applies to: module, class, function, method.
    pub kinds: Option<Vec<String>>,
    /// Glob over the node's project-relative file path (e.g. `"api/**"`).
    pub path: Option<String>,
}

/// Configuration loaded from `code-reach.toml` at the project root.
///
/// Entrypoint policy is configuration, not analysis: different projects
/// supply different rule sets for their HTTP handlers, CLI commands, or
/// worker run-loops.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Additional path patterns to exclude from discovery (beyond .gitignore
    /// and `__pycache__`).
    pub exclude: Option<Vec<String>>,
    /// Reachability root rules.
    #[serde(default)]
    pub entrypoints: Vec<EntrypointRuleConfig>,
    /// Path-glob → layer name, for the caller-supplied layer/category on
    /// every node. First matching glob wins; iteration order is the sorted
    /// key order.
    #[serde(default)]
    pub layers: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from `code-reach.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or
    /// cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join("code-reach.toml");

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!("failed to parse code-reach.toml: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!("failed to read code-reach.toml: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    /// Layer for a project-relative file path, or `"unassigned"`.
    pub fn layer_for(&self, rel_path: &Path) -> String {
        let path_str = rel_path.to_string_lossy();
        for (pattern, layer) in &self.layers {
            if let Ok(compiled) = glob::Pattern::new(pattern)
                && compiled.matches(&path_str)
            {
                return layer.clone();
            }
        }
        "unassigned".to_string()
    }
}
