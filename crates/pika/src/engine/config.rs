//! Engine configuration and its resolution.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use super::preflight::{resolve_preflight, Preflight, ResolvedPreflight};
use crate::logger::Logger;
use crate::plugin::{resolve_plugins, EnginePlugin};
use crate::plugins::{
    ImportantConfig, KeyframesConfig, SelectorsConfig, ShortcutsConfig, VariablesConfig,
};

/// Layers always present in a resolved config, merged under user layers.
pub const DEFAULT_LAYERS: [(&str, i32); 2] = [("preflights", 1), ("utilities", 10)];

pub const DEFAULT_SELECTOR: &str = ".%";
pub const DEFAULT_PREFLIGHTS_LAYER: &str = "preflights";
pub const DEFAULT_UTILITIES_LAYER: &str = "utilities";

/// User-facing engine configuration.
///
/// Every field is optional; [`resolve_engine_config`] fills in defaults.
#[derive(Clone, Default)]
pub struct EngineConfig {
    pub plugins: Vec<EnginePlugin>,
    /// Prepended to every generated id.
    pub prefix: Option<String>,
    /// Selector template wrapping declarations; `%` stands for the id.
    pub default_selector: Option<String>,
    pub preflights: Vec<Preflight>,
    /// Layer weights merged over [`DEFAULT_LAYERS`].
    pub layers: IndexMap<String, i32>,
    pub default_preflights_layer: Option<String>,
    pub default_utilities_layer: Option<String>,
    pub logger: Option<Logger>,
    pub important: Option<ImportantConfig>,
    pub variables: Option<VariablesConfig>,
    pub keyframes: Option<KeyframesConfig>,
    pub selectors: Option<SelectorsConfig>,
    pub shortcuts: Option<ShortcutsConfig>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, plugin: EnginePlugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_default_selector(mut self, selector: impl Into<String>) -> Self {
        self.default_selector = Some(selector.into());
        self
    }

    pub fn with_preflight(mut self, preflight: impl Into<Preflight>) -> Self {
        self.preflights.push(preflight.into());
        self
    }

    pub fn with_layer(mut self, name: impl Into<String>, weight: i32) -> Self {
        self.layers.insert(name.into(), weight);
        self
    }

    pub fn with_default_preflights_layer(mut self, layer: impl Into<String>) -> Self {
        self.default_preflights_layer = Some(layer.into());
        self
    }

    pub fn with_default_utilities_layer(mut self, layer: impl Into<String>) -> Self {
        self.default_utilities_layer = Some(layer.into());
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_important(mut self, important: ImportantConfig) -> Self {
        self.important = Some(important);
        self
    }

    pub fn with_variables(mut self, variables: VariablesConfig) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_keyframes(mut self, keyframes: KeyframesConfig) -> Self {
        self.keyframes = Some(keyframes);
        self
    }

    pub fn with_selectors(mut self, selectors: SelectorsConfig) -> Self {
        self.selectors = Some(selectors);
        self
    }

    pub fn with_shortcuts(mut self, shortcuts: ShortcutsConfig) -> Self {
        self.shortcuts = Some(shortcuts);
        self
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("prefix", &self.prefix)
            .field("default_selector", &self.default_selector)
            .field("preflights", &self.preflights.len())
            .field("layers", &self.layers)
            .field("default_preflights_layer", &self.default_preflights_layer)
            .field("default_utilities_layer", &self.default_utilities_layer)
            .finish_non_exhaustive()
    }
}

/// Editor hints collected from config and plugins. No effect on CSS output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AutocompleteConfig {
    pub selectors: IndexSet<String>,
    pub style_item_strings: IndexSet<String>,
    pub extra_properties: IndexSet<String>,
    pub extra_css_properties: IndexSet<String>,
    pub properties: IndexMap<String, Vec<String>>,
    pub css_properties: IndexMap<String, Vec<String>>,
}

/// Configuration with every default applied.
#[derive(Clone)]
pub struct ResolvedEngineConfig {
    pub raw_config: EngineConfig,
    pub prefix: String,
    pub default_selector: String,
    pub plugins: Vec<EnginePlugin>,
    pub preflights: Vec<ResolvedPreflight>,
    pub layers: IndexMap<String, i32>,
    pub default_preflights_layer: String,
    pub default_utilities_layer: String,
    pub autocomplete: AutocompleteConfig,
}

impl fmt::Debug for ResolvedEngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEngineConfig")
            .field("prefix", &self.prefix)
            .field("default_selector", &self.default_selector)
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("preflights", &self.preflights.len())
            .field("layers", &self.layers)
            .field("default_preflights_layer", &self.default_preflights_layer)
            .field("default_utilities_layer", &self.default_utilities_layer)
            .finish_non_exhaustive()
    }
}

/// Applies defaults: prefix `""`, default selector `.%`, layers merged over
/// [`DEFAULT_LAYERS`], plugins sorted and preflights normalized.
pub fn resolve_engine_config(config: EngineConfig) -> ResolvedEngineConfig {
    let mut layers: IndexMap<String, i32> = DEFAULT_LAYERS
        .iter()
        .map(|(name, weight)| (name.to_string(), *weight))
        .collect();
    layers.extend(config.layers.iter().map(|(n, w)| (n.clone(), *w)));

    ResolvedEngineConfig {
        prefix: config.prefix.clone().unwrap_or_default(),
        default_selector: config
            .default_selector
            .clone()
            .unwrap_or_else(|| DEFAULT_SELECTOR.to_string()),
        plugins: resolve_plugins(config.plugins.clone()),
        preflights: config.preflights.iter().cloned().map(resolve_preflight).collect(),
        layers,
        default_preflights_layer: config
            .default_preflights_layer
            .clone()
            .unwrap_or_else(|| DEFAULT_PREFLIGHTS_LAYER.to_string()),
        default_utilities_layer: config
            .default_utilities_layer
            .clone()
            .unwrap_or_else(|| DEFAULT_UTILITIES_LAYER.to_string()),
        autocomplete: AutocompleteConfig::default(),
        raw_config: config,
    }
}
