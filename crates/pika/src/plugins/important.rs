//! `!important` injection.

use std::cell::Cell;
use std::rc::Rc;

use serde::Deserialize;

use super::on_configure_engine;
use crate::plugin::{EnginePlugin, PluginOrder};
use crate::style::{StyleDefinition, StyleValue};

/// Per-definition flag overriding [`ImportantConfig::default`].
pub const IMPORTANT_KEY: &str = "__important";

const SUFFIX: &str = " !important";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImportantConfig {
    /// Marks every declaration `!important` unless a definition opts out.
    #[serde(default)]
    pub default: bool,
}

/// The `!important` plugin.
///
/// Runs in the post bucket so definitions injected by earlier plugins, such
/// as `__shortcut` expansions, are marked as well.
pub fn important() -> EnginePlugin {
    let default = Rc::new(Cell::new(false));
    let configured = default.clone();

    let plugin = EnginePlugin::new("core:important")
        .with_order(PluginOrder::Post)
        .raw_config_configured(move |config| {
            configured.set(config.important.as_ref().is_some_and(|c| c.default));
            Ok(())
        })
        .transform_style_definitions(move |definitions| {
            let default = default.get();
            async move {
                Ok(Some(
                    definitions
                        .into_iter()
                        .map(|definition| apply_important(definition, default))
                        .collect(),
                ))
            }
        });

    on_configure_engine(plugin, |engine| {
        engine.append_autocomplete_extra_properties([IMPORTANT_KEY]);
        engine.append_autocomplete_property_values(IMPORTANT_KEY, ["true", "false"]);
        Ok(())
    })
}

/// Strips the flag and, when active, suffixes the definition's own values.
fn apply_important(mut definition: StyleDefinition, default: bool) -> StyleDefinition {
    let active = match definition.remove(IMPORTANT_KEY) {
        Some(StyleValue::Bool(flag)) => flag,
        _ => default,
    };
    if !active {
        return definition;
    }
    for (key, value) in definition.iter_mut() {
        if key.starts_with("__") {
            continue;
        }
        match value {
            StyleValue::Value(v) => mark(v),
            StyleValue::Fallback(v, fallbacks) => {
                mark(v);
                fallbacks.iter_mut().for_each(mark);
            }
            _ => {}
        }
    }
    definition
}

fn mark(value: &mut String) {
    if !value.trim_end().ends_with("!important") {
        value.push_str(SUFFIX);
    }
}
