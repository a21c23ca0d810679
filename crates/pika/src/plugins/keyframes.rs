//! `@keyframes` rules rendered as a preflight.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Deserialize;

use super::on_configure_engine;
use crate::engine::{Engine, Preflight, PreflightOutput};
use crate::plugin::EnginePlugin;
use crate::style::StyleDefinition;

const USAGE_PROPERTIES: [&str; 2] = ["animation", "animation-name"];

/// One keyframes entry.
///
/// An entry without frames only registers its name for autocomplete.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "KeyframesRepr")]
pub struct Keyframes {
    pub name: String,
    /// Frame selector (`from`, `to`, `50%`) → properties.
    pub frames: Option<StyleDefinition>,
    /// Suggested `animation` values.
    pub autocomplete: Vec<String>,
    /// Overrides the plugin-wide pruning flag.
    pub prune_unused: Option<bool>,
}

impl Keyframes {
    pub fn new(name: impl Into<String>, frames: StyleDefinition) -> Self {
        Self {
            name: name.into(),
            frames: Some(frames),
            autocomplete: Vec::new(),
            prune_unused: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: None,
            autocomplete: Vec::new(),
            prune_unused: None,
        }
    }

    pub fn autocomplete<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.autocomplete = hints.into_iter().map(Into::into).collect();
        self
    }

    pub fn prune_unused(mut self, prune: bool) -> Self {
        self.prune_unused = Some(prune);
        self
    }
}

impl From<&str> for Keyframes {
    fn from(name: &str) -> Self {
        Keyframes::named(name)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyframesRepr {
    Named(String),
    Full {
        name: String,
        #[serde(default)]
        frames: Option<StyleDefinition>,
        #[serde(default)]
        autocomplete: Vec<String>,
        #[serde(default, rename = "pruneUnused")]
        prune_unused: Option<bool>,
    },
}

impl From<KeyframesRepr> for Keyframes {
    fn from(repr: KeyframesRepr) -> Self {
        match repr {
            KeyframesRepr::Named(name) => Keyframes::named(name),
            KeyframesRepr::Full {
                name,
                frames,
                autocomplete,
                prune_unused,
            } => Keyframes {
                name,
                frames,
                autocomplete,
                prune_unused,
            },
        }
    }
}

/// Configuration of the keyframes plugin.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyframesConfig {
    #[serde(default)]
    pub keyframes: Vec<Keyframes>,
    /// Defaults to `true`.
    #[serde(default)]
    pub prune_unused: Option<bool>,
}

impl KeyframesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, keyframes: impl Into<Keyframes>) -> Self {
        self.keyframes.push(keyframes.into());
        self
    }

    pub fn prune_unused(mut self, prune: bool) -> Self {
        self.prune_unused = Some(prune);
        self
    }
}

#[derive(Debug, Default)]
struct KeyframesStore {
    entries: IndexMap<String, Keyframes>,
    prune_default: bool,
}

impl KeyframesStore {
    fn render(&self, engine: &Engine) -> StyleDefinition {
        let used = used_animation_names(engine);
        let mut out = StyleDefinition::new();
        for keyframes in self.entries.values() {
            let Some(frames) = &keyframes.frames else {
                continue;
            };
            let prune = keyframes.prune_unused.unwrap_or(self.prune_default);
            if prune && !used.contains(keyframes.name.as_str()) {
                continue;
            }
            out.insert(format!("@keyframes {}", keyframes.name), frames.clone());
        }
        out
    }
}

/// Tokens of every stored `animation`/`animation-name` value.
fn used_animation_names(engine: &Engine) -> HashSet<String> {
    engine
        .atomic_styles()
        .filter(|style| USAGE_PROPERTIES.contains(&style.content.property.as_str()))
        .flat_map(|style| style.content.value.iter())
        .flat_map(|value| {
            value
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn register(engine: &mut Engine, store: &RefCell<KeyframesStore>, keyframes: Keyframes) {
    engine.append_autocomplete_css_property_values("animation-name", [keyframes.name.clone()]);
    let mut suggestions = vec![format!("{} ", keyframes.name)];
    suggestions.extend(keyframes.autocomplete.iter().cloned());
    engine.append_autocomplete_css_property_values("animation", suggestions);
    store
        .borrow_mut()
        .entries
        .insert(keyframes.name.clone(), keyframes);
}

#[derive(Clone)]
struct KeyframesHandle(Rc<RefCell<KeyframesStore>>);

pub fn keyframes() -> EnginePlugin {
    on_configure_engine(EnginePlugin::new("core:keyframes"), |engine| {
        let config = engine.config().raw_config.keyframes.clone().unwrap_or_default();
        let store = Rc::new(RefCell::new(KeyframesStore {
            prune_default: config.prune_unused.unwrap_or(true),
            ..Default::default()
        }));
        for keyframes in config.keyframes {
            register(engine, &store, keyframes);
        }

        engine.extensions.insert(KeyframesHandle(store.clone()));
        engine.add_preflight(Preflight::from_fn(move |engine, _| {
            PreflightOutput::Definition(store.borrow().render(engine))
        }));
        Ok(())
    })
}

/// Runtime access to the keyframes plugin, from [`Engine::keyframes`].
pub struct KeyframesApi<'a> {
    engine: &'a mut Engine,
    store: Rc<RefCell<KeyframesStore>>,
}

impl KeyframesApi<'_> {
    /// Registers an entry, replacing one with the same name, and notifies
    /// `preflight_updated`.
    pub fn add(&mut self, keyframes: impl Into<Keyframes>) {
        register(self.engine, &self.store, keyframes.into());
        self.engine.notify_preflight_updated();
    }

    pub fn names(&self) -> Vec<String> {
        self.store.borrow().entries.keys().cloned().collect()
    }
}

impl Engine {
    /// The keyframes plugin API, if the plugin is installed.
    pub fn keyframes(&mut self) -> Option<KeyframesApi<'_>> {
        let store = self.extensions.get::<KeyframesHandle>()?.0.clone();
        Some(KeyframesApi {
            engine: self,
            store,
        })
    }
}
