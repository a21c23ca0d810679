//! Named style shortcuts.
//!
//! A shortcut maps a name to style items: definitions, other shortcut names,
//! or a mix of both. Names passed to `use_styles` are expanded fully before
//! extraction. A definition may also pull shortcuts in through `__shortcut`,
//! whose expansion is placed ahead of the definition's own entries.

use std::future::Future;
use std::rc::Rc;

use pika_resolver::{BoxError, DynamicRule, Regex, Resolver, RuleMatch, StaticRule};

use super::{expand_recursive, on_configure_engine};
use crate::engine::Engine;
use crate::logger::Logger;
use crate::plugin::EnginePlugin;
use crate::style::{StyleDefinition, StyleItem, StyleValue};

/// Definition key listing shortcuts to prepend.
pub const SHORTCUT_KEY: &str = "__shortcut";

/// One shortcut.
#[derive(Debug, Clone)]
pub enum ShortcutConfig {
    /// Registers the name for autocomplete only.
    Name(String),
    /// An exact name and the items it expands to.
    Static { name: String, items: Vec<StyleItem> },
    /// Names matching a pattern, with items computed from the match.
    Dynamic {
        rule: DynamicRule<Vec<StyleItem>>,
        autocomplete: Vec<String>,
    },
}

impl ShortcutConfig {
    pub fn name(name: impl Into<String>) -> Self {
        ShortcutConfig::Name(name.into())
    }

    pub fn items<I, T>(name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<StyleItem>,
    {
        ShortcutConfig::Static {
            name: name.into(),
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// A pattern rule keyed by the pattern source.
    pub fn dynamic<F>(pattern: Regex, produce: F) -> Self
    where
        F: Fn(&RuleMatch) -> Result<Vec<StyleItem>, BoxError> + 'static,
    {
        ShortcutConfig::Dynamic {
            rule: DynamicRule::new(pattern.as_str(), pattern.clone(), produce),
            autocomplete: Vec::new(),
        }
    }

    pub fn dynamic_async<F, Fut>(pattern: Regex, produce: F) -> Self
    where
        F: Fn(RuleMatch) -> Fut + 'static,
        Fut: Future<Output = Result<Vec<StyleItem>, BoxError>> + 'static,
    {
        ShortcutConfig::Dynamic {
            rule: DynamicRule::new_async(pattern.as_str(), pattern.clone(), produce),
            autocomplete: Vec::new(),
        }
    }

    /// Sets autocomplete hints of a dynamic entry; ignored for other forms.
    pub fn with_autocomplete<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let ShortcutConfig::Dynamic { autocomplete, .. } = &mut self {
            *autocomplete = hints.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn autocomplete(&self) -> Vec<String> {
        match self {
            ShortcutConfig::Name(name) | ShortcutConfig::Static { name, .. } => vec![name.clone()],
            ShortcutConfig::Dynamic { autocomplete, .. } => autocomplete.clone(),
        }
    }
}

impl From<&str> for ShortcutConfig {
    fn from(name: &str) -> Self {
        ShortcutConfig::name(name)
    }
}

/// `(name, definition)` or `(name, [items…])`.
impl From<(&str, serde_json::Value)> for ShortcutConfig {
    fn from((name, value): (&str, serde_json::Value)) -> Self {
        match value {
            serde_json::Value::Array(items) => ShortcutConfig::items(name, items),
            other => ShortcutConfig::items(name, [other]),
        }
    }
}

impl From<(&str, StyleDefinition)> for ShortcutConfig {
    fn from((name, definition): (&str, StyleDefinition)) -> Self {
        ShortcutConfig::items(name, [definition])
    }
}

/// Configuration of the shortcuts plugin.
#[derive(Debug, Clone, Default)]
pub struct ShortcutsConfig {
    pub shortcuts: Vec<ShortcutConfig>,
}

impl ShortcutsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, shortcut: impl Into<ShortcutConfig>) -> Self {
        self.shortcuts.push(shortcut.into());
        self
    }
}

struct Expander {
    resolver: Rc<Resolver<Vec<StyleItem>>>,
    logger: Logger,
}

impl Expander {
    async fn expand(&self, item: StyleItem) -> Vec<StyleItem> {
        expand_recursive(&*self.resolver, &self.logger, "shortcut", item, |i: &StyleItem| {
            i.as_name()
        })
        .await
    }

    /// Expands `__shortcut` and returns the definitions to emit, the
    /// shortcut definitions first.
    async fn expand_definition(&self, mut definition: StyleDefinition) -> Vec<StyleDefinition> {
        let requested: Vec<StyleItem> = match definition.remove(SHORTCUT_KEY) {
            Some(StyleValue::Value(name)) => vec![StyleItem::Name(name)],
            Some(StyleValue::Fallback(name, more)) => std::iter::once(name)
                .chain(more)
                .map(StyleItem::Name)
                .collect(),
            Some(StyleValue::Items(items)) => items,
            _ => Vec::new(),
        };

        let mut out = Vec::new();
        for item in requested {
            out.extend(
                self.expand(item)
                    .await
                    .into_iter()
                    .filter_map(|item| match item {
                        StyleItem::Definition(definition) => Some(definition),
                        StyleItem::Name(_) => None,
                    }),
            );
        }
        out.push(definition);
        out
    }
}

fn register(engine: &mut Engine, resolver: &Resolver<Vec<StyleItem>>, config: ShortcutConfig) {
    let names = config.autocomplete();
    engine.append_autocomplete_style_item_strings(names.iter().cloned());
    engine.append_autocomplete_property_values(SHORTCUT_KEY, names);
    match config {
        ShortcutConfig::Name(_) => {}
        ShortcutConfig::Static { name, items } => {
            resolver.add_static_rule(StaticRule::new(name, items));
        }
        ShortcutConfig::Dynamic { rule, .. } => {
            resolver.add_dynamic_rule(rule);
        }
    }
}

#[derive(Clone)]
struct ShortcutsHandle(Rc<Resolver<Vec<StyleItem>>>);

pub fn shortcuts(logger: Logger) -> EnginePlugin {
    let resolver: Rc<Resolver<Vec<StyleItem>>> = Rc::new(Resolver::new());
    let expander = Rc::new(Expander {
        resolver: resolver.clone(),
        logger,
    });
    let items_expander = expander.clone();

    let plugin = EnginePlugin::new("core:shortcuts")
        .transform_style_items(move |items| {
            let expander = items_expander.clone();
            async move {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.extend(expander.expand(item).await);
                }
                Ok(Some(out))
            }
        })
        .transform_style_definitions(move |definitions| {
            let expander = expander.clone();
            async move {
                let mut out = Vec::with_capacity(definitions.len());
                for definition in definitions {
                    out.extend(expander.expand_definition(definition).await);
                }
                Ok(Some(out))
            }
        });

    on_configure_engine(plugin, move |engine| {
        engine.append_autocomplete_extra_properties([SHORTCUT_KEY]);
        let config = engine.config().raw_config.shortcuts.clone().unwrap_or_default();
        for shortcut in config.shortcuts {
            register(engine, &resolver, shortcut);
        }
        engine.extensions.insert(ShortcutsHandle(resolver.clone()));
        Ok(())
    })
}

/// Runtime access to the shortcuts plugin, from [`Engine::shortcuts`].
pub struct ShortcutsApi<'a> {
    engine: &'a mut Engine,
    resolver: Rc<Resolver<Vec<StyleItem>>>,
}

impl ShortcutsApi<'_> {
    /// Registers a shortcut. A name already registered is replaced.
    pub fn add(&mut self, shortcut: impl Into<ShortcutConfig>) {
        register(self.engine, &self.resolver, shortcut.into());
    }

    pub fn resolver(&self) -> &Resolver<Vec<StyleItem>> {
        &self.resolver
    }
}

impl Engine {
    /// The shortcuts plugin API, if the plugin is installed.
    pub fn shortcuts(&mut self) -> Option<ShortcutsApi<'_>> {
        let resolver = self.extensions.get::<ShortcutsHandle>()?.0.clone();
        Some(ShortcutsApi {
            engine: self,
            resolver,
        })
    }
}
