//! Named selector aliases.
//!
//! A selector key such as `hover` or `screen-768` is looked up in a resolver
//! and replaced by one or more selector strings before flattening. `$` in a
//! replacement stands for the element's own selector; a replacement may be
//! another alias, which is expanded in turn.

use std::future::Future;
use std::rc::Rc;

use pika_resolver::{BoxError, DynamicRule, Regex, Resolver, RuleMatch, StaticRule};

use super::{expand_recursive, on_configure_engine};
use crate::engine::Engine;
use crate::logger::Logger;
use crate::plugin::EnginePlugin;

/// One selector alias.
#[derive(Debug, Clone)]
pub enum SelectorConfig {
    /// Registers the name for autocomplete only.
    Name(String),
    /// An exact name and its replacements.
    Static {
        name: String,
        replacements: Vec<String>,
    },
    /// Names matching a pattern, with replacements computed from the match.
    Dynamic {
        rule: DynamicRule<Vec<String>>,
        autocomplete: Vec<String>,
    },
}

impl SelectorConfig {
    pub fn name(name: impl Into<String>) -> Self {
        SelectorConfig::Name(name.into())
    }

    pub fn replace<I, S>(name: impl Into<String>, replacements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectorConfig::Static {
            name: name.into(),
            replacements: replacements.into_iter().map(Into::into).collect(),
        }
    }

    /// A pattern rule keyed by the pattern source.
    pub fn dynamic<F>(pattern: Regex, produce: F) -> Self
    where
        F: Fn(&RuleMatch) -> Result<Vec<String>, BoxError> + 'static,
    {
        SelectorConfig::Dynamic {
            rule: DynamicRule::new(pattern.as_str(), pattern.clone(), produce),
            autocomplete: Vec::new(),
        }
    }

    pub fn dynamic_async<F, Fut>(pattern: Regex, produce: F) -> Self
    where
        F: Fn(RuleMatch) -> Fut + 'static,
        Fut: Future<Output = Result<Vec<String>, BoxError>> + 'static,
    {
        SelectorConfig::Dynamic {
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
        if let SelectorConfig::Dynamic { autocomplete, .. } = &mut self {
            *autocomplete = hints.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Selector strings suggested to editors for this entry.
    pub fn autocomplete(&self) -> Vec<String> {
        match self {
            SelectorConfig::Name(name) | SelectorConfig::Static { name, .. } => vec![name.clone()],
            SelectorConfig::Dynamic { autocomplete, .. } => autocomplete.clone(),
        }
    }
}

impl From<&str> for SelectorConfig {
    fn from(name: &str) -> Self {
        SelectorConfig::name(name)
    }
}

impl<S: Into<String>> From<(&str, S)> for SelectorConfig {
    fn from((name, replacement): (&str, S)) -> Self {
        SelectorConfig::replace(name, [replacement])
    }
}

/// Configuration of the selectors plugin.
#[derive(Debug, Clone, Default)]
pub struct SelectorsConfig {
    pub selectors: Vec<SelectorConfig>,
}

impl SelectorsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, selector: impl Into<SelectorConfig>) -> Self {
        self.selectors.push(selector.into());
        self
    }
}

fn register(engine: &mut Engine, resolver: &Resolver<Vec<String>>, config: SelectorConfig) {
    engine.append_autocomplete_selectors(config.autocomplete());
    match config {
        SelectorConfig::Name(_) => {}
        SelectorConfig::Static { name, replacements } => {
            resolver.add_static_rule(StaticRule::new(name, replacements));
        }
        SelectorConfig::Dynamic { rule, .. } => {
            resolver.add_dynamic_rule(rule);
        }
    }
}

#[derive(Clone)]
struct SelectorsHandle(Rc<Resolver<Vec<String>>>);

pub fn selectors(logger: Logger) -> EnginePlugin {
    let resolver: Rc<Resolver<Vec<String>>> = Rc::new(Resolver::new());
    let hook_resolver = resolver.clone();

    let plugin = EnginePlugin::new("core:selectors").transform_selectors(move |selectors| {
        let resolver = hook_resolver.clone();
        let logger = logger.clone();
        async move {
            let mut out = Vec::with_capacity(selectors.len());
            for selector in selectors {
                out.extend(
                    expand_recursive(&*resolver, &logger, "selector", selector, |s: &String| {
                        Some(s.as_str())
                    })
                    .await,
                );
            }
            Ok(Some(out))
        }
    });

    on_configure_engine(plugin, move |engine| {
        let config = engine.config().raw_config.selectors.clone().unwrap_or_default();
        for selector in config.selectors {
            register(engine, &resolver, selector);
        }
        engine.extensions.insert(SelectorsHandle(resolver.clone()));
        Ok(())
    })
}

/// Runtime access to the selectors plugin, from [`Engine::selectors`].
pub struct SelectorsApi<'a> {
    engine: &'a mut Engine,
    resolver: Rc<Resolver<Vec<String>>>,
}

impl SelectorsApi<'_> {
    /// Registers an alias. A name already registered is replaced.
    pub fn add(&mut self, selector: impl Into<SelectorConfig>) {
        register(self.engine, &self.resolver, selector.into());
    }

    pub fn resolver(&self) -> &Resolver<Vec<String>> {
        &self.resolver
    }
}

impl Engine {
    /// The selectors plugin API, if the plugin is installed.
    pub fn selectors(&mut self) -> Option<SelectorsApi<'_>> {
        let resolver = self.extensions.get::<SelectorsHandle>()?.0.clone();
        Some(SelectorsApi {
            engine: self,
            resolver,
        })
    }
}
