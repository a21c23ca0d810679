//! The engine: plugin composition, the atomic style store and rendering.
//!
//! [`create_engine`] runs the full construction sequence; [`Engine::use_styles`]
//! turns style items into atomic class ids; the `render_*` methods produce CSS.
//!
//! ```rust
//! use futures::executor::block_on;
//! use pika::{create_engine, EngineConfig, StyleDefinition};
//! use serde_json::json;
//!
//! let mut engine = block_on(create_engine(EngineConfig::default()));
//! let def = StyleDefinition::try_from(json!({"color": "red", "$:hover": {"color": "blue"}})).unwrap();
//!
//! let ids = block_on(engine.use_styles([def]));
//! assert_eq!(ids, vec!["a", "b"]);
//! assert_eq!(
//!     engine.render_atomic_styles(false, Default::default()),
//!     "@layer utilities {.a{color:red;}.b:hover{color:blue;}}"
//! );
//! ```

mod config;
mod extensions;
mod preflight;
mod store;

use indexmap::IndexSet;

pub use config::{
    resolve_engine_config, AutocompleteConfig, EngineConfig, ResolvedEngineConfig,
    DEFAULT_LAYERS, DEFAULT_PREFLIGHTS_LAYER, DEFAULT_SELECTOR, DEFAULT_UTILITIES_LAYER,
};
pub use extensions::Extensions;
pub use preflight::{
    resolve_preflight, Preflight, PreflightFn, PreflightOutput, PreflightSource,
    ResolvedPreflight,
};
pub use store::{
    number_to_chars, optimize_atomic_style_contents, AtomicStyle, AtomicStyleStore, StyleContent,
};

use crate::extractor::{Extractor, LAYER_KEY};
use crate::logger::Logger;
use crate::plugin::{resolve_plugins, HookPipeline};
use crate::plugins::core_plugins;
use crate::render::{self, RenderAtomicStylesOptions};
use crate::style::StyleItem;

/// Options for [`Engine::render_atomic_styles`].
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Restricts output to these ids; all stored styles when `None`.
    pub atomic_style_ids: Option<Vec<String>>,
    /// Leaves the id placeholder in selectors.
    pub is_preview: bool,
}

impl RenderOptions {
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            atomic_style_ids: Some(ids.into_iter().map(Into::into).collect()),
            is_preview: false,
        }
    }

    pub fn preview(mut self) -> Self {
        self.is_preview = true;
        self
    }
}

/// An atomic CSS engine instance.
///
/// Entry points must be awaited one at a time; the engine is single-owner and
/// not meant for concurrent mutation.
pub struct Engine {
    config: ResolvedEngineConfig,
    pipeline: HookPipeline,
    store: AtomicStyleStore,
    logger: Logger,
    /// Runtime APIs registered by plugins.
    pub extensions: Extensions,
}

/// Builds an engine, running the plugin construction sequence.
///
/// Core plugins (important, variables, keyframes, selectors, shortcuts) come
/// before user plugins within each order bucket.
pub async fn create_engine(mut config: EngineConfig) -> Engine {
    let logger = config.logger.clone().unwrap_or_default();
    config.logger = Some(logger.clone());

    let mut plugins = core_plugins(&logger);
    plugins.append(&mut config.plugins);
    config.plugins = resolve_plugins(plugins);

    let pipeline = HookPipeline::new(config.plugins.clone(), logger.clone());
    logger.debug("Running configureRawConfig hooks");
    let config = pipeline.configure_raw_config(config).await;
    pipeline.raw_config_configured(&config);

    let resolved = resolve_engine_config(config);
    let pipeline = HookPipeline::new(resolved.plugins.clone(), logger.clone());
    logger.debug("Running configureResolvedConfig hooks");
    let resolved = pipeline.configure_resolved_config(resolved).await;

    let mut engine = Engine::new(resolved);
    let layer_names: Vec<String> = engine.config.layers.keys().cloned().collect();
    engine.append_autocomplete_extra_properties([LAYER_KEY]);
    engine.append_autocomplete_property_values(LAYER_KEY, layer_names);

    logger.debug("Running configureEngine hooks");
    let pipeline = engine.pipeline.clone();
    pipeline.configure_engine(&mut engine).await;
    engine
}

impl Engine {
    /// Creates an engine from a resolved config without running any hooks.
    pub fn new(config: ResolvedEngineConfig) -> Self {
        let logger = config.raw_config.logger.clone().unwrap_or_default();
        let pipeline = HookPipeline::new(config.plugins.clone(), logger.clone());
        Self {
            config,
            pipeline,
            store: AtomicStyleStore::new(),
            logger,
            extensions: Extensions::new(),
        }
    }

    pub fn config(&self) -> &ResolvedEngineConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn pipeline(&self) -> &HookPipeline {
        &self.pipeline
    }

    /// Stored styles in creation order.
    pub fn atomic_styles(&self) -> impl Iterator<Item = &AtomicStyle> {
        self.store.iter()
    }

    pub fn atomic_style(&self, id: &str) -> Option<&AtomicStyle> {
        self.store.get(id)
    }

    /// Turns style items into class tokens.
    ///
    /// Names no plugin resolves come first (deduplicated, in order), followed
    /// by the ids of the declarations the definitions produced.
    pub async fn use_styles<I>(&mut self, items: I) -> Vec<String>
    where
        I: IntoIterator,
        I::Item: Into<StyleItem>,
    {
        let items: Vec<StyleItem> = items.into_iter().map(Into::into).collect();
        let items = self.pipeline.transform_style_items(items).await;

        let mut unknown: IndexSet<String> = IndexSet::new();
        let mut contents = Vec::new();
        let extractor = Extractor::new(&self.pipeline, &self.config.default_selector);
        for item in items {
            match item {
                StyleItem::Name(name) => {
                    unknown.insert(name);
                }
                StyleItem::Definition(definition) => {
                    contents.extend(extractor.extract(definition).await);
                }
            }
        }

        let mut ids = Vec::new();
        for content in optimize_atomic_style_contents(contents) {
            let (id, created) = self.store.intern(content, &self.config.prefix);
            if let Some(style) = created {
                self.logger
                    .debug(format!("Atomic style added: {}", style.id));
                self.pipeline.atomic_style_added(&style);
            }
            ids.push(id);
        }
        unknown.into_iter().chain(ids).collect()
    }

    /// Normalizes and appends a preflight, then notifies `preflight_updated`.
    pub fn add_preflight(&mut self, preflight: impl Into<Preflight>) {
        self.config.preflights.push(resolve_preflight(preflight.into()));
        self.notify_preflight_updated();
    }

    /// Fires `preflight_updated` without changing the preflight list.
    pub fn notify_preflight_updated(&self) {
        self.pipeline.preflight_updated();
    }

    /// Renders stored atomic styles, layered per the config.
    pub fn render_atomic_styles(&self, is_formatted: bool, options: RenderOptions) -> String {
        let styles: Vec<&AtomicStyle> = match &options.atomic_style_ids {
            Some(ids) => ids.iter().filter_map(|id| self.store.get(id)).collect(),
            None => self.store.iter().collect(),
        };
        render::render_atomic_styles(
            &styles,
            &RenderAtomicStylesOptions {
                default_selector: &self.config.default_selector,
                is_preview: options.is_preview,
                is_formatted,
                layers: Some(&self.config.layers),
                default_utilities_layer: Some(&self.config.default_utilities_layer),
            },
            &self.logger,
        )
    }

    /// `@layer a, b, c;` for every configured layer.
    pub fn render_layer_order_declaration(&self) -> String {
        render::render_layer_order_declaration(&self.config.layers)
    }

    pub fn append_autocomplete_selectors<I, S>(&mut self, selectors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = &mut self.config.autocomplete.selectors;
        set.extend(selectors.into_iter().map(Into::into));
        self.pipeline.autocomplete_config_updated();
    }

    pub fn append_autocomplete_style_item_strings<I, S>(&mut self, strings: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = &mut self.config.autocomplete.style_item_strings;
        set.extend(strings.into_iter().map(Into::into));
        self.pipeline.autocomplete_config_updated();
    }

    pub fn append_autocomplete_extra_properties<I, S>(&mut self, properties: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = &mut self.config.autocomplete.extra_properties;
        set.extend(properties.into_iter().map(Into::into));
        self.pipeline.autocomplete_config_updated();
    }

    pub fn append_autocomplete_extra_css_properties<I, S>(&mut self, properties: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = &mut self.config.autocomplete.extra_css_properties;
        set.extend(properties.into_iter().map(Into::into));
        self.pipeline.autocomplete_config_updated();
    }

    pub fn append_autocomplete_property_values<I, S>(&mut self, property: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self
            .config
            .autocomplete
            .properties
            .entry(property.to_string())
            .or_default();
        list.extend(values.into_iter().map(Into::into));
        self.pipeline.autocomplete_config_updated();
    }

    pub fn append_autocomplete_css_property_values<I, S>(&mut self, property: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self
            .config
            .autocomplete
            .css_properties
            .entry(property.to_string())
            .or_default();
        list.extend(values.into_iter().map(Into::into));
        self.pipeline.autocomplete_config_updated();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("atomic_styles", &self.store.len())
            .field("extensions", &self.extensions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogLevel, MemorySink};
    use crate::plugin::{EnginePlugin, HookError, PluginOrder};
    use crate::style::StyleDefinition;
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn def(value: serde_json::Value) -> StyleItem {
        StyleItem::from(value)
    }

    fn engine_with(config: EngineConfig) -> Engine {
        block_on(create_engine(config))
    }

    #[test]
    fn test_create_engine_defaults() {
        let engine = engine_with(EngineConfig::default());
        assert_eq!(engine.config().prefix, "");
        assert_eq!(engine.config().default_selector, ".%");
        let names: Vec<_> = engine.config().plugins.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            vec!["core:variables", "core:keyframes", "core:selectors", "core:shortcuts", "core:important"]
        );
        assert!(engine.config().autocomplete.extra_properties.contains("__layer"));
        assert_eq!(
            engine.config().autocomplete.properties.get("__layer"),
            Some(&vec!["preflights".to_string(), "utilities".to_string()])
        );
    }

    #[test]
    fn test_use_same_definition_twice_returns_same_ids() {
        let mut engine = engine_with(EngineConfig::default());
        let first = block_on(engine.use_styles([def(json!({"color": "red"}))]));
        let second = block_on(engine.use_styles([def(json!({"color": "red"}))]));
        assert_eq!(first, vec!["a"]);
        assert_eq!(first, second);
        assert_eq!(engine.atomic_styles().count(), 1);
    }

    #[test]
    fn test_different_values_get_disjoint_ids() {
        let mut engine = engine_with(EngineConfig::default());
        let red = block_on(engine.use_styles([def(json!({"color": "red"}))]));
        let blue = block_on(engine.use_styles([def(json!({"color": "blue"}))]));
        assert_eq!(red, vec!["a"]);
        assert_eq!(blue, vec!["b"]);
    }

    #[test]
    fn test_unknown_names_come_first_and_dedup() {
        let mut engine = engine_with(EngineConfig::default());
        let ids = block_on(engine.use_styles([
            def(json!({"color": "red"})),
            "foo".into(),
            "bar".into(),
            "foo".into(),
        ]));
        assert_eq!(ids, vec!["foo", "bar", "a"]);
    }

    #[test]
    fn test_batch_override_and_delete() {
        let mut engine = engine_with(EngineConfig::default());
        let ids = block_on(engine.use_styles([
            def(json!({"color": "red", "display": "flex"})),
            def(json!({"color": "blue", "display": null})),
        ]));
        assert_eq!(ids.len(), 1);
        assert_eq!(engine.atomic_style(&ids[0]).unwrap().content.value, vec!["blue"]);
    }

    #[test]
    fn test_prefix_is_applied() {
        let mut engine = engine_with(EngineConfig::new().with_prefix("pk-"));
        let ids = block_on(engine.use_styles([def(json!({"color": "red"}))]));
        assert_eq!(ids, vec!["pk-a"]);
    }

    #[test]
    fn test_layer_key_tags_declarations() {
        let mut engine = engine_with(EngineConfig::new().with_layer("components", 0));
        let ids = block_on(engine.use_styles([def(json!({"__layer": "components", "color": "red"}))]));
        let style = engine.atomic_style(&ids[0]).unwrap();
        assert_eq!(style.content.layer.as_deref(), Some("components"));
        assert_eq!(
            engine.render_atomic_styles(false, RenderOptions::default()),
            "@layer components {.a{color:red;}}"
        );
    }

    #[test]
    fn test_atomic_style_added_fires_once_per_new_style() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let plugin = EnginePlugin::new("watch").atomic_style_added(move |style| {
            sink.borrow_mut().push(style.id.clone());
            Ok(())
        });
        let mut engine = engine_with(EngineConfig::new().with_plugin(plugin));

        block_on(engine.use_styles([def(json!({"color": "red"}))]));
        block_on(engine.use_styles([def(json!({"color": "red", "top": 0}))]));
        assert_eq!(*seen.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_construction_hook_order() {
        let log = Rc::new(RefCell::new(Vec::<String>::new()));
        let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
        let plugin = EnginePlugin::new("trace")
            .configure_raw_config(move |config| {
                a.borrow_mut().push("configureRawConfig".into());
                async move { Ok(Some(config.with_prefix("t-"))) }
            })
            .raw_config_configured(move |config| {
                b.borrow_mut().push(format!("rawConfigConfigured:{:?}", config.prefix));
                Ok(())
            })
            .configure_resolved_config(move |resolved| {
                c.borrow_mut().push("configureResolvedConfig".into());
                async move { Ok(Some(resolved)) }
            })
            .configure_engine(move |engine| {
                d.borrow_mut().push(format!("configureEngine:{}", engine.config().prefix));
                Box::pin(async { Ok(()) })
            });

        engine_with(EngineConfig::new().with_plugin(plugin));
        assert_eq!(
            *log.borrow(),
            vec![
                "configureRawConfig".to_string(),
                "rawConfigConfigured:Some(\"t-\")".to_string(),
                "configureResolvedConfig".to_string(),
                "configureEngine:t-".to_string(),
            ]
        );
    }

    #[test]
    fn test_user_plugins_sort_around_core() {
        let engine = engine_with(
            EngineConfig::new()
                .with_plugin(EnginePlugin::new("post").with_order(PluginOrder::Post))
                .with_plugin(EnginePlugin::new("pre").with_order(PluginOrder::Pre)),
        );
        let names: Vec<_> = engine.config().plugins.iter().map(|p| p.name()).collect();
        assert_eq!(names.first(), Some(&"pre"));
        assert_eq!(names.last(), Some(&"post"));
    }

    #[test]
    fn test_failing_hook_does_not_break_use() {
        let sink = Rc::new(MemorySink::new());
        let plugin = EnginePlugin::new("broken")
            .transform_style_items(|_| async { Err(HookError::new("broken items")) });
        let mut engine = engine_with(
            EngineConfig::new()
                .with_plugin(plugin)
                .with_logger(Logger::with_sink("[t]", sink.clone())),
        );

        let ids = block_on(engine.use_styles([def(json!({"color": "red"}))]));
        assert_eq!(ids, vec!["a"]);
        assert!(!sink.messages(LogLevel::Error).is_empty());
    }

    #[test]
    fn test_add_preflight_notifies() {
        let count = Rc::new(RefCell::new(0));
        let counter = count.clone();
        let plugin = EnginePlugin::new("watch").preflight_updated(move || {
            *counter.borrow_mut() += 1;
            Ok(())
        });
        let mut engine = engine_with(EngineConfig::new().with_plugin(plugin));
        let before = *count.borrow();

        engine.add_preflight("html{color:black;}");
        assert_eq!(*count.borrow(), before + 1);
        assert_eq!(
            block_on(engine.render_preflights(false)),
            "@layer preflights {html{color:black;}}"
        );
    }

    #[test]
    fn test_render_preflights_layers_and_fallback() {
        let sink = Rc::new(MemorySink::new());
        let engine = engine_with(
            EngineConfig::new()
                .with_layer("base", 0)
                .with_logger(Logger::with_sink("[t]", sink.clone()))
                .with_preflight(Preflight::css("a{}b{}").with_layer("missing"))
                .with_preflight(Preflight::css(".reset{margin:0;}").with_layer("base"))
                .with_preflight(
                    StyleDefinition::try_from(json!({"body": {"lineHeight": "1.5"}})).unwrap(),
                ),
        );

        assert_eq!(
            block_on(engine.render_preflights(false)),
            "@layer base {.reset{margin:0;}}@layer preflights {a{}b{}body{line-height:1.5;}}"
        );
        assert_eq!(sink.messages(LogLevel::Warn).len(), 1);
    }

    #[test]
    fn test_render_preflights_without_preflights_layer() {
        let engine = engine_with(
            EngineConfig::new()
                .with_default_preflights_layer("reset")
                .with_preflight("html{margin:0;}"),
        );
        assert_eq!(block_on(engine.render_preflights(true)), "html{margin:0;}");
    }

    #[test]
    fn test_render_selected_ids_and_preview() {
        let mut engine = engine_with(EngineConfig::default());
        let ids = block_on(engine.use_styles([def(json!({"color": "red", "top": 0}))]));

        assert_eq!(
            engine.render_atomic_styles(false, RenderOptions::ids([ids[1].clone()])),
            "@layer utilities {.b{top:0;}}"
        );
        assert_eq!(
            engine.render_atomic_styles(false, RenderOptions::ids(["a"]).preview()),
            "@layer utilities {.%{color:red;}}"
        );
    }

    #[test]
    fn test_layer_order_declaration() {
        let engine = engine_with(
            EngineConfig::new()
                .with_layer("utilities", 1)
                .with_layer("components", 0),
        );
        assert_eq!(
            engine.render_layer_order_declaration(),
            "@layer components, preflights, utilities;"
        );
    }

    #[test]
    fn test_autocomplete_appends_notify() {
        let count = Rc::new(RefCell::new(0));
        let counter = count.clone();
        let plugin = EnginePlugin::new("watch").autocomplete_config_updated(move || {
            *counter.borrow_mut() += 1;
            Ok(())
        });
        let mut engine = engine_with(EngineConfig::new().with_plugin(plugin));
        let before = *count.borrow();

        engine.append_autocomplete_selectors(["hover"]);
        engine.append_autocomplete_style_item_strings(["flex-center"]);
        engine.append_autocomplete_extra_css_properties(["--brand"]);
        engine.append_autocomplete_css_property_values("color", ["var(--brand)"]);

        assert_eq!(*count.borrow(), before + 4);
        let ac = &engine.config().autocomplete;
        assert!(ac.selectors.contains("hover"));
        assert!(ac.style_item_strings.contains("flex-center"));
        assert!(ac.extra_css_properties.contains("--brand"));
        assert_eq!(ac.css_properties.get("color"), Some(&vec!["var(--brand)".to_string()]));
    }
}
