//! Plugin contract.
//!
//! A plugin is an [`EnginePlugin`] value: a name, an [`PluginOrder`] bucket and
//! any subset of the hook slots below, each filled through a builder method.
//!
//! # Hook Points
//!
//! Transform hooks receive the current payload and may return a replacement.
//! `Ok(None)` keeps the payload; an error is logged and also keeps it.
//!
//! - `configure_raw_config`: the user config before resolution.
//! - `configure_resolved_config`: the resolved config before the engine exists.
//! - `configure_engine`: mutable access to the freshly built engine.
//! - `transform_selectors`: selector strings met while flattening.
//! - `transform_style_items`: item lists passed to `use_styles` or nested
//!   under a selector.
//! - `transform_style_definitions`: each definition before it is flattened.
//!
//! Notify hooks observe without a payload to return:
//!
//! - `raw_config_configured`, `preflight_updated`, `atomic_style_added`,
//!   `autocomplete_config_updated`.
//!
//! ```text
//! core plugins + user plugins
//!   → sort by order (pre, default, post; stable)
//!   → configure_raw_config* → raw_config_configured
//!   → resolve config → configure_resolved_config*
//!   → Engine::new → configure_engine*
//! ```

mod pipeline;

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use thiserror::Error;

pub use pipeline::HookPipeline;

use crate::engine::{AtomicStyle, Engine, EngineConfig, ResolvedEngineConfig};
use crate::style::{StyleDefinition, StyleItem};

/// Identifies a hook, used in log messages and capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    ConfigureRawConfig,
    RawConfigConfigured,
    ConfigureResolvedConfig,
    ConfigureEngine,
    TransformSelectors,
    TransformStyleItems,
    TransformStyleDefinitions,
    PreflightUpdated,
    AtomicStyleAdded,
    AutocompleteConfigUpdated,
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookName::ConfigureRawConfig => "configureRawConfig",
            HookName::RawConfigConfigured => "rawConfigConfigured",
            HookName::ConfigureResolvedConfig => "configureResolvedConfig",
            HookName::ConfigureEngine => "configureEngine",
            HookName::TransformSelectors => "transformSelectors",
            HookName::TransformStyleItems => "transformStyleItems",
            HookName::TransformStyleDefinitions => "transformStyleDefinitions",
            HookName::PreflightUpdated => "preflightUpdated",
            HookName::AtomicStyleAdded => "atomicStyleAdded",
            HookName::AutocompleteConfigUpdated => "autocompleteConfigUpdated",
        };
        f.write_str(name)
    }
}

/// Error returned by a hook.
#[derive(Debug, Error)]
#[error("hook error: {message}")]
pub struct HookError {
    /// Human-readable error message
    pub message: String,
    /// The underlying error source, if any
    #[source]
    pub source: Option<Box<dyn std::error::Error + 'static>>,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + 'static>>,
    {
        self.source = Some(source.into());
        self
    }
}

/// Result type for hook implementations.
pub type HookResult<T> = std::result::Result<T, HookError>;

/// Sorting bucket of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PluginOrder {
    Pre,
    #[default]
    Default,
    Post,
}

impl PluginOrder {
    /// Sort weight: `Pre` = 0, `Default` = 1, `Post` = 2.
    pub fn weight(self) -> u8 {
        match self {
            PluginOrder::Pre => 0,
            PluginOrder::Default => 1,
            PluginOrder::Post => 2,
        }
    }
}

/// Type alias for payload-transforming hooks.
pub type TransformFn<T> = Rc<dyn Fn(T) -> LocalBoxFuture<'static, HookResult<Option<T>>>>;

/// Type alias for the `configure_engine` hook.
pub type ConfigureEngineFn =
    Rc<dyn for<'a> Fn(&'a mut Engine) -> LocalBoxFuture<'a, HookResult<()>>>;

/// Type alias for the `raw_config_configured` hook.
pub type RawConfigConfiguredFn = Rc<dyn Fn(&EngineConfig) -> HookResult<()>>;

/// Type alias for the `atomic_style_added` hook.
pub type AtomicStyleAddedFn = Rc<dyn Fn(&AtomicStyle) -> HookResult<()>>;

/// Type alias for payload-less notify hooks.
///
/// Notify hooks are synchronous: they fire from `add_preflight` and the
/// autocomplete setters, which do not await. A hook with async follow-up work
/// records the event and lets its host drive that work.
pub type NotifyFn = Rc<dyn Fn() -> HookResult<()>>;

fn transform<T, F, Fut>(f: F) -> TransformFn<T>
where
    T: 'static,
    F: Fn(T) -> Fut + 'static,
    Fut: Future<Output = HookResult<Option<T>>> + 'static,
{
    Rc::new(move |payload| f(payload).boxed_local())
}

/// A named bundle of optional hook implementations.
#[derive(Clone, Default)]
pub struct EnginePlugin {
    name: String,
    order: PluginOrder,
    pub(crate) configure_raw_config: Option<TransformFn<EngineConfig>>,
    pub(crate) raw_config_configured: Option<RawConfigConfiguredFn>,
    pub(crate) configure_resolved_config: Option<TransformFn<ResolvedEngineConfig>>,
    pub(crate) configure_engine: Option<ConfigureEngineFn>,
    pub(crate) transform_selectors: Option<TransformFn<Vec<String>>>,
    pub(crate) transform_style_items: Option<TransformFn<Vec<StyleItem>>>,
    pub(crate) transform_style_definitions: Option<TransformFn<Vec<StyleDefinition>>>,
    pub(crate) preflight_updated: Option<NotifyFn>,
    pub(crate) atomic_style_added: Option<AtomicStyleAddedFn>,
    pub(crate) autocomplete_config_updated: Option<NotifyFn>,
}

impl EnginePlugin {
    /// Creates a plugin with no hooks in the default order bucket.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> PluginOrder {
        self.order
    }

    /// Sets the order bucket.
    pub fn with_order(mut self, order: PluginOrder) -> Self {
        self.order = order;
        self
    }

    /// Returns true if the plugin fills the `hook` slot.
    pub fn implements(&self, hook: HookName) -> bool {
        match hook {
            HookName::ConfigureRawConfig => self.configure_raw_config.is_some(),
            HookName::RawConfigConfigured => self.raw_config_configured.is_some(),
            HookName::ConfigureResolvedConfig => self.configure_resolved_config.is_some(),
            HookName::ConfigureEngine => self.configure_engine.is_some(),
            HookName::TransformSelectors => self.transform_selectors.is_some(),
            HookName::TransformStyleItems => self.transform_style_items.is_some(),
            HookName::TransformStyleDefinitions => self.transform_style_definitions.is_some(),
            HookName::PreflightUpdated => self.preflight_updated.is_some(),
            HookName::AtomicStyleAdded => self.atomic_style_added.is_some(),
            HookName::AutocompleteConfigUpdated => self.autocomplete_config_updated.is_some(),
        }
    }

    pub fn configure_raw_config<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(EngineConfig) -> Fut + 'static,
        Fut: Future<Output = HookResult<Option<EngineConfig>>> + 'static,
    {
        self.configure_raw_config = Some(transform(f));
        self
    }

    pub fn raw_config_configured<F>(mut self, f: F) -> Self
    where
        F: Fn(&EngineConfig) -> HookResult<()> + 'static,
    {
        self.raw_config_configured = Some(Rc::new(f));
        self
    }

    pub fn configure_resolved_config<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ResolvedEngineConfig) -> Fut + 'static,
        Fut: Future<Output = HookResult<Option<ResolvedEngineConfig>>> + 'static,
    {
        self.configure_resolved_config = Some(transform(f));
        self
    }

    /// Adds the `configure_engine` hook.
    ///
    /// The hook borrows the engine for the duration of its future, so it
    /// returns a boxed future tied to that borrow:
    ///
    /// ```rust
    /// use pika::EnginePlugin;
    ///
    /// let plugin = EnginePlugin::new("reset").configure_engine(|engine| {
    ///     Box::pin(async move {
    ///         engine.add_preflight("*{margin:0;}");
    ///         Ok(())
    ///     })
    /// });
    /// # let _ = plugin;
    /// ```
    pub fn configure_engine<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Engine) -> LocalBoxFuture<'a, HookResult<()>> + 'static,
    {
        self.configure_engine = Some(Rc::new(f));
        self
    }

    pub fn transform_selectors<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Vec<String>) -> Fut + 'static,
        Fut: Future<Output = HookResult<Option<Vec<String>>>> + 'static,
    {
        self.transform_selectors = Some(transform(f));
        self
    }

    pub fn transform_style_items<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Vec<StyleItem>) -> Fut + 'static,
        Fut: Future<Output = HookResult<Option<Vec<StyleItem>>>> + 'static,
    {
        self.transform_style_items = Some(transform(f));
        self
    }

    pub fn transform_style_definitions<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Vec<StyleDefinition>) -> Fut + 'static,
        Fut: Future<Output = HookResult<Option<Vec<StyleDefinition>>>> + 'static,
    {
        self.transform_style_definitions = Some(transform(f));
        self
    }

    pub fn preflight_updated<F>(mut self, f: F) -> Self
    where
        F: Fn() -> HookResult<()> + 'static,
    {
        self.preflight_updated = Some(Rc::new(f));
        self
    }

    pub fn atomic_style_added<F>(mut self, f: F) -> Self
    where
        F: Fn(&AtomicStyle) -> HookResult<()> + 'static,
    {
        self.atomic_style_added = Some(Rc::new(f));
        self
    }

    pub fn autocomplete_config_updated<F>(mut self, f: F) -> Self
    where
        F: Fn() -> HookResult<()> + 'static,
    {
        self.autocomplete_config_updated = Some(Rc::new(f));
        self
    }
}

impl fmt::Debug for EnginePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const ALL: [HookName; 10] = [
            HookName::ConfigureRawConfig,
            HookName::RawConfigConfigured,
            HookName::ConfigureResolvedConfig,
            HookName::ConfigureEngine,
            HookName::TransformSelectors,
            HookName::TransformStyleItems,
            HookName::TransformStyleDefinitions,
            HookName::PreflightUpdated,
            HookName::AtomicStyleAdded,
            HookName::AutocompleteConfigUpdated,
        ];
        let hooks: Vec<String> = ALL
            .iter()
            .filter(|hook| self.implements(**hook))
            .map(ToString::to_string)
            .collect();
        f.debug_struct("EnginePlugin")
            .field("name", &self.name)
            .field("order", &self.order)
            .field("hooks", &hooks)
            .finish()
    }
}

/// Sorts plugins by order bucket, keeping registration order within a bucket.
pub fn resolve_plugins(mut plugins: Vec<EnginePlugin>) -> Vec<EnginePlugin> {
    plugins.sort_by_key(|plugin| plugin.order.weight());
    plugins
}
