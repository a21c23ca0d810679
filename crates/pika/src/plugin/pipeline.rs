//! Ordered, fault-isolated hook dispatch.

use std::fmt;
use std::rc::Rc;

use super::{EnginePlugin, HookError, HookName, HookResult, TransformFn};
use crate::engine::{AtomicStyle, Engine, EngineConfig, ResolvedEngineConfig};
use crate::logger::Logger;
use crate::style::{StyleDefinition, StyleItem};

/// Runs hooks across an already-sorted plugin list.
///
/// Every plugin filling a slot is invoked in list order. A failing plugin is
/// logged and skipped; it never aborts the rest of the chain.
#[derive(Clone)]
pub struct HookPipeline {
    plugins: Rc<[EnginePlugin]>,
    logger: Logger,
}

impl HookPipeline {
    /// Creates a pipeline over `plugins`, which must already be sorted.
    pub fn new(plugins: impl Into<Rc<[EnginePlugin]>>, logger: Logger) -> Self {
        Self {
            plugins: plugins.into(),
            logger,
        }
    }

    pub fn plugins(&self) -> &[EnginePlugin] {
        &self.plugins
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub async fn configure_raw_config(&self, config: EngineConfig) -> EngineConfig {
        self.run_transform(HookName::ConfigureRawConfig, config, |p| {
            p.configure_raw_config.as_ref()
        })
        .await
    }

    pub fn raw_config_configured(&self, config: &EngineConfig) {
        self.run_notify(HookName::RawConfigConfigured, |p| {
            p.raw_config_configured.as_ref().map(|hook| hook(config))
        });
    }

    pub async fn configure_resolved_config(
        &self,
        config: ResolvedEngineConfig,
    ) -> ResolvedEngineConfig {
        self.run_transform(HookName::ConfigureResolvedConfig, config, |p| {
            p.configure_resolved_config.as_ref()
        })
        .await
    }

    /// Runs `configure_engine` hooks against `engine`.
    pub async fn configure_engine(&self, engine: &mut Engine) {
        for plugin in self.plugins.iter() {
            let Some(hook) = plugin.configure_engine.as_ref() else {
                continue;
            };
            self.trace(plugin, HookName::ConfigureEngine);
            if let Err(err) = hook(&mut *engine).await {
                self.report(plugin, HookName::ConfigureEngine, &err);
            }
        }
    }

    pub async fn transform_selectors(&self, selectors: Vec<String>) -> Vec<String> {
        self.run_transform(HookName::TransformSelectors, selectors, |p| {
            p.transform_selectors.as_ref()
        })
        .await
    }

    pub async fn transform_style_items(&self, items: Vec<StyleItem>) -> Vec<StyleItem> {
        self.run_transform(HookName::TransformStyleItems, items, |p| {
            p.transform_style_items.as_ref()
        })
        .await
    }

    pub async fn transform_style_definitions(
        &self,
        definitions: Vec<StyleDefinition>,
    ) -> Vec<StyleDefinition> {
        self.run_transform(HookName::TransformStyleDefinitions, definitions, |p| {
            p.transform_style_definitions.as_ref()
        })
        .await
    }

    pub fn preflight_updated(&self) {
        self.run_notify(HookName::PreflightUpdated, |p| {
            p.preflight_updated.as_ref().map(|hook| hook())
        });
    }

    pub fn atomic_style_added(&self, style: &AtomicStyle) {
        self.run_notify(HookName::AtomicStyleAdded, |p| {
            p.atomic_style_added.as_ref().map(|hook| hook(style))
        });
    }

    pub fn autocomplete_config_updated(&self) {
        self.run_notify(HookName::AutocompleteConfigUpdated, |p| {
            p.autocomplete_config_updated.as_ref().map(|hook| hook())
        });
    }

    async fn run_transform<T, S>(&self, name: HookName, payload: T, slot: S) -> T
    where
        T: Clone + 'static,
        S: Fn(&EnginePlugin) -> Option<&TransformFn<T>>,
    {
        let mut current = payload;
        for plugin in self.plugins.iter() {
            let Some(hook) = slot(plugin) else {
                continue;
            };
            self.trace(plugin, name);
            match hook(current.clone()).await {
                Ok(Some(next)) => current = next,
                Ok(None) => {}
                Err(err) => self.report(plugin, name, &err),
            }
        }
        current
    }

    fn run_notify<C>(&self, name: HookName, call: C)
    where
        C: Fn(&EnginePlugin) -> Option<HookResult<()>>,
    {
        for plugin in self.plugins.iter() {
            if let Some(Err(err)) = call(plugin) {
                self.report(plugin, name, &err);
            }
        }
    }

    fn trace(&self, plugin: &EnginePlugin, name: HookName) {
        self.logger
            .debug(format!("Executing hook {} of plugin \"{}\"", name, plugin.name()));
    }

    fn report(&self, plugin: &EnginePlugin, name: HookName, err: &HookError) {
        self.logger.error(format!(
            "Plugin \"{}\" failed to execute hook {}: {}",
            plugin.name(),
            name,
            err
        ));
    }
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookPipeline")
            .field("plugin_count", &self.plugins.len())
            .finish()
    }
}
