//! Preflights: global CSS rendered ahead of atomic styles.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use indexmap::IndexMap;

use super::Engine;
use crate::extractor::{normalize_selectors, normalize_value, to_kebab_case};
use crate::render::{render_css_style_blocks, sort_layer_names, CssStyleBlocks};
use crate::style::{StyleDefinition, StyleValue};

/// What a preflight produces when rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum PreflightOutput {
    /// Raw CSS emitted verbatim.
    Css(String),
    /// Selector → properties tree rendered through the block renderer.
    Definition(StyleDefinition),
}

/// Type alias for preflight render functions.
pub type PreflightFn =
    Rc<dyn for<'a> Fn(&'a Engine, bool) -> LocalBoxFuture<'a, PreflightOutput>>;

fn preflight_fn<F>(f: F) -> PreflightFn
where
    F: for<'a> Fn(&'a Engine, bool) -> LocalBoxFuture<'a, PreflightOutput> + 'static,
{
    Rc::new(f)
}

/// Source of a preflight before normalization.
#[derive(Clone)]
pub enum PreflightSource {
    Css(String),
    Definition(StyleDefinition),
    Fn(PreflightFn),
}

/// A preflight, optionally assigned to a cascade layer.
#[derive(Clone)]
pub struct Preflight {
    pub layer: Option<String>,
    pub source: PreflightSource,
}

impl Preflight {
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            layer: None,
            source: PreflightSource::Css(css.into()),
        }
    }

    pub fn definition(definition: StyleDefinition) -> Self {
        Self {
            layer: None,
            source: PreflightSource::Definition(definition),
        }
    }

    /// A preflight computed from the engine state at render time.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Engine, bool) -> PreflightOutput + 'static,
    {
        Self {
            layer: None,
            source: PreflightSource::Fn(preflight_fn(move |engine, formatted| {
                let output = f(engine, formatted);
                async move { output }.boxed_local()
            })),
        }
    }

    /// Like [`Preflight::from_fn`] with an asynchronous body.
    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(bool) -> Fut + 'static,
        Fut: Future<Output = PreflightOutput> + 'static,
    {
        Self {
            layer: None,
            source: PreflightSource::Fn(preflight_fn(move |_, formatted| {
                f(formatted).boxed_local()
            })),
        }
    }

    /// Asynchronous preflight that reads the engine while rendering.
    pub fn from_engine_async_fn<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a Engine, bool) -> LocalBoxFuture<'a, PreflightOutput> + 'static,
    {
        Self {
            layer: None,
            source: PreflightSource::Fn(preflight_fn(f)),
        }
    }

    /// Wraps the preflight into `layer`.
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }
}

impl From<&str> for Preflight {
    fn from(css: &str) -> Self {
        Preflight::css(css)
    }
}

impl From<String> for Preflight {
    fn from(css: String) -> Self {
        Preflight::css(css)
    }
}

impl From<StyleDefinition> for Preflight {
    fn from(definition: StyleDefinition) -> Self {
        Preflight::definition(definition)
    }
}

impl fmt::Debug for Preflight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.source {
            PreflightSource::Css(_) => "css",
            PreflightSource::Definition(_) => "definition",
            PreflightSource::Fn(_) => "fn",
        };
        f.debug_struct("Preflight")
            .field("layer", &self.layer)
            .field("kind", &kind)
            .finish()
    }
}

/// A preflight normalized to `{layer, render}`.
#[derive(Clone)]
pub struct ResolvedPreflight {
    pub layer: Option<String>,
    pub render: PreflightFn,
}

impl fmt::Debug for ResolvedPreflight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedPreflight")
            .field("layer", &self.layer)
            .finish_non_exhaustive()
    }
}

/// Normalizes any preflight form into a render function.
pub fn resolve_preflight(preflight: Preflight) -> ResolvedPreflight {
    let render: PreflightFn = match preflight.source {
        PreflightSource::Fn(f) => f,
        PreflightSource::Css(css) => preflight_fn(move |_, _| {
            futures::future::ready(PreflightOutput::Css(css.clone())).boxed_local()
        }),
        PreflightSource::Definition(def) => preflight_fn(move |_, _| {
            futures::future::ready(PreflightOutput::Definition(def.clone())).boxed_local()
        }),
    };
    ResolvedPreflight {
        layer: preflight.layer,
        render,
    }
}

impl Engine {
    /// Renders every preflight.
    ///
    /// Unlayered preflights go into the default preflights layer when that
    /// layer is configured and are emitted bare otherwise, ahead of all layer
    /// blocks. A preflight naming an unconfigured layer is treated as
    /// unlayered with a warning.
    pub async fn render_preflights(&self, is_formatted: bool) -> String {
        let line_end = if is_formatted { "\n" } else { "" };
        let layers = &self.config().layers;
        let default_layer = &self.config().default_preflights_layer;
        let wrap_unlayered = layers.contains_key(default_layer);

        let mut unlayered: Vec<String> = Vec::new();
        let mut layered: IndexMap<String, Vec<String>> = IndexMap::new();
        for preflight in &self.config().preflights {
            let css = match (preflight.render)(self, is_formatted).await {
                PreflightOutput::Css(css) => css,
                PreflightOutput::Definition(def) => {
                    self.render_preflight_definition(def, is_formatted).await
                }
            };
            if css.trim().is_empty() {
                continue;
            }
            let layer = match &preflight.layer {
                Some(layer) if layers.contains_key(layer) => Some(layer.clone()),
                Some(layer) => {
                    self.logger().warn(format!(
                        "Unknown layer \"{}\" encountered in preflight; falling back to unlayered output.",
                        layer
                    ));
                    None
                }
                None => None,
            };
            match layer.or_else(|| wrap_unlayered.then(|| default_layer.clone())) {
                Some(layer) => layered.entry(layer).or_default().push(css),
                None => unlayered.push(css),
            }
        }

        let mut parts = Vec::new();
        if !unlayered.is_empty() {
            parts.push(unlayered.join(line_end));
        }
        for name in sort_layer_names(layers) {
            if let Some(chunks) = layered.get(&name) {
                parts.push(format!(
                    "@layer {} {{{}{}{}}}",
                    name,
                    line_end,
                    chunks.join(line_end),
                    line_end
                ));
            }
        }
        parts.join(line_end)
    }

    /// Renders a selector → properties tree, resolving selectors through the
    /// `transform_selectors` hooks.
    pub async fn render_preflight_definition(
        &self,
        definition: StyleDefinition,
        is_formatted: bool,
    ) -> String {
        let mut blocks = CssStyleBlocks::new();
        for (selector, value) in definition {
            match value {
                StyleValue::Definition(body) => {
                    self.collect_preflight_blocks(&mut blocks, selector, body).await
                }
                _ => self.logger().warn(format!(
                    "Preflight entry \"{}\" is not a selector block; skipping.",
                    selector
                )),
            }
        }
        render_css_style_blocks(&blocks, is_formatted)
    }

    fn collect_preflight_blocks<'a>(
        &'a self,
        blocks: &'a mut CssStyleBlocks,
        selector: String,
        body: StyleDefinition,
    ) -> LocalBoxFuture<'a, ()> {
        Box::pin(async move {
            let transformed = self.pipeline().transform_selectors(vec![selector]).await;
            let selectors: Vec<String> = normalize_selectors(&transformed, "")
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect();
            for selector in selectors {
                let block = blocks.entry(selector).or_default();
                for (key, value) in body.clone() {
                    if value.is_property_value() {
                        let property = to_kebab_case(&key);
                        for v in normalize_value(&value).unwrap_or_default() {
                            block.properties.push((property.clone(), v));
                        }
                    } else if let StyleValue::Definition(nested) = value {
                        let children = block.children.get_or_insert_with(CssStyleBlocks::new);
                        self.collect_preflight_blocks(children, key, nested).await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{create_engine, EngineConfig};
    use futures::executor::block_on;
    use serde_json::json;

    fn engine() -> Engine {
        block_on(create_engine(EngineConfig::default()))
    }

    fn render(preflight: &ResolvedPreflight, engine: &Engine) -> PreflightOutput {
        block_on((preflight.render)(engine, false))
    }

    #[test]
    fn test_resolve_preflight_reproduces_each_form() {
        let engine = engine();
        let def = StyleDefinition::try_from(json!({"body": {"margin": "0"}})).unwrap();

        let css = resolve_preflight(Preflight::css("body{margin:0}"));
        assert_eq!(css.layer, None);
        assert_eq!(render(&css, &engine), PreflightOutput::Css("body{margin:0}".into()));

        let structured = resolve_preflight(Preflight::definition(def.clone()).with_layer("base"));
        assert_eq!(structured.layer.as_deref(), Some("base"));
        assert_eq!(render(&structured, &engine), PreflightOutput::Definition(def));

        let computed = resolve_preflight(Preflight::from_fn(|_, formatted| {
            PreflightOutput::Css(format!("/* {} */", formatted))
        }));
        assert_eq!(render(&computed, &engine), PreflightOutput::Css("/* false */".into()));

        let deferred = resolve_preflight(
            Preflight::from_async_fn(|_| async { PreflightOutput::Css("a{}".into()) })
                .with_layer("x"),
        );
        assert_eq!(deferred.layer.as_deref(), Some("x"));
        assert_eq!(render(&deferred, &engine), PreflightOutput::Css("a{}".into()));
    }

    #[test]
    fn test_render_preflight_definition() {
        let engine = engine();
        let def = StyleDefinition::try_from(json!({
            "body": {"margin": "0", "fontFamily": "sans-serif"},
            "@media print": {"body": {"color": "black"}},
        }))
        .unwrap();

        let css = block_on(engine.render_preflight_definition(def, false));
        assert_eq!(
            css,
            "body{margin:0;font-family:sans-serif;}@media print{body{color:black;}}"
        );
    }

    #[test]
    fn test_dollar_in_preflight_selector_is_dropped() {
        let engine = engine();
        let def = StyleDefinition::try_from(json!({"html $": {"color": "red"}})).unwrap();
        let css = block_on(engine.render_preflight_definition(def, false));
        assert_eq!(css, "html {color:red;}");
    }
}
