//! Flattening of nested style definitions into flat declarations.
//!
//! Walking a definition keeps a selector path (outer to inner). Property keys
//! emit one [`ExtractedStyleContent`] each; selector keys extend the path and
//! recurse. A leaf whose path never mentions the id placeholder `%` gets the
//! default selector appended, so every declaration binds to its atomic class.
//!
//! Hooks run at three points: `transform_style_definitions` on every
//! definition before it is walked, `transform_selectors` on every selector key
//! and `transform_style_items` on every item list nested under a selector.

use futures::future::LocalBoxFuture;
use serde::Serialize;

use crate::plugin::HookPipeline;
use crate::style::{StyleDefinition, StyleItem, StyleValue};

/// Token replaced by the atomic id at render time.
pub const ATOMIC_STYLE_ID_PLACEHOLDER: char = '%';

/// Token standing for the enclosing default selector inside selector keys.
pub const DEFAULT_SELECTOR_PLACEHOLDER: char = '$';

/// Reserved definition key assigning a cascade layer.
pub const LAYER_KEY: &str = "__layer";

/// One property assignment produced by flattening.
///
/// `value` is `None` for deletion markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExtractedStyleContent {
    pub selector: Vec<String>,
    pub property: String,
    pub value: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
}

/// Converts a camelCase property name to kebab-case.
///
/// Custom properties (`--name`) are returned unchanged.
///
/// ```rust
/// use pika::extractor::to_kebab_case;
///
/// assert_eq!(to_kebab_case("backgroundColor"), "background-color");
/// assert_eq!(to_kebab_case("WebkitTransition"), "-webkit-transition");
/// assert_eq!(to_kebab_case("--brandColor"), "--brandColor");
/// ```
pub fn to_kebab_case(property: &str) -> String {
    if property.starts_with("--") {
        return property.to_string();
    }
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Splits on commas outside parentheses and brackets, trimming each part.
pub fn split_top_level_commas(selector: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in selector.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(selector[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(selector[start..].trim().to_string());
    parts
}

fn replace_default_placeholder(selector: &str, default_selector: &str) -> String {
    let mut out = String::with_capacity(selector.len() + default_selector.len());
    let mut chars = selector.chars().peekable();
    while let Some(c) = chars.next() {
        if c == DEFAULT_SELECTOR_PLACEHOLDER && chars.peek() != Some(&'=') {
            out.push_str(default_selector);
        } else {
            out.push(c);
        }
    }
    out
}

/// Substitutes `$` (but not the `$=` attribute operator) with
/// `default_selector` and tidies comma lists to `a,b`.
pub fn normalize_selectors(selectors: &[String], default_selector: &str) -> Vec<String> {
    selectors
        .iter()
        .map(|selector| {
            split_top_level_commas(selector)
                .iter()
                .map(|part| replace_default_placeholder(part, default_selector))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect()
}

/// Normalizes a terminal value to its list of output values.
///
/// `Null` stays `None`; values are trimmed and fallbacks are appended with
/// duplicates removed.
pub fn normalize_value(value: &StyleValue) -> Option<Vec<String>> {
    match value {
        StyleValue::Value(v) => Some(vec![v.trim().to_string()]),
        StyleValue::Fallback(v, fallbacks) => {
            let mut out: Vec<String> = Vec::with_capacity(fallbacks.len() + 1);
            for candidate in std::iter::once(v).chain(fallbacks) {
                let candidate = candidate.trim();
                if !out.iter().any(|existing| existing == candidate) {
                    out.push(candidate.to_string());
                }
            }
            Some(out)
        }
        _ => None,
    }
}

/// Removes and returns the `__layer` entry of `definition`, if it names one.
pub fn take_layer(mut definition: StyleDefinition) -> (Option<String>, StyleDefinition) {
    let layer = match definition.remove(LAYER_KEY) {
        Some(StyleValue::Value(layer)) => Some(layer),
        _ => None,
    };
    (layer, definition)
}

/// Flattens definitions through a hook pipeline.
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'a> {
    pipeline: &'a HookPipeline,
    default_selector: &'a str,
}

impl<'a> Extractor<'a> {
    pub fn new(pipeline: &'a HookPipeline, default_selector: &'a str) -> Self {
        Self {
            pipeline,
            default_selector,
        }
    }

    /// Flattens `definition` into declarations in source order.
    pub async fn extract(&self, definition: StyleDefinition) -> Vec<ExtractedStyleContent> {
        let mut out = Vec::new();
        self.walk(definition, Vec::new(), None, &mut out).await;
        out
    }

    fn walk<'b>(
        &'b self,
        definition: StyleDefinition,
        levels: Vec<String>,
        inherited_layer: Option<String>,
        out: &'b mut Vec<ExtractedStyleContent>,
    ) -> LocalBoxFuture<'b, ()> {
        Box::pin(async move {
            let (own_layer, definition) = take_layer(definition);
            let layer = own_layer.or(inherited_layer);
            let definitions = self
                .pipeline
                .transform_style_definitions(vec![definition])
                .await;

            for definition in definitions {
                // Hooks may inject definitions carrying their own tag.
                let (injected_layer, definition) = take_layer(definition);
                let layer = injected_layer.or_else(|| layer.clone());
                for (key, value) in definition {
                    if value.is_property_value() {
                        out.push(self.declaration(&levels, &key, &value, &layer));
                        continue;
                    }
                    match value {
                        StyleValue::Definition(nested) => {
                            for selector in self.expand_selector(&key, &levels).await {
                                let path = extend(&levels, selector);
                                self.walk(nested.clone(), path, layer.clone(), out).await;
                            }
                        }
                        StyleValue::Items(items) => {
                            let selectors = self.expand_selector(&key, &levels).await;
                            let items = self.pipeline.transform_style_items(items).await;
                            for selector in selectors {
                                for item in &items {
                                    if let StyleItem::Definition(nested) = item {
                                        let path = extend(&levels, selector.clone());
                                        self.walk(nested.clone(), path, layer.clone(), out).await;
                                    }
                                }
                            }
                        }
                        _ => self
                            .pipeline
                            .logger()
                            .debug(format!("Ignoring non-style entry \"{}\"", key)),
                    }
                }
            }
        })
    }

    fn declaration(
        &self,
        levels: &[String],
        key: &str,
        value: &StyleValue,
        layer: &Option<String>,
    ) -> ExtractedStyleContent {
        let mut selector = levels.to_vec();
        if !binds_placeholder(levels) {
            selector.push(self.default_selector.to_string());
        }
        ExtractedStyleContent {
            selector,
            property: to_kebab_case(key),
            value: normalize_value(value),
            layer: layer.clone(),
        }
    }

    /// Runs a selector key through the hooks and normalizes the results.
    ///
    /// Once the path already binds the id placeholder, `$` refers to the
    /// enclosing rule and becomes the nesting selector `&`.
    async fn expand_selector(&self, key: &str, levels: &[String]) -> Vec<String> {
        let context = if binds_placeholder(levels) {
            "&"
        } else {
            self.default_selector
        };
        let transformed = self.pipeline.transform_selectors(vec![key.to_string()]).await;
        normalize_selectors(&transformed, context)
            .into_iter()
            .filter(|selector| !selector.is_empty())
            .collect()
    }
}

/// Whether `selector` carries the atomic id placeholder.
///
/// At-rule parameters are never selectors, so a `%` in
/// `@container (min-width: 50%)` is a percentage.
pub fn binds_id_placeholder(selector: &str) -> bool {
    !selector.trim_start().starts_with('@') && selector.contains(ATOMIC_STYLE_ID_PLACEHOLDER)
}

fn binds_placeholder(levels: &[String]) -> bool {
    levels.iter().any(|level| binds_id_placeholder(level))
}

fn extend(levels: &[String], selector: String) -> Vec<String> {
    let mut path = levels.to_vec();
    path.push(selector);
    path
}
