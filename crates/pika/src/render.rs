//! CSS text generation.
//!
//! Atomic styles are grouped into a [`CssStyleBlocks`] tree keyed by selector,
//! one nesting level per selector path entry, then printed either formatted
//! (two-space indentation, one declaration per line) or compact.

use indexmap::IndexMap;

use crate::engine::AtomicStyle;
use crate::extractor::{binds_id_placeholder, ATOMIC_STYLE_ID_PLACEHOLDER};
use crate::logger::Logger;

/// Properties of one selector block plus nested blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CssStyleBlockBody {
    pub properties: Vec<(String, String)>,
    pub children: Option<CssStyleBlocks>,
}

/// Selector-keyed block tree in insertion order.
pub type CssStyleBlocks = IndexMap<String, CssStyleBlockBody>;

fn render_block(selector: &str, body: &CssStyleBlockBody, formatted: bool, depth: usize) -> Option<String> {
    let children: Vec<String> = body
        .children
        .iter()
        .flat_map(|children| children.iter())
        .filter_map(|(child, child_body)| render_block(child, child_body, formatted, depth + 1))
        .collect();
    if body.properties.is_empty() && children.is_empty() {
        return None;
    }

    if formatted {
        let indent = "  ".repeat(depth);
        let mut lines = Vec::with_capacity(body.properties.len() + children.len() + 2);
        lines.push(format!("{}{} {{", indent, selector));
        for (property, value) in &body.properties {
            lines.push(format!("{}  {}: {};", indent, property, value));
        }
        lines.extend(children);
        lines.push(format!("{}}}", indent));
        Some(lines.join("\n"))
    } else {
        let mut out = format!("{}{{", selector);
        for (property, value) in &body.properties {
            out.push_str(&format!("{}:{};", property, value));
        }
        out.extend(children);
        out.push('}');
        Some(out)
    }
}

/// Prints a block tree. Blocks without properties or non-empty children are
/// skipped.
pub fn render_css_style_blocks(blocks: &CssStyleBlocks, is_formatted: bool) -> String {
    let rendered: Vec<String> = blocks
        .iter()
        .filter_map(|(selector, body)| render_block(selector, body, is_formatted, 0))
        .collect();
    rendered.join(if is_formatted { "\n" } else { "" })
}

/// Layer names by ascending weight, ties broken alphabetically.
pub fn sort_layer_names(layers: &IndexMap<String, i32>) -> Vec<String> {
    let mut names: Vec<(&String, i32)> = layers.iter().map(|(n, w)| (n, *w)).collect();
    names.sort_by(|(a, wa), (b, wb)| wa.cmp(wb).then_with(|| a.cmp(b)));
    names.into_iter().map(|(n, _)| n.clone()).collect()
}

/// `@layer a, b, c;` for the configured layers, or an empty string.
pub fn render_layer_order_declaration(layers: &IndexMap<String, i32>) -> String {
    if layers.is_empty() {
        return String::new();
    }
    format!("@layer {};", sort_layer_names(layers).join(", "))
}

fn style_weight(style: &AtomicStyle, default_selector: &str) -> usize {
    match style.content.selector.as_slice() {
        [only] if only == default_selector => 0,
        path => path.len(),
    }
}

/// Renders atomic styles without layer handling.
///
/// Styles are ordered by weight (0 for a path that is exactly the default
/// selector, otherwise the path length); the sort is stable. Styles whose path
/// never mentions the id placeholder are skipped. Outside preview mode every
/// placeholder is replaced by the style id; at-rule parameters are left as
/// written.
pub fn render_atomic_styles_css(
    styles: &[&AtomicStyle],
    default_selector: &str,
    is_preview: bool,
    is_formatted: bool,
) -> String {
    let mut sorted: Vec<&AtomicStyle> = styles.to_vec();
    sorted.sort_by_key(|style| style_weight(style, default_selector));

    let mut blocks = CssStyleBlocks::new();
    for style in sorted {
        let content = &style.content;
        let Some((last, outer)) = content.selector.split_last() else {
            continue;
        };
        if !content.selector.iter().any(|s| binds_id_placeholder(s)) {
            continue;
        }
        let bind = |selector: &str| {
            if is_preview || !binds_id_placeholder(selector) {
                selector.to_string()
            } else {
                selector.replace(ATOMIC_STYLE_ID_PLACEHOLDER, &style.id)
            }
        };

        let mut current = &mut blocks;
        for selector in outer {
            current = current
                .entry(bind(selector))
                .or_default()
                .children
                .get_or_insert_with(CssStyleBlocks::new);
        }
        let body = current.entry(bind(last)).or_default();
        for value in &content.value {
            body.properties.push((content.property.clone(), value.clone()));
        }
    }
    render_css_style_blocks(&blocks, is_formatted)
}

/// Options for [`render_atomic_styles`].
#[derive(Debug, Clone, Copy)]
pub struct RenderAtomicStylesOptions<'a> {
    pub default_selector: &'a str,
    pub is_preview: bool,
    pub is_formatted: bool,
    /// Configured layers; `None` renders everything unlayered.
    pub layers: Option<&'a IndexMap<String, i32>>,
    /// Layer receiving styles without an explicit layer.
    pub default_utilities_layer: Option<&'a str>,
}

/// Renders atomic styles partitioned into `@layer` blocks.
///
/// A style naming a configured layer goes into that layer. An unconfigured
/// layer name logs a warning and the style is rendered unlayered. A style
/// without a layer goes into the default utilities layer when that layer is
/// configured, and is unlayered otherwise. Unlayered output comes first.
pub fn render_atomic_styles(
    styles: &[&AtomicStyle],
    options: &RenderAtomicStylesOptions<'_>,
    logger: &Logger,
) -> String {
    let RenderAtomicStylesOptions {
        default_selector,
        is_preview,
        is_formatted,
        ..
    } = *options;
    let layers = match options.layers {
        Some(layers) if !layers.is_empty() => layers,
        _ => return render_atomic_styles_css(styles, default_selector, is_preview, is_formatted),
    };
    let default_layer = options
        .default_utilities_layer
        .filter(|layer| layers.contains_key(*layer));

    let mut unlayered: Vec<&AtomicStyle> = Vec::new();
    let mut buckets: IndexMap<&str, Vec<&AtomicStyle>> = IndexMap::new();
    for &style in styles {
        match style.content.layer.as_deref() {
            Some(layer) if layers.contains_key(layer) => {
                buckets.entry(layer).or_default().push(style)
            }
            Some(layer) => {
                logger.warn(format!(
                    "Unknown layer \"{}\" encountered in atomic style; falling back to unlayered output.",
                    layer
                ));
                unlayered.push(style);
            }
            None => match default_layer {
                Some(layer) => buckets.entry(layer).or_default().push(style),
                None => unlayered.push(style),
            },
        }
    }

    let line_end = if is_formatted { "\n" } else { "" };
    let mut parts = Vec::new();
    if !unlayered.is_empty() {
        let css = render_atomic_styles_css(&unlayered, default_selector, is_preview, is_formatted);
        if !css.is_empty() {
            parts.push(css);
        }
    }
    for name in sort_layer_names(layers) {
        let Some(bucket) = buckets.get(name.as_str()) else {
            continue;
        };
        let css = render_atomic_styles_css(bucket, default_selector, is_preview, is_formatted);
        if css.is_empty() {
            continue;
        }
        parts.push(format!("@layer {} {{{}{}{}}}", name, line_end, css, line_end));
    }
    parts.join(line_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StyleContent;
    use crate::logger::{LogLevel, MemorySink};
    use std::rc::Rc;

    fn style(id: &str, selector: &[&str], property: &str, value: &str, layer: Option<&str>) -> AtomicStyle {
        AtomicStyle {
            id: id.into(),
            content: StyleContent {
                selector: selector.iter().map(|s| s.to_string()).collect(),
                property: property.into(),
                value: vec![value.into()],
                layer: layer.map(Into::into),
            },
        }
    }

    fn layers(entries: &[(&str, i32)]) -> IndexMap<String, i32> {
        entries.iter().map(|(n, w)| (n.to_string(), *w)).collect()
    }

    fn block(properties: &[(&str, &str)]) -> CssStyleBlockBody {
        CssStyleBlockBody {
            properties: properties
                .iter()
                .map(|(p, v)| (p.to_string(), v.to_string()))
                .collect(),
            children: None,
        }
    }

    #[test]
    fn test_render_blocks_formatted_and_compact() {
        let mut blocks = CssStyleBlocks::new();
        blocks.insert(".a".into(), block(&[("color", "red")]));
        assert_eq!(render_css_style_blocks(&blocks, true), ".a {\n  color: red;\n}");
        assert_eq!(render_css_style_blocks(&blocks, false), ".a{color:red;}");
    }

    #[test]
    fn test_render_nested_blocks() {
        let mut children = CssStyleBlocks::new();
        children.insert("&:hover".into(), block(&[("color", "blue")]));
        let mut blocks = CssStyleBlocks::new();
        blocks.insert(
            ".parent".into(),
            CssStyleBlockBody {
                properties: vec![("color".into(), "red".into())],
                children: Some(children),
            },
        );

        assert_eq!(
            render_css_style_blocks(&blocks, false),
            ".parent{color:red;&:hover{color:blue;}}"
        );
        assert_eq!(
            render_css_style_blocks(&blocks, true),
            ".parent {\n  color: red;\n  &:hover {\n    color: blue;\n  }\n}"
        );
    }

    #[test]
    fn test_empty_blocks_are_skipped() {
        let mut empty_children = CssStyleBlocks::new();
        empty_children.insert(".x".into(), CssStyleBlockBody::default());
        let mut blocks = CssStyleBlocks::new();
        blocks.insert(".a".into(), CssStyleBlockBody::default());
        blocks.insert(
            ".b".into(),
            CssStyleBlockBody {
                properties: vec![],
                children: Some(empty_children),
            },
        );
        blocks.insert(".c".into(), block(&[("top", "0")]));
        assert_eq!(render_css_style_blocks(&blocks, false), ".c{top:0;}");
    }

    #[test]
    fn test_sort_layer_names() {
        assert_eq!(
            sort_layer_names(&layers(&[("utilities", 10), ("base", 0), ("components", 0)])),
            vec!["base", "components", "utilities"]
        );
        assert!(sort_layer_names(&IndexMap::new()).is_empty());
    }

    #[test]
    fn test_layer_order_declaration() {
        assert_eq!(
            render_layer_order_declaration(&layers(&[("utilities", 1), ("components", 0), ("preflights", 1)])),
            "@layer components, preflights, utilities;"
        );
        assert_eq!(render_layer_order_declaration(&IndexMap::new()), "");
    }

    #[test]
    fn test_weight_orders_default_selector_first() {
        let media = style("b", &["@media (min-width:768px)", ".%"], "color", "blue", None);
        let plain = style("a", &[".%"], "color", "red", None);
        let css = render_atomic_styles_css(&[&media, &plain], ".%", false, false);
        assert_eq!(css, ".a{color:red;}@media (min-width:768px){.b{color:blue;}}");
    }

    #[test]
    fn test_shared_prefix_merges_blocks() {
        let a = style("a", &["@media print", ".%"], "color", "red", None);
        let b = style("b", &["@media print", ".%"], "display", "none", None);
        let css = render_atomic_styles_css(&[&a, &b], ".%", false, false);
        assert_eq!(css, "@media print{.a{color:red;}.b{display:none;}}");
    }

    #[test]
    fn test_preview_keeps_placeholder() {
        let a = style("a", &[".%:hover"], "color", "red", None);
        assert_eq!(
            render_atomic_styles_css(&[&a], ".%", true, false),
            ".%:hover{color:red;}"
        );
    }

    #[test]
    fn test_all_placeholders_replaced() {
        let a = style("a", &[".%:hover .%-child"], "color", "red", None);
        assert_eq!(
            render_atomic_styles_css(&[&a], ".%", false, false),
            ".a:hover .a-child{color:red;}"
        );
    }

    #[test]
    fn test_at_rule_percentages_are_not_placeholders() {
        let a = style("a", &["@container (min-width: 50%)", ".%"], "color", "red", None);
        assert_eq!(
            render_atomic_styles_css(&[&a], ".%", false, false),
            "@container (min-width: 50%){.a{color:red;}}"
        );

        let bare = style("b", &["@container (min-width: 50%)"], "color", "red", None);
        assert_eq!(render_atomic_styles_css(&[&bare], ".%", false, false), "");
    }

    #[test]
    fn test_styles_without_placeholder_are_skipped() {
        let a = style("a", &["body"], "color", "red", None);
        assert_eq!(render_atomic_styles_css(&[&a], ".%", false, false), "");
    }

    #[test]
    fn test_layered_rendering() {
        let sink = Rc::new(MemorySink::new());
        let logger = Logger::with_sink("[t]", sink.clone());
        let configured = layers(&[("components", 0), ("utilities", 10)]);
        let a = style("a", &[".%"], "color", "red", None);
        let b = style("b", &[".%"], "display", "flex", Some("components"));
        let c = style("c", &[".%"], "top", "0", Some("missing"));
        let options = RenderAtomicStylesOptions {
            default_selector: ".%",
            is_preview: false,
            is_formatted: false,
            layers: Some(&configured),
            default_utilities_layer: Some("utilities"),
        };

        let css = render_atomic_styles(&[&a, &b, &c], &options, &logger);
        assert_eq!(
            css,
            ".c{top:0;}@layer components {.b{display:flex;}}@layer utilities {.a{color:red;}}"
        );
        let warnings = sink.messages(LogLevel::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Unknown layer \"missing\""));
    }

    #[test]
    fn test_formatted_layer_wrapping() {
        let configured = layers(&[("utilities", 10)]);
        let a = style("a", &[".%"], "color", "red", None);
        let options = RenderAtomicStylesOptions {
            default_selector: ".%",
            is_preview: false,
            is_formatted: true,
            layers: Some(&configured),
            default_utilities_layer: Some("utilities"),
        };
        assert_eq!(
            render_atomic_styles(&[&a], &options, &Logger::default()),
            "@layer utilities {\n.a {\n  color: red;\n}\n}"
        );
    }

    #[test]
    fn test_unconfigured_default_layer_renders_unlayered() {
        let configured = layers(&[("components", 0)]);
        let a = style("a", &[".%"], "color", "red", None);
        let options = RenderAtomicStylesOptions {
            default_selector: ".%",
            is_preview: false,
            is_formatted: false,
            layers: Some(&configured),
            default_utilities_layer: Some("utilities"),
        };
        assert_eq!(
            render_atomic_styles(&[&a], &options, &Logger::default()),
            ".a{color:red;}"
        );
    }

    #[test]
    fn test_without_layers_renders_plain() {
        let a = style("a", &[".%"], "color", "red", Some("components"));
        let options = RenderAtomicStylesOptions {
            default_selector: ".%",
            is_preview: false,
            is_formatted: false,
            layers: None,
            default_utilities_layer: None,
        };
        assert_eq!(
            render_atomic_styles(&[&a], &options, &Logger::default()),
            ".a{color:red;}"
        );
    }
}
