//! End-to-end engine behavior: id allocation, ordering, layering and hook
//! composition with user plugins.

use std::rc::Rc;

use futures::executor::block_on;
use pika::plugins::{SelectorsConfig, ShortcutsConfig};
use pika::{
    create_engine, Engine, EngineConfig, EnginePlugin, LogLevel, Logger, MemorySink,
    PluginOrder, Preflight, PreflightOutput, RenderOptions, StyleDefinition, StyleItem,
};
use serde_json::json;

fn engine(config: EngineConfig) -> Engine {
    block_on(create_engine(config))
}

fn use_json(engine: &mut Engine, value: serde_json::Value) -> Vec<String> {
    block_on(engine.use_styles([StyleItem::from(value)]))
}

fn compact(engine: &Engine) -> String {
    engine.render_atomic_styles(false, RenderOptions::default())
}

// ============================================================================
// Id allocation
// ============================================================================

#[test]
fn ids_follow_base_52_sequence() {
    let mut engine = engine(EngineConfig::default());
    let ids: Vec<String> = (0..54)
        .flat_map(|i| {
            block_on(engine.use_styles([StyleDefinition::new().with("z-index", i.to_string())]))
        })
        .collect();

    assert_eq!(ids[0], "a");
    assert_eq!(ids[25], "z");
    assert_eq!(ids[26], "A");
    assert_eq!(ids[51], "Z");
    assert_eq!(ids[52], "aa");
    assert_eq!(ids[53], "ab");
}

#[test]
fn same_content_in_new_batch_reuses_id() {
    let mut engine = engine(EngineConfig::default());
    let first = use_json(&mut engine, json!({"color": "red", "display": "flex"}));
    let second = use_json(&mut engine, json!({"display": "flex", "margin": "0"}));

    assert_eq!(first, vec!["a", "b"]);
    assert_eq!(second, vec!["b", "c"]);
}

#[test]
fn override_and_deletion_within_one_batch() {
    let mut engine = engine(EngineConfig::default());
    let ids = block_on(engine.use_styles([
        StyleItem::from(json!({"color": "red", "margin": "0"})),
        StyleItem::from(json!({"color": "blue", "margin": null})),
    ]));

    assert_eq!(ids, vec!["a"]);
    assert_eq!(engine.atomic_style("a").unwrap().content.value, vec!["blue"]);
    assert_eq!(compact(&engine), "@layer utilities {.a{color:blue;}}");
}

#[test]
fn prefix_and_custom_default_selector() {
    let mut engine = engine(
        EngineConfig::new()
            .with_prefix("pk-")
            .with_default_selector("[data-pika~=\"%\"]"),
    );
    assert_eq!(use_json(&mut engine, json!({"color": "red"})), vec!["pk-a"]);
    assert_eq!(
        compact(&engine),
        "@layer utilities {[data-pika~=\"pk-a\"]{color:red;}}"
    );
}

// ============================================================================
// Ordering and layers
// ============================================================================

#[test]
fn default_selector_styles_render_before_nested_ones() {
    let mut engine = engine(EngineConfig::default());
    use_json(&mut engine, json!({"@media (min-width:768px)": {"color": "blue"}}));
    use_json(&mut engine, json!({"color": "red"}));

    assert_eq!(
        compact(&engine),
        "@layer utilities {.b{color:red;}@media (min-width:768px){.a{color:blue;}}}"
    );
}

#[test]
fn layer_tag_applies_to_nested_selectors() {
    let mut engine = engine(EngineConfig::new().with_layer("components", 5));
    let ids = use_json(
        &mut engine,
        json!({"__layer": "components", "color": "red", "$:hover": {"color": "blue"}}),
    );
    use_json(&mut engine, json!({"display": "flex"}));

    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(
        engine.render_layer_order_declaration(),
        "@layer preflights, components, utilities;"
    );
    assert_eq!(
        compact(&engine),
        "@layer components {.a{color:red;}.b:hover{color:blue;}}@layer utilities {.c{display:flex;}}"
    );
}

#[test]
fn unknown_layer_renders_unlayered_with_warning() {
    let sink = Rc::new(MemorySink::new());
    let mut engine = engine(EngineConfig::new().with_logger(Logger::with_sink("[test]", sink.clone())));
    use_json(&mut engine, json!({"__layer": "nope", "color": "red"}));
    use_json(&mut engine, json!({"display": "flex"}));

    assert_eq!(
        compact(&engine),
        ".a{color:red;}@layer utilities {.b{display:flex;}}"
    );
    assert!(sink
        .messages(LogLevel::Warn)
        .iter()
        .any(|m| m.contains("Unknown layer \"nope\"")));
}

#[test]
fn full_stylesheet_assembly() {
    let mut engine = engine(
        EngineConfig::new()
            .with_layer("base", 0)
            .with_preflight(Preflight::css("html{margin:0;}").with_layer("base"))
            .with_preflight("*{box-sizing:border-box;}"),
    );
    use_json(&mut engine, json!({"color": "red"}));

    let sheet = [
        engine.render_layer_order_declaration(),
        block_on(engine.render_preflights(false)),
        compact(&engine),
    ]
    .join("");
    assert_eq!(
        sheet,
        "@layer base, preflights, utilities;\
         @layer base {html{margin:0;}}\
         @layer preflights {*{box-sizing:border-box;}}\
         @layer utilities {.a{color:red;}}"
    );
}

// ============================================================================
// User plugins
// ============================================================================

fn dark_alias(order: PluginOrder) -> EnginePlugin {
    EnginePlugin::new("dark-alias")
        .with_order(order)
        .transform_selectors(|selectors| async move {
            Ok(Some(
                selectors
                    .into_iter()
                    .map(|s| if s == "dark" { "theme-dark".to_string() } else { s })
                    .collect(),
            ))
        })
}

fn themed(order: PluginOrder) -> Engine {
    engine(
        EngineConfig::new()
            .with_selectors(SelectorsConfig::new().with(("theme-dark", "[data-theme=dark] $")))
            .with_plugin(dark_alias(order)),
    )
}

#[test]
fn pre_plugin_feeds_core_selectors() {
    let mut engine = themed(PluginOrder::Pre);
    use_json(&mut engine, json!({"dark": {"color": "white"}}));
    assert_eq!(
        compact(&engine),
        "@layer utilities {[data-theme=dark] .a{color:white;}}"
    );
}

#[test]
fn post_plugin_runs_after_core_selectors() {
    let mut engine = themed(PluginOrder::Post);
    use_json(&mut engine, json!({"dark": {"color": "white"}}));
    assert_eq!(
        compact(&engine),
        "@layer utilities {theme-dark{.a{color:white;}}}"
    );
}

#[test]
fn configure_engine_plugin_reads_engine_at_render_time() {
    let plugin = EnginePlugin::new("counter").configure_engine(|engine| {
        Box::pin(async move {
            engine.add_preflight(Preflight::from_fn(|engine, _| {
                PreflightOutput::Css(format!("/* {} styles */", engine.atomic_styles().count()))
            }));
            Ok(())
        })
    });
    let mut engine = engine(
        EngineConfig::new()
            .with_shortcuts(ShortcutsConfig::new().with((
                "stack",
                json!({"display": "flex", "flexDirection": "column"}),
            )))
            .with_plugin(plugin),
    );

    assert_eq!(
        block_on(engine.render_preflights(false)),
        "@layer preflights {/* 0 styles */}"
    );
    block_on(engine.use_styles(["stack"]));
    assert_eq!(
        block_on(engine.render_preflights(false)),
        "@layer preflights {/* 2 styles */}"
    );
}

#[test]
fn user_plugin_transforms_definitions_after_core() {
    let plugin = EnginePlugin::new("no-outline")
        .with_order(PluginOrder::Post)
        .transform_style_definitions(|definitions| async move {
            Ok(Some(
                definitions
                    .into_iter()
                    .map(|definition| definition.with("outline", "none"))
                    .collect(),
            ))
        });
    let mut engine = engine(
        EngineConfig::new()
            .with_shortcuts(ShortcutsConfig::new().with(("btn", json!({"cursor": "pointer"}))))
            .with_plugin(plugin),
    );

    let ids = use_json(&mut engine, json!({"__shortcut": "btn", "color": "red"}));
    // Both definitions gain `outline`; the batch keeps its last occurrence.
    assert_eq!(ids.len(), 3);
    let properties: Vec<&str> = ids
        .iter()
        .map(|id| engine.atomic_style(id).unwrap().content.property.as_str())
        .collect();
    assert_eq!(properties, vec!["cursor", "color", "outline"]);
}
