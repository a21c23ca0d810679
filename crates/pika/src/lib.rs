//! Atomic CSS engine.
//!
//! `pika` turns nested style definitions into atomic class names: every
//! declaration becomes its own rule, keyed by selector path, property, value
//! and layer, and identical declarations share one id across the whole
//! program.
//!
//! # Features
//!
//! - **Extraction**: nested selectors, `$` for the element's own selector,
//!   value fallbacks, `null` deletion markers and `__layer` tagging
//! - **Atomic store**: deterministic base-52 ids in first-seen order, with an
//!   optional prefix
//! - **Plugin hooks**: ordered transform and notify hooks with per-plugin
//!   fault isolation
//! - **Built-in plugins**: `!important`, CSS variables, keyframes, selector
//!   aliases and shortcuts
//! - **Rendering**: cascade layers, preflights and formatted or compact output
//!
//! # Example
//!
//! ```rust
//! use futures::executor::block_on;
//! use pika::plugins::{ShortcutConfig, ShortcutsConfig};
//! use pika::{create_engine, EngineConfig, StyleItem};
//! use serde_json::json;
//!
//! let config = EngineConfig::new().with_shortcuts(
//!     ShortcutsConfig::new().with(("center", json!({"display": "grid", "placeItems": "center"}))),
//! );
//! let mut engine = block_on(create_engine(config));
//!
//! let ids = block_on(engine.use_styles([
//!     StyleItem::from("center"),
//!     StyleItem::from(json!({"color": "red", "@media (min-width: 768px)": {"color": "blue"}})),
//! ]));
//! assert_eq!(ids, vec!["a", "b", "c", "d"]);
//!
//! let css = engine.render_atomic_styles(true, Default::default());
//! assert!(css.starts_with("@layer utilities {"));
//! assert!(css.contains("@media (min-width: 768px) {\n  .d {\n    color: blue;\n  }\n}"));
//! ```
//!
//! # Logging
//!
//! Diagnostics go through a [`Logger`] handle passed in [`EngineConfig`]. By
//! default records are forwarded to the `log` crate under the `pika` target;
//! [`MemorySink`] captures them instead.

// Core modules
mod engine;
mod error;
mod logger;
mod plugin;
mod style;

pub mod extractor;
pub mod plugins;
pub mod render;

pub use engine::{
    create_engine, number_to_chars, optimize_atomic_style_contents, resolve_engine_config,
    resolve_preflight, AtomicStyle, AtomicStyleStore, AutocompleteConfig, Engine, EngineConfig,
    Extensions, Preflight, PreflightFn, PreflightOutput, PreflightSource, RenderOptions,
    ResolvedEngineConfig, ResolvedPreflight, StyleContent, DEFAULT_LAYERS,
    DEFAULT_PREFLIGHTS_LAYER, DEFAULT_SELECTOR, DEFAULT_UTILITIES_LAYER,
};

pub use error::{PikaError, Result};

pub use logger::{LogCrateSink, LogLevel, LogRecord, LogSink, Logger, MemorySink};

pub use plugin::{
    resolve_plugins, AtomicStyleAddedFn, ConfigureEngineFn, EnginePlugin, HookError, HookName,
    HookPipeline, HookResult, NotifyFn, PluginOrder, RawConfigConfiguredFn, TransformFn,
};

pub use style::{StyleDefinition, StyleItem, StyleValue};

// Resolver types used by plugin configs
pub use pika_resolver::{BoxError, DynamicRule, Regex, Resolver, RuleKind, RuleMatch, StaticRule};
