//! Built-in plugins.
//!
//! [`core_plugins`] returns them in registration order: important, variables,
//! keyframes, selectors, shortcuts. Each reads its typed section of
//! [`EngineConfig`](crate::EngineConfig) and, where it has a runtime API,
//! registers a handle in [`Engine::extensions`](crate::Engine).

mod important;
mod keyframes;
mod selectors;
mod shortcuts;
mod variables;

use futures::future::FutureExt;
use pika_resolver::Resolver;

pub use important::{important, ImportantConfig, IMPORTANT_KEY};
pub use keyframes::{keyframes, Keyframes, KeyframesApi, KeyframesConfig};
pub use selectors::{selectors, SelectorConfig, SelectorsApi, SelectorsConfig};
pub use shortcuts::{shortcuts, ShortcutConfig, ShortcutsApi, ShortcutsConfig, SHORTCUT_KEY};
pub use variables::{
    extract_used_var_names, normalize_variable_name, variables, Variable, VariableAutocomplete,
    VariableEntry, VariablesApi, VariablesConfig, VariablesDefinition,
};

use crate::engine::Engine;
use crate::logger::Logger;
use crate::plugin::{EnginePlugin, HookResult};

/// Upper bound on nested alias expansion for selectors and shortcuts.
pub const MAX_EXPANSION_DEPTH: usize = 32;

/// The built-in plugins in their fixed registration order.
pub fn core_plugins(logger: &Logger) -> Vec<EnginePlugin> {
    vec![
        important(),
        variables(),
        keyframes(),
        selectors(logger.clone()),
        shortcuts(logger.clone()),
    ]
}

/// Adds a synchronous `configure_engine` hook.
fn on_configure_engine<F>(plugin: EnginePlugin, f: F) -> EnginePlugin
where
    F: Fn(&mut Engine) -> HookResult<()> + 'static,
{
    plugin.configure_engine(move |engine| {
        let result = f(engine);
        futures::future::ready(result).boxed_local()
    })
}

/// Expands `start` through `resolver` until only terminal values remain.
///
/// A value is expandable when `name_of` returns a name for it. Names with no
/// rule are terminal. A failing rule is logged and its name kept as is. A name
/// that reappears in its own expansion chain, or a chain deeper than
/// [`MAX_EXPANSION_DEPTH`], is logged and kept as a terminal.
async fn expand_recursive<T, F>(
    resolver: &Resolver<Vec<T>>,
    logger: &Logger,
    kind: &str,
    start: T,
    name_of: F,
) -> Vec<T>
where
    T: Clone + 'static,
    F: Fn(&T) -> Option<&str>,
{
    let mut out = Vec::new();
    let mut stack: Vec<(T, Vec<String>)> = vec![(start, Vec::new())];

    while let Some((current, chain)) = stack.pop() {
        let Some(name) = name_of(&current).map(str::to_string) else {
            out.push(current);
            continue;
        };
        if chain.contains(&name) {
            logger.warn(format!(
                "Circular {} \"{}\" detected ({} -> {}); keeping it unresolved.",
                kind,
                name,
                chain.join(" -> "),
                name
            ));
            out.push(current);
            continue;
        }
        if chain.len() >= MAX_EXPANSION_DEPTH {
            logger.warn(format!(
                "{} \"{}\" exceeds the maximum expansion depth of {}; keeping it unresolved.",
                kind, name, MAX_EXPANSION_DEPTH
            ));
            out.push(current);
            continue;
        }

        match resolver.resolve(&name).await {
            Ok(Some(resolved)) => {
                let mut next = chain;
                next.push(name);
                for value in resolved.into_iter().rev() {
                    stack.push((value, next.clone()));
                }
            }
            Ok(None) => out.push(current),
            Err(err) => {
                logger.warn(format!("Failed to resolve {} \"{}\": {}", kind, name, err));
                out.push(current);
            }
        }
    }
    out
}
