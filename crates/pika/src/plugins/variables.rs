//! CSS custom properties rendered as a preflight.
//!
//! Variables are declared in a [`VariablesDefinition`]: keys starting with
//! `--` declare a variable, any other key opens a nested scope selector.
//! Top-level variables land under `:root`. At render time, variables marked
//! for pruning are emitted only when some stored atomic style references them
//! through `var(--name…)` or the name is on the safe list.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::on_configure_engine;
use crate::engine::{Engine, Preflight, PreflightOutput};
use crate::error::PikaError;
use crate::plugin::EnginePlugin;
use crate::style::{StyleDefinition, StyleValue};

static VAR_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"var\(\s*(--[\w-]+)").expect("valid var() pattern"));

const ROOT_SELECTOR: &str = ":root";

/// Names referenced through `var()` in `value`, in order of appearance.
///
/// ```rust
/// use pika::plugins::extract_used_var_names;
///
/// assert_eq!(extract_used_var_names("var(--a, var(--b))"), vec!["--a", "--b"]);
/// assert!(extract_used_var_names("red").is_empty());
/// ```
pub fn extract_used_var_names(value: &str) -> Vec<String> {
    VAR_REFERENCE
        .captures_iter(value)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Prefixes `--` unless already present.
pub fn normalize_variable_name(name: &str) -> String {
    if name.starts_with("--") {
        name.to_string()
    } else {
        format!("--{}", name)
    }
}

/// Editor hints for a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableAutocomplete {
    /// Properties that suggest `var(--name)`; `*` means every property.
    pub as_value_of: Vec<String>,
    /// Suggest the variable itself as a property name.
    pub as_property: bool,
}

impl Default for VariableAutocomplete {
    fn default() -> Self {
        Self {
            as_value_of: vec!["*".to_string()],
            as_property: true,
        }
    }
}

/// A variable with per-entry options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variable {
    /// `None` registers the name for autocomplete only.
    pub value: Option<String>,
    pub autocomplete: VariableAutocomplete,
    /// Overrides the plugin-wide pruning flag.
    pub prune_unused: Option<bool>,
}

impl Variable {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn unset() -> Self {
        Self::default()
    }

    pub fn prune_unused(mut self, prune: bool) -> Self {
        self.prune_unused = Some(prune);
        self
    }

    pub fn as_value_of<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.autocomplete.as_value_of = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn as_property(mut self, enabled: bool) -> Self {
        self.autocomplete.as_property = enabled;
        self
    }
}

/// Value under a key of a [`VariablesDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub enum VariableEntry {
    Variable(Variable),
    Scope(VariablesDefinition),
}

impl From<&str> for VariableEntry {
    fn from(value: &str) -> Self {
        VariableEntry::Variable(Variable::new(value))
    }
}

impl From<String> for VariableEntry {
    fn from(value: String) -> Self {
        VariableEntry::Variable(Variable::new(value))
    }
}

impl From<Option<&str>> for VariableEntry {
    fn from(value: Option<&str>) -> Self {
        VariableEntry::Variable(value.map(Variable::new).unwrap_or_default())
    }
}

impl From<Variable> for VariableEntry {
    fn from(value: Variable) -> Self {
        VariableEntry::Variable(value)
    }
}

impl From<VariablesDefinition> for VariableEntry {
    fn from(value: VariablesDefinition) -> Self {
        VariableEntry::Scope(value)
    }
}

/// Ordered map of variables and nested scopes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct VariablesDefinition {
    entries: IndexMap<String, VariableEntry>,
}

impl VariablesDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a variable (`--name`) or scope (any other key).
    pub fn with(mut self, key: impl Into<String>, entry: impl Into<VariableEntry>) -> Self {
        self.entries.insert(key.into(), entry.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VariableEntry)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Value> for VariablesDefinition {
    type Error = PikaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(map) = value else {
            return Err(PikaError::Config(format!(
                "variables definition must be an object, got {}",
                value
            )));
        };
        let mut entries = IndexMap::new();
        for (key, value) in map {
            let entry = if key.starts_with("--") {
                VariableEntry::Variable(variable_from_json(&key, value)?)
            } else {
                VariableEntry::Scope(VariablesDefinition::try_from(value)?)
            };
            entries.insert(key, entry);
        }
        Ok(Self { entries })
    }
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn variable_from_json(name: &str, value: Value) -> Result<Variable, PikaError> {
    let invalid = |what: &str| PikaError::Config(format!("variable \"{}\": {}", name, what));
    match value {
        Value::Null => Ok(Variable::unset()),
        Value::String(_) | Value::Number(_) => Ok(Variable {
            value: json_text(&value),
            ..Default::default()
        }),
        Value::Object(map) => {
            let mut variable = Variable::unset();
            if let Some(v) = map.get("value").filter(|v| !v.is_null()) {
                variable.value = Some(json_text(v).ok_or_else(|| invalid("value must be a string or number"))?);
            }
            if let Some(prune) = map.get("pruneUnused") {
                variable.prune_unused =
                    Some(prune.as_bool().ok_or_else(|| invalid("pruneUnused must be a boolean"))?);
            }
            if let Some(Value::Object(ac)) = map.get("autocomplete") {
                match ac.get("asValueOf") {
                    Some(Value::String(s)) => variable.autocomplete.as_value_of = vec![s.clone()],
                    Some(Value::Array(items)) => {
                        variable.autocomplete.as_value_of =
                            items.iter().filter_map(json_text).collect()
                    }
                    _ => {}
                }
                if let Some(flag) = ac.get("asProperty").and_then(Value::as_bool) {
                    variable.autocomplete.as_property = flag;
                }
            }
            Ok(variable)
        }
        other => Err(invalid(&format!("unsupported value {}", other))),
    }
}

/// Configuration of the variables plugin.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesConfig {
    #[serde(default, deserialize_with = "one_or_many")]
    pub variables: Vec<VariablesDefinition>,
    /// Defaults to `true`.
    #[serde(default)]
    pub prune_unused: Option<bool>,
    /// Names always emitted, with or without the `--` prefix.
    #[serde(default)]
    pub safe_list: Vec<String>,
}

impl VariablesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, definition: VariablesDefinition) -> Self {
        self.variables.push(definition);
        self
    }

    pub fn prune_unused(mut self, prune: bool) -> Self {
        self.prune_unused = Some(prune);
        self
    }

    pub fn safe(mut self, name: impl Into<String>) -> Self {
        self.safe_list.push(name.into());
        self
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<VariablesDefinition>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(VariablesDefinition),
        Many(Vec<VariablesDefinition>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(definition) => vec![definition],
        OneOrMany::Many(definitions) => definitions,
    })
}

#[derive(Debug, Clone, PartialEq)]
struct ResolvedVariable {
    name: String,
    value: Option<String>,
    scope: Vec<String>,
    prune_unused: bool,
    autocomplete: VariableAutocomplete,
}

#[derive(Debug, Default)]
struct VariablesStore {
    // Several entries per name when a variable is defined in several scopes.
    entries: IndexMap<String, Vec<ResolvedVariable>>,
    safe_list: IndexSet<String>,
    prune_default: bool,
}

impl VariablesStore {
    fn resolve(&self, definition: &VariablesDefinition) -> Vec<ResolvedVariable> {
        let mut out = Vec::new();
        collect_variables(definition, &[], self.prune_default, &mut out);
        out
    }

    fn extend(&mut self, variables: Vec<ResolvedVariable>) {
        for variable in variables {
            self.entries
                .entry(variable.name.clone())
                .or_default()
                .push(variable);
        }
    }

    fn render(&self, engine: &Engine) -> StyleDefinition {
        let used: HashSet<String> = engine
            .atomic_styles()
            .flat_map(|style| style.content.value.iter())
            .flat_map(|value| extract_used_var_names(value))
            .collect();

        let mut root = StyleDefinition::new();
        for variable in self.entries.values().flatten() {
            let Some(value) = &variable.value else {
                continue;
            };
            let keep = !variable.prune_unused
                || self.safe_list.contains(&variable.name)
                || used.contains(&variable.name);
            if !keep {
                continue;
            }
            let scope = if variable.scope.is_empty() {
                vec![ROOT_SELECTOR.to_string()]
            } else {
                variable.scope.clone()
            };
            insert_at(&mut root, &scope, &variable.name, value);
        }
        root
    }
}

fn collect_variables(
    definition: &VariablesDefinition,
    scope: &[String],
    prune_default: bool,
    out: &mut Vec<ResolvedVariable>,
) {
    for (key, entry) in definition.iter() {
        match entry {
            VariableEntry::Variable(variable) => out.push(ResolvedVariable {
                name: normalize_variable_name(key),
                value: variable.value.clone(),
                scope: scope.to_vec(),
                prune_unused: variable.prune_unused.unwrap_or(prune_default),
                autocomplete: variable.autocomplete.clone(),
            }),
            VariableEntry::Scope(nested) => {
                let mut inner = scope.to_vec();
                inner.push(key.clone());
                collect_variables(nested, &inner, prune_default, out);
            }
        }
    }
}

fn insert_at(definition: &mut StyleDefinition, scope: &[String], name: &str, value: &str) {
    let Some((head, rest)) = scope.split_first() else {
        definition.insert(name, value);
        return;
    };
    if !matches!(definition.get(head), Some(StyleValue::Definition(_))) {
        definition.insert(head.clone(), StyleDefinition::new());
    }
    if let Some(StyleValue::Definition(child)) = definition.get_mut(head) {
        insert_at(child, rest, name, value);
    }
}

fn register_autocomplete(engine: &mut Engine, variables: &[ResolvedVariable]) {
    for variable in variables {
        if variable.autocomplete.as_property {
            engine.append_autocomplete_extra_css_properties([variable.name.clone()]);
        }
        let reference = format!("var({})", variable.name);
        for property in &variable.autocomplete.as_value_of {
            engine.append_autocomplete_css_property_values(property, [reference.clone()]);
        }
    }
}

#[derive(Clone)]
struct VariablesHandle(Rc<RefCell<VariablesStore>>);

pub fn variables() -> EnginePlugin {
    on_configure_engine(EnginePlugin::new("core:variables"), |engine| {
        let config = engine.config().raw_config.variables.clone().unwrap_or_default();
        let mut store = VariablesStore {
            prune_default: config.prune_unused.unwrap_or(true),
            safe_list: config
                .safe_list
                .iter()
                .map(|name| normalize_variable_name(name))
                .collect(),
            ..Default::default()
        };
        let resolved: Vec<ResolvedVariable> = config
            .variables
            .iter()
            .flat_map(|definition| store.resolve(definition))
            .collect();
        register_autocomplete(engine, &resolved);
        store.extend(resolved);

        let store = Rc::new(RefCell::new(store));
        engine.extensions.insert(VariablesHandle(store.clone()));
        engine.add_preflight(Preflight::from_fn(move |engine, _| {
            PreflightOutput::Definition(store.borrow().render(engine))
        }));
        Ok(())
    })
}

/// Runtime access to the variables plugin, from [`Engine::variables`].
pub struct VariablesApi<'a> {
    engine: &'a mut Engine,
    store: Rc<RefCell<VariablesStore>>,
}

impl VariablesApi<'_> {
    /// Registers more variables and notifies `preflight_updated`.
    pub fn add(&mut self, definition: VariablesDefinition) {
        let resolved = self.store.borrow().resolve(&definition);
        register_autocomplete(self.engine, &resolved);
        self.store.borrow_mut().extend(resolved);
        self.engine.notify_preflight_updated();
    }

    /// Registered variable names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.store.borrow().entries.keys().cloned().collect()
    }
}

impl Engine {
    /// The variables plugin API, if the plugin is installed.
    pub fn variables(&mut self) -> Option<VariablesApi<'_>> {
        let store = self.extensions.get::<VariablesHandle>()?.0.clone();
        Some(VariablesApi {
            engine: self,
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_used_var_names() {
        assert_eq!(extract_used_var_names("var(--color)"), vec!["--color"]);
        assert_eq!(extract_used_var_names("var(--color) var(--bg)"), vec!["--color", "--bg"]);
        assert_eq!(extract_used_var_names("var(--color, red)"), vec!["--color"]);
        assert_eq!(extract_used_var_names("var( --spaced)"), vec!["--spaced"]);
        assert_eq!(
            extract_used_var_names("1px solid var(--border-color)"),
            vec!["--border-color"]
        );
        assert!(extract_used_var_names("").is_empty());
    }

    #[test]
    fn test_normalize_variable_name() {
        assert_eq!(normalize_variable_name("--color"), "--color");
        assert_eq!(normalize_variable_name("color"), "--color");
        assert_eq!(normalize_variable_name(""), "--");
    }

    #[test]
    fn test_definition_from_json() {
        let def = VariablesDefinition::try_from(json!({
            "--color": "#fff",
            "--size": 4,
            "--external": null,
            "--always": {"value": "red", "pruneUnused": false, "autocomplete": {"asValueOf": "color", "asProperty": false}},
            "[data-theme=\"dark\"]": {"--color": "#000"},
        }))
        .unwrap();

        let expected = VariablesDefinition::new()
            .with("--color", "#fff")
            .with("--size", "4")
            .with("--external", None::<&str>)
            .with(
                "--always",
                Variable::new("red").prune_unused(false).as_value_of(["color"]).as_property(false),
            )
            .with(
                "[data-theme=\"dark\"]",
                VariablesDefinition::new().with("--color", "#000"),
            );
        assert_eq!(def, expected);
    }

    #[test]
    fn test_definition_rejects_bad_values() {
        assert!(VariablesDefinition::try_from(json!({"--x": true})).is_err());
        assert!(VariablesDefinition::try_from(json!({".scope": "red"})).is_err());
        assert!(VariablesDefinition::try_from(json!(["--x"])).is_err());
    }

    #[test]
    fn test_config_accepts_object_or_array() {
        let single: VariablesConfig =
            serde_json::from_value(json!({"variables": {"--a": "one"}, "pruneUnused": false}))
                .unwrap();
        assert_eq!(single.variables.len(), 1);
        assert_eq!(single.prune_unused, Some(false));

        let many: VariablesConfig = serde_json::from_value(json!({
            "variables": [{"--a": "one"}, {"--b": "two"}],
            "safeList": ["b"],
        }))
        .unwrap();
        assert_eq!(many.variables.len(), 2);
        assert_eq!(many.safe_list, vec!["b"]);
    }

    #[test]
    fn test_collect_nested_scopes() {
        let def = VariablesDefinition::new()
            .with("--a", "1")
            .with(".x", VariablesDefinition::new().with(".y", VariablesDefinition::new().with("b", "2")));
        let mut out = Vec::new();
        collect_variables(&def, &[], true, &mut out);

        assert_eq!(out.len(), 2);
        assert!(out[0].scope.is_empty());
        assert_eq!(out[1].name, "--b");
        assert_eq!(out[1].scope, vec![".x", ".y"]);
    }

    #[test]
    fn test_insert_at_builds_nested_blocks() {
        let mut root = StyleDefinition::new();
        insert_at(&mut root, &[":root".into()], "--a", "1");
        insert_at(&mut root, &[":root".into()], "--b", "2");
        insert_at(&mut root, &[".dark".into(), ".card".into()], "--a", "3");

        let expected = StyleDefinition::try_from(json!({
            ":root": {"--a": "1", "--b": "2"},
            ".dark": {".card": {"--a": "3"}},
        }))
        .unwrap();
        assert_eq!(root, expected);
    }
}
