//! Style definition model.
//!
//! A [`StyleDefinition`] is an ordered map whose keys are either CSS
//! properties or selectors. Property keys carry terminal values (a string, a
//! value with fallbacks, or `Null` as a deletion marker); selector keys carry a
//! nested definition or a list of [`StyleItem`]s. Keys starting with `__` are
//! reserved for plugins (`__layer`, `__important`, `__shortcut`).
//!
//! Definitions are usually written with `serde_json::json!` and converted with
//! `TryFrom<serde_json::Value>`; key order is preserved.
//!
//! ```rust
//! use pika::{StyleDefinition, StyleValue};
//! use serde_json::json;
//!
//! let def = StyleDefinition::try_from(json!({
//!     "color": "red",
//!     "fontSize": 14,
//!     "$:hover": { "color": ["blue", ["navy"]] },
//! }))
//! .unwrap();
//!
//! assert_eq!(def.get("color"), Some(&StyleValue::from("red")));
//! assert_eq!(def.get("fontSize"), Some(&StyleValue::from("14")));
//! assert!(matches!(def.get("$:hover"), Some(StyleValue::Definition(_))));
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::PikaError;

/// Value stored under a key of a [`StyleDefinition`].
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    /// Deletion marker for a property.
    Null,
    /// Flag consumed by plugins (for example `__important`).
    Bool(bool),
    /// A single property value.
    Value(String),
    /// A property value followed by fallbacks, each emitted as its own line.
    Fallback(String, Vec<String>),
    /// A list of style items nested under a selector.
    Items(Vec<StyleItem>),
    /// A nested definition under a selector.
    Definition(StyleDefinition),
}

impl StyleValue {
    /// Creates a value with fallbacks.
    pub fn fallback<I, S>(value: impl Into<String>, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StyleValue::Fallback(value.into(), fallbacks.into_iter().map(Into::into).collect())
    }

    /// Returns true for terminal property values (including `Null`).
    pub fn is_property_value(&self) -> bool {
        matches!(
            self,
            StyleValue::Null | StyleValue::Value(_) | StyleValue::Fallback(_, _)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StyleValue::Value(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Value(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        StyleValue::Value(value)
    }
}

impl From<i64> for StyleValue {
    fn from(value: i64) -> Self {
        StyleValue::Value(value.to_string())
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        StyleValue::Value(value.to_string())
    }
}

impl From<bool> for StyleValue {
    fn from(value: bool) -> Self {
        StyleValue::Bool(value)
    }
}

impl<T: Into<StyleValue>> From<Option<T>> for StyleValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(StyleValue::Null, Into::into)
    }
}

impl From<StyleDefinition> for StyleValue {
    fn from(value: StyleDefinition) -> Self {
        StyleValue::Definition(value)
    }
}

impl From<Vec<StyleItem>> for StyleValue {
    fn from(value: Vec<StyleItem>) -> Self {
        StyleValue::Items(value)
    }
}

/// One entry accepted by `Engine::use_styles`: a name or a definition.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleItem {
    Name(String),
    Definition(StyleDefinition),
}

impl StyleItem {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            StyleItem::Name(name) => Some(name),
            StyleItem::Definition(_) => None,
        }
    }

    pub fn as_definition(&self) -> Option<&StyleDefinition> {
        match self {
            StyleItem::Definition(def) => Some(def),
            StyleItem::Name(_) => None,
        }
    }
}

impl From<&str> for StyleItem {
    fn from(value: &str) -> Self {
        StyleItem::Name(value.to_string())
    }
}

impl From<String> for StyleItem {
    fn from(value: String) -> Self {
        StyleItem::Name(value)
    }
}

impl From<StyleDefinition> for StyleItem {
    fn from(value: StyleDefinition) -> Self {
        StyleItem::Definition(value)
    }
}

/// JSON strings become names, objects become definitions and anything else
/// becomes an opaque name holding its JSON text.
impl From<Value> for StyleItem {
    fn from(value: Value) -> Self {
        match value {
            Value::String(name) => StyleItem::Name(name),
            Value::Object(map) => StyleItem::Definition(StyleDefinition::from_json_map(map)),
            other => StyleItem::Name(other.to_string()),
        }
    }
}

/// Ordered map of properties and nested selectors.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct StyleDefinition {
    entries: IndexMap<String, StyleValue>,
}

impl StyleDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces `key`, keeping its original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<StyleValue>) -> Option<StyleValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut StyleValue> {
        self.entries.get_mut(key)
    }

    /// Removes `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<StyleValue> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StyleValue)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut StyleValue)> {
        self.entries.iter_mut()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    fn from_json_map(map: serde_json::Map<String, Value>) -> Self {
        let entries = map
            .into_iter()
            .map(|(key, value)| (key, style_value_from_json(value)))
            .collect();
        Self { entries }
    }
}

impl IntoIterator for StyleDefinition {
    type Item = (String, StyleValue);
    type IntoIter = indexmap::map::IntoIter<String, StyleValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>, V: Into<StyleValue>> FromIterator<(K, V)> for StyleDefinition {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl TryFrom<Value> for StyleDefinition {
    type Error = PikaError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self::from_json_map(map)),
            other => Err(PikaError::Config(format!(
                "style definition must be an object, got {}",
                other
            ))),
        }
    }
}

fn json_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `[value, [fallback, ...]]` where the fallbacks are scalars or null.
fn json_fallback(items: &[Value]) -> Option<(String, Vec<String>)> {
    let [first, Value::Array(rest)] = items else {
        return None;
    };
    let value = json_scalar(first)?;
    let mut fallbacks = Vec::with_capacity(rest.len());
    for item in rest {
        match item {
            Value::Null => {}
            other => fallbacks.push(json_scalar(other)?),
        }
    }
    Some((value, fallbacks))
}

fn style_value_from_json(value: Value) -> StyleValue {
    match value {
        Value::Null => StyleValue::Null,
        Value::Bool(b) => StyleValue::Bool(b),
        Value::String(s) => StyleValue::Value(s),
        Value::Number(n) => StyleValue::Value(n.to_string()),
        Value::Object(map) => StyleValue::Definition(StyleDefinition::from_json_map(map)),
        Value::Array(items) => match json_fallback(&items) {
            Some((value, fallbacks)) => StyleValue::Fallback(value, fallbacks),
            None => StyleValue::Items(items.into_iter().map(StyleItem::from).collect()),
        },
    }
}
