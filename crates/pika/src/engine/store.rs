//! Content-addressed atomic style storage.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::extractor::ExtractedStyleContent;

const ID_CHARS: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A declaration that survived the override/deletion collapse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StyleContent {
    pub selector: Vec<String>,
    pub property: String,
    pub value: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
}

/// A stored declaration and its generated class id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AtomicStyle {
    pub id: String,
    pub content: StyleContent,
}

/// Bijective base-52 encoding: `0 → a`, `51 → Z`, `52 → aa`, `53 → ab`.
pub fn number_to_chars(mut n: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(ID_CHARS[n % 52]);
        n /= 52;
        if n == 0 {
            break;
        }
        n -= 1;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Collapses one batch of declarations.
///
/// Declarations sharing `(selector, property, layer)` keep only the last
/// value, and a `None` value deletes the entry. Survivors are ordered by their
/// last occurrence.
pub fn optimize_atomic_style_contents(contents: Vec<ExtractedStyleContent>) -> Vec<StyleContent> {
    type Key = (Vec<String>, String, Option<String>);
    let mut collapsed: IndexMap<Key, Vec<String>> = IndexMap::new();

    for content in contents {
        let key = (content.selector, content.property, content.layer);
        collapsed.shift_remove(&key);
        if let Some(value) = content.value {
            collapsed.insert(key, value);
        }
    }

    collapsed
        .into_iter()
        .map(|((selector, property, layer), value)| StyleContent {
            selector,
            property,
            value,
            layer,
        })
        .collect()
}

/// Insertion-ordered store deduplicating by content.
#[derive(Debug, Default)]
pub struct AtomicStyleStore {
    styles: IndexMap<String, AtomicStyle>,
    ids: HashMap<StyleContent, String>,
}

impl AtomicStyleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `content`, storing it first if unseen.
    ///
    /// The second element is the newly created style, if any.
    pub fn intern(&mut self, content: StyleContent, prefix: &str) -> (String, Option<AtomicStyle>) {
        if let Some(id) = self.ids.get(&content) {
            return (id.clone(), None);
        }
        let id = format!("{}{}", prefix, number_to_chars(self.styles.len()));
        let style = AtomicStyle {
            id: id.clone(),
            content: content.clone(),
        };
        self.ids.insert(content, id.clone());
        self.styles.insert(id.clone(), style.clone());
        (id, Some(style))
    }

    pub fn get(&self, id: &str) -> Option<&AtomicStyle> {
        self.styles.get(id)
    }

    /// Styles in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &AtomicStyle> {
        self.styles.values()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
