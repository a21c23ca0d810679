//! Static and dynamic rule definitions.

use std::fmt;
use std::future::Future;
use std::ops::Index;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};
use regex::{Captures, Regex};

use crate::error::Result;

/// Boxed error returned by dynamic value producers.
pub type BoxError = Box<dyn std::error::Error + 'static>;

/// Which kind of rule produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Exact string match against a [`StaticRule`].
    Static,
    /// Pattern match against a [`DynamicRule`].
    Dynamic,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Static => write!(f, "static"),
            RuleKind::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// A rule matching one exact input string.
///
/// `key` identifies the rule inside a resolver (re-adding a key replaces the
/// rule); `string` is the input that triggers it.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticRule<T> {
    pub key: String,
    pub string: String,
    pub resolved: T,
}

impl<T> StaticRule<T> {
    /// Creates a rule whose key and trigger string are the same.
    pub fn new(string: impl Into<String>, resolved: T) -> Self {
        let string = string.into();
        Self {
            key: string.clone(),
            string,
            resolved,
        }
    }

    /// Overrides the rule key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}

/// Owned snapshot of a regex match handed to dynamic value producers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    input: String,
    groups: Vec<Option<String>>,
}

impl RuleMatch {
    pub(crate) fn from_captures(input: &str, captures: &Captures<'_>) -> Self {
        Self {
            input: input.to_string(),
            groups: captures
                .iter()
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
        }
    }

    /// The string that was resolved.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The whole match (group 0).
    pub fn as_str(&self) -> &str {
        self.get(0).unwrap_or_default()
    }

    /// Returns capture group `index`, if it participated in the match.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Number of groups including the implicit whole-match group.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Index<usize> for RuleMatch {
    type Output = str;

    /// Missing or non-participating groups index as the empty string.
    fn index(&self, index: usize) -> &str {
        self.get(index).unwrap_or_default()
    }
}

/// Type alias for dynamic value producers.
pub type ProduceFn<T> =
    Rc<dyn Fn(RuleMatch) -> LocalBoxFuture<'static, std::result::Result<T, BoxError>>>;

/// A rule matching any input accepted by a regular expression.
#[derive(Clone)]
pub struct DynamicRule<T> {
    pub key: String,
    pub pattern: Regex,
    produce: ProduceFn<T>,
}

impl<T: 'static> DynamicRule<T> {
    /// Creates a rule from a compiled pattern and a synchronous producer.
    pub fn new<F>(key: impl Into<String>, pattern: Regex, produce: F) -> Self
    where
        F: Fn(&RuleMatch) -> std::result::Result<T, BoxError> + 'static,
    {
        Self {
            key: key.into(),
            pattern,
            produce: Rc::new(move |m| {
                let result = produce(&m);
                async move { result }.boxed_local()
            }),
        }
    }

    /// Creates a rule whose producer is asynchronous.
    pub fn new_async<F, Fut>(key: impl Into<String>, pattern: Regex, produce: F) -> Self
    where
        F: Fn(RuleMatch) -> Fut + 'static,
        Fut: Future<Output = std::result::Result<T, BoxError>> + 'static,
    {
        Self {
            key: key.into(),
            pattern,
            produce: Rc::new(move |m| produce(m).boxed_local()),
        }
    }

    /// Compiles `pattern` and uses its source text as the rule key.
    pub fn from_pattern<F>(pattern: &str, produce: F) -> Result<Self>
    where
        F: Fn(&RuleMatch) -> std::result::Result<T, BoxError> + 'static,
    {
        let regex = Regex::new(pattern)?;
        Ok(Self::new(pattern, regex, produce))
    }

    pub(crate) fn produce(&self, m: RuleMatch) -> LocalBoxFuture<'static, std::result::Result<T, BoxError>> {
        (self.produce)(m)
    }
}

impl<T> fmt::Debug for DynamicRule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicRule")
            .field("key", &self.key)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}
