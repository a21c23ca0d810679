//! The memoizing resolver.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{ResolveError, Result};
use crate::rule::{DynamicRule, RuleKind, RuleMatch, StaticRule};

/// Type alias for resolution observers.
pub type OnResolvedFn<T> = Rc<dyn Fn(&str, RuleKind, &T)>;

#[derive(Clone)]
struct CacheEntry<T> {
    value: T,
    // None for entries seeded through `set_resolved_result`.
    owner: Option<(RuleKind, String)>,
}

/// Resolves names to values through static and dynamic rules.
///
/// Static rules are checked first by exact string equality, then dynamic rules
/// in registration order; the first match wins. Every fresh resolution is
/// cached and reported once to the registered observers. Cache hits are
/// returned silently.
///
/// All methods take `&self`: rule maps and the cache live behind `RefCell`s so
/// a resolver can be shared through an `Rc` by the hooks that consult it. No
/// borrow is held across the await of a dynamic producer.
pub struct Resolver<T> {
    static_rules: RefCell<IndexMap<String, StaticRule<T>>>,
    dynamic_rules: RefCell<IndexMap<String, DynamicRule<T>>>,
    cache: RefCell<HashMap<String, CacheEntry<T>>>,
    observers: RefCell<Vec<OnResolvedFn<T>>>,
}

impl<T> Default for Resolver<T> {
    fn default() -> Self {
        Self {
            static_rules: RefCell::new(IndexMap::new()),
            dynamic_rules: RefCell::new(IndexMap::new()),
            cache: RefCell::new(HashMap::new()),
            observers: RefCell::new(Vec::new()),
        }
    }
}

impl<T: Clone + 'static> Resolver<T> {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer fired once per fresh resolution.
    pub fn on_resolved<F>(&self, f: F) -> &Self
    where
        F: Fn(&str, RuleKind, &T) + 'static,
    {
        self.observers.borrow_mut().push(Rc::new(f));
        self
    }

    /// Adds a static rule, replacing any rule with the same key.
    ///
    /// Cached results produced by the replaced rule are evicted.
    pub fn add_static_rule(&self, rule: StaticRule<T>) -> &Self {
        let key = rule.key.clone();
        if self.static_rules.borrow_mut().insert(key.clone(), rule).is_some() {
            self.evict_owned(RuleKind::Static, &key);
        }
        self
    }

    /// Removes a static rule by key and evicts its cached result.
    ///
    /// A seeded entry for the rule's string is dropped as well; a result
    /// another rule produced for that string is kept.
    pub fn remove_static_rule(&self, key: &str) -> Option<StaticRule<T>> {
        let removed = self.static_rules.borrow_mut().shift_remove(key)?;
        self.evict_owned(RuleKind::Static, key);
        let mut cache = self.cache.borrow_mut();
        if cache.get(&removed.string).is_some_and(|entry| entry.owner.is_none()) {
            cache.remove(&removed.string);
        }
        drop(cache);
        Some(removed)
    }

    /// Adds a dynamic rule, replacing any rule with the same key.
    pub fn add_dynamic_rule(&self, rule: DynamicRule<T>) -> &Self {
        let key = rule.key.clone();
        if self.dynamic_rules.borrow_mut().insert(key.clone(), rule).is_some() {
            self.evict_owned(RuleKind::Dynamic, &key);
        }
        self
    }

    /// Removes a dynamic rule by key.
    ///
    /// Evicts every cached result the rule produced, plus any seeded entry
    /// whose string matches the rule's pattern. Results produced by other
    /// rules are kept even when the patterns overlap.
    pub fn remove_dynamic_rule(&self, key: &str) -> Option<DynamicRule<T>> {
        let removed = self.dynamic_rules.borrow_mut().shift_remove(key)?;
        self.cache.borrow_mut().retain(|string, entry| match &entry.owner {
            Some((kind, owner)) => !(*kind == RuleKind::Dynamic && owner == key),
            None => !removed.pattern.is_match(string),
        });
        Some(removed)
    }

    /// Seeds the cache with a result for `string`.
    pub fn set_resolved_result(&self, string: impl Into<String>, value: T) -> &Self {
        self.cache
            .borrow_mut()
            .insert(string.into(), CacheEntry { value, owner: None });
        self
    }

    /// Resolves `string`.
    ///
    /// Returns `Ok(None)` when no rule matches; an error only when a dynamic
    /// producer fails, in which case nothing is cached.
    pub async fn resolve(&self, string: &str) -> Result<Option<T>> {
        let cached = self.cache.borrow().get(string).map(|e| e.value.clone());
        if cached.is_some() {
            return Ok(cached);
        }

        let static_hit = self
            .static_rules
            .borrow()
            .values()
            .find(|rule| rule.string == string)
            .map(|rule| (rule.key.clone(), rule.resolved.clone()));
        if let Some((key, value)) = static_hit {
            self.remember(string, RuleKind::Static, key, value.clone());
            return Ok(Some(value));
        }

        let dynamic_hit = self.dynamic_rules.borrow().values().find_map(|rule| {
            rule.pattern
                .captures(string)
                .map(|caps| (rule.clone(), RuleMatch::from_captures(string, &caps)))
        });
        let Some((rule, matched)) = dynamic_hit else {
            return Ok(None);
        };

        let value = rule
            .produce(matched)
            .await
            .map_err(|e| ResolveError::rule(&rule.key, string, e.to_string()))?;
        self.remember(string, RuleKind::Dynamic, rule.key.clone(), value.clone());
        Ok(Some(value))
    }

    /// Returns true if a static rule with `key` exists.
    pub fn has_static_rule(&self, key: &str) -> bool {
        self.static_rules.borrow().contains_key(key)
    }

    /// Returns true if a dynamic rule with `key` exists.
    pub fn has_dynamic_rule(&self, key: &str) -> bool {
        self.dynamic_rules.borrow().contains_key(key)
    }

    /// Snapshot of the static rules in registration order.
    pub fn static_rules(&self) -> Vec<StaticRule<T>> {
        self.static_rules.borrow().values().cloned().collect()
    }

    /// Snapshot of the dynamic rules in registration order.
    pub fn dynamic_rules(&self) -> Vec<DynamicRule<T>> {
        self.dynamic_rules.borrow().values().cloned().collect()
    }

    /// Returns true if `string` has a cached result.
    pub fn is_cached(&self, string: &str) -> bool {
        self.cache.borrow().contains_key(string)
    }

    /// Number of cached results.
    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }

    fn remember(&self, string: &str, kind: RuleKind, key: String, value: T) {
        self.cache.borrow_mut().insert(
            string.to_string(),
            CacheEntry {
                value: value.clone(),
                owner: Some((kind, key)),
            },
        );
        let observers = self.observers.borrow().clone();
        for observer in observers {
            observer(string, kind, &value);
        }
    }

    fn evict_owned(&self, kind: RuleKind, key: &str) {
        self.cache.borrow_mut().retain(|_, entry| match &entry.owner {
            Some((k, owner)) => !(*k == kind && owner == key),
            None => true,
        });
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("static_rules", &self.static_rules.borrow().len())
            .field("dynamic_rules", &self.dynamic_rules.borrow().len())
            .field("cached", &self.cache.borrow().len())
            .field("observers", &self.observers.borrow().len())
            .finish()
    }
}
