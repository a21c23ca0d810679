//! Pika Resolver - memoized name resolution.
//!
//! A [`Resolver`] maps input strings to values through two kinds of rules:
//!
//! - [`StaticRule`]: matches one exact string.
//! - [`DynamicRule`]: matches a regular expression and produces the value from
//!   the match, possibly asynchronously.
//!
//! Resolution order is: cache, static rules, dynamic rules in registration
//! order. The first successful resolution of a string is cached and reported to
//! observers registered with [`Resolver::on_resolved`]; later lookups replay the
//! cache silently. A string no rule matches resolves to `None`, which is not an
//! error.
//!
//! # Quick Start
//!
//! ```rust
//! use futures::executor::block_on;
//! use pika_resolver::{DynamicRule, Resolver, StaticRule};
//! use regex::Regex;
//!
//! let resolver = Resolver::new();
//! resolver
//!     .add_static_rule(StaticRule::new("hover", "$:hover".to_string()))
//!     .add_dynamic_rule(DynamicRule::new(
//!         "breakpoint",
//!         Regex::new(r"^screen-(\d+)$").unwrap(),
//!         |m| Ok(format!("@media (min-width: {}px)", &m[1])),
//!     ));
//!
//! assert_eq!(block_on(resolver.resolve("hover")).unwrap().as_deref(), Some("$:hover"));
//! assert_eq!(
//!     block_on(resolver.resolve("screen-768")).unwrap().as_deref(),
//!     Some("@media (min-width: 768px)")
//! );
//! assert_eq!(block_on(resolver.resolve("unknown")).unwrap(), None);
//! ```
//!
//! # Cache Invalidation
//!
//! Each cached result remembers the rule that produced it. Removing or
//! replacing a rule evicts exactly those results, so overlapping dynamic
//! patterns never invalidate each other. Results seeded with
//! [`Resolver::set_resolved_result`] have no owning rule; removing a dynamic
//! rule evicts seeded results its pattern matches.

mod error;
mod resolver;
mod rule;

pub use error::{ResolveError, Result};
pub use resolver::{OnResolvedFn, Resolver};
pub use rule::{BoxError, DynamicRule, ProduceFn, RuleKind, RuleMatch, StaticRule};

// Re-exported so callers can build patterns without a direct dependency.
pub use regex::Regex;
