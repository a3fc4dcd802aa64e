//! Accept/reject rule sets for crawl filtering
//!
//! This module provides the generic pattern matching used by every
//! filter dimension (schemes, hosts, ports, link strings, URLs,
//! extensions):
//! - Tagged patterns: exact values, regexes, or predicates
//! - Rule sets holding an accept list and a reject list
//! - Accept-list precedence: when accept rules exist, one must match
//!   and the reject list is ignored

use std::fmt;

/// A single matching pattern over values of type `T`
///
/// The three variants carry the three ways a rule can be written:
///
/// * [`Pattern::Exact`] compares by equality
/// * [`Pattern::Regex`] tests the value's string form
/// * [`Pattern::Predicate`] runs an arbitrary boxed closure
pub enum Pattern<T> {
    /// Matches values equal to the literal
    Exact(T),
    /// Matches values whose string form matches the regex
    Regex(regex::Regex),
    /// Matches values the predicate returns true for
    Predicate(Box<dyn Fn(&T) -> bool + Send + Sync>),
}

impl<T> Pattern<T> {
    /// Creates an exact-match pattern
    pub fn exact(value: T) -> Self {
        Self::Exact(value)
    }

    /// Creates a regex pattern, compiling the given expression
    ///
    /// # Arguments
    ///
    /// * `expression` - The regular expression source
    ///
    /// # Returns
    ///
    /// * `Ok(Pattern)` - Compiled pattern
    /// * `Err(regex::Error)` - The expression did not compile
    pub fn regex(expression: &str) -> Result<Self, regex::Error> {
        Ok(Self::Regex(regex::Regex::new(expression)?))
    }

    /// Creates a predicate pattern from a closure
    pub fn predicate<F>(test: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Box::new(test))
    }
}

impl<T> Pattern<T>
where
    T: PartialEq + fmt::Display,
{
    /// Tests a value against this pattern
    ///
    /// Exact patterns compare by equality, regex patterns match against
    /// the value's `Display` form, and predicate patterns delegate to
    /// the closure.
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Self::Exact(expected) => value == expected,
            Self::Regex(regex) => regex.is_match(&value.to_string()),
            Self::Predicate(test) => test(value),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Pattern<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(value) => f.debug_tuple("Exact").field(value).finish(),
            Self::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// An accept list and a reject list over values of type `T`
///
/// # Semantics
///
/// * Non-empty accept list: a value passes iff some accept pattern
///   matches it; the reject list is ignored entirely.
/// * Empty accept list: a value passes unless some reject pattern
///   matches it.
/// * Both lists empty: everything passes.
///
/// # Examples
///
/// ```
/// use spinneret::rules::{Pattern, RuleSet};
///
/// let mut hosts: RuleSet<String> = RuleSet::new();
/// hosts.reject(Pattern::exact("ads.example.com".to_string()));
///
/// assert!(hosts.accepts(&"example.com".to_string()));
/// assert!(!hosts.accepts(&"ads.example.com".to_string()));
/// ```
#[derive(Debug)]
pub struct RuleSet<T> {
    accept: Vec<Pattern<T>>,
    reject: Vec<Pattern<T>>,
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        Self {
            accept: Vec::new(),
            reject: Vec::new(),
        }
    }
}

impl<T> RuleSet<T> {
    /// Creates an empty rule set that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an accept rule
    pub fn accept(&mut self, pattern: Pattern<T>) -> &mut Self {
        self.accept.push(pattern);
        self
    }

    /// Adds a reject rule
    pub fn reject(&mut self, pattern: Pattern<T>) -> &mut Self {
        self.reject.push(pattern);
        self
    }

    /// Returns true if neither list holds any rules
    pub fn is_empty(&self) -> bool {
        self.accept.is_empty() && self.reject.is_empty()
    }
}

impl<T> RuleSet<T>
where
    T: PartialEq + fmt::Display,
{
    /// Decides whether a value passes this rule set
    pub fn accepts(&self, value: &T) -> bool {
        // Accept rules take precedence: when any exist, one must match
        if !self.accept.is_empty() {
            return self.accept.iter().any(|pattern| pattern.matches(value));
        }

        // Default-accept unless a reject rule matches
        !self.reject.iter().any(|pattern| pattern.matches(value))
    }
}
