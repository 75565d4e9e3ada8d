//! Rule-based reply selection.
//!
//! A selector holds an ordered list of keyword patterns, each tied to a fixed
//! reply. The first pattern that matches the lower-cased input wins; when none
//! match, the fallback reply is returned. No scoring and no blending.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Keyword category a rule belongs to. Built-in tables declare them in this
/// order: greeting, distress, gratitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Greeting,
    Distress,
    Gratitude,
}

/// Uncompiled rule, e.g. from a persona table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRule {
    pub category: Category,
    pub pattern: String,
    pub reply: String,
}

impl ReplyRule {
    pub fn new(category: Category, pattern: &str, reply: &str) -> Self {
        Self {
            category,
            pattern: pattern.to_string(),
            reply: reply.to_string(),
        }
    }
}

struct CompiledRule {
    category: Category,
    pattern: Regex,
    reply: String,
}

/// Result of a selection: the reply plus the category that produced it
/// (`None` for the fallback).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    pub reply: &'a str,
    pub category: Option<Category>,
}

/// Ordered keyword matcher with a fallback reply.
pub struct ReplySelector {
    rules: Vec<CompiledRule>,
    fallback: String,
}

impl ReplySelector {
    /// Compile `rules` in declaration order.
    ///
    /// Patterns are compiled case-insensitively; an invalid pattern fails the
    /// whole selector.
    pub fn new(rules: &[ReplyRule], fallback: impl Into<String>) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|r| {
                Ok(CompiledRule {
                    category: r.category,
                    pattern: Regex::new(&format!("(?i){}", r.pattern))?,
                    reply: r.reply.clone(),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            rules,
            fallback: fallback.into(),
        })
    }

    /// Pick the reply for `input`. Total over all strings; the empty string
    /// falls through to the fallback.
    pub fn select(&self, input: &str) -> Selection<'_> {
        let lower = input.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(&lower))
            .map(|rule| Selection {
                reply: &rule.reply,
                category: Some(rule.category),
            })
            .unwrap_or(Selection {
                reply: &self.fallback,
                category: None,
            })
    }

    /// Shorthand for `select(input).reply`.
    pub fn reply(&self, input: &str) -> &str {
        self.select(input).reply
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Categories in the order they are checked.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.rules.iter().map(|r| r.category)
    }
}

impl std::fmt::Debug for ReplySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplySelector")
            .field("rules", &self.rules.len())
            .field("fallback", &self.fallback)
            .finish()
    }
}
