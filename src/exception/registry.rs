use super::Rule;
use crate::category::FailureCategory;
use std::collections::HashMap;

/// Rules keyed by failure category.
///
/// Holds at most one rule per category; registering a second rule for the
/// same category replaces the first in place. Lookup walks the category's
/// ancestor chain, so the most specific registered rule always wins no matter
/// in which order rules were registered.
#[derive(Debug, Default, Clone)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
    index: HashMap<&'static FailureCategory, usize>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule, replacing any rule for the same category.
    ///
    /// Returns the replaced rule.
    pub fn register(&mut self, rule: Rule) -> Option<Rule> {
        let category = rule.category();
        match self.index.get(category) {
            Some(&position) => Some(std::mem::replace(&mut self.rules[position], rule)),
            None => {
                self.index.insert(category, self.rules.len());
                self.rules.push(rule);
                None
            }
        }
    }

    /// The rule registered for exactly this category, ignoring ancestors.
    pub fn get(&self, category: &FailureCategory) -> Option<&Rule> {
        self.index
            .get(category)
            .map(|&position| &self.rules[position])
    }

    /// The rule of the closest registered ancestor-or-self of `category`.
    pub fn resolve(&self, category: &FailureCategory) -> Option<&Rule> {
        category.ancestors().find_map(|candidate| self.get(candidate))
    }

    /// Rules in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
