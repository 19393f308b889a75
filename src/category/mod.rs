//! Failure categories
//!
//! A [`FailureCategory`] classifies a raised failure. Categories form a tree:
//! each one may refine a more general parent, and resolution walks that chain
//! from the most specific category outward.
//!
//! Categories are declared as `static` items so they can be referenced from
//! rules, classifiers and `#[derive(Categorized)]` attributes alike:
//!
//! ```rust
//! use meshestra_exception::category::{FailureCategory, FAILURE};
//!
//! pub static PAYMENT: FailureCategory = FailureCategory::refines("Payment", &FAILURE);
//! pub static CARD_DECLINED: FailureCategory = FailureCategory::refines("CardDeclined", &PAYMENT);
//!
//! let chain: Vec<_> = CARD_DECLINED.ancestors().map(|c| c.name()).collect();
//! assert_eq!(chain, ["CardDeclined", "Payment", "Failure"]);
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

pub mod builtin;

pub use builtin::*;

/// A node in the failure category hierarchy.
///
/// Identity is the category's path: its own name followed by the names of
/// all its ancestors. Two declarations with the same path are equal and share
/// a rule slot in the registry; a same-named category under a different
/// parent is a different category.
#[derive(Debug)]
pub struct FailureCategory {
    name: &'static str,
    parent: Option<&'static FailureCategory>,
}

impl FailureCategory {
    /// A category with no parent.
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// A category refining `parent`.
    pub const fn refines(name: &'static str, parent: &'static FailureCategory) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static FailureCategory> {
        self.parent
    }

    /// Walk from this category to the most general one, starting with `self`.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Whether this category is `other` or refines it, directly or transitively.
    pub fn is_a(&self, other: &FailureCategory) -> bool {
        self.ancestors().any(|c| c == other)
    }

    /// Number of parents between this category and its root.
    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }
}

impl PartialEq for FailureCategory {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || self
                .ancestors()
                .map(FailureCategory::name)
                .eq(other.ancestors().map(FailureCategory::name))
    }
}

impl Eq for FailureCategory {}

impl Hash for FailureCategory {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for category in self.ancestors() {
            category.name.hash(state);
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Iterator returned by [`FailureCategory::ancestors`].
pub struct Ancestors<'a> {
    next: Option<&'a FailureCategory>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a FailureCategory;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.map(|p| p as &'a FailureCategory);
        Some(current)
    }
}
