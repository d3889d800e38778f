//! View derivation: filtering and favorite partitioning.

use cybervault_common::{Category, VaultRecord};

/// Category filter intent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// Show every category.
    #[default]
    All,
    /// Show only one category.
    Only(Category),
}

impl CategoryFilter {
    /// Parse a filter value, where `"all"` selects everything.
    pub fn parse(value: &str) -> Self {
        match value {
            "all" => Self::All,
            other => Self::Only(Category::parse(other)),
        }
    }

    /// Check whether a record category passes the filter.
    pub fn matches(&self, category: &Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => category == wanted,
        }
    }
}

/// The filter intent currently applied to the collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewFilter {
    /// Case-insensitive search term; empty means no term filtering.
    pub search: String,
    /// Active category.
    pub category: CategoryFilter,
}

/// Derived, non-persisted projection of the collection.
///
/// Always a pure function of (collection, filter); never stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VaultView {
    /// Matching records with the favorite flag set, in collection order.
    pub favorites: Vec<VaultRecord>,
    /// Remaining matching records, in collection order.
    pub others: Vec<VaultRecord>,
    /// Number of records that passed the filter.
    pub matched: usize,
    /// Size of the underlying collection before filtering.
    pub total: usize,
}

impl VaultView {
    /// Check whether nothing passed the filter.
    pub fn is_empty(&self) -> bool {
        self.favorites.is_empty() && self.others.is_empty()
    }

    /// Iterate the filtered records, favorites first.
    pub fn iter(&self) -> impl Iterator<Item = &VaultRecord> {
        self.favorites.iter().chain(self.others.iter())
    }
}

/// Derive the filtered, partitioned view of a collection.
///
/// Pure and side-effect-free: identical inputs always produce identical
/// output and the collection is never mutated. Category narrows first, then
/// the search term is matched case-insensitively against title, website URL
/// and username (absent fields never match), and the survivors are
/// partitioned into favorites and others with relative order preserved.
pub fn derive_view(records: &[VaultRecord], filter: &ViewFilter) -> VaultView {
    let term = filter.search.trim();

    let mut favorites = Vec::new();
    let mut others = Vec::new();

    for record in records {
        if !filter.category.matches(&record.category) {
            continue;
        }
        if !term.is_empty() && !record.matches_term(term) {
            continue;
        }
        if record.is_favorite {
            favorites.push(record.clone());
        } else {
            others.push(record.clone());
        }
    }

    let matched = favorites.len() + others.len();
    VaultView {
        favorites,
        others,
        matched,
        total: records.len(),
    }
}
