use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::records::TaxonomyRow;
use crate::taxonomy::{self, CategoryNode, FlatNode, Forest};

/// Rows shown per page of the category table.
pub const PAGE_SIZE: usize = 10;

/// Which categories to keep by their `ACTIVE` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    pub fn accepts(self, active: bool) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => active,
            StatusFilter::Inactive => !active,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "inactive" => Ok(StatusFilter::Inactive),
            _ => Err(CatalogError::InvalidStatus(s.to_string())),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Inactive => "inactive",
        })
    }
}

/// Case-insensitive substring match on name or url. The query is trimmed
/// first and an empty query matches every node.
pub fn matches_search(node: &CategoryNode, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    node.name.to_lowercase().contains(&query) || node.url.to_lowercase().contains(&query)
}

/// Applies the search filter, then the status filter, keeping order.
pub fn filter_nodes<'a>(
    nodes: &[FlatNode<'a>],
    search: &str,
    status: StatusFilter,
) -> Vec<FlatNode<'a>> {
    nodes
        .iter()
        .filter(|flat| matches_search(flat.node, search))
        .filter(|flat| status.accepts(flat.node.active))
        .copied()
        .collect()
}

/// One page of a longer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number that was requested.
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Slices out page `page` (1-based). Page 0 and pages past the end come back
/// empty rather than as an error.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let total_items = items.len();
    let total_pages = if page_size == 0 {
        0
    } else {
        total_items.div_ceil(page_size)
    };

    let slice = match page.checked_sub(1) {
        Some(index) if page_size > 0 => {
            let start = index.saturating_mul(page_size).min(total_items);
            let end = start.saturating_add(page_size).min(total_items);
            &items[start..end]
        }
        _ => &items[..0],
    };

    Page {
        items: slice.to_vec(),
        page,
        page_size,
        total_items,
        total_pages,
    }
}

/// Search, status and page selected on the category screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default = "first_page")]
    pub page: usize,
}

fn first_page() -> usize {
    1
}

impl Default for ListingQuery {
    fn default() -> Self {
        ListingQuery {
            search: String::new(),
            status: StatusFilter::All,
            page: first_page(),
        }
    }
}

/// Parses a comma separated id list such as `"1, 4,9"`. Blank entries are
/// skipped; anything else that is not an integer is an error.
pub fn parse_expanded(raw: &str) -> Result<HashSet<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| CatalogError::InvalidQuery(format!("expanded id '{}'", part)))
        })
        .collect()
}

/// A row of the category table as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRowView {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub active: bool,
    pub level: usize,
    pub has_children: bool,
    pub expanded: bool,
}

impl CategoryRowView {
    fn new(flat: &FlatNode<'_>, expanded: &HashSet<i64>) -> Self {
        CategoryRowView {
            id: flat.node.id,
            name: flat.node.name.clone(),
            url: flat.node.url.clone(),
            active: flat.node.active,
            level: flat.level,
            has_children: !flat.node.children.is_empty(),
            expanded: expanded.contains(&flat.node.id),
        }
    }
}

/// The category screen's derived state: the forest built once from the rows,
/// queried with different expansion sets and filters.
#[derive(Debug, Clone, Default)]
pub struct CategoryListing {
    forest: Forest,
}

impl CategoryListing {
    pub fn new(rows: &[TaxonomyRow]) -> Self {
        CategoryListing {
            forest: taxonomy::build_forest(rows),
        }
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Flattened and filtered, before pagination.
    pub fn visible(&self, expanded: &HashSet<i64>, query: &ListingQuery) -> Vec<FlatNode<'_>> {
        let flat = taxonomy::flatten(&self.forest.roots, expanded);
        filter_nodes(&flat, &query.search, query.status)
    }

    /// Flatten, filter, paginate.
    pub fn view(&self, expanded: &HashSet<i64>, query: &ListingQuery) -> Page<CategoryRowView> {
        let rows: Vec<CategoryRowView> = self
            .visible(expanded, query)
            .iter()
            .map(|flat| CategoryRowView::new(flat, expanded))
            .collect();
        paginate(&rows, query.page, PAGE_SIZE)
    }
}
