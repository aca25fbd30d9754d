//! Reconstruction of the category tree from the flat taxonomy table.
//!
//! The upstream table stores one category per row and encodes depth in five
//! positional columns. [`build_forest`] turns a snapshot of that table into an
//! owned tree, and [`flatten`] turns the tree back into an indented list for a
//! given set of expanded nodes. Both are pure: callers rebuild from scratch
//! whenever the rows or the expansion set change.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use lexical_sort::lexical_cmp;
use serde::Serialize;

use crate::records::TaxonomyRow;

/// Sentinel the upstream writes into classification columns a row does not use.
pub const UNSET: &str = "EMPTY";

/// True for both spellings of "column not used": `""` and `"EMPTY"`.
pub fn is_unset(value: &str) -> bool {
    value.is_empty() || value == UNSET
}

/// A category and the subcategories filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub active: bool,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Depth-first search of this subtree.
    pub fn find(&self, id: i64) -> Option<&CategoryNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(CategoryNode::subtree_len).sum::<usize>()
    }
}

/// Result of [`build_forest`]: the department roots plus what could not be placed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    pub roots: Vec<CategoryNode>,
    /// Rows whose parent row is missing, in input order. They are named but
    /// never attached, so they do not appear anywhere under `roots`.
    pub orphans: Vec<i64>,
    /// Rows dropped because a later row carried the same id.
    pub shadowed: usize,
    /// Rows that found a parent but are still cut off from every root, such as
    /// the descendants of an orphan. Hidden along with it.
    pub unreachable: usize,
}

impl Forest {
    /// Rows left out of the tree, orphans included.
    pub fn hidden_count(&self) -> usize {
        self.orphans.len() + self.unreachable
    }

    /// Nodes reachable from the roots.
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(CategoryNode::subtree_len).sum()
    }

    pub fn find(&self, id: i64) -> Option<&CategoryNode> {
        self.roots.iter().find_map(|root| root.find(id))
    }
}

// Normalised classification columns; unused columns become `None` so that
// "EMPTY" and "" compare equal.
type LevelKey<'a> = [Option<&'a str>; 5];

fn level_key(row: &TaxonomyRow) -> LevelKey<'_> {
    row.levels().map(|value| (!is_unset(value)).then_some(value))
}

fn node_name(row: &TaxonomyRow) -> &str {
    let levels = row.levels();
    match level_key(row).iter().rposition(Option::is_some) {
        Some(depth) => levels[depth],
        None => levels[0],
    }
}

/// Builds the category forest and returns only the roots.
pub fn build_tree(rows: &[TaxonomyRow]) -> Vec<CategoryNode> {
    build_forest(rows).roots
}

/// Builds the category forest from rows in any order.
///
/// A row is named after its deepest used column. Its parent is the row with
/// the same columns above that one and nothing below; department rows (only
/// `DEPT` used) are roots. When several rows qualify as a parent the first in
/// input order wins, even if a later row reuses its id; the child then hangs
/// below the row that kept the id. A row whose parent is absent is reported in
/// [`Forest::orphans`] and left out of the tree together with everything below
/// it, which is counted in [`Forest::unreachable`].
///
/// Siblings at every level, and the roots, are sorted by name using lexical
/// (accent and case folding) comparison.
pub fn build_forest(rows: &[TaxonomyRow]) -> Forest {
    // Parent lookup sees every row, shadowed ones included, so a child still
    // finds a parent whose id was reused further down.
    let mut id_for_key: HashMap<LevelKey<'_>, i64> = HashMap::with_capacity(rows.len());
    for row in rows {
        id_for_key.entry(level_key(row)).or_insert(row.id);
    }

    // Pass 1: one node per id, the last row with a given id wins.
    let mut row_for_id: HashMap<i64, usize> = HashMap::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        row_for_id.insert(row.id, idx);
    }
    let shadowed = rows.len() - row_for_id.len();
    let rows: Vec<&TaxonomyRow> = rows
        .iter()
        .enumerate()
        .filter(|(idx, row)| row_for_id[&row.id] == *idx)
        .map(|(_, row)| row)
        .collect();

    // Pass 2: link every row to its parent.
    let mut root_rows = Vec::new();
    let mut children_of: HashMap<i64, Vec<&TaxonomyRow>> = HashMap::new();
    let mut orphans = Vec::new();
    for &row in &rows {
        let key = level_key(row);
        match key.iter().rposition(Option::is_some) {
            Some(depth) if depth > 0 => {
                let mut parent_key = key;
                parent_key[depth] = None;
                match id_for_key.get(&parent_key) {
                    Some(parent) => children_of.entry(*parent).or_default().push(row),
                    None => orphans.push(row.id),
                }
            }
            _ => root_rows.push(row),
        }
    }

    if !orphans.is_empty() {
        log::warn!(
            "{} taxonomy rows have no parent row and are hidden: {:?}",
            orphans.len(),
            orphans
        );
    }
    if shadowed > 0 {
        log::warn!("{} taxonomy rows share an id with a later row", shadowed);
    }

    let mut roots: Vec<CategoryNode> = root_rows
        .into_iter()
        .map(|row| assemble(row, &mut children_of))
        .collect();
    sort_by_name(&mut roots);

    // Whatever was never drained hangs below an orphan, or below a row whose
    // reused id points back into its own subtree.
    let unreachable: usize = children_of.values().map(Vec::len).sum();
    if unreachable > 0 {
        log::warn!(
            "{} taxonomy rows sit below a hidden row and are hidden too",
            unreachable
        );
    }

    Forest {
        roots,
        orphans,
        shadowed,
        unreachable,
    }
}

// Each child list is removed before it is walked, so a row is assembled at most
// once even when reused ids link rows into a loop.
fn assemble(row: &TaxonomyRow, children_of: &mut HashMap<i64, Vec<&TaxonomyRow>>) -> CategoryNode {
    let children = children_of
        .remove(&row.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| assemble(child, children_of))
        .collect();

    CategoryNode {
        id: row.id,
        name: node_name(row).to_string(),
        url: row.url.clone(),
        active: row.active,
        children,
    }
}

/// Locale-style ordering used for sibling lists.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    lexical_cmp(a, b)
}

fn sort_by_name(nodes: &mut [CategoryNode]) {
    nodes.sort_by(|a, b| compare_names(&a.name, &b.name));
    for node in nodes.iter_mut() {
        sort_by_name(&mut node.children);
    }
}

/// A node placed in the flattened listing, `level` 0 being a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatNode<'a> {
    pub node: &'a CategoryNode,
    pub level: usize,
}

/// Pre-order listing of the forest.
///
/// Children of a node are emitted right after it, one level deeper, only when
/// the node's id is in `expanded`; collapsed subtrees are left out entirely.
pub fn flatten<'a>(forest: &'a [CategoryNode], expanded: &HashSet<i64>) -> Vec<FlatNode<'a>> {
    let mut out = Vec::new();
    flatten_into(forest, expanded, 0, &mut out);
    out
}

fn flatten_into<'a>(
    nodes: &'a [CategoryNode],
    expanded: &HashSet<i64>,
    level: usize,
    out: &mut Vec<FlatNode<'a>>,
) {
    for node in nodes {
        out.push(FlatNode { node, level });
        if expanded.contains(&node.id) {
            flatten_into(&node.children, expanded, level + 1, out);
        }
    }
}

/// Every reachable id in pre-order; handy for "expand all".
pub fn all_ids(forest: &[CategoryNode]) -> Vec<i64> {
    fn walk(nodes: &[CategoryNode], out: &mut Vec<i64>) {
        for node in nodes {
            out.push(node.id);
            walk(&node.children, out);
        }
    }

    let mut out = Vec::new();
    walk(forest, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, levels: [&str; 5]) -> TaxonomyRow {
        TaxonomyRow {
            id,
            dept: levels[0].to_string(),
            typ: levels[1].to_string(),
            subtyp1: levels[2].to_string(),
            subtyp2: levels[3].to_string(),
            subtyp3: levels[4].to_string(),
            url: format!("/c/{}", id),
            active: true,
        }
    }

    const E: &str = "EMPTY";

    #[test]
    fn department_and_type() {
        let rows = vec![row(1, ["A", E, E, E, E]), row(2, ["A", "B", E, E, E])];
        let tree = build_tree(&rows);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, 1);
        assert_eq!(tree[0].name, "A");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].id, 2);
        assert_eq!(tree[0].children[0].name, "B");
        assert!(tree[0].children[0].children.is_empty());
    }

    #[test]
    fn five_levels_deep_in_reverse_order() {
        let rows = vec![
            row(5, ["A", "B", "C", "D", "E"]),
            row(4, ["A", "B", "C", "D", E]),
            row(3, ["A", "B", "C", E, E]),
            row(2, ["A", "B", E, E, E]),
            row(1, ["A", E, E, E, E]),
        ];
        let forest = build_forest(&rows);

        assert!(forest.orphans.is_empty());
        assert_eq!(forest.node_count(), 5);
        let deepest = forest.find(5).unwrap();
        assert_eq!(deepest.name, "E");
        assert_eq!(forest.find(4).unwrap().children[0].id, 5);
    }

    #[test]
    fn empty_string_and_sentinel_are_equivalent() {
        let rows = vec![row(1, ["A", "", "", "", ""]), row(2, ["A", "B", E, "", E])];
        let tree = build_tree(&rows);
        assert_eq!(tree[0].children[0].id, 2);
    }

    #[test]
    fn missing_parent_is_reported_not_attached() {
        let rows = vec![
            row(1, ["A", E, E, E, E]),
            row(2, ["A", "B", "C", E, E]),
            row(3, ["Z", "Y", E, E, E]),
        ];
        let forest = build_forest(&rows);

        assert_eq!(forest.orphans, vec![2, 3]);
        assert_eq!(forest.node_count(), 1);
        assert!(forest.find(2).is_none());
    }

    #[test]
    fn descendants_of_an_orphan_are_counted() {
        let rows = vec![
            row(1, ["A", E, E, E, E]),
            row(2, ["A", "B", "C", E, E]),
            row(3, ["A", "B", "C", "D", E]),
            row(4, ["A", "B", "C", "D", "F"]),
        ];
        let forest = build_forest(&rows);

        assert_eq!(forest.orphans, vec![2]);
        assert_eq!(forest.unreachable, 2);
        assert_eq!(forest.hidden_count(), 3);
        assert_eq!(forest.node_count() + forest.hidden_count(), rows.len());
    }

    #[test]
    fn duplicate_id_keeps_last_row() {
        let rows = vec![row(1, ["Old", E, E, E, E]), row(1, ["New", E, E, E, E])];
        let forest = build_forest(&rows);

        assert_eq!(forest.shadowed, 1);
        assert_eq!(forest.roots.len(), 1);
        assert_eq!(forest.roots[0].name, "New");
    }

    #[test]
    fn reused_parent_id_attaches_to_last_row() {
        let rows = vec![
            row(1, ["A", E, E, E, E]),
            row(1, ["Z", E, E, E, E]),
            row(2, ["A", "B", E, E, E]),
        ];
        let forest = build_forest(&rows);

        assert!(forest.orphans.is_empty());
        assert_eq!(forest.shadowed, 1);
        assert_eq!(forest.roots.len(), 1);
        assert_eq!(forest.roots[0].name, "Z");
        assert_eq!(forest.roots[0].children.len(), 1);
        assert_eq!(forest.roots[0].children[0].id, 2);
        assert_eq!(forest.roots[0].children[0].name, "B");
    }

    #[test]
    fn reused_id_looping_into_itself_is_hidden() {
        let rows = vec![row(1, ["A", E, E, E, E]), row(1, ["A", "B", E, E, E])];
        let forest = build_forest(&rows);

        assert!(forest.roots.is_empty());
        assert!(forest.orphans.is_empty());
        assert_eq!(forest.unreachable, 1);
        assert_eq!(forest.hidden_count(), 1);
    }

    #[test]
    fn first_matching_parent_wins() {
        let rows = vec![
            row(1, ["A", E, E, E, E]),
            row(2, ["A", "", "", "", ""]),
            row(3, ["A", "B", E, E, E]),
        ];
        let forest = build_forest(&rows);

        assert_eq!(forest.find(1).unwrap().children.len(), 1);
        assert!(forest.find(2).unwrap().children.is_empty());
    }

    #[test]
    fn siblings_sorted_ignoring_case() {
        let rows = vec![
            row(1, ["shoes", E, E, E, E]),
            row(2, ["Bags", E, E, E, E]),
            row(3, ["Accessories", E, E, E, E]),
            row(4, ["Bags", "totes", E, E, E]),
            row(5, ["Bags", "Clutches", E, E, E]),
        ];
        let tree = build_tree(&rows);

        let names: Vec<_> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["Accessories", "Bags", "shoes"]);
        let bags: Vec<_> = tree[1].children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(bags, ["Clutches", "totes"]);
    }

    #[test]
    fn accents_fold_for_ordering() {
        assert_eq!(compare_names("Éclairs", "Fans"), Ordering::Less);
        assert_eq!(compare_names("Éclairs", "Dresses"), Ordering::Greater);
    }

    #[test]
    fn empty_input() {
        let forest = build_forest(&[]);
        assert!(forest.roots.is_empty());
        assert!(flatten(&forest.roots, &HashSet::new()).is_empty());
    }

    #[test]
    fn collapsed_forest_lists_roots_only() {
        let rows = vec![
            row(1, ["A", E, E, E, E]),
            row(2, ["A", "B", E, E, E]),
            row(3, ["C", E, E, E, E]),
        ];
        let tree = build_tree(&rows);
        let flat = flatten(&tree, &HashSet::new());

        assert_eq!(flat.len(), 2);
        assert!(flat.iter().all(|f| f.level == 0));
        assert_eq!(flat[0].node.id, 1);
        assert_eq!(flat[1].node.id, 3);
    }

    #[test]
    fn expanded_children_follow_their_parent() {
        let rows = vec![
            row(1, ["A", E, E, E, E]),
            row(2, ["A", "B", E, E, E]),
            row(3, ["A", "B", "C", E, E]),
            row(4, ["D", E, E, E, E]),
        ];
        let tree = build_tree(&rows);

        let expanded: HashSet<i64> = [1, 2].into_iter().collect();
        let flat: Vec<(i64, usize)> = flatten(&tree, &expanded)
            .iter()
            .map(|f| (f.node.id, f.level))
            .collect();
        assert_eq!(flat, vec![(1, 0), (2, 1), (3, 2), (4, 0)]);

        // Expanding a child under a collapsed parent shows nothing extra.
        let expanded: HashSet<i64> = [2].into_iter().collect();
        assert_eq!(flatten(&tree, &expanded).len(), 2);
    }

    #[test]
    fn all_ids_is_preorder() {
        let rows = vec![
            row(3, ["B", E, E, E, E]),
            row(1, ["A", E, E, E, E]),
            row(2, ["A", "X", E, E, E]),
        ];
        assert_eq!(all_ids(&build_tree(&rows)), vec![1, 2, 3]);
    }
}
