//! Flat parent-pointer records -> nested forest.
//!
//! The builder indexes records by key once and links children through that
//! index, so construction is linear in the number of records. Records whose
//! parent key does not resolve are dropped together with their descendants.
//! Records on a parent cycle (including self-parented ones) can never be
//! reached from a root and are dropped the same way; they are not reported.

use serde::Serialize;
use std::collections::HashMap;

use crate::object::ObjectKey;
use crate::row::RowRecord;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TreeNode {
    #[serde(flatten)]
    pub record: RowRecord,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn key(&self) -> &ObjectKey {
        &self.record.key
    }

    /// Shows an expander: either children are loaded or some can still be loaded.
    pub fn is_expandable(&self) -> bool {
        !self.children.is_empty() || !self.record.is_leaf()
    }

    /// Number of nodes in this subtree, including the node itself.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(TreeNode::len).sum::<usize>()
    }
}

pub fn build_tree(records: Vec<RowRecord>) -> Vec<TreeNode> {
    let mut positions: HashMap<ObjectKey, usize> = HashMap::with_capacity(records.len());
    let mut slots: Vec<Option<RowRecord>> = Vec::with_capacity(records.len());

    for record in records {
        // First occurrence of a key wins.
        if positions.contains_key(&record.key) {
            continue;
        }
        positions.insert(record.key.clone(), slots.len());
        slots.push(Some(record));
    }

    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
    let mut roots = Vec::new();

    for (index, slot) in slots.iter().enumerate() {
        let Some(record) = slot else { continue };
        match &record.parent_key {
            None => roots.push(index),
            Some(parent) => {
                if let Some(&parent_index) = positions.get(parent) {
                    if parent_index != index {
                        children_of[parent_index].push(index);
                    }
                }
            }
        }
    }

    roots
        .into_iter()
        .filter_map(|root| assemble(root, &mut slots, &children_of))
        .collect()
}

fn assemble(
    index: usize,
    slots: &mut [Option<RowRecord>],
    children_of: &[Vec<usize>],
) -> Option<TreeNode> {
    // `take` makes every record usable once, which also stops any revisit.
    let record = slots[index].take()?;
    let children = children_of[index]
        .iter()
        .filter_map(|&child| assemble(child, slots, children_of))
        .collect();
    Some(TreeNode { record, children })
}

/// Pre-order flattening; `build_tree(flatten_tree(&t)) == t` for any built `t`.
pub fn flatten_tree(nodes: &[TreeNode]) -> Vec<RowRecord> {
    let mut records = Vec::new();
    collect(nodes, &mut records);
    records
}

fn collect(nodes: &[TreeNode], records: &mut Vec<RowRecord>) {
    for node in nodes {
        records.push(node.record.clone());
        collect(&node.children, records);
    }
}

pub fn find_node<'a>(nodes: &'a [TreeNode], key: &str) -> Option<&'a TreeNode> {
    for node in nodes {
        if node.key().as_str() == key {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, key) {
            return Some(found);
        }
    }
    None
}
