use std::cmp::Ordering;

use crate::models::{EntryKind, TreeNode};

/// Sibling order: directories first, then names by [`locale_cmp`].
pub fn compare_nodes(a: &TreeNode, b: &TreeNode) -> Ordering {
    match (a.kind(), b.kind()) {
        (EntryKind::Dir, EntryKind::File) => Ordering::Less,
        (EntryKind::File, EntryKind::Dir) => Ordering::Greater,
        _ => locale_cmp(a.name(), b.name()),
    }
}

/// ASCII punctuation and symbols in root collation order. Everything listed
/// here sorts before digits, and digits sort before letters.
const PUNCTUATION: &str = " _-,;:!?.'\"()[]{}@*/\\&#%`^+<=>|~$";

/// Collation in the style of a browser `localeCompare` with the root locale.
///
/// Characters are first compared by primary weight (punctuation, then other
/// symbols, then digits, then letters ignoring case). On a primary tie a
/// lowercase letter sorts before its uppercase form, and code-point order
/// breaks any remaining tie so distinct names never compare equal.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .map(primary_weight)
        .cmp(b.chars().map(primary_weight));
    if primary != Ordering::Equal {
        return primary;
    }

    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca == cb {
            continue;
        }
        return match (ca.is_lowercase(), cb.is_lowercase()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => ca.cmp(&cb),
        };
    }

    a.cmp(b)
}

fn primary_weight(c: char) -> (u8, u32) {
    if let Some(index) = PUNCTUATION.find(c) {
        return (0, index as u32);
    }
    if let Some(digit) = c.to_digit(10) {
        return (2, digit);
    }
    if c.is_alphabetic() {
        return (3, c.to_lowercase().next().unwrap_or(c) as u32);
    }
    (1, c as u32)
}

pub(crate) fn sort_children(node: &mut TreeNode) {
    node.children.sort_by(compare_nodes);
}

pub(crate) fn sort_recursive(node: &mut TreeNode) {
    sort_children(node);
    for child in &mut node.children {
        sort_recursive(child);
    }
}
