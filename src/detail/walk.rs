//! Encapsulation-crossing tree traversal
//!
//! Review widgets live inside nested encapsulated subtrees (shadow roots)
//! that ordinary selectors cannot reach. The extractor snapshots the
//! containing subtree into a plain [`DomNode`] tree and searches it here,
//! in Rust, where the traversal is bounded and unit-testable.
//!
//! The search is generic over [`TreeNode`] so the bounds (depth ceiling,
//! queue cap) can be exercised against synthetic trees, including cyclic
//! ones a hostile page could in principle produce.

use serde::Deserialize;
use std::collections::VecDeque;

/// Hard cap on queued nodes, guarding against degenerate snapshots
const MAX_QUEUE: usize = 10_000;

/// A node in a searchable tree with optional encapsulated content
pub trait TreeNode {
    /// Lowercased element tag name
    fn tag(&self) -> &str;

    /// Text directly under this node, not counting descendants
    fn own_text(&self) -> &str;

    /// Ordinary child nodes
    fn children(&self) -> Vec<&Self>;

    /// Root of this node's encapsulated subtree, when it hosts one
    fn encapsulated_root(&self) -> Option<&Self>;
}

/// Serializable snapshot of a live DOM subtree
///
/// Produced by a page script; `shadow` carries the node's shadow root
/// when it hosts one. `text` holds only the node's direct text so subtree
/// text can be reassembled without duplication.
#[derive(Debug, Clone, Deserialize)]
pub struct DomNode {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub children: Vec<DomNode>,
    #[serde(default)]
    pub shadow: Option<Box<DomNode>>,
}

impl TreeNode for DomNode {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn own_text(&self) -> &str {
        &self.text
    }

    fn children(&self) -> Vec<&Self> {
        self.children.iter().collect()
    }

    fn encapsulated_root(&self) -> Option<&Self> {
        self.shadow.as_deref()
    }
}

/// Breadth-first search for nodes with a given tag, crossing encapsulation
///
/// Encapsulated roots are enqueued alongside ordinary children, one level
/// deeper than their host. Matched nodes are collected whole and their
/// subtrees are not descended, so nested matches inside a match do not
/// produce duplicates. The walk stops at `max_depth` levels, after
/// `max_matches` matches, or when the queue cap trips.
pub fn collect_by_tag<'a, N: TreeNode>(
    root: &'a N,
    tag: &str,
    max_depth: usize,
    max_matches: usize,
) -> Vec<&'a N> {
    let mut matches = Vec::new();
    let mut queue: VecDeque<(&N, usize)> = VecDeque::new();
    queue.push_back((root, 0));

    while let Some((node, depth)) = queue.pop_front() {
        if node.tag().eq_ignore_ascii_case(tag) {
            matches.push(node);
            if matches.len() >= max_matches {
                break;
            }
            continue;
        }

        if depth >= max_depth {
            continue;
        }

        for child in node.children() {
            if queue.len() >= MAX_QUEUE {
                tracing::warn!("tree walk queue cap reached, truncating search");
                return matches;
            }
            queue.push_back((child, depth + 1));
        }
        if let Some(inner) = node.encapsulated_root() {
            if queue.len() >= MAX_QUEUE {
                tracing::warn!("tree walk queue cap reached, truncating search");
                return matches;
            }
            queue.push_back((inner, depth + 1));
        }
    }

    matches
}

/// Depth-first search for the first node with a given tag
///
/// Encapsulated content is searched before ordinary children at each node,
/// since the sought content usually sits behind the innermost boundary.
pub fn find_first_by_tag<'a, N: TreeNode>(
    root: &'a N,
    tag: &str,
    max_depth: usize,
) -> Option<&'a N> {
    fn descend<'a, N: TreeNode>(
        node: &'a N,
        tag: &str,
        depth: usize,
        max_depth: usize,
    ) -> Option<&'a N> {
        if node.tag().eq_ignore_ascii_case(tag) {
            return Some(node);
        }
        if depth >= max_depth {
            return None;
        }
        if let Some(inner) = node.encapsulated_root() {
            if let Some(found) = descend(inner, tag, depth + 1, max_depth) {
                return Some(found);
            }
        }
        for child in node.children() {
            if let Some(found) = descend(child, tag, depth + 1, max_depth) {
                return Some(found);
            }
        }
        None
    }

    descend(root, tag, 0, max_depth)
}

/// Reassembles the full text of a subtree, crossing encapsulation
///
/// Fragments are joined with single spaces and surrounding whitespace is
/// trimmed, matching how rendered text reads.
pub fn subtree_text<N: TreeNode>(root: &N, max_depth: usize) -> String {
    fn gather<N: TreeNode>(node: &N, depth: usize, max_depth: usize, out: &mut Vec<String>) {
        let text = node.own_text().trim();
        if !text.is_empty() {
            out.push(text.to_string());
        }
        if depth >= max_depth {
            return;
        }
        if let Some(inner) = node.encapsulated_root() {
            gather(inner, depth + 1, max_depth, out);
        }
        for child in node.children() {
            gather(child, depth + 1, max_depth, out);
        }
    }

    let mut fragments = Vec::new();
    gather(root, 0, max_depth, &mut fragments);
    fragments.join(" ")
}
