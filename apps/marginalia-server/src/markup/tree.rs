//! Rendered content tree
//!
//! A block's markup parsed into the node tree a renderer would build from
//! it. Selections are reported as `(node, offset)` boundaries inside such a
//! tree; this module converts them to and from plain-text offsets.
//!
//! Every tree gets a process-unique id, and every [`NodeId`] carries the id
//! of the tree it came from, so a boundary taken from another block (or an
//! older render of the same block) is detected instead of silently
//! resolving against the wrong text.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use super::tokenizer::{tokenize, Tag, TagKind, TokenKind};

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(u64);

/// Handle to a node of one specific [`RenderedTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    tree: TreeId,
    index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    /// Element with its lowercased tag name
    Element(String),
    /// Decoded text run
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Characters of text, zero for non-text nodes
    len: usize,
}

/// Errors converting between tree positions and offsets
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OffsetError {
    #[error("node does not belong to this tree")]
    ForeignNode,

    #[error("offset {offset} is past the end of the text ({len})")]
    OutOfRange { offset: usize, len: usize },
}

/// Node tree of one rendered block.
///
/// Nodes are stored in document order, so a node's index is also its
/// position in a pre-order walk.
#[derive(Debug, Clone)]
pub struct RenderedTree {
    id: TreeId,
    nodes: Vec<Node>,
}

impl RenderedTree {
    /// Build the tree for a markup string.
    ///
    /// Adjacent text and entity characters form one text node. Void and
    /// self-closing elements have no children. A close tag closes the
    /// nearest open element of the same name; stray close tags, comments
    /// and declarations produce no nodes.
    pub fn parse(markup: &str) -> Self {
        let mut nodes = vec![Node {
            kind: NodeKind::Root,
            parent: None,
            children: Vec::new(),
            len: 0,
        }];
        let mut open: Vec<usize> = vec![0];
        let mut text_run: Option<usize> = None;

        for token in tokenize(markup) {
            let parent = *open.last().unwrap_or(&0);

            let tag = match token.kind {
                TokenKind::Text(c) | TokenKind::Entity(c) => {
                    let index = match text_run {
                        Some(index) => index,
                        None => {
                            let index = push_node(&mut nodes, parent, NodeKind::Text(String::new()));
                            text_run = Some(index);
                            index
                        }
                    };
                    if let NodeKind::Text(text) = &mut nodes[index].kind {
                        text.push(c);
                    }
                    nodes[index].len += 1;
                    continue;
                }
                TokenKind::Tag => Tag::parse(token.raw),
            };
            text_run = None;

            match tag.kind {
                TagKind::Open | TagKind::SelfClosing => {
                    let index =
                        push_node(&mut nodes, parent, NodeKind::Element(tag.name.to_ascii_lowercase()));
                    if tag.opens_element() {
                        open.push(index);
                    }
                }
                TagKind::Close => {
                    let matching = open.iter().skip(1).rposition(|&i| {
                        matches!(&nodes[i].kind, NodeKind::Element(name) if name.eq_ignore_ascii_case(tag.name))
                    });
                    if let Some(pos) = matching {
                        open.truncate(pos + 1);
                    }
                }
                TagKind::Comment | TagKind::Declaration => {}
            }
        }

        Self {
            id: TreeId(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed)),
            nodes,
        }
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.node_id(0)
    }

    /// Whether `node` belongs to this tree
    pub fn contains(&self, node: NodeId) -> bool {
        node.tree == self.id && node.index < self.nodes.len()
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.get(node).map(|n| &n.kind)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.parent.map(|i| self.node_id(i))
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node)
            .map(|n| n.children.iter().map(|&i| self.node_id(i)).collect())
            .unwrap_or_default()
    }

    /// Text nodes in document order
    pub fn text_leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Text(_)))
            .map(|(i, _)| self.node_id(i))
    }

    /// Concatenated text of the whole tree; equal to the markup's plain text
    pub fn text_content(&self) -> String {
        self.nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn text_len(&self) -> usize {
        self.nodes.iter().map(|n| n.len).sum()
    }

    /// First text node containing `needle`
    pub fn find_text(&self, needle: &str) -> Option<NodeId> {
        self.text_leaves().find(|&id| {
            matches!(self.kind(id), Some(NodeKind::Text(text)) if text.contains(needle))
        })
    }

    /// First element named `name`, in document order
    pub fn first_element(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| matches!(&n.kind, NodeKind::Element(el) if el.eq_ignore_ascii_case(name)))
            .map(|i| self.node_id(i))
    }

    /// Plain-text offset of a `(node, offset)` boundary.
    ///
    /// Inside a text node `offset` counts characters and is clamped to the
    /// node's length. On the root or an element, `offset` is a child index:
    /// the boundary sits before child `offset`, which resolves to the first
    /// text at or after that child; an index past the last child means the
    /// end of the element.
    pub fn dom_position_to_offset(&self, node: NodeId, offset: usize) -> Result<usize, OffsetError> {
        let target = self.get(node).ok_or(OffsetError::ForeignNode)?;

        let resolved = match target.kind {
            NodeKind::Text(_) => self.text_before(node.index) + offset.min(target.len),
            NodeKind::Root | NodeKind::Element(_) => match target.children.get(offset) {
                Some(&child) => self.text_before(child),
                None => self.text_before(self.subtree_end(node.index)),
            },
        };

        Ok(resolved)
    }

    /// Tree boundary for a plain-text offset.
    ///
    /// An offset between two text nodes resolves to the start of the later
    /// one; the end of the text resolves to the end of the last text node.
    pub fn offset_to_dom_position(&self, offset: usize) -> Result<(NodeId, usize), OffsetError> {
        let len = self.text_len();
        if offset > len {
            return Err(OffsetError::OutOfRange { offset, len });
        }

        let mut seen = 0;
        let mut last = None;
        for leaf in self.text_leaves() {
            let leaf_len = self.nodes[leaf.index].len;
            if offset < seen + leaf_len {
                return Ok((leaf, offset - seen));
            }
            seen += leaf_len;
            last = Some((leaf, leaf_len));
        }

        Ok(last.unwrap_or((self.root(), 0)))
    }

    fn get(&self, node: NodeId) -> Option<&Node> {
        if node.tree != self.id {
            return None;
        }
        self.nodes.get(node.index)
    }

    fn node_id(&self, index: usize) -> NodeId {
        NodeId { tree: self.id, index }
    }

    /// Characters of text in nodes preceding `index` in document order
    fn text_before(&self, index: usize) -> usize {
        self.nodes[..index.min(self.nodes.len())]
            .iter()
            .map(|n| n.len)
            .sum()
    }

    /// Index just past the last descendant of `index`
    fn subtree_end(&self, mut index: usize) -> usize {
        while let Some(&last) = self.nodes[index].children.last() {
            index = last;
        }
        index + 1
    }
}

fn push_node(nodes: &mut Vec<Node>, parent: usize, kind: NodeKind) -> usize {
    let index = nodes.len();
    nodes.push(Node {
        kind,
        parent: Some(parent),
        children: Vec::new(),
        len: 0,
    });
    nodes[parent].children.push(index);
    index
}
