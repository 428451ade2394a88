//! Implementation of the radix tree node and associated plumbing
//!
//! A node is a reference count, a prefix, and an edge table. The prefix bytes
//! and the first byte of every edge are packed into a single byte buffer,
//! `prefix ++ first_bytes`, so that looking up an edge never leaves the node's
//! own allocation. The children themselves are owned in a parallel array, the
//! child at index `i` is the one whose prefix starts with `first_byte_at(i)`.
use std::{fmt, mem, slice};

use crate::{
    reserve::{unwrap_safe, Infallible, Reserve},
    Hex,
};


/// A node of the radix tree
///
/// Invariant: `bytes.len() == prefix_length + children.len()`.
pub struct Node {
    /// number of outstanding registrations of the key ending at this node
    refcount: u32,
    /// number of bytes at the start of `bytes` that make up the prefix
    prefix_length: u32,
    /// prefix, followed by the first byte of each edge
    bytes: Vec<u8>,
    /// one child per edge, in edge table order
    children: Vec<Node>,
}

impl Node {
    /// A node without a key, prefix or edges. Does not allocate.
    pub const EMPTY: Self = Self {
        refcount: 0,
        prefix_length: 0,
        bytes: Vec::new(),
        children: Vec::new(),
    };

    /// Create a node with the given prefix and room for `edgecount` edges.
    ///
    /// The edge slots are filled with placeholders that have to be
    /// overwritten with [Node::set_edge_at].
    pub fn new<A: Reserve>(
        refcount: u32,
        prefix: &[u8],
        edgecount: usize,
    ) -> Result<Self, A::Error> {
        let prefix_length = u32::try_from(prefix.len()).map_err(|_| A::overflow())?;
        let mut bytes = Vec::new();
        A::reserve(&mut bytes, prefix.len() + edgecount)?;
        let mut children = Vec::new();
        A::reserve(&mut children, edgecount)?;
        bytes.extend_from_slice(prefix);
        bytes.resize(prefix.len() + edgecount, 0);
        children.resize_with(edgecount, || Node::EMPTY);
        Ok(Self {
            refcount,
            prefix_length,
            bytes,
            children,
        })
    }

    /// A leaf holding a single registration of the key suffix `prefix`
    pub fn leaf<A: Reserve>(prefix: &[u8]) -> Result<Self, A::Error> {
        Self::new::<A>(1, prefix, 0)
    }

    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    pub fn set_refcount(&mut self, value: u32) {
        self.refcount = value;
    }

    pub fn prefix_length(&self) -> usize {
        self.prefix_length as usize
    }

    pub fn edgecount(&self) -> usize {
        self.children.len()
    }

    pub fn prefix(&self) -> &[u8] {
        &self.bytes[..self.prefix_length()]
    }

    /// Overwrite the prefix. The length must match [Node::prefix_length].
    pub fn set_prefix(&mut self, prefix: &[u8]) {
        let n = self.prefix_length();
        self.bytes[..n].copy_from_slice(prefix);
    }

    /// The first bytes of all edges, in edge table order
    pub fn first_bytes(&self) -> &[u8] {
        &self.bytes[self.prefix_length()..]
    }

    pub fn first_byte_at(&self, i: usize) -> u8 {
        self.first_bytes()[i]
    }

    pub fn set_first_byte_at(&mut self, i: usize, byte: u8) {
        let n = self.prefix_length();
        self.bytes[n + i] = byte;
    }

    pub fn child_at(&self, i: usize) -> &Node {
        &self.children[i]
    }

    pub fn child_at_mut(&mut self, i: usize) -> &mut Node {
        &mut self.children[i]
    }

    /// Replace the edge at `i`, returning the child that was there before
    pub fn set_edge_at(&mut self, i: usize, byte: u8, child: Node) -> Node {
        self.set_first_byte_at(i, byte);
        mem::replace(&mut self.children[i], child)
    }

    /// Take the child at `i`, leaving a placeholder in its slot
    pub fn take_child_at(&mut self, i: usize) -> Node {
        mem::replace(&mut self.children[i], Node::EMPTY)
    }

    /// Index of the edge whose child prefix starts with `byte`
    pub fn find_edge(&self, byte: u8) -> Option<usize> {
        self.first_bytes().iter().position(|b| *b == byte)
    }

    /// Iterate over `(first_byte, child)` pairs in edge table order
    pub fn edges(&self) -> impl Iterator<Item = (u8, &Node)> + '_ {
        self.first_bytes().iter().copied().zip(self.children.iter())
    }

    pub(crate) fn children(&self) -> slice::Iter<'_, Node> {
        self.children.iter()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Change the shape of this node to `prefix_length` prefix bytes and
    /// `edgecount` edges.
    ///
    /// The refcount is kept. Prefix bytes and edges that still fit are copied
    /// forward, new prefix bytes are zero and new edge slots hold
    /// placeholders. Edges beyond `edgecount` are dropped.
    ///
    /// Memory is reserved before anything is touched, so on error the node is
    /// unchanged. Shrinking never allocates.
    pub fn resize<A: Reserve>(
        &mut self,
        prefix_length: usize,
        edgecount: usize,
    ) -> Result<(), A::Error> {
        let prefix_length_u32 = u32::try_from(prefix_length).map_err(|_| A::overflow())?;
        let old_prefix_length = self.prefix_length();
        let old_edgecount = self.edgecount();
        let keep_prefix = old_prefix_length.min(prefix_length);
        let keep_edges = old_edgecount.min(edgecount);
        let total = prefix_length + edgecount;
        if total > self.bytes.len() {
            let additional = total - self.bytes.len();
            A::reserve(&mut self.bytes, additional)?;
        }
        if edgecount > old_edgecount {
            A::reserve(&mut self.children, edgecount - old_edgecount)?;
        }
        // from here on nothing allocates
        if total > self.bytes.len() {
            self.bytes.resize(total, 0);
        }
        self.bytes.copy_within(
            old_prefix_length..old_prefix_length + keep_edges,
            prefix_length,
        );
        self.bytes.truncate(total);
        self.bytes[keep_prefix..prefix_length].fill(0);
        self.bytes[prefix_length + keep_edges..].fill(0);
        self.prefix_length = prefix_length_u32;
        self.children.truncate(edgecount);
        self.children.resize_with(edgecount, || Node::EMPTY);
        Ok(())
    }

    /// Append an edge to `child`, keyed by the first byte of its prefix
    pub fn push_edge<A: Reserve>(&mut self, child: Node) -> Result<(), A::Error> {
        let byte = child.prefix()[0];
        debug_assert!(self.find_edge(byte).is_none());
        let n = self.edgecount();
        self.resize::<A>(self.prefix_length(), n + 1)?;
        self.set_edge_at(n, byte, child);
        Ok(())
    }

    /// Remove the edge at `i` and return its child.
    ///
    /// The last edge is moved into the vacated slot.
    pub fn remove_edge(&mut self, i: usize) -> Node {
        let n = self.prefix_length();
        let last = self.edgecount() - 1;
        self.bytes.swap(n + i, n + last);
        self.children.swap(i, last);
        let removed = self.take_child_at(last);
        unwrap_safe(self.resize::<Infallible>(n, last));
        removed
    }

    /// Drop the first `n` bytes of the prefix. Never allocates.
    pub fn strip_prefix(&mut self, n: usize) {
        assert!(n <= self.prefix_length());
        self.bytes.drain(..n);
        self.prefix_length -= n as u32;
    }

    /// Split this node after `n` prefix bytes.
    ///
    /// The node is replaced by a new node holding the first `n` bytes of the
    /// prefix. The old node, with the remainder of its prefix and with its
    /// refcount and edges, becomes its first child. If a `leaf` is given it
    /// becomes the second child, otherwise the new node holds a key itself.
    pub fn split<A: Reserve>(&mut self, n: usize, leaf: Option<Node>) -> Result<(), A::Error> {
        debug_assert!(n < self.prefix_length());
        let (refcount, edgecount) = if leaf.is_some() { (0, 2) } else { (1, 1) };
        let head = Node::new::<A>(refcount, &self.prefix()[..n], edgecount)?;
        let mut tail = mem::replace(self, head);
        tail.strip_prefix(n);
        self.set_edge_at(0, tail.prefix()[0], tail);
        if let Some(leaf) = leaf {
            debug_assert_ne!(leaf.prefix()[0], self.first_byte_at(0));
            self.set_edge_at(1, leaf.prefix()[0], leaf);
        }
        Ok(())
    }

    /// Allocate the buffer this node needs to absorb its child at `index`.
    ///
    /// Split from [Node::merge_child] so that a caller can do all allocation
    /// before it starts changing the tree.
    pub fn prepare_merge<A: Reserve>(&self, index: usize) -> Result<PreparedMerge, A::Error> {
        let child = self.child_at(index);
        let prefix_length = self.prefix_length() + child.prefix_length();
        let prefix_length_u32 = u32::try_from(prefix_length).map_err(|_| A::overflow())?;
        let mut bytes = Vec::new();
        A::reserve(&mut bytes, prefix_length + child.edgecount())?;
        bytes.extend_from_slice(self.prefix());
        bytes.extend_from_slice(&child.bytes);
        Ok(PreparedMerge {
            prefix_length: prefix_length_u32,
            bytes,
        })
    }

    /// Collapse this node with its child at `index`.
    ///
    /// Afterwards this node has the concatenated prefix and the child's
    /// refcount and edges. Any other children are dropped.
    pub fn merge_child(&mut self, index: usize, merge: PreparedMerge) {
        let mut child = self.take_child_at(index);
        child.bytes = merge.bytes;
        child.prefix_length = merge.prefix_length;
        *self = child;
    }

    /// Print the structure below this node to stdout
    pub fn dump(&self, indent: usize) {
        let spacer = " ".repeat(indent);
        println!(
            "{}Node prefix={} refcount={}",
            spacer,
            Hex::new(self.prefix()),
            self.refcount
        );
        for (byte, child) in self.edges() {
            println!("{}  edge {:02x}", spacer, byte);
            child.dump(indent + 4);
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("refcount", &self.refcount)
            .field("prefix", &Hex::new(self.prefix()))
            .field("edges", &Hex::new(self.first_bytes()))
            .field("children", &self.children)
            .finish()
    }
}

/// Buffer for a node that is about to absorb one of its children
pub struct PreparedMerge {
    prefix_length: u32,
    bytes: Vec<u8>,
}
