//! Matching a key against the tree.
//!
//! All tree operations start by walking down from the root, consuming the key
//! against the node prefixes and picking the edge for the next unmatched byte.
//! The walk stops either on an exact landing, inside a node's prefix, or at a
//! node that has no edge for the next byte.
use crate::{common_prefix, node::Node, reserve::Reserve};

/// Where a search for a key stopped
#[derive(Debug)]
pub(crate) struct Match<'a> {
    /// number of key bytes consumed
    pub nkey: usize,
    /// number of bytes of `node`'s prefix consumed
    pub nprefix: usize,
    /// the node the search stopped at
    pub node: &'a Node,
}

impl<'a> Match<'a> {
    /// key and node prefix were consumed together, `node` represents the key
    pub fn is_exact(&self, key: &[u8]) -> bool {
        self.nkey == key.len() && !self.diverges()
    }

    /// the key leaves the tree somewhere inside the prefix of `node`
    pub fn diverges(&self) -> bool {
        self.nprefix < self.node.prefix_length()
    }
}

/// Walk from `root` consuming `key`.
///
/// `descend` is called with the index of every edge taken, in order.
pub(crate) fn find<'a>(root: &'a Node, key: &[u8], mut descend: impl FnMut(u8)) -> Match<'a> {
    let mut node = root;
    let mut nkey = 0;
    loop {
        let nprefix = common_prefix(node.prefix(), &key[nkey..]);
        nkey += nprefix;
        if nprefix < node.prefix_length() || nkey == key.len() {
            return Match { nkey, nprefix, node };
        }
        match node.find_edge(key[nkey]) {
            Some(i) => {
                // at most 256 edges, so the index fits
                descend(i as u8);
                node = node.child_at(i);
            }
            None => return Match { nkey, nprefix, node },
        }
    }
}

/// Edge indices leading from the root to a node.
///
/// This is what replaces parent and grandparent pointers: the parent of the
/// node at `path` is at `path[..len - 1]`, the grandparent one step further up.
#[derive(Debug, Default)]
pub(crate) struct Path(Vec<u8>);

impl Path {
    /// Find `key`, recording the path to where the search stopped.
    ///
    /// Every step consumes at least one key byte, so reserving `key.len()`
    /// up front means the walk itself never allocates.
    pub fn find<'a, A: Reserve>(
        root: &'a Node,
        key: &[u8],
    ) -> Result<(Self, Match<'a>), A::Error> {
        let mut path = Vec::new();
        A::reserve(&mut path, key.len())?;
        let m = find(root, key, |i| path.push(i));
        Ok((Self(path), m))
    }

    /// Path to the parent, and the index of the edge from the parent
    pub fn parent(&self) -> Option<(&[u8], usize)> {
        self.0
            .split_last()
            .map(|(last, rest)| (rest, *last as usize))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// Follow `path` from `root`
pub(crate) fn descendant_mut<'a>(root: &'a mut Node, path: &[u8]) -> &'a mut Node {
    path.iter()
        .fold(root, |node, i| node.child_at_mut(*i as usize))
}

/// True if a key with refcount > 0 lies on the path of `topic`, i.e. some
/// stored key is a prefix of `topic`.
pub(crate) fn find_subscriber(root: &Node, topic: &[u8]) -> bool {
    let mut node = root;
    let mut n = 0;
    loop {
        let m = common_prefix(node.prefix(), &topic[n..]);
        if m < node.prefix_length() {
            return false;
        }
        n += m;
        if node.refcount() > 0 {
            return true;
        }
        if n == topic.len() {
            return false;
        }
        match node.find_edge(topic[n]) {
            Some(i) => node = node.child_at(i),
            None => return false,
        }
    }
}
