use std::fmt;

use anyhow::Context;
use log::{debug, trace};

use crate::{
    iterators::KeyIter,
    matching::{descendant_mut, find, find_subscriber, Path},
    node::Node,
    reserve::{unwrap_safe, AllocError, Fallible, Infallible, Reserve},
    Hex,
};

/// A radix tree over byte string keys, counting how often each key was added.
///
/// A key is present from its first [RadixTree::add] until it has been removed
/// with [RadixTree::rm] as many times as it was added.
///
/// The tree does no synchronization of its own. To share it between threads,
/// put it behind a lock.
#[derive(Default)]
pub struct RadixTree {
    /// the root, its prefix is always empty
    pub(crate) root: Node,
    /// number of distinct present keys
    pub(crate) size: usize,
}

impl RadixTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys that are present
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Add one registration of `key`. Returns true if the key was not present
    /// before.
    pub fn add(&mut self, key: impl AsRef<[u8]>) -> bool {
        unwrap_safe(self.add_with::<Infallible>(key.as_ref()))
    }

    /// Like [RadixTree::add], but reports allocation failure instead of
    /// aborting. On error the tree is unchanged.
    pub fn try_add(&mut self, key: impl AsRef<[u8]>) -> Result<bool, AllocError> {
        self.add_with::<Fallible>(key.as_ref())
    }

    /// Remove one registration of `key`. Returns true if the key was present.
    pub fn rm(&mut self, key: impl AsRef<[u8]>) -> bool {
        unwrap_safe(self.rm_with::<Infallible>(key.as_ref()))
    }

    /// Like [RadixTree::rm], but reports allocation failure instead of
    /// aborting. On error the tree is unchanged.
    pub fn try_rm(&mut self, key: impl AsRef<[u8]>) -> Result<bool, AllocError> {
        self.rm_with::<Fallible>(key.as_ref())
    }

    /// True if `key` itself is present
    pub fn check(&self, key: impl AsRef<[u8]>) -> bool {
        self.refcount(key) > 0
    }

    /// How often `key` has been added and not yet removed
    pub fn refcount(&self, key: impl AsRef<[u8]>) -> u32 {
        let key = key.as_ref();
        let m = find(&self.root, key, |_| {});
        if m.is_exact(key) {
            m.node.refcount()
        } else {
            0
        }
    }

    /// True if some present key is a prefix of `topic`.
    ///
    /// This is the subscription test: a message published on `topic` goes to
    /// every subscription that is a prefix of it. The empty key matches
    /// everything.
    pub fn matches(&self, topic: impl AsRef<[u8]>) -> bool {
        find_subscriber(&self.root, topic.as_ref())
    }

    /// Call `f` once for every present key, with the key, its length and the
    /// caller supplied context.
    ///
    /// The order is depth first along the edge tables. It is deterministic
    /// for a given tree, but not sorted.
    ///
    /// Recurses once per tree level. The depth is bounded by the number of
    /// keys that are prefixes of one another, e.g. `a`, `aa`, `aaa`.
    pub fn apply<C>(&self, mut f: impl FnMut(&[u8], usize, &mut C), ctx: &mut C) {
        let mut key = Vec::new();
        visit_keys(&self.root, &mut key, &mut f, ctx);
    }

    /// Iterate over all present keys and their refcount, in [RadixTree::apply]
    /// order
    pub fn keys(&self) -> KeyIter<'_> {
        KeyIter::new(&self.root)
    }

    /// Remove all keys, regardless of their refcount
    pub fn clear(&mut self) {
        debug!("clearing tree with {} keys", self.size);
        self.root = Node::EMPTY;
        self.size = 0;
    }

    /// Print the node structure to stdout. Recurses like [RadixTree::apply].
    pub fn dump(&self) {
        println!("RadixTree size={}", self.size);
        self.root.dump(2);
    }

    /// Check the structural invariants of the tree.
    ///
    /// - the root prefix is empty
    /// - every other node has a non empty prefix starting with the byte of
    ///   the edge leading to it, and edge bytes are unique per node
    /// - every other node without a key has at least two children
    /// - the size matches the number of nodes holding a key
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut key = Vec::new();
        let mut count = 0;
        validate_node(&self.root, true, &mut key, &mut count)?;
        anyhow::ensure!(
            count == self.size,
            "size is {}, but {} keys are present",
            self.size,
            count
        );
        Ok(())
    }

    fn add_with<A: Reserve>(&mut self, key: &[u8]) -> Result<bool, A::Error> {
        let (path, m) = Path::find::<A>(&self.root, key)?;
        let (nkey, nprefix) = (m.nkey, m.nprefix);
        let diverges = m.diverges();
        let node = descendant_mut(&mut self.root, path.as_slice());
        if diverges {
            // the key leaves the tree inside the prefix of node, so node gets
            // split at the divergence. The split happens in the slot of node,
            // which rewires the edge of its parent to the new intermediate node.
            let leaf = if nkey < key.len() {
                Some(Node::leaf::<A>(&key[nkey..])?)
            } else {
                None
            };
            node.split::<A>(nprefix, leaf)?;
            trace!(
                "added {}, split node after {} prefix bytes",
                Hex::partial(key, 32),
                nprefix
            );
        } else if nkey < key.len() {
            // node is fully matched, but has no edge for the next key byte
            let leaf = Node::leaf::<A>(&key[nkey..])?;
            node.push_edge::<A>(leaf)?;
            trace!(
                "added {}, new leaf {}",
                Hex::partial(key, 32),
                Hex::new(&key[nkey..])
            );
        } else {
            let refcount = node.refcount();
            node.set_refcount(refcount.checked_add(1).ok_or_else(A::overflow)?);
            if refcount > 0 {
                return Ok(false);
            }
        }
        self.size += 1;
        Ok(true)
    }

    fn rm_with<A: Reserve>(&mut self, key: &[u8]) -> Result<bool, A::Error> {
        let (path, m) = Path::find::<A>(&self.root, key)?;
        if !m.is_exact(key) || m.node.refcount() == 0 {
            return Ok(false);
        }
        let refcount = m.node.refcount();
        let edgecount = m.node.edgecount();
        if refcount > 1 {
            descendant_mut(&mut self.root, path.as_slice()).set_refcount(refcount - 1);
            return Ok(true);
        }
        match path.parent() {
            Some((parent_path, index)) if edgecount == 0 => {
                // the node is a dead leaf, drop its edge from the parent
                let parent = descendant_mut(&mut self.root, parent_path);
                let collapse =
                    !parent_path.is_empty() && parent.refcount() == 0 && parent.edgecount() == 2;
                // allocate before touching anything
                let merge = if collapse {
                    Some(parent.prepare_merge::<A>(1 - index)?)
                } else {
                    None
                };
                parent.remove_edge(index);
                if let Some(merge) = merge {
                    // the remaining edge was moved to index 0
                    parent.merge_child(0, merge);
                    trace!("removed {}, merged parent with sibling", Hex::partial(key, 32));
                } else {
                    trace!("removed {}, dropped leaf", Hex::partial(key, 32));
                }
            }
            Some(_) if edgecount == 1 => {
                let node = descendant_mut(&mut self.root, path.as_slice());
                let merge = node.prepare_merge::<A>(0)?;
                node.merge_child(0, merge);
                trace!("removed {}, merged node with child", Hex::partial(key, 32));
            }
            _ => {
                // the root, or a node that still routes to several children
                descendant_mut(&mut self.root, path.as_slice()).set_refcount(0);
            }
        }
        self.size -= 1;
        Ok(true)
    }
}

fn visit_keys<C>(
    node: &Node,
    key: &mut Vec<u8>,
    f: &mut impl FnMut(&[u8], usize, &mut C),
    ctx: &mut C,
) {
    let len = key.len();
    key.extend_from_slice(node.prefix());
    if node.refcount() > 0 {
        f(key.as_slice(), key.len(), ctx);
    }
    for child in node.children() {
        visit_keys(child, key, f, ctx);
    }
    key.truncate(len);
}

fn validate_node(
    node: &Node,
    is_root: bool,
    key: &mut Vec<u8>,
    count: &mut usize,
) -> anyhow::Result<()> {
    let len = key.len();
    key.extend_from_slice(node.prefix());
    if node.refcount() > 0 {
        *count += 1;
    }
    check_node(node, is_root)
        .with_context(|| format!("invalid node at {}", Hex::new(key.as_slice())))?;
    for child in node.children() {
        validate_node(child, false, key, count)?;
    }
    key.truncate(len);
    Ok(())
}

fn check_node(node: &Node, is_root: bool) -> anyhow::Result<()> {
    if is_root {
        anyhow::ensure!(
            node.prefix_length() == 0,
            "root has prefix {}",
            Hex::new(node.prefix())
        );
    } else {
        anyhow::ensure!(node.prefix_length() > 0, "empty prefix");
        anyhow::ensure!(
            node.refcount() > 0 || node.edgecount() >= 2,
            "node without key has {} edges",
            node.edgecount()
        );
    }
    let mut seen = [false; 256];
    for (byte, child) in node.edges() {
        anyhow::ensure!(!seen[byte as usize], "duplicate edge {:02x}", byte);
        seen[byte as usize] = true;
        anyhow::ensure!(
            child.prefix().first() == Some(&byte),
            "edge {:02x} leads to prefix {}",
            byte,
            Hex::new(child.prefix())
        );
    }
    Ok(())
}

impl fmt::Debug for RadixTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self.keys().collect::<Vec<_>>();
        f.debug_map()
            .entries(keys.iter().map(|(key, refcount)| (Hex::new(key), refcount)))
            .finish()
    }
}

impl<K: AsRef<[u8]>> FromIterator<K> for RadixTree {
    fn from_iter<T: IntoIterator<Item = K>>(iter: T) -> Self {
        let mut res = RadixTree::new();
        res.extend(iter);
        res
    }
}

impl<K: AsRef<[u8]>> Extend<K> for RadixTree {
    fn extend<T: IntoIterator<Item = K>>(&mut self, iter: T) {
        for key in iter {
            self.add(key);
        }
    }
}
