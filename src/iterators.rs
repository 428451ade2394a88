use std::slice;

use crate::node::Node;

/// Iterator over the present keys of a [crate::RadixTree], together with how
/// often each key was added.
///
/// Keys come out in the same depth first order in which
/// [crate::RadixTree::apply] visits them.
pub struct KeyIter<'a> {
    /// the key up to and including the prefix of the top of the stack
    key: Vec<u8>,
    /// remaining children of every node on the current path, and the key
    /// length before that node's prefix
    stack: Vec<(slice::Iter<'a, Node>, usize)>,
    /// the next node to visit
    pending: Option<&'a Node>,
}

impl<'a> KeyIter<'a> {
    pub(crate) fn new(root: &'a Node) -> Self {
        Self {
            key: Vec::new(),
            stack: Vec::new(),
            pending: Some(root),
        }
    }
}

impl<'a> Iterator for KeyIter<'a> {
    type Item = (Vec<u8>, u32);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.pending.take() {
                let len = self.key.len();
                self.key.extend_from_slice(node.prefix());
                self.stack.push((node.children(), len));
                if node.refcount() > 0 {
                    return Some((self.key.clone(), node.refcount()));
                }
            } else {
                let (children, len) = self.stack.last_mut()?;
                match children.next() {
                    Some(child) => self.pending = Some(child),
                    None => {
                        let len = *len;
                        self.key.truncate(len);
                        self.stack.pop();
                    }
                }
            }
        }
    }
}
