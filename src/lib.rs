//! A reference counted radix tree for tracking subscription topics.
//!
//! Keys are arbitrary byte strings. Adding the same key several times is
//! counted, and the key stays present until it has been removed just as often.
//!
//! ```
//! use radixsub::RadixTree;
//!
//! let mut topics = RadixTree::new();
//! assert!(topics.add(b"weather."));
//! assert!(!topics.add(b"weather."));
//! assert!(topics.add(b"weather.rain"));
//! assert_eq!(topics.size(), 2);
//!
//! assert!(topics.check(b"weather."));
//! assert!(!topics.check(b"weather"));
//! assert!(topics.matches(b"weather.snow"));
//!
//! assert!(topics.rm(b"weather."));
//! assert!(topics.check(b"weather."));
//! assert!(topics.rm(b"weather."));
//! assert!(!topics.check(b"weather."));
//! ```
mod iterators;
mod matching;
pub mod node;
pub mod reserve;
mod tree;
mod util;

pub use iterators::KeyIter;
pub use reserve::AllocError;
pub use tree::RadixTree;
pub(crate) use util::Hex;

#[cfg(test)]
#[macro_use]
extern crate maplit;


// common prefix of two slices.
fn common_prefix<'a, T: Eq>(a: &'a [T], b: &'a [T]) -> usize {
    a.iter().zip(b).take_while(|(a, b)| a == b).count()
}
