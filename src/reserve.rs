//! Allocation policies for node buffers.
//!
//! Every buffer a node owns is grown through a [Reserve] implementation, so the
//! same tree code can either abort on allocation failure like a `Vec` does, or
//! report it to the caller.
use std::{collections::TryReserveError, fmt};

/// How node buffers get their memory
pub trait Reserve {
    /// The error. Use NoError for a policy that can never fail
    type Error: fmt::Debug;

    /// Reserve room for exactly `additional` more elements in `vec`.
    ///
    /// If this returns an error, `vec` is guaranteed to be unmodified.
    fn reserve<T>(vec: &mut Vec<T>, additional: usize) -> Result<(), Self::Error>;

    /// A length or counter does not fit into its header field
    fn overflow() -> Self::Error;
}

/// Allocate like `Vec` does, aborting the process on failure
#[derive(Debug, Clone, Copy, Default)]
pub struct Infallible;

impl Reserve for Infallible {
    type Error = NoError;

    fn reserve<T>(vec: &mut Vec<T>, additional: usize) -> Result<(), Self::Error> {
        vec.reserve_exact(additional);
        Ok(())
    }

    fn overflow() -> Self::Error {
        panic!("capacity overflow")
    }
}

/// Allocate using `try_reserve_exact`, surfacing failure as [AllocError]
#[derive(Debug, Clone, Copy, Default)]
pub struct Fallible;

impl Reserve for Fallible {
    type Error = AllocError;

    fn reserve<T>(vec: &mut Vec<T>, additional: usize) -> Result<(), Self::Error> {
        vec.try_reserve_exact(additional).map_err(AllocError::Reserve)
    }

    fn overflow() -> Self::Error {
        AllocError::CapacityOverflow
    }
}

/// Error for a policy that can never fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoError {}

impl From<NoError> for anyhow::Error {
    fn from(never: NoError) -> Self {
        match never {}
    }
}

/// Unwrap an unfallible result
pub fn unwrap_safe<T>(x: Result<T, NoError>) -> T {
    match x {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Allocation failure while building or resizing a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The allocator refused the request
    Reserve(TryReserveError),
    /// A prefix length or refcount does not fit into 32 bits
    CapacityOverflow,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserve(cause) => write!(f, "node allocation failed: {}", cause),
            Self::CapacityOverflow => write!(f, "node capacity overflow"),
        }
    }
}

impl std::error::Error for AllocError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Reserve(cause) => Some(cause),
            Self::CapacityOverflow => None,
        }
    }
}
