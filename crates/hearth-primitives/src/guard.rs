//! per-resource reentrancy guard
//!
//! an advisory in-flight flag per resource key. a key is marked on entry and
//! cleared when the returned [`Entered`] token drops, so every exit path
//! (including `?` early returns and rollbacks) releases it.
//!
//! single-threaded by construction: serialized execution is the host's job,
//! the guard only catches a callee re-entering while an external value
//! transfer is in flight.

use core::cell::RefCell;
use core::fmt::Debug;
use std::collections::BTreeSet;

use thiserror::Error;

use crate::ErrorKind;

/// entry refused because the resource is already in flight
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("reentrant call on {resource}")]
pub struct ReentrantCall {
    pub resource: String,
}

impl ReentrantCall {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Integrity
    }
}

#[derive(Debug)]
pub struct ReentrancyGuard<K: Ord + Copy + Debug> {
    held: RefCell<BTreeSet<K>>,
}

impl<K: Ord + Copy + Debug> Default for ReentrancyGuard<K> {
    fn default() -> Self {
        Self {
            held: RefCell::new(BTreeSet::new()),
        }
    }
}

impl<K: Ord + Copy + Debug> ReentrancyGuard<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// mark `key` in flight until the token drops
    pub fn enter(&self, key: K) -> Result<Entered<'_, K>, ReentrantCall> {
        if !self.held.borrow_mut().insert(key) {
            return Err(ReentrantCall {
                resource: format!("{key:?}"),
            });
        }
        Ok(Entered { guard: self, key })
    }

    /// enter every key or none of them
    pub fn enter_all(&self, keys: &[K]) -> Result<Vec<Entered<'_, K>>, ReentrantCall> {
        // tokens acquired before a failure drop here and release their keys
        keys.iter().map(|key| self.enter(*key)).collect()
    }

    pub fn is_held(&self, key: &K) -> bool {
        self.held.borrow().contains(key)
    }

    pub fn is_idle(&self) -> bool {
        self.held.borrow().is_empty()
    }
}

/// scoped hold on one resource key
#[derive(Debug)]
#[must_use = "the resource is released as soon as the token drops"]
pub struct Entered<'a, K: Ord + Copy + Debug> {
    guard: &'a ReentrancyGuard<K>,
    key: K,
}

impl<K: Ord + Copy + Debug> Drop for Entered<'_, K> {
    fn drop(&mut self) {
        self.guard.held.borrow_mut().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
    enum Res {
        Pool,
        Loan(u64),
    }

    #[test]
    fn test_second_entry_rejected() {
        let guard = ReentrancyGuard::new();
        let held = guard.enter(Res::Pool).unwrap();
        let err = guard.enter(Res::Pool).unwrap_err();
        assert_eq!(err.resource, "Pool");
        drop(held);
        assert!(guard.enter(Res::Pool).is_ok());
    }

    #[test]
    fn test_distinct_keys_independent() {
        let guard = ReentrancyGuard::new();
        let _a = guard.enter(Res::Loan(1)).unwrap();
        let _b = guard.enter(Res::Loan(2)).unwrap();
        assert!(guard.is_held(&Res::Loan(1)));
        assert!(!guard.is_held(&Res::Pool));
    }

    #[test]
    fn test_enter_all_releases_on_failure() {
        let guard = ReentrancyGuard::new();
        let _loan = guard.enter(Res::Loan(7)).unwrap();
        assert!(guard.enter_all(&[Res::Pool, Res::Loan(7)]).is_err());
        // pool was taken first, then released when the batch failed
        assert!(!guard.is_held(&Res::Pool));
    }

    #[test]
    fn test_released_on_error_path() {
        fn fallible(guard: &ReentrancyGuard<Res>) -> Result<(), &'static str> {
            let _held = guard.enter(Res::Pool).map_err(|_| "busy")?;
            Err("failed after entry")
        }
        let guard = ReentrancyGuard::new();
        assert!(fallible(&guard).is_err());
        assert!(guard.is_idle());
    }
}
