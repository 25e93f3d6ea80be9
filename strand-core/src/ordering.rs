//! Direction-tagged, non-empty sequences.
//!
//! Chain data travels in two orders: header responses run from the newest
//! entry back towards the oldest, while block streams run forwards. The two
//! orders are separate types so a reversal can only happen through an
//! explicit conversion.

use serde::{Deserialize, Serialize};

use crate::error::OrderingError;

/// Non-empty sequence whose first element is the newest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<T>", into = "Vec<T>")]
pub struct NewestFirst<T: Clone>(Vec<T>);

/// Non-empty sequence whose first element is the oldest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<T>", into = "Vec<T>")]
pub struct OldestFirst<T: Clone>(Vec<T>);

impl<T: Clone> NewestFirst<T> {
    /// Wrap items already ordered newest first.
    pub fn new(items: Vec<T>) -> Result<Self, OrderingError> {
        if items.is_empty() {
            return Err(OrderingError::Empty);
        }
        Ok(Self(items))
    }

    /// Sequence holding a single item.
    pub fn one(item: T) -> Self {
        Self(vec![item])
    }

    /// The newest item.
    pub fn newest(&self) -> &T {
        &self.0[0]
    }

    /// The oldest item.
    pub fn oldest(&self) -> &T {
        &self.0[self.0.len() - 1]
    }

    /// Number of items. Never zero.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate newest to oldest.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// Borrow the items, newest first.
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    /// Unwrap into a plain vector, newest first.
    pub fn into_vec(self) -> Vec<T> {
        self.0
    }

    /// Apply `f` to every item, keeping the order.
    pub fn map<U: Clone>(self, f: impl FnMut(T) -> U) -> NewestFirst<U> {
        NewestFirst(self.0.into_iter().map(f).collect())
    }

    /// Reverse into oldest-first order.
    pub fn into_oldest_first(self) -> OldestFirst<T> {
        let mut items = self.0;
        items.reverse();
        OldestFirst(items)
    }
}

impl<T: Clone> OldestFirst<T> {
    /// Wrap items already ordered oldest first.
    pub fn new(items: Vec<T>) -> Result<Self, OrderingError> {
        if items.is_empty() {
            return Err(OrderingError::Empty);
        }
        Ok(Self(items))
    }

    /// Sequence holding a single item.
    pub fn one(item: T) -> Self {
        Self(vec![item])
    }

    /// The oldest item.
    pub fn oldest(&self) -> &T {
        &self.0[0]
    }

    /// The newest item.
    pub fn newest(&self) -> &T {
        &self.0[self.0.len() - 1]
    }

    /// Number of items. Never zero.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// Borrow the items, oldest first.
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    /// Unwrap into a plain vector, oldest first.
    pub fn into_vec(self) -> Vec<T> {
        self.0
    }

    /// Append an item newer than every existing one.
    pub fn push(&mut self, item: T) {
        self.0.push(item);
    }

    /// Apply `f` to every item, keeping the order.
    pub fn map<U: Clone>(self, f: impl FnMut(T) -> U) -> OldestFirst<U> {
        OldestFirst(self.0.into_iter().map(f).collect())
    }

    /// Reverse into newest-first order.
    pub fn into_newest_first(self) -> NewestFirst<T> {
        let mut items = self.0;
        items.reverse();
        NewestFirst(items)
    }
}

impl<T: Clone> TryFrom<Vec<T>> for NewestFirst<T> {
    type Error = OrderingError;

    fn try_from(items: Vec<T>) -> Result<Self, Self::Error> {
        Self::new(items)
    }
}

impl<T: Clone> TryFrom<Vec<T>> for OldestFirst<T> {
    type Error = OrderingError;

    fn try_from(items: Vec<T>) -> Result<Self, Self::Error> {
        Self::new(items)
    }
}

impl<T: Clone> From<NewestFirst<T>> for Vec<T> {
    fn from(seq: NewestFirst<T>) -> Self {
        seq.0
    }
}

impl<T: Clone> From<OldestFirst<T>> for Vec<T> {
    fn from(seq: OldestFirst<T>) -> Self {
        seq.0
    }
}

impl<T: Clone> IntoIterator for NewestFirst<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: Clone> IntoIterator for OldestFirst<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
