//! Accumulators for folding streamed blocks.

/// A type with an identity element and an associative combine.
pub trait Monoid: Sized {
    /// The identity element.
    fn empty() -> Self;

    /// Combine two values; `empty()` is neutral on both sides.
    fn combine(self, other: Self) -> Self;
}

impl<T> Monoid for Vec<T> {
    fn empty() -> Self {
        Vec::new()
    }

    fn combine(mut self, mut other: Self) -> Self {
        self.append(&mut other);
        self
    }
}

impl Monoid for u64 {
    fn empty() -> Self {
        0
    }

    fn combine(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl Monoid for usize {
    fn empty() -> Self {
        0
    }

    fn combine(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl Monoid for () {
    fn empty() -> Self {}

    fn combine(self, _other: Self) -> Self {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_keeps_order() {
        let combined = vec![1].combine(vec![2, 3]).combine(Vec::empty());
        assert_eq!(combined, vec![1, 2, 3]);
    }

    #[test]
    fn test_counts_add() {
        assert_eq!(u64::empty().combine(4).combine(5), 9);
        assert_eq!(usize::MAX.combine(1), usize::MAX);
    }
}
