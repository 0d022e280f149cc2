use std::{fmt::Debug, hash::Hash, str::FromStr};

/// Common interface of every collection-like value in the crate: spans,
/// span sets, timestamp sets, and the temporal types themselves (whose
/// collection dimension is time).
pub trait Collection: PartialEq + Debug + FromStr + Hash + Clone {
    type Type;

    /// Returns whether `self` is contained in `container`.
    fn is_contained_in(&self, container: &Self) -> bool;

    /// Returns whether the collection contains the given element.
    fn contains(&self, content: &Self::Type) -> bool;

    /// Returns whether `self` and `other` share at least one element.
    fn overlaps(&self, other: &Self) -> bool;

    /// Returns whether `self` is strictly before `other`: `self` ends
    /// before `other` starts.
    fn is_left(&self, other: &Self) -> bool;

    /// Returns whether `self` ends before `other` ends (overlap allowed).
    fn is_over_or_left(&self, other: &Self) -> bool;

    /// Returns whether `self` starts after `other` starts (overlap
    /// allowed).
    fn is_over_or_right(&self, other: &Self) -> bool;

    /// Returns whether `self` is strictly after `other`: `self` starts
    /// after `other` ends.
    fn is_right(&self, other: &Self) -> bool;

    /// Returns whether `self` and `other` touch without overlapping.
    fn is_adjacent(&self, other: &Self) -> bool;
}
