use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, Range, RangeInclusive};
use std::str::FromStr;

use crate::collections::base::collection::Collection;
use crate::collections::base::span_set::SpanSet;
use crate::errors::{Error, ParseError};
use crate::wire::{WireReader, WireWriter};

/// Element type a [`Span`] can range over: `i32`, `f64`, or
/// `DateTime<Utc>`.
pub trait SpanElement: Copy + PartialEq + PartialOrd + fmt::Debug {
    /// Type of differences between two elements (width of a number span,
    /// duration of a time span).
    type Delta: Copy + PartialOrd + fmt::Debug;

    /// Discrete domains canonicalize spans to inclusive-lower /
    /// exclusive-upper form.
    const DISCRETE: bool = false;

    /// The successor of a value in a discrete domain; identity otherwise.
    fn succ(self) -> Self {
        self
    }

    fn delta(upper: Self, lower: Self) -> Self::Delta;
    fn offset(self, delta: Self::Delta) -> Self;
    fn zero_delta() -> Self::Delta;
    fn add_delta(a: Self::Delta, b: Self::Delta) -> Self::Delta;
    fn delta_to_double(delta: Self::Delta) -> f64;
    fn delta_from_double(delta: f64) -> Self::Delta;

    /// Projection used by histogram positions and box extents.
    fn to_double(self) -> f64;

    fn format_bound(&self) -> String;
    fn parse_bound(s: &str) -> Result<Self, ParseError>;
    fn hash_bound<H: Hasher>(&self, state: &mut H);
    fn write_wire(&self, w: &mut WireWriter);
    fn read_wire(r: &mut WireReader) -> Result<Self, Error>;
}

impl SpanElement for i32 {
    type Delta = i32;
    const DISCRETE: bool = true;

    fn succ(self) -> Self {
        self.saturating_add(1)
    }

    fn delta(upper: Self, lower: Self) -> i32 {
        upper - lower
    }

    fn offset(self, delta: i32) -> Self {
        self + delta
    }

    fn zero_delta() -> i32 {
        0
    }

    fn add_delta(a: i32, b: i32) -> i32 {
        a + b
    }

    fn delta_to_double(delta: i32) -> f64 {
        delta as f64
    }

    fn delta_from_double(delta: f64) -> i32 {
        delta.round() as i32
    }

    fn to_double(self) -> f64 {
        self as f64
    }

    fn format_bound(&self) -> String {
        self.to_string()
    }

    fn parse_bound(s: &str) -> Result<Self, ParseError> {
        s.trim().parse().map_err(|_| ParseError::new("int", s.to_string()))
    }

    fn hash_bound<H: Hasher>(&self, state: &mut H) {
        state.write_i32(*self);
    }

    fn write_wire(&self, w: &mut WireWriter) {
        w.i32(*self);
    }

    fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        r.i32()
    }
}

impl SpanElement for f64 {
    type Delta = f64;

    fn delta(upper: Self, lower: Self) -> f64 {
        upper - lower
    }

    fn offset(self, delta: f64) -> Self {
        self + delta
    }

    fn zero_delta() -> f64 {
        0.0
    }

    fn add_delta(a: f64, b: f64) -> f64 {
        a + b
    }

    fn delta_to_double(delta: f64) -> f64 {
        delta
    }

    fn delta_from_double(delta: f64) -> f64 {
        delta
    }

    fn to_double(self) -> f64 {
        self
    }

    fn format_bound(&self) -> String {
        self.to_string()
    }

    fn parse_bound(s: &str) -> Result<Self, ParseError> {
        s.trim().parse().map_err(|_| ParseError::new("float", s.to_string()))
    }

    fn hash_bound<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.to_bits());
    }

    fn write_wire(&self, w: &mut WireWriter) {
        w.f64(*self);
    }

    fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        r.f64()
    }
}

impl SpanElement for chrono::DateTime<chrono::Utc> {
    type Delta = chrono::TimeDelta;

    fn delta(upper: Self, lower: Self) -> chrono::TimeDelta {
        upper - lower
    }

    fn offset(self, delta: chrono::TimeDelta) -> Self {
        self + delta
    }

    fn zero_delta() -> chrono::TimeDelta {
        chrono::TimeDelta::zero()
    }

    fn add_delta(a: chrono::TimeDelta, b: chrono::TimeDelta) -> chrono::TimeDelta {
        a + b
    }

    fn delta_to_double(delta: chrono::TimeDelta) -> f64 {
        delta.num_microseconds().unwrap_or(i64::MAX) as f64
    }

    fn delta_from_double(delta: f64) -> chrono::TimeDelta {
        chrono::TimeDelta::microseconds(delta.round() as i64)
    }

    fn to_double(self) -> f64 {
        crate::utils::to_micros(&self) as f64
    }

    fn format_bound(&self) -> String {
        crate::utils::format_timestamp(self)
    }

    fn parse_bound(s: &str) -> Result<Self, ParseError> {
        crate::utils::parse_timestamp(s)
    }

    fn hash_bound<H: Hasher>(&self, state: &mut H) {
        state.write_i64(crate::utils::to_micros(self));
    }

    fn write_wire(&self, w: &mut WireWriter) {
        w.timestamp(self);
    }

    fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        r.timestamp()
    }
}

/// Compares two span bounds under the `(value, is_lower, inclusive)`
/// lexicographic order, so that e.g. the upper bound of `[a, b)` sorts
/// before the lower bound of `[b, c]`.
pub(crate) fn cmp_bounds<T: SpanElement>(
    v1: T,
    v2: T,
    lower1: bool,
    lower2: bool,
    inc1: bool,
    inc2: bool,
) -> Ordering {
    let result = v1.partial_cmp(&v2).expect("span bounds are totally ordered");
    if result != Ordering::Equal {
        return result;
    }
    // Equal values: break the tie on inclusivity.
    if !inc1 && !inc2 {
        if lower1 == lower2 {
            Ordering::Equal
        } else if lower1 {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    } else if !inc1 {
        if lower1 {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    } else if !inc2 {
        if lower2 {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    } else {
        Ordering::Equal
    }
}

/// A set of contiguous values between two bounds with explicit
/// inclusivity. Time spans are the `Period` of the temporal model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span<T: SpanElement> {
    lower: T,
    upper: T,
    lower_inc: bool,
    upper_inc: bool,
}

impl<T: SpanElement> Span<T> {
    /// Builds a span, canonicalizing discrete domains to
    /// inclusive-lower/exclusive-upper form.
    ///
    /// ## Errors
    /// `DomainError` when `lower > upper` or when the span would be empty
    /// (equal bounds not both inclusive).
    pub fn new(lower: T, upper: T, lower_inc: bool, upper_inc: bool) -> Result<Self, Error> {
        let (mut lower, mut upper) = (lower, upper);
        let (mut lower_inc, mut upper_inc) = (lower_inc, upper_inc);
        if T::DISCRETE {
            if !lower_inc {
                lower = lower.succ();
                lower_inc = true;
            }
            if upper_inc {
                upper = upper.succ();
                upper_inc = false;
            }
        }
        match lower.partial_cmp(&upper) {
            Some(Ordering::Less) => {}
            Some(Ordering::Equal) if lower_inc && upper_inc => {}
            Some(Ordering::Equal) => {
                return Err(Error::DomainError(format!(
                    "span with equal bounds must be inclusive on both sides: {:?}",
                    lower
                )))
            }
            _ => {
                return Err(Error::DomainError(format!(
                    "span lower bound {:?} is above upper bound {:?}",
                    lower, upper
                )))
            }
        }
        Ok(Self { lower, upper, lower_inc, upper_inc })
    }

    pub(crate) fn instant(value: T) -> Self {
        if T::DISCRETE {
            Self { lower: value, upper: value.succ(), lower_inc: true, upper_inc: false }
        } else {
            Self { lower: value, upper: value, lower_inc: true, upper_inc: true }
        }
    }

    pub fn lower(&self) -> T {
        self.lower
    }

    pub fn upper(&self) -> T {
        self.upper
    }

    pub fn is_lower_inclusive(&self) -> bool {
        self.lower_inc
    }

    pub fn is_upper_inclusive(&self) -> bool {
        self.upper_inc
    }

    /// The difference between the bounds.
    pub fn width(&self) -> T::Delta {
        T::delta(self.upper, self.lower)
    }

    pub(crate) fn is_instant(&self) -> bool {
        self.lower == self.upper || (T::DISCRETE && self.upper == self.lower.succ())
    }

    pub(crate) fn cmp_spans(&self, other: &Self) -> Ordering {
        cmp_bounds(self.lower, other.lower, true, true, self.lower_inc, other.lower_inc).then_with(
            || cmp_bounds(self.upper, other.upper, false, false, self.upper_inc, other.upper_inc),
        )
    }

    /// Smallest span covering both inputs.
    pub fn hull(&self, other: &Self) -> Self {
        let (lower, lower_inc) = if cmp_bounds(
            self.lower,
            other.lower,
            true,
            true,
            self.lower_inc,
            other.lower_inc,
        ) == Ordering::Greater
        {
            (other.lower, other.lower_inc)
        } else {
            (self.lower, self.lower_inc)
        };
        let (upper, upper_inc) = if cmp_bounds(
            self.upper,
            other.upper,
            false,
            false,
            self.upper_inc,
            other.upper_inc,
        ) == Ordering::Less
        {
            (other.upper, other.upper_inc)
        } else {
            (self.upper, self.upper_inc)
        };
        Self { lower, upper, lower_inc, upper_inc }
    }

    /// Widens `self` so it also covers `other`.
    pub fn expand(&mut self, other: &Self) {
        *self = self.hull(other);
    }

    pub(crate) fn contains_element(&self, value: T) -> bool {
        let after_lower = match value.partial_cmp(&self.lower) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => self.lower_inc,
            _ => false,
        };
        let before_upper = match value.partial_cmp(&self.upper) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => self.upper_inc,
            _ => false,
        };
        after_lower && before_upper
    }

    /// Intersection of two spans, `None` when they do not overlap.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let (lower, lower_inc) = if cmp_bounds(
            self.lower,
            other.lower,
            true,
            true,
            self.lower_inc,
            other.lower_inc,
        ) == Ordering::Less
        {
            (other.lower, other.lower_inc)
        } else {
            (self.lower, self.lower_inc)
        };
        let (upper, upper_inc) = if cmp_bounds(
            self.upper,
            other.upper,
            false,
            false,
            self.upper_inc,
            other.upper_inc,
        ) == Ordering::Greater
        {
            (other.upper, other.upper_inc)
        } else {
            (self.upper, self.upper_inc)
        };
        Some(Self { lower, upper, lower_inc, upper_inc })
    }

    /// Union of two spans as a (one- or two-element) span set.
    pub fn union(&self, other: &Self) -> SpanSet<T> {
        SpanSet::from_spans(vec![*self, *other])
    }

    /// The part of `self` not covered by `other`: zero, one, or two spans.
    pub fn minus(&self, other: &Self) -> Vec<Self> {
        if !self.overlaps(other) {
            return vec![*self];
        }
        let mut result = Vec::new();
        if cmp_bounds(self.lower, other.lower, true, true, self.lower_inc, other.lower_inc)
            == Ordering::Less
        {
            // Left remainder, closed by the complement of other's lower bound.
            if let Ok(s) = Span::new(self.lower, other.lower, self.lower_inc, !other.lower_inc) {
                result.push(s);
            }
        }
        if cmp_bounds(self.upper, other.upper, false, false, self.upper_inc, other.upper_inc)
            == Ordering::Greater
        {
            if let Ok(s) = Span::new(other.upper, self.upper, !other.upper_inc, self.upper_inc) {
                result.push(s);
            }
        }
        result
    }

    /// Returns a new span shifted by `delta`.
    pub fn shift(&self, delta: T::Delta) -> Self {
        self.shift_scale(Some(delta), None)
    }

    /// Returns a new span scaled so its width is `width`.
    pub fn scale(&self, width: T::Delta) -> Self {
        self.shift_scale(None, Some(width))
    }

    /// Returns a new span shifted by `delta` and scaled so its width is
    /// `width`.
    pub fn shift_scale(&self, delta: Option<T::Delta>, width: Option<T::Delta>) -> Self {
        let lower = match delta {
            Some(d) => self.lower.offset(d),
            None => self.lower,
        };
        let upper = match (delta, width) {
            (_, Some(w)) => lower.offset(w),
            (Some(d), None) => self.upper.offset(d),
            (None, None) => self.upper,
        };
        Self { lower, upper, lower_inc: self.lower_inc, upper_inc: self.upper_inc }
    }

    /// Distance from the span to a value; zero when contained.
    pub fn distance_to_value(&self, value: &T) -> T::Delta {
        if self.contains_element(*value) {
            T::zero_delta()
        } else if value.partial_cmp(&self.lower) == Some(Ordering::Less) {
            T::delta(self.lower, *value)
        } else {
            T::delta(*value, self.upper)
        }
    }

    /// Distance between two spans; zero when they overlap.
    pub fn distance_to_span(&self, other: &Self) -> T::Delta {
        if self.overlaps(other) {
            T::zero_delta()
        } else if cmp_bounds(self.upper, other.lower, false, true, self.upper_inc, other.lower_inc)
            == Ordering::Less
        {
            T::delta(other.lower, self.upper)
        } else {
            T::delta(self.lower, other.upper)
        }
    }

    /// Merges an arbitrary collection of spans into the minimal ordered
    /// cover: overlapping or adjacent spans collapse into one.
    pub fn normalize(mut spans: Vec<Self>) -> Vec<Self> {
        if spans.len() <= 1 {
            return spans;
        }
        spans.sort_by(|a, b| a.cmp_spans(b));
        let mut result: Vec<Self> = Vec::with_capacity(spans.len());
        let mut current = spans[0];
        for span in spans.into_iter().skip(1) {
            if current.overlaps(&span) || current.is_adjacent(&span) {
                current.expand(&span);
            } else {
                result.push(current);
                current = span;
            }
        }
        result.push(current);
        result
    }

    pub fn as_wkb(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        self.write_wire(&mut w);
        w.finish()
    }

    pub fn from_wkb(buf: &[u8]) -> Result<Self, Error> {
        let mut r = WireReader::new(buf);
        Self::read_wire(&mut r)
    }

    pub(crate) fn write_wire(&self, w: &mut WireWriter) {
        self.lower.write_wire(w);
        self.upper.write_wire(w);
        w.bool(self.lower_inc);
        w.bool(self.upper_inc);
    }

    pub(crate) fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        let lower = T::read_wire(r)?;
        let upper = T::read_wire(r)?;
        let lower_inc = r.bool()?;
        let upper_inc = r.bool()?;
        Self::new(lower, upper, lower_inc, upper_inc)
    }
}

impl<T: SpanElement> Collection for Span<T> {
    type Type = T;

    fn is_contained_in(&self, container: &Self) -> bool {
        cmp_bounds(container.lower, self.lower, true, true, container.lower_inc, self.lower_inc)
            != Ordering::Greater
            && cmp_bounds(self.upper, container.upper, false, false, self.upper_inc, container.upper_inc)
                != Ordering::Greater
    }

    fn contains(&self, content: &T) -> bool {
        self.contains_element(*content)
    }

    fn overlaps(&self, other: &Self) -> bool {
        cmp_bounds(self.lower, other.upper, true, false, self.lower_inc, other.upper_inc)
            != Ordering::Greater
            && cmp_bounds(other.lower, self.upper, true, false, other.lower_inc, self.upper_inc)
                != Ordering::Greater
    }

    fn is_left(&self, other: &Self) -> bool {
        cmp_bounds(self.upper, other.lower, false, true, self.upper_inc, other.lower_inc)
            == Ordering::Less
    }

    fn is_over_or_left(&self, other: &Self) -> bool {
        cmp_bounds(self.upper, other.upper, false, false, self.upper_inc, other.upper_inc)
            != Ordering::Greater
    }

    fn is_over_or_right(&self, other: &Self) -> bool {
        cmp_bounds(self.lower, other.lower, true, true, self.lower_inc, other.lower_inc)
            != Ordering::Less
    }

    fn is_right(&self, other: &Self) -> bool {
        other.is_left(self)
    }

    fn is_adjacent(&self, other: &Self) -> bool {
        // Touching bounds with exactly one inclusive side form a gap-free
        // boundary.
        (self.upper == other.lower && self.upper_inc != other.lower_inc)
            || (other.upper == self.lower && other.upper_inc != self.lower_inc)
    }
}

impl<T: SpanElement> Eq for Span<T> {}

impl<T: SpanElement> PartialOrd for Span<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp_spans(other))
    }
}

impl<T: SpanElement> Ord for Span<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_spans(other)
    }
}

impl<T: SpanElement> Hash for Span<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lower.hash_bound(state);
        self.upper.hash_bound(state);
        state.write_u8(self.lower_inc as u8);
        state.write_u8(self.upper_inc as u8);
    }
}

impl<T: SpanElement> fmt::Display for Span<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}, {}{}",
            if self.lower_inc { '[' } else { '(' },
            self.lower.format_bound(),
            self.upper.format_bound(),
            if self.upper_inc { ']' } else { ')' },
        )
    }
}

impl<T: SpanElement> FromStr for Span<T> {
    type Err = ParseError;

    /// Parses the `[lower, upper)` text form.
    ///
    /// ## Example
    /// ```
    /// # use tempus::FloatSpan;
    /// # use std::str::FromStr;
    /// let span = FloatSpan::from_str("[23.9, 78.8]").unwrap();
    /// assert!(span.is_lower_inclusive());
    ///
    /// let span = FloatSpan::from_str("(23.9, 78.8]").unwrap();
    /// assert!(!span.is_lower_inclusive());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let lower_inc = match chars.next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(ParseError::new("span", format!("missing opening bound in {s:?}"))),
        };
        let upper_inc = match s.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(ParseError::new("span", format!("missing closing bound in {s:?}"))),
        };
        let inner = &s[1..s.len() - 1];
        let parts = crate::utils::split_top_level(inner, ',');
        if parts.len() != 2 {
            return Err(ParseError::new("span", format!("expected two bounds in {s:?}")));
        }
        let lower = T::parse_bound(parts[0])?;
        let upper = T::parse_bound(parts[1])?;
        Span::new(lower, upper, lower_inc, upper_inc)
            .map_err(|e| ParseError::new("span", e.to_string()))
    }
}

impl<T: SpanElement> From<Range<T>> for Span<T> {
    fn from(Range { start, end }: Range<T>) -> Self {
        Span::new(start, end, true, false).expect("range bounds form a valid span")
    }
}

impl<T: SpanElement> From<RangeInclusive<T>> for Span<T> {
    fn from(range: RangeInclusive<T>) -> Self {
        Span::new(*range.start(), *range.end(), true, true)
            .expect("range bounds form a valid span")
    }
}

impl<T: SpanElement> BitAnd for Span<T> {
    type Output = Option<Span<T>>;

    /// Intersection of two spans.
    ///
    /// ## Example
    /// ```
    /// # use tempus::FloatSpan;
    /// let a = FloatSpan::from(1.0..10.0);
    /// let b = FloatSpan::from(5.0..20.0);
    /// assert_eq!((a & b).unwrap(), FloatSpan::from(5.0..10.0));
    /// ```
    fn bitand(self, other: Self) -> Self::Output {
        self.intersection(&other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(s: &str) -> Span<f64> {
        s.parse().unwrap()
    }

    #[test]
    fn constructor_rejects_degenerate_spans() {
        assert!(Span::new(2.0, 1.0, true, true).is_err());
        assert!(Span::new(1.0, 1.0, true, false).is_err());
        assert!(Span::new(1.0, 1.0, true, true).is_ok());
    }

    #[test]
    fn int_spans_canonicalize() {
        let a: Span<i32> = Span::new(1, 3, true, true).unwrap();
        let b: Span<i32> = Span::new(1, 4, true, false).unwrap();
        assert_eq!(a, b);
        assert!(a.contains(&3));
        assert!(!a.contains(&4));
    }

    #[test]
    fn bound_aware_comparison() {
        assert!(span("(1, 2]") > span("[1, 2]"));
        assert!(span("[1, 2)") < span("[1, 2]"));
        assert_eq!(span("[1, 2)").cmp_spans(&span("[1, 2)")), Ordering::Equal);
    }

    #[test]
    fn overlap_respects_inclusivity() {
        assert!(span("[1, 2]").overlaps(&span("[2, 3]")));
        assert!(!span("[1, 2)").overlaps(&span("[2, 3]")));
        assert!(!span("[1, 2]").overlaps(&span("(2, 3]")));
    }

    #[test]
    fn adjacency() {
        assert!(span("[1, 2)").is_adjacent(&span("[2, 3]")));
        assert!(!span("[1, 2]").is_adjacent(&span("[2, 3]")));
        assert!(!span("[1, 2)").is_adjacent(&span("(2, 3]")));
    }

    #[test]
    fn minus_splits_around_overlap() {
        let rest = span("[1, 10]").minus(&span("[4, 6]"));
        assert_eq!(rest, vec![span("[1, 4)"), span("(6, 10]")]);
        assert_eq!(span("[4, 6]").minus(&span("[1, 10]")), vec![]);
    }

    #[test]
    fn normalize_merges_adjacent_and_overlapping() {
        let merged = Span::normalize(vec![span("[5, 7]"), span("[1, 2)"), span("[2, 3]"), span("[6, 9)")]);
        assert_eq!(merged, vec![span("[1, 3]"), span("[5, 9)")]);
    }

    #[test]
    fn text_and_wire_round_trip() {
        for text in ["[1, 2]", "(1.5, 2.25]", "[-3, 4)"] {
            let s = span(text);
            assert_eq!(span(&s.to_string()), s);
            assert_eq!(Span::<f64>::from_wkb(&s.as_wkb()).unwrap(), s);
        }
    }
}
