use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::collections::base::collection::Collection;
use crate::collections::base::span::{Span, SpanElement};
use crate::errors::{Error, ParseError};
use crate::wire::{WireReader, WireWriter};

/// An ordered set of non-overlapping, non-adjacent spans: the minimal
/// cover of a possibly disconnected set of values. Time span sets are the
/// `PeriodSet` of the temporal model.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanSet<T: SpanElement> {
    spans: Vec<Span<T>>,
}

impl<T: SpanElement> SpanSet<T> {
    /// Builds a span set from spans that are already normalized: strictly
    /// ordered, pairwise disjoint and non-adjacent.
    ///
    /// ## Errors
    /// `ShapeViolation` when the input is empty, out of order, or not a
    /// minimal cover.
    pub fn new(spans: Vec<Span<T>>) -> Result<Self, Error> {
        if spans.is_empty() {
            return Err(Error::ShapeViolation("span set must have at least one span".into()));
        }
        for pair in spans.windows(2) {
            if !pair[0].is_left(&pair[1]) || pair[0].is_adjacent(&pair[1]) {
                return Err(Error::ShapeViolation(format!(
                    "spans {} and {} are not in normalized order",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(Self { spans })
    }

    /// Builds a span set from arbitrary spans, normalizing them first.
    /// Empty input produces an empty set.
    pub fn from_spans(spans: Vec<Span<T>>) -> Self {
        Self { spans: Span::normalize(spans) }
    }

    pub(crate) fn empty() -> Self {
        Self { spans: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn num_spans(&self) -> usize {
        self.spans.len()
    }

    pub fn spans(&self) -> &[Span<T>] {
        &self.spans
    }

    pub fn span_n(&self, n: usize) -> Option<&Span<T>> {
        self.spans.get(n)
    }

    pub fn start_span(&self) -> Option<&Span<T>> {
        self.spans.first()
    }

    pub fn end_span(&self) -> Option<&Span<T>> {
        self.spans.last()
    }

    /// Smallest single span covering the set.
    pub fn to_span(&self) -> Option<Span<T>> {
        let first = self.spans.first()?;
        let last = self.spans.last()?;
        Some(
            Span::new(
                first.lower(),
                last.upper(),
                first.is_lower_inclusive(),
                last.is_upper_inclusive(),
            )
            .expect("ordered set bounds form a valid span"),
        )
    }

    /// Sum of the widths of the composing spans.
    pub fn width(&self) -> T::Delta {
        self.spans
            .iter()
            .fold(T::zero_delta(), |acc, s| T::add_delta(acc, s.width()))
    }

    pub fn intersection_span(&self, span: &Span<T>) -> Self {
        Self { spans: self.spans.iter().filter_map(|s| s.intersection(span)).collect() }
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let mut result = Vec::new();
        let mut i = 0;
        let mut j = 0;
        while i < self.spans.len() && j < other.spans.len() {
            if let Some(inter) = self.spans[i].intersection(&other.spans[j]) {
                result.push(inter);
            }
            // Advance the side that ends first.
            if other.spans[j].is_over_or_left(&self.spans[i]) {
                j += 1;
            } else {
                i += 1;
            }
        }
        Self { spans: result }
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut spans = self.spans.clone();
        spans.extend(other.spans.iter().copied());
        Self::from_spans(spans)
    }

    pub fn minus_span(&self, span: &Span<T>) -> Self {
        Self { spans: self.spans.iter().flat_map(|s| s.minus(span)).collect() }
    }

    pub fn minus(&self, other: &Self) -> Self {
        let mut current = self.clone();
        for span in &other.spans {
            current = current.minus_span(span);
            if current.is_empty() {
                break;
            }
        }
        current
    }

    pub fn shift_scale(&self, delta: Option<T::Delta>, width: Option<T::Delta>) -> Self {
        // Scaling distributes the requested total width proportionally
        // over the composing spans; only shifting is bound-exact.
        match width {
            None => Self {
                spans: self.spans.iter().map(|s| s.shift_scale(delta, None)).collect(),
            },
            Some(w) => {
                let Some(hull) = self.to_span() else { return self.clone() };
                let old_width = T::delta_to_double(hull.width());
                let new_hull = hull.shift_scale(delta, Some(w));
                let scale = if old_width == 0.0 {
                    0.0
                } else {
                    T::delta_to_double(T::delta(new_hull.upper(), new_hull.lower())) / old_width
                };
                let spans = self
                    .spans
                    .iter()
                    .map(|s| {
                        let lo = T::delta_to_double(T::delta(s.lower(), hull.lower())) * scale;
                        let hi = T::delta_to_double(T::delta(s.upper(), hull.lower())) * scale;
                        Span::new(
                            new_hull.lower().offset(T::delta_from_double(lo)),
                            new_hull.lower().offset(T::delta_from_double(hi)),
                            s.is_lower_inclusive(),
                            s.is_upper_inclusive(),
                        )
                        .expect("scaled bounds keep their order")
                    })
                    .collect();
                Self { spans }
            }
        }
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
        w.u32(self.spans.len() as u32);
        for span in &self.spans {
            span.write_wire(w);
        }
    }

    pub(crate) fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        let count = r.u32()? as usize;
        let mut spans = Vec::with_capacity(count);
        for _ in 0..count {
            spans.push(Span::read_wire(r)?);
        }
        if spans.is_empty() {
            Ok(Self::empty())
        } else {
            Self::new(spans)
        }
    }
}

impl<T: SpanElement> Collection for SpanSet<T> {
    type Type = T;

    fn is_contained_in(&self, container: &Self) -> bool {
        self.spans
            .iter()
            .all(|s| container.spans.iter().any(|c| s.is_contained_in(c)))
    }

    fn contains(&self, content: &T) -> bool {
        // The spans are ordered, so a binary search would do; sets are
        // typically small enough that the scan wins.
        self.spans.iter().any(|s| s.contains(content))
    }

    fn overlaps(&self, other: &Self) -> bool {
        !self.intersection(other).is_empty()
    }

    fn is_left(&self, other: &Self) -> bool {
        match (self.end_span(), other.start_span()) {
            (Some(a), Some(b)) => a.is_left(b),
            _ => false,
        }
    }

    fn is_over_or_left(&self, other: &Self) -> bool {
        match (self.end_span(), other.end_span()) {
            (Some(a), Some(b)) => a.is_over_or_left(b),
            _ => false,
        }
    }

    fn is_over_or_right(&self, other: &Self) -> bool {
        match (self.start_span(), other.start_span()) {
            (Some(a), Some(b)) => a.is_over_or_right(b),
            _ => false,
        }
    }

    fn is_right(&self, other: &Self) -> bool {
        other.is_left(self)
    }

    fn is_adjacent(&self, other: &Self) -> bool {
        match (self.end_span(), other.start_span()) {
            (Some(a), Some(b)) if a.is_adjacent(b) => true,
            _ => match (other.end_span(), self.start_span()) {
                (Some(a), Some(b)) => a.is_adjacent(b),
                _ => false,
            },
        }
    }
}

impl<T: SpanElement> Eq for SpanSet<T> {}

impl<T: SpanElement> PartialOrd for SpanSet<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: SpanElement> Ord for SpanSet<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.spans.iter().zip(other.spans.iter()) {
            let c = a.cmp_spans(b);
            if c != Ordering::Equal {
                return c;
            }
        }
        self.spans.len().cmp(&other.spans.len())
    }
}

impl<T: SpanElement> Hash for SpanSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.spans.len());
        for span in &self.spans {
            span.hash(state);
        }
    }
}

impl<T: SpanElement> fmt::Display for SpanSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{span}")?;
        }
        write!(f, "}}")
    }
}

impl<T: SpanElement> FromStr for SpanSet<T> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let inner = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| ParseError::new("span set", format!("missing braces in {s:?}")))?;
        let mut spans = Vec::new();
        for part in crate::utils::split_top_level(inner, ',') {
            let part = part.trim();
            if !part.is_empty() {
                spans.push(part.parse::<Span<T>>()?);
            }
        }
        if spans.is_empty() {
            return Err(ParseError::new("span set", "no spans found".to_string()));
        }
        SpanSet::new(spans).map_err(|e| ParseError::new("span set", e.to_string()))
    }
}

impl<T: SpanElement> From<Span<T>> for SpanSet<T> {
    fn from(span: Span<T>) -> Self {
        Self { spans: vec![span] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(s: &str) -> SpanSet<f64> {
        s.parse().unwrap()
    }

    #[test]
    fn constructor_requires_normalized_input() {
        assert!(SpanSet::<f64>::new(vec!["[1, 2]".parse().unwrap(), "[2, 3]".parse().unwrap()]).is_err());
        assert!(SpanSet::<f64>::new(vec!["[1, 2)".parse().unwrap(), "(2, 3]".parse().unwrap()]).is_ok());
    }

    #[test]
    fn union_and_minus_are_inverses_on_disjoint_parts() {
        let a = set("{[1, 2), [5, 6)}");
        let b = set("{[3, 4)}");
        let union = a.union(&b);
        assert_eq!(union, set("{[1, 2), [3, 4), [5, 6)}"));
        assert_eq!(union.minus(&b), a);
    }

    #[test]
    fn intersection_walks_both_sets() {
        let a = set("{[1, 4], [6, 9]}");
        let b = set("{[3, 7]}");
        assert_eq!(a.intersection(&b), set("{[3, 4], [6, 7]}"));
    }

    #[test]
    fn text_round_trip() {
        let a = set("{[1, 2), [5, 6]}");
        assert_eq!(set(&a.to_string()), a);
    }
}
