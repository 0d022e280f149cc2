use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::collections::base::collection::Collection;
use crate::collections::base::span::Span;
use crate::collections::base::span_set::SpanSet;
use crate::errors::{Error, ParseError};
use crate::utils::{format_timestamp, parse_timestamp, split_top_level};
use crate::wire::{WireReader, WireWriter};

/// A period: the time span with explicit bound inclusivity.
///
/// ## Example
/// ```
/// # use tempus::TsTzSpan;
/// # use std::str::FromStr;
/// let span = TsTzSpan::from_str("[2019-09-08, 2019-09-10)").unwrap();
/// assert!(span.is_lower_inclusive());
/// assert_eq!(span.duration(), chrono::TimeDelta::days(2));
/// ```
pub type TsTzSpan = Span<DateTime<Utc>>;

/// A period set: ordered, disjoint periods.
pub type TsTzSpanSet = SpanSet<DateTime<Utc>>;

impl TsTzSpan {
    /// The length of the span as a duration.
    pub fn duration(&self) -> TimeDelta {
        self.width()
    }
}

impl TsTzSpanSet {
    /// Total duration of the composing periods (`true`) or of the
    /// covering period (`false`).
    pub fn duration(&self, ignore_gaps: bool) -> TimeDelta {
        if ignore_gaps {
            self.to_span().map(|s| s.duration()).unwrap_or_else(TimeDelta::zero)
        } else {
            self.width()
        }
    }
}

/// An ordered set of distinct timestamps.
///
/// ## Example
/// ```
/// # use tempus::TsTzSet;
/// # use std::str::FromStr;
/// let set = TsTzSet::from_str("{2019-09-08, 2019-09-10}").unwrap();
/// assert_eq!(set.num_timestamps(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsTzSet {
    times: Vec<DateTime<Utc>>,
}

impl TsTzSet {
    /// Builds a timestamp set from arbitrary timestamps, sorting and
    /// deduplicating them.
    ///
    /// ## Errors
    /// `ShapeViolation` on empty input.
    pub fn new(mut times: Vec<DateTime<Utc>>) -> Result<Self, Error> {
        if times.is_empty() {
            return Err(Error::ShapeViolation("timestamp set must have at least one element".into()));
        }
        times.sort();
        times.dedup();
        Ok(Self { times })
    }

    pub fn num_timestamps(&self) -> usize {
        self.times.len()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn timestamp_n(&self, n: usize) -> Option<DateTime<Utc>> {
        self.times.get(n).copied()
    }

    pub fn start_timestamp(&self) -> DateTime<Utc> {
        self.times[0]
    }

    pub fn end_timestamp(&self) -> DateTime<Utc> {
        self.times[self.times.len() - 1]
    }

    /// Smallest period covering the set.
    pub fn to_span(&self) -> TsTzSpan {
        TsTzSpan::new(self.start_timestamp(), self.end_timestamp(), true, true)
            .expect("sorted timestamps form a valid span")
    }

    /// Index of the greatest timestamp `<= t`, or `None` when all are
    /// greater.
    pub(crate) fn find_timestamp(&self, t: DateTime<Utc>) -> Option<usize> {
        match self.times.binary_search(&t) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut times = self.times.clone();
        times.extend(other.times.iter().copied());
        Self::new(times).expect("union of non-empty sets is non-empty")
    }

    pub fn shift(&self, delta: TimeDelta) -> Self {
        Self { times: self.times.iter().map(|t| *t + delta).collect() }
    }

    pub fn as_wkb(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        w.u32(self.times.len() as u32);
        for t in &self.times {
            w.timestamp(t);
        }
        w.finish()
    }

    pub fn from_wkb(buf: &[u8]) -> Result<Self, Error> {
        let mut r = WireReader::new(buf);
        let count = r.u32()? as usize;
        let mut times = Vec::with_capacity(count);
        for _ in 0..count {
            times.push(r.timestamp()?);
        }
        Self::new(times)
    }
}

impl Collection for TsTzSet {
    type Type = DateTime<Utc>;

    fn is_contained_in(&self, container: &Self) -> bool {
        self.times.iter().all(|t| container.contains(t))
    }

    fn contains(&self, content: &DateTime<Utc>) -> bool {
        self.times.binary_search(content).is_ok()
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.times.iter().any(|t| other.contains(t))
    }

    fn is_left(&self, other: &Self) -> bool {
        self.end_timestamp() < other.start_timestamp()
    }

    fn is_over_or_left(&self, other: &Self) -> bool {
        self.end_timestamp() <= other.end_timestamp()
    }

    fn is_over_or_right(&self, other: &Self) -> bool {
        self.start_timestamp() >= other.start_timestamp()
    }

    fn is_right(&self, other: &Self) -> bool {
        other.is_left(self)
    }

    fn is_adjacent(&self, _other: &Self) -> bool {
        false
    }
}

impl PartialOrd for TsTzSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TsTzSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.times.cmp(&other.times)
    }
}

impl Hash for TsTzSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.times.len());
        for t in &self.times {
            state.write_i64(crate::utils::to_micros(t));
        }
    }
}

impl fmt::Display for TsTzSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, t) in self.times.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", format_timestamp(t))?;
        }
        write!(f, "}}")
    }
}

impl FromStr for TsTzSet {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let inner = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| ParseError::new("timestamp set", format!("missing braces in {s:?}")))?;
        let mut times = Vec::new();
        for part in split_top_level(inner, ',') {
            times.push(parse_timestamp(part)?);
        }
        Self::new(times).map_err(|e| ParseError::new("timestamp set", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_orders_and_dedups() {
        let b = parse_timestamp("2000-01-02").unwrap();
        let a = parse_timestamp("2000-01-01").unwrap();
        let set = TsTzSet::new(vec![b, a, b]).unwrap();
        assert_eq!(set.num_timestamps(), 2);
        assert_eq!(set.start_timestamp(), a);
    }

    #[test]
    fn span_set_duration() {
        let set: TsTzSpanSet =
            "{[2000-01-01, 2000-01-02), [2000-01-03, 2000-01-04)}".parse().unwrap();
        assert_eq!(set.duration(false), TimeDelta::days(2));
        assert_eq!(set.duration(true), TimeDelta::days(3));
    }

    #[test]
    fn find_timestamp_is_a_floor_search() {
        let set: TsTzSet = "{2000-01-01, 2000-01-03}".parse().unwrap();
        let t = parse_timestamp("2000-01-02").unwrap();
        assert_eq!(set.find_timestamp(t), Some(0));
        assert_eq!(set.find_timestamp(parse_timestamp("1999-01-01").unwrap()), None);
    }
}
