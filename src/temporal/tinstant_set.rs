use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::base::{BaseType, TemporalBbox};
use crate::collections::base::collection::Collection;
use crate::collections::datetime::{TsTzSet, TsTzSpan, TsTzSpanSet};
use crate::errors::{Error, ParseError};
use crate::temporal::tinstant::TInstant;
use crate::utils::split_top_level;
use crate::wire::{WireReader, WireWriter};

/// A finite set of instants with strictly increasing timestamps; the value
/// is defined only at those timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct TInstantSet<T: BaseType> {
    instants: Vec<TInstant<T>>,
    bbox: T::Bbox,
}

impl<T: BaseType> TInstantSet<T> {
    /// Builds an instant set from instants in strictly increasing
    /// timestamp order.
    ///
    /// ## Errors
    /// `ShapeViolation` on empty input or non-increasing timestamps.
    pub fn new(instants: Vec<TInstant<T>>) -> Result<Self, Error> {
        if instants.is_empty() {
            return Err(Error::ShapeViolation("instant set must have at least one instant".into()));
        }
        for pair in instants.windows(2) {
            if pair[0].timestamp() >= pair[1].timestamp() {
                return Err(Error::ShapeViolation(format!(
                    "instants out of order at {}",
                    pair[1]
                )));
            }
            pair[0].value().ensure_compatible(pair[1].value())?;
        }
        let bbox = Self::compute_bbox(&instants);
        Ok(Self { instants, bbox })
    }

    /// Builds an instant set from arbitrary instants, sorting them and
    /// merging duplicate timestamps.
    ///
    /// ## Errors
    /// `ShapeViolation` when two instants share a timestamp with
    /// different values.
    pub fn from_merge(mut instants: Vec<TInstant<T>>) -> Result<Self, Error> {
        instants.sort_by_key(|i| i.timestamp());
        let mut merged: Vec<TInstant<T>> = Vec::with_capacity(instants.len());
        for inst in instants {
            match merged.last() {
                Some(last) if last.timestamp() == inst.timestamp() => {
                    if last.value() != inst.value() {
                        return Err(Error::ShapeViolation(format!(
                            "conflicting values at {}",
                            crate::utils::format_timestamp(&inst.timestamp())
                        )));
                    }
                }
                _ => merged.push(inst),
            }
        }
        Self::new(merged)
    }

    pub fn from_instant(instant: TInstant<T>) -> Self {
        let bbox = instant.bounding_box();
        Self { instants: vec![instant], bbox }
    }

    /// A constant instant set: `value` at every timestamp of `set`.
    pub fn from_base_tstzset(value: T, set: &TsTzSet) -> Self {
        let instants: Vec<TInstant<T>> = set
            .timestamps()
            .iter()
            .map(|t| TInstant::new(value.clone(), *t))
            .collect();
        let bbox = Self::compute_bbox(&instants);
        Self { instants, bbox }
    }

    fn compute_bbox(instants: &[TInstant<T>]) -> T::Bbox {
        let mut bbox = instants[0].bounding_box();
        for inst in &instants[1..] {
            bbox.expand_value(inst.value(), inst.timestamp());
        }
        bbox
    }

    pub(crate) fn from_validated(instants: Vec<TInstant<T>>) -> Self {
        let bbox = Self::compute_bbox(&instants);
        Self { instants, bbox }
    }

    // ------------------------- Accessors -------------------------------

    pub fn bounding_box(&self) -> &T::Bbox {
        &self.bbox
    }

    pub fn num_instants(&self) -> usize {
        self.instants.len()
    }

    pub fn instants(&self) -> &[TInstant<T>] {
        &self.instants
    }

    pub fn instant_n(&self, n: usize) -> Option<&TInstant<T>> {
        self.instants.get(n)
    }

    pub fn start_instant(&self) -> &TInstant<T> {
        &self.instants[0]
    }

    pub fn end_instant(&self) -> &TInstant<T> {
        &self.instants[self.instants.len() - 1]
    }

    pub fn values(&self) -> Vec<T> {
        self.instants.iter().map(|i| i.value().clone()).collect()
    }

    pub fn start_value(&self) -> &T {
        self.instants[0].value()
    }

    pub fn end_value(&self) -> &T {
        self.instants[self.instants.len() - 1].value()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.instants.iter().map(|i| i.timestamp()).collect()
    }

    pub fn start_timestamp(&self) -> DateTime<Utc> {
        self.instants[0].timestamp()
    }

    pub fn end_timestamp(&self) -> DateTime<Utc> {
        self.instants[self.instants.len() - 1].timestamp()
    }

    /// Smallest period covering the set.
    pub fn timespan(&self) -> TsTzSpan {
        TsTzSpan::new(self.start_timestamp(), self.end_timestamp(), true, true)
            .expect("ordered instants form a valid period")
    }

    /// The set of periods on which the value is defined: one singleton
    /// period per instant.
    pub fn time(&self) -> TsTzSpanSet {
        TsTzSpanSet::from_spans(
            self.instants.iter().map(|i| TsTzSpan::instant(i.timestamp())).collect(),
        )
    }

    pub fn as_tstzset(&self) -> TsTzSet {
        TsTzSet::new(self.timestamps()).expect("instant sets are never empty")
    }

    pub fn value_at_timestamp(&self, t: DateTime<Utc>) -> Option<T> {
        self.instants
            .binary_search_by_key(&t, |i| i.timestamp())
            .ok()
            .map(|n| self.instants[n].value().clone())
    }

    pub fn shift_time(&self, delta: TimeDelta) -> Self {
        let instants: Vec<_> = self.instants.iter().map(|i| i.shift_time(delta)).collect();
        Self::from_validated(instants)
    }

    // ------------------------- Restrictions ----------------------------

    fn filter(&self, keep: impl Fn(&TInstant<T>) -> bool) -> Option<Self> {
        let kept: Vec<TInstant<T>> =
            self.instants.iter().filter(|i| keep(i)).cloned().collect();
        if kept.is_empty() {
            None
        } else {
            Some(Self::from_validated(kept))
        }
    }

    pub fn at_value(&self, value: &T) -> Option<Self> {
        self.filter(|i| i.value() == value)
    }

    pub fn minus_value(&self, value: &T) -> Option<Self> {
        self.filter(|i| i.value() != value)
    }

    pub fn at_values(&self, values: &[T]) -> Option<Self> {
        self.filter(|i| values.iter().any(|v| v == i.value()))
    }

    pub fn minus_values(&self, values: &[T]) -> Option<Self> {
        self.filter(|i| values.iter().all(|v| v != i.value()))
    }

    pub fn at_timestamp(&self, t: DateTime<Utc>) -> Option<TInstant<T>> {
        self.instants
            .binary_search_by_key(&t, |i| i.timestamp())
            .ok()
            .map(|n| self.instants[n].clone())
    }

    pub fn minus_timestamp(&self, t: DateTime<Utc>) -> Option<Self> {
        self.filter(|i| i.timestamp() != t)
    }

    pub fn at_tstzset(&self, set: &TsTzSet) -> Option<Self> {
        self.filter(|i| set.contains(&i.timestamp()))
    }

    pub fn minus_tstzset(&self, set: &TsTzSet) -> Option<Self> {
        self.filter(|i| !set.contains(&i.timestamp()))
    }

    pub fn at_tstzspan(&self, span: &TsTzSpan) -> Option<Self> {
        self.filter(|i| span.contains(&i.timestamp()))
    }

    pub fn minus_tstzspan(&self, span: &TsTzSpan) -> Option<Self> {
        self.filter(|i| !span.contains(&i.timestamp()))
    }

    pub fn at_tstzspanset(&self, spans: &TsTzSpanSet) -> Option<Self> {
        self.filter(|i| spans.contains(&i.timestamp()))
    }

    pub fn minus_tstzspanset(&self, spans: &TsTzSpanSet) -> Option<Self> {
        self.filter(|i| !spans.contains(&i.timestamp()))
    }

    // ------------------------- Input / output --------------------------

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
        w.u32(self.instants.len() as u32);
        for inst in &self.instants {
            inst.write_wire(w);
        }
    }

    pub(crate) fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        let count = r.u32()? as usize;
        let mut instants = Vec::with_capacity(count);
        for _ in 0..count {
            instants.push(TInstant::read_wire(r)?);
        }
        Self::new(instants)
    }
}

impl<T: BaseType + PartialOrd> TInstantSet<T> {
    pub fn min_value(&self) -> &T {
        self.instants
            .iter()
            .map(|i| i.value())
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .expect("instant sets are never empty")
    }

    pub fn max_value(&self) -> &T {
        self.instants
            .iter()
            .map(|i| i.value())
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .expect("instant sets are never empty")
    }
}

impl<T: BaseType> Hash for TInstantSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.instants.len());
        for inst in &self.instants {
            inst.hash(state);
        }
    }
}

impl<T: BaseType> fmt::Display for TInstantSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, inst) in self.instants.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{inst}")?;
        }
        write!(f, "}}")
    }
}

impl<T: BaseType> FromStr for TInstantSet<T> {
    type Err = ParseError;

    /// Parses the `{v1@t1, v2@t2}` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let inner = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(|| ParseError::new("instant set", format!("missing braces in {s:?}")))?;
        let mut instants = Vec::new();
        for part in split_top_level(inner, ',') {
            instants.push(part.trim().parse::<TInstant<T>>()?);
        }
        Self::new(instants).map_err(|e| ParseError::new("instant set", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iset(s: &str) -> TInstantSet<f64> {
        s.parse().unwrap()
    }

    #[test]
    fn construction_rejects_unordered_instants() {
        assert!("{1@2000-01-02, 2@2000-01-01}".parse::<TInstantSet<f64>>().is_err());
        assert!("{1@2000-01-01, 1@2000-01-01}".parse::<TInstantSet<f64>>().is_err());
    }

    #[test]
    fn merge_collapses_duplicate_timestamps() {
        let a: TInstant<f64> = "1@2000-01-01".parse().unwrap();
        let b: TInstant<f64> = "2@2000-01-02".parse().unwrap();
        let dup: TInstant<f64> = "1@2000-01-01".parse().unwrap();
        let merged = TInstantSet::from_merge(vec![b, a, dup]).unwrap();
        assert_eq!(merged.num_instants(), 2);
    }

    #[test]
    fn defined_only_at_the_instants() {
        let s = iset("{1@2000-01-01, 2@2000-01-03}");
        let on = crate::utils::parse_timestamp("2000-01-01").unwrap();
        let off = crate::utils::parse_timestamp("2000-01-02").unwrap();
        assert_eq!(s.value_at_timestamp(on), Some(1.0));
        assert_eq!(s.value_at_timestamp(off), None);
    }

    #[test]
    fn value_and_time_restrictions() {
        let s = iset("{1@2000-01-01, 2@2000-01-02, 1@2000-01-03}");
        assert_eq!(s.at_value(&1.0).unwrap().num_instants(), 2);
        assert_eq!(s.minus_value(&1.0).unwrap().num_instants(), 1);
        let span: TsTzSpan = "[2000-01-01, 2000-01-02]".parse().unwrap();
        assert_eq!(s.at_tstzspan(&span).unwrap().num_instants(), 2);
        assert_eq!(s.minus_tstzspan(&span).unwrap().num_instants(), 1);
    }

    #[test]
    fn text_round_trip() {
        let s = iset("{1@2000-01-01, 2@2000-01-02}");
        assert_eq!(iset(&s.to_string()), s);
    }
}
