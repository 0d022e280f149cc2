use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::base::{BaseType, TemporalBbox};
use crate::collections::base::collection::Collection;
use crate::collections::datetime::{TsTzSet, TsTzSpan, TsTzSpanSet};
use crate::errors::{Error, ParseError};
use crate::utils::{format_timestamp, parse_timestamp};
use crate::wire::{WireReader, WireWriter};

/// A base value at a single timestamp: the atomic temporal value.
#[derive(Debug, Clone, PartialEq)]
pub struct TInstant<T: BaseType> {
    value: T,
    timestamp: DateTime<Utc>,
}

impl<T: BaseType> TInstant<T> {
    pub fn new(value: T, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }

    pub fn from_value_and_timestamp(value: T, timestamp: DateTime<Utc>) -> Self {
        Self::new(value, timestamp)
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn bounding_box(&self) -> T::Bbox {
        T::Bbox::of(&self.value, self.timestamp)
    }

    /// The period covering the instant: `[t, t]`.
    pub fn timespan(&self) -> TsTzSpan {
        TsTzSpan::instant(self.timestamp)
    }

    pub fn value_at_timestamp(&self, t: DateTime<Utc>) -> Option<T> {
        (t == self.timestamp).then(|| self.value.clone())
    }

    pub fn shift_time(&self, delta: TimeDelta) -> Self {
        Self { value: self.value.clone(), timestamp: self.timestamp + delta }
    }

    pub(crate) fn with_timestamp(&self, t: DateTime<Utc>) -> Self {
        Self { value: self.value.clone(), timestamp: t }
    }

    // ------------------------- Restrictions ----------------------------

    pub fn at_value(&self, value: &T) -> Option<Self> {
        (self.value == *value).then(|| self.clone())
    }

    pub fn minus_value(&self, value: &T) -> Option<Self> {
        (self.value != *value).then(|| self.clone())
    }

    pub fn at_values(&self, values: &[T]) -> Option<Self> {
        values.iter().any(|v| *v == self.value).then(|| self.clone())
    }

    pub fn minus_values(&self, values: &[T]) -> Option<Self> {
        values.iter().all(|v| *v != self.value).then(|| self.clone())
    }

    pub fn at_timestamp(&self, t: DateTime<Utc>) -> Option<Self> {
        (t == self.timestamp).then(|| self.clone())
    }

    pub fn minus_timestamp(&self, t: DateTime<Utc>) -> Option<Self> {
        (t != self.timestamp).then(|| self.clone())
    }

    pub fn at_tstzset(&self, set: &TsTzSet) -> Option<Self> {
        set.contains(&self.timestamp).then(|| self.clone())
    }

    pub fn minus_tstzset(&self, set: &TsTzSet) -> Option<Self> {
        (!set.contains(&self.timestamp)).then(|| self.clone())
    }

    pub fn at_tstzspan(&self, span: &TsTzSpan) -> Option<Self> {
        span.contains(&self.timestamp).then(|| self.clone())
    }

    pub fn minus_tstzspan(&self, span: &TsTzSpan) -> Option<Self> {
        (!span.contains(&self.timestamp)).then(|| self.clone())
    }

    pub fn at_tstzspanset(&self, spans: &TsTzSpanSet) -> Option<Self> {
        spans.contains(&self.timestamp).then(|| self.clone())
    }

    pub fn minus_tstzspanset(&self, spans: &TsTzSpanSet) -> Option<Self> {
        (!spans.contains(&self.timestamp)).then(|| self.clone())
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
        self.value.write_wire(w);
        w.timestamp(&self.timestamp);
    }

    pub(crate) fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        let value = T::read_wire(r)?;
        let timestamp = r.timestamp()?;
        Ok(Self { value, timestamp })
    }
}

impl<T: BaseType + PartialOrd> TInstant<T> {
    pub(crate) fn cmp_values(&self, other: &Self) -> Ordering {
        self.value.partial_cmp(&other.value).unwrap_or(Ordering::Equal)
    }
}

impl<T: BaseType> Hash for TInstant<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash_value(state);
        state.write_i64(crate::utils::to_micros(&self.timestamp));
    }
}

impl<T: BaseType> fmt::Display for TInstant<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.value.format_value(), format_timestamp(&self.timestamp))
    }
}

impl<T: BaseType> FromStr for TInstant<T> {
    type Err = ParseError;

    /// Parses the `value@timestamp` form.
    ///
    /// ## Example
    /// ```
    /// # use tempus::TFloatInst;
    /// # use std::str::FromStr;
    /// let inst = TFloatInst::from_str("1.5@2000-01-01").unwrap();
    /// assert_eq!(*inst.value(), 1.5);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let at = crate::utils::split_top_level(s, '@');
        if at.len() != 2 {
            return Err(ParseError::new("temporal instant", format!("expected value@timestamp in {s:?}")));
        }
        let value = T::parse_value(at[0])?;
        let timestamp = parse_timestamp(at[1])?;
        Ok(Self { value, timestamp })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(s: &str) -> TInstant<f64> {
        s.parse().unwrap()
    }

    #[test]
    fn accessors() {
        let i = inst("2.5@2000-01-01");
        assert_eq!(*i.value(), 2.5);
        assert_eq!(i.timestamp(), parse_timestamp("2000-01-01").unwrap());
        assert!(i.timespan().contains(&i.timestamp()));
    }

    #[test]
    fn restriction_partition() {
        let i = inst("2.5@2000-01-01");
        assert!(i.at_value(&2.5).is_some());
        assert!(i.minus_value(&2.5).is_none());
        assert!(i.at_value(&3.0).is_none());
        assert!(i.minus_value(&3.0).is_some());
    }

    #[test]
    fn text_and_wire_round_trip() {
        let i = inst("2.5@2000-01-01 08:00:00+00");
        assert_eq!(inst(&i.to_string()), i);
        assert_eq!(TInstant::<f64>::from_wkb(&i.as_wkb()).unwrap(), i);
    }
}
