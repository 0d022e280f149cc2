use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};

use crate::collections::base::collection::Collection;
use crate::collections::datetime::TsTzSpan;
use crate::collections::number::FloatSpan;

/// Bounding box of a temporal number: an optional value span and an
/// optional time period. Restriction and overlap tests consult it before
/// touching the composing instants.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TBox {
    span: Option<FloatSpan>,
    period: Option<TsTzSpan>,
}

impl TBox {
    pub fn new(span: Option<FloatSpan>, period: Option<TsTzSpan>) -> Self {
        Self { span, period }
    }

    pub fn from_value(value: f64) -> Self {
        Self { span: Some(FloatSpan::instant(value)), period: None }
    }

    pub fn from_time(t: DateTime<Utc>) -> Self {
        Self { span: None, period: Some(TsTzSpan::instant(t)) }
    }

    pub fn from_value_and_time(value: f64, t: DateTime<Utc>) -> Self {
        Self { span: Some(FloatSpan::instant(value)), period: Some(TsTzSpan::instant(t)) }
    }

    pub fn has_value(&self) -> bool {
        self.span.is_some()
    }

    pub fn has_time(&self) -> bool {
        self.period.is_some()
    }

    pub fn xmin(&self) -> Option<f64> {
        self.span.as_ref().map(|s| s.lower())
    }

    pub fn xmax(&self) -> Option<f64> {
        self.span.as_ref().map(|s| s.upper())
    }

    pub fn tmin(&self) -> Option<DateTime<Utc>> {
        self.period.as_ref().map(|p| p.lower())
    }

    pub fn tmax(&self) -> Option<DateTime<Utc>> {
        self.period.as_ref().map(|p| p.upper())
    }

    /// Projection on the value dimension.
    pub fn to_floatspan(&self) -> Option<FloatSpan> {
        self.span.clone()
    }

    /// Projection on the time dimension.
    pub fn to_tstzspan(&self) -> Option<TsTzSpan> {
        self.period.clone()
    }

    pub(crate) fn set_period(&mut self, period: TsTzSpan) {
        self.period = Some(period);
    }

    /// Widens `self` so it also covers `other`.
    pub fn expand(&mut self, other: &TBox) {
        self.span = match (self.span.take(), other.span.clone()) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            (a, b) => a.or(b),
        };
        self.period = match (self.period.take(), other.period.clone()) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            (a, b) => a.or(b),
        };
    }

    /// Overlap on the dimensions both boxes have.
    pub fn overlaps(&self, other: &TBox) -> bool {
        if let (Some(a), Some(b)) = (&self.span, &other.span) {
            if !a.overlaps(b) {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (&self.period, &other.period) {
            if !a.overlaps(b) {
                return false;
            }
        }
        true
    }

    pub fn contains(&self, other: &TBox) -> bool {
        if let (Some(a), Some(b)) = (&self.span, &other.span) {
            if !b.is_contained_in(a) {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (&self.period, &other.period) {
            if !b.is_contained_in(a) {
                return false;
            }
        }
        true
    }
}

impl Hash for TBox {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.span.hash(state);
        self.period.hash(state);
    }
}

impl fmt::Display for TBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.span, &self.period) {
            (Some(s), Some(p)) => write!(f, "TBox XT({s}, {p})"),
            (Some(s), None) => write!(f, "TBox X({s})"),
            (None, Some(p)) => write!(f, "TBox T({p})"),
            (None, None) => write!(f, "TBox()"),
        }
    }
}

impl From<FloatSpan> for TBox {
    fn from(span: FloatSpan) -> Self {
        Self { span: Some(span), period: None }
    }
}

impl From<TsTzSpan> for TBox {
    fn from(period: TsTzSpan) -> Self {
        Self { span: None, period: Some(period) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_timestamp;

    #[test]
    fn expand_grows_both_dimensions() {
        let mut a = TBox::from_value_and_time(1.0, parse_timestamp("2000-01-01").unwrap());
        let b = TBox::from_value_and_time(5.0, parse_timestamp("2000-01-03").unwrap());
        a.expand(&b);
        assert_eq!(a.xmin(), Some(1.0));
        assert_eq!(a.xmax(), Some(5.0));
        assert_eq!(a.tmax(), Some(parse_timestamp("2000-01-03").unwrap()));
    }

    #[test]
    fn overlap_ignores_missing_dimensions() {
        let value_only = TBox::from(FloatSpan::from(1.0..2.0));
        let time_only = TBox::from_time(parse_timestamp("2000-01-01").unwrap());
        assert!(value_only.overlaps(&time_only));
    }
}
