//! The base-value adapter: every element type a temporal value can range
//! over implements [`BaseType`], which gives the temporal machinery a
//! uniform view of equality, hashing, interpolation, collinearity, segment
//! crossings, text and wire I/O, and the bounding-box type to maintain.

use std::fmt;
use std::hash::Hasher;

use chrono::{DateTime, Utc};

use crate::boxes::tbox::TBox;
use crate::collections::datetime::TsTzSpan;
use crate::errors::{Error, ParseError};
use crate::wire::{WireReader, WireWriter};
use crate::EPSILON;

pub mod doubles;
pub mod npoint;
#[cfg(feature = "geo")]
pub mod point;

/// Bounding box maintained for temporal values over a base type: a plain
/// period for discrete types, value range + period for numbers, a
/// spatiotemporal box for points.
pub trait TemporalBbox<T>: Clone + PartialEq + fmt::Debug {
    fn of(value: &T, t: DateTime<Utc>) -> Self;
    fn expand_value(&mut self, value: &T, t: DateTime<Utc>);
    fn expand(&mut self, other: &Self);
    /// Overwrites the time dimension with the exact period of the value,
    /// including bound inclusivity.
    fn set_period(&mut self, period: &TsTzSpan);
    fn period(&self) -> TsTzSpan;
}

/// Element type of a temporal value.
pub trait BaseType: Clone + PartialEq + fmt::Debug + Sized {
    type Bbox: TemporalBbox<Self>;

    /// Name used in diagnostics: `"int"`, `"float"`, `"geometry"`, ...
    const NAME: &'static str;

    /// Whether values admit linear interpolation between instants.
    const CONTINUOUS: bool;

    fn hash_value<H: Hasher>(&self, state: &mut H);

    /// Value at the fractional position `ratio` of the segment
    /// `self → end`. Step-only types hold their start value.
    fn interpolate(&self, end: &Self, ratio: f64) -> Self {
        let _ = (end, ratio);
        self.clone()
    }

    /// Whether `mid` lies on the segment `self → end` at fractional
    /// position `ratio`, within `EPSILON`.
    fn collinear(&self, mid: &Self, end: &Self, ratio: f64) -> bool {
        let _ = (mid, end, ratio);
        false
    }

    /// Fractional position in the open interval `(0, 1)` at which the
    /// linear segment `start → end` takes `value`, when it does.
    fn segment_crossing_value(start: &Self, end: &Self, value: &Self) -> Option<f64> {
        let _ = (start, end, value);
        None
    }

    /// Fractional position at which the synchronized linear segments
    /// `start1 → end1` and `start2 → end2` meet, when they do.
    fn segment_crossing(start1: &Self, end1: &Self, start2: &Self, end2: &Self) -> Option<f64> {
        let _ = (start1, end1, start2, end2);
        None
    }

    /// Consistency check between two values about to interact; spatial
    /// types verify SRID and dimensions here.
    fn ensure_compatible(&self, other: &Self) -> Result<(), Error> {
        let _ = other;
        Ok(())
    }

    fn format_value(&self) -> String;
    fn parse_value(s: &str) -> Result<Self, ParseError>;
    fn write_wire(&self, w: &mut WireWriter);
    fn read_wire(r: &mut WireReader) -> Result<Self, Error>;
}

/// Base types with a numeric projection: temporal numbers range over
/// these, and their bounding box carries a value span.
pub trait NumberBase: BaseType<Bbox = TBox> + PartialOrd + Copy + crate::collections::base::span::SpanElement {
    fn to_double(self) -> f64;
    fn from_double(d: f64) -> Self;
}

/// A text value. Wraps `String` to give temporal texts their quoted
/// literal form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Text(pub String);

impl Text {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! impl_time_only_bbox {
    ($base:ty) => {
        impl $crate::base::TemporalBbox<$base> for $crate::collections::datetime::TsTzSpan {
            fn of(_value: &$base, t: chrono::DateTime<chrono::Utc>) -> Self {
                $crate::collections::datetime::TsTzSpan::instant(t)
            }

            fn expand_value(&mut self, _value: &$base, t: chrono::DateTime<chrono::Utc>) {
                $crate::collections::base::span::Span::expand(
                    self,
                    &$crate::collections::datetime::TsTzSpan::instant(t),
                );
            }

            fn expand(&mut self, other: &Self) {
                $crate::collections::base::span::Span::expand(self, other);
            }

            fn set_period(&mut self, period: &$crate::collections::datetime::TsTzSpan) {
                *self = period.clone();
            }

            fn period(&self) -> $crate::collections::datetime::TsTzSpan {
                self.clone()
            }
        }
    };
}
pub(crate) use impl_time_only_bbox;

impl_time_only_bbox!(bool);
impl_time_only_bbox!(Text);

macro_rules! impl_number_bbox {
    ($base:ty) => {
        impl TemporalBbox<$base> for TBox {
            fn of(value: &$base, t: DateTime<Utc>) -> Self {
                TBox::from_value_and_time((*value) as f64, t)
            }

            fn expand_value(&mut self, value: &$base, t: DateTime<Utc>) {
                self.expand(&TBox::from_value_and_time((*value) as f64, t));
            }

            fn expand(&mut self, other: &Self) {
                TBox::expand(self, other);
            }

            fn set_period(&mut self, period: &TsTzSpan) {
                TBox::set_period(self, period.clone());
            }

            fn period(&self) -> TsTzSpan {
                self.to_tstzspan().expect("temporal numbers always carry a period")
            }
        }
    };
}

impl_number_bbox!(i32);
impl_number_bbox!(f64);

impl BaseType for bool {
    type Bbox = TsTzSpan;
    const NAME: &'static str = "bool";
    const CONTINUOUS: bool = false;

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        state.write_u8(*self as u8);
    }

    fn format_value(&self) -> String {
        if *self { "t".into() } else { "f".into() }
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "t" | "true" => Ok(true),
            "f" | "false" => Ok(false),
            other => Err(ParseError::new("bool", other.to_string())),
        }
    }

    fn write_wire(&self, w: &mut WireWriter) {
        w.bool(*self);
    }

    fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        r.bool()
    }
}

impl BaseType for i32 {
    type Bbox = TBox;
    const NAME: &'static str = "int";
    const CONTINUOUS: bool = false;

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        state.write_i32(*self);
    }

    fn format_value(&self) -> String {
        self.to_string()
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        s.trim().parse().map_err(|_| ParseError::new("int", s.to_string()))
    }

    fn write_wire(&self, w: &mut WireWriter) {
        w.i32(*self);
    }

    fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        r.i32()
    }
}

impl NumberBase for i32 {
    fn to_double(self) -> f64 {
        self as f64
    }

    fn from_double(d: f64) -> Self {
        d.round() as i32
    }
}

impl BaseType for f64 {
    type Bbox = TBox;
    const NAME: &'static str = "float";
    const CONTINUOUS: bool = true;

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.to_bits());
    }

    fn interpolate(&self, end: &Self, ratio: f64) -> Self {
        self + (end - self) * ratio
    }

    fn collinear(&self, mid: &Self, end: &Self, ratio: f64) -> bool {
        let interpolated = self + (end - self) * ratio;
        (mid - interpolated).abs() <= EPSILON
    }

    fn segment_crossing_value(start: &Self, end: &Self, value: &Self) -> Option<f64> {
        let min = start.min(*end);
        let max = start.max(*end);
        if *value < min || *value > max {
            return None;
        }
        let range = max - min;
        if range == 0.0 {
            return None;
        }
        let partial = value - min;
        let fraction = if start < end { partial / range } else { 1.0 - partial / range };
        if fraction < -EPSILON || fraction > 1.0 + EPSILON {
            return None;
        }
        Some(fraction)
    }

    fn segment_crossing(start1: &Self, end1: &Self, start2: &Self, end2: &Self) -> Option<f64> {
        // The segments are synchronized; equating the two linear functions
        // over [0, 1] gives the fraction directly.
        let denom = end1 - start1 - end2 + start2;
        if denom == 0.0 {
            // Parallel segments.
            return None;
        }
        let fraction = (start2 - start1) / denom;
        if fraction < -EPSILON || fraction > 1.0 + EPSILON {
            return None;
        }
        Some(fraction)
    }

    fn format_value(&self) -> String {
        self.to_string()
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        s.trim().parse().map_err(|_| ParseError::new("float", s.to_string()))
    }

    fn write_wire(&self, w: &mut WireWriter) {
        w.f64(*self);
    }

    fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        r.f64()
    }
}

impl NumberBase for f64 {
    fn to_double(self) -> f64 {
        self
    }

    fn from_double(d: f64) -> Self {
        d
    }
}

impl BaseType for Text {
    type Bbox = TsTzSpan;
    const NAME: &'static str = "text";
    const CONTINUOUS: bool = false;

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        state.write(self.0.as_bytes());
        state.write_u8(0xff);
    }

    fn format_value(&self) -> String {
        format!("\"{}\"", self.0)
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        let s = s.trim();
        let inner = s
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(s);
        Ok(Text(inner.to_string()))
    }

    fn write_wire(&self, w: &mut WireWriter) {
        w.bytes(self.0.as_bytes());
    }

    fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        let bytes = r.bytes()?;
        String::from_utf8(bytes)
            .map(Text)
            .map_err(|e| Error::ShapeViolation(format!("text payload is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_crossing_value_fraction() {
        // Segment 1 → 5, value 2 is reached a quarter in.
        assert_eq!(f64::segment_crossing_value(&1.0, &5.0, &2.0), Some(0.25));
        // Decreasing segment mirrors the fraction.
        assert_eq!(f64::segment_crossing_value(&5.0, &1.0, &2.0), Some(0.75));
        assert_eq!(f64::segment_crossing_value(&1.0, &5.0, &7.0), None);
    }

    #[test]
    fn float_segment_crossing() {
        // 1 → 3 and 3 → 1 meet halfway.
        assert_eq!(f64::segment_crossing(&1.0, &3.0, &3.0, &1.0), Some(0.5));
        // Parallel segments never meet.
        assert_eq!(f64::segment_crossing(&1.0, &3.0, &2.0, &4.0), None);
    }

    #[test]
    fn float_collinearity_has_tolerance() {
        assert!(1.0.collinear(&2.0, &3.0, 0.5));
        assert!(!1.0.collinear(&2.5, &3.0, 0.5));
    }

    #[test]
    fn text_literals_are_quoted() {
        let t = Text::from("a, b");
        assert_eq!(t.format_value(), "\"a, b\"");
        assert_eq!(Text::parse_value("\"a, b\"").unwrap(), t);
    }
}
