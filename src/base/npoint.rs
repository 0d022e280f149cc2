//! Network positions: a value on a route identified by its id, at a
//! fractional position along it. The route geometry itself lives outside
//! the core, so interpolation and crossings work on the fraction alone.

use std::fmt;
use std::hash::Hasher;

use crate::base::{impl_time_only_bbox, BaseType};
use crate::collections::datetime::TsTzSpan;
use crate::errors::{Error, ParseError};
use crate::wire::{WireReader, WireWriter};

/// A position on a route: `NPoint(route_id, fraction)` with the fraction
/// in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NPoint {
    pub route: i64,
    pub position: f64,
}

impl NPoint {
    /// ## Errors
    /// `DomainError` when the position is outside `[0, 1]`.
    pub fn new(route: i64, position: f64) -> Result<Self, Error> {
        if !(0.0..=1.0).contains(&position) {
            return Err(Error::DomainError(format!(
                "network position {position} is outside [0, 1]"
            )));
        }
        Ok(Self { route, position })
    }
}

impl fmt::Display for NPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NPoint({}, {})", self.route, self.position)
    }
}

impl BaseType for NPoint {
    type Bbox = TsTzSpan;
    const NAME: &'static str = "npoint";
    const CONTINUOUS: bool = true;

    fn hash_value<H: Hasher>(&self, state: &mut H) {
        state.write_i64(self.route);
        state.write_u64(self.position.to_bits());
    }

    fn interpolate(&self, end: &Self, ratio: f64) -> Self {
        // Movement within a segment stays on one route.
        Self { route: self.route, position: self.position.interpolate(&end.position, ratio) }
    }

    fn collinear(&self, mid: &Self, end: &Self, ratio: f64) -> bool {
        self.route == mid.route
            && mid.route == end.route
            && self.position.collinear(&mid.position, &end.position, ratio)
    }

    fn segment_crossing_value(start: &Self, end: &Self, value: &Self) -> Option<f64> {
        if start.route != value.route {
            return None;
        }
        f64::segment_crossing_value(&start.position, &end.position, &value.position)
    }

    fn segment_crossing(start1: &Self, end1: &Self, start2: &Self, end2: &Self) -> Option<f64> {
        if start1.route != start2.route {
            return None;
        }
        f64::segment_crossing(&start1.position, &end1.position, &start2.position, &end2.position)
    }

    fn ensure_compatible(&self, other: &Self) -> Result<(), Error> {
        if self.route != other.route {
            return Err(Error::TypeMismatch(format!(
                "network points on different routes: {} vs {}",
                self.route, other.route
            )));
        }
        Ok(())
    }

    fn format_value(&self) -> String {
        self.to_string()
    }

    fn parse_value(s: &str) -> Result<Self, ParseError> {
        let s = s.trim();
        let inner = s
            .strip_prefix("NPoint(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| ParseError::new("npoint", s.to_string()))?;
        let mut parts = inner.splitn(2, ',');
        let route = parts
            .next()
            .and_then(|p| p.trim().parse().ok())
            .ok_or_else(|| ParseError::new("npoint", s.to_string()))?;
        let position = parts
            .next()
            .and_then(|p| p.trim().parse().ok())
            .ok_or_else(|| ParseError::new("npoint", s.to_string()))?;
        NPoint::new(route, position).map_err(|e| ParseError::new("npoint", e.to_string()))
    }

    fn write_wire(&self, w: &mut WireWriter) {
        w.i64(self.route);
        w.f64(self.position);
    }

    fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        let route = r.i64()?;
        let position = r.f64()?;
        NPoint::new(route, position)
    }
}

impl_time_only_bbox!(NPoint);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_moves_along_the_route() {
        let a = NPoint::new(7, 0.2).unwrap();
        let b = NPoint::new(7, 0.6).unwrap();
        assert_eq!(a.interpolate(&b, 0.5), NPoint::new(7, 0.4).unwrap());
    }

    #[test]
    fn crossings_require_the_same_route() {
        let a = NPoint::new(7, 0.0).unwrap();
        let b = NPoint::new(7, 1.0).unwrap();
        let v = NPoint::new(8, 0.5).unwrap();
        assert_eq!(NPoint::segment_crossing_value(&a, &b, &v), None);
    }

    #[test]
    fn literal_round_trip() {
        let p = NPoint::new(42, 0.25).unwrap();
        assert_eq!(NPoint::parse_value(&p.format_value()).unwrap(), p);
    }
}
