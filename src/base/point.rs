//! Point base types for temporal geometries and geographies. Only points
//! are temporal base values; lines and polygons appear in the API solely
//! as trajectory outputs.

use std::fmt;
use std::hash::Hasher;

use geo::{Distance, Euclidean, Haversine, InterpolatePoint, Point};

use crate::base::BaseType;
use crate::boxes::stbox::STBox;
use crate::collections::datetime::TsTzSpan;
use crate::errors::{Error, ParseError};
use crate::wire::{WireReader, WireWriter};
use crate::EPSILON;

pub(crate) const DEFAULT_GEOG_SRID: i32 = 4326;

macro_rules! point_base {
    ($name:ident, $label:literal, $geodetic:literal, $default_srid:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name {
            pub x: f64,
            pub y: f64,
            pub z: Option<f64>,
            pub srid: i32,
        }

        impl $name {
            pub fn new(x: f64, y: f64) -> Self {
                Self { x, y, z: None, srid: $default_srid }
            }

            pub fn new_z(x: f64, y: f64, z: f64) -> Self {
                Self { x, y, z: Some(z), srid: $default_srid }
            }

            pub fn with_srid(mut self, srid: i32) -> Self {
                self.srid = srid;
                self
            }

            pub fn has_z(&self) -> bool {
                self.z.is_some()
            }

            pub(crate) fn xy(&self) -> Point<f64> {
                Point::new(self.x, self.y)
            }

            /// Planar or geodetic distance to `other`, in the unit of the
            /// SRID (meters for geographies).
            pub fn distance(&self, other: &Self) -> f64 {
                if $geodetic {
                    Haversine.distance(self.xy(), other.xy())
                } else {
                    match (self.z, other.z) {
                        (Some(z1), Some(z2)) => {
                            let dx = self.x - other.x;
                            let dy = self.y - other.y;
                            let dz = z1 - z2;
                            (dx * dx + dy * dy + dz * dz).sqrt()
                        }
                        _ => Euclidean.distance(self.xy(), other.xy()),
                    }
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.srid != 0 && self.srid != $default_srid {
                    write!(f, "SRID={};", self.srid)?;
                }
                match self.z {
                    Some(z) => write!(f, "POINT Z ({} {} {})", self.x, self.y, z),
                    None => write!(f, "POINT({} {})", self.x, self.y),
                }
            }
        }

        impl BaseType for $name {
            type Bbox = STBox;
            const NAME: &'static str = $label;
            const CONTINUOUS: bool = true;

            fn hash_value<H: Hasher>(&self, state: &mut H) {
                state.write_u64(self.x.to_bits());
                state.write_u64(self.y.to_bits());
                if let Some(z) = self.z {
                    state.write_u64(z.to_bits());
                }
                state.write_i32(self.srid);
            }

            fn interpolate(&self, end: &Self, ratio: f64) -> Self {
                let (x, y) = if $geodetic {
                    // Great-circle interpolation between the endpoints.
                    let p = Haversine.point_at_ratio_between(self.xy(), end.xy(), ratio);
                    (p.x(), p.y())
                } else {
                    (
                        self.x + (end.x - self.x) * ratio,
                        self.y + (end.y - self.y) * ratio,
                    )
                };
                let z = match (self.z, end.z) {
                    (Some(z1), Some(z2)) => Some(z1 + (z2 - z1) * ratio),
                    _ => None,
                };
                Self { x, y, z, srid: self.srid }
            }

            fn collinear(&self, mid: &Self, end: &Self, ratio: f64) -> bool {
                let on_segment = self.interpolate(end, ratio);
                mid.distance(&on_segment) <= EPSILON
            }

            fn segment_crossing_value(start: &Self, end: &Self, value: &Self) -> Option<f64> {
                // Fractional position of the closest point of the segment,
                // accepted when the value actually lies on it.
                let dx = end.x - start.x;
                let dy = end.y - start.y;
                let dz = match (start.z, end.z) {
                    (Some(z1), Some(z2)) => z2 - z1,
                    _ => 0.0,
                };
                let len2 = dx * dx + dy * dy + dz * dz;
                if len2 == 0.0 {
                    return None;
                }
                let vz = match (value.z, start.z) {
                    (Some(vz), Some(z1)) => (vz - z1) * dz,
                    _ => 0.0,
                };
                let fraction =
                    ((value.x - start.x) * dx + (value.y - start.y) * dy + vz) / len2;
                if fraction < -EPSILON || fraction > 1.0 + EPSILON {
                    return None;
                }
                let projected = start.interpolate(end, fraction.clamp(0.0, 1.0));
                if projected.distance(value) > EPSILON {
                    return None;
                }
                Some(fraction)
            }

            fn segment_crossing(start1: &Self, end1: &Self, start2: &Self, end2: &Self) -> Option<f64> {
                // Both segments are synchronized: each coordinate moves
                // linearly over [0, 1], so equate them axis by axis and
                // check the solutions agree.
                let mut fraction: Option<f64> = None;
                let axes = [
                    (start1.x, end1.x, start2.x, end2.x),
                    (start1.y, end1.y, start2.y, end2.y),
                ];
                let z_axis = match (start1.z, end1.z, start2.z, end2.z) {
                    (Some(a), Some(b), Some(c), Some(d)) => Some((a, b, c, d)),
                    _ => None,
                };
                for &(s1, e1, s2, e2) in axes.iter().chain(z_axis.iter()) {
                    let denom = e1 - s1 - e2 + s2;
                    if denom == 0.0 {
                        // Parallel motion on this axis: no constraint when
                        // the positions coincide, otherwise no crossing.
                        if (s2 - s1).abs() > EPSILON {
                            return None;
                        }
                        continue;
                    }
                    let f = (s2 - s1) / denom;
                    match fraction {
                        None => fraction = Some(f),
                        Some(prev) if (prev - f).abs() > EPSILON => return None,
                        Some(_) => {}
                    }
                }
                let fraction = fraction?;
                if fraction <= EPSILON || fraction >= 1.0 - EPSILON {
                    return None;
                }
                Some(fraction)
            }

            fn ensure_compatible(&self, other: &Self) -> Result<(), Error> {
                if self.srid != other.srid {
                    return Err(Error::SridOrDimensionMismatch(format!(
                        "SRID {} vs {}",
                        self.srid, other.srid
                    )));
                }
                if self.has_z() != other.has_z() {
                    return Err(Error::SridOrDimensionMismatch(
                        "mixed 2D and 3D points".into(),
                    ));
                }
                Ok(())
            }

            fn format_value(&self) -> String {
                self.to_string()
            }

            fn parse_value(s: &str) -> Result<Self, ParseError> {
                let s = s.trim();
                let (srid, rest) = match s.strip_prefix("SRID=") {
                    Some(tail) => {
                        let (num, rest) = tail
                            .split_once(';')
                            .ok_or_else(|| ParseError::new($label, s.to_string()))?;
                        let srid =
                            num.parse().map_err(|_| ParseError::new($label, s.to_string()))?;
                        (srid, rest.trim())
                    }
                    None => ($default_srid, s),
                };
                let upper = rest.to_ascii_uppercase();
                let body = upper
                    .strip_prefix("POINT")
                    .map(str::trim_start)
                    .and_then(|r| r.strip_prefix('Z').map(str::trim_start).or(Some(r)))
                    .and_then(|r| r.strip_prefix('('))
                    .and_then(|r| r.strip_suffix(')'))
                    .ok_or_else(|| ParseError::new($label, s.to_string()))?;
                let coords: Vec<f64> = body
                    .split_whitespace()
                    .map(|c| c.parse().map_err(|_| ParseError::new($label, s.to_string())))
                    .collect::<Result<_, _>>()?;
                match coords.as_slice() {
                    [x, y] => Ok(Self { x: *x, y: *y, z: None, srid }),
                    [x, y, z] => Ok(Self { x: *x, y: *y, z: Some(*z), srid }),
                    _ => Err(ParseError::new($label, s.to_string())),
                }
            }

            fn write_wire(&self, w: &mut WireWriter) {
                w.bool(self.z.is_some());
                w.i32(self.srid);
                w.f64(self.x);
                w.f64(self.y);
                if let Some(z) = self.z {
                    w.f64(z);
                }
            }

            fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
                let has_z = r.bool()?;
                let srid = r.i32()?;
                let x = r.f64()?;
                let y = r.f64()?;
                let z = if has_z { Some(r.f64()?) } else { None };
                Ok(Self { x, y, z, srid })
            }
        }

        impl crate::base::TemporalBbox<$name> for STBox {
            fn of(value: &$name, t: chrono::DateTime<chrono::Utc>) -> Self {
                let mut bbox =
                    STBox::of_point(value.x, value.y, value.z, value.srid, $geodetic);
                bbox.set_period(TsTzSpan::instant(t));
                bbox
            }

            fn expand_value(&mut self, value: &$name, t: chrono::DateTime<chrono::Utc>) {
                self.expand(&<Self as crate::base::TemporalBbox<$name>>::of(value, t));
            }

            fn expand(&mut self, other: &Self) {
                STBox::expand(self, other);
            }

            fn set_period(&mut self, period: &TsTzSpan) {
                STBox::set_period(self, period.clone());
            }

            fn period(&self) -> TsTzSpan {
                self.to_tstzspan().expect("temporal points always carry a period")
            }
        }
    };
}

point_base!(GeomPoint, "geometry", false, 0);
point_base!(GeogPoint, "geography", true, DEFAULT_GEOG_SRID);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn planar_interpolation_and_distance() {
        let a = GeomPoint::new(0.0, 0.0);
        let b = GeomPoint::new(4.0, 3.0);
        assert_relative_eq!(a.distance(&b), 5.0);
        assert_eq!(a.interpolate(&b, 0.5), GeomPoint::new(2.0, 1.5));
    }

    #[test]
    fn crossing_of_two_moving_points() {
        // A runs (0,0) → (2,2), B runs (2,2) → (0,0): they meet halfway.
        let f = GeomPoint::segment_crossing(
            &GeomPoint::new(0.0, 0.0),
            &GeomPoint::new(2.0, 2.0),
            &GeomPoint::new(2.0, 2.0),
            &GeomPoint::new(0.0, 0.0),
        );
        assert_eq!(f, Some(0.5));
        // Parallel motion never meets.
        assert_eq!(
            GeomPoint::segment_crossing(
                &GeomPoint::new(0.0, 0.0),
                &GeomPoint::new(1.0, 1.0),
                &GeomPoint::new(0.0, 1.0),
                &GeomPoint::new(1.0, 2.0),
            ),
            None
        );
    }

    #[test]
    fn value_crossing_requires_the_point_on_the_segment() {
        let s = GeomPoint::new(0.0, 0.0);
        let e = GeomPoint::new(4.0, 0.0);
        assert_eq!(GeomPoint::segment_crossing_value(&s, &e, &GeomPoint::new(1.0, 0.0)), Some(0.25));
        assert_eq!(GeomPoint::segment_crossing_value(&s, &e, &GeomPoint::new(1.0, 1.0)), None);
    }

    #[test]
    fn wkt_round_trip() {
        for text in ["POINT(1 2)", "POINT Z (1 2 3)", "SRID=3857;POINT(7 8)"] {
            let p = GeomPoint::parse_value(text).unwrap();
            assert_eq!(GeomPoint::parse_value(&p.format_value()).unwrap(), p);
        }
    }

    #[test]
    fn srid_mismatch_is_rejected() {
        let a = GeomPoint::new(0.0, 0.0);
        let b = GeomPoint::new(0.0, 0.0).with_srid(3857);
        assert!(a.ensure_compatible(&b).is_err());
    }
}
