//! Temporal points: trajectories, speed, time-weighted centroid, moving
//! distance, and the temporal within-distance predicate.

use chrono::{DateTime, Utc};
use geo::{LineString, MultiPoint, Point};

use crate::base::doubles::Double4;
use crate::base::point::{GeogPoint, GeomPoint};
use crate::base::BaseType;
use crate::boxes::stbox::STBox;
use crate::collections::base::collection::Collection;
use crate::errors::Error;
use crate::temporal::interpolation::TInterpolation;
use crate::temporal::lifting::{lift_binary, lift_unary, LiftSpec};
use crate::temporal::tbool::TBool;
use crate::temporal::temporal::Temporal;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;
use crate::temporal::number::TFloat;
use crate::utils::{from_micros, to_micros};
use crate::EPSILON;

pub type TGeomPoint = Temporal<GeomPoint>;
pub type TGeomPointInst = TInstant<GeomPoint>;
pub type TGeomPointSeq = TSequence<GeomPoint>;
pub type TGeomPointSeqSet = TSequenceSet<GeomPoint>;

pub type TGeogPoint = Temporal<GeogPoint>;
pub type TGeogPointInst = TInstant<GeogPoint>;
pub type TGeogPointSeq = TSequence<GeogPoint>;
pub type TGeogPointSeqSet = TSequenceSet<GeogPoint>;

/// Shared view over the two point base types.
pub trait PointBase: BaseType<Bbox = STBox> {
    const GEODETIC: bool;

    fn coord_x(&self) -> f64;
    fn coord_y(&self) -> f64;
    fn coord_z(&self) -> Option<f64>;
    fn point_srid(&self) -> i32;
    fn point_distance(&self, other: &Self) -> f64;
}

macro_rules! impl_point_base {
    ($type:ty, $geodetic:literal) => {
        impl PointBase for $type {
            const GEODETIC: bool = $geodetic;

            fn coord_x(&self) -> f64 {
                self.x
            }

            fn coord_y(&self) -> f64 {
                self.y
            }

            fn coord_z(&self) -> Option<f64> {
                self.z
            }

            fn point_srid(&self) -> i32 {
                self.srid
            }

            fn point_distance(&self, other: &Self) -> f64 {
                self.distance(other)
            }
        }
    };
}

impl_point_base!(GeomPoint, false);
impl_point_base!(GeogPoint, true);

/// Geometry traced by a temporal point.
#[derive(Debug, Clone, PartialEq)]
pub enum Trajectory {
    Point(Point<f64>),
    MultiPoint(MultiPoint<f64>),
    Line(LineString<f64>),
}

/// Fractional position of the nearest approach of two synchronized
/// moving points, strictly inside the segment.
pub(crate) fn nearest_approach_turning<P: PointBase>(
    a1: &P,
    a2: &P,
    b1: &P,
    b2: &P,
) -> Option<f64> {
    let (a, b, _c) = relative_motion_coeffs(a1, a2, b1, b2, 0.0);
    if a == 0.0 {
        return None;
    }
    let u = -b / (2.0 * a);
    (u > 0.0 && u < 1.0).then_some(u)
}

/// Coefficients of the squared-distance quadratic between the segments
/// `a1 → a2` and `b1 → b2` over `[0, 1]`, shifted by `d²`.
fn relative_motion_coeffs<P: PointBase>(
    a1: &P,
    a2: &P,
    b1: &P,
    b2: &P,
    d: f64,
) -> (f64, f64, f64) {
    let mut axes = vec![
        (a1.coord_x(), a2.coord_x(), b1.coord_x(), b2.coord_x()),
        (a1.coord_y(), a2.coord_y(), b1.coord_y(), b2.coord_y()),
    ];
    if let (Some(z1), Some(z2), Some(z3), Some(z4)) =
        (a1.coord_z(), a2.coord_z(), b1.coord_z(), b2.coord_z())
    {
        axes.push((z1, z2, z3, z4));
    }
    let mut qa = 0.0;
    let mut qb = 0.0;
    let mut qc = 0.0;
    for (s1, e1, s2, e2) in axes {
        let da = (e1 - s1) - (e2 - s2);
        let dc = s1 - s2;
        qa += da * da;
        qb += 2.0 * da * dc;
        qc += dc * dc;
    }
    (qa, qb, qc - d * d)
}

/// Timestamps at which two synchronized moving segments are exactly at
/// distance `d`: zero, one, or two solutions within `[lower, upper]`,
/// solved with a mixture of the quadratic and Viète formulas for
/// precision.
fn dwithin_solve<P: PointBase>(
    sv1: &P,
    ev1: &P,
    sv2: &P,
    ev2: &P,
    lower: DateTime<Utc>,
    upper: DateTime<Utc>,
    d: f64,
) -> (usize, DateTime<Utc>, DateTime<Utc>) {
    let duration = (to_micros(&upper) - to_micros(&lower)) as f64;
    let at = |fraction: f64| from_micros(to_micros(&lower) + (duration * fraction) as i64);
    let (a, b, c) = relative_motion_coeffs(sv1, ev1, sv2, ev2, d);
    // Parallel motion at the same speed: the distance never changes.
    if a == 0.0 {
        if sv1.point_distance(sv2) > d {
            return (0, lower, upper);
        }
        return (2, lower, upper);
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant == 0.0 {
        let t5 = -b / (2.0 * a);
        if !(0.0..=1.0).contains(&t5) {
            return (0, lower, upper);
        }
        return (1, at(t5), upper);
    }
    if discriminant < 0.0 {
        return (0, lower, upper);
    }
    let (t5, t6) = if b >= 0.0 {
        ((-b - discriminant.sqrt()) / (2.0 * a), (2.0 * c) / (-b - discriminant.sqrt()))
    } else {
        ((2.0 * c) / (-b + discriminant.sqrt()), (-b + discriminant.sqrt()) / (2.0 * a))
    };
    if t6 < 0.0 || t5 > 1.0 {
        return (0, lower, upper);
    }
    let t7 = t5.max(0.0);
    let t8 = t6.min(1.0);
    if (t7 - t8).abs() < EPSILON {
        (1, at(t7), upper)
    } else {
        (2, at(t7), at(t8))
    }
}

/// Step Boolean pieces of `dwithin` over one synchronized segment.
#[allow(clippy::too_many_arguments)]
fn dwithin_segment<P: PointBase>(
    start1: &TInstant<P>,
    end1: &TInstant<P>,
    start2: &TInstant<P>,
    end2: &TInstant<P>,
    lower_inc: bool,
    upper_inc: bool,
    d: f64,
    linear: bool,
) -> Vec<TSequence<bool>> {
    let lower = start1.timestamp();
    let upper = end1.timestamp();
    let constant = |value: bool, t0, t1, li, ui| {
        TSequence::make(
            vec![TInstant::new(value, t0), TInstant::new(value, t1)],
            li,
            ui,
            TInterpolation::Stepwise,
            false,
        )
    };
    let singleton = |value: bool, t| {
        TSequence::from_instant(TInstant::new(value, t), TInterpolation::Stepwise)
    };

    // Step interpolation or two still points: one constant piece.
    if !linear
        || (start1.value() == end1.value() && start2.value() == end2.value())
    {
        let within = start1.value().point_distance(start2.value()) <= d;
        return vec![constant(within, lower, upper, lower_inc, upper_inc)];
    }

    let (solutions, t1, t2) =
        dwithin_solve(start1.value(), end1.value(), start2.value(), end2.value(), lower, upper, d);

    match solutions {
        0 => vec![constant(false, lower, upper, lower_inc, upper_inc)],
        1 => {
            if (t1 == lower && !lower_inc) || (t1 == upper && !upper_inc) {
                return vec![constant(false, lower, upper, lower_inc, upper_inc)];
            }
            if t1 == lower {
                vec![singleton(true, lower), constant(false, lower, upper, false, upper_inc)]
            } else if t1 == upper {
                vec![TSequence::make(
                    vec![TInstant::new(false, lower), TInstant::new(true, upper)],
                    lower_inc,
                    true,
                    TInterpolation::Stepwise,
                    false,
                )]
            } else {
                vec![
                    constant(false, lower, t1, lower_inc, false),
                    singleton(true, t1),
                    constant(false, t1, upper, false, upper_inc),
                ]
            }
        }
        _ => {
            if t1 == lower && t2 == upper {
                vec![constant(true, lower, upper, lower_inc, upper_inc)]
            } else if t1 != lower && t2 == upper {
                vec![
                    constant(false, lower, t1, lower_inc, false),
                    constant(true, t1, upper, true, upper_inc),
                ]
            } else if t1 == lower {
                vec![
                    constant(true, lower, t2, lower_inc, false),
                    constant(false, t2, upper, true, upper_inc),
                ]
            } else {
                vec![
                    constant(false, lower, t1, lower_inc, false),
                    constant(true, t1, t2, true, true),
                    constant(false, t2, upper, false, upper_inc),
                ]
            }
        }
    }
}

fn dwithin_seq_seq<P: PointBase>(
    s1: &TSequence<P>,
    s2: &TSequence<P>,
    d: f64,
) -> Vec<TSequence<bool>> {
    let Some((sa, sb)) = s1.synchronize(s2, false) else { return vec![] };
    let ia = sa.instants();
    let ib = sb.instants();
    if ia.len() == 1 {
        let within = ia[0].value().point_distance(ib[0].value()) <= d;
        return vec![TSequence::from_instant(
            TInstant::new(within, ia[0].timestamp()),
            TInterpolation::Stepwise,
        )];
    }
    let linear = sa.is_linear() || sb.is_linear();
    let mut result = Vec::new();
    let mut lower_inc = sa.is_lower_inclusive();
    for k in 0..ia.len() - 1 {
        let upper_inc = if k == ia.len() - 2 { sa.is_upper_inclusive() } else { false };
        result.extend(dwithin_segment(
            &ia[k],
            &ia[k + 1],
            &ib[k],
            &ib[k + 1],
            lower_inc,
            upper_inc,
            d,
            linear,
        ));
        lower_inc = true;
    }
    result
}

impl<P: PointBase> Temporal<P> {
    fn ensure_point_compatible(&self, other: &Self) -> Result<(), Error> {
        self.start_value().ensure_compatible(&other.start_value())
    }

    /// The geometry obtained by connecting the support: the trajectory of
    /// the moving point.
    pub fn trajectory(&self) -> Trajectory {
        let points: Vec<Point<f64>> = self
            .instants()
            .iter()
            .map(|i| Point::new(i.value().coord_x(), i.value().coord_y()))
            .collect();
        match self {
            Temporal::Instant(_) => Trajectory::Point(points[0]),
            Temporal::InstantSet(_) => Trajectory::MultiPoint(MultiPoint::from(points)),
            Temporal::Sequence(_) | Temporal::SequenceSet(_) => {
                if points.len() == 1 {
                    Trajectory::Point(points[0])
                } else if self.is_linear() {
                    Trajectory::Line(LineString::from(points))
                } else {
                    // A step point jumps between positions; the trace is
                    // the set of distinct visited points.
                    let mut distinct: Vec<Point<f64>> = Vec::new();
                    for p in points {
                        if distinct.last() != Some(&p) {
                            distinct.push(p);
                        }
                    }
                    Trajectory::MultiPoint(MultiPoint::from(distinct))
                }
            }
        }
    }

    /// Length of the trajectory travelled, in the distance unit of the
    /// base type.
    pub fn length(&self) -> f64 {
        if !self.is_linear() {
            return 0.0;
        }
        self.sequences()
            .iter()
            .map(|seq| {
                seq.instants()
                    .windows(2)
                    .map(|pair| pair[0].value().point_distance(pair[1].value()))
                    .sum::<f64>()
            })
            .sum()
    }

    /// Speed along the trajectory as a step temporal float, in distance
    /// units per second. `None` for punctual values.
    pub fn speed(&self) -> Option<TFloat> {
        let per_sequence = |seq: &TSequence<P>| -> Option<TSequence<f64>> {
            let instants = seq.instants();
            if instants.len() < 2 {
                return None;
            }
            let mut speeds = Vec::with_capacity(instants.len());
            for pair in instants.windows(2) {
                let dist = pair[0].value().point_distance(pair[1].value());
                let secs = (to_micros(&pair[1].timestamp()) - to_micros(&pair[0].timestamp()))
                    as f64
                    / 1e6;
                speeds.push(TInstant::new(dist / secs, pair[0].timestamp()));
            }
            let last = speeds[speeds.len() - 1]
                .with_timestamp(instants[instants.len() - 1].timestamp());
            speeds.push(last);
            Some(TSequence::make(
                speeds,
                seq.is_lower_inclusive(),
                seq.is_upper_inclusive(),
                TInterpolation::Stepwise,
                true,
            ))
        };
        match self {
            Temporal::Instant(_) | Temporal::InstantSet(_) => None,
            Temporal::Sequence(s) => per_sequence(s).map(Temporal::Sequence),
            Temporal::SequenceSet(s) => {
                let seqs: Vec<TSequence<f64>> =
                    s.sequences().iter().filter_map(per_sequence).collect();
                TSequenceSet::from_fragments(seqs, false).map(Temporal::SequenceSet)
            }
        }
    }

    /// Time-weighted centroid of the trajectory. Goes through the
    /// 4-tuple accumulator so the weight travels with the coordinates.
    pub fn twcentroid(&self) -> P
    where
        P: Clone,
    {
        let as_tuple = lift_unary(self, true, &|p: &P| {
            Double4::new(p.coord_x(), p.coord_y(), p.coord_z().unwrap_or(0.0), 1.0)
        });
        let (sum, weight) = tuple_integral(&as_tuple);
        let template = self.start_value();
        let weight = if weight == 0.0 { 1.0 } else { weight };
        point_like(
            &template,
            sum.a / weight,
            sum.b / weight,
            template.coord_z().map(|_| sum.c / weight),
        )
    }

    /// Whether the two moving points are within distance `d`, as a
    /// temporal Boolean; the exact within-intervals are solved per
    /// segment.
    ///
    /// ## Errors
    /// `DomainError` on a negative distance,
    /// `SridOrDimensionMismatch` on incompatible operands.
    pub fn tdwithin(&self, other: &Self, d: f64) -> Result<Option<TBool>, Error> {
        if d < 0.0 {
            return Err(Error::DomainError(format!("negative distance {d}")));
        }
        self.ensure_point_compatible(other)?;
        use Temporal::*;
        let result = match (self, other) {
            (Sequence(s1), Sequence(s2)) => {
                wrap_fragments(dwithin_seq_seq(s1, s2, d))
            }
            (Sequence(s1), SequenceSet(s2)) => {
                let mut fragments = Vec::new();
                for seq2 in s2.sequences() {
                    if seq2.timespan().overlaps(&s1.timespan()) {
                        fragments.extend(dwithin_seq_seq(s1, seq2, d));
                    }
                }
                wrap_fragments(fragments)
            }
            (SequenceSet(s1), Sequence(s2)) => {
                let mut fragments = Vec::new();
                for seq1 in s1.sequences() {
                    if seq1.timespan().overlaps(&s2.timespan()) {
                        fragments.extend(dwithin_seq_seq(seq1, s2, d));
                    }
                }
                wrap_fragments(fragments)
            }
            (SequenceSet(s1), SequenceSet(s2)) => {
                let mut fragments = Vec::new();
                for seq1 in s1.sequences() {
                    for seq2 in s2.sequences() {
                        if seq1.timespan().overlaps(&seq2.timespan()) {
                            fragments.extend(dwithin_seq_seq(seq1, seq2, d));
                        }
                    }
                }
                wrap_fragments(fragments)
            }
            _ => lift_binary(self, other, &LiftSpec::pointwise(false), &|a: &P, b: &P| {
                a.point_distance(b) <= d
            }),
        };
        Ok(result)
    }

    /// Spatiotemporal bounding box.
    pub fn stbox(&self) -> STBox {
        let mut bbox = match self {
            Temporal::Instant(i) => i.bounding_box(),
            Temporal::InstantSet(s) => s.bounding_box().clone(),
            Temporal::Sequence(s) => s.bounding_box().clone(),
            Temporal::SequenceSet(s) => s.bounding_box().clone(),
        };
        bbox.set_period(self.timespan());
        bbox
    }
}

/// Distance operations of temporal points. A trait rather than inherent
/// methods so temporal numbers can carry their own `tdistance`.
pub trait TPoint: Sized {
    type Base: PointBase;

    /// Temporal distance between two moving points, with the nearest
    /// approach inside each segment materialized as a turning point.
    ///
    /// ## Errors
    /// `SridOrDimensionMismatch` when the operands disagree on SRID or Z.
    fn tdistance(&self, other: &Self) -> Result<Option<TFloat>, Error>;

    /// Smallest distance ever between the two moving points.
    fn nearest_approach_distance(&self, other: &Self) -> Result<Option<f64>, Error> {
        Ok(self.tdistance(other)?.map(|d| d.min_value()))
    }
}

impl<P: PointBase> TPoint for Temporal<P> {
    type Base = P;

    fn tdistance(&self, other: &Self) -> Result<Option<TFloat>, Error> {
        self.ensure_point_compatible(other)?;
        let spec = LiftSpec {
            reslinear: self.is_linear() || other.is_linear(),
            discont: false,
            turning: Some(nearest_approach_turning::<P>),
        };
        Ok(lift_binary(self, other, &spec, &|a: &P, b: &P| a.point_distance(b)))
    }
}

fn wrap_fragments(fragments: Vec<TSequence<bool>>) -> Option<TBool> {
    if fragments.is_empty() {
        None
    } else {
        Some(Temporal::from_fragments(fragments))
    }
}

/// Component-wise time integral of a tuple-valued temporal, plus the
/// integrated weight (the `d` component).
fn tuple_integral(temp: &Temporal<Double4>) -> (Double4, f64) {
    let mut sum = Double4::default();
    let mut weight = 0.0;
    for seq in temp.sequences() {
        for pair in seq.instants().windows(2) {
            let dt = (to_micros(&pair[1].timestamp()) - to_micros(&pair[0].timestamp())) as f64;
            let v1 = pair[0].value();
            let v2 = pair[1].value();
            if seq.is_linear() {
                sum = sum
                    + Double4::new(
                        (v1.a + v2.a) * dt / 2.0,
                        (v1.b + v2.b) * dt / 2.0,
                        (v1.c + v2.c) * dt / 2.0,
                        0.0,
                    );
                weight += (v1.d + v2.d) * dt / 2.0;
            } else {
                sum = sum + Double4::new(v1.a * dt, v1.b * dt, v1.c * dt, 0.0);
                weight += v1.d * dt;
            }
        }
    }
    if weight == 0.0 {
        // Punctual value: plain average of the instants.
        let instants = temp.instants();
        for inst in &instants {
            let v = inst.value();
            sum = sum + Double4::new(v.a, v.b, v.c, 0.0);
        }
        weight = instants.len() as f64;
    }
    (sum, weight)
}

fn point_like<P: PointBase>(template: &P, x: f64, y: f64, z: Option<f64>) -> P {
    // Rebuild a point of the same type, SRID and dimensionality through
    // the literal form to stay generic over the two point types.
    let srid = template.point_srid();
    let text = match z {
        Some(z) => format!("SRID={srid};POINT Z ({x} {y} {z})"),
        None => format!("SRID={srid};POINT({x} {y})"),
    };
    P::parse_value(&text).expect("synthesized point literal is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tp(s: &str) -> TGeomPoint {
        s.parse().unwrap()
    }

    fn ts(s: &str) -> DateTime<Utc> {
        crate::utils::parse_timestamp(s).unwrap()
    }

    #[test]
    fn trajectory_of_a_linear_sequence() {
        let p = tp("[POINT(0 0)@2000-01-01, POINT(1 1)@2000-01-02]");
        match p.trajectory() {
            Trajectory::Line(line) => assert_eq!(line.0.len(), 2),
            other => panic!("expected a line, got {other:?}"),
        }
        assert_relative_eq!(p.length(), 2f64.sqrt());
    }

    #[test]
    fn speed_is_held_per_segment() {
        let p = tp("[POINT(0 0)@2000-01-01, POINT(0 86.4)@2000-01-02]");
        let s = p.speed().unwrap();
        // 86.4 units over one day is a milliunit per second.
        assert_relative_eq!(s.start_value(), 0.001);
    }

    #[test]
    fn interpolation_within_a_segment() {
        let p = tp("[POINT(0 0)@2000-01-01, POINT(2 4)@2000-01-03]");
        assert_eq!(
            p.value_at_timestamp(ts("2000-01-02")),
            Some(GeomPoint::new(1.0, 2.0))
        );
    }

    #[test]
    fn tdistance_and_nearest_approach() {
        let a = tp("[POINT(0 0)@2000-01-01, POINT(2 0)@2000-01-03]");
        let b = tp("[POINT(2 0)@2000-01-01, POINT(0 0)@2000-01-03]");
        let d = a.tdistance(&b).unwrap().unwrap();
        assert_eq!(d.value_at_timestamp(ts("2000-01-02")), Some(0.0));
        assert_eq!(d.value_at_timestamp(ts("2000-01-01")), Some(2.0));
        assert_eq!(a.nearest_approach_distance(&b).unwrap(), Some(0.0));
    }

    #[test]
    fn tdwithin_parallel_tracks() {
        let a = tp("[POINT(0 1)@2000-01-01, POINT(1 2)@2000-01-02]");
        let b = tp("[POINT(0 0)@2000-01-01, POINT(1 1)@2000-01-02]");
        let within = a.tdwithin(&b, 1.0).unwrap().unwrap();
        assert!(within.always_eq(&true));
        let apart = a.tdwithin(&b, 0.5).unwrap().unwrap();
        assert!(apart.always_eq(&false));
    }

    #[test]
    fn tdwithin_crossing_tracks() {
        let a = tp("[POINT(1 1)@2000-01-01, POINT(5 5)@2000-01-05]");
        let b = tp("[POINT(1 3)@2000-01-01, POINT(5 3)@2000-01-05]");
        let within = a.tdwithin(&b, 1.0).unwrap().unwrap();
        assert_eq!(within.value_at_timestamp(ts("2000-01-01")), Some(false));
        assert_eq!(within.value_at_timestamp(ts("2000-01-02")), Some(true));
        assert_eq!(within.value_at_timestamp(ts("2000-01-03")), Some(true));
        assert_eq!(within.value_at_timestamp(ts("2000-01-05")), Some(false));
    }

    #[test]
    fn twcentroid_of_a_steady_track() {
        let p = tp("[POINT(0 0)@2000-01-01, POINT(2 2)@2000-01-03]");
        let c = p.twcentroid();
        assert_relative_eq!(c.x, 1.0);
        assert_relative_eq!(c.y, 1.0);
    }

    #[test]
    fn srid_mismatch_is_rejected() {
        let a = tp("[POINT(0 0)@2000-01-01, POINT(1 1)@2000-01-02]");
        let b = tp("[SRID=3857;POINT(0 0)@2000-01-01, SRID=3857;POINT(1 1)@2000-01-02]");
        assert!(a.tdistance(&b).is_err());
    }
}
