//! Douglas–Peucker-style simplification of linear-interpolated temporal
//! values: floats against the value-time chord, points against the 2-D,
//! 3-D, or speed-augmented 4-D chord.

use crate::temporal::temporal::Temporal;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;
use crate::utils::to_micros;

/// Chord split search for a float sequence: the distance of an instant to
/// the chord is the absolute difference between its value and the value
/// linearly interpolated at its timestamp.
fn float_find_split(seq: &TSequence<f64>, i1: usize, i2: usize) -> (usize, f64) {
    let mut split = i1;
    let mut dist = -1.0;
    if i1 + 2 > i2 {
        return (split, dist);
    }
    let instants = seq.instants();
    let start = *instants[i1].value();
    let end = *instants[i2].value();
    let t1 = to_micros(&instants[i1].timestamp());
    let duration2 = (to_micros(&instants[i2].timestamp()) - t1) as f64;
    for k in i1 + 1..i2 {
        let value = *instants[k].value();
        let ratio = (to_micros(&instants[k].timestamp()) - t1) as f64 / duration2;
        let interpolated = start + (end - start) * ratio;
        let d = (value - interpolated).abs();
        if d > dist {
            split = k;
            dist = d;
        }
    }
    (split, dist)
}

/// Iterative Douglas–Peucker skeleton shared by the float and point
/// variants. `find_split` returns the worst offender in the open index
/// interval and whether it must be kept.
fn dp_reduce<T, F>(seq: &TSequence<T>, min_keep: usize, find_split: F) -> TSequence<T>
where
    T: crate::base::BaseType,
    F: Fn(&TSequence<T>, usize, usize, bool) -> Option<usize>,
{
    if seq.num_instants() < 3 {
        return seq.clone();
    }
    let mut stack = vec![seq.num_instants() - 1];
    let mut kept = vec![0usize];
    let mut i1 = 0usize;
    while let Some(&i2) = stack.last() {
        // The retained count so far includes everything still on the
        // stack.
        let retained = kept.len() + stack.len();
        match find_split(seq, i1, i2, retained < min_keep) {
            Some(split) => stack.push(split),
            None => {
                kept.push(i2);
                i1 = i2;
                stack.pop();
            }
        }
    }
    kept.sort_unstable();
    let instants = seq.instants();
    TSequence::make(
        kept.into_iter().map(|k| instants[k].clone()).collect(),
        seq.is_lower_inclusive(),
        seq.is_upper_inclusive(),
        seq.interpolation(),
        true,
    )
}

impl TSequence<f64> {
    /// Simplifies the sequence so that every dropped instant lies within
    /// `eps` of the chord between the retained neighbors, keeping at
    /// least `min_keep` instants.
    pub fn simplify(&self, eps: f64, min_keep: usize) -> Self {
        if !self.is_linear() {
            return self.clone();
        }
        dp_reduce(self, min_keep, |seq, i1, i2, force| {
            let (split, dist) = float_find_split(seq, i1, i2);
            (dist >= 0.0 && (dist > eps || force)).then_some(split)
        })
    }
}

impl TSequenceSet<f64> {
    pub fn simplify(&self, eps: f64, min_keep: usize) -> Self {
        Self::from_normalized(
            self.sequences().iter().map(|s| s.simplify(eps, min_keep)).collect(),
        )
    }
}

/// Douglas–Peucker simplification of a temporal value; the speed
/// tolerance applies to the spatial implementations only. Non-linear
/// values come back unchanged.
pub trait SimplifiableTemporal: Sized {
    fn simplify(&self, eps_dist: f64, eps_speed: Option<f64>) -> Self;
}

impl SimplifiableTemporal for Temporal<f64> {
    fn simplify(&self, eps_dist: f64, _eps_speed: Option<f64>) -> Self {
        match self {
            Temporal::Sequence(s) => Temporal::Sequence(s.simplify(eps_dist, 2)),
            Temporal::SequenceSet(s) => Temporal::SequenceSet(s.simplify(eps_dist, 2)),
            other => other.clone(),
        }
    }
}

#[cfg(feature = "geo")]
mod point {
    use super::*;
    use crate::temporal::point::PointBase;

    fn dist_nd(p: &[f64], a: &[f64], b: &[f64]) -> f64 {
        // Distance from p to the segment a→b in up to four dimensions,
        // clamping to the closest endpoint outside the projection.
        let len2: f64 = a.iter().zip(b).map(|(x, y)| (y - x) * (y - x)).sum();
        let pt_dist = |q: &[f64]| -> f64 {
            p.iter().zip(q).map(|(x, y)| (y - x) * (y - x)).sum::<f64>().sqrt()
        };
        if len2 == 0.0 {
            return pt_dist(a);
        }
        let r: f64 = p
            .iter()
            .zip(a.iter().zip(b))
            .map(|(px, (ax, bx))| (px - ax) * (bx - ax))
            .sum::<f64>()
            / len2;
        if r < 0.0 {
            return pt_dist(a);
        }
        if r > 1.0 {
            return pt_dist(b);
        }
        let projected: Vec<f64> =
            a.iter().zip(b).map(|(ax, bx)| ax + r * (bx - ax)).collect();
        pt_dist(&projected)
    }

    fn segment_speed<P: PointBase>(
        seq: &TSequence<P>,
        i: usize,
        j: usize,
    ) -> f64 {
        let instants = seq.instants();
        let dist = instants[i].value().point_distance(instants[j].value());
        let secs =
            (to_micros(&instants[j].timestamp()) - to_micros(&instants[i].timestamp())) as f64 / 1e6;
        if secs == 0.0 {
            0.0
        } else {
            dist / secs
        }
    }

    fn coords<P: PointBase>(seq: &TSequence<P>, k: usize, speed: Option<f64>) -> Vec<f64> {
        let v = seq.instants()[k].value();
        let mut c = vec![v.coord_x(), v.coord_y()];
        if let Some(z) = v.coord_z() {
            c.push(z);
        }
        if let Some(s) = speed {
            c.push(s);
        }
        c
    }

    /// Chord split search for a point sequence, optionally treating the
    /// per-segment speed as an extra coordinate.
    fn point_find_split<P: PointBase>(
        seq: &TSequence<P>,
        i1: usize,
        i2: usize,
        eps_speed: Option<f64>,
    ) -> (usize, f64, f64) {
        let mut split = i1;
        let mut dist = -1.0;
        let mut delta_speed = 0.0;
        if i1 + 2 > i2 {
            return (split, dist, delta_speed);
        }
        let speed_chord = eps_speed.map(|_| segment_speed(seq, i1, i2));
        let a = coords(seq, i1, speed_chord);
        let b = coords(seq, i2, speed_chord);
        let mut prev = i1;
        for k in i1 + 1..i2 {
            let speed_here = eps_speed.map(|_| segment_speed(seq, prev, k));
            let p = coords(seq, k, speed_here);
            let d = dist_nd(&p, &a, &b);
            if d > dist {
                split = k;
                dist = d;
                if let (Some(chord), Some(here)) = (speed_chord, speed_here) {
                    delta_speed = (chord - here).abs();
                }
            }
            prev = k;
        }
        (split, dist, delta_speed)
    }

    /// Spatiotemporal Douglas–Peucker over one sequence, with an
    /// optional speed tolerance.
    pub(crate) fn simplify_point_sequence<P: PointBase>(
        seq: &TSequence<P>,
        eps_dist: f64,
        eps_speed: Option<f64>,
        min_keep: usize,
    ) -> TSequence<P> {
        if !seq.is_linear() {
            return seq.clone();
        }
        dp_reduce(seq, min_keep, |seq, i1, i2, force| {
            let (split, dist, dspeed) = point_find_split(seq, i1, i2, eps_speed);
            let keep = dist >= 0.0
                && (dist > eps_dist
                    || eps_speed.map(|e| dspeed > e).unwrap_or(false)
                    || force);
            keep.then_some(split)
        })
    }

    macro_rules! impl_point_simplify {
        ($base:ty) => {
            impl TSequence<$base> {
                /// Spatiotemporal Douglas–Peucker with an optional speed
                /// tolerance.
                pub fn simplify(
                    &self,
                    eps_dist: f64,
                    eps_speed: Option<f64>,
                    min_keep: usize,
                ) -> Self {
                    simplify_point_sequence(self, eps_dist, eps_speed, min_keep)
                }
            }

            impl TSequenceSet<$base> {
                pub fn simplify(
                    &self,
                    eps_dist: f64,
                    eps_speed: Option<f64>,
                    min_keep: usize,
                ) -> Self {
                    Self::from_normalized(
                        self.sequences()
                            .iter()
                            .map(|s| simplify_point_sequence(s, eps_dist, eps_speed, min_keep))
                            .collect(),
                    )
                }
            }

            impl SimplifiableTemporal for Temporal<$base> {
                fn simplify(&self, eps_dist: f64, eps_speed: Option<f64>) -> Self {
                    match self {
                        Temporal::Sequence(s) => {
                            Temporal::Sequence(simplify_point_sequence(s, eps_dist, eps_speed, 2))
                        }
                        Temporal::SequenceSet(s) => Temporal::SequenceSet(
                            TSequenceSet::from_normalized(
                                s.sequences()
                                    .iter()
                                    .map(|q| {
                                        simplify_point_sequence(q, eps_dist, eps_speed, 2)
                                    })
                                    .collect(),
                            ),
                        ),
                        other => other.clone(),
                    }
                }
            }
        };
    }

    impl_point_simplify!(crate::base::point::GeomPoint);
    impl_point_simplify!(crate::base::point::GeogPoint);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(s: &str) -> TSequence<f64> {
        s.parse().unwrap()
    }

    #[test]
    fn collinear_interior_instants_are_dropped() {
        // All interior instants lie on the chord from 0 to 4.
        let s = TSequence::make(
            seq("[0@2000-01-01, 4@2000-01-05]")
                .at_tstzset(&"{2000-01-01, 2000-01-02, 2000-01-03, 2000-01-04, 2000-01-05}".parse().unwrap())
                .unwrap()
                .instants()
                .to_vec(),
            true,
            true,
            crate::TInterpolation::Linear,
            false,
        );
        assert_eq!(s.num_instants(), 5);
        let simplified = s.simplify(0.5, 2);
        assert_eq!(simplified.num_instants(), 2);
        assert_eq!(*simplified.start_value(), 0.0);
        assert_eq!(*simplified.end_value(), 4.0);
    }

    #[test]
    fn outliers_beyond_epsilon_survive() {
        let s = seq("[0@2000-01-01, 3@2000-01-03, 0@2000-01-05]");
        let simplified = s.simplify(0.5, 2);
        assert_eq!(simplified.num_instants(), 3);
        // A generous epsilon flattens the bump.
        let flattened = s.simplify(10.0, 2);
        assert_eq!(flattened.num_instants(), 2);
    }

    #[test]
    fn retained_instants_bound_the_chord_error() {
        let s = seq("[0@2000-01-01, 1.2@2000-01-02, 1.8@2000-01-03, 3.4@2000-01-04, 4@2000-01-05]");
        let eps = 0.3;
        let simplified = s.simplify(eps, 2);
        // Every dropped instant is within eps of the simplified curve.
        for inst in s.instants() {
            let approx = simplified.value_at_timestamp(inst.timestamp()).unwrap();
            assert!((approx - inst.value()).abs() <= eps + crate::EPSILON);
        }
    }

    #[cfg(feature = "geo")]
    #[test]
    fn point_simplification_drops_on_chord_points() {
        let p: crate::TGeomPoint =
            "[POINT(0 0)@2000-01-01, POINT(1 1)@2000-01-02, POINT(2 2)@2000-01-03, POINT(5 0)@2000-01-04]"
                .parse()
                .unwrap();
        // Construction normalizes the collinear run; rebuild unnormalized.
        let simplified = p.simplify(0.1, None);
        assert!(simplified.num_instants() <= 3);
    }
}
