//! The lifting engine: turns functions on base values into functions on
//! temporal values. Binary lifted functions synchronize their operands;
//! functions with instantaneous discontinuities additionally materialize
//! each crossing as a `(left-step, singleton, right-step)` triple so the
//! piecewise result has well-defined step semantics.
//!
//! Ternary base functions (e.g. a distance bound) reach the engine as
//! closures capturing their extra argument.

use chrono::{DateTime, Utc};

use crate::base::BaseType;
use crate::collections::base::collection::Collection;
use crate::temporal::interpolation::TInterpolation;
use crate::temporal::temporal::Temporal;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tinstant_set::TInstantSet;
use crate::temporal::tsequence::{interpolate_segment, TSequence};
use crate::temporal::tsequence_set::TSequenceSet;
use crate::utils::{from_micros, to_micros};

/// Fractional position of a turning point between two synchronized
/// segments, given the four segment endpoint values.
pub(crate) type TurningFn<T> = fn(&T, &T, &T, &T) -> Option<f64>;

/// How a binary lifted function behaves between synchronized instants.
pub(crate) struct LiftSpec<T: BaseType> {
    /// The result varies linearly between instants.
    pub reslinear: bool,
    /// The result can change instantaneously at crossings of the inputs.
    pub discont: bool,
    /// Where the result has a local extreme between two synchronized
    /// instants even though the inputs are linear (e.g. multiplication,
    /// distance).
    pub turning: Option<TurningFn<T>>,
}

impl<T: BaseType> LiftSpec<T> {
    pub fn pointwise(reslinear: bool) -> Self {
        Self { reslinear, discont: false, turning: None }
    }
}

fn result_interp(reslinear: bool) -> TInterpolation {
    if reslinear {
        TInterpolation::Linear
    } else {
        TInterpolation::Stepwise
    }
}

// ------------------------- Unary lifting -------------------------------

/// Applies `f` to every composing instant. The result is linear only when
/// the input is linear and `reslinear` allows it.
pub(crate) fn lift_unary<A, R>(
    temp: &Temporal<A>,
    reslinear: bool,
    f: &dyn Fn(&A) -> R,
) -> Temporal<R>
where
    A: BaseType,
    R: BaseType,
{
    let map_inst = |i: &TInstant<A>| TInstant::new(f(i.value()), i.timestamp());
    match temp {
        Temporal::Instant(i) => Temporal::Instant(map_inst(i)),
        Temporal::InstantSet(s) => Temporal::InstantSet(TInstantSet::from_validated(
            s.instants().iter().map(map_inst).collect(),
        )),
        Temporal::Sequence(s) => Temporal::Sequence(TSequence::make(
            s.instants().iter().map(map_inst).collect(),
            s.is_lower_inclusive(),
            s.is_upper_inclusive(),
            result_interp(s.is_linear() && reslinear),
            true,
        )),
        Temporal::SequenceSet(s) => Temporal::SequenceSet(TSequenceSet::from_normalized(
            s.sequences()
                .iter()
                .map(|seq| {
                    TSequence::make(
                        seq.instants().iter().map(map_inst).collect(),
                        seq.is_lower_inclusive(),
                        seq.is_upper_inclusive(),
                        result_interp(seq.is_linear() && reslinear),
                        true,
                    )
                })
                .collect(),
        )),
    }
}

// ------------------------- Temporal × base -----------------------------

/// Applies `f(instant value, constant)` across a temporal value.
pub(crate) fn lift_binary_base<T, R>(
    temp: &Temporal<T>,
    value: &T,
    spec: &LiftSpec<T>,
    f: &dyn Fn(&T, &T) -> R,
) -> Temporal<R>
where
    T: BaseType,
    R: BaseType,
{
    if !spec.discont || !temp.is_linear() {
        return lift_unary(temp, spec.reslinear, &|v| f(v, value));
    }
    match temp {
        Temporal::Sequence(s) => {
            Temporal::from_fragments(seq_base_discont(s, value, f))
        }
        Temporal::SequenceSet(s) => {
            let mut fragments = Vec::new();
            for seq in s.sequences() {
                fragments.extend(seq_base_discont(seq, value, f));
            }
            Temporal::from_fragments(fragments)
        }
        _ => lift_unary(temp, spec.reslinear, &|v| f(v, value)),
    }
}

/// Discontinuous `sequence × base`: splits every segment at its crossing
/// with `value` and probes the open intervals at their midpoint.
fn seq_base_discont<T, R>(
    seq: &TSequence<T>,
    value: &T,
    f: &dyn Fn(&T, &T) -> R,
) -> Vec<TSequence<R>>
where
    T: BaseType,
    R: BaseType,
{
    // Insert the crossings first so every remaining segment is uniform
    // between its bounds.
    let mut instants: Vec<TInstant<T>> = Vec::with_capacity(seq.num_instants() * 2);
    let seq_instants = seq.instants();
    instants.push(seq_instants[0].clone());
    for pair in seq_instants.windows(2) {
        if let Some((cross_value, t)) =
            crate::temporal::tsequence::linear_crossing_value(&pair[0], &pair[1], value)
        {
            // Roundoff can land the crossing on a bound, where it adds
            // nothing.
            if t > pair[0].timestamp() && t < pair[1].timestamp() {
                instants.push(TInstant::new(cross_value, t));
            }
        }
        instants.push(pair[1].clone());
    }
    let expanded = TSequence::make(
        instants,
        seq.is_lower_inclusive(),
        seq.is_upper_inclusive(),
        seq.interpolation(),
        false,
    );
    step_segments(&expanded, &|inst| f(inst, value))
}

// ------------------------- Temporal × temporal -------------------------

/// Synchronizes two temporal values and applies `f` over the common
/// support. `None` when the supports do not intersect.
pub(crate) fn lift_binary<T, R>(
    a: &Temporal<T>,
    b: &Temporal<T>,
    spec: &LiftSpec<T>,
    f: &dyn Fn(&T, &T) -> R,
) -> Option<Temporal<R>>
where
    T: BaseType,
    R: BaseType,
{
    use Temporal::*;
    match (a, b) {
        (Instant(i1), Instant(i2)) => {
            if i1.timestamp() != i2.timestamp() {
                return None;
            }
            Some(Temporal::Instant(TInstant::new(f(i1.value(), i2.value()), i1.timestamp())))
        }
        (Instant(i), _) => {
            let other = b.value_at_timestamp(i.timestamp())?;
            Some(Temporal::Instant(TInstant::new(f(i.value(), &other), i.timestamp())))
        }
        (_, Instant(i)) => {
            let own = a.value_at_timestamp(i.timestamp())?;
            Some(Temporal::Instant(TInstant::new(f(&own, i.value()), i.timestamp())))
        }
        (InstantSet(s1), _) => {
            let instants: Vec<TInstant<R>> = s1
                .instants()
                .iter()
                .filter_map(|i| {
                    b.value_at_timestamp(i.timestamp())
                        .map(|other| TInstant::new(f(i.value(), &other), i.timestamp()))
                })
                .collect();
            if instants.is_empty() {
                None
            } else {
                Some(Temporal::InstantSet(TInstantSet::from_validated(instants)))
            }
        }
        (_, InstantSet(s2)) => {
            let instants: Vec<TInstant<R>> = s2
                .instants()
                .iter()
                .filter_map(|i| {
                    a.value_at_timestamp(i.timestamp())
                        .map(|own| TInstant::new(f(&own, i.value()), i.timestamp()))
                })
                .collect();
            if instants.is_empty() {
                None
            } else {
                Some(Temporal::InstantSet(TInstantSet::from_validated(instants)))
            }
        }
        (Sequence(s1), Sequence(s2)) => {
            let fragments = seq_seq(s1, s2, spec, f);
            if fragments.is_empty() {
                None
            } else {
                Some(Temporal::from_fragments(fragments))
            }
        }
        (Sequence(s1), SequenceSet(s2)) => {
            let mut fragments = Vec::new();
            for seq2 in s2.sequences() {
                if seq2.timespan().overlaps(&s1.timespan()) {
                    fragments.extend(seq_seq(s1, seq2, spec, f));
                }
            }
            if fragments.is_empty() {
                None
            } else {
                Some(Temporal::from_fragments(fragments))
            }
        }
        (SequenceSet(s1), Sequence(s2)) => {
            let mut fragments = Vec::new();
            for seq1 in s1.sequences() {
                if seq1.timespan().overlaps(&s2.timespan()) {
                    fragments.extend(seq_seq(seq1, s2, spec, f));
                }
            }
            if fragments.is_empty() {
                None
            } else {
                Some(Temporal::from_fragments(fragments))
            }
        }
        (SequenceSet(s1), SequenceSet(s2)) => {
            let mut fragments = Vec::new();
            for seq1 in s1.sequences() {
                for seq2 in s2.sequences() {
                    if seq1.timespan().overlaps(&seq2.timespan()) {
                        fragments.extend(seq_seq(seq1, seq2, spec, f));
                    }
                }
            }
            if fragments.is_empty() {
                None
            } else {
                Some(Temporal::from_fragments(fragments))
            }
        }
    }
}

/// Sequence × sequence dispatch: discontinuous, same-interpolation, or
/// mixed-interpolation flavor.
fn seq_seq<T, R>(
    s1: &TSequence<T>,
    s2: &TSequence<T>,
    spec: &LiftSpec<T>,
    f: &dyn Fn(&T, &T) -> R,
) -> Vec<TSequence<R>>
where
    T: BaseType,
    R: BaseType,
{
    if spec.discont {
        let Some((sa, sb)) = s1.synchronize(s2, true) else { return vec![] };
        return discont_segments(&sa, &sb, f);
    }
    if s1.is_linear() == s2.is_linear() {
        let Some((sa, sb)) = s1.synchronize(s2, false) else { return vec![] };
        vec![apply_synchronized(&sa, &sb, spec, f)]
    } else {
        let Some((sa, sb)) = s1.synchronize(s2, false) else { return vec![] };
        mixed_segments(&sa, &sb, spec, f)
    }
}

/// Pointwise application over an already synchronized pair, inserting the
/// turning points of `spec` between instants.
fn apply_synchronized<T, R>(
    sa: &TSequence<T>,
    sb: &TSequence<T>,
    spec: &LiftSpec<T>,
    f: &dyn Fn(&T, &T) -> R,
) -> TSequence<R>
where
    T: BaseType,
    R: BaseType,
{
    let ia = sa.instants();
    let ib = sb.instants();
    let mut instants: Vec<TInstant<R>> = Vec::with_capacity(ia.len() * 2);
    for k in 0..ia.len() {
        if k > 0 {
            if let Some(turning) = spec.turning {
                if let Some(fraction) = turning(
                    ia[k - 1].value(),
                    ia[k].value(),
                    ib[k - 1].value(),
                    ib[k].value(),
                ) {
                    if fraction > 0.0 && fraction < 1.0 {
                        let t = lerp_time(ia[k - 1].timestamp(), ia[k].timestamp(), fraction);
                        if t > ia[k - 1].timestamp() && t < ia[k].timestamp() {
                            let va = interpolate_segment(&ia[k - 1], &ia[k], sa.is_linear(), t);
                            let vb = interpolate_segment(&ib[k - 1], &ib[k], sb.is_linear(), t);
                            instants.push(TInstant::new(f(&va, &vb), t));
                        }
                    }
                }
            }
        }
        instants.push(TInstant::new(f(ia[k].value(), ib[k].value()), ia[k].timestamp()));
    }
    // A step result over an exclusive upper bound must close on its
    // previous value.
    let k = instants.len();
    if !spec.reslinear && !sa.is_upper_inclusive() && k > 1 {
        if instants[k - 2].value() != instants[k - 1].value() {
            instants[k - 1] = instants[k - 2].with_timestamp(instants[k - 1].timestamp());
        }
    }
    TSequence::make(
        instants,
        sa.is_lower_inclusive(),
        sa.is_upper_inclusive(),
        result_interp(spec.reslinear),
        true,
    )
}

/// One side linear, the other step: the result is built segment by
/// segment from the linear side's endpoints and the step side's held
/// value.
fn mixed_segments<T, R>(
    sa: &TSequence<T>,
    sb: &TSequence<T>,
    spec: &LiftSpec<T>,
    f: &dyn Fn(&T, &T) -> R,
) -> Vec<TSequence<R>>
where
    T: BaseType,
    R: BaseType,
{
    let ia = sa.instants();
    let ib = sb.instants();
    if ia.len() == 1 {
        return vec![TSequence::from_instant(
            TInstant::new(f(ia[0].value(), ib[0].value()), ia[0].timestamp()),
            result_interp(spec.reslinear),
        )];
    }
    let mut result = Vec::with_capacity(ia.len());
    let mut lower_inc = sa.is_lower_inclusive();
    for k in 0..ia.len() - 1 {
        let start_res = f(ia[k].value(), ib[k].value());
        let end_a = if sa.is_linear() { ia[k + 1].value() } else { ia[k].value() };
        let end_b = if sb.is_linear() { ib[k + 1].value() } else { ib[k].value() };
        let end_res = if spec.reslinear { f(end_a, end_b) } else { start_res.clone() };
        result.push(TSequence::make(
            vec![
                TInstant::new(start_res, ia[k].timestamp()),
                TInstant::new(end_res, ia[k + 1].timestamp()),
            ],
            lower_inc,
            false,
            result_interp(spec.reslinear),
            false,
        ));
        lower_inc = true;
    }
    if sa.is_upper_inclusive() {
        let last = ia.len() - 1;
        result.push(TSequence::from_instant(
            TInstant::new(f(ia[last].value(), ib[last].value()), ia[last].timestamp()),
            result_interp(spec.reslinear),
        ));
    }
    result
}

/// Discontinuous application over a pair synchronized *with* crossings:
/// between consecutive instants the result is constant, so each segment
/// becomes a step piece whose interior value is probed at the midpoint,
/// with singleton sequences where a bound value differs from it.
fn discont_segments<T, R>(
    sa: &TSequence<T>,
    sb: &TSequence<T>,
    f: &dyn Fn(&T, &T) -> R,
) -> Vec<TSequence<R>>
where
    T: BaseType,
    R: BaseType,
{
    let ia = sa.instants();
    let ib = sb.instants();
    if ia.len() == 1 {
        return vec![TSequence::from_instant(
            TInstant::new(f(ia[0].value(), ib[0].value()), ia[0].timestamp()),
            TInterpolation::Stepwise,
        )];
    }
    let mut result = Vec::new();
    let mut lower_inc = sa.is_lower_inclusive();
    for k in 0..ia.len() - 1 {
        let upper_inc = if k == ia.len() - 2 { sa.is_upper_inclusive() } else { false };
        let t0 = ia[k].timestamp();
        let t1 = ia[k + 1].timestamp();
        let start_res = f(ia[k].value(), ib[k].value());
        let end_res = f(ia[k + 1].value(), ib[k + 1].value());
        let tmid = lerp_time(t0, t1, 0.5);
        let amid = interpolate_segment(&ia[k], &ia[k + 1], sa.is_linear(), tmid);
        let bmid = interpolate_segment(&ib[k], &ib[k + 1], sb.is_linear(), tmid);
        let mid_res = f(&amid, &bmid);
        let lower_eq = lower_inc && start_res == mid_res;
        let upper_eq = upper_inc && mid_res == end_res;
        if lower_inc && !lower_eq {
            result.push(TSequence::from_instant(
                TInstant::new(start_res, t0),
                TInterpolation::Stepwise,
            ));
        }
        result.push(TSequence::make(
            vec![TInstant::new(mid_res.clone(), t0), TInstant::new(mid_res, t1)],
            lower_eq,
            upper_eq,
            TInterpolation::Stepwise,
            false,
        ));
        if upper_inc && !upper_eq {
            result.push(TSequence::from_instant(
                TInstant::new(end_res, t1),
                TInterpolation::Stepwise,
            ));
        }
        lower_inc = true;
    }
    result
}

/// One step piece per uniform interval of a sequence whose crossings have
/// already been materialized as instants.
fn step_segments<T, R>(seq: &TSequence<T>, f: &dyn Fn(&T) -> R) -> Vec<TSequence<R>>
where
    T: BaseType,
    R: BaseType,
{
    let instants = seq.instants();
    if instants.len() == 1 {
        return vec![TSequence::from_instant(
            TInstant::new(f(instants[0].value()), instants[0].timestamp()),
            TInterpolation::Stepwise,
        )];
    }
    let mut result = Vec::new();
    let mut lower_inc = seq.is_lower_inclusive();
    for k in 0..instants.len() - 1 {
        let upper_inc = if k == instants.len() - 2 { seq.is_upper_inclusive() } else { false };
        let t0 = instants[k].timestamp();
        let t1 = instants[k + 1].timestamp();
        let start_res = f(instants[k].value());
        let end_res = f(instants[k + 1].value());
        let tmid = lerp_time(t0, t1, 0.5);
        let mid = interpolate_segment(&instants[k], &instants[k + 1], seq.is_linear(), tmid);
        let mid_res = f(&mid);
        let lower_eq = lower_inc && start_res == mid_res;
        let upper_eq = upper_inc && mid_res == end_res;
        if lower_inc && !lower_eq {
            result.push(TSequence::from_instant(
                TInstant::new(start_res, t0),
                TInterpolation::Stepwise,
            ));
        }
        result.push(TSequence::make(
            vec![TInstant::new(mid_res.clone(), t0), TInstant::new(mid_res, t1)],
            lower_eq,
            upper_eq,
            TInterpolation::Stepwise,
            false,
        ));
        if upper_inc && !upper_eq {
            result.push(TSequence::from_instant(
                TInstant::new(end_res, t1),
                TInterpolation::Stepwise,
            ));
        }
        lower_inc = true;
    }
    result
}

fn lerp_time(t0: DateTime<Utc>, t1: DateTime<Utc>, fraction: f64) -> DateTime<Utc> {
    let lower = to_micros(&t0);
    let upper = to_micros(&t1);
    from_micros(lower + ((upper - lower) as f64 * fraction) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_timestamp;

    fn t(s: &str) -> Temporal<f64> {
        s.parse().unwrap()
    }

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn unary_lifting_maps_pointwise() {
        let x = t("[1@2000-01-01, -3@2000-01-03]");
        let abs = lift_unary(&x, true, &|v: &f64| v.abs());
        assert_eq!(abs.value_at_timestamp(ts("2000-01-03")), Some(3.0));
        // |x| has a kink the unary path does not chase; pointwise
        // agreement holds at the instants.
        assert_eq!(abs.start_value(), 1.0);
    }

    #[test]
    fn binary_lifting_agreement() {
        let a = t("[1@2000-01-01, 3@2000-01-03]");
        let b = t("[10@2000-01-01, 30@2000-01-03]");
        let sum = lift_binary(&a, &b, &LiftSpec::pointwise(true), &|x, y| x + y).unwrap();
        for day in ["2000-01-01", "2000-01-02", "2000-01-03"] {
            let at = ts(day);
            assert_eq!(
                sum.value_at_timestamp(at),
                Some(a.value_at_timestamp(at).unwrap() + b.value_at_timestamp(at).unwrap())
            );
        }
    }

    #[test]
    fn binary_lifting_requires_overlap() {
        let a = t("[1@2000-01-01, 3@2000-01-02)");
        let b = t("[1@2000-01-03, 3@2000-01-04]");
        assert!(lift_binary(&a, &b, &LiftSpec::pointwise(true), &|x, y| x + y).is_none());
    }

    #[test]
    fn discontinuous_comparison_splits_at_the_crossing() {
        let a = t("[1@2000-01-01, 3@2000-01-03]");
        let b = t("[3@2000-01-01, 1@2000-01-03]");
        let spec = LiftSpec { reslinear: false, discont: true, turning: None };
        let lt: Temporal<bool> = lift_binary(&a, &b, &spec, &|x, y| x < y).unwrap();
        assert_eq!(lt.value_at_timestamp(ts("2000-01-01")), Some(true));
        // At the crossing the comparison flips through equality.
        assert_eq!(lt.value_at_timestamp(ts("2000-01-02")), Some(false));
        assert_eq!(lt.value_at_timestamp(ts("2000-01-03")), Some(false));
        let when_true = lt.at_value(&true).unwrap();
        assert_eq!(when_true.timespan(), "[2000-01-01, 2000-01-02)".parse().unwrap());
    }

    #[test]
    fn base_discont_against_a_constant() {
        let a = t("[1@2000-01-01, 5@2000-01-05]");
        let spec = LiftSpec { reslinear: false, discont: true, turning: None };
        let eq: Temporal<bool> = lift_binary_base(&a, &3.0, &spec, &|x, y| x == y);
        assert_eq!(eq.value_at_timestamp(ts("2000-01-02")), Some(false));
        assert_eq!(eq.value_at_timestamp(ts("2000-01-03")), Some(true));
        assert_eq!(eq.value_at_timestamp(ts("2000-01-04")), Some(false));
    }

    #[test]
    fn mixed_interpolation_builds_per_segment() {
        let linear = t("[1@2000-01-01, 3@2000-01-03]");
        let step = t("Interp=Stepwise;[10@2000-01-01, 20@2000-01-02, 20@2000-01-03]");
        let sum = lift_binary(&linear, &step, &LiftSpec::pointwise(true), &|x, y| x + y).unwrap();
        assert_eq!(sum.value_at_timestamp(ts("2000-01-01")), Some(11.0));
        // Just before the step jumps, the held value is still 10.
        assert_eq!(
            sum.value_at_timestamp(parse_timestamp("2000-01-01 12:00:00+00").unwrap()),
            Some(11.5)
        );
        assert_eq!(sum.value_at_timestamp(ts("2000-01-02")), Some(22.0));
        assert_eq!(sum.value_at_timestamp(ts("2000-01-03")), Some(23.0));
    }

    #[test]
    fn turning_point_materializes_the_extreme() {
        // x * x over x: [-1, 1] linear has its minimum at the zero
        // crossing, which plain synchronization would miss.
        let a = t("[-1@2000-01-01, 1@2000-01-03]");
        let spec = LiftSpec {
            reslinear: true,
            discont: false,
            turning: Some(crate::temporal::number::mult_turning_point::<f64>),
        };
        let prod = lift_binary(&a, &a, &spec, &|x, y| x * y).unwrap();
        assert_eq!(prod.value_at_timestamp(ts("2000-01-02")), Some(0.0));
        assert_eq!(prod.value_at_timestamp(ts("2000-01-01")), Some(1.0));
    }
}
