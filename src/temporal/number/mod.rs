//! Temporal numbers: arithmetic, distance, integrals, and restriction to
//! value spans. `TInt` is always step-interpolated; `TFloat` may be step
//! or linear.

use chrono::{DateTime, Utc};

use crate::base::NumberBase;
use crate::boxes::tbox::TBox;
use crate::collections::base::collection::Collection;
use crate::collections::base::span::Span;
use crate::collections::base::span_set::SpanSet;
use crate::errors::Error;
use crate::temporal::interpolation::TInterpolation;
use crate::temporal::lifting::{lift_binary, lift_binary_base, lift_unary, LiftSpec};
use crate::temporal::temporal::Temporal;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::{segment_at_timestamp, TSequence};
use crate::temporal::tsequence_set::TSequenceSet;
use crate::utils::{from_micros, to_micros};
use crate::RANGE_ROUNDOFF;

pub type TInt = Temporal<i32>;
pub type TIntInst = TInstant<i32>;
pub type TIntSeq = TSequence<i32>;
pub type TIntSeqSet = TSequenceSet<i32>;

pub type TFloat = Temporal<f64>;
pub type TFloatInst = TInstant<f64>;
pub type TFloatSeq = TSequence<f64>;
pub type TFloatSeqSet = TSequenceSet<f64>;

/// Turning point of a lifted multiplication: the product of two linear
/// segments is quadratic, with its extreme where the derivative of
/// `(a1 + da·u)(b1 + db·u)` vanishes.
pub(crate) fn mult_turning_point<T: NumberBase>(
    a1: &T,
    a2: &T,
    b1: &T,
    b2: &T,
) -> Option<f64> {
    let (a1, a2, b1, b2) =
        (NumberBase::to_double(*a1), NumberBase::to_double(*a2), NumberBase::to_double(*b1), NumberBase::to_double(*b2));
    let da = a2 - a1;
    let db = b2 - b1;
    if da == 0.0 || db == 0.0 {
        return None;
    }
    let u = -(a1 * db + b1 * da) / (2.0 * da * db);
    (u > 0.0 && u < 1.0).then_some(u)
}

/// Turning point of a lifted distance: the kink where the two linear
/// segments meet.
pub(crate) fn distance_turning_point<T: NumberBase>(
    a1: &T,
    a2: &T,
    b1: &T,
    b2: &T,
) -> Option<f64> {
    T::segment_crossing(a1, a2, b1, b2)
}

/// Timestamp at which a linear segment reaches the double `target`,
/// translated to `[0, duration]` before the division.
fn double_crossing_timestamp<T: NumberBase>(
    inst1: &TInstant<T>,
    inst2: &TInstant<T>,
    target: f64,
) -> Option<DateTime<Utc>> {
    let v1 = NumberBase::to_double(*inst1.value());
    let v2 = NumberBase::to_double(*inst2.value());
    let (min, max) = if v1 < v2 { (v1, v2) } else { (v2, v1) };
    if target < min || target > max || min == max {
        return None;
    }
    let fraction = if v1 < v2 { (target - min) / (max - min) } else { 1.0 - (target - min) / (max - min) };
    if !(-crate::EPSILON..=1.0 + crate::EPSILON).contains(&fraction) {
        return None;
    }
    let duration = (to_micros(&inst2.timestamp()) - to_micros(&inst1.timestamp())) as f64;
    Some(from_micros(to_micros(&inst1.timestamp()) + (duration * fraction) as i64))
}

impl<T: NumberBase> TSequence<T> {
    /// Restricts one segment to (the complement of) a span of values:
    /// between zero and two sequences.
    #[allow(clippy::too_many_arguments)]
    fn restrict_segment_span(
        inst1: &TInstant<T>,
        inst2: &TInstant<T>,
        linear: bool,
        interp: TInterpolation,
        lower_incl: bool,
        upper_incl: bool,
        span: &Span<T>,
        atfunc: bool,
    ) -> Vec<Self> {
        let value1 = *inst1.value();
        let value2 = *inst2.value();

        // Constant segment.
        if value1 == value2 {
            let contains = span.contains(&value1);
            if contains != atfunc {
                return vec![];
            }
            return vec![Self::make(
                vec![inst1.clone(), inst2.clone()],
                lower_incl,
                upper_incl,
                interp,
                false,
            )];
        }

        // Step interpolation: the segment holds value1, the upper bound
        // carries value2 only when inclusive.
        if !linear {
            let mut result = Vec::new();
            if span.contains(&value1) == atfunc {
                result.push(Self::make(
                    vec![inst1.clone(), inst1.with_timestamp(inst2.timestamp())],
                    lower_incl,
                    false,
                    interp,
                    false,
                ));
            }
            if upper_incl && span.contains(&value2) == atfunc {
                result.push(Self::from_instant(inst2.clone(), interp));
            }
            return result;
        }

        // Linear interpolation: intersect the segment's value span with
        // the restricting span.
        let increasing = value1 < value2;
        let seg_span = if increasing {
            Span::new(value1, value2, lower_incl, upper_incl)
        } else {
            Span::new(value2, value1, upper_incl, lower_incl)
        }
        .expect("segment values form a valid span");
        let Some(inter) = seg_span.intersection(span) else {
            if atfunc {
                return vec![];
            }
            return vec![Self::make(
                vec![inst1.clone(), inst2.clone()],
                lower_incl,
                upper_incl,
                interp,
                false,
            )];
        };

        let dlower = NumberBase::to_double(inter.lower());
        let dupper = NumberBase::to_double(inter.upper());
        let dvalue1 = NumberBase::to_double(value1);
        let dvalue2 = NumberBase::to_double(value2);

        // The intersection is a single value.
        if dlower == dupper {
            if atfunc {
                let t = if dlower == dvalue1 { inst1.timestamp() } else { inst2.timestamp() };
                return vec![Self::from_instant(TInstant::new(inter.lower(), t), interp)];
            }
            let (lower_inc1, upper_inc1) = if dvalue1 == dlower {
                (!lower_incl, upper_incl)
            } else {
                (lower_incl, !upper_incl)
            };
            return vec![Self::make(
                vec![inst1.clone(), inst2.clone()],
                lower_inc1,
                upper_inc1,
                interp,
                false,
            )];
        }

        // Instant at which the segment reaches a bound of the
        // intersection; the roundoff policy keeps the bound value.
        let bound_instant = |bound: T| -> Option<TInstant<T>> {
            let d = NumberBase::to_double(bound);
            if d == dvalue1 {
                return Some(inst1.clone());
            }
            if d == dvalue2 {
                return Some(inst2.clone());
            }
            let t = double_crossing_timestamp(inst1, inst2, d)?;
            Some(if RANGE_ROUNDOFF {
                TInstant::new(bound, t)
            } else {
                segment_at_timestamp(inst1, inst2, true, t)
            })
        };

        // Order the cut instants along time.
        let (first_bound, second_bound) =
            if increasing { (inter.lower(), inter.upper()) } else { (inter.upper(), inter.lower()) };
        let (first_inc, second_inc) = if increasing {
            (inter.is_lower_inclusive(), inter.is_upper_inclusive())
        } else {
            (inter.is_upper_inclusive(), inter.is_lower_inclusive())
        };

        // Roundoff in the solved timestamps can collapse a piece; a
        // degenerate piece becomes an instant or disappears.
        let piece = |a: TInstant<T>, b: TInstant<T>, li: bool, ui: bool| -> Option<Self> {
            if a.timestamp() == b.timestamp() {
                return (li && ui).then(|| Self::from_instant(a, interp));
            }
            Some(Self::make(vec![a, b], li, ui, interp, false))
        };

        if atfunc {
            let start = bound_instant(first_bound).unwrap_or_else(|| inst1.clone());
            let end = bound_instant(second_bound).unwrap_or_else(|| inst2.clone());
            return piece(start, end, first_inc, second_inc).into_iter().collect();
        }

        // MINUS: the parts of the segment outside the intersection.
        let cut_start = (NumberBase::to_double(first_bound) != dvalue1).then(|| bound_instant(first_bound)).flatten();
        let cut_end = (NumberBase::to_double(second_bound) != dvalue2).then(|| bound_instant(second_bound)).flatten();
        let mut result = Vec::new();
        match (cut_start, cut_end) {
            (None, None) => {
                if lower_incl && !first_inc {
                    result.push(Self::from_instant(inst1.clone(), interp));
                }
                if upper_incl && !second_inc {
                    result.push(Self::from_instant(inst2.clone(), interp));
                }
            }
            (Some(s), Some(e)) => {
                result.extend(piece(inst1.clone(), s, lower_incl, !first_inc));
                result.extend(piece(e, inst2.clone(), !second_inc, upper_incl));
            }
            (Some(s), None) => {
                result.extend(piece(inst1.clone(), s, lower_incl, !first_inc));
                if upper_incl && !second_inc {
                    result.push(Self::from_instant(inst2.clone(), interp));
                }
            }
            (None, Some(e)) => {
                if lower_incl && !first_inc {
                    result.push(Self::from_instant(inst1.clone(), interp));
                }
                result.extend(piece(e, inst2.clone(), !second_inc, upper_incl));
            }
        }
        result
    }

    /// Restriction to (the complement of) a span of values, as raw
    /// sequences.
    pub(crate) fn restrict_span(&self, span: &Span<T>, atfunc: bool) -> Vec<Self> {
        // Bounding box test first.
        let value_box = TBox::from(crate::collections::number::FloatSpan::new(
            NumberBase::to_double(span.lower()),
            NumberBase::to_double(span.upper()),
            span.is_lower_inclusive(),
            span.is_upper_inclusive(),
        )
        .expect("span bounds are ordered"));
        if !self.bounding_box().overlaps(&value_box) {
            if atfunc {
                return vec![];
            }
            return vec![self.clone()];
        }
        if self.is_instantaneous() {
            let contains = span.contains(self.start_value());
            if contains != atfunc {
                return vec![];
            }
            return vec![self.clone()];
        }
        let linear = self.is_linear();
        let mut result = Vec::new();
        let mut lower_inc = self.is_lower_inclusive();
        let instants = self.instants();
        for (k, pair) in instants.windows(2).enumerate() {
            let upper_inc = if k == instants.len() - 2 { self.is_upper_inclusive() } else { false };
            result.extend(Self::restrict_segment_span(
                &pair[0],
                &pair[1],
                linear,
                self.interpolation(),
                lower_inc,
                upper_inc,
                span,
                atfunc,
            ));
            lower_inc = true;
        }
        result
    }

    /// Restriction to (the complement of) an array of spans; the spans
    /// are normalized first.
    pub(crate) fn restrict_spans(&self, spans: &[Span<T>], atfunc: bool) -> Vec<Self> {
        let normalized = Span::normalize(spans.to_vec());
        if atfunc {
            let mut result: Vec<Self> = Vec::new();
            for span in &normalized {
                result.extend(self.restrict_span(span, true));
            }
            result.sort_by_key(|s| s.start_timestamp());
            result
        } else {
            let mut current = vec![self.clone()];
            for span in &normalized {
                let mut next = Vec::new();
                for seq in &current {
                    next.extend(seq.restrict_span(span, false));
                }
                current = next;
                if current.is_empty() {
                    break;
                }
            }
            current
        }
    }

    /// Area under the curve: trapezoids for linear interpolation,
    /// rectangles for step.
    pub fn integral(&self) -> f64 {
        let mut result = 0.0;
        for pair in self.instants().windows(2) {
            let dt = (to_micros(&pair[1].timestamp()) - to_micros(&pair[0].timestamp())) as f64;
            if self.is_linear() {
                let v1 = NumberBase::to_double(*pair[0].value());
                let v2 = NumberBase::to_double(*pair[1].value());
                result += (v1 + v2) * dt / 2.0;
            } else {
                result += NumberBase::to_double(*pair[0].value()) * dt;
            }
        }
        result
    }

    /// Time-weighted average over the sequence's period.
    pub fn time_weighted_average(&self) -> f64 {
        let duration =
            (to_micros(&self.end_timestamp()) - to_micros(&self.start_timestamp())) as f64;
        if duration == 0.0 {
            NumberBase::to_double(*self.start_value())
        } else {
            self.integral() / duration
        }
    }

    /// Range of values taken by the sequence.
    pub fn value_span(&self) -> Span<T> {
        let min = *self.min_value();
        let max = *self.max_value();
        Span::new(min, max, true, true).expect("min and max are ordered")
    }
}

impl<T: NumberBase> TSequenceSet<T> {
    pub fn integral(&self) -> f64 {
        self.sequences().iter().map(|s| s.integral()).sum()
    }

    pub fn time_weighted_average(&self) -> f64 {
        let duration: f64 = self
            .sequences()
            .iter()
            .map(|s| (to_micros(&s.end_timestamp()) - to_micros(&s.start_timestamp())) as f64)
            .sum();
        if duration == 0.0 {
            NumberBase::to_double(*self.start_value())
        } else {
            self.integral() / duration
        }
    }
}

impl<T: NumberBase> Temporal<T> {
    fn arith_spec(&self, other: &Self, turning: Option<crate::temporal::lifting::TurningFn<T>>) -> LiftSpec<T> {
        LiftSpec {
            reslinear: (self.is_linear() || other.is_linear()) && T::CONTINUOUS,
            discont: false,
            turning,
        }
    }

    /// Sum of two temporal numbers over their common support.
    pub fn temporal_add(&self, other: &Self) -> Option<Self> {
        lift_binary(self, other, &self.arith_spec(other, None), &|a, b| {
            T::from_double(NumberBase::to_double(*a) + NumberBase::to_double(*b))
        })
    }

    pub fn temporal_sub(&self, other: &Self) -> Option<Self> {
        lift_binary(self, other, &self.arith_spec(other, None), &|a, b| {
            T::from_double(NumberBase::to_double(*a) - NumberBase::to_double(*b))
        })
    }

    /// Product; the quadratic extreme between synchronized instants is
    /// materialized as a turning point.
    pub fn temporal_mul(&self, other: &Self) -> Option<Self> {
        lift_binary(self, other, &self.arith_spec(other, Some(mult_turning_point::<T>)), &|a, b| {
            T::from_double(NumberBase::to_double(*a) * NumberBase::to_double(*b))
        })
    }

    /// Quotient; a turning point is inserted where the operands cross.
    ///
    /// ## Errors
    /// `DomainError` when the divisor is ever zero on the common support.
    pub fn temporal_div(&self, other: &Self) -> Result<Option<Self>, Error> {
        if other.ever_eq(&T::from_double(0.0)) {
            return Err(Error::DomainError("division of a temporal number by zero".into()));
        }
        Ok(lift_binary(
            self,
            other,
            &self.arith_spec(other, Some(distance_turning_point::<T>)),
            &|a, b| T::from_double(NumberBase::to_double(*a) / NumberBase::to_double(*b)),
        ))
    }

    pub fn add_base(&self, value: T) -> Self {
        let spec = LiftSpec::pointwise(self.is_linear() && T::CONTINUOUS);
        lift_binary_base(self, &value, &spec, &|a, b| T::from_double(NumberBase::to_double(*a) + NumberBase::to_double(*b)))
    }

    pub fn sub_base(&self, value: T) -> Self {
        let spec = LiftSpec::pointwise(self.is_linear() && T::CONTINUOUS);
        lift_binary_base(self, &value, &spec, &|a, b| T::from_double(NumberBase::to_double(*a) - NumberBase::to_double(*b)))
    }

    pub fn mul_base(&self, value: T) -> Self {
        let spec = LiftSpec::pointwise(self.is_linear() && T::CONTINUOUS);
        lift_binary_base(self, &value, &spec, &|a, b| T::from_double(NumberBase::to_double(*a) * NumberBase::to_double(*b)))
    }

    /// ## Errors
    /// `DomainError` on a zero divisor.
    pub fn div_base(&self, value: T) -> Result<Self, Error> {
        if NumberBase::to_double(value) == 0.0 {
            return Err(Error::DomainError("division of a temporal number by zero".into()));
        }
        let spec = LiftSpec::pointwise(self.is_linear() && T::CONTINUOUS);
        Ok(lift_binary_base(self, &value, &spec, &|a, b| {
            T::from_double(NumberBase::to_double(*a) / NumberBase::to_double(*b))
        }))
    }

    /// Absolute value. The zero crossings of a linear input become
    /// turning points through the `at`/`minus` split.
    pub fn abs(&self) -> Self {
        let zero = T::from_double(0.0);
        if self.is_linear() && self.ever_eq(&zero) {
            // Split at the zero crossings so each piece keeps one sign.
            let spec = LiftSpec {
                reslinear: true,
                discont: false,
                turning: Some(distance_turning_point::<T>),
            };
            let negated = lift_unary(self, true, &|v: &T| T::from_double(-NumberBase::to_double(*v)));
            return lift_binary(self, &negated, &spec, &|a, _| {
                T::from_double(NumberBase::to_double(*a).abs())
            })
            .expect("a value always overlaps itself");
        }
        lift_unary(self, true, &|v: &T| T::from_double(NumberBase::to_double(*v).abs()))
    }

    /// Change of value between successive instants, held stepwise.
    pub fn delta_value(&self) -> Option<Self> {
        let make_deltas = |instants: &[TInstant<T>], lower_inc: bool| -> Option<TSequence<T>> {
            if instants.len() < 2 {
                return None;
            }
            let mut deltas = Vec::with_capacity(instants.len() - 1);
            for pair in instants.windows(2) {
                deltas.push(TInstant::new(
                    T::from_double(NumberBase::to_double(*pair[1].value()) - NumberBase::to_double(*pair[0].value())),
                    pair[0].timestamp(),
                ));
            }
            // The last delta holds until the end of the sequence.
            let last = deltas[deltas.len() - 1].with_timestamp(instants[instants.len() - 1].timestamp());
            deltas.push(last);
            Some(TSequence::make(deltas, lower_inc, false, TInterpolation::Stepwise, true))
        };
        match self {
            Temporal::Instant(_) | Temporal::InstantSet(_) => None,
            Temporal::Sequence(s) => {
                make_deltas(s.instants(), s.is_lower_inclusive()).map(Temporal::Sequence)
            }
            Temporal::SequenceSet(s) => {
                let seqs: Vec<TSequence<T>> = s
                    .sequences()
                    .iter()
                    .filter_map(|q| make_deltas(q.instants(), q.is_lower_inclusive()))
                    .collect();
                TSequenceSet::from_fragments(seqs, false).map(Temporal::SequenceSet)
            }
        }
    }

    /// Temporal distance `|self − other|` with the kink at each crossing
    /// materialized.
    pub fn tdistance(&self, other: &Self) -> Option<Self> {
        let spec = LiftSpec {
            reslinear: (self.is_linear() || other.is_linear()) && T::CONTINUOUS,
            discont: false,
            turning: Some(distance_turning_point::<T>),
        };
        lift_binary(self, other, &spec, &|a, b| {
            T::from_double((NumberBase::to_double(*a) - NumberBase::to_double(*b)).abs())
        })
    }

    /// Smallest distance ever between the two values.
    pub fn nearest_approach_distance(&self, other: &Self) -> Option<T> {
        self.tdistance(other).map(|d| d.min_value())
    }

    /// Area under the curve; zero for punctual values.
    pub fn integral(&self) -> f64 {
        match self {
            Temporal::Instant(_) | Temporal::InstantSet(_) => 0.0,
            Temporal::Sequence(s) => s.integral(),
            Temporal::SequenceSet(s) => s.integral(),
        }
    }

    /// Time-weighted average; the plain average for punctual values.
    pub fn time_weighted_average(&self) -> f64 {
        match self {
            Temporal::Instant(i) => NumberBase::to_double(*i.value()),
            Temporal::InstantSet(s) => {
                let sum: f64 = s.instants().iter().map(|i| NumberBase::to_double(*i.value())).sum();
                sum / s.num_instants() as f64
            }
            Temporal::Sequence(s) => s.time_weighted_average(),
            Temporal::SequenceSet(s) => s.time_weighted_average(),
        }
    }

    /// Restriction to a span of values.
    pub fn at_span(&self, span: &Span<T>) -> Option<Self> {
        self.restrict_span_impl(span, true)
    }

    pub fn minus_span(&self, span: &Span<T>) -> Option<Self> {
        self.restrict_span_impl(span, false)
    }

    fn restrict_span_impl(&self, span: &Span<T>, atfunc: bool) -> Option<Self> {
        match self {
            Temporal::Instant(i) => {
                (span.contains(i.value()) == atfunc).then(|| Temporal::Instant(i.clone()))
            }
            Temporal::InstantSet(s) => {
                let kept: Vec<TInstant<T>> = s
                    .instants()
                    .iter()
                    .filter(|i| span.contains(i.value()) == atfunc)
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(Temporal::InstantSet(crate::temporal::tinstant_set::TInstantSet::from_validated(kept)))
                }
            }
            Temporal::Sequence(s) => {
                TSequenceSet::from_fragments(s.restrict_span(span, atfunc), true)
                    .map(Temporal::SequenceSet)
            }
            Temporal::SequenceSet(s) => {
                let fragments: Vec<TSequence<T>> = s
                    .sequences()
                    .iter()
                    .flat_map(|q| q.restrict_span(span, atfunc))
                    .collect();
                TSequenceSet::from_fragments(fragments, true).map(Temporal::SequenceSet)
            }
        }
    }

    /// Restriction to an array of spans.
    pub fn at_spans(&self, spans: &[Span<T>]) -> Option<Self> {
        self.restrict_spans_impl(spans, true)
    }

    pub fn minus_spans(&self, spans: &[Span<T>]) -> Option<Self> {
        self.restrict_spans_impl(spans, false)
    }

    fn restrict_spans_impl(&self, spans: &[Span<T>], atfunc: bool) -> Option<Self> {
        match self {
            Temporal::Instant(i) => {
                let inside = spans.iter().any(|s| s.contains(i.value()));
                (inside == atfunc).then(|| Temporal::Instant(i.clone()))
            }
            Temporal::InstantSet(s) => {
                let kept: Vec<TInstant<T>> = s
                    .instants()
                    .iter()
                    .filter(|i| spans.iter().any(|sp| sp.contains(i.value())) == atfunc)
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    None
                } else {
                    Some(Temporal::InstantSet(crate::temporal::tinstant_set::TInstantSet::from_validated(kept)))
                }
            }
            Temporal::Sequence(s) => {
                TSequenceSet::from_fragments(s.restrict_spans(spans, atfunc), true)
                    .map(Temporal::SequenceSet)
            }
            Temporal::SequenceSet(s) => {
                let fragments: Vec<TSequence<T>> = s
                    .sequences()
                    .iter()
                    .flat_map(|q| q.restrict_spans(spans, atfunc))
                    .collect();
                TSequenceSet::from_fragments(fragments, true).map(Temporal::SequenceSet)
            }
        }
    }

    /// Bounding box as value span + period.
    pub fn value_span(&self) -> Span<T> {
        let min = self.min_value();
        let max = self.max_value();
        Span::new(min, max, true, true).expect("min and max are ordered")
    }

    /// The exact set of value spans: one per component for linear
    /// interpolation, one singleton per distinct value otherwise.
    pub fn value_spans(&self) -> SpanSet<T> {
        match self {
            Temporal::Sequence(s) if s.is_linear() => SpanSet::from_spans(vec![s.value_span()]),
            Temporal::SequenceSet(s) if s.is_linear() => {
                SpanSet::from_spans(s.sequences().iter().map(|q| q.value_span()).collect())
            }
            _ => SpanSet::from_spans(self.values().iter().map(|v| Span::instant(*v)).collect()),
        }
    }

    // --------------------- Value-dimension position ops ----------------

    /// Whether every value is strictly below every value of `other`.
    pub fn is_left_of_value(&self, other: &Self) -> bool {
        self.value_span().is_left(&other.value_span())
    }

    pub fn is_over_or_left_of_value(&self, other: &Self) -> bool {
        self.value_span().is_over_or_left(&other.value_span())
    }

    pub fn is_right_of_value(&self, other: &Self) -> bool {
        self.value_span().is_right(&other.value_span())
    }

    pub fn is_over_or_right_of_value(&self, other: &Self) -> bool {
        self.value_span().is_over_or_right(&other.value_span())
    }

    /// Value + time bounding box.
    pub fn tbox(&self) -> TBox {
        let span = self.value_span();
        let mut bbox = TBox::from(
            crate::collections::number::FloatSpan::new(
                NumberBase::to_double(span.lower()),
                NumberBase::to_double(span.upper()),
                true,
                true,
            )
            .expect("span bounds are ordered"),
        );
        bbox.set_period(self.timespan());
        bbox
    }
}

impl TInt {
    /// Casts to a temporal float, keeping step interpolation.
    pub fn to_tfloat(&self) -> TFloat {
        lift_unary(self, false, &|v: &i32| *v as f64)
    }
}

impl TFloat {
    /// Casts to a temporal integer by rounding.
    ///
    /// ## Errors
    /// `NotFound` for linear-interpolated inputs, whose rounded value is
    /// no longer piecewise constant.
    pub fn to_tint(&self) -> Result<TInt, Error> {
        if self.is_linear() {
            return Err(Error::NotFound(
                "a linear temporal float has no temporal integer form".into(),
            ));
        }
        Ok(lift_unary(self, false, &|v: &f64| v.round() as i32))
    }
}

macro_rules! impl_arith_operators {
    ($type:ty, $base:ty) => {
        paste::paste! {
            impl std::ops::Add for &$type {
                type Output = Option<$type>;

                fn add(self, rhs: Self) -> Self::Output {
                    self.temporal_add(rhs)
                }
            }

            impl std::ops::Add<$base> for &$type {
                type Output = $type;

                fn add(self, rhs: $base) -> Self::Output {
                    self.add_base(rhs)
                }
            }

            impl std::ops::Sub for &$type {
                type Output = Option<$type>;

                fn sub(self, rhs: Self) -> Self::Output {
                    self.temporal_sub(rhs)
                }
            }

            impl std::ops::Sub<$base> for &$type {
                type Output = $type;

                fn sub(self, rhs: $base) -> Self::Output {
                    self.sub_base(rhs)
                }
            }

            impl std::ops::Mul for &$type {
                type Output = Option<$type>;

                fn mul(self, rhs: Self) -> Self::Output {
                    self.temporal_mul(rhs)
                }
            }

            impl std::ops::Mul<$base> for &$type {
                type Output = $type;

                fn mul(self, rhs: $base) -> Self::Output {
                    self.mul_base(rhs)
                }
            }
        }
    };
}

impl_arith_operators!(TInt, i32);
impl_arith_operators!(TFloat, f64);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Utc};

    fn t(s: &str) -> TFloat {
        s.parse().unwrap()
    }

    fn ts(s: &str) -> DateTime<Utc> {
        crate::utils::parse_timestamp(s).unwrap()
    }

    #[test]
    fn at_span_restricts_a_linear_segment() {
        let x = t("[1@2000-01-01, 5@2000-01-05]");
        let span = Span::new(2.0, 4.0, true, true).unwrap();
        let at = x.at_span(&span).unwrap();
        assert_eq!(at.start_timestamp(), ts("2000-01-02"));
        assert_eq!(at.end_timestamp(), ts("2000-01-04"));
        assert_eq!(at.start_value(), 2.0);
        assert_eq!(at.end_value(), 4.0);
    }

    #[test]
    fn span_restriction_partition() {
        let x = t("[1@2000-01-01, 5@2000-01-05]");
        let span = Span::new(2.0, 4.0, true, false).unwrap();
        let at = x.at_span(&span).unwrap();
        let minus = x.minus_span(&span).unwrap();
        let merged = at.merge(&[minus]).unwrap();
        assert_eq!(merged.time(), x.time());
        for day in ["2000-01-01", "2000-01-02", "2000-01-03", "2000-01-05"] {
            assert_eq!(merged.value_at_timestamp(ts(day)), x.value_at_timestamp(ts(day)));
        }
    }

    #[test]
    fn decreasing_segment_restriction() {
        let x = t("[5@2000-01-01, 1@2000-01-05]");
        let span = Span::new(2.0, 4.0, true, true).unwrap();
        let at = x.at_span(&span).unwrap();
        assert_eq!(at.start_value(), 4.0);
        assert_eq!(at.end_value(), 2.0);
        assert_eq!(at.start_timestamp(), ts("2000-01-02"));
    }

    #[test]
    fn step_sequence_span_restriction() {
        let x = t("Interp=Stepwise;[1@2000-01-01, 3@2000-01-02, 3@2000-01-04]");
        let span = Span::new(2.0, 4.0, true, true).unwrap();
        let at = x.at_span(&span).unwrap();
        assert_eq!(at.start_timestamp(), ts("2000-01-02"));
        assert_eq!(at.value_at_timestamp(ts("2000-01-03")), Some(3.0));
        let minus = x.minus_span(&span).unwrap();
        assert_eq!(minus.timespan(), "[2000-01-01, 2000-01-02)".parse().unwrap());
    }

    #[test]
    fn integral_and_twavg() {
        let linear = t("[0@2000-01-01, 4@2000-01-05]");
        let day = 86_400_000_000.0;
        assert_relative_eq!(linear.integral(), 2.0 * 4.0 * day);
        assert_relative_eq!(linear.time_weighted_average(), 2.0);
        let step = t("Interp=Stepwise;[1@2000-01-01, 3@2000-01-03, 3@2000-01-05]");
        assert_relative_eq!(step.time_weighted_average(), 2.0);
    }

    #[test]
    fn arithmetic_agrees_pointwise() {
        let a = t("[1@2000-01-01, 3@2000-01-03]");
        let b = t("[2@2000-01-01, 2@2000-01-03]");
        let sum = (&a + &b).unwrap();
        assert_eq!(sum.value_at_timestamp(ts("2000-01-02")), Some(4.0));
        let prod = (&a * &b).unwrap();
        assert_eq!(prod.value_at_timestamp(ts("2000-01-02")), Some(4.0));
        let shifted = &a + 10.0;
        assert_eq!(shifted.value_at_timestamp(ts("2000-01-02")), Some(12.0));
    }

    #[test]
    fn division_by_ever_zero_is_rejected() {
        let a = t("[1@2000-01-01, 3@2000-01-03]");
        let zero_crossing = t("[-1@2000-01-01, 1@2000-01-03]");
        assert!(a.temporal_div(&zero_crossing).is_err());
    }

    #[test]
    fn tdistance_kink_at_crossing() {
        let a = t("[1@2000-01-01, 3@2000-01-03]");
        let b = t("[3@2000-01-01, 1@2000-01-03]");
        let d = a.tdistance(&b).unwrap();
        assert_eq!(d.value_at_timestamp(ts("2000-01-02")), Some(0.0));
        assert_eq!(d.value_at_timestamp(ts("2000-01-01")), Some(2.0));
        assert_eq!(a.nearest_approach_distance(&b), Some(0.0));
    }

    #[test]
    fn abs_splits_at_zero() {
        let x = t("[-2@2000-01-01, 2@2000-01-05]");
        let a = x.abs();
        assert_eq!(a.value_at_timestamp(ts("2000-01-03")), Some(0.0));
        assert_eq!(a.value_at_timestamp(ts("2000-01-01")), Some(2.0));
        assert_eq!(a.value_at_timestamp(ts("2000-01-05")), Some(2.0));
        assert_eq!(a.min_value(), 0.0);
    }

    #[test]
    fn delta_value_holds_stepwise() {
        let x = t("Interp=Stepwise;[1@2000-01-01, 4@2000-01-02, 2@2000-01-03, 2@2000-01-04]");
        let d = x.delta_value().unwrap();
        assert_eq!(d.value_at_timestamp(ts("2000-01-01")), Some(3.0));
        assert_eq!(d.value_at_timestamp(ts("2000-01-02")), Some(-2.0));
    }

    #[test]
    fn int_spans_canonicalize_in_restriction() {
        let x: TInt = "Interp=Stepwise;[1@2000-01-01, 3@2000-01-02, 5@2000-01-03, 5@2000-01-04]"
            .parse()
            .unwrap();
        let span: Span<i32> = Span::new(2, 4, true, true).unwrap();
        let at = x.at_span(&span).unwrap();
        assert_eq!(at.values(), vec![3, 3]);
    }

    #[test]
    fn casts_between_int_and_float() {
        let x: TInt = "Interp=Stepwise;[1@2000-01-01, 3@2000-01-02, 3@2000-01-03]".parse().unwrap();
        let f = x.to_tfloat();
        assert_eq!(f.value_at_timestamp(ts("2000-01-01")), Some(1.0));
        assert_eq!(f.to_tint().unwrap(), x);
        assert!(t("[1@2000-01-01, 2@2000-01-02]").to_tint().is_err());
    }
}
