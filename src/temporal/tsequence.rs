use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::base::{BaseType, TemporalBbox};
use crate::collections::base::collection::Collection;
use crate::collections::datetime::{TsTzSet, TsTzSpan, TsTzSpanSet};
use crate::errors::{Error, ParseError};
use crate::temporal::interpolation::TInterpolation;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tinstant_set::TInstantSet;
use crate::utils::{from_micros, split_top_level, to_micros};
use crate::wire::{WireReader, WireWriter};

/// A time-contiguous trajectory of values over a period, under one
/// interpolation mode.
#[derive(Debug, Clone, PartialEq)]
pub struct TSequence<T: BaseType> {
    instants: Vec<TInstant<T>>,
    lower_inc: bool,
    upper_inc: bool,
    interp: TInterpolation,
    bbox: T::Bbox,
}

/// Value of a linear segment at the fractional position of `t` between
/// the two instants. The segment is translated to `[0, duration]` before
/// the division so the ratio stays well conditioned.
pub(crate) fn interpolate_segment<T: BaseType>(
    inst1: &TInstant<T>,
    inst2: &TInstant<T>,
    linear: bool,
    t: DateTime<Utc>,
) -> T {
    if inst1.value() == inst2.value() || t == inst1.timestamp() || (!linear && t < inst2.timestamp())
    {
        return inst1.value().clone();
    }
    if t == inst2.timestamp() {
        return inst2.value().clone();
    }
    let duration1 = (to_micros(&t) - to_micros(&inst1.timestamp())) as f64;
    let duration2 = (to_micros(&inst2.timestamp()) - to_micros(&inst1.timestamp())) as f64;
    inst1.value().interpolate(inst2.value(), duration1 / duration2)
}

/// Instant of a segment at `t`.
pub(crate) fn segment_at_timestamp<T: BaseType>(
    inst1: &TInstant<T>,
    inst2: &TInstant<T>,
    linear: bool,
    t: DateTime<Utc>,
) -> TInstant<T> {
    TInstant::new(interpolate_segment(inst1, inst2, linear, t), t)
}

/// Timestamp and value at which the linear segment takes `value`, strictly
/// between the bounds. Returns `None` when `value` equals either endpoint:
/// bound hits are the caller's business.
pub(crate) fn linear_crossing_value<T: BaseType>(
    inst1: &TInstant<T>,
    inst2: &TInstant<T>,
    value: &T,
) -> Option<(T, DateTime<Utc>)> {
    if value == inst1.value() || value == inst2.value() {
        return None;
    }
    let fraction = T::segment_crossing_value(inst1.value(), inst2.value(), value)?;
    let duration = (to_micros(&inst2.timestamp()) - to_micros(&inst1.timestamp())) as f64;
    let t = from_micros(to_micros(&inst1.timestamp()) + (duration * fraction) as i64);
    // Roundoff may push t onto a bound; the projected value is then the
    // bound value itself.
    let inter = interpolate_segment(inst1, inst2, true, t);
    Some((inter, t))
}

/// Crossing of two synchronized segments strictly between their shared
/// bounds, with the value each side takes there.
pub(crate) fn segment_cross<T: BaseType>(
    start1: &TInstant<T>,
    end1: &TInstant<T>,
    linear1: bool,
    start2: &TInstant<T>,
    end2: &TInstant<T>,
    linear2: bool,
) -> Option<(T, T, DateTime<Utc>)> {
    if !linear1 {
        let value = start1.value().clone();
        let (inter2, t) = linear_crossing_value(start2, end2, &value)?;
        if t <= start1.timestamp() || t >= end1.timestamp() {
            return None;
        }
        return Some((value, inter2, t));
    }
    if !linear2 {
        let value = start2.value().clone();
        let (inter1, t) = linear_crossing_value(start1, end1, &value)?;
        if t <= start1.timestamp() || t >= end1.timestamp() {
            return None;
        }
        return Some((inter1, value, t));
    }
    let fraction = T::segment_crossing(start1.value(), end1.value(), start2.value(), end2.value())?;
    let duration = (to_micros(&end1.timestamp()) - to_micros(&start1.timestamp())) as f64;
    let t = from_micros(to_micros(&start1.timestamp()) + (duration * fraction) as i64);
    if t <= start1.timestamp() || t >= end1.timestamp() {
        return None;
    }
    let inter1 = interpolate_segment(start1, end1, true, t);
    let inter2 = interpolate_segment(start2, end2, true, t);
    Some((inter1, inter2, t))
}

impl<T: BaseType> TSequence<T> {
    /// Builds a sequence with an inclusive lower bound and an exclusive
    /// upper bound (inclusive when instantaneous), normalizing the
    /// instants.
    pub fn new(instants: Vec<TInstant<T>>, interp: TInterpolation) -> Result<Self, Error> {
        let upper_inc = instants.len() == 1;
        Self::new_with_bounds(instants, true, upper_inc, interp, true)
    }

    /// Builds a sequence with explicit bound inclusivity.
    ///
    /// ## Errors
    /// - `ShapeViolation` for an empty instant array, non-increasing
    ///   timestamps, a single instant with an exclusive bound, or a step
    ///   sequence whose exclusive upper bound introduces a new value.
    /// - `Unsupported` for linear interpolation over a step-only base
    ///   type.
    pub fn new_with_bounds(
        instants: Vec<TInstant<T>>,
        lower_inc: bool,
        upper_inc: bool,
        interp: TInterpolation,
        normalize: bool,
    ) -> Result<Self, Error> {
        if instants.is_empty() {
            return Err(Error::ShapeViolation("sequence must have at least one instant".into()));
        }
        if interp.is_linear() && !T::CONTINUOUS {
            return Err(Error::Unsupported(format!(
                "linear interpolation over {} values",
                T::NAME
            )));
        }
        if instants.len() == 1 && !(lower_inc && upper_inc) {
            return Err(Error::ShapeViolation(
                "an instantaneous sequence must have inclusive bounds".into(),
            ));
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
        if !interp.is_linear() && !upper_inc && instants.len() > 1 {
            let last = instants[instants.len() - 1].value();
            let prev = instants[instants.len() - 2].value();
            if last != prev {
                return Err(Error::ShapeViolation(
                    "the exclusive upper bound of a step sequence must repeat the previous value"
                        .into(),
                ));
            }
        }
        Ok(Self::make(instants, lower_inc, upper_inc, interp, normalize))
    }

    /// Construction after validation: normalization, bounding box.
    pub(crate) fn make(
        instants: Vec<TInstant<T>>,
        lower_inc: bool,
        upper_inc: bool,
        interp: TInterpolation,
        normalize: bool,
    ) -> Self {
        let instants = if normalize && instants.len() > 2 {
            Self::normalize_instants(instants, interp.is_linear())
        } else {
            instants
        };
        let mut bbox = instants[0].bounding_box();
        for inst in &instants[1..] {
            bbox.expand_value(inst.value(), inst.timestamp());
        }
        let period = TsTzSpan::new(
            instants[0].timestamp(),
            instants[instants.len() - 1].timestamp(),
            lower_inc,
            upper_inc,
        )
        .expect("ordered instants form a valid period");
        bbox.set_period(&period);
        Self { instants, lower_inc, upper_inc, interp, bbox }
    }

    /// Removes the composing instants that do not change the piecewise
    /// curve: the middle of a step-constant pair, of three equal values,
    /// or of a collinear triple.
    fn normalize_instants(instants: Vec<TInstant<T>>, linear: bool) -> Vec<TInstant<T>> {
        let mut result: Vec<TInstant<T>> = Vec::with_capacity(instants.len());
        let mut iter = instants.into_iter();
        let mut inst1 = iter.next().expect("at least three instants");
        let mut inst2 = iter.next().expect("at least three instants");
        result.push(inst1.clone());
        for inst3 in iter {
            let value_eq12 = inst1.value() == inst2.value();
            let drop_middle = if !linear {
                value_eq12
            } else if value_eq12 && inst2.value() == inst3.value() {
                true
            } else {
                let duration1 =
                    (to_micros(&inst2.timestamp()) - to_micros(&inst1.timestamp())) as f64;
                let duration2 =
                    (to_micros(&inst3.timestamp()) - to_micros(&inst1.timestamp())) as f64;
                inst1.value().collinear(inst2.value(), inst3.value(), duration1 / duration2)
            };
            if drop_middle {
                inst2 = inst3;
            } else {
                result.push(inst2.clone());
                inst1 = inst2;
                inst2 = inst3;
            }
        }
        result.push(inst2);
        result
    }

    pub fn from_instant(instant: TInstant<T>, interp: TInterpolation) -> Self {
        Self::make(vec![instant], true, true, interp, false)
    }

    /// A constant sequence: `value` over the whole of `span`.
    pub fn from_base_tstzspan(value: T, span: &TsTzSpan, interp: TInterpolation) -> Self {
        let mut instants = vec![TInstant::new(value.clone(), span.lower())];
        if span.lower() != span.upper() {
            instants.push(TInstant::new(value, span.upper()));
        }
        Self::make(
            instants,
            span.is_lower_inclusive(),
            span.is_upper_inclusive(),
            interp,
            false,
        )
    }

    // ------------------------- Accessors -------------------------------

    pub fn bounding_box(&self) -> &T::Bbox {
        &self.bbox
    }

    pub fn interpolation(&self) -> TInterpolation {
        self.interp
    }

    pub(crate) fn is_linear(&self) -> bool {
        self.interp.is_linear()
    }

    pub fn is_lower_inclusive(&self) -> bool {
        self.lower_inc
    }

    pub fn is_upper_inclusive(&self) -> bool {
        self.upper_inc
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

    /// The period of the sequence, bounds included as constructed.
    pub fn timespan(&self) -> TsTzSpan {
        TsTzSpan::new(self.start_timestamp(), self.end_timestamp(), self.lower_inc, self.upper_inc)
            .expect("sequence bounds form a valid period")
    }

    pub fn time(&self) -> TsTzSpanSet {
        TsTzSpanSet::from(self.timespan())
    }

    pub fn duration(&self) -> TimeDelta {
        self.end_timestamp() - self.start_timestamp()
    }

    pub(crate) fn is_instantaneous(&self) -> bool {
        self.instants.len() == 1
    }

    /// Index of the segment containing `t`: the largest `n` with
    /// `instants[n].t <= t`. `None` when `t` precedes the first instant.
    pub(crate) fn find_timestamp(&self, t: DateTime<Utc>) -> Option<usize> {
        match self.instants.binary_search_by_key(&t, |i| i.timestamp()) {
            Ok(n) => Some(n),
            Err(0) => None,
            Err(n) => Some(n - 1),
        }
    }

    /// Value taken at `t`, `None` outside the period.
    pub fn value_at_timestamp(&self, t: DateTime<Utc>) -> Option<T> {
        if !self.timespan().contains(&t) {
            return None;
        }
        if self.is_instantaneous() {
            return Some(self.instants[0].value().clone());
        }
        let n = self.find_timestamp(t)?;
        if self.instants[n].timestamp() == t {
            return Some(self.instants[n].value().clone());
        }
        Some(interpolate_segment(&self.instants[n], &self.instants[n + 1], self.is_linear(), t))
    }

    /// Like [`Self::value_at_timestamp`] but also answers at exclusive
    /// bounds.
    pub fn value_at_timestamp_inclusive(&self, t: DateTime<Utc>) -> Option<T> {
        if t == self.start_timestamp() {
            return Some(self.start_value().clone());
        }
        if t == self.end_timestamp() {
            return Some(self.end_value().clone());
        }
        self.value_at_timestamp(t)
    }

    /// One sequence per segment: constant pieces for step sequences,
    /// straight pieces for linear ones. A step sequence whose inclusive
    /// end carries a new value contributes a final singleton.
    pub fn segments(&self) -> Vec<Self> {
        if self.is_instantaneous() {
            return vec![self.clone()];
        }
        let mut result = Vec::with_capacity(self.instants.len());
        let mut lower_inc = self.lower_inc;
        for (k, pair) in self.instants.windows(2).enumerate() {
            let last = k == self.instants.len() - 2;
            if self.is_linear() {
                result.push(Self::make(
                    vec![pair[0].clone(), pair[1].clone()],
                    lower_inc,
                    if last { self.upper_inc } else { false },
                    self.interp,
                    false,
                ));
            } else {
                let closes = last && self.upper_inc && pair[0].value() == pair[1].value();
                result.push(Self::make(
                    vec![pair[0].clone(), pair[0].with_timestamp(pair[1].timestamp())],
                    lower_inc,
                    closes,
                    self.interp,
                    false,
                ));
                if last && self.upper_inc && pair[0].value() != pair[1].value() {
                    result.push(Self::from_instant(pair[1].clone(), self.interp));
                }
            }
            lower_inc = true;
        }
        result
    }

    pub fn shift_time(&self, delta: TimeDelta) -> Self {
        self.shift_scale_time(Some(delta), None)
    }

    pub fn scale_time(&self, duration: TimeDelta) -> Self {
        self.shift_scale_time(None, Some(duration))
    }

    /// Shifts all timestamps by `delta` and/or rescales them so the total
    /// duration is `duration`.
    pub fn shift_scale_time(&self, delta: Option<TimeDelta>, duration: Option<TimeDelta>) -> Self {
        let old_start = to_micros(&self.start_timestamp());
        let old_span = to_micros(&self.end_timestamp()) - old_start;
        let new_start = match delta {
            Some(d) => old_start + d.num_microseconds().unwrap_or(0),
            None => old_start,
        };
        let new_span = match duration {
            Some(d) => d.num_microseconds().unwrap_or(old_span),
            None => old_span,
        };
        let instants = self
            .instants
            .iter()
            .map(|inst| {
                let t = to_micros(&inst.timestamp());
                let scaled = if old_span == 0 {
                    new_start
                } else {
                    new_start + (t - old_start) * new_span / old_span
                };
                inst.with_timestamp(from_micros(scaled))
            })
            .collect();
        Self::make(instants, self.lower_inc, self.upper_inc, self.interp, false)
    }

    /// Appends an instant, keeping the sequence normalized.
    ///
    /// ## Errors
    /// `ShapeViolation` when the instant is not after the end of the
    /// sequence, or repeats the end timestamp with another value.
    pub fn append_instant(&self, instant: TInstant<T>) -> Result<Self, Error> {
        let end = self.end_instant();
        if instant.timestamp() < end.timestamp() {
            return Err(Error::ShapeViolation(format!(
                "appended instant {} is before the end of the sequence",
                instant
            )));
        }
        if instant.timestamp() == end.timestamp() {
            return if instant.value() == end.value() {
                Ok(self.clone())
            } else {
                Err(Error::ShapeViolation(format!(
                    "conflicting value at {}",
                    crate::utils::format_timestamp(&instant.timestamp())
                )))
            };
        }
        let mut instants = self.instants.clone();
        instants.push(instant);
        Self::new_with_bounds(instants, self.lower_inc, true, self.interp, true)
    }

    // ------------------------- Normalization of arrays -----------------

    /// Joins two adjacent sequences, optionally dropping the shared
    /// boundary instants.
    pub(crate) fn join(&self, other: &Self, remove_last: bool, remove_first: bool) -> Self {
        let count1 = if remove_last { self.instants.len() - 1 } else { self.instants.len() };
        let start2 = if remove_first { 1 } else { 0 };
        let mut instants = Vec::with_capacity(count1 + other.instants.len() - start2);
        instants.extend_from_slice(&self.instants[..count1]);
        instants.extend_from_slice(&other.instants[start2..]);
        Self::make(instants, self.lower_inc, other.upper_inc, self.interp, false)
    }

    /// Merges temporally adjacent sequences whenever the join is lossless:
    /// constant-equal boundary, step side with an exclusive upper bound,
    /// equal boundary values, or a collinear linear transition.
    pub(crate) fn normalize_sequences(sequences: Vec<Self>) -> Vec<Self> {
        let mut iter = sequences.into_iter();
        let Some(mut seq1) = iter.next() else { return Vec::new() };
        let linear = seq1.is_linear();
        let mut result = Vec::new();
        for seq2 in iter {
            let adjacent = seq1.end_timestamp() == seq2.start_timestamp()
                && (seq1.upper_inc || seq2.lower_inc);
            let last2 = (seq1.instants.len() > 1)
                .then(|| seq1.instants[seq1.instants.len() - 2].clone());
            let first2 = (seq2.instants.len() > 1).then(|| seq2.instants[1].clone());
            let last1 = seq1.end_instant().clone();
            let first1 = seq2.start_instant().clone();
            let joined = if adjacent && last2.is_some() && first2.is_some() {
                let last2 = last2.expect("checked above");
                let first2 = first2.expect("checked above");
                let step_constant_tail = !linear
                    && last2.value() == last1.value()
                    && last1.value() == first1.value();
                let constant_boundary = last2.value() == last1.value()
                    && last1.value() == first1.value()
                    && first1.value() == first2.value();
                let collinear_transition = T::CONTINUOUS
                    && linear
                    && last1.value() == first1.value()
                    && {
                        let duration1 =
                            (to_micros(&first1.timestamp()) - to_micros(&last2.timestamp())) as f64;
                        let duration2 =
                            (to_micros(&first2.timestamp()) - to_micros(&last2.timestamp())) as f64;
                        last2.value().collinear(
                            first1.value(),
                            first2.value(),
                            duration1 / duration2,
                        )
                    };
                if step_constant_tail || constant_boundary || collinear_transition {
                    Some(seq1.join(&seq2, true, true))
                } else if !linear && !seq1.upper_inc {
                    // A step sequence with an exclusive upper bound ends in
                    // a constant segment by construction.
                    Some(seq1.join(&seq2, true, false))
                } else if last1.value() == first1.value() {
                    Some(seq1.join(&seq2, false, true))
                } else {
                    None
                }
            } else if adjacent && !linear && !seq1.upper_inc && seq1.instants.len() > 1 {
                Some(seq1.join(&seq2, true, false))
            } else if adjacent && last1.value() == first1.value() {
                Some(seq1.join(&seq2, false, true))
            } else {
                None
            };
            match joined {
                Some(j) => seq1 = j,
                None => {
                    result.push(seq1);
                    seq1 = seq2;
                }
            }
        }
        result.push(seq1);
        result
    }

    // ------------------------- Synchronization -------------------------

    /// Restates both sequences over the intersection of their periods and
    /// the union of their instants there; with `crossings`, also inserts a
    /// matched pair of instants wherever the two curves cross between
    /// synchronized instants. Returns `None` when the periods do not
    /// overlap.
    pub fn synchronize(&self, other: &Self, crossings: bool) -> Option<(Self, Self)> {
        let inter = self.timespan().intersection(&other.timespan())?;
        let linear1 = self.is_linear();
        let linear2 = other.is_linear();

        if inter.lower() == inter.upper() {
            let inst1 = self.at_timestamp_unchecked(inter.lower());
            let inst2 = other.at_timestamp_unchecked(inter.lower());
            return Some((
                Self::from_instant(inst1, self.interp),
                Self::from_instant(inst2, other.interp),
            ));
        }

        let mut i = 0;
        let mut j = 0;
        let mut inst1 = self.instants[0].clone();
        let mut inst2 = other.instants[0].clone();
        if inst1.timestamp() < inter.lower() {
            i = self.find_timestamp(inter.lower()).expect("intersection within period") + 1;
            inst1 = self.instants[i].clone();
        } else if inst2.timestamp() < inter.lower() {
            j = other.find_timestamp(inter.lower()).expect("intersection within period") + 1;
            inst2 = other.instants[j].clone();
        }

        let mut instants1: Vec<TInstant<T>> = Vec::new();
        let mut instants2: Vec<TInstant<T>> = Vec::new();
        while i < self.instants.len()
            && j < other.instants.len()
            && (inst1.timestamp() <= inter.upper() || inst2.timestamp() <= inter.upper())
        {
            match inst1.timestamp().cmp(&inst2.timestamp()) {
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => {
                    i += 1;
                    inst2 = other.at_timestamp_unchecked(inst1.timestamp());
                }
                std::cmp::Ordering::Greater => {
                    j += 1;
                    inst1 = self.at_timestamp_unchecked(inst2.timestamp());
                }
            }
            if crossings && (linear1 || linear2) && !instants1.is_empty() {
                let k = instants1.len();
                let cross = segment_cross(
                    &instants1[k - 1],
                    &inst1,
                    linear1,
                    &instants2[k - 1],
                    &inst2,
                    linear2,
                );
                if let Some((inter1, inter2, t)) = cross {
                    instants1.push(TInstant::new(inter1, t));
                    instants2.push(TInstant::new(inter2, t));
                }
            }
            instants1.push(inst1.clone());
            instants2.push(inst2.clone());
            if i == self.instants.len() || j == other.instants.len() {
                break;
            }
            inst1 = self.instants[i].clone();
            inst2 = other.instants[j].clone();
        }

        // A step side with an exclusive upper bound must end on its
        // previous value.
        let k = instants1.len();
        if !inter.is_upper_inclusive() && k > 1 {
            if !linear1 && instants1[k - 2].value() != instants1[k - 1].value() {
                instants1[k - 1] = instants1[k - 2].with_timestamp(instants1[k - 1].timestamp());
            }
            if !linear2 && instants2[k - 2].value() != instants2[k - 1].value() {
                instants2[k - 1] = instants2[k - 2].with_timestamp(instants2[k - 1].timestamp());
            }
        }

        Some((
            Self::make(instants1, inter.is_lower_inclusive(), inter.is_upper_inclusive(), self.interp, false),
            Self::make(instants2, inter.is_lower_inclusive(), inter.is_upper_inclusive(), other.interp, false),
        ))
    }

    // ------------------------- Restriction kernel ----------------------

    /// Restricts one segment to (`at` = true) or away from (`at` = false)
    /// a base value. Produces between zero and two sequences.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restrict_segment_value(
        inst1: &TInstant<T>,
        inst2: &TInstant<T>,
        linear: bool,
        interp: TInterpolation,
        lower_inc: bool,
        upper_inc: bool,
        value: &T,
        atfunc: bool,
    ) -> Vec<Self> {
        let value1 = inst1.value();
        let value2 = inst2.value();
        let is_const = value1 == value2;
        let lower = if atfunc { value1 == value } else { value1 != value };
        let upper = if atfunc { value2 == value } else { value2 != value };
        let crossing = (linear && !is_const)
            .then(|| linear_crossing_value(inst1, inst2, value))
            .flatten();

        // Whole segment out of the answer.
        if (is_const && !lower)
            || (!is_const
                && atfunc
                && linear
                && ((lower && !lower_inc)
                    || (upper && !upper_inc)
                    || (!lower && !upper && crossing.is_none())))
        {
            return vec![];
        }

        // Whole segment in the answer, possibly with trimmed bounds.
        if (is_const && lower)
            || (!is_const && linear && !atfunc && (!lower || !upper || crossing.is_none()))
        {
            return vec![Self::make(
                vec![inst1.clone(), inst2.clone()],
                lower_inc && lower,
                upper_inc && upper,
                interp,
                false,
            )];
        }

        if !linear {
            let mut result = Vec::new();
            if lower {
                result.push(Self::make(
                    vec![inst1.clone(), inst1.with_timestamp(inst2.timestamp())],
                    lower_inc,
                    false,
                    interp,
                    false,
                ));
            }
            if upper_inc && upper {
                result.push(Self::from_instant(inst2.clone(), interp));
            }
            return result;
        }

        // Linear interpolation: bound hits first.
        if atfunc && ((lower && lower_inc) || (upper && upper_inc)) {
            let inst = if lower { inst1 } else { inst2 };
            return vec![Self::from_instant(inst.clone(), interp)];
        }
        let Some((projvalue, t)) = crossing else {
            return vec![];
        };
        if atfunc {
            return vec![Self::from_instant(TInstant::new(projvalue, t), interp)];
        }
        // MINUS around an interior root; roundoff may have moved t onto a
        // bound.
        if t == inst1.timestamp() {
            if !lower_inc {
                return vec![];
            }
            return vec![Self::make(
                vec![inst1.clone(), inst2.clone()],
                false,
                upper_inc,
                interp,
                false,
            )];
        }
        if t == inst2.timestamp() {
            if !upper_inc {
                return vec![];
            }
            return vec![Self::make(
                vec![inst1.clone(), inst2.clone()],
                lower_inc,
                false,
                interp,
                false,
            )];
        }
        let mid = TInstant::new(projvalue, t);
        vec![
            Self::make(vec![inst1.clone(), mid.clone()], lower_inc, false, interp, false),
            Self::make(vec![mid, inst2.clone()], false, upper_inc, interp, false),
        ]
    }

    /// Restriction to (the complement of) a base value, as raw sequences.
    pub(crate) fn restrict_value(&self, value: &T, atfunc: bool) -> Vec<Self> {
        if self.is_instantaneous() {
            let equal = self.instants[0].value() == value;
            if equal == atfunc {
                return vec![self.clone()];
            }
            return vec![];
        }
        let linear = self.is_linear();
        let mut result = Vec::new();
        let mut lower_inc = self.lower_inc;
        for (k, pair) in self.instants.windows(2).enumerate() {
            let upper_inc = if k == self.instants.len() - 2 { self.upper_inc } else { false };
            result.extend(Self::restrict_segment_value(
                &pair[0], &pair[1], linear, self.interp, lower_inc, upper_inc, value, atfunc,
            ));
            lower_inc = true;
        }
        result
    }

    /// Restriction to an array of base values.
    pub(crate) fn restrict_values(&self, values: &[T], atfunc: bool) -> Vec<Self> {
        if atfunc {
            let mut result: Vec<Self> = Vec::new();
            for value in values {
                result.extend(self.restrict_value(value, true));
            }
            result.sort_by_key(|s| s.start_timestamp());
            result
        } else {
            // minus(values) = at(complement of the union of the at-parts).
            let at: Vec<Self> = self.restrict_values(values, true);
            if at.is_empty() {
                return vec![self.clone()];
            }
            let at_time =
                TsTzSpanSet::from_spans(at.iter().map(|s| s.timespan()).collect());
            let rest = TsTzSpanSet::from(self.timespan()).minus(&at_time);
            if rest.is_empty() {
                return vec![];
            }
            self.at_tstzspanset_seqs(&rest)
        }
    }

    // ------------------------- Time restrictions -----------------------

    /// Instant at `t` ignoring bound inclusivity; `t` must lie between
    /// the first and last timestamps.
    pub(crate) fn at_timestamp_unchecked(&self, t: DateTime<Utc>) -> TInstant<T> {
        if self.is_instantaneous() || t <= self.start_timestamp() {
            return self.instants[0].with_timestamp(t);
        }
        let n = self.find_timestamp(t).expect("t is after the first instant");
        if self.instants[n].timestamp() == t {
            return self.instants[n].clone();
        }
        segment_at_timestamp(&self.instants[n], &self.instants[n + 1], self.is_linear(), t)
    }

    /// Value of the sequence at `t` as an instant, `None` outside the
    /// period.
    pub fn at_timestamp(&self, t: DateTime<Utc>) -> Option<TInstant<T>> {
        if !self.timespan().contains(&t) {
            return None;
        }
        if self.is_instantaneous() {
            return Some(self.instants[0].clone());
        }
        let n = self.find_timestamp(t)?;
        if self.instants[n].timestamp() == t {
            return Some(self.instants[n].clone());
        }
        Some(segment_at_timestamp(&self.instants[n], &self.instants[n + 1], self.is_linear(), t))
    }

    /// Complement of a timestamp: at most two sequences.
    pub fn minus_timestamp(&self, t: DateTime<Utc>) -> Vec<Self> {
        if !self.timespan().contains(&t) {
            return vec![self.clone()];
        }
        if self.is_instantaneous() {
            return vec![];
        }
        let linear = self.is_linear();
        let mut result = Vec::new();
        let n = self.find_timestamp(t).expect("t is inside the period");
        // Portion before t.
        if n != 0 || self.instants[0].timestamp() < t {
            let mut instants: Vec<TInstant<T>> = self.instants[..=n].to_vec();
            if self.instants[n].timestamp() == t {
                if !linear {
                    let prev_value = instants[n - 1].clone();
                    instants[n] = prev_value.with_timestamp(t);
                }
            } else {
                instants.push(if linear {
                    segment_at_timestamp(&self.instants[n], &self.instants[n + 1], true, t)
                } else {
                    self.instants[n].with_timestamp(t)
                });
            }
            result.push(Self::make(instants, self.lower_inc, false, self.interp, false));
        }
        // Portion after t.
        if t < self.end_timestamp() {
            let mut instants = vec![segment_at_timestamp(
                &self.instants[n],
                &self.instants[n + 1],
                linear,
                t,
            )];
            instants.extend_from_slice(&self.instants[n + 1..]);
            result.push(Self::make(instants, false, self.upper_inc, self.interp, false));
        }
        result
    }

    /// Restriction to a timestamp set.
    pub fn at_tstzset(&self, set: &TsTzSet) -> Option<TInstantSet<T>> {
        if !self.timespan().overlaps(&set.to_span()) {
            return None;
        }
        let instants: Vec<TInstant<T>> = set
            .timestamps()
            .iter()
            .filter_map(|t| self.at_timestamp(*t))
            .collect();
        if instants.is_empty() {
            None
        } else {
            Some(TInstantSet::from_validated(instants))
        }
    }

    /// Complement of a timestamp set.
    pub fn minus_tstzset(&self, set: &TsTzSet) -> Vec<Self> {
        let mut result: Vec<Self> = vec![self.clone()];
        for t in set.timestamps() {
            let mut next = Vec::new();
            for seq in result {
                next.extend(seq.minus_timestamp(*t));
            }
            result = next;
            if result.is_empty() {
                break;
            }
        }
        result
    }

    /// Restriction to a period.
    pub fn at_tstzspan(&self, span: &TsTzSpan) -> Option<Self> {
        if !self.timespan().overlaps(span) {
            return None;
        }
        if self.is_instantaneous() {
            return Some(self.clone());
        }
        let inter = self.timespan().intersection(span)?;
        if inter.lower() == inter.upper() {
            let inst = self.at_timestamp(inter.lower())?;
            return Some(Self::from_instant(inst, self.interp));
        }
        let linear = self.is_linear();
        let n = self.find_timestamp(inter.lower()).unwrap_or(0);
        let mut instants: Vec<TInstant<T>> = Vec::new();
        instants.push(segment_at_timestamp(
            &self.instants[n],
            &self.instants[(n + 1).min(self.instants.len() - 1)],
            linear,
            inter.lower(),
        ));
        for inst in &self.instants[n + 1..] {
            if inst.timestamp() >= inter.upper() {
                break;
            }
            if inst.timestamp() > inter.lower() {
                instants.push(inst.clone());
            }
        }
        let m = self.find_timestamp(inter.upper()).expect("upper is inside the period");
        let last = if linear || inter.is_upper_inclusive() {
            segment_at_timestamp(
                &self.instants[m],
                &self.instants[(m + 1).min(self.instants.len() - 1)],
                linear,
                inter.upper(),
            )
        } else {
            instants[instants.len() - 1].with_timestamp(inter.upper())
        };
        instants.push(last);
        Some(Self::make(
            instants,
            inter.is_lower_inclusive(),
            inter.is_upper_inclusive(),
            self.interp,
            false,
        ))
    }

    /// Complement of a period: at most two sequences.
    pub fn minus_tstzspan(&self, span: &TsTzSpan) -> Vec<Self> {
        if !self.timespan().overlaps(span) {
            return vec![self.clone()];
        }
        if self.is_instantaneous() {
            return vec![];
        }
        self.timespan()
            .minus(span)
            .iter()
            .filter_map(|p| self.at_tstzspan(p))
            .collect()
    }

    /// Restriction to a period set, as raw sequences.
    pub(crate) fn at_tstzspanset_seqs(&self, spans: &TsTzSpanSet) -> Vec<Self> {
        if self.is_instantaneous() {
            if spans.contains(&self.start_timestamp()) {
                return vec![self.clone()];
            }
            return vec![];
        }
        spans.spans().iter().filter_map(|p| self.at_tstzspan(p)).collect()
    }

    /// Complement of a period set, as raw sequences.
    pub(crate) fn minus_tstzspanset_seqs(&self, spans: &TsTzSpanSet) -> Vec<Self> {
        let rest = TsTzSpanSet::from(self.timespan()).minus(spans);
        if rest.is_empty() {
            return vec![];
        }
        self.at_tstzspanset_seqs(&rest)
    }

    // ------------------------- Ever / always ---------------------------

    /// Whether the sequence takes `value` at some instant of its domain.
    pub fn ever_eq(&self, value: &T) -> bool {
        if self.instants.iter().any(|i| i.value() == value) {
            return true;
        }
        if self.is_linear() {
            for pair in self.instants.windows(2) {
                if linear_crossing_value(&pair[0], &pair[1], value).is_some() {
                    return true;
                }
            }
        }
        false
    }

    /// Whether the sequence takes `value` at every instant of its domain.
    pub fn always_eq(&self, value: &T) -> bool {
        // In normal form a constant curve keeps a single value per
        // segment, so the composing instants decide.
        self.instants.iter().all(|i| i.value() == value)
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
        w.bool(self.lower_inc);
        w.bool(self.upper_inc);
        w.bool(self.is_linear());
        for inst in &self.instants {
            inst.write_wire(w);
        }
    }

    pub(crate) fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        let count = r.u32()? as usize;
        let lower_inc = r.bool()?;
        let upper_inc = r.bool()?;
        let linear = r.bool()?;
        let mut instants = Vec::with_capacity(count);
        for _ in 0..count {
            instants.push(TInstant::read_wire(r)?);
        }
        let interp = if linear { TInterpolation::Linear } else { TInterpolation::Stepwise };
        Self::new_with_bounds(instants, lower_inc, upper_inc, interp, false)
    }

    pub(crate) fn fmt_component(&self, f: &mut fmt::Formatter<'_>, component: bool) -> fmt::Result {
        if !component && T::CONTINUOUS && !self.is_linear() {
            write!(f, "Interp=Stepwise;")?;
        }
        write!(f, "{}", if self.lower_inc { '[' } else { '(' })?;
        for (i, inst) in self.instants.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{inst}")?;
        }
        write!(f, "{}", if self.upper_inc { ']' } else { ')' })
    }

    pub(crate) fn parse_component(s: &str, interp: TInterpolation) -> Result<Self, ParseError> {
        let s = s.trim();
        let mut chars = s.chars();
        let lower_inc = match chars.next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(ParseError::new("sequence", format!("missing opening bound in {s:?}"))),
        };
        let upper_inc = match s.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(ParseError::new("sequence", format!("missing closing bound in {s:?}"))),
        };
        let inner = &s[1..s.len() - 1];
        let mut instants = Vec::new();
        for part in split_top_level(inner, ',') {
            instants.push(part.trim().parse::<TInstant<T>>()?);
        }
        Self::new_with_bounds(instants, lower_inc, upper_inc, interp, true)
            .map_err(|e| ParseError::new("sequence", e.to_string()))
    }
}

impl<T: BaseType + PartialOrd> TSequence<T> {
    /// Instant carrying the smallest value; the earliest wins ties.
    pub fn min_instant(&self) -> &TInstant<T> {
        let mut best = &self.instants[0];
        for inst in &self.instants[1..] {
            if inst.cmp_values(best) == std::cmp::Ordering::Less {
                best = inst;
            }
        }
        best
    }

    /// Instant carrying the largest value; the earliest wins ties.
    pub fn max_instant(&self) -> &TInstant<T> {
        let mut best = &self.instants[0];
        for inst in &self.instants[1..] {
            if inst.cmp_values(best) == std::cmp::Ordering::Greater {
                best = inst;
            }
        }
        best
    }

    pub fn min_value(&self) -> &T {
        self.min_instant().value()
    }

    pub fn max_value(&self) -> &T {
        self.max_instant().value()
    }

    /// Whether some value of the domain is `< value`. Linear curves reach
    /// their extremes at the composing instants.
    pub fn ever_lt(&self, value: &T) -> bool {
        self.instants.iter().any(|i| i.value() < value)
    }

    pub fn ever_le(&self, value: &T) -> bool {
        self.instants.iter().any(|i| i.value() <= value)
    }

    pub fn always_lt(&self, value: &T) -> bool {
        if self.is_linear() {
            // An endpoint may touch `value` when its bound is exclusive.
            self.instants.iter().enumerate().all(|(k, i)| {
                let at_exclusive_bound = (k == 0 && !self.lower_inc)
                    || (k == self.instants.len() - 1 && !self.upper_inc);
                i.value() < value || (at_exclusive_bound && i.value() <= value)
            })
        } else {
            self.instants.iter().all(|i| i.value() < value)
        }
    }

    pub fn always_le(&self, value: &T) -> bool {
        self.instants.iter().all(|i| i.value() <= value)
    }
}

impl<T: BaseType> Hash for TSequence<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.lower_inc as u8);
        state.write_u8(self.upper_inc as u8);
        state.write_u8(self.is_linear() as u8);
        for inst in &self.instants {
            inst.hash(state);
        }
    }
}

impl<T: BaseType> fmt::Display for TSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_component(f, false)
    }
}

impl<T: BaseType> FromStr for TSequence<T> {
    type Err = ParseError;

    /// Parses the `[v1@t1, v2@t2)` form with an optional
    /// `Interp=Stepwise;` prefix.
    ///
    /// ## Example
    /// ```
    /// # use tempus::TFloatSeq;
    /// # use std::str::FromStr;
    /// let seq = TFloatSeq::from_str("[1@2000-01-01, 2@2000-01-02)").unwrap();
    /// assert_eq!(seq.num_instants(), 2);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (interp, rest) = match s.strip_prefix("Interp=Stepwise;") {
            Some(rest) => (TInterpolation::Stepwise, rest),
            None => (
                if T::CONTINUOUS { TInterpolation::Linear } else { TInterpolation::Stepwise },
                s,
            ),
        };
        Self::parse_component(rest, interp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_timestamp;

    fn seq(s: &str) -> TSequence<f64> {
        s.parse().unwrap()
    }

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn normalize_step_drops_redundant_middle() {
        let s = seq("Interp=Stepwise;[1@2000-01-01, 1@2000-01-02, 2@2000-01-03]");
        assert_eq!(s.num_instants(), 2);
        assert_eq!(s.timestamps(), vec![ts("2000-01-01"), ts("2000-01-03")]);
        assert_eq!(s.values(), vec![1.0, 2.0]);
    }

    #[test]
    fn normalize_linear_drops_collinear_middle() {
        let s = seq("[1@2000-01-01, 2@2000-01-02, 3@2000-01-03]");
        assert_eq!(s.num_instants(), 2);
        assert_eq!(s.values(), vec![1.0, 3.0]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let s = seq("[1@2000-01-01, 2@2000-01-02, 3@2000-01-03, 3@2000-01-04, 3@2000-01-05]");
        let again = TSequence::new_with_bounds(
            s.instants().to_vec(),
            s.is_lower_inclusive(),
            s.is_upper_inclusive(),
            s.interpolation(),
            true,
        )
        .unwrap();
        assert_eq!(s, again);
    }

    #[test]
    fn invalid_shapes_are_rejected() {
        assert!("[1@2000-01-01)".parse::<TSequence<f64>>().is_err());
        assert!("[1@2000-01-02, 2@2000-01-01]".parse::<TSequence<f64>>().is_err());
        assert!("Interp=Stepwise;[1@2000-01-01, 2@2000-01-02)".parse::<TSequence<f64>>().is_err());
        assert!("[t@2000-01-01, f@2000-01-02]".parse::<TSequence<bool>>().is_err());
    }

    #[test]
    fn value_at_timestamp_interpolates() {
        let s = seq("[1@2000-01-01, 5@2000-01-05]");
        assert_eq!(s.value_at_timestamp(ts("2000-01-02")), Some(2.0));
        assert_eq!(s.value_at_timestamp(ts("2000-01-05")), Some(5.0));
        assert_eq!(s.value_at_timestamp(ts("2000-01-06")), None);
        let step = seq("Interp=Stepwise;[1@2000-01-01, 5@2000-01-05]");
        assert_eq!(step.value_at_timestamp(ts("2000-01-04")), Some(1.0));
    }

    #[test]
    fn at_timestamp_matches_value_at_timestamp() {
        let s = seq("[1@2000-01-01, 5@2000-01-05, 2@2000-01-08]");
        for t in ["2000-01-01", "2000-01-03", "2000-01-05", "2000-01-07"] {
            let t = ts(t);
            assert_eq!(s.at_timestamp(t).map(|i| *i.value()), s.value_at_timestamp(t));
        }
    }

    #[test]
    fn synchronize_with_crossings_inserts_the_crossing() {
        let a = seq("[1@2000-01-01, 3@2000-01-03]");
        let b = seq("[3@2000-01-01, 1@2000-01-03]");
        let (sa, sb) = a.synchronize(&b, true).unwrap();
        assert_eq!(sa.num_instants(), 3);
        assert_eq!(sb.num_instants(), 3);
        let mid = ts("2000-01-02");
        assert_eq!(sa.instants()[1], TInstant::new(2.0, mid));
        assert_eq!(sb.instants()[1], TInstant::new(2.0, mid));
    }

    #[test]
    fn synchronize_covers_the_period_intersection() {
        let a = seq("[1@2000-01-01, 5@2000-01-05]");
        let b = seq("[0@2000-01-02, 8@2000-01-10]");
        let (sa, sb) = a.synchronize(&b, false).unwrap();
        assert_eq!(sa.timespan(), "[2000-01-02, 2000-01-05]".parse().unwrap());
        assert_eq!(sa.timespan(), sb.timespan());
        assert_eq!(sa.value_at_timestamp(ts("2000-01-02")), Some(2.0));
    }

    #[test]
    fn synchronize_disjoint_returns_none() {
        let a = seq("[1@2000-01-01, 2@2000-01-02)");
        let b = seq("[1@2000-01-03, 2@2000-01-04]");
        assert!(a.synchronize(&b, false).is_none());
    }

    #[test]
    fn at_value_on_linear_segment_hits_the_root() {
        let s = seq("[1@2000-01-01, 5@2000-01-05]");
        let at = s.restrict_value(&2.0, true);
        assert_eq!(at.len(), 1);
        assert!(at[0].is_instantaneous());
        assert_eq!(at[0].start_timestamp(), ts("2000-01-02"));
        let minus = s.restrict_value(&2.0, false);
        assert_eq!(minus.len(), 2);
        assert_eq!(minus[0].timespan(), "[2000-01-01, 2000-01-02)".parse().unwrap());
        assert_eq!(minus[1].timespan(), "(2000-01-02, 2000-01-05]".parse().unwrap());
    }

    #[test]
    fn restriction_partition_on_values() {
        let s = seq("Interp=Stepwise;[1@2000-01-01, 2@2000-01-03, 2@2000-01-05]");
        let at = s.restrict_value(&2.0, true);
        let minus = s.restrict_value(&2.0, false);
        let mut all: Vec<TSequence<f64>> = at;
        all.extend(minus);
        all.sort_by_key(|x| x.start_timestamp());
        let merged = TSequence::normalize_sequences(all);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0], s);
    }

    #[test]
    fn at_and_minus_period_partition() {
        let s = seq("[1@2000-01-01, 5@2000-01-05]");
        let span: TsTzSpan = "[2000-01-02, 2000-01-03]".parse().unwrap();
        let at = s.at_tstzspan(&span).unwrap();
        assert_eq!(at.value_at_timestamp(ts("2000-01-02")), Some(2.0));
        assert_eq!(at.value_at_timestamp(ts("2000-01-03")), Some(3.0));
        let minus = s.minus_tstzspan(&span);
        assert_eq!(minus.len(), 2);
        assert_eq!(minus[0].timespan(), "[2000-01-01, 2000-01-02)".parse().unwrap());
        assert_eq!(minus[1].timespan(), "(2000-01-03, 2000-01-05]".parse().unwrap());
    }

    #[test]
    fn minus_timestamp_splits_with_exclusive_bounds() {
        let s = seq("[1@2000-01-01, 5@2000-01-05]");
        let parts = s.minus_timestamp(ts("2000-01-03"));
        assert_eq!(parts.len(), 2);
        assert!(!parts[0].is_upper_inclusive());
        assert!(!parts[1].is_lower_inclusive());
        assert_eq!(*parts[1].start_value(), 3.0);
    }

    #[test]
    fn step_sequence_at_period_repeats_held_value() {
        let s = seq("Interp=Stepwise;[1@2000-01-01, 5@2000-01-05]");
        let at = s.at_tstzspan(&"[2000-01-02, 2000-01-04)".parse().unwrap()).unwrap();
        assert_eq!(at.values(), vec![1.0, 1.0]);
        assert!(!at.is_upper_inclusive());
    }

    #[test]
    fn sequences_join_when_lossless() {
        let a = seq("[1@2000-01-01, 2@2000-01-02)");
        let b = seq("[2@2000-01-02, 3@2000-01-03]");
        let merged = TSequence::normalize_sequences(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0], seq("[1@2000-01-01, 3@2000-01-03]"));
    }

    #[test]
    fn ever_and_always() {
        let s = seq("[1@2000-01-01, 5@2000-01-05]");
        assert!(s.ever_eq(&3.0));
        assert!(!s.ever_eq(&6.0));
        assert!(!s.always_eq(&3.0));
        assert!(s.ever_lt(&2.0));
        assert!(s.always_le(&5.0));
        assert!(!s.always_lt(&5.0));
        let open = seq("(1@2000-01-01, 5@2000-01-05)");
        assert!(open.always_lt(&5.0));
    }

    #[test]
    fn text_and_wire_round_trip() {
        for text in [
            "[1@2000-01-01, 2@2000-01-02)",
            "Interp=Stepwise;[1@2000-01-01, 2@2000-01-02, 2@2000-01-03)",
            "[1.5@2000-01-01]",
        ] {
            let s = seq(text);
            assert_eq!(seq(&s.to_string()), s);
            assert_eq!(TSequence::<f64>::from_wkb(&s.as_wkb()).unwrap(), s);
        }
    }

    #[test]
    fn shift_and_scale() {
        let s = seq("[1@2000-01-01, 3@2000-01-03]");
        let shifted = s.shift_time(TimeDelta::days(1));
        assert_eq!(shifted.start_timestamp(), ts("2000-01-02"));
        let scaled = s.scale_time(TimeDelta::days(4));
        assert_eq!(scaled.end_timestamp(), ts("2000-01-05"));
        assert_eq!(scaled.value_at_timestamp(ts("2000-01-03")), Some(2.0));
    }
}
