use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};

use crate::base::BaseType;
use crate::collections::base::collection::Collection;
use crate::collections::datetime::{TsTzSet, TsTzSpan, TsTzSpanSet};
use crate::errors::{Error, ParseError};
use crate::temporal::interpolation::TInterpolation;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tinstant_set::TInstantSet;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;
use crate::wire::{
    TemporalFlags, WireReader, WireWriter, SUBTYPE_INSTANT, SUBTYPE_INSTANT_SET,
    SUBTYPE_SEQUENCE, SUBTYPE_SEQUENCE_SET,
};

/// The four subtypes of a temporal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalSubtype {
    Instant,
    InstantSet,
    Sequence,
    SequenceSet,
}

/// A temporal value of any subtype: the working currency of the crate.
/// Operations that can change the subtype (restriction, lifting, merging)
/// take and return this enum.
#[derive(Debug, Clone, PartialEq)]
pub enum Temporal<T: BaseType> {
    Instant(TInstant<T>),
    InstantSet(TInstantSet<T>),
    Sequence(TSequence<T>),
    SequenceSet(TSequenceSet<T>),
}

impl<T: BaseType> Temporal<T> {
    // ------------------------- Accessors -------------------------------

    pub fn subtype(&self) -> TemporalSubtype {
        match self {
            Temporal::Instant(_) => TemporalSubtype::Instant,
            Temporal::InstantSet(_) => TemporalSubtype::InstantSet,
            Temporal::Sequence(_) => TemporalSubtype::Sequence,
            Temporal::SequenceSet(_) => TemporalSubtype::SequenceSet,
        }
    }

    pub fn interpolation(&self) -> Option<TInterpolation> {
        match self {
            Temporal::Instant(_) | Temporal::InstantSet(_) => None,
            Temporal::Sequence(s) => Some(s.interpolation()),
            Temporal::SequenceSet(s) => Some(s.interpolation()),
        }
    }

    pub(crate) fn is_linear(&self) -> bool {
        self.interpolation().map(TInterpolation::is_linear).unwrap_or(false)
    }

    pub fn values(&self) -> Vec<T> {
        match self {
            Temporal::Instant(i) => vec![i.value().clone()],
            Temporal::InstantSet(s) => s.values(),
            Temporal::Sequence(s) => s.values(),
            Temporal::SequenceSet(s) => s.values(),
        }
    }

    pub fn start_value(&self) -> T {
        match self {
            Temporal::Instant(i) => i.value().clone(),
            Temporal::InstantSet(s) => s.start_value().clone(),
            Temporal::Sequence(s) => s.start_value().clone(),
            Temporal::SequenceSet(s) => s.start_value().clone(),
        }
    }

    pub fn end_value(&self) -> T {
        match self {
            Temporal::Instant(i) => i.value().clone(),
            Temporal::InstantSet(s) => s.end_value().clone(),
            Temporal::Sequence(s) => s.end_value().clone(),
            Temporal::SequenceSet(s) => s.end_value().clone(),
        }
    }

    pub fn num_instants(&self) -> usize {
        match self {
            Temporal::Instant(_) => 1,
            Temporal::InstantSet(s) => s.num_instants(),
            Temporal::Sequence(s) => s.num_instants(),
            Temporal::SequenceSet(s) => s.num_instants(),
        }
    }

    pub fn instants(&self) -> Vec<TInstant<T>> {
        match self {
            Temporal::Instant(i) => vec![i.clone()],
            Temporal::InstantSet(s) => s.instants().to_vec(),
            Temporal::Sequence(s) => s.instants().to_vec(),
            Temporal::SequenceSet(s) => s.instants().into_iter().cloned().collect(),
        }
    }

    pub fn instant_n(&self, n: usize) -> Option<TInstant<T>> {
        match self {
            Temporal::Instant(i) => (n == 0).then(|| i.clone()),
            Temporal::InstantSet(s) => s.instant_n(n).cloned(),
            Temporal::Sequence(s) => s.instant_n(n).cloned(),
            Temporal::SequenceSet(s) => s.instant_n(n).cloned(),
        }
    }

    pub fn start_instant(&self) -> TInstant<T> {
        match self {
            Temporal::Instant(i) => i.clone(),
            Temporal::InstantSet(s) => s.start_instant().clone(),
            Temporal::Sequence(s) => s.start_instant().clone(),
            Temporal::SequenceSet(s) => s.start_instant().clone(),
        }
    }

    pub fn end_instant(&self) -> TInstant<T> {
        match self {
            Temporal::Instant(i) => i.clone(),
            Temporal::InstantSet(s) => s.end_instant().clone(),
            Temporal::Sequence(s) => s.end_instant().clone(),
            Temporal::SequenceSet(s) => s.end_instant().clone(),
        }
    }

    pub fn num_timestamps(&self) -> usize {
        self.timestamps().len()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        match self {
            Temporal::Instant(i) => vec![i.timestamp()],
            Temporal::InstantSet(s) => s.timestamps(),
            Temporal::Sequence(s) => s.timestamps(),
            Temporal::SequenceSet(s) => {
                let mut ts = s.timestamps();
                ts.dedup();
                ts
            }
        }
    }

    pub fn start_timestamp(&self) -> DateTime<Utc> {
        match self {
            Temporal::Instant(i) => i.timestamp(),
            Temporal::InstantSet(s) => s.start_timestamp(),
            Temporal::Sequence(s) => s.start_timestamp(),
            Temporal::SequenceSet(s) => s.start_timestamp(),
        }
    }

    pub fn end_timestamp(&self) -> DateTime<Utc> {
        match self {
            Temporal::Instant(i) => i.timestamp(),
            Temporal::InstantSet(s) => s.end_timestamp(),
            Temporal::Sequence(s) => s.end_timestamp(),
            Temporal::SequenceSet(s) => s.end_timestamp(),
        }
    }

    /// Smallest period covering the value.
    pub fn timespan(&self) -> TsTzSpan {
        match self {
            Temporal::Instant(i) => i.timespan(),
            Temporal::InstantSet(s) => s.timespan(),
            Temporal::Sequence(s) => s.timespan(),
            Temporal::SequenceSet(s) => s.timespan(),
        }
    }

    /// Exact time support as a period set.
    pub fn time(&self) -> TsTzSpanSet {
        match self {
            Temporal::Instant(i) => TsTzSpanSet::from(i.timespan()),
            Temporal::InstantSet(s) => s.time(),
            Temporal::Sequence(s) => s.time(),
            Temporal::SequenceSet(s) => s.time(),
        }
    }

    pub fn duration(&self, ignore_gaps: bool) -> TimeDelta {
        match self {
            Temporal::Instant(_) | Temporal::InstantSet(_) => TimeDelta::zero(),
            Temporal::Sequence(s) => s.duration(),
            Temporal::SequenceSet(s) => s.duration(ignore_gaps),
        }
    }

    /// Component segments; instants and instant sets have none.
    pub fn segments(&self) -> Vec<TSequence<T>> {
        match self {
            Temporal::Instant(_) | Temporal::InstantSet(_) => Vec::new(),
            Temporal::Sequence(s) => s.segments(),
            Temporal::SequenceSet(s) => s.segments(),
        }
    }

    /// Component sequences of the sequence subtypes.
    pub fn sequences(&self) -> Vec<TSequence<T>> {
        match self {
            Temporal::Instant(_) | Temporal::InstantSet(_) => Vec::new(),
            Temporal::Sequence(s) => vec![s.clone()],
            Temporal::SequenceSet(s) => s.sequences().to_vec(),
        }
    }

    pub fn value_at_timestamp(&self, t: DateTime<Utc>) -> Option<T> {
        match self {
            Temporal::Instant(i) => i.value_at_timestamp(t),
            Temporal::InstantSet(s) => s.value_at_timestamp(t),
            Temporal::Sequence(s) => s.value_at_timestamp(t),
            Temporal::SequenceSet(s) => s.value_at_timestamp(t),
        }
    }

    // ------------------------- Transformations -------------------------

    /// ## Errors
    /// `NotFound` when the value has more than one instant.
    pub fn to_instant(&self) -> Result<TInstant<T>, Error> {
        match self {
            Temporal::Instant(i) => Ok(i.clone()),
            Temporal::InstantSet(s) if s.num_instants() == 1 => Ok(s.start_instant().clone()),
            Temporal::Sequence(s) if s.num_instants() == 1 => Ok(s.start_instant().clone()),
            Temporal::SequenceSet(s) if s.num_instants() == 1 => Ok(s.start_instant().clone()),
            _ => Err(Error::NotFound("the value has more than one instant".into())),
        }
    }

    /// ## Errors
    /// `NotFound` when some sequence spans more than an instant.
    pub fn to_instant_set(&self) -> Result<TInstantSet<T>, Error> {
        match self {
            Temporal::Instant(i) => Ok(TInstantSet::from_instant(i.clone())),
            Temporal::InstantSet(s) => Ok(s.clone()),
            Temporal::Sequence(s) if s.num_instants() == 1 => {
                Ok(TInstantSet::from_instant(s.start_instant().clone()))
            }
            Temporal::SequenceSet(s)
                if s.sequences().iter().all(|q| q.num_instants() == 1) =>
            {
                TInstantSet::new(
                    s.sequences().iter().map(|q| q.start_instant().clone()).collect(),
                )
            }
            _ => Err(Error::NotFound("the value is not punctual".into())),
        }
    }

    /// ## Errors
    /// `NotFound` when the value is a sequence set with more than one
    /// component or an instant set that is not a single instant.
    pub fn to_sequence(&self, interp: TInterpolation) -> Result<TSequence<T>, Error> {
        match self {
            Temporal::Instant(i) => Ok(TSequence::from_instant(i.clone(), interp)),
            Temporal::InstantSet(s) if s.num_instants() == 1 => {
                Ok(TSequence::from_instant(s.start_instant().clone(), interp))
            }
            Temporal::Sequence(s) => Ok(s.clone()),
            Temporal::SequenceSet(s) if s.num_sequences() == 1 => Ok(s.start_sequence().clone()),
            _ => Err(Error::NotFound("the value is not time-contiguous".into())),
        }
    }

    pub fn to_sequence_set(&self, interp: TInterpolation) -> Result<TSequenceSet<T>, Error> {
        match self {
            Temporal::Instant(i) => {
                Ok(TSequenceSet::from_sequence(TSequence::from_instant(i.clone(), interp)))
            }
            Temporal::InstantSet(s) => TSequenceSet::new(
                s.instants()
                    .iter()
                    .map(|i| TSequence::from_instant(i.clone(), interp))
                    .collect(),
                false,
            ),
            Temporal::Sequence(s) => Ok(TSequenceSet::from_sequence(s.clone())),
            Temporal::SequenceSet(s) => Ok(s.clone()),
        }
    }

    /// Re-expresses the value under another interpolation. Step to linear
    /// turns every held segment into a constant linear piece; linear to
    /// step is possible only when every segment is constant.
    pub fn set_interpolation(&self, interp: TInterpolation) -> Result<Self, Error> {
        if interp.is_linear() && !T::CONTINUOUS {
            return Err(Error::Unsupported(format!(
                "linear interpolation over {} values",
                T::NAME
            )));
        }
        match self {
            Temporal::Instant(_) | Temporal::InstantSet(_) => Ok(self.clone()),
            Temporal::Sequence(s) => {
                let sequences = set_interp_sequence(s, interp)?;
                Ok(Self::from_fragments(sequences))
            }
            Temporal::SequenceSet(s) => {
                let mut sequences = Vec::new();
                for seq in s.sequences() {
                    sequences.extend(set_interp_sequence(seq, interp)?);
                }
                Ok(Self::from_fragments(sequences))
            }
        }
    }

    pub fn shift_time(&self, delta: TimeDelta) -> Self {
        match self {
            Temporal::Instant(i) => Temporal::Instant(i.shift_time(delta)),
            Temporal::InstantSet(s) => Temporal::InstantSet(s.shift_time(delta)),
            Temporal::Sequence(s) => Temporal::Sequence(s.shift_time(delta)),
            Temporal::SequenceSet(s) => Temporal::SequenceSet(s.shift_time(delta)),
        }
    }

    pub fn scale_time(&self, duration: TimeDelta) -> Result<Self, Error> {
        self.shift_scale_time(None, Some(duration))
    }

    pub fn shift_scale_time(
        &self,
        delta: Option<TimeDelta>,
        duration: Option<TimeDelta>,
    ) -> Result<Self, Error> {
        if let Some(d) = duration {
            if d <= TimeDelta::zero() {
                return Err(Error::DomainError("scaling duration must be positive".into()));
            }
        }
        Ok(match self {
            Temporal::Instant(i) => {
                Temporal::Instant(i.shift_time(delta.unwrap_or_else(TimeDelta::zero)))
            }
            Temporal::InstantSet(s) => {
                // The whole set is rescaled over its covering period.
                let seq_like: Vec<TInstant<T>> = s.instants().to_vec();
                let scaled = scale_instants(&seq_like, delta, duration);
                Temporal::InstantSet(TInstantSet::from_validated(scaled))
            }
            Temporal::Sequence(s) => Temporal::Sequence(s.shift_scale_time(delta, duration)),
            Temporal::SequenceSet(s) => {
                let whole: Vec<TInstant<T>> =
                    s.instants().into_iter().cloned().collect();
                let scaled = scale_instants(&whole, delta, duration);
                let mut sequences = Vec::new();
                let mut k = 0;
                for seq in s.sequences() {
                    let n = seq.num_instants();
                    sequences.push(TSequence::make(
                        scaled[k..k + n].to_vec(),
                        seq.is_lower_inclusive(),
                        seq.is_upper_inclusive(),
                        seq.interpolation(),
                        false,
                    ));
                    k += n;
                }
                Temporal::SequenceSet(TSequenceSet::from_normalized(sequences))
            }
        })
    }

    // ------------------------- Construction ----------------------------

    /// Wraps restriction fragments into the simplest subtype.
    pub(crate) fn from_fragments(sequences: Vec<TSequence<T>>) -> Self {
        debug_assert!(!sequences.is_empty());
        if sequences.len() == 1 {
            Temporal::Sequence(sequences.into_iter().next().expect("one element"))
        } else {
            Temporal::SequenceSet(TSequenceSet::from_normalized(
                TSequence::normalize_sequences(sequences),
            ))
        }
    }

    /// Merges this value with others into a single temporal value; the
    /// inputs must agree wherever their supports intersect.
    ///
    /// ## Errors
    /// `ShapeViolation` when two inputs disagree at a shared instant or
    /// their sequences overlap.
    pub fn merge(&self, others: &[Self]) -> Result<Self, Error> {
        let mut all = vec![self.clone()];
        all.extend_from_slice(others);
        Self::from_merge(all)
    }

    pub fn from_merge(values: Vec<Self>) -> Result<Self, Error> {
        if values.is_empty() {
            return Err(Error::ShapeViolation("nothing to merge".into()));
        }
        let sequence_like = values
            .iter()
            .any(|v| matches!(v, Temporal::Sequence(_) | Temporal::SequenceSet(_)));
        if !sequence_like {
            let mut instants = Vec::new();
            for v in &values {
                match v {
                    Temporal::Instant(i) => instants.push(i.clone()),
                    Temporal::InstantSet(s) => instants.extend_from_slice(s.instants()),
                    _ => unreachable!("no sequences in this branch"),
                }
            }
            let merged = TInstantSet::from_merge(instants)?;
            return Ok(if merged.num_instants() == 1 {
                Temporal::Instant(merged.start_instant().clone())
            } else {
                Temporal::InstantSet(merged)
            });
        }
        // With at least one sequence around, everything becomes a
        // sequence; instants ride along as instantaneous sequences.
        let interp = values
            .iter()
            .filter_map(|v| v.interpolation())
            .next()
            .expect("a sequence is present");
        let mut sequences: Vec<TSequence<T>> = Vec::new();
        for v in &values {
            sequences.extend(v.to_sequence_set(interp)?.sequences().iter().cloned());
        }
        sequences.sort_by(|a, b| {
            a.start_timestamp()
                .cmp(&b.start_timestamp())
                .then(a.end_timestamp().cmp(&b.end_timestamp()))
        });
        // Merging tolerates duplicated boundary instants with equal
        // values but not genuine overlap.
        for pair in sequences.windows(2) {
            let left = pair[0].timespan();
            let right = pair[1].timespan();
            if !left.is_left(&right) {
                let boundary_only = pair[0].end_timestamp() == pair[1].start_timestamp();
                let agrees = boundary_only
                    && pair[0].end_value() == pair[1].start_value();
                if !agrees {
                    return Err(Error::ShapeViolation(format!(
                        "merged sequences {} and {} overlap",
                        pair[0], pair[1]
                    )));
                }
            }
        }
        let merged = TSequence::normalize_sequences(sequences);
        Ok(if merged.len() == 1 {
            let seq = merged.into_iter().next().expect("one element");
            if seq.num_instants() == 1 {
                Temporal::Instant(seq.start_instant().clone())
            } else {
                Temporal::Sequence(seq)
            }
        } else {
            Temporal::SequenceSet(TSequenceSet::from_normalized(merged))
        })
    }

    pub fn append_instant(&self, instant: TInstant<T>) -> Result<Self, Error> {
        match self {
            Temporal::Instant(i) => {
                Ok(Temporal::InstantSet(TInstantSet::from_merge(vec![i.clone(), instant])?))
            }
            Temporal::InstantSet(s) => {
                let mut instants = s.instants().to_vec();
                instants.push(instant);
                Ok(Temporal::InstantSet(TInstantSet::from_merge(instants)?))
            }
            Temporal::Sequence(s) => Ok(Temporal::Sequence(s.append_instant(instant)?)),
            Temporal::SequenceSet(s) => {
                let mut sequences = s.sequences().to_vec();
                let last = sequences.pop().expect("sequence sets are never empty");
                sequences.push(last.append_instant(instant)?);
                Ok(Temporal::SequenceSet(TSequenceSet::from_normalized(sequences)))
            }
        }
    }

    pub fn append_sequence(&self, sequence: TSequence<T>) -> Result<Self, Error> {
        let interp = sequence.interpolation();
        let mut sequences: Vec<TSequence<T>> =
            self.to_sequence_set(interp)?.sequences().to_vec();
        sequences.push(sequence);
        TSequenceSet::new(sequences, true).map(Temporal::SequenceSet)
    }

    // ------------------------- Ever / always ---------------------------

    /// Whether the value ever equals `value`.
    pub fn ever_eq(&self, value: &T) -> bool {
        match self {
            Temporal::Instant(i) => i.value() == value,
            Temporal::InstantSet(s) => s.instants().iter().any(|i| i.value() == value),
            Temporal::Sequence(s) => s.ever_eq(value),
            Temporal::SequenceSet(s) => s.ever_eq(value),
        }
    }

    /// Whether the value always equals `value`.
    pub fn always_eq(&self, value: &T) -> bool {
        match self {
            Temporal::Instant(i) => i.value() == value,
            Temporal::InstantSet(s) => s.instants().iter().all(|i| i.value() == value),
            Temporal::Sequence(s) => s.always_eq(value),
            Temporal::SequenceSet(s) => s.always_eq(value),
        }
    }

    pub fn ever_ne(&self, value: &T) -> bool {
        !self.always_eq(value)
    }

    pub fn always_ne(&self, value: &T) -> bool {
        !self.ever_eq(value)
    }

    // ------------------------- Restrictions ----------------------------

    pub fn at_value(&self, value: &T) -> Option<Self> {
        match self {
            Temporal::Instant(i) => i.at_value(value).map(Temporal::Instant),
            Temporal::InstantSet(s) => s.at_value(value).map(Temporal::InstantSet),
            Temporal::Sequence(s) => {
                TSequenceSet::from_fragments(s.restrict_value(value, true), true)
                    .map(Temporal::SequenceSet)
            }
            Temporal::SequenceSet(s) => s.at_value(value).map(Temporal::SequenceSet),
        }
    }

    pub fn minus_value(&self, value: &T) -> Option<Self> {
        match self {
            Temporal::Instant(i) => i.minus_value(value).map(Temporal::Instant),
            Temporal::InstantSet(s) => s.minus_value(value).map(Temporal::InstantSet),
            Temporal::Sequence(s) => {
                TSequenceSet::from_fragments(s.restrict_value(value, false), true)
                    .map(Temporal::SequenceSet)
            }
            Temporal::SequenceSet(s) => s.minus_value(value).map(Temporal::SequenceSet),
        }
    }

    pub fn at_values(&self, values: &[T]) -> Option<Self> {
        match self {
            Temporal::Instant(i) => i.at_values(values).map(Temporal::Instant),
            Temporal::InstantSet(s) => s.at_values(values).map(Temporal::InstantSet),
            Temporal::Sequence(s) => {
                TSequenceSet::from_fragments(s.restrict_values(values, true), true)
                    .map(Temporal::SequenceSet)
            }
            Temporal::SequenceSet(s) => s.at_values(values).map(Temporal::SequenceSet),
        }
    }

    pub fn minus_values(&self, values: &[T]) -> Option<Self> {
        match self {
            Temporal::Instant(i) => i.minus_values(values).map(Temporal::Instant),
            Temporal::InstantSet(s) => s.minus_values(values).map(Temporal::InstantSet),
            Temporal::Sequence(s) => {
                TSequenceSet::from_fragments(s.restrict_values(values, false), true)
                    .map(Temporal::SequenceSet)
            }
            Temporal::SequenceSet(s) => s.minus_values(values).map(Temporal::SequenceSet),
        }
    }

    pub fn at_timestamp(&self, t: DateTime<Utc>) -> Option<Self> {
        match self {
            Temporal::Instant(i) => i.at_timestamp(t).map(Temporal::Instant),
            Temporal::InstantSet(s) => s.at_timestamp(t).map(Temporal::Instant),
            Temporal::Sequence(s) => s.at_timestamp(t).map(Temporal::Instant),
            Temporal::SequenceSet(s) => s.at_timestamp(t).map(Temporal::Instant),
        }
    }

    pub fn minus_timestamp(&self, t: DateTime<Utc>) -> Option<Self> {
        match self {
            Temporal::Instant(i) => i.minus_timestamp(t).map(Temporal::Instant),
            Temporal::InstantSet(s) => s.minus_timestamp(t).map(Temporal::InstantSet),
            Temporal::Sequence(s) => {
                TSequenceSet::from_fragments(s.minus_timestamp(t), false)
                    .map(Temporal::SequenceSet)
            }
            Temporal::SequenceSet(s) => s.minus_timestamp(t).map(Temporal::SequenceSet),
        }
    }

    pub fn at_tstzset(&self, set: &TsTzSet) -> Option<Self> {
        match self {
            Temporal::Instant(i) => i.at_tstzset(set).map(Temporal::Instant),
            Temporal::InstantSet(s) => s.at_tstzset(set).map(Temporal::InstantSet),
            Temporal::Sequence(s) => s.at_tstzset(set).map(Temporal::InstantSet),
            Temporal::SequenceSet(s) => s.at_tstzset(set).map(Temporal::InstantSet),
        }
    }

    pub fn minus_tstzset(&self, set: &TsTzSet) -> Option<Self> {
        match self {
            Temporal::Instant(i) => i.minus_tstzset(set).map(Temporal::Instant),
            Temporal::InstantSet(s) => s.minus_tstzset(set).map(Temporal::InstantSet),
            Temporal::Sequence(s) => {
                TSequenceSet::from_fragments(s.minus_tstzset(set), false)
                    .map(Temporal::SequenceSet)
            }
            Temporal::SequenceSet(s) => s.minus_tstzset(set).map(Temporal::SequenceSet),
        }
    }

    pub fn at_tstzspan(&self, span: &TsTzSpan) -> Option<Self> {
        match self {
            Temporal::Instant(i) => i.at_tstzspan(span).map(Temporal::Instant),
            Temporal::InstantSet(s) => s.at_tstzspan(span).map(Temporal::InstantSet),
            Temporal::Sequence(s) => s.at_tstzspan(span).map(Temporal::Sequence),
            Temporal::SequenceSet(s) => s.at_tstzspan(span).map(Temporal::SequenceSet),
        }
    }

    pub fn minus_tstzspan(&self, span: &TsTzSpan) -> Option<Self> {
        match self {
            Temporal::Instant(i) => i.minus_tstzspan(span).map(Temporal::Instant),
            Temporal::InstantSet(s) => s.minus_tstzspan(span).map(Temporal::InstantSet),
            Temporal::Sequence(s) => {
                TSequenceSet::from_fragments(s.minus_tstzspan(span), false)
                    .map(Temporal::SequenceSet)
            }
            Temporal::SequenceSet(s) => s.minus_tstzspan(span).map(Temporal::SequenceSet),
        }
    }

    pub fn at_tstzspanset(&self, spans: &TsTzSpanSet) -> Option<Self> {
        match self {
            Temporal::Instant(i) => i.at_tstzspanset(spans).map(Temporal::Instant),
            Temporal::InstantSet(s) => s.at_tstzspanset(spans).map(Temporal::InstantSet),
            Temporal::Sequence(s) => {
                TSequenceSet::from_fragments(s.at_tstzspanset_seqs(spans), false)
                    .map(Temporal::SequenceSet)
            }
            Temporal::SequenceSet(s) => s.at_tstzspanset(spans).map(Temporal::SequenceSet),
        }
    }

    pub fn minus_tstzspanset(&self, spans: &TsTzSpanSet) -> Option<Self> {
        match self {
            Temporal::Instant(i) => i.minus_tstzspanset(spans).map(Temporal::Instant),
            Temporal::InstantSet(s) => s.minus_tstzspanset(spans).map(Temporal::InstantSet),
            Temporal::Sequence(s) => {
                TSequenceSet::from_fragments(s.minus_tstzspanset_seqs(spans), false)
                    .map(Temporal::SequenceSet)
            }
            Temporal::SequenceSet(s) => s.minus_tstzspanset(spans).map(Temporal::SequenceSet),
        }
    }

    // ------------------------- Input / output --------------------------

    pub fn as_wkb(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        let mut flags = TemporalFlags::none();
        if self.is_linear() {
            flags |= TemporalFlags::Linear;
        }
        if T::CONTINUOUS {
            flags |= TemporalFlags::Continuous;
        }
        flags |= TemporalFlags::HasX;
        flags |= TemporalFlags::HasT;
        match self {
            Temporal::Instant(i) => {
                w.u8(SUBTYPE_INSTANT);
                w.u8(flags.into());
                i.write_wire(&mut w);
            }
            Temporal::InstantSet(s) => {
                w.u8(SUBTYPE_INSTANT_SET);
                w.u8(flags.into());
                s.write_wire(&mut w);
            }
            Temporal::Sequence(s) => {
                w.u8(SUBTYPE_SEQUENCE);
                w.u8(flags.into());
                s.write_wire(&mut w);
            }
            Temporal::SequenceSet(s) => {
                w.u8(SUBTYPE_SEQUENCE_SET);
                w.u8(flags.into());
                s.write_wire(&mut w);
            }
        }
        w.finish()
    }

    pub fn from_wkb(buf: &[u8]) -> Result<Self, Error> {
        let mut r = WireReader::new(buf);
        let subtype = r.u8()?;
        let _flags = r.u8()?;
        match subtype {
            SUBTYPE_INSTANT => Ok(Temporal::Instant(TInstant::read_wire(&mut r)?)),
            SUBTYPE_INSTANT_SET => Ok(Temporal::InstantSet(TInstantSet::read_wire(&mut r)?)),
            SUBTYPE_SEQUENCE => Ok(Temporal::Sequence(TSequence::read_wire(&mut r)?)),
            SUBTYPE_SEQUENCE_SET => Ok(Temporal::SequenceSet(TSequenceSet::read_wire(&mut r)?)),
            other => Err(Error::ShapeViolation(format!("unknown subtype tag {other}"))),
        }
    }
}

fn scale_instants<T: BaseType>(
    instants: &[TInstant<T>],
    delta: Option<TimeDelta>,
    duration: Option<TimeDelta>,
) -> Vec<TInstant<T>> {
    use crate::utils::{from_micros, to_micros};
    let old_start = to_micros(&instants[0].timestamp());
    let old_span = to_micros(&instants[instants.len() - 1].timestamp()) - old_start;
    let new_start = old_start + delta.and_then(|d| d.num_microseconds()).unwrap_or(0);
    let new_span = duration.and_then(|d| d.num_microseconds()).unwrap_or(old_span);
    instants
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
        .collect()
}

fn set_interp_sequence<T: BaseType>(
    seq: &TSequence<T>,
    interp: TInterpolation,
) -> Result<Vec<TSequence<T>>, Error> {
    if seq.interpolation() == interp || seq.is_instantaneous() {
        let mut out = seq.clone();
        if seq.interpolation() != interp {
            out = TSequence::make(seq.instants().to_vec(), true, true, interp, false);
        }
        return Ok(vec![out]);
    }
    if interp.is_linear() {
        // Each held segment becomes a constant linear piece; the jump at
        // each boundary turns into an exclusive bound.
        let instants = seq.instants();
        let mut result = Vec::with_capacity(instants.len());
        let mut lower_inc = seq.is_lower_inclusive();
        for (k, pair) in instants.windows(2).enumerate() {
            let last = k == instants.len() - 2;
            let value1 = pair[0].value().clone();
            let upper_inc = if last {
                seq.is_upper_inclusive() && value1 == *pair[1].value()
            } else {
                false
            };
            result.push(TSequence::make(
                vec![pair[0].clone(), pair[0].with_timestamp(pair[1].timestamp())],
                lower_inc,
                upper_inc,
                TInterpolation::Linear,
                false,
            ));
            if last && seq.is_upper_inclusive() && value1 != *pair[1].value() {
                result.push(TSequence::from_instant(pair[1].clone(), TInterpolation::Linear));
            }
            lower_inc = true;
        }
        Ok(result)
    } else {
        // Linear to step works only for piecewise constant curves.
        let constant = seq.instants().windows(2).all(|p| p[0].value() == p[1].value());
        if !constant {
            return Err(Error::NotFound(
                "a non-constant linear sequence has no step form".into(),
            ));
        }
        Ok(vec![TSequence::make(
            seq.instants().to_vec(),
            seq.is_lower_inclusive(),
            seq.is_upper_inclusive(),
            TInterpolation::Stepwise,
            false,
        )])
    }
}

impl<T: BaseType + PartialOrd> Temporal<T> {
    pub fn min_value(&self) -> T {
        match self {
            Temporal::Instant(i) => i.value().clone(),
            Temporal::InstantSet(s) => s.min_value().clone(),
            Temporal::Sequence(s) => s.min_value().clone(),
            Temporal::SequenceSet(s) => s.min_value().clone(),
        }
    }

    pub fn max_value(&self) -> T {
        match self {
            Temporal::Instant(i) => i.value().clone(),
            Temporal::InstantSet(s) => s.max_value().clone(),
            Temporal::Sequence(s) => s.max_value().clone(),
            Temporal::SequenceSet(s) => s.max_value().clone(),
        }
    }

    /// Earliest instant carrying the minimum value.
    pub fn min_instant(&self) -> TInstant<T> {
        let min = self.min_value();
        self.instants()
            .into_iter()
            .find(|i| *i.value() == min)
            .expect("the minimum is attained")
    }

    pub fn max_instant(&self) -> TInstant<T> {
        let max = self.max_value();
        self.instants()
            .into_iter()
            .find(|i| *i.value() == max)
            .expect("the maximum is attained")
    }

    /// Restriction to the instants where the minimum value is attained.
    pub fn at_min(&self) -> Option<Self> {
        self.at_value(&self.min_value())
    }

    pub fn at_max(&self) -> Option<Self> {
        self.at_value(&self.max_value())
    }

    pub fn ever_lt(&self, value: &T) -> bool {
        match self {
            Temporal::Instant(i) => i.value() < value,
            Temporal::InstantSet(s) => s.instants().iter().any(|i| i.value() < value),
            Temporal::Sequence(s) => s.ever_lt(value),
            Temporal::SequenceSet(s) => s.ever_lt(value),
        }
    }

    pub fn always_lt(&self, value: &T) -> bool {
        match self {
            Temporal::Instant(i) => i.value() < value,
            Temporal::InstantSet(s) => s.instants().iter().all(|i| i.value() < value),
            Temporal::Sequence(s) => s.always_lt(value),
            Temporal::SequenceSet(s) => s.always_lt(value),
        }
    }

    pub fn ever_le(&self, value: &T) -> bool {
        match self {
            Temporal::Instant(i) => i.value() <= value,
            Temporal::InstantSet(s) => s.instants().iter().any(|i| i.value() <= value),
            Temporal::Sequence(s) => s.ever_le(value),
            Temporal::SequenceSet(s) => s.ever_le(value),
        }
    }

    pub fn always_le(&self, value: &T) -> bool {
        match self {
            Temporal::Instant(i) => i.value() <= value,
            Temporal::InstantSet(s) => s.instants().iter().all(|i| i.value() <= value),
            Temporal::Sequence(s) => s.always_le(value),
            Temporal::SequenceSet(s) => s.always_le(value),
        }
    }

    pub fn ever_gt(&self, value: &T) -> bool {
        !self.always_le(value)
    }

    pub fn always_gt(&self, value: &T) -> bool {
        !self.ever_le(value)
    }

    pub fn ever_ge(&self, value: &T) -> bool {
        !self.always_lt(value)
    }

    pub fn always_ge(&self, value: &T) -> bool {
        !self.ever_lt(value)
    }
}

impl<T: BaseType> Collection for Temporal<T> {
    type Type = T;

    /// Containment and position operators work on the time dimension;
    /// element containment asks whether the value is ever taken.
    fn is_contained_in(&self, container: &Self) -> bool {
        self.timespan().is_contained_in(&container.timespan())
    }

    fn contains(&self, content: &T) -> bool {
        self.ever_eq(content)
    }

    fn overlaps(&self, other: &Self) -> bool {
        self.time().overlaps(&other.time())
    }

    fn is_left(&self, other: &Self) -> bool {
        self.timespan().is_left(&other.timespan())
    }

    fn is_over_or_left(&self, other: &Self) -> bool {
        self.timespan().is_over_or_left(&other.timespan())
    }

    fn is_over_or_right(&self, other: &Self) -> bool {
        self.timespan().is_over_or_right(&other.timespan())
    }

    fn is_right(&self, other: &Self) -> bool {
        self.timespan().is_right(&other.timespan())
    }

    fn is_adjacent(&self, other: &Self) -> bool {
        self.timespan().is_adjacent(&other.timespan())
    }
}

impl<T: BaseType> From<TInstant<T>> for Temporal<T> {
    fn from(value: TInstant<T>) -> Self {
        Temporal::Instant(value)
    }
}

impl<T: BaseType> From<TInstantSet<T>> for Temporal<T> {
    fn from(value: TInstantSet<T>) -> Self {
        Temporal::InstantSet(value)
    }
}

impl<T: BaseType> From<TSequence<T>> for Temporal<T> {
    fn from(value: TSequence<T>) -> Self {
        Temporal::Sequence(value)
    }
}

impl<T: BaseType> From<TSequenceSet<T>> for Temporal<T> {
    fn from(value: TSequenceSet<T>) -> Self {
        Temporal::SequenceSet(value)
    }
}

impl<T: BaseType> Hash for Temporal<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Temporal::Instant(i) => {
                state.write_u8(SUBTYPE_INSTANT);
                i.hash(state);
            }
            Temporal::InstantSet(s) => {
                state.write_u8(SUBTYPE_INSTANT_SET);
                s.hash(state);
            }
            Temporal::Sequence(s) => {
                state.write_u8(SUBTYPE_SEQUENCE);
                s.hash(state);
            }
            Temporal::SequenceSet(s) => {
                state.write_u8(SUBTYPE_SEQUENCE_SET);
                s.hash(state);
            }
        }
    }
}

impl<T: BaseType + PartialOrd> PartialOrd for Temporal<T> {
    /// Lexicographic order on the (timestamp, value) support, then on the
    /// subtype tag.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let a = self.instants();
        let b = other.instants();
        for (x, y) in a.iter().zip(b.iter()) {
            let c = x
                .timestamp()
                .cmp(&y.timestamp())
                .then_with(|| x.cmp_values(y));
            if c != Ordering::Equal {
                return Some(c);
            }
        }
        Some(
            a.len()
                .cmp(&b.len())
                .then_with(|| (self.subtype() as u8).cmp(&(other.subtype() as u8))),
        )
    }
}

impl<T: BaseType> fmt::Display for Temporal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temporal::Instant(i) => write!(f, "{i}"),
            Temporal::InstantSet(s) => write!(f, "{s}"),
            Temporal::Sequence(s) => write!(f, "{s}"),
            Temporal::SequenceSet(s) => write!(f, "{s}"),
        }
    }
}

impl<T: BaseType> FromStr for Temporal<T> {
    type Err = ParseError;

    /// Parses any of the four subtype literal forms.
    ///
    /// ## Example
    /// ```
    /// # use tempus::{TFloat, TemporalSubtype};
    /// # use std::str::FromStr;
    /// let inst = TFloat::from_str("1.5@2000-01-01").unwrap();
    /// assert_eq!(inst.subtype(), TemporalSubtype::Instant);
    /// let seq = TFloat::from_str("[1@2000-01-01, 2@2000-01-02]").unwrap();
    /// assert_eq!(seq.subtype(), TemporalSubtype::Sequence);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix("Interp=Stepwise;").unwrap_or(trimmed).trim_start();
        match body.chars().next() {
            Some('{') => {
                let inner = body[1..].trim_start();
                if inner.starts_with('[') || inner.starts_with('(') {
                    Ok(Temporal::SequenceSet(trimmed.parse()?))
                } else {
                    Ok(Temporal::InstantSet(trimmed.parse()?))
                }
            }
            Some('[') | Some('(') => Ok(Temporal::Sequence(trimmed.parse()?)),
            Some(_) => Ok(Temporal::Instant(trimmed.parse()?)),
            None => Err(ParseError::new("temporal", "empty input".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_timestamp;

    fn t(s: &str) -> Temporal<f64> {
        s.parse().unwrap()
    }

    #[test]
    fn parse_dispatches_on_shape() {
        assert_eq!(t("1@2000-01-01").subtype(), TemporalSubtype::Instant);
        assert_eq!(t("{1@2000-01-01, 2@2000-01-02}").subtype(), TemporalSubtype::InstantSet);
        assert_eq!(t("[1@2000-01-01, 2@2000-01-02]").subtype(), TemporalSubtype::Sequence);
        assert_eq!(
            t("{[1@2000-01-01, 2@2000-01-02]}").subtype(),
            TemporalSubtype::SequenceSet
        );
    }

    #[test]
    fn restriction_partition_property() {
        let x = t("[1@2000-01-01, 5@2000-01-05]");
        let span: TsTzSpan = "[2000-01-02, 2000-01-04]".parse().unwrap();
        let at = x.at_tstzspan(&span).unwrap();
        let minus = x.minus_tstzspan(&span).unwrap();
        let merged = at.merge(&[minus]).unwrap();
        assert_eq!(merged, x);
    }

    #[test]
    fn restriction_partition_at_value() {
        let x = t("[1@2000-01-01, 5@2000-01-05]");
        let at = x.at_value(&3.0).unwrap();
        let minus = x.minus_value(&3.0).unwrap();
        let merged = at.merge(&[minus]).unwrap();
        assert_eq!(merged, x);
    }

    #[test]
    fn merge_of_instants_builds_an_instant_set() {
        let a = t("1@2000-01-01");
        let b = t("2@2000-01-02");
        let merged = a.merge(&[b]).unwrap();
        assert_eq!(merged.subtype(), TemporalSubtype::InstantSet);
        assert_eq!(merged.num_instants(), 2);
    }

    #[test]
    fn merge_rejects_conflicting_overlap() {
        let a = t("[1@2000-01-01, 2@2000-01-03]");
        let b = t("[5@2000-01-02, 6@2000-01-04]");
        assert!(a.merge(&[b]).is_err());
    }

    #[test]
    fn step_to_linear_expansion() {
        let x: Temporal<f64> = t("Interp=Stepwise;[1@2000-01-01, 2@2000-01-02, 2@2000-01-03]");
        let linear = x.set_interpolation(TInterpolation::Linear).unwrap();
        assert_eq!(
            linear.value_at_timestamp(parse_timestamp("2000-01-01 12:00:00+00").unwrap()),
            Some(1.0)
        );
        assert_eq!(
            linear.value_at_timestamp(parse_timestamp("2000-01-02").unwrap()),
            Some(2.0)
        );
    }

    #[test]
    fn min_max_and_at_min() {
        let x = t("{[1@2000-01-01, 5@2000-01-03), [0@2000-01-05, 2@2000-01-06]}");
        assert_eq!(x.min_value(), 0.0);
        assert_eq!(x.max_value(), 5.0);
        let at_min = x.at_min().unwrap();
        assert_eq!(at_min.start_timestamp(), parse_timestamp("2000-01-05").unwrap());
    }

    #[test]
    fn value_ordering() {
        assert!(t("1@2000-01-01") < t("2@2000-01-01"));
        assert!(t("[1@2000-01-01, 2@2000-01-02]") < t("[1@2000-01-02, 2@2000-01-03]"));
    }

    #[test]
    fn wire_envelope_round_trip() {
        for text in [
            "1.5@2000-01-01",
            "{1@2000-01-01, 2@2000-01-02}",
            "[1@2000-01-01, 2@2000-01-02)",
            "{[1@2000-01-01, 2@2000-01-02), [4@2000-01-04]}",
        ] {
            let x = t(text);
            assert_eq!(Temporal::<f64>::from_wkb(&x.as_wkb()).unwrap(), x);
        }
    }

    #[test]
    fn ever_always_comparisons() {
        let x = t("[1@2000-01-01, 5@2000-01-05]");
        assert!(x.ever_eq(&2.5));
        assert!(x.ever_ge(&5.0));
        assert!(!x.ever_gt(&5.0));
        assert!(x.always_ge(&1.0));
        assert!(!x.always_gt(&1.0));
    }
}
