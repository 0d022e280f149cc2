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
use crate::temporal::tsequence::TSequence;
use crate::utils::split_top_level;
use crate::wire::{WireReader, WireWriter};

/// A set of non-overlapping sequences ordered by period, sharing base
/// type and interpolation; the value is undefined in the gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct TSequenceSet<T: BaseType> {
    sequences: Vec<TSequence<T>>,
    bbox: T::Bbox,
}

impl<T: BaseType> TSequenceSet<T> {
    /// Builds a sequence set from ordered, disjoint sequences. Two
    /// component sequences may share a boundary timestamp only when at
    /// least one of the facing bounds is exclusive; the normalizing
    /// constructor merges pairs that would join losslessly.
    ///
    /// ## Errors
    /// `ShapeViolation` on empty input, overlap, or mixed interpolation.
    pub fn new(sequences: Vec<TSequence<T>>, normalize: bool) -> Result<Self, Error> {
        if sequences.is_empty() {
            return Err(Error::ShapeViolation(
                "sequence set must have at least one sequence".into(),
            ));
        }
        for pair in sequences.windows(2) {
            if pair[0].interpolation() != pair[1].interpolation() {
                return Err(Error::ShapeViolation(
                    "sequences of a set must share one interpolation".into(),
                ));
            }
            let left = pair[0].timespan();
            let right = pair[1].timespan();
            if !left.is_left(&right) {
                return Err(Error::ShapeViolation(format!(
                    "sequences {} and {} overlap or are out of order",
                    pair[0], pair[1]
                )));
            }
        }
        let sequences = if normalize {
            TSequence::normalize_sequences(sequences)
        } else {
            sequences
        };
        Ok(Self::from_normalized(sequences))
    }

    pub(crate) fn from_normalized(sequences: Vec<TSequence<T>>) -> Self {
        debug_assert!(!sequences.is_empty());
        let mut bbox = sequences[0].bounding_box().clone();
        for seq in &sequences[1..] {
            bbox.expand(seq.bounding_box());
        }
        bbox.set_period(
            &TsTzSpan::new(
                sequences[0].start_timestamp(),
                sequences[sequences.len() - 1].end_timestamp(),
                sequences[0].is_lower_inclusive(),
                sequences[sequences.len() - 1].is_upper_inclusive(),
            )
            .expect("ordered sequences form a valid period"),
        );
        Self { sequences, bbox }
    }

    /// Wraps raw restriction output; `None` when it is empty.
    pub(crate) fn from_fragments(sequences: Vec<TSequence<T>>, normalize: bool) -> Option<Self> {
        if sequences.is_empty() {
            None
        } else {
            let sequences = if normalize {
                TSequence::normalize_sequences(sequences)
            } else {
                sequences
            };
            Some(Self::from_normalized(sequences))
        }
    }

    pub fn from_sequence(sequence: TSequence<T>) -> Self {
        Self::from_normalized(vec![sequence])
    }

    /// A constant sequence set: `value` over every period of `spans`.
    pub fn from_base_tstzspanset(value: T, spans: &TsTzSpanSet, interp: TInterpolation) -> Self {
        let sequences = spans
            .spans()
            .iter()
            .map(|span| TSequence::from_base_tstzspan(value.clone(), span, interp))
            .collect();
        Self::from_normalized(sequences)
    }

    // ------------------------- Accessors -------------------------------

    pub fn bounding_box(&self) -> &T::Bbox {
        &self.bbox
    }

    pub fn interpolation(&self) -> TInterpolation {
        self.sequences[0].interpolation()
    }

    pub(crate) fn is_linear(&self) -> bool {
        self.sequences[0].is_linear()
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn sequences(&self) -> &[TSequence<T>] {
        &self.sequences
    }

    pub fn sequence_n(&self, n: usize) -> Option<&TSequence<T>> {
        self.sequences.get(n)
    }

    pub fn start_sequence(&self) -> &TSequence<T> {
        &self.sequences[0]
    }

    pub fn end_sequence(&self) -> &TSequence<T> {
        &self.sequences[self.sequences.len() - 1]
    }

    pub fn num_instants(&self) -> usize {
        self.sequences.iter().map(|s| s.num_instants()).sum()
    }

    pub fn instants(&self) -> Vec<&TInstant<T>> {
        self.sequences.iter().flat_map(|s| s.instants()).collect()
    }

    pub fn instant_n(&self, mut n: usize) -> Option<&TInstant<T>> {
        for seq in &self.sequences {
            if n < seq.num_instants() {
                return seq.instant_n(n);
            }
            n -= seq.num_instants();
        }
        None
    }

    pub fn start_instant(&self) -> &TInstant<T> {
        self.sequences[0].start_instant()
    }

    pub fn end_instant(&self) -> &TInstant<T> {
        self.end_sequence().end_instant()
    }

    pub fn values(&self) -> Vec<T> {
        self.sequences.iter().flat_map(|s| s.values()).collect()
    }

    pub fn start_value(&self) -> &T {
        self.sequences[0].start_value()
    }

    pub fn end_value(&self) -> &T {
        self.end_sequence().end_value()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.sequences.iter().flat_map(|s| s.timestamps()).collect()
    }

    pub fn start_timestamp(&self) -> DateTime<Utc> {
        self.sequences[0].start_timestamp()
    }

    pub fn end_timestamp(&self) -> DateTime<Utc> {
        self.end_sequence().end_timestamp()
    }

    /// Covering period, gaps included.
    pub fn timespan(&self) -> TsTzSpan {
        TsTzSpan::new(
            self.start_timestamp(),
            self.end_timestamp(),
            self.sequences[0].is_lower_inclusive(),
            self.end_sequence().is_upper_inclusive(),
        )
        .expect("ordered sequences form a valid period")
    }

    /// The exact time support: one period per sequence.
    pub fn time(&self) -> TsTzSpanSet {
        TsTzSpanSet::from_spans(self.sequences.iter().map(|s| s.timespan()).collect())
    }

    /// Total duration of the sequences (`true` ignores the gaps).
    pub fn duration(&self, ignore_gaps: bool) -> TimeDelta {
        if ignore_gaps {
            self.end_timestamp() - self.start_timestamp()
        } else {
            self.sequences
                .iter()
                .fold(TimeDelta::zero(), |acc, s| acc + s.duration())
        }
    }

    pub fn segments(&self) -> Vec<TSequence<T>> {
        self.sequences.iter().flat_map(|s| s.segments()).collect()
    }

    /// Index of the sequence whose period contains or follows `t`.
    fn find_sequence(&self, t: DateTime<Utc>) -> Option<&TSequence<T>> {
        self.sequences.iter().find(|s| {
            s.timespan().contains(&t)
        })
    }

    pub fn value_at_timestamp(&self, t: DateTime<Utc>) -> Option<T> {
        self.find_sequence(t)?.value_at_timestamp(t)
    }

    pub fn shift_time(&self, delta: TimeDelta) -> Self {
        Self::from_normalized(self.sequences.iter().map(|s| s.shift_time(delta)).collect())
    }

    // ------------------------- Ever / always ---------------------------

    pub fn ever_eq(&self, value: &T) -> bool {
        self.sequences.iter().any(|s| s.ever_eq(value))
    }

    pub fn always_eq(&self, value: &T) -> bool {
        self.sequences.iter().all(|s| s.always_eq(value))
    }

    // ------------------------- Restrictions ----------------------------

    pub fn at_value(&self, value: &T) -> Option<Self> {
        let fragments: Vec<TSequence<T>> = self
            .sequences
            .iter()
            .flat_map(|s| s.restrict_value(value, true))
            .collect();
        Self::from_fragments(fragments, true)
    }

    pub fn minus_value(&self, value: &T) -> Option<Self> {
        let fragments: Vec<TSequence<T>> = self
            .sequences
            .iter()
            .flat_map(|s| s.restrict_value(value, false))
            .collect();
        Self::from_fragments(fragments, true)
    }

    pub fn at_values(&self, values: &[T]) -> Option<Self> {
        let fragments: Vec<TSequence<T>> = self
            .sequences
            .iter()
            .flat_map(|s| s.restrict_values(values, true))
            .collect();
        Self::from_fragments(fragments, true)
    }

    pub fn minus_values(&self, values: &[T]) -> Option<Self> {
        let fragments: Vec<TSequence<T>> = self
            .sequences
            .iter()
            .flat_map(|s| s.restrict_values(values, false))
            .collect();
        Self::from_fragments(fragments, true)
    }

    pub fn at_timestamp(&self, t: DateTime<Utc>) -> Option<TInstant<T>> {
        self.find_sequence(t)?.at_timestamp(t)
    }

    pub fn minus_timestamp(&self, t: DateTime<Utc>) -> Option<Self> {
        let fragments: Vec<TSequence<T>> = self
            .sequences
            .iter()
            .flat_map(|s| s.minus_timestamp(t))
            .collect();
        Self::from_fragments(fragments, false)
    }

    pub fn at_tstzset(&self, set: &TsTzSet) -> Option<TInstantSet<T>> {
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

    pub fn minus_tstzset(&self, set: &TsTzSet) -> Option<Self> {
        let fragments: Vec<TSequence<T>> = self
            .sequences
            .iter()
            .flat_map(|s| s.minus_tstzset(set))
            .collect();
        Self::from_fragments(fragments, false)
    }

    pub fn at_tstzspan(&self, span: &TsTzSpan) -> Option<Self> {
        if !self.timespan().overlaps(span) {
            return None;
        }
        let fragments: Vec<TSequence<T>> = self
            .sequences
            .iter()
            .filter_map(|s| s.at_tstzspan(span))
            .collect();
        Self::from_fragments(fragments, false)
    }

    pub fn minus_tstzspan(&self, span: &TsTzSpan) -> Option<Self> {
        let fragments: Vec<TSequence<T>> = self
            .sequences
            .iter()
            .flat_map(|s| s.minus_tstzspan(span))
            .collect();
        Self::from_fragments(fragments, false)
    }

    pub fn at_tstzspanset(&self, spans: &TsTzSpanSet) -> Option<Self> {
        let fragments: Vec<TSequence<T>> = self
            .sequences
            .iter()
            .flat_map(|s| s.at_tstzspanset_seqs(spans))
            .collect();
        Self::from_fragments(fragments, false)
    }

    pub fn minus_tstzspanset(&self, spans: &TsTzSpanSet) -> Option<Self> {
        let fragments: Vec<TSequence<T>> = self
            .sequences
            .iter()
            .flat_map(|s| s.minus_tstzspanset_seqs(spans))
            .collect();
        Self::from_fragments(fragments, false)
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
        w.u32(self.sequences.len() as u32);
        for seq in &self.sequences {
            seq.write_wire(w);
        }
    }

    pub(crate) fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
        let count = r.u32()? as usize;
        let mut sequences = Vec::with_capacity(count);
        for _ in 0..count {
            sequences.push(TSequence::read_wire(r)?);
        }
        Self::new(sequences, false)
    }
}

impl<T: BaseType + PartialOrd> TSequenceSet<T> {
    pub fn min_value(&self) -> &T {
        self.sequences
            .iter()
            .map(|s| s.min_value())
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .expect("sequence sets are never empty")
    }

    pub fn max_value(&self) -> &T {
        self.sequences
            .iter()
            .map(|s| s.max_value())
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .expect("sequence sets are never empty")
    }

    pub fn ever_lt(&self, value: &T) -> bool {
        self.sequences.iter().any(|s| s.ever_lt(value))
    }

    pub fn always_lt(&self, value: &T) -> bool {
        self.sequences.iter().all(|s| s.always_lt(value))
    }

    pub fn ever_le(&self, value: &T) -> bool {
        self.sequences.iter().any(|s| s.ever_le(value))
    }

    pub fn always_le(&self, value: &T) -> bool {
        self.sequences.iter().all(|s| s.always_le(value))
    }
}

impl<T: BaseType> Hash for TSequenceSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.sequences.len());
        for seq in &self.sequences {
            seq.hash(state);
        }
    }
}

impl<T: BaseType> fmt::Display for TSequenceSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if T::CONTINUOUS && !self.is_linear() {
            write!(f, "Interp=Stepwise;")?;
        }
        write!(f, "{{")?;
        for (i, seq) in self.sequences.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            seq.fmt_component(f, true)?;
        }
        write!(f, "}}")
    }
}

impl<T: BaseType> FromStr for TSequenceSet<T> {
    type Err = ParseError;

    /// Parses the `{[…], […]}` form with an optional `Interp=Stepwise;`
    /// prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (interp, rest) = match s.strip_prefix("Interp=Stepwise;") {
            Some(rest) => (TInterpolation::Stepwise, rest.trim()),
            None => (
                if T::CONTINUOUS { TInterpolation::Linear } else { TInterpolation::Stepwise },
                s,
            ),
        };
        let inner = rest
            .strip_prefix('{')
            .and_then(|r| r.strip_suffix('}'))
            .ok_or_else(|| ParseError::new("sequence set", format!("missing braces in {s:?}")))?;
        let mut sequences = Vec::new();
        for part in split_top_level(inner, ',') {
            sequences.push(TSequence::parse_component(part, interp)?);
        }
        Self::new(sequences, false).map_err(|e| ParseError::new("sequence set", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_timestamp;

    fn sset(s: &str) -> TSequenceSet<f64> {
        s.parse().unwrap()
    }

    #[test]
    fn construction_rejects_overlap_and_shared_inclusive_bounds() {
        assert!(
            "{[1@2000-01-01, 2@2000-01-03], [3@2000-01-02, 4@2000-01-04]}"
                .parse::<TSequenceSet<f64>>()
                .is_err()
        );
        // Both bounds inclusive at the boundary: rejected even with equal
        // values.
        assert!(
            "{[1@2000-01-01, 2@2000-01-02], [2@2000-01-02, 3@2000-01-03]}"
                .parse::<TSequenceSet<f64>>()
                .is_err()
        );
        assert!(
            "{[1@2000-01-01, 2@2000-01-02), [2@2000-01-02, 3@2000-01-03]}"
                .parse::<TSequenceSet<f64>>()
                .is_ok()
        );
    }

    #[test]
    fn normalizing_constructor_merges_adjacent_sequences() {
        let seqs = vec![
            "[1@2000-01-01, 2@2000-01-02)".parse::<TSequence<f64>>().unwrap(),
            "[2@2000-01-02, 3@2000-01-03]".parse::<TSequence<f64>>().unwrap(),
        ];
        let set = TSequenceSet::new(seqs, true).unwrap();
        assert_eq!(set.num_sequences(), 1);
    }

    #[test]
    fn value_is_undefined_in_gaps() {
        let set = sset("{[1@2000-01-01, 2@2000-01-02), [5@2000-01-05, 6@2000-01-06]}");
        assert_eq!(set.value_at_timestamp(parse_timestamp("2000-01-03").unwrap()), None);
        assert_eq!(set.value_at_timestamp(parse_timestamp("2000-01-05").unwrap()), Some(5.0));
        assert_eq!(set.duration(false), TimeDelta::days(2));
        assert_eq!(set.duration(true), TimeDelta::days(5));
    }

    #[test]
    fn restriction_partition_over_period() {
        let set = sset("{[1@2000-01-01, 3@2000-01-03), [5@2000-01-05, 7@2000-01-07]}");
        let span: TsTzSpan = "[2000-01-02, 2000-01-06]".parse().unwrap();
        let at = set.at_tstzspan(&span).unwrap();
        let minus = set.minus_tstzspan(&span).unwrap();
        let recombined = at.time().union(&minus.time());
        assert_eq!(recombined, set.time());
    }

    #[test]
    fn text_and_wire_round_trip() {
        for text in [
            "{[1@2000-01-01, 2@2000-01-02), [5@2000-01-05, 6@2000-01-06]}",
            "Interp=Stepwise;{[1@2000-01-01, 1@2000-01-02)}",
        ] {
            let set = sset(text);
            assert_eq!(sset(&set.to_string()), set);
            assert_eq!(TSequenceSet::<f64>::from_wkb(&set.as_wkb()).unwrap(), set);
        }
    }
}
