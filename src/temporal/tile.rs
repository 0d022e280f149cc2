//! Regular value and time grids: bucket computation, lazy bucket
//! enumeration, and the splitting of temporal values along them.

use chrono::{DateTime, TimeDelta, Utc};

use crate::base::{BaseType, NumberBase};
use crate::boxes::tbox::TBox;
use crate::collections::base::span::Span;
use crate::collections::datetime::TsTzSpan;
use crate::errors::Error;
use crate::temporal::temporal::Temporal;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;
use crate::utils::{from_micros, to_micros};

/// Start of the bucket containing `value` in a grid of the given width
/// anchored at `origin`.
///
/// ## Errors
/// `DomainError` on a non-positive width.
pub fn number_bucket<T: NumberBase>(value: T, width: T, origin: T) -> Result<T, Error> {
    let width = NumberBase::to_double(width);
    if width <= 0.0 {
        return Err(Error::DomainError(format!("bucket width {width} must be positive")));
    }
    let origin = NumberBase::to_double(origin) % width;
    let shifted = NumberBase::to_double(value) - origin;
    // Division truncates toward zero; a negative remainder belongs to
    // the bucket below.
    let mut result = (shifted / width).trunc() * width;
    if shifted < 0.0 && shifted % width != 0.0 {
        result -= width;
    }
    Ok(T::from_double(result + origin))
}

/// Start of the bucket containing `t` in a grid of `width` anchored at
/// `origin`.
pub fn timestamp_bucket(
    t: DateTime<Utc>,
    width: TimeDelta,
    origin: DateTime<Utc>,
) -> Result<DateTime<Utc>, Error> {
    let units = width.num_microseconds().unwrap_or(0);
    if units <= 0 {
        return Err(Error::DomainError("bucket duration must be positive".into()));
    }
    let origin = to_micros(&origin).rem_euclid(units);
    let shifted = to_micros(&t) - origin;
    let mut bucket = (shifted / units) * units;
    if shifted < 0 && shifted % units != 0 {
        bucket -= units;
    }
    Ok(from_micros(bucket + origin))
}

/// Lazily enumerates the value buckets covering `span`: half-open,
/// pairwise disjoint, their union containing the span.
pub fn span_bucket_list<T: NumberBase>(
    span: &Span<T>,
    width: T,
    origin: T,
) -> Result<impl Iterator<Item = Span<T>>, Error> {
    let start = number_bucket(span.lower(), width, origin)?;
    let upper = NumberBase::to_double(span.upper());
    let upper_closed = span.is_upper_inclusive();
    let width = NumberBase::to_double(width);
    let mut current = NumberBase::to_double(start);
    Ok(std::iter::from_fn(move || {
        if current > upper || (current == upper && !upper_closed) {
            return None;
        }
        let bucket = Span::new(T::from_double(current), T::from_double(current + width), true, false)
            .expect("bucket bounds are ordered");
        current += width;
        Some(bucket)
    }))
}

/// Lazily enumerates the time buckets covering `span`.
pub fn tstzspan_bucket_list(
    span: &TsTzSpan,
    width: TimeDelta,
    origin: DateTime<Utc>,
) -> Result<impl Iterator<Item = TsTzSpan>, Error> {
    let start = timestamp_bucket(span.lower(), width, origin)?;
    let units = width.num_microseconds().expect("validated positive");
    let upper = to_micros(&span.upper());
    let upper_closed = span.is_upper_inclusive();
    let mut current = to_micros(&start);
    Ok(std::iter::from_fn(move || {
        if current > upper || (current == upper && !upper_closed) {
            return None;
        }
        let bucket = TsTzSpan::new(from_micros(current), from_micros(current + units), true, false)
            .expect("bucket bounds are ordered");
        current += units;
        Some(bucket)
    }))
}

/// Enumerates the value-and-time tiles of a box grid, value-major.
pub fn tbox_tile_list(
    bbox: &TBox,
    width: f64,
    duration: TimeDelta,
    value_origin: f64,
    time_origin: DateTime<Utc>,
) -> Result<Vec<TBox>, Error> {
    let span = bbox
        .to_floatspan()
        .ok_or_else(|| Error::DomainError("box has no value dimension".into()))?;
    let period = bbox
        .to_tstzspan()
        .ok_or_else(|| Error::DomainError("box has no time dimension".into()))?;
    let mut tiles = Vec::new();
    for value_bucket in span_bucket_list(&span, width, value_origin)? {
        for time_bucket in tstzspan_bucket_list(&period, duration, time_origin)? {
            let mut tile = TBox::from(value_bucket);
            tile.set_period(time_bucket);
            tiles.push(tile);
        }
    }
    Ok(tiles)
}

impl<T: BaseType> Temporal<T> {
    /// Splits the value along a regular time grid; only non-empty
    /// fragments are returned, keyed by their bucket start.
    ///
    /// ## Errors
    /// `DomainError` on a non-positive bucket duration.
    pub fn time_split(
        &self,
        width: TimeDelta,
        origin: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, Self)>, Error> {
        let mut result = Vec::new();
        for bucket in tstzspan_bucket_list(&self.timespan(), width, origin)? {
            if let Some(fragment) = self.at_tstzspan(&bucket) {
                result.push((bucket.lower(), fragment));
            }
        }
        Ok(result)
    }

    /// Sampling at regular ticks: the value interpolated at each bucket
    /// start within the support.
    pub fn sample(
        &self,
        width: TimeDelta,
        origin: DateTime<Utc>,
    ) -> Result<Option<Self>, Error> {
        let mut instants = Vec::new();
        for bucket in tstzspan_bucket_list(&self.timespan(), width, origin)? {
            let t = bucket.lower();
            if let Some(value) = self.value_at_timestamp(t) {
                instants.push(TInstant::new(value, t));
            }
        }
        Ok(match instants.len() {
            0 => None,
            1 => Some(Temporal::Instant(instants.into_iter().next().expect("one element"))),
            _ => Some(Temporal::InstantSet(
                crate::temporal::tinstant_set::TInstantSet::from_validated(instants),
            )),
        })
    }

    /// Rounds every timestamp down to its bucket start. Instants that
    /// collapse onto the same tick keep the first value; component
    /// sequences pushed against each other get an exclusive lower bound.
    pub fn precision(
        &self,
        width: TimeDelta,
        origin: DateTime<Utc>,
    ) -> Result<Self, Error> {
        let snap_seq = |seq: &TSequence<T>, lower_inc: bool| -> Result<TSequence<T>, Error> {
            let mut snapped: Vec<TInstant<T>> = Vec::with_capacity(seq.num_instants());
            for inst in seq.instants() {
                let t = timestamp_bucket(inst.timestamp(), width, origin)?;
                if snapped.last().map(|l| l.timestamp()) != Some(t) {
                    snapped.push(TInstant::new(inst.value().clone(), t));
                }
            }
            if snapped.len() == 1 {
                return Ok(TSequence::make(snapped, true, true, seq.interpolation(), false));
            }
            Ok(TSequence::make(
                snapped,
                lower_inc,
                seq.is_upper_inclusive(),
                seq.interpolation(),
                true,
            ))
        };
        match self {
            Temporal::Instant(i) => Ok(Temporal::Instant(TInstant::new(
                i.value().clone(),
                timestamp_bucket(i.timestamp(), width, origin)?,
            ))),
            Temporal::InstantSet(s) => {
                let mut snapped: Vec<TInstant<T>> = Vec::with_capacity(s.num_instants());
                for inst in s.instants() {
                    let t = timestamp_bucket(inst.timestamp(), width, origin)?;
                    if snapped.last().map(|l| l.timestamp()) != Some(t) {
                        snapped.push(TInstant::new(inst.value().clone(), t));
                    }
                }
                Ok(if snapped.len() == 1 {
                    Temporal::Instant(snapped.into_iter().next().expect("one element"))
                } else {
                    Temporal::InstantSet(
                        crate::temporal::tinstant_set::TInstantSet::from_validated(snapped),
                    )
                })
            }
            Temporal::Sequence(s) => {
                Ok(Temporal::Sequence(snap_seq(s, s.is_lower_inclusive())?))
            }
            Temporal::SequenceSet(s) => {
                let mut sequences: Vec<TSequence<T>> = Vec::with_capacity(s.num_sequences());
                for seq in s.sequences() {
                    let touches_previous = sequences.last().map(|prev: &TSequence<T>| {
                        let start = timestamp_bucket(seq.start_timestamp(), width, origin)
                            .unwrap_or(seq.start_timestamp());
                        prev.end_timestamp() == start && prev.is_upper_inclusive()
                    });
                    let lower_inc = seq.is_lower_inclusive() && touches_previous != Some(true);
                    let snapped = snap_seq(seq, lower_inc)?;
                    if let Some(prev) = sequences.last() {
                        // A sequence collapsed onto the previous tick adds
                        // nothing.
                        if snapped.start_timestamp() == prev.end_timestamp()
                            && prev.is_upper_inclusive()
                            && snapped.is_lower_inclusive()
                        {
                            continue;
                        }
                    }
                    sequences.push(snapped);
                }
                Ok(Temporal::SequenceSet(TSequenceSet::from_normalized(
                    TSequence::normalize_sequences(sequences),
                )))
            }
        }
    }
}

impl<T: NumberBase> Temporal<T> {
    /// Splits the value along a regular value grid; only non-empty
    /// fragments are returned, keyed by their bucket start. For
    /// continuous domains a maximum sitting exactly on a bucket boundary
    /// folds into the bucket below it, so the fragments partition the
    /// input.
    pub fn value_split(&self, width: T, origin: T) -> Result<Vec<(T, Self)>, Error> {
        let span = self.value_span();
        let max = span.upper();
        let mut result = Vec::new();
        for bucket in span_bucket_list(&span, width, origin)? {
            let restriction = if T::DISCRETE {
                bucket
            } else if bucket.lower() == max && !result.is_empty() {
                // The boundary maximum already closed the previous bucket.
                break;
            } else if bucket.upper() >= max {
                Span::new(bucket.lower(), max, true, true).expect("bucket reaches the maximum")
            } else {
                bucket
            };
            if let Some(fragment) = self.at_span(&restriction) {
                result.push((bucket.lower(), fragment));
            }
        }
        Ok(result)
    }

    /// Combined value and time split, value-major.
    pub fn value_time_split(
        &self,
        width: T,
        duration: TimeDelta,
        value_origin: T,
        time_origin: DateTime<Utc>,
    ) -> Result<Vec<(T, DateTime<Utc>, Self)>, Error> {
        let mut result = Vec::new();
        for (value_bucket, fragment) in self.value_split(width, value_origin)? {
            for (time_bucket, piece) in fragment.time_split(duration, time_origin)? {
                result.push((value_bucket, time_bucket, piece));
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::base::collection::Collection;

    fn ts(s: &str) -> DateTime<Utc> {
        crate::utils::parse_timestamp(s).unwrap()
    }

    #[test]
    fn number_buckets_anchor_at_the_origin() {
        assert_eq!(number_bucket(7.0, 5.0, 0.0).unwrap(), 5.0);
        assert_eq!(number_bucket(-3.0, 5.0, 0.0).unwrap(), -5.0);
        assert_eq!(number_bucket(7.0, 5.0, 2.0).unwrap(), 7.0);
        assert_eq!(number_bucket(7, 5, 0).unwrap(), 5);
        assert_eq!(number_bucket(-3, 5, 0).unwrap(), -5);
        assert!(number_bucket(1.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn timestamp_buckets_cover_the_day_grid() {
        let bucket = timestamp_bucket(
            ts("2000-01-01 13:30:00+00"),
            TimeDelta::days(1),
            ts("2000-01-01"),
        )
        .unwrap();
        assert_eq!(bucket, ts("2000-01-01"));
    }

    #[test]
    fn bucket_list_is_disjoint_and_covers() {
        let span: TsTzSpan = "[2000-01-01, 2000-01-04)".parse().unwrap();
        let buckets: Vec<TsTzSpan> =
            tstzspan_bucket_list(&span, TimeDelta::days(1), ts("2000-01-01")).unwrap().collect();
        assert_eq!(buckets.len(), 3);
        for pair in buckets.windows(2) {
            assert!(pair[0].is_left(&pair[1]));
        }
        let union = crate::TsTzSpanSet::from_spans(buckets);
        assert!(span.is_contained_in(&union.to_span().unwrap()));
    }

    #[test]
    fn value_split_partitions_a_linear_float() {
        let x: crate::TFloat = "[0@2000-01-01, 10@2000-01-03]".parse().unwrap();
        let parts = x.value_split(5.0, 0.0).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, 0.0);
        assert_eq!(parts[1].0, 5.0);
        // The fragments recombine into the original.
        let merged = parts[0].1.merge(&[parts[1].1.clone()]).unwrap();
        assert_eq!(merged.value_at_timestamp(ts("2000-01-02")), Some(5.0));
        assert_eq!(merged.time(), x.time());
    }

    #[test]
    fn time_split_keeps_interpolation_and_bounds() {
        let x: crate::TFloat = "[0@2000-01-01, 4@2000-01-03]".parse().unwrap();
        let parts = x.time_split(TimeDelta::days(1), ts("2000-01-01")).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].0, ts("2000-01-01"));
        assert_eq!(parts[1].1.value_at_timestamp(ts("2000-01-02")), Some(2.0));
        // The last bucket holds only the final inclusive bound.
        assert_eq!(parts[2].1.num_instants(), 1);
    }

    #[test]
    fn value_time_split_is_value_major() {
        let x: crate::TFloat = "[0@2000-01-01, 10@2000-01-03]".parse().unwrap();
        let parts = x
            .value_time_split(5.0, TimeDelta::days(1), 0.0, ts("2000-01-01"))
            .unwrap();
        assert!(parts.len() >= 3);
        let mut last_value = f64::MIN;
        for (value, _, _) in &parts {
            assert!(*value >= last_value);
            last_value = *value;
        }
    }

    #[test]
    fn sample_and_precision() {
        let x: crate::TFloat = "[0@2000-01-01, 4@2000-01-05]".parse().unwrap();
        let sampled = x.sample(TimeDelta::days(2), ts("2000-01-01")).unwrap().unwrap();
        assert_eq!(sampled.num_instants(), 3);
        assert_eq!(sampled.value_at_timestamp(ts("2000-01-03")), Some(2.0));

        let inst: crate::TFloat = "1@2000-01-01 13:30:00+00".parse().unwrap();
        let snapped = inst.precision(TimeDelta::days(1), ts("2000-01-01")).unwrap();
        assert_eq!(snapped.start_timestamp(), ts("2000-01-01"));
    }
}
