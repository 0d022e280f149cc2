//! Union-style aggregation over time: periods, period sets, timestamp
//! sets, and the time dimension of temporal values arrive in any order
//! and accumulate into a skip list of disjoint periods.

pub mod skiplist;

use crate::base::BaseType;
use crate::collections::base::span::Span;
use crate::collections::datetime::{TsTzSet, TsTzSpan, TsTzSpanSet};
use crate::errors::Error;
use crate::temporal::temporal::Temporal;
use skiplist::SpanSkipList;

/// Accumulates the union of period-shaped inputs; the final state is a
/// period set. Transition order does not affect the result.
///
/// ## Example
/// ```
/// # use tempus::{UnionAggregator, TsTzSpan, TsTzSpanSet};
/// # use std::str::FromStr;
/// let mut agg = UnionAggregator::new();
/// agg.add_tstzspan(&TsTzSpan::from_str("[2000-01-03, 2000-01-04)").unwrap());
/// agg.add_tstzspan(&TsTzSpan::from_str("[2000-01-01, 2000-01-02)").unwrap());
/// agg.add_tstzspan(&TsTzSpan::from_str("[2000-01-02, 2000-01-03)").unwrap());
/// let result = agg.finish().unwrap();
/// assert_eq!(result, TsTzSpanSet::from_str("{[2000-01-01, 2000-01-04)}").unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct UnionAggregator {
    state: Option<SpanSkipList>,
}

impl UnionAggregator {
    pub fn new() -> Self {
        Self { state: None }
    }

    fn push(&mut self, spans: &[TsTzSpan]) {
        if spans.is_empty() {
            return;
        }
        match &mut self.state {
            Some(list) => list.splice(spans),
            None => {
                self.state =
                    Some(SpanSkipList::make(spans).expect("non-empty input builds a list"))
            }
        }
    }

    pub fn add_tstzspan(&mut self, span: &TsTzSpan) {
        self.push(&[span.clone()]);
    }

    pub fn add_tstzspanset(&mut self, spans: &TsTzSpanSet) {
        self.push(spans.spans());
    }

    pub fn add_tstzset(&mut self, set: &TsTzSet) {
        let spans: Vec<TsTzSpan> =
            set.timestamps().iter().map(|t| Span::instant(*t)).collect();
        self.push(&spans);
    }

    /// Accumulates the exact time support of a temporal value.
    pub fn add_temporal<T: BaseType>(&mut self, temp: &Temporal<T>) {
        self.push(temp.time().spans());
    }

    /// Combines two partial aggregation states.
    pub fn combine(&mut self, other: &UnionAggregator) {
        if let Some(list) = &other.state {
            self.push(&list.values());
        }
    }

    /// Final state: the union as a period set, `None` when nothing was
    /// accumulated.
    pub fn finish(&self) -> Option<TsTzSpanSet> {
        let list = self.state.as_ref()?;
        TsTzSpanSet::new(list.values()).ok()
    }

    /// Serialized transition state for hand-off between workers.
    pub fn serialize(&self) -> Option<Vec<u8>> {
        self.state.as_ref().map(|list| list.serialize())
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, Error> {
        Ok(Self { state: Some(SpanSkipList::deserialize(buf)?) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn span(s: &str) -> TsTzSpan {
        s.parse().unwrap()
    }

    #[test]
    fn union_is_order_independent() {
        let inputs = [
            "[2000-01-01, 2000-01-05)",
            "[2000-01-03, 2000-01-08)",
            "[2000-02-01, 2000-02-02)",
            "[2000-01-07, 2000-01-09)",
        ];
        let mut forward = UnionAggregator::new();
        for s in inputs {
            forward.add_tstzspan(&span(s));
        }
        let mut backward = UnionAggregator::new();
        for s in inputs.iter().rev() {
            backward.add_tstzspan(&span(s));
        }
        assert_eq!(forward.finish(), backward.finish());
        assert_eq!(
            forward.finish().unwrap(),
            TsTzSpanSet::from_str("{[2000-01-01, 2000-01-09), [2000-02-01, 2000-02-02)}").unwrap()
        );
    }

    #[test]
    fn combine_matches_sequential_accumulation() {
        let mut a = UnionAggregator::new();
        a.add_tstzspan(&span("[2000-01-01, 2000-01-02)"));
        let mut b = UnionAggregator::new();
        b.add_tstzspan(&span("[2000-01-01 12:00:00+00, 2000-01-03)"));
        let mut combined = a.clone();
        combined.combine(&b);

        let mut sequential = UnionAggregator::new();
        sequential.add_tstzspan(&span("[2000-01-01, 2000-01-02)"));
        sequential.add_tstzspan(&span("[2000-01-01 12:00:00+00, 2000-01-03)"));
        assert_eq!(combined.finish(), sequential.finish());
    }

    #[test]
    fn temporal_support_aggregates() {
        let x: crate::TFloat =
            "{[1@2000-01-01, 2@2000-01-02), [5@2000-01-05, 6@2000-01-06]}".parse().unwrap();
        let mut agg = UnionAggregator::new();
        agg.add_temporal(&x);
        assert_eq!(agg.finish().unwrap(), x.time());
    }

    #[test]
    fn state_round_trips_through_serialization() {
        let mut agg = UnionAggregator::new();
        agg.add_tstzspan(&span("[2000-01-01, 2000-01-02)"));
        let restored = UnionAggregator::deserialize(&agg.serialize().unwrap()).unwrap();
        assert_eq!(restored.finish(), agg.finish());
    }
}
