//! Order-statistic skip list of periods backing the time aggregates.
//! Nodes own one period each; head and tail sentinels stand for the two
//! infinities. `splice` unlinks the stretch covered by the incoming
//! periods, merges it with them, and reinserts the result.

use std::cell::RefCell;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::collections::base::collection::Collection;
use crate::collections::base::span::Span;
use crate::collections::datetime::TsTzSpan;
use crate::errors::Error;
use crate::wire::{WireReader, WireWriter};

const MAX_LEVEL: usize = 32;
const INITIAL_CAPACITY: usize = 64;

thread_local! {
    // One aggregate runs per call, but nothing stops callers from
    // aggregating on several threads; the level generator is therefore
    // thread-local rather than a process singleton.
    static LEVEL_RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_entropy());
}

/// Simulates up to `MAX_LEVEL` coin flips out of a single draw: the
/// number of leading ones in the word plus one.
fn random_level() -> usize {
    let bits: u64 = LEVEL_RNG.with(|rng| rng.borrow_mut().gen());
    ((bits.trailing_ones() as usize) + 1).min(MAX_LEVEL)
}

#[derive(Debug, Clone)]
struct Node {
    /// `None` for the head and tail sentinels.
    value: Option<TsTzSpan>,
    next: [i32; MAX_LEVEL],
    height: usize,
}

impl Node {
    fn sentinel() -> Self {
        Node { value: None, next: [-1; MAX_LEVEL], height: 0 }
    }
}

/// Where a timestamp falls relative to a node's period.
#[derive(Debug, PartialEq, Eq)]
enum Position {
    Before,
    During,
    After,
}

/// Randomized skip list over non-overlapping periods, kept in period
/// order, with `splice` averaging O(k·log n).
#[derive(Debug, Clone)]
pub struct SpanSkipList {
    elems: Vec<Node>,
    /// Reusable slots freed by unlinking.
    freed: Vec<usize>,
    tail: usize,
    length: usize,
    /// Aggregate-specific opaque state carried with the list.
    pub extra: Option<Vec<u8>>,
}

impl SpanSkipList {
    /// Builds the list from normalized periods, linked in a balanced
    /// fashion so construction needs no random levels.
    pub fn make(values: &[TsTzSpan]) -> Result<Self, Error> {
        if values.is_empty() {
            return Err(Error::ShapeViolation("skip list needs at least one period".into()));
        }
        let values = Span::normalize(values.to_vec());
        let count = values.len() + 2;
        let mut capacity = INITIAL_CAPACITY;
        while capacity <= count {
            capacity <<= 1;
        }
        let mut elems = Vec::with_capacity(capacity);
        elems.push(Node::sentinel());
        for v in &values {
            let mut node = Node::sentinel();
            node.value = Some(v.clone());
            elems.push(node);
        }
        elems.push(Node::sentinel());
        let tail = count - 1;
        let height = usize::max(1, (count as f64 - 1.0).log2().ceil() as usize);
        for level in 0..height {
            let step = 1usize << level;
            let mut i = 0usize;
            while i < count {
                let next = if i + step < count { i + step } else { tail };
                if i != tail {
                    elems[i].next[level] = next as i32;
                    elems[i].height = level + 1;
                } else {
                    elems[i].next[level] = -1;
                    elems[i].height = height;
                }
                i += step;
            }
        }
        elems[tail].height = height;
        Ok(Self { elems, freed: Vec::new(), tail, length: values.len(), extra: None })
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The periods in order.
    pub fn values(&self) -> Vec<TsTzSpan> {
        let mut result = Vec::with_capacity(self.length);
        let mut cur = self.elems[0].next[0];
        while cur != self.tail as i32 && cur >= 0 {
            result.push(
                self.elems[cur as usize]
                    .value
                    .clone()
                    .expect("interior nodes carry a period"),
            );
            cur = self.elems[cur as usize].next[0];
        }
        result
    }

    fn position(&self, node: usize, t: chrono::DateTime<chrono::Utc>) -> Position {
        if node == 0 {
            return Position::Before;
        }
        if node == self.tail {
            return Position::After;
        }
        let span = self.elems[node].value.as_ref().expect("interior node");
        if t < span.lower() {
            Position::Before
        } else if t > span.upper() {
            Position::After
        } else {
            Position::During
        }
    }

    fn alloc(&mut self) -> usize {
        if let Some(slot) = self.freed.pop() {
            slot
        } else {
            self.elems.push(Node::sentinel());
            self.elems.len() - 1
        }
    }

    /// Merges the incoming normalized periods into the list: the nodes
    /// covered by their overall stretch are unlinked, merged with the
    /// input, and the union reinserted.
    pub fn splice(&mut self, values: &[TsTzSpan]) {
        if values.is_empty() {
            return;
        }
        let values = Span::normalize(values.to_vec());
        let stretch = TsTzSpan::new(
            values[0].lower(),
            values[values.len() - 1].upper(),
            values[0].is_lower_inclusive(),
            values[values.len() - 1].is_upper_inclusive(),
        )
        .expect("normalized periods are ordered");

        // Walk down the levels to the last node entirely before the
        // stretch.
        let mut update = [0usize; MAX_LEVEL];
        let mut cur = 0usize;
        let height = self.elems[0].height;
        for level in (0..height).rev() {
            loop {
                let next = self.elems[cur].next[level];
                if next < 0 || next == self.tail as i32 {
                    break;
                }
                if self.position(next as usize, stretch.lower()) == Position::After {
                    cur = next as usize;
                } else {
                    break;
                }
            }
            update[level] = cur;
        }

        // Unlink every node the stretch touches, remembering its period.
        let mut spliced: Vec<TsTzSpan> = Vec::new();
        let mut cur = self.elems[update[0]].next[0];
        while cur >= 0 && cur != self.tail as i32 {
            let node = cur as usize;
            if self.position(node, stretch.upper()) == Position::After
                || self.position(node, stretch.upper()) == Position::During
                || self.position(node, stretch.lower()) == Position::During
                || self
                    .elems[node]
                    .value
                    .as_ref()
                    .map(|span| span.overlaps(&stretch) || span.is_adjacent(&stretch))
                    .unwrap_or(false)
            {
                let next = self.elems[node].next[0];
                for level in 0..height {
                    if self.elems[update[level]].next[level] == node as i32 {
                        self.elems[update[level]].next[level] = self.elems[node].next[level];
                    }
                }
                spliced.push(
                    self.elems[node].value.take().expect("interior node carries a period"),
                );
                self.freed.push(node);
                self.length -= 1;
                cur = next;
            } else {
                break;
            }
        }

        // Merge and reinsert.
        let mut merged = spliced;
        merged.extend(values);
        let merged = Span::normalize(merged);
        for span in merged.into_iter().rev() {
            let mut level = random_level();
            let head_height = self.elems[0].height;
            if level > head_height {
                for slot in update.iter_mut().take(level).skip(head_height) {
                    *slot = 0;
                }
                self.elems[0].height = level;
                let tail = self.tail;
                self.elems[tail].height = level;
            }
            level = level.max(1);
            let node = self.alloc();
            self.elems[node] = Node { value: Some(span), next: [-1; MAX_LEVEL], height: level };
            for l in 0..level {
                let prev = update[l];
                self.elems[node].next[l] = if self.elems[prev].next[l] >= 0 {
                    self.elems[prev].next[l]
                } else {
                    self.tail as i32
                };
                self.elems[prev].next[l] = node as i32;
            }
            self.length += 1;
        }
    }

    /// Serialized form: element count, each period, then the extra blob.
    pub fn serialize(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        let values = self.values();
        w.u32(values.len() as u32);
        for span in &values {
            span.write_wire(&mut w);
        }
        match &self.extra {
            Some(extra) => w.bytes(extra),
            None => w.u32(0),
        }
        w.finish()
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, Error> {
        let mut r = WireReader::new(buf);
        let count = r.u32()? as usize;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(TsTzSpan::read_wire(&mut r)?);
        }
        let extra = r.bytes()?;
        let mut list = Self::make(&values)?;
        if !extra.is_empty() {
            list.extra = Some(extra);
        }
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(s: &str) -> TsTzSpan {
        s.parse().unwrap()
    }

    #[test]
    fn make_links_in_order() {
        let list = SpanSkipList::make(&[
            span("[2000-01-05, 2000-01-06)"),
            span("[2000-01-01, 2000-01-02)"),
        ])
        .unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(
            list.values(),
            vec![span("[2000-01-01, 2000-01-02)"), span("[2000-01-05, 2000-01-06)")]
        );
    }

    #[test]
    fn splice_merges_overlapping_periods() {
        let mut list = SpanSkipList::make(&[
            span("[2000-01-01, 2000-01-03)"),
            span("[2000-01-10, 2000-01-12)"),
        ])
        .unwrap();
        list.splice(&[span("[2000-01-02, 2000-01-05)")]);
        assert_eq!(
            list.values(),
            vec![span("[2000-01-01, 2000-01-05)"), span("[2000-01-10, 2000-01-12)")]
        );
        // A span covering everything collapses the list to one period.
        list.splice(&[span("[2000-01-01, 2000-02-01)")]);
        assert_eq!(list.values(), vec![span("[2000-01-01, 2000-02-01)")]);
    }

    #[test]
    fn splice_into_a_gap() {
        let mut list = SpanSkipList::make(&[
            span("[2000-01-01, 2000-01-02)"),
            span("[2000-01-08, 2000-01-09)"),
        ])
        .unwrap();
        list.splice(&[span("[2000-01-04, 2000-01-05)")]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.values()[1], span("[2000-01-04, 2000-01-05)"));
    }

    #[test]
    fn many_out_of_order_splices_stay_sorted() {
        let mut list = SpanSkipList::make(&[span("[2000-06-01, 2000-06-02)")]).unwrap();
        for day in (1..25).rev() {
            list.splice(&[span(&format!("[2000-03-{day:02}, 2000-03-{day:02} 12:00:00+00)"))]);
        }
        let values = list.values();
        assert_eq!(values.len(), 25);
        for pair in values.windows(2) {
            assert!(pair[0].is_left(&pair[1]));
        }
    }

    #[test]
    fn state_round_trip() {
        let mut list = SpanSkipList::make(&[span("[2000-01-01, 2000-01-02)")]).unwrap();
        list.extra = Some(vec![1, 2, 3]);
        let restored = SpanSkipList::deserialize(&list.serialize()).unwrap();
        assert_eq!(restored.values(), list.values());
        assert_eq!(restored.extra, Some(vec![1, 2, 3]));
    }
}
