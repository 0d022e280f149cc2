//! Temporal data types for Rust: values that describe how an attribute — a
//! number, a Boolean, a text, a geometry or geography point, a network
//! position — evolves over time, together with the algebra to build, query,
//! restrict, combine and aggregate them.
//!
//! A temporal value comes in four subtypes sharing one tagged
//! representation, [`Temporal`]:
//!
//! - [`TInstant`]: a value at a single timestamp, `1.5@2000-01-01`;
//! - [`TInstantSet`]: a value defined at a finite set of timestamps;
//! - [`TSequence`]: a value defined continuously over a period, under step
//!   or linear interpolation, `[1@2000-01-01, 3@2000-01-03)`;
//! - [`TSequenceSet`]: a value defined over a set of disjoint periods.
//!
//! Type aliases fix the base type: [`TInt`], [`TFloat`], [`TBool`],
//! [`TText`], and — with the default `geo` feature — [`TGeomPoint`] and
//! [`TGeogPoint`].
//!
//! ```
//! use tempus::TFloatSeq;
//! use std::str::FromStr;
//!
//! let speed = TFloatSeq::from_str("[10@2000-01-01, 30@2000-01-03]").unwrap();
//! let noon = "2000-01-02T00:00:00Z".parse().unwrap();
//! assert_eq!(speed.value_at_timestamp(noon), Some(20.0));
//! ```

pub mod errors;
pub(crate) mod utils;
pub(crate) mod wire;

pub mod base;
pub mod boxes;
pub mod collections;
pub mod temporal;

pub mod aggregate;
pub mod selectivity;

/// Tolerance used by every floating-point comparison in the crate:
/// collinearity tests, crossing detection, and the clamping of interpolated
/// timestamps to segment bounds.
pub const EPSILON: f64 = 1e-6;

/// When a range bound is hit in the strict interior of a linear segment,
/// emit the exact bound value at the solved timestamp instead of the value
/// re-interpolated from the timestamp. One policy for every call site.
pub(crate) const RANGE_ROUNDOFF: bool = true;

pub use crate::errors::{Error, ParseError};

pub use crate::collections::base::collection::Collection;
pub use crate::collections::base::span::Span;
pub use crate::collections::base::span_set::SpanSet;
pub use crate::collections::datetime::{TsTzSet, TsTzSpan, TsTzSpanSet};
pub use crate::collections::number::{FloatSpan, FloatSpanSet, IntSpan, IntSpanSet};

pub use crate::boxes::tbox::TBox;
#[cfg(feature = "geo")]
pub use crate::boxes::stbox::STBox;

pub use crate::base::{BaseType, Text};
pub use crate::base::npoint::NPoint;

/// Temporal network position.
pub type TNpoint = crate::temporal::temporal::Temporal<NPoint>;
#[cfg(feature = "geo")]
pub use crate::base::point::{GeogPoint, GeomPoint};

pub use crate::temporal::interpolation::TInterpolation;
pub use crate::temporal::temporal::Temporal;
pub use crate::temporal::tinstant::TInstant;
pub use crate::temporal::tinstant_set::TInstantSet;
pub use crate::temporal::tsequence::TSequence;
pub use crate::temporal::tsequence_set::TSequenceSet;

pub use crate::temporal::number::{TFloat, TFloatInst, TFloatSeq, TFloatSeqSet, TInt, TIntInst, TIntSeq, TIntSeqSet};
pub use crate::temporal::simplify::SimplifiableTemporal;
pub use crate::temporal::tbool::{TBool, TBoolInst, TBoolSeq, TBoolSeqSet};
pub use crate::temporal::ttext::{TText, TTextInst, TTextSeq, TTextSeqSet};
#[cfg(feature = "geo")]
pub use crate::temporal::point::{TGeogPoint, TGeomPoint, TGeomPointInst, TGeomPointSeq, TGeomPointSeqSet, TPoint, Trajectory};

pub use crate::aggregate::UnionAggregator;
pub use crate::selectivity::{period_selectivity, PeriodOperator, PeriodStats};
