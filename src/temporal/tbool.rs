//! Temporal Booleans and the temporal comparison operators producing
//! them.

use std::ops::{BitAnd, BitOr, Not};

use crate::base::BaseType;
use crate::collections::datetime::TsTzSpanSet;
use crate::temporal::lifting::{lift_binary, lift_binary_base, lift_unary, LiftSpec};
use crate::temporal::temporal::Temporal;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;

pub type TBool = Temporal<bool>;
pub type TBoolInst = TInstant<bool>;
pub type TBoolSeq = TSequence<bool>;
pub type TBoolSeqSet = TSequenceSet<bool>;

impl TBool {
    pub fn temporal_and(&self, other: &Self) -> Option<Self> {
        lift_binary(self, other, &LiftSpec::pointwise(false), &|a, b| *a && *b)
    }

    pub fn temporal_or(&self, other: &Self) -> Option<Self> {
        lift_binary(self, other, &LiftSpec::pointwise(false), &|a, b| *a || *b)
    }

    pub fn temporal_not(&self) -> Self {
        lift_unary(self, false, &|v: &bool| !v)
    }

    pub fn at_true(&self) -> Option<Self> {
        self.at_value(&true)
    }

    pub fn at_false(&self) -> Option<Self> {
        self.at_value(&false)
    }

    /// The periods during which the value is true.
    pub fn when_true(&self) -> Option<TsTzSpanSet> {
        self.at_true().map(|t| t.time())
    }
}

impl BitAnd for &TBool {
    type Output = Option<TBool>;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.temporal_and(rhs)
    }
}

impl BitAnd<bool> for &TBool {
    type Output = TBool;

    fn bitand(self, rhs: bool) -> Self::Output {
        lift_binary_base(self, &rhs, &LiftSpec::pointwise(false), &|a, b| *a && *b)
    }
}

impl BitOr for &TBool {
    type Output = Option<TBool>;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.temporal_or(rhs)
    }
}

impl BitOr<bool> for &TBool {
    type Output = TBool;

    fn bitor(self, rhs: bool) -> Self::Output {
        lift_binary_base(self, &rhs, &LiftSpec::pointwise(false), &|a, b| *a || *b)
    }
}

impl Not for &TBool {
    type Output = TBool;

    fn not(self) -> Self::Output {
        self.temporal_not()
    }
}

// ------------------------- Temporal comparisons ------------------------

fn cmp_spec<T: BaseType>(linear: bool) -> LiftSpec<T> {
    // Comparisons over linear inputs flip instantaneously at crossings.
    LiftSpec { reslinear: false, discont: linear, turning: None }
}

impl<T: BaseType> Temporal<T> {
    /// Temporal equality against a constant.
    pub fn temporal_eq_base(&self, value: &T) -> TBool {
        lift_binary_base(self, value, &cmp_spec(self.is_linear()), &|a, b| a == b)
    }

    pub fn temporal_ne_base(&self, value: &T) -> TBool {
        lift_binary_base(self, value, &cmp_spec(self.is_linear()), &|a, b| a != b)
    }

    /// Temporal equality of two temporal values over their common
    /// support.
    pub fn temporal_eq(&self, other: &Self) -> Option<TBool> {
        let spec = cmp_spec(self.is_linear() || other.is_linear());
        lift_binary(self, other, &spec, &|a, b| a == b)
    }

    pub fn temporal_ne(&self, other: &Self) -> Option<TBool> {
        let spec = cmp_spec(self.is_linear() || other.is_linear());
        lift_binary(self, other, &spec, &|a, b| a != b)
    }
}

impl<T: BaseType + PartialOrd> Temporal<T> {
    pub fn temporal_lt_base(&self, value: &T) -> TBool {
        lift_binary_base(self, value, &cmp_spec(self.is_linear()), &|a, b| a < b)
    }

    pub fn temporal_le_base(&self, value: &T) -> TBool {
        lift_binary_base(self, value, &cmp_spec(self.is_linear()), &|a, b| a <= b)
    }

    pub fn temporal_gt_base(&self, value: &T) -> TBool {
        lift_binary_base(self, value, &cmp_spec(self.is_linear()), &|a, b| a > b)
    }

    pub fn temporal_ge_base(&self, value: &T) -> TBool {
        lift_binary_base(self, value, &cmp_spec(self.is_linear()), &|a, b| a >= b)
    }

    pub fn temporal_lt(&self, other: &Self) -> Option<TBool> {
        let spec = cmp_spec(self.is_linear() || other.is_linear());
        lift_binary(self, other, &spec, &|a, b| a < b)
    }

    pub fn temporal_le(&self, other: &Self) -> Option<TBool> {
        let spec = cmp_spec(self.is_linear() || other.is_linear());
        lift_binary(self, other, &spec, &|a, b| a <= b)
    }

    pub fn temporal_gt(&self, other: &Self) -> Option<TBool> {
        let spec = cmp_spec(self.is_linear() || other.is_linear());
        lift_binary(self, other, &spec, &|a, b| a > b)
    }

    pub fn temporal_ge(&self, other: &Self) -> Option<TBool> {
        let spec = cmp_spec(self.is_linear() || other.is_linear());
        lift_binary(self, other, &spec, &|a, b| a >= b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_timestamp;
    use chrono::{DateTime, Utc};

    fn b(s: &str) -> TBool {
        s.parse().unwrap()
    }

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn boolean_algebra() {
        let a = b("[t@2000-01-01, t@2000-01-02, f@2000-01-03]");
        let c = b("[t@2000-01-01, f@2000-01-02, f@2000-01-03]");
        let and = (&a & &c).unwrap();
        assert_eq!(and.value_at_timestamp(ts("2000-01-01")), Some(true));
        assert_eq!(and.value_at_timestamp(ts("2000-01-02")), Some(false));
        let or = (&a | &c).unwrap();
        assert_eq!(or.value_at_timestamp(ts("2000-01-02")), Some(true));
        let not = !&a;
        assert_eq!(not.value_at_timestamp(ts("2000-01-01")), Some(false));
    }

    #[test]
    fn when_true_returns_the_holding_periods() {
        let a = b("[t@2000-01-01, f@2000-01-02, f@2000-01-03]");
        let holds = a.when_true().unwrap();
        assert_eq!(holds, "{[2000-01-01, 2000-01-02)}".parse().unwrap());
    }

    #[test]
    fn comparison_of_crossing_floats() {
        let a: crate::TFloat = "[1@2000-01-01, 3@2000-01-03]".parse().unwrap();
        let c: crate::TFloat = "[3@2000-01-01, 1@2000-01-03]".parse().unwrap();
        let lt = a.temporal_lt(&c).unwrap();
        assert_eq!(lt.value_at_timestamp(ts("2000-01-01")), Some(true));
        assert_eq!(lt.value_at_timestamp(ts("2000-01-02")), Some(false));
        let eq = a.temporal_eq(&c).unwrap();
        assert_eq!(eq.value_at_timestamp(ts("2000-01-02")), Some(true));
        assert_eq!(eq.value_at_timestamp(ts("2000-01-01")), Some(false));
    }

    #[test]
    fn comparison_against_base() {
        let a: crate::TFloat = "[1@2000-01-01, 5@2000-01-05]".parse().unwrap();
        let ge = a.temporal_ge_base(&3.0);
        assert_eq!(ge.value_at_timestamp(ts("2000-01-02")), Some(false));
        assert_eq!(ge.value_at_timestamp(ts("2000-01-03")), Some(true));
        assert_eq!(ge.value_at_timestamp(ts("2000-01-04")), Some(true));
    }
}
