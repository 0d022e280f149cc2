//! Temporal texts.

use crate::base::Text;
use crate::temporal::lifting::{lift_binary, lift_binary_base, lift_unary, LiftSpec};
use crate::temporal::temporal::Temporal;
use crate::temporal::tinstant::TInstant;
use crate::temporal::tsequence::TSequence;
use crate::temporal::tsequence_set::TSequenceSet;

pub type TText = Temporal<Text>;
pub type TTextInst = TInstant<Text>;
pub type TTextSeq = TSequence<Text>;
pub type TTextSeqSet = TSequenceSet<Text>;

impl TText {
    /// Pointwise concatenation over the common support.
    pub fn concat(&self, other: &Self) -> Option<Self> {
        lift_binary(self, other, &LiftSpec::pointwise(false), &|a: &Text, b: &Text| {
            Text(format!("{}{}", a.0, b.0))
        })
    }

    /// Appends a constant suffix to every value.
    pub fn concat_base(&self, suffix: &Text) -> Self {
        lift_binary_base(self, suffix, &LiftSpec::pointwise(false), &|a: &Text, b: &Text| {
            Text(format!("{}{}", a.0, b.0))
        })
    }

    pub fn upper(&self) -> Self {
        lift_unary(self, false, &|v: &Text| Text(v.0.to_uppercase()))
    }

    pub fn lower(&self) -> Self {
        lift_unary(self, false, &|v: &Text| Text(v.0.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_timestamp;

    #[test]
    fn concat_and_case() {
        let a: TText = "[\"a\"@2000-01-01, \"b\"@2000-01-02]".parse().unwrap();
        let b: TText = "[\"x\"@2000-01-01, \"y\"@2000-01-02]".parse().unwrap();
        let joined = a.concat(&b).unwrap();
        assert_eq!(
            joined.value_at_timestamp(parse_timestamp("2000-01-01").unwrap()),
            Some(Text::from("ax"))
        );
        let up = a.upper();
        assert_eq!(
            up.value_at_timestamp(parse_timestamp("2000-01-02").unwrap()),
            Some(Text::from("B"))
        );
        let suffixed = a.concat_base(&Text::from("!"));
        assert_eq!(
            suffixed.value_at_timestamp(parse_timestamp("2000-01-01").unwrap()),
            Some(Text::from("a!"))
        );
    }

    #[test]
    fn text_sequence_round_trip() {
        let a: TText = "[\"a\"@2000-01-01, \"b, c\"@2000-01-02]".parse().unwrap();
        let again: TText = a.to_string().parse().unwrap();
        assert_eq!(a, again);
    }
}
