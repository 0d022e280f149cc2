use std::fmt;
use std::str::FromStr;

use crate::errors::ParseError;

/// How a sequence behaves between its composing instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TInterpolation {
    /// The value holds until the next instant.
    Stepwise,
    /// The value varies linearly towards the next instant; only continuous
    /// base types support it.
    Linear,
}

impl TInterpolation {
    pub fn is_linear(self) -> bool {
        matches!(self, TInterpolation::Linear)
    }
}

impl FromStr for TInterpolation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(TInterpolation::Linear),
            "stepwise" | "step" => Ok(TInterpolation::Stepwise),
            other => Err(ParseError::new("interpolation", other.to_string())),
        }
    }
}

impl fmt::Display for TInterpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TInterpolation::Linear => write!(f, "Linear"),
            TInterpolation::Stepwise => write!(f, "Stepwise"),
        }
    }
}
