use crate::collections::base::span::Span;
use crate::collections::base::span_set::SpanSet;

/// Span over `i32` values, canonicalized to `[lower, upper)` form.
///
/// ## Example
/// ```
/// # use tempus::IntSpan;
/// # use tempus::Collection;
/// let span = IntSpan::from(1..=5);
/// assert_eq!(span, IntSpan::from(1..6));
/// assert!(span.contains(&5));
/// ```
pub type IntSpan = Span<i32>;

/// Span over `f64` values.
///
/// ## Example
/// ```
/// # use tempus::FloatSpan;
/// # use tempus::Collection;
/// let span = FloatSpan::from(23.9..78.8);
/// assert!(span.contains(&24.0));
/// assert!(!span.contains(&78.8));
/// ```
pub type FloatSpan = Span<f64>;

pub type IntSpanSet = SpanSet<i32>;
pub type FloatSpanSet = SpanSet<f64>;

impl FloatSpan {
    /// Widens both bounds by `d` on each side.
    pub fn expand_by(&self, d: f64) -> FloatSpan {
        FloatSpan::new(
            self.lower() - d,
            self.upper() + d,
            self.is_lower_inclusive(),
            self.is_upper_inclusive(),
        )
        .expect("widening keeps the bound order")
    }
}

impl From<IntSpan> for FloatSpan {
    fn from(span: IntSpan) -> Self {
        // The exclusive integer upper bound u means the values stop at
        // u - 1, which on the real line is the closed bound.
        FloatSpan::new(span.lower() as f64, (span.upper() - 1) as f64, true, true)
            .expect("canonical int spans are non-empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::base::collection::Collection;

    #[test]
    fn int_to_float_span_keeps_the_value_set() {
        let int_span = IntSpan::from(1..=3);
        let float_span = FloatSpan::from(int_span);
        assert!(float_span.contains(&3.0));
        assert!(!float_span.contains(&3.5));
    }
}
