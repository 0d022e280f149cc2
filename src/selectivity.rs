//! Planner-style selectivity estimation for period operators, driven by
//! histograms of period bounds and period lengths. Without statistics
//! every operator falls back to a default of 0.01.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::collections::base::span::cmp_bounds;
use crate::collections::datetime::TsTzSpan;
use crate::utils::to_micros;

/// Default selectivity when statistics are absent or unusable.
pub const DEFAULT_SELECTIVITY: f64 = 0.01;

/// The period operators the estimator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodOperator {
    /// `=`
    Eq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<<#` strictly before
    Before,
    /// `&<#` not after
    OverBefore,
    /// `#>>` strictly after
    After,
    /// `#&>` not before
    OverAfter,
    /// `&&`
    Overlaps,
    /// `@>`
    Contains,
    /// `<@`
    Contained,
    /// `-|-`
    Adjacent,
}

/// Statistics slots for a period-typed column: an equi-depth histogram
/// of period bounds and one of period lengths (in seconds).
#[derive(Debug, Clone, Default)]
pub struct PeriodStats {
    pub bounds_hist: Vec<TsTzSpan>,
    pub length_hist: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Bound {
    t: DateTime<Utc>,
    lower: bool,
    inclusive: bool,
}

fn bound_cmp(a: &Bound, b: &Bound) -> Ordering {
    cmp_bounds(a.t, b.t, a.lower, b.lower, a.inclusive, b.inclusive)
}

/// Distance between two bounds in seconds.
fn bound_distance(a: &Bound, b: &Bound) -> f64 {
    ((to_micros(&b.t) - to_micros(&a.t)).abs() as f64) / 1e6
}

/// Greatest index whose histogram bound sorts below the value (or equal,
/// with `equal`); -1 when all are above.
fn rbound_bsearch(value: &Bound, hist: &[Bound], equal: bool) -> i64 {
    let mut lower: i64 = -1;
    let mut upper: i64 = hist.len() as i64 - 1;
    while lower < upper {
        let middle = (lower + upper + 1) / 2;
        let c = bound_cmp(&hist[middle as usize], value);
        if c == Ordering::Less || (equal && c == Ordering::Equal) {
            lower = middle;
        } else {
            upper = middle - 1;
        }
    }
    lower
}

/// Relative position of a value within a histogram bin, in `[0, 1]`.
fn bin_position(value: &Bound, lo: &Bound, hi: &Bound) -> f64 {
    let width = bound_distance(hi, lo);
    if width <= 0.0 {
        return 0.5;
    }
    (bound_distance(value, lo) / width).clamp(0.0, 1.0)
}

/// Fraction of histogrammed values below the given bound, with in-bin
/// linear interpolation.
fn scalar_selectivity(value: &Bound, hist: &[Bound], equal: bool) -> f64 {
    let n = hist.len();
    let index = rbound_bsearch(value, hist, equal);
    let mut selec = index.max(0) as f64 / (n - 1) as f64;
    if index >= 0 && (index as usize) < n - 1 {
        selec += bin_position(value, &hist[index as usize], &hist[index as usize + 1])
            / (n - 1) as f64;
    }
    selec
}

/// Greatest length-histogram index below the value; -1 when all are
/// above.
fn length_bsearch(hist: &[f64], value: f64, equal: bool) -> i64 {
    let mut lower: i64 = -1;
    let mut upper: i64 = hist.len() as i64 - 1;
    while lower < upper {
        let middle = (lower + upper + 1) / 2;
        let v = hist[middle as usize];
        if v < value || (equal && v <= value) {
            lower = middle;
        } else {
            upper = middle - 1;
        }
    }
    lower
}

/// Fraction of period lengths below `x`.
fn length_frac_below(hist: &[f64], x: f64) -> f64 {
    if hist.len() < 2 {
        return 0.5;
    }
    let n = hist.len();
    let index = length_bsearch(hist, x, true);
    let mut frac = index.max(0) as f64 / (n - 1) as f64;
    if index >= 0 && (index as usize) < n - 1 {
        let lo = hist[index as usize];
        let hi = hist[index as usize + 1];
        let pos = if hi > lo { ((x - lo) / (hi - lo)).clamp(0.0, 1.0) } else { 0.5 };
        frac += pos / (n - 1) as f64;
    }
    frac.clamp(0.0, 1.0)
}

/// Average of `P(length < x)` over `[a, b]`, by the trapezoid rule on
/// the cumulative fraction.
fn length_hist_frac(hist: &[f64], a: f64, b: f64) -> f64 {
    (length_frac_below(hist, a) + length_frac_below(hist, b)) / 2.0
}

/// Fraction of periods contained in the constant: the loop walks the
/// lower-bound histogram down from the bin holding the constant's upper
/// bound, weighting each bin by the share of lengths short enough to fit.
fn contained_selectivity(
    const_lower: &Bound,
    const_upper: &Bound,
    hist_lower: &[Bound],
    length_hist: &[f64],
) -> f64 {
    let n = hist_lower.len();
    // Periods with a lower bound above the constant upper cannot match.
    let probe = Bound { t: const_upper.t, lower: true, inclusive: !const_upper.inclusive };
    let upper_index = rbound_bsearch(&probe, hist_lower, false);
    let mut bin_width = if upper_index >= 0 && (upper_index as usize) < n - 1 {
        bin_position(&probe, &hist_lower[upper_index as usize], &hist_lower[upper_index as usize + 1])
    } else {
        0.0
    };
    let mut prev_dist = 0.0;
    let mut sum_frac = 0.0;
    let mut i = upper_index;
    while i >= 0 {
        let idx = i as usize;
        let mut width = bin_width;
        let final_bin = bound_cmp(&hist_lower[idx], const_lower) == Ordering::Less;
        let dist = if final_bin {
            if idx < n - 1 {
                width -= bin_position(const_lower, &hist_lower[idx], &hist_lower[idx + 1]);
                width = width.max(0.0);
            }
            bound_distance(const_lower, const_upper)
        } else {
            bound_distance(&hist_lower[idx], const_upper)
        };
        sum_frac += length_hist_frac(length_hist, prev_dist, dist) * width / (n - 1) as f64;
        if final_bin {
            break;
        }
        bin_width = 1.0;
        prev_dist = dist;
        i -= 1;
    }
    sum_frac
}

/// Fraction of periods containing the constant: as above, but each bin
/// contributes the share of lengths long enough to reach the constant
/// upper bound.
fn contains_selectivity(
    const_lower: &Bound,
    const_upper: &Bound,
    hist_lower: &[Bound],
    length_hist: &[f64],
) -> f64 {
    let n = hist_lower.len();
    let lower_index = rbound_bsearch(const_lower, hist_lower, true);
    let mut bin_width = if lower_index >= 0 && (lower_index as usize) < n - 1 {
        bin_position(const_lower, &hist_lower[lower_index as usize], &hist_lower[lower_index as usize + 1])
    } else {
        0.0
    };
    let mut prev_dist = bound_distance(const_lower, const_upper);
    let mut sum_frac = 0.0;
    let mut i = lower_index;
    while i >= 0 {
        let idx = i as usize;
        let dist = bound_distance(&hist_lower[idx], const_upper);
        sum_frac +=
            (1.0 - length_hist_frac(length_hist, prev_dist, dist)) * bin_width / (n - 1) as f64;
        bin_width = 1.0;
        prev_dist = dist;
        i -= 1;
    }
    sum_frac
}

fn adjacent_selectivity(
    const_lower: &Bound,
    const_upper: &Bound,
    hist_lower: &[Bound],
    hist_upper: &[Bound],
) -> f64 {
    let n = hist_lower.len();
    let mut selec = 0.0;
    let index1 = rbound_bsearch(const_lower, hist_upper, true);
    if index1 > 0 && (index1 as usize) < n - 1 {
        let s = 1.0 / (n - 1) as f64;
        selec += s
            * bin_position(const_lower, &hist_upper[index1 as usize], &hist_upper[index1 as usize + 1])
            / (n - 1) as f64;
    }
    let index2 = rbound_bsearch(const_upper, hist_lower, true);
    if index2 > 0 && (index2 as usize) < n - 1 {
        let s = 1.0 / (n - 1) as f64;
        selec += s
            * (1.0
                - bin_position(const_upper, &hist_lower[index2 as usize], &hist_lower[index2 as usize + 1])
                    / (n - 1) as f64);
    }
    selec
}

/// Estimates the fraction of a period column matching `column op constant`,
/// as a probability in `[0, 1]`.
///
/// ## Example
/// ```
/// # use tempus::{period_selectivity, PeriodOperator, TsTzSpan};
/// # use std::str::FromStr;
/// let constant = TsTzSpan::from_str("[2000-01-01, 2000-01-02)").unwrap();
/// assert_eq!(period_selectivity(None, PeriodOperator::Overlaps, &constant), 0.01);
/// ```
pub fn period_selectivity(
    stats: Option<&PeriodStats>,
    op: PeriodOperator,
    constant: &TsTzSpan,
) -> f64 {
    let Some(stats) = stats else {
        return DEFAULT_SELECTIVITY;
    };
    if stats.bounds_hist.len() < 2 {
        return DEFAULT_SELECTIVITY;
    }
    let hist_lower: Vec<Bound> = stats
        .bounds_hist
        .iter()
        .map(|p| Bound { t: p.lower(), lower: true, inclusive: p.is_lower_inclusive() })
        .collect();
    let hist_upper: Vec<Bound> = stats
        .bounds_hist
        .iter()
        .map(|p| Bound { t: p.upper(), lower: false, inclusive: p.is_upper_inclusive() })
        .collect();
    let const_lower =
        Bound { t: constant.lower(), lower: true, inclusive: constant.is_lower_inclusive() };
    let const_upper =
        Bound { t: constant.upper(), lower: false, inclusive: constant.is_upper_inclusive() };

    let needs_length = matches!(op, PeriodOperator::Contains | PeriodOperator::Contained);
    if needs_length && stats.length_hist.len() < 2 {
        return DEFAULT_SELECTIVITY;
    }

    let selec = match op {
        // Equality would need most-common-value statistics, which the
        // histogram slots do not carry.
        PeriodOperator::Eq => DEFAULT_SELECTIVITY,
        PeriodOperator::Lt => scalar_selectivity(&const_lower, &hist_lower, false),
        PeriodOperator::Le => scalar_selectivity(&const_lower, &hist_lower, true),
        PeriodOperator::Gt => 1.0 - scalar_selectivity(&const_lower, &hist_lower, false),
        PeriodOperator::Ge => 1.0 - scalar_selectivity(&const_lower, &hist_lower, true),
        // var <<# const when upper(var) < lower(const).
        PeriodOperator::Before => scalar_selectivity(&const_lower, &hist_upper, false),
        // var &<# const when upper(var) <= upper(const).
        PeriodOperator::OverBefore => scalar_selectivity(&const_upper, &hist_upper, true),
        // var #>> const when lower(var) > upper(const).
        PeriodOperator::After => 1.0 - scalar_selectivity(&const_upper, &hist_lower, true),
        // var #&> const when lower(var) >= lower(const).
        PeriodOperator::OverAfter => 1.0 - scalar_selectivity(&const_lower, &hist_lower, false),
        // A && B is the complement of the two mutually exclusive
        // before/after cases.
        PeriodOperator::Overlaps => {
            let before = scalar_selectivity(&const_lower, &hist_upper, false);
            let after = 1.0 - scalar_selectivity(&const_upper, &hist_lower, true);
            1.0 - before - after
        }
        PeriodOperator::Contains => {
            contains_selectivity(&const_lower, &const_upper, &hist_lower, &stats.length_hist)
        }
        PeriodOperator::Contained => {
            contained_selectivity(&const_lower, &const_upper, &hist_lower, &stats.length_hist)
        }
        PeriodOperator::Adjacent => {
            adjacent_selectivity(&const_lower, &const_upper, &hist_lower, &hist_upper)
        }
    };
    selec.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn stats() -> PeriodStats {
        // Ten periods of one day, starting daily from 2000-01-01.
        let bounds_hist = (1..=10)
            .map(|d| {
                TsTzSpan::from_str(&format!("[2000-01-{d:02}, 2000-01-{:02})", d + 1)).unwrap()
            })
            .collect();
        let length_hist = vec![86_400.0; 10];
        PeriodStats { bounds_hist, length_hist }
    }

    fn constant(s: &str) -> TsTzSpan {
        TsTzSpan::from_str(s).unwrap()
    }

    #[test]
    fn default_without_statistics() {
        let c = constant("[2000-01-01, 2000-01-02)");
        for op in [
            PeriodOperator::Eq,
            PeriodOperator::Overlaps,
            PeriodOperator::Contains,
            PeriodOperator::Adjacent,
        ] {
            assert_eq!(period_selectivity(None, op, &c), DEFAULT_SELECTIVITY);
        }
    }

    #[test]
    fn scalar_estimates_are_monotone() {
        let s = stats();
        let early = period_selectivity(Some(&s), PeriodOperator::Lt, &constant("[2000-01-02, 2000-01-03)"));
        let late = period_selectivity(Some(&s), PeriodOperator::Lt, &constant("[2000-01-08, 2000-01-09)"));
        assert!(early < late);
        assert!((0.0..=1.0).contains(&early));
    }

    #[test]
    fn before_and_after_are_complementary_around_overlaps() {
        let s = stats();
        let c = constant("[2000-01-05, 2000-01-06)");
        let before = period_selectivity(Some(&s), PeriodOperator::Before, &c);
        let after = period_selectivity(Some(&s), PeriodOperator::After, &c);
        let overlaps = period_selectivity(Some(&s), PeriodOperator::Overlaps, &c);
        assert!((before + after + overlaps - 1.0).abs() < 1e-9);
    }

    #[test]
    fn containment_respects_the_length_histogram() {
        let s = stats();
        // A wide constant easily contains the one-day periods.
        let wide = period_selectivity(
            Some(&s),
            PeriodOperator::Contained,
            &constant("[2000-01-01, 2000-01-20)"),
        );
        // A narrow one cannot contain them.
        let narrow = period_selectivity(
            Some(&s),
            PeriodOperator::Contained,
            &constant("[2000-01-05, 2000-01-05 06:00:00+00)"),
        );
        assert!(wide > narrow);
        assert!((0.0..=1.0).contains(&wide));
    }

    #[test]
    fn probabilities_stay_clamped() {
        let s = stats();
        for op in [
            PeriodOperator::Lt,
            PeriodOperator::Ge,
            PeriodOperator::Overlaps,
            PeriodOperator::Contains,
            PeriodOperator::Contained,
            PeriodOperator::Adjacent,
        ] {
            let p = period_selectivity(Some(&s), op, &constant("[1999-01-01, 2001-01-01)"));
            assert!((0.0..=1.0).contains(&p), "{op:?} produced {p}");
        }
    }
}
