use std::fmt;
use std::hash::{Hash, Hasher};

use crate::collections::base::collection::Collection;
use crate::collections::datetime::TsTzSpan;

/// Bounding box of a temporal point: an axis-aligned 2-D or 3-D box, an
/// optional time period, and the geodetic flag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct STBox {
    xmin: Option<f64>,
    xmax: Option<f64>,
    ymin: Option<f64>,
    ymax: Option<f64>,
    zmin: Option<f64>,
    zmax: Option<f64>,
    geodetic: bool,
    srid: i32,
    period: Option<TsTzSpan>,
}

impl STBox {
    pub fn of_point(x: f64, y: f64, z: Option<f64>, srid: i32, geodetic: bool) -> Self {
        Self {
            xmin: Some(x),
            xmax: Some(x),
            ymin: Some(y),
            ymax: Some(y),
            zmin: z,
            zmax: z,
            geodetic,
            srid,
            period: None,
        }
    }

    pub fn has_space(&self) -> bool {
        self.xmin.is_some()
    }

    pub fn has_z(&self) -> bool {
        self.zmin.is_some()
    }

    pub fn has_time(&self) -> bool {
        self.period.is_some()
    }

    pub fn is_geodetic(&self) -> bool {
        self.geodetic
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn xmin(&self) -> Option<f64> {
        self.xmin
    }

    pub fn xmax(&self) -> Option<f64> {
        self.xmax
    }

    pub fn ymin(&self) -> Option<f64> {
        self.ymin
    }

    pub fn ymax(&self) -> Option<f64> {
        self.ymax
    }

    pub fn zmin(&self) -> Option<f64> {
        self.zmin
    }

    pub fn zmax(&self) -> Option<f64> {
        self.zmax
    }

    pub fn to_tstzspan(&self) -> Option<TsTzSpan> {
        self.period.clone()
    }

    pub(crate) fn set_period(&mut self, period: TsTzSpan) {
        self.period = Some(period);
    }

    pub fn expand(&mut self, other: &STBox) {
        fn widen(
            a_min: Option<f64>,
            a_max: Option<f64>,
            b_min: Option<f64>,
            b_max: Option<f64>,
        ) -> (Option<f64>, Option<f64>) {
            match ((a_min, a_max), (b_min, b_max)) {
                ((Some(amin), Some(amax)), (Some(bmin), Some(bmax))) => {
                    (Some(amin.min(bmin)), Some(amax.max(bmax)))
                }
                ((a, b), (None, None)) => (a, b),
                ((None, None), (a, b)) => (a, b),
                (a, _) => a,
            }
        }
        (self.xmin, self.xmax) = widen(self.xmin, self.xmax, other.xmin, other.xmax);
        (self.ymin, self.ymax) = widen(self.ymin, self.ymax, other.ymin, other.ymax);
        (self.zmin, self.zmax) = widen(self.zmin, self.zmax, other.zmin, other.zmax);
        self.period = match (self.period.take(), other.period.clone()) {
            (Some(a), Some(b)) => Some(a.hull(&b)),
            (a, b) => a.or(b),
        };
    }

    pub fn overlaps(&self, other: &STBox) -> bool {
        fn axis(a_min: Option<f64>, a_max: Option<f64>, b_min: Option<f64>, b_max: Option<f64>) -> bool {
            match ((a_min, a_max), (b_min, b_max)) {
                ((Some(amin), Some(amax)), (Some(bmin), Some(bmax))) => amin <= bmax && bmin <= amax,
                _ => true,
            }
        }
        if !axis(self.xmin, self.xmax, other.xmin, other.xmax)
            || !axis(self.ymin, self.ymax, other.ymin, other.ymax)
            || !axis(self.zmin, self.zmax, other.zmin, other.zmax)
        {
            return false;
        }
        if let (Some(a), Some(b)) = (&self.period, &other.period) {
            if !a.overlaps(b) {
                return false;
            }
        }
        true
    }
}

impl Hash for STBox {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in [self.xmin, self.xmax, self.ymin, self.ymax, self.zmin, self.zmax] {
            state.write_u64(v.unwrap_or(f64::NAN).to_bits());
        }
        state.write_u8(self.geodetic as u8);
        state.write_i32(self.srid);
        self.period.hash(state);
    }
}

impl fmt::Display for STBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.geodetic { "GeodSTBox" } else { "STBox" };
        write!(f, "{tag}(")?;
        if let (Some(xmin), Some(ymin), Some(xmax), Some(ymax)) =
            (self.xmin, self.ymin, self.xmax, self.ymax)
        {
            match (self.zmin, self.zmax) {
                (Some(zmin), Some(zmax)) => write!(
                    f,
                    "({xmin}, {ymin}, {zmin}), ({xmax}, {ymax}, {zmax})"
                )?,
                _ => write!(f, "({xmin}, {ymin}), ({xmax}, {ymax})")?,
            }
        }
        if let Some(p) = &self.period {
            write!(f, ", {p}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_widens_every_axis() {
        let mut a = STBox::of_point(0.0, 0.0, Some(1.0), 0, false);
        a.expand(&STBox::of_point(2.0, -1.0, Some(3.0), 0, false));
        assert_eq!(a.xmax(), Some(2.0));
        assert_eq!(a.ymin(), Some(-1.0));
        assert_eq!(a.zmax(), Some(3.0));
    }

    #[test]
    fn overlap_on_shared_axes() {
        let a = STBox::of_point(0.0, 0.0, None, 0, false);
        let b = STBox::of_point(0.5, 0.0, None, 0, false);
        assert!(!a.overlaps(&b));
        let mut c = a.clone();
        c.expand(&STBox::of_point(1.0, 1.0, None, 0, false));
        assert!(c.overlaps(&b));
    }
}
