//! Internal tuple types used while computing value-weighted aggregates:
//! a running sum plus a count (`Double2`), and the 2-D/3-D centroid
//! accumulators (`Double3`, `Double4`). They behave as continuous base
//! types so the temporal machinery can interpolate and normalize them,
//! but they have no textual literal form.

use std::hash::Hasher;

use crate::base::{impl_time_only_bbox, BaseType};
use crate::collections::datetime::TsTzSpan;
use crate::errors::{Error, ParseError};
use crate::wire::{WireReader, WireWriter};
use crate::EPSILON;

macro_rules! double_tuple {
    ($name:ident, $label:literal, $($field:ident),+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Default)]
        pub struct $name {
            $(pub $field: f64),+
        }

        impl $name {
            pub fn new($($field: f64),+) -> Self {
                Self { $($field),+ }
            }
        }

        impl std::ops::Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self { $($field: self.$field + rhs.$field),+ }
            }
        }

        impl BaseType for $name {
            type Bbox = TsTzSpan;
            const NAME: &'static str = $label;
            const CONTINUOUS: bool = true;

            fn hash_value<H: Hasher>(&self, state: &mut H) {
                $(state.write_u64(self.$field.to_bits());)+
            }

            fn interpolate(&self, end: &Self, ratio: f64) -> Self {
                Self { $($field: self.$field + (end.$field - self.$field) * ratio),+ }
            }

            fn collinear(&self, mid: &Self, end: &Self, ratio: f64) -> bool {
                let interpolated = self.interpolate(end, ratio);
                true $(&& (mid.$field - interpolated.$field).abs() <= EPSILON)+
            }

            fn format_value(&self) -> String {
                let fields: Vec<String> = vec![$(self.$field.to_string()),+];
                format!("({})", fields.join(", "))
            }

            fn parse_value(s: &str) -> Result<Self, ParseError> {
                Err(ParseError::new($label, format!("internal type has no literal form: {s:?}")))
            }

            fn write_wire(&self, w: &mut WireWriter) {
                $(w.f64(self.$field);)+
            }

            fn read_wire(r: &mut WireReader) -> Result<Self, Error> {
                Ok(Self { $($field: r.f64()?),+ })
            }
        }

        impl_time_only_bbox!($name);
    };
}

double_tuple!(Double2, "double2", a, b);
double_tuple!(Double3, "double3", a, b, c);
double_tuple!(Double4, "double4", a, b, c, d);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn componentwise_interpolation() {
        let start = Double3::new(0.0, 10.0, -2.0);
        let end = Double3::new(4.0, 20.0, 2.0);
        assert_eq!(start.interpolate(&end, 0.5), Double3::new(2.0, 15.0, 0.0));
        assert!(start.collinear(&Double3::new(2.0, 15.0, 0.0), &end, 0.5));
        assert!(!start.collinear(&Double3::new(2.0, 16.0, 0.0), &end, 0.5));
    }
}
