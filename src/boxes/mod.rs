pub mod tbox;

#[cfg(feature = "geo")]
pub mod stbox;
