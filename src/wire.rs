use bitmask_enum::bitmask;
use chrono::{DateTime, Utc};

use crate::errors::Error;
use crate::utils::{from_micros, to_micros};

/// Feature flags carried in the wire header of every temporal value.
#[bitmask(u8)]
pub enum TemporalFlags {
    /// Linear interpolation between composing instants.
    Linear,
    /// The base type admits linear interpolation at all.
    Continuous,
    /// The value has a value dimension.
    HasX,
    /// The value has a time dimension.
    HasT,
    /// Spatial values carry a Z coordinate.
    HasZ,
    /// Spatial values live on the sphere.
    Geodetic,
}

pub(crate) const SUBTYPE_INSTANT: u8 = 1;
pub(crate) const SUBTYPE_INSTANT_SET: u8 = 2;
pub(crate) const SUBTYPE_SEQUENCE: u8 = 3;
pub(crate) const SUBTYPE_SEQUENCE_SET: u8 = 4;

/// Little-endian binary writer for the wire form of spans and temporal
/// values.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn timestamp(&mut self, t: &DateTime<Utc>) {
        self.i64(to_micros(t));
    }

    pub fn bytes(&mut self, v: &[u8]) {
        self.u32(v.len() as u32);
        self.buf.extend_from_slice(v);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over the wire form. Every read checks the remaining length.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.pos + n > self.buf.len() {
            return Err(Error::ShapeViolation(format!(
                "wire form truncated at byte {} (need {} more)",
                self.pos, n
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn bool(&mut self) -> Result<bool, Error> {
        Ok(self.u8()? != 0)
    }

    pub fn i32(&mut self) -> Result<i32, Error> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().expect("4 bytes")))
    }

    pub fn u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().expect("4 bytes")))
    }

    pub fn i64(&mut self) -> Result<i64, Error> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().expect("8 bytes")))
    }

    pub fn f64(&mut self) -> Result<f64, Error> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().expect("8 bytes")))
    }

    pub fn timestamp(&mut self) -> Result<DateTime<Utc>, Error> {
        Ok(from_micros(self.i64()?))
    }

    pub fn bytes(&mut self) -> Result<Vec<u8>, Error> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn finished(&self) -> bool {
        self.pos == self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_scalars() {
        let mut w = WireWriter::new();
        w.u8(3);
        w.bool(true);
        w.i64(-42);
        w.f64(1.5);
        w.bytes(b"abc");
        let buf = w.finish();

        let mut r = WireReader::new(&buf);
        assert_eq!(r.u8().unwrap(), 3);
        assert!(r.bool().unwrap());
        assert_eq!(r.i64().unwrap(), -42);
        assert_eq!(r.f64().unwrap(), 1.5);
        assert_eq!(r.bytes().unwrap(), b"abc");
        assert!(r.finished());
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut r = WireReader::new(&[1, 2]);
        assert!(r.i64().is_err());
    }
}
