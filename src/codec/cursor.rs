//! Forward-only byte cursor.
//!
//! All record decoders read through this; it never seeks backwards and it
//! refuses to read past the end of the buffer, so a single misread field
//! surfaces as a `ShortRecord` instead of silently desynchronizing the
//! rest of the response.

use crate::error::ProtocolError;

/// All wire integers and floats are little-endian. The daemon serializes
/// host-order structs and both ends of this protocol run on little-endian
/// hardware in practice; a big-endian daemon would need a byte-swapped
/// build of these decoders.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    record: &'static str,
}

impl<'a> Cursor<'a> {
    /// Start a cursor at `at`, labeled with the record name for error
    /// reporting.
    pub fn new(buf: &'a [u8], at: usize, record: &'static str) -> Self {
        Self {
            buf,
            pos: at,
            record,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.pos + n > self.buf.len() {
            return Err(ProtocolError::ShortRecord {
                record: self.record,
                offset: self.pos,
                needed: n,
                available: self.buf.len().saturating_sub(self.pos),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        self.take(n)
    }

    /// Skip alignment padding or reserved space.
    pub fn skip(&mut self, n: usize) -> Result<(), ProtocolError> {
        self.take(n).map(|_| ())
    }

    pub fn u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn u64(&mut self) -> Result<u64, ProtocolError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn f32(&mut self) -> Result<f32, ProtocolError> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn f64(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }
}
