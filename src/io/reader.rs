//! Cursor over a byte buffer with big-endian reads.

use crate::error::{Error, Result};

/*
Reading a Standard MIDI File
============================

Every multi-byte number in an SMF is big-endian. Delta times and chunk-local
lengths use a variable-length quantity (VLQ):

  byte        1xxxxxxx 1xxxxxxx 0xxxxxxx
              ^ continuation bit, 7 data bits per byte

    0x00        -> 0
    0x7F        -> 127
    0x81 0x00   -> 128
    0xFF 0x7F   -> 16383

The format caps a VLQ at four bytes (0x0FFF_FFFF), which we enforce so a
corrupt file fails instead of spinning through the buffer.
*/

const MAX_VLQ_BYTES: usize = 4;

pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Borrow `len` bytes and advance past them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(Error::TruncatedData {
                offset: self.pos,
                wanted: len,
                len: self.data.len(),
            })?;

        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_be_bytes(self.take_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    /// Fixed-length ASCII string (chunk tags, meta text).
    ///
    /// Non-ASCII bytes are replaced rather than rejected; meta text in the
    /// wild is frequently Latin-1 or Shift-JIS.
    pub fn read_string(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Variable-length quantity (MIDI delta-time encoding).
    pub fn read_vlq(&mut self) -> Result<u32> {
        let start = self.pos;
        let mut value: u32 = 0;

        for _ in 0..MAX_VLQ_BYTES {
            let byte = self.read_u8()?;
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }

        Err(Error::InvalidFormat(format!(
            "variable-length quantity at offset {start} exceeds {MAX_VLQ_BYTES} bytes"
        )))
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    /// Move the cursor back one byte (running status re-read).
    pub fn rewind_one(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    /// Jump to an absolute offset. Seeking to the end is allowed.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::TruncatedData {
                offset: self.pos,
                wanted: pos - self.pos,
                len: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vlq_decodes_reference_values() {
        assert_eq!(ByteReader::new(&[0x00]).read_vlq().unwrap(), 0);
        assert_eq!(ByteReader::new(&[0x7F]).read_vlq().unwrap(), 127);
        assert_eq!(ByteReader::new(&[0x81, 0x00]).read_vlq().unwrap(), 128);
        assert_eq!(ByteReader::new(&[0xFF, 0x7F]).read_vlq().unwrap(), 16_383);
        assert_eq!(
            ByteReader::new(&[0xFF, 0xFF, 0xFF, 0x7F]).read_vlq().unwrap(),
            0x0FFF_FFFF
        );
    }

    #[test]
    fn vlq_longer_than_four_bytes_is_rejected() {
        let mut reader = ByteReader::new(&[0x81, 0x81, 0x81, 0x81, 0x00]);
        assert!(matches!(reader.read_vlq(), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn vlq_missing_terminator_is_truncated() {
        let mut reader = ByteReader::new(&[0x81, 0x81]);
        assert!(matches!(
            reader.read_vlq(),
            Err(Error::TruncatedData { .. })
        ));
    }

    #[test]
    fn big_endian_reads() {
        let mut reader = ByteReader::new(&[
            0x12, 0x34, 0xDE, 0xAD, 0xBE, 0xEF, 0xFF, 0xFF, 0xFE, 0x80,
        ]);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_i16().unwrap(), -1);
        assert_eq!(reader.read_i8().unwrap(), -2);
        assert_eq!(reader.read_u8().unwrap(), 0x80);
        assert!(reader.is_at_end());
    }

    #[test]
    fn signed_32_bit_read() {
        let mut reader = ByteReader::new(&[0xFF, 0xFF, 0xFF, 0xFE]);
        assert_eq!(reader.read_i32().unwrap(), -2);
    }

    #[test]
    fn read_past_end_reports_offset() {
        let mut reader = ByteReader::new(&[0x4D, 0x54]);
        reader.read_u8().unwrap();
        assert_eq!(
            reader.read_u16(),
            Err(Error::TruncatedData {
                offset: 1,
                wanted: 2,
                len: 2
            })
        );
        // A failed read leaves the cursor untouched
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn string_skip_and_seek() {
        let mut reader = ByteReader::new(b"MThdxxMTrk");
        assert_eq!(reader.read_string(4).unwrap(), "MThd");
        reader.skip(2).unwrap();
        assert_eq!(reader.read_string(4).unwrap(), "MTrk");
        reader.seek(4).unwrap();
        assert_eq!(reader.remaining(), 6);
        reader.rewind_one();
        assert_eq!(reader.position(), 3);
        assert!(reader.seek(11).is_err());
        assert!(reader.skip(8).is_err());
    }
}
