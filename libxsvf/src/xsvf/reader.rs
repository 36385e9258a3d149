//! Decoder for the XSVF byte stream: fixed-width big-endian integers,
//! variable-length bit fields and NUL-terminated strings.

use crate::xsvf::{Command, XsvfError, MAX_BITS, MAX_BYTES};

/// Cursor over an immutable, compiled-in vector stream.
pub struct Reader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, cursor: 0 }
    }

    /// Count of bytes consumed so far.
    pub fn bytes_processed(&self) -> usize {
        self.cursor
    }

    /// Next stream byte. Once the cursor passes the end of the stream
    /// this keeps returning the XCOMPLETE opcode so a truncated vector
    /// terminates instead of running off the end.
    pub fn get(&mut self) -> u8 {
        if self.cursor >= self.data.len() {
            return Command::Xcomplete.into();
        }
        let byte = self.data[self.cursor];
        self.cursor += 1;
        byte
    }

    pub fn get_u8(&mut self) -> u32 {
        u32::from(self.get())
    }

    pub fn get_u16(&mut self) -> u32 {
        let mut value = u32::from(self.get());
        value = (value << 8) | u32::from(self.get());
        value
    }

    pub fn get_u32(&mut self) -> u32 {
        let mut value = u32::from(self.get());
        value = (value << 8) | u32::from(self.get());
        value = (value << 8) | u32::from(self.get());
        value = (value << 8) | u32::from(self.get());
        value
    }

    /// Read a `count`-bit field into `buf`, consuming exactly
    /// `ceil(count / 8)` bytes. Requests beyond the buffer capacity
    /// are a format error, never a silent truncation.
    pub fn get_bits(&mut self, count: u32, buf: &mut [u8; MAX_BYTES]) -> Result<(), XsvfError> {
        if count as usize > MAX_BITS {
            return Err(XsvfError::Format {
                offset: self.cursor,
                reason: format!("{}-bit field exceeds the {}-bit limit", count, MAX_BITS),
            });
        }
        let byte_count = (count as usize + 7) / 8;
        for slot in buf.iter_mut().take(byte_count) {
            *slot = self.get();
        }
        Ok(())
    }

    /// Read a NUL-terminated string into `buf`, returning the stored
    /// length. Text beyond the buffer is dropped, but the stream is
    /// consumed through the NUL so the cursor stays aligned for the
    /// next command.
    pub fn get_string(&mut self, buf: &mut [u8]) -> usize {
        let mut stored = 0;
        loop {
            let byte = self.get();
            if byte == 0 {
                return stored;
            }
            if stored < buf.len() {
                buf[stored] = byte;
                stored += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xsvf::MAX_STRING;

    #[test]
    fn integers_are_big_endian() {
        let mut reader = Reader::new(&[0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde]);
        assert_eq!(reader.get_u8(), 0x12);
        assert_eq!(reader.get_u16(), 0x3456);
        assert_eq!(reader.get_u32(), 0x789a_bcde);
        assert_eq!(reader.bytes_processed(), 7);
    }

    #[test]
    fn reading_past_the_end_yields_xcomplete() {
        let mut reader = Reader::new(&[0xff]);
        assert_eq!(reader.get(), 0xff);
        assert_eq!(reader.get(), u8::from(Command::Xcomplete));
        assert_eq!(reader.get(), u8::from(Command::Xcomplete));
        // the clamp does not advance the cursor
        assert_eq!(reader.bytes_processed(), 1);
    }

    #[test]
    fn get_bits_consumes_whole_bytes() {
        let mut reader = Reader::new(&[0x0a, 0x55, 0xff]);
        let mut buf = [0u8; MAX_BYTES];
        reader.get_bits(12, &mut buf).unwrap();
        assert_eq!(reader.bytes_processed(), 2);
        assert_eq!(&buf[..2], &[0x0a, 0x55]);
    }

    #[test]
    fn get_bits_rejects_oversized_requests() {
        let mut reader = Reader::new(&[0u8; 4]);
        let mut buf = [0u8; MAX_BYTES];
        assert!(reader.get_bits(MAX_BITS as u32, &mut buf).is_ok());
        let mut reader = Reader::new(&[0u8; 4]);
        match reader.get_bits(MAX_BITS as u32 + 1, &mut buf) {
            Err(XsvfError::Format { .. }) => {}
            other => panic!("expected a format error, got {:?}", other.err()),
        }
        // nothing consumed on rejection
        assert_eq!(reader.bytes_processed(), 0);
    }

    #[test]
    fn long_strings_truncate_but_stay_aligned() {
        let mut stream = vec![b'x'; MAX_STRING + 20];
        stream.push(0);
        stream.push(0x42);
        let mut reader = Reader::new(&stream);
        let mut buf = [0u8; MAX_STRING];
        let stored = reader.get_string(&mut buf);
        assert_eq!(stored, MAX_STRING);
        // cursor sits just past the NUL that was actually in the stream
        assert_eq!(reader.bytes_processed(), MAX_STRING + 21);
        assert_eq!(reader.get(), 0x42);
    }

    #[test]
    fn short_strings_are_stored_whole() {
        let mut reader = Reader::new(b"hello\0rest");
        let mut buf = [0u8; MAX_STRING];
        let stored = reader.get_string(&mut buf);
        assert_eq!(&buf[..stored], b"hello");
        assert_eq!(reader.bytes_processed(), 6);
    }
}
