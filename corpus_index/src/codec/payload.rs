//! Growable big-endian payload buffer

use crate::config::compile_time::codec::PAYLOAD_BUFFER_INCREMENT;

/// Owned byte buffer for typed term payloads.
///
/// Starts with room for one increment and grows in whole increments, so a
/// run of `<l>` values never reallocates more than once per value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadBuffer {
    bytes: Vec<u8>,
}

impl PayloadBuffer {
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(PAYLOAD_BUFFER_INCREMENT),
        }
    }

    fn reserve(&mut self, additional: usize) {
        let needed = self.bytes.len() + additional;
        if needed > self.bytes.capacity() {
            let target = needed.div_ceil(PAYLOAD_BUFFER_INCREMENT) * PAYLOAD_BUFFER_INCREMENT;
            self.bytes.reserve_exact(target - self.bytes.len());
        }
    }

    pub fn put_i8(&mut self, value: i8) -> &mut Self {
        self.put_bytes(&value.to_be_bytes())
    }

    pub fn put_i16(&mut self, value: i16) -> &mut Self {
        self.put_bytes(&value.to_be_bytes())
    }

    pub fn put_i32(&mut self, value: i32) -> &mut Self {
        self.put_bytes(&value.to_be_bytes())
    }

    pub fn put_i64(&mut self, value: i64) -> &mut Self {
        self.put_bytes(&value.to_be_bytes())
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.reserve(bytes.len());
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Default for PayloadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_layout() {
        let mut buffer = PayloadBuffer::new();
        buffer.put_i8(-1).put_i16(258).put_i32(3).put_i64(-2);

        assert_eq!(
            buffer.as_slice(),
            &[
                0xFF, // i8
                0x01, 0x02, // i16
                0, 0, 0, 3, // i32
                0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, // i64
            ]
        );
    }

    #[test]
    fn test_growth_keeps_existing_bytes() {
        let mut buffer = PayloadBuffer::new();
        assert!(buffer.capacity() >= PAYLOAD_BUFFER_INCREMENT);

        for value in 0..10i64 {
            buffer.put_i64(value);
        }

        assert_eq!(buffer.len(), 80);
        assert!(buffer.capacity() >= 80);
        assert_eq!(&buffer.as_slice()[72..], &9i64.to_be_bytes());
        assert_eq!(&buffer.as_slice()[..8], &0i64.to_be_bytes());
    }
}
