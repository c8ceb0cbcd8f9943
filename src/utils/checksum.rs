//! Adler-32 checksum for frame integrity.
//!
//! The checksum covers bytes `[6, length)` of a frame, after encryption. It
//! detects corruption; it does not authenticate the sender.

/// Largest prime below 2^16
const MOD_ADLER: u32 = 65521;

/// Bytes that can be summed before `b` may overflow a u32
const NMAX: usize = 5552;

/// Incremental Adler-32 state.
#[derive(Debug, Clone, Copy)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Feed more bytes into the running checksum.
    pub fn update(&mut self, data: &[u8]) {
        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                self.a += u32::from(byte);
                self.b += self.a;
            }
            self.a %= MOD_ADLER;
            self.b %= MOD_ADLER;
        }
    }

    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the Adler-32 checksum of `data`.
///
/// Callers pass the covered range as a slice, e.g. `adler32(&frame[6..len])`.
pub fn adler32(data: &[u8]) -> u32 {
    let mut hasher = Adler32::new();
    hasher.update(data);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(adler32(b""), 1);
        assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
        assert_eq!(adler32(b"hello world"), 0x1A0B_045D);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i * 31 % 251) as u8).collect();

        let mut hasher = Adler32::new();
        for part in data.chunks(777) {
            hasher.update(part);
        }

        assert_eq!(hasher.finish(), adler32(&data));
    }

    #[test]
    fn test_large_input_does_not_overflow() {
        // All 0xFF is the worst case for the deferred modulo.
        let data = vec![0xFF; NMAX * 3 + 17];
        let mut a: u64 = 1;
        let mut b: u64 = 0;
        for &byte in &data {
            a = (a + u64::from(byte)) % u64::from(MOD_ADLER);
            b = (b + a) % u64::from(MOD_ADLER);
        }
        assert_eq!(adler32(&data), ((b << 16) | a) as u32);
    }

    #[test]
    fn test_single_byte_change_detected() {
        let mut data = b"The quick brown fox jumps over the lazy dog".to_vec();
        let before = adler32(&data);
        data[10] ^= 0x01;
        assert_ne!(before, adler32(&data));
    }
}
