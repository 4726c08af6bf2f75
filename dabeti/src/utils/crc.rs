//! CRC validation utilities for ETI and FIC structures.
//!
//! The ETI header, EOF field and every FIB carry a CRC-16/CCITT whose
//! transmitted value is the one's complement of the computed remainder.
//! DAB+ superframe headers additionally carry a 16-bit firecode word
//! computed with a dedicated polynomial.

/// CRC algorithm specification with polynomial and initial value.
pub struct Algorithm<T> {
    poly: T,
    init: T,
}

/// CRC-16/CCITT as used by the ETI header, the EOF field, FIBs and
/// DAB+ access units.
///
/// The value found in the stream is the complement of the remainder.
pub const CRC_CCITT_ALG: Algorithm<u16> = Algorithm {
    poly: 0x1021,
    init: 0xFFFF,
};

/// Computes CRC-16 checksum using specified polynomial.
#[inline(always)]
pub const fn crc16(poly: u16, mut value: u16, len: usize) -> u16 {
    value <<= 8;

    let mut i = 0;
    while i < len {
        value = (value << 1) ^ (((value >> 15) & 1) * poly);
        i += 1;
    }

    value
}

#[inline(always)]
const fn crc16_table(poly: u16) -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = crc16(poly, i as u16, 8);
        i += 1;
    }

    table
}

#[derive(Debug)]
pub struct Crc16 {
    pub poly: u16,
    pub init: u16,
    table: [u16; 256],
}

impl Crc16 {
    pub const fn new(algorithm: &Algorithm<u16>) -> Self {
        Self {
            poly: algorithm.poly,
            init: algorithm.init,
            table: crc16_table(algorithm.poly),
        }
    }

    const fn table_entry(&self, index: u16) -> u16 {
        self.table[(index & 0xFF) as usize]
    }

    #[inline(always)]
    pub const fn update(&self, mut crc: u16, bytes: &[u8]) -> u16 {
        let mut i = 0;

        while i < bytes.len() {
            crc = self.table_entry(crc >> 8) ^ (crc << 8) ^ bytes[i] as u16;
            i += 1;
        }

        crc
    }

    /// Computes the complemented checksum found in ETI and FIB fields.
    #[inline(always)]
    pub const fn complemented(&self, bytes: &[u8]) -> u16 {
        !self.update(self.init, bytes)
    }
}

const FIRECODE_POLY: u16 = 0x782F;

/// Firecode CRC over the first bytes of a DAB+ superframe.
///
/// Bit-serial, MSB first, zero initial value. The superframe carries the
/// expected word in its first two bytes, computed over the following
/// nine bytes.
pub fn firecode(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;

    for &byte in data {
        for bit in (0..8).rev() {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ FIRECODE_POLY;
            } else {
                crc <<= 1;
            }
            if byte & (1 << bit) != 0 {
                crc ^= FIRECODE_POLY;
            }
        }
    }

    crc
}

#[test]
fn ccitt_known_vector() {
    // "123456789" with init 0xFFFF and poly 0x1021 yields 0x29B1
    let crc = Crc16::new(&CRC_CCITT_ALG);
    assert_eq!(crc.update(crc.init, b"123456789"), 0x29B1);
    assert_eq!(crc.complemented(b"123456789"), !0x29B1);
}

#[test]
fn firecode_roundtrip() {
    let payload = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x55];
    let word = firecode(&payload);

    // recomputing over the same bytes is stable
    assert_eq!(firecode(&payload), word);

    // a single flipped bit must change the word
    let mut corrupted = payload;
    corrupted[4] ^= 0x01;
    assert_ne!(firecode(&corrupted), word);
}
