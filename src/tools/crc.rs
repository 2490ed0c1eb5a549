//! CRC-16 as used by the archive format.
//!
//! Table-driven CCITT with the reflected polynomial `0x8408`, processed
//! LSB-first per byte, initialized to all ones and finalized by complement.
//! The same accumulator runs over original bytes while compressing and over
//! reconstructed bytes while expanding, so the two sides are directly
//! comparable.

use std::io::{Read,Write};

const CRC_POLY: u16 = 0x8408;

pub struct Crc16 {
    table: [u16;256],
    reg: u16
}

impl Crc16 {
    pub fn new() -> Self {
        let mut table = [0u16;256];
        for i in 0..256 {
            let mut r = i as u16;
            for _j in 0..8 {
                if r & 1 > 0 {
                    r = (r >> 1) ^ CRC_POLY;
                } else {
                    r >>= 1;
                }
            }
            table[i] = r;
        }
        Self {
            table,
            reg: 0xFFFF
        }
    }
    pub fn update(&mut self,data: &[u8]) {
        for b in data {
            self.reg = self.table[((self.reg ^ *b as u16) & 0xFF) as usize] ^ (self.reg >> 8);
        }
    }
    /// finalized value, the register itself is untouched
    pub fn value(&self) -> u16 {
        self.reg ^ 0xFFFF
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// Read into `buf` until it is full or the source is exhausted, accumulating
/// the CRC over whatever was read.  Returns the byte count.
pub fn read_crc<R: Read>(reader: &mut R,buf: &mut [u8],crc: &mut Crc16) -> Result<usize,std::io::Error> {
    let mut count = 0;
    while count < buf.len() {
        let n = reader.read(&mut buf[count..])?;
        if n == 0 {
            break;
        }
        count += n;
    }
    crc.update(&buf[0..count]);
    Ok(count)
}

/// Write all of `buf`, accumulating the CRC over it.
pub fn write_crc<W: Write>(writer: &mut W,buf: &[u8],crc: &mut Crc16) -> Result<(),std::io::Error> {
    writer.write_all(buf)?;
    crc.update(buf);
    Ok(())
}

// *************** TESTS *****************

#[test]
fn check_value() {
    // standard CRC-16/X-25 check value for this polynomial and finalization
    let mut crc = Crc16::new();
    crc.update("123456789".as_bytes());
    assert_eq!(crc.value(),0x906E);
}

#[test]
fn incremental_matches_oneshot() {
    let data = "the quick brown fox jumps over the lazy dog".as_bytes();
    let mut whole = Crc16::new();
    whole.update(data);
    let mut parts = Crc16::new();
    for chunk in data.chunks(7) {
        parts.update(chunk);
    }
    assert_eq!(whole.value(),parts.value());
}

#[test]
fn empty_is_complement_of_init() {
    let crc = Crc16::new();
    assert_eq!(crc.value(),0x0000);
}
