//! Bit-level I/O for the compressed stream.
//!
//! Bits always travel most-significant-bit first.  The writer packs through
//! an 8-bit sub-buffer and refuses to grow the output past an agreed byte
//! budget: once the budget is reached it raises `unpackable` and swallows
//! everything further, so the caller can fall back to storing the input
//! verbatim.  The reader mirrors the layout with a 16-bit lookahead register
//! (`peek`) that table-driven Huffman decoding indexes directly; reading past
//! the declared compressed size yields zero bits rather than an error.

use std::io::Write;
use std::io::Read;

pub struct BitWriter<W: Write> {
    sink: W,
    subbuf: u8,
    /// free bits remaining in `subbuf`, always 1..=8 between calls
    bitcount: u8,
    written: u64,
    limit: u64,
    unpackable: bool
}

impl <W: Write> BitWriter<W> {
    /// `limit` is the output budget in bytes; exceeding it is not an error
    /// but flags the stream as unpackable.
    pub fn new(sink: W,limit: u64) -> Self {
        Self {
            sink,
            subbuf: 0,
            bitcount: 8,
            written: 0,
            limit,
            unpackable: false
        }
    }
    /// append the low `n` bits of `x`, high bit of the group first, `n <= 16`
    pub fn putbits(&mut self,n: u8,x: u16) -> Result<(),std::io::Error> {
        debug_assert!(n <= 16);
        let mut n = n;
        // keep the group left-aligned in 16 bits, as the reference does
        let mut x: u32 = ((x as u32) << (16 - n as u32)) & 0xFFFF;
        while n >= self.bitcount {
            n -= self.bitcount;
            self.subbuf |= (x >> (16 - self.bitcount as u32)) as u8;
            x = (x << self.bitcount) & 0xFFFF;
            if self.written < self.limit {
                self.sink.write_all(&[self.subbuf])?;
                self.written += 1;
            } else {
                self.unpackable = true;
            }
            self.subbuf = 0;
            self.bitcount = 8;
        }
        self.subbuf |= (x >> (16 - self.bitcount as u32)) as u8;
        self.bitcount -= n;
        Ok(())
    }
    /// flush a trailing partial byte, if any, by padding with zero bits
    pub fn pad(&mut self) -> Result<(),std::io::Error> {
        self.putbits(7,0)
    }
    pub fn unpackable(&self) -> bool {
        self.unpackable
    }
    /// compressed bytes emitted so far
    pub fn written(&self) -> u64 {
        self.written
    }
}

pub struct BitReader<R: Read> {
    src: R,
    /// 16-bit lookahead window, MSB is the next bit of the stream
    bitbuf: u16,
    subbuf: u8,
    /// valid bits remaining in `subbuf`
    bitcount: u8,
    /// compressed bytes still allowed to be consumed
    remaining: u64
}

impl <R: Read> BitReader<R> {
    pub fn new(src: R,compressed_size: u64) -> Result<Self,std::io::Error> {
        let mut ans = Self {
            src,
            bitbuf: 0,
            subbuf: 0,
            bitcount: 0,
            remaining: compressed_size
        };
        ans.fillbuf(16)?;
        Ok(ans)
    }
    /// the full lookahead window; the top bits are the bits about to be read
    pub fn peek(&self) -> u16 {
        self.bitbuf
    }
    /// shift `n` bits out of the window, refilling from the source;
    /// past the declared size the window fills with zeros
    pub fn fillbuf(&mut self,n: u8) -> Result<(),std::io::Error> {
        debug_assert!(n <= 16);
        let mut n = n;
        while n > self.bitcount {
            n -= self.bitcount;
            self.bitbuf = (((self.bitbuf as u32) << self.bitcount)
                + ((self.subbuf as u32) >> (8 - self.bitcount as u32))) as u16;
            self.subbuf = if self.remaining > 0 {
                self.remaining -= 1;
                let mut byte: [u8;1] = [0];
                match self.src.read(&mut byte)? {
                    1 => byte[0],
                    _ => 0 // source ran short of the declared size, pad
                }
            } else {
                0
            };
            self.bitcount = 8;
        }
        self.bitcount -= n;
        self.bitbuf = (((self.bitbuf as u32) << n) + ((self.subbuf as u32) >> (8 - n as u32))) as u16;
        self.subbuf = ((self.subbuf as u32) << n) as u8;
        Ok(())
    }
    /// read and consume `n` bits, `n <= 16`
    pub fn getbits(&mut self,n: u8) -> Result<u16,std::io::Error> {
        let x = ((self.bitbuf as u32) >> (16 - n as u32)) as u16;
        self.fillbuf(n)?;
        Ok(x)
    }
}

// *************** TESTS *****************

#[cfg(test)]
use std::io::Cursor;

#[test]
fn writer_packs_msb_first() {
    let mut sink: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut sink,100);
    writer.putbits(3,0b101).expect("write err");
    writer.putbits(16,0xBEEF).expect("write err");
    writer.pad().expect("write err");
    assert_eq!(sink,hex::decode("b7dde0").expect("hex err"));
}

#[test]
fn writer_respects_budget() {
    let mut sink: Vec<u8> = Vec::new();
    let mut writer = BitWriter::new(&mut sink,2);
    writer.putbits(16,0xAAAA).expect("write err");
    assert!(!writer.unpackable());
    writer.putbits(16,0xAAAA).expect("write err");
    writer.pad().expect("write err");
    assert!(writer.unpackable());
    assert_eq!(writer.written(),2);
    assert_eq!(sink.len(),2);
}

#[test]
fn reader_round_trips() {
    let src = hex::decode("b7dde0").expect("hex err");
    let mut reader = BitReader::new(Cursor::new(&src),src.len() as u64).expect("read err");
    assert_eq!(reader.getbits(3).expect("read err"),0b101);
    assert_eq!(reader.getbits(16).expect("read err"),0xBEEF);
}

#[test]
fn reader_pads_with_zeros() {
    let src = vec![0xFF];
    let mut reader = BitReader::new(Cursor::new(&src),src.len() as u64).expect("read err");
    assert_eq!(reader.getbits(8).expect("read err"),0xFF);
    assert_eq!(reader.getbits(16).expect("read err"),0);
    assert_eq!(reader.getbits(16).expect("read err"),0);
}

#[test]
fn zero_width_reads_are_inert() {
    let src = vec![0xC3];
    let mut reader = BitReader::new(Cursor::new(&src),src.len() as u64).expect("read err");
    assert_eq!(reader.getbits(0).expect("read err"),0);
    assert_eq!(reader.getbits(4).expect("read err"),0xC);
}
