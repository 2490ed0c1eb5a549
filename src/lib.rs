//! Archiver with LZSS + static Huffman compression
//!
//! This library compresses single streams and packs them into a simple
//! multi-file archive.  The compressor pairs a sliding dictionary (longest
//! matches found through an incrementally maintained binary search tree with
//! percolating position updates) with per-block static Huffman coding, where
//! the code-length tables themselves travel Huffman-coded in front of each
//! block.  The compressed bit layout is that of the classic `ar` archiver,
//! so archives are interchangeable with the historical tool.
//!
//! * `lzss_huff` is the compression engine (compress/expand a single stream)
//! * `archive` is the container (add/extract/list/delete across members)

mod tools;
pub mod huffman;
pub mod slide;
pub mod lzss_huff;
pub mod archive;

type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

/// Errors shared by the compression engine and the container
#[derive(thiserror::Error,Debug)]
pub enum Error {
    #[error("file format mismatch")]
    FileFormatMismatch,
    #[error("file too large")]
    FileTooLarge,
    #[error("out of memory")]
    OutOfMemory,
    /// the compressed stream describes an impossible code table
    #[error("bad code table ({0})")]
    BadTable(&'static str),
    /// a bug, not a data problem
    #[error("internal error ({0})")]
    Internal(&'static str),
    #[error("bad archive header")]
    BadHeader,
    #[error("unknown storage method {0}")]
    UnknownMethod(u16),
    /// decoded content disagrees with the stored checksum; the content is
    /// still usable, the caller decides whether to keep going
    #[error("CRC mismatch (expected {expected:04X}, got {found:04X})")]
    CrcMismatch { expected: u16, found: u16 },
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}
