//! Static Huffman primitives shared by the encoder and decoder.
//!
//! Three operations: build a code tree from symbol frequencies, turn code
//! lengths into canonical codewords, and turn code lengths into the fast
//! decoding table.  Frequencies, lengths, and codes live in caller-owned
//! slices sized `2*n - 1` so internal tree nodes can be appended past the
//! symbol range, the same flat layout the original archiver used.
//!
//! Code lengths are capped at 16 bits.  When a skewed frequency profile
//! produces a longer code, `make_code` reshapes the lengths in place before
//! assigning codewords, keeping the set prefix-free.

use crate::Error;

/// Code lengths never exceed this many bits on the wire.
pub const MAX_CODE_BITS: u8 = 16;

fn downheap(i: usize, heap: &mut [u16], heapsize: usize, freq: &[u16]) {
    let mut i = i;
    let k = heap[i];
    loop {
        let mut j = 2 * i;
        if j > heapsize {
            break;
        }
        if j < heapsize && freq[heap[j] as usize] > freq[heap[j + 1] as usize] {
            j += 1;
        }
        if freq[k as usize] <= freq[heap[j] as usize] {
            break;
        }
        heap[i] = heap[j];
        i = j;
    }
    heap[i] = k;
}

fn make_len(i: u16, depth: u8, n: usize, len: &mut [u8], left: &[u16], right: &[u16]) {
    if (i as usize) < n {
        len[i as usize] = depth;
    } else {
        make_len(left[i as usize], depth + 1, n, len, left, right);
        make_len(right[i as usize], depth + 1, n, len, left, right);
    }
}

/// Build a Huffman tree over symbols `0..n` and fill in `len` with the code
/// length of each symbol.  Internal nodes are appended to `freq` at indices
/// `n..`, with their children recorded in `left` and `right`.  Returns the
/// root index; a root below `n` means the tree degenerated to at most one
/// distinct symbol and `len` stays all zero.
pub fn make_tree(n: usize, freq: &mut [u16], len: &mut [u8], left: &mut [u16], right: &mut [u16]) -> u16 {
    let mut heap: Vec<u16> = vec![0; n + 1];
    let mut heapsize = 0;
    for i in 0..n {
        len[i] = 0;
        if freq[i] != 0 {
            heapsize += 1;
            heap[heapsize] = i as u16;
        }
    }
    if heapsize < 2 {
        return heap[1];
    }
    for i in (1..=heapsize / 2).rev() {
        downheap(i, &mut heap, heapsize, freq);
    }
    let mut avail = n;
    let mut k;
    // merge the two lightest entries until one tree remains
    loop {
        let i = heap[1];
        heap[1] = heap[heapsize];
        heapsize -= 1;
        downheap(1, &mut heap, heapsize, freq);
        let j = heap[1];
        k = avail;
        avail += 1;
        freq[k] = freq[i as usize] + freq[j as usize];
        heap[1] = k as u16;
        downheap(1, &mut heap, heapsize, freq);
        left[k] = i;
        right[k] = j;
        if heapsize <= 1 {
            break;
        }
    }
    make_len(k as u16, 0, n, len, left, right);
    k as u16
}

/// Assign canonical codewords for the given code lengths.  If any length
/// exceeds 16 bits the lengths are flattened to fit and the assignment is
/// rerun; a second overflow is impossible for a tree `make_tree` produced
/// and reports as an internal error.
pub fn make_code(n: usize, len: &mut [u8], code: &mut [u16]) -> Result<(), Error> {
    for iter in 0.. {
        let mut c: u16 = 0;
        let mut d: u16 = 1;
        let mut k: u8 = 0;
        while c != d {
            c = c.wrapping_shl(1);
            d = d.wrapping_shl(1);
            k += 1;
            for i in 0..n {
                if len[i] == k {
                    code[i] = c;
                    c = c.wrapping_add(1);
                }
            }
        }
        if k <= MAX_CODE_BITS {
            return Ok(());
        }
        if iter > 0 {
            return Err(Error::Internal("code lengths would not flatten"));
        }
        // cap everything at 16 bits, then push just enough of the longest
        // remaining codes down to 16 to restore the Kraft sum
        let mut c: u16 = 0;
        for i in (0..n).rev() {
            if len[i] >= MAX_CODE_BITS {
                len[i] = MAX_CODE_BITS;
                c = c.wrapping_sub(1);
            }
        }
        'outer: for k in (0..MAX_CODE_BITS).rev() {
            for i in (0..n).rev() {
                if len[i] == k {
                    len[i] = MAX_CODE_BITS;
                    c = c.wrapping_sub(1);
                    if ((code[i] as u32) << (MAX_CODE_BITS - k) as u32) <= c as u32 {
                        break 'outer;
                    }
                }
            }
        }
    }
    unreachable!()
}

struct TableBuilder<'a> {
    blen: &'a [u8],
    tbl: &'a mut [u16],
    left: &'a mut [u16],
    right: &'a mut [u16],
    n: usize,
    tblsiz: usize,
    avail: usize,
    codeword: usize,
    bit: usize,
    c: i32,
    len: u8,
    depth: u8,
    maxdepth: u8,
}

impl<'a> TableBuilder<'a> {
    /// Walk the canonical code space in order, filling direct table slots
    /// for short codes and growing the left/right spill tree for codes
    /// longer than the table index.
    fn mktbl(&mut self) -> Result<u16, Error> {
        if self.len == self.depth {
            loop {
                self.c += 1;
                if self.c >= self.n as i32 {
                    break;
                }
                if self.blen[self.c as usize] == self.len {
                    let mut i = self.codeword;
                    self.codeword += self.bit;
                    if self.codeword > self.tblsiz {
                        return Err(Error::BadTable("code space overrun"));
                    }
                    while i < self.codeword {
                        self.tbl[i] = self.c as u16;
                        i += 1;
                    }
                    return Ok(self.c as u16);
                }
            }
            self.c = -1;
            self.len += 1;
            self.bit >>= 1;
        }
        self.depth += 1;
        let i: u16;
        if self.depth < self.maxdepth {
            self.mktbl()?;
            self.mktbl()?;
            i = 0; // return value unused at this depth
        } else if self.depth > MAX_CODE_BITS {
            return Err(Error::BadTable("code longer than 16 bits"));
        } else {
            let t = self.avail;
            self.avail += 1;
            if t >= 2 * self.n - 1 {
                return Err(Error::BadTable("too many spill nodes"));
            }
            let l = self.mktbl()?;
            let r = self.mktbl()?;
            self.left[t] = l;
            self.right[t] = r;
            if self.codeword >= self.tblsiz {
                return Err(Error::BadTable("code space overrun"));
            }
            if self.depth == self.maxdepth {
                self.tbl[self.codeword] = t as u16;
                self.codeword += 1;
            }
            i = t as u16;
        }
        self.depth -= 1;
        Ok(i)
    }
}

/// Build the decoding table for symbols `0..nchar` with lengths `bitlen`.
/// `table` has `1 << tablebits` slots indexed by the next `tablebits` input
/// bits; slots holding a value of `nchar` or more point into the spill tree
/// recorded in `left`/`right` (node indices start at `nchar`).  Rejects
/// length sets that do not exactly fill the code space.
pub fn make_table(
    nchar: usize,
    bitlen: &[u8],
    tablebits: u8,
    table: &mut [u16],
    left: &mut [u16],
    right: &mut [u16],
) -> Result<(), Error> {
    let mut builder = TableBuilder {
        blen: bitlen,
        tbl: table,
        left,
        right,
        n: nchar,
        tblsiz: 1 << tablebits,
        avail: nchar,
        codeword: 0,
        bit: (1 << tablebits) / 2,
        c: -1,
        len: 1,
        depth: 1,
        maxdepth: tablebits + 1,
    };
    builder.mktbl()?; // left subtree
    builder.mktbl()?; // right subtree
    if builder.codeword != builder.tblsiz {
        return Err(Error::BadTable("code space not filled"));
    }
    Ok(())
}

// *************** TESTS *****************

#[test]
fn tree_and_lengths() {
    let n = 4;
    let mut freq: Vec<u16> = vec![1, 1, 2, 4, 0, 0, 0];
    let mut len: Vec<u8> = vec![0; n];
    let mut left: Vec<u16> = vec![0; 2 * n - 1];
    let mut right: Vec<u16> = vec![0; 2 * n - 1];
    let root = make_tree(n, &mut freq, &mut len, &mut left, &mut right);
    assert!(root as usize >= n);
    assert_eq!(len, vec![3, 3, 2, 1]);
    let mut code: Vec<u16> = vec![0; n];
    make_code(n, &mut len, &mut code).expect("code err");
    assert_eq!(code, vec![0b110, 0b111, 0b10, 0b0]);
}

#[test]
fn degenerate_tree() {
    let n = 3;
    let mut freq: Vec<u16> = vec![0, 5, 0, 0, 0];
    let mut len: Vec<u8> = vec![9; n];
    let mut left: Vec<u16> = vec![0; 2 * n - 1];
    let mut right: Vec<u16> = vec![0; 2 * n - 1];
    let root = make_tree(n, &mut freq, &mut len, &mut left, &mut right);
    assert_eq!(root, 1);
    assert_eq!(len, vec![0, 0, 0]);
}

#[cfg(test)]
fn is_prefix_free(len: &[u8], code: &[u16]) -> bool {
    for i in 0..len.len() {
        for j in 0..len.len() {
            if i == j || len[i] == 0 || len[j] == 0 || len[i] > len[j] {
                continue;
            }
            if code[j] >> (len[j] - len[i]) == code[i] {
                return false;
            }
        }
    }
    true
}

#[test]
fn overlong_lengths_are_flattened() {
    // Kraft-complete set with two 17-bit codes, forcing the fallback
    let n = 18;
    let mut len: Vec<u8> = (1..=16).chain([17, 17]).collect();
    let mut code: Vec<u16> = vec![0; n];
    make_code(n, &mut len, &mut code).expect("code err");
    assert!(len.iter().all(|l| *l <= MAX_CODE_BITS));
    let kraft: u32 = len.iter().map(|l| 1u32 << (16 - *l as u32)).sum();
    assert!(kraft <= 1 << 16);
    assert!(is_prefix_free(&len, &code));
}

#[test]
fn table_with_spill_tree() {
    // codes 0, 10, 110, 1110, 1111 against a 3-bit direct table
    let n = 5;
    let bitlen: Vec<u8> = vec![1, 2, 3, 4, 4];
    let mut table: Vec<u16> = vec![0; 8];
    let mut left: Vec<u16> = vec![0; 2 * n - 1];
    let mut right: Vec<u16> = vec![0; 2 * n - 1];
    make_table(n, &bitlen, 3, &mut table, &mut left, &mut right).expect("table err");
    assert_eq!(table, vec![0, 0, 0, 0, 1, 1, 2, 5]);
    assert_eq!(left[5], 3);
    assert_eq!(right[5], 4);
}

#[test]
fn incomplete_code_is_rejected() {
    let n = 3;
    let bitlen: Vec<u8> = vec![2, 2, 2];
    let mut table: Vec<u16> = vec![0; 8];
    let mut left: Vec<u16> = vec![0; 2 * n - 1];
    let mut right: Vec<u16> = vec![0; 2 * n - 1];
    assert!(make_table(n, &bitlen, 3, &mut table, &mut left, &mut right).is_err());
}
