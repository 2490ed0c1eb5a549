//! Sliding dictionary match finder with percolating position updates.
//!
//! The dictionary is a binary search tree over suffixes of the text window,
//! stored in flat index arenas rather than linked nodes.  Indices below
//! `DICSIZ` are interior split nodes drawn from a free list, indices
//! `DICSIZ..DICSIZ+256` are the per-first-byte root buckets, and window
//! positions double as leaf indices.  Index 0 (`NIL`) is the null node.
//!
//! Each interior node carries a representative window position for the
//! string it stands for.  Keeping those exact on every insertion would mean
//! walking to the root each time, so updates percolate lazily instead: a
//! node's position is either `Fresh` (usable as-is) or `Stale` (some
//! descendant has a newer occurrence that has not been propagated yet), and
//! staleness is resolved on the way up when a node loses its last pair of
//! children.

use crate::tools::crc::{read_crc, Crc16};
use crate::tools::try_vec;
use crate::Error;
use std::io::Read;

pub const DICBIT: usize = 13;
pub const DICSIZ: usize = 1 << DICBIT;
pub const MAXMATCH: usize = 256;
pub const THRESHOLD: usize = 3;

const NIL: u16 = 0;
const MAX_HASH_VAL: usize = 3 * DICSIZ + (DICSIZ / 512 + 1) * 255;

fn hash(p: u16, c: u8) -> usize {
    p as usize + ((c as usize) << (DICBIT - 9)) + 2 * DICSIZ
}

/// Representative window position of an interior node.
#[derive(Clone, Copy)]
enum RepPos {
    Fresh(u16),
    Stale(u16),
}

impl RepPos {
    fn get(self) -> u16 {
        match self {
            RepPos::Fresh(v) | RepPos::Stale(v) => v,
        }
    }
}

/// One compression session's dictionary state.
pub struct MatchFinder {
    pub(crate) text: Vec<u8>,
    level: Vec<u8>,
    childcount: Vec<u8>,
    position: Vec<RepPos>,
    parent: Vec<u16>,
    prev: Vec<u16>,
    next: Vec<u16>,
    avail: u16,
    pub(crate) pos: u16,
    pub(crate) matchpos: u16,
    pub(crate) matchlen: usize,
    pub(crate) remainder: usize,
}

impl MatchFinder {
    pub fn new() -> Result<Self, Error> {
        let mut ans = Self {
            text: try_vec(0u8, 2 * DICSIZ + MAXMATCH)?,
            level: try_vec(0u8, DICSIZ + 256)?,
            childcount: try_vec(0u8, DICSIZ + 256)?,
            position: try_vec(RepPos::Fresh(NIL), DICSIZ + 256)?,
            parent: try_vec(NIL, 2 * DICSIZ)?,
            prev: try_vec(NIL, 2 * DICSIZ)?,
            next: try_vec(NIL, MAX_HASH_VAL + 1)?,
            avail: 1,
            pos: 0,
            matchpos: 0,
            matchlen: 0,
            remainder: 0,
        };
        for i in DICSIZ..DICSIZ + 256 {
            ans.level[i] = 1;
        }
        // interior node free list
        for i in 1..DICSIZ - 1 {
            ans.next[i] = i as u16 + 1;
        }
        Ok(ans)
    }

    /// `q`'s child whose edge starts with byte `c`, or `NIL`.
    fn child(&self, q: u16, c: u8) -> u16 {
        let mut r = self.next[hash(q, c)];
        while r != NIL && self.parent[r as usize] != q {
            r = self.next[r as usize];
        }
        r
    }

    /// Link `r` under `q` as its child for byte `c`.
    fn makechild(&mut self, q: u16, c: u8, r: u16) {
        let h = hash(q, c);
        let t = self.next[h];
        self.next[h] = r;
        self.next[r as usize] = t;
        self.prev[t as usize] = r;
        self.prev[r as usize] = h as u16;
        self.parent[r as usize] = q;
        self.childcount[q as usize] = self.childcount[q as usize].wrapping_add(1);
    }

    /// The edge into `old` diverges from the current suffix at `matchlen`
    /// bytes; interpose a new node holding both branches.
    fn split(&mut self, old: u16) {
        let new = self.avail;
        self.avail = self.next[new as usize];
        self.childcount[new as usize] = 0;
        let t = self.prev[old as usize];
        self.prev[new as usize] = t;
        self.next[t as usize] = new;
        let t = self.next[old as usize];
        self.next[new as usize] = t;
        self.prev[t as usize] = new;
        self.parent[new as usize] = self.parent[old as usize];
        self.level[new as usize] = self.matchlen as u8;
        self.position[new as usize] = RepPos::Fresh(self.pos);
        self.makechild(new, self.text[self.matchpos as usize + self.matchlen], old);
        self.makechild(new, self.text[self.pos as usize + self.matchlen], self.pos);
    }

    /// Insert the suffix at `pos` and record the longest match against the
    /// rest of the window in `matchpos`/`matchlen`.
    fn insert_node(&mut self) {
        let mut q: u16;
        let mut r: u16;
        if self.matchlen >= 4 {
            // the previous match tells us where this suffix belongs; start
            // one shorter from the node representing that string
            self.matchlen -= 1;
            r = (self.matchpos + 1) | DICSIZ as u16;
            loop {
                q = self.parent[r as usize];
                if q != NIL {
                    break;
                }
                r = self.next[r as usize];
            }
            while self.level[q as usize] as usize >= self.matchlen {
                r = q;
                q = self.parent[q as usize];
            }
            // refresh stale positions on the path above, then leave one
            // stale marker to be resolved later
            let mut t = q;
            loop {
                match self.position[t as usize] {
                    RepPos::Stale(_) => {
                        self.position[t as usize] = RepPos::Fresh(self.pos);
                        t = self.parent[t as usize];
                    }
                    RepPos::Fresh(_) => break,
                }
            }
            if t < DICSIZ as u16 {
                self.position[t as usize] = RepPos::Stale(self.pos);
            }
        } else {
            q = self.text[self.pos as usize] as u16 + DICSIZ as u16;
            let c = self.text[self.pos as usize + 1];
            r = self.child(q, c);
            if r == NIL {
                self.makechild(q, c, self.pos);
                self.matchlen = 1;
                return;
            }
            self.matchlen = 2;
        }
        loop {
            let j: usize;
            if r >= DICSIZ as u16 {
                j = MAXMATCH;
                self.matchpos = r;
            } else {
                j = self.level[r as usize] as usize;
                self.matchpos = self.position[r as usize].get();
            }
            if self.matchpos >= self.pos {
                self.matchpos -= DICSIZ as u16;
            }
            let mut t1 = self.pos as usize + self.matchlen;
            let mut t2 = self.matchpos as usize + self.matchlen;
            while self.matchlen < j {
                if self.text[t1] != self.text[t2] {
                    self.split(r);
                    return;
                }
                self.matchlen += 1;
                t1 += 1;
                t2 += 1;
            }
            if self.matchlen == MAXMATCH {
                break;
            }
            self.position[r as usize] = RepPos::Fresh(self.pos);
            q = r;
            let c = self.text[t1];
            r = self.child(q, c);
            if r == NIL {
                self.makechild(q, c, self.pos);
                return;
            }
            self.matchlen += 1;
        }
        // full-length match; pos replaces r in the tree, and the orphaned
        // leaf forwards to pos through next[] until it is deleted
        let t = self.prev[r as usize];
        self.prev[self.pos as usize] = t;
        self.next[t as usize] = self.pos;
        let t = self.next[r as usize];
        self.next[self.pos as usize] = t;
        self.prev[t as usize] = self.pos;
        self.parent[self.pos as usize] = q;
        self.parent[r as usize] = NIL;
        self.next[r as usize] = self.pos;
    }

    /// Remove the leaf for the window position about to be overwritten,
    /// collapsing its parent if only one sibling remains.
    fn delete_node(&mut self) {
        if self.parent[self.pos as usize] == NIL {
            return;
        }
        let r = self.prev[self.pos as usize];
        let s = self.next[self.pos as usize];
        self.next[r as usize] = s;
        self.prev[s as usize] = r;
        let r = self.parent[self.pos as usize];
        self.parent[self.pos as usize] = NIL;
        if r >= DICSIZ as u16 {
            return;
        }
        self.childcount[r as usize] = self.childcount[r as usize].wrapping_sub(1);
        if self.childcount[r as usize] > 1 {
            return;
        }
        let mut t = self.position[r as usize].get();
        if t >= self.pos {
            t -= DICSIZ as u16;
        }
        // the collapsing node's position survives; percolate it upward,
        // resolving stale markers with the freshest position seen
        let mut s = t;
        let mut q = self.parent[r as usize];
        let mut u;
        loop {
            match self.position[q as usize] {
                RepPos::Stale(v) => {
                    u = v;
                    if u >= self.pos {
                        u -= DICSIZ as u16;
                    }
                    if u > s {
                        s = u;
                    }
                    self.position[q as usize] = RepPos::Fresh(s | DICSIZ as u16);
                    q = self.parent[q as usize];
                }
                RepPos::Fresh(v) => {
                    u = v;
                    break;
                }
            }
        }
        if q < DICSIZ as u16 {
            if u >= self.pos {
                u -= DICSIZ as u16;
            }
            if u > s {
                s = u;
            }
            self.position[q as usize] = RepPos::Stale(s | DICSIZ as u16);
        }
        // splice the lone sibling into r's place and free r
        let s = self.child(r, self.text[t as usize + self.level[r as usize] as usize]);
        let t = self.prev[s as usize];
        let u = self.next[s as usize];
        self.next[t as usize] = u;
        self.prev[u as usize] = t;
        let t = self.prev[r as usize];
        self.next[t as usize] = s;
        self.prev[s as usize] = t;
        let t = self.next[r as usize];
        self.prev[t as usize] = s;
        self.next[s as usize] = t;
        self.parent[s as usize] = self.parent[r as usize];
        self.parent[r as usize] = NIL;
        self.next[r as usize] = self.avail;
        self.avail = r;
    }

    /// Prime the window from `reader` and insert the first suffix.
    pub fn start<R: Read>(&mut self, reader: &mut R, crc: &mut Crc16) -> Result<(), std::io::Error> {
        self.remainder = read_crc(reader, &mut self.text[DICSIZ..], crc)?;
        self.matchlen = 0;
        self.pos = DICSIZ as u16;
        self.insert_node();
        Ok(())
    }

    /// Step the window forward one byte, refilling from `reader` when the
    /// high half runs out, and find the match at the new position.
    pub fn advance<R: Read>(&mut self, reader: &mut R, crc: &mut Crc16) -> Result<(), std::io::Error> {
        self.remainder -= 1;
        self.pos += 1;
        if self.pos as usize == 2 * DICSIZ {
            self.text.copy_within(DICSIZ.., 0);
            let n = read_crc(reader, &mut self.text[DICSIZ + MAXMATCH..], crc)?;
            self.remainder += n;
            self.pos = DICSIZ as u16;
            log::debug!("window slid, refilled {} bytes", n);
        }
        self.delete_node();
        self.insert_node();
        Ok(())
    }
}

// *************** TESTS *****************

#[cfg(test)]
use std::io::Cursor;

#[test]
fn reported_matches_are_real() {
    // enough repetitive data to slide the window at least once
    let mut data: Vec<u8> = Vec::new();
    for i in 0..3400 {
        data.extend_from_slice(match i % 3 {
            0 => b"abcabc",
            1 => b"xyzxyz",
            _ => b"abcxyz",
        });
    }
    let mut reader = Cursor::new(&data);
    let mut crc = Crc16::new();
    let mut finder = MatchFinder::new().expect("alloc err");
    finder.start(&mut reader, &mut crc).expect("read err");
    let mut longest = 0;
    let mut steps = 0;
    while finder.remainder > 0 {
        finder.advance(&mut reader, &mut crc).expect("read err");
        assert!(finder.matchlen <= MAXMATCH);
        if finder.matchlen >= THRESHOLD && finder.matchlen <= finder.remainder {
            let pos = finder.pos as usize;
            let mpos = finder.matchpos as usize;
            assert!(mpos < pos);
            assert_eq!(
                finder.text[mpos..mpos + finder.matchlen],
                finder.text[pos..pos + finder.matchlen]
            );
            longest = longest.max(finder.matchlen);
        }
        steps += 1;
        assert!(steps <= data.len());
    }
    assert!(longest >= 6);
    let mut whole = Crc16::new();
    whole.update(&data);
    assert_eq!(crc.value(), whole.value());
}

#[test]
fn tiny_inputs_do_not_panic() {
    for data in [&b""[..], &b"a"[..], &b"ab"[..], &b"aaaa"[..]] {
        let mut reader = Cursor::new(data);
        let mut crc = Crc16::new();
        let mut finder = MatchFinder::new().expect("alloc err");
        finder.start(&mut reader, &mut crc).expect("read err");
        assert_eq!(finder.remainder, data.len());
        while finder.remainder > 0 {
            finder.advance(&mut reader, &mut crc).expect("read err");
        }
    }
}
