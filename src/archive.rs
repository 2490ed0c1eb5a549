//! Multi-file archive container.
//!
//! Layout per member, all words little endian:
//!
//! * 2  basic header size, 18 + name length (0 marks end of archive)
//! * 2  method (0 = stored, 1 = compressed)
//! * 1  file type (0 binary, 1 text)
//! * 1  seconds + (timezone info << 6)
//! * 2  (day << 11) + (hour << 6) + minute
//! * 2  ((year - 1900) << 4) + month index
//! * 4  compressed size
//! * 4  original size
//! * 2  CRC-16 of the original file
//! * ?  member name, not null terminated
//! * 2  CRC-16 of the basic header
//! * 2  extended header size (0 if none), repeated per extended header
//! * ?  member data
//!
//! Operations that rewrite the archive (add, replace, delete) stream the old
//! archive into a temporary file next to it and atomically rename over the
//! original, so an interrupted run leaves the archive untouched.

use crate::lzss_huff;
use crate::tools::crc::{read_crc, write_crc, Crc16};
use crate::{Error, DYNERR, STDRESULT};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub const METHOD_STORED: u16 = 0;
pub const METHOD_COMPRESSED: u16 = 1;
const FNAME_MAX: usize = 1024;
const HEADER_FIXED: usize = 18;
const COPY_BUF: usize = 4096;

fn read_word<R: Read>(reader: &mut R) -> Result<u16, std::io::Error> {
    let mut bytes: [u8; 2] = [0; 2];
    reader.read_exact(&mut bytes)?;
    Ok(u16::from_le_bytes(bytes))
}

fn write_word<W: Write>(writer: &mut W, x: u16) -> Result<(), std::io::Error> {
    writer.write_all(&x.to_le_bytes())
}

fn skip_bytes<R: Read>(reader: &mut R, count: u64) -> Result<(), std::io::Error> {
    let copied = std::io::copy(&mut reader.take(count), &mut std::io::sink())?;
    if copied != count {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

/// Gregorian date from days since the Unix epoch
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    let y = yoe + era * 400 + if m <= 2 { 1 } else { 0 };
    (y, m, d)
}

/// One member's basic header.
#[derive(Debug, Clone)]
pub struct Header {
    pub method: u16,
    pub file_type: u8,
    pub flag_sec: u8,
    pub day_hour_min: u16,
    pub year_mon: u16,
    pub compsize: u32,
    pub origsize: u32,
    pub file_crc: u16,
    pub name: String,
}

impl Header {
    /// Fresh compressed-member header named `name`, stamped with the
    /// current UTC time.  Sizes and CRC are filled in after coding.
    pub fn now(name: String) -> Self {
        let secs = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(_) => 0,
        };
        let (year, mon, day) = civil_from_days(secs.div_euclid(86400));
        let tod = secs.rem_euclid(86400) as u16;
        Self {
            method: METHOD_COMPRESSED,
            file_type: 0,
            // timezone info 3 marks the stamp as UTC
            flag_sec: (tod % 60) as u8 + 192,
            day_hour_min: ((day as u16) << 11) + (tod / 3600 << 6) + tod / 60 % 60,
            year_mon: (((year - 1900) as u16) << 4) + mon as u16 - 1,
            compsize: 0,
            origsize: 0,
            file_crc: 0,
            name,
        }
    }

    /// Read the next member header, or `None` at the end-of-archive marker.
    /// Leaves the stream at the start of the member data.
    pub fn read<R: Read>(reader: &mut R) -> Result<Option<Self>, DYNERR> {
        let headersize = read_word(reader)? as usize;
        if headersize == 0 {
            return Ok(None);
        }
        if headersize < HEADER_FIXED || headersize > HEADER_FIXED + FNAME_MAX {
            return Err(Box::new(Error::BadHeader));
        }
        let mut body = vec![0u8; headersize];
        let mut crc = Crc16::new();
        if read_crc(reader, &mut body, &mut crc)? != headersize {
            return Err(Box::new(Error::BadHeader));
        }
        let header_crc = read_word(reader)?;
        if crc.value() != header_crc {
            return Err(Box::new(Error::BadHeader));
        }
        let word = |i: usize| body[i] as u16 + ((body[i + 1] as u16) << 8);
        let ans = Self {
            method: word(0),
            file_type: body[2],
            flag_sec: body[3],
            day_hour_min: word(4),
            year_mon: word(6),
            compsize: word(8) as u32 + ((word(10) as u32) << 16),
            origsize: word(12) as u32 + ((word(14) as u32) << 16),
            file_crc: word(16),
            name: String::from_utf8_lossy(&body[HEADER_FIXED..]).into_owned(),
        };
        // extended headers are tolerated but carry nothing we use
        loop {
            let extsize = read_word(reader)?;
            if extsize == 0 {
                break;
            }
            skip_bytes(reader, extsize as u64 + 2)?;
        }
        Ok(Some(ans))
    }

    /// Write the basic header, its CRC, and the empty extended header list.
    pub fn write<W: Write>(&self, writer: &mut W) -> STDRESULT {
        let name = self.name.as_bytes();
        if name.len() > FNAME_MAX {
            return Err(Box::new(Error::BadHeader));
        }
        let mut body = vec![0u8; HEADER_FIXED];
        body[0..2].copy_from_slice(&self.method.to_le_bytes());
        body[2] = self.file_type;
        body[3] = self.flag_sec;
        body[4..6].copy_from_slice(&self.day_hour_min.to_le_bytes());
        body[6..8].copy_from_slice(&self.year_mon.to_le_bytes());
        body[8..12].copy_from_slice(&self.compsize.to_le_bytes());
        body[12..16].copy_from_slice(&self.origsize.to_le_bytes());
        body[16..18].copy_from_slice(&self.file_crc.to_le_bytes());
        body.extend_from_slice(name);
        write_word(writer, body.len() as u16)?;
        let mut crc = Crc16::new();
        write_crc(writer, &body, &mut crc)?;
        write_word(writer, crc.value())?;
        write_word(writer, 0)?;
        Ok(())
    }

    pub fn year(&self) -> u16 {
        (self.year_mon >> 4) + 1900
    }
    pub fn month(&self) -> u16 {
        (self.year_mon & 15) + 1
    }
    pub fn day(&self) -> u16 {
        self.day_hour_min >> 11
    }
    pub fn hour(&self) -> u16 {
        (self.day_hour_min >> 6) & 31
    }
    pub fn minute(&self) -> u16 {
        self.day_hour_min & 31
    }
    pub fn second(&self) -> u16 {
        (self.flag_sec & 63) as u16
    }
    /// timezone info as a display character, per the original listing format
    pub fn tz_char(&self) -> char {
        [' ', 'N', 'D', 'U'][(self.flag_sec >> 6) as usize]
    }
}

/// Compression ratio scaled by 1000, rounded.
pub fn ratio(compressed: u64, original: u64) -> u64 {
    if original == 0 {
        return 0;
    }
    (1000 * compressed + original / 2) / original
}

/// Shell-style matching with `*` and `?`.  Ported faithfully: `*` skips to
/// the next occurrence of the following pattern byte, it does not backtrack.
pub fn wildcard_match(name: &str, pattern: &str) -> bool {
    let s1 = name.as_bytes();
    let s2 = pattern.as_bytes();
    let mut i = 0;
    let mut j = 0;
    loop {
        while j < s2.len() && (s2[j] == b'*' || s2[j] == b'?') {
            if s2[j] == b'*' {
                j += 1;
                while i < s1.len() && Some(&s1[i]) != s2.get(j) {
                    i += 1;
                }
            } else {
                if i >= s1.len() {
                    return false;
                }
                i += 1;
                j += 1;
            }
        }
        match (s1.get(i), s2.get(j)) {
            (None, None) => return true,
            (a, b) if a != b => return false,
            _ => {
                i += 1;
                j += 1;
            }
        }
    }
}

fn selected(name: &str, patterns: &[String]) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| wildcard_match(name, p))
}

/// Copy a member's data verbatim, e.g. while rewriting the archive.
fn copy_member<R: Read, W: Write>(reader: &mut R, writer: &mut W, compsize: u64) -> STDRESULT {
    let copied = std::io::copy(&mut reader.take(compsize), writer)?;
    if copied != compsize {
        return Err(Box::new(Error::BadHeader));
    }
    Ok(())
}

/// Expand a stored member, returning the CRC of the copied bytes.
fn unstore<R: Read, W: Write>(reader: &mut R, writer: &mut W, compsize: u64) -> Result<u16, DYNERR> {
    let mut crc = Crc16::new();
    let mut buf = [0u8; COPY_BUF];
    let mut remaining = compsize;
    while remaining > 0 {
        let n = remaining.min(COPY_BUF as u64) as usize;
        reader.read_exact(&mut buf[0..n])?;
        write_crc(writer, &buf[0..n], &mut crc)?;
        remaining -= n as u64;
    }
    Ok(crc.value())
}

/// Compress one disk file into the archive as member `name`, rewriting the
/// provisional header once the final sizes and CRC are known.  A failure to
/// open the source is reported and swallowed so a batch keeps going.
fn add_file<W: Write + Seek>(writer: &mut W, path: &Path, name: &str) -> Result<bool, DYNERR> {
    let mut infile = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::error!("cannot open {}: {}", path.display(), e);
            return Ok(false);
        }
    };
    let headerpos = writer.stream_position()?;
    let mut header = Header::now(name.to_string());
    header.write(writer)?;
    let stats = lzss_huff::compress(&mut infile, writer)?;
    header.method = match stats.stored {
        true => METHOD_STORED,
        false => METHOD_COMPRESSED,
    };
    header.compsize = stats.out_size as u32;
    header.origsize = stats.in_size as u32;
    header.file_crc = stats.crc;
    let end = writer.stream_position()?;
    writer.seek(SeekFrom::Start(headerpos))?;
    header.write(writer)?;
    writer.seek(SeekFrom::Start(end))?;
    let r = ratio(stats.out_size, stats.in_size);
    log::info!("added {} ({}.{}%)", name, r / 10, r % 10);
    Ok(true)
}

fn open_temp(arc_path: &Path) -> Result<tempfile::NamedTempFile, std::io::Error> {
    let dir = match arc_path.parent() {
        Some(p) if p != Path::new("") => p,
        _ => Path::new("."),
    };
    tempfile::NamedTempFile::new_in(dir)
}

/// Add files to the archive, replacing members of the same name.  The
/// member name is the file's final path component.  Creates the archive if
/// it does not exist.  Returns the number of files added.
pub fn add(arc_path: &Path, files: &[String]) -> Result<usize, DYNERR> {
    let mut tmp = open_temp(arc_path)?;
    let out = tmp.as_file_mut();
    let mut added: Vec<String> = Vec::new();
    for file in files {
        if added.iter().any(|a| a == file) {
            continue;
        }
        let path = Path::new(file);
        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => {
                log::error!("{} has no file name", file);
                continue;
            }
        };
        if add_file(out, path, &name)? {
            added.push(name);
        }
    }
    if added.is_empty() {
        return Ok(0);
    }
    if arc_path.exists() {
        let mut arc = BufReader::new(std::fs::File::open(arc_path)?);
        while let Some(header) = Header::read(&mut arc)? {
            if added.iter().any(|a| *a == header.name) {
                skip_bytes(&mut arc, header.compsize as u64)?;
            } else {
                header.write(out)?;
                copy_member(&mut arc, out, header.compsize as u64)?;
            }
        }
    }
    write_word(out, 0)?;
    out.flush()?;
    let count = added.len();
    tmp.persist(arc_path)?;
    Ok(count)
}

/// Re-compress members of the archive whose names match files given; files
/// absent from the archive are left for `add`.  Returns the number replaced.
pub fn replace(arc_path: &Path, files: &[String]) -> Result<usize, DYNERR> {
    let mut arc = BufReader::new(std::fs::File::open(arc_path)?);
    let mut tmp = open_temp(arc_path)?;
    let out = tmp.as_file_mut();
    let mut count = 0;
    while let Some(header) = Header::read(&mut arc)? {
        let source = files.iter().find(|f| {
            Path::new(f.as_str()).file_name().map(|n| n.to_string_lossy() == header.name) == Some(true)
        });
        match source {
            Some(file) if add_file(out, Path::new(file), &header.name)? => {
                skip_bytes(&mut arc, header.compsize as u64)?;
                count += 1;
            }
            _ => {
                header.write(out)?;
                copy_member(&mut arc, out, header.compsize as u64)?;
            }
        }
    }
    if count == 0 {
        return Ok(0);
    }
    write_word(out, 0)?;
    out.flush()?;
    tmp.persist(arc_path)?;
    Ok(count)
}

/// Delete members matching the given names or patterns.
pub fn delete(arc_path: &Path, patterns: &[String]) -> Result<usize, DYNERR> {
    if patterns.is_empty() {
        return Ok(0);
    }
    let mut arc = BufReader::new(std::fs::File::open(arc_path)?);
    let mut tmp = open_temp(arc_path)?;
    let out = tmp.as_file_mut();
    let mut count = 0;
    while let Some(header) = Header::read(&mut arc)? {
        if selected(&header.name, patterns) {
            skip_bytes(&mut arc, header.compsize as u64)?;
            count += 1;
        } else {
            header.write(out)?;
            copy_member(&mut arc, out, header.compsize as u64)?;
        }
    }
    if count == 0 {
        return Ok(0);
    }
    write_word(out, 0)?;
    out.flush()?;
    tmp.persist(arc_path)?;
    Ok(count)
}

/// Expand one member onto `writer`, whatever its method.  A CRC mismatch or
/// unknown method is reported but does not stop the run.
fn expand_member<R: Read, W: Write>(reader: &mut R, writer: &mut W, header: &Header) -> STDRESULT {
    let found = match header.method {
        METHOD_COMPRESSED => {
            lzss_huff::expand(reader, writer, header.compsize as u64, header.origsize as u64)?.crc
        }
        METHOD_STORED => unstore(reader, writer, header.compsize as u64)?,
        other => {
            log::warn!("{}: {}", header.name, Error::UnknownMethod(other));
            skip_bytes(reader, header.compsize as u64)?;
            return Ok(());
        }
    };
    if found != header.file_crc {
        log::warn!(
            "{}: {}",
            header.name,
            Error::CrcMismatch {
                expected: header.file_crc,
                found
            }
        );
    }
    Ok(())
}

/// Extract matching members into `dest_dir`.  Returns the number extracted.
pub fn extract(arc_path: &Path, patterns: &[String], dest_dir: &Path) -> Result<usize, DYNERR> {
    let mut arc = BufReader::new(std::fs::File::open(arc_path)?);
    let mut count = 0;
    while let Some(header) = Header::read(&mut arc)? {
        if !selected(&header.name, patterns) {
            skip_bytes(&mut arc, header.compsize as u64)?;
            continue;
        }
        if header.name.is_empty() || header.name.contains(['/', '\\']) {
            log::warn!("refusing member name {:?}", header.name);
            skip_bytes(&mut arc, header.compsize as u64)?;
            continue;
        }
        let dest = dest_dir.join(&header.name);
        let mut outfile = BufWriter::new(std::fs::File::create(&dest)?);
        expand_member(&mut arc, &mut outfile, &header)?;
        outfile.flush()?;
        log::info!("extracted {}", header.name);
        count += 1;
    }
    Ok(count)
}

/// Write matching members to `writer` in archive order, each preceded by a
/// banner line naming it.
pub fn print<W: Write>(arc_path: &Path, patterns: &[String], writer: &mut W) -> Result<usize, DYNERR> {
    let mut arc = BufReader::new(std::fs::File::open(arc_path)?);
    let mut count = 0;
    while let Some(header) = Header::read(&mut arc)? {
        if !selected(&header.name, patterns) {
            skip_bytes(&mut arc, header.compsize as u64)?;
            continue;
        }
        writeln!(writer, "===== {} =====", header.name)?;
        expand_member(&mut arc, writer, &header)?;
        count += 1;
    }
    Ok(count)
}

/// Headers of matching members, in archive order.
pub fn list_entries(arc_path: &Path, patterns: &[String]) -> Result<Vec<Header>, DYNERR> {
    let mut arc = BufReader::new(std::fs::File::open(arc_path)?);
    let mut ans = Vec::new();
    while let Some(header) = Header::read(&mut arc)? {
        skip_bytes(&mut arc, header.compsize as u64)?;
        if selected(&header.name, patterns) {
            ans.push(header);
        }
    }
    Ok(ans)
}

// *************** TESTS *****************

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn none() -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn header_roundtrip() {
        let mut header = Header::now("example.txt".to_string());
        header.method = METHOD_COMPRESSED;
        header.compsize = 1234;
        header.origsize = 56789;
        header.file_crc = 0xABCD;
        let mut buf: Vec<u8> = Vec::new();
        header.write(&mut buf).expect("write err");
        buf.extend_from_slice(&[0, 0]); // end of archive
        let mut src = Cursor::new(&buf);
        let back = Header::read(&mut src).expect("read err").expect("no header");
        assert_eq!(back.method, header.method);
        assert_eq!(back.compsize, 1234);
        assert_eq!(back.origsize, 56789);
        assert_eq!(back.file_crc, 0xABCD);
        assert_eq!(back.name, "example.txt");
        assert!(Header::read(&mut src).expect("read err").is_none());
    }

    #[test]
    fn corrupt_header_is_rejected() {
        let mut header = Header::now("example.txt".to_string());
        header.origsize = 100;
        let mut buf: Vec<u8> = Vec::new();
        header.write(&mut buf).expect("write err");
        buf[5] ^= 0x40;
        let mut src = Cursor::new(&buf);
        assert!(Header::read(&mut src).is_err());
    }

    #[test]
    fn wildcards() {
        assert!(wildcard_match("readme.txt", "readme.txt"));
        assert!(wildcard_match("readme.txt", "*.txt"));
        assert!(wildcard_match("readme.txt", "read*"));
        assert!(wildcard_match("readme.txt", "r??dme.*"));
        assert!(!wildcard_match("readme.txt", "*.bin"));
        assert!(!wildcard_match("readme.txt", "readme.txt.bak"));
        assert!(!wildcard_match("readme", "readme?"));
        assert!(wildcard_match("", "*"));
    }

    #[test]
    fn ratio_is_permille() {
        assert_eq!(ratio(0, 0), 0);
        assert_eq!(ratio(50, 100), 500);
        assert_eq!(ratio(1, 3), 333);
        assert_eq!(ratio(100, 100), 1000);
    }

    #[test]
    fn archive_lifecycle() {
        let dir = tempfile::tempdir().expect("tempdir err");
        let arc_path = dir.path().join("test.arc");
        let text_path = dir.path().join("story.txt");
        let noise_path = dir.path().join("noise.bin");
        let story: Vec<u8> = b"it was a dark and stormy night; ".repeat(400);
        let mut seed = 0x1234_5678u32;
        let noise: Vec<u8> = (0..4096)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                seed as u8
            })
            .collect();
        std::fs::write(&text_path, &story).expect("write err");
        std::fs::write(&noise_path, &noise).expect("write err");

        let count = add(
            &arc_path,
            &[
                text_path.to_string_lossy().into_owned(),
                noise_path.to_string_lossy().into_owned(),
            ],
        )
        .expect("add err");
        assert_eq!(count, 2);

        let entries = list_entries(&arc_path, &none()).expect("list err");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "story.txt");
        assert_eq!(entries[0].method, METHOD_COMPRESSED);
        assert!((entries[0].compsize as usize) < story.len());
        assert_eq!(entries[0].origsize as usize, story.len());
        assert_eq!(entries[1].name, "noise.bin");
        assert_eq!(entries[1].method, METHOD_STORED);
        assert_eq!(entries[1].compsize, entries[1].origsize);

        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).expect("mkdir err");
        let count = extract(&arc_path, &none(), &out_dir).expect("extract err");
        assert_eq!(count, 2);
        assert_eq!(std::fs::read(out_dir.join("story.txt")).expect("read err"), story);
        assert_eq!(std::fs::read(out_dir.join("noise.bin")).expect("read err"), noise);

        let mut printed: Vec<u8> = Vec::new();
        let count = print(&arc_path, &["story.txt".to_string()], &mut printed).expect("print err");
        assert_eq!(count, 1);
        assert!(printed.starts_with(b"===== story.txt ====="));

        // adding again under the same name replaces rather than duplicates
        let story2: Vec<u8> = b"on the contrary, the sun shone brightly; ".repeat(300);
        std::fs::write(&text_path, &story2).expect("write err");
        let count = add(&arc_path, &[text_path.to_string_lossy().into_owned()]).expect("add err");
        assert_eq!(count, 1);
        let entries = list_entries(&arc_path, &none()).expect("list err");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.iter().filter(|e| e.name == "story.txt").count(), 1);

        let count = replace(&arc_path, &[noise_path.to_string_lossy().into_owned()]).expect("replace err");
        assert_eq!(count, 1);

        let count = delete(&arc_path, &["*.bin".to_string()]).expect("delete err");
        assert_eq!(count, 1);
        let entries = list_entries(&arc_path, &none()).expect("list err");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "story.txt");

        let count = extract(&arc_path, &none(), &out_dir).expect("extract err");
        assert_eq!(count, 1);
        assert_eq!(std::fs::read(out_dir.join("story.txt")).expect("read err"), story2);
    }
}
