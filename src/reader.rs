//! Decoders for the three binary graph-file formats.
//!
//! All three decoders produce a [`GraphFile`]: the raw function → file → line association plus
//! the per-function file visitation order. The modern `*.gcno` format is self-describing
//! (endianness, compiler version); the legacy `*.bb`/`*.bbg` formats have fixed encodings.
//!
//! [`GraphFile`]: ../raw/struct.GraphFile.html

use config::{Config, SplitCrc};
use error::*;
use intern::{Interner, Symbol};
use raw::*;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use std::collections::HashSet;
use std::io::{self, Read, Take};

/// A word-oriented reader over a graph file.
///
/// All reads go through 32-bit words; the file's endianness is fixed once at construction and
/// every word is byte-swapped as needed.
#[derive(Debug)]
struct WordReader<R> {
    reader: R,
    cursor: u64,
    is_big_endian: bool,
}

/// Consumes the whole reader to the end.
fn consume_to_end<R: Read>(reader: &mut R) -> Result<()> {
    loop {
        let mut buf = [0u8; 64];
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(_) => continue,
            Err(e) => {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                } else {
                    bail!(e);
                }
            },
        }
    }
    Ok(())
}

impl<R: Read> WordReader<R> {
    fn new(reader: R, cursor: u64, is_big_endian: bool) -> WordReader<R> {
        WordReader {
            reader,
            cursor,
            is_big_endian,
        }
    }

    /// Reads one 32-bit word.
    ///
    /// # Errors
    ///
    /// Returns [`Io`] on I/O failure, e.g. reaching end-of-file.
    ///
    /// [`Io`]: ../error/enum.ErrorKind.html#variant.Io
    fn read_32(&mut self) -> Result<u32> {
        let mut value = self.reader.read_u32::<LittleEndian>()?;
        self.cursor += 4;
        if self.is_big_endian {
            value = value.swap_bytes();
        }
        Ok(value)
    }

    /// Reads a string in the modern format: a length-in-words prefix followed by NUL-padded
    /// content.
    ///
    /// # Errors
    ///
    /// * Returns [`Io`] on I/O failure or when the content is shorter than its declared length.
    /// * Returns [`FromUtf8`] if the string is not encoded in UTF-8.
    ///
    /// [`Io`]: ../error/enum.ErrorKind.html#variant.Io
    /// [`FromUtf8`]: ../error/enum.ErrorKind.html#variant.FromUtf8
    fn read_string(&mut self) -> Result<String> {
        let words = self.read_32()?;
        self.read_string_with_length(words)
    }

    /// Reads the content of a modern-format string whose length prefix was already consumed.
    fn read_string_with_length(&mut self, words: u32) -> Result<String> {
        let length = u64::from(words) * 4;
        let mut buf = Vec::with_capacity(length as usize);
        let read = self.reader.by_ref().take(length).read_to_end(&mut buf)? as u64;
        self.cursor += read;
        ensure!(read == length, io::Error::from(io::ErrorKind::UnexpectedEof));
        let actual = buf.iter().rposition(|b| *b != 0).map_or(0, |pos| pos + 1);
        buf.truncate(actual);
        Ok(String::from_utf8(buf)?)
    }

    /// Reads a string in the `*.bbg` format: a length-in-bytes prefix followed by content padded
    /// to a word boundary.
    fn read_byte_string(&mut self) -> Result<String> {
        let length = u64::from(self.read_32()?);
        if length == 0 {
            return Ok(String::new());
        }
        let padded = (length + 3) & !3;
        let mut buf = Vec::with_capacity(padded as usize);
        let read = self.reader.by_ref().take(padded).read_to_end(&mut buf)? as u64;
        self.cursor += read;
        ensure!(read == padded, io::Error::from(io::ErrorKind::UnexpectedEof));
        buf.truncate(length as usize);
        while buf.last() == Some(&0) {
            buf.pop();
        }
        Ok(String::from_utf8(buf)?)
    }

    /// Creates a sub-reader bounded to the next `length` bytes (one record's payload).
    fn record(&mut self, length: u64) -> WordReader<Take<&mut R>> {
        let cursor = self.cursor;
        let is_big_endian = self.is_big_endian;
        WordReader::new(self.reader.by_ref().take(length), cursor, is_big_endian)
    }
}

//----------------------------------------------------------------------------------------------------------------------
//{{{ gcno

/// Decode state shared between the records of one file.
#[derive(Default)]
struct DecodeState {
    raw: RawAssociation,
    order: FileOrder,
    /// Compiler-synthesized functions, erased after decoding.
    artificial: HashSet<Symbol>,
    /// Function and file the next `LINES` record belongs to.
    current: Option<(Symbol, Symbol)>,
    /// Cached split-checksum decision for pre-4.7 files.
    split_crc: Option<bool>,
}

impl DecodeState {
    fn finish(mut self, format: Format, version: Version, stamp: u32, file_order_first: bool) -> GraphFile {
        for function in self.artificial.drain() {
            trace!("erasing artificial function {:?}", function);
            self.raw.remove_function(function);
            self.order.remove_function(function);
        }
        GraphFile {
            format,
            version,
            stamp,
            raw: self.raw,
            order: self.order,
            file_order_first,
        }
    }
}

/// Decodes a modern `*.gcno` file.
///
/// # Errors
///
/// * Returns [`UnknownFileType`] if the magic number is not recognized in either byte order.
/// * Returns [`UnsupportedVersion`] if the version word is malformed.
/// * Returns [`CorruptRecord`] if a record's content does not fit its declared length.
/// * Returns [`Io`] on I/O failure.
///
/// A file that ends in the middle of a record is decoded up to the last complete record with a
/// warning; truncation is not fatal.
///
/// [`UnknownFileType`]: ../error/enum.ErrorKind.html#variant.UnknownFileType
/// [`UnsupportedVersion`]: ../error/enum.ErrorKind.html#variant.UnsupportedVersion
/// [`CorruptRecord`]: ../error/enum.ErrorKind.html#variant.CorruptRecord
/// [`Io`]: ../error/enum.ErrorKind.html#variant.Io
pub fn decode_gcno<R: Read>(mut reader: R, interner: &mut Interner, config: &Config) -> Result<GraphFile> {
    trace!("gcno-magic");
    let is_big_endian = match reader.read_u32::<LittleEndian>()? {
        GCNO_MAGIC => false,
        magic if magic == GCNO_MAGIC.swap_bytes() => true,
        magic => bail!(ErrorKind::UnknownFileType(magic)),
    };
    let mut r = WordReader::new(reader, 4, is_big_endian);

    trace!("gcno-version @ 0x{:x}", r.cursor);
    let version = Version::try_from(r.read_32()?)?;
    trace!("gcno-stamp @ 0x{:x}", r.cursor);
    let stamp = r.read_32()?;
    if version >= VERSION_9_0 {
        trace!("gcno-cwd @ 0x{:x}", r.cursor);
        let cwd = r.read_string()?;
        trace!("gcno-cwd = {:?}", cwd);
    }
    if version >= VERSION_8_0 {
        trace!("gcno-unexecuted-blocks @ 0x{:x}", r.cursor);
        let _ = r.read_32()?;
    }

    let mut state = DecodeState::default();
    loop {
        let tag = match r.read_32() {
            Ok(tag) => Tag(tag),
            Err(ref e) if e.is_eof() => break,
            Err(e) => return Err(e),
        };
        if tag == EOF_TAG {
            break;
        }
        let length = match r.read_32() {
            Ok(words) => u64::from(words) * 4,
            Err(ref e) if e.is_eof() => {
                warn!("graph file truncated in record header of {}, rest of file skipped", tag);
                break;
            },
            Err(e) => return Err(e),
        };
        trace!("record {} of {} bytes @ 0x{:x}", tag, length, r.cursor);
        let start = r.cursor;
        let (result, leftover) = {
            let mut sub = r.record(length);
            let result = match tag {
                FUNCTION_TAG => parse_gcno_function(&mut sub, version, config.split_crc, interner, &mut state),
                LINES_TAG => parse_gcno_lines(&mut sub, interner, &mut state),
                _ => Ok(()),
            };
            consume_to_end(&mut sub.reader)?;
            (result, sub.reader.limit())
        };
        r.cursor = start + (length - leftover);
        if leftover != 0 {
            warn!("graph file truncated inside record {} ({} of {} bytes missing), rest of file skipped", tag, leftover, length);
            break;
        }
        match result {
            Ok(()) => {},
            // The payload is fully present, so running out of it means a field overran the
            // declared record length.
            Err(ref e) if e.is_eof() => bail!(ErrorKind::CorruptRecord(tag.0, start)),
            Err(e) => return Err(e),
        }
    }

    Ok(state.finish(Format::Gcno, version, stamp, false))
}

/// Parses the `ANNOUNCE_FUNCTION` record of a `*.gcno`.
fn parse_gcno_function<R: Read>(
    r: &mut WordReader<Take<&mut R>>,
    version: Version,
    policy: SplitCrc,
    interner: &mut Interner,
    state: &mut DecodeState,
) -> Result<()> {
    trace!("function-ident @ 0x{:x}", r.cursor);
    let _ident = r.read_32()?;
    trace!("function-lineno-checksum @ 0x{:x}", r.cursor);
    let _lineno_checksum = r.read_32()?;

    let name = if version >= VERSION_4_7 {
        trace!("function-cfg-checksum @ 0x{:x}", r.cursor);
        let _ = r.read_32()?;
        r.read_string()?
    } else {
        // Pre-4.7 files are ambiguous about a second checksum word. Honor the explicit
        // compatibility override, otherwise decide once per file by peeking at the word after
        // the line checksum: a value too large to be the name length must be a checksum.
        let split = match (policy, state.split_crc) {
            (SplitCrc::On, _) => true,
            (SplitCrc::Off, _) => false,
            (SplitCrc::Auto, Some(cached)) => cached,
            (SplitCrc::Auto, None) => {
                let word = r.read_32()?;
                let split = u64::from(word) * 4 > r.reader.limit();
                debug!("split-checksum heuristic decided: {}", split);
                state.split_crc = Some(split);
                let name = if split {
                    r.read_string()?
                } else {
                    r.read_string_with_length(word)?
                };
                return finish_gcno_function(r, version, name, interner, state);
            },
        };
        state.split_crc = Some(split);
        if split {
            trace!("function-cfg-checksum @ 0x{:x}", r.cursor);
            let _ = r.read_32()?;
        }
        r.read_string()?
    };
    finish_gcno_function(r, version, name, interner, state)
}

/// Parses the fields of a function record following the name.
fn finish_gcno_function<R: Read>(
    r: &mut WordReader<Take<&mut R>>,
    version: Version,
    name: String,
    interner: &mut Interner,
    state: &mut DecodeState,
) -> Result<()> {
    let artificial = if version >= VERSION_8_0 {
        trace!("function-artificial @ 0x{:x}", r.cursor);
        r.read_32()? != 0
    } else {
        false
    };
    trace!("function-filename @ 0x{:x}", r.cursor);
    let filename = r.read_string()?;
    trace!("function-start-line @ 0x{:x}", r.cursor);
    let line = r.read_32()?;
    // Version 8+ records continue with column and end-line words; the record loop drains them.

    let function = interner.intern(name);
    let file = interner.intern(filename);
    if artificial {
        state.artificial.insert(function);
    }
    state.current = Some((function, file));
    state.raw.add_line(function, file, line);
    state.order.record(function, file);
    Ok(())
}

/// Parses the `LINES` record of a `*.gcno`: a basic block index, then line numbers interleaved
/// with filename switches (a zero line introduces a filename string, an empty filename ends the
/// record).
fn parse_gcno_lines<R: Read>(r: &mut WordReader<Take<&mut R>>, interner: &mut Interner, state: &mut DecodeState) -> Result<()> {
    trace!("lines-block @ 0x{:x}", r.cursor);
    let _block = r.read_32()?;
    let (function, mut file) = match state.current {
        Some(current) => current,
        None => {
            warn!("lines record before any function record, skipped");
            return Ok(());
        },
    };
    loop {
        let line = match r.read_32() {
            Ok(line) => line,
            Err(ref e) if e.is_eof() => break,
            Err(e) => return Err(e),
        };
        if line == 0 {
            trace!("lines-filename @ 0x{:x}", r.cursor);
            let name = r.read_string()?;
            if name.is_empty() {
                break;
            }
            file = interner.intern(name);
            state.order.record(function, file);
        } else {
            state.raw.add_line(function, file, line);
        }
    }
    Ok(())
}

//}}}
//----------------------------------------------------------------------------------------------------------------------
//{{{ bb

/// Decodes a legacy `*.bb` file: a flat little-endian stream of signed words where [`BB_FILENAME`]
/// and [`BB_FUNCTION`] sentinels bracket strings, positive words are line numbers and zero words
/// separate basic blocks.
///
/// [`BB_FILENAME`]: ../raw/constant.BB_FILENAME.html
/// [`BB_FUNCTION`]: ../raw/constant.BB_FUNCTION.html
pub fn decode_bb<R: Read>(reader: R, interner: &mut Interner) -> Result<GraphFile> {
    let mut r = WordReader::new(reader, 0, false);
    let mut raw = RawAssociation::default();
    let mut order = FileOrder::default();
    let mut file = None;
    let mut function = None;

    loop {
        let word = match r.read_32() {
            Ok(word) => word as i32,
            Err(ref e) if e.is_eof() => break,
            Err(e) => return Err(e),
        };
        match word {
            BB_FILENAME => {
                trace!("bb-filename @ 0x{:x}", r.cursor);
                let name = read_bb_string(&mut r, BB_FILENAME)?;
                file = if name.is_empty() { None } else { Some(interner.intern(name)) };
            },
            BB_FUNCTION => {
                trace!("bb-function @ 0x{:x}", r.cursor);
                let name = read_bb_string(&mut r, BB_FUNCTION)?;
                function = if name.is_empty() { None } else { Some(interner.intern(name)) };
            },
            0 => {}, // block separator
            line if line > 0 => {
                if let (Some(function), Some(file)) = (function, file) {
                    raw.add_line(function, file, line as u32);
                    order.record(function, file);
                }
            },
            other => warn!("unexpected word {} in bb stream, skipped", other),
        }
    }

    Ok(GraphFile {
        format: Format::Bb,
        version: ZERO_VERSION,
        stamp: 0,
        raw,
        order,
        file_order_first: true,
    })
}

/// Reads a `*.bb` string: words of packed characters terminated by a repetition of the sentinel
/// that introduced the string, with NUL padding stripped.
fn read_bb_string<R: Read>(r: &mut WordReader<R>, delimiter: i32) -> Result<String> {
    let mut buf = Vec::new();
    loop {
        let word = match r.read_32() {
            Ok(word) => word,
            Err(ref e) if e.is_eof() => break,
            Err(e) => return Err(e),
        };
        if word as i32 == delimiter {
            break;
        }
        let mut bytes = [0; 4];
        LittleEndian::write_u32(&mut bytes, word);
        buf.extend_from_slice(&bytes);
    }
    buf.retain(|b| *b != 0);
    Ok(String::from_utf8(buf)?)
}

//}}}
//----------------------------------------------------------------------------------------------------------------------
//{{{ bbg

/// Decodes a legacy `*.bbg` file: always big-endian, tag/byte-length framed records with
/// byte-length-prefixed strings and a single checksum word per function.
///
/// # Errors
///
/// * Returns [`UnknownFileType`] if the magic number does not match.
/// * Returns [`CorruptRecord`] if a record's content does not fit its declared length.
///
/// [`UnknownFileType`]: ../error/enum.ErrorKind.html#variant.UnknownFileType
/// [`CorruptRecord`]: ../error/enum.ErrorKind.html#variant.CorruptRecord
pub fn decode_bbg<R: Read>(reader: R, interner: &mut Interner) -> Result<GraphFile> {
    let mut r = WordReader::new(reader, 0, true);
    trace!("bbg-magic");
    let magic = r.read_32()?;
    ensure!(magic == BBG_MAGIC, ErrorKind::UnknownFileType(magic));
    trace!("bbg-version @ 0x{:x}", r.cursor);
    let _ = r.read_32()?;

    let mut state = DecodeState::default();
    loop {
        let tag = match r.read_32() {
            Ok(tag) => Tag(tag),
            Err(ref e) if e.is_eof() => break,
            Err(e) => return Err(e),
        };
        if tag == EOF_TAG {
            break;
        }
        let length = match r.read_32() {
            Ok(bytes) => u64::from(bytes),
            Err(ref e) if e.is_eof() => {
                warn!("graph file truncated in record header of {}, rest of file skipped", tag);
                break;
            },
            Err(e) => return Err(e),
        };
        trace!("record {} of {} bytes @ 0x{:x}", tag, length, r.cursor);
        let start = r.cursor;
        let (result, leftover) = {
            let mut sub = r.record(length);
            let result = match tag {
                FUNCTION_TAG => parse_bbg_function(&mut sub, interner, &mut state),
                LINES_TAG => parse_bbg_lines(&mut sub, interner, &mut state),
                _ => Ok(()),
            };
            consume_to_end(&mut sub.reader)?;
            (result, sub.reader.limit())
        };
        r.cursor = start + (length - leftover);
        if leftover != 0 {
            warn!("graph file truncated inside record {} ({} of {} bytes missing), rest of file skipped", tag, leftover, length);
            break;
        }
        match result {
            Ok(()) => {},
            Err(ref e) if e.is_eof() => bail!(ErrorKind::CorruptRecord(tag.0, start)),
            Err(e) => return Err(e),
        }
    }

    Ok(state.finish(Format::Bbg, ZERO_VERSION, 0, true))
}

/// Parses a `*.bbg` function record: a name string and one checksum word.
fn parse_bbg_function<R: Read>(r: &mut WordReader<Take<&mut R>>, interner: &mut Interner, state: &mut DecodeState) -> Result<()> {
    trace!("function-name @ 0x{:x}", r.cursor);
    let name = r.read_byte_string()?;
    trace!("function-checksum @ 0x{:x}", r.cursor);
    let _checksum = r.read_32()?;
    let function = interner.intern(name);
    // The record names no source file; the following lines records supply it.
    state.current = Some((function, Symbol::default()));
    Ok(())
}

/// Parses a `*.bbg` lines record, shaped like the modern one but with byte-length strings.
fn parse_bbg_lines<R: Read>(r: &mut WordReader<Take<&mut R>>, interner: &mut Interner, state: &mut DecodeState) -> Result<()> {
    trace!("lines-block @ 0x{:x}", r.cursor);
    let _block = r.read_32()?;
    let function = match state.current {
        Some((function, _)) => function,
        None => {
            warn!("lines record before any function record, skipped");
            return Ok(());
        },
    };
    let mut file = None;
    loop {
        let line = match r.read_32() {
            Ok(line) => line,
            Err(ref e) if e.is_eof() => break,
            Err(e) => return Err(e),
        };
        if line == 0 {
            trace!("lines-filename @ 0x{:x}", r.cursor);
            let name = r.read_byte_string()?;
            if name.is_empty() {
                break;
            }
            let symbol = interner.intern(name);
            file = Some(symbol);
            state.order.record(function, symbol);
        } else if let Some(file) = file {
            state.raw.add_line(function, file, line);
        }
    }
    Ok(())
}

//}}}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::BigEndian;

    /// Appends one word in the fixture's byte order.
    fn w_with(buf: &mut Vec<u8>, value: u32, big_endian: bool) {
        let mut bytes = [0; 4];
        if big_endian {
            BigEndian::write_u32(&mut bytes, value);
        } else {
            LittleEndian::write_u32(&mut bytes, value);
        }
        buf.extend_from_slice(&bytes);
    }

    /// Appends one little-endian word.
    fn w(buf: &mut Vec<u8>, value: u32) {
        w_with(buf, value, false);
    }

    /// Appends a modern-format string: the length word follows the file's byte order, the
    /// content is raw bytes in either order.
    fn gcno_string_with(buf: &mut Vec<u8>, s: &str, big_endian: bool) {
        let words = (s.len() as u32 + 4) / 4; // round up including at least one NUL
        w_with(buf, words, big_endian);
        buf.extend_from_slice(s.as_bytes());
        for _ in 0..(words as usize * 4 - s.len()) {
            buf.push(0);
        }
    }

    /// Appends a little-endian modern-format string.
    fn gcno_string(buf: &mut Vec<u8>, s: &str) {
        gcno_string_with(buf, s, false);
    }

    /// Builds a version 4.9 gcno with `foo` at line 10 in `a.c` owning lines 10..=12.
    fn simple_gcno_with(big_endian: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        w_with(&mut buf, GCNO_MAGIC, big_endian);
        w_with(&mut buf, 0x3430_392a, big_endian); // "409*"
        w_with(&mut buf, 0x1234_5678, big_endian); // stamp

        // function record: ident, lineno checksum, cfg checksum, name, file, start line.
        let mut body = Vec::new();
        w_with(&mut body, 1, big_endian);
        w_with(&mut body, 0xaaaa_aaaa, big_endian);
        w_with(&mut body, 0xbbbb_bbbb, big_endian);
        gcno_string_with(&mut body, "foo", big_endian);
        gcno_string_with(&mut body, "a.c", big_endian);
        w_with(&mut body, 10, big_endian);
        w_with(&mut buf, FUNCTION_TAG.0, big_endian);
        w_with(&mut buf, body.len() as u32 / 4, big_endian);
        buf.extend_from_slice(&body);

        // an unrecognized record, skipped by length.
        w_with(&mut buf, 0x0141_0000, big_endian);
        w_with(&mut buf, 2, big_endian);
        w_with(&mut buf, 0, big_endian);
        w_with(&mut buf, 0, big_endian);

        // lines record: block 0, switch to "a.c", lines 11 and 12, terminator.
        let mut body = Vec::new();
        w_with(&mut body, 0, big_endian);
        w_with(&mut body, 0, big_endian);
        gcno_string_with(&mut body, "a.c", big_endian);
        w_with(&mut body, 11, big_endian);
        w_with(&mut body, 12, big_endian);
        w_with(&mut body, 0, big_endian);
        w_with(&mut body, 0, big_endian); // empty filename = end of record
        w_with(&mut buf, LINES_TAG.0, big_endian);
        w_with(&mut buf, body.len() as u32 / 4, big_endian);
        buf.extend_from_slice(&body);

        buf
    }

    fn simple_gcno() -> Vec<u8> {
        simple_gcno_with(false)
    }

    fn lines_of(graph: &GraphFile, interner: &mut Interner, function: &str, file: &str) -> Vec<u32> {
        let function = interner.intern(function);
        let file = interner.intern(file);
        graph.raw.functions[&function][&file].clone()
    }

    #[test]
    fn decodes_simple_gcno() {
        let mut interner = Interner::new();
        let graph = decode_gcno(&simple_gcno()[..], &mut interner, &Config::default()).unwrap();
        assert_eq!(graph.format, Format::Gcno);
        assert_eq!(graph.version, Version { major: 4, minor: 9 });
        assert_eq!(graph.stamp, 0x1234_5678);
        assert!(!graph.file_order_first);
        assert_eq!(lines_of(&graph, &mut interner, "foo", "a.c"), vec![10, 11, 12]);
    }

    #[test]
    fn gcno_decoding_is_endianness_transparent() {
        // only the word-sized fields change byte order; string content stays raw bytes.
        let mut interner = Interner::new();
        let graph_le = decode_gcno(&simple_gcno_with(false)[..], &mut interner, &Config::default()).unwrap();
        let graph_be = decode_gcno(&simple_gcno_with(true)[..], &mut interner, &Config::default()).unwrap();
        assert_eq!(graph_le, graph_be);
        assert_eq!(lines_of(&graph_be, &mut interner, "foo", "a.c"), vec![10, 11, 12]);
    }

    #[test]
    fn rejects_unknown_magic() {
        let mut buf = Vec::new();
        w(&mut buf, 0x0bad_f00d);
        w(&mut buf, 0x3430_392a);
        let mut interner = Interner::new();
        match *decode_gcno(&buf[..], &mut interner, &Config::default()).unwrap_err().kind() {
            ErrorKind::UnknownFileType(magic) => assert_eq!(magic, 0x0bad_f00d),
            ref e => panic!("unexpected error {:?}", e),
        }
    }

    /// Builds a pre-4.7 function record, optionally with a second checksum word.
    fn old_gcno(split: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        w(&mut buf, GCNO_MAGIC);
        w(&mut buf, 0x3430_362a); // "406*"
        w(&mut buf, 0);
        let mut body = Vec::new();
        w(&mut body, 1);
        w(&mut body, 0xaaaa_aaaa);
        if split {
            w(&mut body, 0xbbbb_bbbb);
        }
        gcno_string(&mut body, "foo");
        gcno_string(&mut body, "a.c");
        w(&mut body, 10);
        w(&mut buf, FUNCTION_TAG.0);
        w(&mut buf, body.len() as u32 / 4);
        buf.extend_from_slice(&body);
        buf
    }

    #[test]
    fn split_checksum_heuristic() {
        for &split in &[false, true] {
            let mut interner = Interner::new();
            let graph = decode_gcno(&old_gcno(split)[..], &mut interner, &Config::default()).unwrap();
            assert_eq!(lines_of(&graph, &mut interner, "foo", "a.c"), vec![10], "split = {}", split);
        }
    }

    #[test]
    fn split_checksum_override_wins() {
        let mut config = Config::default();
        config.split_crc = SplitCrc::On;
        let mut interner = Interner::new();
        let graph = decode_gcno(&old_gcno(true)[..], &mut interner, &config).unwrap();
        assert_eq!(lines_of(&graph, &mut interner, "foo", "a.c"), vec![10]);
    }

    /// Builds a version 8.2 gcno with a normal and an artificial function.
    fn gcno_v8() -> Vec<u8> {
        let mut buf = Vec::new();
        w(&mut buf, GCNO_MAGIC);
        w(&mut buf, 0x3830_322a); // "802*"
        w(&mut buf, 0);
        w(&mut buf, 0); // has-unexecuted-blocks flag

        for &(name, artificial, line) in &[("foo", 0, 10), ("__synthetic", 1, 20)] {
            let mut body = Vec::new();
            w(&mut body, 1);
            w(&mut body, 0);
            w(&mut body, 0);
            gcno_string(&mut body, name);
            w(&mut body, artificial);
            gcno_string(&mut body, "a.c");
            w(&mut body, line);
            w(&mut body, 1); // start column
            w(&mut body, line + 5); // end line
            w(&mut buf, FUNCTION_TAG.0);
            w(&mut buf, body.len() as u32 / 4);
            buf.extend_from_slice(&body);
        }
        buf
    }

    #[test]
    fn artificial_functions_are_erased() {
        let mut interner = Interner::new();
        let graph = decode_gcno(&gcno_v8()[..], &mut interner, &Config::default()).unwrap();
        let foo = interner.intern("foo");
        let synthetic = interner.intern("__synthetic");
        assert!(graph.raw.functions.contains_key(&foo));
        assert!(!graph.raw.functions.contains_key(&synthetic));
        assert!(!graph.order.functions.contains_key(&synthetic));
    }

    #[test]
    fn truncated_record_is_not_fatal() {
        let mut buf = simple_gcno();
        let len = buf.len();
        buf.truncate(len - 6); // chop into the final lines record
        let mut interner = Interner::new();
        let graph = decode_gcno(&buf[..], &mut interner, &Config::default()).unwrap();
        // the function record before the truncation point is preserved.
        let foo = interner.intern("foo");
        assert!(graph.raw.functions.contains_key(&foo));
    }

    #[test]
    fn overlong_string_is_a_corrupt_record() {
        let mut buf = Vec::new();
        w(&mut buf, GCNO_MAGIC);
        w(&mut buf, 0x3430_392a);
        w(&mut buf, 0);
        let mut body = Vec::new();
        w(&mut body, 1);
        w(&mut body, 0);
        w(&mut body, 0);
        w(&mut body, 1000); // name length far beyond the record
        w(&mut buf, FUNCTION_TAG.0);
        w(&mut buf, body.len() as u32 / 4);
        buf.extend_from_slice(&body);
        w(&mut buf, 0xdead_0000); // trailing data so the file itself is not truncated
        w(&mut buf, 0);

        let mut interner = Interner::new();
        match *decode_gcno(&buf[..], &mut interner, &Config::default()).unwrap_err().kind() {
            ErrorKind::CorruptRecord(tag, _) => assert_eq!(tag, FUNCTION_TAG.0),
            ref e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn decodes_bb_stream() {
        let mut buf = Vec::new();
        let pack = |buf: &mut Vec<u8>, s: &str, delim: i32| {
            w(buf, delim as u32);
            for chunk in s.as_bytes().chunks(4) {
                let mut word = [0; 4];
                word[..chunk.len()].copy_from_slice(chunk);
                buf.extend_from_slice(&word);
            }
            w(buf, delim as u32);
        };
        pack(&mut buf, "a.c", BB_FILENAME);
        pack(&mut buf, "main", BB_FUNCTION);
        w(&mut buf, 10);
        w(&mut buf, 11);
        w(&mut buf, 0); // block separator
        w(&mut buf, 12);

        let mut interner = Interner::new();
        let graph = decode_bb(&buf[..], &mut interner).unwrap();
        assert_eq!(graph.format, Format::Bb);
        assert!(graph.file_order_first);
        assert_eq!(lines_of(&graph, &mut interner, "main", "a.c"), vec![10, 11, 12]);
    }

    #[test]
    fn decodes_bbg_records() {
        let be = |buf: &mut Vec<u8>, value: u32| buf.extend_from_slice(&[
            (value >> 24) as u8,
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ]);
        let bbg_string = |buf: &mut Vec<u8>, s: &str| {
            be(buf, s.len() as u32);
            buf.extend_from_slice(s.as_bytes());
            for _ in 0..(4 - s.len() % 4) % 4 {
                buf.push(0);
            }
        };

        let mut buf = Vec::new();
        be(&mut buf, BBG_MAGIC);
        be(&mut buf, 0); // version word, ignored

        let mut body = Vec::new();
        bbg_string(&mut body, "main");
        be(&mut body, 0xcccc_cccc); // single checksum word
        be(&mut buf, FUNCTION_TAG.0);
        be(&mut buf, body.len() as u32);
        buf.extend_from_slice(&body);

        let mut body = Vec::new();
        be(&mut body, 0); // block
        be(&mut body, 0);
        bbg_string(&mut body, "a.c");
        be(&mut body, 10);
        be(&mut body, 11);
        be(&mut body, 0);
        be(&mut body, 0); // empty filename = end of record
        be(&mut buf, LINES_TAG.0);
        be(&mut buf, body.len() as u32);
        buf.extend_from_slice(&body);

        let mut interner = Interner::new();
        let graph = decode_bbg(&buf[..], &mut interner).unwrap();
        assert_eq!(graph.format, Format::Bbg);
        assert!(graph.file_order_first);
        assert_eq!(lines_of(&graph, &mut interner, "main", "a.c"), vec![10, 11]);
    }
}
