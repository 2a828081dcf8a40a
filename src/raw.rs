//! The raw structures of a graph file.
//!
//! A graph file associates function names with source files and line numbers. Three container
//! generations exist: the sentinel-delimited `*.bb` word stream, the big-endian tag/length
//! framed `*.bbg`, and the modern self-describing `*.gcno`. All three decode into the same
//! [`GraphFile`] with a [`RawAssociation`] (function → file → lines) and a [`FileOrder`]
//! (function → first-seen file order).
//!
//! [`GraphFile`]: ./struct.GraphFile.html
//! [`RawAssociation`]: ./struct.RawAssociation.html
//! [`FileOrder`]: ./struct.FileOrder.html

use config::Config;
use error::*;
use intern::{Interner, Symbol};
use reader;

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

//----------------------------------------------------------------------------------------------------------------------
//{{{ Format & magic numbers

/// The graph container format.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Format {
    /// Legacy flat word stream, `*.bb`.
    Bb,
    /// Legacy big-endian tag/length framed file, `*.bbg`.
    Bbg,
    /// Modern self-describing file, `*.gcno`.
    Gcno,
}

impl fmt::Display for Format {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(match *self {
            Format::Bb => "bb",
            Format::Bbg => "bbg",
            Format::Gcno => "gcno",
        })
    }
}

/// Magic number of a `*.gcno` file ("gcno" read as a word).
pub const GCNO_MAGIC: u32 = 0x6763_6e6f;
/// Magic number of a `*.bbg` file.
pub const BBG_MAGIC: u32 = 0x6762_6267;

/// Sentinel word announcing a filename string in a `*.bb` stream.
pub const BB_FILENAME: i32 = -1;
/// Sentinel word announcing a function name string in a `*.bb` stream.
pub const BB_FUNCTION: i32 = -2;

//}}}
//----------------------------------------------------------------------------------------------------------------------
//{{{ Tag

/// The tag of a framed record (`*.gcno` and `*.bbg`).
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Tag(pub u32);

/// The tag marking the end of the file.
pub const EOF_TAG: Tag = Tag(0);
/// The tag of an `ANNOUNCE_FUNCTION` record.
pub const FUNCTION_TAG: Tag = Tag(0x0100_0000);
/// The tag of a `LINES` record.
pub const LINES_TAG: Tag = Tag(0x0145_0000);

impl fmt::Display for Tag {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "0x{:08x}", self.0)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Tag(0x{:08x})", self.0)
    }
}

//}}}
//----------------------------------------------------------------------------------------------------------------------
//{{{ Version

/// Compiler version code recorded in a graph file.
///
/// The version gates several layout differences: split checksums (≥ 4.7), the artificial flag
/// and column/end-line fields (≥ 8.0) and the recorded working directory (≥ 9.0). Legacy `bb`
/// and `bbg` files carry no version and use [`ZERO_VERSION`].
///
/// [`ZERO_VERSION`]: ./constant.ZERO_VERSION.html
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    /// Major version number.
    pub major: u8,
    /// Minor version number.
    pub minor: u8,
}

/// Version of the legacy formats, which record none.
pub const ZERO_VERSION: Version = Version { major: 0, minor: 0 };
/// First version with an unconditionally split (function + control-flow) checksum.
pub const VERSION_4_7: Version = Version { major: 4, minor: 7 };
/// First version with the artificial flag and column/end-line fields in function records.
pub const VERSION_8_0: Version = Version { major: 8, minor: 0 };
/// First version recording the compilation working directory in the header.
pub const VERSION_9_0: Version = Version { major: 9, minor: 0 };

impl Version {
    /// Converts a raw version word to a `Version`.
    ///
    /// The word packs four ASCII characters, e.g. `"409*"` for 4.9 or `"A93*"` for 10.x
    /// compilers (majors of 10 and above start counting at `'A'`).
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedVersion`] if the word does not follow the packing.
    ///
    /// [`UnsupportedVersion`]: ../error/enum.ErrorKind.html#variant.UnsupportedVersion
    pub fn try_from(raw: u32) -> Result<Version> {
        ensure!(raw & 0x8080_80ff == 0x2a, ErrorKind::UnsupportedVersion(raw));
        let b0 = (raw >> 24) as u8;
        let b1 = (raw >> 16) as u8;
        let b2 = (raw >> 8) as u8;
        let major = match b0 {
            b'0'..=b'9' => b0 - b'0',
            b'A'..=b'Z' => b0 - b'A' + 10,
            _ => bail!(ErrorKind::UnsupportedVersion(raw)),
        };
        ensure!(b1.is_ascii_digit() && b2.is_ascii_digit(), ErrorKind::UnsupportedVersion(raw));
        let minor = (b1 - b'0') * 10 + (b2 - b'0');
        Ok(Version { major, minor })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}.{}", self.major, self.minor)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Version({})", self)
    }
}

//}}}
//----------------------------------------------------------------------------------------------------------------------
//{{{ RawAssociation & FileOrder

/// Function → source file → recorded line numbers (unsorted, may contain duplicates).
///
/// This is the association exactly as decoded; [`build_model`] converts it into the cleaned-up
/// per-file maps.
///
/// [`build_model`]: ../graph/fn.build_model.html
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct RawAssociation {
    /// Per-function line contributions.
    pub functions: HashMap<Symbol, HashMap<Symbol, Vec<u32>>>,
}

impl RawAssociation {
    /// Records one line contributed by `function` to `file`.
    pub fn add_line(&mut self, function: Symbol, file: Symbol, line: u32) {
        self.functions
            .entry(function)
            .or_insert_with(HashMap::new)
            .entry(file)
            .or_insert_with(Vec::new)
            .push(line);
    }

    /// Erases a function entirely, e.g. a compiler-synthesized one.
    pub fn remove_function(&mut self, function: Symbol) {
        self.functions.remove(&function);
    }
}

/// Function → filenames in first-seen order.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct FileOrder {
    /// Per-function file visitation order.
    pub functions: HashMap<Symbol, Vec<Symbol>>,
}

impl FileOrder {
    /// Records that `function` referenced `file`, keeping only the first occurrence.
    pub fn record(&mut self, function: Symbol, file: Symbol) {
        let order = self.functions.entry(function).or_insert_with(Vec::new);
        if !order.contains(&file) {
            order.push(file);
        }
    }

    /// Erases a function entirely.
    pub fn remove_function(&mut self, function: Symbol) {
        self.functions.remove(&function);
    }

    /// The first file referenced by `function`, if any.
    pub fn first(&self, function: Symbol) -> Option<Symbol> {
        self.functions.get(&function).and_then(|order| order.first().cloned())
    }
}

//}}}
//----------------------------------------------------------------------------------------------------------------------
//{{{ GraphFile

/// A decoded graph file.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GraphFile {
    /// The container format the file was decoded from.
    pub format: Format,
    /// Compiler version code, [`ZERO_VERSION`] for the legacy formats.
    ///
    /// [`ZERO_VERSION`]: ./constant.ZERO_VERSION.html
    pub version: Version,
    /// Timestamp word of the header, 0 for the legacy formats.
    pub stamp: u32,
    /// Function → file → lines association.
    pub raw: RawAssociation,
    /// Function → file visitation order.
    pub order: FileOrder,
    /// Whether function attribution should prefer the file order over the base file.
    ///
    /// Set for the legacy formats, whose function records carry no declared source file.
    pub file_order_first: bool,
}

impl GraphFile {
    /// Decodes the graph file at `p`, choosing the decoder from the file extension (`*.bb` and
    /// `*.bbg` are legacy, everything else is checked for the modern magic).
    pub fn open<P: AsRef<Path>>(p: P, interner: &mut Interner, config: &Config) -> Result<GraphFile> {
        let path = p.as_ref();
        debug!("open graph file {:?}", path);
        let file = BufReader::new(File::open(path)?);
        match path.extension().and_then(OsStr::to_str) {
            Some("bb") => reader::decode_bb(file, interner),
            Some("bbg") => reader::decode_bbg(file, interner),
            _ => reader::decode_gcno(file, interner, config),
        }
    }
}

//}}}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_decoding() {
        // "409*" = 4.9, "407*" = 4.7, "802*" = 8.2, "A93*" = 10.x series.
        assert_eq!(Version::try_from(0x3430_392a).unwrap(), Version { major: 4, minor: 9 });
        assert_eq!(Version::try_from(0x3430_372a).unwrap(), VERSION_4_7);
        assert_eq!(Version::try_from(0x3830_322a).unwrap(), Version { major: 8, minor: 2 });
        assert_eq!(Version::try_from(0x4139_332a).unwrap(), Version { major: 10, minor: 93 });
        assert!(Version::try_from(0x3430_3900).is_err());
        assert!(Version::try_from(0xff30_392a).is_err());
    }

    #[test]
    fn version_gates_are_ordered() {
        let v4_9 = Version { major: 4, minor: 9 };
        assert!(ZERO_VERSION < VERSION_4_7);
        assert!(VERSION_4_7 <= v4_9);
        assert!(v4_9 < VERSION_8_0);
        assert!(VERSION_8_0 < VERSION_9_0);
    }

    #[test]
    fn file_order_keeps_first_occurrence() {
        let mut order = FileOrder::default();
        let f = Symbol::from(1);
        let (a, b) = (Symbol::from(2), Symbol::from(3));
        order.record(f, a);
        order.record(f, b);
        order.record(f, a);
        assert_eq!(order.functions[&f], vec![a, b]);
        assert_eq!(order.first(f), Some(a));
    }
}
