//! Errors related to the `covinfo` crate.
//!
//! Failures fall into three categories ([`Category`]): decoding a binary graph file, reading a
//! source file, and running or parsing the output of the external `gcov` tool. Each category can
//! be marked as ignorable in the [`Config`], in which case the failing unit (one file, one
//! record) is skipped with a warning instead of aborting the run.
//!
//! Please see documentation of the [`error-chain` crate](https://docs.rs/error-chain/) for
//! detailed usage.
//!
//! [`Category`]: ./enum.Category.html
//! [`Config`]: ../config/struct.Config.html

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::string::FromUtf8Error;

error_chain! {
    foreign_links {
        Io(io::Error) /** Wrapper of standard I/O error. */;
        FromUtf8(FromUtf8Error) /** Wrapper of UTF-8 decode error. */;
        Regex(::regex::Error) /** Wrapper of regular expression syntax error. */;
    }

    errors {
        /// Trying to read a graph file which is not in BB/BBG/GCNO format.
        UnknownFileType(magic: u32) {
            description("unknown file type")
            display("unknown file type, magic 0x{:08x} not recognized", magic)
        }

        /// The graph file is created for a compiler version that is not recognized.
        UnsupportedVersion(version: u32) {
            description("unsupported graph file version")
            display("unsupported graph file version 0x{:08x}", version)
        }

        /// A record's content does not fit its declared length.
        CorruptRecord(tag: u32, cursor: u64) {
            description("corrupt record")
            display("corrupt record, tag 0x{:08x} near file position 0x{:x}", tag, cursor)
        }

        /// Reached the end of the file when reading. Usually not fatal.
        Eof {
            description("encountered end of file")
        }

        /// A source file needed for checksums or ambiguity resolution cannot be read.
        MissingSource(path: PathBuf) {
            description("missing source file")
            display("cannot read source file {:?}", path)
        }

        /// A report's filename matches several recorded paths and none of them has matching
        /// content.
        UnresolvedAmbiguity(filename: String) {
            description("unresolved ambiguous source filename")
            display("no candidate for {:?} matches the report's source text", filename)
        }

        /// The external gcov tool exited with a non-zero status.
        GcovFailed(status: ExitStatus) {
            description("gcov failed")
            display("gcov exited with status {}", status)
        }

        /// The external gcov tool completed but produced no per-source report.
        NoGcovOutput(data_file: PathBuf) {
            description("gcov produced no output")
            display("gcov produced no *.gcov report for {:?}", data_file)
        }

        /// A per-source report exists but contains no usable data.
        EmptyReport(path: PathBuf) {
            description("empty gcov report")
            display("gcov report {:?} contains no coverage data", path)
        }
    }
}

/// The error categories of the propagation policy.
///
/// Each category can independently be declared ignorable; an error of an ignorable category
/// skips the failing unit with a warning, any other error aborts the whole run.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Category {
    /// Binary graph file cannot be decoded (bad magic, truncated or corrupt record, unreadable
    /// file).
    Graph,
    /// Source file cannot be read, or an ambiguous filename cannot be resolved.
    Source,
    /// The external gcov tool failed, produced nothing, or produced an unreadable report.
    Gcov,
}

impl ErrorKind {
    /// Returns the category of this error, or `None` for errors which take the category of
    /// whatever unit was being processed (e.g. raw I/O failures).
    pub fn category(&self) -> Option<Category> {
        match *self {
            ErrorKind::UnknownFileType(_) |
            ErrorKind::UnsupportedVersion(_) |
            ErrorKind::CorruptRecord(..) => Some(Category::Graph),
            ErrorKind::MissingSource(_) |
            ErrorKind::UnresolvedAmbiguity(_) => Some(Category::Source),
            ErrorKind::GcovFailed(_) |
            ErrorKind::NoGcovOutput(_) |
            ErrorKind::EmptyReport(_) => Some(Category::Gcov),
            _ => None,
        }
    }
}

impl Error {
    /// Returns the category of this error, see [`ErrorKind::category()`].
    ///
    /// [`ErrorKind::category()`]: ./enum.ErrorKind.html#method.category
    pub fn category(&self) -> Option<Category> {
        self.kind().category()
    }
}

//----------------------------------------------------------------------------------------------------------------------

/// Classifies whether an error is merely an end-of-file condition.
///
/// The binary decoders read repeating structures until the end of the file or record, so an EOF
/// at a structure boundary is the normal loop exit, not a failure.
pub trait IsEof {
    /// Checks whether the error is caused by reaching the end of the input.
    fn is_eof(&self) -> bool;
}

impl<T, E: IsEof> IsEof for ::std::result::Result<T, E> {
    fn is_eof(&self) -> bool {
        self.as_ref().err().map_or(false, E::is_eof)
    }
}

impl IsEof for ErrorKind {
    fn is_eof(&self) -> bool {
        match *self {
            ErrorKind::Io(ref e) => e.is_eof(),
            ErrorKind::Eof => true,
            _ => false,
        }
    }
}

impl IsEof for Error {
    fn is_eof(&self) -> bool {
        self.kind().is_eof()
    }
}

impl IsEof for io::Error {
    fn is_eof(&self) -> bool {
        self.kind() == io::ErrorKind::UnexpectedEof
    }
}

impl IsEof for FromUtf8Error {
    fn is_eof(&self) -> bool {
        false
    }
}
