//! `covinfo` converts compiler-emitted coverage artifacts into normalized lcov-style coverage
//! records.
//!
//! The crate decodes the three gcov-family binary graph containers (`*.bb`, `*.bbg`, `*.gcno`)
//! into per-file instrumentation and function maps, parses the textual per-source reports
//! produced by the external `gcov` tool, resolves path and same-filename ambiguities, and merges
//! everything into one `SF:`/`DA:`/`end_of_record` record per source file.
//!
//! Typical flow for one data file:
//!
//! 1. [`GraphFile::open`] decodes the binary graph file.
//! 2. [`graph::build_model`] turns the raw association into an instrumentation map and a
//!    function map.
//! 3. [`paths::find_base`] and [`paths::PathResolver`] canonicalize the recorded filenames.
//! 4. [`gcov::parse_report`] parses each generated `*.gcov` report.
//! 5. [`ambiguity::resolve`] picks the right path when several share a filename.
//! 6. [`report::RecordWriter`] merges and serializes the final record.
//!
//! [`GraphFile::open`]: raw/struct.GraphFile.html#method.open
//! [`graph::build_model`]: graph/fn.build_model.html
//! [`paths::find_base`]: paths/fn.find_base.html
//! [`paths::PathResolver`]: paths/struct.PathResolver.html
//! [`gcov::parse_report`]: gcov/fn.parse_report.html
//! [`ambiguity::resolve`]: ambiguity/fn.resolve.html
//! [`report::RecordWriter`]: report/struct.RecordWriter.html

#![recursion_limit = "128"] // needed for error_chain.

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate log;
extern crate byteorder;
extern crate md5;
extern crate num_traits; // required for shawshank
extern crate regex;
extern crate shawshank;

mod intern;
mod utils;
pub mod ambiguity;
pub mod branch;
pub mod config;
pub mod error;
pub mod gcov;
pub mod graph;
pub mod paths;
pub mod raw;
pub mod reader;
pub mod report;
pub mod tool;

pub use branch::{BranchRecord, BranchVector};
pub use config::Config;
pub use error::{Category, ErrorKind, Result};
pub use gcov::GcovReport;
pub use graph::GraphModel;
pub use intern::{Interner, Symbol};
pub use raw::GraphFile;
pub use report::{CoverageRecord, RecordWriter};
