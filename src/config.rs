//! Run configuration.
//!
//! Everything that the original tool kept in process-wide globals (ignorable error categories,
//! compatibility switches, exclusion markers, the source path rewrite rule) lives in one
//! immutable [`Config`] that is passed to each component at construction.
//!
//! [`Config`]: ./struct.Config.html

use error::{Category, Error};

use regex::Regex;

use std::path::PathBuf;

bitflags! {
    /// Set of error categories that skip the failing unit instead of aborting the run.
    pub struct IgnoreErrors: u8 {
        /// Ignore graph-file decode failures.
        const GRAPH = 1;
        /// Ignore unreadable source files and unresolved ambiguous matches.
        const SOURCE = 2;
        /// Ignore external tool failures and unreadable reports.
        const GCOV = 4;
    }
}

impl IgnoreErrors {
    /// Checks whether the given category is in the ignore set.
    pub fn contains_category(self, category: Category) -> bool {
        self.contains(match category {
            Category::Graph => IgnoreErrors::GRAPH,
            Category::Source => IgnoreErrors::SOURCE,
            Category::Gcov => IgnoreErrors::GCOV,
        })
    }
}

/// Whether function records of old (pre-4.7) graph files carry a split checksum.
///
/// Graph files written for compiler versions before 4.7 are ambiguous about whether a function
/// record holds one checksum word or two. `Auto` resolves the ambiguity with a size heuristic on
/// the first function record of each file; `On`/`Off` force the answer for compilers known to
/// deviate.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SplitCrc {
    /// Decide per file with the record-length heuristic.
    Auto,
    /// Function records always carry function + control-flow checksums.
    On,
    /// Function records carry a single checksum word.
    Off,
}

/// Exclusion marker patterns scanned in the source text of a report.
///
/// The `line`/`start`/`stop` set suppresses all data for the marked lines; the `br_*` set
/// suppresses only branch data while keeping line data.
#[derive(Clone, Debug)]
pub struct Markers {
    /// Excludes the marked line.
    pub line: Regex,
    /// Starts an excluded region.
    pub start: Regex,
    /// Ends an excluded region.
    pub stop: Regex,
    /// Excludes branch data on the marked line.
    pub br_line: Regex,
    /// Starts a branch-excluded region.
    pub br_start: Regex,
    /// Ends a branch-excluded region.
    pub br_stop: Regex,
}

impl Default for Markers {
    fn default() -> Markers {
        Markers {
            line: Regex::new(r"LCOV_EXCL_LINE").unwrap(),
            start: Regex::new(r"LCOV_EXCL_START").unwrap(),
            stop: Regex::new(r"LCOV_EXCL_STOP").unwrap(),
            br_line: Regex::new(r"LCOV_EXCL_BR_LINE").unwrap(),
            br_start: Regex::new(r"LCOV_EXCL_BR_START").unwrap(),
            br_stop: Regex::new(r"LCOV_EXCL_BR_STOP").unwrap(),
        }
    }
}

/// A single pattern/replacement rewrite applied to every resolved source path.
#[derive(Clone, Debug)]
pub struct SourceRewrite {
    /// Pattern matched against the resolved path.
    pub pattern: Regex,
    /// Replacement text; `$1` etc. refer to capture groups of the pattern.
    pub replacement: String,
}

impl SourceRewrite {
    /// Applies the rewrite to a path rendered as a string.
    pub fn apply(&self, path: &str) -> String {
        self.pattern.replace(path, self.replacement.as_str()).into_owned()
    }
}

/// The immutable configuration context shared by all components.
#[derive(Clone, Debug)]
pub struct Config {
    /// Test name emitted in the `TN:` line of every record.
    pub test_name: String,
    /// Error categories that skip the failing unit instead of aborting.
    pub ignore: IgnoreErrors,
    /// Split-checksum compatibility mode for pre-4.7 graph files.
    pub split_crc: SplitCrc,
    /// Emit a per-line source checksum in `DA:` lines.
    pub checksum: bool,
    /// Derive function execution counts from line counts when the report supplies none.
    pub derive_function_data: bool,
    /// Rewrite rule applied to every resolved source path.
    pub adjust_src: Option<SourceRewrite>,
    /// Starting candidate for the automatic base directory search.
    pub base_directory: Option<PathBuf>,
    /// Exclusion marker patterns.
    pub markers: Markers,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            test_name: String::new(),
            ignore: IgnoreErrors::empty(),
            split_crc: SplitCrc::Auto,
            checksum: false,
            derive_function_data: false,
            adjust_src: None,
            base_directory: None,
            markers: Markers::default(),
        }
    }
}

impl Config {
    /// Checks whether the propagation policy allows skipping over `error`.
    ///
    /// Errors of an unclassified kind (raw I/O, UTF-8) take the category of the unit being
    /// processed, which the caller supplies as `default_category`.
    pub fn is_ignored(&self, error: &Error, default_category: Category) -> bool {
        let category = error.category().unwrap_or(default_category);
        self.ignore.contains_category(category)
    }
}
