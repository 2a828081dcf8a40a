//! Invocation of the external coverage tool.
//!
//! The tool's command line has grown over two decades, so nothing about it is assumed: the
//! flags it supports are probed from its `--help` text, and the report grammar is chosen from
//! its `--version` output. Reports are produced in the data file's directory, which the tool
//! treats as the working directory, so every invocation runs under a [`CwdGuard`].
//!
//! [`CwdGuard`]: ../utils/struct.CwdGuard.html

use error::{ErrorKind, Result};
use gcov::Grammar;
use utils::CwdGuard;

use regex::Regex;

use std::ffi::OsStr;
use std::fs::read_dir;
use std::path::{Path, PathBuf};
use std::process::Command;

bitflags! {
    /// Command-line capabilities advertised by the tool's help text.
    pub struct GcovCapabilities: u8 {
        /// `-b`, branch probability output.
        const BRANCH_PROBABILITIES = 1;
        /// `-c`, branch counts instead of percentages.
        const BRANCH_COUNTS = 2;
        /// `-a`, per-block counts within a line.
        const ALL_BLOCKS = 4;
        /// `-p`, mangled but complete paths in output filenames.
        const PRESERVE_PATHS = 8;
        /// `-x`, hashed output filenames.
        const HASH_FILENAMES = 16;
        /// `-o`, explicit object/data directory.
        const OBJECT_DIRECTORY = 32;
    }
}

/// Extracts the capability set from the tool's `--help` output.
pub fn parse_capabilities(help: &str) -> GcovCapabilities {
    let table = [
        ("--branch-probabilities", GcovCapabilities::BRANCH_PROBABILITIES),
        ("--branch-counts", GcovCapabilities::BRANCH_COUNTS),
        ("--all-blocks", GcovCapabilities::ALL_BLOCKS),
        ("--preserve-paths", GcovCapabilities::PRESERVE_PATHS),
        ("--hash-filenames", GcovCapabilities::HASH_FILENAMES),
        ("--object-directory", GcovCapabilities::OBJECT_DIRECTORY),
    ];
    let mut capabilities = GcovCapabilities::empty();
    for &(option, capability) in &table {
        if help.contains(option) {
            capabilities |= capability;
        }
    }
    capabilities
}

/// Version of the external tool, from its `--version` output.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct GcovVersion {
    pub major: u32,
    pub minor: u32,
}

/// The version at which the report output switched to the `count:line:source` grammar.
const MODERN_GRAMMAR_VERSION: GcovVersion = GcovVersion { major: 3, minor: 4 };

/// Extracts the first `major.minor` pair from the tool's `--version` output.
pub fn parse_version(version: &str) -> Option<GcovVersion> {
    let pattern = Regex::new(r"(\d+)\.(\d+)").unwrap();
    let caps = pattern.captures(version)?;
    Some(GcovVersion {
        major: caps[1].parse().ok()?,
        minor: caps[2].parse().ok()?,
    })
}

impl GcovVersion {
    /// The report grammar this version of the tool writes.
    pub fn grammar(self) -> Grammar {
        if self >= MODERN_GRAMMAR_VERSION {
            Grammar::Modern
        } else {
            Grammar::Legacy
        }
    }
}

/// A probed instance of the external tool.
#[derive(Clone, Debug)]
pub struct GcovTool {
    program: PathBuf,
    capabilities: GcovCapabilities,
    version: GcovVersion,
}

impl GcovTool {
    /// Probes `program` for its capabilities and version.
    pub fn probe<P: AsRef<Path>>(program: P) -> Result<GcovTool> {
        let program = program.as_ref().to_owned();
        let help = Command::new(&program).arg("--help").output()?;
        let capabilities = parse_capabilities(&String::from_utf8_lossy(&help.stdout));

        let version_output = Command::new(&program).arg("--version").output()?;
        let version = match parse_version(&String::from_utf8_lossy(&version_output.stdout)) {
            Some(version) => version,
            None => {
                warn!("cannot detect version of {:?}, assuming the legacy grammar", program);
                GcovVersion { major: 0, minor: 0 }
            },
        };
        debug!("probed {:?}: version {}.{}, capabilities {:?}", program, version.major, version.minor, capabilities);

        Ok(GcovTool { program, capabilities, version })
    }

    /// The grammar to parse this tool's reports with.
    pub fn grammar(&self) -> Grammar {
        self.version.grammar()
    }

    /// The probed capability set.
    pub fn capabilities(&self) -> GcovCapabilities {
        self.capabilities
    }

    /// The fixed flag set used for every invocation, restricted to probed capabilities.
    fn flags(&self) -> Vec<&'static OsStr> {
        let mut flags = Vec::new();
        if self.capabilities.contains(GcovCapabilities::BRANCH_PROBABILITIES) {
            flags.push(OsStr::new("-b"));
        }
        if self.capabilities.contains(GcovCapabilities::BRANCH_COUNTS) {
            flags.push(OsStr::new("-c"));
        }
        if self.capabilities.contains(GcovCapabilities::ALL_BLOCKS) {
            flags.push(OsStr::new("-a"));
        }
        // either flag keeps same-named headers apart; hashed names never collide.
        if self.capabilities.contains(GcovCapabilities::HASH_FILENAMES) {
            flags.push(OsStr::new("-x"));
        } else if self.capabilities.contains(GcovCapabilities::PRESERVE_PATHS) {
            flags.push(OsStr::new("-p"));
        }
        flags
    }

    /// Runs the tool against one data file, returning the reports it produced.
    ///
    /// The working directory is changed to `working_dir` for the duration of the call and
    /// restored on every exit path. A nonzero exit or a run producing no report is an error in
    /// the gcov category.
    pub fn run(
        &self,
        data_file: &Path,
        working_dir: &Path,
        object_dir: Option<&Path>,
    ) -> Result<Vec<PathBuf>> {
        let _guard = CwdGuard::change_to(working_dir)?;

        let mut command = Command::new(&self.program);
        command.args(self.flags());
        if let Some(object_dir) = object_dir {
            if self.capabilities.contains(GcovCapabilities::OBJECT_DIRECTORY) {
                command.arg("-o").arg(object_dir);
            }
        }
        command.arg(data_file);
        trace!("running {:?}", command);

        let output = command.output()?;
        if !output.status.success() {
            warn!("tool failed on {:?}: {}", data_file, String::from_utf8_lossy(&output.stderr));
            bail!(ErrorKind::GcovFailed(output.status));
        }

        let mut reports = Vec::new();
        for entry in read_dir(".")? {
            let path = entry?.path();
            if path.extension() == Some(OsStr::new("gcov")) {
                reports.push(path);
            }
        }
        if reports.is_empty() {
            bail!(ErrorKind::NoGcovOutput(data_file.to_owned()));
        }
        reports.sort();
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_follow_the_help_text() {
        let help = "Usage: gcov [OPTION...] SOURCE|OBJ...\n\
                    -a, --all-blocks                Show information for every basic block\n\
                    -b, --branch-probabilities      Include branch probabilities in output\n\
                    -c, --branch-counts             Output counts of branches taken\n\
                    -o, --object-directory DIR|FILE Search for object files in DIR\n\
                    -p, --preserve-paths            Preserve all pathname components\n";
        let capabilities = parse_capabilities(help);
        assert!(capabilities.contains(GcovCapabilities::ALL_BLOCKS));
        assert!(capabilities.contains(GcovCapabilities::BRANCH_PROBABILITIES));
        assert!(capabilities.contains(GcovCapabilities::BRANCH_COUNTS));
        assert!(capabilities.contains(GcovCapabilities::OBJECT_DIRECTORY));
        assert!(capabilities.contains(GcovCapabilities::PRESERVE_PATHS));
        assert!(!capabilities.contains(GcovCapabilities::HASH_FILENAMES));
    }

    #[test]
    fn version_parsing_finds_the_first_pair() {
        assert_eq!(parse_version("gcov (GCC) 7.2.0"), Some(GcovVersion { major: 7, minor: 2 }));
        assert_eq!(
            parse_version("gcov (Ubuntu 4.8.4-2ubuntu1) 4.8.4"),
            Some(GcovVersion { major: 4, minor: 8 })
        );
        assert_eq!(parse_version("no digits here"), None);
    }

    #[test]
    fn grammar_switches_at_three_four() {
        assert_eq!(GcovVersion { major: 3, minor: 3 }.grammar(), Grammar::Legacy);
        assert_eq!(GcovVersion { major: 3, minor: 4 }.grammar(), Grammar::Modern);
        assert_eq!(GcovVersion { major: 8, minor: 0 }.grammar(), Grammar::Modern);
    }
}
