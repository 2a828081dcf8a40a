//! Parsing of the textual per-source reports written by the coverage tool.
//!
//! Two report grammars exist. The modern one lays every row out as `count:line:source`, carries
//! explicit `line-block N` context markers and `function … called N` rows. The legacy one
//! prints the execution count in a fixed 16-column field in front of each source line, numbers
//! lines by their position in the report, and attaches `branch N taken = M` trailers to the
//! most recent counted line. Both are parsed into the same [`GcovReport`].
//!
//! Exclusion markers found in the source text suppress data while parsing: one marker set
//! removes all data of the marked lines, a second independent set removes only branch data.
//!
//! [`GcovReport`]: ./struct.GcovReport.html

use branch::{BranchRecord, BranchVector};
use config::Config;
use error::{ErrorKind, Result};
use utils::strip_cr;

use regex::Regex;

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Which of the two report grammars a report uses.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Grammar {
    /// Fixed 16-column counts, ordinal line numbers, `taken = N` branch trailers.
    Legacy,
    /// `count:line:source` rows with explicit block markers and function rows.
    Modern,
}

/// Call count of one function as reported by the tool.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FunctionCoverage {
    pub name: String,
    pub count: u64,
}

/// The parsed content of one per-source report.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct GcovReport {
    /// Source path announced by the report itself, if any.
    pub source_path: Option<String>,
    /// Execution count per instrumented, non-excluded line.
    pub lines: BTreeMap<u32, u64>,
    /// Instrumented lines suppressed by an exclusion marker.
    pub excluded_lines: BTreeSet<u32>,
    /// Branch outcomes, in report order.
    pub branches: BranchVector,
    /// Function call counts, in report order.
    pub functions: Vec<FunctionCoverage>,
    /// The source text embedded in the report, one entry per source line.
    pub source_text: Vec<String>,
}

impl GcovReport {
    /// Reads and parses the report at `path`.
    ///
    /// An empty file is an error; the caller decides whether it aborts the run.
    pub fn open<P: AsRef<Path>>(path: P, grammar: Grammar, config: &Config) -> Result<GcovReport> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            bail!(ErrorKind::EmptyReport(path.to_owned()));
        }
        parse_report(BufReader::new(file), grammar, config)
    }
}

/// Parses one report from a buffered reader.
///
/// Rows of an unrecognized shape are skipped without an error. An exclusion region left open at
/// the end of the report is a warning, not an error.
pub fn parse_report<R: BufRead>(reader: R, grammar: Grammar, config: &Config) -> Result<GcovReport> {
    let mut parser = Parser::new(config);
    for row in reader.lines() {
        let row = row?;
        let row = strip_cr(&row);
        match grammar {
            Grammar::Modern => parser.modern_row(row),
            Grammar::Legacy => parser.legacy_row(row),
        }
    }
    if parser.excluding || parser.excluding_branches {
        warn!("exclusion region still open at end of report");
    }
    Ok(parser.report)
}

/// Interprets one count field.
///
/// Returns `None` for a malformed field (the row is skipped), `Some(None)` for an
/// uninstrumented line, and `Some(Some(n))` for a counted line. `#`- and `=`-prefixed fields
/// (`#####`, `=====`, the legacy `######`) normalize to a count of zero.
fn parse_count(field: &str) -> Option<Option<u64>> {
    let field = field.trim().trim_end_matches('*');
    if field == "-" {
        Some(None)
    } else if field.starts_with('#') || field.starts_with('=') {
        Some(Some(0))
    } else {
        field.parse().ok().map(Some)
    }
}

struct Patterns {
    function: Regex,
    branch_taken: Regex,
    branch_never: Regex,
    block: Regex,
}

impl Default for Patterns {
    fn default() -> Patterns {
        Patterns {
            function: Regex::new(r"^function (.+) called (\d+)").unwrap(),
            branch_taken: Regex::new(r"^branch\s+(\d+)\s+taken\s*=?\s*(\d+)").unwrap(),
            branch_never: Regex::new(r"^branch\s+(\d+)\s+never executed").unwrap(),
            block: Regex::new(r"^\s*(\d+)-block\s+(\d+)").unwrap(),
        }
    }
}

struct Parser<'c> {
    config: &'c Config,
    patterns: Patterns,
    report: GcovReport,
    excluding: bool,
    excluding_branches: bool,
    /// Branch context: the most recent source line, 0 before the first one.
    line: u32,
    block: i32,
    line_branches_excluded: bool,
    /// Lines whose branch data is suppressed, for block markers that change the context line.
    branch_excluded: BTreeSet<u32>,
    /// Ordinal line counter of the legacy grammar.
    ordinal: u32,
}

impl<'c> Parser<'c> {
    fn new(config: &'c Config) -> Parser<'c> {
        Parser {
            config,
            patterns: Patterns::default(),
            report: GcovReport::default(),
            excluding: false,
            excluding_branches: false,
            line: 0,
            block: -1,
            line_branches_excluded: false,
            branch_excluded: BTreeSet::new(),
            ordinal: 0,
        }
    }

    fn modern_row(&mut self, row: &str) {
        if let Some(caps) = self.patterns.function.captures(row) {
            if let Ok(count) = caps[2].parse() {
                self.report.functions.push(FunctionCoverage {
                    name: caps[1].to_owned(),
                    count,
                });
            }
            return;
        }
        if self.branch_row(row) {
            return;
        }

        let mut fields = row.splitn(2, ':');
        let count_field = fields.next().unwrap_or("");
        let rest = match fields.next() {
            Some(rest) => rest,
            None => return,
        };
        let mut fields = rest.splitn(2, ':');
        let line_field = fields.next().unwrap_or("");
        match fields.next() {
            Some(source) => {
                let lineno = match line_field.trim().parse::<u32>() {
                    Ok(lineno) => lineno,
                    Err(_) => return,
                };
                if lineno == 0 {
                    if source.starts_with("Source:") {
                        self.report.source_path = Some(source["Source:".len()..].to_owned());
                    }
                    return;
                }
                let count = match parse_count(count_field) {
                    Some(count) => count,
                    None => return,
                };
                self.source_line(lineno, count, source);
            },
            None => {
                // a `line-block N` context marker for the branch rows that follow.
                if let Some(caps) = self.patterns.block.captures(rest) {
                    if let (Ok(line), Ok(block)) = (caps[1].parse(), caps[2].parse()) {
                        self.line = line;
                        self.block = block;
                        self.line_branches_excluded = self.branch_excluded.contains(&line);
                    }
                }
            },
        }
    }

    fn legacy_row(&mut self, row: &str) {
        if self.branch_row(row) || row.starts_with("call") {
            return;
        }
        if row.starts_with("\t\t") {
            self.ordinal += 1;
            let line = self.ordinal;
            self.source_line(line, None, &row[2..]);
            return;
        }

        let (field, source) = match (row.get(..16), row.get(16..)) {
            (Some(field), Some(source)) => (field, source),
            _ => (row, ""),
        };
        let count = match field.split_whitespace().next().and_then(parse_count) {
            Some(count) => count,
            None => return,
        };
        self.ordinal += 1;
        let line = self.ordinal;
        self.source_line(line, count, source);
    }

    /// Handles `branch N taken …` and `branch N never executed` rows in either grammar.
    fn branch_row(&mut self, row: &str) -> bool {
        let (index, taken) = if let Some(caps) = self.patterns.branch_taken.captures(row) {
            match (caps[1].parse(), caps[2].parse()) {
                (Ok(index), Ok(taken)) => (index, Some(taken)),
                _ => return true,
            }
        } else if let Some(caps) = self.patterns.branch_never.captures(row) {
            match caps[1].parse() {
                Ok(index) => (index, None),
                Err(_) => return true,
            }
        } else {
            return false;
        };

        if self.line != 0 && !self.line_branches_excluded {
            self.report.branches.push(BranchRecord {
                line: self.line,
                block: self.block,
                branch: index,
                taken,
            });
        }
        true
    }

    fn source_line(&mut self, lineno: u32, count: Option<u64>, source: &str) {
        while self.report.source_text.len() + 1 < lineno as usize {
            self.report.source_text.push(String::new());
        }
        if self.report.source_text.len() < lineno as usize {
            self.report.source_text.push(source.to_owned());
        }

        // both the start and the stop marker lines belong to the region they delimit.
        let markers = &self.config.markers;
        if markers.start.is_match(source) {
            self.excluding = true;
        }
        if markers.br_start.is_match(source) {
            self.excluding_branches = true;
        }
        let excluded = self.excluding || markers.line.is_match(source);
        let branches_excluded =
            excluded || self.excluding_branches || markers.br_line.is_match(source);
        if markers.stop.is_match(source) {
            self.excluding = false;
        }
        if markers.br_stop.is_match(source) {
            self.excluding_branches = false;
        }

        self.line = lineno;
        self.block = -1;
        self.line_branches_excluded = branches_excluded;
        if branches_excluded {
            self.branch_excluded.insert(lineno);
        }

        if let Some(count) = count {
            if excluded {
                self.report.excluded_lines.insert(lineno);
                self.report.lines.remove(&lineno);
            } else if !self.report.excluded_lines.contains(&lineno) {
                // templates make a line appear several times; keep the largest count.
                let entry = self.report.lines.entry(lineno).or_insert(0);
                if count > *entry {
                    *entry = count;
                }
            }
        }
    }
}
