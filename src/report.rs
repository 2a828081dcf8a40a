//! Assembly and serialization of the final per-file coverage records.
//!
//! One [`CoverageRecord`] merges the graph-derived views (which lines are instrumented, which
//! functions live in the file) with one parsed textual report (how often each line and branch
//! ran). Records are serialized immediately by a [`RecordWriter`]; nothing is buffered across
//! files.
//!
//! [`CoverageRecord`]: ./struct.CoverageRecord.html
//! [`RecordWriter`]: ./struct.RecordWriter.html

use branch::BranchVector;
use config::Config;
use error::{ErrorKind, Result};
use gcov::GcovReport;
use intern::{Interner, Symbol};
use utils::strip_cr;

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// One function's entry in a record.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FunctionEntry {
    pub name: String,
    /// First line attributed to the function.
    pub start_line: u32,
    /// Call count; absent when the report supplied none and derivation is off.
    pub count: Option<u64>,
}

/// One instrumented line's entry in a record.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LineEntry {
    pub line: u32,
    pub count: u64,
    /// Content checksum of the source line, when requested.
    pub checksum: Option<String>,
}

/// The complete coverage data of one source file, ready for serialization.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CoverageRecord {
    /// Absolute, resolved source path.
    pub path: PathBuf,
    /// Function entries, ascending by start line.
    pub functions: Vec<FunctionEntry>,
    /// Branch outcomes.
    pub branches: BranchVector,
    /// Line entries, ascending by line number.
    pub lines: Vec<LineEntry>,
}

/// Reads the source file for per-line checksums; a missing file is only an error here, on the
/// checksum path.
fn read_source_lines(path: &Path) -> Result<Vec<String>> {
    let open = || -> io::Result<Vec<String>> {
        let reader = BufReader::new(File::open(path)?);
        let mut lines = Vec::new();
        for line in reader.lines() {
            lines.push(strip_cr(&line?).to_owned());
        }
        Ok(lines)
    };
    open().map_err(|e| {
        warn!("cannot read source {:?}: {}", path, e);
        ErrorKind::MissingSource(path.to_owned()).into()
    })
}

impl CoverageRecord {
    /// Merges the graph views of one source file with its parsed report.
    ///
    /// The line entries are the union of the instrumented lines (defaulting to count 0) and the
    /// reported lines, minus everything an exclusion marker suppressed. Function counts come
    /// from the report, or, in derive mode, from the lowest nonzero count among the function's
    /// own lines. Returns `None` when no data at all survives.
    pub fn assemble(
        path: &Path,
        functions: &HashMap<Symbol, Vec<u32>>,
        instrumented: Option<&[u32]>,
        report: &GcovReport,
        interner: &Interner,
        config: &Config,
    ) -> Result<Option<CoverageRecord>> {
        let mut counts: BTreeMap<u32, u64> = report.lines.clone();
        if let Some(instrumented) = instrumented {
            for &line in instrumented {
                if !report.excluded_lines.contains(&line) {
                    counts.entry(line).or_insert(0);
                }
            }
        }

        let mut entries = Vec::with_capacity(functions.len());
        for (&name, line_list) in functions {
            let start_line = match line_list.first() {
                Some(&line) => line,
                None => continue,
            };
            let name = &interner[name];
            let count = if config.derive_function_data {
                let mut derived = 0;
                for line in line_list {
                    if let Some(&count) = counts.get(line) {
                        if count > 0 && (derived == 0 || count < derived) {
                            derived = count;
                        }
                    }
                }
                Some(derived)
            } else {
                report.functions.iter().find(|f| f.name == *name).map(|f| f.count)
            };
            entries.push(FunctionEntry { name: name.to_owned(), start_line, count });
        }
        entries.sort_by(|a, b| (a.start_line, &a.name).cmp(&(b.start_line, &b.name)));

        if counts.is_empty() && entries.is_empty() && report.branches.is_empty() {
            return Ok(None);
        }

        let source = if config.checksum {
            Some(read_source_lines(path)?)
        } else {
            None
        };
        let lines = counts
            .into_iter()
            .map(|(line, count)| {
                let checksum = source.as_ref().map(|source| {
                    let content = source
                        .get(line.saturating_sub(1) as usize)
                        .map(String::as_str)
                        .unwrap_or("");
                    format!("{:x}", ::md5::compute(content))
                });
                LineEntry { line, count, checksum }
            })
            .collect();

        Ok(Some(CoverageRecord {
            path: path.to_owned(),
            functions: entries,
            branches: report.branches.clone(),
            lines,
        }))
    }
}

/// Streams serialized records into a writer, one `TN:…end_of_record` block per record.
#[derive(Debug)]
pub struct RecordWriter<W: Write> {
    writer: W,
    test_name: String,
}

impl<W: Write> RecordWriter<W> {
    /// Creates a writer emitting records under the configured test name.
    pub fn new(writer: W, config: &Config) -> RecordWriter<W> {
        RecordWriter {
            writer,
            test_name: config.test_name.clone(),
        }
    }

    /// Serializes one record.
    ///
    /// Function and branch summary lines are omitted entirely when the record holds no data of
    /// that kind; the line summary is always present.
    pub fn write_record(&mut self, record: &CoverageRecord) -> io::Result<()> {
        let w = &mut self.writer;
        writeln!(w, "TN:{}", self.test_name)?;
        writeln!(w, "SF:{}", record.path.display())?;

        for function in &record.functions {
            writeln!(w, "FN:{},{}", function.start_line, function.name)?;
        }
        let mut functions_hit = 0;
        for function in &record.functions {
            if let Some(count) = function.count {
                writeln!(w, "FNDA:{},{}", count, function.name)?;
                if count > 0 {
                    functions_hit += 1;
                }
            }
        }
        if !record.functions.is_empty() {
            writeln!(w, "FNF:{}", record.functions.len())?;
            writeln!(w, "FNH:{}", functions_hit)?;
        }

        for branch in record.branches.iter() {
            match branch.taken {
                Some(taken) => writeln!(
                    w,
                    "BRDA:{},{},{},{}",
                    branch.line, branch.block, branch.branch, taken
                )?,
                None => writeln!(w, "BRDA:{},{},{},-", branch.line, branch.block, branch.branch)?,
            }
        }
        if !record.branches.is_empty() {
            writeln!(w, "BRF:{}", record.branches.len())?;
            writeln!(w, "BRH:{}", record.branches.hit_count())?;
        }

        let mut lines_hit = 0;
        for line in &record.lines {
            match line.checksum {
                Some(ref checksum) => writeln!(w, "DA:{},{},{}", line.line, line.count, checksum)?,
                None => writeln!(w, "DA:{},{}", line.line, line.count)?,
            }
            if line.count > 0 {
                lines_hit += 1;
            }
        }
        writeln!(w, "LF:{}", record.lines.len())?;
        writeln!(w, "LH:{}", lines_hit)?;
        writeln!(w, "end_of_record")?;
        Ok(())
    }

    /// Unwraps the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use branch::BranchRecord;
    use gcov::FunctionCoverage;

    fn simple_inputs(interner: &mut Interner) -> (HashMap<Symbol, Vec<u32>>, Vec<u32>, GcovReport) {
        let foo = interner.intern("foo");
        let mut functions = HashMap::new();
        functions.insert(foo, vec![10, 11, 12]);

        let mut report = GcovReport::default();
        report.lines.insert(10, 5);
        report.lines.insert(11, 0);
        report.lines.insert(12, 3);
        report.functions.push(FunctionCoverage { name: "foo".to_owned(), count: 5 });

        (functions, vec![10, 11, 12], report)
    }

    fn serialize(record: &CoverageRecord, config: &Config) -> String {
        let mut writer = RecordWriter::new(Vec::new(), config);
        writer.write_record(record).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn emits_report_supplied_function_counts() {
        let mut interner = Interner::new();
        let config = Config::default();
        let (functions, instrumented, report) = simple_inputs(&mut interner);
        let record = CoverageRecord::assemble(
            Path::new("/src/a.c"),
            &functions,
            Some(&instrumented),
            &report,
            &interner,
            &config,
        ).unwrap()
            .unwrap();

        let text = serialize(&record, &config);
        let expected = "TN:\n\
                        SF:/src/a.c\n\
                        FN:10,foo\n\
                        FNDA:5,foo\n\
                        FNF:1\n\
                        FNH:1\n\
                        DA:10,5\n\
                        DA:11,0\n\
                        DA:12,3\n\
                        LF:3\n\
                        LH:2\n\
                        end_of_record\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn derive_mode_uses_the_lowest_nonzero_line_count() {
        let mut interner = Interner::new();
        let mut config = Config::default();
        config.derive_function_data = true;
        let (functions, instrumented, report) = simple_inputs(&mut interner);
        let record = CoverageRecord::assemble(
            Path::new("/src/a.c"),
            &functions,
            Some(&instrumented),
            &report,
            &interner,
            &config,
        ).unwrap()
            .unwrap();

        let text = serialize(&record, &config);
        assert!(text.contains("FNDA:3,foo\n"));
    }

    #[test]
    fn derive_mode_reports_zero_for_unexecuted_functions() {
        let mut interner = Interner::new();
        let mut config = Config::default();
        config.derive_function_data = true;
        let (functions, instrumented, mut report) = simple_inputs(&mut interner);
        report.lines.insert(10, 0);
        report.lines.insert(12, 0);
        let record = CoverageRecord::assemble(
            Path::new("/src/a.c"),
            &functions,
            Some(&instrumented),
            &report,
            &interner,
            &config,
        ).unwrap()
            .unwrap();

        let text = serialize(&record, &config);
        assert!(text.contains("FNDA:0,foo\n"));
        assert!(text.contains("FNH:0\n"));
    }

    #[test]
    fn branch_summary_is_omitted_without_branches() {
        let mut interner = Interner::new();
        let config = Config::default();
        let (functions, instrumented, report) = simple_inputs(&mut interner);
        let record = CoverageRecord::assemble(
            Path::new("/src/a.c"),
            &functions,
            Some(&instrumented),
            &report,
            &interner,
            &config,
        ).unwrap()
            .unwrap();

        let text = serialize(&record, &config);
        assert!(!text.contains("BRF:"));
        assert!(!text.contains("BRH:"));
    }

    #[test]
    fn never_executed_branches_emit_a_dash() {
        let mut interner = Interner::new();
        let config = Config::default();
        let (functions, instrumented, mut report) = simple_inputs(&mut interner);
        report.branches.push(BranchRecord { line: 10, block: 0, branch: 0, taken: Some(5) });
        report.branches.push(BranchRecord { line: 10, block: 0, branch: 1, taken: None });
        let record = CoverageRecord::assemble(
            Path::new("/src/a.c"),
            &functions,
            Some(&instrumented),
            &report,
            &interner,
            &config,
        ).unwrap()
            .unwrap();

        let text = serialize(&record, &config);
        assert!(text.contains("BRDA:10,0,0,5\n"));
        assert!(text.contains("BRDA:10,0,1,-\n"));
        assert!(text.contains("BRF:2\n"));
        assert!(text.contains("BRH:1\n"));
    }

    #[test]
    fn excluded_instrumented_lines_stay_out_of_the_union() {
        let mut interner = Interner::new();
        let config = Config::default();
        let (functions, instrumented, mut report) = simple_inputs(&mut interner);
        report.lines.remove(&11);
        report.excluded_lines.insert(11);
        let record = CoverageRecord::assemble(
            Path::new("/src/a.c"),
            &functions,
            Some(&instrumented),
            &report,
            &interner,
            &config,
        ).unwrap()
            .unwrap();

        let lines: Vec<_> = record.lines.iter().map(|entry| entry.line).collect();
        assert_eq!(lines, vec![10, 12]);
    }

    #[test]
    fn fully_empty_inputs_yield_no_record() {
        let interner = Interner::new();
        let config = Config::default();
        let record = CoverageRecord::assemble(
            Path::new("/src/a.c"),
            &HashMap::new(),
            None,
            &GcovReport::default(),
            &interner,
            &config,
        ).unwrap();
        assert!(record.is_none());
    }
}
