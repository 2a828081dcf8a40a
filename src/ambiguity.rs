//! Disambiguation of reports whose filename matches several recorded source paths.
//!
//! Compiled units regularly contain distinct files with the same basename (think `util.c` in
//! two subdirectories). The report for either of them carries only the bare filename, but it
//! also embeds the source text it was generated from, so the right path can be picked by
//! comparing that text against each candidate file on disk.

use error::{ErrorKind, Result};
use utils::strip_cr;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Checks whether the file at `path` matches the source text embedded in a report.
///
/// Lines are compared one-to-one, ignoring line-ending differences. An empty embedded line is
/// a placeholder for a line the report did not reproduce and matches anything.
fn matches(path: &Path, source_text: &[String]) -> io::Result<bool> {
    let reader = BufReader::new(File::open(path)?);
    let mut expected = source_text.iter();
    for line in reader.lines() {
        let line = line?;
        match expected.next() {
            Some(want) if want.is_empty() || strip_cr(&line) == want => {},
            Some(_) => return Ok(false),
            None => return Ok(true),
        }
    }
    Ok(expected.next().is_none())
}

/// Picks the candidate path whose content matches the report's embedded source text.
///
/// The first fully matching candidate wins. An unreadable candidate merely fails to match;
/// no candidate matching at all is an error the caller may ignore via the source category.
pub fn resolve<'a, P: AsRef<Path>>(
    filename: &str,
    candidates: &'a [P],
    source_text: &[String],
) -> Result<&'a Path> {
    for candidate in candidates {
        let candidate = candidate.as_ref();
        match matches(candidate, source_text) {
            Ok(true) => {
                debug!("report for {:?} matched {:?}", filename, candidate);
                return Ok(candidate);
            },
            Ok(false) => trace!("report for {:?} does not match {:?}", filename, candidate),
            Err(e) => warn!("cannot read candidate {:?}: {}", candidate, e),
        }
    }
    Err(ErrorKind::UnresolvedAmbiguity(filename.to_owned()).into())
}
