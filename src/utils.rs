//! Additional helpers for libstd types.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// Restores the working directory when dropped.
///
/// The external tool writes its reports relative to the working directory, so processing
/// changes directory per data file; the guard guarantees the original directory is restored on
/// every exit path, including unwinding.
#[derive(Debug)]
pub struct CwdGuard {
    original: PathBuf,
}

impl CwdGuard {
    /// Changes into `dir`, remembering the current directory.
    pub fn change_to<P: AsRef<Path>>(dir: P) -> io::Result<CwdGuard> {
        let original = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(CwdGuard { original })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.original) {
            warn!("cannot restore working directory {:?}: {}", self.original, e);
        }
    }
}

/// Strips one trailing carriage return, so DOS and Unix line endings compare equal.
pub fn strip_cr(line: &str) -> &str {
    if line.ends_with('\r') {
        &line[..line.len() - 1]
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_cr_only_touches_the_end() {
        assert_eq!(strip_cr("a\r\nb\r"), "a\r\nb");
        assert_eq!(strip_cr("plain"), "plain");
        assert_eq!(strip_cr(""), "");
    }
}
