//! Canonicalization of source paths recorded in graph and coverage data.
//!
//! Graph files record filenames relative to the compilation directory, which is rarely the
//! directory the reports are processed in. [`find_base`] recovers a working base directory by
//! walking up from a candidate and counting how many recorded files exist on disk; the
//! resolved paths are then normalized textually (no filesystem access) and optionally rewritten
//! with a user-supplied pattern.
//!
//! [`find_base`]: ./fn.find_base.html

use config::SourceRewrite;

use std::path::{Component, Path, PathBuf};

/// Resolves `.`, `..` and duplicate separators without touching the filesystem.
///
/// A `..` component at the root is dropped; leading `..` components of a relative path are
/// kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                },
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {},
                _ => out.push(".."),
            },
            component => out.push(component.as_os_str()),
        }
    }
    out
}

/// Counts how many of the relative filenames do not exist under `dir`.
fn count_misses(dir: &Path, relative: &[PathBuf]) -> usize {
    relative.iter().filter(|rel| !dir.join(rel).exists()).count()
}

/// Finds the base directory that resolves the most of the given relative filenames.
///
/// Starting from `start`, each parent directory up to the filesystem root is considered; the
/// first directory resolving every filename wins, otherwise the directory with the fewest
/// misses seen first.
pub fn find_base<P: AsRef<Path>>(start: P, relative: &[PathBuf]) -> PathBuf {
    let start = normalize(start.as_ref());
    let mut best_misses = count_misses(&start, relative);
    if best_misses == 0 {
        return start;
    }
    let mut best = start.clone();
    let mut dir = start;
    while dir.pop() {
        let misses = count_misses(&dir, relative);
        trace!("base candidate {:?}: {} misses", dir, misses);
        if misses == 0 {
            return dir;
        }
        if misses < best_misses {
            best_misses = misses;
            best = dir.clone();
        }
    }
    debug!("no zero-miss base directory, using {:?} ({} misses)", best, best_misses);
    best
}

/// Resolves recorded filenames into absolute, normalized, optionally rewritten paths.
#[derive(Debug)]
pub struct PathResolver<'c> {
    base: PathBuf,
    rewrite: Option<&'c SourceRewrite>,
}

impl<'c> PathResolver<'c> {
    /// Creates a resolver rooted at `base`.
    pub fn new(base: PathBuf, rewrite: Option<&'c SourceRewrite>) -> PathResolver<'c> {
        PathResolver { base, rewrite }
    }

    /// Resolves one recorded filename.
    pub fn resolve(&self, filename: &str) -> PathBuf {
        let path = Path::new(filename);
        let resolved = if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.base.join(path))
        };
        match self.rewrite {
            Some(rewrite) => PathBuf::from(rewrite.apply(&resolved.to_string_lossy())),
            None => resolved,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate tempdir;

    use self::tempdir::TempDir;
    use super::*;
    use regex::Regex;

    use std::fs::{File, create_dir_all};

    #[test]
    fn normalize_resolves_dots_textually() {
        assert_eq!(normalize(Path::new("/a/./b//c/../d")), PathBuf::from("/a/b/d"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("../a/../../b")), PathBuf::from("../../b"));
        assert_eq!(normalize(Path::new("a/b/../../c")), PathBuf::from("c"));
    }

    #[test]
    fn find_base_walks_up_to_the_true_base() {
        let tmp = TempDir::new("find_base").unwrap();
        let base = tmp.path();
        create_dir_all(base.join("src")).unwrap();
        create_dir_all(base.join("obj/debug")).unwrap();
        File::create(base.join("src/a.c")).unwrap();
        File::create(base.join("src/b.c")).unwrap();

        // candidate two levels below the true base.
        let relative = vec![PathBuf::from("src/a.c"), PathBuf::from("src/b.c")];
        assert_eq!(find_base(base.join("obj/debug"), &relative), base);
    }

    #[test]
    fn find_base_keeps_the_fewest_miss_directory() {
        let tmp = TempDir::new("find_base_partial").unwrap();
        let base = tmp.path();
        create_dir_all(base.join("obj")).unwrap();
        File::create(base.join("a.c")).unwrap();

        // "a.c" resolves at the base, "gone.c" nowhere; the base still wins with one miss.
        let relative = vec![PathBuf::from("a.c"), PathBuf::from("gone.c")];
        assert_eq!(find_base(base.join("obj"), &relative), base);
    }

    #[test]
    fn resolver_joins_normalizes_and_rewrites() {
        let resolver = PathResolver::new(PathBuf::from("/work/build"), None);
        assert_eq!(resolver.resolve("../src/a.c"), PathBuf::from("/work/src/a.c"));
        assert_eq!(resolver.resolve("/abs/./b.c"), PathBuf::from("/abs/b.c"));

        let rewrite = SourceRewrite {
            pattern: Regex::new(r"^/work/").unwrap(),
            replacement: "/checkout/".to_owned(),
        };
        let resolver = PathResolver::new(PathBuf::from("/work/build"), Some(&rewrite));
        assert_eq!(resolver.resolve("../src/a.c"), PathBuf::from("/checkout/src/a.c"));
    }
}
