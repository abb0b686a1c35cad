//! Path manipulation utilities for tsbuild
//!
//! Project identity is a lexically normalized absolute path. Symlinks are not
//! resolved: two spellings of the same path that normalize identically name
//! the same project.

use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::Result;

/// Source extensions recognised as compiler inputs, longest first so that
/// `.d.ts` wins over `.ts`.
pub const SOURCE_EXTENSIONS: &[&str] = &[".d.ts", ".tsx", ".ts"];

/// Lexically normalize a path, removing `.` components and folding `..`
/// into the preceding component.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                match out.components().next_back() {
                    Some(Component::Normal(_)) => {
                        out.pop();
                    }
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                    _ => out.push(".."),
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Make `path` absolute against `base` and normalize it.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Whether `path` lies inside (or equals) `dir`, compared component-wise.
pub fn is_within(dir: &Path, path: &Path) -> bool {
    path.starts_with(dir)
}

/// Whether the file name carries a recognised source extension.
pub fn is_source_file(path: &Path) -> bool {
    source_extension(path).is_some()
}

/// Whether the file is an ambient declaration input (`.d.ts`).
pub fn is_declaration_file(path: &Path) -> bool {
    source_extension(path) == Some(".d.ts")
}

/// Return the recognised source extension of `path`, if any.
pub fn source_extension(path: &Path) -> Option<&'static str> {
    let name = path.file_name()?.to_str()?;
    SOURCE_EXTENSIONS
        .iter()
        .copied()
        .find(|extension| name.len() > extension.len() && name.ends_with(extension))
}

/// Replace the recognised source extension of `path` with `replacement`.
///
/// Returns `None` for paths without a recognised source extension.
pub fn replace_source_extension(path: &Path, replacement: &str) -> Option<PathBuf> {
    let extension = source_extension(path)?;
    let name = path.file_name()?.to_str()?;
    let stem = &name[..name.len() - extension.len()];
    Some(path.with_file_name(format!("{stem}{replacement}")))
}

/// Deepest directory containing every path in `paths`.
pub fn common_ancestor<'a, I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut iter = paths.into_iter();
    let first = iter.next()?;
    let mut ancestor = first.parent().unwrap_or(first).to_path_buf();
    for path in iter {
        while !path.starts_with(&ancestor) {
            if !ancestor.pop() {
                return None;
            }
        }
    }
    Some(ancestor)
}

/// Compiled set of glob patterns matched against paths relative to a base
/// directory.
#[derive(Debug, Clone)]
pub struct GlobSet {
    patterns: Vec<Pattern>,
}

impl GlobSet {
    /// Compile patterns. A pattern naming a directory (no wildcard in its
    /// last component and no extension) also matches everything below it.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref().trim_start_matches("./");
            compiled.push(Pattern::new(pattern)?);
            if looks_like_directory(pattern) {
                compiled.push(Pattern::new(&format!(
                    "{}/**/*",
                    pattern.trim_end_matches('/')
                ))?);
            }
        }
        Ok(Self { patterns: compiled })
    }

    /// Match a relative path.
    pub fn matches(&self, relative: &Path) -> bool {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_path_with(relative, options))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn looks_like_directory(pattern: &str) -> bool {
    let last = pattern
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(pattern);
    !last.contains('*') && !last.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_removes_dots() {
        assert_eq!(
            normalize(Path::new("/repo/./zoo/../core/tsconfig.json")),
            PathBuf::from("/repo/core/tsconfig.json")
        );
    }

    #[test]
    fn test_normalize_parent_at_root() {
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn test_absolutize_relative() {
        assert_eq!(
            absolutize(Path::new("/repo/zoo"), Path::new("../core")),
            PathBuf::from("/repo/core")
        );
    }

    #[test]
    fn test_source_extension() {
        assert_eq!(source_extension(Path::new("a/b.d.ts")), Some(".d.ts"));
        assert_eq!(source_extension(Path::new("a/b.ts")), Some(".ts"));
        assert_eq!(source_extension(Path::new("a/b.tsx")), Some(".tsx"));
        assert_eq!(source_extension(Path::new("a/b.js")), None);
        assert_eq!(source_extension(Path::new(".ts")), None);
        assert!(is_declaration_file(Path::new("types.d.ts")));
        assert!(!is_declaration_file(Path::new("index.ts")));
    }

    #[test]
    fn test_replace_source_extension() {
        assert_eq!(
            replace_source_extension(Path::new("src/index.ts"), ".d.ts"),
            Some(PathBuf::from("src/index.d.ts"))
        );
        assert_eq!(
            replace_source_extension(Path::new("src/view.tsx"), ".js"),
            Some(PathBuf::from("src/view.js"))
        );
        assert_eq!(replace_source_extension(Path::new("README.md"), ".js"), None);
    }

    #[test]
    fn test_common_ancestor() {
        let paths = [
            PathBuf::from("/repo/core/src/a.ts"),
            PathBuf::from("/repo/core/src/nested/b.ts"),
        ];
        assert_eq!(
            common_ancestor(paths.iter().map(PathBuf::as_path)),
            Some(PathBuf::from("/repo/core/src"))
        );
        assert_eq!(common_ancestor(std::iter::empty::<&Path>()), None);
    }

    #[test]
    fn test_glob_set_matches() {
        let globs = GlobSet::new(&["src/**/*", "lib"]).unwrap();
        assert!(globs.matches(Path::new("src/index.ts")));
        assert!(globs.matches(Path::new("src/deep/nested.ts")));
        assert!(globs.matches(Path::new("lib/util.ts")));
        assert!(!globs.matches(Path::new("test/index.ts")));
    }

    #[test]
    fn test_glob_set_star_does_not_cross_directories() {
        let globs = GlobSet::new(&["*.ts"]).unwrap();
        assert!(globs.matches(Path::new("index.ts")));
        assert!(!globs.matches(Path::new("src/index.ts")));
    }
}
