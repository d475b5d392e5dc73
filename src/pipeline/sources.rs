// src/pipeline/sources.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobMatcher};
use tracing::warn;
use walkdir::WalkDir;

use crate::watch::path_utils::relative_str;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// A source glob such as `src/*.elm`.
///
/// The *base* is the leading run of literal components (`src`). Outputs keep
/// the path of each match relative to the base, so `src/Pages/Home.elm`
/// compiles to `<dest>/Pages/Home.js`.
#[derive(Clone)]
pub struct SourceSet {
    pattern: String,
    base: PathBuf,
    /// Levels below the base a match can sit at; `None` with `**`.
    max_depth: Option<usize>,
    matcher: GlobMatcher,
}

impl fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSet")
            .field("pattern", &self.pattern)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

/// One file matched by a [`SourceSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path of the source.
    pub path: PathBuf,
    /// Path relative to the set's base directory.
    pub rel: PathBuf,
}

impl SourceSet {
    pub fn parse(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim().trim_start_matches("./").to_string();
        anyhow::ensure!(
            !Path::new(&pattern).is_absolute(),
            "glob must be relative to the project root: {pattern}"
        );
        let matcher = compile_glob(&pattern)?.compile_matcher();
        let base = glob_base(&pattern);
        let max_depth = (!pattern.contains("**")).then(|| {
            let depth = pattern.split('/').filter(|c| !c.is_empty()).count();
            depth.saturating_sub(base.components().count())
        });
        Ok(Self {
            pattern,
            base,
            max_depth,
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `rel_path` is relative to the project root, with `/` separators.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }

    /// All files under `root` matching the glob, sorted by path.
    ///
    /// The `skip` directory (normally the destination) is never descended
    /// into. A missing base directory yields no files. Unreadable entries
    /// are logged and skipped.
    pub fn expand(&self, root: &Path, skip: Option<&Path>) -> Result<Vec<SourceFile>> {
        let base_dir = root.join(&self.base);
        if !base_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut walker = WalkDir::new(&base_dir).sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }
        let walker = walker
            .into_iter()
            .filter_entry(|entry| Some(entry.path()) != skip);

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(pattern = %self.pattern, error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(rel_to_root) = relative_str(root, entry.path()) else {
                continue;
            };
            if !self.matches(&rel_to_root) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&base_dir) else {
                continue;
            };
            files.push(SourceFile {
                path: entry.path().to_path_buf(),
                rel: rel.to_path_buf(),
            });
        }

        Ok(files)
    }
}

/// Compile a glob where `*` stays inside one path component.
pub fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

fn glob_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').collect();
    let literal = components
        .iter()
        .take_while(|c| !c.contains(GLOB_META))
        .count();

    // A glob without metacharacters names a single file; its base is the
    // parent directory.
    let take = if literal == components.len() {
        literal.saturating_sub(1)
    } else {
        literal
    };

    components[..take]
        .iter()
        .filter(|c| !c.is_empty())
        .collect::<PathBuf>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn base_is_leading_literal_components() {
        assert_eq!(SourceSet::parse("src/*.elm").unwrap().base(), Path::new("src"));
        assert_eq!(
            SourceSet::parse("./web/stc/**/*.{html,css}").unwrap().base(),
            Path::new("web/stc")
        );
        assert_eq!(SourceSet::parse("*.elm").unwrap().base(), Path::new(""));
        assert_eq!(SourceSet::parse("src/Main.elm").unwrap().base(), Path::new("src"));
    }

    #[test]
    fn walk_depth_follows_the_pattern() {
        assert_eq!(SourceSet::parse("*.elm").unwrap().max_depth, Some(1));
        assert_eq!(SourceSet::parse("src/*.elm").unwrap().max_depth, Some(1));
        assert_eq!(SourceSet::parse("src/Main.elm").unwrap().max_depth, Some(1));
        assert_eq!(SourceSet::parse("web/*/pages/*.elm").unwrap().max_depth, Some(3));
        assert_eq!(SourceSet::parse("src/**/*.elm").unwrap().max_depth, None);
    }

    #[test]
    fn absolute_globs_are_rejected() {
        let err = SourceSet::parse("/abs/src/*.elm").unwrap_err();
        assert!(err.to_string().contains("relative"), "{err}");
    }

    #[test]
    fn root_level_glob_does_not_descend() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("elm-stuff/0.19.1")).unwrap();
        fs::write(root.join("Main.elm"), "main").unwrap();
        fs::write(root.join("elm-stuff/0.19.1/Cached.elm"), "x").unwrap();

        let files = SourceSet::parse("*.elm").unwrap().expand(root, None).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel, PathBuf::from("Main.elm"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_does_not_abort_the_walk() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/locked")).unwrap();
        fs::write(root.join("src/Main.elm"), "main").unwrap();
        fs::set_permissions(root.join("src/locked"), fs::Permissions::from_mode(0o000)).unwrap();

        let files = SourceSet::parse("src/**/*.elm").unwrap().expand(root, None);
        fs::set_permissions(root.join("src/locked"), fs::Permissions::from_mode(0o755)).unwrap();

        let files = files.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel, PathBuf::from("Main.elm"));
    }

    #[test]
    fn star_does_not_cross_directories() {
        let set = SourceSet::parse("stc/*.{html,css}").unwrap();
        assert!(set.matches("stc/index.html"));
        assert!(set.matches("stc/style.css"));
        assert!(!set.matches("stc/nested/index.html"));
        assert!(!set.matches("stc/app.js"));
    }

    #[test]
    fn expand_returns_sorted_matches_relative_to_base() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/Pages")).unwrap();
        fs::write(root.join("src/Main.elm"), "main").unwrap();
        fs::write(root.join("src/Api.elm"), "api").unwrap();
        fs::write(root.join("src/Pages/Home.elm"), "home").unwrap();
        fs::write(root.join("src/notes.txt"), "x").unwrap();

        let set = SourceSet::parse("src/**/*.elm").unwrap();
        let files = set.expand(root, Some(&root.join("dist"))).unwrap();
        let rels: Vec<_> = files.iter().map(|f| f.rel.clone()).collect();

        assert_eq!(
            rels,
            vec![
                PathBuf::from("Api.elm"),
                PathBuf::from("Main.elm"),
                PathBuf::from("Pages/Home.elm"),
            ]
        );
        assert_eq!(files[0].path, root.join("src/Api.elm"));
    }

    #[test]
    fn missing_base_matches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let set = SourceSet::parse("stc/*.html").unwrap();
        assert!(set.expand(dir.path(), None).unwrap().is_empty());
    }

    #[test]
    fn destination_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("dist")).unwrap();
        fs::write(root.join("index.html"), "a").unwrap();
        fs::write(root.join("dist/index.html"), "b").unwrap();

        let set = SourceSet::parse("**/*.html").unwrap();
        let files = set.expand(root, Some(&root.join("dist"))).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel, PathBuf::from("index.html"));
    }
}
