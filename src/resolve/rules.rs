//! Glob rule sets rooted at a directory
//!
//! Used for `.formatignore` files, `[[overrides]]` file globs and
//! `.editorconfig` section headers. Matching follows gitignore semantics:
//! a pattern without a slash matches a file name at any depth below the root,
//! a pattern with a slash is anchored to the root.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};

/// A compiled set of glob patterns
#[derive(Debug, Clone)]
pub struct RuleSet {
    root: PathBuf,
    patterns: Vec<String>,
    matcher: Gitignore,
}

impl RuleSet {
    /// Compile `patterns` relative to `root`
    pub fn from_patterns<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Self, ignore::Error> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in patterns {
            builder.add_line(None, pattern.as_ref())?;
        }

        Ok(Self {
            root: root.to_path_buf(),
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            matcher: builder.build()?,
        })
    }

    /// Compile the contents of an ignore file located at `path`
    pub fn from_ignore_file(path: &Path, contents: &str) -> Result<Self, ignore::Error> {
        let root = path.parent().unwrap_or(path);
        let mut builder = GitignoreBuilder::new(root);
        let mut patterns = Vec::new();

        for line in contents.lines() {
            builder.add_line(Some(path.to_path_buf()), line)?;
            patterns.push(line.to_string());
        }

        Ok(Self {
            root: root.to_path_buf(),
            patterns,
            matcher: builder.build()?,
        })
    }

    /// Directory the patterns are relative to
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Does a pattern select this file itself
    pub fn matches(&self, path: &Path) -> bool {
        path.starts_with(&self.root) && self.matcher.matched(path, false).is_ignore()
    }

    /// Does a pattern select this file or any directory containing it
    pub fn excludes(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
            && self
                .matcher
                .matched_path_or_any_parents(path, false)
                .is_ignore()
    }
}

impl PartialEq for RuleSet {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.patterns == other.patterns
    }
}

impl Eq for RuleSet {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_pattern_matches_at_any_depth() {
        let rules = RuleSet::from_patterns(Path::new("/proj"), &["*.json"]).unwrap();

        assert!(rules.matches(Path::new("/proj/a.json")));
        assert!(rules.matches(Path::new("/proj/deep/nested/b.json")));
        assert!(!rules.matches(Path::new("/proj/a.js")));
    }

    #[test]
    fn slash_pattern_is_anchored() {
        let rules = RuleSet::from_patterns(Path::new("/proj"), &["src/*.ts"]).unwrap();

        assert!(rules.matches(Path::new("/proj/src/a.ts")));
        assert!(!rules.matches(Path::new("/proj/lib/src/a.ts")));
    }

    #[test]
    fn paths_outside_root_never_match() {
        let rules = RuleSet::from_patterns(Path::new("/proj"), &["*"]).unwrap();

        assert!(!rules.matches(Path::new("/other/a.js")));
        assert!(!rules.excludes(Path::new("/other/a.js")));
    }

    #[test]
    fn ignore_file_excludes_directory_contents() {
        let rules = RuleSet::from_ignore_file(
            Path::new("/proj/.formatignore"),
            "# generated\nbuild/\n!keep.js\n",
        )
        .unwrap();

        assert!(rules.excludes(Path::new("/proj/build/out.js")));
        assert!(!rules.excludes(Path::new("/proj/src/main.js")));
    }

    #[test]
    fn equality_ignores_compiled_state() {
        let a = RuleSet::from_patterns(Path::new("/proj"), &["*.md"]).unwrap();
        let b = RuleSet::from_patterns(Path::new("/proj"), &["*.md"]).unwrap();
        let c = RuleSet::from_patterns(Path::new("/proj"), &["*.txt"]).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
