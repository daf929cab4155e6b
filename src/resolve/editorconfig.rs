//! `.editorconfig` reader
//!
//! Only the properties that map onto formatter options are kept. The format
//! is lenient by convention, so lines that do not parse are skipped rather
//! than reported.

use super::options::{EndOfLine, PartialOptions};
use super::rules::RuleSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parsed `.editorconfig` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Where the file was read from
    pub path: PathBuf,

    /// `root = true` in the preamble: stop looking in parent directories
    pub root: bool,

    /// Sections in file order; later sections win
    pub sections: Vec<Section>,
}

/// One `[glob]` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub rules: RuleSet,
    pub options: PartialOptions,
}

#[derive(Default)]
struct RawSection {
    indent_style: Option<String>,
    indent_size: Option<String>,
    tab_width: Option<String>,
    max_line_length: Option<String>,
    end_of_line: Option<String>,
    quote_type: Option<String>,
}

impl RawSection {
    fn into_options(self) -> PartialOptions {
        let parse_num = |v: &Option<String>| v.as_deref().and_then(|v| v.parse::<u16>().ok());

        let use_tabs = match self.indent_style.as_deref() {
            Some("tab") => Some(true),
            Some("space") => Some(false),
            _ => None,
        };

        let tab_width = match self.indent_size.as_deref() {
            Some("tab") => parse_num(&self.tab_width),
            Some(_) => parse_num(&self.indent_size),
            None => parse_num(&self.tab_width),
        }
        .and_then(|w| u8::try_from(w).ok());

        let single_quote = match self.quote_type.as_deref() {
            Some("single") => Some(true),
            Some("double") => Some(false),
            _ => None,
        };

        PartialOptions {
            print_width: parse_num(&self.max_line_length),
            tab_width,
            use_tabs,
            single_quote,
            end_of_line: self
                .end_of_line
                .as_deref()
                .and_then(|v| v.parse::<EndOfLine>().ok())
                .filter(|eol| *eol != EndOfLine::Auto),
        }
    }
}

impl EditorConfig {
    /// Parse `contents` as the `.editorconfig` at `path`
    pub fn parse(path: &Path, contents: &str) -> Self {
        let dir = path.parent().unwrap_or(path);
        let mut root = false;
        let mut sections = Vec::new();
        let mut current: Option<(String, RawSection)> = None;

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                if let Some((glob, raw)) = current.take() {
                    push_section(&mut sections, dir, &glob, raw);
                }
                current = Some((header.to_string(), RawSection::default()));
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                debug!(path = %path.display(), line, "skipping editorconfig line");
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim().to_ascii_lowercase();

            match current.as_mut() {
                None => {
                    if key == "root" {
                        root = value == "true";
                    }
                }
                Some((_, raw)) => match key.as_str() {
                    "indent_style" => raw.indent_style = Some(value),
                    "indent_size" => raw.indent_size = Some(value),
                    "tab_width" => raw.tab_width = Some(value),
                    "max_line_length" => raw.max_line_length = Some(value),
                    "end_of_line" => raw.end_of_line = Some(value),
                    "quote_type" => raw.quote_type = Some(value),
                    _ => {}
                },
            }
        }

        if let Some((glob, raw)) = current.take() {
            push_section(&mut sections, dir, &glob, raw);
        }

        Self {
            path: path.to_path_buf(),
            root,
            sections,
        }
    }

    /// Stack every section matching `file` onto `into`
    pub fn apply(&self, file: &Path, into: &mut PartialOptions) {
        for section in &self.sections {
            if section.rules.matches(file) {
                into.layer(&section.options);
            }
        }
    }
}

fn push_section(sections: &mut Vec<Section>, dir: &Path, glob: &str, raw: RawSection) {
    let options = raw.into_options();
    if options.is_empty() {
        return;
    }

    match RuleSet::from_patterns(dir, &expand_braces(glob)) {
        Ok(rules) => sections.push(Section { rules, options }),
        Err(e) => debug!(glob, error = %e, "skipping editorconfig section"),
    }
}

/// Expand `{a,b}` alternatives into separate patterns
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some((start, end)) = find_brace_group(pattern) else {
        return vec![pattern.to_string()];
    };

    let alternatives = split_alternatives(&pattern[start + 1..end]);
    if alternatives.len() < 2 {
        return vec![pattern.to_string()];
    }

    let (prefix, suffix) = (&pattern[..start], &pattern[end + 1..]);
    alternatives
        .iter()
        .flat_map(|alt| expand_braces(&format!("{prefix}{alt}{suffix}")))
        .collect()
}

fn find_brace_group(pattern: &str) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut start = None;
    let mut escaped = false;

    for (i, c) in pattern.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| (s, i));
                }
            }
            _ => {}
        }
    }
    None
}

fn split_alternatives(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;

    for (i, c) in inner.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[last..i]);
                last = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[last..]);
    parts
}
