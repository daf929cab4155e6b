//! Formatter option model
//!
//! `FormatOptions` is the fully-populated set handed to a formatter.
//! `PartialOptions` is one layer (a config file, an editorconfig section,
//! request flags); layers are stacked with [`PartialOptions::layer`] and
//! finally applied on top of the defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Line ending written into formatted output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndOfLine {
    #[default]
    Lf,
    Crlf,
    Cr,
    /// Keep whatever the input uses (first line break wins)
    Auto,
}

impl EndOfLine {
    /// Pick the concrete line ending for `input`
    pub fn resolve_for(self, input: &str) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
            Self::Cr => "\r",
            Self::Auto => match input.find(['\r', '\n']) {
                Some(pos) if input[pos..].starts_with("\r\n") => "\r\n",
                Some(pos) if input[pos..].starts_with('\r') => "\r",
                _ => "\n",
            },
        }
    }
}

impl fmt::Display for EndOfLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lf => "lf",
            Self::Crlf => "crlf",
            Self::Cr => "cr",
            Self::Auto => "auto",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for EndOfLine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lf" => Ok(Self::Lf),
            "crlf" => Ok(Self::Crlf),
            "cr" => Ok(Self::Cr),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown end of line `{other}`")),
        }
    }
}

/// Fully resolved options for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Preferred maximum line width
    pub print_width: u16,

    /// Columns per indentation level
    pub tab_width: u8,

    /// Indent with tabs instead of spaces
    pub use_tabs: bool,

    /// Prefer single quotes for string literals
    pub single_quote: bool,

    /// Output line ending
    pub end_of_line: EndOfLine,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            print_width: 80,
            tab_width: 2,
            use_tabs: false,
            single_quote: false,
            end_of_line: EndOfLine::Lf,
        }
    }
}

impl FormatOptions {
    /// One level of indentation
    pub fn indent_unit(&self) -> String {
        if self.use_tabs {
            "\t".to_string()
        } else {
            " ".repeat(usize::from(self.tab_width))
        }
    }
}

/// One layer of options; `None` means "not specified here"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialOptions {
    #[serde(alias = "printWidth", skip_serializing_if = "Option::is_none")]
    pub print_width: Option<u16>,

    #[serde(alias = "tabWidth", skip_serializing_if = "Option::is_none")]
    pub tab_width: Option<u8>,

    #[serde(alias = "useTabs", skip_serializing_if = "Option::is_none")]
    pub use_tabs: Option<bool>,

    #[serde(alias = "singleQuote", skip_serializing_if = "Option::is_none")]
    pub single_quote: Option<bool>,

    #[serde(alias = "endOfLine", skip_serializing_if = "Option::is_none")]
    pub end_of_line: Option<EndOfLine>,
}

impl PartialOptions {
    /// Stack `upper` on top of `self`; fields set in `upper` win
    pub fn layer(&mut self, upper: &PartialOptions) {
        if upper.print_width.is_some() {
            self.print_width = upper.print_width;
        }
        if upper.tab_width.is_some() {
            self.tab_width = upper.tab_width;
        }
        if upper.use_tabs.is_some() {
            self.use_tabs = upper.use_tabs;
        }
        if upper.single_quote.is_some() {
            self.single_quote = upper.single_quote;
        }
        if upper.end_of_line.is_some() {
            self.end_of_line = upper.end_of_line;
        }
    }

    /// Fill unspecified fields from `base`
    pub fn apply_to(&self, base: FormatOptions) -> FormatOptions {
        FormatOptions {
            print_width: self.print_width.unwrap_or(base.print_width),
            tab_width: self.tab_width.unwrap_or(base.tab_width),
            use_tabs: self.use_tabs.unwrap_or(base.use_tabs),
            single_quote: self.single_quote.unwrap_or(base.single_quote),
            end_of_line: self.end_of_line.unwrap_or(base.end_of_line),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Explicit overrides carried by a request.
///
/// Paths are absolute by the time this reaches the resolver, so the
/// fingerprint does not depend on the client's working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideOptions {
    /// Option values that beat anything discovered on disk
    pub options: PartialOptions,

    /// Use this config file instead of discovering one
    pub config_path: Option<PathBuf>,

    /// Config file to fall back to when discovery finds nothing
    pub default_config: Option<PathBuf>,

    /// Skip config file discovery entirely
    pub no_config: bool,

    /// Read `.editorconfig` files
    pub editorconfig: bool,

    /// Ignore files to use instead of discovered `.formatignore` files
    pub ignore_paths: Vec<PathBuf>,
}

impl Default for OverrideOptions {
    fn default() -> Self {
        Self {
            options: PartialOptions::default(),
            config_path: None,
            default_config: None,
            no_config: false,
            editorconfig: true,
            ignore_paths: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_upper_wins() {
        let mut base = PartialOptions {
            tab_width: Some(4),
            use_tabs: Some(true),
            ..Default::default()
        };
        base.layer(&PartialOptions {
            tab_width: Some(2),
            ..Default::default()
        });

        assert_eq!(base.tab_width, Some(2));
        assert_eq!(base.use_tabs, Some(true));
    }

    #[test]
    fn apply_fills_defaults() {
        let partial = PartialOptions {
            single_quote: Some(true),
            ..Default::default()
        };
        let options = partial.apply_to(FormatOptions::default());

        assert!(options.single_quote);
        assert_eq!(options.tab_width, 2);
        assert_eq!(options.print_width, 80);
    }

    #[test]
    fn indent_unit_respects_tabs() {
        let mut options = FormatOptions {
            tab_width: 4,
            ..Default::default()
        };
        assert_eq!(options.indent_unit(), "    ");

        options.use_tabs = true;
        assert_eq!(options.indent_unit(), "\t");
    }

    #[test]
    fn end_of_line_auto_detects_input() {
        assert_eq!(EndOfLine::Auto.resolve_for("a\r\nb"), "\r\n");
        assert_eq!(EndOfLine::Auto.resolve_for("a\rb"), "\r");
        assert_eq!(EndOfLine::Auto.resolve_for("a\nb"), "\n");
        assert_eq!(EndOfLine::Auto.resolve_for("single line"), "\n");
        assert_eq!(EndOfLine::Crlf.resolve_for("a\nb"), "\r\n");
    }

    #[test]
    fn camel_case_aliases_accepted() {
        let partial: PartialOptions =
            serde_json::from_str(r#"{"tabWidth": 8, "useTabs": false}"#).unwrap();
        assert_eq!(partial.tab_width, Some(8));
        assert_eq!(partial.use_tabs, Some(false));
    }

    #[test]
    fn end_of_line_parses() {
        assert_eq!("CRLF".parse::<EndOfLine>().unwrap(), EndOfLine::Crlf);
        assert!("windows".parse::<EndOfLine>().is_err());
    }
}
