//! JSON re-printing
//!
//! The document is parsed with `serde_json` and printed back: non-empty
//! objects always expand one member per line, arrays of scalars stay on one
//! line when they fit the print width.
//!
//! Key order is kept. Numbers keep their digits (`1.50` stays `1.50`, no
//! float rounding) but exponents are always written as a signed lowercase
//! `e`, so `1E2` comes back as `1e+2`.

use super::FormatFailure;
use crate::resolve::FormatOptions;
use serde_json::Value;

struct JsonPrinter<'o> {
    options: &'o FormatOptions,
    indent: String,
    out: String,
}

impl<'o> JsonPrinter<'o> {
    fn column(&self, depth: usize) -> usize {
        depth * usize::from(self.options.tab_width)
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str(&self.indent);
        }
    }

    fn scalar(value: &Value) -> Result<String, FormatFailure> {
        serde_json::to_string(value).map_err(|e| FormatFailure::Internal {
            message: e.to_string(),
        })
    }

    /// `start` is the column the value begins at
    fn value(&mut self, value: &Value, depth: usize, start: usize) -> Result<(), FormatFailure> {
        match value {
            Value::Object(map) if map.is_empty() => self.out.push_str("{}"),
            Value::Object(map) => {
                self.out.push('{');
                for (i, (key, member)) in map.iter().enumerate() {
                    self.newline(depth + 1);
                    let key = Self::scalar(&Value::String(key.clone()))?;
                    let member_start = self.column(depth + 1) + key.len() + 2;
                    self.out.push_str(&key);
                    self.out.push_str(": ");
                    self.value(member, depth + 1, member_start)?;
                    if i + 1 < map.len() {
                        self.out.push(',');
                    }
                }
                self.newline(depth);
                self.out.push('}');
            }
            Value::Array(items) if items.is_empty() => self.out.push_str("[]"),
            Value::Array(items) => {
                if let Some(inline) = self.inline_array(items, start)? {
                    self.out.push_str(&inline);
                    return Ok(());
                }
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    self.newline(depth + 1);
                    self.value(item, depth + 1, self.column(depth + 1))?;
                    if i + 1 < items.len() {
                        self.out.push(',');
                    }
                }
                self.newline(depth);
                self.out.push(']');
            }
            scalar => {
                let text = Self::scalar(scalar)?;
                self.out.push_str(&text);
            }
        }
        Ok(())
    }

    fn inline_array(&self, items: &[Value], start: usize) -> Result<Option<String>, FormatFailure> {
        if items.iter().any(|v| v.is_object() || v.is_array()) {
            return Ok(None);
        }

        let parts = items
            .iter()
            .map(Self::scalar)
            .collect::<Result<Vec<_>, _>>()?;
        let inline = format!("[{}]", parts.join(", "));

        // trailing comma after the array counts towards the width
        let fits = start + inline.chars().count() < usize::from(self.options.print_width);
        Ok(fits.then_some(inline))
    }
}

/// Parse and re-print `source`; output uses `\n` line endings
pub fn reprint(source: &str, options: &FormatOptions) -> Result<String, FormatFailure> {
    let value: Value = serde_json::from_str(source).map_err(|e| FormatFailure::Syntax {
        message: e.to_string(),
    })?;

    let mut printer = JsonPrinter {
        options,
        indent: options.indent_unit(),
        out: String::new(),
    };
    printer.value(&value, 0, 0)?;
    printer.out.push('\n');
    Ok(printer.out)
}
