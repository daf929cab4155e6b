//! Layout for brace-delimited languages (JavaScript/TypeScript and CSS family)
//!
//! This is a token-level re-layout, not a full parser: blocks are indented,
//! one statement per line, spacing around braces and commas is normalized and
//! string quotes are optionally normalized. Line breaks the source already had
//! at block level are kept (the languages rely on them), line breaks inside
//! parentheses and brackets collapse into single spaces.

use super::FormatFailure;
use crate::resolve::FormatOptions;

/// Which lexical rules apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// JavaScript, TypeScript and JSX
    Script,
    /// CSS, SCSS and Less
    Style,
}

#[derive(Debug, Clone, PartialEq)]
enum Kind<'a> {
    /// Identifiers, numbers, operators and anything else without structure
    Word(&'a str),
    /// Single or double quoted string; `body` excludes the quotes
    Str { quote: char, body: &'a str },
    /// Emitted as-is: template literals, regex literals, block comments
    Verbatim(&'a str),
    LineComment(&'a str),
    Open(char),
    Close(char),
    Semi,
    Comma,
}

#[derive(Debug, Clone)]
struct Token<'a> {
    kind: Kind<'a>,
    space_before: bool,
    newlines_before: usize,
    line: usize,
    col: usize,
}

const WORD_BREAKS: &[char] = &['{', '}', '(', ')', '[', ']', ';', ',', '\'', '"'];
const OPERATOR_TAIL: &[char] = &[
    '=', '+', '-', '*', '%', '&', '|', '^', '!', '~', '?', ':', '<', '>',
];
/// Words that continue an expression when they follow a `}`
const BINARY_LEAD: &[char] = &['?', ':', '=', '&', '|', '^', '*', '%', '<', '>'];
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case",
    "do", "else", "yield", "await",
];

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    dialect: Dialect,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, dialect: Dialect) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            col: 1,
            dialect,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn syntax(&self, what: &str, line: usize, col: usize) -> FormatFailure {
        FormatFailure::Syntax {
            message: format!("{what} at {line}:{col}"),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token<'a>>, FormatFailure> {
        let mut tokens: Vec<Token<'a>> = Vec::new();

        loop {
            let (space_before, newlines_before) = self.skip_whitespace();
            let Some(c) = self.peek() else {
                break;
            };
            let (line, col, start) = (self.line, self.col, self.pos);
            let rest = self.rest();

            let kind = if rest.starts_with("/*") {
                self.block_comment(line, col)?
            } else if rest.starts_with("//") && self.line_comment_allowed(space_before, &tokens) {
                let end = rest.find(['\n', '\r']).unwrap_or(rest.len());
                for _ in rest[..end].chars() {
                    self.bump();
                }
                Kind::LineComment(rest[..end].trim_end())
            } else if c == '\'' || c == '"' {
                self.string(c, line, col)?
            } else if c == '`' && self.dialect == Dialect::Script {
                self.bump();
                self.template_tail(line, col)?;
                Kind::Verbatim(&self.src[start..self.pos])
            } else if c == '/' && self.dialect == Dialect::Script && regex_allowed(&tokens) {
                self.regex(line, col)?;
                Kind::Verbatim(&self.src[start..self.pos])
            } else {
                self.bump();
                match c {
                    '{' | '(' | '[' => Kind::Open(c),
                    '}' | ')' | ']' => Kind::Close(c),
                    ';' => Kind::Semi,
                    ',' => Kind::Comma,
                    _ => {
                        self.word_tail();
                        Kind::Word(&self.src[start..self.pos])
                    }
                }
            };

            tokens.push(Token {
                kind,
                space_before,
                newlines_before,
                line,
                col,
            });
        }

        Ok(tokens)
    }

    fn skip_whitespace(&mut self) -> (bool, usize) {
        let mut space = false;
        let mut newlines = 0;

        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            space = true;
            self.bump();
            match c {
                '\n' => newlines += 1,
                '\r' if self.peek() != Some('\n') => newlines += 1,
                _ => {}
            }
        }

        (space, newlines)
    }

    fn line_comment_allowed(&self, space_before: bool, tokens: &[Token<'a>]) -> bool {
        match self.dialect {
            Dialect::Script => true,
            // `url(//cdn...)` and `http://` must stay words
            Dialect::Style => space_before || tokens.is_empty(),
        }
    }

    fn block_comment(&mut self, line: usize, col: usize) -> Result<Kind<'a>, FormatFailure> {
        let start = self.pos;
        let Some(len) = self.rest()[2..].find("*/") else {
            return Err(self.syntax("unterminated block comment", line, col));
        };
        let end = start + 2 + len + 2;
        while self.pos < end {
            self.bump();
        }
        Ok(Kind::Verbatim(&self.src[start..end]))
    }

    fn string(&mut self, quote: char, line: usize, col: usize) -> Result<Kind<'a>, FormatFailure> {
        self.bump();
        let body_start = self.pos;

        loop {
            match self.bump() {
                None | Some('\n') | Some('\r') => {
                    return Err(self.syntax("unterminated string", line, col));
                }
                Some('\\') => {
                    self.bump();
                }
                Some(c) if c == quote => {
                    let body = &self.src[body_start..self.pos - quote.len_utf8()];
                    return Ok(Kind::Str { quote, body });
                }
                Some(_) => {}
            }
        }
    }

    /// Consume the rest of a template literal whose opening backtick is eaten
    fn template_tail(&mut self, line: usize, col: usize) -> Result<(), FormatFailure> {
        loop {
            match self.bump() {
                None => return Err(self.syntax("unterminated template literal", line, col)),
                Some('\\') => {
                    self.bump();
                }
                Some('`') => return Ok(()),
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    self.template_expression(line, col)?;
                }
                Some(_) => {}
            }
        }
    }

    /// Consume a `${ ... }` substitution up to its closing brace
    fn template_expression(&mut self, line: usize, col: usize) -> Result<(), FormatFailure> {
        let mut depth = 1usize;

        while depth > 0 {
            match self.bump() {
                None => return Err(self.syntax("unterminated template literal", line, col)),
                Some('{') => depth += 1,
                Some('}') => depth -= 1,
                Some('`') => self.template_tail(line, col)?,
                Some(q @ ('\'' | '"')) => {
                    self.pos -= q.len_utf8();
                    self.col -= 1;
                    self.string(q, self.line, self.col)?;
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn regex(&mut self, line: usize, col: usize) -> Result<(), FormatFailure> {
        self.bump();
        let mut in_class = false;

        loop {
            match self.bump() {
                None | Some('\n') | Some('\r') => {
                    return Err(self.syntax("unterminated regular expression", line, col));
                }
                Some('\\') => {
                    self.bump();
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }

        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.bump();
        }
        Ok(())
    }

    fn word_tail(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || WORD_BREAKS.contains(&c) {
                break;
            }
            let rest = self.rest();
            if rest.starts_with("/*") {
                break;
            }
            if self.dialect == Dialect::Script {
                if c == '`' || rest.starts_with("//") {
                    break;
                }
                // `x=/re/`: hand the slash to the regex scanner
                let so_far = &self.src[..self.pos];
                if c == '/' && so_far.ends_with(OPERATOR_TAIL) {
                    break;
                }
            }
            self.bump();
        }
    }
}

fn regex_allowed(tokens: &[Token<'_>]) -> bool {
    let previous = tokens
        .iter()
        .rev()
        .find(|t| !matches!(t.kind, Kind::LineComment(_)));

    match previous.map(|t| &t.kind) {
        None => true,
        Some(Kind::Open(_) | Kind::Semi | Kind::Comma) => true,
        Some(Kind::Word(w)) => {
            w.ends_with(OPERATOR_TAIL) || REGEX_KEYWORDS.iter().any(|k| k == w)
        }
        Some(_) => false,
    }
}

struct Printer {
    dialect: Dialect,
    lines: Vec<String>,
    line: String,
    line_depth: usize,
    stack: Vec<(char, usize, usize)>,
    /// One entry per open `{`: was it the body of a `do`
    do_bodies: Vec<bool>,
    indent: String,
    single_quote: bool,
    pending_break: bool,
    hold_line: bool,
    space_next: bool,
}

impl Printer {
    fn new(options: &FormatOptions, dialect: Dialect) -> Self {
        Self {
            dialect,
            lines: Vec::new(),
            line: String::new(),
            line_depth: 0,
            stack: Vec::new(),
            do_bodies: Vec::new(),
            indent: options.indent_unit(),
            single_quote: options.single_quote,
            pending_break: false,
            hold_line: false,
            space_next: false,
        }
    }

    fn depth(&self) -> usize {
        self.stack.iter().filter(|(c, _, _)| *c == '{').count()
    }

    fn in_parens(&self) -> bool {
        matches!(self.stack.last(), Some(('(' | '[', _, _)))
    }

    fn break_line(&mut self) {
        if self.line.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.line);
        self.lines
            .push(format!("{}{}", self.indent.repeat(self.line_depth), text.trim_end()));
    }

    fn blank_line(&mut self) {
        let after_open = self.lines.last().is_some_and(|l| l.ends_with('{'));
        let already_blank = self.lines.last().is_some_and(|l| l.is_empty());
        if !self.lines.is_empty() && !after_open && !already_blank {
            self.lines.push(String::new());
        }
    }

    fn push(&mut self, text: &str, spaced: bool) {
        if self.line.is_empty() {
            self.line_depth = self.depth();
        } else if spaced && !self.line.ends_with(['(', '[', ' ']) {
            self.line.push(' ');
        }
        self.line.push_str(text);
        self.space_next = false;
    }

    /// Decide where a line break goes before `token`
    fn lead_in(&mut self, token: &Token<'_>) -> bool {
        let closes_block = token.kind == Kind::Close('}');

        if std::mem::take(&mut self.hold_line) {
            return token.space_before || self.space_next;
        }
        if self.pending_break {
            self.pending_break = false;
            if matches!(token.kind, Kind::LineComment(_)) && token.newlines_before == 0 {
                return true;
            }
            self.break_line();
        } else if token.newlines_before > 0 && !self.in_parens() {
            self.break_line();
        } else {
            return token.space_before || self.space_next;
        }

        if token.newlines_before >= 2 && !closes_block {
            self.blank_line();
        }
        false
    }

    fn close_brace_tail(&mut self, next: Option<&Token<'_>>, do_body: bool) {
        // a selector after `}` always starts a new rule
        let script = self.dialect == Dialect::Script;
        let stays = match next.map(|t| &t.kind) {
            Some(Kind::Close(_) | Kind::Semi | Kind::Comma) => true,
            Some(Kind::Open('(')) => script,
            Some(Kind::Word(w)) if script => {
                if matches!(*w, "else" | "catch" | "finally") || (do_body && *w == "while") {
                    self.space_next = true;
                    true
                } else {
                    w.starts_with('.') || w.starts_with(BINARY_LEAD)
                }
            }
            _ => false,
        };
        if stays {
            self.hold_line = true;
        } else {
            self.pending_break = true;
        }
    }

    fn string(&self, quote: char, body: &str) -> String {
        let preferred = if self.single_quote { '\'' } else { '"' };
        let convertible = !body.contains(['\'', '"', '\\']);
        let quote = if convertible { preferred } else { quote };
        format!("{quote}{body}{quote}")
    }

    fn print(mut self, tokens: &[Token<'_>]) -> Result<String, FormatFailure> {
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            let next = tokens.get(i + 1);
            let spaced = self.lead_in(token);

            match &token.kind {
                Kind::Open('{') => {
                    let do_body = i > 0 && tokens[i - 1].kind == Kind::Word("do");
                    if next.is_some_and(|t| t.kind == Kind::Close('}')) {
                        self.push("{}", true);
                        i += 1;
                        self.close_brace_tail(tokens.get(i + 1), do_body);
                    } else {
                        self.push("{", true);
                        self.stack.push(('{', token.line, token.col));
                        self.do_bodies.push(do_body);
                        self.pending_break = true;
                    }
                }
                Kind::Open(c) => {
                    self.push(&c.to_string(), spaced);
                    self.stack.push((*c, token.line, token.col));
                }
                Kind::Close(c) => {
                    let expected = match c {
                        '}' => '{',
                        ')' => '(',
                        _ => '[',
                    };
                    match self.stack.pop() {
                        Some((open, _, _)) if open == expected => {}
                        _ => {
                            return Err(FormatFailure::Syntax {
                                message: format!(
                                    "unexpected `{c}` at {}:{}",
                                    token.line, token.col
                                ),
                            })
                        }
                    }
                    if *c == '}' {
                        let do_body = self.do_bodies.pop().unwrap_or(false);
                        self.break_line();
                        self.push("}", false);
                        self.close_brace_tail(next, do_body);
                    } else {
                        self.push(&c.to_string(), false);
                    }
                }
                Kind::Semi => {
                    self.push(";", false);
                    if self.in_parens() {
                        self.space_next = true;
                    } else {
                        self.pending_break = true;
                    }
                }
                Kind::Comma => {
                    self.push(",", false);
                    self.space_next = true;
                }
                Kind::Word(text) | Kind::Verbatim(text) => self.push(text, spaced),
                Kind::Str { quote, body } => {
                    let text = self.string(*quote, body);
                    self.push(&text, spaced);
                }
                Kind::LineComment(text) => {
                    self.push(text, true);
                    self.pending_break = true;
                }
            }

            i += 1;
        }

        if let Some((open, line, col)) = self.stack.last() {
            return Err(FormatFailure::Syntax {
                message: format!("unclosed `{open}` opened at {line}:{col}"),
            });
        }

        self.break_line();
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }

        if self.lines.is_empty() {
            return Ok(String::new());
        }
        let mut out = self.lines.join("\n");
        out.push('\n');
        Ok(out)
    }
}

/// Re-lay out `source`; output uses `\n` line endings
pub fn layout(source: &str, dialect: Dialect, options: &FormatOptions) -> Result<String, FormatFailure> {
    let tokens = Lexer::new(source, dialect).tokenize()?;
    Printer::new(options, dialect).print(&tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn js(source: &str) -> String {
        layout(source, Dialect::Script, &FormatOptions::default()).unwrap()
    }

    fn js_err(source: &str) -> String {
        match layout(source, Dialect::Script, &FormatOptions::default()) {
            Err(FormatFailure::Syntax { message }) => message,
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn formats_function_body() {
        assert_eq!(
            js("function f(){return 1}"),
            "function f() {\n  return 1\n}\n"
        );
    }

    #[test]
    fn output_is_idempotent() {
        let sources = [
            "function f(){return 1}",
            "if(a){b()}\nelse{c()}",
            "const x = [{a:1},{b:2}];\n\n\n\nfoo(function(){ bar(); }) // trailing",
            "call(a, // first\n  b)",
            "const s = `multi\n  line ${ {a:1}.a }`;",
            "x=/[;{]/g.test(y)",
            "/* header\n   keeps inner layout */\nlet a = 'q'",
        ];

        for source in sources {
            let once = js(source);
            assert_eq!(js(&once), once, "not idempotent for {source:?}");
        }
    }

    #[test]
    fn joins_else_and_catch() {
        assert_eq!(
            js("if (a) {\n  b()\n}\nelse {\n  c()\n}"),
            "if (a) {\n  b()\n} else {\n  c()\n}\n"
        );
        assert_eq!(
            js("try{a()}catch(e){b()}finally{c()}"),
            "try {\n  a()\n} catch(e) {\n  b()\n} finally {\n  c()\n}\n"
        );
    }

    #[test]
    fn keeps_expressions_after_braces_on_the_line() {
        assert_eq!(js("x = a ? {} : {}"), "x = a ? {} : {}\n");
        assert_eq!(js("ok = {}\n&& ready"), "ok = {} && ready\n");
        assert_eq!(js("do{a()}while(x)"), "do {\n  a()\n} while(x)\n");
        assert_eq!(js("do {\n  a()\n}\nwhile (x)"), "do {\n  a()\n} while (x)\n");
        assert_eq!(js("if (a) {}\nwhile (b) {}"), "if (a) {}\nwhile (b) {}\n");
    }

    #[test]
    fn one_statement_per_line() {
        assert_eq!(js("a();b();"), "a();\nb();\n");
        assert_eq!(js("for (let i = 0;i < 3;i++) {}"), "for (let i = 0; i < 3; i++) {}\n");
    }

    #[test]
    fn collapses_blank_lines() {
        assert_eq!(js("a()\n\n\n\nb()"), "a()\n\nb()\n");
        assert_eq!(js("\n\n\na()\n\n"), "a()\n");
        assert_eq!(js("{\n\n  a()\n\n}"), "{\n  a()\n}\n");
    }

    #[test]
    fn keeps_trailing_comment_on_statement_line() {
        assert_eq!(js("a(); // note\nb()"), "a(); // note\nb()\n");
    }

    #[test]
    fn normalizes_quotes() {
        assert_eq!(js("let a = 'x'"), "let a = \"x\"\n");
        assert_eq!(js("let a = 'it\\'s'"), "let a = 'it\\'s'\n");

        let single = FormatOptions {
            single_quote: true,
            ..Default::default()
        };
        assert_eq!(
            layout("let a = \"x\"", Dialect::Script, &single).unwrap(),
            "let a = 'x'\n"
        );
    }

    #[test]
    fn indents_with_tabs_and_width() {
        let tabs = FormatOptions {
            use_tabs: true,
            ..Default::default()
        };
        assert_eq!(
            layout("f(){a()}", Dialect::Script, &tabs).unwrap(),
            "f() {\n\ta()\n}\n"
        );

        let four = FormatOptions {
            tab_width: 4,
            ..Default::default()
        };
        assert_eq!(
            layout("f(){a()}", Dialect::Script, &four).unwrap(),
            "f() {\n    a()\n}\n"
        );
    }

    #[test]
    fn regex_literals_are_opaque() {
        assert_eq!(js("x = /a{2};/.test(s)"), "x = /a{2};/.test(s)\n");
        assert_eq!(js("y = a / b / c"), "y = a / b / c\n");
    }

    #[test]
    fn reports_unbalanced_delimiters() {
        assert_eq!(js_err("function f() {"), "unclosed `{` opened at 1:14");
        assert_eq!(js_err("a)"), "unexpected `)` at 1:2");
        assert_eq!(js_err("(a]"), "unexpected `]` at 1:3");
    }

    #[test]
    fn reports_unterminated_literals() {
        assert_eq!(js_err("let a = 'oops\n"), "unterminated string at 1:9");
        assert_eq!(js_err("/* never closed"), "unterminated block comment at 1:1");
        assert_eq!(js_err("let t = `abc"), "unterminated template literal at 1:9");
    }

    #[test]
    fn empty_source_stays_empty() {
        assert_eq!(js(""), "");
        assert_eq!(js("  \n\n "), "");
    }

    #[test]
    fn formats_stylesheets() {
        let css = layout(
            "a{color:red;background:url(//cdn/x.png)}\nb , c{margin:0}",
            Dialect::Style,
            &FormatOptions::default(),
        )
        .unwrap();

        assert_eq!(
            css,
            "a {\n  color:red;\n  background:url(//cdn/x.png)\n}\nb, c {\n  margin:0\n}\n"
        );

        let rules = layout(".a{}\n.b{top:0}\n:root{}", Dialect::Style, &FormatOptions::default()).unwrap();
        assert_eq!(rules, ".a {}\n.b {\n  top:0\n}\n:root {}\n");
    }
}
