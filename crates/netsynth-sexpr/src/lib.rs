//! S-expression reader and writer for KiCad's `.kicad_sym` and `.kicad_sch` files.
//!
//! Atoms keep their exact source text: numbers are never reinterpreted, so any
//! part of a document that is read and written back stays textually the same.

use std::fmt;

/// An S-expression value
#[derive(Debug, Clone, PartialEq)]
pub enum Sexpr {
    /// Unquoted atom (keywords, numbers, `yes`/`no`)
    Symbol(String),
    /// Quoted atom
    String(String),
    List(Vec<Sexpr>),
}

impl Sexpr {
    pub fn symbol(s: impl Into<String>) -> Self {
        Sexpr::Symbol(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Sexpr::String(s.into())
    }

    /// Unquoted numeric atom, written the way KiCad writes coordinates.
    pub fn number(value: f64) -> Self {
        Sexpr::Symbol(format_number(value))
    }

    pub fn list(items: Vec<Sexpr>) -> Self {
        Sexpr::List(items)
    }

    /// Build `(tag item...)`
    pub fn tagged(tag: &str, items: impl IntoIterator<Item = Sexpr>) -> Self {
        let mut list = vec![Sexpr::symbol(tag)];
        list.extend(items);
        Sexpr::List(list)
    }

    pub fn is_list(&self) -> bool {
        self.as_list().is_some()
    }

    /// Atom text, quoted or not
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Sexpr::Symbol(s) | Sexpr::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_atom().and_then(|s| s.parse().ok())
    }

    pub fn as_list(&self) -> Option<&[Sexpr]> {
        match self {
            Sexpr::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Sexpr>> {
        match self {
            Sexpr::List(items) => Some(items),
            _ => None,
        }
    }

    /// The leading keyword of a list, e.g. `wire` for `(wire (pts ...))`.
    pub fn tag(&self) -> Option<&str> {
        match self.as_list()?.first()? {
            Sexpr::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_tagged(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }

    /// Item `index` of a list, counting the tag as item 0.
    pub fn get(&self, index: usize) -> Option<&Sexpr> {
        self.as_list()?.get(index)
    }

    pub fn atom_at(&self, index: usize) -> Option<&str> {
        self.get(index)?.as_atom()
    }

    pub fn f64_at(&self, index: usize) -> Option<f64> {
        self.get(index)?.as_f64()
    }

    /// First direct child list tagged `tag`.
    pub fn child(&self, tag: &str) -> Option<&Sexpr> {
        self.as_list()?.iter().find(|item| item.is_tagged(tag))
    }

    pub fn child_mut(&mut self, tag: &str) -> Option<&mut Sexpr> {
        self.as_list_mut()?
            .iter_mut()
            .find(|item| item.is_tagged(tag))
    }

    /// All direct child lists tagged `tag`.
    pub fn children<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Sexpr> + 'a {
        self.as_list()
            .unwrap_or(&[])
            .iter()
            .filter(move |item| item.is_tagged(tag))
    }

    /// Visit every list in the tree, depth first, including `self`.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Sexpr)) {
        if let Sexpr::List(items) = self {
            visit(self);
            for item in items {
                item.walk(visit);
            }
        }
    }
}

/// Format a coordinate with at most four decimals and no trailing zeros.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        // also folds -0
        return "0".to_string();
    }
    let text = format!("{rounded:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}

/// Parser for S-expressions
pub struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            chars: input.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Parse a single expression
    pub fn parse(&mut self) -> Result<Sexpr, ParseError> {
        self.skip_whitespace();
        if self.is_at_end() {
            return Err(ParseError::UnexpectedEof(self.current_pos));
        }

        if self.peek_char() == Some('(') {
            self.parse_list()
        } else {
            self.parse_atom()
        }
    }

    fn parse_list(&mut self) -> Result<Sexpr, ParseError> {
        let start_pos = self.current_pos;
        self.expect('(')?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                return Err(ParseError::UnclosedList(start_pos));
            }

            if self.peek_char() == Some(')') {
                self.advance();
                break;
            }

            items.push(self.parse()?);

            if items.len() % 1000 == 0 {
                log::trace!("Parsed {} items in list at position {start_pos}", items.len());
            }
        }

        Ok(Sexpr::List(items))
    }

    fn parse_atom(&mut self) -> Result<Sexpr, ParseError> {
        if self.peek_char() == Some('"') {
            return self.parse_string();
        }

        let start = self.current_pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                break;
            }
            self.advance();
        }

        if self.current_pos == start {
            return match self.peek_char() {
                Some(ch) => Err(ParseError::UnexpectedChar(ch, start)),
                None => Err(ParseError::UnexpectedEof(start)),
            };
        }

        Ok(Sexpr::Symbol(self.input[start..self.current_pos].to_string()))
    }

    fn parse_string(&mut self) -> Result<Sexpr, ParseError> {
        let start_pos = self.current_pos;
        self.expect('"')?;
        let mut result = String::new();

        loop {
            match self.peek_char() {
                None => return Err(ParseError::UnterminatedString(start_pos)),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        Some('n') => result.push('\n'),
                        Some('r') => result.push('\r'),
                        Some('t') => result.push('\t'),
                        Some(ch @ ('"' | '\\')) => result.push(ch),
                        // Unknown escapes keep their backslash
                        Some(ch) => {
                            result.push('\\');
                            result.push(ch);
                        }
                        None => return Err(ParseError::UnterminatedString(start_pos)),
                    }
                    self.advance();
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Ok(Sexpr::String(result))
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == ';' {
                // comment runs to end of line
                while let Some(ch) = self.peek_char() {
                    self.advance();
                    if ch == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos + ch.len_utf8();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        match self.peek_char() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError::UnexpectedChar(ch, self.current_pos)),
            None => Err(ParseError::UnexpectedEof(self.current_pos)),
        }
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }
}

/// Parse exactly one expression; trailing content other than whitespace is an error.
pub fn parse(input: &str) -> Result<Sexpr, ParseError> {
    log::trace!("Parsing S-expression from {} bytes of input", input.len());
    let mut parser = Parser::new(input);
    let result = parser.parse()?;
    parser.skip_whitespace();
    if !parser.is_at_end() {
        return Err(ParseError::TrailingContent(parser.current_pos));
    }
    Ok(result)
}

/// Errors that can occur during parsing; offsets are byte positions in the input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),
    #[error("unexpected character '{0}' at byte {1}")]
    UnexpectedChar(char, usize),
    #[error("list opened at byte {0} is never closed")]
    UnclosedList(usize),
    #[error("string starting at byte {0} is not terminated")]
    UnterminatedString(usize),
    #[error("unexpected content after the top-level expression at byte {0}")]
    TrailingContent(usize),
}

/// Format an S-expression with two-space indentation
pub fn format_sexpr(sexpr: &Sexpr, indent_level: usize) -> String {
    let mut out = String::new();
    write_sexpr(&mut out, sexpr, indent_level, true);
    out
}

fn write_sexpr(out: &mut String, sexpr: &Sexpr, indent_level: usize, add_indent: bool) {
    if add_indent {
        out.push_str(&"  ".repeat(indent_level));
    }

    match sexpr {
        Sexpr::Symbol(s) => out.push_str(s),
        Sexpr::String(s) => {
            out.push('"');
            out.push_str(&escape_string(s));
            out.push('"');
        }
        Sexpr::List(items) if items.is_empty() => out.push_str("()"),
        Sexpr::List(items) if is_simple_list(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_sexpr(out, item, 0, false);
            }
            out.push(')');
        }
        Sexpr::List(items) => {
            out.push('(');
            // Leading atoms stay on the opening line: `(symbol "R"` / `(property "Value" "10k"`
            let inline = items.iter().take_while(|item| !item.is_list()).count().max(1);
            for (i, item) in items.iter().take(inline).enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_sexpr(out, item, 0, false);
            }
            for item in items.iter().skip(inline) {
                out.push('\n');
                write_sexpr(out, item, indent_level + 1, true);
            }
            out.push('\n');
            out.push_str(&"  ".repeat(indent_level));
            out.push(')');
        }
    }
}

// A backslash is only escaped where the reader would otherwise take it as an escape
fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => result.push_str("\\\""),
            '\\' => match chars.peek() {
                None | Some('"' | '\\' | 'n' | 'r' | 't') => result.push_str("\\\\"),
                Some(_) => result.push('\\'),
            },
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ => result.push(ch),
        }
    }
    result
}

fn is_simple_list(items: &[Sexpr]) -> bool {
    if let Some(Sexpr::Symbol(first)) = items.first() {
        match first.as_str() {
            "at" | "xy" | "size" | "start" | "end" | "mid" | "center" | "radius" | "length"
            | "width" | "type" | "shape" | "diameter" | "fields_autoplaced" | "mirror" => {
                return true
            }
            "color" if items.len() == 5 => return true,
            "font" if items.len() == 2 => return true,
            "justify" if items.len() <= 3 => return true,
            "pts" if items.len() <= 3 => return true,
            "lib_id" | "uuid" | "reference" | "unit" | "page" | "title" | "date" | "paper"
            | "version" | "generator" | "generator_version" | "extends"
                if items.len() == 2 =>
            {
                return true
            }
            "exclude_from_sim" | "in_bom" | "on_board" | "dnp" | "hide" | "pin_numbers"
            | "pin_names" | "offset"
                if items.len() <= 2 =>
            {
                return true
            }
            _ => {}
        }
    }

    items.len() <= 2 && items.iter().all(|item| !item.is_list())
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_sexpr(self, 0))
    }
}
