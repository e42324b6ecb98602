//! Lexical nesting estimate, taken before a script reaches the parser.
//!
//! The parser recurses on brackets and on operators that nest everything to
//! their right: prefix operators (`!`, `-`, `typeof`), `?`/`:`, assignments,
//! `=>`, `**` and statement keywords such as `if`. This scan over-approximates
//! that recursion from tokens alone, skipping the contents of strings,
//! templates, regular expressions and comments. Left-associative chains such
//! as `a + b + c` or `a.b.c` parse in a loop and are bounded while lowering
//! instead.

use crate::parse::ParseFailure;

/// Longest first, so the first match is the whole token.
const PUNCTUATORS: &[&[u8]] = &[
    b">>>=", b"...", b"===", b"!==", b"**=", b"<<=", b">>=", b">>>", b"&&=", b"||=", b"??=",
    b"=>", b"==", b"!=", b"<=", b">=", b"&&", b"||", b"??", b"?.", b"**", b"++", b"--", b"<<",
    b">>", b"+=", b"-=", b"*=", b"/=", b"%=", b"&=", b"|=", b"^=",
];

/// Reject `source` when its estimated nesting exceeds `max`.
///
/// ```
/// use guard_validator::parse::check_nesting_depth;
///
/// assert!(check_nesting_depth("'((((' + f(x)", 1).is_ok());
/// assert!(check_nesting_depth("!!!x", 2).is_err());
/// ```
pub fn check_nesting_depth(source: &str, max: usize) -> Result<(), ParseFailure> {
    let actual = Scanner::new(source).run();
    if actual > max {
        return Err(ParseFailure::NestingTooDeep { max, actual });
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Frame {
    /// Opened by `${` inside a template literal.
    template: bool,
    /// Right-nesting operators since the last `,` or `;`.
    chain: usize,
    /// Prefix operators applying to the operand being read.
    prefix: usize,
}

struct Scanner<'s> {
    bytes: &'s [u8],
    pos: usize,
    /// The first frame is the top level and is never closed.
    frames: Vec<Frame>,
    /// `chain + prefix` summed over all frames.
    pending: usize,
    /// The last token ends an operand, so `/` divides and `+` is binary.
    after_operand: bool,
    /// The last token was `.` or `?.`, so a word is a property name.
    after_dot: bool,
    deepest: usize,
}

impl<'s> Scanner<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            bytes: source.as_bytes(),
            pos: 0,
            frames: vec![Frame::default()],
            pending: 0,
            after_operand: false,
            after_dot: false,
            deepest: 0,
        }
    }

    fn run(mut self) -> usize {
        while let Some(&b) = self.bytes.get(self.pos) {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => self.pos += 1,
                b'\'' | b'"' => self.string(b),
                b'`' => {
                    self.pos += 1;
                    self.template();
                }
                b'/' if self.peek(1) == Some(b'/') => self.line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.block_comment(),
                b'/' if !self.after_operand => self.regex(),
                b'(' | b'[' | b'{' => {
                    self.pos += 1;
                    self.open(false);
                }
                b')' | b']' | b'}' => {
                    self.pos += 1;
                    self.close();
                }
                b',' | b';' => {
                    self.pos += 1;
                    self.end_expression();
                }
                b'.' if !self.after_operand && self.peek(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.word()
                }
                b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' | b'\\' | 0x80..=0xff => {
                    self.word()
                }
                _ => self.punctuator(),
            }
        }
        self.deepest
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn record(&mut self) {
        let depth = self.frames.len() - 1 + self.pending;
        self.deepest = self.deepest.max(depth);
    }

    fn open(&mut self, template: bool) {
        self.frames.push(Frame {
            template,
            ..Frame::default()
        });
        self.after_operand = false;
        self.after_dot = false;
        self.record();
    }

    fn close(&mut self) {
        self.after_dot = false;
        if self.frames.len() == 1 {
            self.after_operand = true;
            return;
        }
        if let Some(frame) = self.frames.pop() {
            self.pending -= frame.chain + frame.prefix;
            if frame.template {
                self.template();
                return;
            }
        }
        self.after_operand = true;
    }

    fn end_expression(&mut self) {
        let top = self.top();
        let cleared = top.chain + top.prefix;
        top.chain = 0;
        top.prefix = 0;
        self.pending -= cleared;
        self.after_operand = false;
        self.after_dot = false;
    }

    fn prefix_operator(&mut self) {
        self.top().prefix += 1;
        self.pending += 1;
        self.after_operand = false;
        self.record();
    }

    fn right_operator(&mut self) {
        let top = self.top();
        let cleared = top.prefix;
        top.prefix = 0;
        top.chain += 1;
        self.pending = self.pending + 1 - cleared;
        self.after_operand = false;
        self.record();
    }

    fn binary_operator(&mut self) {
        let top = self.top();
        let cleared = top.prefix;
        top.prefix = 0;
        self.pending -= cleared;
        self.after_operand = false;
    }

    fn word(&mut self) {
        let start = self.pos;
        let numeric = matches!(self.bytes[start], b'0'..=b'9' | b'.');
        while let Some(&b) = self.bytes.get(self.pos) {
            let part = b.is_ascii_alphanumeric()
                || matches!(b, b'_' | b'$' | b'\\' | 0x80..=0xff)
                || (numeric && b == b'.');
            if !part {
                break;
            }
            self.pos += 1;
        }

        if std::mem::take(&mut self.after_dot) {
            self.after_operand = true;
            return;
        }
        let bytes = self.bytes;
        match &bytes[start..self.pos] {
            b"typeof" | b"void" | b"delete" | b"new" | b"await" | b"yield" => {
                self.prefix_operator()
            }
            b"if" | b"else" | b"while" | b"for" | b"do" | b"with" => self.right_operator(),
            b"in" | b"instanceof" | b"of" | b"return" | b"throw" | b"case" => {
                self.binary_operator()
            }
            _ => self.after_operand = true,
        }
    }

    fn punctuator(&mut self) {
        let bytes = self.bytes;
        let rest = &bytes[self.pos..];
        let mut token = PUNCTUATORS
            .iter()
            .copied()
            .find(|p| rest.starts_with(p))
            .unwrap_or(&rest[..1]);
        // `a?.5:1` is a conditional, not optional chaining.
        if token == b"?." && rest.get(2).is_some_and(u8::is_ascii_digit) {
            token = &rest[..1];
        }
        self.pos += token.len();

        match token {
            b"." | b"?." => {
                self.binary_operator();
                self.after_dot = true;
            }
            b"++" | b"--" if self.after_operand => {}
            b"!" | b"~" | b"+" | b"-" | b"++" | b"--" if !self.after_operand => {
                self.prefix_operator()
            }
            b"!" | b"~" => self.prefix_operator(),
            b"?" | b":" | b"=>" | b"**" | b"=" | b"+=" | b"-=" | b"*=" | b"/=" | b"%=" | b"**="
            | b"<<=" | b">>=" | b">>>=" | b"&=" | b"|=" | b"^=" | b"&&=" | b"||=" | b"??=" => {
                self.right_operator()
            }
            _ => self.binary_operator(),
        }
    }

    fn string(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(&b) = self.bytes.get(self.pos) {
            self.pos += 1;
            match b {
                b'\\' => self.pos += 1,
                b'\n' => break,
                _ if b == quote => break,
                _ => {}
            }
        }
        self.after_operand = true;
        self.after_dot = false;
    }

    /// Template text up to the closing backtick or the next `${`.
    fn template(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            self.pos += 1;
            match b {
                b'\\' => self.pos += 1,
                b'`' => break,
                b'$' if self.peek(0) == Some(b'{') => {
                    self.pos += 1;
                    self.open(true);
                    return;
                }
                _ => {}
            }
        }
        self.after_operand = true;
        self.after_dot = false;
    }

    fn regex(&mut self) {
        self.pos += 1;
        let mut class = false;
        while let Some(&b) = self.bytes.get(self.pos) {
            self.pos += 1;
            match b {
                b'\\' => self.pos += 1,
                b'[' => class = true,
                b']' => class = false,
                b'/' if !class => break,
                b'\n' => break,
                _ => {}
            }
        }
        self.after_operand = true;
        self.after_dot = false;
    }

    fn line_comment(&mut self) {
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn block_comment(&mut self) {
        self.pos += 2;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos..].starts_with(b"*/") {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }
}
